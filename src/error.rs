use thiserror_no_std::Error;

/// Failure reported by a hardware capability
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityError {
    #[error("digital pin read failed")]
    PinRead,
    #[error("digital pin write failed")]
    PinWrite,
    #[error("analog read failed")]
    AdcRead,
    #[error("serial write failed")]
    SerialWrite,
    #[error("peer send failed")]
    PeerSend,
    #[error("invalid baud rate text")]
    InvalidBaud,
    #[error("display error: {0}")]
    Display(&'static str),
}

/// Reason a cycle produced no transmission
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleError {
    #[error("capability error: {0}")]
    Capability(CapabilityError),
    #[error("composed line exceeds buffer capacity")]
    LineOverflow,
}

impl From<CapabilityError> for CycleError {
    fn from(value: CapabilityError) -> Self {
        Self::Capability(value)
    }
}

impl From<core::fmt::Error> for CycleError {
    fn from(_: core::fmt::Error) -> Self {
        Self::LineOverflow
    }
}
