//! Runner settings. Nothing here is configurable at runtime; the GPIO
//! assignment sits with the peripherals it names in `bin/main.rs`.

use core::fmt::Write;

use heapless::String;

/// Baud rate of the monitor channel and of the peer forwarder
pub const BAUD_RATE: u32 = 9_600;

/// Time between the start of two cycles
pub const CYCLE_PERIOD_MS: u64 = 1_000;

/// Peer channel the relay variant forwards to
pub const PEER_CHANNEL: u8 = 0;

/// Output variant of the runner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// One labelled line per field on the local serial monitor
    Monitor,
    /// One composite line, forwarded to a peer and echoed locally
    Relay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerConfig {
    pub variant: Variant,
    pub period_ms: u64,
    pub baud: u32,
    pub peer_channel: u8,
}

impl RunnerConfig {
    pub const DEFAULT: Self = Self {
        variant: Variant::Relay,
        period_ms: CYCLE_PERIOD_MS,
        baud: BAUD_RATE,
        peer_channel: PEER_CHANNEL,
    };

    pub const fn with_variant(mut self, variant: Variant) -> Self {
        self.variant = variant;
        self
    }

    pub const fn with_period_ms(mut self, period_ms: u64) -> Self {
        self.period_ms = period_ms;
        self
    }

    /// Baud rate as the text argument the peer forwarder takes
    pub fn baud_text(&self) -> String<10> {
        let mut text = String::new();
        // u32::MAX has 10 digits
        let _ = write!(text, "{}", self.baud);
        text
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
