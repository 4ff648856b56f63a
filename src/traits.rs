//! Hardware abstraction traits

use crate::error::CapabilityError;
use crate::model::{GpsText, VitalText};

/// Trait for pulse oximeters
pub trait PulseOximeter {
    /// Bring the sensor up. `false` means no vitals this cycle.
    fn begin(&mut self) -> bool;

    /// Read blood oxygen saturation as text
    fn read_spo2(&mut self) -> VitalText;

    /// Read heart rate as text
    fn read_heart_rate(&mut self) -> VitalText;
}

/// Trait for GPS receivers
pub trait GpsReceiver {
    /// Read whatever position text the receiver has ready
    fn read(&mut self) -> GpsText;
}

/// Trait for digital input pins
pub trait DigitalInput {
    fn is_high(&mut self) -> Result<bool, CapabilityError>;
}

/// Trait for digital output pins
pub trait DigitalOutput {
    fn set_level(&mut self, high: bool) -> Result<(), CapabilityError>;
}

/// Trait for analog input pins
pub trait AnalogInput {
    /// Read a 10-bit sample (0..=1023)
    fn read_raw(&mut self) -> Result<u16, CapabilityError>;
}

/// Trait for the primary serial channel
pub trait SerialPort {
    /// Whether input is waiting on the channel
    fn available(&mut self) -> bool;

    /// Write one line, terminator included
    fn write_line(&mut self, line: &str) -> Result<(), CapabilityError>;
}

/// Trait for the channel that forwards lines to a peer device
pub trait PeerLink {
    fn send_message(&mut self, channel: u8, payload: &str, baud: &str)
    -> Result<(), CapabilityError>;
}

/// Source of pseudo-random values
pub trait RandomSource {
    fn next_u32(&mut self) -> u32;
}

/// Trait for display devices
pub trait Display {
    /// Initialize the display
    fn init(&mut self) -> Result<(), CapabilityError>;

    /// Clear the display
    fn clear(&mut self) -> Result<(), CapabilityError>;

    /// Draw text at specified position
    fn draw_text(&mut self, text: &str, x: i32, y: i32) -> Result<(), CapabilityError>;

    /// Update/flush the display (show the buffer)
    fn update(&mut self) -> Result<(), CapabilityError>;
}
