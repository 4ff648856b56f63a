// Model of the data read in one cycle

use heapless::String;

use crate::traits::RandomSource;

/// Text reported by the pulse oximeter
pub type VitalText = String<16>;

/// Text reported by the GPS receiver, one NMEA sentence at most
pub type GpsText = String<96>;

/// Full scale of the 10-bit analog reading
pub const ADC_FULL_SCALE: f32 = 1023.0;

/// Reference voltage the analog reading is scaled to
pub const ADC_REFERENCE_VOLTS: f32 = 5.0;

/// Sensor output in degrees per volt
pub const DEGREES_PER_VOLT: f32 = 100.0;

/// Convert a 10-bit analog sample to degrees Celsius
pub fn temperature_from_raw(raw: u16) -> f32 {
    raw as f32 / ADC_FULL_SCALE * ADC_REFERENCE_VOLTS * DEGREES_PER_VOLT
}

/// Identifier the relay variant tags its lines with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceId(u32);

impl DeviceId {
    /// Draw an id from `rng`. Ids stay within 0..=i32::MAX.
    pub fn generate<R: RandomSource>(rng: &mut R) -> Self {
        Self(rng.next_u32() & 0x7FFF_FFFF)
    }

    pub const fn value(&self) -> u32 {
        self.0
    }
}

impl core::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Pulse oximeter readings
#[derive(Debug, Clone, PartialEq)]
pub struct Vitals {
    pub spo2: VitalText,
    pub heart_rate: VitalText,
}

/// Everything sampled in one cycle
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub device_id: Option<DeviceId>,
    /// Humidity pin state, 1.0 high and 0.0 low. `None` when the pin read failed.
    pub humidity_raw: Option<f32>,
    /// `None` when the ADC read failed
    pub temperature_c: Option<f32>,
    pub vitals: Option<Vitals>,
    pub gps: Option<GpsText>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::SequenceRng;

    #[test]
    fn half_scale_sample_is_about_250_degrees() {
        let temp = temperature_from_raw(512);
        assert!((temp - 250.24).abs() < 0.01, "got {temp}");
    }

    #[test]
    fn conversion_endpoints() {
        assert_eq!(temperature_from_raw(0), 0.0);
        assert_eq!(temperature_from_raw(1023), 500.0);
    }

    #[test]
    fn device_id_is_non_negative() {
        let mut rng = SequenceRng::new(&[u32::MAX, 0x8000_0001]);
        assert_eq!(DeviceId::generate(&mut rng).value(), 0x7FFF_FFFF);
        assert_eq!(DeviceId::generate(&mut rng).value(), 1);
    }

    #[test]
    fn device_id_displays_as_decimal() {
        let mut rng = SequenceRng::new(&[1804289383]);
        let id = DeviceId::generate(&mut rng);
        assert_eq!(std::format!("{id}"), "1804289383");
    }
}
