//! Text layout of the monitor and relay outputs.

use core::fmt::Write;
use heapless::{String, Vec};

use crate::error::CycleError;
use crate::model::{DeviceId, Reading};

pub const LINE_CAPACITY: usize = 256;

pub type Line = String<LINE_CAPACITY>;

/// Most lines a monitor cycle writes
pub const MONITOR_MAX_LINES: usize = 5;

pub const NO_DATA: &str = "No data";

pub const ECHO_PREFIX: &str = "Printed by sender: ";

/// A sampled number, or `No data` when the read failed.
///
/// Precision in the format string applies to the number.
struct Measured(Option<f32>);

impl core::fmt::Display for Measured {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.0 {
            Some(value) => core::fmt::Display::fmt(&value, f),
            None => f.write_str(NO_DATA),
        }
    }
}

/// Lines the monitor variant prints for one cycle, in order.
///
/// `available` is the primary channel state sampled at the start of the cycle.
/// When it is set but the oximeter did not come up, the vitals line is simply
/// left out.
pub fn monitor_lines(
    reading: &Reading,
    available: bool,
) -> Result<Vec<Line, MONITOR_MAX_LINES>, CycleError> {
    let mut lines = Vec::new();

    if let Some(vitals) = &reading.vitals {
        push_line(
            &mut lines,
            format_args!(
                "Oxygen percentage: {}; Heart rate: {}",
                vitals.spo2, vitals.heart_rate
            ),
        )?;
    } else if !available {
        push_line(&mut lines, format_args!("{NO_DATA}"))?;
    }

    match &reading.gps {
        Some(gps) => push_line(&mut lines, format_args!("GPS Data: {gps}"))?,
        None => push_line(&mut lines, format_args!("{NO_DATA}"))?,
    }

    let humidity = Measured(reading.humidity_raw);
    let temperature = Measured(reading.temperature_c);
    push_line(&mut lines, format_args!("Humidity: {humidity:.2}"))?;
    push_line(&mut lines, format_args!("temperature: {temperature:.6}"))?;
    push_line(&mut lines, format_args!(""))?;

    Ok(lines)
}

/// Composite line the relay variant forwards to its peer
pub fn relay_line(device_id: DeviceId, reading: &Reading) -> Result<Line, CycleError> {
    let mut line = Line::new();
    write!(
        line,
        "|| Arduino ID: {} | Humidity: {:.6} | Temp: {:.6}",
        device_id,
        Measured(reading.humidity_raw),
        Measured(reading.temperature_c)
    )?;

    if let Some(gps) = &reading.gps {
        write!(line, " | GPS: {gps}")?;
    }

    if let Some(vitals) = &reading.vitals {
        write!(
            line,
            " | sp02: {} | Heart Rate: {}",
            vitals.spo2, vitals.heart_rate
        )?;
    }

    Ok(line)
}

/// Local copy of a forwarded payload
pub fn echo_line(payload: &str) -> Result<Line, CycleError> {
    let mut line = Line::new();
    line.push_str(ECHO_PREFIX).map_err(|_| CycleError::LineOverflow)?;
    line.push_str(payload).map_err(|_| CycleError::LineOverflow)?;
    Ok(line)
}

fn push_line<const N: usize>(
    lines: &mut Vec<Line, N>,
    args: core::fmt::Arguments<'_>,
) -> Result<(), CycleError> {
    let mut line = Line::new();
    line.write_fmt(args)?;
    lines.push(line).map_err(|_| CycleError::LineOverflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GpsText, Vitals};
    use crate::mock::SequenceRng;

    fn text<const N: usize>(s: &str) -> String<N> {
        let mut out = String::new();
        out.push_str(s).unwrap();
        out
    }

    fn reading(gps: Option<&str>, vitals: Option<(&str, &str)>) -> Reading {
        Reading {
            device_id: None,
            humidity_raw: Some(1.0),
            temperature_c: Some(500.0),
            vitals: vitals.map(|(spo2, hr)| Vitals {
                spo2: text(spo2),
                heart_rate: text(hr),
            }),
            gps: gps.map(text::<96>),
        }
    }

    fn as_strs<const N: usize>(lines: &Vec<Line, N>) -> std::vec::Vec<&str> {
        lines.iter().map(|l| l.as_str()).collect()
    }

    #[test]
    fn monitor_with_everything_available() {
        let lines = monitor_lines(&reading(Some("$GPGGA,1"), Some(("97", "72"))), true).unwrap();
        assert_eq!(
            as_strs(&lines),
            [
                "Oxygen percentage: 97; Heart rate: 72",
                "GPS Data: $GPGGA,1",
                "Humidity: 1.00",
                "temperature: 500.000000",
                "",
            ]
        );
    }

    #[test]
    fn monitor_without_input_prints_no_data_twice() {
        let mut r = reading(None, None);
        r.humidity_raw = Some(0.0);
        r.temperature_c = Some(0.0);
        let lines = monitor_lines(&r, false).unwrap();
        assert_eq!(
            as_strs(&lines),
            ["No data", "No data", "Humidity: 0.00", "temperature: 0.000000", ""]
        );
    }

    #[test]
    fn monitor_with_failed_oximeter_skips_vitals_line() {
        let lines = monitor_lines(&reading(Some("fix"), None), true).unwrap();
        assert_eq!(lines[0].as_str(), "GPS Data: fix");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn monitor_prints_no_data_for_failed_reads() {
        let mut r = reading(Some("fix"), None);
        r.humidity_raw = None;
        r.temperature_c = None;
        let lines = monitor_lines(&r, true).unwrap();
        assert_eq!(
            as_strs(&lines),
            ["GPS Data: fix", "Humidity: No data", "temperature: No data", ""]
        );
    }

    #[test]
    fn relay_line_full() {
        let id = DeviceId::generate(&mut SequenceRng::new(&[42]));
        let line = relay_line(id, &reading(Some("$GPRMC"), Some(("98", "60")))).unwrap();
        assert_eq!(
            line.as_str(),
            "|| Arduino ID: 42 | Humidity: 1.000000 | Temp: 500.000000 | GPS: $GPRMC | sp02: 98 | Heart Rate: 60"
        );
    }

    #[test]
    fn relay_line_omits_absent_fields() {
        let id = DeviceId::generate(&mut SequenceRng::new(&[7]));
        let line = relay_line(id, &reading(None, None)).unwrap();
        assert_eq!(
            line.as_str(),
            "|| Arduino ID: 7 | Humidity: 1.000000 | Temp: 500.000000"
        );
    }

    #[test]
    fn relay_line_marks_failed_reads() {
        let id = DeviceId::generate(&mut SequenceRng::new(&[7]));
        let mut r = reading(None, None);
        r.temperature_c = None;
        let line = relay_line(id, &r).unwrap();
        assert_eq!(
            line.as_str(),
            "|| Arduino ID: 7 | Humidity: 1.000000 | Temp: No data"
        );
    }

    #[test]
    fn relay_line_fits_longest_sentence() {
        let id = DeviceId::generate(&mut SequenceRng::new(&[u32::MAX]));
        let gps: GpsText = text(&"X".repeat(96));
        let mut r = reading(None, Some(("100", "255")));
        r.gps = Some(gps);
        assert!(relay_line(id, &r).is_ok());
    }

    #[test]
    fn echo_line_prefixes_payload() {
        let line = echo_line("|| Arduino ID: 1").unwrap();
        assert_eq!(line.as_str(), "Printed by sender: || Arduino ID: 1");
    }

    #[test]
    fn echo_line_overflow_is_reported() {
        let payload = "x".repeat(LINE_CAPACITY);
        assert_eq!(echo_line(&payload), Err(CycleError::LineOverflow));
    }
}
