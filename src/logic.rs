//! Business logic layer (hardware-independent)

use core::fmt::Write;

use heapless::String;
use log::{debug, warn};

use crate::config::RunnerConfig;
use crate::error::{CapabilityError, CycleError};
use crate::format::{echo_line, monitor_lines, relay_line, Line};
use crate::model::{temperature_from_raw, DeviceId, Reading, Vitals};
use crate::traits::{
    AnalogInput, DigitalInput, DigitalOutput, Display, GpsReceiver, PeerLink, PulseOximeter,
    RandomSource, SerialPort,
};

/// The four data sources sampled every cycle
pub struct Sensors<P, G, H, T> {
    pub oximeter: P,
    pub gps: G,
    pub humidity: H,
    pub temperature: T,
}

/// Forwarding state of the relay variant
pub struct Relay<L> {
    link: L,
    device_id: DeviceId,
    channel: u8,
    baud: String<10>,
}

impl<L: PeerLink> Relay<L> {
    /// Draws the device id. This is the only draw for the life of the relay.
    pub fn new<R: RandomSource>(link: L, rng: &mut R, config: &RunnerConfig) -> Self {
        Self {
            link,
            device_id: DeviceId::generate(rng),
            channel: config.peer_channel,
            baud: config.baud_text(),
        }
    }

    pub fn device_id(&self) -> DeviceId {
        self.device_id
    }

    pub fn link(&self) -> &L {
        &self.link
    }
}

/// Where a cycle's output goes
pub enum Route<L> {
    Monitor,
    Relay(Relay<L>),
}

/// Outcome of one successful cycle
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    /// 1 for the first cycle, wrapping
    pub cycle: u32,
    /// Primary channel state sampled at the start of the cycle
    pub available: bool,
    /// Relay only: the peer accepted the payload
    pub forwarded: bool,
    pub reading: Reading,
}

/// Owns every capability the cycle touches
pub struct CycleRunner<P, G, H, T, I, S, L> {
    sensors: Sensors<P, G, H, T>,
    indicator: I,
    serial: S,
    route: Route<L>,
    cycles: u32,
}

impl<P, G, H, T, I, S, L> CycleRunner<P, G, H, T, I, S, L>
where
    P: PulseOximeter,
    G: GpsReceiver,
    H: DigitalInput,
    T: AnalogInput,
    I: DigitalOutput,
    S: SerialPort,
    L: PeerLink,
{
    pub fn new(sensors: Sensors<P, G, H, T>, indicator: I, serial: S, route: Route<L>) -> Self {
        Self {
            sensors,
            indicator,
            serial,
            route,
            cycles: 0,
        }
    }

    /// Sample, format and transmit once.
    ///
    /// The reading is rebuilt from scratch; only the device id survives
    /// between cycles. A failed sensor, indicator or peer is logged and the
    /// affected field reads `No data`. Only a failure to write the local
    /// output, or a line too long for its buffer, ends the cycle with an error.
    pub fn run_cycle(&mut self) -> Result<CycleReport, CycleError> {
        self.cycles = self.cycles.wrapping_add(1);

        let available = self.serial.available();
        if let Err(e) = self.indicator.set_level(available) {
            warn!("cycle {}: indicator: {}", self.cycles, e);
        }

        let vitals = if available && self.sensors.oximeter.begin() {
            Some(Vitals {
                spo2: self.sensors.oximeter.read_spo2(),
                heart_rate: self.sensors.oximeter.read_heart_rate(),
            })
        } else {
            None
        };

        let gps = if available {
            Some(self.sensors.gps.read())
        } else {
            None
        };

        let humidity_raw = match self.sensors.humidity.is_high() {
            Ok(high) => Some(if high { 1.0 } else { 0.0 }),
            Err(e) => {
                warn!("cycle {}: humidity: {}", self.cycles, e);
                None
            }
        };
        let temperature_c = match self.sensors.temperature.read_raw() {
            Ok(raw) => Some(temperature_from_raw(raw)),
            Err(e) => {
                warn!("cycle {}: temperature: {}", self.cycles, e);
                None
            }
        };

        debug!(
            "cycle {}: available={} vitals={} gps={}",
            self.cycles,
            available,
            vitals.is_some(),
            gps.is_some()
        );

        let reading = Reading {
            device_id: self.device_id(),
            humidity_raw,
            temperature_c,
            vitals,
            gps,
        };

        let forwarded = self.transmit(&reading, available)?;

        Ok(CycleReport {
            cycle: self.cycles,
            available,
            forwarded,
            reading,
        })
    }

    /// Returns whether the peer took the payload. The local echo is written
    /// either way.
    fn transmit(&mut self, reading: &Reading, available: bool) -> Result<bool, CycleError> {
        match &mut self.route {
            Route::Monitor => {
                for line in monitor_lines(reading, available)? {
                    self.serial.write_line(&line)?;
                }
                Ok(false)
            }
            Route::Relay(relay) => {
                let payload: Line = relay_line(relay.device_id, reading)?;
                let sent = relay.link.send_message(relay.channel, &payload, &relay.baud);
                let forwarded = match sent {
                    Ok(()) => true,
                    Err(e) => {
                        warn!("cycle {}: forward to peer {}: {}", self.cycles, relay.channel, e);
                        false
                    }
                };

                self.serial.write_line("")?;
                self.serial.write_line(&echo_line(&payload)?)?;
                self.serial.write_line("")?;
                Ok(forwarded)
            }
        }
    }

    pub fn device_id(&self) -> Option<DeviceId> {
        match &self.route {
            Route::Monitor => None,
            Route::Relay(relay) => Some(relay.device_id),
        }
    }

    pub fn cycles(&self) -> u32 {
        self.cycles
    }

    pub fn sensors(&self) -> &Sensors<P, G, H, T> {
        &self.sensors
    }

    pub fn indicator(&self) -> &I {
        &self.indicator
    }

    pub fn serial(&self) -> &S {
        &self.serial
    }

    pub fn serial_mut(&mut self) -> &mut S {
        &mut self.serial
    }

    pub fn route(&self) -> &Route<L> {
        &self.route
    }
}

/// Show a cycle's reading on a status display
pub fn render_reading<D: Display>(
    display: &mut D,
    reading: &Reading,
) -> Result<(), CapabilityError> {
    display.clear()?;

    let mut env_str = String::<32>::new();
    let _ = match reading.temperature_c {
        Some(temp) => write!(env_str, "T:{:.1}C", temp),
        None => write!(env_str, "T:--"),
    };
    let _ = match reading.humidity_raw {
        Some(humidity) => write!(env_str, " H:{:.0}", humidity),
        None => write!(env_str, " H:-"),
    };
    display.draw_text(env_str.as_str(), 0, 0)?;

    match &reading.vitals {
        Some(vitals) => {
            let mut vitals_str = String::<32>::new();
            let _ = write!(vitals_str, "SpO2:{} HR:{}", vitals.spo2, vitals.heart_rate);
            display.draw_text(vitals_str.as_str(), 0, 12)?;
        }
        None => display.draw_text("No vitals", 0, 12)?,
    }

    let gps_status = if reading.gps.is_some() { "GPS: yes" } else { "GPS: no" };
    display.draw_text(gps_status, 0, 24)?;

    if let Some(id) = reading.device_id {
        let mut id_str = String::<32>::new();
        let _ = write!(id_str, "ID:{}", id);
        display.draw_text(id_str.as_str(), 0, 36)?;
    }

    display.update()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BAUD_RATE, PEER_CHANNEL};
    use crate::format::ECHO_PREFIX;
    use crate::mock::{
        MockAnalog, MockDisplay, MockGps, MockInput, MockOutput, MockOximeter, MockPeer,
        MockSerial, SequenceRng,
    };

    type MockRunner =
        CycleRunner<MockOximeter, MockGps, MockInput, MockAnalog, MockOutput, MockSerial, MockPeer>;

    fn sensors(
        oximeter_ready: bool,
        humidity_high: bool,
        raw: u16,
    ) -> Sensors<MockOximeter, MockGps, MockInput, MockAnalog> {
        Sensors {
            oximeter: MockOximeter::new(oximeter_ready, "97", "72"),
            gps: MockGps::new("$GPGGA,123519"),
            humidity: MockInput::new(humidity_high),
            temperature: MockAnalog::new(raw),
        }
    }

    fn monitor(available: bool, oximeter_ready: bool) -> MockRunner {
        CycleRunner::new(
            sensors(oximeter_ready, true, 1023),
            MockOutput::default(),
            MockSerial::new(available),
            Route::Monitor,
        )
    }

    fn relay(available: bool, oximeter_ready: bool, rng: &mut SequenceRng<'_>) -> MockRunner {
        let relay = Relay::new(MockPeer::default(), rng, &RunnerConfig::DEFAULT);
        CycleRunner::new(
            sensors(oximeter_ready, true, 1023),
            MockOutput::default(),
            MockSerial::new(available),
            Route::Relay(relay),
        )
    }

    fn peer(runner: &MockRunner) -> &MockPeer {
        match runner.route() {
            Route::Relay(relay) => relay.link(),
            Route::Monitor => panic!("runner is not relaying"),
        }
    }

    fn serial_lines(runner: &MockRunner) -> std::vec::Vec<&str> {
        runner.serial().lines.iter().map(|l| l.as_str()).collect()
    }

    #[test]
    fn unavailable_input_still_reports_environment() {
        let mut runner = monitor(false, true);
        let report = runner.run_cycle().unwrap();

        assert!(!report.available);
        assert_eq!(runner.indicator().level, Some(false));
        assert_eq!(report.reading.vitals, None);
        assert_eq!(report.reading.gps, None);
        assert_eq!(report.reading.humidity_raw, Some(1.0));
        assert_eq!(report.reading.temperature_c, Some(500.0));
        assert_eq!(
            serial_lines(&runner),
            ["No data", "No data", "Humidity: 1.00", "temperature: 500.000000", ""]
        );
    }

    #[test]
    fn unavailable_input_never_touches_oximeter_or_gps() {
        let mut runner = monitor(false, true);
        runner.run_cycle().unwrap();

        assert_eq!(runner.sensors().oximeter.begin_calls, 0);
        assert_eq!(runner.sensors().gps.reads, 0);
    }

    #[test]
    fn available_input_drives_indicator_high() {
        let mut runner = monitor(true, true);
        let report = runner.run_cycle().unwrap();

        assert_eq!(runner.indicator().level, Some(true));
        let vitals = report.reading.vitals.unwrap();
        assert_eq!(vitals.spo2.as_str(), "97");
        assert_eq!(vitals.heart_rate.as_str(), "72");
        assert_eq!(
            serial_lines(&runner),
            [
                "Oxygen percentage: 97; Heart rate: 72",
                "GPS Data: $GPGGA,123519",
                "Humidity: 1.00",
                "temperature: 500.000000",
                "",
            ]
        );
    }

    #[test]
    fn failed_oximeter_start_omits_vitals() {
        let mut runner = monitor(true, false);
        let report = runner.run_cycle().unwrap();

        assert_eq!(report.reading.vitals, None);
        assert!(report.reading.gps.is_some());
        assert_eq!(runner.sensors().oximeter.begin_calls, 1);
        assert!(serial_lines(&runner).iter().all(|l| !l.contains("Oxygen")));
    }

    #[test]
    fn failed_oximeter_start_omits_vitals_in_relay() {
        let mut rng = SequenceRng::new(&[5]);
        let mut runner = relay(true, false, &mut rng);
        runner.run_cycle().unwrap();

        let payload = peer(&runner).sent[0].payload.as_str();
        assert!(payload.contains("| GPS: $GPGGA,123519"));
        assert!(!payload.contains("sp02"));
        assert!(!payload.contains("Heart Rate"));
    }

    #[test]
    fn half_scale_temperature() {
        let mut runner = CycleRunner::new(
            sensors(true, false, 512),
            MockOutput::default(),
            MockSerial::new(false),
            Route::<MockPeer>::Monitor,
        );
        let report = runner.run_cycle().unwrap();

        let temp = report.reading.temperature_c.unwrap();
        assert!((temp - 250.24).abs() < 0.01);
        assert_eq!(report.reading.humidity_raw, Some(0.0));
    }

    #[test]
    fn device_id_is_drawn_once_per_run() {
        let mut rng = SequenceRng::new(&[1804289383, 846930886, 1681692777]);
        let mut runner = relay(true, true, &mut rng);

        for _ in 0..3 {
            let report = runner.run_cycle().unwrap();
            assert_eq!(report.reading.device_id.map(|id| id.value()), Some(1804289383));
        }

        assert_eq!(rng.draws, 1);
        let peer = peer(&runner);
        assert_eq!(peer.sent.len(), 3);
        assert!(
            peer.sent
                .iter()
                .all(|m| m.payload.starts_with("|| Arduino ID: 1804289383 |"))
        );
    }

    #[test]
    fn forwarded_payload_matches_local_echo() {
        let mut rng = SequenceRng::new(&[99]);
        let mut runner = relay(true, true, &mut rng);
        runner.run_cycle().unwrap();

        let sent = &peer(&runner).sent[0];
        assert_eq!(sent.channel, PEER_CHANNEL);
        assert_eq!(sent.baud.as_str(), "9600");
        assert_eq!(BAUD_RATE, 9_600);

        let lines = serial_lines(&runner);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "");
        assert_eq!(lines[2], "");
        let echoed = lines[1].strip_prefix(ECHO_PREFIX).unwrap();
        assert_eq!(echoed.as_bytes(), sent.payload.as_bytes());
        assert_eq!(
            echoed,
            "|| Arduino ID: 99 | Humidity: 1.000000 | Temp: 500.000000 | GPS: $GPGGA,123519 | sp02: 97 | Heart Rate: 72"
        );
    }

    #[test]
    fn relay_without_input_sends_fresh_environment_line() {
        let mut rng = SequenceRng::new(&[3]);
        let mut runner = relay(true, true, &mut rng);
        runner.run_cycle().unwrap();

        runner.serial_mut().input_available = false;
        runner.serial_mut().clear();
        runner.run_cycle().unwrap();

        let peer = peer(&runner);
        assert_eq!(
            peer.sent[1].payload.as_str(),
            "|| Arduino ID: 3 | Humidity: 1.000000 | Temp: 500.000000"
        );
        assert_eq!(runner.indicator().level, Some(false));
    }

    fn failing_sensors() -> Sensors<MockOximeter, MockGps, MockInput, MockAnalog> {
        Sensors {
            oximeter: MockOximeter::new(true, "97", "72"),
            gps: MockGps::new("fix"),
            humidity: MockInput::failing(),
            temperature: MockAnalog::failing(),
        }
    }

    #[test]
    fn failed_pin_reads_still_print_monitor_lines() {
        let mut runner = CycleRunner::new(
            failing_sensors(),
            MockOutput::default(),
            MockSerial::new(true),
            Route::<MockPeer>::Monitor,
        );

        let report = runner.run_cycle().unwrap();
        assert_eq!(report.reading.humidity_raw, None);
        assert_eq!(report.reading.temperature_c, None);
        assert!(report.reading.vitals.is_some());
        assert_eq!(
            serial_lines(&runner),
            [
                "Oxygen percentage: 97; Heart rate: 72",
                "GPS Data: fix",
                "Humidity: No data",
                "temperature: No data",
                "",
            ]
        );
    }

    #[test]
    fn failed_pin_reads_still_forward_payload() {
        let mut rng = SequenceRng::new(&[8]);
        let relay = Relay::new(MockPeer::default(), &mut rng, &RunnerConfig::DEFAULT);
        let mut runner = CycleRunner::new(
            failing_sensors(),
            MockOutput::default(),
            MockSerial::new(true),
            Route::Relay(relay),
        );

        let report = runner.run_cycle().unwrap();
        assert!(report.forwarded);
        let expected = "|| Arduino ID: 8 | Humidity: No data | Temp: No data | GPS: fix | sp02: 97 | Heart Rate: 72";
        assert_eq!(peer(&runner).sent[0].payload.as_str(), expected);
        let lines = serial_lines(&runner);
        assert_eq!(lines[1].strip_prefix(ECHO_PREFIX), Some(expected));
    }

    #[test]
    fn rejected_forward_is_still_echoed_locally() {
        let mut rng = SequenceRng::new(&[21]);
        let relay = Relay::new(MockPeer::failing(), &mut rng, &RunnerConfig::DEFAULT);
        let mut runner = CycleRunner::new(
            sensors(true, true, 1023),
            MockOutput::default(),
            MockSerial::new(false),
            Route::Relay(relay),
        );

        let report = runner.run_cycle().unwrap();
        assert!(!report.forwarded);
        assert!(peer(&runner).sent.is_empty());
        assert_eq!(
            serial_lines(&runner),
            [
                "",
                "Printed by sender: || Arduino ID: 21 | Humidity: 1.000000 | Temp: 500.000000",
                "",
            ]
        );
    }

    #[test]
    fn full_local_output_fails_the_cycle() {
        let mut runner = monitor(false, false);
        for _ in 0..2 {
            runner.run_cycle().unwrap();
        }
        // Five lines per cycle; the third cycle overflows the 12-line buffer
        let err = runner.run_cycle().unwrap_err();
        assert_eq!(err, CycleError::Capability(CapabilityError::SerialWrite));
    }

    #[test]
    fn cycle_counter_advances() {
        let mut runner = monitor(false, false);
        assert_eq!(runner.run_cycle().unwrap().cycle, 1);
        runner.serial_mut().clear();
        assert_eq!(runner.run_cycle().unwrap().cycle, 2);
        assert_eq!(runner.cycles(), 2);
    }

    #[test]
    fn display_shows_vitals_and_id() {
        let mut rng = SequenceRng::new(&[12]);
        let mut runner = relay(true, true, &mut rng);
        let report = runner.run_cycle().unwrap();

        let mut display = MockDisplay::default();
        render_reading(&mut display, &report.reading).unwrap();

        let texts: std::vec::Vec<&str> = display.drawn.iter().map(|d| d.text.as_str()).collect();
        assert_eq!(texts, ["T:500.0C H:1", "SpO2:97 HR:72", "GPS: yes", "ID:12"]);
        assert_eq!(display.clears, 1);
        assert_eq!(display.updates, 1);
    }

    #[test]
    fn display_without_vitals() {
        let mut runner = monitor(false, true);
        let report = runner.run_cycle().unwrap();

        let mut display = MockDisplay::default();
        render_reading(&mut display, &report.reading).unwrap();

        let texts: std::vec::Vec<&str> = display.drawn.iter().map(|d| d.text.as_str()).collect();
        assert_eq!(texts, ["T:500.0C H:1", "No vitals", "GPS: no"]);
    }

    #[test]
    fn display_marks_failed_reads() {
        let mut runner = CycleRunner::new(
            failing_sensors(),
            MockOutput::default(),
            MockSerial::new(false),
            Route::<MockPeer>::Monitor,
        );
        let report = runner.run_cycle().unwrap();

        let mut display = MockDisplay::default();
        render_reading(&mut display, &report.reading).unwrap();
        assert_eq!(display.drawn[0].text.as_str(), "T:-- H:-");
    }
}
