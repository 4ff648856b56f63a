//! Capabilities with canned responses.
//!
//! Used by the host unit tests and by the on-device test runner, so they stay
//! `no_std` and allocation free.

use heapless::{String, Vec};

use crate::error::CapabilityError;
use crate::format::Line;
use crate::model::{GpsText, VitalText};
use crate::traits::{
    AnalogInput, DigitalInput, DigitalOutput, Display, GpsReceiver, PeerLink, PulseOximeter,
    RandomSource, SerialPort,
};

fn copy_str<const N: usize>(text: &str) -> String<N> {
    let mut out = String::new();
    for c in text.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

pub struct MockOximeter {
    pub ready: bool,
    pub spo2: &'static str,
    pub heart_rate: &'static str,
    pub begin_calls: u32,
}

impl MockOximeter {
    pub fn new(ready: bool, spo2: &'static str, heart_rate: &'static str) -> Self {
        Self {
            ready,
            spo2,
            heart_rate,
            begin_calls: 0,
        }
    }
}

impl PulseOximeter for MockOximeter {
    fn begin(&mut self) -> bool {
        self.begin_calls += 1;
        self.ready
    }

    fn read_spo2(&mut self) -> VitalText {
        copy_str(self.spo2)
    }

    fn read_heart_rate(&mut self) -> VitalText {
        copy_str(self.heart_rate)
    }
}

pub struct MockGps {
    pub text: &'static str,
    pub reads: u32,
}

impl MockGps {
    pub fn new(text: &'static str) -> Self {
        Self { text, reads: 0 }
    }
}

impl GpsReceiver for MockGps {
    fn read(&mut self) -> GpsText {
        self.reads += 1;
        copy_str(self.text)
    }
}

/// Digital input fixed at one level, or failing every read
pub struct MockInput {
    pub high: bool,
    pub fail: bool,
}

impl MockInput {
    pub fn new(high: bool) -> Self {
        Self { high, fail: false }
    }

    pub fn failing() -> Self {
        Self {
            high: false,
            fail: true,
        }
    }
}

impl DigitalInput for MockInput {
    fn is_high(&mut self) -> Result<bool, CapabilityError> {
        if self.fail {
            Err(CapabilityError::PinRead)
        } else {
            Ok(self.high)
        }
    }
}

/// Output pin remembering the last level written
#[derive(Default)]
pub struct MockOutput {
    pub level: Option<bool>,
    pub writes: u32,
}

impl DigitalOutput for MockOutput {
    fn set_level(&mut self, high: bool) -> Result<(), CapabilityError> {
        self.level = Some(high);
        self.writes += 1;
        Ok(())
    }
}

pub struct MockAnalog {
    pub raw: u16,
    pub fail: bool,
}

impl MockAnalog {
    pub fn new(raw: u16) -> Self {
        Self { raw, fail: false }
    }

    pub fn failing() -> Self {
        Self { raw: 0, fail: true }
    }
}

impl AnalogInput for MockAnalog {
    fn read_raw(&mut self) -> Result<u16, CapabilityError> {
        if self.fail {
            Err(CapabilityError::AdcRead)
        } else {
            Ok(self.raw)
        }
    }
}

pub const MOCK_SERIAL_LINES: usize = 12;

/// Serial channel that records every line written to it
pub struct MockSerial {
    pub input_available: bool,
    pub lines: Vec<Line, MOCK_SERIAL_LINES>,
}

impl MockSerial {
    pub fn new(input_available: bool) -> Self {
        Self {
            input_available,
            lines: Vec::new(),
        }
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

impl SerialPort for MockSerial {
    fn available(&mut self) -> bool {
        self.input_available
    }

    fn write_line(&mut self, line: &str) -> Result<(), CapabilityError> {
        self.lines
            .push(copy_str(line))
            .map_err(|_| CapabilityError::SerialWrite)
    }
}

pub struct SentMessage {
    pub channel: u8,
    pub payload: Line,
    pub baud: String<10>,
}

pub const MOCK_PEER_MESSAGES: usize = 8;

/// Peer link that records what was forwarded, or rejects every send
#[derive(Default)]
pub struct MockPeer {
    pub sent: Vec<SentMessage, MOCK_PEER_MESSAGES>,
    pub fail: bool,
}

impl MockPeer {
    pub fn failing() -> Self {
        Self {
            sent: Vec::new(),
            fail: true,
        }
    }
}

impl PeerLink for MockPeer {
    fn send_message(
        &mut self,
        channel: u8,
        payload: &str,
        baud: &str,
    ) -> Result<(), CapabilityError> {
        if self.fail {
            return Err(CapabilityError::PeerSend);
        }
        let message = SentMessage {
            channel,
            payload: copy_str(payload),
            baud: copy_str(baud),
        };
        self.sent
            .push(message)
            .map_err(|_| CapabilityError::PeerSend)
    }
}

/// Random source replaying a fixed sequence, counting draws
pub struct SequenceRng<'a> {
    values: &'a [u32],
    pub draws: usize,
}

impl<'a> SequenceRng<'a> {
    pub fn new(values: &'a [u32]) -> Self {
        Self { values, draws: 0 }
    }
}

impl RandomSource for SequenceRng<'_> {
    fn next_u32(&mut self) -> u32 {
        let value = if self.values.is_empty() {
            0
        } else {
            self.values[self.draws % self.values.len()]
        };
        self.draws += 1;
        value
    }
}

pub struct DrawnText {
    pub text: String<32>,
    pub x: i32,
    pub y: i32,
}

/// Display keeping the text drawn since the last clear
#[derive(Default)]
pub struct MockDisplay {
    pub drawn: Vec<DrawnText, 8>,
    pub clears: u32,
    pub updates: u32,
}

impl Display for MockDisplay {
    fn init(&mut self) -> Result<(), CapabilityError> {
        Ok(())
    }

    fn clear(&mut self) -> Result<(), CapabilityError> {
        self.drawn.clear();
        self.clears += 1;
        Ok(())
    }

    fn draw_text(&mut self, text: &str, x: i32, y: i32) -> Result<(), CapabilityError> {
        let entry = DrawnText {
            text: copy_str(text),
            x,
            y,
        };
        self.drawn
            .push(entry)
            .map_err(|_| CapabilityError::Display("mock display full"))
    }

    fn update(&mut self) -> Result<(), CapabilityError> {
        self.updates += 1;
        Ok(())
    }
}
