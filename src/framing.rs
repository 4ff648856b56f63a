//! Byte-stream framing for the GPS and pulse-oximeter UARTs.
//!
//! Both assemblers are fed one byte at a time, so RX chunk boundaries do not
//! matter.

use heapless::Vec;

use crate::model::GpsText;

/// Collects NMEA sentences. Bytes outside a `$ ... \n` frame are dropped.
#[derive(Debug, Default)]
pub struct SentenceAssembler {
    partial: GpsText,
    open: bool,
    last: GpsText,
}

impl SentenceAssembler {
    pub const fn new() -> Self {
        Self {
            partial: GpsText::new(),
            open: false,
            last: GpsText::new(),
        }
    }

    /// Feed one byte. Returns true when it completed a sentence.
    pub fn push(&mut self, byte: u8) -> bool {
        match byte {
            b'$' => {
                self.partial.clear();
                let _ = self.partial.push('$');
                self.open = true;
            }
            _ if !self.open => {}
            b'\n' => {
                self.open = false;
                self.last = core::mem::take(&mut self.partial);
                return true;
            }
            b'\r' => {}
            _ => {
                // Overlong or binary: wait for the next '$'
                if !byte.is_ascii() || self.partial.push(byte as char).is_err() {
                    self.partial.clear();
                    self.open = false;
                }
            }
        }
        false
    }

    /// Last complete sentence, without its line ending. Empty before the first.
    pub fn last(&self) -> &GpsText {
        &self.last
    }
}

pub const OXIMETER_PACKET_LEN: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OximeterPacket {
    pub spo2: u8,
    pub pulse_rate: u8,
}

/// Decode one 5-byte oximeter module packet. Only the first byte has bit 7
/// set. `None` when the finger sensor is off or the module reports no value.
pub fn decode_oximeter_packet(bytes: &[u8; OXIMETER_PACKET_LEN]) -> Option<OximeterPacket> {
    if bytes[0] & 0x80 == 0 || bytes[1..].iter().any(|b| b & 0x80 != 0) {
        return None;
    }

    let sensor_off = bytes[0] & 0x20 != 0;
    let pulse_rate = ((bytes[2] & 0x40) << 1) | (bytes[3] & 0x7F);
    let spo2 = bytes[4] & 0x7F;

    if sensor_off || pulse_rate == 0xFF || spo2 == 0x7F {
        return None;
    }

    Some(OximeterPacket { spo2, pulse_rate })
}

/// Splits the oximeter stream into packets on the bit-7 sync byte
#[derive(Debug, Default)]
pub struct PacketAssembler {
    pending: Vec<u8, OXIMETER_PACKET_LEN>,
}

impl PacketAssembler {
    pub const fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    /// Feed one byte. Returns the packet it completed, if that packet holds a
    /// valid reading.
    pub fn push(&mut self, byte: u8) -> Option<OximeterPacket> {
        if byte & 0x80 != 0 {
            self.pending.clear();
        } else if self.pending.is_empty() {
            return None;
        }
        let _ = self.pending.push(byte);

        let packet = <[u8; OXIMETER_PACKET_LEN]>::try_from(self.pending.as_slice()).ok()?;
        self.pending.clear();
        decode_oximeter_packet(&packet)
    }
}
