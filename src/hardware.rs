use core::fmt::Write;

use esp_hal::Blocking;
use esp_hal::analog::adc::{Adc, AdcConfig, AdcPin, Attenuation};
use esp_hal::gpio::{AnyPin, Input, InputConfig, Level, Output, OutputConfig};
use esp_hal::peripherals::{ADC1, GPIO1, UART0, UART1, UART2};
use esp_hal::rng::Rng;
use esp_hal::uart::{Config as UartConfig, RxError, Uart, UartRx, UartTx};

use crate::error::CapabilityError;
use crate::framing::{OximeterPacket, PacketAssembler, SentenceAssembler};
use crate::model::{GpsText, VitalText};
use crate::traits::{
    AnalogInput, DigitalInput, DigitalOutput, GpsReceiver, PeerLink, PulseOximeter, RandomSource,
    SerialPort,
};

const ADC_READ_ATTEMPTS: u32 = 1_000;
const RX_CHUNK: usize = 64;

fn uart_config(baud: u32) -> UartConfig {
    UartConfig::default().with_baudrate(baud)
}

fn write_all(tx: &mut UartTx<'_, Blocking>, mut bytes: &[u8]) -> Result<(), ()> {
    while !bytes.is_empty() {
        let written = tx.write(bytes).map_err(|_| ())?;
        bytes = &bytes[written..];
    }
    tx.flush().map_err(|_| ())
}

/// Drain everything the RX FIFO holds, handing each byte to `sink`.
/// Returns the number of bytes drained.
fn drain_rx(rx: &mut UartRx<'_, Blocking>, mut sink: impl FnMut(u8)) -> Result<usize, RxError> {
    let mut total = 0;
    let mut buf = [0u8; RX_CHUNK];
    loop {
        let n = rx.read_buffered(&mut buf)?;
        if n == 0 {
            return Ok(total);
        }
        buf[..n].iter().copied().for_each(&mut sink);
        total += n;
    }
}

/// Monitor channel on UART0. Input is consumed when checked, so
/// `available` reports data that arrived since the previous check.
pub struct PrimarySerial<'a> {
    rx: UartRx<'a, Blocking>,
    tx: UartTx<'a, Blocking>,
}

impl<'a> PrimarySerial<'a> {
    pub fn new<RX, TX>(
        uart: UART0<'a>,
        rx_gpio: RX,
        tx_gpio: TX,
        baud: u32,
    ) -> Result<Self, &'static str>
    where
        RX: Into<AnyPin<'a>>,
        TX: Into<AnyPin<'a>>,
    {
        let uart = Uart::new(uart, uart_config(baud))
            .map_err(|_| "UART0 config rejected")?
            .with_rx(rx_gpio.into())
            .with_tx(tx_gpio.into());
        let (rx, tx) = uart.split();
        Ok(Self { rx, tx })
    }
}

impl SerialPort for PrimarySerial<'_> {
    fn available(&mut self) -> bool {
        matches!(drain_rx(&mut self.rx, |_| {}), Ok(n) if n > 0)
    }

    fn write_line(&mut self, line: &str) -> Result<(), CapabilityError> {
        write_all(&mut self.tx, line.as_bytes())
            .and_then(|_| write_all(&mut self.tx, b"\r\n"))
            .map_err(|_| CapabilityError::SerialWrite)
    }
}

/// UART1 carries the GPS receiver on RX and the peer link on TX.
/// Both sides run at the same baud rate.
pub fn split_gps_peer<'a, RX, TX>(
    uart: UART1<'a>,
    gps_rx_gpio: RX,
    peer_tx_gpio: TX,
    baud: u32,
    peer_channel: u8,
) -> Result<(GpsHardware<'a>, PeerHardware<'a>), &'static str>
where
    RX: Into<AnyPin<'a>>,
    TX: Into<AnyPin<'a>>,
{
    let uart = Uart::new(uart, uart_config(baud))
        .map_err(|_| "UART1 config rejected")?
        .with_rx(gps_rx_gpio.into())
        .with_tx(peer_tx_gpio.into());
    let (rx, tx) = uart.split();

    let gps = GpsHardware {
        rx,
        sentences: SentenceAssembler::new(),
    };
    let peer = PeerHardware {
        tx,
        channel: peer_channel,
        baud,
    };
    Ok((gps, peer))
}

/// NMEA receiver. Keeps the last complete sentence seen.
pub struct GpsHardware<'a> {
    rx: UartRx<'a, Blocking>,
    sentences: SentenceAssembler,
}

impl GpsReceiver for GpsHardware<'_> {
    fn read(&mut self) -> GpsText {
        let sentences = &mut self.sentences;
        let drained = drain_rx(&mut self.rx, |byte| {
            sentences.push(byte);
        });

        if let Err(e) = drained {
            log::warn!("[GPS] RX error: {:?}", e);
        }
        self.sentences.last().clone()
    }
}

/// Forwards lines to the peer on the TX half of UART1
pub struct PeerHardware<'a> {
    tx: UartTx<'a, Blocking>,
    channel: u8,
    baud: u32,
}

impl PeerLink for PeerHardware<'_> {
    fn send_message(
        &mut self,
        channel: u8,
        payload: &str,
        baud: &str,
    ) -> Result<(), CapabilityError> {
        let requested: u32 = baud.trim().parse().map_err(|_| CapabilityError::InvalidBaud)?;
        // The TX half shares its clock divider with the GPS receiver
        if requested != self.baud {
            return Err(CapabilityError::InvalidBaud);
        }
        if channel != self.channel {
            return Err(CapabilityError::PeerSend);
        }

        write_all(&mut self.tx, payload.as_bytes())
            .and_then(|_| write_all(&mut self.tx, b"\n"))
            .map_err(|_| CapabilityError::PeerSend)
    }
}

/// Pulse oximeter module streaming packets on UART2. The signal pin goes
/// high while the module is powered and a finger sensor is attached.
pub struct OximeterHardware<'a> {
    rx: UartRx<'a, Blocking>,
    signal: Input<'a>,
    packets: PacketAssembler,
    latest: Option<OximeterPacket>,
}

impl<'a> OximeterHardware<'a> {
    pub fn new<RX, SIG>(
        uart: UART2<'a>,
        rx_gpio: RX,
        signal_gpio: SIG,
        baud: u32,
    ) -> Result<Self, &'static str>
    where
        RX: Into<AnyPin<'a>>,
        SIG: Into<AnyPin<'a>>,
    {
        let rx = UartRx::new(uart, uart_config(baud))
            .map_err(|_| "UART2 config rejected")?
            .with_rx(rx_gpio.into());
        let signal = Input::new(signal_gpio.into(), InputConfig::default());

        Ok(Self {
            rx,
            signal,
            packets: PacketAssembler::new(),
            latest: None,
        })
    }
}

impl PulseOximeter for OximeterHardware<'_> {
    fn begin(&mut self) -> bool {
        self.latest = None;
        if !self.signal.is_high() {
            return false;
        }

        let packets = &mut self.packets;
        let latest = &mut self.latest;
        let drained = drain_rx(&mut self.rx, |byte| {
            if let Some(packet) = packets.push(byte) {
                *latest = Some(packet);
            }
        });

        if let Err(e) = drained {
            log::warn!("[OXIMETER] RX error: {:?}", e);
        }
        self.latest.is_some()
    }

    fn read_spo2(&mut self) -> VitalText {
        let mut text = VitalText::new();
        if let Some(packet) = self.latest {
            let _ = write!(text, "{}", packet.spo2);
        }
        text
    }

    fn read_heart_rate(&mut self) -> VitalText {
        let mut text = VitalText::new();
        if let Some(packet) = self.latest {
            let _ = write!(text, "{}", packet.pulse_rate);
        }
        text
    }
}

/// Digital humidity sensor output
pub struct HumidityHardware<'a> {
    pin: Input<'a>,
}

impl<'a> HumidityHardware<'a> {
    pub fn new<PIN: Into<AnyPin<'a>>>(gpio: PIN) -> Self {
        Self {
            pin: Input::new(gpio.into(), InputConfig::default()),
        }
    }
}

impl DigitalInput for HumidityHardware<'_> {
    fn is_high(&mut self) -> Result<bool, CapabilityError> {
        Ok(self.pin.is_high())
    }
}

/// LED showing whether the last cycle had input
pub struct IndicatorHardware<'a> {
    pin: Output<'a>,
}

impl<'a> IndicatorHardware<'a> {
    pub fn new<PIN: Into<AnyPin<'a>>>(gpio: PIN) -> Self {
        Self {
            pin: Output::new(gpio.into(), Level::Low, OutputConfig::default()),
        }
    }
}

impl DigitalOutput for IndicatorHardware<'_> {
    fn set_level(&mut self, high: bool) -> Result<(), CapabilityError> {
        self.pin.set_level(Level::from(high));
        Ok(())
    }
}

/// Analog temperature sensor on GPIO1 (ADC1 channel 0).
/// The 12-bit sample is reduced to the 10 bits the conversion expects.
pub struct TemperatureHardware<'a> {
    adc: Adc<'a, ADC1<'a>, Blocking>,
    pin: AdcPin<GPIO1<'a>, ADC1<'a>>,
}

impl<'a> TemperatureHardware<'a> {
    pub fn new(adc: ADC1<'a>, gpio: GPIO1<'a>) -> Self {
        let mut config = AdcConfig::new();
        let pin = config.enable_pin(gpio, Attenuation::_11dB);
        let adc = Adc::new(adc, config);
        Self { adc, pin }
    }
}

impl AnalogInput for TemperatureHardware<'_> {
    fn read_raw(&mut self) -> Result<u16, CapabilityError> {
        for _ in 0..ADC_READ_ATTEMPTS {
            if let Ok(sample) = self.adc.read_oneshot(&mut self.pin) {
                return Ok((sample >> 2).min(1023));
            }
        }
        Err(CapabilityError::AdcRead)
    }
}

/// Hardware random number generator
pub struct RngHardware {
    rng: Rng,
}

impl RngHardware {
    pub fn new() -> Self {
        Self { rng: Rng::new() }
    }
}

impl Default for RngHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomSource for RngHardware {
    fn next_u32(&mut self) -> u32 {
        self.rng.random()
    }
}
