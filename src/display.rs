use embedded_graphics::{
    mono_font::{MonoTextStyle, MonoTextStyleBuilder, ascii::FONT_6X10},
    pixelcolor::BinaryColor,
    prelude::*,
    text::{Baseline, Text},
};
use esp_hal::{
    Blocking,
    gpio::AnyPin,
    i2c::master::{Config as I2cConfig, I2c},
    peripherals::I2C0,
    time::Rate,
};
use ssd1306::{I2CDisplayInterface, Ssd1306, mode::BufferedGraphicsMode, prelude::*};

use crate::error::CapabilityError;
use crate::traits::Display;

type Panel<'a> = Ssd1306<
    I2CInterface<I2c<'a, Blocking>>,
    DisplaySize128x64,
    BufferedGraphicsMode<DisplaySize128x64>,
>;

/// 128x64 SSD1306 on I2C0 mirroring the latest reading
pub struct StatusDisplay<'a> {
    panel: Panel<'a>,
    style: MonoTextStyle<'static, BinaryColor>,
}

impl<'a> StatusDisplay<'a> {
    pub fn new<SDA, SCL>(i2c_periph: I2C0<'a>, sda: SDA, scl: SCL) -> Result<Self, &'static str>
    where
        SDA: Into<AnyPin<'a>>,
        SCL: Into<AnyPin<'a>>,
    {
        let i2c = I2c::new(
            i2c_periph,
            I2cConfig::default().with_frequency(Rate::from_khz(400)),
        )
        .map_err(|_| "I2C0 config rejected")?
        .with_sda(sda.into())
        .with_scl(scl.into());

        let interface = I2CDisplayInterface::new(i2c);
        let panel = Ssd1306::new(interface, DisplaySize128x64, DisplayRotation::Rotate0)
            .into_buffered_graphics_mode();

        let style = MonoTextStyleBuilder::new()
            .font(&FONT_6X10)
            .text_color(BinaryColor::On)
            .build();

        Ok(Self { panel, style })
    }
}

impl Display for StatusDisplay<'_> {
    fn init(&mut self) -> Result<(), CapabilityError> {
        self.panel
            .init()
            .map_err(|_| CapabilityError::Display("SSD1306 init failed"))
    }

    fn clear(&mut self) -> Result<(), CapabilityError> {
        self.panel.clear_buffer();
        Ok(())
    }

    fn draw_text(&mut self, text: &str, x: i32, y: i32) -> Result<(), CapabilityError> {
        Text::with_baseline(text, Point::new(x, y), self.style, Baseline::Top)
            .draw(&mut self.panel)
            .map(|_| ())
            .map_err(|_| CapabilityError::Display("Failed to draw text"))
    }

    fn update(&mut self) -> Result<(), CapabilityError> {
        self.panel
            .flush()
            .map_err(|_| CapabilityError::Display("SSD1306 flush failed"))
    }
}
