#![no_std]
#![no_main]

use core::panic::PanicInfo;
use embassy_executor::Spawner;
use embassy_time::{Duration, Instant, Timer};
use esp_backtrace as _;
use esp_hal::{delay::Delay, timer::timg::TimerGroup};

use vitals_node::{
    config::{RunnerConfig, Variant},
    display::StatusDisplay,
    hardware::{self, HumidityHardware, IndicatorHardware, OximeterHardware, RngHardware},
    logic::{CycleRunner, Relay, Route, Sensors, render_reading},
    schedule::CycleSchedule,
    traits::Display,
};

// Pin assignment (ESP32-S3):
// GPIO4          - pulse oximeter signal, input
// GPIO5          - indicator LED, output
// GPIO1          - temperature sensor, ADC1 channel 0
// GPIO7          - humidity sensor, digital input
// GPIO44/GPIO43  - UART0 RX/TX, serial monitor
// GPIO18         - UART1 RX, GPS receiver
// GPIO17         - UART1 TX, peer link
// GPIO16         - UART2 RX, pulse oximeter module
// GPIO8/GPIO9    - I2C0 SDA/SCL, SSD1306 status display
//
// Choose the output variant here: Variant::Monitor or Variant::Relay
const CONFIG: RunnerConfig = RunnerConfig::DEFAULT.with_variant(Variant::Relay);

// Set to false when no SSD1306 is fitted
const STATUS_DISPLAY: bool = true;

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    esp_println::println!("[PANIC] {:?}", info);
    let delay = Delay::new();
    loop {
        delay.delay_millis(1_000);
        esp_println::println!("[PANIC] continue...");
    }
}

esp_bootloader_esp_idf::esp_app_desc!();

async fn halt(reason: &str) -> ! {
    esp_println::println!("[ERROR] {}", reason);
    loop {
        Timer::after(Duration::from_secs(1)).await;
    }
}

#[esp_rtos::main]
async fn main(_spawner: Spawner) {
    esp_println::logger::init_logger_from_env();
    let peripherals = esp_hal::init(esp_hal::Config::default());

    esp_alloc::heap_allocator!(size: 32 * 1024);

    esp_println::println!("=== Vitals Node ===");

    // Initialize RTOS timer for embassy
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    let serial = match hardware::PrimarySerial::new(
        peripherals.UART0,
        peripherals.GPIO44,
        peripherals.GPIO43,
        CONFIG.baud,
    ) {
        Ok(serial) => serial,
        Err(e) => halt(e).await,
    };

    let (gps, peer) = match hardware::split_gps_peer(
        peripherals.UART1,
        peripherals.GPIO18,
        peripherals.GPIO17,
        CONFIG.baud,
        CONFIG.peer_channel,
    ) {
        Ok(pair) => pair,
        Err(e) => halt(e).await,
    };

    let oximeter = match OximeterHardware::new(
        peripherals.UART2,
        peripherals.GPIO16,
        peripherals.GPIO4,
        CONFIG.baud,
    ) {
        Ok(oximeter) => oximeter,
        Err(e) => halt(e).await,
    };

    let sensors = Sensors {
        oximeter,
        gps,
        humidity: HumidityHardware::new(peripherals.GPIO7),
        temperature: hardware::TemperatureHardware::new(peripherals.ADC1, peripherals.GPIO1),
    };
    let indicator = IndicatorHardware::new(peripherals.GPIO5);

    let route = match CONFIG.variant {
        Variant::Monitor => Route::Monitor,
        Variant::Relay => {
            let mut rng = RngHardware::new();
            let relay = Relay::new(peer, &mut rng, &CONFIG);
            esp_println::println!("[RELAY] Device ID: {}", relay.device_id());
            Route::Relay(relay)
        }
    };

    let mut display = if STATUS_DISPLAY {
        match StatusDisplay::new(peripherals.I2C0, peripherals.GPIO8, peripherals.GPIO9) {
            Ok(mut display) => match display.init() {
                Ok(()) => Some(display),
                Err(e) => {
                    esp_println::println!("[DISPLAY] {} - continuing without display", e);
                    None
                }
            },
            Err(e) => {
                esp_println::println!("[DISPLAY] {} - continuing without display", e);
                None
            }
        }
    } else {
        None
    };

    let mut runner = CycleRunner::new(sensors, indicator, serial, route);
    let mut schedule = CycleSchedule::new(Instant::now().as_millis(), CONFIG.period_ms);

    esp_println::println!(
        "[CYCLE] {:?} variant, every {} ms at {} baud",
        CONFIG.variant,
        schedule.period_ms(),
        CONFIG.baud
    );

    loop {
        log::debug!("[CYCLE] scheduled start {} ms", schedule.deadline_ms());
        match runner.run_cycle() {
            Ok(report) => {
                if let Some(display) = display.as_mut() {
                    if let Err(e) = render_reading(display, &report.reading) {
                        log::warn!("[DISPLAY] cycle {}: {}", report.cycle, e);
                    }
                }
            }
            Err(e) => esp_println::println!("[CYCLE] {} failed: {}", runner.cycles(), e),
        }

        let deadline = schedule.next_deadline(Instant::now().as_millis());
        Timer::at(Instant::from_millis(deadline)).await;
    }
}
