#![no_std]
#![no_main]

use core::panic::PanicInfo;
use embassy_executor::Spawner;
use embassy_time::{Duration, Timer};
use esp_backtrace as _;
use esp_hal::{delay::Delay, timer::timg::TimerGroup};

use vitals_node::{
    config::RunnerConfig,
    display::StatusDisplay,
    format::ECHO_PREFIX,
    framing::{OximeterPacket, PacketAssembler, SentenceAssembler, decode_oximeter_packet},
    hardware::{HumidityHardware, RngHardware, TemperatureHardware},
    logic::{CycleRunner, Relay, Route, Sensors},
    mock::{
        MockAnalog, MockGps, MockInput, MockOutput, MockOximeter, MockPeer, MockSerial,
        SequenceRng,
    },
    model::temperature_from_raw,
    schedule::CycleSchedule,
    traits::{AnalogInput, DigitalInput, Display, RandomSource},
};

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    esp_println::println!("[PANIC] {:?}", info);
    let delay = Delay::new();
    loop {
        delay.delay_millis(1_000);
    }
}

esp_bootloader_esp_idf::esp_app_desc!();

// Test result tracking
struct TestResults {
    passed: u32,
    failed: u32,
    total: u32,
}

impl TestResults {
    fn new() -> Self {
        Self {
            passed: 0,
            failed: 0,
            total: 0,
        }
    }

    fn assert(&mut self, condition: bool, test_name: &str) {
        self.total += 1;
        if condition {
            self.passed += 1;
            esp_println::println!("  ✓ {}", test_name);
        } else {
            self.failed += 1;
            esp_println::println!("  ✗ {} FAILED", test_name);
        }
    }

    fn assert_eq<T: PartialEq + core::fmt::Debug>(&mut self, left: T, right: T, test_name: &str) {
        self.total += 1;
        if left == right {
            self.passed += 1;
            esp_println::println!("  ✓ {}", test_name);
        } else {
            self.failed += 1;
            esp_println::println!("  ✗ {} FAILED: {:?} != {:?}", test_name, left, right);
        }
    }

    fn assert_close(&mut self, value: f32, expected: f32, tolerance: f32, test_name: &str) {
        self.total += 1;
        if (value - expected).abs() < tolerance {
            self.passed += 1;
            esp_println::println!("  ✓ {}", test_name);
        } else {
            self.failed += 1;
            esp_println::println!(
                "  ✗ {} FAILED: {:.2} not close to {:.2} (tolerance: {:.2})",
                test_name,
                value,
                expected,
                tolerance
            );
        }
    }

    fn print_summary(&self) {
        esp_println::println!("\n==========================================");
        esp_println::println!("Test Summary:");
        esp_println::println!("  Total:  {}", self.total);
        esp_println::println!("  Passed: {}", self.passed);
        esp_println::println!("  Failed: {}", self.failed);
        if self.failed == 0 {
            esp_println::println!("\n✓ ALL TESTS PASSED!");
        } else {
            esp_println::println!("\n✗ SOME TESTS FAILED");
        }
        esp_println::println!("==========================================");
    }
}

type MockRunner =
    CycleRunner<MockOximeter, MockGps, MockInput, MockAnalog, MockOutput, MockSerial, MockPeer>;

fn mock_runner(available: bool, oximeter_ready: bool, route: Route<MockPeer>) -> MockRunner {
    CycleRunner::new(
        Sensors {
            oximeter: MockOximeter::new(oximeter_ready, "98", "64"),
            gps: MockGps::new("$GPGGA,092750.000"),
            humidity: MockInput::new(true),
            temperature: MockAnalog::new(512),
        },
        MockOutput::default(),
        MockSerial::new(available),
        route,
    )
}

fn test_cycle_logic(results: &mut TestResults) {
    esp_println::println!("\n[TEST] Cycle Logic Tests");

    // No input on the primary channel
    let mut runner = mock_runner(false, true, Route::Monitor);
    match runner.run_cycle() {
        Ok(report) => {
            results.assert_eq(runner.indicator().level, Some(false), "indicator low without input");
            results.assert(report.reading.vitals.is_none(), "no vitals without input");
            results.assert_close(
                report.reading.temperature_c.unwrap_or(f32::NAN),
                250.24,
                0.01,
                "temperature still sampled",
            );
            results.assert_eq(runner.serial().lines.len(), 5, "monitor prints five lines");
        }
        Err(_) => results.assert(false, "cycle without input"),
    }

    // Oximeter fails to start
    let mut runner = mock_runner(true, false, Route::Monitor);
    match runner.run_cycle() {
        Ok(report) => {
            results.assert(report.reading.vitals.is_none(), "failed begin omits vitals");
            results.assert(report.reading.gps.is_some(), "gps read with input");
            results.assert_eq(runner.indicator().level, Some(true), "indicator high with input");
        }
        Err(_) => results.assert(false, "cycle with failed oximeter"),
    }

    // Relay keeps one device id and echoes the payload verbatim
    let mut rng = SequenceRng::new(&[424242, 7, 8]);
    let relay = Relay::new(MockPeer::default(), &mut rng, &RunnerConfig::DEFAULT);
    let mut runner = mock_runner(true, true, Route::Relay(relay));
    let mut all_ok = true;
    for _ in 0..3 {
        runner.serial_mut().clear();
        all_ok &= runner.run_cycle().is_ok();
    }
    results.assert(all_ok, "three relay cycles");
    results.assert_eq(rng.draws, 1, "device id drawn once");

    if let Route::Relay(relay) = runner.route() {
        let sent = &relay.link().sent;
        results.assert_eq(sent.len(), 3, "three payloads forwarded");
        results.assert(
            sent.iter().all(|m| m.payload.starts_with("|| Arduino ID: 424242 |")),
            "same id in every payload",
        );
        let echoed = runner
            .serial()
            .lines
            .get(1)
            .and_then(|l| l.strip_prefix(ECHO_PREFIX));
        results.assert_eq(
            echoed,
            sent.last().map(|m| m.payload.as_str()),
            "echo matches forwarded payload",
        );
    } else {
        results.assert(false, "runner kept relay route");
    }

    // A failed humidity pin still yields a forwarded line
    let mut rng = SequenceRng::new(&[5]);
    let relay = Relay::new(MockPeer::default(), &mut rng, &RunnerConfig::DEFAULT);
    let mut runner = CycleRunner::new(
        Sensors {
            oximeter: MockOximeter::new(true, "98", "64"),
            gps: MockGps::new("$GPGGA,092750.000"),
            humidity: MockInput::failing(),
            temperature: MockAnalog::new(512),
        },
        MockOutput::default(),
        MockSerial::new(true),
        Route::Relay(relay),
    );
    match runner.run_cycle() {
        Ok(report) => {
            results.assert(report.forwarded, "failed pin still forwards");
            results.assert_eq(report.reading.humidity_raw, None, "failed pin reads as no data");
        }
        Err(_) => results.assert(false, "cycle with failed humidity pin"),
    }

    // Conversion and pacing
    results.assert_close(temperature_from_raw(512), 250.24, 0.01, "512 converts to 250.24");
    let mut schedule = CycleSchedule::new(0, 1_000);
    results.assert_eq(schedule.next_deadline(300), 1_000, "period ignores read time");
}

fn test_oximeter_packets(results: &mut TestResults) {
    esp_println::println!("\n[TEST] Oximeter Packet Tests");

    results.assert_eq(
        decode_oximeter_packet(&[0x85, 0x40, 0x00, 0x48, 0x61]),
        Some(OximeterPacket {
            spo2: 97,
            pulse_rate: 72,
        }),
        "decode plain packet",
    );
    results.assert_eq(
        decode_oximeter_packet(&[0x85, 0x40, 0x40, 0x0A, 0x60]),
        Some(OximeterPacket {
            spo2: 96,
            pulse_rate: 138,
        }),
        "decode pulse rate bit 7",
    );
    results.assert_eq(
        decode_oximeter_packet(&[0xA5, 0x40, 0x00, 0x48, 0x61]),
        None,
        "detached finger sensor rejected",
    );
    results.assert_eq(
        decode_oximeter_packet(&[0x85, 0x40, 0x00, 0x48, 0x7F]),
        None,
        "missing spo2 rejected",
    );
    results.assert_eq(
        decode_oximeter_packet(&[0x05, 0x40, 0x00, 0x48, 0x61]),
        None,
        "missing sync bit rejected",
    );

    // Packets split over two RX reads
    let mut packets = PacketAssembler::new();
    let first = [0x85, 0x40].iter().filter_map(|b| packets.push(*b)).count();
    let second = [0x00, 0x48, 0x61].iter().filter_map(|b| packets.push(*b)).count();
    results.assert_eq((first, second), (0, 1), "packet completes across reads");

    let mut sentences = SentenceAssembler::new();
    let done = b"*47\r\n$GPGSA,A,3\r\n".iter().filter(|b| sentences.push(**b)).count();
    results.assert_eq(done, 1, "leading gps fragment dropped");
    results.assert_eq(sentences.last().as_str(), "$GPGSA,A,3", "gps sentence kept");
}

async fn test_board_sensors(
    results: &mut TestResults,
    humidity: &mut HumidityHardware<'_>,
    temperature: &mut TemperatureHardware<'_>,
) {
    esp_println::println!("\n[TEST] Board Sensor Tests");

    results.assert(humidity.is_high().is_ok(), "humidity pin readable");

    esp_println::println!("  Reading temperature (5 samples)...");
    let mut samples = heapless::Vec::<u16, 5>::new();
    for i in 0..5 {
        Timer::after(Duration::from_millis(100)).await;
        match temperature.read_raw() {
            Ok(raw) => {
                esp_println::println!(
                    "    Sample {}: raw {} -> {:.2}°C",
                    i + 1,
                    raw,
                    temperature_from_raw(raw)
                );
                let _ = samples.push(raw);
            }
            Err(e) => esp_println::println!("    Failed to read temperature: {}", e),
        }
    }

    results.assert_eq(samples.len(), 5, "collected 5 temperature samples");
    results.assert(samples.iter().all(|raw| *raw <= 1023), "samples are 10-bit");

    let mut rng = RngHardware::new();
    results.assert(rng.next_u32() != rng.next_u32(), "rng values differ");
}

fn test_display(results: &mut TestResults, display: Result<StatusDisplay<'_>, &'static str>) {
    esp_println::println!("\n[TEST] Status Display Tests");

    match display {
        Ok(mut display) => {
            results.assert(display.init().is_ok(), "display init");
            results.assert(display.clear().is_ok(), "display clear");
            results.assert(display.draw_text("self test", 0, 0).is_ok(), "display draw");
            results.assert(display.update().is_ok(), "display flush");
        }
        Err(e) => {
            esp_println::println!("  No display: {}", e);
            results.assert(false, "display bus setup");
        }
    }
}

#[esp_rtos::main]
async fn main(_spawner: Spawner) {
    esp_println::logger::init_logger_from_env();
    let peripherals = esp_hal::init(esp_hal::Config::default());

    esp_alloc::heap_allocator!(size: 32 * 1024);

    esp_println::println!("\n==========================================");
    esp_println::println!("=== Hardware Unit Test Runner ===");
    esp_println::println!("==========================================");

    let mut results = TestResults::new();

    // Run tests that don't need hardware
    test_cycle_logic(&mut results);
    test_oximeter_packets(&mut results);

    let mut humidity = HumidityHardware::new(peripherals.GPIO7);
    let mut temperature = TemperatureHardware::new(peripherals.ADC1, peripherals.GPIO1);
    let display = StatusDisplay::new(peripherals.I2C0, peripherals.GPIO8, peripherals.GPIO9);

    // Initialize RTOS timer for embassy (this consumes TIMG0)
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    // Run hardware tests
    test_board_sensors(&mut results, &mut humidity, &mut temperature).await;
    test_display(&mut results, display);

    // Print summary
    results.print_summary();

    esp_println::println!("\nTest run complete. Looping...");
    loop {
        if results.failed == 0 {
            Timer::after(Duration::from_millis(200)).await;
        } else {
            Timer::after(Duration::from_millis(1000)).await;
        }
    }
}
