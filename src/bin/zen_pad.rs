//! Zen Pad - smart-interrupt key pad firmware
//!
//! This binary builds firmware for a 3x2 key pad on a Raspberry Pi Pico:
//! - key 0: alt-tab smart interrupt (keys 3 and 4 keep it open)
//! - key 1: ctrl-tab smart interrupt
//! - keys 2-5: plain keys
//!
//! Sub-behaviors are logged over RTT; the keymap and HID side are provided
//! by the host firmware this engine is embedded in.

#![no_std]
#![no_main]

use defmt::*;
use defmt_rtt as _; // global logger
use embassy_executor::Spawner;
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_time::{Duration, Timer};
use panic_halt as _;
use static_cell::StaticCell;

use smart_interrupt::behavior_queue::{run_behavior_queue, QueuedInvoker};
use smart_interrupt::channels::{BEHAVIOR_QUEUE, INPUT_CHANNEL};
use smart_interrupt::config::*;
use smart_interrupt::matrix::{Debouncer, KeyMatrix};
use smart_interrupt::runtime::{publish_position, run};
use smart_interrupt::supervisor::AppSupervisor;
use smart_interrupt::{
    BehaviorBinding, BehaviorInvoker, BindingEvent, EngineConfig, InterruptConfig,
    SmartInterruptEngine,
};

// ===================================================================
// Keymap
// ===================================================================

const HID_TAB: u32 = 0x2B;
const HID_LEFT_CTRL: u32 = 0xE0;
const HID_LEFT_ALT: u32 = 0xE2;

const ALT_TAB_KEYS_KEPT_OPEN: [u32; 2] = [3, 4];

type Matrix = KeyMatrix<Output<'static>, Input<'static>, MATRIX_ROWS, MATRIX_COLS>;
type Bindings = [Option<&'static InterruptConfig>; MATRIX_KEYS];

static CONFIGS: StaticCell<[InterruptConfig; 2]> = StaticCell::new();
static INSTANCES: StaticCell<[&'static InterruptConfig; 2]> = StaticCell::new();
static BINDINGS: StaticCell<Bindings> = StaticCell::new();

fn build_configs() -> [InterruptConfig; 2] {
    let alt_tab = InterruptConfig::builder(
        BehaviorBinding::new("key_down", HID_LEFT_ALT, 0),
        BehaviorBinding::new("key_press", HID_TAB, 0),
        BehaviorBinding::new("key_up", HID_LEFT_ALT, 0),
    )
    .positions(&ALT_TAB_KEYS_KEPT_OPEN)
    .timeout_ms(DEFAULT_TIMEOUT_MS)
    .tap_ms(DEFAULT_TAP_MS);

    let ctrl_tab = InterruptConfig::from_bindings([
        BehaviorBinding::new("key_down", HID_LEFT_CTRL, 0),
        BehaviorBinding::new("key_press", HID_TAB, 0),
        BehaviorBinding::new("key_up", HID_LEFT_CTRL, 0),
    ])
    .timeout_ms(400);

    // a bad instance is a build mistake, stop before any key is scanned
    [unwrap!(alt_tab.build()), unwrap!(ctrl_tab.build())]
}

/// Downstream invoker: reports what the keymap would do
struct LoggingInvoker;

impl BehaviorInvoker for LoggingInvoker {
    fn binding_pressed(&mut self, binding: &BehaviorBinding, event: BindingEvent) {
        info!(
            "{} pressed {}(0x{:02X}) at {}",
            event.position, binding.behavior, binding.param1, event.timestamp
        );
    }

    fn binding_released(&mut self, binding: &BehaviorBinding, event: BindingEvent) {
        info!(
            "{} released {}(0x{:02X}) at {}",
            event.position, binding.behavior, binding.param1, event.timestamp
        );
    }
}

// ===================================================================
// Main Application Entry Point
// ===================================================================

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_rp::init(Default::default());

    let configs: &'static [InterruptConfig; 2] = CONFIGS.init(build_configs());
    let instances: &'static [&'static InterruptConfig; 2] =
        INSTANCES.init([&configs[0], &configs[1]]);
    let bindings: &'static Bindings = BINDINGS.init({
        let mut bindings: Bindings = [None; MATRIX_KEYS];
        bindings[0] = Some(&configs[0]);
        bindings[1] = Some(&configs[1]);
        bindings
    });

    let mut supervisor = AppSupervisor::new(instances);
    supervisor.print_startup_banner();

    // Rows on GPIO 2-3, columns on GPIO 4-6
    let matrix: Matrix = KeyMatrix::new(
        [Output::new(p.PIN_2, Level::High), Output::new(p.PIN_3, Level::High)],
        [
            Input::new(p.PIN_4, Pull::Up),
            Input::new(p.PIN_5, Pull::Up),
            Input::new(p.PIN_6, Pull::Up),
        ],
    );

    unwrap!(spawner.spawn(behavior_queue_task()));
    unwrap!(spawner.spawn(engine_task()));
    unwrap!(spawner.spawn(matrix_task(matrix, bindings)));
    // Built-in LED on Pico
    unwrap!(spawner.spawn(status_task(Output::new(p.PIN_25, Level::Low))));

    info!("Zen Pad initialized successfully");
    supervisor.run().await
}

// ===================================================================
// Tasks
// ===================================================================

#[embassy_executor::task]
async fn matrix_task(mut matrix: Matrix, bindings: &'static Bindings) {
    info!("Matrix task started");

    let mut debouncer = Debouncer::<MATRIX_KEYS>::default();
    let scan_interval = Duration::from_micros(1_000_000 / BUTTON_SCAN_RATE_HZ);
    let sender = INPUT_CHANNEL.sender();

    loop {
        for change in matrix.scan_changes(&mut debouncer).await {
            publish_position(&sender, change, |position| {
                bindings.get(position as usize).copied().flatten()
            })
            .await;
        }

        Timer::after(scan_interval).await;
    }
}

#[embassy_executor::task]
async fn engine_task() {
    let engine: SmartInterruptEngine<'static> = SmartInterruptEngine::new(EngineConfig::default());
    run(
        engine,
        INPUT_CHANNEL.receiver(),
        QueuedInvoker::new(BEHAVIOR_QUEUE.sender()),
    )
    .await
}

#[embassy_executor::task]
async fn behavior_queue_task() {
    run_behavior_queue(BEHAVIOR_QUEUE.receiver(), LoggingInvoker).await
}

#[embassy_executor::task]
async fn status_task(mut status_led: Output<'static>) {
    info!("Status LED task started");

    loop {
        // Heartbeat pattern
        status_led.set_high();
        Timer::after(Duration::from_millis(100)).await;
        status_led.set_low();
        Timer::after(Duration::from_millis(900)).await;
    }
}
