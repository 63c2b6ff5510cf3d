//! Application supervisor and monitoring
//!
//! This module provides the startup banner describing the configured
//! smart-interrupt instances and a periodic uptime heartbeat.

use embassy_time::{Duration, Timer};

use crate::config::{
    HEARTBEAT_INTERVAL_S, MATRIX_COLS, MATRIX_KEYS, MATRIX_ROWS, MAX_ACTIVE_SMART_INTERRUPTS,
    STATUS_INTERVAL_S,
};
use crate::smart_interrupt::InterruptConfig;
use crate::types::APP_VERSION;

/// Application supervisor responsible for monitoring and lifecycle management
pub struct AppSupervisor<'a> {
    instances: &'a [&'a InterruptConfig],
    uptime_seconds: u32,
    last_heartbeat: u32,
}

impl<'a> AppSupervisor<'a> {
    pub fn new(instances: &'a [&'a InterruptConfig]) -> Self {
        Self {
            instances,
            uptime_seconds: 0,
            last_heartbeat: 0,
        }
    }

    /// Print application startup banner with the configured behaviors
    pub fn print_startup_banner(&self) {
        info!("========================================");
        info!("Zen Pad v{}", APP_VERSION);
        info!("Smart interrupt keyboard firmware");
        info!("========================================");
        info!("Hardware: RP2040 (Raspberry Pi Pico)");
        info!("Keys: {} ({}x{} layout)", MATRIX_KEYS, MATRIX_COLS, MATRIX_ROWS);
        info!("Interrupt slots: {}", MAX_ACTIVE_SMART_INTERRUPTS);
        for (index, config) in self.instances.iter().enumerate() {
            info!(
                "Smart interrupt {}: {} -> {} -> {}, timeout {}ms, tap {}ms, {} listed keys",
                index,
                config.start_behavior().behavior,
                config.continue_behavior().behavior,
                config.end_behavior().behavior,
                config.timeout().as_millis(),
                config.tap().as_millis(),
                config.positions().len()
            );
        }
        info!("========================================");
    }

    /// Advance the uptime clock; returns true when a status line is due
    pub fn tick(&mut self, seconds: u32) -> bool {
        self.uptime_seconds = self.uptime_seconds.saturating_add(seconds);
        if self.uptime_seconds - self.last_heartbeat >= STATUS_INTERVAL_S {
            self.last_heartbeat = self.uptime_seconds;
            true
        } else {
            false
        }
    }

    /// Run the main supervisor loop
    pub async fn run(&mut self) -> ! {
        info!("Application supervisor started");

        loop {
            Timer::after(Duration::from_secs(HEARTBEAT_INTERVAL_S)).await;
            if self.tick(HEARTBEAT_INTERVAL_S as u32) {
                self.print_status();
            }
        }
    }

    fn print_status(&self) {
        let minutes = self.uptime_seconds / 60;
        let hours = minutes / 60;
        let remaining_minutes = minutes % 60;

        if hours > 0 {
            info!("Status: Uptime {}h{}m", hours, remaining_minutes);
        } else {
            info!("Status: Uptime {}m", minutes);
        }
    }

    /// Get current uptime in seconds
    pub fn uptime(&self) -> u32 {
        self.uptime_seconds
    }
}
