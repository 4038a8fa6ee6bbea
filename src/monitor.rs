//! Periodic diagnostic heartbeat.
//!
//! Every cycle the monitoring task logs free heap and the level of the input
//! pin, drives the output pin with the current signal state and inverts that
//! state. It runs forever alongside the Wi-Fi manager's tasks.
//!
//! Debug aid only; production firmware should not start it.

use crate::config::AppConfig;
use crate::diagnostics::Diagnostics;
use crate::gpio::Gpio;
use crate::task::Delay;
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;

/// Log target for the heartbeat.
const LOG_TARGET: &str = "main";

/// What one monitoring cycle observed and did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    /// Free heap in bytes.
    pub free_heap: u32,
    /// Input pin level, `None` if the read failed.
    pub input_level: Option<bool>,
    /// Level written to the output pin.
    pub output_level: bool,
}

/// The monitoring task. Owns the GPIO and the output signal state.
pub struct MonitorTask {
    gpio: Box<dyn Gpio>,
    diagnostics: Arc<dyn Diagnostics>,
    delay: Arc<dyn Delay>,
    input_pin: u8,
    output_pin: u8,
    period: Duration,
    signal: bool,
}

impl MonitorTask {
    /// Create the task. The output signal starts high.
    pub fn new(
        gpio: Box<dyn Gpio>,
        diagnostics: Arc<dyn Diagnostics>,
        delay: Arc<dyn Delay>,
        config: &AppConfig,
    ) -> Self {
        Self {
            gpio,
            diagnostics,
            delay,
            input_pin: config.input_pin,
            output_pin: config.output_pin,
            period: config.monitor_period,
            signal: true,
        }
    }

    /// Level the next cycle will drive.
    pub fn signal(&self) -> bool {
        self.signal
    }

    /// Sample, drive the output and flip the signal. Does not wait.
    pub fn run_cycle(&mut self) -> CycleReport {
        let free_heap = self.diagnostics.free_heap_bytes();
        info!(target: LOG_TARGET, "free heap: {}", free_heap);

        let input_level = match self.gpio.get_level(self.input_pin) {
            Ok(level) => {
                info!(target: LOG_TARGET, "GPIO{} {}", self.input_pin, u8::from(level));
                Some(level)
            }
            Err(e) => {
                warn!(target: LOG_TARGET, "GPIO{} read failed: {}", self.input_pin, e);
                None
            }
        };

        let output_level = self.signal;
        if let Err(e) = self.gpio.set_level(self.output_pin, output_level) {
            warn!(target: LOG_TARGET, "GPIO{} write failed: {}", self.output_pin, e);
        }
        self.signal = !self.signal;

        CycleReport {
            free_heap,
            input_level,
            output_level,
        }
    }

    /// Run cycles forever, blocking for the period after each one.
    pub fn run(mut self) -> ! {
        loop {
            self.run_cycle();
            self.delay.delay(self.period);
        }
    }
}
