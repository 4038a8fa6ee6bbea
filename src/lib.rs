//! ESP32 Wi-Fi manager application.
//!
//! Platform-independent application logic: bootstrap, the monitoring
//! heartbeat, the deferred configuration wipe and the Wi-Fi event handlers.
//! Hardware access sits behind traits so everything except the ESP-IDF
//! implementations can be tested on the host.

pub mod app;
pub mod config;
pub mod deferred;
pub mod diagnostics;
pub mod gpio;
pub mod handlers;
pub mod monitor;
pub mod task;
pub mod wifi;

#[cfg(test)]
mod testing;

// Re-export commonly used items
pub use app::{bootstrap, AppError, Platform};
pub use config::{AppConfig, AppConfigError, WipePolicy};
pub use deferred::{ConfigWipeScheduler, ConfigWipeTask, ScheduleOutcome};
pub use monitor::{CycleReport, MonitorTask};
pub use task::{Delay, SpawnError, Spawner, TaskSpec};
pub use wifi::{EventInfo, WifiCredentials, WifiError, WifiEvent, WifiManager};
