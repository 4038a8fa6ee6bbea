//! Application bootstrap.
//!
//! Wires the platform collaborators together: configures the output pin,
//! starts the Wi-Fi manager (optionally erasing its saved settings first),
//! registers the event handlers and spawns the monitoring task. Everything
//! after that happens on other tasks.

use crate::config::{AppConfig, AppConfigError};
use crate::deferred::ConfigWipeScheduler;
use crate::diagnostics::Diagnostics;
use crate::gpio::{Gpio, PinMode};
use crate::handlers::{on_disconnected, on_got_ip};
use crate::monitor::MonitorTask;
use crate::task::{Delay, SpawnError, Spawner};
use crate::wifi::{WifiError, WifiEvent, WifiManager};
use log::{info, warn};
use std::fmt;
use std::sync::Arc;

const LOG_TARGET: &str = "main";

/// Platform services the application runs on.
pub struct Platform {
    pub wifi: Arc<dyn WifiManager>,
    pub gpio: Box<dyn Gpio>,
    pub diagnostics: Arc<dyn Diagnostics>,
    pub spawner: Arc<dyn Spawner>,
    pub delay: Arc<dyn Delay>,
}

/// Bring the application up. Returns once every task is running.
pub fn bootstrap(platform: Platform, config: &AppConfig) -> Result<(), AppError> {
    config.validate()?;

    let Platform {
        wifi,
        mut gpio,
        diagnostics,
        spawner,
        delay,
    } = platform;

    // The output pin is a debug aid; connectivity does not depend on it.
    if let Err(e) = gpio.set_direction(config.output_pin, PinMode::Output) {
        warn!(target: LOG_TARGET, "GPIO{} setup failed: {}", config.output_pin, e);
    }

    if config.wipe_on_boot {
        info!(target: LOG_TARGET, "Erasing saved Wi-Fi settings before connecting");
        if let Err(e) = wifi.erase_config_on_start() {
            warn!(target: LOG_TARGET, "Failed to erase saved settings: {}", e);
        }
    }

    wifi.start()?;
    info!(target: LOG_TARGET, "Wi-Fi manager started");

    let scheduler = Arc::new(ConfigWipeScheduler::new(
        wifi.clone(),
        diagnostics.clone(),
        delay.clone(),
        spawner.clone(),
        config,
    ));
    wifi.set_callback(WifiEvent::StaGotIp, on_got_ip(scheduler));
    wifi.set_callback(WifiEvent::StaDisconnected, on_disconnected());

    let monitor = MonitorTask::new(gpio, diagnostics, delay, config);
    spawner.spawn(
        &config.monitor_task,
        Box::new(move || {
            monitor.run();
        }),
    )?;
    info!(target: LOG_TARGET, "Started {}", config.monitor_task);

    Ok(())
}

/// Errors that abort bootstrap.
#[derive(Debug)]
pub enum AppError {
    /// Invalid configuration.
    Config(AppConfigError),
    /// Wi-Fi manager failed to start.
    Wifi(WifiError),
    /// Monitoring task could not be spawned.
    Spawn(SpawnError),
    /// ESP-IDF error while acquiring platform resources.
    #[cfg(feature = "esp32")]
    Esp(esp_idf_sys::EspError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "configuration: {}", e),
            Self::Wifi(e) => write!(f, "Wi-Fi: {}", e),
            Self::Spawn(e) => write!(f, "task: {}", e),
            #[cfg(feature = "esp32")]
            Self::Esp(e) => write!(f, "ESP error: {:?}", e),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Wifi(e) => Some(e),
            Self::Spawn(e) => Some(e),
            #[cfg(feature = "esp32")]
            Self::Esp(_) => None,
        }
    }
}

impl From<AppConfigError> for AppError {
    fn from(e: AppConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<WifiError> for AppError {
    fn from(e: WifiError) -> Self {
        Self::Wifi(e)
    }
}

impl From<SpawnError> for AppError {
    fn from(e: SpawnError) -> Self {
        Self::Spawn(e)
    }
}

#[cfg(feature = "esp32")]
impl From<esp_idf_sys::EspError> for AppError {
    fn from(e: esp_idf_sys::EspError) -> Self {
        Self::Esp(e)
    }
}
