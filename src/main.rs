//! ESP32 Wi-Fi manager application binary.
//!
//! Runs on both ESP32 and host platforms:
//! - **Host**: `cargo run` (simulated Wi-Fi, GPIO and diagnostics)
//! - **ESP32**: `cargo espflash flash --features esp32 --release`
//!
//! On the host the simulated station connects to `WIFI_SSID` /
//! `WIFI_PASSWORD` from the environment. Timing overrides are read from
//! `MONITOR_PERIOD_MS`, `WIPE_DELAY_MS`, `WIPE_POLICY` and `WIPE_ON_BOOT`.

use esp32_wifi_manager_app::{bootstrap, AppConfig, AppError, Platform};
use log::{error, info};
use std::thread;

// ESP32: Initialize ESP-IDF before anything else
#[cfg(feature = "esp32")]
fn platform_init() {
    esp_idf_sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();
    info!("ESP-IDF initialized");
}

// Host: Just initialize env_logger
#[cfg(not(feature = "esp32"))]
fn platform_init() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

#[cfg(feature = "esp32")]
fn start() -> Result<(), AppError> {
    use esp32_wifi_manager_app::diagnostics::EspDiagnostics;
    use esp32_wifi_manager_app::gpio::EspGpio;
    use esp32_wifi_manager_app::task::{FreeRtosSpawner, ThreadDelay};
    use esp32_wifi_manager_app::wifi::EspWifiManager;
    use esp_idf_hal::peripherals::Peripherals;
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::nvs::EspDefaultNvsPartition;
    use std::sync::Arc;

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let partition = EspDefaultNvsPartition::take()?;
    let spawner = Arc::new(FreeRtosSpawner);

    let platform = Platform {
        wifi: Arc::new(EspWifiManager::new(
            peripherals.modem,
            sysloop,
            partition,
            spawner.clone(),
        )),
        gpio: Box::new(EspGpio::new()),
        diagnostics: Arc::new(EspDiagnostics),
        spawner,
        delay: Arc::new(ThreadDelay),
    };
    bootstrap(platform, &AppConfig::default())
}

// Host: the simulated station starts unprovisioned and is provisioned once
// the handlers are registered, like a device flashed with `configure-wifi`.
#[cfg(not(feature = "esp32"))]
fn start() -> Result<(), AppError> {
    use esp32_wifi_manager_app::diagnostics::SimulatedDiagnostics;
    use esp32_wifi_manager_app::gpio::SimulatedGpio;
    use esp32_wifi_manager_app::task::{StdSpawner, ThreadDelay};
    use esp32_wifi_manager_app::wifi::{SimulatedWifiManager, WifiCredentials, WifiError};
    use std::sync::Arc;

    const DEFAULT_SSID: &str = "simulated-ap";

    let config = AppConfig::from_env()?;

    let ssid = std::env::var("WIFI_SSID").unwrap_or_else(|_| DEFAULT_SSID.to_string());
    let password = std::env::var("WIFI_PASSWORD").unwrap_or_default();
    let credentials = WifiCredentials::new(ssid, password).map_err(WifiError::from)?;

    let spawner = Arc::new(StdSpawner);
    let wifi = Arc::new(SimulatedWifiManager::new(spawner.clone(), None));
    let platform = Platform {
        wifi: wifi.clone(),
        gpio: Box::new(SimulatedGpio::new()),
        diagnostics: Arc::new(SimulatedDiagnostics::default()),
        spawner,
        delay: Arc::new(ThreadDelay),
    };
    bootstrap(platform, &config)?;

    info!("Provisioning simulated station for SSID {:?}", credentials.ssid);
    wifi.provision(credentials)?;
    Ok(())
}

fn main() {
    platform_init();

    match start() {
        Ok(()) => info!("Application started"),
        Err(e) => error!("Startup failed: {}", e),
    }

    // Tasks keep running; the main task has nothing left to do.
    loop {
        thread::park();
    }
}
