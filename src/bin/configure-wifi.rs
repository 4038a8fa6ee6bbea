//! Wi-Fi provisioning utility for ESP32.
//!
//! Stores station credentials in the Wi-Fi manager's NVS namespace so the
//! application connects on its next boot.
//!
//! Usage:
//!   WIFI_SSID="MyNetwork" WIFI_PASSWORD="secret" cargo configure-wifi
//!
//! For open networks (no password):
//!   WIFI_SSID="OpenNetwork" WIFI_PASSWORD="" cargo configure-wifi
//!
//! The application erases the stored credentials a few seconds after every
//! successful connection, so run this again before each test boot.

/// Wi-Fi SSID, set via the WIFI_SSID environment variable at compile time.
#[cfg(feature = "esp32")]
const WIFI_SSID: Option<&str> = option_env!("WIFI_SSID");

/// Wi-Fi password, set via WIFI_PASSWORD at compile time. Empty for open networks.
#[cfg(feature = "esp32")]
const WIFI_PASSWORD: Option<&str> = option_env!("WIFI_PASSWORD");

/// Print error message and exit. Pauses first so the serial monitor shows it.
#[cfg(feature = "esp32")]
fn halt_with_error(msg: &str) -> ! {
    eprintln!("\n{}", msg);
    eprintln!("\n=== Configuration failed ===\n");
    std::thread::sleep(std::time::Duration::from_secs(2));
    std::process::exit(1);
}

#[cfg(feature = "esp32")]
fn main() {
    use esp32_wifi_manager_app::wifi::{
        init_nvs, save_wifi_credentials, CredentialError, WifiCredentials,
    };
    use esp_idf_svc::nvs::EspDefaultNvsPartition;

    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    println!("\n=== Wi-Fi Provisioning Utility ===\n");

    let ssid = match WIFI_SSID {
        Some(s) if !s.is_empty() => s,
        _ => {
            halt_with_error(
                "Error: WIFI_SSID environment variable not set at compile time.\n\n\
                 Usage:\n  \
                 WIFI_SSID=\"MyNetwork\" WIFI_PASSWORD=\"secret\" cargo configure-wifi\n\n\
                 For open networks:\n  \
                 WIFI_SSID=\"OpenNetwork\" WIFI_PASSWORD=\"\" cargo configure-wifi",
            );
        }
    };
    let password = WIFI_PASSWORD.unwrap_or("");

    println!("SSID: {}", ssid);
    println!(
        "Password: {} ({} chars)",
        if password.is_empty() {
            "(none)"
        } else {
            "****"
        },
        password.len()
    );

    let creds = match WifiCredentials::new(ssid, password) {
        Ok(creds) => creds,
        Err(CredentialError::PasswordTooShort { len, min }) => {
            halt_with_error(&format!(
                "Error: Password too short ({} bytes, min {} for WPA2)",
                len, min
            ));
        }
        Err(e) => halt_with_error(&format!("Error: {}", e)),
    };

    let partition = match EspDefaultNvsPartition::take() {
        Ok(partition) => partition,
        Err(e) => halt_with_error(&format!("Error taking NVS partition: {:?}", e)),
    };

    match init_nvs(partition) {
        Ok(mut nvs) => match save_wifi_credentials(&mut nvs, &creds) {
            Ok(()) => println!("\n=== Wi-Fi credentials saved to NVS ==="),
            Err(e) => halt_with_error(&format!("Error saving to NVS: {:?}", e)),
        },
        Err(e) => halt_with_error(&format!("Error opening NVS: {:?}", e)),
    }

    println!("\n=== Done - you can flash the application ===\n");
    std::thread::sleep(std::time::Duration::from_secs(2));
}

#[cfg(not(feature = "esp32"))]
fn main() {
    eprintln!("This binary must be built for ESP32.");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  WIFI_SSID=\"MyNetwork\" WIFI_PASSWORD=\"secret\" cargo configure-wifi");
    std::process::exit(1);
}
