//! NVS persistence for station credentials.
//!
//! Credentials live in the Wi-Fi manager's NVS namespace so they survive
//! reboots until the manager is asked to delete its configuration.

use super::credentials::{WifiCredentials, MAX_PASSWORD_LEN, MAX_SSID_LEN};
use super::NVS_NAMESPACE;
use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs, NvsDefault};
use esp_idf_sys::EspError;
use log::{debug, warn};

/// NVS key for stored credentials.
const NVS_KEY: &str = "sta_creds";

/// `[ssid_len:1][ssid:32][password_len:1][password:64]`.
const MAX_STORED_LEN: usize = 1 + MAX_SSID_LEN + 1 + MAX_PASSWORD_LEN;

/// Open the manager's NVS namespace on the default partition.
pub fn init_nvs(partition: EspDefaultNvsPartition) -> Result<EspNvs<NvsDefault>, EspError> {
    EspNvs::new(partition, NVS_NAMESPACE, true)
}

/// Load stored credentials.
///
/// Returns `None` if nothing is stored or the stored bytes are unreadable.
pub fn load_wifi_credentials(nvs: &EspNvs<NvsDefault>) -> Option<WifiCredentials> {
    let mut buf = [0u8; MAX_STORED_LEN];
    let bytes = match nvs.get_raw(NVS_KEY, &mut buf) {
        Ok(Some(bytes)) => bytes,
        Ok(None) => {
            debug!("No Wi-Fi credentials in NVS");
            return None;
        }
        Err(e) => {
            warn!("Failed to read Wi-Fi credentials from NVS: {:?}", e);
            return None;
        }
    };

    match WifiCredentials::from_bytes(bytes) {
        Ok(creds) => Some(creds),
        Err(e) => {
            warn!("Stored Wi-Fi credentials are corrupt: {}", e);
            None
        }
    }
}

/// Store credentials, replacing any previous ones.
pub fn save_wifi_credentials(
    nvs: &mut EspNvs<NvsDefault>,
    creds: &WifiCredentials,
) -> Result<(), EspError> {
    nvs.set_raw(NVS_KEY, &creds.to_bytes())?;
    Ok(())
}

/// Erase stored credentials. Returns true if something was erased.
pub fn clear_wifi_credentials(nvs: &mut EspNvs<NvsDefault>) -> Result<bool, EspError> {
    nvs.remove(NVS_KEY)
}
