//! Wi-Fi manager interface and implementations.
//!
//! The Wi-Fi manager owns the station connection, the stored credentials and
//! its own task. The application only starts it, registers callbacks for
//! connectivity events and asks it to forget its configuration.
//!
//! # Components
//!
//! - [`CallbackTable`] - event kind to handler table (host-testable)
//! - [`credentials`] - credential validation and stored format (host-testable)
//! - `station` - connection state machine shared by both managers (host-testable)
//! - [`SimulatedWifiManager`] - host implementation
//! - `EspWifiManager` - ESP-IDF implementation (ESP32 only)
//! - `storage` - NVS persistence for credentials (ESP32 only)

mod callbacks;
pub mod credentials;
mod simulated;
mod station;

#[cfg(feature = "esp32")]
mod connection;
#[cfg(feature = "esp32")]
mod storage;

use crate::task::{SpawnError, TaskSpec};
use std::fmt;
use std::net::Ipv4Addr;
use std::sync::Arc;

pub use callbacks::CallbackTable;
pub use credentials::{CredentialError, WifiCredentials};
pub use simulated::SimulatedWifiManager;

#[cfg(feature = "esp32")]
pub use connection::EspWifiManager;
#[cfg(feature = "esp32")]
pub use storage::{clear_wifi_credentials, init_nvs, load_wifi_credentials, save_wifi_credentials};

/// Priority of the Wi-Fi manager's own task.
pub const WIFI_MANAGER_TASK_PRIORITY: u8 = 5;

/// The Wi-Fi manager's own task. Callbacks are dispatched from it.
pub const MANAGER_TASK: TaskSpec =
    TaskSpec::new(c"wifi_manager", 4096, WIFI_MANAGER_TASK_PRIORITY, None);

/// NVS namespace holding the manager's stored configuration.
pub const NVS_NAMESPACE: &str = "espwifimgr";

/// Connectivity events a callback can be registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WifiEvent {
    /// Station obtained an IP address.
    StaGotIp,
    /// Station lost its connection to the access point.
    StaDisconnected,
}

impl fmt::Display for WifiEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StaGotIp => write!(f, "STA_GOT_IP"),
            Self::StaDisconnected => write!(f, "STA_DISCONNECTED"),
        }
    }
}

/// Context handed to an event callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventInfo {
    /// Event that fired.
    pub event: WifiEvent,
    /// Station address, when the event carries one.
    pub ip: Option<Ipv4Addr>,
}

impl EventInfo {
    /// Context without an address.
    pub fn new(event: WifiEvent) -> Self {
        Self { event, ip: None }
    }

    /// Context for [`WifiEvent::StaGotIp`].
    pub fn got_ip(ip: Option<Ipv4Addr>) -> Self {
        Self {
            event: WifiEvent::StaGotIp,
            ip,
        }
    }
}

/// Event callback. Runs on the Wi-Fi manager's task and must not block.
pub type EventHandler = Arc<dyn Fn(&EventInfo) + Send + Sync>;

/// Wi-Fi manager contract consumed by the application.
pub trait WifiManager: Send + Sync {
    /// Start the manager. Spawns its task and returns immediately.
    fn start(&self) -> Result<(), WifiError>;

    /// Erase the stored configuration before the first connection attempt.
    ///
    /// Must be called before [`start`](Self::start).
    fn erase_config_on_start(&self) -> Result<(), WifiError>;

    /// Register `handler` for `event`, replacing any previous handler.
    fn set_callback(&self, event: WifiEvent, handler: EventHandler);

    /// Ask the manager to disconnect and erase its stored configuration.
    ///
    /// Only enqueues the request; the outcome is not reported back.
    fn disconnect_and_delete_config_async(&self) -> Result<(), WifiError>;
}

/// Errors that can occur during Wi-Fi manager operations.
#[derive(Debug)]
pub enum WifiError {
    /// `start` was called twice.
    AlreadyStarted,
    /// A request was made before `start`.
    NotStarted,
    /// The manager task is no longer running.
    ManagerGone,
    /// Stored or supplied credentials are invalid.
    Credentials(CredentialError),
    /// The manager task could not be spawned.
    Spawn(SpawnError),
    /// ESP-IDF error.
    #[cfg(feature = "esp32")]
    Esp(esp_idf_sys::EspError),
}

impl fmt::Display for WifiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyStarted => write!(f, "Wi-Fi manager already started"),
            Self::NotStarted => write!(f, "Wi-Fi manager not started"),
            Self::ManagerGone => write!(f, "Wi-Fi manager task has stopped"),
            Self::Credentials(e) => write!(f, "credentials: {}", e),
            Self::Spawn(e) => write!(f, "cannot spawn manager task: {}", e),
            #[cfg(feature = "esp32")]
            Self::Esp(e) => write!(f, "ESP error: {:?}", e),
        }
    }
}

impl std::error::Error for WifiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Credentials(e) => Some(e),
            Self::Spawn(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CredentialError> for WifiError {
    fn from(e: CredentialError) -> Self {
        Self::Credentials(e)
    }
}

impl From<SpawnError> for WifiError {
    fn from(e: SpawnError) -> Self {
        Self::Spawn(e)
    }
}

#[cfg(feature = "esp32")]
impl From<esp_idf_sys::EspError> for WifiError {
    fn from(e: esp_idf_sys::EspError) -> Self {
        Self::Esp(e)
    }
}
