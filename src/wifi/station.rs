//! Station state machine shared by the Wi-Fi manager implementations.
//!
//! Each manager task owns a [`Station`] and feeds it [`Command`]s: requests
//! from the application and connectivity notifications from the driver
//! arrive on the same channel, so they are handled strictly in order.
//! The credential store and the radio sit behind [`CredentialStore`] and
//! [`StationDriver`].

use super::{CallbackTable, EventInfo, WifiCredentials, WifiError, WifiEvent};
use crate::task::Delay;
use log::{info, warn};
use std::net::Ipv4Addr;
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::time::Duration;

/// Pause before re-associating after a disconnect.
pub(crate) const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Work item for the manager task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Command {
    /// Connect with the stored credentials, if any.
    Connect,
    /// The driver obtained an address.
    GotIp,
    /// The driver lost the association.
    Disconnected,
    /// Erase the stored credentials, then drop the association.
    DisconnectAndDeleteConfig,
}

/// Persistent credential storage.
pub(crate) trait CredentialStore {
    fn load(&self) -> Option<WifiCredentials>;

    /// Erase stored credentials. Returns true if something was erased.
    fn clear(&mut self) -> Result<bool, WifiError>;
}

/// Radio in station mode. Connectivity changes are reported back as
/// [`Command::GotIp`] and [`Command::Disconnected`].
pub(crate) trait StationDriver {
    fn connect(&mut self, creds: &WifiCredentials) -> Result<(), WifiError>;

    /// Drop the association and forget the driver-side configuration.
    fn disconnect(&mut self) -> Result<(), WifiError>;

    fn ip(&self) -> Option<Ipv4Addr>;
}

pub(crate) struct Station<S, D> {
    store: S,
    driver: D,
    delay: Arc<dyn Delay>,
}

impl<S: CredentialStore, D: StationDriver> Station<S, D> {
    pub fn new(store: S, driver: D, delay: Arc<dyn Delay>) -> Self {
        Self {
            store,
            driver,
            delay,
        }
    }

    /// First action of the manager task. With `erase_first` the stored
    /// credentials are dropped before any connection attempt.
    pub fn boot(&mut self, erase_first: bool) {
        if erase_first {
            self.erase();
        }
        self.connect_stored();
    }

    /// Handle commands until every sender is gone.
    pub fn run(mut self, commands: Receiver<Command>, callbacks: &CallbackTable) {
        for command in commands {
            self.handle(command, callbacks);
        }
    }

    pub fn handle(&mut self, command: Command, callbacks: &CallbackTable) {
        match command {
            Command::Connect => self.connect_stored(),
            Command::GotIp => {
                let ip = self.driver.ip();
                match ip {
                    Some(ip) => info!("Station got IP {}", ip),
                    None => info!("Station got IP"),
                }
                callbacks.dispatch(&EventInfo::got_ip(ip));
            }
            Command::Disconnected => {
                info!("Station disconnected");
                callbacks.dispatch(&EventInfo::new(WifiEvent::StaDisconnected));
                if self.store.load().is_some() {
                    self.delay.delay(RECONNECT_DELAY);
                    self.connect_stored();
                }
            }
            Command::DisconnectAndDeleteConfig => {
                // Erase first so the disconnect that follows does not reconnect.
                self.erase();
                if let Err(e) = self.driver.disconnect() {
                    warn!("Disconnect failed: {}", e);
                }
            }
        }
    }

    fn connect_stored(&mut self) {
        let Some(creds) = self.store.load() else {
            warn!("No stored Wi-Fi credentials, waiting for provisioning");
            return;
        };
        info!("Connecting to {}", creds.ssid);
        if let Err(e) = self.driver.connect(&creds) {
            warn!("Connect failed: {}", e);
        }
    }

    fn erase(&mut self) {
        match self.store.clear() {
            Ok(true) => info!("Stored Wi-Fi configuration erased"),
            Ok(false) => info!("No stored Wi-Fi configuration to erase"),
            Err(e) => warn!("Failed to erase Wi-Fi configuration: {}", e),
        }
    }
}
