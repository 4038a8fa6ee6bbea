//! Host Wi-Fi manager.
//!
//! Behaves like the device manager from the application's point of view: it
//! runs its own task, connects when credentials are stored, dispatches
//! callbacks from that task and processes disconnect-and-delete requests
//! asynchronously. No radio is involved.

use super::station::{Command, CredentialStore, Station, StationDriver};
use super::{
    CallbackTable, EventHandler, WifiCredentials, WifiError, WifiEvent, WifiManager, MANAGER_TASK,
};
use crate::task::{Spawner, ThreadDelay};
use log::debug;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

type SharedCredentials = Arc<Mutex<Option<WifiCredentials>>>;

/// Simulated Wi-Fi manager for host runs.
pub struct SimulatedWifiManager {
    callbacks: Arc<CallbackTable>,
    credentials: SharedCredentials,
    commands: Mutex<Option<Sender<Command>>>,
    spawner: Arc<dyn Spawner>,
    erase_on_start: AtomicBool,
    connect_delay: Duration,
    address: Ipv4Addr,
}

impl SimulatedWifiManager {
    /// Time between a connect request and the got-IP event.
    pub const DEFAULT_CONNECT_DELAY: Duration = Duration::from_millis(500);

    /// Address handed out to the station.
    pub const DEFAULT_ADDRESS: Ipv4Addr = Ipv4Addr::new(192, 168, 4, 2);

    /// Create a manager with optional stored credentials.
    pub fn new(spawner: Arc<dyn Spawner>, credentials: Option<WifiCredentials>) -> Self {
        Self {
            callbacks: Arc::new(CallbackTable::new()),
            credentials: Arc::new(Mutex::new(credentials)),
            commands: Mutex::new(None),
            spawner,
            erase_on_start: AtomicBool::new(false),
            connect_delay: Self::DEFAULT_CONNECT_DELAY,
            address: Self::DEFAULT_ADDRESS,
        }
    }

    /// Override the simulated association time.
    pub fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = delay;
        self
    }

    /// True while credentials are stored.
    pub fn has_credentials(&self) -> bool {
        self.credentials
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Store new credentials and connect with them.
    pub fn provision(&self, credentials: WifiCredentials) -> Result<(), WifiError> {
        credentials.validate()?;
        *self
            .credentials
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(credentials);
        self.send(Command::Connect)
    }

    fn send(&self, command: Command) -> Result<(), WifiError> {
        let commands = self.commands.lock().unwrap_or_else(PoisonError::into_inner);
        let sender = commands.as_ref().ok_or(WifiError::NotStarted)?;
        sender.send(command).map_err(|_| WifiError::ManagerGone)
    }
}

impl WifiManager for SimulatedWifiManager {
    fn start(&self) -> Result<(), WifiError> {
        let mut commands = self.commands.lock().unwrap_or_else(PoisonError::into_inner);
        if commands.is_some() {
            return Err(WifiError::AlreadyStarted);
        }

        let (tx, rx) = mpsc::channel();
        let callbacks = self.callbacks.clone();
        let erase_first = self.erase_on_start.load(Ordering::Acquire);
        let mut station = Station::new(
            SimulatedStore(self.credentials.clone()),
            SimulatedRadio {
                events: tx.clone(),
                connect_delay: self.connect_delay,
                address: self.address,
                connected: false,
            },
            Arc::new(ThreadDelay),
        );
        self.spawner.spawn(
            &MANAGER_TASK,
            Box::new(move || {
                station.boot(erase_first);
                station.run(rx, &callbacks);
            }),
        )?;

        *commands = Some(tx);
        debug!("Simulated Wi-Fi manager task spawned");
        Ok(())
    }

    fn erase_config_on_start(&self) -> Result<(), WifiError> {
        if self
            .commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
        {
            return Err(WifiError::AlreadyStarted);
        }
        self.erase_on_start.store(true, Ordering::Release);
        Ok(())
    }

    fn set_callback(&self, event: WifiEvent, handler: EventHandler) {
        self.callbacks.set(event, handler);
    }

    fn disconnect_and_delete_config_async(&self) -> Result<(), WifiError> {
        self.send(Command::DisconnectAndDeleteConfig)
    }
}

/// In-memory credential slot shared with the manager handle.
struct SimulatedStore(SharedCredentials);

impl CredentialStore for SimulatedStore {
    fn load(&self) -> Option<WifiCredentials> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn clear(&mut self) -> Result<bool, WifiError> {
        // Dropping the credentials zeroizes them.
        Ok(self
            .0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some())
    }
}

/// Radio that associates after a fixed delay and reports back on the
/// manager's channel.
struct SimulatedRadio {
    events: Sender<Command>,
    connect_delay: Duration,
    address: Ipv4Addr,
    connected: bool,
}

impl StationDriver for SimulatedRadio {
    fn connect(&mut self, _creds: &WifiCredentials) -> Result<(), WifiError> {
        if self.connected {
            return Ok(());
        }
        thread::sleep(self.connect_delay);
        self.connected = true;
        self.events
            .send(Command::GotIp)
            .map_err(|_| WifiError::ManagerGone)
    }

    fn disconnect(&mut self) -> Result<(), WifiError> {
        if !self.connected {
            return Ok(());
        }
        self.connected = false;
        self.events
            .send(Command::Disconnected)
            .map_err(|_| WifiError::ManagerGone)
    }

    fn ip(&self) -> Option<Ipv4Addr> {
        self.connected.then_some(self.address)
    }
}
