//! ESP-IDF Wi-Fi manager.
//!
//! Wraps the ESP-IDF station driver behind the [`WifiManager`] contract. All
//! driver work happens on the manager's own task: system event loop
//! notifications and application requests are funnelled into one command
//! channel and handled by the shared station state machine, which also
//! dispatches the callbacks.

use super::credentials::{MAX_PASSWORD_LEN, MAX_SSID_LEN};
use super::station::{Command, CredentialStore, Station, StationDriver};
use super::storage::{clear_wifi_credentials, init_nvs, load_wifi_credentials};
use super::{
    CallbackTable, CredentialError, EventHandler, WifiCredentials, WifiError, WifiEvent,
    WifiManager, MANAGER_TASK,
};
use crate::task::{Spawner, ThreadDelay};
use esp_idf_hal::modem::Modem;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::netif::IpEvent;
use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs, NvsDefault};
use esp_idf_svc::wifi::{
    AuthMethod, ClientConfiguration, Configuration, EspWifi, WifiEvent as DriverEvent,
};
use log::error;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};

/// Peripherals consumed when the manager starts.
struct Resources {
    modem: Modem,
    sysloop: EspSystemEventLoop,
    partition: EspDefaultNvsPartition,
}

/// Wi-Fi manager driving the ESP32 radio in station mode.
pub struct EspWifiManager {
    callbacks: Arc<CallbackTable>,
    commands: Mutex<Option<Sender<Command>>>,
    resources: Mutex<Option<Resources>>,
    spawner: Arc<dyn Spawner>,
    erase_on_start: AtomicBool,
}

impl EspWifiManager {
    /// Create a manager. Nothing touches the radio until [`start`](WifiManager::start).
    pub fn new(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        partition: EspDefaultNvsPartition,
        spawner: Arc<dyn Spawner>,
    ) -> Self {
        Self {
            callbacks: Arc::new(CallbackTable::new()),
            commands: Mutex::new(None),
            resources: Mutex::new(Some(Resources {
                modem,
                sysloop,
                partition,
            })),
            spawner,
            erase_on_start: AtomicBool::new(false),
        }
    }
}

impl WifiManager for EspWifiManager {
    fn start(&self) -> Result<(), WifiError> {
        let mut commands = self.commands.lock().unwrap_or_else(PoisonError::into_inner);
        let resources = self
            .resources
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(WifiError::AlreadyStarted)?;

        let (tx, rx) = mpsc::channel();
        let callbacks = self.callbacks.clone();
        let events = tx.clone();
        let erase_first = self.erase_on_start.load(Ordering::Acquire);
        self.spawner.spawn(
            &MANAGER_TASK,
            Box::new(move || {
                if let Err(e) = run_manager(resources, &callbacks, events, rx, erase_first) {
                    error!("Wi-Fi manager stopped: {}", e);
                }
            }),
        )?;

        *commands = Some(tx);
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
        let commands = self.commands.lock().unwrap_or_else(PoisonError::into_inner);
        let sender = commands.as_ref().ok_or(WifiError::NotStarted)?;
        sender
            .send(Command::DisconnectAndDeleteConfig)
            .map_err(|_| WifiError::ManagerGone)
    }
}

/// Credentials in the manager's NVS namespace.
struct NvsStore(EspNvs<NvsDefault>);

impl CredentialStore for NvsStore {
    fn load(&self) -> Option<WifiCredentials> {
        load_wifi_credentials(&self.0)
    }

    fn clear(&mut self) -> Result<bool, WifiError> {
        Ok(clear_wifi_credentials(&mut self.0)?)
    }
}

/// ESP-IDF station driver. Started lazily on the first connect.
struct EspStation {
    wifi: EspWifi<'static>,
    started: bool,
}

impl StationDriver for EspStation {
    fn connect(&mut self, creds: &WifiCredentials) -> Result<(), WifiError> {
        self.wifi.set_configuration(&station_configuration(creds)?)?;
        if !self.started {
            self.wifi.start()?;
            self.started = true;
        }
        self.wifi.connect()?;
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), WifiError> {
        if !self.started {
            return Ok(());
        }
        self.wifi.disconnect()?;
        self.wifi
            .set_configuration(&Configuration::Client(ClientConfiguration::default()))?;
        Ok(())
    }

    fn ip(&self) -> Option<Ipv4Addr> {
        self.wifi.sta_netif().get_ip_info().ok().map(|info| info.ip)
    }
}

fn station_configuration(creds: &WifiCredentials) -> Result<Configuration, WifiError> {
    let auth_method = if creds.is_open() {
        AuthMethod::None
    } else {
        AuthMethod::WPA2Personal
    };

    Ok(Configuration::Client(ClientConfiguration {
        ssid: creds
            .ssid
            .as_str()
            .try_into()
            .map_err(|_| CredentialError::SsidTooLong {
                len: creds.ssid.len(),
                max: MAX_SSID_LEN,
            })?,
        password: creds
            .password
            .as_str()
            .try_into()
            .map_err(|_| CredentialError::PasswordTooLong {
                len: creds.password.len(),
                max: MAX_PASSWORD_LEN,
            })?,
        auth_method,
        ..Default::default()
    }))
}

fn run_manager(
    resources: Resources,
    callbacks: &CallbackTable,
    events: Sender<Command>,
    commands: Receiver<Command>,
    erase_first: bool,
) -> Result<(), WifiError> {
    let Resources {
        modem,
        sysloop,
        partition,
    } = resources;

    let nvs = init_nvs(partition.clone())?;
    let wifi = EspWifi::new(modem, sysloop.clone(), Some(partition))?;

    let driver_events = events.clone();
    let _driver_subscription = sysloop.subscribe::<DriverEvent, _>(move |event| {
        if matches!(event, DriverEvent::StaDisconnected { .. }) {
            let _ = driver_events.send(Command::Disconnected);
        }
    })?;
    let _ip_subscription = sysloop.subscribe::<IpEvent, _>(move |event| {
        if matches!(event, IpEvent::DhcpIpAssigned { .. }) {
            let _ = events.send(Command::GotIp);
        }
    })?;

    let mut station = Station::new(
        NvsStore(nvs),
        EspStation {
            wifi,
            started: false,
        },
        Arc::new(ThreadDelay),
    );
    station.boot(erase_first);
    station.run(commands, callbacks);

    Ok(())
}
