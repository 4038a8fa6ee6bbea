//! Application timing, pin and task settings.

use crate::gpio::GPIO_PIN_COUNT;
use crate::task::TaskSpec;
use crate::wifi::WIFI_MANAGER_TASK_PRIORITY;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Monitoring cycle period.
pub const MONITOR_PERIOD: Duration = Duration::from_millis(2000);

/// Pin sampled by the monitoring task.
pub const MONITOR_INPUT_PIN: u8 = 0;

/// Pin toggled by the monitoring task.
pub const MONITOR_OUTPUT_PIN: u8 = 2;

/// Monitoring task: pinned to core 1, below the Wi-Fi manager's priority.
pub const MONITOR_TASK: TaskSpec = TaskSpec::new(c"monitoring_task", 2048, 1, Some(1));

/// Wait between the got-IP event and the configuration wipe.
pub const CONFIG_WIPE_DELAY: Duration = Duration::from_millis(2000);

/// Deferred configuration-wipe task: two levels above the Wi-Fi manager.
pub const CONFIG_WIPE_TASK: TaskSpec =
    TaskSpec::new(c"config_wipe", 2048, WIFI_MANAGER_TASK_PRIORITY + 2, None);

/// What to do when a got-IP event arrives while a wipe is still pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WipePolicy {
    /// Spawn another wipe task; pending ones keep running.
    #[default]
    Overlap,
    /// Skip the event; at most one wipe task is pending.
    SingleFlight,
}

impl WipePolicy {
    /// Name used in overrides and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Overlap => "overlap",
            Self::SingleFlight => "single-flight",
        }
    }
}

impl FromStr for WipePolicy {
    type Err = AppConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "overlap" => Ok(Self::Overlap),
            "single-flight" | "single_flight" => Ok(Self::SingleFlight),
            _ => Err(AppConfigError::InvalidOverride {
                key: "WIPE_POLICY",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for WipePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Application settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Monitoring cycle period.
    pub monitor_period: Duration,
    /// Pin sampled every cycle.
    pub input_pin: u8,
    /// Pin toggled every cycle.
    pub output_pin: u8,
    /// Monitoring task parameters.
    pub monitor_task: TaskSpec,
    /// Wait before the deferred configuration wipe.
    pub wipe_delay: Duration,
    /// Deferred wipe task parameters.
    pub wipe_task: TaskSpec,
    /// Handling of overlapping wipes.
    pub wipe_policy: WipePolicy,
    /// Erase the stored Wi-Fi configuration right after the manager starts.
    pub wipe_on_boot: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            monitor_period: MONITOR_PERIOD,
            input_pin: MONITOR_INPUT_PIN,
            output_pin: MONITOR_OUTPUT_PIN,
            monitor_task: MONITOR_TASK,
            wipe_delay: CONFIG_WIPE_DELAY,
            wipe_task: CONFIG_WIPE_TASK,
            wipe_policy: WipePolicy::default(),
            wipe_on_boot: false,
        }
    }
}

impl AppConfig {
    /// Defaults with overrides from the process environment.
    pub fn from_env() -> Result<Self, AppConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults with overrides from `lookup`.
    ///
    /// Recognised keys: `MONITOR_PERIOD_MS`, `WIPE_DELAY_MS`, `WIPE_POLICY`,
    /// `WIPE_ON_BOOT`. The result is validated.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppConfigError> {
        let mut config = Self::default();

        if let Some(value) = lookup("MONITOR_PERIOD_MS") {
            config.monitor_period = parse_millis("MONITOR_PERIOD_MS", &value)?;
        }
        if let Some(value) = lookup("WIPE_DELAY_MS") {
            config.wipe_delay = parse_millis("WIPE_DELAY_MS", &value)?;
        }
        if let Some(value) = lookup("WIPE_POLICY") {
            config.wipe_policy = value.parse()?;
        }
        if let Some(value) = lookup("WIPE_ON_BOOT") {
            config.wipe_on_boot = parse_flag("WIPE_ON_BOOT", &value)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check the settings are usable.
    pub fn validate(&self) -> Result<(), AppConfigError> {
        if self.monitor_period.is_zero() {
            return Err(AppConfigError::ZeroDuration("monitor_period"));
        }
        if self.wipe_delay.is_zero() {
            return Err(AppConfigError::ZeroDuration("wipe_delay"));
        }
        for pin in [self.input_pin, self.output_pin] {
            if pin >= GPIO_PIN_COUNT {
                return Err(AppConfigError::InvalidPin(pin));
            }
        }
        if self.input_pin == self.output_pin {
            return Err(AppConfigError::SamePin(self.input_pin));
        }
        for spec in [&self.monitor_task, &self.wipe_task] {
            spec.validate()
                .map_err(|e| AppConfigError::InvalidTask(e.to_string()))?;
        }
        if self.monitor_task.priority >= WIFI_MANAGER_TASK_PRIORITY {
            return Err(AppConfigError::MonitorPriorityTooHigh {
                priority: self.monitor_task.priority,
                limit: WIFI_MANAGER_TASK_PRIORITY,
            });
        }
        Ok(())
    }
}

fn parse_millis(key: &'static str, value: &str) -> Result<Duration, AppConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| AppConfigError::InvalidOverride {
            key,
            value: value.to_string(),
        })
}

fn parse_flag(key: &'static str, value: &str) -> Result<bool, AppConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(AppConfigError::InvalidOverride {
            key,
            value: value.to_string(),
        }),
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppConfigError {
    /// A period or delay is zero.
    ZeroDuration(&'static str),
    /// Pin index outside the pad range.
    InvalidPin(u8),
    /// Input and output use the same pin.
    SamePin(u8),
    /// A task description cannot be spawned.
    InvalidTask(String),
    /// The monitoring task would compete with the Wi-Fi manager.
    MonitorPriorityTooHigh { priority: u8, limit: u8 },
    /// An override value could not be parsed.
    InvalidOverride { key: &'static str, value: String },
}

impl fmt::Display for AppConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroDuration(name) => write!(f, "{} must be non-zero", name),
            Self::InvalidPin(pin) => write!(f, "invalid GPIO pin {}", pin),
            Self::SamePin(pin) => write!(f, "input and output both use GPIO{}", pin),
            Self::InvalidTask(msg) => write!(f, "{}", msg),
            Self::MonitorPriorityTooHigh { priority, limit } => write!(
                f,
                "monitoring priority {} must be below the Wi-Fi manager priority {}",
                priority, limit
            ),
            Self::InvalidOverride { key, value } => {
                write!(f, "invalid value for {}: {:?}", key, value)
            }
        }
    }
}

impl std::error::Error for AppConfigError {}
