//! Application configuration.
//!
//! Every timing, pin and task constant of the application lives here so the
//! host binary and tests can vary them.
//!
//! # Components
//!
//! - [`app`] - [`AppConfig`] with defaults, validation and overrides
//!
//! Wi-Fi credentials are not part of this configuration; they belong to the
//! Wi-Fi manager (see [`crate::wifi::credentials`]).

mod app;

pub use app::{
    AppConfig, AppConfigError, WipePolicy, CONFIG_WIPE_DELAY, CONFIG_WIPE_TASK, MONITOR_INPUT_PIN,
    MONITOR_OUTPUT_PIN, MONITOR_PERIOD, MONITOR_TASK,
};
