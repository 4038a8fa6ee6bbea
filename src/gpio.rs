//! Digital GPIO access by pin number.
//!
//! The application only needs to configure a pin direction, drive an output
//! and read a level, so the bank is addressed by pin index. On the device
//! each index is backed by a HAL `PinDriver`.

#[cfg(feature = "esp32")]
use esp_idf_hal::gpio::{AnyIOPin, Input, Output, PinDriver};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Number of GPIO pads on the ESP32 (GPIO0..=GPIO39).
pub const GPIO_PIN_COUNT: u8 = 40;

/// Pin direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    /// Pin is read.
    Input,
    /// Pin is driven.
    Output,
}

/// GPIO driver.
pub trait Gpio: Send {
    /// Set the direction of `pin`.
    fn set_direction(&mut self, pin: u8, mode: PinMode) -> Result<(), GpioError>;

    /// Drive `pin` high (`true`) or low (`false`).
    fn set_level(&mut self, pin: u8, high: bool) -> Result<(), GpioError>;

    /// Read the level of `pin`.
    fn get_level(&self, pin: u8) -> Result<bool, GpioError>;
}

/// Check a pin index against the pad count.
pub fn check_pin(pin: u8) -> Result<(), GpioError> {
    if pin >= GPIO_PIN_COUNT {
        return Err(GpioError::InvalidPin(pin));
    }
    Ok(())
}

/// Pin driver owned by [`EspGpio`].
#[cfg(feature = "esp32")]
enum EspPin {
    Input(PinDriver<'static, AnyIOPin, Input>),
    Output(PinDriver<'static, AnyIOPin, Output>),
}

/// ESP-IDF GPIO bank built on `esp_idf_hal` pin drivers.
///
/// Pins are claimed by number on first use. A pin that is read before its
/// direction is set gets an input driver.
#[cfg(feature = "esp32")]
#[derive(Default)]
pub struct EspGpio {
    pins: Mutex<std::collections::HashMap<u8, EspPin>>,
}

#[cfg(feature = "esp32")]
impl EspGpio {
    /// Create a bank with no pins claimed.
    pub fn new() -> Self {
        Self::default()
    }

    fn claim(pin: u8, mode: PinMode) -> Result<EspPin, GpioError> {
        check_pin(pin)?;
        // Each pad number is claimed by at most one driver in this bank.
        let any = unsafe { AnyIOPin::new(i32::from(pin)) };
        Ok(match mode {
            PinMode::Input => EspPin::Input(PinDriver::input(any)?),
            PinMode::Output => EspPin::Output(PinDriver::output(any)?),
        })
    }
}

#[cfg(feature = "esp32")]
impl Gpio for EspGpio {
    fn set_direction(&mut self, pin: u8, mode: PinMode) -> Result<(), GpioError> {
        let pins = self.pins.get_mut().unwrap_or_else(PoisonError::into_inner);
        // Release the old driver before claiming the pad again.
        pins.remove(&pin);
        pins.insert(pin, Self::claim(pin, mode)?);
        Ok(())
    }

    fn set_level(&mut self, pin: u8, high: bool) -> Result<(), GpioError> {
        check_pin(pin)?;
        let pins = self.pins.get_mut().unwrap_or_else(PoisonError::into_inner);
        match pins.get_mut(&pin) {
            Some(EspPin::Output(driver)) => {
                driver.set_level(high.into())?;
                Ok(())
            }
            _ => Err(GpioError::NotOutput(pin)),
        }
    }

    fn get_level(&self, pin: u8) -> Result<bool, GpioError> {
        check_pin(pin)?;
        let mut pins = self.pins.lock().unwrap_or_else(PoisonError::into_inner);
        if !pins.contains_key(&pin) {
            pins.insert(pin, Self::claim(pin, PinMode::Input)?);
        }
        Ok(match pins.get(&pin) {
            Some(EspPin::Input(driver)) => driver.is_high(),
            Some(EspPin::Output(driver)) => driver.is_set_high(),
            None => false,
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct PinState {
    mode: Option<PinMode>,
    level: bool,
}

/// In-memory GPIO bank for host runs and tests.
///
/// Clones share the same pins, so a test can keep a handle while the
/// monitoring task owns another.
#[derive(Debug, Clone)]
pub struct SimulatedGpio {
    pins: Arc<Mutex<[PinState; GPIO_PIN_COUNT as usize]>>,
}

impl SimulatedGpio {
    /// Create a bank with every pin unconfigured and low.
    pub fn new() -> Self {
        Self {
            pins: Arc::new(Mutex::new(
                [PinState::default(); GPIO_PIN_COUNT as usize],
            )),
        }
    }

    /// Set the externally applied level of an input pin.
    pub fn set_input(&self, pin: u8, high: bool) -> Result<(), GpioError> {
        check_pin(pin)?;
        self.with_pin(pin, |state| state.level = high);
        Ok(())
    }

    /// Current direction of `pin`, if configured.
    pub fn mode(&self, pin: u8) -> Option<PinMode> {
        if check_pin(pin).is_err() {
            return None;
        }
        self.with_pin(pin, |state| state.mode)
    }

    fn with_pin<R>(&self, pin: u8, f: impl FnOnce(&mut PinState) -> R) -> R {
        let mut pins = self.pins.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut pins[pin as usize])
    }
}

impl Default for SimulatedGpio {
    fn default() -> Self {
        Self::new()
    }
}

impl Gpio for SimulatedGpio {
    fn set_direction(&mut self, pin: u8, mode: PinMode) -> Result<(), GpioError> {
        check_pin(pin)?;
        self.with_pin(pin, |state| state.mode = Some(mode));
        Ok(())
    }

    fn set_level(&mut self, pin: u8, high: bool) -> Result<(), GpioError> {
        check_pin(pin)?;
        self.with_pin(pin, |state| {
            if state.mode != Some(PinMode::Output) {
                return Err(GpioError::NotOutput(pin));
            }
            state.level = high;
            Ok(())
        })
    }

    fn get_level(&self, pin: u8) -> Result<bool, GpioError> {
        check_pin(pin)?;
        Ok(self.with_pin(pin, |state| state.level))
    }
}

/// GPIO errors.
#[derive(Debug)]
pub enum GpioError {
    /// Pin index outside the pad range.
    InvalidPin(u8),
    /// Attempt to drive a pin that is not configured as output.
    NotOutput(u8),
    /// ESP-IDF driver error.
    #[cfg(feature = "esp32")]
    Esp(esp_idf_sys::EspError),
}

impl fmt::Display for GpioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPin(pin) => {
                write!(f, "invalid GPIO pin {} (max {})", pin, GPIO_PIN_COUNT - 1)
            }
            Self::NotOutput(pin) => write!(f, "GPIO{} is not configured as output", pin),
            #[cfg(feature = "esp32")]
            Self::Esp(e) => write!(f, "ESP error: {:?}", e),
        }
    }
}

impl std::error::Error for GpioError {}

#[cfg(feature = "esp32")]
impl From<esp_idf_sys::EspError> for GpioError {
    fn from(e: esp_idf_sys::EspError) -> Self {
        Self::Esp(e)
    }
}
