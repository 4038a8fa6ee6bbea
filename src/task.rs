//! Task spawning and delays.
//!
//! On ESP-IDF every std thread is a FreeRTOS task, so a task is spawned as a
//! named thread whose FreeRTOS parameters (priority, core affinity, stack) are
//! applied through [`FreeRtosSpawner`]. On the host, [`StdSpawner`] uses plain
//! threads and ignores priority and affinity.
//!
//! Spawned tasks are detached: the join handle is dropped, so nothing can
//! cancel or join a task once it runs. A task deletes itself by returning.

use log::debug;
use std::borrow::Cow;
use std::ffi::CStr;
use std::fmt;
use std::thread;
use std::time::Duration;

/// Size of one FreeRTOS stack word on the ESP32 (Xtensa LX6 is 32-bit).
pub const STACK_WORD_BYTES: usize = 4;

/// Smallest stack handed to a host thread. Host formatting and logging need
/// more room than the device budgets for.
const HOST_MIN_STACK_BYTES: usize = 64 * 1024;

/// Highest core index on a dual-core ESP32.
pub const MAX_CORE: u8 = 1;

/// Body of a spawned task. Returning from it ends the task.
pub type TaskBody = Box<dyn FnOnce() + Send + 'static>;

/// Static description of a task: name, stack, priority and core affinity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSpec {
    /// Task name as shown in FreeRTOS task listings.
    pub name: &'static CStr,
    /// Stack depth in words.
    pub stack_words: usize,
    /// FreeRTOS priority (higher runs first).
    pub priority: u8,
    /// Core the task is pinned to, `None` for no affinity.
    pub core: Option<u8>,
}

impl TaskSpec {
    /// Create a new task description.
    pub const fn new(
        name: &'static CStr,
        stack_words: usize,
        priority: u8,
        core: Option<u8>,
    ) -> Self {
        Self {
            name,
            stack_words,
            priority,
            core,
        }
    }

    /// Stack size in bytes.
    pub fn stack_bytes(&self) -> usize {
        self.stack_words * STACK_WORD_BYTES
    }

    /// Task name as a string.
    pub fn name(&self) -> Cow<'static, str> {
        self.name.to_string_lossy()
    }

    /// Check that the spec can be spawned.
    pub fn validate(&self) -> Result<(), SpawnError> {
        if self.stack_words == 0 {
            return Err(SpawnError::InvalidSpec(format!(
                "{}: stack size must be non-zero",
                self.name()
            )));
        }
        if let Some(core) = self.core {
            if core > MAX_CORE {
                return Err(SpawnError::InvalidSpec(format!(
                    "{}: core {} does not exist (max {})",
                    self.name(),
                    core,
                    MAX_CORE
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Display for TaskSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (stack {} words, priority {}",
            self.name(),
            self.stack_words,
            self.priority
        )?;
        match self.core {
            Some(core) => write!(f, ", core {})", core),
            None => write!(f, ", any core)"),
        }
    }
}

/// Spawns detached tasks.
pub trait Spawner: Send + Sync {
    /// Spawn `body` as a new task described by `spec`.
    ///
    /// Returns as soon as the task is created; the task runs independently.
    fn spawn(&self, spec: &TaskSpec, body: TaskBody) -> Result<(), SpawnError>;
}

/// Blocking delay that yields the processor to other tasks.
pub trait Delay: Send + Sync {
    /// Block the calling task for `duration`.
    fn delay(&self, duration: Duration);
}

/// Delay backed by `std::thread::sleep`.
///
/// On ESP-IDF this ends up in `vTaskDelay`, so the task is suspended rather
/// than busy-waiting.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadDelay;

impl Delay for ThreadDelay {
    fn delay(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Host spawner using plain std threads.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdSpawner;

impl Spawner for StdSpawner {
    fn spawn(&self, spec: &TaskSpec, body: TaskBody) -> Result<(), SpawnError> {
        spec.validate()?;
        debug!("Spawning task {}", spec);
        // Handle dropped: the task is detached.
        let _ = thread::Builder::new()
            .name(spec.name().into_owned())
            .stack_size(spec.stack_bytes().max(HOST_MIN_STACK_BYTES))
            .spawn(body)?;
        Ok(())
    }
}

/// ESP32 spawner that applies FreeRTOS priority, stack and core affinity.
#[cfg(feature = "esp32")]
#[derive(Debug, Default, Clone, Copy)]
pub struct FreeRtosSpawner;

#[cfg(feature = "esp32")]
impl Spawner for FreeRtosSpawner {
    fn spawn(&self, spec: &TaskSpec, body: TaskBody) -> Result<(), SpawnError> {
        use esp_idf_hal::cpu::Core;
        use esp_idf_hal::task::thread::ThreadSpawnConfiguration;

        spec.validate()?;
        let pin_to_core = match spec.core {
            Some(0) => Some(Core::Core0),
            Some(_) => Some(Core::Core1),
            None => None,
        };

        ThreadSpawnConfiguration {
            name: Some(spec.name.to_bytes_with_nul()),
            stack_size: spec.stack_bytes(),
            priority: spec.priority,
            pin_to_core,
            ..Default::default()
        }
        .set()?;

        debug!("Spawning task {}", spec);
        let result = thread::Builder::new()
            .stack_size(spec.stack_bytes())
            .spawn(body);

        // The spawn configuration sticks to the calling task until reset.
        ThreadSpawnConfiguration::default().set()?;

        let _ = result?;
        Ok(())
    }
}

/// Errors that can occur when spawning a task.
#[derive(Debug)]
pub enum SpawnError {
    /// The task description cannot be honoured.
    InvalidSpec(String),
    /// The OS refused to create the thread (e.g. out of memory for the stack).
    Io(std::io::Error),
    /// ESP-IDF rejected the FreeRTOS spawn configuration.
    #[cfg(feature = "esp32")]
    Esp(esp_idf_sys::EspError),
}

impl fmt::Display for SpawnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSpec(msg) => write!(f, "invalid task spec: {}", msg),
            Self::Io(e) => write!(f, "thread creation failed: {}", e),
            #[cfg(feature = "esp32")]
            Self::Esp(e) => write!(f, "ESP error: {:?}", e),
        }
    }
}

impl std::error::Error for SpawnError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SpawnError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

#[cfg(feature = "esp32")]
impl From<esp_idf_sys::EspError> for SpawnError {
    fn from(e: esp_idf_sys::EspError) -> Self {
        Self::Esp(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Instant;

    const SPEC: TaskSpec = TaskSpec::new(c"test_task", 2048, 3, Some(1));

    #[test]
    fn test_stack_bytes_uses_word_size() {
        assert_eq!(SPEC.stack_bytes(), 8192);
    }

    #[test]
    fn test_name() {
        assert_eq!(SPEC.name(), "test_task");
    }

    #[test]
    fn test_display() {
        assert_eq!(
            SPEC.to_string(),
            "test_task (stack 2048 words, priority 3, core 1)"
        );
        let unpinned = TaskSpec::new(c"free", 512, 7, None);
        assert_eq!(
            unpinned.to_string(),
            "free (stack 512 words, priority 7, any core)"
        );
    }

    #[test]
    fn test_validate_rejects_zero_stack() {
        let spec = TaskSpec::new(c"empty", 0, 1, None);
        assert!(matches!(spec.validate(), Err(SpawnError::InvalidSpec(_))));
    }

    #[test]
    fn test_validate_rejects_unknown_core() {
        let spec = TaskSpec::new(c"third_core", 1024, 1, Some(2));
        let err = spec.validate().unwrap_err();
        assert!(err.to_string().contains("core 2"));
    }

    #[test]
    fn test_std_spawner_runs_body_on_named_thread() {
        let (tx, rx) = mpsc::channel();
        StdSpawner
            .spawn(
                &SPEC,
                Box::new(move || {
                    let name = thread::current().name().map(str::to_string);
                    tx.send(name).unwrap();
                }),
            )
            .unwrap();

        let name = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(name.as_deref(), Some("test_task"));
    }

    #[test]
    fn test_std_spawner_rejects_invalid_spec() {
        let spec = TaskSpec::new(c"bad", 0, 1, None);
        let result = StdSpawner.spawn(&spec, Box::new(|| {}));
        assert!(result.is_err());
    }

    #[test]
    fn test_thread_delay_blocks() {
        let start = Instant::now();
        ThreadDelay.delay(Duration::from_millis(20));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }
}
