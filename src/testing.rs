//! Recording collaborators for unit tests.
//!
//! Every mock appends to a shared [`CallLog`] so tests can assert on the
//! relative order of calls made across collaborators. [`capture_logs`]
//! records what the code under test logs on the calling thread.

use crate::diagnostics::Diagnostics;
use crate::task::{Delay, SpawnError, Spawner, TaskBody, TaskSpec};
use crate::wifi::{CallbackTable, EventHandler, EventInfo, WifiError, WifiEvent, WifiManager};
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::sync::{Arc, Mutex, Once};
use std::thread::{self, ThreadId};
use std::time::Duration;

/// A call made to a mock collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    EraseConfigOnStart,
    Start,
    SetCallback(WifiEvent),
    DisconnectAndDeleteConfig,
    Delay(Duration),
    FreeHeap,
    HighWaterMark,
    Spawn(String),
}

/// Shared, ordered record of calls.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, call: Call) {
        self.0.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

/// Wi-Fi manager that records calls and fires events on demand.
pub struct MockWifi {
    log: CallLog,
    callbacks: CallbackTable,
    fail_delete: bool,
}

impl MockWifi {
    pub fn new(log: &CallLog) -> Self {
        Self {
            log: log.clone(),
            callbacks: CallbackTable::new(),
            fail_delete: false,
        }
    }

    /// Make `disconnect_and_delete_config_async` return an error.
    pub fn failing_delete(log: &CallLog) -> Self {
        Self {
            fail_delete: true,
            ..Self::new(log)
        }
    }

    /// Dispatch `event` as the manager task would.
    pub fn fire(&self, event: WifiEvent) -> bool {
        self.callbacks.dispatch(&EventInfo::new(event))
    }
}

impl WifiManager for MockWifi {
    fn start(&self) -> Result<(), WifiError> {
        self.log.push(Call::Start);
        Ok(())
    }

    fn erase_config_on_start(&self) -> Result<(), WifiError> {
        self.log.push(Call::EraseConfigOnStart);
        Ok(())
    }

    fn set_callback(&self, event: WifiEvent, handler: EventHandler) {
        self.log.push(Call::SetCallback(event));
        self.callbacks.set(event, handler);
    }

    fn disconnect_and_delete_config_async(&self) -> Result<(), WifiError> {
        self.log.push(Call::DisconnectAndDeleteConfig);
        if self.fail_delete {
            return Err(WifiError::ManagerGone);
        }
        Ok(())
    }
}

/// Delay that records the requested duration and returns immediately.
pub struct RecordingDelay {
    log: CallLog,
}

impl RecordingDelay {
    pub fn new(log: &CallLog) -> Self {
        Self { log: log.clone() }
    }
}

impl Delay for RecordingDelay {
    fn delay(&self, duration: Duration) {
        self.log.push(Call::Delay(duration));
    }
}

/// Diagnostics that record each query.
pub struct MockDiagnostics {
    log: CallLog,
}

impl MockDiagnostics {
    pub const FREE_HEAP: u32 = 123_456;
    pub const HIGH_WATER_MARK: u32 = 789;

    pub fn new(log: &CallLog) -> Self {
        Self { log: log.clone() }
    }
}

impl Diagnostics for MockDiagnostics {
    fn free_heap_bytes(&self) -> u32 {
        self.log.push(Call::FreeHeap);
        Self::FREE_HEAP
    }

    fn stack_high_water_mark(&self) -> u32 {
        self.log.push(Call::HighWaterMark);
        Self::HIGH_WATER_MARK
    }
}

/// Spawner that holds task bodies until the test runs them.
pub struct QueueSpawner {
    log: CallLog,
    pending: Mutex<Vec<(TaskSpec, TaskBody)>>,
    fail: bool,
}

impl QueueSpawner {
    pub fn new(log: &CallLog) -> Self {
        Self {
            log: log.clone(),
            pending: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    /// Spawner whose every spawn fails.
    pub fn failing(log: &CallLog) -> Self {
        Self {
            fail: true,
            ..Self::new(log)
        }
    }

    /// Specs of tasks spawned and not yet run, in spawn order.
    pub fn pending_specs(&self) -> Vec<TaskSpec> {
        self.pending.lock().unwrap().iter().map(|(spec, _)| *spec).collect()
    }

    /// Remove and return the oldest pending task named `name`.
    pub fn take(&self, name: &str) -> Option<TaskBody> {
        let mut pending = self.pending.lock().unwrap();
        let index = pending.iter().position(|(spec, _)| spec.name() == name)?;
        Some(pending.remove(index).1)
    }
}

impl Spawner for QueueSpawner {
    fn spawn(&self, spec: &TaskSpec, body: TaskBody) -> Result<(), SpawnError> {
        spec.validate()?;
        if self.fail {
            return Err(SpawnError::Io(std::io::Error::new(
                std::io::ErrorKind::OutOfMemory,
                "no memory for task stack",
            )));
        }
        self.log.push(Call::Spawn(spec.name().into_owned()));
        self.pending.lock().unwrap().push((*spec, body));
        Ok(())
    }
}

/// A log record seen by the capturing logger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedRecord {
    pub level: Level,
    pub target: String,
    pub message: String,
}

struct CaptureLogger {
    records: Mutex<Vec<(ThreadId, CapturedRecord)>>,
    watched: Mutex<Vec<ThreadId>>,
}

static LOGGER: CaptureLogger = CaptureLogger {
    records: Mutex::new(Vec::new()),
    watched: Mutex::new(Vec::new()),
};

static INSTALL: Once = Once::new();

impl Log for CaptureLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        let thread = thread::current().id();
        if !self.watched.lock().unwrap().contains(&thread) {
            return;
        }
        self.records.lock().unwrap().push((
            thread,
            CapturedRecord {
                level: record.level(),
                target: record.target().to_string(),
                message: record.args().to_string(),
            },
        ));
    }

    fn flush(&self) {}
}

/// Records logged on the current thread while the guard lives.
pub struct LogCapture {
    thread: ThreadId,
}

/// Start capturing log records emitted on the calling thread.
pub fn capture_logs() -> LogCapture {
    INSTALL.call_once(|| {
        let _ = log::set_logger(&LOGGER);
        log::set_max_level(LevelFilter::Trace);
    });
    let thread = thread::current().id();
    LOGGER.records.lock().unwrap().retain(|(t, _)| *t != thread);
    LOGGER.watched.lock().unwrap().push(thread);
    LogCapture { thread }
}

impl LogCapture {
    /// Records captured so far, oldest first.
    pub fn records(&self) -> Vec<CapturedRecord> {
        LOGGER
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _)| *t == self.thread)
            .map(|(_, r)| r.clone())
            .collect()
    }

    /// True if a record at `level` for `target` contains `text`.
    pub fn contains(&self, level: Level, target: &str, text: &str) -> bool {
        self.records()
            .iter()
            .any(|r| r.level == level && r.target == target && r.message.contains(text))
    }
}

impl Drop for LogCapture {
    fn drop(&mut self) {
        LOGGER.watched.lock().unwrap().retain(|t| *t != self.thread);
        LOGGER.records.lock().unwrap().retain(|(t, _)| *t != self.thread);
    }
}
