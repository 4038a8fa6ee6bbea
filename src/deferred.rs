//! Deferred Wi-Fi configuration wipe.
//!
//! The got-IP callback runs on the Wi-Fi manager's task and must return
//! quickly, so the disruptive part (dropping the connection and erasing the
//! stored configuration) runs on a separate one-shot task:
//!
//! 1. wait for the configured delay, letting the manager finish handling the
//!    event that triggered the wipe;
//! 2. ask the manager to disconnect and delete its configuration;
//! 3. log the task's stack high-water mark;
//! 4. return, which deletes the task.
//!
//! The task is spawned detached and cannot be cancelled or joined. Under
//! [`WipePolicy::Overlap`] every request spawns a new task even if earlier
//! ones are still waiting; [`WipePolicy::SingleFlight`] keeps at most one
//! pending.

use crate::config::{AppConfig, WipePolicy};
use crate::diagnostics::Diagnostics;
use crate::task::{Delay, SpawnError, Spawner, TaskSpec};
use crate::wifi::WifiManager;
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Log target for the wipe task.
const LOG_TARGET: &str = "work";

/// Result of a wipe request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleOutcome {
    /// A wipe task was spawned.
    Spawned,
    /// A wipe is already pending and the policy forbids another.
    AlreadyPending,
}

/// Held by a pending wipe under [`WipePolicy::SingleFlight`]; frees the slot on drop.
struct PendingSlot(Arc<AtomicBool>);

impl PendingSlot {
    fn claim(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag.clone()))
    }
}

impl Drop for PendingSlot {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Body of one wipe task.
pub struct ConfigWipeTask {
    wifi: Arc<dyn WifiManager>,
    diagnostics: Arc<dyn Diagnostics>,
    delay: Arc<dyn Delay>,
    wait: Duration,
    _slot: Option<PendingSlot>,
}

impl ConfigWipeTask {
    /// Run the wipe once.
    pub fn run(self) {
        self.delay.delay(self.wait);

        if let Err(e) = self.wifi.disconnect_and_delete_config_async() {
            warn!(target: LOG_TARGET, "Disconnect and delete request failed: {}", e);
        }

        let water_line = self.diagnostics.stack_high_water_mark();
        info!(target: LOG_TARGET, "Water line: {}", water_line);
    }
}

/// Spawns wipe tasks on request.
pub struct ConfigWipeScheduler {
    wifi: Arc<dyn WifiManager>,
    diagnostics: Arc<dyn Diagnostics>,
    delay: Arc<dyn Delay>,
    spawner: Arc<dyn Spawner>,
    task: TaskSpec,
    wait: Duration,
    policy: WipePolicy,
    pending: Arc<AtomicBool>,
}

impl ConfigWipeScheduler {
    /// Create a scheduler using the wipe settings from `config`.
    pub fn new(
        wifi: Arc<dyn WifiManager>,
        diagnostics: Arc<dyn Diagnostics>,
        delay: Arc<dyn Delay>,
        spawner: Arc<dyn Spawner>,
        config: &AppConfig,
    ) -> Self {
        Self {
            wifi,
            diagnostics,
            delay,
            spawner,
            task: config.wipe_task,
            wait: config.wipe_delay,
            policy: config.wipe_policy,
            pending: Arc::new(AtomicBool::new(false)),
        }
    }

    /// True while a single-flight wipe is pending.
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Spawn a wipe task. Returns as soon as the task is created.
    pub fn schedule(&self) -> Result<ScheduleOutcome, SpawnError> {
        let slot = match self.policy {
            WipePolicy::Overlap => None,
            WipePolicy::SingleFlight => match PendingSlot::claim(&self.pending) {
                Some(slot) => Some(slot),
                None => return Ok(ScheduleOutcome::AlreadyPending),
            },
        };

        let task = ConfigWipeTask {
            wifi: self.wifi.clone(),
            diagnostics: self.diagnostics.clone(),
            delay: self.delay.clone(),
            wait: self.wait,
            _slot: slot,
        };
        // On failure the body, and with it the slot, is dropped.
        self.spawner.spawn(&self.task, Box::new(move || task.run()))?;
        debug!(target: LOG_TARGET, "Config wipe scheduled in {:?}", self.wait);
        Ok(ScheduleOutcome::Spawned)
    }
}
