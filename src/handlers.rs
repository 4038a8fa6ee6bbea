//! Wi-Fi event callbacks registered at bootstrap.
//!
//! Both run on the Wi-Fi manager's task, so neither may block: the got-IP
//! handler only hands the wipe off to a new task.

use crate::deferred::{ConfigWipeScheduler, ScheduleOutcome};
use crate::wifi::{EventHandler, EventInfo};
use log::{error, info};
use std::sync::Arc;

const LOG_TARGET: &str = "work";

/// Handler for [`WifiEvent::StaGotIp`](crate::wifi::WifiEvent::StaGotIp).
pub fn on_got_ip(scheduler: Arc<ConfigWipeScheduler>) -> EventHandler {
    Arc::new(move |event: &EventInfo| {
        match event.ip {
            Some(ip) => info!(target: LOG_TARGET, "I have a connection! ({})", ip),
            None => info!(target: LOG_TARGET, "I have a connection!"),
        }
        match scheduler.schedule() {
            Ok(ScheduleOutcome::Spawned) => {}
            Ok(ScheduleOutcome::AlreadyPending) => {
                info!(target: LOG_TARGET, "Config wipe already pending, skipping")
            }
            Err(e) => error!(target: LOG_TARGET, "Failed to spawn config wipe task: {}", e),
        }
    })
}

/// Handler for [`WifiEvent::StaDisconnected`](crate::wifi::WifiEvent::StaDisconnected).
pub fn on_disconnected() -> EventHandler {
    Arc::new(|_: &EventInfo| {
        info!(target: LOG_TARGET, "Lost connection");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, WipePolicy};
    use crate::testing::{
        capture_logs, Call, CallLog, CapturedRecord, MockDiagnostics, MockWifi, QueueSpawner,
        RecordingDelay,
    };
    use crate::wifi::WifiEvent;
    use log::Level;
    use std::net::Ipv4Addr;

    fn scheduler(
        log: &CallLog,
        spawner: &Arc<QueueSpawner>,
        policy: WipePolicy,
    ) -> Arc<ConfigWipeScheduler> {
        let config = AppConfig {
            wipe_policy: policy,
            ..AppConfig::default()
        };
        Arc::new(ConfigWipeScheduler::new(
            Arc::new(MockWifi::new(log)),
            Arc::new(MockDiagnostics::new(log)),
            Arc::new(RecordingDelay::new(log)),
            spawner.clone(),
            &config,
        ))
    }

    #[test]
    fn test_got_ip_spawns_one_wipe_task() {
        let log = CallLog::new();
        let spawner = Arc::new(QueueSpawner::new(&log));
        let handler = on_got_ip(scheduler(&log, &spawner, WipePolicy::Overlap));

        handler(&EventInfo::got_ip(Some(Ipv4Addr::new(192, 168, 4, 2))));

        assert_eq!(log.calls(), vec![Call::Spawn("config_wipe".into())]);
        let specs = spawner.pending_specs();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].priority, 7);
        assert_eq!(specs[0].core, None);
    }

    #[test]
    fn test_got_ip_without_address() {
        let log = CallLog::new();
        let spawner = Arc::new(QueueSpawner::new(&log));
        let handler = on_got_ip(scheduler(&log, &spawner, WipePolicy::Overlap));

        handler(&EventInfo::new(WifiEvent::StaGotIp));
        assert_eq!(spawner.pending_specs().len(), 1);
    }

    #[test]
    fn test_repeated_got_ip_under_single_flight() {
        let log = CallLog::new();
        let spawner = Arc::new(QueueSpawner::new(&log));
        let handler = on_got_ip(scheduler(&log, &spawner, WipePolicy::SingleFlight));

        let info = EventInfo::got_ip(None);
        handler(&info);
        handler(&info);
        assert_eq!(spawner.pending_specs().len(), 1);
    }

    #[test]
    fn test_got_ip_spawn_failure_does_not_panic() {
        let log = CallLog::new();
        let spawner = Arc::new(QueueSpawner::failing(&log));
        let handler = on_got_ip(scheduler(&log, &spawner, WipePolicy::Overlap));

        handler(&EventInfo::got_ip(None));
        assert!(log.calls().is_empty());
    }

    #[test]
    fn test_disconnected_only_logs() {
        let logs = capture_logs();
        let handler = on_disconnected();

        handler(&EventInfo::new(WifiEvent::StaDisconnected));
        assert_eq!(
            logs.records(),
            vec![CapturedRecord {
                level: Level::Info,
                target: "work".into(),
                message: "Lost connection".into(),
            }]
        );
    }

    #[test]
    fn test_disconnected_never_schedules_wipe() {
        let log = CallLog::new();
        let spawner = Arc::new(QueueSpawner::new(&log));
        let _scheduler = scheduler(&log, &spawner, WipePolicy::Overlap);
        let handler = on_disconnected();

        handler(&EventInfo::new(WifiEvent::StaDisconnected));
        assert!(spawner.pending_specs().is_empty());
        assert!(log.calls().is_empty());
    }

    #[test]
    fn test_got_ip_logs_connection() {
        let logs = capture_logs();
        let log = CallLog::new();
        let spawner = Arc::new(QueueSpawner::new(&log));
        let handler = on_got_ip(scheduler(&log, &spawner, WipePolicy::Overlap));

        handler(&EventInfo::got_ip(Some(Ipv4Addr::new(192, 168, 4, 2))));
        assert!(logs.contains(Level::Info, "work", "I have a connection! (192.168.4.2)"));
    }

    #[test]
    fn test_got_ip_spawn_failure_logs_error() {
        let logs = capture_logs();
        let log = CallLog::new();
        let spawner = Arc::new(QueueSpawner::failing(&log));
        let handler = on_got_ip(scheduler(&log, &spawner, WipePolicy::Overlap));

        handler(&EventInfo::got_ip(None));
        assert!(logs.contains(Level::Error, "work", "Failed to spawn config wipe task"));
    }
}
