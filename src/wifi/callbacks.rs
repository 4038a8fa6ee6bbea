//! Event callback table shared by the Wi-Fi manager implementations.

use super::{EventHandler, EventInfo, WifiEvent};
use log::trace;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// One handler slot per event kind.
#[derive(Default)]
pub struct CallbackTable {
    slots: Mutex<HashMap<WifiEvent, EventHandler>>,
}

impl CallbackTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `handler` for `event`, replacing any previous handler.
    ///
    /// Returns true if a handler was replaced.
    pub fn set(&self, event: WifiEvent, handler: EventHandler) -> bool {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.insert(event, handler).is_some()
    }

    /// Invoke the handler registered for `info.event`.
    ///
    /// The handler runs on the caller's thread without the table locked, so a
    /// handler may itself register callbacks. Returns false if no handler is
    /// registered.
    pub fn dispatch(&self, info: &EventInfo) -> bool {
        let handler = {
            let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            slots.get(&info.event).cloned()
        };
        match handler {
            Some(handler) => {
                handler(info);
                true
            }
            None => {
                trace!("No callback registered for {}", info.event);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting_handler(counter: &Arc<AtomicUsize>) -> EventHandler {
        let counter = counter.clone();
        Arc::new(move |_info: &EventInfo| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_dispatch_without_handler() {
        let table = CallbackTable::new();
        assert!(!table.dispatch(&EventInfo::new(WifiEvent::StaGotIp)));
    }

    #[test]
    fn test_dispatch_routes_by_event() {
        let table = CallbackTable::new();
        let got_ip = Arc::new(AtomicUsize::new(0));
        let disconnected = Arc::new(AtomicUsize::new(0));
        table.set(WifiEvent::StaGotIp, counting_handler(&got_ip));
        table.set(WifiEvent::StaDisconnected, counting_handler(&disconnected));

        assert!(table.dispatch(&EventInfo::new(WifiEvent::StaGotIp)));
        assert!(table.dispatch(&EventInfo::new(WifiEvent::StaGotIp)));
        assert!(table.dispatch(&EventInfo::new(WifiEvent::StaDisconnected)));

        assert_eq!(got_ip.load(Ordering::SeqCst), 2);
        assert_eq!(disconnected.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_registration_replaces_previous_handler() {
        let table = CallbackTable::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        assert!(!table.set(WifiEvent::StaGotIp, counting_handler(&first)));
        assert!(table.set(WifiEvent::StaGotIp, counting_handler(&second)));
        table.dispatch(&EventInfo::new(WifiEvent::StaGotIp));

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_handler_can_register_during_dispatch() {
        let table = Arc::new(CallbackTable::new());
        let inner = table.clone();
        table.set(
            WifiEvent::StaGotIp,
            Arc::new(move |_info: &EventInfo| {
                inner.set(WifiEvent::StaDisconnected, Arc::new(|_: &EventInfo| {}));
            }),
        );

        assert!(table.dispatch(&EventInfo::new(WifiEvent::StaGotIp)));
        assert!(table.dispatch(&EventInfo::new(WifiEvent::StaDisconnected)));
    }

    #[test]
    fn test_handler_receives_event_info() {
        let table = CallbackTable::new();
        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();
        table.set(
            WifiEvent::StaGotIp,
            Arc::new(move |info: &EventInfo| {
                *sink.lock().unwrap() = info.ip;
            }),
        );

        let ip = "192.168.1.42".parse().unwrap();
        table.dispatch(&EventInfo::got_ip(Some(ip)));
        assert_eq!(*seen.lock().unwrap(), Some(ip));
    }
}
