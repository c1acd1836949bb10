//! In-process event bus for model change notifications.
//!
//! # Responsibility
//! - Deliver `settings.*` events to subscribed components.
//! - Keep publishers unaware of who listens.
//!
//! # Invariants
//! - Delivery is synchronous, on the publishing thread, in subscription order.
//! - No subscriber lock is held while a subscriber runs, so handlers may
//!   subscribe, unsubscribe or publish.
//! - Publishers emit only after their write has committed.

use crate::model::setting::{Setting, SettingValue};
use log::debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

pub const SETTINGS_EDITED: &str = "settings.edited";

/// Events published by core services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// A setting value changed and was committed.
    SettingEdited {
        setting: Setting,
        previous: SettingValue,
    },
}

impl AppEvent {
    /// Stable event name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SettingEdited { .. } => SETTINGS_EDITED,
        }
    }

    /// Key-scoped name, e.g. `settings.title.edited`.
    pub fn scoped_name(&self) -> String {
        match self {
            Self::SettingEdited { setting, .. } => format!("settings.{}.edited", setting.key),
        }
    }
}

/// Receiver of bus events. Handlers deal with their own failures.
pub trait EventSubscriber: Send + Sync {
    fn handle(&self, event: &AppEvent);
}

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
pub struct EventBus {
    subscribers: RwLock<Vec<(SubscriptionId, Arc<dyn EventSubscriber>)>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, subscriber: Arc<dyn EventSubscriber>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.write_subscribers().push((id, subscriber));
        id
    }

    /// Returns whether the subscription existed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.write_subscribers();
        let before = subscribers.len();
        subscribers.retain(|(existing, _)| *existing != id);
        subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.read_subscribers().len()
    }

    pub fn publish(&self, event: &AppEvent) {
        let snapshot = self
            .read_subscribers()
            .iter()
            .map(|(_, subscriber)| Arc::clone(subscriber))
            .collect::<Vec<_>>();
        debug!(
            "event=bus_publish module=events name={} scoped={} subscribers={}",
            event.name(),
            event.scoped_name(),
            snapshot.len()
        );
        for subscriber in snapshot {
            subscriber.handle(event);
        }
    }

    fn read_subscribers(
        &self,
    ) -> std::sync::RwLockReadGuard<'_, Vec<(SubscriptionId, Arc<dyn EventSubscriber>)>> {
        self.subscribers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_subscribers(
        &self,
    ) -> std::sync::RwLockWriteGuard<'_, Vec<(SubscriptionId, Arc<dyn EventSubscriber>)>> {
        self.subscribers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::{AppEvent, EventBus, EventSubscriber};
    use crate::model::setting::{Setting, SettingType, SettingValue};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<String>>,
    }

    impl EventSubscriber for Recorder {
        fn handle(&self, event: &AppEvent) {
            self.seen.lock().unwrap().push(event.scoped_name());
        }
    }

    fn edited(key: &str) -> AppEvent {
        AppEvent::SettingEdited {
            setting: Setting {
                id: "1".to_string(),
                key: key.to_string(),
                group: "core".to_string(),
                kind: SettingType::String,
                value: SettingValue::text("v"),
                flags: vec![],
                created_at: 0,
                updated_at: 0,
            },
            previous: SettingValue::Null,
        }
    }

    #[test]
    fn delivers_to_subscribers_until_unsubscribed() {
        let bus = EventBus::new();
        let recorder = Arc::new(Recorder::default());
        let id = bus.subscribe(recorder.clone());

        bus.publish(&edited("title"));
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.publish(&edited("description"));

        assert_eq!(*recorder.seen.lock().unwrap(), vec!["settings.title.edited"]);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn event_name_is_stable() {
        assert_eq!(edited("title").name(), "settings.edited");
    }
}
