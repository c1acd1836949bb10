//! Process-wide settings cache.
//!
//! # Responsibility
//! - Mirror the committed `settings` rows in memory for synchronous reads.
//! - Follow `settings.edited` events published after each committed edit.
//!
//! # Invariants
//! - Holds at most one entry per key, always the latest committed row seen.
//! - Subscribes to the bus at most once, however often `init` runs.
//! - Reads before `init` see an empty cache, never stale data from a
//!   previous `reset`.

use crate::events::{AppEvent, EventBus, EventSubscriber, SubscriptionId};
use crate::model::setting::{Setting, SettingValue};
use log::{debug, info};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
pub struct SettingsCache {
    entries: RwLock<BTreeMap<String, Setting>>,
    subscription: Mutex<Option<SubscriptionId>>,
}

impl SettingsCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Replaces the cache contents and starts following `bus`.
    pub fn init(self: &Arc<Self>, bus: &EventBus, settings: Vec<Setting>) {
        let count = settings.len();
        {
            let mut entries = self.write_entries();
            entries.clear();
            for setting in settings {
                entries.insert(setting.key.clone(), setting);
            }
        }

        let mut subscription = self.lock_subscription();
        if subscription.is_none() {
            let subscriber: Arc<dyn EventSubscriber> = Arc::clone(self) as Arc<dyn EventSubscriber>;
            *subscription = Some(bus.subscribe(subscriber));
        }
        info!(
            "event=settings_cache_init module=settings status=ok entries={}",
            count
        );
    }

    /// Stops following `bus` and empties the cache.
    pub fn reset(&self, bus: &EventBus) {
        if let Some(id) = self.lock_subscription().take() {
            bus.unsubscribe(id);
        }
        self.write_entries().clear();
        info!("event=settings_cache_reset module=settings status=ok");
    }

    pub fn is_initialized(&self) -> bool {
        self.lock_subscription().is_some()
    }

    /// Cached value for `key`, `None` when the key is unknown.
    pub fn get(&self, key: &str) -> Option<SettingValue> {
        self.read_entries()
            .get(key)
            .map(|setting| setting.value.clone())
    }

    pub fn get_setting(&self, key: &str) -> Option<Setting> {
        self.read_entries().get(key).cloned()
    }

    /// Boolean value; non-boolean and unknown keys read as `None`.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|value| value.as_bool())
    }

    /// Text value; non-text, null and unknown keys read as `None`.
    pub fn get_str(&self, key: &str) -> Option<String> {
        self.get(key)
            .and_then(|value| value.as_str().map(str::to_string))
    }

    /// All cached settings ordered by key.
    pub fn get_all(&self) -> Vec<Setting> {
        self.read_entries().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_entries().is_empty()
    }

    fn apply(&self, setting: &Setting) {
        debug!(
            "event=settings_cache_update module=settings key={}",
            setting.key
        );
        self.write_entries()
            .insert(setting.key.clone(), setting.clone());
    }

    fn read_entries(&self) -> RwLockReadGuard<'_, BTreeMap<String, Setting>> {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_entries(&self) -> RwLockWriteGuard<'_, BTreeMap<String, Setting>> {
        self.entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_subscription(&self) -> std::sync::MutexGuard<'_, Option<SubscriptionId>> {
        self.subscription
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl EventSubscriber for SettingsCache {
    fn handle(&self, event: &AppEvent) {
        match event {
            AppEvent::SettingEdited { setting, .. } => self.apply(setting),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::SettingsCache;
    use crate::events::{AppEvent, EventBus};
    use crate::model::setting::{Setting, SettingType, SettingValue};

    fn setting(key: &str, value: SettingValue) -> Setting {
        Setting {
            id: format!("id-{key}"),
            key: key.to_string(),
            group: "core".to_string(),
            kind: SettingType::String,
            value,
            flags: vec![],
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn init_twice_subscribes_once() {
        let bus = EventBus::new();
        let cache = SettingsCache::new();
        cache.init(&bus, vec![setting("title", SettingValue::text("a"))]);
        cache.init(&bus, vec![setting("title", SettingValue::text("b"))]);

        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(cache.get_str("title").as_deref(), Some("b"));
    }

    #[test]
    fn edited_event_replaces_value_and_reset_detaches() {
        let bus = EventBus::new();
        let cache = SettingsCache::new();
        cache.init(&bus, vec![setting("title", SettingValue::text("old"))]);

        bus.publish(&AppEvent::SettingEdited {
            setting: setting("title", SettingValue::text("new")),
            previous: SettingValue::text("old"),
        });
        assert_eq!(cache.get("title"), Some(SettingValue::text("new")));

        cache.reset(&bus);
        assert!(cache.is_empty());
        assert!(!cache.is_initialized());
        bus.publish(&AppEvent::SettingEdited {
            setting: setting("title", SettingValue::text("ignored")),
            previous: SettingValue::text("new"),
        });
        assert!(cache.get("title").is_none());
    }
}
