//! Core of the Pressroom publishing platform: persisted site settings and
//! their cache, the members boot checks, labs-gated theme helpers and API
//! output serializers.

pub mod api;
pub mod boot;
pub mod config;
pub mod db;
pub mod events;
pub mod helpers;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod settings_cache;

pub use boot::{BootError, Site};
pub use config::{ConfigError, PressroomConfig};
pub use events::{AppEvent, EventBus, EventSubscriber};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::setting::{Setting, SettingEdit, SettingValue};
pub use model::tier::{Tier, TierType};
pub use repo::{RepoError, RepoResult};
pub use settings_cache::SettingsCache;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
