//! Settings use-case service.
//!
//! # Responsibility
//! - Boot the settings cache from persisted rows (inserting defaults first).
//! - Route every edit through the database before the cache sees it.
//! - Keep derived settings (`routes_hash`, email verification) in sync with
//!   their external sources.
//! - Hide secret values from outward-facing callers.
//!
//! # Invariants
//! - `settings.edited` is published only for committed, actually changed
//!   values, and only after the connection lock is released.
//! - A failed `init` leaves the cache untouched.

use crate::db::Database;
use crate::events::{AppEvent, EventBus};
use crate::model::setting::{keys, Setting, SettingEdit, SettingValue};
use crate::repo::settings_repo::{
    EditContext, EditedSetting, SettingsRepository, SqliteSettingsRepository,
};
use crate::repo::RepoError;
use crate::settings_cache::SettingsCache;
use log::{error, info};
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Replacement shown instead of secret values.
pub const OBFUSCATED_SETTING: &str = "••••••••";

static SECRET_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"secret").expect("valid secret key regex"));

pub type SettingsResult<T> = Result<T, SettingsError>;

/// Service error for settings use-cases.
#[derive(Debug)]
pub enum SettingsError {
    /// The key does not exist.
    NotFound(String),
    /// `RO` setting edited without internal context.
    NoPermission(String),
    /// Value does not match the setting type.
    Validation(String),
    Repo(RepoError),
}

impl Display for SettingsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(key) => write!(f, "setting not found: {key}"),
            Self::NoPermission(key) => {
                write!(f, "setting `{key}` can only be changed internally")
            }
            Self::Validation(message) => write!(f, "{message}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SettingsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for SettingsError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(key) => Self::NotFound(key),
            RepoError::ReadOnly(key) => Self::NoPermission(key),
            err @ RepoError::Validation { .. } => Self::Validation(err.to_string()),
            other => Self::Repo(other),
        }
    }
}

/// Use-case service over the settings table, cache and bus.
pub struct SettingsService {
    db: Arc<Database>,
    cache: Arc<SettingsCache>,
    bus: Arc<EventBus>,
}

impl SettingsService {
    pub fn new(db: Arc<Database>, cache: Arc<SettingsCache>, bus: Arc<EventBus>) -> Self {
        Self { db, cache, bus }
    }

    /// Populates defaults and loads every row into the cache.
    ///
    /// # Errors
    /// Any failure here means the site cannot serve correct configuration;
    /// boot must abort.
    pub fn init(&self) -> SettingsResult<()> {
        let settings = self
            .db
            .with_conn(|conn| SqliteSettingsRepository::new(conn).populate_defaults())
            .map_err(|err| {
                error!(
                    "event=settings_init module=settings status=error error={}",
                    err
                );
                SettingsError::from(err)
            })?;
        self.cache.init(&self.bus, settings);
        Ok(())
    }

    /// Restores the cache to its pre-`init` state.
    pub fn reset(&self) {
        self.cache.reset(&self.bus);
    }

    pub fn cache(&self) -> &Arc<SettingsCache> {
        &self.cache
    }

    /// Cached value, see [`SettingsCache::get`].
    pub fn get(&self, key: &str) -> Option<SettingValue> {
        self.cache.get(key)
    }

    /// Reads one row straight from the database.
    pub fn read(&self, key: &str) -> SettingsResult<Setting> {
        self.db
            .with_conn(|conn| SqliteSettingsRepository::new(conn).get_setting(key))?
            .ok_or_else(|| SettingsError::NotFound(key.to_string()))
    }

    /// Persists `edits` in one transaction, then announces the changed ones.
    ///
    /// Returns the post-edit rows in request order, changed or not.
    pub fn edit(&self, edits: &[SettingEdit], context: EditContext) -> SettingsResult<Vec<Setting>> {
        let outcomes: Vec<EditedSetting> = self
            .db
            .with_conn(|conn| SqliteSettingsRepository::new(conn).edit_settings(edits, context))?;

        let mut settings = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            if outcome.changed {
                info!(
                    "event=settings_edit module=settings status=ok key={} internal={}",
                    outcome.setting.key, context.internal
                );
                self.bus.publish(&AppEvent::SettingEdited {
                    setting: outcome.setting.clone(),
                    previous: outcome.previous,
                });
            }
            settings.push(outcome.setting);
        }
        Ok(settings)
    }

    /// Stores the currently loaded routes file hash when it differs from the
    /// cached one. Returns the edited rows when a write happened.
    pub fn sync_routes_hash(
        &self,
        get_routes_hash: impl FnOnce() -> String,
    ) -> SettingsResult<Option<Vec<Setting>>> {
        let current = get_routes_hash();
        if self.cache.get_str(keys::ROUTES_HASH).as_deref() == Some(current.as_str()) {
            return Ok(None);
        }
        self.edit(
            &[SettingEdit::new(keys::ROUTES_HASH, current)],
            EditContext::internal(),
        )
        .map(Some)
    }

    /// Clears `email_verification_required` once the host config reports the
    /// site as verified.
    pub fn sync_email_settings(&self, config_verified: bool) -> SettingsResult<Option<Vec<Setting>>> {
        let verification_required = self
            .cache
            .get(keys::EMAIL_VERIFICATION_REQUIRED)
            .is_some_and(|value| value.is_truthy());

        if config_verified && verification_required {
            return self
                .edit(
                    &[SettingEdit::new(keys::EMAIL_VERIFICATION_REQUIRED, false)],
                    EditContext::internal(),
                )
                .map(Some);
        }
        Ok(None)
    }
}

/// Whether `setting` holds a credential that must not leave the server.
pub fn is_secret_setting(setting: &Setting) -> bool {
    SECRET_KEY_RE.is_match(&setting.key)
}

/// Copy of `setting` with its value obfuscated when it is a non-empty secret.
pub fn hide_value_if_secret(setting: &Setting) -> Setting {
    if setting.value.is_truthy() && is_secret_setting(setting) {
        return Setting {
            value: SettingValue::text(OBFUSCATED_SETTING),
            ..setting.clone()
        };
    }
    setting.clone()
}
