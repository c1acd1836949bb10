//! Settings repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Populate missing default settings on boot.
//! - Read settings rows into typed [`Setting`] records.
//! - Apply batched edits atomically.
//!
//! # Invariants
//! - An edit batch commits completely or not at all.
//! - Unchanged values are not rewritten and are reported as unchanged.
//! - Read paths reject invalid persisted rows instead of masking them.

use super::{RepoError, RepoResult};
use crate::db::{new_object_id, now_epoch_ms};
use crate::model::setting::{
    flags_to_db, parse_flags, DefaultValue, Setting, SettingEdit, SettingType, SettingValue,
    DEFAULT_SETTINGS,
};
use log::info;
use rusqlite::{params, Connection, OptionalExtension, Row};

const SETTING_SELECT_SQL: &str = "SELECT
    id,
    key,
    \"group\",
    type,
    value,
    flags,
    created_at,
    updated_at
FROM settings";

/// Result of applying one [`SettingEdit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditedSetting {
    /// Row state after the edit.
    pub setting: Setting,
    pub previous: SettingValue,
    /// `false` when the new value equals the stored one.
    pub changed: bool,
}

/// Who is performing an edit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EditContext {
    /// Internal callers (boot sync tasks) may write `RO` settings.
    pub internal: bool,
}

impl EditContext {
    pub fn internal() -> Self {
        Self { internal: true }
    }

    pub fn external() -> Self {
        Self { internal: false }
    }
}

/// Repository interface for settings.
pub trait SettingsRepository {
    /// Inserts every missing default and returns all rows ordered by key.
    fn populate_defaults(&mut self) -> RepoResult<Vec<Setting>>;
    fn list_settings(&self) -> RepoResult<Vec<Setting>>;
    fn get_setting(&self, key: &str) -> RepoResult<Option<Setting>>;
    fn edit_settings(
        &mut self,
        edits: &[SettingEdit],
        context: EditContext,
    ) -> RepoResult<Vec<EditedSetting>>;
}

/// SQLite-backed settings repository.
pub struct SqliteSettingsRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteSettingsRepository<'conn> {
    pub fn new(conn: &'conn mut Connection) -> Self {
        Self { conn }
    }
}

impl SettingsRepository for SqliteSettingsRepository<'_> {
    fn populate_defaults(&mut self) -> RepoResult<Vec<Setting>> {
        let tx = self.conn.transaction()?;
        let mut inserted = 0usize;
        for default in DEFAULT_SETTINGS {
            let exists = tx
                .query_row(
                    "SELECT 1 FROM settings WHERE key = ?1;",
                    [default.key],
                    |_| Ok(()),
                )
                .optional()?
                .is_some();
            if exists {
                continue;
            }

            let value = match default.value {
                DefaultValue::Fixed(value) => value.map(str::to_string),
                DefaultValue::RandomSecret => Some(random_secret()),
            };
            let now = now_epoch_ms();
            tx.execute(
                "INSERT INTO settings (id, key, \"group\", type, value, flags, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7);",
                params![
                    new_object_id(),
                    default.key,
                    default.group,
                    default.kind.as_str(),
                    value,
                    flags_to_db(default.flags),
                    now,
                ],
            )?;
            inserted += 1;
        }
        tx.commit()?;

        info!(
            "event=settings_populate module=repo status=ok inserted={} known_defaults={}",
            inserted,
            DEFAULT_SETTINGS.len()
        );
        self.list_settings()
    }

    fn list_settings(&self) -> RepoResult<Vec<Setting>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SETTING_SELECT_SQL} ORDER BY key ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut settings = Vec::new();
        while let Some(row) = rows.next()? {
            settings.push(parse_setting_row(row)?);
        }
        Ok(settings)
    }

    fn get_setting(&self, key: &str) -> RepoResult<Option<Setting>> {
        load_setting(&*self.conn, key)
    }

    fn edit_settings(
        &mut self,
        edits: &[SettingEdit],
        context: EditContext,
    ) -> RepoResult<Vec<EditedSetting>> {
        let tx = self.conn.transaction()?;
        let mut results = Vec::with_capacity(edits.len());

        for edit in edits {
            let current =
                load_setting(&tx, &edit.key)?.ok_or_else(|| RepoError::NotFound(edit.key.clone()))?;
            if current.is_read_only() && !context.internal {
                return Err(RepoError::ReadOnly(edit.key.clone()));
            }

            let value = edit
                .value
                .clone()
                .coerce(current.kind)
                .map_err(|source| RepoError::Validation {
                    key: edit.key.clone(),
                    source,
                })?;

            if value == current.value {
                results.push(EditedSetting {
                    previous: current.value.clone(),
                    setting: current,
                    changed: false,
                });
                continue;
            }

            let now = now_epoch_ms();
            tx.execute(
                "UPDATE settings SET value = ?1, updated_at = ?2 WHERE key = ?3;",
                params![value.to_db(), now, edit.key],
            )?;

            let previous = current.value.clone();
            results.push(EditedSetting {
                setting: Setting {
                    value,
                    updated_at: now,
                    ..current
                },
                previous,
                changed: true,
            });
        }

        tx.commit()?;
        Ok(results)
    }
}

fn load_setting(conn: &Connection, key: &str) -> RepoResult<Option<Setting>> {
    let mut stmt = conn.prepare(&format!("{SETTING_SELECT_SQL} WHERE key = ?1;"))?;
    let mut rows = stmt.query([key])?;
    match rows.next()? {
        Some(row) => Ok(Some(parse_setting_row(row)?)),
        None => Ok(None),
    }
}

fn parse_setting_row(row: &Row<'_>) -> RepoResult<Setting> {
    let key: String = row.get("key")?;

    let type_text: String = row.get("type")?;
    let kind = SettingType::parse(&type_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid setting type `{type_text}` in settings.type for `{key}`"
        ))
    })?;

    let value = SettingValue::from_db(kind, row.get("value")?).map_err(|err| {
        RepoError::InvalidData(format!("invalid value for setting `{key}`: {err}"))
    })?;

    let flags_text: Option<String> = row.get("flags")?;
    let flags = parse_flags(flags_text.as_deref()).map_err(|token| {
        RepoError::InvalidData(format!(
            "invalid flag `{token}` in settings.flags for `{key}`"
        ))
    })?;

    Ok(Setting {
        id: row.get("id")?,
        group: row.get("group")?,
        kind,
        value,
        flags,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        key,
    })
}

fn random_secret() -> String {
    format!(
        "{}{}",
        uuid::Uuid::new_v4().simple(),
        uuid::Uuid::new_v4().simple()
    )
}
