//! Site assembly.
//!
//! # Responsibility
//! - Construct every core service in dependency order and hand back one
//!   owning [`Site`].
//!
//! # Invariants
//! - Settings are loaded before anything reads them.
//! - A failed settings or members init aborts boot; nothing half-booted is
//!   returned.

use crate::api::serializers::SerializerRegistry;
use crate::config::PressroomConfig;
use crate::db::{Database, DbError};
use crate::events::EventBus;
use crate::model::tier::Tier;
use crate::repo::members_repo::{MembersRepository, SqliteMembersRepository};
use crate::repo::RepoResult;
use crate::service::labs::LabsService;
use crate::service::members_service::{MembersError, MembersService};
use crate::service::settings_service::{SettingsError, SettingsService};
use crate::settings_cache::SettingsCache;
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

#[derive(Debug)]
pub enum BootError {
    Db(DbError),
    Settings(SettingsError),
    Members(MembersError),
}

impl Display for BootError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "database boot failed: {err}"),
            Self::Settings(err) => write!(f, "settings boot failed: {err}"),
            Self::Members(err) => write!(f, "members boot failed: {err}"),
        }
    }
}

impl Error for BootError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Settings(err) => Some(err),
            Self::Members(err) => Some(err),
        }
    }
}

impl From<DbError> for BootError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<SettingsError> for BootError {
    fn from(value: SettingsError) -> Self {
        Self::Settings(value)
    }
}

impl From<MembersError> for BootError {
    fn from(value: MembersError) -> Self {
        Self::Members(value)
    }
}

/// A booted site and its services.
pub struct Site {
    pub config: PressroomConfig,
    pub db: Arc<Database>,
    pub bus: Arc<EventBus>,
    pub settings: SettingsService,
    pub labs: Arc<LabsService>,
    pub members: MembersService,
    pub serializers: SerializerRegistry,
}

impl Site {
    /// Boots a site from `config`.
    pub fn boot(config: PressroomConfig) -> Result<Self, BootError> {
        let db = Arc::new(Database::connect(&config.database, &config.env).map_err(|err| {
            error!("event=boot module=boot status=error stage=db error={}", err);
            err
        })?);
        let bus = Arc::new(EventBus::new());
        let cache = SettingsCache::new();

        let settings = SettingsService::new(Arc::clone(&db), Arc::clone(&cache), Arc::clone(&bus));
        settings.init()?;
        settings.sync_email_settings(config.email_verified())?;

        let labs = Arc::new(LabsService::new(Arc::clone(&cache), config.labs.clone()));

        let mut members = MembersService::new(
            Arc::clone(&db),
            Arc::clone(&cache),
            Arc::clone(&labs),
            Arc::clone(&bus),
        );
        members.init(&config).map_err(|err| {
            error!("event=boot module=boot status=error stage=members error={}", err);
            err
        })?;

        info!(
            "event=boot module=boot status=ok env={} settings={}",
            config.env,
            cache.len()
        );
        Ok(Self {
            config,
            db,
            bus,
            settings,
            labs,
            members,
            serializers: SerializerRegistry::new(),
        })
    }

    pub fn cache(&self) -> &Arc<SettingsCache> {
        self.settings.cache()
    }

    /// All tiers, free first.
    pub fn tiers(&self) -> RepoResult<Vec<Tier>> {
        self.db
            .with_conn(|conn| SqliteMembersRepository::new(conn).list_tiers())
    }
}
