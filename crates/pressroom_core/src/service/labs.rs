//! Labs (feature flag) lookups.
//!
//! # Responsibility
//! - Answer whether a labs flag is enabled for this site.
//! - Gate optional theme helpers behind their flag.
//!
//! # Invariants
//! - Config overrides win over the `labs` setting.
//! - A malformed `labs` setting reads as "no flags enabled".

use crate::model::setting::keys;
use crate::settings_cache::SettingsCache;
use log::warn;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Flag gating multiple tiers and the `tiers` helper.
pub const MULTIPLE_PRODUCTS: &str = "multipleProducts";

/// Metadata about a helper gated by a labs flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatedHelper {
    pub flag_key: &'static str,
    pub flag_name: &'static str,
    pub helper_name: &'static str,
    pub help_url: &'static str,
}

/// A gated helper was invoked while its flag is off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureDisabled {
    pub helper: GatedHelper,
}

impl Display for FeatureDisabled {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "The {{{{{}}}}} helper is not available. The {} labs flag must be enabled to use it. See {}",
            self.helper.helper_name, self.helper.flag_name, self.helper.help_url
        )
    }
}

impl Error for FeatureDisabled {}

pub struct LabsService {
    cache: Arc<SettingsCache>,
    overrides: BTreeMap<String, bool>,
}

impl LabsService {
    pub fn new(cache: Arc<SettingsCache>, overrides: BTreeMap<String, bool>) -> Self {
        Self { cache, overrides }
    }

    pub fn is_set(&self, flag: &str) -> bool {
        if let Some(enabled) = self.overrides.get(flag) {
            return *enabled;
        }
        self.stored_flags()
            .get(flag)
            .is_some_and(|value| value.as_bool().unwrap_or(false))
    }

    /// Runs `render` only when the helper's flag is enabled.
    pub fn enabled_helper<T>(
        &self,
        helper: GatedHelper,
        render: impl FnOnce() -> T,
    ) -> Result<T, FeatureDisabled> {
        if self.is_set(helper.flag_key) {
            return Ok(render());
        }
        warn!(
            "event=helper_disabled module=labs helper={} flag={}",
            helper.helper_name, helper.flag_key
        );
        Err(FeatureDisabled { helper })
    }

    fn stored_flags(&self) -> serde_json::Map<String, serde_json::Value> {
        let Some(raw) = self.cache.get_str(keys::LABS) else {
            return serde_json::Map::new();
        };
        match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(serde_json::Value::Object(flags)) => flags,
            _ => {
                warn!("event=labs_parse module=labs status=error reason=not_an_object");
                serde_json::Map::new()
            }
        }
    }
}
