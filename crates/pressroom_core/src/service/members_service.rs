//! Members service boot wiring.
//!
//! # Responsibility
//! - Keep tier welcome pages in sync with the legacy signup redirect
//!   settings while multiple tiers are disabled.
//! - Refuse unsafe Stripe key setups at boot.
//! - Derive members SSR cookie options.
//! - Clear stale single-use tokens on boot.
//!
//! # Invariants
//! - Usage errors abort boot; background cleanup failures are only logged.
//! - The redirect subscriber never panics and never propagates errors.

use crate::config::PressroomConfig;
use crate::db::Database;
use crate::events::{AppEvent, EventBus, EventSubscriber, SubscriptionId};
use crate::model::setting::keys;
use crate::model::tier::TierType;
use crate::repo::members_repo::{MembersRepository, SqliteMembersRepository};
use crate::service::labs::{LabsService, MULTIPLE_PRODUCTS};
use crate::settings_cache::SettingsCache;
use log::{error, info};
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub const NO_LIVE_KEYS_IN_DEVELOPMENT: &str =
    "Cannot use live stripe keys in development. Please restart in production mode.";
pub const SSL_REQUIRED_FOR_STRIPE: &str = "Cannot run Pressroom without SSL when Stripe is connected. Please update your url config to use \"https://\".";

/// Name of the members session cookie.
pub const SSR_COOKIE_NAME: &str = "members-ssr";

static HTTPS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^https").expect("valid https regex"));

pub type MembersResult<T> = Result<T, MembersError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembersError {
    /// Configuration misuse that must stop boot.
    IncorrectUsage(String),
}

impl Display for MembersError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IncorrectUsage(message) => write!(f, "{message}"),
        }
    }
}

impl Error for MembersError {}

/// Stripe connection mode derived from the secret key prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StripeMode {
    Test,
    Live,
}

/// Stripe keys as currently stored in settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StripeKeys {
    pub secret_key: String,
    pub publishable_key: String,
}

impl StripeKeys {
    /// Direct keys win; Stripe Connect keys are the fallback.
    pub fn from_cache(cache: &SettingsCache) -> Option<Self> {
        let pair = |secret: &str, publishable: &str| {
            let secret_key = cache.get_str(secret).filter(|key| !key.is_empty())?;
            let publishable_key = cache.get_str(publishable).filter(|key| !key.is_empty())?;
            Some(Self {
                secret_key,
                publishable_key,
            })
        };
        pair(keys::STRIPE_SECRET_KEY, keys::STRIPE_PUBLISHABLE_KEY).or_else(|| {
            pair(
                keys::STRIPE_CONNECT_SECRET_KEY,
                keys::STRIPE_CONNECT_PUBLISHABLE_KEY,
            )
        })
    }

    pub fn mode(&self) -> StripeMode {
        if self.secret_key.starts_with("sk_live") {
            StripeMode::Live
        } else {
            StripeMode::Test
        }
    }
}

/// Cookie settings for the members server-side session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsrOptions {
    pub cookie_name: &'static str,
    pub cookie_secure: bool,
    pub cookie_keys: Vec<String>,
}

/// Mirrors legacy signup redirect settings onto tier welcome pages.
struct SignupRedirectSync {
    db: Arc<Database>,
    labs: Arc<LabsService>,
}

impl EventSubscriber for SignupRedirectSync {
    fn handle(&self, event: &AppEvent) {
        let AppEvent::SettingEdited { setting, .. } = event;
        if self.labs.is_set(MULTIPLE_PRODUCTS) {
            return;
        }

        let kind = match setting.key.as_str() {
            keys::MEMBERS_FREE_SIGNUP_REDIRECT => TierType::Free,
            keys::MEMBERS_PAID_SIGNUP_REDIRECT => TierType::Paid,
            _ => return,
        };
        let url = setting.value.as_str();

        let result = self.db.with_conn(|conn| {
            SqliteMembersRepository::new(conn).update_welcome_page_url(kind, url)
        });
        match result {
            Ok(updated) => info!(
                "event=welcome_page_sync module=members status=ok tier_type={} updated={}",
                kind.as_str(),
                updated
            ),
            Err(err) => error!(
                "event=welcome_page_sync module=members status=error tier_type={} error={}",
                kind.as_str(),
                err
            ),
        }
    }
}

pub struct MembersService {
    db: Arc<Database>,
    cache: Arc<SettingsCache>,
    labs: Arc<LabsService>,
    bus: Arc<EventBus>,
    ssr: Option<SsrOptions>,
    redirect_sync: Option<SubscriptionId>,
}

impl MembersService {
    pub fn new(
        db: Arc<Database>,
        cache: Arc<SettingsCache>,
        labs: Arc<LabsService>,
        bus: Arc<EventBus>,
    ) -> Self {
        Self {
            db,
            cache,
            labs,
            bus,
            ssr: None,
            redirect_sync: None,
        }
    }

    /// Boots the members service. Safe to call again; the redirect sync is
    /// subscribed once.
    ///
    /// # Errors
    /// - `IncorrectUsage` for live Stripe keys outside production, or a
    ///   non-https site URL in production while Stripe is configured.
    pub fn init(&mut self, config: &PressroomConfig) -> MembersResult<()> {
        if self.redirect_sync.is_none() {
            self.redirect_sync = Some(self.bus.subscribe(Arc::new(SignupRedirectSync {
                db: Arc::clone(&self.db),
                labs: Arc::clone(&self.labs),
            })));
        }

        check_stripe_setup(config, self.stripe_keys().as_ref())?;

        self.ssr = Some(SsrOptions {
            cookie_name: SSR_COOKIE_NAME,
            cookie_secure: is_ssl(&config.url),
            cookie_keys: self
                .cache
                .get_str(keys::THEME_SESSION_SECRET)
                .into_iter()
                .collect(),
        });

        self.clear_single_use_tokens();
        info!("event=members_init module=members status=ok");
        Ok(())
    }

    pub fn stripe_keys(&self) -> Option<StripeKeys> {
        StripeKeys::from_cache(&self.cache)
    }

    /// SSR cookie options; `None` before `init`.
    pub fn ssr(&self) -> Option<&SsrOptions> {
        self.ssr.as_ref()
    }

    fn clear_single_use_tokens(&self) {
        let result = self
            .db
            .with_conn(|conn| SqliteMembersRepository::new(conn).delete_all_single_use_tokens());
        match result {
            Ok(removed) => info!(
                "event=token_cleanup module=members status=ok removed={}",
                removed
            ),
            Err(err) => error!(
                "event=token_cleanup module=members status=error error={}",
                err
            ),
        }
    }
}

/// Boot-time Stripe sanity checks.
pub fn check_stripe_setup(
    config: &PressroomConfig,
    keys: Option<&StripeKeys>,
) -> MembersResult<()> {
    let Some(keys) = keys else {
        return Ok(());
    };

    if !config.is_production() {
        if keys.mode() == StripeMode::Live {
            return Err(MembersError::IncorrectUsage(
                NO_LIVE_KEYS_IN_DEVELOPMENT.to_string(),
            ));
        }
    } else if !is_ssl(&config.url) {
        return Err(MembersError::IncorrectUsage(
            SSL_REQUIRED_FOR_STRIPE.to_string(),
        ));
    }
    Ok(())
}

fn is_ssl(url: &str) -> bool {
    HTTPS_RE.is_match(url)
}

#[cfg(test)]
mod tests {
    use super::{check_stripe_setup, MembersError, StripeKeys, StripeMode};
    use crate::config::PressroomConfig;

    fn keys(secret: &str) -> StripeKeys {
        StripeKeys {
            secret_key: secret.to_string(),
            publishable_key: "pk_test".to_string(),
        }
    }

    #[test]
    fn live_keys_are_rejected_outside_production() {
        let config = PressroomConfig::for_env("development");
        let err = check_stripe_setup(&config, Some(&keys("sk_live_abc")))
            .expect_err("live keys in development must fail");
        assert!(matches!(err, MembersError::IncorrectUsage(message) if message.contains("live stripe keys")));
        assert!(check_stripe_setup(&config, Some(&keys("sk_test_abc"))).is_ok());
    }

    #[test]
    fn production_requires_https_when_stripe_is_configured() {
        let mut config = PressroomConfig::for_env("production");
        config.url = "http://example.com".to_string();
        assert!(check_stripe_setup(&config, Some(&keys("sk_live_abc"))).is_err());
        assert!(check_stripe_setup(&config, None).is_ok());

        config.url = "https://example.com".to_string();
        assert!(check_stripe_setup(&config, Some(&keys("sk_live_abc"))).is_ok());
    }

    #[test]
    fn mode_follows_secret_key_prefix() {
        assert_eq!(keys("sk_live_1").mode(), StripeMode::Live);
        assert_eq!(keys("sk_test_1").mode(), StripeMode::Test);
    }
}
