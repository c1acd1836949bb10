use pressroom_core::helpers::tiers::{tiers_helper, TiersOptions};
use pressroom_core::model::setting::keys;
use pressroom_core::repo::members_repo::{MembersRepository, SqliteMembersRepository};
use pressroom_core::repo::settings_repo::EditContext;
use pressroom_core::service::labs::MULTIPLE_PRODUCTS;
use pressroom_core::service::members_service::{
    MembersError, StripeMode, NO_LIVE_KEYS_IN_DEVELOPMENT, SSL_REQUIRED_FOR_STRIPE,
    SSR_COOKIE_NAME,
};
use pressroom_core::{BootError, PressroomConfig, SettingEdit, Site, Tier, TierType};

fn testing_config() -> PressroomConfig {
    PressroomConfig::for_env("testing")
}

fn welcome_pages(site: &Site) -> Vec<(TierType, Option<String>)> {
    site.tiers()
        .unwrap()
        .into_iter()
        .map(|tier| (tier.kind, tier.welcome_page_url))
        .collect()
}

fn file_config(dir: &tempfile::TempDir, env: &str) -> PressroomConfig {
    let mut config = PressroomConfig::for_env(env);
    config.database.filename = dir.path().join("site.db").to_string_lossy().into_owned();
    config
}

fn store_stripe_keys(config: PressroomConfig, secret: &str) {
    let site = Site::boot(config).unwrap();
    site.settings
        .edit(
            &[
                SettingEdit::new(keys::STRIPE_SECRET_KEY, secret),
                SettingEdit::new(keys::STRIPE_PUBLISHABLE_KEY, "pk_test_1"),
            ],
            EditContext::internal(),
        )
        .unwrap();
}

#[test]
fn boot_without_stripe_sets_ssr_options() {
    let site = Site::boot(testing_config()).unwrap();

    assert!(site.members.stripe_keys().is_none());
    let ssr = site.members.ssr().unwrap();
    assert_eq!(ssr.cookie_name, SSR_COOKIE_NAME);
    assert!(!ssr.cookie_secure);
    assert_eq!(
        ssr.cookie_keys,
        vec![site.cache().get_str(keys::THEME_SESSION_SECRET).unwrap()]
    );
}

#[test]
fn signup_redirects_update_tier_welcome_pages() {
    let site = Site::boot(testing_config()).unwrap();

    site.settings
        .edit(
            &[
                SettingEdit::new(keys::MEMBERS_FREE_SIGNUP_REDIRECT, "/welcome-free"),
                SettingEdit::new(keys::MEMBERS_PAID_SIGNUP_REDIRECT, "/welcome-paid"),
            ],
            EditContext::external(),
        )
        .unwrap();

    assert_eq!(
        welcome_pages(&site),
        vec![
            (TierType::Free, Some("/welcome-free".to_string())),
            (TierType::Paid, Some("/welcome-paid".to_string())),
        ]
    );
}

#[test]
fn redirect_sync_is_off_with_multiple_products() {
    let mut config = testing_config();
    config.labs.insert(MULTIPLE_PRODUCTS.to_string(), true);
    let site = Site::boot(config).unwrap();

    site.settings
        .edit(
            &[SettingEdit::new(keys::MEMBERS_PAID_SIGNUP_REDIRECT, "/ignored")],
            EditContext::external(),
        )
        .unwrap();

    assert!(welcome_pages(&site).iter().all(|(_, url)| url.is_none()));
}

#[test]
fn boot_clears_single_use_tokens() {
    let dir = tempfile::tempdir().unwrap();
    let config = file_config(&dir, "testing");

    let site = Site::boot(config.clone()).unwrap();
    site.db.with_conn(|conn| {
        let repo = SqliteMembersRepository::new(conn);
        repo.create_single_use_token("token-1", None).unwrap();
        repo.create_single_use_token("token-2", Some("{}")).unwrap();
        assert_eq!(repo.count_single_use_tokens().unwrap(), 2);
    });
    drop(site);

    let site = Site::boot(config).unwrap();
    let remaining = site
        .db
        .with_conn(|conn| SqliteMembersRepository::new(conn).count_single_use_tokens())
        .unwrap();
    assert_eq!(remaining, 0);
}

#[test]
fn live_keys_abort_boot_outside_production() {
    let dir = tempfile::tempdir().unwrap();
    store_stripe_keys(file_config(&dir, "development"), "sk_live_123");

    match Site::boot(file_config(&dir, "development")) {
        Err(BootError::Members(MembersError::IncorrectUsage(message))) => {
            assert_eq!(message, NO_LIVE_KEYS_IN_DEVELOPMENT)
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("boot should fail"),
    }
}

#[test]
fn production_with_stripe_requires_https() {
    let dir = tempfile::tempdir().unwrap();
    store_stripe_keys(file_config(&dir, "development"), "sk_test_123");

    let mut production = file_config(&dir, "production");
    production.url = "http://example.com".to_string();
    match Site::boot(production.clone()) {
        Err(BootError::Members(MembersError::IncorrectUsage(message))) => {
            assert_eq!(message, SSL_REQUIRED_FOR_STRIPE)
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("boot should fail"),
    }

    production.url = "https://example.com".to_string();
    let site = Site::boot(production).unwrap();
    assert_eq!(site.members.stripe_keys().unwrap().mode(), StripeMode::Test);
    assert!(site.members.ssr().unwrap().cookie_secure);
}

#[test]
fn connect_keys_are_the_fallback() {
    let site = Site::boot(testing_config()).unwrap();
    site.settings
        .edit(
            &[
                SettingEdit::new(keys::STRIPE_CONNECT_SECRET_KEY, "sk_live_connect"),
                SettingEdit::new(keys::STRIPE_CONNECT_PUBLISHABLE_KEY, "pk_live_connect"),
            ],
            EditContext::internal(),
        )
        .unwrap();

    let stripe = site.members.stripe_keys().unwrap();
    assert_eq!(stripe.secret_key, "sk_live_connect");
    assert_eq!(stripe.mode(), StripeMode::Live);
}

#[test]
fn created_tiers_feed_the_tiers_helper() {
    let mut config = testing_config();
    config.labs.insert(MULTIPLE_PRODUCTS.to_string(), true);
    let site = Site::boot(config).unwrap();

    site.db
        .with_conn(|conn| {
            SqliteMembersRepository::new(conn).create_tier(&Tier::new("Gold", TierType::Paid))
        })
        .unwrap();

    let paid = site
        .tiers()
        .unwrap()
        .into_iter()
        .filter(|tier| tier.kind == TierType::Paid)
        .collect::<Vec<_>>();
    let rendered = tiers_helper(&site.labs, &paid, &TiersOptions::default()).unwrap();
    assert_eq!(rendered.as_str(), "Default Product and Gold tiers");
}

#[test]
fn token_cleanup_failure_does_not_abort_boot() {
    let dir = tempfile::tempdir().unwrap();
    let config = file_config(&dir, "testing");

    let site = Site::boot(config.clone()).unwrap();
    site.db
        .with_conn(|conn| conn.execute_batch("DROP TABLE single_use_tokens;"))
        .unwrap();
    drop(site);

    let site = Site::boot(config).unwrap();
    assert!(site.members.ssr().is_some());
}

#[test]
fn redirect_edit_commits_when_welcome_page_sync_fails() {
    let site = Site::boot(testing_config()).unwrap();
    site.db
        .with_conn(|conn| conn.execute_batch("DROP TABLE products;"))
        .unwrap();

    let edited = site
        .settings
        .edit(
            &[SettingEdit::new(keys::MEMBERS_FREE_SIGNUP_REDIRECT, "/welcome-free")],
            EditContext::external(),
        )
        .unwrap();

    assert_eq!(edited.len(), 1);
    assert_eq!(
        site.settings
            .read(keys::MEMBERS_FREE_SIGNUP_REDIRECT)
            .unwrap()
            .value
            .as_str(),
        Some("/welcome-free")
    );
    assert_eq!(
        site.cache().get_str(keys::MEMBERS_FREE_SIGNUP_REDIRECT).as_deref(),
        Some("/welcome-free")
    );
    assert!(site.tiers().is_err());
}

#[test]
fn members_init_again_keeps_one_redirect_subscriber() {
    let mut site = Site::boot(testing_config()).unwrap();
    let subscribers = site.bus.subscriber_count();

    let config = site.config.clone();
    site.members.init(&config).unwrap();
    site.members.init(&config).unwrap();
    assert_eq!(site.bus.subscriber_count(), subscribers);

    site.settings
        .edit(
            &[SettingEdit::new(keys::MEMBERS_PAID_SIGNUP_REDIRECT, "/welcome-paid")],
            EditContext::external(),
        )
        .unwrap();
    assert!(welcome_pages(&site)
        .contains(&(TierType::Paid, Some("/welcome-paid".to_string()))));
}
