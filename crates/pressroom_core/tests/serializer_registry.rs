use pressroom_core::api::serializers::{SerializerError, SerializerRegistry, SERIALIZER_NAMES};
use pressroom_core::api::ApiFrame;
use pressroom_core::service::settings_service::OBFUSCATED_SETTING;
use serde_json::json;

#[test]
fn nothing_is_constructed_up_front() {
    let registry = SerializerRegistry::new();
    for name in SERIALIZER_NAMES {
        assert!(registry.contains(name));
        assert!(!registry.is_loaded(name), "{name} loaded eagerly");
    }
}

#[test]
fn every_registered_name_resolves() {
    let registry = SerializerRegistry::new();
    for name in SERIALIZER_NAMES {
        let serializer = registry.get(name).unwrap();
        assert_eq!(serializer.name(), name);
        assert!(registry.is_loaded(name));
    }
}

#[test]
fn unknown_names_are_errors() {
    let registry = SerializerRegistry::new();
    let err = registry
        .serialize("widgets", json!([]), &ApiFrame::new("browse"))
        .unwrap_err();
    assert_eq!(err, SerializerError::UnknownSerializer("widgets".to_string()));
}

#[test]
fn default_serializers_wrap_under_their_name() {
    let registry = SerializerRegistry::new();
    let frame = ApiFrame::new("browse");

    let output = registry
        .serialize(
            "posts",
            json!({"data": [{"id": "p1"}], "meta": {"pagination": {"total": 1}}}),
            &frame,
        )
        .unwrap();
    assert_eq!(
        output,
        json!({"posts": [{"id": "p1"}], "meta": {"pagination": {"total": 1}}})
    );

    let renamed = registry
        .serialize("pages", json!([{"id": "p2"}]), &frame.clone().with_doc_name("docs"))
        .unwrap();
    assert_eq!(renamed, json!({"docs": [{"id": "p2"}]}));
}

#[test]
fn all_passes_responses_through() {
    let registry = SerializerRegistry::new();
    let response = json!({"anything": [1, 2, 3]});
    assert_eq!(
        registry
            .serialize("all", response.clone(), &ApiFrame::new("read"))
            .unwrap(),
        response
    );
}

#[test]
fn settings_output_hides_secrets() {
    let registry = SerializerRegistry::new();
    let rows = json!([
        {
            "id": "1", "key": "title", "group": "site", "type": "string",
            "value": "Pressroom", "flags": ["PUBLIC"], "created_at": 0, "updated_at": 0
        },
        {
            "id": "2", "key": "stripe_secret_key", "group": "members", "type": "string",
            "value": "sk_test_123", "flags": [], "created_at": 0, "updated_at": 0
        },
        {
            "id": "3", "key": "stripe_connect_secret_key", "group": "members", "type": "string",
            "value": null, "flags": [], "created_at": 0, "updated_at": 0
        }
    ]);

    let output = registry
        .serialize("settings", rows, &ApiFrame::new("browse"))
        .unwrap();

    assert_eq!(output["meta"], json!({}));
    assert_eq!(output["settings"][0]["value"], json!("Pressroom"));
    assert_eq!(output["settings"][1]["value"], json!(OBFUSCATED_SETTING));
    assert_eq!(output["settings"][2]["value"], json!(null));
}

#[test]
fn settings_rejects_malformed_rows() {
    let registry = SerializerRegistry::new();
    let err = registry
        .serialize("settings", json!([{"key": "title"}]), &ApiFrame::new("browse"))
        .unwrap_err();
    assert!(matches!(err, SerializerError::InvalidPayload { serializer: "settings", .. }));
}

#[test]
fn tiers_and_products_map_tier_rows() {
    let registry = SerializerRegistry::new();
    let row = json!({
        "id": "t1", "name": "Gold", "slug": "gold", "type": "paid", "active": true,
        "welcome_page_url": "/welcome", "stripe_prices": ["internal"]
    });
    let expected = json!({
        "id": "t1", "name": "Gold", "slug": "gold", "type": "paid", "active": true,
        "welcome_page_url": "/welcome"
    });

    let tiers = registry
        .serialize("tiers", json!({"data": [row.clone()], "meta": {}}), &ApiFrame::new("browse"))
        .unwrap();
    assert_eq!(tiers, json!({"tiers": [expected.clone()], "meta": {}}));

    let products = registry
        .serialize("products", row, &ApiFrame::new("read"))
        .unwrap();
    assert_eq!(products, json!({"products": [expected]}));
}

#[test]
fn settings_accepts_a_pagination_envelope() {
    let registry = SerializerRegistry::new();
    let envelope = json!({
        "data": [{
            "id": "2", "key": "stripe_secret_key", "group": "members", "type": "string",
            "value": "sk_test_123", "flags": [], "created_at": 0, "updated_at": 0
        }],
        "meta": {"filters": {"group": "members"}}
    });

    let output = registry
        .serialize("settings", envelope, &ApiFrame::new("browse"))
        .unwrap();

    assert_eq!(output["settings"][0]["key"], json!("stripe_secret_key"));
    assert_eq!(output["settings"][0]["value"], json!(OBFUSCATED_SETTING));
    assert_eq!(output["meta"], json!({"filters": {"group": "members"}}));
}
