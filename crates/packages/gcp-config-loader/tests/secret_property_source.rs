use bytes::Bytes;
use gcp_config_loader::{PropertySource, SOURCE_NAME, SecretPropertySource};
use gcp_secrets::{InMemorySecretManager, SecretError, SecretVersionName};
use std::collections::HashMap;

fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[tokio::test]
async fn test_prefixed_names_follow_listing_order() {
    let client = InMemorySecretManager::new()
        .with_secret_version("proj", "alpha", "A")
        .with_secret_version("proj", "beta", "B");

    let source = SecretPropertySource::new(&client, "proj", "cfg.").await.unwrap();

    assert_eq!(source.property_names(), ["cfg.alpha", "cfg.beta"]);
    assert_eq!(source.get_property("cfg.alpha"), Some(&Bytes::from("A")));
    assert_eq!(source.get_property("cfg.beta"), Some(&Bytes::from("B")));
    assert_eq!(source.get_property("alpha"), None);
    assert_eq!(source.get_property("cfg.gamma"), None);
    assert_eq!(source.name(), SOURCE_NAME);
    assert_eq!(source.len(), 2);

    assert_eq!(
        client.access_log().await,
        vec![
            SecretVersionName::latest("proj", "alpha"),
            SecretVersionName::latest("proj", "beta"),
        ]
    );
}

#[tokio::test]
async fn test_empty_listing_yields_empty_source() {
    let client = InMemorySecretManager::new();

    let source = SecretPropertySource::new(&client, "proj", "cfg.").await.unwrap();

    assert!(source.is_empty());
    assert!(source.property_names().is_empty());
    assert!(client.access_log().await.is_empty());
}

#[tokio::test]
async fn test_empty_prefix_keeps_secret_ids() {
    let client = InMemorySecretManager::new().with_secret_version("proj", "db-password", "hunter2");

    let source = SecretPropertySource::new(&client, "proj", "").await.unwrap();

    assert_eq!(source.property_names(), ["db-password"]);
    assert_eq!(source.get_property_str("db-password"), Some("hunter2"));
}

#[tokio::test]
async fn test_version_override_applies_to_its_secret_only() {
    let client = InMemorySecretManager::new()
        .with_secret_version("proj", "versioned", "the secret data")
        .with_secret_version("proj", "versioned", "the secret data v2")
        .with_secret_version("proj", "versioned", "the secret data v3")
        .with_secret_version("proj", "plain", "p1")
        .with_secret_version("proj", "plain", "p2");

    let source = SecretPropertySource::with_overrides(
        &client,
        "proj",
        "",
        &map(&[("versioned", "2")]),
        &HashMap::new(),
    )
    .await
    .unwrap();

    assert_eq!(source.get_property_str("versioned"), Some("the secret data v2"));
    assert_eq!(source.get_property_str("plain"), Some("p2"));
    assert_eq!(
        client.access_log().await,
        vec![
            SecretVersionName::new("proj", "versioned", "2"),
            SecretVersionName::latest("proj", "plain"),
        ]
    );
}

#[tokio::test]
async fn test_project_override_applies_to_its_secret_only() {
    let client = InMemorySecretManager::new()
        .with_secret_version("proj", "shared", "default copy")
        .with_secret_version("proj", "local", "local value")
        .with_secret_version("other", "shared", "other copy");

    let source = SecretPropertySource::with_overrides(
        &client,
        "proj",
        "cfg.",
        &HashMap::new(),
        &map(&[("shared", "other")]),
    )
    .await
    .unwrap();

    assert_eq!(source.get_property_str("cfg.shared"), Some("other copy"));
    assert_eq!(source.get_property_str("cfg.local"), Some("local value"));
    assert_eq!(
        client.access_log().await,
        vec![
            SecretVersionName::latest("other", "shared"),
            SecretVersionName::latest("proj", "local"),
        ]
    );
}

#[tokio::test]
async fn test_project_and_version_override_together() {
    let client = InMemorySecretManager::new()
        .with_secret_version("proj", "versioned", "listed only")
        .with_secret_version("other", "versioned", "the secret data")
        .with_secret_version("other", "versioned", "the secret data v2");

    let source = SecretPropertySource::with_overrides(
        &client,
        "proj",
        "",
        &map(&[("versioned", "2")]),
        &map(&[("versioned", "other")]),
    )
    .await
    .unwrap();

    assert_eq!(source.get_property_str("versioned"), Some("the secret data v2"));
}

#[tokio::test]
async fn test_empty_override_maps_match_no_overrides() {
    let build = || {
        InMemorySecretManager::new()
            .with_secret_version("proj", "alpha", "a1")
            .with_secret_version("proj", "alpha", "a2")
    };

    let plain_client = build();
    let plain = SecretPropertySource::new(&plain_client, "proj", "").await.unwrap();

    let empty_client = build();
    let empty = SecretPropertySource::with_overrides(
        &empty_client,
        "proj",
        "",
        &HashMap::new(),
        &HashMap::new(),
    )
    .await
    .unwrap();

    let unrelated_client = build();
    let unrelated = SecretPropertySource::with_overrides(
        &unrelated_client,
        "proj",
        "",
        &map(&[("beta", "1")]),
        &map(&[("beta", "other")]),
    )
    .await
    .unwrap();

    assert_eq!(plain.property_names(), empty.property_names());
    assert_eq!(plain.property_names(), unrelated.property_names());
    assert_eq!(plain.get_property("alpha"), empty.get_property("alpha"));
    assert_eq!(plain.get_property("alpha"), unrelated.get_property("alpha"));
    assert_eq!(plain_client.access_log().await, empty_client.access_log().await);
    assert_eq!(plain_client.access_log().await, unrelated_client.access_log().await);
}

#[tokio::test]
async fn test_missing_version_aborts_construction() {
    let client = InMemorySecretManager::new()
        .with_secret_version("proj", "alpha", "a")
        .with_secret_version("proj", "versioned", "v1")
        .with_secret_version("proj", "versioned", "v2")
        .with_secret_version("proj", "zeta", "z");

    let result = SecretPropertySource::with_overrides(
        &client,
        "proj",
        "",
        &map(&[("versioned", "7")]),
        &HashMap::new(),
    )
    .await;

    match result {
        Err(SecretError::NotFound { name }) => {
            assert_eq!(name, "projects/proj/secrets/versioned/versions/7");
        }
        other => panic!("expected NotFound, got {other:?}"),
    }
    // fail-fast: nothing after the failing secret is read
    assert_eq!(client.access_log().await.len(), 2);
}

#[tokio::test]
async fn test_permission_error_is_propagated_unchanged() {
    let client = InMemorySecretManager::new()
        .with_secret_version("proj", "alpha", "a")
        .deny_access("proj", "alpha");

    let result = SecretPropertySource::new(&client, "proj", "").await;
    assert!(matches!(result, Err(SecretError::PermissionDenied { .. })));
}

#[tokio::test]
async fn test_interrupted_listing_aborts_construction() {
    let client = InMemorySecretManager::new()
        .with_page_size(1)
        .with_secret_version("proj", "alpha", "a")
        .with_secret_version("proj", "beta", "b")
        .fail_listing_from_page(1);

    let result = SecretPropertySource::new(&client, "proj", "").await;
    assert!(matches!(result, Err(SecretError::Api { status: 503, .. })));
    assert!(client.access_log().await.is_empty());
}

#[tokio::test]
async fn test_multi_page_listing_is_fully_loaded() {
    let mut client = InMemorySecretManager::new().with_page_size(2);
    for id in ["a", "b", "c", "d", "e"] {
        client = client.with_secret_version("proj", id, id.to_uppercase());
    }

    let source = SecretPropertySource::new(&client, "proj", "sm.").await.unwrap();
    assert_eq!(source.property_names(), ["sm.a", "sm.b", "sm.c", "sm.d", "sm.e"]);
    assert_eq!(source.get_property_str("sm.e"), Some("E"));
}

#[tokio::test]
async fn test_empty_payload_is_stored() {
    let client = InMemorySecretManager::new().with_secret_version("proj", "blank", Bytes::new());

    let source = SecretPropertySource::new(&client, "proj", "").await.unwrap();

    assert!(source.contains_property("blank"));
    assert_eq!(source.get_property("blank"), Some(&Bytes::new()));
    assert_eq!(source.get_property_str("blank"), Some(""));
}

#[tokio::test]
async fn test_non_utf8_payload() {
    let client = InMemorySecretManager::new()
        .with_secret_version("proj", "key", Bytes::from_static(&[0xff, 0xfe, 0x00]));

    let source = SecretPropertySource::new(&client, "proj", "").await.unwrap();

    assert_eq!(source.get_property("key").map(|b| b.len()), Some(3));
    assert_eq!(source.get_property_str("key"), None);
}

#[tokio::test]
async fn test_duplicate_listing_entry_is_not_repeated() {
    let client = InMemorySecretManager::new()
        .with_secret_version("proj", "alpha", "first")
        .with_secret_version("proj", "beta", "b")
        .with_listing_entry("proj", "projects/proj/secrets/alpha");

    let source = SecretPropertySource::new(&client, "proj", "").await.unwrap();

    assert_eq!(source.property_names(), ["alpha", "beta"]);
    assert_eq!(source.get_property_str("alpha"), Some("first"));
    assert_eq!(client.access_log().await.len(), 3);
}

#[tokio::test]
async fn test_iter_and_rename() {
    let client = InMemorySecretManager::new()
        .with_secret_version("proj", "alpha", "A")
        .with_secret_version("proj", "beta", "B");

    let source = SecretPropertySource::new(&client, "proj", "cfg.")
        .await
        .unwrap()
        .named("bootstrap-secrets");

    assert_eq!(source.name(), "bootstrap-secrets");
    assert_eq!(source.project_id(), "proj");
    assert_eq!(source.prefix(), "cfg.");

    let pairs: Vec<(&str, &[u8])> = source.iter().map(|(k, v)| (k, &v[..])).collect();
    assert_eq!(pairs, vec![("cfg.alpha", &b"A"[..]), ("cfg.beta", &b"B"[..])]);
}

#[tokio::test]
async fn test_dyn_secret_manager() {
    let client: Box<dyn gcp_secrets::SecretManager> =
        Box::new(InMemorySecretManager::new().with_secret_version("proj", "alpha", "A"));

    let source = SecretPropertySource::new(client.as_ref(), "proj", "").await.unwrap();
    assert_eq!(source.get_property_str("alpha"), Some("A"));
}

#[tokio::test]
async fn test_debug_omits_payloads() {
    let client = InMemorySecretManager::new().with_secret_version("proj", "db-password", "hunter2");

    let source = SecretPropertySource::new(&client, "proj", "").await.unwrap();
    let debug = format!("{source:?}");

    assert!(debug.contains("db-password"));
    assert!(!debug.contains("hunter2"));
}
