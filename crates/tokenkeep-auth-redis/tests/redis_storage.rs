//! Integration tests for the Redis auth storage backend.
//!
//! Tests use testcontainers to spin up a real Redis instance. Every test
//! works under its own key prefix so they can share one container.

use std::time::Duration;

use redis::AsyncCommands;
use serde_json::json;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::redis::Redis;
use tokio::sync::OnceCell;
use uuid::Uuid;

use tokenkeep_auth::prelude::*;
use tokenkeep_auth_redis::{RedisAuthStorage, RedisStorageConfig, StorageError, TokenKind, WriteMode};

// Shared Redis container for all tests
static SHARED_REDIS: OnceCell<(ContainerAsync<Redis>, String)> = OnceCell::const_new();

/// Get or create the shared Redis container
async fn get_redis_url() -> String {
    let (_, url) = SHARED_REDIS
        .get_or_init(|| async {
            let container = Redis::default()
                .start()
                .await
                .expect("start redis container");

            let host_port = container.get_host_port_ipv4(6379).await.expect("get port");
            let url = format!("redis://127.0.0.1:{}", host_port);

            (container, url)
        })
        .await;

    url.clone()
}

fn test_config(url: String) -> RedisStorageConfig {
    RedisStorageConfig {
        url,
        key_prefix: format!("test-{}", Uuid::new_v4().simple()),
        ..Default::default()
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

async fn create_storage() -> RedisAuthStorage {
    init_tracing();
    let config = test_config(get_redis_url().await);
    RedisAuthStorage::connect(&config)
        .await
        .expect("connect to redis")
}

fn test_client(id: &str) -> Client {
    Client::new(id, "secret", "http://localhost/callback")
}

async fn ttl(storage: &RedisAuthStorage, key: &str) -> i64 {
    let mut conn = storage.pool().get().await.expect("get connection");
    conn.ttl(key).await.expect("ttl")
}

async fn exists(storage: &RedisAuthStorage, key: &str) -> bool {
    let mut conn = storage.pool().get().await.expect("get connection");
    conn.exists(key).await.expect("exists")
}

// =============================================================================
// Clients
// =============================================================================

#[tokio::test]
async fn test_client_create_and_get() {
    let storage = create_storage().await;
    let client = test_client("c1").with_extra("tier", json!({"name": "gold", "seats": 3}));

    storage.create_client(&client).await.unwrap();

    let loaded = storage.get_client("c1").await.unwrap();
    assert_eq!(loaded, Some(client));
    assert_eq!(ttl(&storage, &storage.keys().client("c1")).await, -1);
}

#[tokio::test]
async fn test_client_update_replaces_record() {
    let storage = create_storage().await;
    let client = test_client("c1").with_extra("tier", json!("gold"));
    storage.create_client(&client).await.unwrap();

    let updated = Client::new("c1", "rotated", "http://localhost/other");
    storage.update_client(&updated).await.unwrap();

    let loaded = storage.get_client("c1").await.unwrap().unwrap();
    assert_eq!(loaded, updated);
    assert!(loaded.extra("tier").is_none());
}

#[tokio::test]
async fn test_client_missing_and_deleted() {
    let storage = create_storage().await;
    assert_eq!(storage.get_client("nope").await.unwrap(), None);

    let client = test_client("c1");
    storage.create_client(&client).await.unwrap();
    storage.delete_client(&client).await.unwrap();
    assert_eq!(storage.get_client("c1").await.unwrap(), None);

    // Deleting again is not an error
    storage.delete_client(&client).await.unwrap();
}

// =============================================================================
// Authorization codes
// =============================================================================

#[tokio::test]
async fn test_authorization_round_trip() {
    let storage = create_storage().await;
    let client = test_client("c1");
    storage.create_client(&client).await.unwrap();

    let mut auth = AuthorizationData::new(client, "code1", 600);
    auth.scope = "openid profile".into();
    auth.state = Some("xyz".into());
    auth.code_challenge = Some("E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM".into());
    auth.code_challenge_method = Some("S256".into());
    auth.user_data = Some(json!({"sub": "user-1"}));

    storage.save_authorization(&auth).await.unwrap();

    let loaded = storage.load_authorization("code1").await.unwrap();
    assert_eq!(loaded, Some(auth));

    let remaining = ttl(&storage, &storage.keys().auth("code1")).await;
    assert!(remaining > 0 && remaining <= 600);
}

#[tokio::test]
async fn test_authorization_remove() {
    let storage = create_storage().await;
    let client = test_client("c1");
    storage.create_client(&client).await.unwrap();
    storage
        .save_authorization(&AuthorizationData::new(client, "code1", 600))
        .await
        .unwrap();

    storage.remove_authorization("code1").await.unwrap();
    assert_eq!(storage.load_authorization("code1").await.unwrap(), None);

    // Removing an absent code succeeds
    storage.remove_authorization("code1").await.unwrap();
}

#[tokio::test]
async fn test_authorization_expires() {
    let storage = create_storage().await;
    let client = test_client("c1");
    storage.create_client(&client).await.unwrap();
    storage
        .save_authorization(&AuthorizationData::new(client, "code1", 1))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(2100)).await;

    assert_eq!(storage.load_authorization("code1").await.unwrap(), None);
}

#[tokio::test]
async fn test_authorization_rejects_non_positive_expiry() {
    let storage = create_storage().await;
    let client = test_client("c1");

    let err = storage
        .authorizations()
        .save(&AuthorizationData::new(client.clone(), "code1", 0))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::InvalidExpiry { expires_in: 0, .. }));

    let err = storage
        .save_authorization(&AuthorizationData::new(client, "code2", -10))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidRequest { .. }));

    assert!(!exists(&storage, &storage.keys().auth("code1")).await);
}

#[tokio::test]
async fn test_authorization_with_deleted_client_fails() {
    let storage = create_storage().await;
    let client = test_client("c1");
    storage.create_client(&client).await.unwrap();
    storage
        .save_authorization(&AuthorizationData::new(client.clone(), "code1", 600))
        .await
        .unwrap();
    storage.delete_client(&client).await.unwrap();

    let err = storage.authorizations().load("code1").await.unwrap_err();
    assert!(matches!(err, StorageError::ClientNotFound(ref id) if id == "c1"));

    let err = storage.load_authorization("code1").await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidClient { .. }));
}

// =============================================================================
// Access grants
// =============================================================================

#[tokio::test]
async fn test_access_lookup_by_either_token() {
    let storage = create_storage().await;
    let client = test_client("c1");
    storage.create_client(&client).await.unwrap();

    let mut access = AccessData::new(client, "at1", 3600).with_refresh_token("rt1");
    access.scope = "read write".into();
    access.user_data = Some(json!({"sub": "user-1"}));
    storage.save_access(&access).await.unwrap();

    let by_access = storage.load_access("at1").await.unwrap().unwrap();
    let by_refresh = storage.load_refresh("rt1").await.unwrap().unwrap();

    assert!(by_access.expires_in > 0 && by_access.expires_in <= 3600);
    assert!(by_refresh.expires_in > 0 && by_refresh.expires_in <= 3600);

    let expected = AccessData {
        expires_in: by_access.expires_in,
        ..access.clone()
    };
    assert_eq!(by_access, expected);
    assert_eq!(by_refresh.access_token, "at1");
    assert_eq!(by_refresh.refresh_token, "rt1");
    assert_eq!(by_refresh.user_data, access.user_data);
}

#[tokio::test]
async fn test_access_keys_share_expiry() {
    let storage = create_storage().await;
    let client = test_client("c1");
    storage.create_client(&client).await.unwrap();

    let access = AccessData::new(client, "at1", 3600).with_refresh_token("rt1");
    let grant_id = storage.access().save(&access).await.unwrap();

    let keys = storage.keys();
    for key in [
        keys.access(&grant_id),
        keys.token(TokenKind::Access, "at1"),
        keys.token(TokenKind::Refresh, "rt1"),
    ] {
        let remaining = ttl(&storage, &key).await;
        assert!(remaining > 3590 && remaining <= 3600, "{key}: {remaining}");
    }

    let mut conn = storage.pool().get().await.unwrap();
    let pointer: String = conn.get(keys.token(TokenKind::Access, "at1")).await.unwrap();
    assert_eq!(pointer, grant_id);
}

#[tokio::test]
async fn test_access_without_refresh_token() {
    let storage = create_storage().await;
    let client = test_client("c1");
    storage.create_client(&client).await.unwrap();

    let access = AccessData::new(client, "at1", 3600);
    storage.save_access(&access).await.unwrap();

    assert!(!exists(&storage, &storage.keys().token(TokenKind::Refresh, "")).await);
    assert_eq!(storage.load_refresh("").await.unwrap(), None);

    let loaded = storage.load_access("at1").await.unwrap().unwrap();
    assert!(loaded.refresh_token.is_empty());

    storage.remove_access("at1").await.unwrap();
    assert_eq!(storage.load_access("at1").await.unwrap(), None);
}

#[tokio::test]
async fn test_access_missing_token_loads_none() {
    let storage = create_storage().await;
    assert_eq!(storage.load_access("unknown").await.unwrap(), None);
    assert_eq!(storage.load_refresh("unknown").await.unwrap(), None);
}

#[tokio::test]
async fn test_remove_by_access_token_invalidates_both() {
    let storage = create_storage().await;
    let client = test_client("c1");
    storage.create_client(&client).await.unwrap();

    let access = AccessData::new(client, "at1", 3600).with_refresh_token("rt1");
    let grant_id = storage.access().save(&access).await.unwrap();

    storage.remove_access("at1").await.unwrap();

    assert_eq!(storage.load_access("at1").await.unwrap(), None);
    assert_eq!(storage.load_refresh("rt1").await.unwrap(), None);
    assert!(!exists(&storage, &storage.keys().access(&grant_id)).await);
    assert!(!exists(&storage, &storage.keys().token(TokenKind::Refresh, "rt1")).await);
}

#[tokio::test]
async fn test_remove_by_refresh_token_invalidates_both() {
    let storage = create_storage().await;
    let client = test_client("c1");
    storage.create_client(&client).await.unwrap();

    let access = AccessData::new(client, "at1", 3600).with_refresh_token("rt1");
    storage.save_access(&access).await.unwrap();

    storage.remove_refresh("rt1").await.unwrap();

    assert_eq!(storage.load_access("at1").await.unwrap(), None);
    assert_eq!(storage.load_refresh("rt1").await.unwrap(), None);
}

#[tokio::test]
async fn test_remove_unknown_token_fails() {
    let storage = create_storage().await;

    let err = storage
        .access()
        .remove_by_access_token("unknown")
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::TokenNotFound(TokenKind::Access)));

    let err = storage.remove_refresh("unknown").await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidGrant { .. }));
}

#[tokio::test]
async fn test_remove_twice_fails_second_time() {
    let storage = create_storage().await;
    let client = test_client("c1");
    storage.create_client(&client).await.unwrap();
    storage
        .save_access(&AccessData::new(client, "at1", 3600).with_refresh_token("rt1"))
        .await
        .unwrap();

    storage.remove_access("at1").await.unwrap();
    assert!(storage.remove_refresh("rt1").await.is_err());
}

#[tokio::test]
async fn test_remove_pointer_with_expired_record() {
    let storage = create_storage().await;
    let client = test_client("c1");
    storage.create_client(&client).await.unwrap();

    let access = AccessData::new(client, "at1", 3600).with_refresh_token("rt1");
    let grant_id = storage.access().save(&access).await.unwrap();

    // Simulate the record expiring ahead of its pointers
    let mut conn = storage.pool().get().await.unwrap();
    conn.del::<_, ()>(storage.keys().access(&grant_id))
        .await
        .unwrap();
    drop(conn);

    assert_eq!(storage.load_access("at1").await.unwrap(), None);
    storage.remove_access("at1").await.unwrap();
    assert!(!exists(&storage, &storage.keys().token(TokenKind::Access, "at1")).await);
}

#[tokio::test]
async fn test_access_expires() {
    let storage = create_storage().await;
    let client = test_client("c1");
    storage.create_client(&client).await.unwrap();
    storage
        .save_access(&AccessData::new(client, "at1", 1).with_refresh_token("rt1"))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(2100)).await;

    assert_eq!(storage.load_access("at1").await.unwrap(), None);
    assert_eq!(storage.load_refresh("rt1").await.unwrap(), None);
}

#[tokio::test]
async fn test_access_rejects_non_positive_expiry() {
    let storage = create_storage().await;
    let client = test_client("c1");

    let err = storage
        .access()
        .save(&AccessData::new(client, "at1", 0).with_refresh_token("rt1"))
        .await
        .unwrap_err();
    assert!(err.is_client_error());
    assert!(!exists(&storage, &storage.keys().token(TokenKind::Access, "at1")).await);
}

#[tokio::test]
async fn test_access_with_deleted_client_fails() {
    let storage = create_storage().await;
    let client = test_client("c1");
    storage.create_client(&client).await.unwrap();
    storage
        .save_access(&AccessData::new(client.clone(), "at1", 3600))
        .await
        .unwrap();
    storage.delete_client(&client).await.unwrap();

    let err = storage.load_access("at1").await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidClient { .. }));

    // Removal does not need the client
    storage.remove_access("at1").await.unwrap();
}

#[tokio::test]
async fn test_access_resolves_current_client() {
    let storage = create_storage().await;
    let client = test_client("c1");
    storage.create_client(&client).await.unwrap();
    storage
        .save_access(&AccessData::new(client, "at1", 3600))
        .await
        .unwrap();

    let rotated = Client::new("c1", "rotated", "http://localhost/callback");
    storage.update_client(&rotated).await.unwrap();

    let loaded = storage.load_access("at1").await.unwrap().unwrap();
    assert_eq!(loaded.client, rotated);
}

#[tokio::test]
async fn test_access_with_authorization_and_previous() {
    let storage = create_storage().await;
    let first = test_client("c1");
    let second = test_client("c2");
    storage.create_client(&first).await.unwrap();
    storage.create_client(&second).await.unwrap();

    let auth = AuthorizationData::new(first.clone(), "code1", 600);
    let previous = AccessData::new(first, "at0", 3600).with_refresh_token("rt0");
    let access = AccessData::new(second, "at1", 3600)
        .with_refresh_token("rt1")
        .with_authorization(auth.clone())
        .with_previous(previous.clone());
    storage.save_access(&access).await.unwrap();

    let loaded = storage.load_access("at1").await.unwrap().unwrap();
    assert_eq!(loaded.client.id, "c2");
    assert_eq!(loaded.authorization, Some(auth));
    assert_eq!(loaded.previous.as_deref(), Some(&previous));

    // The previous grant is embedded, not registered
    assert_eq!(storage.load_access("at0").await.unwrap(), None);
}

#[tokio::test]
async fn test_code_exchange_then_refresh() {
    let storage = create_storage().await;
    let client = test_client("c1");
    storage.create_client(&client).await.unwrap();

    let auth = AuthorizationData::new(client.clone(), "code1", 600);
    storage.save_authorization(&auth).await.unwrap();

    let code = storage.load_authorization("code1").await.unwrap().unwrap();
    let access = AccessData::new(code.client.clone(), "at1", 3600)
        .with_refresh_token("rt1")
        .with_authorization(code);
    storage.save_access(&access).await.unwrap();
    storage.remove_authorization("code1").await.unwrap();

    let refreshed = storage.load_refresh("rt1").await.unwrap().unwrap();
    assert_eq!(refreshed.client.id, "c1");
    assert_eq!(
        refreshed.authorization.as_ref().map(|a| a.code.as_str()),
        Some("code1")
    );

    let next = AccessData::new(client, "at2", 3600)
        .with_refresh_token("rt2")
        .with_previous(refreshed);
    storage.save_access(&next).await.unwrap();
    storage.remove_refresh("rt1").await.unwrap();

    assert_eq!(storage.load_access("at1").await.unwrap(), None);
    let current = storage.load_refresh("rt2").await.unwrap().unwrap();
    assert_eq!(current.access_token, "at2");
    assert_eq!(
        current.previous.as_ref().map(|p| p.access_token.as_str()),
        Some("at1")
    );
}

#[tokio::test]
async fn test_sequential_write_mode() {
    let url = get_redis_url().await;
    let config = RedisStorageConfig {
        write_mode: WriteMode::Sequential,
        ..test_config(url)
    };
    let storage = RedisAuthStorage::connect(&config).await.unwrap();
    assert_eq!(storage.write_mode(), WriteMode::Sequential);

    let client = test_client("c1");
    storage.create_client(&client).await.unwrap();
    storage
        .save_access(&AccessData::new(client, "at1", 3600).with_refresh_token("rt1"))
        .await
        .unwrap();

    assert!(storage.load_refresh("rt1").await.unwrap().is_some());
    storage.remove_refresh("rt1").await.unwrap();
    assert_eq!(storage.load_access("at1").await.unwrap(), None);
}

// =============================================================================
// Isolation and connection
// =============================================================================

#[tokio::test]
async fn test_prefixes_isolate_storages() {
    let url = get_redis_url().await;
    let left = RedisAuthStorage::connect(&test_config(url.clone()))
        .await
        .unwrap();
    let right = RedisAuthStorage::connect(&test_config(url)).await.unwrap();

    left.create_client(&test_client("c1")).await.unwrap();

    assert!(left.get_client("c1").await.unwrap().is_some());
    assert_eq!(right.get_client("c1").await.unwrap(), None);
}

#[tokio::test]
async fn test_shared_handle_through_trait_object() {
    let storage = create_storage().await;
    let handle: Box<dyn OAuthStorage> = storage.clone_storage();

    let client = test_client("c1");
    handle.create_client(&client).await.unwrap();
    assert_eq!(storage.get_client("c1").await.unwrap(), Some(client));
    handle.close();
}

#[tokio::test]
async fn test_connect_unreachable_server_fails() {
    let config = RedisStorageConfig {
        url: "redis://127.0.0.1:1".into(),
        timeout_ms: 500,
        ..Default::default()
    };

    let err = RedisAuthStorage::connect(&config).await.unwrap_err();
    assert!(err.is_redis_error());
}
