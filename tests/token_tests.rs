use std::sync::Arc;
use std::time::{Duration, SystemTime};

use wechat_oa_sdk::types::{AccessToken, AppId, AppSecret, Credential};
use wechat_oa_sdk::{
    CredentialStore, FileCredentialStore, HttpError, MemoryCredentialStore, WechatClient,
    WechatError,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const APPID: &str = "wx1234567890abcdef";
const SECRET: &str = "secret1234567890ab";

fn client_for(server: &MockServer) -> WechatClient {
    WechatClient::builder()
        .appid(AppId::new(APPID).unwrap())
        .secret(AppSecret::new(SECRET).unwrap())
        .base_url(server.uri())
        .mp_base_url(server.uri())
        .build()
        .unwrap()
}

fn token_body(token: &str) -> serde_json::Value {
    serde_json::json!({"access_token": token, "expires_in": 7200})
}

async fn mount_token(server: &MockServer, token: &str, expected: u64) {
    Mock::given(method("GET"))
        .and(path("/cgi-bin/token"))
        .and(query_param("grant_type", "client_credential"))
        .and(query_param("appid", APPID))
        .and(query_param("secret", SECRET))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body(token)))
        .expect(expected)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_token_reused_within_ttl() {
    let server = MockServer::start().await;
    mount_token(&server, "ACCESS_TOKEN", 1).await;

    let client = client_for(&server);
    assert_eq!(client.access_token().await.unwrap(), "ACCESS_TOKEN");
    assert_eq!(client.access_token().await.unwrap(), "ACCESS_TOKEN");
    assert_eq!(client.access_token().await.unwrap(), "ACCESS_TOKEN");
}

#[tokio::test]
async fn test_concurrent_callers_share_one_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cgi-bin/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(token_body("SHARED"))
                .set_delay(Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = Arc::new(client_for(&server));
    let handles: Vec<_> = (0..20)
        .map(|_| {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.access_token().await })
        })
        .collect();

    for handle in futures::future::join_all(handles).await {
        assert_eq!(handle.unwrap().unwrap(), "SHARED");
    }
}

#[tokio::test]
async fn test_expired_store_entry_is_refetched() {
    let server = MockServer::start().await;
    mount_token(&server, "FRESH", 1).await;

    let store = Arc::new(MemoryCredentialStore::new());
    let client = WechatClient::builder()
        .appid(AppId::new(APPID).unwrap())
        .secret(AppSecret::new(SECRET).unwrap())
        .base_url(server.uri())
        .credential_store(store.clone())
        .build()
        .unwrap();

    let stale = Credential::new(
        AccessToken::new("STALE").unwrap(),
        SystemTime::now() - Duration::from_secs(10),
    );
    store.set(client.credential_key(), stale).await.unwrap();

    assert_eq!(client.access_token().await.unwrap(), "FRESH");
    let stored = store.get(client.credential_key()).await.unwrap().unwrap();
    assert_eq!(stored.token(), "FRESH");
}

#[tokio::test]
async fn test_refresh_buffer_treats_near_expiry_as_expired() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cgi-bin/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"access_token": "SHORT", "expires_in": 60})),
        )
        .expect(2)
        .mount(&server)
        .await;

    // 60s lifetime against the default 5 minute buffer: never reusable.
    let client = client_for(&server);
    client.access_token().await.unwrap();
    client.access_token().await.unwrap();
}

#[tokio::test]
async fn test_fetch_errcode_is_credential_fetch_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cgi-bin/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"errcode": 40013, "errmsg": "invalid appid"})),
        )
        .mount(&server)
        .await;

    let err = client_for(&server).access_token().await.unwrap_err();
    match err {
        WechatError::CredentialFetch { code, message } => {
            assert_eq!(code, 40013);
            assert_eq!(message, "invalid appid");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_token_fetch_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cgi-bin/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(token_body("LATE"))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let client = WechatClient::builder()
        .appid(AppId::new(APPID).unwrap())
        .secret(AppSecret::new(SECRET).unwrap())
        .base_url(server.uri())
        .timeout(Duration::from_millis(200))
        .build()
        .unwrap();

    let err = client.access_token().await.unwrap_err();
    assert!(matches!(err, WechatError::Transport(HttpError::Timeout)));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_fetch_access_token_always_hits_network() {
    let server = MockServer::start().await;
    mount_token(&server, "ACCESS_TOKEN", 2).await;

    let client = client_for(&server);
    client.access_token().await.unwrap();
    let credential = client.fetch_access_token().await.unwrap();

    assert_eq!(credential.token(), "ACCESS_TOKEN");
    assert!(credential.is_usable(Duration::from_secs(300)));
}

#[tokio::test]
async fn test_invalidate_token_forces_refetch() {
    let server = MockServer::start().await;
    mount_token(&server, "ACCESS_TOKEN", 2).await;

    let client = client_for(&server);
    client.access_token().await.unwrap();
    client.invalidate_token().await.unwrap();
    client.access_token().await.unwrap();
}

#[tokio::test]
async fn test_file_store_shared_between_clients() {
    let server = MockServer::start().await;
    mount_token(&server, "PERSISTED", 1).await;

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("credentials.json");

    let build = || {
        WechatClient::builder()
            .appid(AppId::new(APPID).unwrap())
            .secret(AppSecret::new(SECRET).unwrap())
            .base_url(server.uri())
            .credential_store(Arc::new(FileCredentialStore::new(&file)))
            .build()
            .unwrap()
    };

    assert_eq!(build().access_token().await.unwrap(), "PERSISTED");
    // A second process-like client reads the persisted credential.
    assert_eq!(build().access_token().await.unwrap(), "PERSISTED");
    assert!(file.exists());
}

#[tokio::test]
async fn test_rotated_secret_uses_separate_slot() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cgi-bin/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("ANY")))
        .expect(2)
        .mount(&server)
        .await;

    let store: Arc<dyn CredentialStore> = Arc::new(MemoryCredentialStore::new());
    let build = |secret: &str| {
        WechatClient::builder()
            .appid(AppId::new(APPID).unwrap())
            .secret(AppSecret::new(secret).unwrap())
            .base_url(server.uri())
            .credential_store(Arc::clone(&store))
            .build()
            .unwrap()
    };

    let old = build("old_secret");
    let new = build("new_secret");
    assert_ne!(old.credential_key(), new.credential_key());

    old.access_token().await.unwrap();
    new.access_token().await.unwrap();
}

#[tokio::test]
async fn test_out_of_range_expires_in_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cgi-bin/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"access_token": "T1", "expires_in": u64::MAX})),
        )
        .mount(&server)
        .await;

    let err = client_for(&server).access_token().await.unwrap_err();
    assert!(matches!(err, WechatError::Decode(_)));
}
