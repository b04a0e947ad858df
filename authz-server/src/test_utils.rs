use crate::cache::memory::InMemoryCache;
use crate::cache::null::NullCache;
use crate::cache::{Cache, CacheAside};
use crate::config::AuthzConfig;
use crate::create_app;
use crate::identity::tokeninfo::TokenInfoProvider;
use crate::identity::{AuthenticationError, Claims, IdentityProvider};
use crate::models::PermissionMap;
use crate::state::AppState;
use crate::store::file::FileStore;
use crate::store::{BackingStore, StoreEntry, StoreError};
use async_trait::async_trait;
use axum::body::Body;
use axum::Router;
use http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use log::LevelFilter;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use wiremock::matchers;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;

/// 2100-01-01T00:00:00Z
const FAR_FUTURE: i64 = 4_102_444_800;

/// Claims that pass every check of the test configuration
pub fn claims_for(sub: &str) -> Claims {
    let config = AuthzConfig::for_test();
    Claims {
        iss: config.identity.issuers[0].clone(),
        aud: config.identity.audience,
        azp: config.identity.client_id,
        sub: Some(sub.to_string()),
        exp: FAR_FUTURE,
    }
}

/// Identity provider answering from a fixed token → claims table
#[derive(Clone, Default)]
pub struct StaticIdentityProvider {
    tokens: HashMap<String, Claims>,
    calls: Arc<AtomicUsize>,
}

impl StaticIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(self, token: &str, sub: &str) -> Self {
        self.with_claims(token, claims_for(sub))
    }

    pub fn with_claims(mut self, token: &str, claims: Claims) -> Self {
        self.tokens.insert(token.to_string(), claims);
        self
    }

    /// Number of `verify` calls, shared with clones
    pub fn calls(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn verify(&self, token: &str) -> Result<Claims, AuthenticationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.tokens
            .get(token)
            .cloned()
            .ok_or_else(|| AuthenticationError::TokenRejected("unknown token".to_string()))
    }
}

/// In-memory backing store that counts reads; clones share the counter
#[derive(Clone)]
pub struct CountingStore {
    inner: Option<Arc<FileStore>>,
    reads: Arc<AtomicUsize>,
    delay: Option<Duration>,
}

impl CountingStore {
    pub fn new(entries: Vec<StoreEntry>) -> Self {
        Self {
            inner: Some(Arc::new(FileStore::from_entries(entries))),
            reads: Arc::new(AtomicUsize::new(0)),
            delay: None,
        }
    }

    /// A store whose every read fails
    pub fn failing() -> Self {
        Self {
            inner: None,
            reads: Arc::new(AtomicUsize::new(0)),
            delay: None,
        }
    }

    /// Every read sleeps for `delay` before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BackingStore for CountingStore {
    async fn get_entry(&self, id: &str) -> Result<Option<StoreEntry>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.inner {
            Some(store) => store.get_entry(id).await,
            None => Err(StoreError::InvalidStatus(StatusCode::SERVICE_UNAVAILABLE)),
        }
    }

    async fn health_check(&self) -> Result<(), String> {
        match &self.inner {
            Some(_) => Ok(()),
            None => Err("store unavailable".to_string()),
        }
    }
}

pub fn memory_cache_aside() -> CacheAside {
    let cache = InMemoryCache::new(Duration::from_secs(60), 16)
        .expect("Failed to create in-memory cache");
    CacheAside::new(Arc::new(Cache::InMemory(cache)), Duration::from_millis(250))
}

fn permissions(entries: &[(&str, &str)]) -> PermissionMap {
    let mut map = PermissionMap::new();
    for (resource, action) in entries {
        map.entry(resource.to_string())
            .or_insert_with(BTreeSet::new)
            .insert(action.to_string());
    }
    map
}

/// user1 ∈ {group1, group2}, user2 ∈ {group2}
pub fn scenario_entries() -> Vec<StoreEntry> {
    vec![
        StoreEntry::user("user1", &["group1", "group2"]),
        StoreEntry::user("user2", &["group2"]),
        StoreEntry::group(
            "group1",
            permissions(&[("Project_Data", "write"), ("Public_Data", "read")]),
        ),
        StoreEntry::group(
            "group2",
            permissions(&[("Project_Data", "read"), ("Public_Data", "read")]),
        ),
    ]
}

/// Router over `store` with no cache, authenticating through `provider`.
///
/// Nothing here touches the network, so it is safe under paused time.
pub async fn offline_app(store: CountingStore, provider: StaticIdentityProvider) -> Router {
    let state = AppState::with_components(
        AuthzConfig::for_test(),
        Cache::Null(NullCache::new()),
        Arc::new(store),
        Arc::new(provider),
    );
    create_app(state).await
}

/// Sends `request` through `app` and collects the response
pub async fn send_to(app: &Router, request: Request<Body>) -> TestResponse {
    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("Failed to send request");

    let status = response.status();
    let body = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read response body")
        .to_bytes();

    // Try to parse as JSON, defaulting to empty object if parsing fails or empty body
    let json = if !body.is_empty() {
        serde_json::from_slice(&body).unwrap_or_else(|_| json!({}))
    } else {
        json!({})
    };

    TestResponse { status, json }
}

/// Test fixture for exercising the router end to end.
///
/// The application runs with the scenario entries in a counting store, an
/// in-memory cache and the real token-info provider pointed at a mock server.
/// Use [`TestFixture::mock_token`] to make a token valid for a subject.
///
/// # Examples
///
/// ```rust
/// #[tokio::test]
/// async fn test_endpoint() {
///     let fixture = TestFixture::new().await;
///     fixture.mock_token("token-user1", "user1").await;
///
///     let response = fixture.get_with_token("/permissions", "token-user1").await;
///     response.assert_ok();
/// }
/// ```
pub struct TestFixture {
    /// The application router
    pub app: Router,
    /// Configuration the application was built with
    pub config: AuthzConfig,
    /// Mock server standing in for the token-info endpoint
    pub identity_mock: MockServer,
    /// Backing store shared with the application
    pub store: CountingStore,
}

impl TestFixture {
    pub async fn new() -> Self {
        Self::with_entries(scenario_entries()).await
    }

    pub async fn with_entries(entries: Vec<StoreEntry>) -> Self {
        Self::setup_logger(LevelFilter::Debug);

        let identity_mock = MockServer::start().await;
        let mut config = AuthzConfig::for_test();
        config.identity.tokeninfo_url = format!("{}/tokeninfo", identity_mock.uri());

        let provider = TokenInfoProvider::new(&config.identity.tokeninfo_url, 1)
            .expect("Failed to create token-info provider");
        let cache = InMemoryCache::new(Duration::from_secs(60), 16)
            .expect("Failed to create in-memory cache");
        let store = CountingStore::new(entries);

        let state = AppState::with_components(
            config.clone(),
            Cache::InMemory(cache),
            Arc::new(store.clone()),
            Arc::new(provider),
        );
        let app = create_app(state).await;

        Self {
            app,
            config,
            identity_mock,
            store,
        }
    }

    /// Initializes the test logger; repeated calls are ignored
    pub fn setup_logger(level: LevelFilter) {
        let _ = env_logger::builder()
            .filter_level(level)
            .is_test(true)
            .try_init();
    }

    /// Make the identity mock accept `token` as an ID token for `sub`
    pub async fn mock_token(&self, token: &str, sub: &str) {
        let claims = claims_for(sub);
        Mock::given(matchers::method("GET"))
            .and(matchers::path("/tokeninfo"))
            .and(matchers::query_param("id_token", token))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "iss": claims.iss,
                "aud": claims.aud,
                "azp": claims.azp,
                "sub": claims.sub,
                "exp": claims.exp.to_string(),
            })))
            .mount(&self.identity_mock)
            .await;
    }

    /// Creates a request builder with a JSON content type
    pub fn request_builder(&self, method: Method, uri: impl AsRef<str>) -> http::request::Builder {
        Request::builder()
            .method(method)
            .uri(uri.as_ref())
            .header("Content-Type", "application/json")
    }

    pub async fn get(&self, uri: impl AsRef<str>) -> TestResponse {
        let request = self
            .request_builder(Method::GET, uri)
            .body(Body::empty())
            .expect("Failed to build request");

        self.send(request).await
    }

    /// Sends a GET request carrying `Authorization: Bearer <token>`
    pub async fn get_with_token(&self, uri: impl AsRef<str>, token: &str) -> TestResponse {
        let request = self
            .request_builder(Method::GET, uri)
            .header("Authorization", format!("Bearer {}", token))
            .body(Body::empty())
            .expect("Failed to build request");

        self.send(request).await
    }

    pub async fn post<T: Serialize>(&self, uri: impl AsRef<str>, body: &T) -> TestResponse {
        self.post_with_headers(uri, body, &[]).await
    }

    /// Sends a POST request with a JSON body and custom headers
    pub async fn post_with_headers<T: Serialize>(
        &self,
        uri: impl AsRef<str>,
        body: &T,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let json_body = serde_json::to_vec(body).expect("Failed to serialize body to JSON");
        let mut builder = self.request_builder(Method::POST, uri);

        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let request = builder
            .body(Body::from(json_body))
            .expect("Failed to build request");

        self.send(request).await
    }

    /// Sends a request and returns a TestResponse
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        send_to(&self.app, request).await
    }
}

/// Response from a test request with its status and JSON body
pub struct TestResponse {
    pub status: StatusCode,
    /// Response body as JSON (empty object if absent or not JSON)
    pub json: Value,
}

impl TestResponse {
    /// Panics if the status code doesn't match the expected value
    pub fn assert_status(&self, expected: StatusCode) -> &Self {
        assert_eq!(
            self.status,
            expected,
            "Expected status {} but got {} with body: {}",
            expected,
            self.status,
            serde_json::to_string_pretty(&self.json).unwrap_or_default()
        );
        self
    }

    pub fn assert_ok(&self) -> &Self {
        self.assert_status(StatusCode::OK)
    }

    pub fn json_as<T: DeserializeOwned>(&self) -> T {
        serde_json::from_value(self.json.clone()).expect("Failed to deserialize response JSON")
    }
}
