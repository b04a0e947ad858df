use super::{AuthenticationError, Claims, IdentityProvider};
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Identity provider backed by an OpenID Connect token-info endpoint.
///
/// The endpoint verifies the token signature and expiry and answers with the
/// token's claims; any non-success status means the token was rejected.
#[derive(Clone)]
pub struct TokenInfoProvider {
    client: Client,
    endpoint: Url,
}

impl TokenInfoProvider {
    pub fn new(endpoint: &str, timeout_secs: u64) -> Result<Self, String> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| format!("Invalid token-info URL '{}': {}", endpoint, e))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs.min(2)))
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| format!("Failed to create identity provider client: {}", e))?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl IdentityProvider for TokenInfoProvider {
    async fn verify(&self, token: &str) -> Result<Claims, AuthenticationError> {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("id_token", token);

        let response = self.client.get(url).send().await.map_err(|e| {
            warn!("Identity provider request failed: {}", e);
            AuthenticationError::TokenRejected("identity provider unreachable".to_string())
        })?;

        if !response.status().is_success() {
            debug!("Identity provider rejected token with {}", response.status());
            return Err(AuthenticationError::TokenRejected(format!(
                "identity provider answered {}",
                response.status()
            )));
        }

        response.json::<Claims>().await.map_err(|e| {
            AuthenticationError::TokenRejected(format!("unreadable token claims: {}", e))
        })
    }
}
