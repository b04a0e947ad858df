//! Identity provider configuration

use confique::Config;

/// Settings used to verify caller tokens against the identity provider
#[derive(Debug, Config, Clone)]
pub struct IdentityConfig {
    /// Token-info endpoint that verifies a token and returns its claims
    #[config(
        env = "AUTHZ_IDENTITY_TOKENINFO_URL",
        default = "https://oauth2.googleapis.com/tokeninfo"
    )]
    pub tokeninfo_url: String,

    /// Accepted `iss` claims, comma separated in the environment
    #[config(
        env = "AUTHZ_IDENTITY_ISSUERS",
        parse_env = confique::env::parse::list_by_comma,
        default = ["https://accounts.google.com", "accounts.google.com"]
    )]
    pub issuers: Vec<String>,

    /// Expected `aud` claim
    #[config(env = "AUTHZ_IDENTITY_AUDIENCE")]
    pub audience: String,

    /// Expected `azp` claim, only checked when set
    #[config(env = "AUTHZ_IDENTITY_CLIENT_ID")]
    pub client_id: Option<String>,

    /// Timeout for provider requests in seconds (default: 2)
    #[config(env = "AUTHZ_IDENTITY_TIMEOUT", default = 2)]
    pub timeout: u64,
}
