use axum::http::HeaderValue;
use log::debug;

/// Cache directives a client sent with its request.
///
/// `no-cache` makes every resolution go to the backing store, `no-store`
/// keeps freshly loaded values out of the cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientCacheControl {
    pub no_cache: bool,
    pub no_store: bool,
}

impl ClientCacheControl {
    /// Parse the `Cache-Control` request header
    pub fn from_header_value(value: Option<&HeaderValue>) -> Self {
        let mut control = Self::default();

        if let Some(value) = value.and_then(|v| v.to_str().ok()) {
            for directive in value.split(',').map(str::trim) {
                match directive.to_ascii_lowercase().as_str() {
                    "no-cache" => control.no_cache = true,
                    "no-store" => control.no_store = true,
                    "max-age=0" => control.no_cache = true,
                    other => debug!("ignoring cache directive '{}'", other),
                }
            }
        }

        control
    }

    /// Whether cached values may be served
    pub fn should_use_cache(&self) -> bool {
        !self.no_cache
    }

    /// Whether freshly loaded values may be written to the cache
    pub fn should_store(&self) -> bool {
        !self.no_store
    }
}
