//! Construction-time and per-request options.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::errors::ApiError;

/// Overall request timeout used unless [`ClientOptions::with_timeout`] overrides it.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Returns the current bearer token, or `None` when there is none.
pub type TokenProvider = Arc<dyn Fn() -> Option<String> + Send + Sync>;

/// Observes every normalized error before it is returned.
pub type ErrorCallback = Arc<dyn Fn(&ApiError) + Send + Sync>;

/// What a successful envelope response turns into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SuccessBody {
    /// Keep the whole envelope as the body. This is the default.
    #[default]
    Envelope,
    /// Unwrap to the envelope's `data` field.
    Data,
}

/// Everything a [`Client`](crate::Client) is built from.
///
/// Read-only once the client exists.
#[derive(Clone)]
pub struct ClientOptions {
    pub base_url: String,
    pub get_token: Option<TokenProvider>,
    pub on_error: Option<ErrorCallback>,
    /// Attach `X-Request-Id` to every request. Defaults to true.
    pub inject_request_id: bool,
    /// Merged into every request, over `Content-Type: application/json`.
    pub default_headers: BTreeMap<String, String>,
    pub timeout: Duration,
    pub success_body: SuccessBody,
    /// Treat non-2xx statuses as transport failures. Defaults to true.
    pub validate_status: bool,
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientOptions")
            .field("base_url", &self.base_url)
            .field("get_token", &self.get_token.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("inject_request_id", &self.inject_request_id)
            .field("default_headers", &self.default_headers)
            .field("timeout", &self.timeout)
            .field("success_body", &self.success_body)
            .field("validate_status", &self.validate_status)
            .finish()
    }
}

impl ClientOptions {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            get_token: None,
            on_error: None,
            inject_request_id: true,
            default_headers: BTreeMap::new(),
            timeout: DEFAULT_TIMEOUT,
            success_body: SuccessBody::default(),
            validate_status: true,
        }
    }

    /// Sets the token accessor consulted before every request.
    pub fn with_token_provider<F>(mut self, get_token: F) -> Self
    where
        F: Fn() -> Option<String> + Send + Sync + 'static,
    {
        self.get_token = Some(Arc::new(get_token));
        self
    }

    /// Shorthand for a provider that always returns the same token.
    pub fn with_static_token(self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.with_token_provider(move || Some(token.clone()))
    }

    pub fn with_error_callback<F>(mut self, on_error: F) -> Self
    where
        F: Fn(&ApiError) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(on_error));
        self
    }

    pub fn with_request_id_injection(mut self, enabled: bool) -> Self {
        self.inject_request_id = enabled;
        self
    }

    pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(name.into(), value.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_success_body(mut self, success_body: SuccessBody) -> Self {
        self.success_body = success_body;
        self
    }

    pub fn with_status_validation(mut self, enabled: bool) -> Self {
        self.validate_status = enabled;
        self
    }
}

/// Per-request extension fields, passed alongside each call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// Sent as `Idempotency-Key` when set.
    pub idempotency_key: Option<String>,
    /// Sent as `X-Request-Id`; generated when absent. The request hook
    /// writes the id it used back here.
    pub request_id: Option<String>,
    /// Do not attach `Authorization` even if a token is available.
    pub skip_auth: bool,
    /// Extra headers for this request only.
    pub headers: BTreeMap<String, String>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_skip_auth(mut self, skip_auth: bool) -> Self {
        self.skip_auth = skip_auth;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_options_defaults() {
        let opts = ClientOptions::new("https://api.example.com");
        assert!(opts.inject_request_id);
        assert!(opts.validate_status);
        assert!(opts.get_token.is_none());
        assert!(opts.on_error.is_none());
        assert!(opts.default_headers.is_empty());
        assert_eq!(opts.timeout, Duration::from_secs(10));
        assert_eq!(opts.success_body, SuccessBody::Envelope);
    }

    #[test]
    fn static_token_provider_returns_token() {
        let opts = ClientOptions::new("https://api.example.com").with_static_token("t0k");
        let provider = opts.get_token.unwrap();
        assert_eq!(provider().as_deref(), Some("t0k"));
    }

    #[test]
    fn debug_hides_callbacks() {
        let opts = ClientOptions::new("https://api.example.com").with_static_token("secret");
        let printed = format!("{:?}", opts);
        assert!(printed.contains("get_token: true"));
        assert!(!printed.contains("secret"));
    }

    #[test]
    fn request_options_builder() {
        let opts = RequestOptions::new()
            .with_idempotency_key("K")
            .with_request_id("R")
            .with_skip_auth(true)
            .with_header("X-Tenant", "acme");
        assert_eq!(opts.idempotency_key.as_deref(), Some("K"));
        assert_eq!(opts.request_id.as_deref(), Some("R"));
        assert!(opts.skip_auth);
        assert_eq!(opts.headers.get("X-Tenant").map(String::as_str), Some("acme"));
    }
}
