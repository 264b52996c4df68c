//! Header injection for outgoing requests.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};

use crate::options::{RequestOptions, TokenProvider};
use crate::request_id::generate_request_id;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");
pub const IDEMPOTENCY_KEY: HeaderName = HeaderName::from_static("idempotency-key");

/// Adds `Authorization`, `X-Request-Id` and `Idempotency-Key` headers.
///
/// Headers are inserted rather than appended, so applying the hook twice
/// with the same options leaves the same headers behind. The hook never
/// fails: a value that is not a legal header value is logged and skipped.
#[derive(Clone)]
pub struct RequestHook {
    get_token: Option<TokenProvider>,
    inject_request_id: bool,
}

impl RequestHook {
    pub fn new(get_token: Option<TokenProvider>, inject_request_id: bool) -> Self {
        Self {
            get_token,
            inject_request_id,
        }
    }

    pub fn apply(&self, options: &mut RequestOptions, headers: &mut HeaderMap) {
        for (name, value) in &options.headers {
            match HeaderName::from_bytes(name.as_bytes()) {
                Ok(name) => set_header(headers, name, value, false),
                Err(_) => tracing::warn!("Skipping invalid header name {:?}", name),
            }
        }

        if !options.skip_auth {
            if let Some(token) = self.get_token.as_ref().and_then(|get_token| get_token()) {
                if !token.is_empty() {
                    set_header(headers, AUTHORIZATION, &format!("Bearer {}", token), true);
                }
            }
        }

        if self.inject_request_id {
            let request_id = options
                .request_id
                .get_or_insert_with(generate_request_id)
                .clone();
            set_header(headers, X_REQUEST_ID, &request_id, false);
        }

        if let Some(key) = &options.idempotency_key {
            set_header(headers, IDEMPOTENCY_KEY, key, false);
        }
    }
}

fn set_header(headers: &mut HeaderMap, name: HeaderName, value: &str, sensitive: bool) {
    match HeaderValue::from_str(value) {
        Ok(mut value) => {
            value.set_sensitive(sensitive);
            headers.insert(name, value);
        }
        Err(_) => tracing::warn!("Skipping {} header: not a valid header value", name),
    }
}
