//! HTTP client that runs every call through the request and response hooks.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Method;
use serde::Serialize;
use url::Url;

use crate::{
    errors::{ApiError, Error},
    hooks::{RequestHook, ResponseHook, TransportFailure},
    options::{ClientOptions, RequestOptions},
    types::Response,
};

/// HTTP client for APIs that answer with the standard envelope.
///
/// Built once from [`ClientOptions`]; the configuration is read-only
/// afterwards, so the client can be cloned freely and shared across tasks.
/// Requests are independent of each other.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    /// Base URL without a trailing slash.
    base_api_url: String,
    request_hook: RequestHook,
    response_hook: ResponseHook,
    validate_status: bool,
}

impl Client {
    /// Builds a client with `Content-Type: application/json`, the default
    /// headers, and the overall timeout from `options`.
    pub fn new(options: ClientOptions) -> Result<Self, Error> {
        Url::parse(&options.base_url).map_err(|source| Error::InvalidBaseUrl {
            url: options.base_url.clone(),
            source,
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        for (name, value) in &options.default_headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| Error::InvalidHeader(name.clone()))?;
            let header_value =
                HeaderValue::from_str(value).map_err(|_| Error::InvalidHeader(name.clone()))?;
            headers.insert(header_name, header_value);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(options.timeout)
            .build()
            .map_err(|e| {
                tracing::error!("Failed to build HTTP client: {}", e);
                Error::ClientBuild(e)
            })?;

        Ok(Self {
            http,
            base_api_url: options.base_url.trim_end_matches('/').to_string(),
            request_hook: RequestHook::new(options.get_token, options.inject_request_id),
            response_hook: ResponseHook::new(options.on_error, options.success_body),
            validate_status: options.validate_status,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_api_url
    }

    fn get_url(&self, path: &str) -> Result<Url, url::ParseError> {
        if path.starts_with("http://") || path.starts_with("https://") {
            return Url::parse(path);
        }
        Url::parse(&format!(
            "{}/{}",
            self.base_api_url,
            path.trim_start_matches('/')
        ))
    }

    /// Sends one request. `body`, when present, is sent as JSON.
    ///
    /// Returns the response as shaped by the response hook, or the
    /// normalized error after it has been passed to `on_error`.
    pub async fn request<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        mut options: RequestOptions,
    ) -> Result<Response, ApiError>
    where
        B: Serialize + ?Sized,
    {
        let mut headers = HeaderMap::new();
        self.request_hook.apply(&mut options, &mut headers);
        let request_id = options.request_id;

        let url = match self.get_url(path) {
            Ok(url) => url,
            Err(e) => {
                let failure = TransportFailure::new(
                    format!("Invalid URL for path {}: {}", path, e),
                    Some("ERR_INVALID_URL"),
                );
                return Err(self.response_hook.on_failure(failure, request_id));
            }
        };

        let payload = match body.map(serde_json::to_vec).transpose() {
            Ok(payload) => payload,
            Err(e) => {
                let failure = TransportFailure::new(
                    format!("Failed to serialize request body: {}", e),
                    Some("ERR_BAD_REQUEST_BODY"),
                );
                return Err(self.response_hook.on_failure(failure, request_id));
            }
        };

        tracing::debug!("{} {} (request {:?})", method, url, request_id);
        let mut builder = self.http.request(method, url).headers(headers);
        if let Some(payload) = payload {
            builder = builder.body(payload);
        }

        let resp = match builder.send().await {
            Ok(resp) => resp,
            Err(e) => {
                return Err(self
                    .response_hook
                    .on_failure(TransportFailure::from_reqwest(&e), request_id));
            }
        };

        let status = resp.status();
        let resp_headers = resp.headers().clone();
        let body = match resp.bytes().await {
            Ok(bytes) => bytes.to_vec(),
            Err(e) => {
                let failure = TransportFailure {
                    status: Some(status.as_u16()),
                    ..TransportFailure::from_reqwest(&e)
                };
                return Err(self.response_hook.on_failure(failure, request_id));
            }
        };
        tracing::debug!(
            "Received {} ({} bytes) for request {:?}",
            status,
            body.len(),
            request_id
        );

        if self.validate_status && !status.is_success() {
            let failure = TransportFailure::from_status(status, body);
            return Err(self.response_hook.on_failure(failure, request_id));
        }

        self.response_hook
            .on_response(status, resp_headers, body, request_id)
    }

    pub async fn get(&self, path: &str, options: RequestOptions) -> Result<Response, ApiError> {
        self.request::<()>(Method::GET, path, None, options).await
    }

    pub async fn delete(&self, path: &str, options: RequestOptions) -> Result<Response, ApiError> {
        self.request::<()>(Method::DELETE, path, None, options).await
    }

    pub async fn post<B>(
        &self,
        path: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<Response, ApiError>
    where
        B: Serialize + ?Sized,
    {
        self.request(Method::POST, path, Some(body), options).await
    }

    pub async fn put<B>(
        &self,
        path: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<Response, ApiError>
    where
        B: Serialize + ?Sized,
    {
        self.request(Method::PUT, path, Some(body), options).await
    }

    pub async fn patch<B>(
        &self,
        path: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<Response, ApiError>
    where
        B: Serialize + ?Sized,
    {
        self.request(Method::PATCH, path, Some(body), options).await
    }
}
