//! Response classification and error normalization.

use std::collections::BTreeMap;

use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::StatusCode;
use serde_json::Value;

use crate::errors::{ApiError, ErrorKind, RawError};
use crate::options::{ErrorCallback, SuccessBody};
use crate::types::{is_api_success, Body, Envelope, ErrorDetail, Response};

const DEFAULT_API_MESSAGE: &str = "Unknown API error";
const DEFAULT_API_CODE: &str = "API_ERROR";
const DEFAULT_NETWORK_MESSAGE: &str = "Network Error";
const DEFAULT_NETWORK_CODE: &str = "NETWORK_ERROR";

/// A failure reported below the envelope layer: no response, a rejected
/// status, or a body that could not be read or parsed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransportFailure {
    pub message: String,
    pub code: Option<String>,
    pub status: Option<u16>,
    pub body: Option<Vec<u8>>,
}

impl TransportFailure {
    pub fn new(message: impl Into<String>, code: Option<&str>) -> Self {
        Self {
            message: message.into(),
            code: code.map(str::to_string),
            ..Self::default()
        }
    }

    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        let code = if err.is_timeout() {
            Some("ETIMEDOUT")
        } else if err.is_connect() {
            Some("ECONNREFUSED")
        } else if err.is_decode() || err.is_body() {
            Some("ERR_BAD_RESPONSE")
        } else {
            None
        };
        Self {
            message: err.to_string(),
            code: code.map(str::to_string),
            status: err.status().map(|s| s.as_u16()),
            body: None,
        }
    }

    /// A response whose status the transport rejects.
    pub fn from_status(status: StatusCode, body: Vec<u8>) -> Self {
        let code = if status.is_client_error() {
            "ERR_BAD_REQUEST"
        } else {
            "ERR_BAD_RESPONSE"
        };
        Self {
            message: format!("Request failed with status code {}", status.as_u16()),
            code: Some(code.to_string()),
            status: Some(status.as_u16()),
            body: Some(body),
        }
    }

    /// A response whose body could not be understood.
    pub fn malformed(status: StatusCode, body: Vec<u8>, reason: impl std::fmt::Display) -> Self {
        Self {
            message: format!("Malformed response body: {}", reason),
            code: Some("ERR_BAD_RESPONSE".to_string()),
            status: Some(status.as_u16()),
            body: Some(body),
        }
    }
}

/// Turns responses into either a [`Response`] or a normalized [`ApiError`].
///
/// Every error produced here is handed to the `on_error` callback exactly
/// once before being returned.
#[derive(Clone, Default)]
pub struct ResponseHook {
    on_error: Option<ErrorCallback>,
    success_body: SuccessBody,
}

impl ResponseHook {
    pub fn new(on_error: Option<ErrorCallback>, success_body: SuccessBody) -> Self {
        Self {
            on_error,
            success_body,
        }
    }

    /// Success path: the transport delivered a response.
    pub fn on_response(
        &self,
        status: StatusCode,
        headers: HeaderMap,
        body: Vec<u8>,
        request_id: Option<String>,
    ) -> Result<Response, ApiError> {
        let passthrough = |headers: HeaderMap, body: Vec<u8>, request_id: Option<String>| Response {
            status,
            headers,
            request_id,
            body: Body::Raw(body),
        };

        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(passthrough(headers, body, request_id));
        }

        let value: Value = match serde_json::from_slice(&body) {
            Ok(value) => value,
            Err(e) if declares_json(&headers) => {
                return Err(self.on_failure(TransportFailure::malformed(status, body, e), request_id));
            }
            Err(_) => return Ok(passthrough(headers, body, request_id)),
        };

        if !value.get("status").is_some_and(is_truthy) {
            return Ok(passthrough(headers, body, request_id));
        }

        let Some(envelope) = Envelope::read_lenient(&value) else {
            let failure = TransportFailure::malformed(status, body, "envelope status is not an object");
            return Err(self.on_failure(failure, request_id));
        };

        if is_api_success(&envelope) {
            tracing::debug!(
                "Envelope {} ({:?}) for request {:?}",
                envelope.status.code,
                envelope.status.http,
                request_id
            );
            let body = match self.success_body {
                SuccessBody::Envelope => Body::Envelope(envelope),
                SuccessBody::Data => Body::Data(envelope.data),
            };
            return Ok(Response {
                status,
                headers,
                request_id,
                body,
            });
        }

        Err(self.reject(api_error(envelope, value)))
    }

    /// Failure path: the transport reported an error.
    pub fn on_failure(&self, failure: TransportFailure, request_id: Option<String>) -> ApiError {
        let mut err = ApiError {
            kind: ErrorKind::Network,
            message: non_empty(&failure.message).unwrap_or(DEFAULT_NETWORK_MESSAGE).to_string(),
            code: failure
                .code
                .as_deref()
                .and_then(non_empty)
                .unwrap_or(DEFAULT_NETWORK_CODE)
                .to_string(),
            http: failure.status,
            request_id,
            trace_id: None,
            errors: None,
            details: None,
            raw: None,
        };
        if let Some(body) = failure.body.as_deref() {
            enrich_from_body(&mut err, body);
        }
        err.raw = Some(RawError::Transport {
            message: failure.message,
            body: failure.body,
        });
        self.reject(err)
    }

    fn reject(&self, err: ApiError) -> ApiError {
        tracing::warn!(
            "{} {} (http {:?}, request {:?}): {}",
            err.kind,
            err.code,
            err.http,
            err.request_id,
            err.message
        );
        if let Some(on_error) = &self.on_error {
            on_error(&err);
        }
        err
    }
}

fn api_error(envelope: Envelope, raw: Value) -> ApiError {
    let trace_id = envelope.trace_id().map(str::to_string);
    let Envelope {
        request_id,
        status,
        errors,
        details,
        ..
    } = envelope;
    ApiError {
        kind: ErrorKind::Api,
        message: non_empty(&status.message).unwrap_or(DEFAULT_API_MESSAGE).to_string(),
        code: non_empty(&status.code).unwrap_or(DEFAULT_API_CODE).to_string(),
        http: status.http,
        request_id,
        trace_id,
        errors,
        details,
        raw: Some(RawError::Envelope(raw)),
    }
}

/// Overlays whatever envelope fields a failed response carries. Anything
/// missing or of the wrong shape leaves the transport values in place.
fn enrich_from_body(err: &mut ApiError, body: &[u8]) {
    let Ok(value) = serde_json::from_slice::<Value>(body) else {
        return;
    };
    let Some(status) = value.get("status").filter(|s| is_truthy(s)) else {
        return;
    };

    if let Some(code) = status.get("code").and_then(Value::as_str).and_then(non_empty) {
        err.code = code.to_string();
    }
    if let Some(http) = status
        .get("http")
        .and_then(Value::as_u64)
        .filter(|h| *h != 0)
        .and_then(|h| u16::try_from(h).ok())
    {
        err.http = Some(http);
    }
    if let Some(message) = status.get("message").and_then(Value::as_str).and_then(non_empty) {
        err.message = message.to_string();
    }
    if let Some(request_id) = value.get("requestId").and_then(Value::as_str).and_then(non_empty) {
        err.request_id = Some(request_id.to_string());
    }
    if let Some(details) = value.get("details").and_then(Value::as_object) {
        err.details = Some(details.clone().into_iter().collect::<BTreeMap<_, _>>());
    }
    if let Some(errors) = value
        .get("errors")
        .cloned()
        .and_then(|e| serde_json::from_value::<Vec<ErrorDetail>>(e).ok())
    {
        err.errors = Some(errors);
    }
}

fn declares_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.to_ascii_lowercase().contains("json"))
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn non_empty(s: &str) -> Option<&str> {
    (!s.is_empty()).then_some(s)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use reqwest::header::HeaderValue;
    use serde_json::json;

    use super::*;

    fn json_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers
    }

    fn bytes(value: Value) -> Vec<u8> {
        serde_json::to_vec(&value).unwrap()
    }

    fn recording_hook(success_body: SuccessBody) -> (ResponseHook, Arc<Mutex<Vec<ApiError>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let on_error: ErrorCallback = Arc::new(move |err: &ApiError| {
            sink.lock().unwrap().push(err.clone());
        });
        (ResponseHook::new(Some(on_error), success_body), seen)
    }

    #[test]
    fn ok_envelope_round_trips() {
        let body = json!({"status": {"code": "OK", "http": 200, "message": "ok"}, "data": {"x": 1}});
        let (hook, seen) = recording_hook(SuccessBody::Envelope);
        let resp = hook
            .on_response(StatusCode::OK, json_headers(), bytes(body.clone()), None)
            .unwrap();
        let envelope = resp.envelope().unwrap();
        assert_eq!(serde_json::to_value(envelope).unwrap(), body);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn ok_envelope_unwraps_when_configured() {
        let body = json!({"status": {"code": "OK", "http": 201, "message": "created"}, "data": {"id": 3}});
        let hook = ResponseHook::new(None, SuccessBody::Data);
        let resp = hook
            .on_response(StatusCode::CREATED, json_headers(), bytes(body), Some("r".into()))
            .unwrap();
        assert_eq!(resp.body, Body::Data(Some(json!({"id": 3}))));
        assert_eq!(resp.request_id.as_deref(), Some("r"));
    }

    #[test]
    fn business_failure_becomes_api_error() {
        let body = json!({
            "requestId": "req-9",
            "status": {"code": "ORD_404", "http": 404, "message": "not found"},
            "errors": [{"code": "SKU_NOT_FOUND", "field": "items[0].sku", "message": "missing"}],
            "details": {"traceId": "t-1", "service": "orders"}
        });
        let (hook, seen) = recording_hook(SuccessBody::Envelope);
        let err = hook
            .on_response(StatusCode::OK, json_headers(), bytes(body.clone()), Some("local".into()))
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::Api);
        assert_eq!(err.code, "ORD_404");
        assert_eq!(err.http, Some(404));
        assert_eq!(err.message, "not found");
        assert_eq!(err.request_id.as_deref(), Some("req-9"));
        assert_eq!(err.trace_id.as_deref(), Some("t-1"));
        assert_eq!(err.errors.as_ref().map(Vec::len), Some(1));
        assert_eq!(err.details.as_ref().and_then(|d| d.get("service")), Some(&json!("orders")));
        assert_eq!(err.raw_envelope(), Some(&body));
        assert_eq!(seen.lock().unwrap().as_slice(), &[err]);
    }

    #[test]
    fn ok_code_outside_2xx_is_a_failure() {
        let body = json!({"status": {"code": "OK", "http": 500, "message": "odd"}});
        let hook = ResponseHook::default();
        let err = hook
            .on_response(StatusCode::OK, json_headers(), bytes(body), None)
            .unwrap_err();
        assert!(err.is_api());
        assert_eq!(err.code, "OK");
        assert_eq!(err.http, Some(500));
    }

    #[test]
    fn empty_status_strings_fall_back_to_defaults() {
        let body = json!({"status": {"code": "", "http": 422, "message": ""}});
        let err = ResponseHook::default()
            .on_response(StatusCode::OK, json_headers(), bytes(body), None)
            .unwrap_err();
        assert_eq!(err.code, "API_ERROR");
        assert_eq!(err.message, "Unknown API error");
        assert_eq!(err.request_id, None);
    }

    #[test]
    fn body_without_status_passes_through() {
        let raw = bytes(json!({"hello": "world"}));
        let (hook, seen) = recording_hook(SuccessBody::Envelope);
        let resp = hook
            .on_response(StatusCode::OK, json_headers(), raw.clone(), None)
            .unwrap();
        assert_eq!(resp.body, Body::Raw(raw));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn null_status_passes_through() {
        let raw = bytes(json!({"status": null, "data": 1}));
        let resp = ResponseHook::default()
            .on_response(StatusCode::OK, json_headers(), raw.clone(), None)
            .unwrap();
        assert_eq!(resp.body, Body::Raw(raw));
    }

    #[test]
    fn empty_body_passes_through() {
        let resp = ResponseHook::default()
            .on_response(StatusCode::NO_CONTENT, HeaderMap::new(), Vec::new(), None)
            .unwrap();
        assert_eq!(resp.body, Body::Raw(Vec::new()));
        assert_eq!(resp.status, StatusCode::NO_CONTENT);
    }

    #[test]
    fn plain_text_passes_through() {
        let resp = ResponseHook::default()
            .on_response(StatusCode::OK, HeaderMap::new(), b"pong".to_vec(), None)
            .unwrap();
        assert_eq!(resp.text().as_deref(), Some("pong"));
    }

    #[test]
    fn malformed_json_is_a_network_error() {
        let (hook, seen) = recording_hook(SuccessBody::Envelope);
        let err = hook
            .on_response(StatusCode::OK, json_headers(), b"{not json".to_vec(), Some("r1".into()))
            .unwrap_err();
        assert!(err.is_network());
        assert_eq!(err.code, "ERR_BAD_RESPONSE");
        assert_eq!(err.http, Some(200));
        assert_eq!(err.request_id.as_deref(), Some("r1"));
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn unclassifiable_envelope_is_a_network_error() {
        let body = json!({"status": "broken"});
        let err = ResponseHook::default()
            .on_response(StatusCode::OK, json_headers(), bytes(body), None)
            .unwrap_err();
        assert!(err.is_network());
        assert_eq!(err.code, "ERR_BAD_RESPONSE");
        assert_eq!(err.message, "Malformed response body: envelope status is not an object");
        assert_eq!(err.http, Some(200));
    }

    #[test]
    fn missing_message_defaults() {
        let body = json!({"status": {"code": "ORD_404", "http": 404}});
        let (hook, seen) = recording_hook(SuccessBody::Envelope);
        let err = hook
            .on_response(StatusCode::OK, json_headers(), bytes(body), None)
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Api);
        assert_eq!(err.code, "ORD_404");
        assert_eq!(err.http, Some(404));
        assert_eq!(err.message, "Unknown API error");
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn missing_code_defaults() {
        let body = json!({"status": {"http": 500, "message": "boom"}});
        let err = ResponseHook::default()
            .on_response(StatusCode::OK, json_headers(), bytes(body), None)
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Api);
        assert_eq!(err.code, "API_ERROR");
        assert_eq!(err.http, Some(500));
        assert_eq!(err.message, "boom");
    }

    #[test]
    fn missing_http_is_absent_on_the_error() {
        let body = json!({"status": {"code": "ORD_STATE_ILLEGAL", "message": "Illegal order state"}});
        let err = ResponseHook::default()
            .on_response(StatusCode::OK, json_headers(), bytes(body), None)
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Api);
        assert_eq!(err.http, None);
        assert_eq!(err.code, "ORD_STATE_ILLEGAL");
    }

    #[test]
    fn empty_status_object_uses_all_defaults() {
        let body = json!({"status": {}});
        let err = ResponseHook::default()
            .on_response(StatusCode::OK, json_headers(), bytes(body.clone()), None)
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Api);
        assert_eq!(err.code, "API_ERROR");
        assert_eq!(err.message, "Unknown API error");
        assert_eq!(err.http, None);
        assert_eq!(err.raw_envelope(), Some(&body));
    }

    #[test]
    fn partial_error_items_are_kept() {
        let body = json!({
            "status": {"code": "ORD_INVALID_PARAM", "http": 422, "message": "Invalid order parameter"},
            "errors": [{"code": "X", "field": "a"}]
        });
        let err = ResponseHook::default()
            .on_response(StatusCode::OK, json_headers(), bytes(body), None)
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Api);
        assert_eq!(err.code, "ORD_INVALID_PARAM");
        let errors = err.errors.unwrap();
        assert_eq!(errors[0].code, "X");
        assert_eq!(errors[0].field.as_deref(), Some("a"));
        assert_eq!(errors[0].message, "");
    }

    #[test]
    fn odd_error_items_do_not_fail_a_success() {
        let body = json!({
            "status": {"code": "OK", "http": 200, "message": "ok"},
            "data": {"x": 1},
            "errors": "unexpected"
        });
        let resp = ResponseHook::default()
            .on_response(StatusCode::OK, json_headers(), bytes(body), None)
            .unwrap();
        let envelope = resp.envelope().unwrap();
        assert!(envelope.errors.is_none());
        assert_eq!(resp.data(), Some(&json!({"x": 1})));
    }

    #[test]
    fn timeout_without_body_uses_transport_values() {
        let (hook, seen) = recording_hook(SuccessBody::Envelope);
        let err = hook.on_failure(
            TransportFailure::new("operation timed out", Some("ETIMEDOUT")),
            Some("rid".into()),
        );
        assert!(err.is_network());
        assert_eq!(err.code, "ETIMEDOUT");
        assert_eq!(err.message, "operation timed out");
        assert_eq!(err.http, None);
        assert_eq!(err.request_id.as_deref(), Some("rid"));
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn failure_defaults_when_transport_is_silent() {
        let err = ResponseHook::default().on_failure(TransportFailure::default(), None);
        assert_eq!(err.code, "NETWORK_ERROR");
        assert_eq!(err.message, "Network Error");
        assert_eq!(err.http, None);
    }

    #[test]
    fn failed_response_with_envelope_is_enriched() {
        let body = json!({
            "requestId": "server-rid",
            "status": {"code": "AUTH_TOKEN_EXPIRED", "http": 401, "message": "Token expired"},
            "details": {"hint": "refresh"},
            "errors": [{"code": "TOKEN", "message": "expired"}]
        });
        let failure = TransportFailure::from_status(StatusCode::UNAUTHORIZED, bytes(body));
        let err = ResponseHook::default().on_failure(failure, Some("client-rid".into()));

        assert_eq!(err.kind, ErrorKind::Network);
        assert_eq!(err.code, "AUTH_TOKEN_EXPIRED");
        assert_eq!(err.http, Some(401));
        assert_eq!(err.message, "Token expired");
        assert_eq!(err.request_id.as_deref(), Some("server-rid"));
        assert_eq!(err.details.as_ref().and_then(|d| d.get("hint")), Some(&json!("refresh")));
        assert_eq!(err.errors.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn enrichment_keeps_transport_values_for_bad_shapes() {
        let body = json!({
            "status": {"code": 12, "http": "four hundred", "message": ""},
            "errors": "not a list",
            "details": []
        });
        let failure = TransportFailure::from_status(StatusCode::BAD_REQUEST, bytes(body));
        let err = ResponseHook::default().on_failure(failure, None);
        assert_eq!(err.code, "ERR_BAD_REQUEST");
        assert_eq!(err.http, Some(400));
        assert_eq!(err.message, "Request failed with status code 400");
        assert!(err.errors.is_none());
        assert!(err.details.is_none());
    }

    #[test]
    fn enrichment_ignores_non_json_bodies() {
        let failure =
            TransportFailure::from_status(StatusCode::BAD_GATEWAY, b"<html>bad gateway</html>".to_vec());
        let err = ResponseHook::default().on_failure(failure, None);
        assert_eq!(err.code, "ERR_BAD_RESPONSE");
        assert_eq!(err.http, Some(502));
        assert!(matches!(err.raw, Some(RawError::Transport { body: Some(_), .. })));
    }

    #[test]
    fn truthiness_matches_loose_presence() {
        assert!(!is_truthy(&json!(null)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!(false)));
        assert!(is_truthy(&json!({})));
        assert!(is_truthy(&json!("x")));
    }
}
