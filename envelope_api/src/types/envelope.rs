//! The standard response envelope and its nested parts.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Envelope format version written by [`Envelope::ok`] and [`Envelope::error`].
pub const ENVELOPE_VERSION: &str = "1.0";

/// Machine code carried by every successful envelope.
pub const OK_CODE: &str = "OK";

/// Standard JSON wrapper returned by every enveloped endpoint.
///
/// Field names and nesting follow the wire format exactly; optional fields
/// that are absent are omitted when serializing.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T = Value> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// ISO-8601 timestamp, kept verbatim. See [`Envelope::parsed_timestamp`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,

    /// Correlation id echoed by the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,

    pub status: Status,

    /// Payload, normally present only on success.
    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    /// Field-level errors, normally present only on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<ErrorDetail>>,

    /// Diagnostic context such as `traceId`, `service` or `hint`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<BTreeMap<String, Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Links>,
}

/// Machine code, mirrored HTTP status and human readable message.
///
/// Backends are expected to send all three; a missing `code` or `message`
/// reads as empty and a missing `http` as `None`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Status {
    /// `"OK"` or a business error code such as `ORD_NOT_FOUND`.
    #[serde(default)]
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http: Option<u16>,
    #[serde(default)]
    pub message: String,
}

/// A single field-level error.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorDetail {
    #[serde(default)]
    pub code: String,
    /// Path of the offending field, e.g. `items[0].quantity`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Meta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<BTreeMap<String, Value>>,
}

/// Page metadata. Pages are 1-based; `cursor` is set for cursor pagination.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_next: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

/// Navigation links.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Links {
    #[serde(rename = "self", default, skip_serializing_if = "Option::is_none")]
    pub self_: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related: Option<BTreeMap<String, String>>,
}

impl Status {
    pub fn new(code: impl Into<String>, http: u16, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            http: Some(http),
            message: message.into(),
        }
    }
}

impl ErrorDetail {
    pub fn new(code: impl Into<String>, field: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            field: field.map(str::to_string),
            message: message.into(),
            expected: None,
            actual: None,
        }
    }
}

impl<T> Envelope<T> {
    fn with_status(status: Status) -> Self {
        Self {
            version: Some(ENVELOPE_VERSION.to_string()),
            timestamp: Some(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
            request_id: None,
            status,
            data: None,
            errors: None,
            details: None,
            meta: None,
            links: None,
        }
    }

    /// Builds a successful envelope (`OK` / 200 / `"Success"`) around `data`.
    pub fn ok(data: T) -> Self {
        let mut envelope = Self::with_status(Status::new(OK_CODE, 200, "Success"));
        envelope.data = Some(data);
        envelope
    }

    /// Builds a failure envelope with the given business code.
    pub fn error(code: impl Into<String>, http: u16, message: impl Into<String>) -> Self {
        Self::with_status(Status::new(code, http, message))
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_errors(mut self, errors: Vec<ErrorDetail>) -> Self {
        self.errors = Some(errors);
        self
    }

    pub fn with_meta(mut self, meta: Meta) -> Self {
        self.meta = Some(meta);
        self
    }

    pub fn with_links(mut self, links: Links) -> Self {
        self.links = Some(links);
        self
    }

    /// Adds one entry to `details`, creating the map on first use.
    pub fn with_details_entry(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// `details.traceId`, when it is a string.
    pub fn trace_id(&self) -> Option<&str> {
        self.details
            .as_ref()
            .and_then(|d| d.get("traceId"))
            .and_then(Value::as_str)
    }

    /// Parses `timestamp` as RFC 3339. `None` when absent or unparseable.
    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        let raw = self.timestamp.as_deref()?;
        DateTime::parse_from_rfc3339(raw)
            .map(|ts| ts.with_timezone(&Utc))
            .ok()
    }

    /// Returns true when this envelope satisfies [`is_api_success`].
    pub fn is_success(&self) -> bool {
        is_api_success(self)
    }
}

impl Envelope<Value> {
    /// Reads an envelope field by field, dropping any part that has the
    /// wrong shape instead of failing.
    ///
    /// Returns `None` only when `status` is missing or not an object.
    pub fn read_lenient(value: &Value) -> Option<Self> {
        let status = value.get("status")?.as_object()?;
        let text = |key: &str| {
            status
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        Some(Self {
            version: lenient_field(value, "version"),
            timestamp: lenient_field(value, "timestamp"),
            request_id: lenient_field(value, "requestId"),
            status: Status {
                code: text("code"),
                http: status
                    .get("http")
                    .and_then(Value::as_u64)
                    .and_then(|http| u16::try_from(http).ok()),
                message: text("message"),
            },
            data: value.get("data").filter(|d| !d.is_null()).cloned(),
            errors: lenient_field(value, "errors"),
            details: lenient_field(value, "details"),
            meta: lenient_field(value, "meta"),
            links: lenient_field(value, "links"),
        })
    }

    /// Deserializes `data` into a concrete payload type.
    pub fn data_as<U: DeserializeOwned>(&self) -> Result<Option<U>, serde_json::Error> {
        self.data.clone().map(serde_json::from_value).transpose()
    }
}

fn lenient_field<U: DeserializeOwned>(value: &Value, key: &str) -> Option<U> {
    value
        .get(key)
        .cloned()
        .and_then(|field| serde_json::from_value(field).ok())
}

/// Success is exactly `status.code == "OK"` and a 2xx mirrored HTTP status.
pub fn is_api_success<T>(envelope: &Envelope<T>) -> bool {
    envelope.status.code == OK_CODE
        && envelope
            .status
            .http
            .is_some_and(|http| (200..300).contains(&http))
}

/// True when the envelope carries a non-`OK` business code.
///
/// Note this is not the negation of [`is_api_success`]: an `OK` code with
/// a non-2xx mirrored status is neither.
pub fn is_api_error_resp<T>(envelope: &Envelope<T>) -> bool {
    envelope.status.code != OK_CODE
}
