//! Error types for the API client.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::types::ErrorDetail;

/// Errors raised while constructing a [`Client`](crate::Client).
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The base URL could not be parsed.
    #[error("Invalid base URL {url}: {source}")]
    InvalidBaseUrl {
        url: String,
        source: url::ParseError,
    },
    /// A default header had an illegal name or value.
    #[error("Invalid default header {0}")]
    InvalidHeader(String),
    /// The underlying HTTP client could not be built.
    #[error("Failed to build HTTP client")]
    ClientBuild(#[from] reqwest::Error),
}

/// Which side of the cycle produced an [`ApiError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    /// The service answered with a well-formed envelope signalling failure.
    #[serde(rename = "ApiError")]
    Api,
    /// Transport failure, malformed body, or an unclassifiable envelope.
    #[serde(rename = "NetworkError")]
    Network,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorKind::Api => "ApiError",
            ErrorKind::Network => "NetworkError",
        })
    }
}

/// The underlying response or failure an [`ApiError`] was built from.
#[derive(Debug, Clone, PartialEq)]
pub enum RawError {
    /// The full envelope of a business failure.
    Envelope(Value),
    /// A transport failure, with the failed response body if one was read.
    Transport {
        message: String,
        body: Option<Vec<u8>>,
    },
}

/// Uniform error handed to the `on_error` callback and returned as `Err`.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize)]
#[error("{kind}: {message} ({code})")]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    #[serde(rename = "name")]
    pub kind: ErrorKind,
    pub message: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<ErrorDetail>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<BTreeMap<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "raw_envelope")]
    pub raw: Option<RawError>,
}

/// Only envelopes are worth echoing back; transport internals are dropped.
fn raw_envelope<S: Serializer>(raw: &Option<RawError>, serializer: S) -> Result<S::Ok, S::Error> {
    match raw {
        Some(RawError::Envelope(value)) => value.serialize(serializer),
        _ => serializer.serialize_none(),
    }
}

impl ApiError {
    pub fn is_api(&self) -> bool {
        self.kind == ErrorKind::Api
    }

    pub fn is_network(&self) -> bool {
        self.kind == ErrorKind::Network
    }

    /// The raw envelope, for business failures.
    pub fn raw_envelope(&self) -> Option<&Value> {
        match &self.raw {
            Some(RawError::Envelope(value)) => Some(value),
            _ => None,
        }
    }
}
