//! What a successful call hands back to the caller.

use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::Envelope;

/// Body of a successful response after the response hook ran.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// A successful envelope, kept whole.
    Envelope(Envelope),
    /// The `data` field of a successful envelope, when the client is
    /// configured to unwrap payloads.
    Data(Option<Value>),
    /// A response that is not enveloped, passed through untouched.
    Raw(Vec<u8>),
}

/// A response that made it through the response hook without error.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// Id sent in `X-Request-Id`, if request-id injection was on.
    pub request_id: Option<String>,
    pub body: Body,
}

impl Response {
    pub fn envelope(&self) -> Option<&Envelope> {
        match &self.body {
            Body::Envelope(envelope) => Some(envelope),
            _ => None,
        }
    }

    /// The payload, whether the body was kept as an envelope or unwrapped.
    pub fn data(&self) -> Option<&Value> {
        match &self.body {
            Body::Envelope(envelope) => envelope.data.as_ref(),
            Body::Data(data) => data.as_ref(),
            Body::Raw(_) => None,
        }
    }

    /// Deserializes the payload into `T`.
    ///
    /// For raw pass-through bodies the whole body is parsed as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        match &self.body {
            Body::Raw(bytes) => serde_json::from_slice(bytes),
            _ => serde_json::from_value(self.data().cloned().unwrap_or(Value::Null)),
        }
    }

    /// Raw body as text, lossily decoded. `None` unless the body was passed through.
    pub fn text(&self) -> Option<String> {
        match &self.body {
            Body::Raw(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
            _ => None,
        }
    }
}
