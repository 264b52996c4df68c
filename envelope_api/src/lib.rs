//! Envelope-aware HTTP client.
//!
//! Every request goes through a request hook that adds `Authorization`,
//! `X-Request-Id` and `Idempotency-Key` headers, and every response goes
//! through a response hook that classifies the standard envelope and
//! normalizes failures into a single [`ApiError`] shape.
mod client;
mod errors;
pub mod hooks;
mod options;
mod request_id;
pub mod types;
pub use self::client::Client;
pub use self::errors::{ApiError, Error, ErrorKind, RawError};
pub use self::options::{
    ClientOptions, ErrorCallback, RequestOptions, SuccessBody, TokenProvider, DEFAULT_TIMEOUT,
};
pub use self::request_id::generate_request_id;
pub use self::types::{is_api_error_resp, is_api_success, Envelope};
