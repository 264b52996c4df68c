//! The two hooks every call passes through.

mod request;
pub use self::request::{RequestHook, IDEMPOTENCY_KEY, X_REQUEST_ID};

mod response;
pub use self::response::{ResponseHook, TransportFailure};
