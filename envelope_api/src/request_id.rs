//! Correlation ids for outgoing requests.

use uuid::Uuid;

/// Generates a fresh random request id in UUID v4 form.
pub fn generate_request_id() -> String {
    Uuid::new_v4().to_string()
}
