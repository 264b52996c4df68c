mod envelope;
pub use self::envelope::{
    is_api_error_resp, is_api_success, Envelope, ErrorDetail, Links, Meta, Pagination, Status,
    ENVELOPE_VERSION, OK_CODE,
};

mod response;
pub use self::response::{Body, Response};
