//! Request extractors whose rejections are reported as [Error]s.
//!
//! axum's own extractors reject malformed input with plain text bodies. These
//! wrappers run the same extractors and convert the rejection so that clients
//! always get the JSON error body.

use axum::extract::{
    FromRequest, FromRequestParts,
    rejection::{JsonRejection, PathRejection, QueryRejection},
};

use crate::Error;

/// Extracts path parameters like [axum::extract::Path].
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(Error))]
pub struct PathParam<T>(pub T);

/// Extracts the query string like [axum::extract::Query].
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(Error))]
pub struct QueryParams<T>(pub T);

/// Extracts a JSON request body like [axum::Json].
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(Error))]
pub struct JsonBody<T>(pub T);

impl From<PathRejection> for Error {
    fn from(rejection: PathRejection) -> Self {
        Error::InvalidRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for Error {
    fn from(rejection: QueryRejection) -> Self {
        Error::InvalidRequest(rejection.body_text())
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            // Well-formed JSON that does not match the expected fields or types.
            JsonRejection::JsonDataError(_) => Error::UnprocessableRequest(rejection.body_text()),
            rejection => Error::InvalidRequest(rejection.body_text()),
        }
    }
}
