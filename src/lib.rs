//! A peer-to-peer payments backend centred on the transaction feeds.
//!
//! This library provides a JSON REST API for logging in, sending payments and
//! requests, liking and commenting on transactions, managing contacts, and
//! reading the personal, contacts and public feeds with date range, amount
//! range and page filters.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde_json::json;
use tokio::signal;

mod amount;
mod app_state;
mod auth;
mod contact;
mod database_id;
mod day_bounds;
mod db;
pub mod endpoints;
mod extract;
mod feed;
mod fixture;
mod logging;
mod pagination;
mod routing;
mod transaction;
mod user;

#[cfg(test)]
mod test_utils;

pub use amount::{DollarAmount, dollars_to_cents, format_cents, parse_cents, parse_dollars};
pub use app_state::{AppState, create_cookie_key};
pub use auth::PasswordHash;
pub use contact::Contact;
pub use database_id::{CommentId, DatabaseId, LikeId, TransactionId};
pub use day_bounds::{DateRangeFilter, end_of_day_utc, parse_instant, start_of_day_utc};
pub use db::initialize as initialize_db;
pub use feed::{
    AmountRange, FeedConfig, FeedFilter, FeedPage, FeedPartition, FeedQuery, FeedRequest,
    get_feed_page, query_feed,
};
pub use fixture::{FIXTURE_PASSWORD, FixtureSummary, reset_to_fixture};
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use pagination::{PageData, PaginationConfig};
pub use routing::build_router;
pub use transaction::{
    Comment, Like, PrivacyLevel, RequestStatus, Transaction, TransactionBuilder, TransactionKind,
    TransactionStatus,
};
pub use user::{User, UserID, get_user_by_id};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The feed tag in the request is not `personal`, `contacts` or `public`.
    #[error("unknown feed \"{0}\", expected personal, contacts or public")]
    UnknownPartition(String),

    /// A date or amount range was malformed or missing one bound, or an amount range was reversed.
    #[error("invalid range: {0}")]
    InvalidRangeParameters(String),

    /// A monetary amount was malformed, negative or too large.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// The page number was not a positive integer.
    #[error("page must be a positive integer")]
    InvalidPage,

    /// The participants of a transaction or contact relation are not two
    /// distinct, existing users.
    #[error("invalid participants: {0}")]
    InvalidParticipants(String),

    /// A comment with no text other than whitespace.
    #[error("comments cannot be empty")]
    EmptyComment,

    /// The path, query string or body of the request could not be read.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The JSON body is well-formed but does not have the expected fields or types.
    #[error("could not process the request body: {0}")]
    UnprocessableRequest(String),

    /// Tried to resolve a payment, or to resolve a request back to pending.
    #[error("only pending requests can be accepted or rejected")]
    InvalidRequestStatus,

    /// The username and password do not match a registered user.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// The session cookie is missing, forged or expired.
    #[error("you must be logged in")]
    Unauthenticated,

    /// The viewer is not allowed to change the resource.
    #[error("you are not allowed to do that")]
    Forbidden,

    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the parameters
    /// (e.g., ID) are correct and that the resource has been created.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// The request was already accepted or rejected.
    #[error("the request has already been resolved")]
    StaleState,

    /// The viewer already liked the transaction.
    #[error("you have already liked this transaction")]
    DuplicateLike,

    /// The user is already one of the viewer's contacts.
    #[error("user {0} is already a contact")]
    DuplicateContact(UserID),

    /// The username is already registered.
    #[error("the username \"{0}\" is already taken")]
    DuplicateUsername(String),

    /// The database could not be read or written.
    ///
    /// The error string should only be logged for debugging on the server.
    #[error("the store is unavailable: {0}")]
    StoreUnavailable(String),

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// An error occurred while serializing a struct as JSON
    #[error("could not serialize as JSON: {0}")]
    JSONSerializationError(String),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::StoreUnavailable(error.to_string())
            }
        }
    }
}

impl Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::UnknownPartition(_)
            | Error::InvalidRangeParameters(_)
            | Error::InvalidAmount(_)
            | Error::InvalidPage
            | Error::InvalidParticipants(_)
            | Error::EmptyComment
            | Error::InvalidRequest(_)
            | Error::InvalidRequestStatus => StatusCode::BAD_REQUEST,
            Error::UnprocessableRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::InvalidCredentials | Error::Unauthenticated => StatusCode::UNAUTHORIZED,
            Error::Forbidden => StatusCode::FORBIDDEN,
            Error::NotFound => StatusCode::NOT_FOUND,
            Error::StaleState
            | Error::DuplicateLike
            | Error::DuplicateContact(_)
            | Error::DuplicateUsername(_) => StatusCode::CONFLICT,
            Error::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::HashingError(_) | Error::JSONSerializationError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = match self {
            // These carry details that are not intended to be shown to the client.
            Error::StoreUnavailable(_) | Error::HashingError(_) | Error::JSONSerializationError(_) => {
                tracing::error!("An unexpected error occurred: {}", self);
                "an unexpected error occurred, check the server logs for more details".to_owned()
            }
            error => error.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
