//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/api/transactions/{transaction_id}', use [format_endpoint].

use std::fmt::Display;

/// The route for logging in a user.
pub const LOG_IN_API: &str = "/api/log_in";
/// The route for the client to log out the current user.
pub const LOG_OUT: &str = "/api/log_out";
/// The route to create transactions and read the viewer's personal feed.
pub const TRANSACTIONS_API: &str = "/api/transactions";
/// The route to read the contacts feed.
pub const CONTACTS_FEED_API: &str = "/api/transactions/contacts";
/// The route to read the public feed.
pub const PUBLIC_FEED_API: &str = "/api/transactions/public";
/// The route to read any feed by its partition tag.
pub const FEED_API: &str = "/api/feeds/{partition}";
/// The route to access a single transaction.
pub const TRANSACTION_API: &str = "/api/transactions/{transaction_id}";
/// The route to like a transaction.
pub const TRANSACTION_LIKES_API: &str = "/api/transactions/{transaction_id}/likes";
/// The route to comment on a transaction.
pub const TRANSACTION_COMMENTS_API: &str = "/api/transactions/{transaction_id}/comments";
/// The route to list and add the viewer's contacts.
pub const CONTACTS_API: &str = "/api/contacts";
/// The route to reset the database to the test fixture.
pub const SEED_TEST_DATA: &str = "/api/test_data/seed";

/// Replace the parameter in `endpoint_path` with `value`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/users/{user_id}', '{user_id}' is the parameter.
///
/// This function assumes that an endpoint path only contains ASCII characters
/// and a single parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, value: impl Display) -> String {
    let Some(param_start) = endpoint_path.find('{') else {
        return endpoint_path.to_string();
    };

    let param_end = endpoint_path[param_start..]
        .find('}')
        .map_or(endpoint_path.len(), |offset| param_start + offset + 1);

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        value,
        &endpoint_path[param_end..]
    )
}
