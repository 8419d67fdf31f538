//! Helpers shared by the unit tests.

#![allow(missing_docs)]

use axum_extra::extract::cookie::Cookie;
use axum_test::TestServer;
use rusqlite::Connection;
use serde_json::json;
use time::OffsetDateTime;

use crate::{
    AppState,
    auth::{COOKIE_TOKEN, PasswordHash},
    db::initialize,
    endpoints,
    feed::FeedConfig,
    pagination::PaginationConfig,
    routing::build_router,
    transaction::{PrivacyLevel, Transaction, TransactionStatus},
    user::{NewUser, User, UserID, create_user},
};

/// The password of every user created with [insert_test_user].
pub(crate) const TEST_PASSWORD: &str = "hunter2";

pub(crate) fn get_test_connection() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    initialize(&conn).unwrap();
    conn
}

pub(crate) fn insert_test_user(username: &str, connection: &Connection) -> User {
    create_user(
        NewUser {
            username,
            first_name: "Test",
            last_name: "User",
            password_hash: PasswordHash::new(TEST_PASSWORD, 4).unwrap(),
        },
        connection,
    )
    .unwrap()
}

/// A completed payment that only exists in memory.
pub(crate) fn build_transaction(
    id: i64,
    sender_id: UserID,
    receiver_id: UserID,
    amount: i64,
    privacy_level: PrivacyLevel,
    created_at: OffsetDateTime,
) -> Transaction {
    Transaction {
        id,
        sender_id,
        receiver_id,
        amount,
        description: format!("Transaction {id}"),
        privacy_level,
        status: TransactionStatus::Complete,
        request_status: None,
        request_resolved_at: None,
        created_at,
        modified_at: created_at,
        likes: Vec::new(),
        comments: Vec::new(),
    }
}

/// A server with every route, backed by `connection`.
pub(crate) fn get_test_server(connection: Connection) -> TestServer {
    let state = AppState::new(
        connection,
        "test secret",
        PaginationConfig::default(),
        FeedConfig::default(),
    )
    .unwrap();

    TestServer::new(build_router(state, true)).expect("Could not create test server.")
}

/// Log in as `username` and return the session cookie.
pub(crate) async fn log_in(server: &TestServer, username: &str) -> Cookie<'static> {
    let response = server
        .post(endpoints::LOG_IN_API)
        .json(&json!({"username": username, "password": TEST_PASSWORD}))
        .await;
    response.assert_status_ok();

    response.cookie(COOKIE_TOKEN)
}
