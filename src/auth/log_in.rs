//! The routes for logging a user in and out.
//!
//! The cookie module handles the lower level session cookie logic.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use rusqlite::Connection;
use serde::Deserialize;
use time::Duration;

use crate::{
    AppState, Error,
    auth::cookie::{invalidate_auth_cookie, set_auth_cookie},
    db::lock_connection,
    extract::JsonBody,
    user::get_user_by_username,
};

/// How long the auth cookie should last if the user selects "remember me" at log-in.
const REMEMBER_ME_COOKIE_DURATION: Duration = Duration::days(7);

/// The state needed to perform a login.
#[derive(Debug, Clone)]
pub struct LoginState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    /// Whether auth cookies are only sent over HTTPS.
    pub cookie_secure: bool,
    /// The database connection for looking up users.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for LoginState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            cookie_secure: state.cookie_secure,
            db_connection: state.db_connection.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<LoginState> for Key {
    fn from_ref(state: &LoginState) -> Self {
        state.cookie_key.clone()
    }
}

/// The credentials sent by the client to log in.
///
/// The password is stored as a plain string, it is only compared against the
/// stored hash.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogInData {
    /// The name the user registered with.
    pub username: String,
    /// Password entered during log-in.
    pub password: String,
    /// Whether to extend the initial auth cookie duration.
    #[serde(default)]
    pub remember_me: bool,
}

/// Handler for log-in requests via the POST method.
///
/// On success the auth cookie is set and the logged in user is returned as JSON.
///
/// # Errors
///
/// Responds with [Error::InvalidCredentials] if the username is unknown or the
/// password does not match.
pub async fn post_log_in(
    State(state): State<LoginState>,
    jar: PrivateCookieJar,
    JsonBody(credentials): JsonBody<LogInData>,
) -> Response {
    let user = {
        let connection = match lock_connection(&state.db_connection) {
            Ok(connection) => connection,
            Err(error) => return error.into_response(),
        };

        match get_user_by_username(&credentials.username, &connection) {
            Ok(user) => user,
            Err(Error::NotFound) => return Error::InvalidCredentials.into_response(),
            Err(error) => return error.into_response(),
        }
    };

    match user.password_hash.verify(&credentials.password) {
        Ok(true) => {}
        Ok(false) => {
            tracing::info!("Rejected log in for {}", credentials.username);
            return Error::InvalidCredentials.into_response();
        }
        Err(error) => {
            tracing::error!("Unhandled error while verifying credentials: {error}");
            return Error::HashingError(error.to_string()).into_response();
        }
    }

    let cookie_duration = if credentials.remember_me {
        REMEMBER_ME_COOKIE_DURATION
    } else {
        state.cookie_duration
    };

    match set_auth_cookie(jar.clone(), user.id, cookie_duration, state.cookie_secure) {
        Ok(updated_jar) => {
            tracing::info!("User {} logged in", user.id);
            (updated_jar, Json(user)).into_response()
        }
        Err(error) => {
            tracing::error!("Error setting auth cookie: {error}");
            (invalidate_auth_cookie(jar, state.cookie_secure), error).into_response()
        }
    }
}

/// Log out the current user by invalidating the auth cookie.
pub async fn get_log_out(
    State(state): State<LoginState>,
    jar: PrivateCookieJar<Key>,
) -> PrivateCookieJar<Key> {
    invalidate_auth_cookie(jar, state.cookie_secure)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Router,
        http::StatusCode,
        routing::{get, post},
    };
    use axum_extra::extract::cookie::Key;
    use axum_test::TestServer;
    use rusqlite::Connection;
    use serde_json::json;
    use sha2::{Digest, Sha512};
    use time::{Duration, OffsetDateTime};

    use crate::{
        auth::{
            PasswordHash,
            cookie::{COOKIE_TOKEN, DEFAULT_COOKIE_DURATION},
        },
        db::initialize,
        endpoints,
        user::{NewUser, create_user},
    };

    use super::{LoginState, REMEMBER_ME_COOKIE_DURATION, get_log_out, post_log_in};

    fn get_test_server() -> TestServer {
        get_test_server_with_secure_cookies(true)
    }

    fn get_test_server_with_secure_cookies(cookie_secure: bool) -> TestServer {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        create_user(
            NewUser {
                username: "Heath93",
                first_name: "Ibrahim",
                last_name: "Dickens",
                password_hash: PasswordHash::new("s3cret", 4).unwrap(),
            },
            &conn,
        )
        .unwrap();

        let state = LoginState {
            cookie_key: Key::from(&Sha512::digest(b"log in tests")),
            cookie_duration: DEFAULT_COOKIE_DURATION,
            cookie_secure,
            db_connection: Arc::new(Mutex::new(conn)),
        };

        let app = Router::new()
            .route(endpoints::LOG_IN_API, post(post_log_in))
            .route(endpoints::LOG_OUT, get(get_log_out))
            .with_state(state);

        TestServer::new(app).expect("Could not create test server.")
    }

    #[track_caller]
    fn assert_date_time_close(left: OffsetDateTime, right: OffsetDateTime) {
        assert!(
            (left - right).abs() < Duration::seconds(2),
            "got date time {left:?}, want {right:?}"
        );
    }

    #[tokio::test]
    async fn log_in_succeeds_with_valid_credentials() {
        let server = get_test_server();

        let response = server
            .post(endpoints::LOG_IN_API)
            .json(&json!({"username": "Heath93", "password": "s3cret"}))
            .await;

        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["username"], "Heath93");
        assert_date_time_close(
            response.cookie(COOKIE_TOKEN).expires_datetime().unwrap(),
            OffsetDateTime::now_utc() + DEFAULT_COOKIE_DURATION,
        );
    }

    #[tokio::test]
    async fn remember_me_extends_auth_cookie() {
        let server = get_test_server();

        let response = server
            .post(endpoints::LOG_IN_API)
            .json(&json!({"username": "Heath93", "password": "s3cret", "rememberMe": true}))
            .await;

        response.assert_status_ok();
        assert_date_time_close(
            response.cookie(COOKIE_TOKEN).expires_datetime().unwrap(),
            OffsetDateTime::now_utc() + REMEMBER_ME_COOKIE_DURATION,
        );
    }

    #[tokio::test]
    async fn log_in_fails_with_wrong_password() {
        let server = get_test_server();

        server
            .post(endpoints::LOG_IN_API)
            .json(&json!({"username": "Heath93", "password": "wrong"}))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn log_in_fails_with_unknown_user() {
        let server = get_test_server();

        server
            .post(endpoints::LOG_IN_API)
            .json(&json!({"username": "nobody", "password": "s3cret"}))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn log_in_fails_with_missing_fields() {
        let server = get_test_server();

        server
            .post(endpoints::LOG_IN_API)
            .json(&json!({"username": "Heath93"}))
            .await
            .assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn log_out_invalidates_cookie() {
        let server = get_test_server();

        let response = server.get(endpoints::LOG_OUT).await;

        response.assert_status_ok();
        assert_eq!(response.cookie(COOKIE_TOKEN).max_age(), Some(Duration::ZERO));
    }

    #[tokio::test]
    async fn auth_cookie_is_secure_by_default() {
        let server = get_test_server();

        let response = server
            .post(endpoints::LOG_IN_API)
            .json(&json!({"username": "Heath93", "password": "s3cret"}))
            .await;

        assert_eq!(response.cookie(COOKIE_TOKEN).secure(), Some(true));
    }

    #[tokio::test]
    async fn auth_cookie_can_be_sent_over_plain_http() {
        let server = get_test_server_with_secure_cookies(false);

        let log_in_response = server
            .post(endpoints::LOG_IN_API)
            .json(&json!({"username": "Heath93", "password": "s3cret"}))
            .await;
        let log_out_response = server.get(endpoints::LOG_OUT).await;

        log_in_response.assert_status_ok();
        assert_ne!(log_in_response.cookie(COOKIE_TOKEN).secure(), Some(true));
        assert_ne!(log_out_response.cookie(COOKIE_TOKEN).secure(), Some(true));
    }
}
