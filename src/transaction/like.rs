//! Likes on transactions. Each user may like a transaction at most once.

use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
};
use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error,
    database_id::{LikeId, TransactionId},
    db::lock_connection,
    extract::PathParam,
    transaction::{TransactionState, core::touch_transaction, get_visible_transaction},
    user::UserID,
};

/// A user's like on a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Like {
    /// The ID of the like.
    pub id: LikeId,
    /// The transaction that was liked.
    pub transaction_id: TransactionId,
    /// The user that liked the transaction.
    pub user_id: UserID,
    /// When the like was added.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Create the like table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_like_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS transaction_like (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                transaction_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                UNIQUE(transaction_id, user_id),
                FOREIGN KEY(transaction_id) REFERENCES \"transaction\"(id) ON UPDATE CASCADE ON DELETE CASCADE,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    Ok(())
}

/// Add a like from `user_id` to a transaction and update the transaction's
/// modification time.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `transaction_id` does not refer to a valid transaction,
/// - [Error::DuplicateLike] if the user already liked the transaction,
/// - or [Error::StoreUnavailable] if there is some other SQL error.
pub fn add_like(
    transaction_id: TransactionId,
    user_id: UserID,
    created_at: OffsetDateTime,
    connection: &Connection,
) -> Result<Like, Error> {
    let db_transaction = connection.unchecked_transaction()?;

    touch_transaction(transaction_id, created_at, &db_transaction)?;

    let like = db_transaction
        .prepare(
            "INSERT INTO transaction_like (transaction_id, user_id, created_at)
             VALUES (?1, ?2, ?3)
             RETURNING id, transaction_id, user_id, created_at",
        )?
        .query_row((transaction_id, user_id, created_at), map_like_row)
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
                },
                _,
            ) => Error::DuplicateLike,
            error => error.into(),
        })?;

    db_transaction.commit()?;

    Ok(like)
}

/// Get the likes on a transaction, oldest first.
///
/// # Errors
/// This function will return a [Error::StoreUnavailable] if there is an SQL error.
pub fn get_likes(transaction_id: TransactionId, connection: &Connection) -> Result<Vec<Like>, Error> {
    connection
        .prepare_cached(
            "SELECT id, transaction_id, user_id, created_at FROM transaction_like
             WHERE transaction_id = :transaction_id
             ORDER BY created_at ASC, id ASC",
        )?
        .query_map(&[(":transaction_id", &transaction_id)], map_like_row)?
        .map(|maybe_like| maybe_like.map_err(Error::from))
        .collect()
}

fn map_like_row(row: &Row) -> Result<Like, rusqlite::Error> {
    Ok(Like {
        id: row.get(0)?,
        transaction_id: row.get(1)?,
        user_id: row.get(2)?,
        created_at: row.get(3)?,
    })
}

/// A route handler for liking a transaction the viewer can see.
pub async fn create_like_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    PathParam(transaction_id): PathParam<TransactionId>,
) -> Result<(StatusCode, Json<Like>), Error> {
    let connection = lock_connection(&state.db_connection)?;
    get_visible_transaction(transaction_id, user_id, &connection)?;

    let like = add_like(transaction_id, user_id, OffsetDateTime::now_utc(), &connection)?;
    tracing::info!("User {user_id} liked transaction {transaction_id}");

    Ok((StatusCode::CREATED, Json(like)))
}
