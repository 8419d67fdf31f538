//! Comments on transactions, kept in the order they were written.

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
    database_id::{CommentId, TransactionId},
    db::lock_connection,
    extract::{JsonBody, PathParam},
    transaction::{TransactionState, core::touch_transaction, get_visible_transaction},
    user::UserID,
};

/// A comment on a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    /// The ID of the comment.
    pub id: CommentId,
    /// The transaction the comment is on.
    pub transaction_id: TransactionId,
    /// The author.
    pub user_id: UserID,
    /// The text of the comment.
    pub content: String,
    /// When the comment was written.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Create the comment table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_comment_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS comment (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                transaction_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY(transaction_id) REFERENCES \"transaction\"(id) ON UPDATE CASCADE ON DELETE CASCADE,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_comment_transaction ON comment(transaction_id);",
        (),
    )?;

    Ok(())
}

/// Append a comment from `user_id` to a transaction and update the
/// transaction's modification time.
///
/// Leading and trailing whitespace is removed from `content`.
///
/// # Errors
/// This function will return a:
/// - [Error::EmptyComment] if `content` is blank,
/// - [Error::NotFound] if `transaction_id` does not refer to a valid transaction,
/// - or [Error::StoreUnavailable] if there is some other SQL error.
pub fn add_comment(
    transaction_id: TransactionId,
    user_id: UserID,
    content: &str,
    created_at: OffsetDateTime,
    connection: &Connection,
) -> Result<Comment, Error> {
    let content = content.trim();
    if content.is_empty() {
        return Err(Error::EmptyComment);
    }

    let db_transaction = connection.unchecked_transaction()?;

    touch_transaction(transaction_id, created_at, &db_transaction)?;

    let comment = db_transaction
        .prepare(
            "INSERT INTO comment (transaction_id, user_id, content, created_at)
             VALUES (?1, ?2, ?3, ?4)
             RETURNING id, transaction_id, user_id, content, created_at",
        )?
        .query_row(
            (transaction_id, user_id, content, created_at),
            map_comment_row,
        )?;

    db_transaction.commit()?;

    Ok(comment)
}

/// Get the comments on a transaction in the order they were written.
///
/// # Errors
/// This function will return a [Error::StoreUnavailable] if there is an SQL error.
pub fn get_comments(
    transaction_id: TransactionId,
    connection: &Connection,
) -> Result<Vec<Comment>, Error> {
    connection
        .prepare_cached(
            "SELECT id, transaction_id, user_id, content, created_at FROM comment
             WHERE transaction_id = :transaction_id
             ORDER BY created_at ASC, id ASC",
        )?
        .query_map(&[(":transaction_id", &transaction_id)], map_comment_row)?
        .map(|maybe_comment| maybe_comment.map_err(Error::from))
        .collect()
}

fn map_comment_row(row: &Row) -> Result<Comment, rusqlite::Error> {
    Ok(Comment {
        id: row.get(0)?,
        transaction_id: row.get(1)?,
        user_id: row.get(2)?,
        content: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// The request body for commenting on a transaction.
#[derive(Debug, Deserialize)]
pub struct CommentForm {
    /// The text of the comment.
    pub content: String,
}

/// A route handler for commenting on a transaction the viewer can see.
pub async fn create_comment_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    PathParam(transaction_id): PathParam<TransactionId>,
    JsonBody(form): JsonBody<CommentForm>,
) -> Result<(StatusCode, Json<Comment>), Error> {
    let connection = lock_connection(&state.db_connection)?;
    get_visible_transaction(transaction_id, user_id, &connection)?;

    let comment = add_comment(
        transaction_id,
        user_id,
        &form.content,
        OffsetDateTime::now_utc(),
        &connection,
    )?;
    tracing::info!("User {user_id} commented on transaction {transaction_id}");

    Ok((StatusCode::CREATED, Json(comment)))
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use crate::{
        Error,
        test_utils::{get_test_connection, insert_test_user},
        transaction::{Transaction, create_transaction, get_transaction},
    };

    use super::add_comment;

    #[test]
    fn comments_are_ordered_by_creation() {
        let conn = get_test_connection();
        let alice = insert_test_user("alice", &conn).id;
        let bob = insert_test_user("bob", &conn).id;
        let transaction =
            create_transaction(Transaction::build(alice, bob, 100, ""), &conn).unwrap();

        add_comment(transaction.id, bob, "second", datetime!(2020-01-02 00:00 UTC), &conn)
            .unwrap();
        add_comment(transaction.id, alice, "first", datetime!(2020-01-01 00:00 UTC), &conn)
            .unwrap();
        add_comment(transaction.id, alice, "  third  ", datetime!(2020-01-03 00:00 UTC), &conn)
            .unwrap();

        let got = get_transaction(transaction.id, &conn).unwrap();
        let contents: Vec<_> = got.comments.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, ["first", "second", "third"]);
        assert_eq!(got.modified_at, datetime!(2020-01-03 00:00 UTC));
    }

    #[test]
    fn blank_comment_is_rejected() {
        let conn = get_test_connection();
        let alice = insert_test_user("alice", &conn).id;
        let bob = insert_test_user("bob", &conn).id;
        let transaction =
            create_transaction(Transaction::build(alice, bob, 100, ""), &conn).unwrap();

        for content in ["", "   \n"] {
            let result =
                add_comment(transaction.id, bob, content, datetime!(2020-01-02 00:00 UTC), &conn);

            assert_eq!(result, Err(Error::EmptyComment));
        }
        assert!(get_transaction(transaction.id, &conn).unwrap().comments.is_empty());
    }

    #[test]
    fn comment_on_missing_transaction_is_not_found() {
        let conn = get_test_connection();
        let alice = insert_test_user("alice", &conn).id;

        let result = add_comment(42, alice, "hi", datetime!(2020-01-02 00:00 UTC), &conn);

        assert_eq!(result, Err(Error::NotFound));
    }
}
