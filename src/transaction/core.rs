//! Defines the core data models and database queries for transactions.

use std::fmt::Display;

use rusqlite::{
    Connection, Row, ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error,
    database_id::TransactionId,
    transaction::{Comment, Like, comment::get_comments, like::get_likes},
    user::UserID,
};

// ============================================================================
// MODELS
// ============================================================================

/// Who may see a transaction in the contacts and public feeds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrivacyLevel {
    /// Anyone.
    #[default]
    Public,
    /// The participants and users with a participant in their contacts.
    Contacts,
    /// Only the participants.
    Private,
}

impl PrivacyLevel {
    fn as_str(&self) -> &'static str {
        match self {
            PrivacyLevel::Public => "public",
            PrivacyLevel::Contacts => "contacts",
            PrivacyLevel::Private => "private",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "public" => Some(PrivacyLevel::Public),
            "contacts" => Some(PrivacyLevel::Contacts),
            "private" => Some(PrivacyLevel::Private),
            _ => None,
        }
    }
}

/// Whether the money in a transaction has moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// A request that is waiting on the receiver.
    Pending,
    /// A request that was rejected.
    Incomplete,
    /// A payment, or a request that was accepted.
    Complete,
}

impl TransactionStatus {
    fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Incomplete => "incomplete",
            TransactionStatus::Complete => "complete",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "pending" => Some(TransactionStatus::Pending),
            "incomplete" => Some(TransactionStatus::Incomplete),
            "complete" => Some(TransactionStatus::Complete),
            _ => None,
        }
    }
}

/// The state of a request for money.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    /// The receiver has not answered the request yet.
    Pending,
    /// The receiver paid the request.
    Accepted,
    /// The receiver declined the request.
    Rejected,
}

impl RequestStatus {
    fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Accepted => "accepted",
            RequestStatus::Rejected => "rejected",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "pending" => Some(RequestStatus::Pending),
            "accepted" => Some(RequestStatus::Accepted),
            "rejected" => Some(RequestStatus::Rejected),
            _ => None,
        }
    }
}

impl Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

macro_rules! impl_text_column {
    ($($kind:ty),+) => {
        $(
            impl ToSql for $kind {
                fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                    Ok(ToSqlOutput::from(self.as_str()))
                }
            }

            impl FromSql for $kind {
                fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                    <$kind>::from_tag(value.as_str()?).ok_or(FromSqlError::InvalidType)
                }
            }
        )+
    };
}

impl_text_column!(PrivacyLevel, TransactionStatus, RequestStatus);

/// Whether a new transaction sends money or asks for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// The sender pays the receiver straight away.
    Payment,
    /// The sender asks the receiver for money.
    Request,
}

/// A payment or request between two users.
///
/// To create a new `Transaction`, use [Transaction::build].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The user that created the transaction.
    pub sender_id: UserID,
    /// The other participant.
    pub receiver_id: UserID,
    /// The amount in cents.
    pub amount: i64,
    /// What the transaction was for.
    pub description: String,
    /// Who may see the transaction.
    pub privacy_level: PrivacyLevel,
    /// Whether the money has moved.
    pub status: TransactionStatus,
    /// The state of the request, `None` for payments.
    pub request_status: Option<RequestStatus>,
    /// When the request was accepted or rejected.
    #[serde(with = "time::serde::rfc3339::option")]
    pub request_resolved_at: Option<OffsetDateTime>,
    /// When the transaction was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// When the transaction, its likes or its comments last changed.
    #[serde(with = "time::serde::rfc3339")]
    pub modified_at: OffsetDateTime,
    /// The users that liked the transaction.
    pub likes: Vec<Like>,
    /// The comments on the transaction, oldest first.
    pub comments: Vec<Comment>,
}

impl Transaction {
    /// Create a new transaction.
    ///
    /// Shortcut for [TransactionBuilder] for discoverability.
    pub fn build(
        sender_id: UserID,
        receiver_id: UserID,
        amount: i64,
        description: &str,
    ) -> TransactionBuilder {
        TransactionBuilder {
            sender_id,
            receiver_id,
            amount,
            description: description.to_owned(),
            kind: TransactionKind::Payment,
            privacy_level: PrivacyLevel::default(),
            created_at: None,
        }
    }

    /// Whether `user_id` is the sender or the receiver.
    pub fn has_participant(&self, user_id: UserID) -> bool {
        self.sender_id == user_id || self.receiver_id == user_id
    }
}

/// A builder for creating [Transaction] instances.
///
/// Transactions default to public payments created now.
#[derive(Debug, PartialEq, Clone)]
pub struct TransactionBuilder {
    /// The user creating the transaction.
    pub sender_id: UserID,
    /// The other participant.
    pub receiver_id: UserID,
    /// The amount in cents, must be greater than zero.
    pub amount: i64,
    /// What the transaction is for.
    pub description: String,
    /// Whether this is a payment or a request.
    pub kind: TransactionKind,
    /// Who may see the transaction.
    pub privacy_level: PrivacyLevel,
    /// Overrides the creation time, used for fixtures and tests.
    pub created_at: Option<OffsetDateTime>,
}

impl TransactionBuilder {
    /// Set whether the transaction is a payment or a request.
    pub fn kind(mut self, kind: TransactionKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set who may see the transaction.
    pub fn privacy_level(mut self, privacy_level: PrivacyLevel) -> Self {
        self.privacy_level = privacy_level;
        self
    }

    /// Set the creation time.
    pub fn created_at(mut self, created_at: OffsetDateTime) -> Self {
        self.created_at = Some(created_at);
        self
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

const SELECT_TRANSACTION: &str = "SELECT id, sender_id, receiver_id, amount, description, \
    privacy_level, status, request_status, request_resolved_at, created_at, modified_at \
    FROM \"transaction\"";

/// Create a new transaction in the database from a builder.
///
/// Payments are complete as soon as they are created, requests start out
/// pending.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidAmount] if the amount is not greater than zero,
/// - [Error::InvalidParticipants] if the sender and receiver are the same or either does not exist,
/// - or [Error::StoreUnavailable] if there is some other SQL error.
pub fn create_transaction(
    builder: TransactionBuilder,
    connection: &Connection,
) -> Result<Transaction, Error> {
    if builder.amount <= 0 {
        return Err(Error::InvalidAmount(format!(
            "{} cents is not a valid amount, transactions must be for more than $0.00",
            builder.amount
        )));
    }

    if builder.sender_id == builder.receiver_id {
        return Err(Error::InvalidParticipants(
            "the sender and receiver must be different users".to_owned(),
        ));
    }

    let (status, request_status) = match builder.kind {
        TransactionKind::Payment => (TransactionStatus::Complete, None),
        TransactionKind::Request => (TransactionStatus::Pending, Some(RequestStatus::Pending)),
    };
    let created_at = builder.created_at.unwrap_or_else(OffsetDateTime::now_utc);

    let transaction = connection
        .prepare(
            "INSERT INTO \"transaction\" (sender_id, receiver_id, amount, description, \
             privacy_level, status, request_status, request_resolved_at, created_at, modified_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, NULL, ?8, ?8)
             RETURNING id, sender_id, receiver_id, amount, description, privacy_level, status, \
             request_status, request_resolved_at, created_at, modified_at",
        )?
        .query_row(
            (
                builder.sender_id,
                builder.receiver_id,
                builder.amount,
                &builder.description,
                builder.privacy_level,
                status,
                request_status,
                created_at,
            ),
            map_transaction_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ) => Error::InvalidParticipants(format!(
                "user {} does not exist",
                builder.receiver_id
            )),
            error => error.into(),
        })?;

    Ok(transaction)
}

/// Retrieve a transaction, with its likes and comments, from the database by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid transaction,
/// - or [Error::StoreUnavailable] there is some other SQL error.
pub fn get_transaction(id: TransactionId, connection: &Connection) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(&format!("{SELECT_TRANSACTION} WHERE id = :id"))?
        .query_row(&[(":id", &id)], map_transaction_row)?;

    let mut transactions = [transaction];
    attach_likes_and_comments(&mut transactions, connection)?;
    let [transaction] = transactions;

    Ok(transaction)
}

/// Get every transaction in the database without likes or comments.
///
/// # Errors
/// This function will return a [Error::StoreUnavailable] if there is an SQL error.
#[cfg(test)]
pub fn get_all_transactions(connection: &Connection) -> Result<Vec<Transaction>, Error> {
    get_transactions_where(&[], &[], connection)
}

/// Get the transactions matching every SQL condition in `conditions`, without
/// likes or comments.
///
/// Conditions are expressions over the columns of the transaction table and
/// may refer to the named parameters in `params`.
///
/// # Errors
/// This function will return a [Error::StoreUnavailable] if there is an SQL error.
pub(crate) fn get_transactions_where(
    conditions: &[&str],
    params: &[(&str, &dyn ToSql)],
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let query = if conditions.is_empty() {
        SELECT_TRANSACTION.to_owned()
    } else {
        format!("{SELECT_TRANSACTION} WHERE {}", conditions.join(" AND "))
    };

    connection
        .prepare(&query)?
        .query_map(params, map_transaction_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(Error::from))
        .collect()
}

/// Fill in the likes and comments of each transaction in `transactions`.
///
/// # Errors
/// This function will return a [Error::StoreUnavailable] if there is an SQL error.
pub fn attach_likes_and_comments(
    transactions: &mut [Transaction],
    connection: &Connection,
) -> Result<(), Error> {
    for transaction in transactions {
        transaction.likes = get_likes(transaction.id, connection)?;
        transaction.comments = get_comments(transaction.id, connection)?;
    }

    Ok(())
}

/// Set the modification time of a transaction.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid transaction,
/// - or [Error::StoreUnavailable] there is some other SQL error.
pub(crate) fn touch_transaction(
    id: TransactionId,
    modified_at: OffsetDateTime,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE \"transaction\" SET modified_at = ?1 WHERE id = ?2",
        (modified_at, id),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Get the total number of transactions in the database.
///
/// # Errors
/// This function will return a [Error::StoreUnavailable] there is some SQL error.
#[cfg(test)]
pub fn count_transactions(connection: &Connection) -> Result<u32, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM \"transaction\";", [], |row| {
            row.get(0)
        })
        .map_err(|error| error.into())
}

/// Create the transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                sender_id INTEGER NOT NULL,
                receiver_id INTEGER NOT NULL,
                amount INTEGER NOT NULL CHECK(amount >= 0),
                description TEXT NOT NULL,
                privacy_level TEXT NOT NULL,
                status TEXT NOT NULL,
                request_status TEXT,
                request_resolved_at TEXT,
                created_at TEXT NOT NULL,
                modified_at TEXT NOT NULL,
                CHECK(sender_id != receiver_id),
                FOREIGN KEY(sender_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE,
                FOREIGN KEY(receiver_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_sender ON \"transaction\"(sender_id);",
        (),
    )?;
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_receiver ON \"transaction\"(receiver_id);",
        (),
    )?;

    Ok(())
}

/// Map a database row to a Transaction without likes or comments.
fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    Ok(Transaction {
        id: row.get(0)?,
        sender_id: row.get(1)?,
        receiver_id: row.get(2)?,
        amount: row.get(3)?,
        description: row.get(4)?,
        privacy_level: row.get(5)?,
        status: row.get(6)?,
        request_status: row.get(7)?,
        request_resolved_at: row.get(8)?,
        created_at: row.get(9)?,
        modified_at: row.get(10)?,
        likes: Vec::new(),
        comments: Vec::new(),
    })
}

// ============================================================================
// TESTS
// ============================================================================
