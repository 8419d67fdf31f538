//! Payments and requests between users.
//!
//! This module contains everything related to transactions:
//! - The `Transaction` model and `TransactionBuilder` for creating transactions
//! - Database functions for storing and querying transactions, likes and comments
//! - Route handlers for creating, viewing, resolving, liking and commenting

mod comment;
mod core;
mod create_endpoint;
mod get_endpoint;
mod like;
mod resolve;

use std::sync::{Arc, Mutex};

use axum::extract::FromRef;
use rusqlite::Connection;

use crate::{
    AppState, Error, contact::get_contact_ids, database_id::TransactionId,
    feed::is_visible_to, user::UserID,
};

pub use comment::{Comment, add_comment, create_comment_endpoint, create_comment_table};
pub use core::{
    PrivacyLevel, RequestStatus, Transaction, TransactionBuilder, TransactionKind,
    TransactionStatus, attach_likes_and_comments, create_transaction, create_transaction_table,
    get_transaction,
};
pub use create_endpoint::create_transaction_endpoint;
pub use get_endpoint::get_transaction_endpoint;
pub use like::{Like, add_like, create_like_endpoint, create_like_table};
pub use resolve::{resolve_request, resolve_request_endpoint};

pub(crate) use core::get_transactions_where;

#[cfg(test)]
pub use core::{count_transactions, get_all_transactions};

/// The state needed by the transaction route handlers.
#[derive(Debug, Clone)]
pub struct TransactionState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for TransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Get a transaction with its likes and comments if `viewer` is allowed to see it.
///
/// # Errors
/// Returns [Error::NotFound] if the transaction does not exist or is hidden
/// from `viewer` by its privacy level.
pub(crate) fn get_visible_transaction(
    id: TransactionId,
    viewer: UserID,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction = get_transaction(id, connection)?;
    let contacts = get_contact_ids(viewer, connection)?;

    if is_visible_to(&transaction, viewer, &contacts) {
        Ok(transaction)
    } else {
        Err(Error::NotFound)
    }
}
