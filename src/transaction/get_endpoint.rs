//! The route handler for viewing a single transaction.

use axum::{
    Extension, Json,
    extract::State,
};

use crate::{
    Error,
    database_id::TransactionId,
    db::lock_connection,
    extract::PathParam,
    transaction::{Transaction, TransactionState, get_visible_transaction},
    user::UserID,
};

/// A route handler for getting a transaction with its likes and comments.
///
/// Transactions hidden from the viewer by their privacy level are reported as
/// not found.
pub async fn get_transaction_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    PathParam(transaction_id): PathParam<TransactionId>,
) -> Result<Json<Transaction>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_visible_transaction(transaction_id, user_id, &connection).map(Json)
}
