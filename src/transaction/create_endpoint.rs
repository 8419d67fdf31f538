//! The route handler for sending payments and requests.

use axum::{Extension, Json, extract::State, http::StatusCode};
use serde::Deserialize;

use crate::{
    Error,
    amount::{DollarAmount, format_cents},
    db::lock_connection,
    extract::JsonBody,
    transaction::{
        PrivacyLevel, Transaction, TransactionKind, TransactionState, create_transaction,
    },
    user::UserID,
};

/// The request body for creating a transaction.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransactionForm {
    /// Whether to pay the receiver or request money from them.
    pub transaction_type: TransactionKind,
    /// The other participant.
    pub receiver_id: UserID,
    /// The amount in dollars, e.g. `86.47` or `"86.47"`.
    pub amount: DollarAmount,
    /// What the transaction is for.
    #[serde(default)]
    pub description: String,
    /// Who may see the transaction, public by default.
    #[serde(default)]
    pub privacy_level: PrivacyLevel,
}

/// A route handler for creating a payment or request sent by the viewer.
pub async fn create_transaction_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    JsonBody(form): JsonBody<CreateTransactionForm>,
) -> Result<(StatusCode, Json<Transaction>), Error> {
    let amount = form.amount.to_cents()?;
    let builder = Transaction::build(user_id, form.receiver_id, amount, &form.description)
        .kind(form.transaction_type)
        .privacy_level(form.privacy_level);

    let connection = lock_connection(&state.db_connection)?;
    let transaction = create_transaction(builder, &connection)?;

    tracing::info!(
        "User {user_id} created {:?} {} for {} with user {}",
        form.transaction_type,
        transaction.id,
        format_cents(transaction.amount),
        transaction.receiver_id
    );

    Ok((StatusCode::CREATED, Json(transaction)))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::{Value, json};

    use crate::{
        endpoints,
        test_utils::{get_test_connection, get_test_server, insert_test_user, log_in},
    };

    #[tokio::test]
    async fn creates_payment_in_cents() {
        let conn = get_test_connection();
        insert_test_user("alice", &conn);
        let bob = insert_test_user("bob", &conn).id;
        let server = get_test_server(conn);
        let cookie = log_in(&server, "alice").await;

        let response = server
            .post(endpoints::TRANSACTIONS_API)
            .add_cookie(cookie)
            .json(&json!({
                "transactionType": "payment",
                "receiverId": bob,
                "amount": "86.47",
                "description": "Dinner",
            }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        assert_eq!(body["amount"], 8647);
        assert_eq!(body["status"], "complete");
        assert_eq!(body["requestStatus"], Value::Null);
        assert_eq!(body["privacyLevel"], "public");
    }

    #[tokio::test]
    async fn creates_pending_request() {
        let conn = get_test_connection();
        insert_test_user("alice", &conn);
        let bob = insert_test_user("bob", &conn).id;
        let server = get_test_server(conn);
        let cookie = log_in(&server, "alice").await;

        let response = server
            .post(endpoints::TRANSACTIONS_API)
            .add_cookie(cookie)
            .json(&json!({
                "transactionType": "request",
                "receiverId": bob,
                "amount": 200,
                "description": "Rent",
                "privacyLevel": "private",
            }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        assert_eq!(body["amount"], 20_000);
        assert_eq!(body["status"], "pending");
        assert_eq!(body["requestStatus"], "pending");
        assert_eq!(body["privacyLevel"], "private");
    }

    #[tokio::test]
    async fn rejects_negative_amount() {
        let conn = get_test_connection();
        insert_test_user("alice", &conn);
        let bob = insert_test_user("bob", &conn).id;
        let server = get_test_server(conn);
        let cookie = log_in(&server, "alice").await;

        let response = server
            .post(endpoints::TRANSACTIONS_API)
            .add_cookie(cookie)
            .json(&json!({
                "transactionType": "payment",
                "receiverId": bob,
                "amount": -5,
            }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn rejects_paying_yourself() {
        let conn = get_test_connection();
        let alice = insert_test_user("alice", &conn).id;
        let server = get_test_server(conn);
        let cookie = log_in(&server, "alice").await;

        let response = server
            .post(endpoints::TRANSACTIONS_API)
            .add_cookie(cookie)
            .json(&json!({
                "transactionType": "payment",
                "receiverId": alice,
                "amount": 10,
            }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }
}
