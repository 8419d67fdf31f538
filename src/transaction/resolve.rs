//! Accepting and rejecting requests for money.

use axum::{
    Extension, Json,
    extract::State,
};
use rusqlite::Connection;
use serde::Deserialize;
use time::OffsetDateTime;

use crate::{
    Error,
    database_id::TransactionId,
    db::lock_connection,
    extract::{JsonBody, PathParam},
    transaction::{RequestStatus, Transaction, TransactionState, TransactionStatus, get_transaction},
    user::UserID,
};

/// Accept or reject a pending request on behalf of `user_id`.
///
/// Accepting completes the transaction, rejecting marks it incomplete. Both
/// record `resolved_at` as the resolution and modification time.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidRequestStatus] if `target` is pending or the transaction is a payment,
/// - [Error::NotFound] if `id` does not refer to a valid transaction,
/// - [Error::Forbidden] if `user_id` is not the receiver of the request,
/// - [Error::StaleState] if the request was already accepted or rejected,
/// - or [Error::StoreUnavailable] if there is some other SQL error.
pub fn resolve_request(
    id: TransactionId,
    user_id: UserID,
    target: RequestStatus,
    resolved_at: OffsetDateTime,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let status = match target {
        RequestStatus::Accepted => TransactionStatus::Complete,
        RequestStatus::Rejected => TransactionStatus::Incomplete,
        RequestStatus::Pending => return Err(Error::InvalidRequestStatus),
    };

    let transaction = get_transaction(id, connection)?;

    let Some(current) = transaction.request_status else {
        return Err(Error::InvalidRequestStatus);
    };

    if transaction.receiver_id != user_id {
        return Err(Error::Forbidden);
    }

    if current != RequestStatus::Pending {
        return Err(Error::StaleState);
    }

    // Only update while still pending so concurrent resolutions cannot both win.
    let rows_affected = connection.execute(
        "UPDATE \"transaction\"
         SET status = ?1, request_status = ?2, request_resolved_at = ?3, modified_at = ?3
         WHERE id = ?4 AND request_status = 'pending'",
        (status, target, resolved_at, id),
    )?;

    if rows_affected == 0 {
        return Err(Error::StaleState);
    }

    get_transaction(id, connection)
}

/// The request body for resolving a request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveRequestForm {
    /// Either `accepted` or `rejected`.
    pub request_status: RequestStatus,
}

/// A route handler for accepting or rejecting a request.
pub async fn resolve_request_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    PathParam(transaction_id): PathParam<TransactionId>,
    JsonBody(form): JsonBody<ResolveRequestForm>,
) -> Result<Json<Transaction>, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let transaction = resolve_request(
        transaction_id,
        user_id,
        form.request_status,
        OffsetDateTime::now_utc(),
        &connection,
    )?;

    tracing::info!(
        "User {user_id} {} request {transaction_id}",
        form.request_status
    );

    Ok(Json(transaction))
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;
    use time::macros::datetime;

    use crate::{
        Error,
        test_utils::{get_test_connection, insert_test_user},
        transaction::{
            RequestStatus, Transaction, TransactionKind, TransactionStatus, create_transaction,
        },
        user::UserID,
    };

    use super::resolve_request;

    fn setup_request() -> (Connection, Transaction, UserID, UserID) {
        let conn = get_test_connection();
        let alice = insert_test_user("alice", &conn).id;
        let bob = insert_test_user("bob", &conn).id;
        let request = create_transaction(
            Transaction::build(alice, bob, 2500, "Concert tickets")
                .kind(TransactionKind::Request)
                .created_at(datetime!(2020-01-01 09:00 UTC)),
            &conn,
        )
        .unwrap();

        (conn, request, alice, bob)
    }

    #[test]
    fn accept_completes_request() {
        let (conn, request, _, bob) = setup_request();

        let resolved = resolve_request(
            request.id,
            bob,
            RequestStatus::Accepted,
            datetime!(2020-01-02 09:00 UTC),
            &conn,
        )
        .unwrap();

        assert_eq!(resolved.status, TransactionStatus::Complete);
        assert_eq!(resolved.request_status, Some(RequestStatus::Accepted));
        assert_eq!(resolved.request_resolved_at, Some(datetime!(2020-01-02 09:00 UTC)));
        assert_eq!(resolved.modified_at, datetime!(2020-01-02 09:00 UTC));
        assert_eq!(resolved.created_at, request.created_at);
    }

    #[test]
    fn reject_marks_request_incomplete() {
        let (conn, request, _, bob) = setup_request();

        let resolved = resolve_request(
            request.id,
            bob,
            RequestStatus::Rejected,
            datetime!(2020-01-02 09:00 UTC),
            &conn,
        )
        .unwrap();

        assert_eq!(resolved.status, TransactionStatus::Incomplete);
        assert_eq!(resolved.request_status, Some(RequestStatus::Rejected));
        assert!(resolved.request_resolved_at.is_some());
    }

    #[test]
    fn second_resolution_is_stale() {
        let (conn, request, _, bob) = setup_request();
        resolve_request(
            request.id,
            bob,
            RequestStatus::Accepted,
            datetime!(2020-01-02 09:00 UTC),
            &conn,
        )
        .unwrap();

        let result = resolve_request(
            request.id,
            bob,
            RequestStatus::Rejected,
            datetime!(2020-01-03 09:00 UTC),
            &conn,
        );

        assert_eq!(result, Err(Error::StaleState));
    }

    #[test]
    fn only_receiver_can_resolve() {
        let (conn, request, alice, _) = setup_request();

        let result = resolve_request(
            request.id,
            alice,
            RequestStatus::Accepted,
            datetime!(2020-01-02 09:00 UTC),
            &conn,
        );

        assert_eq!(result, Err(Error::Forbidden));
    }

    #[test]
    fn pending_target_is_invalid() {
        let (conn, request, _, bob) = setup_request();

        let result = resolve_request(
            request.id,
            bob,
            RequestStatus::Pending,
            datetime!(2020-01-02 09:00 UTC),
            &conn,
        );

        assert_eq!(result, Err(Error::InvalidRequestStatus));
    }

    #[test]
    fn payments_cannot_be_resolved() {
        let conn = get_test_connection();
        let alice = insert_test_user("alice", &conn).id;
        let bob = insert_test_user("bob", &conn).id;
        let payment = create_transaction(Transaction::build(alice, bob, 100, ""), &conn).unwrap();

        let result = resolve_request(
            payment.id,
            bob,
            RequestStatus::Accepted,
            datetime!(2020-01-02 09:00 UTC),
            &conn,
        );

        assert_eq!(result, Err(Error::InvalidRequestStatus));
    }

    #[test]
    fn missing_request_is_not_found() {
        let conn = get_test_connection();
        let bob = insert_test_user("bob", &conn).id;

        let result = resolve_request(
            7,
            bob,
            RequestStatus::Accepted,
            datetime!(2020-01-02 09:00 UTC),
            &conn,
        );

        assert_eq!(result, Err(Error::NotFound));
    }
}
