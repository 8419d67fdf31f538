//! A deterministic snapshot of users, contacts and transactions for testing.
//!
//! Resetting to the fixture always produces the same rows with the same IDs,
//! so end-to-end tests can rely on exact feed contents.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
};
use rusqlite::Connection;
use serde::Serialize;
use time::{Duration, OffsetDateTime, macros::datetime};

use crate::{
    AppState, Error,
    auth::PasswordHash,
    contact::add_contact,
    db::lock_connection,
    transaction::{
        PrivacyLevel, RequestStatus, Transaction, TransactionKind, add_comment, add_like,
        create_transaction, resolve_request,
    },
    user::{NewUser, User, create_user},
};

/// The password shared by every fixture user.
pub const FIXTURE_PASSWORD: &str = "s3cret";

/// A low bcrypt cost keeps resets fast. Fixture accounts are for testing only.
const FIXTURE_PASSWORD_COST: u32 = 4;

const FIXTURE_USERS: [(&str, &str, &str); 5] = [
    ("Heath93", "Ibrahim", "Dickens"),
    ("Katharina_Bernier", "Edgar", "Johns"),
    ("Tavares_Barrows", "Arely", "Kertzmann"),
    ("Allie2", "Kaden", "Dietrich"),
    ("Dina20", "Darrel", "Ortiz"),
];

/// Directed contacts as (owner, contact) indices into [FIXTURE_USERS].
const FIXTURE_CONTACTS: [(usize, usize); 6] = [(0, 1), (1, 0), (0, 2), (1, 3), (4, 0), (3, 4)];

const FIXTURE_TRANSACTION_COUNT: i64 = 30;

const FIXTURE_START: OffsetDateTime = datetime!(2019-12-20 09:00 UTC);

/// What [reset_to_fixture] created.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FixtureSummary {
    /// The fixture users, all with the password [FIXTURE_PASSWORD].
    pub users: Vec<User>,
    /// The number of contact relations.
    pub contact_count: usize,
    /// The number of transactions.
    pub transaction_count: usize,
}

/// Delete all data and insert the fixture snapshot.
///
/// ID sequences are reset so the fixture rows always get the same IDs.
///
/// # Errors
/// Returns an error if the password could not be hashed or if there is an SQL error.
pub fn reset_to_fixture(connection: &Connection) -> Result<FixtureSummary, Error> {
    connection.execute_batch(
        "DELETE FROM comment;
         DELETE FROM transaction_like;
         DELETE FROM \"transaction\";
         DELETE FROM contact;
         DELETE FROM user;
         DELETE FROM sqlite_sequence;",
    )?;

    let password_hash = PasswordHash::new(FIXTURE_PASSWORD, FIXTURE_PASSWORD_COST)?;
    let users = FIXTURE_USERS
        .iter()
        .map(|&(username, first_name, last_name)| {
            create_user(
                NewUser {
                    username,
                    first_name,
                    last_name,
                    password_hash: password_hash.clone(),
                },
                connection,
            )
        })
        .collect::<Result<Vec<_>, _>>()?;

    for (owner, contact) in FIXTURE_CONTACTS {
        add_contact(users[owner].id, users[contact].id, FIXTURE_START, connection)?;
    }

    for i in 0..FIXTURE_TRANSACTION_COUNT {
        insert_fixture_transaction(i, &users, connection)?;
    }

    tracing::info!(
        "Reset database to fixture with {} users and {FIXTURE_TRANSACTION_COUNT} transactions",
        users.len()
    );

    Ok(FixtureSummary {
        users,
        contact_count: FIXTURE_CONTACTS.len(),
        transaction_count: FIXTURE_TRANSACTION_COUNT as usize,
    })
}

fn insert_fixture_transaction(
    i: i64,
    users: &[User],
    connection: &Connection,
) -> Result<(), Error> {
    let user_count = users.len() as i64;
    let sender_index = i % user_count;
    let receiver_index = (sender_index + 1 + (i / user_count) % (user_count - 1)) % user_count;
    let sender = &users[sender_index as usize];
    let receiver = &users[receiver_index as usize];

    let privacy_level = match i % 4 {
        0 | 1 => PrivacyLevel::Public,
        2 => PrivacyLevel::Contacts,
        _ => PrivacyLevel::Private,
    };
    let kind = if i % 4 == 1 {
        TransactionKind::Request
    } else {
        TransactionKind::Payment
    };
    let created_at = FIXTURE_START + Duration::hours(19 * i);
    let amount = (i * 3727) % 90_000 + 500;

    let transaction = create_transaction(
        Transaction::build(
            sender.id,
            receiver.id,
            amount,
            &format!(
                "{} for {}",
                DESCRIPTIONS[i as usize % DESCRIPTIONS.len()],
                receiver.first_name
            ),
        )
        .kind(kind)
        .privacy_level(privacy_level)
        .created_at(created_at),
        connection,
    )?;

    let resolution = match i % 12 {
        1 => Some(RequestStatus::Accepted),
        5 => Some(RequestStatus::Rejected),
        _ => None,
    };
    if let Some(status) = resolution {
        resolve_request(
            transaction.id,
            receiver.id,
            status,
            created_at + Duration::days(1),
            connection,
        )?;
    }

    if i % 3 == 0 {
        add_like(transaction.id, receiver.id, created_at + Duration::hours(2), connection)?;
    }

    if i % 5 == 0 {
        add_comment(
            transaction.id,
            receiver.id,
            "Thanks!",
            created_at + Duration::hours(3),
            connection,
        )?;
        add_comment(
            transaction.id,
            sender.id,
            "Any time",
            created_at + Duration::hours(4),
            connection,
        )?;
    }

    Ok(())
}

const DESCRIPTIONS: [&str; 6] = ["Dinner", "Rent", "Concert tickets", "Groceries", "Taxi", "Coffee"];

/// The state needed to reset the database to the fixture.
#[derive(Debug, Clone)]
pub struct FixtureState {
    /// The database connection to reset.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for FixtureState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler that resets the database to the fixture.
///
/// Only routed when test data routes are enabled.
pub async fn seed_test_data_endpoint(
    State(state): State<FixtureState>,
) -> Result<Json<FixtureSummary>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    reset_to_fixture(&connection).map(Json)
}

#[cfg(test)]
mod tests {
    use crate::{
        test_utils::{get_test_connection, insert_test_user},
        transaction::{RequestStatus, TransactionStatus, get_all_transactions, get_transaction},
        user::UserID,
    };

    use super::{FIXTURE_PASSWORD, reset_to_fixture};

    #[test]
    fn fixture_replaces_existing_data() {
        let conn = get_test_connection();
        insert_test_user("leftover", &conn);

        let summary = reset_to_fixture(&conn).unwrap();

        assert_eq!(summary.users.len(), 5);
        assert_eq!(summary.users[0].id, UserID::new(1));
        assert_eq!(summary.users[0].username, "Heath93");
        assert!(summary.users[0].password_hash.verify(FIXTURE_PASSWORD).unwrap());
        assert_eq!(get_all_transactions(&conn).unwrap().len(), 30);
    }

    #[test]
    fn fixture_is_deterministic() {
        let conn = get_test_connection();

        reset_to_fixture(&conn).unwrap();
        let first: Vec<_> = (1..=30)
            .map(|id| get_transaction(id, &conn).unwrap())
            .collect();
        reset_to_fixture(&conn).unwrap();
        let second: Vec<_> = (1..=30)
            .map(|id| get_transaction(id, &conn).unwrap())
            .collect();

        assert_eq!(first, second);
    }

    #[test]
    fn fixture_contains_every_request_state() {
        let conn = get_test_connection();

        reset_to_fixture(&conn).unwrap();
        let transactions = get_all_transactions(&conn).unwrap();

        let request_statuses: Vec<_> = transactions
            .iter()
            .filter_map(|transaction| transaction.request_status)
            .collect();
        assert!(request_statuses.contains(&RequestStatus::Pending));
        assert!(request_statuses.contains(&RequestStatus::Accepted));
        assert!(request_statuses.contains(&RequestStatus::Rejected));
        assert!(transactions.iter().all(|transaction| {
            transaction.request_status.is_some() || transaction.status == TransactionStatus::Complete
        }));
    }

    #[test]
    fn fixture_transactions_have_distinct_participants() {
        let conn = get_test_connection();

        reset_to_fixture(&conn).unwrap();

        assert!(
            get_all_transactions(&conn)
                .unwrap()
                .iter()
                .all(|transaction| transaction.sender_id != transaction.receiver_id)
        );
    }
}
