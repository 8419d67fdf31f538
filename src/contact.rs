//! A user's address book: the directed contact relation used by the contacts feed.

use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
    http::StatusCode,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    AppState, Error,
    db::lock_connection,
    extract::JsonBody,
    user::{User, UserID, map_user_row},
};

/// Records that `user_id` has `contact_user_id` in their address book.
///
/// The relation is directed, `contact_user_id` does not automatically have
/// `user_id` as a contact.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    /// The owner of the address book.
    pub user_id: UserID,
    /// The user in the address book.
    pub contact_user_id: UserID,
    /// When the contact was added.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Create the contact table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_contact_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS contact (
                user_id INTEGER NOT NULL,
                contact_user_id INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                PRIMARY KEY(user_id, contact_user_id),
                CHECK(user_id != contact_user_id),
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE,
                FOREIGN KEY(contact_user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    Ok(())
}

/// Add `contact_user_id` to the address book of `user_id`.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidParticipants] if the users are the same or either user does not exist,
/// - [Error::DuplicateContact] if the contact already exists,
/// - or [Error::StoreUnavailable] if there is some other SQL error.
pub fn add_contact(
    user_id: UserID,
    contact_user_id: UserID,
    created_at: OffsetDateTime,
    connection: &Connection,
) -> Result<Contact, Error> {
    if user_id == contact_user_id {
        return Err(Error::InvalidParticipants(
            "a user cannot add themselves as a contact".to_owned(),
        ));
    }

    connection
        .execute(
            "INSERT INTO contact (user_id, contact_user_id, created_at) VALUES (?1, ?2, ?3)",
            (user_id, contact_user_id, created_at),
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code:
                        rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                        | rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
                },
                _,
            ) => Error::DuplicateContact(contact_user_id),
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ) => Error::InvalidParticipants(format!("user {contact_user_id} does not exist")),
            error => error.into(),
        })?;

    Ok(Contact {
        user_id,
        contact_user_id,
        created_at,
    })
}

/// Get the IDs of every user in the address book of `user_id`.
///
/// # Errors
/// Returns [Error::StoreUnavailable] if there is an SQL error.
pub fn get_contact_ids(user_id: UserID, connection: &Connection) -> Result<HashSet<UserID>, Error> {
    connection
        .prepare("SELECT contact_user_id FROM contact WHERE user_id = :user_id")?
        .query_map(&[(":user_id", &user_id)], |row| row.get(0))?
        .map(|maybe_id| maybe_id.map_err(Error::from))
        .collect()
}

/// Get the users in the address book of `user_id`, ordered by username.
///
/// # Errors
/// Returns [Error::StoreUnavailable] if there is an SQL error.
pub fn get_contacts(user_id: UserID, connection: &Connection) -> Result<Vec<User>, Error> {
    connection
        .prepare(
            "SELECT user.id, user.username, user.first_name, user.last_name, user.password
             FROM contact INNER JOIN user ON contact.contact_user_id = user.id
             WHERE contact.user_id = :user_id
             ORDER BY user.username ASC",
        )?
        .query_map(&[(":user_id", &user_id)], map_user_row)?
        .map(|maybe_user| maybe_user.map_err(Error::from))
        .collect()
}

/// The state needed to list and add contacts.
#[derive(Debug, Clone)]
pub struct ContactState {
    /// The database connection for managing contacts.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ContactState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The response body listing the viewer's contacts.
#[derive(Debug, Serialize)]
pub struct ContactsResponse {
    /// The users in the viewer's address book.
    pub contacts: Vec<User>,
}

/// The request body for adding a contact.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewContactForm {
    /// The user to add to the viewer's address book.
    pub contact_user_id: UserID,
}

/// A route handler listing the viewer's contacts.
pub async fn get_contacts_endpoint(
    State(state): State<ContactState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<ContactsResponse>, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let contacts = get_contacts(user_id, &connection)?;

    Ok(Json(ContactsResponse { contacts }))
}

/// A route handler adding a user to the viewer's contacts.
pub async fn create_contact_endpoint(
    State(state): State<ContactState>,
    Extension(user_id): Extension<UserID>,
    JsonBody(form): JsonBody<NewContactForm>,
) -> Result<(StatusCode, Json<Contact>), Error> {
    let connection = lock_connection(&state.db_connection)?;
    let contact = add_contact(
        user_id,
        form.contact_user_id,
        OffsetDateTime::now_utc(),
        &connection,
    )?;

    tracing::info!("User {user_id} added contact {}", contact.contact_user_id);

    Ok((StatusCode::CREATED, Json(contact)))
}
