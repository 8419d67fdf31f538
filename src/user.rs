//! Code for creating the user table and fetching users from the database.

use std::fmt::Display;

use rusqlite::{
    Connection, Row, ToSql,
    types::{FromSql, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};

use crate::{Error, auth::PasswordHash};

/// A newtype wrapper for integer user IDs.
///
/// This helps disambiguate user IDs from other types of IDs, leading to better compile time
/// errors, and more flexible generics that can have distinct implementations for multiple ID types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash)]
pub struct UserID(i64);

impl UserID {
    /// Create a new user ID.
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the user ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl ToSql for UserID {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        self.0.to_sql()
    }
}

impl FromSql for UserID {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        i64::column_result(value).map(UserID::new)
    }
}

/// A user of the application.
///
/// The password hash is never serialized so that users can be returned from
/// the API as-is.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// The user's ID in the application database.
    pub id: UserID,
    /// The unique name the user logs in with.
    pub username: String,
    /// The user's given name.
    pub first_name: String,
    /// The user's family name.
    pub last_name: String,
    /// The user's password hash.
    #[serde(skip)]
    pub password_hash: PasswordHash,
}

/// The details needed to insert a user with [create_user].
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    /// The unique name the user logs in with.
    pub username: &'a str,
    /// The user's given name.
    pub first_name: &'a str,
    /// The user's family name.
    pub last_name: &'a str,
    /// The hash of the user's password.
    pub password_hash: PasswordHash,
}

/// Create the user table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                password TEXT NOT NULL
                )",
        (),
    )?;

    Ok(())
}

/// Create and insert a new user into the database.
///
/// # Errors
///
/// Returns a:
/// - [Error::DuplicateUsername] if the username is already taken,
/// - or [Error::StoreUnavailable] if some other SQL error occurred.
pub fn create_user(new_user: NewUser, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare(
            "INSERT INTO user (username, first_name, last_name, password)
             VALUES (?1, ?2, ?3, ?4)
             RETURNING id, username, first_name, last_name, password",
        )?
        .query_row(
            (
                new_user.username,
                new_user.first_name,
                new_user.last_name,
                new_user.password_hash.to_string(),
            ),
            map_user_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
                },
                _,
            ) => Error::DuplicateUsername(new_user.username.to_owned()),
            error => error.into(),
        })
}

/// Get the user from the database with an ID equal to `user_id`.
///
/// # Errors
///
/// This function will return an error if:
/// - `user_id` does not belong to a registered user.
/// - there was an error trying to access the store.
pub fn get_user_by_id(user_id: UserID, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare("SELECT id, username, first_name, last_name, password FROM user WHERE id = :id")?
        .query_row(&[(":id", &user_id)], map_user_row)
        .map_err(|error| error.into())
}

/// Get the user that logs in with `username`.
///
/// # Errors
///
/// Returns [Error::NotFound] if no user has the username.
pub fn get_user_by_username(username: &str, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare(
            "SELECT id, username, first_name, last_name, password FROM user WHERE username = :username",
        )?
        .query_row(&[(":username", &username)], map_user_row)
        .map_err(|error| error.into())
}

/// Get the number of users in the database.
///
/// # Errors
///
/// Returns a [Error::StoreUnavailable] if an SQL related error occurred.
#[cfg(test)]
pub fn count_users(connection: &Connection) -> Result<usize, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM user;", [], |row| row.get(0))
        .map_err(|error| error.into())
}

/// Map a database row to a [User].
pub(crate) fn map_user_row(row: &Row) -> Result<User, rusqlite::Error> {
    let raw_password_hash: String = row.get(4)?;

    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        password_hash: PasswordHash::new_unchecked(&raw_password_hash),
    })
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;

    use crate::{
        Error,
        auth::PasswordHash,
        db::initialize,
        user::{NewUser, UserID, count_users, create_user, get_user_by_id, get_user_by_username},
    };

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    fn new_user(username: &str) -> NewUser<'_> {
        NewUser {
            username,
            first_name: "Test",
            last_name: "User",
            password_hash: PasswordHash::new_unchecked("hunter2"),
        }
    }

    #[test]
    fn create_and_get_user() {
        let conn = get_test_connection();

        let created = create_user(new_user("Katharina_Bernier"), &conn).unwrap();
        let got = get_user_by_id(created.id, &conn).unwrap();

        assert_eq!(created, got);
        assert_eq!(got.username, "Katharina_Bernier");
    }

    #[test]
    fn get_by_username() {
        let conn = get_test_connection();
        let created = create_user(new_user("Tavares_Barrows"), &conn).unwrap();

        let got = get_user_by_username("Tavares_Barrows", &conn).unwrap();

        assert_eq!(created.id, got.id);
    }

    #[test]
    fn duplicate_username_fails() {
        let conn = get_test_connection();
        create_user(new_user("Allie2"), &conn).unwrap();

        let result = create_user(new_user("Allie2"), &conn);

        assert_eq!(result, Err(Error::DuplicateUsername("Allie2".to_owned())));
        assert_eq!(count_users(&conn).unwrap(), 1);
    }

    #[test]
    fn missing_user_is_not_found() {
        let conn = get_test_connection();

        let result = get_user_by_id(UserID::new(42), &conn);

        assert_eq!(result, Err(Error::NotFound));
    }

    #[test]
    fn password_hash_is_not_serialized() {
        let conn = get_test_connection();
        let user = create_user(new_user("Dina20"), &conn).unwrap();

        let json = serde_json::to_value(&user).unwrap();

        assert_eq!(json["username"], "Dina20");
        assert_eq!(json["firstName"], "Test");
        assert!(json.get("passwordHash").is_none());
    }
}
