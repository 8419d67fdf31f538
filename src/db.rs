//! Database initialization and connection helpers.

use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;

use crate::{
    Error,
    contact::create_contact_table,
    transaction::{create_comment_table, create_like_table, create_transaction_table},
    user::create_user_table,
};

/// Create all of the database tables for the application.
///
/// # Errors
/// This function may return a [rusqlite::Error] if something went wrong creating the tables.
pub fn initialize(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch("PRAGMA foreign_keys = ON;")?;

    let transaction = connection.unchecked_transaction()?;

    create_user_table(&transaction)?;
    create_contact_table(&transaction)?;
    create_transaction_table(&transaction)?;
    create_like_table(&transaction)?;
    create_comment_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}

/// Acquire the lock on the shared database connection.
///
/// # Errors
/// Returns [Error::StoreUnavailable] if the lock has been poisoned by a
/// thread that panicked while holding it.
pub(crate) fn lock_connection(
    connection: &Mutex<Connection>,
) -> Result<MutexGuard<'_, Connection>, Error> {
    connection.lock().map_err(|error| {
        tracing::error!("Could not acquire the database lock: {error}");
        Error::StoreUnavailable("could not acquire the database lock".to_owned())
    })
}
