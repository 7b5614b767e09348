//! The state shared by the deposit, withdrawal, loan and report handlers.

use std::sync::{Arc, Mutex, MutexGuard};

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use rusqlite::Connection;
use time_tz::Tz;

use crate::{AppState, Error, mail::Mailer};

/// The state needed by the transaction route handlers.
#[derive(Clone)]
pub struct TransactionState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The database connection for managing accounts and transactions.
    pub db_connection: Arc<Mutex<Connection>>,
    /// Where notification emails are sent.
    pub mailer: Arc<dyn Mailer>,
    /// The timezone used to show timestamps and to filter the report by date.
    pub local_timezone: &'static Tz,
}

impl TransactionState {
    /// Lock the database connection.
    ///
    /// # Errors
    /// Returns [Error::DatabaseLockError] if the lock is poisoned.
    pub fn connection(&self) -> Result<MutexGuard<'_, Connection>, Error> {
        self.db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)
    }
}

impl FromRef<AppState> for TransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            db_connection: state.db_connection.clone(),
            mailer: state.mailer.clone(),
            local_timezone: state.local_timezone,
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<TransactionState> for Key {
    fn from_ref(state: &TransactionState) -> Self {
        state.cookie_key.clone()
    }
}
