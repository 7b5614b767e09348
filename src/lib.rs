//! Banking is a small web app for managing a bank account.
//!
//! Users can deposit and withdraw money, request loans and pay them back,
//! and view a report of their transactions. Every change to the account
//! sends an email notification to the account holder.
//!
//! This library provides a REST API that directly serves HTML pages.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum_server::Handle;
use tokio::signal;

mod account;
mod alert;
mod app_state;
mod auth;
mod db;
mod endpoints;
mod error;
mod flash;
mod html;
mod internal_server_error;
mod logging;
mod mail;
mod money;
mod navigation;
mod not_found;
mod routing;
mod timezone;
mod transaction;

#[cfg(test)]
mod test_utils;

pub use account::{BankAccount, get_account_by_user};
pub use app_state::AppState;
pub use auth::{Email, PasswordHash, User, UserID, ValidatedPassword};
pub use auth::{get_user_by_email, get_user_by_id, update_password};
pub use db::initialize as initialize_db;
pub use error::Error;
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use mail::{
    ConsoleMailer, FileMailer, MailMessage, Mailer, MemoryMailer, Notification, send_email_to_user,
};
pub use money::Money;
pub use routing::build_router;
pub use transaction::{
    Transaction, TransactionType, approve_loan, get_pending_loans, get_transaction,
};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {error}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!("failed to install signal handler: {error}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}
