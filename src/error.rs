//! Defines the app level error type and conversions to rendered HTML pages and alerts.
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{
    alert::Alert, internal_server_error::InternalServerError, money::Money,
    not_found::NotFoundError,
};

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The user provided an invalid combination of email and password.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// The auth token cookie is missing from the cookie jar in the request.
    #[error("no auth token in the cookie jar")]
    CookieMissing,

    /// The auth token expired before the request was made.
    #[error("the auth token has expired")]
    TokenExpired,

    /// The user provided a password that is too easy to guess.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    /// When communicating with the application client this error should be
    /// replaced with a general error type indicating an internal server error.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// The string is not a valid email address.
    #[error("{0} is not a valid email address")]
    InvalidEmail(String),

    /// A user with the email address already exists.
    #[error("the email address is already registered")]
    DuplicateEmail,

    /// A first or last name was empty.
    #[error("{0} cannot be empty")]
    EmptyName(&'static str),

    /// The amount entered in a form could not be used as an amount of money.
    ///
    /// The string explains what is wrong with the amount.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// The deposit is smaller than the minimum deposit amount.
    #[error("you need to deposit at least {0}$")]
    DepositTooSmall(Money),

    /// The withdrawal is smaller than the minimum withdrawal amount.
    #[error("you need to withdraw at least {0}$")]
    WithdrawalTooSmall(Money),

    /// The withdrawal is larger than the maximum withdrawal amount.
    #[error("you can withdraw at most {0}$")]
    WithdrawalTooLarge(Money),

    /// The account does not hold enough money for the withdrawal.
    #[error("you have {available}$ in your account, you cannot withdraw {requested}$")]
    InsufficientFunds {
        /// The amount the user asked for.
        requested: Money,
        /// The balance of the account.
        available: Money,
    },

    /// The account already has the maximum number of approved loans.
    #[error("You Have crossed you loan limits")]
    LoanLimitReached,

    /// Tried to pay back a loan that has not been approved.
    #[error("the loan has not been approved yet")]
    LoanNotApproved,

    /// Tried to approve a loan that has already been approved.
    #[error("the loan {0} has already been approved")]
    LoanAlreadyApproved(i64),

    /// The loan is larger than the balance of the account paying it back.
    #[error("Loan amount is greater than account balance")]
    LoanExceedsBalance,

    /// The transaction exists but is not an outstanding loan.
    #[error("the transaction {0} is not an outstanding loan")]
    NotALoan(i64),

    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the parameters
    /// (e.g., ID) are correct and that the resource has been created.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// An error occurred while serializing a struct as JSON
    #[error("could not serialize as JSON: {0}")]
    JSONSerializationError(String),

    /// An error occurred while writing the transaction report as CSV.
    #[error("could not write CSV: {0}")]
    CsvError(String),

    /// The notification email could not be delivered.
    #[error("could not send email: {0}")]
    MailError(String),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.ends_with("user.email") =>
            {
                Error::DuplicateEmail
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::NotFound => NotFoundError.into_response(),
            Error::InvalidTimezoneError(timezone) => InternalServerError {
                description: "Invalid Timezone Settings",
                fix: &format!(
                    "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to valid, canonical timezone string"
                ),
            }
            .into_response(),
            Error::DatabaseLockError => InternalServerError::default().into_response(),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                InternalServerError::default().into_response()
            }
        }
    }
}

impl Error {
    /// Convert the error into an HTTP response with an HTML alert.
    pub fn into_alert_response(self) -> Response {
        let (status_code, alert) = match self {
            Error::InvalidTimezoneError(timezone) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Alert::Error {
                    message: "Invalid Timezone Settings".to_owned(),
                    details: format!(
                        "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to valid, canonical timezone string"
                    ),
                },
            ),
            Error::InvalidAmount(reason) => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Invalid amount".to_owned(),
                    details: reason,
                },
            ),
            error @ (Error::DepositTooSmall(_)
            | Error::WithdrawalTooSmall(_)
            | Error::WithdrawalTooLarge(_)) => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Invalid amount".to_owned(),
                    details: capitalize(&error.to_string()),
                },
            ),
            error @ Error::InsufficientFunds { .. } => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Insufficient balance".to_owned(),
                    details: capitalize(&error.to_string()),
                },
            ),
            Error::LoanLimitReached => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Loan limit reached".to_owned(),
                    details: Error::LoanLimitReached.to_string(),
                },
            ),
            Error::NotFound => (
                StatusCode::NOT_FOUND,
                Alert::Error {
                    message: "Not found".to_owned(),
                    details: "Your bank account could not be found. \
                    Try logging out and logging in again."
                        .to_owned(),
                },
            ),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Alert::Error {
                    message: "Something went wrong".to_owned(),
                    details:
                        "An unexpected error occurred, check the server logs for more details."
                            .to_owned(),
                },
            ),
        };

        (status_code, alert.into_html()).into_response()
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();

    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
