//! Withdrawing money from the user's account.

use axum::{
    Extension, Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::PrivateCookieJar;
use axum_htmx::HxRedirect;
use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};

use crate::{
    Error,
    account::{get_account_by_user, set_balance},
    auth::{UserID, get_user_by_id},
    endpoints,
    flash::{FlashMessage, push_flash},
    mail::{Notification, notify_user},
    money::Money,
    transaction::{
        MAX_WITHDRAW_AMOUNT, MIN_WITHDRAW_AMOUNT, Transaction, TransactionState, TransactionType,
        amount_page::{AmountForm, AmountPage},
        create_transaction,
    },
};

/// Take `amount` out of the account of `user_id` and record the withdrawal.
///
/// The limits are checked in order: minimum, maximum, then the balance.
///
/// # Errors
/// Returns a:
/// - [Error::WithdrawalTooSmall] if `amount` is less than [MIN_WITHDRAW_AMOUNT],
/// - [Error::WithdrawalTooLarge] if `amount` is more than [MAX_WITHDRAW_AMOUNT],
/// - [Error::InsufficientFunds] if `amount` is more than the account balance,
/// - [Error::NotFound] if the user has no account,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn withdraw(
    user_id: UserID,
    amount: Money,
    connection: &Connection,
) -> Result<Transaction, Error> {
    if amount < MIN_WITHDRAW_AMOUNT {
        return Err(Error::WithdrawalTooSmall(MIN_WITHDRAW_AMOUNT));
    }

    if amount > MAX_WITHDRAW_AMOUNT {
        return Err(Error::WithdrawalTooLarge(MAX_WITHDRAW_AMOUNT));
    }

    let sql_transaction =
        SqlTransaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    let account = get_account_by_user(user_id, &sql_transaction)?;

    if amount > account.balance {
        return Err(Error::InsufficientFunds {
            requested: amount,
            available: account.balance,
        });
    }

    let new_balance = account.balance - amount;
    set_balance(account.id, new_balance, &sql_transaction)?;
    let transaction = create_transaction(
        Transaction::build(account.id, amount, TransactionType::Withdrawal)
            .balance_after_transaction(new_balance),
        &sql_transaction,
    )?;

    sql_transaction.commit()?;

    Ok(transaction)
}

/// Display the withdrawal form.
pub async fn get_withdraw_page(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let connection = state.connection()?;
    let account = get_account_by_user(user_id, &connection)?;

    Ok(AmountPage {
        title: "Withdraw",
        active_endpoint: endpoints::WITHDRAW_VIEW,
        description: &format!(
            "You can withdraw between {MIN_WITHDRAW_AMOUNT}$ and {MAX_WITHDRAW_AMOUNT}$ at a time."
        ),
        balance: account.balance,
        post_url: endpoints::WITHDRAW_API,
        submit_label: "Withdraw",
        min_amount: Some(MIN_WITHDRAW_AMOUNT),
    }
    .into_html()
    .into_response())
}

/// A route handler for withdrawing money, redirects to the home page on success.
pub async fn withdraw_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    jar: PrivateCookieJar,
    Form(form): Form<AmountForm>,
) -> Response {
    let amount = match Money::parse_positive(&form.amount) {
        Ok(amount) => amount,
        Err(error) => return error.into_alert_response(),
    };

    let result = state.connection().and_then(|connection| {
        let user = get_user_by_id(user_id, &connection)?;
        let transaction = withdraw(user_id, amount, &connection)?;
        Ok((user, transaction))
    });

    let (user, transaction) = match result {
        Ok(withdrawn) => withdrawn,
        Err(error) => {
            tracing::warn!("Rejected withdrawal of {amount}$ for user {user_id}: {error}");
            return error.into_alert_response();
        }
    };

    tracing::info!(
        "User {user_id} withdrew {amount}$, new balance {}$",
        transaction.balance_after_transaction
    );

    notify_user(Notification::Withdrawal, &user, amount, state.mailer.as_ref());

    match push_flash(jar, FlashMessage::success(format!("{amount}$ withdrawn successfully"))) {
        Ok(jar) => (
            StatusCode::SEE_OTHER,
            HxRedirect(endpoints::HOME_VIEW.to_owned()),
            jar,
        )
            .into_response(),
        Err(error) => error.into_alert_response(),
    }
}
