//! Depositing money into the user's account.

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
        MIN_DEPOSIT_AMOUNT, Transaction, TransactionState, TransactionType,
        amount_page::{AmountForm, AmountPage},
        create_transaction,
    },
};

/// Add `amount` to the account of `user_id` and record the deposit.
///
/// # Errors
/// Returns a:
/// - [Error::DepositTooSmall] if `amount` is less than [MIN_DEPOSIT_AMOUNT],
/// - [Error::NotFound] if the user has no account,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn deposit(
    user_id: UserID,
    amount: Money,
    connection: &Connection,
) -> Result<Transaction, Error> {
    if amount < MIN_DEPOSIT_AMOUNT {
        return Err(Error::DepositTooSmall(MIN_DEPOSIT_AMOUNT));
    }

    let sql_transaction =
        SqlTransaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    let account = get_account_by_user(user_id, &sql_transaction)?;
    let new_balance = account.balance + amount;
    set_balance(account.id, new_balance, &sql_transaction)?;
    let transaction = create_transaction(
        Transaction::build(account.id, amount, TransactionType::Deposit)
            .balance_after_transaction(new_balance),
        &sql_transaction,
    )?;

    sql_transaction.commit()?;

    Ok(transaction)
}

/// Display the deposit form.
pub async fn get_deposit_page(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let connection = state.connection()?;
    let account = get_account_by_user(user_id, &connection)?;

    Ok(AmountPage {
        title: "Deposit",
        active_endpoint: endpoints::DEPOSIT_VIEW,
        description: &format!("You can deposit {MIN_DEPOSIT_AMOUNT}$ or more at a time."),
        balance: account.balance,
        post_url: endpoints::DEPOSIT_API,
        submit_label: "Deposit",
        min_amount: Some(MIN_DEPOSIT_AMOUNT),
    }
    .into_html()
    .into_response())
}

/// A route handler for depositing money, redirects to the home page on success.
pub async fn deposit_endpoint(
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
        let transaction = deposit(user_id, amount, &connection)?;
        Ok((user, transaction))
    });

    let (user, transaction) = match result {
        Ok(deposited) => deposited,
        Err(error) => {
            tracing::warn!("Rejected deposit of {amount}$ for user {user_id}: {error}");
            return error.into_alert_response();
        }
    };

    tracing::info!(
        "User {user_id} deposited {amount}$, new balance {}$",
        transaction.balance_after_transaction
    );

    notify_user(Notification::Deposit, &user, amount, state.mailer.as_ref());

    let message = FlashMessage::success(format!(
        "{amount}$ is deposited to your account successfully"
    ));

    match push_flash(jar, message) {
        Ok(jar) => (
            StatusCode::SEE_OTHER,
            HxRedirect(endpoints::HOME_VIEW.to_owned()),
            jar,
        )
            .into_response(),
        Err(error) => error.into_alert_response(),
    }
}


#[cfg(test)]
mod endpoint_tests {
    use axum::{Extension, Form, extract::State, http::StatusCode};
    use axum_extra::extract::PrivateCookieJar;

    use crate::{
        account::get_account_by_user,
        endpoints,
        money::Money,
        test_utils::{
            assert_form_input, assert_form_submit_button, assert_hx_endpoint, assert_hx_redirect,
            assert_valid_html, create_test_user_with_account, get_test_connection, must_get_form,
            parse_html_document, parse_html_fragment,
        },
        transaction::{amount_page::AmountForm, state::test_state::get_test_state},
    };

    use super::{deposit_endpoint, get_deposit_page};

    fn form(amount: &str) -> Form<AmountForm> {
        Form(AmountForm {
            amount: amount.to_owned(),
        })
    }

    #[tokio::test]
    async fn page_renders_form() {
        let conn = get_test_connection();
        let (user, _) = create_test_user_with_account(&conn, "ada@example.com");
        let (state, _) = get_test_state(conn);

        let response = get_deposit_page(State(state), Extension(user.id))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        let form = must_get_form(&html);
        assert_hx_endpoint(&form, endpoints::DEPOSIT_API, "hx-post");
        assert_form_input(&form, "amount", "number");
        assert_form_submit_button(&form);
    }

    #[tokio::test]
    async fn successful_deposit_redirects_home_and_sends_email() {
        let conn = get_test_connection();
        let (user, _) = create_test_user_with_account(&conn, "ada@example.com");
        let (state, mailer) = get_test_state(conn);
        let jar = PrivateCookieJar::new(state.cookie_key.clone());

        let response =
            deposit_endpoint(State(state.clone()), Extension(user.id), jar, form("100")).await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_hx_redirect(&response, endpoints::HOME_VIEW);
        let messages = mailer.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].subject, "Deposit Message");
        assert_eq!(messages[0].to, user.email);
        let balance = get_account_by_user(user.id, &state.db_connection.lock().unwrap())
            .unwrap()
            .balance;
        assert_eq!(balance, Money::from_dollars(100));
    }

    #[tokio::test]
    async fn small_deposit_shows_alert_and_sends_nothing() {
        let conn = get_test_connection();
        let (user, _) = create_test_user_with_account(&conn, "ada@example.com");
        let (state, mailer) = get_test_state(conn);
        let jar = PrivateCookieJar::new(state.cookie_key.clone());

        let response = deposit_endpoint(State(state), Extension(user.id), jar, form("50")).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let html = parse_html_fragment(response).await;
        let text = html.root_element().text().collect::<String>();
        assert!(
            text.contains("You need to deposit at least 100.00$"),
            "unexpected alert text {text:?}"
        );
        assert!(mailer.messages().is_empty());
    }

    #[tokio::test]
    async fn invalid_amount_shows_alert() {
        let conn = get_test_connection();
        let (user, _) = create_test_user_with_account(&conn, "ada@example.com");
        let (state, _) = get_test_state(conn);
        let jar = PrivateCookieJar::new(state.cookie_key.clone());

        let response =
            deposit_endpoint(State(state), Extension(user.id), jar, form("lots")).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
