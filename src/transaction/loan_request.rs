//! Asking the bank for a loan.
//!
//! A loan request does not change the balance, the money is only credited
//! once an operator approves it with the `approve_loan` tool.

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
    account::get_account_by_user,
    auth::{UserID, get_user_by_id},
    endpoints,
    flash::{FlashMessage, push_flash},
    mail::{Notification, notify_user},
    money::Money,
    transaction::{
        MAX_APPROVED_LOANS, Transaction, TransactionState, TransactionType,
        amount_page::{AmountForm, AmountPage},
        count_approved_loans, create_transaction,
    },
};

/// Record a pending loan of `amount` for the account of `user_id`.
///
/// # Errors
/// Returns a:
/// - [Error::LoanLimitReached] if the account already has [MAX_APPROVED_LOANS]
///   approved loans,
/// - [Error::NotFound] if the user has no account,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn request_loan(
    user_id: UserID,
    amount: Money,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let sql_transaction =
        SqlTransaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    let account = get_account_by_user(user_id, &sql_transaction)?;

    if count_approved_loans(account.id, &sql_transaction)? >= MAX_APPROVED_LOANS {
        return Err(Error::LoanLimitReached);
    }

    let loan = create_transaction(
        Transaction::build(account.id, amount, TransactionType::Loan)
            .balance_after_transaction(account.balance),
        &sql_transaction,
    )?;

    sql_transaction.commit()?;

    Ok(loan)
}

/// Display the loan request form.
pub async fn get_loan_request_page(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let connection = state.connection()?;
    let account = get_account_by_user(user_id, &connection)?;

    Ok(AmountPage {
        title: "Request a Loan",
        active_endpoint: endpoints::LOANS_VIEW,
        description: &format!(
            "The loan is added to your balance once it is approved. \
            You can have at most {MAX_APPROVED_LOANS} approved loans at a time."
        ),
        balance: account.balance,
        post_url: endpoints::LOANS_API,
        submit_label: "Request Loan",
        min_amount: None,
    }
    .into_html()
    .into_response())
}

/// A route handler for requesting a loan, redirects to the home page on success.
pub async fn loan_request_endpoint(
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
        let loan = request_loan(user_id, amount, &connection)?;
        Ok((user, loan))
    });

    let (user, loan) = match result {
        Ok(requested) => requested,
        Err(error) => {
            tracing::warn!("Rejected loan request of {amount}$ for user {user_id}: {error}");
            return error.into_alert_response();
        }
    };

    tracing::info!("User {user_id} requested loan {} of {amount}$", loan.id);

    notify_user(Notification::LoanRequest, &user, amount, state.mailer.as_ref());

    match push_flash(
        jar,
        FlashMessage::success(format!("Loan Request for {amount}$ successfully")),
    ) {
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
        endpoints,
        money::Money,
        test_utils::{
            assert_hx_endpoint, assert_hx_redirect, assert_valid_html,
            create_test_user_with_account, get_test_connection, must_get_form,
            parse_html_document, parse_html_fragment,
        },
        transaction::{
            Transaction, TransactionType, amount_page::AmountForm, create_transaction,
            state::test_state::get_test_state,
        },
    };

    use super::{get_loan_request_page, loan_request_endpoint};

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

        let response = get_loan_request_page(State(state), Extension(user.id))
            .await
            .unwrap();

        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        assert_hx_endpoint(&must_get_form(&html), endpoints::LOANS_API, "hx-post");
    }

    #[tokio::test]
    async fn successful_request_redirects_home_and_sends_email() {
        let conn = get_test_connection();
        let (user, _) = create_test_user_with_account(&conn, "ada@example.com");
        let (state, mailer) = get_test_state(conn);
        let jar = PrivateCookieJar::new(state.cookie_key.clone());

        let response =
            loan_request_endpoint(State(state), Extension(user.id), jar, form("2500")).await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_hx_redirect(&response, endpoints::HOME_VIEW);
        let messages = mailer.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].subject, "Loan Request Message");
    }

    #[tokio::test]
    async fn limit_reached_shows_alert() {
        let conn = get_test_connection();
        let (user, account) = create_test_user_with_account(&conn, "ada@example.com");
        for _ in 0..3 {
            create_transaction(
                Transaction::build(account.id, Money::from_dollars(10), TransactionType::Loan)
                    .loan_approve(true),
                &conn,
            )
            .unwrap();
        }
        let (state, mailer) = get_test_state(conn);
        let jar = PrivateCookieJar::new(state.cookie_key.clone());

        let response =
            loan_request_endpoint(State(state), Extension(user.id), jar, form("100")).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let html = parse_html_fragment(response).await;
        let text = html.root_element().text().collect::<String>();
        assert!(text.contains("You Have crossed you loan limits"));
        assert!(mailer.messages().is_empty());
    }
}
