//! The list of the user's loans and paying them back.

use axum::{
    Extension,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::PrivateCookieJar;
use maud::{Markup, html};
use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};
use time_tz::Tz;

use crate::{
    Error,
    account::{get_account_by_user, set_balance},
    auth::UserID,
    endpoints::{self, format_endpoint},
    flash::{FlashMessage, push_flash, take_flash},
    html::{
        BADGE_PENDING_STYLE, BADGE_SUCCESS_STYLE, LINK_STYLE, PAGE_CONTAINER_STYLE,
        TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base, flash_list, format_currency,
    },
    navigation::NavBar,
    timezone::format_local_timestamp,
    transaction::{
        Transaction, TransactionId, TransactionState, TransactionType, get_loans_for_account,
        get_transaction, update_loan,
    },
};

/// Pay back the approved loan `loan_id` of `user_id` from their balance.
///
/// The loan is only paid back if it is strictly smaller than the balance.
///
/// # Errors
/// Returns a:
/// - [Error::NotFound] if the loan does not exist, belongs to someone else or
///   has already been paid back,
/// - [Error::LoanNotApproved] if the loan is still waiting for approval,
/// - [Error::LoanExceedsBalance] if the balance is too small,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn pay_loan(
    user_id: UserID,
    loan_id: TransactionId,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let sql_transaction =
        SqlTransaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    let account = get_account_by_user(user_id, &sql_transaction)?;
    let loan = get_transaction(loan_id, &sql_transaction)?;

    if loan.account_id != account.id || loan.transaction_type != TransactionType::Loan {
        return Err(Error::NotFound);
    }

    if !loan.loan_approve {
        return Err(Error::LoanNotApproved);
    }

    if loan.amount >= account.balance {
        return Err(Error::LoanExceedsBalance);
    }

    let new_balance = account.balance - loan.amount;
    set_balance(account.id, new_balance, &sql_transaction)?;
    let paid_loan = update_loan(
        loan.id,
        TransactionType::LoanPaid,
        new_balance,
        true,
        &sql_transaction,
    )?;

    sql_transaction.commit()?;

    Ok(paid_loan)
}

/// A route handler for paying back a loan, always redirects to the loan list.
pub async fn pay_loan_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    Path(loan_id): Path<TransactionId>,
    jar: PrivateCookieJar,
) -> Response {
    let result = state
        .connection()
        .and_then(|connection| pay_loan(user_id, loan_id, &connection));

    let message = match result {
        Ok(loan) => {
            tracing::info!(
                "User {user_id} paid back loan {loan_id}, new balance {}$",
                loan.balance_after_transaction
            );
            FlashMessage::success(format!("Loan of {}$ paid back successfully", loan.amount))
        }
        Err(Error::LoanNotApproved) => FlashMessage::error("Loan has not been approved yet"),
        Err(error @ Error::LoanExceedsBalance) => FlashMessage::error(error.to_string()),
        Err(error) => return error.into_response(),
    };

    match push_flash(jar, message) {
        Ok(jar) => (jar, Redirect::to(endpoints::LOANS_VIEW)).into_response(),
        Err(error) => error.into_response(),
    }
}

fn loan_row(loan: &Transaction, local_timezone: &Tz) -> Markup {
    html! {
        tr class=(TABLE_ROW_STYLE) data-loan-id=(loan.id)
        {
            td class={(TABLE_CELL_STYLE) " tabular-nums"} { (format_currency(loan.amount)) }
            td class=(TABLE_CELL_STYLE) { (format_local_timestamp(loan.timestamp, local_timezone)) }
            td class=(TABLE_CELL_STYLE)
            {
                @if loan.loan_approve {
                    span class=(BADGE_SUCCESS_STYLE) { "Approved" }
                } @else {
                    span class=(BADGE_PENDING_STYLE) { "Pending" }
                }
            }
            td class=(TABLE_CELL_STYLE)
            {
                @if loan.loan_approve {
                    a href=(format_endpoint(endpoints::PAY_LOAN, loan.id)) class=(LINK_STYLE)
                    {
                        "Pay"
                    }
                }
            }
        }
    }
}

fn loans_view(loans: &[Transaction], local_timezone: &Tz, messages: &[FlashMessage]) -> Markup {
    let nav_bar = NavBar::new(endpoints::LOANS_VIEW).into_html();

    let content = html! {
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            (flash_list(messages))

            section class="w-full max-w-3xl space-y-4"
            {
                div class="flex justify-between flex-wrap items-end"
                {
                    h1 class="text-xl font-bold" { "Loans" }

                    a href=(endpoints::LOAN_REQUEST_VIEW) class=(LINK_STYLE) { "Request a loan" }
                }

                @if loans.is_empty() {
                    p data-empty-loans { "You do not have any loans." }
                } @else {
                    div class="relative overflow-x-auto shadow-md sm:rounded-lg"
                    {
                        table class="w-full text-sm text-left rtl:text-right text-gray-500 dark:text-gray-400"
                        {
                            thead class=(TABLE_HEADER_STYLE)
                            {
                                tr
                                {
                                    th scope="col" class=(TABLE_CELL_STYLE) { "Amount" }
                                    th scope="col" class=(TABLE_CELL_STYLE) { "Requested" }
                                    th scope="col" class=(TABLE_CELL_STYLE) { "Status" }
                                    th scope="col" class=(TABLE_CELL_STYLE) { "" }
                                }
                            }

                            tbody
                            {
                                @for loan in loans {
                                    (loan_row(loan, local_timezone))
                                }
                            }
                        }
                    }
                }
            }
        }
    };

    base("Loans", &[], &content)
}

/// Display the user's outstanding loans, newest first.
pub async fn get_loans_page(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    jar: PrivateCookieJar,
) -> Result<Response, Error> {
    let loans = {
        let connection = state.connection()?;
        let account = get_account_by_user(user_id, &connection)?;
        get_loans_for_account(account.id, &connection)?
    };

    let (jar, messages) = take_flash(jar);

    Ok((jar, loans_view(&loans, state.local_timezone, &messages)).into_response())
}


#[cfg(test)]
mod endpoint_tests {
    use axum::{
        Extension,
        extract::{Path, State},
        http::StatusCode,
    };
    use axum_extra::extract::PrivateCookieJar;
    use scraper::Selector;

    use crate::{
        account::set_balance,
        endpoints,
        flash::{FlashLevel, FlashMessage, push_flash, take_flash},
        money::Money,
        test_utils::{
            assert_valid_html, carry_over_cookies, cookies_from_response,
            create_test_user_with_account, get_header, get_test_connection, parse_html_document,
        },
        transaction::{
            Transaction, TransactionType, create_transaction, state::test_state::get_test_state,
        },
    };

    use super::{get_loans_page, pay_loan_endpoint};

    #[tokio::test]
    async fn page_lists_loans_with_pay_link_only_when_approved() {
        let conn = get_test_connection();
        let (user, account) = create_test_user_with_account(&conn, "ada@example.com");
        let approved = create_transaction(
            Transaction::build(account.id, Money::from_dollars(1_000), TransactionType::Loan)
                .loan_approve(true),
            &conn,
        )
        .unwrap();
        create_transaction(
            Transaction::build(account.id, Money::from_dollars(200), TransactionType::Loan),
            &conn,
        )
        .unwrap();
        let (state, _) = get_test_state(conn);
        let jar = PrivateCookieJar::new(state.cookie_key.clone());

        let response = get_loans_page(State(state), Extension(user.id), jar)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        let rows = html
            .select(&Selector::parse("tr[data-loan-id]").unwrap())
            .collect::<Vec<_>>();
        assert_eq!(rows.len(), 2);
        let pay_links = html
            .select(&Selector::parse("tr[data-loan-id] a").unwrap())
            .map(|link| link.value().attr("href").unwrap().to_owned())
            .collect::<Vec<_>>();
        assert_eq!(pay_links, vec![format!("/loans/{}/pay", approved.id)]);
    }

    #[tokio::test]
    async fn page_without_loans_says_so() {
        let conn = get_test_connection();
        let (user, _) = create_test_user_with_account(&conn, "ada@example.com");
        let (state, _) = get_test_state(conn);
        let jar = PrivateCookieJar::new(state.cookie_key.clone());

        let response = get_loans_page(State(state), Extension(user.id), jar)
            .await
            .unwrap();

        let html = parse_html_document(response).await;
        assert!(
            html.select(&Selector::parse("[data-empty-loans]").unwrap())
                .next()
                .is_some()
        );
    }

    #[tokio::test]
    async fn page_shows_flash_messages() {
        let conn = get_test_connection();
        let (user, _) = create_test_user_with_account(&conn, "ada@example.com");
        let (state, _) = get_test_state(conn);
        let jar = push_flash(
            PrivateCookieJar::new(state.cookie_key.clone()),
            FlashMessage::error("Loan has not been approved yet"),
        )
        .unwrap();
        let jar = carry_over_cookies(jar, state.cookie_key.clone());

        let response = get_loans_page(State(state), Extension(user.id), jar)
            .await
            .unwrap();

        let html = parse_html_document(response).await;
        let flash = html
            .select(&Selector::parse("[data-flash-list] [role=alert]").unwrap())
            .next()
            .expect("missing flash message");
        assert_eq!(
            flash.text().collect::<String>().trim(),
            "Loan has not been approved yet"
        );
    }

    #[tokio::test]
    async fn paying_redirects_to_loans_with_flash() {
        let conn = get_test_connection();
        let (user, account) = create_test_user_with_account(&conn, "ada@example.com");
        set_balance(account.id, Money::from_dollars(2_000), &conn).unwrap();
        let loan = create_transaction(
            Transaction::build(account.id, Money::from_dollars(1_000), TransactionType::Loan)
                .loan_approve(true),
            &conn,
        )
        .unwrap();
        let (state, _) = get_test_state(conn);
        let jar = PrivateCookieJar::new(state.cookie_key.clone());

        let response = pay_loan_endpoint(State(state), Extension(user.id), Path(loan.id), jar).await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(get_header(&response, "location"), endpoints::LOANS_VIEW);
        assert!(get_header(&response, "set-cookie").starts_with("flash="));
    }

    #[tokio::test]
    async fn pending_loan_redirects_with_error_flash() {
        let conn = get_test_connection();
        let (user, account) = create_test_user_with_account(&conn, "ada@example.com");
        let loan = create_transaction(
            Transaction::build(account.id, Money::from_dollars(1_000), TransactionType::Loan),
            &conn,
        )
        .unwrap();
        let (state, _) = get_test_state(conn);
        let key = state.cookie_key.clone();
        let jar = PrivateCookieJar::new(key.clone());

        let response = pay_loan_endpoint(State(state), Extension(user.id), Path(loan.id), jar).await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let (_, messages) = take_flash(cookies_from_response(&response, key));
        assert_eq!(
            messages,
            vec![FlashMessage {
                level: FlashLevel::Error,
                text: "Loan has not been approved yet".to_owned(),
            }]
        );
    }

    #[tokio::test]
    async fn unknown_loan_is_not_found() {
        let conn = get_test_connection();
        let (user, _) = create_test_user_with_account(&conn, "ada@example.com");
        let (state, _) = get_test_state(conn);
        let jar = PrivateCookieJar::new(state.cookie_key.clone());

        let response = pay_loan_endpoint(State(state), Extension(user.id), Path(99), jar).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
