//! The home page showing the user's account and what they can do with it.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use maud::{Markup, html};
use rusqlite::Connection;
use time_tz::Tz;

use crate::{
    AppState, Error,
    account::{BankAccount, get_account_by_user},
    auth::{User, UserID, get_user_by_id},
    endpoints,
    flash::{FlashMessage, take_flash},
    html::{LINK_STYLE, PAGE_CONTAINER_STYLE, base, flash_list, format_currency},
    navigation::NavBar,
    timezone::format_local_timestamp,
};

/// The state needed for the home page.
#[derive(Clone)]
pub struct HomePageState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    pub local_timezone: &'static Tz,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for HomePageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            local_timezone: state.local_timezone,
            db_connection: state.db_connection.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<HomePageState> for Key {
    fn from_ref(state: &HomePageState) -> Self {
        state.cookie_key.clone()
    }
}

const ACTION_CARD_STYLE: &str = "block p-6 bg-white border border-gray-200 rounded-lg shadow-sm \
    hover:bg-gray-100 dark:bg-gray-800 dark:border-gray-700 dark:hover:bg-gray-700";

fn action_card(url: &str, title: &str, description: &str) -> Markup {
    html! {
        a href=(url) class=(ACTION_CARD_STYLE)
        {
            h2 class="mb-2 text-lg font-bold tracking-tight text-gray-900 dark:text-white"
            {
                (title)
            }
            p class="text-sm text-gray-700 dark:text-gray-400" { (description) }
        }
    }
}

fn home_view(
    user: &User,
    account: &BankAccount,
    opened_at: &str,
    messages: &[FlashMessage],
) -> Markup {
    let nav_bar = NavBar::new(endpoints::HOME_VIEW).into_html();

    let content = html! {
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            (flash_list(messages))

            section class="w-full max-w-3xl space-y-6"
            {
                header
                {
                    h1 class="text-2xl font-bold" { "Hello, " (user.first_name) "!" }
                    p class="text-sm text-gray-500 dark:text-gray-400"
                    {
                        "Account number "
                        span data-account-number { (account.account_number) }
                        " · opened " (opened_at)
                    }
                }

                div class="p-6 rounded-lg bg-blue-50 dark:bg-gray-800"
                {
                    p class="text-sm uppercase text-gray-500 dark:text-gray-400" { "Balance" }
                    p class="text-4xl font-bold tabular-nums" data-balance
                    {
                        (format_currency(account.balance))
                    }
                }

                div class="grid gap-4 sm:grid-cols-2"
                {
                    (action_card(endpoints::DEPOSIT_VIEW, "Deposit", "Add money to your account."))
                    (action_card(endpoints::WITHDRAW_VIEW, "Withdraw", "Take money out of your account."))
                    (action_card(endpoints::LOAN_REQUEST_VIEW, "Request a Loan", "Ask the bank for a loan."))
                    (action_card(endpoints::LOANS_VIEW, "Loans", "See your loans and pay them back."))
                }

                p
                {
                    a href=(endpoints::REPORT_VIEW) class=(LINK_STYLE) { "View transaction report" }
                }
            }
        }
    };

    base("Home", &[], &content)
}

/// Display the user's account balance and links to the banking actions.
pub async fn get_home_page(
    State(state): State<HomePageState>,
    Extension(user_id): Extension<UserID>,
    jar: PrivateCookieJar,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let user = get_user_by_id(user_id, &connection)
        .inspect_err(|error| tracing::error!("could not get user {user_id}: {error}"))?;
    let account = get_account_by_user(user_id, &connection)
        .inspect_err(|error| tracing::error!("could not get account for user {user_id}: {error}"))?;

    let opened_at = format_local_timestamp(account.created_at, state.local_timezone);
    let (jar, messages) = take_flash(jar);

    Ok((jar, home_view(&user, &account, &opened_at, &messages)).into_response())
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, extract::State, http::StatusCode};
    use axum_extra::extract::PrivateCookieJar;
    use rust_decimal_macros::dec;
    use scraper::Selector;

    use crate::{
        account::set_balance,
        app_state::create_cookie_key,
        auth::UserID,
        flash::{FlashMessage, push_flash},
        money::Money,
        test_utils::{
            assert_valid_html, carry_over_cookies, create_test_user,
            create_test_user_with_account, get_test_connection, parse_html_document,
        },
        timezone::get_timezone,
    };

    use super::{HomePageState, get_home_page};

    fn get_state(connection: rusqlite::Connection) -> HomePageState {
        HomePageState {
            cookie_key: create_cookie_key("home"),
            local_timezone: get_timezone("Etc/UTC").unwrap(),
            db_connection: Arc::new(Mutex::new(connection)),
        }
    }

    fn select_text(html: &scraper::Html, selector: &str) -> String {
        html.select(&Selector::parse(selector).unwrap())
            .next()
            .unwrap_or_else(|| panic!("no element matches {selector}"))
            .text()
            .collect::<String>()
            .trim()
            .to_owned()
    }

    #[tokio::test]
    async fn shows_balance_and_account_number() {
        let connection = get_test_connection();
        let (user, account) = create_test_user_with_account(&connection, "ada@example.com");
        set_balance(account.id, Money::new(dec!(512.5)), &connection).unwrap();
        let state = get_state(connection);
        let jar = PrivateCookieJar::new(state.cookie_key.clone());

        let response = get_home_page(State(state), Extension(user.id), jar)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        assert_eq!(select_text(&html, "[data-balance]"), "$512.50");
        assert_eq!(
            select_text(&html, "[data-account-number]"),
            account.account_number.to_string()
        );
    }

    #[tokio::test]
    async fn shows_and_clears_flash_messages() {
        let connection = get_test_connection();
        let (user, _) = create_test_user_with_account(&connection, "ada@example.com");
        let state = get_state(connection);
        let jar = PrivateCookieJar::new(state.cookie_key.clone());
        let jar = push_flash(jar, FlashMessage::success("100.00$ is deposited")).unwrap();
        let jar = carry_over_cookies(jar, state.cookie_key.clone());

        let response = get_home_page(State(state), Extension(user.id), jar)
            .await
            .unwrap();

        let set_cookie = response
            .headers()
            .get_all("set-cookie")
            .iter()
            .map(|value| value.to_str().unwrap().to_owned())
            .collect::<Vec<_>>();
        assert!(
            set_cookie.iter().any(|cookie| cookie.starts_with("flash=")),
            "flash cookie was not cleared: {set_cookie:?}"
        );
        let html = parse_html_document(response).await;
        assert_eq!(
            select_text(&html, "[data-flash-list] div[role=alert]"),
            "100.00$ is deposited"
        );
    }

    #[tokio::test]
    async fn user_without_account_gets_not_found() {
        let connection = get_test_connection();
        let user = create_test_user(&connection, "ada@example.com");
        let state = get_state(connection);
        let jar = PrivateCookieJar::new(state.cookie_key.clone());

        let result = get_home_page(State(state), Extension(user.id), jar).await;

        assert_eq!(result.err(), Some(crate::Error::NotFound));
    }

    #[tokio::test]
    async fn unknown_user_gets_not_found() {
        let state = get_state(get_test_connection());
        let jar = PrivateCookieJar::new(state.cookie_key.clone());

        let result = get_home_page(State(state), Extension(UserID::new(99)), jar).await;

        assert_eq!(result.err(), Some(crate::Error::NotFound));
    }
}
