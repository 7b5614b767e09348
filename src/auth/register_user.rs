//! The registration page for opening a new bank account.
use std::sync::{Arc, Mutex};

use axum::{
    Form,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};
use serde::{Deserialize, Serialize};
use time::Duration;

use crate::{
    AppState, Error,
    account::{BankAccount, create_account_for_user},
    auth::{
        Email, NewUser, PasswordHash, User, ValidatedPassword, create_user, set_auth_cookie,
    },
    endpoints,
    flash::{FlashMessage, push_flash},
    html::{
        BUTTON_PRIMARY_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, LINK_STYLE, base,
        loading_spinner, log_in_register, password_input,
    },
    internal_server_error::get_internal_server_error_redirect,
};

/// The minimum number of characters the password should have to be considered valid on the client side (server-side validation is done on top of this validation).
const PASSWORD_INPUT_MIN_LENGTH: u8 = 14;

const DUPLICATE_EMAIL_ERROR_MSG: &str = "An account with this email address already exists.";

pub fn confirm_password_input(min_length: u8, error_message: Option<&str>) -> Markup {
    html! {
        div
        {
            label
                for="confirm-password"
                class=(FORM_LABEL_STYLE)
            {
                "Confirm Password"
            }

            input
                type="password"
                name="confirm_password"
                id="confirm-password"
                placeholder="••••••••"
                class=(FORM_TEXT_INPUT_STYLE)
                required
                minlength=(min_length)
                autofocus[error_message.is_some()]
            ;

            @if let Some(error_message) = error_message
            {
                p class="text-red-500 text-base" { (error_message) }
            }
        }

    }
}

fn text_input(
    name: &str,
    label: &str,
    type_: &str,
    value: &str,
    error_message: Option<&str>,
) -> Markup {
    html! {
        div
        {
            label for=(name) class=(FORM_LABEL_STYLE) { (label) }

            input
                type=(type_)
                name=(name)
                id=(name)
                class=(FORM_TEXT_INPUT_STYLE)
                required
                value=(value)
                autofocus[error_message.is_some()];

            @if let Some(error_message) = error_message
            {
                p class="text-red-500 text-base" { (error_message) }
            }
        }
    }
}

/// Error messages shown next to the fields of the registration form.
#[derive(Debug, Default)]
struct FormErrors<'a> {
    email: Option<&'a str>,
    name: Option<&'a str>,
    password: Option<&'a str>,
    confirm_password: Option<&'a str>,
}

fn registration_form(form: &RegisterForm, errors: FormErrors) -> Markup {
    html! {
        form
            hx-post=(endpoints::USERS)
            hx-indicator="#indicator"
            hx-disabled-elt="#submit-button"
            class="space-y-4 md:space-y-6"
        {
            (text_input("email", "Email", "email", &form.email, errors.email))

            div class="grid grid-cols-2 gap-4"
            {
                (text_input("first_name", "First Name", "text", &form.first_name, None))
                (text_input("last_name", "Last Name", "text", &form.last_name, None))
            }

            @if let Some(error_message) = errors.name
            {
                p class="text-red-500 text-base" { (error_message) }
            }

            (password_input(&form.password, PASSWORD_INPUT_MIN_LENGTH, errors.password))
            (confirm_password_input(PASSWORD_INPUT_MIN_LENGTH, errors.confirm_password))

            button
                type="submit" id="submit-button" tabindex="0"
                class=(BUTTON_PRIMARY_STYLE)
            {
                span class="inline htmx-indicator" id="indicator"
                {
                    (loading_spinner())
                }
                "Open Account"
            }

            p class="text-sm font-light text-gray-500 dark:text-gray-400"
            {
                "Already have an account? "

                a href=(endpoints::LOG_IN_VIEW) tabindex="0" class=(LINK_STYLE)
                {
                  "Log in here"
                }
            }
        }
    }
}

/// Display the registration page.
pub async fn get_register_page() -> Response {
    let registration_form = registration_form(&RegisterForm::default(), FormErrors::default());
    let content = log_in_register("Open an Account", &registration_form);
    base("Register", &[], &content).into_response()
}

/// The state needed for creating a new user.
#[derive(Debug, Clone)]
pub struct RegistrationState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for RegistrationState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            db_connection: state.db_connection.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<RegistrationState> for Key {
    fn from_ref(state: &RegistrationState) -> Self {
        state.cookie_key.clone()
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RegisterForm {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub confirm_password: String,
}

/// Insert the user and open their bank account in one SQL transaction.
fn create_user_and_account(
    new_user: NewUser,
    connection: &Connection,
) -> Result<(User, BankAccount), Error> {
    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    let user = create_user(new_user, &transaction)?;
    let account = create_account_for_user(user.id, &transaction)?;

    transaction.commit()?;

    Ok((user, account))
}

fn validate_name(name: &str, field: &'static str) -> Result<String, Error> {
    let name = name.trim();

    if name.is_empty() {
        return Err(Error::EmptyName(field));
    }

    Ok(name.to_owned())
}

pub async fn register_user(
    State(state): State<RegistrationState>,
    jar: PrivateCookieJar,
    Form(user_data): Form<RegisterForm>,
) -> Response {
    let email = match Email::new(&user_data.email) {
        Ok(email) => email,
        Err(error) => {
            let message = error.to_string();
            let errors = FormErrors {
                email: Some(&message),
                ..Default::default()
            };
            return registration_form(&user_data, errors).into_response();
        }
    };

    let names = validate_name(&user_data.first_name, "First name").and_then(|first_name| {
        validate_name(&user_data.last_name, "Last name").map(|last_name| (first_name, last_name))
    });
    let (first_name, last_name) = match names {
        Ok(names) => names,
        Err(error) => {
            let message = error.to_string();
            let errors = FormErrors {
                name: Some(&message),
                ..Default::default()
            };
            return registration_form(&user_data, errors).into_response();
        }
    };

    let validated_password = match ValidatedPassword::new(&user_data.password) {
        Ok(password) => password,
        Err(error) => {
            let message = error.to_string();
            let errors = FormErrors {
                password: Some(&message),
                ..Default::default()
            };
            return registration_form(&user_data, errors).into_response();
        }
    };

    if user_data.password != user_data.confirm_password {
        let errors = FormErrors {
            confirm_password: Some("Passwords do not match"),
            ..Default::default()
        };
        return registration_form(&user_data, errors).into_response();
    }

    let password_hash = match PasswordHash::new(validated_password, PasswordHash::DEFAULT_COST) {
        Ok(hash) => hash,
        Err(e) => {
            tracing::error!("an error occurred while hashing a password: {e}");

            return get_internal_server_error_redirect();
        }
    };

    let new_user = NewUser {
        email,
        first_name,
        last_name,
        password_hash,
    };

    let result = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)
        .and_then(|connection| create_user_and_account(new_user, &connection));

    let (user, account) = match result {
        Ok(created) => created,
        Err(Error::DuplicateEmail) => {
            let errors = FormErrors {
                email: Some(DUPLICATE_EMAIL_ERROR_MSG),
                ..Default::default()
            };
            return registration_form(&user_data, errors).into_response();
        }
        Err(error) => {
            tracing::error!("An unhandled error occurred while inserting a new user: {error}");

            return get_internal_server_error_redirect();
        }
    };

    tracing::info!(
        "Registered user {} with account number {}",
        user.id,
        account.account_number
    );

    let welcome = FlashMessage::success(format!(
        "Welcome, {}! Your account number is {}.",
        user.first_name, account.account_number
    ));
    let jar = set_auth_cookie(jar, user.id, state.cookie_duration)
        .and_then(|jar| push_flash(jar, welcome));

    match jar {
        Ok(jar) => (
            StatusCode::SEE_OTHER,
            HxRedirect(endpoints::HOME_VIEW.to_owned()),
            jar,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("An error occurred while setting the auth cookie: {e}");

            get_internal_server_error_redirect()
        }
    }
}
