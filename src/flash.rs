//! One-shot messages that survive a redirect.
//!
//! A handler that redirects after a change pushes a message into a private
//! cookie, and the next page that renders takes the messages out again.

use axum_extra::extract::{
    PrivateCookieJar,
    cookie::{Cookie, SameSite},
};
use serde::{Deserialize, Serialize};

use crate::Error;

/// The name of the cookie holding the JSON serialized list of [FlashMessage]s.
pub(crate) const COOKIE_FLASH: &str = "flash";

/// Whether a flash message reports a success or a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashLevel {
    Success,
    Error,
}

/// A message shown once on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub level: FlashLevel,
    pub text: String,
}

impl FlashMessage {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Success,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Error,
            text: text.into(),
        }
    }
}

fn read_messages(jar: &PrivateCookieJar) -> Vec<FlashMessage> {
    let Some(cookie) = jar.get(COOKIE_FLASH) else {
        return Vec::new();
    };

    serde_json::from_str(cookie.value_trimmed()).unwrap_or_else(|error| {
        tracing::warn!("Discarding unreadable flash cookie: {error}");
        Vec::new()
    })
}

/// Add `message` to the messages waiting in `jar`.
///
/// # Errors
///
/// Returns [Error::JSONSerializationError] if the messages could not be serialized.
pub fn push_flash(jar: PrivateCookieJar, message: FlashMessage) -> Result<PrivateCookieJar, Error> {
    let mut messages = read_messages(&jar);
    messages.push(message);

    let value = serde_json::to_string(&messages)
        .map_err(|error| Error::JSONSerializationError(error.to_string()))?;

    Ok(jar.add(
        Cookie::build((COOKIE_FLASH, value))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(true),
    ))
}

/// Take the waiting messages out of `jar` and clear the cookie.
///
/// The returned jar must be included in the response for the cookie to be cleared.
pub fn take_flash(jar: PrivateCookieJar) -> (PrivateCookieJar, Vec<FlashMessage>) {
    let messages = read_messages(&jar);

    if jar.get(COOKIE_FLASH).is_none() {
        return (jar, messages);
    }

    (jar.remove(Cookie::build(COOKIE_FLASH).path("/")), messages)
}
