use axum::{
    http::{
        HeaderMap, HeaderValue,
        header::{COOKIE, SET_COOKIE},
    },
    response::{IntoResponse, Response},
};
use axum_extra::extract::{
    PrivateCookieJar,
    cookie::{Cookie, Key},
};
use time::Duration;

/// Turn the cookies set on `jar` into the jar the browser would send with its next request.
pub(crate) fn carry_over_cookies(jar: PrivateCookieJar, key: Key) -> PrivateCookieJar {
    cookies_from_response(&jar.into_response(), key)
}

/// The jar the browser would send after receiving `response`.
///
/// Cookies that the response removes are left out.
pub(crate) fn cookies_from_response(response: &Response, key: Key) -> PrivateCookieJar {
    let cookie_header = response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .map(|value| Cookie::parse(value.to_str().unwrap().to_owned()).unwrap())
        .filter(|cookie| cookie.max_age() != Some(Duration::ZERO))
        .map(|cookie| format!("{}={}", cookie.name(), cookie.value()))
        .collect::<Vec<_>>()
        .join("; ");

    let mut headers = HeaderMap::new();
    headers.insert(COOKIE, HeaderValue::from_str(&cookie_header).unwrap());

    PrivateCookieJar::from_headers(&headers, key)
}
