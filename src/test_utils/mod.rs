#![allow(missing_docs)]

pub(crate) mod cookie;
pub(crate) mod db;
pub(crate) mod form;
pub(crate) mod html;
pub(crate) mod http;

pub(crate) use cookie::{carry_over_cookies, cookies_from_response};
pub(crate) use db::{
    TEST_PASSWORD, create_test_user, create_test_user_with_account, get_test_connection,
};
pub(crate) use form::{
    assert_form_input, assert_form_submit_button, assert_hx_endpoint, must_get_form,
};
pub(crate) use html::{assert_valid_html, parse_html_document, parse_html_fragment};
pub(crate) use http::{assert_content_type, assert_hx_redirect, assert_status_ok, get_header};
