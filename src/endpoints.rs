//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/loans/{loan_id}/pay', use [format_endpoint].

/// The root route which redirects to the home page.
pub const ROOT: &str = "/";
/// The landing page for logged in users showing their account.
pub const HOME_VIEW: &str = "/home";
/// The page for depositing money.
pub const DEPOSIT_VIEW: &str = "/transactions/deposit";
/// The page for withdrawing money.
pub const WITHDRAW_VIEW: &str = "/transactions/withdraw";
/// The page listing the user's transactions, optionally within a date range.
pub const REPORT_VIEW: &str = "/transactions/report";
/// The transaction report as a CSV file.
pub const REPORT_CSV: &str = "/transactions/report.csv";
/// The page for requesting a loan.
pub const LOAN_REQUEST_VIEW: &str = "/loans/request";
/// The page listing the user's loans.
pub const LOANS_VIEW: &str = "/loans";
/// The route for paying back a loan.
pub const PAY_LOAN: &str = "/loans/{loan_id}/pay";
/// The route for getting the registration page.
pub const REGISTER_VIEW: &str = "/register";
/// The route for getting the log in page.
pub const LOG_IN_VIEW: &str = "/log_in";
/// The route for instructions for resetting the user's password.
pub const FORGOT_PASSWORD_VIEW: &str = "/forgot_password";
/// The page to display when an internal server error occurs.
pub const INTERNAL_ERROR_VIEW: &str = "/error";
/// The route for static files.
pub const STATIC: &str = "/static";

/// The route to request a cup of coffee (experimental).
pub const COFFEE: &str = "/api/coffee";
/// The route for logging in a user.
pub const LOG_IN_API: &str = "/api/log_in";
/// The route for the client to log out the current user.
pub const LOG_OUT: &str = "/api/log_out";
/// The route to register users.
pub const USERS: &str = "/api/users";
/// The route to deposit money.
pub const DEPOSIT_API: &str = "/api/transactions/deposit";
/// The route to withdraw money.
pub const WITHDRAW_API: &str = "/api/transactions/withdraw";
/// The route to request a loan.
pub const LOANS_API: &str = "/api/loans";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/loans/{loan_id}/pay', '{loan_id}' is the parameter.
///
/// This function assumes that an endpoint path only contains ASCII characters
/// and a single parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let Some(param_start) = endpoint_path.find('{') else {
        return endpoint_path.to_string();
    };

    let param_end = endpoint_path[param_start..]
        .find('}')
        .map(|end| param_start + end + 1)
        .unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}
