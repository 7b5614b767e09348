//! The emails sent to a user when their account changes.

use maud::{DOCTYPE, Markup, html};

use crate::{
    Error,
    auth::User,
    mail::{MailMessage, Mailer},
    money::Money,
};

/// The kinds of account activity a user is notified about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    /// Money was deposited into the account.
    Deposit,
    /// Money was withdrawn from the account.
    Withdrawal,
    /// The user asked for a loan.
    LoanRequest,
    /// An operator approved one of the user's loans.
    LoanApproval,
}

impl Notification {
    /// The subject line of the email.
    pub fn subject(self) -> &'static str {
        match self {
            Notification::Deposit => "Deposit Message",
            Notification::Withdrawal => "Withdrawal Message",
            Notification::LoanRequest => "Loan Request Message",
            Notification::LoanApproval => "Loan Approval Message",
        }
    }

    fn summary(self, amount: Money) -> String {
        match self {
            Notification::Deposit => {
                format!("{amount}$ has been deposited to your account successfully.")
            }
            Notification::Withdrawal => {
                format!("{amount}$ has been withdrawn from your account successfully.")
            }
            Notification::LoanRequest => format!(
                "We have received your request for a loan of {amount}$. \
                You will get another email once it has been approved."
            ),
            Notification::LoanApproval => format!(
                "Your loan request for {amount}$ has been approved. \
                The money has been added to your account balance."
            ),
        }
    }

    fn text_body(self, user: &User, amount: Money) -> String {
        format!(
            "Dear {name},\n\n{summary}\n\nBest regards,\nThe Banking team\n",
            name = user.full_name(),
            summary = self.summary(amount)
        )
    }

    fn html_body(self, user: &User, amount: Money) -> Markup {
        html! {
            (DOCTYPE)
            html lang="en" {
                head {
                    meta charset="utf-8";
                    title { (self.subject()) }
                }
                body {
                    p { "Dear " (user.full_name()) "," }
                    p { (self.summary(amount)) }
                    p { "Best regards," br; "The Banking team" }
                }
            }
        }
    }
}

/// Build the email for `notification` about `amount` addressed to `user`.
pub fn build_message(notification: Notification, user: &User, amount: Money) -> MailMessage {
    MailMessage {
        to: user.email.clone(),
        subject: notification.subject().to_owned(),
        text_body: notification.text_body(user, amount),
        html_body: notification.html_body(user, amount).into_string(),
    }
}

/// Send the email for `notification` about `amount` to `user`.
///
/// # Errors
/// Returns [Error::MailError] if `mailer` could not deliver the email.
pub fn send_email_to_user(
    notification: Notification,
    user: &User,
    amount: Money,
    mailer: &dyn Mailer,
) -> Result<(), Error> {
    mailer.send(&build_message(notification, user, amount))
}

/// Like [send_email_to_user], but a failed delivery is only logged.
///
/// The account change that triggered the email has already been committed
/// when this is called.
pub fn notify_user(notification: Notification, user: &User, amount: Money, mailer: &dyn Mailer) {
    if let Err(error) = send_email_to_user(notification, user, amount, mailer) {
        tracing::error!(
            "Could not send \"{}\" email to {}: {error}",
            notification.subject(),
            user.email
        );
    }
}
