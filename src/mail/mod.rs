//! Email notifications for account activity.

mod mailer;
mod notification;

pub use mailer::{ConsoleMailer, FileMailer, MailMessage, Mailer, MemoryMailer};
pub use notification::{Notification, notify_user, send_email_to_user};
