//! Backends that deliver notification emails.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::{
        Mutex,
        atomic::{AtomicU64, Ordering},
    },
};

use time::{OffsetDateTime, format_description::well_known::Rfc2822};

use crate::{Error, auth::Email};

/// An email with a plain text and an HTML version of the same body.
#[derive(Debug, Clone, PartialEq)]
pub struct MailMessage {
    /// The recipient.
    pub to: Email,
    /// The subject line.
    pub subject: String,
    /// The body for clients that do not render HTML.
    pub text_body: String,
    /// The body as an HTML document.
    pub html_body: String,
}

/// Something that can deliver a [MailMessage].
pub trait Mailer: Send + Sync {
    /// Deliver `message`.
    ///
    /// # Errors
    /// Returns [Error::MailError] if the message could not be delivered.
    fn send(&self, message: &MailMessage) -> Result<(), Error>;
}

/// Writes emails to the log instead of delivering them.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleMailer;

impl Mailer for ConsoleMailer {
    fn send(&self, message: &MailMessage) -> Result<(), Error> {
        tracing::info!(
            to = %message.to,
            subject = %message.subject,
            "Sending email:\n{}",
            message.text_body
        );

        Ok(())
    }
}

/// Writes each email as an `.eml` file into a directory.
#[derive(Debug)]
pub struct FileMailer {
    directory: PathBuf,
    sent_count: AtomicU64,
}

const MIME_BOUNDARY: &str = "banking-alternative-boundary";

impl FileMailer {
    /// Create a mailer that writes into `directory`, creating it if needed.
    ///
    /// # Errors
    /// Returns [Error::MailError] if the directory could not be created.
    pub fn new(directory: impl AsRef<Path>) -> Result<Self, Error> {
        let directory = directory.as_ref().to_path_buf();

        fs::create_dir_all(&directory).map_err(|error| {
            Error::MailError(format!(
                "could not create mail directory {}: {error}",
                directory.display()
            ))
        })?;

        Ok(Self {
            directory,
            sent_count: AtomicU64::new(0),
        })
    }

    /// The directory emails are written to.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn render(message: &MailMessage, date: OffsetDateTime) -> Result<String, Error> {
        let date = date
            .format(&Rfc2822)
            .map_err(|error| Error::MailError(error.to_string()))?;

        Ok(format!(
            "To: {to}\r\n\
            Subject: {subject}\r\n\
            Date: {date}\r\n\
            MIME-Version: 1.0\r\n\
            Content-Type: multipart/alternative; boundary=\"{MIME_BOUNDARY}\"\r\n\
            \r\n\
            --{MIME_BOUNDARY}\r\n\
            Content-Type: text/plain; charset=utf-8\r\n\
            \r\n\
            {text}\r\n\
            --{MIME_BOUNDARY}\r\n\
            Content-Type: text/html; charset=utf-8\r\n\
            \r\n\
            {html}\r\n\
            --{MIME_BOUNDARY}--\r\n",
            to = message.to,
            subject = message.subject,
            text = message.text_body,
            html = message.html_body,
        ))
    }
}

impl Mailer for FileMailer {
    fn send(&self, message: &MailMessage) -> Result<(), Error> {
        let now = OffsetDateTime::now_utc();
        let sequence = self.sent_count.fetch_add(1, Ordering::Relaxed);
        let path = self
            .directory
            .join(format!("{}-{sequence}.eml", now.unix_timestamp_nanos()));

        fs::write(&path, Self::render(message, now)?).map_err(|error| {
            Error::MailError(format!("could not write {}: {error}", path.display()))
        })?;

        tracing::debug!("Wrote email \"{}\" to {}", message.subject, path.display());

        Ok(())
    }
}

/// Keeps sent emails in memory so that they can be inspected later.
#[derive(Debug, Default)]
pub struct MemoryMailer {
    messages: Mutex<Vec<MailMessage>>,
}

impl MemoryMailer {
    /// A copy of every message sent so far, oldest first.
    pub fn messages(&self) -> Vec<MailMessage> {
        match self.messages.lock() {
            Ok(messages) => messages.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Mailer for MemoryMailer {
    fn send(&self, message: &MailMessage) -> Result<(), Error> {
        self.messages
            .lock()
            .map_err(|_| Error::MailError("the mailbox lock is poisoned".to_owned()))?
            .push(message.clone());

        Ok(())
    }
}
