//! Alert system for displaying error messages to users.
//!
//! Alerts are returned as HTML fragments that HTMX swaps into the
//! `#alert-container` element of the base page.

use maud::{Markup, html};

/// An alert message with a heading and a longer explanation.
#[derive(Debug, Clone, PartialEq)]
pub enum Alert {
    /// Tell the user that an operation failed and how to fix it.
    Error {
        /// The heading of the alert.
        message: String,
        /// Extra information shown under the heading.
        details: String,
    },
}

impl Alert {
    /// Render the alert as HTML.
    pub fn into_html(self) -> Markup {
        let Alert::Error { message, details } = self;
        let container_style = "p-4 mb-4 text-sm text-red-800 rounded-lg bg-red-50 \
            dark:bg-gray-800 dark:text-red-400";

        html! {
            div
                class=(container_style)
                role="alert"
                onclick="this.remove()"
            {
                span class="font-medium" { (message) }

                @if !details.is_empty() {
                    p { (details) }
                }
            }
        }
    }
}
