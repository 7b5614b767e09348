//! The page layout shared by the deposit, withdrawal and loan request forms.

use maud::{Markup, html};
use serde::{Deserialize, Serialize};

use crate::{
    html::{FORM_CONTAINER_STYLE, amount_form, base, dollar_input_styles, format_currency},
    money::Money,
    navigation::NavBar,
};

/// The form data for a deposit, withdrawal or loan request.
#[derive(Debug, Serialize, Deserialize)]
pub struct AmountForm {
    /// The amount of money in dollars, as typed by the user.
    pub amount: String,
}

/// What to show on a page with a single amount form.
pub(super) struct AmountPage<'a> {
    pub title: &'a str,
    /// The nav bar link to highlight.
    pub active_endpoint: &'a str,
    /// One or two sentences explaining the limits that apply.
    pub description: &'a str,
    pub balance: Money,
    pub post_url: &'a str,
    pub submit_label: &'a str,
    pub min_amount: Option<Money>,
}

impl AmountPage<'_> {
    pub fn into_html(self) -> Markup {
        let nav_bar = NavBar::new(self.active_endpoint).into_html();

        let content = html! {
            (nav_bar)

            div class=(FORM_CONTAINER_STYLE)
            {
                div class="w-full space-y-4 md:space-y-6 bg-white rounded-lg shadow
                    dark:border dark:bg-gray-800 dark:border-gray-700 p-6 sm:p-8"
                {
                    h1 class="text-xl font-bold leading-tight tracking-tight md:text-2xl"
                    {
                        (self.title)
                    }

                    p class="text-sm text-gray-500 dark:text-gray-400" { (self.description) }

                    p
                    {
                        "Current balance: "
                        span class="font-semibold tabular-nums" data-balance
                        {
                            (format_currency(self.balance))
                        }
                    }

                    (amount_form(self.post_url, self.submit_label, self.min_amount))
                }
            }
        };

        base(self.title, &[dollar_input_styles()], &content)
    }
}
