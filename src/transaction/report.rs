//! The transaction report, optionally limited to a range of dates, as HTML or CSV.

use axum::{
    Extension,
    extract::{Query, State},
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::{Date, format_description::BorrowedFormatItem, macros::format_description};
use time_tz::Tz;

use crate::{
    Error,
    account::get_account_by_user,
    auth::UserID,
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, LINK_STYLE,
        PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base,
        format_currency,
    },
    money::Money,
    navigation::NavBar,
    timezone::{format_local_timestamp, local_date},
    transaction::{Transaction, TransactionState, get_transactions_for_account},
};

const DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");

/// The query string of the report pages.
///
/// Dates are in the format YYYY-MM-DD. Empty values are treated as missing.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// An inclusive range of local dates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DateRange {
    pub start: Date,
    pub end: Date,
}

impl DateRange {
    fn contains(&self, date: Date) -> bool {
        self.start <= date && date <= self.end
    }
}

/// The transactions to show and the figure to summarize them with.
#[derive(Debug, PartialEq)]
pub struct Report {
    /// The transactions of the user's account, oldest first.
    pub transactions: Vec<Transaction>,
    /// The sum of the amounts in the range, or the current balance when
    /// the report is not filtered.
    pub summary: Money,
    /// The dates the report was filtered by, if any.
    pub range: Option<DateRange>,
    /// Explains why the dates in the query were ignored.
    pub date_error: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn parse_date(text: &str) -> Result<Date, String> {
    Date::parse(text, DATE_FORMAT).map_err(|error| {
        tracing::warn!("Ignoring invalid report date {text:?}: {error}");
        format!("\"{text}\" is not a valid date, showing all transactions instead.")
    })
}

/// Work out which dates to filter by.
///
/// A range is only used when both dates are given and valid.
fn parse_range(query: &ReportQuery) -> Result<Option<DateRange>, String> {
    let start = non_empty(&query.start_date).map(parse_date).transpose()?;
    let end = non_empty(&query.end_date).map(parse_date).transpose()?;

    Ok(match (start, end) {
        (Some(start), Some(end)) => Some(DateRange { start, end }),
        _ => None,
    })
}

/// Build the report of the account of `user_id`.
///
/// Transactions are matched against the range by their date in `local_timezone`.
///
/// # Errors
/// Returns a:
/// - [Error::NotFound] if the user has no account,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn build_report(
    user_id: UserID,
    query: &ReportQuery,
    local_timezone: &Tz,
    connection: &Connection,
) -> Result<Report, Error> {
    let account = get_account_by_user(user_id, connection)?;
    let transactions = get_transactions_for_account(account.id, connection)?;

    let (range, date_error) = match parse_range(query) {
        Ok(range) => (range, None),
        Err(message) => (None, Some(message)),
    };

    let report = match range {
        Some(range) => {
            let transactions = transactions
                .into_iter()
                .filter(|transaction| {
                    range.contains(local_date(transaction.timestamp, local_timezone))
                })
                .collect::<Vec<_>>();
            let summary = transactions.iter().map(|transaction| transaction.amount).sum();

            Report {
                transactions,
                summary,
                range: Some(range),
                date_error,
            }
        }
        None => Report {
            transactions,
            summary: account.balance,
            range: None,
            date_error,
        },
    };

    Ok(report)
}

fn format_date(date: Date) -> String {
    date.format(DATE_FORMAT).unwrap_or_else(|_| date.to_string())
}

fn csv_url(query: &ReportQuery) -> String {
    match serde_urlencoded::to_string(query) {
        Ok(query_string) if !query_string.is_empty() => {
            format!("{}?{query_string}", endpoints::REPORT_CSV)
        }
        _ => endpoints::REPORT_CSV.to_owned(),
    }
}

fn date_input(name: &str, label: &str, value: Option<&str>) -> Markup {
    html! {
        div
        {
            label for=(name) class=(FORM_LABEL_STYLE) { (label) }
            input type="date" name=(name) id=(name) value=[value] class=(FORM_TEXT_INPUT_STYLE);
        }
    }
}

fn report_view(report: &Report, query: &ReportQuery, local_timezone: &Tz) -> Markup {
    let nav_bar = NavBar::new(endpoints::REPORT_VIEW).into_html();
    let summary_label = match report.range {
        Some(range) => format!(
            "Total from {} to {}",
            format_date(range.start),
            format_date(range.end)
        ),
        None => "Current balance".to_owned(),
    };

    let content = html! {
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="w-full max-w-4xl space-y-6"
            {
                h1 class="text-xl font-bold" { "Transaction Report" }

                form
                    method="get"
                    action=(endpoints::REPORT_VIEW)
                    class="grid gap-4 sm:grid-cols-3 items-end"
                {
                    (date_input("start_date", "From", non_empty(&query.start_date)))
                    (date_input("end_date", "To", non_empty(&query.end_date)))

                    button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Filter" }
                }

                @if let Some(message) = &report.date_error {
                    p class="text-sm text-red-600 dark:text-red-400" data-date-error { (message) }
                }

                div class="flex justify-between flex-wrap items-end"
                {
                    p
                    {
                        span class="text-sm uppercase text-gray-500 dark:text-gray-400"
                        {
                            (summary_label)
                        }
                        br;
                        span class="text-2xl font-bold tabular-nums" data-summary
                        {
                            (format_currency(report.summary))
                        }
                    }

                    a href=(csv_url(query)) class=(LINK_STYLE) download { "Download CSV" }
                }

                @if report.transactions.is_empty() {
                    p data-empty-report { "No transactions to show." }
                } @else {
                    div class="relative overflow-x-auto shadow-md sm:rounded-lg"
                    {
                        table class="w-full text-sm text-left rtl:text-right text-gray-500 dark:text-gray-400"
                        {
                            thead class=(TABLE_HEADER_STYLE)
                            {
                                tr
                                {
                                    th scope="col" class=(TABLE_CELL_STYLE) { "Date" }
                                    th scope="col" class=(TABLE_CELL_STYLE) { "Type" }
                                    th scope="col" class=(TABLE_CELL_STYLE) { "Amount" }
                                    th scope="col" class=(TABLE_CELL_STYLE) { "Balance After" }
                                }
                            }

                            tbody
                            {
                                @for transaction in &report.transactions {
                                    tr class=(TABLE_ROW_STYLE) data-transaction-id=(transaction.id)
                                    {
                                        td class=(TABLE_CELL_STYLE)
                                        {
                                            (format_local_timestamp(transaction.timestamp, local_timezone))
                                        }
                                        td class=(TABLE_CELL_STYLE) { (transaction.transaction_type) }
                                        td class={(TABLE_CELL_STYLE) " tabular-nums"}
                                        {
                                            (format_currency(transaction.amount))
                                        }
                                        td class={(TABLE_CELL_STYLE) " tabular-nums"}
                                        {
                                            (format_currency(transaction.balance_after_transaction))
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    };

    base("Report", &[], &content)
}

/// Display the transaction report.
pub async fn get_report_page(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<ReportQuery>,
) -> Result<Response, Error> {
    let report = build_report(
        user_id,
        &query,
        state.local_timezone,
        &*state.connection()?,
    )?;

    Ok(report_view(&report, &query, state.local_timezone).into_response())
}

/// Column names of the CSV report, in the order of [CsvRow]'s fields.
const CSV_HEADER: [&str; 6] = [
    "id",
    "date",
    "type",
    "amount",
    "balance_after_transaction",
    "loan_approved",
];

/// One line of the CSV report.
#[derive(Debug, Serialize)]
struct CsvRow {
    id: i64,
    date: String,
    #[serde(rename = "type")]
    transaction_type: String,
    amount: String,
    balance_after_transaction: String,
    loan_approved: bool,
}

fn write_csv(transactions: &[Transaction], local_timezone: &Tz) -> Result<Vec<u8>, Error> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    // Written up front so that an empty report still has column names.
    writer
        .write_record(CSV_HEADER)
        .map_err(|error| Error::CsvError(error.to_string()))?;

    for transaction in transactions {
        writer
            .serialize(CsvRow {
                id: transaction.id,
                date: format_local_timestamp(transaction.timestamp, local_timezone),
                transaction_type: transaction.transaction_type.to_string(),
                amount: transaction.amount.to_string(),
                balance_after_transaction: transaction.balance_after_transaction.to_string(),
                loan_approved: transaction.loan_approve,
            })
            .map_err(|error| Error::CsvError(error.to_string()))?;
    }

    writer
        .into_inner()
        .map_err(|error| Error::CsvError(error.to_string()))
}

/// Download the transaction report as a CSV file.
pub async fn get_report_csv(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<ReportQuery>,
) -> Result<Response, Error> {
    let report = build_report(
        user_id,
        &query,
        state.local_timezone,
        &*state.connection()?,
    )?;

    let csv = write_csv(&report.transactions, state.local_timezone)?;

    Ok((
        [
            (CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                CONTENT_DISPOSITION,
                "attachment; filename=\"transactions.csv\"",
            ),
        ],
        csv,
    )
        .into_response())
}

#[cfg(test)]
mod build_report_tests {
    use rusqlite::Connection;
    use time::{OffsetDateTime, macros::date, macros::datetime};

    use crate::{
        Error,
        account::set_balance,
        auth::UserID,
        money::Money,
        test_utils::{create_test_user, create_test_user_with_account, get_test_connection},
        timezone::get_timezone,
        transaction::{Transaction, TransactionType, create_transaction},
    };

    use super::{DateRange, ReportQuery, build_report};

    fn query(start_date: &str, end_date: &str) -> ReportQuery {
        ReportQuery {
            start_date: Some(start_date.to_owned()),
            end_date: Some(end_date.to_owned()),
        }
    }

    fn insert(
        conn: &Connection,
        account_id: i64,
        dollars: i64,
        transaction_type: TransactionType,
        timestamp: OffsetDateTime,
    ) -> Transaction {
        create_transaction(
            Transaction::build(account_id, Money::from_dollars(dollars), transaction_type)
                .timestamp(timestamp),
            conn,
        )
        .unwrap()
    }

    /// A user with a balance of $900 and four transactions in October 2025.
    fn set_up() -> (Connection, UserID, Vec<Transaction>) {
        let conn = get_test_connection();
        let (user, account) = create_test_user_with_account(&conn, "ada@example.com");
        let (_, other_account) = create_test_user_with_account(&conn, "bob@example.com");
        set_balance(account.id, Money::from_dollars(900), &conn).unwrap();
        let transactions = vec![
            insert(&conn, account.id, 1_000, TransactionType::Deposit, datetime!(2025-10-01 09:00 UTC)),
            insert(&conn, account.id, 600, TransactionType::Withdrawal, datetime!(2025-10-03 09:00 UTC)),
            insert(&conn, account.id, 500, TransactionType::Loan, datetime!(2025-10-05 09:00 UTC)),
            insert(&conn, account.id, 500, TransactionType::Deposit, datetime!(2025-10-09 09:00 UTC)),
        ];
        insert(&conn, other_account.id, 7_000, TransactionType::Deposit, datetime!(2025-10-03 09:00 UTC));

        (conn, user.id, transactions)
    }

    #[test]
    fn without_dates_lists_everything_and_shows_balance() {
        let (conn, user_id, transactions) = set_up();
        let utc = get_timezone("Etc/UTC").unwrap();

        let report = build_report(user_id, &ReportQuery::default(), utc, &conn).unwrap();

        assert_eq!(report.transactions, transactions);
        assert_eq!(report.summary, Money::from_dollars(900));
        assert_eq!(report.range, None);
        assert_eq!(report.date_error, None);
    }

    #[test]
    fn range_is_inclusive_and_sums_amounts() {
        let (conn, user_id, transactions) = set_up();
        let utc = get_timezone("Etc/UTC").unwrap();

        let report = build_report(user_id, &query("2025-10-03", "2025-10-05"), utc, &conn).unwrap();

        assert_eq!(report.transactions, transactions[1..3].to_vec());
        assert_eq!(report.summary, Money::from_dollars(1_100));
        assert_eq!(
            report.range,
            Some(DateRange {
                start: date!(2025 - 10 - 03),
                end: date!(2025 - 10 - 05),
            })
        );
    }

    #[test]
    fn only_one_date_is_not_filtered() {
        let (conn, user_id, transactions) = set_up();
        let utc = get_timezone("Etc/UTC").unwrap();
        let query = ReportQuery {
            start_date: Some("2025-10-03".to_owned()),
            end_date: Some(String::new()),
        };

        let report = build_report(user_id, &query, utc, &conn).unwrap();

        assert_eq!(report.transactions, transactions);
        assert_eq!(report.summary, Money::from_dollars(900));
        assert_eq!(report.date_error, None);
    }

    #[test]
    fn invalid_date_falls_back_to_unfiltered_report_with_note() {
        let (conn, user_id, transactions) = set_up();
        let utc = get_timezone("Etc/UTC").unwrap();

        let report = build_report(user_id, &query("2025-13-40", "2025-10-05"), utc, &conn).unwrap();

        assert_eq!(report.transactions, transactions);
        assert_eq!(report.summary, Money::from_dollars(900));
        assert!(report.date_error.unwrap().contains("2025-13-40"));
    }

    #[test]
    fn start_after_end_is_empty() {
        let (conn, user_id, _) = set_up();
        let utc = get_timezone("Etc/UTC").unwrap();

        let report = build_report(user_id, &query("2025-10-09", "2025-10-01"), utc, &conn).unwrap();

        assert!(report.transactions.is_empty());
        assert_eq!(report.summary, Money::ZERO);
    }

    #[test]
    fn dates_are_matched_in_local_timezone() {
        let conn = get_test_connection();
        let (user, account) = create_test_user_with_account(&conn, "ada@example.com");
        // 00:30 on the 2nd of October in Auckland (UTC+13).
        let late_evening_utc = insert(
            &conn,
            account.id,
            100,
            TransactionType::Deposit,
            datetime!(2025-10-01 11:30 UTC),
        );
        let auckland = get_timezone("Pacific/Auckland").unwrap();
        let utc = get_timezone("Etc/UTC").unwrap();
        let query = query("2025-10-02", "2025-10-02");

        let local_report = build_report(user.id, &query, auckland, &conn).unwrap();
        let utc_report = build_report(user.id, &query, utc, &conn).unwrap();

        assert_eq!(local_report.transactions, vec![late_evening_utc]);
        assert!(utc_report.transactions.is_empty());
    }

    #[test]
    fn user_without_account_is_not_found() {
        let conn = get_test_connection();
        let user = create_test_user(&conn, "ada@example.com");
        let utc = get_timezone("Etc/UTC").unwrap();

        let result = build_report(user.id, &ReportQuery::default(), utc, &conn);

        assert_eq!(result, Err(Error::NotFound));
    }
}

#[cfg(test)]
mod endpoint_tests {
    use axum::{
        Extension,
        extract::{Query, State},
        http::StatusCode,
    };
    use scraper::Selector;
    use time::macros::datetime;

    use crate::{
        endpoints,
        money::Money,
        test_utils::{
            assert_content_type, assert_valid_html, create_test_user_with_account,
            get_test_connection, parse_html_document,
        },
        transaction::{
            Transaction, TransactionType, create_transaction, state::test_state::get_test_state,
        },
    };

    use super::{ReportQuery, get_report_csv, get_report_page};

    #[tokio::test]
    async fn page_shows_rows_summary_and_csv_link() {
        let conn = get_test_connection();
        let (user, account) = create_test_user_with_account(&conn, "ada@example.com");
        create_transaction(
            Transaction::build(account.id, Money::from_dollars(250), TransactionType::Deposit)
                .timestamp(datetime!(2025-10-04 10:00 UTC)),
            &conn,
        )
        .unwrap();
        let (state, _) = get_test_state(conn);
        let query = ReportQuery {
            start_date: Some("2025-10-01".to_owned()),
            end_date: Some("2025-10-31".to_owned()),
        };

        let response = get_report_page(State(state), Extension(user.id), Query(query))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        assert_eq!(
            html.select(&Selector::parse("tr[data-transaction-id]").unwrap())
                .count(),
            1
        );
        let summary = html
            .select(&Selector::parse("[data-summary]").unwrap())
            .next()
            .unwrap();
        assert_eq!(summary.text().collect::<String>().trim(), "$250.00");
        let csv_link = html
            .select(&Selector::parse("a[download]").unwrap())
            .next()
            .unwrap();
        assert_eq!(
            csv_link.value().attr("href"),
            Some(format!("{}?start_date=2025-10-01&end_date=2025-10-31", endpoints::REPORT_CSV).as_str())
        );
    }

    #[tokio::test]
    async fn invalid_date_shows_note() {
        let conn = get_test_connection();
        let (user, _) = create_test_user_with_account(&conn, "ada@example.com");
        let (state, _) = get_test_state(conn);
        let query = ReportQuery {
            start_date: Some("yesterday".to_owned()),
            end_date: Some("2025-10-31".to_owned()),
        };

        let response = get_report_page(State(state), Extension(user.id), Query(query))
            .await
            .unwrap();

        let html = parse_html_document(response).await;
        assert!(
            html.select(&Selector::parse("[data-date-error]").unwrap())
                .next()
                .is_some()
        );
    }

    #[tokio::test]
    async fn csv_has_header_and_one_line_per_transaction() {
        let conn = get_test_connection();
        let (user, account) = create_test_user_with_account(&conn, "ada@example.com");
        for dollars in [100, 200] {
            create_transaction(
                Transaction::build(account.id, Money::from_dollars(dollars), TransactionType::Deposit)
                    .timestamp(datetime!(2025-10-04 10:00 UTC)),
                &conn,
            )
            .unwrap();
        }
        let (state, _) = get_test_state(conn);

        let response = get_report_csv(
            State(state),
            Extension(user.id),
            Query(ReportQuery::default()),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_content_type(&response, "text/csv; charset=utf-8");
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        let lines = text.lines().collect::<Vec<_>>();
        assert_eq!(
            lines[0],
            "id,date,type,amount,balance_after_transaction,loan_approved"
        );
        assert_eq!(lines.len(), 3);
        assert!(lines[1].ends_with(",2025-10-04 10:00,Deposit,100.00,0.00,false"), "{}", lines[1]);
    }

    #[tokio::test]
    async fn csv_for_empty_range_still_has_header() {
        let conn = get_test_connection();
        let (user, account) = create_test_user_with_account(&conn, "ada@example.com");
        create_transaction(
            Transaction::build(account.id, Money::from_dollars(100), TransactionType::Deposit)
                .timestamp(datetime!(2025-10-04 10:00 UTC)),
            &conn,
        )
        .unwrap();
        let (state, _) = get_test_state(conn);
        let query = ReportQuery {
            start_date: Some("2024-01-01".to_owned()),
            end_date: Some("2024-01-31".to_owned()),
        };

        let response = get_report_csv(State(state), Extension(user.id), Query(query))
            .await
            .unwrap();

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert_eq!(
            text,
            "id,date,type,amount,balance_after_transaction,loan_approved\n"
        );
    }
}
