//! Defines the core data models and database queries for transactions.

use std::fmt::Display;

use rusqlite::{
    Connection, Row,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, account::AccountId, money::Money};

pub type TransactionId = i64;

/// The smallest amount that can be deposited in one go.
pub const MIN_DEPOSIT_AMOUNT: Money = Money::from_whole_dollars(100);
/// The smallest amount that can be withdrawn in one go.
pub const MIN_WITHDRAW_AMOUNT: Money = Money::from_whole_dollars(500);
/// The largest amount that can be withdrawn in one go.
pub const MAX_WITHDRAW_AMOUNT: Money = Money::from_whole_dollars(20_000);
/// The number of approved, unpaid loans after which new loan requests are refused.
pub const MAX_APPROVED_LOANS: i64 = 3;

// ============================================================================
// MODELS
// ============================================================================

/// What kind of account activity a transaction records.
///
/// Stored in the database as an integer code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    Deposit = 1,
    Withdrawal = 2,
    Loan = 3,
    LoanPaid = 4,
}

impl TransactionType {
    /// The integer stored in the database for this type.
    pub fn code(self) -> i64 {
        self as i64
    }

    /// Get the type for a database code.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(TransactionType::Deposit),
            2 => Some(TransactionType::Withdrawal),
            3 => Some(TransactionType::Loan),
            4 => Some(TransactionType::LoanPaid),
            _ => None,
        }
    }
}

impl Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            TransactionType::Deposit => "Deposit",
            TransactionType::Withdrawal => "Withdrawal",
            TransactionType::Loan => "Loan",
            TransactionType::LoanPaid => "Loan Paid",
        };

        f.write_str(label)
    }
}

impl ToSql for TransactionType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.code()))
    }
}

impl FromSql for TransactionType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let code = value.as_i64()?;

        TransactionType::from_code(code).ok_or(FromSqlError::OutOfRange(code))
    }
}

/// A change to an account, or a request for a loan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The account the transaction belongs to.
    pub account_id: AccountId,
    /// The amount of money moved, always positive.
    pub amount: Money,
    /// The account balance right after the transaction.
    ///
    /// For a loan that has not been approved yet, this is the balance at the
    /// time the loan was requested.
    pub balance_after_transaction: Money,
    /// What kind of activity this is.
    pub transaction_type: TransactionType,
    /// When the transaction was recorded (UTC).
    pub timestamp: OffsetDateTime,
    /// Whether an operator approved the loan. Always false for other types.
    pub loan_approve: bool,
}

impl Transaction {
    /// Create a new transaction.
    ///
    /// Shortcut for [TransactionBuilder] for discoverability.
    pub fn build(
        account_id: AccountId,
        amount: Money,
        transaction_type: TransactionType,
    ) -> TransactionBuilder {
        TransactionBuilder {
            account_id,
            amount,
            balance_after_transaction: Money::ZERO,
            transaction_type,
            timestamp: OffsetDateTime::now_utc(),
            loan_approve: false,
        }
    }
}

/// A builder for creating [Transaction] instances.
///
/// The timestamp defaults to the current time and loans start out unapproved.
#[derive(Debug, PartialEq, Clone)]
pub struct TransactionBuilder {
    pub account_id: AccountId,
    pub amount: Money,
    pub balance_after_transaction: Money,
    pub transaction_type: TransactionType,
    pub timestamp: OffsetDateTime,
    pub loan_approve: bool,
}

impl TransactionBuilder {
    /// Set the account balance right after the transaction.
    pub fn balance_after_transaction(mut self, balance: Money) -> Self {
        self.balance_after_transaction = balance;
        self
    }

    /// Set when the transaction happened.
    pub fn timestamp(mut self, timestamp: OffsetDateTime) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Set whether the loan has been approved.
    pub fn loan_approve(mut self, loan_approve: bool) -> Self {
        self.loan_approve = loan_approve;
        self
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

const SELECT_COLUMNS: &str =
    "id, account_id, amount, balance_after_transaction, transaction_type, timestamp, loan_approve";

/// Create a new transaction in the database from a builder.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if the account does not exist,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_transaction(
    builder: TransactionBuilder,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(&format!(
            "INSERT INTO \"transaction\"
                (account_id, amount, balance_after_transaction, transaction_type, timestamp, loan_approve)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             RETURNING {SELECT_COLUMNS}"
        ))?
        .query_row(
            (
                builder.account_id,
                builder.amount,
                builder.balance_after_transaction,
                builder.transaction_type,
                builder.timestamp,
                builder.loan_approve,
            ),
            map_transaction_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ) => Error::NotFound,
            error => error.into(),
        })?;

    Ok(transaction)
}

/// Retrieve a transaction from the database by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid transaction,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_transaction(id: TransactionId, connection: &Connection) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM \"transaction\" WHERE id = :id"
        ))?
        .query_one(&[(":id", &id)], map_transaction_row)?;

    Ok(transaction)
}

/// Get all transactions of `account_id`, oldest first.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
pub fn get_transactions_for_account(
    account_id: AccountId,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM \"transaction\"
             WHERE account_id = :account_id
             ORDER BY timestamp ASC, id ASC"
        ))?
        .query_map(&[(":account_id", &account_id)], map_transaction_row)?
        .map(|transaction_result| transaction_result.map_err(Error::from))
        .collect()
}

/// Get the outstanding loans of `account_id`, newest first.
///
/// Loans that have been paid back are not included.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
pub fn get_loans_for_account(
    account_id: AccountId,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM \"transaction\"
             WHERE account_id = :account_id AND transaction_type = :loan
             ORDER BY timestamp DESC, id DESC"
        ))?
        .query_map(
            rusqlite::named_params! {
                ":account_id": account_id,
                ":loan": TransactionType::Loan,
            },
            map_transaction_row,
        )?
        .map(|transaction_result| transaction_result.map_err(Error::from))
        .collect()
}

/// Count the loans of `account_id` that have been approved but not paid back.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
pub fn count_approved_loans(account_id: AccountId, connection: &Connection) -> Result<i64, Error> {
    connection
        .query_row(
            "SELECT COUNT(id) FROM \"transaction\"
             WHERE account_id = ?1 AND transaction_type = ?2 AND loan_approve = 1",
            (account_id, TransactionType::Loan),
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

/// Get the loans of every account that are waiting for approval, oldest first.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
pub fn get_pending_loans(connection: &Connection) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM \"transaction\"
             WHERE transaction_type = :loan AND loan_approve = 0
             ORDER BY timestamp ASC, id ASC"
        ))?
        .query_map(&[(":loan", &TransactionType::Loan)], map_transaction_row)?
        .map(|transaction_result| transaction_result.map_err(Error::from))
        .collect()
}

/// Overwrite the state of the loan `id` after it was approved or paid back.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid transaction,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_loan(
    id: TransactionId,
    transaction_type: TransactionType,
    balance_after_transaction: Money,
    loan_approve: bool,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(&format!(
            "UPDATE \"transaction\"
             SET transaction_type = :transaction_type,
                 balance_after_transaction = :balance_after_transaction,
                 loan_approve = :loan_approve
             WHERE id = :id
             RETURNING {SELECT_COLUMNS}"
        ))?
        .query_one(
            rusqlite::named_params! {
                ":id": id,
                ":transaction_type": transaction_type,
                ":balance_after_transaction": balance_after_transaction,
                ":loan_approve": loan_approve,
            },
            map_transaction_row,
        )?;

    Ok(transaction)
}

/// Create the transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                account_id INTEGER NOT NULL,
                amount TEXT NOT NULL,
                balance_after_transaction TEXT NOT NULL,
                transaction_type INTEGER NOT NULL CHECK (transaction_type BETWEEN 1 AND 4),
                timestamp TEXT NOT NULL,
                loan_approve INTEGER NOT NULL DEFAULT 0,
                FOREIGN KEY(account_id) REFERENCES account(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    // Used by the report and the loan list.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_account_timestamp
         ON \"transaction\"(account_id, timestamp);",
        (),
    )?;

    Ok(())
}

/// Map a database row to a Transaction.
fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let id = row.get(0)?;
    let account_id = row.get(1)?;
    let amount = row.get(2)?;
    let balance_after_transaction = row.get(3)?;
    let transaction_type = row.get(4)?;
    let timestamp = row.get(5)?;
    let loan_approve = row.get(6)?;

    Ok(Transaction {
        id,
        account_id,
        amount,
        balance_after_transaction,
        transaction_type,
        timestamp,
        loan_approve,
    })
}

// ============================================================================
// TESTS
// ============================================================================


#[cfg(test)]
mod database_tests {
    use rust_decimal_macros::dec;
    use time::macros::datetime;

    use crate::{
        Error,
        money::Money,
        test_utils::{create_test_user_with_account, get_test_connection},
    };

    use super::{
        Transaction, TransactionType, count_approved_loans, create_transaction,
        get_loans_for_account, get_pending_loans, get_transaction, get_transactions_for_account,
        update_loan,
    };

    #[test]
    fn create_succeeds() {
        let conn = get_test_connection();
        let (_, account) = create_test_user_with_account(&conn, "ada@example.com");
        let amount = Money::new(dec!(123.45));

        let transaction = create_transaction(
            Transaction::build(account.id, amount, TransactionType::Deposit)
                .balance_after_transaction(amount),
            &conn,
        )
        .expect("Could not create transaction");

        assert_eq!(transaction.amount, amount);
        assert_eq!(transaction.balance_after_transaction, amount);
        assert_eq!(transaction.transaction_type, TransactionType::Deposit);
        assert!(!transaction.loan_approve);
        assert_eq!(get_transaction(transaction.id, &conn), Ok(transaction));
    }

    #[test]
    fn create_fails_on_missing_account() {
        let conn = get_test_connection();

        let result = create_transaction(
            Transaction::build(42, Money::from_dollars(100), TransactionType::Deposit),
            &conn,
        );

        assert_eq!(result, Err(Error::NotFound));
    }

    #[test]
    fn get_missing_transaction_is_not_found() {
        let conn = get_test_connection();

        assert_eq!(get_transaction(1, &conn), Err(Error::NotFound));
    }

    #[test]
    fn transactions_for_account_are_oldest_first_and_exclude_other_accounts() {
        let conn = get_test_connection();
        let (_, account) = create_test_user_with_account(&conn, "ada@example.com");
        let (_, other_account) = create_test_user_with_account(&conn, "bob@example.com");
        let later = create_transaction(
            Transaction::build(account.id, Money::from_dollars(200), TransactionType::Deposit)
                .timestamp(datetime!(2025-10-05 12:00 UTC)),
            &conn,
        )
        .unwrap();
        let earlier = create_transaction(
            Transaction::build(account.id, Money::from_dollars(100), TransactionType::Deposit)
                .timestamp(datetime!(2025-10-01 12:00 UTC)),
            &conn,
        )
        .unwrap();
        create_transaction(
            Transaction::build(other_account.id, Money::from_dollars(300), TransactionType::Deposit),
            &conn,
        )
        .unwrap();

        let got = get_transactions_for_account(account.id, &conn).unwrap();

        assert_eq!(got, vec![earlier, later]);
    }

    #[test]
    fn loans_exclude_paid_loans_and_other_types() {
        let conn = get_test_connection();
        let (_, account) = create_test_user_with_account(&conn, "ada@example.com");
        let loan = create_transaction(
            Transaction::build(account.id, Money::from_dollars(1000), TransactionType::Loan),
            &conn,
        )
        .unwrap();
        create_transaction(
            Transaction::build(account.id, Money::from_dollars(500), TransactionType::LoanPaid)
                .loan_approve(true),
            &conn,
        )
        .unwrap();
        create_transaction(
            Transaction::build(account.id, Money::from_dollars(100), TransactionType::Deposit),
            &conn,
        )
        .unwrap();

        let got = get_loans_for_account(account.id, &conn).unwrap();

        assert_eq!(got, vec![loan]);
    }

    #[test]
    fn count_only_approved_loans() {
        let conn = get_test_connection();
        let (_, account) = create_test_user_with_account(&conn, "ada@example.com");
        for approved in [true, true, false] {
            create_transaction(
                Transaction::build(account.id, Money::from_dollars(1000), TransactionType::Loan)
                    .loan_approve(approved),
                &conn,
            )
            .unwrap();
        }
        create_transaction(
            Transaction::build(account.id, Money::from_dollars(1000), TransactionType::LoanPaid)
                .loan_approve(true),
            &conn,
        )
        .unwrap();

        assert_eq!(count_approved_loans(account.id, &conn), Ok(2));
    }

    #[test]
    fn amounts_keep_their_precision() {
        let conn = get_test_connection();
        let (_, account) = create_test_user_with_account(&conn, "ada@example.com");
        let amount = Money::new(dec!(0.10));

        let transaction = create_transaction(
            Transaction::build(account.id, amount, TransactionType::Deposit),
            &conn,
        )
        .unwrap();

        assert_eq!(get_transaction(transaction.id, &conn).unwrap().amount, amount);
    }

    #[test]
    fn pending_loans_span_accounts_and_skip_approved() {
        let conn = get_test_connection();
        let (_, account) = create_test_user_with_account(&conn, "ada@example.com");
        let (_, other_account) = create_test_user_with_account(&conn, "bob@example.com");
        let first = create_transaction(
            Transaction::build(account.id, Money::from_dollars(1000), TransactionType::Loan)
                .timestamp(datetime!(2025-10-01 12:00 UTC)),
            &conn,
        )
        .unwrap();
        let second = create_transaction(
            Transaction::build(other_account.id, Money::from_dollars(50), TransactionType::Loan)
                .timestamp(datetime!(2025-10-02 12:00 UTC)),
            &conn,
        )
        .unwrap();
        create_transaction(
            Transaction::build(account.id, Money::from_dollars(10), TransactionType::Loan)
                .loan_approve(true),
            &conn,
        )
        .unwrap();

        assert_eq!(get_pending_loans(&conn), Ok(vec![first, second]));
    }

    #[test]
    fn update_loan_overwrites_state() {
        let conn = get_test_connection();
        let (_, account) = create_test_user_with_account(&conn, "ada@example.com");
        let loan = create_transaction(
            Transaction::build(account.id, Money::from_dollars(1000), TransactionType::Loan),
            &conn,
        )
        .unwrap();

        let updated = update_loan(
            loan.id,
            TransactionType::LoanPaid,
            Money::from_dollars(250),
            true,
            &conn,
        )
        .unwrap();

        assert_eq!(updated.transaction_type, TransactionType::LoanPaid);
        assert_eq!(updated.balance_after_transaction, Money::from_dollars(250));
        assert!(updated.loan_approve);
        assert_eq!(updated.amount, loan.amount);
        assert_eq!(updated.timestamp, loan.timestamp);
        assert_eq!(get_transaction(loan.id, &conn), Ok(updated));
    }

    #[test]
    fn update_missing_loan_is_not_found() {
        let conn = get_test_connection();

        let result = update_loan(7, TransactionType::Loan, Money::ZERO, true, &conn);

        assert_eq!(result, Err(Error::NotFound));
    }
}
