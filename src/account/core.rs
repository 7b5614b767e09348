use rusqlite::{Connection, Row};
use time::OffsetDateTime;

use crate::{Error, auth::UserID, money::Money};

pub type AccountId = i64;

/// Account numbers are offset from the user ID so that they look like real account numbers.
const ACCOUNT_NUMBER_OFFSET: i64 = 100_000;

/// The single bank account that belongs to a user.
#[derive(Debug, Clone, PartialEq)]
pub struct BankAccount {
    /// The id for the account.
    pub id: AccountId,
    /// The user that owns the account.
    pub user_id: UserID,
    /// The number shown to the user, unique across accounts.
    pub account_number: i64,
    /// The money currently in the account.
    pub balance: Money,
    /// When the account was opened (UTC).
    pub created_at: OffsetDateTime,
}

pub fn create_account_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS account (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL UNIQUE,
            account_number INTEGER NOT NULL UNIQUE,
            balance TEXT NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    Ok(())
}

fn map_row_to_account(row: &Row) -> Result<BankAccount, rusqlite::Error> {
    let id = row.get(0)?;
    let user_id = UserID::new(row.get(1)?);
    let account_number = row.get(2)?;
    let balance = row.get(3)?;
    let created_at = row.get(4)?;

    Ok(BankAccount {
        id,
        user_id,
        account_number,
        balance,
        created_at,
    })
}

/// Open an account with a zero balance for `user_id`.
///
/// # Errors
/// Returns an [Error::SqlError] if the user already has an account or does not exist.
pub fn create_account_for_user(
    user_id: UserID,
    connection: &Connection,
) -> Result<BankAccount, Error> {
    let account = connection
        .prepare(
            "INSERT INTO account (user_id, account_number, balance, created_at)
            VALUES (?1, ?2, ?3, ?4)
            RETURNING id, user_id, account_number, balance, created_at",
        )?
        .query_row(
            (
                user_id.as_i64(),
                ACCOUNT_NUMBER_OFFSET + user_id.as_i64(),
                Money::ZERO,
                OffsetDateTime::now_utc(),
            ),
            map_row_to_account,
        )?;

    Ok(account)
}

/// Get the account that belongs to `user_id`.
///
/// # Errors
/// Returns [Error::NotFound] if the user has no account.
pub fn get_account_by_user(user_id: UserID, connection: &Connection) -> Result<BankAccount, Error> {
    connection
        .prepare(
            "SELECT id, user_id, account_number, balance, created_at
            FROM account WHERE user_id = :user_id",
        )?
        .query_row(&[(":user_id", &user_id.as_i64())], map_row_to_account)
        .map_err(|error| error.into())
}

/// Get the account with the ID `account_id`.
///
/// # Errors
/// Returns [Error::NotFound] if there is no such account.
pub fn get_account_by_id(account_id: AccountId, connection: &Connection) -> Result<BankAccount, Error> {
    connection
        .prepare(
            "SELECT id, user_id, account_number, balance, created_at
            FROM account WHERE id = :id",
        )?
        .query_row(&[(":id", &account_id)], map_row_to_account)
        .map_err(|error| error.into())
}

/// Overwrite the balance of the account `account_id`.
///
/// Callers should do this inside the same SQL transaction that records the
/// transaction row for the change.
///
/// # Errors
/// Returns [Error::NotFound] if there is no such account.
pub fn set_balance(
    account_id: AccountId,
    balance: Money,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE account SET balance = ?1 WHERE id = ?2",
        (balance, account_id),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

#[cfg(test)]
mod create_table_tests {
    use rusqlite::Connection;

    use super::create_account_table;

    #[test]
    fn sql_is_valid() {
        let connection =
            Connection::open_in_memory().expect("Could not initialise in-memory SQLite database");

        assert_eq!(Ok(()), create_account_table(&connection));
    }
}

#[cfg(test)]
mod account_tests {
    use rust_decimal_macros::dec;

    use crate::{
        Error,
        auth::UserID,
        money::Money,
        test_utils::{create_test_user, get_test_connection},
    };

    use super::{create_account_for_user, get_account_by_id, get_account_by_user, set_balance};

    #[test]
    fn new_account_is_empty_with_derived_number() {
        let connection = get_test_connection();
        let user = create_test_user(&connection, "ada@example.com");

        let account = create_account_for_user(user.id, &connection).unwrap();

        assert_eq!(account.user_id, user.id);
        assert_eq!(account.balance, Money::ZERO);
        assert_eq!(account.account_number, 100_000 + user.id.as_i64());
    }

    #[test]
    fn user_can_only_have_one_account() {
        let connection = get_test_connection();
        let user = create_test_user(&connection, "ada@example.com");
        create_account_for_user(user.id, &connection).unwrap();

        let result = create_account_for_user(user.id, &connection);

        assert!(matches!(result, Err(Error::SqlError(_))));
    }

    #[test]
    fn account_requires_existing_user() {
        let connection = get_test_connection();

        let result = create_account_for_user(UserID::new(42), &connection);

        assert!(matches!(result, Err(Error::SqlError(_))));
    }

    #[test]
    fn get_account_by_user_returns_created_account() {
        let connection = get_test_connection();
        let user = create_test_user(&connection, "ada@example.com");
        let want = create_account_for_user(user.id, &connection).unwrap();

        let got = get_account_by_user(user.id, &connection).unwrap();

        assert_eq!(got, want);
        assert_eq!(get_account_by_id(want.id, &connection).unwrap(), want);
    }

    #[test]
    fn get_account_for_user_without_account_is_not_found() {
        let connection = get_test_connection();
        let user = create_test_user(&connection, "ada@example.com");

        assert_eq!(
            get_account_by_user(user.id, &connection),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn set_balance_updates_account() {
        let connection = get_test_connection();
        let user = create_test_user(&connection, "ada@example.com");
        let account = create_account_for_user(user.id, &connection).unwrap();

        set_balance(account.id, Money::new(dec!(1234.56)), &connection).unwrap();

        let got = get_account_by_user(user.id, &connection).unwrap();
        assert_eq!(got.balance, Money::new(dec!(1234.56)));
    }

    #[test]
    fn set_balance_for_missing_account_is_not_found() {
        let connection = get_test_connection();

        assert_eq!(
            set_balance(99, Money::ZERO, &connection),
            Err(Error::NotFound)
        );
    }
}
