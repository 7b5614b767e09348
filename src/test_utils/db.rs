use rusqlite::Connection;

use crate::{
    account::{BankAccount, create_account_for_user},
    auth::{Email, NewUser, PasswordHash, User, create_user},
    db::initialize,
};

/// The raw password of every user made by [create_test_user].
pub(crate) const TEST_PASSWORD: &str = "averysafeandsecurepassword";

/// A cheap bcrypt cost so that tests do not spend seconds hashing.
const TEST_HASH_COST: u32 = 4;

pub(crate) fn get_test_connection() -> Connection {
    let connection =
        Connection::open_in_memory().expect("Could not open in-memory SQLite database");
    initialize(&connection).expect("Could not initialize database");

    connection
}

#[track_caller]
pub(crate) fn create_test_user(connection: &Connection, email: &str) -> User {
    create_user(
        NewUser {
            email: Email::new(email).expect("Invalid test email"),
            first_name: "Test".to_owned(),
            last_name: "User".to_owned(),
            password_hash: PasswordHash::from_raw_password(TEST_PASSWORD, TEST_HASH_COST)
                .expect("Could not hash test password"),
        },
        connection,
    )
    .expect("Could not create test user")
}

#[track_caller]
pub(crate) fn create_test_user_with_account(
    connection: &Connection,
    email: &str,
) -> (User, BankAccount) {
    let user = create_test_user(connection, email);
    let account =
        create_account_for_user(user.id, connection).expect("Could not create test account");

    (user, account)
}
