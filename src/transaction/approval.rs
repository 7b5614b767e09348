//! Approving loan requests, done by an operator from the command line.

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};

use crate::{
    Error,
    account::{get_account_by_id, set_balance},
    auth::{User, get_user_by_id},
    transaction::{Transaction, TransactionId, TransactionType, get_transaction, update_loan},
};

/// Approve the loan `loan_id` and credit it to the borrower's account.
///
/// Returns the approved loan and the user that requested it, so that they can
/// be notified.
///
/// # Errors
/// Returns a:
/// - [Error::NotFound] if `loan_id` does not refer to a transaction,
/// - [Error::NotALoan] if the transaction is not an outstanding loan,
/// - [Error::LoanAlreadyApproved] if the loan was approved before,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn approve_loan(
    loan_id: TransactionId,
    connection: &Connection,
) -> Result<(Transaction, User), Error> {
    let sql_transaction =
        SqlTransaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    let loan = get_transaction(loan_id, &sql_transaction)?;

    if loan.transaction_type != TransactionType::Loan {
        return Err(Error::NotALoan(loan_id));
    }

    if loan.loan_approve {
        return Err(Error::LoanAlreadyApproved(loan_id));
    }

    let account = get_account_by_id(loan.account_id, &sql_transaction)?;
    let user = get_user_by_id(account.user_id, &sql_transaction)?;
    let new_balance = account.balance + loan.amount;

    set_balance(account.id, new_balance, &sql_transaction)?;
    let approved_loan = update_loan(
        loan.id,
        TransactionType::Loan,
        new_balance,
        true,
        &sql_transaction,
    )?;

    sql_transaction.commit()?;

    Ok((approved_loan, user))
}
