//! Money moving in and out of accounts.
//!
//! This module contains everything related to transactions:
//! - The `Transaction` model and `TransactionBuilder` for creating transactions
//! - Database functions for storing and querying transactions
//! - Deposits, withdrawals, loans and the transaction report

mod amount_page;
mod approval;
mod core;
mod deposit;
mod loan_request;
mod loans;
mod report;
mod state;
mod withdraw;

pub use approval::approve_loan;
pub use core::{
    MAX_APPROVED_LOANS, MAX_WITHDRAW_AMOUNT, MIN_DEPOSIT_AMOUNT, MIN_WITHDRAW_AMOUNT, Transaction,
    TransactionId, TransactionType, count_approved_loans, create_transaction,
    create_transaction_table, get_loans_for_account, get_pending_loans, get_transaction,
    get_transactions_for_account, update_loan,
};
pub use deposit::{deposit_endpoint, get_deposit_page};
pub use loan_request::{get_loan_request_page, loan_request_endpoint};
pub use loans::{get_loans_page, pay_loan_endpoint};
pub use report::{get_report_csv, get_report_page};
pub use state::TransactionState;
pub use withdraw::{get_withdraw_page, withdraw_endpoint};
