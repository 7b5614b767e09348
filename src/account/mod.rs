mod core;
mod home_page;

pub use core::{
    AccountId, BankAccount, create_account_for_user, create_account_table, get_account_by_id,
    get_account_by_user, set_balance,
};
pub use home_page::get_home_page;
