use std::{error::Error, path::PathBuf, process::exit, sync::Arc};

use clap::Parser;
use rusqlite::Connection;

use banking_rs::{
    ConsoleMailer, FileMailer, Mailer, Notification, approve_loan, get_pending_loans,
    initialize_db, send_email_to_user,
};

/// A utility for approving loan requests and notifying the borrower.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long)]
    db_path: String,

    /// The ID of the loan to approve.
    #[arg(long, required_unless_present = "list")]
    loan_id: Option<i64>,

    /// A directory to write the notification email to. The email is printed if not set.
    #[arg(long)]
    mail_dir: Option<PathBuf>,

    /// List the loans waiting for approval instead of approving one.
    #[arg(long)]
    list: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt().init();

    let args = Args::parse();

    let conn = Connection::open(&args.db_path)?;
    initialize_db(&conn)?;

    if args.list {
        return list_pending_loans(&conn);
    }

    let Some(loan_id) = args.loan_id else {
        print_error("Pass --loan-id or --list.");
        exit(1);
    };

    // A bad --mail-dir must fail before the loan is approved.
    let mailer: Arc<dyn Mailer> = match args.mail_dir {
        Some(mail_dir) => Arc::new(FileMailer::new(mail_dir)?),
        None => Arc::new(ConsoleMailer),
    };

    let (loan, user) = match approve_loan(loan_id, &conn) {
        Ok(approved) => approved,
        Err(error) => {
            print_error(format!("Could not approve loan {loan_id}: {error}"));
            exit(1);
        }
    };

    println!(
        "Approved loan {} of {}$ for {}, new balance {}$",
        loan.id, loan.amount, user.email, loan.balance_after_transaction
    );

    // The loan stays approved even if the email cannot be sent.
    if let Err(error) =
        send_email_to_user(Notification::LoanApproval, &user, loan.amount, mailer.as_ref())
    {
        print_error(format!("Could not send the approval email: {error}"));
    }

    Ok(())
}

fn list_pending_loans(conn: &Connection) -> Result<(), Box<dyn Error>> {
    let loans = get_pending_loans(conn)?;

    if loans.is_empty() {
        println!("There are no loans waiting for approval.");
        return Ok(());
    }

    println!("{:>8}  {:>10}  {:>14}  {}", "LOAN ID", "ACCOUNT", "AMOUNT", "REQUESTED");
    for loan in loans {
        println!(
            "{:>8}  {:>10}  {:>14}  {}",
            loan.id,
            loan.account_id,
            format!("{}$", loan.amount),
            loan.timestamp
        );
    }

    Ok(())
}

fn print_error(error: impl ToString) {
    eprintln!("\x1b[31;1m{}\x1b[0m", error.to_string())
}
