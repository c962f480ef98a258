#![forbid(unsafe_code)]

use beancount::ledger::{Backend as _, LedgerStore, RonBackend, HISTORY_LIMIT};
use chrono::DateTime;
use error_iter::ErrorIter as _;
use onlyargs::{CliError, OnlyArgs as _};
use onlyargs_derive::OnlyArgs;
use std::{path::PathBuf, process::ExitCode};
use thiserror::Error;

#[derive(Debug, Error)]
enum Error {
    #[error("CLI error")]
    Cli(#[from] CliError),

    #[error("Ledger file error")]
    StoreFile(#[from] beancount::errors::StoreFileError),

    #[error("Ledger error")]
    Ledger(#[from] beancount::errors::LedgerError),
}

/// Query one chat in a beancount ledger file.
#[derive(Debug, OnlyArgs)]
struct Args {
    /// Chat ID.
    chat_id: i64,

    /// Path to the ledger file.
    #[default("ledger.ron")]
    store: PathBuf,
}

fn main() -> ExitCode {
    match run() {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            if matches!(err, Error::Cli(_)) {
                eprintln!("{}", Args::HELP);
            }

            eprintln!("Error: {err}");
            for source in err.sources().skip(1) {
                eprintln!("  Caused by: {source}");
            }

            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Error> {
    let args: Args = onlyargs::parse()?;

    let store = LedgerStore::new(RonBackend::open(&args.store)?);
    let exists = store.backend().get(args.chat_id).is_ok_and(|row| row.is_some());
    let balance = store.get_balance(args.chat_id)?;
    let history = store.get_history(args.chat_id, HISTORY_LIMIT)?;

    println!("chat:\t{}", args.chat_id);
    println!("found:\t{exists}");
    println!("balance:\t{balance}");
    for entry in history {
        let time = DateTime::from_timestamp(entry.timestamp, 0)
            .map_or_else(|| entry.timestamp.to_string(), |time| time.to_rfc3339());
        println!("entry:\t{time}\t{}", entry.amount);
    }

    Ok(())
}
