#![forbid(unsafe_code)]

use beancount::botapi::types::Update;
use beancount::config::Config;
use beancount::errors::{ConfigError, RouterError, StoreFileError, TelegramClientError};
use beancount::ledger::{Backend, LedgerStore, MemoryBackend, RonBackend, SystemClock};
use beancount::messenger::TelegramClient;
use beancount::router::Router;
use directories::ProjectDirs;
use error_iter::ErrorIter;
use is_terminal::IsTerminal as _;
use onlyargs::{CliError, OnlyArgs as _};
use onlyargs_derive::OnlyArgs;
use rayon::{prelude::*, ThreadPoolBuilder};
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs, process::ExitCode, thread};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::prelude::*;

const STORE_FILE: &str = "ledger.ron";

/// Wait before polling again after a failed poll.
const RETRY_DELAY: Duration = Duration::from_secs(5);

type BotRouter<'a, B> = Router<'a, B, SystemClock, TelegramClient>;

#[derive(Debug, OnlyArgs)]
#[footer = "Environment variables:"]
#[footer = "  - TELEGRAM_API_KEY is the bot token (required)"]
#[footer = "  - TELEGRAM_API_URL accepts a http: or https: URL"]
#[footer = "      default is \"https://api.telegram.org/\""]
#[footer = "  - DISPLAY_UTC_OFFSET is the time zone for /list timestamps, in hours"]
#[footer = "      accepts e.g. \"8\", \"-5\" or \"+5:30\", default is 8"]
#[footer = "  - RAYON_NUM_THREADS sets the number of concurrent update handlers"]
#[footer = "      default is 8"]
#[footer = "  - TERM_COLOR accepts \"always\" to override automatic terminal sensing"]
struct Args {
    /// Read and write the ledger in this file.
    ///   Default is "ledger.ron" in the user's data directory.
    ///
    store: Option<PathBuf>,

    /// Keep the ledger in memory only. Nothing is saved.
    memory: bool,

    /// Handle a single JSON update read from a file, then exit.
    ///   This replaces long polling, for use behind a webhook.
    ///
    update: Option<PathBuf>,

    /// Long polling timeout, in seconds.
    #[default(30)]
    poll_timeout: u64,
}

#[derive(Debug, Error)]
enum Error {
    #[error("Argument parsing error")]
    Args(#[from] CliError),

    #[error("Configuration error")]
    Config(#[from] ConfigError),

    #[error("I/O error")]
    Io(#[from] std::io::Error),

    #[error("Unable to locate user data directory")]
    DataDir,

    #[error("Unable to open ledger {0:?}")]
    Store(PathBuf, #[source] StoreFileError),

    #[error("Telegram client error")]
    TelegramClient(#[from] TelegramClientError),

    #[error("Unable to parse update {0:?}")]
    Update(PathBuf, #[source] serde_json::Error),

    #[error("Unable to handle update")]
    Router(#[from] RouterError),

    #[error("Rayon thread pool error")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

fn main() -> ExitCode {
    // Initialize the tracing subscriber for instrumentation.
    // Uses the `RUST_LOG` environment var for configuration. E.g. `RUST_LOG=debug cargo run`
    //
    // See: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/struct.EnvFilter.html#directives
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    let term_color = env::var("TERM_COLOR")
        .map(|color| color == "always")
        .unwrap_or_else(|_| std::io::stdout().is_terminal());
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_ansi(term_color))
        .with(env_filter)
        .init();

    match run(onlyargs::parse()) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            if matches!(err, Error::Args(_)) {
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

fn run(args: Result<Args, CliError>) -> Result<(), Error> {
    let args = args?;
    let config = Config::from_env()?;

    if args.memory {
        if args.store.is_some() {
            warn!("Ignoring --store, the ledger is kept in memory");
        }
        info!("Using an in-memory ledger");

        return serve(&args, &config, MemoryBackend::new());
    }

    let path = match &args.store {
        Some(path) => path.clone(),
        None => default_store()?,
    };
    let backend = RonBackend::open(&path).map_err(|err| Error::Store(path, err))?;
    info!("Using ledger {:?}", backend.path());

    serve(&args, &config, backend)
}

/// The ledger file in the user's data directory, which is created when missing.
fn default_store() -> Result<PathBuf, Error> {
    let project_dir = ProjectDirs::from("", "", "beancount").ok_or(Error::DataDir)?;
    let data_dir = project_dir.data_dir();
    fs::create_dir_all(data_dir)?;

    Ok(data_dir.join(STORE_FILE))
}

fn serve<B: Backend + Sync>(args: &Args, config: &Config, backend: B) -> Result<(), Error> {
    let store = LedgerStore::new(backend);
    let client = TelegramClient::new(
        &config.api_url,
        config.api_key()?,
        Duration::from_secs(args.poll_timeout),
        config.num_threads,
    )?;
    let router = Router::new(&store, &client, config.display_offset);

    match &args.update {
        Some(path) => handle_one(&router, path),
        None => poll(&router, &client, args.poll_timeout, config.num_threads),
    }
}

fn handle_one<B: Backend + Sync>(router: &BotRouter<'_, B>, path: &Path) -> Result<(), Error> {
    let update: Update = serde_json::from_str(&fs::read_to_string(path)?)
        .map_err(|err| Error::Update(path.to_path_buf(), err))?;
    debug!(update_id = update.update_id, "Handling update from {path:?}");

    Ok(router.handle(&update)?)
}

/// Long poll forever, handling each batch of updates on the thread pool.
fn poll<B: Backend + Sync>(
    router: &BotRouter<'_, B>,
    client: &TelegramClient,
    timeout: u64,
    num_threads: usize,
) -> Result<(), Error> {
    let pool = ThreadPoolBuilder::new().num_threads(num_threads).build()?;
    info!("Polling for updates with {num_threads} handler threads");

    let mut offset = None;
    loop {
        let updates = match client.get_updates(offset, timeout) {
            Ok(updates) => updates,
            Err(err) => {
                error!("Unable to poll for updates: {}", error_chain(&err));
                thread::sleep(RETRY_DELAY);
                continue;
            }
        };

        // Confirm the whole batch on the next poll. Failed updates are not retried.
        if let Some(update) = updates.last() {
            offset = Some(update.update_id + 1);
        }

        pool.install(|| {
            updates.par_iter().for_each(|update| {
                if let Err(err) = router.handle(update) {
                    error!(update_id = update.update_id, "{}", error_chain(&err));
                }
            });
        });
    }
}

/// Format an error and all of its sources on one line.
fn error_chain<E: ErrorIter>(err: &E) -> String {
    err.sources()
        .map(|source| source.to_string())
        .collect::<Vec<_>>()
        .join(": ")
}
