use super::backend::{Backend, BackendError, TrimSkipped};
use super::memory::MemoryBackend;
use crate::model::{Account, Amount, ChatId, Entry};
use parking_lot::Mutex;
use ron::{de::SpannedError, ser::PrettyConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, trace};

pub const STORE_VERSION: &str = "1.0.0";

#[derive(Debug, Error)]
pub enum StoreFileError {
    #[error("I/O error")]
    Io(#[from] std::io::Error),

    #[error("Unable to deserialize")]
    Deserialize(#[from] SpannedError),

    #[error("Unable to serialize")]
    Serialize(#[from] ron::Error),

    #[error("Expected version `{STORE_VERSION}`, found `{0}`")]
    Version(String),
}

#[derive(Debug, Deserialize, Serialize)]
struct StoreFile {
    version: String,
    accounts: Vec<Account>,
}

/// A [`Backend`] that keeps every row in a single RON file.
///
/// Rows are served from memory. Every mutation is written through: the whole table is serialized
/// to a temporary file which then replaces the store file. Mutations are serialized by a writer
/// lock, and a mutation whose write fails is rolled back before the error is returned, so the file
/// and memory never disagree about a reported success. Reads take the same lock and only observe
/// rows that have been written.
#[derive(Debug)]
pub struct RonBackend {
    path: PathBuf,
    memory: MemoryBackend,
    writer: Mutex<()>,
}

impl RonBackend {
    /// Open the store file at `path`, starting empty when it does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreFileError> {
        let path = path.into();
        let memory = if path.exists() {
            debug!("Loading ledger from {path:?}");
            Self::load(&path)?.into_iter().collect()
        } else {
            debug!("No ledger at {path:?}, starting empty");
            MemoryBackend::new()
        };

        Ok(Self {
            path,
            memory,
            writer: Mutex::new(()),
        })
    }

    /// Read every row from the store file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Vec<Account>, StoreFileError> {
        let serialized = fs::read_to_string(path)?;
        let store: StoreFile = ron::from_str(&serialized)?;

        // Validate header.
        if store.version == STORE_VERSION {
            Ok(store.accounts)
        } else {
            Err(StoreFileError::Version(store.version))
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the whole table to disk.
    fn save(&self) -> Result<(), StoreFileError> {
        let mut accounts = self.memory.snapshot();
        accounts.sort_by_key(Account::chat_id);
        let store = StoreFile {
            version: STORE_VERSION.to_string(),
            accounts,
        };
        let serialized = ron::ser::to_string_pretty(&store, PrettyConfig::default())?;

        let temp = self.path.with_extension("ron.tmp");
        fs::write(&temp, serialized)?;
        fs::rename(&temp, &self.path)?;
        trace!("Ledger written to {:?}", self.path);

        Ok(())
    }

    /// Run a mutation on one row and write it through, rolling the row back if the write fails.
    fn write_through<R, E>(
        &self,
        chat_id: ChatId,
        mutate: impl FnOnce(&MemoryBackend) -> Result<R, E>,
    ) -> Result<R, E>
    where
        E: From<BackendError>,
    {
        let _writer = self.writer.lock();
        let previous = self.memory.account(chat_id);

        let result = mutate(&self.memory)?;
        if let Err(err) = self.save() {
            self.memory.restore(chat_id, previous);

            return Err(BackendError::from(err).into());
        }

        Ok(result)
    }
}

impl Backend for RonBackend {
    fn get(&self, chat_id: ChatId) -> Result<Option<Account>, BackendError> {
        let _writer = self.writer.lock();

        self.memory.get(chat_id)
    }

    fn add_and_append(&self, chat_id: ChatId, entry: Entry) -> Result<Amount, BackendError> {
        self.write_through(chat_id, |memory| memory.add_and_append(chat_id, entry))
    }

    fn trim_history(&self, chat_id: ChatId, limit: usize) -> Result<usize, TrimSkipped> {
        self.write_through(chat_id, |memory| memory.trim_history(chat_id, limit))
    }

    fn put(&self, account: Account) -> Result<(), BackendError> {
        let chat_id = account.chat_id();

        self.write_through(chat_id, |memory| memory.put(account))
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;
    use std::time::Duration;
    use std::{env, thread};

    /// A store path unique to this test process, removed on drop.
    struct TempStore(PathBuf);

    impl TempStore {
        fn new(name: &str) -> Self {
            let path = env::temp_dir().join(format!("beancount-{}-{name}.ron", std::process::id()));
            let _ = fs::remove_file(&path);

            Self(path)
        }
    }

    impl Drop for TempStore {
        fn drop(&mut self) {
            let _ = fs::remove_file(&self.0);
        }
    }

    fn entry(timestamp: i64, amount: &str) -> Entry {
        Entry {
            timestamp,
            amount: amount.parse().unwrap(),
        }
    }

    #[test]
    fn test_reopen() {
        let store = TempStore::new("reopen");

        let backend = RonBackend::open(&store.0).unwrap();
        assert!(!store.0.exists());
        backend.add_and_append(42, entry(1, "10.50")).unwrap();
        backend.add_and_append(42, entry(2, "-3.25")).unwrap();
        backend.put(Account::new(-7, "100".parse().unwrap())).unwrap();
        assert!(store.0.exists());
        drop(backend);

        let backend = RonBackend::open(&store.0).unwrap();
        let account = backend.get(42).unwrap().unwrap();
        assert_eq!(account.balance.to_string(), "7.25");
        similar_asserts::assert_eq!(
            account.history.iter().copied().collect::<Vec<_>>(),
            vec![entry(1, "10.50"), entry(2, "-3.25")],
        );
        assert_eq!(backend.get(-7).unwrap().unwrap().balance.to_string(), "100");
        assert!(backend.get(1).unwrap().is_none());
    }

    #[test]
    fn test_file_format() {
        let store = TempStore::new("format");

        let backend = RonBackend::open(&store.0).unwrap();
        backend.add_and_append(42, entry(1_700_000_000, "10.50")).unwrap();

        let serialized = fs::read_to_string(&store.0).unwrap();
        let parsed: StoreFile = ron::from_str(&serialized).unwrap();
        assert_eq!(parsed.version, STORE_VERSION);
        assert_eq!(parsed.accounts.len(), 1);
        assert!(serialized.contains(r#"balance: "10.50""#));
    }

    #[test]
    fn test_version_mismatch() {
        let store = TempStore::new("version");
        fs::write(&store.0, r#"(version: "0.0.1", accounts: [])"#).unwrap();

        assert!(matches!(
            RonBackend::open(&store.0),
            Err(StoreFileError::Version(version)) if version == "0.0.1"
        ));
    }

    #[test]
    fn test_failed_write_rolls_back() {
        let store = TempStore::new("rollback");
        let backend = RonBackend::open(&store.0).unwrap();
        backend.add_and_append(1, entry(1, "5")).unwrap();

        // Point the backend at a directory that does not exist.
        let backend = RonBackend {
            path: store.0.join("missing").join("ledger.ron"),
            ..backend
        };

        assert!(matches!(
            backend.add_and_append(1, entry(2, "5")),
            Err(BackendError::Persist(StoreFileError::Io(_)))
        ));
        assert!(matches!(
            backend.add_and_append(2, entry(2, "5")),
            Err(BackendError::Persist(_))
        ));

        let account = backend.get(1).unwrap().unwrap();
        assert_eq!(account.balance.to_string(), "5");
        assert_eq!(account.history.len(), 1);
        assert!(backend.get(2).unwrap().is_none());
    }

    #[test]
    fn test_reader_waits_for_write() {
        let store = TempStore::new("reader");
        let backend = RonBackend::open(&store.0).unwrap();
        backend.add_and_append(1, entry(1, "5")).unwrap();

        thread::scope(|scope| {
            // An in-flight mutation that is rolled back before the writer lock is released.
            let writer = backend.writer.lock();
            let previous = backend.memory.account(1);
            backend.memory.add_and_append(1, entry(2, "100")).unwrap();

            let reader = scope.spawn(|| backend.get(1).unwrap().unwrap());
            thread::sleep(Duration::from_millis(50));

            backend.memory.restore(1, previous);
            drop(writer);

            let account = reader.join().unwrap();
            assert_eq!(account.balance.to_string(), "5");
            assert_eq!(account.history.len(), 1);
        });
    }
}
