pub mod cascade;
pub mod clock;
pub mod cursor;
pub mod error;
pub mod messages;
pub mod migrations;
pub mod models;
pub mod reactions;
pub mod threads;
pub mod typing;
pub mod zones;

pub use clock::{Clock, ManualClock, SystemClock};
pub use cursor::Cursor;
pub use error::{ErrorKind, Result, StoreError};

use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::info;

/// How long a typing indicator stays live without a refresh.
pub const DEFAULT_TYPING_TTL: Duration = Duration::from_secs(5);
pub const DEFAULT_MAX_PAGE_SIZE: u32 = 200;

#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub typing_ttl: Duration,
    pub max_page_size: u32,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            typing_ttl: DEFAULT_TYPING_TTL,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }
}

/// Zone/thread/message store. Every public operation runs as a single
/// SQLite transaction on one serialized connection.
pub struct Database {
    conn: Mutex<Connection>,
    clock: Arc<dyn Clock>,
    options: StoreOptions,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with(path, Arc::new(SystemClock), StoreOptions::default())
    }

    pub fn open_with(path: &Path, clock: Arc<dyn Clock>, options: StoreOptions) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;

        let db = Self::init(conn, clock, options)?;
        info!("Database opened at {}", path.display());
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::open_in_memory_with(Arc::new(SystemClock), StoreOptions::default())
    }

    pub fn open_in_memory_with(clock: Arc<dyn Clock>, options: StoreOptions) -> Result<Self> {
        Self::init(Connection::open_in_memory()?, clock, options)
    }

    fn init(conn: Connection, clock: Arc<dyn Clock>, options: StoreOptions) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrations::run(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            clock,
            options,
        })
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }

    /// Run a read against the connection without opening a transaction.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock().map_err(|_| StoreError::LockPoisoned)?;
        f(&conn)
    }

    /// Run `f` inside one immediate transaction. Nothing is committed if `f`
    /// returns an error.
    pub fn with_tx<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let mut conn = self.conn.lock().map_err(|_| StoreError::LockPoisoned)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }

    pub(crate) fn clamp_limit(&self, limit: u32) -> usize {
        limit.clamp(1, self.options.max_page_size.max(1)) as usize
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;

    pub const START: i64 = 1_700_000_000_000;

    pub fn db() -> (Database, ManualClock) {
        let clock = ManualClock::new(START);
        let db = Database::open_in_memory_with(Arc::new(clock.clone()), StoreOptions::default())
            .unwrap();
        (db, clock)
    }

    pub fn tick(clock: &ManualClock) {
        clock.advance(Duration::from_millis(1));
    }
}
