//! Writer coordination
//!
//! [`TransactionCoordinator::run`] serializes index mutation:
//!
//! - across threads, through a per-index gate mutex;
//! - across processes, through an advisory lock on `<index>/.tantiny.lock`
//!   (persisted, non-exclusive indexes only);
//! - against uncoordinated writers, through Tantivy's own writer lock, which
//!   surfaces as [`SearchError::WriterBusy`].
//!
//! Transactions nest per thread: a `run` inside a `run` on the same thread just
//! calls its body, and the outermost call commits everything once.
//!
//! Every resource is held by a guard and released in reverse acquisition order
//! on all exit paths, including errors and panics. Work that was not committed
//! is rolled back before the writer is released.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use fs2::FileExt;
use parking_lot::Mutex;
use tantivy::{IndexWriter, TantivyDocument};
use tracing::{debug, warn};

use crate::error::{SearchError, SearchResult};

/// Name of the advisory lock file inside a persisted index directory
pub const LOCK_FILE_NAME: &str = ".tantiny.lock";

static NEXT_COORDINATOR_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    /// Coordinators the current thread is inside a transaction of
    static ACTIVE_TRANSACTIONS: RefCell<HashSet<u64>> = RefCell::new(HashSet::new());
}

/// Serializes writers of one index
pub struct TransactionCoordinator {
    id: u64,
    index: tantivy::Index,
    gate: Mutex<()>,
    lock_path: Option<PathBuf>,
    exclusive_writer: bool,
    writer_memory: usize,
    writer: Mutex<Option<IndexWriter>>,
    commits: AtomicU64,
}

impl TransactionCoordinator {
    /// Create the coordinator; in exclusive mode the writer is taken right away
    pub(crate) fn new(
        index: tantivy::Index,
        directory: Option<&Path>,
        writer_memory: usize,
        exclusive_writer: bool,
    ) -> SearchResult<Self> {
        let coordinator = Self {
            id: NEXT_COORDINATOR_ID.fetch_add(1, Ordering::Relaxed),
            index,
            gate: Mutex::new(()),
            lock_path: directory.map(|dir| dir.join(LOCK_FILE_NAME)),
            exclusive_writer,
            writer_memory,
            writer: Mutex::new(None),
            commits: AtomicU64::new(0),
        };

        if exclusive_writer {
            let writer = coordinator.open_writer()?;
            *coordinator.writer.lock() = Some(writer);
        }

        Ok(coordinator)
    }

    pub fn exclusive_writer(&self) -> bool {
        self.exclusive_writer
    }

    /// Number of successful commits made through this coordinator
    pub fn commits(&self) -> u64 {
        self.commits.load(Ordering::Acquire)
    }

    /// Whether the current thread is inside a transaction of this coordinator
    pub fn in_transaction(&self) -> bool {
        ACTIVE_TRANSACTIONS.with(|active| active.borrow().contains(&self.id))
    }

    /// Run `body` as one transaction and return its value
    ///
    /// The outermost call commits after `body` succeeds. If `body` or the
    /// commit fails, uncommitted work is rolled back and the error returned.
    pub fn run<T>(&self, body: impl FnOnce() -> SearchResult<T>) -> SearchResult<T> {
        if self.in_transaction() {
            return body();
        }

        let _gate = self.gate.lock();
        let _file_lock = match (&self.lock_path, self.exclusive_writer) {
            (Some(path), false) => Some(FileLock::acquire(path)?),
            _ => None,
        };
        // Declared before the lease so the writer goes before the flag is cleared
        let _active = ActiveFlag::set(self.id);
        let _lease = if self.exclusive_writer {
            None
        } else {
            Some(WriterLease::acquire(self)?)
        };
        let mut rollback = RollbackGuard {
            coordinator: self,
            armed: true,
        };

        debug!(coordinator = self.id, "Transaction started");

        let value = body()?;
        self.commit()?;
        rollback.armed = false;

        debug!(coordinator = self.id, commits = self.commits(), "Transaction committed");
        Ok(value)
    }

    /// Call `f` with the writer held by the current transaction
    pub(crate) fn with_writer<T>(&self, f: impl FnOnce(&IndexWriter) -> T) -> SearchResult<T> {
        let writer = self.writer.lock();
        let writer = writer.as_ref().ok_or(SearchError::WriterNotAcquired)?;
        Ok(f(writer))
    }

    fn open_writer(&self) -> SearchResult<IndexWriter> {
        let writer = self.index.writer::<TantivyDocument>(self.writer_memory)?;
        debug!(
            coordinator = self.id,
            memory = self.writer_memory,
            "Index writer acquired"
        );
        Ok(writer)
    }

    fn commit(&self) -> SearchResult<()> {
        let mut writer = self.writer.lock();
        let writer = writer.as_mut().ok_or(SearchError::WriterNotAcquired)?;
        writer.commit()?;
        self.commits.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    fn rollback(&self) {
        let mut writer = self.writer.lock();
        if let Some(writer) = writer.as_mut() {
            match writer.rollback() {
                Ok(_) => debug!(coordinator = self.id, "Transaction rolled back"),
                Err(e) => warn!(coordinator = self.id, error = %e, "Failed to roll back transaction"),
            }
        }
    }
}

impl std::fmt::Debug for TransactionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionCoordinator")
            .field("id", &self.id)
            .field("lock_path", &self.lock_path)
            .field("exclusive_writer", &self.exclusive_writer)
            .field("writer_memory", &self.writer_memory)
            .field("commits", &self.commits())
            .finish()
    }
}

/// Advisory lock shared with other processes using the same directory
struct FileLock {
    file: File,
    path: PathBuf,
}

impl FileLock {
    fn acquire(path: &Path) -> SearchResult<Self> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(path)?;
        file.lock_exclusive()?;

        debug!(path = %path.display(), "Lock file acquired");
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        match FileExt::unlock(&self.file) {
            Ok(()) => debug!(path = %self.path.display(), "Lock file released"),
            Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to release lock file"),
        }
    }
}

/// Writer taken for the length of one transaction
struct WriterLease<'a> {
    coordinator: &'a TransactionCoordinator,
}

impl<'a> WriterLease<'a> {
    fn acquire(coordinator: &'a TransactionCoordinator) -> SearchResult<Self> {
        let writer = coordinator.open_writer()?;
        *coordinator.writer.lock() = Some(writer);
        Ok(Self { coordinator })
    }
}

impl Drop for WriterLease<'_> {
    fn drop(&mut self) {
        // Dropping the writer waits for its indexing threads and frees the engine lock
        let writer = self.coordinator.writer.lock().take();
        drop(writer);
        debug!(coordinator = self.coordinator.id, "Index writer released");
    }
}

/// Discards uncommitted work unless disarmed after a successful commit
struct RollbackGuard<'a> {
    coordinator: &'a TransactionCoordinator,
    armed: bool,
}

impl Drop for RollbackGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.coordinator.rollback();
        }
    }
}

/// Marks the current thread as inside a transaction of one coordinator
struct ActiveFlag(u64);

impl ActiveFlag {
    fn set(id: u64) -> Self {
        ACTIVE_TRANSACTIONS.with(|active| active.borrow_mut().insert(id));
        Self(id)
    }
}

impl Drop for ActiveFlag {
    fn drop(&mut self) {
        ACTIVE_TRANSACTIONS.with(|active| active.borrow_mut().remove(&self.0));
    }
}
