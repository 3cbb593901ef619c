use super::backend::StorageBackend;
use super::rows::Tables;
use crate::error::{CatalogError, Result};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// In-memory storage backend.
///
/// Used by tests and by the server's `--in-memory` mode. Readers share the lock;
/// a transaction holds the write lock while it builds and swaps in the new
/// tables, so commits are atomic and serialized.
#[derive(Default)]
pub struct MemBackend {
    tables: RwLock<Tables>,
    commits: AtomicUsize,
    simulate_write_error: AtomicBool,
}

impl MemBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tables(tables: Tables) -> Self {
        Self {
            tables: RwLock::new(tables),
            ..Self::default()
        }
    }

    /// Enable write error simulation for testing error handling.
    pub fn set_simulate_write_error(&self, simulate: bool) {
        self.simulate_write_error.store(simulate, Ordering::SeqCst);
    }

    /// Number of transactions that published a new state.
    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    /// Copy of the committed tables.
    pub fn snapshot(&self) -> Tables {
        self.tables.read().clone()
    }
}

impl StorageBackend for MemBackend {
    fn read<R>(&self, f: impl FnOnce(&Tables) -> R) -> Result<R> {
        let tables = self.tables.read();
        Ok(f(&tables))
    }

    fn transact<R>(&self, f: impl FnOnce(&mut Tables) -> Result<R>) -> Result<R> {
        let mut tables = self.tables.write();
        if self.simulate_write_error.load(Ordering::SeqCst) {
            return Err(CatalogError::Store("Simulated write error".to_string()));
        }

        let mut working = tables.clone();
        let result = f(&mut working)?;
        *tables = working;
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(result)
    }
}
