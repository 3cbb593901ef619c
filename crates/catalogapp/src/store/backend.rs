use super::rows::Tables;
use crate::error::Result;

/// Abstract interface for the transactional row store.
///
/// This trait handles the "how" of persistence (memory vs a file on disk),
/// while [`super::session::Session`] handles the "what" (repositories,
/// staging, integrity checks).
pub trait StorageBackend {
    /// Run `f` against a consistent snapshot of the committed tables.
    fn read<R>(&self, f: impl FnOnce(&Tables) -> R) -> Result<R>;

    /// Run `f` against a working copy of the tables inside one transaction.
    ///
    /// If `f` returns `Ok`, the working copy becomes the committed state in a
    /// single step. If it returns `Err`, nothing is published.
    /// Concurrent transactions are serialized.
    fn transact<R>(&self, f: impl FnOnce(&mut Tables) -> Result<R>) -> Result<R>;
}
