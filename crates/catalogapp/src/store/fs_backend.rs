use super::backend::StorageBackend;
use super::rows::Tables;
use crate::error::{CatalogError, Result};
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// File-backed storage: both tables live in one JSON document.
///
/// Every commit rewrites the document through a temp file and a rename, so a
/// reader sees either the old or the new state, never a torn write. Writers in
/// this process are serialized by a mutex.
pub struct FsBackend {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FsBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_dir(&self, path: &Path) -> Result<()> {
        if !path.as_os_str().is_empty() && !path.exists() {
            fs::create_dir_all(path).map_err(CatalogError::Io)?;
        }
        Ok(())
    }

    fn load(&self) -> Result<Tables> {
        if !self.path.exists() {
            return Ok(Tables::default());
        }
        let content = fs::read_to_string(&self.path).map_err(CatalogError::Io)?;
        if content.trim().is_empty() {
            return Ok(Tables::default());
        }
        let tables: Tables =
            serde_json::from_str(&content).map_err(CatalogError::Serialization)?;
        Ok(tables)
    }

    fn save(&self, tables: &Tables) -> Result<()> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new(""));
        self.ensure_dir(dir)?;

        let content = serde_json::to_string_pretty(tables).map_err(CatalogError::Serialization)?;

        // Atomic write
        let tmp_file = dir.join(format!(".catalog-{}.tmp", Uuid::new_v4()));
        fs::write(&tmp_file, content).map_err(CatalogError::Io)?;
        if let Err(err) = fs::rename(&tmp_file, &self.path) {
            let _ = fs::remove_file(&tmp_file);
            return Err(CatalogError::Io(err));
        }

        Ok(())
    }
}

impl StorageBackend for FsBackend {
    fn read<R>(&self, f: impl FnOnce(&Tables) -> R) -> Result<R> {
        let tables = self.load()?;
        Ok(f(&tables))
    }

    fn transact<R>(&self, f: impl FnOnce(&mut Tables) -> Result<R>) -> Result<R> {
        let _guard = self.write_lock.lock();
        let mut tables = self.load()?;
        let result = f(&mut tables)?;
        self.save(&tables)?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_rename_removes_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        // A non-empty directory where the document should go makes the rename fail.
        let path = dir.path().join("catalog.json");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("occupied"), "x").unwrap();

        let backend = FsBackend::new(path.clone());
        assert!(matches!(
            backend.save(&Tables::default()),
            Err(CatalogError::Io(_))
        ));

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
