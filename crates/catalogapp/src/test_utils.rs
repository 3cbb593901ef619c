use crate::api::CatalogApi;
use crate::store::fs_backend::FsBackend;
use std::path::PathBuf;
use tempfile::TempDir;

/// A catalog backed by a JSON file in a fresh temp directory.
pub struct TestEnv {
    // Kept so the directory outlives the test.
    pub _temp_dir: TempDir,
    pub api: CatalogApi<FsBackend>,
    pub data_file: PathBuf,
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl TestEnv {
    pub fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("failed to create temp dir");
        let data_file = temp_dir.path().join("catalog.json");
        let api = CatalogApi::new(FsBackend::new(data_file.clone()));
        Self {
            _temp_dir: temp_dir,
            api,
            data_file,
        }
    }

    /// A second facade over the same file, as a restarted process would see it.
    pub fn reopen(&self) -> CatalogApi<FsBackend> {
        CatalogApi::with_policy(FsBackend::new(self.data_file.clone()), self.api.policy())
    }
}
