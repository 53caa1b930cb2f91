//! Test fixture creation for the catalog and session databases

use anyhow::Result;
use moodreel_server::catalog_loader::{load_catalog, LoadReport};
use moodreel_server::catalog_store::SqliteCatalogStore;
use moodreel_server::session_store::SqliteSessionStore;
use tempfile::TempDir;

/// Movie metadata CSV embedded at compile time
const TEST_CATALOG_CSV: &str = include_str!("../fixtures/movies.csv");

pub struct TestDatabases {
    pub dir: TempDir,
    pub catalog_store: SqliteCatalogStore,
    pub session_store: SqliteSessionStore,
    pub load_report: LoadReport,
}

/// Creates a temporary db dir with the fixture catalog loaded through the
/// CSV loader and an empty sessions database.
pub fn create_test_databases() -> Result<TestDatabases> {
    let dir = TempDir::new()?;

    let catalog_store = SqliteCatalogStore::new(dir.path().join("catalog.db"), 2)?;
    let load_report = load_catalog(TEST_CATALOG_CSV.as_bytes(), &catalog_store)?;
    let session_store = SqliteSessionStore::new(dir.path().join("sessions.db"))?;

    Ok(TestDatabases {
        dir,
        catalog_store,
        session_store,
        load_report,
    })
}
