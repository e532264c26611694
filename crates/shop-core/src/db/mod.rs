// ============================================================================
// CampaignDb - Embedded Document Store (redb)
// ============================================================================
// Whole-document JSON storage for campaign state. Each key holds one JSON
// document that is read and replaced as a unit inside a single transaction.
// Default paths: ~/.shopkeeper/campaign.redb for the client snapshot and
// ~/.shopkeeper/server.redb for the served document. Env overrides are
// resolved by RuntimeConfig. redb locks its file, so the two never share one.
// ============================================================================

pub mod types;

pub use types::{DbStats, DocumentInfo};

use anyhow::{anyhow, Result};
use redb::{Database, ReadableTable, TableDefinition};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

// Table definitions
const DOCUMENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("documents");
const DOCUMENT_META: TableDefinition<&str, i64> = TableDefinition::new("document_meta");

/// The server's authoritative campaign document
pub const SERVER_DOCUMENT_KEY: &str = "campaign:server";

/// The client's local campaign snapshot
pub const LOCAL_SNAPSHOT_KEY: &str = "campaign:local";

/// Embedded database holding campaign documents
pub struct CampaignDb {
    db: Database,
    path: PathBuf,
}

impl CampaignDb {
    /// Open (or create) the client database at the given path.
    /// If `path` is None, uses ~/.shopkeeper/campaign.redb
    pub fn open(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::open_at(p.to_path_buf()),
            None => Self::open_at(default_db_path("campaign.redb")?),
        }
    }

    /// Open (or create) the server database.
    /// If `path` is None, uses ~/.shopkeeper/server.redb
    pub fn open_server(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::open_at(p.to_path_buf()),
            None => Self::open_at(default_db_path("server.redb")?),
        }
    }

    fn open_at(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| anyhow!("Failed to create {}: {}", parent.display(), e))?;
        }

        info!("Opening database at: {}", db_path.display());

        let db = Database::create(&db_path)
            .map_err(|e| anyhow!("Failed to open database: {}", e))?;

        // Ensure tables exist by doing a write transaction
        let write_txn = db
            .begin_write()
            .map_err(|e| anyhow!("Failed to begin write: {}", e))?;
        {
            let _ = write_txn
                .open_table(DOCUMENTS)
                .map_err(|e| anyhow!("Failed to create documents table: {}", e))?;
            let _ = write_txn
                .open_table(DOCUMENT_META)
                .map_err(|e| anyhow!("Failed to create document_meta table: {}", e))?;
        }
        write_txn.commit().map_err(|e| anyhow!("Failed to commit init: {}", e))?;

        Ok(Self { db, path: db_path })
    }

    /// Get the database file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read a document. Unparseable content is treated as absent.
    pub fn read_document(&self, key: &str) -> Result<Option<Value>> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| anyhow!("Failed to begin read: {}", e))?;
        let table = read_txn
            .open_table(DOCUMENTS)
            .map_err(|e| anyhow!("Failed to open documents table: {}", e))?;

        match table
            .get(key)
            .map_err(|e| anyhow!("Failed to get document {}: {}", key, e))?
        {
            Some(bytes) => match serde_json::from_slice(bytes.value()) {
                Ok(document) => Ok(Some(document)),
                Err(e) => {
                    warn!("Stored document {} is not valid JSON ({}), ignoring it", key, e);
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    /// Replace a document as a whole
    pub fn write_document(&self, key: &str, document: &Value) -> Result<()> {
        let bytes = serde_json::to_vec(document)
            .map_err(|e| anyhow!("Failed to serialize document {}: {}", key, e))?;
        let now = chrono::Utc::now().timestamp();

        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| anyhow!("Failed to begin write: {}", e))?;
        {
            let mut table = write_txn
                .open_table(DOCUMENTS)
                .map_err(|e| anyhow!("Failed to open documents table: {}", e))?;
            table
                .insert(key, bytes.as_slice())
                .map_err(|e| anyhow!("Failed to insert document {}: {}", key, e))?;

            let mut meta = write_txn
                .open_table(DOCUMENT_META)
                .map_err(|e| anyhow!("Failed to open document_meta table: {}", e))?;
            meta.insert(key, now)
                .map_err(|e| anyhow!("Failed to stamp document {}: {}", key, e))?;
        }
        write_txn.commit().map_err(|e| anyhow!("Failed to commit: {}", e))?;

        debug!("Stored document {} ({} bytes)", key, bytes.len());
        Ok(())
    }

    pub fn delete_document(&self, key: &str) -> Result<bool> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| anyhow!("Failed to begin write: {}", e))?;
        let removed;
        {
            let mut table = write_txn
                .open_table(DOCUMENTS)
                .map_err(|e| anyhow!("Failed to open documents table: {}", e))?;
            removed = table
                .remove(key)
                .map_err(|e| anyhow!("Failed to remove document {}: {}", key, e))?
                .is_some();

            let mut meta = write_txn
                .open_table(DOCUMENT_META)
                .map_err(|e| anyhow!("Failed to open document_meta table: {}", e))?;
            meta.remove(key)
                .map_err(|e| anyhow!("Failed to remove stamp for {}: {}", key, e))?;
        }
        write_txn.commit().map_err(|e| anyhow!("Failed to commit delete: {}", e))?;

        if removed {
            debug!("Deleted document {}", key);
        }
        Ok(removed)
    }

    // ========================================================================
    // Statistics
    // ========================================================================

    pub fn stats(&self) -> Result<DbStats> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| anyhow!("Failed to begin read: {}", e))?;
        let table = read_txn
            .open_table(DOCUMENTS)
            .map_err(|e| anyhow!("Failed to open documents table: {}", e))?;
        let meta = read_txn
            .open_table(DOCUMENT_META)
            .map_err(|e| anyhow!("Failed to open document_meta table: {}", e))?;

        let mut documents = Vec::new();
        let iter = table
            .range::<&str>(..)
            .map_err(|e| anyhow!("Failed to iterate documents: {}", e))?;
        for entry in iter {
            let (key, value) = entry.map_err(|e| anyhow!("Failed to read entry: {}", e))?;
            let key = key.value().to_string();
            let updated_at = meta
                .get(key.as_str())
                .map_err(|e| anyhow!("Failed to read stamp for {}: {}", key, e))?
                .map(|stamp| stamp.value());
            documents.push(DocumentInfo {
                bytes: value.value().len(),
                key,
                updated_at,
            });
        }

        let total_bytes = documents.iter().map(|d| d.bytes).sum();
        Ok(DbStats {
            documents,
            total_bytes,
        })
    }

    /// Handle on one key, usable wherever a `DocumentStore` is expected
    pub fn document(self: &Arc<Self>, key: &'static str) -> DbDocument {
        DbDocument {
            db: Arc::clone(self),
            key,
        }
    }
}

fn default_db_path(file_name: &str) -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| anyhow!("Cannot determine home directory"))?;
    Ok(home.join(".shopkeeper").join(file_name))
}

// ============================================================================
// Document Store Seam
// ============================================================================

/// A single JSON document read and replaced as a whole
pub trait DocumentStore: Send + Sync {
    fn load(&self) -> Result<Option<Value>>;
    fn save(&self, document: &Value) -> Result<()>;
}

/// One key of a `CampaignDb`
#[derive(Clone)]
pub struct DbDocument {
    db: Arc<CampaignDb>,
    key: &'static str,
}

impl DocumentStore for DbDocument {
    fn load(&self) -> Result<Option<Value>> {
        self.db.read_document(self.key)
    }

    fn save(&self, document: &Value) -> Result<()> {
        self.db.write_document(self.key, document)
    }
}

/// Volatile store for tests and throwaway servers
#[derive(Default)]
pub struct MemoryDocumentStore {
    document: Mutex<Option<Value>>,
}

impl MemoryDocumentStore {
    pub fn new(document: Option<Value>) -> Self {
        Self {
            document: Mutex::new(document),
        }
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn load(&self) -> Result<Option<Value>> {
        let guard = self
            .document
            .lock()
            .map_err(|_| anyhow!("Document lock poisoned"))?;
        Ok(guard.clone())
    }

    fn save(&self, document: &Value) -> Result<()> {
        let mut guard = self
            .document
            .lock()
            .map_err(|_| anyhow!("Document lock poisoned"))?;
        *guard = Some(document.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn temp_db(name: &str) -> (CampaignDb, PathBuf) {
        let path = std::env::temp_dir().join(format!(
            "shopkeeper-test-{}-{}.redb",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);
        (CampaignDb::open(Some(&path)).unwrap(), path)
    }

    #[test]
    fn test_write_then_read_document() {
        let (db, path) = temp_db("rw");
        assert!(db.read_document(SERVER_DOCUMENT_KEY).unwrap().is_none());

        let doc = json!({ "schemaVersion": "1.0", "catalog": [], "locations": [] });
        db.write_document(SERVER_DOCUMENT_KEY, &doc).unwrap();
        assert_eq!(db.read_document(SERVER_DOCUMENT_KEY).unwrap(), Some(doc));
        assert!(db.read_document(LOCAL_SNAPSHOT_KEY).unwrap().is_none());

        drop(db);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_write_replaces_whole_document() {
        let (db, path) = temp_db("replace");
        db.write_document(LOCAL_SNAPSHOT_KEY, &json!({ "a": 1, "b": 2 })).unwrap();
        db.write_document(LOCAL_SNAPSHOT_KEY, &json!({ "c": 3 })).unwrap();
        assert_eq!(db.read_document(LOCAL_SNAPSHOT_KEY).unwrap(), Some(json!({ "c": 3 })));

        drop(db);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_stats_and_delete() {
        let (db, path) = temp_db("stats");
        db.write_document(SERVER_DOCUMENT_KEY, &json!({})).unwrap();
        db.write_document(LOCAL_SNAPSHOT_KEY, &json!([1, 2, 3])).unwrap();

        let stats = db.stats().unwrap();
        assert_eq!(stats.documents.len(), 2);
        assert!(stats.documents.iter().all(|d| d.updated_at.is_some()));
        assert_eq!(stats.total_bytes, 2 + 7);

        assert!(db.delete_document(SERVER_DOCUMENT_KEY).unwrap());
        assert!(!db.delete_document(SERVER_DOCUMENT_KEY).unwrap());
        assert_eq!(db.stats().unwrap().documents.len(), 1);

        drop(db);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_db_document_handle() {
        let (db, path) = temp_db("handle");
        let db = Arc::new(db);
        let store = db.document(SERVER_DOCUMENT_KEY);
        store.save(&json!({ "ok": true })).unwrap();
        assert_eq!(store.load().unwrap(), Some(json!({ "ok": true })));

        drop(store);
        drop(db);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_default_path_ignores_environment() {
        let path = default_db_path("campaign.redb").unwrap();
        assert!(path.ends_with(".shopkeeper/campaign.redb"));
        assert_ne!(path, PathBuf::from(""));
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryDocumentStore::default();
        assert!(store.load().unwrap().is_none());
        store.save(&json!({ "x": 1 })).unwrap();
        assert_eq!(store.load().unwrap(), Some(json!({ "x": 1 })));
    }
}
