//! ============================================================================
//! SHOP-CORE: Campaign Shop Engine
//! ============================================================================
//! This crate handles all backend logic for the Shopkeeper campaign helper:
//! - Rule-based shop inventory (matcher, pricing pipeline, preview builder)
//! - Campaign schema normalization and the in-memory campaign store
//! - Pull/push synchronization with the GM's document server
//! - The LAN document server itself, backed by an embedded redb file
//! ============================================================================

pub mod campaign;
pub mod catalog_import;
pub mod config;
pub mod db;
pub mod presets;
pub mod rules;
pub mod server;
pub mod shop_view;
pub mod sync;
pub mod types;

// Re-export main types for convenience
pub use types::*;
pub use campaign::CampaignStore;
pub use catalog_import::{export_catalog, parse_catalog_pack, CatalogPack, ImportError};
pub use config::RuntimeConfig;
pub use db::{CampaignDb, DocumentStore, LOCAL_SNAPSHOT_KEY, SERVER_DOCUMENT_KEY};
pub use server::CampaignServer;
pub use sync::{HttpCampaignRemote, PullOutcome, SyncController, SyncError};
