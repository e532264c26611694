//! ============================================================================
//! Catalog Import - Strict validation of catalog pack files
//! ============================================================================
//! Unlike the normalizer, imports are all-or-nothing: one bad item rejects
//! the whole pack with a fixed message the UI can show verbatim.
//! ============================================================================

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::types::{CatalogItem, ItemOrigin, ShopSetting};

/// User-facing rejection message
pub const INVALID_CATALOG_MESSAGE: &str =
    "Invalid catalog file. Expected schemaVersion and items[] with id, name, basePrice >= 0 and weight >= 0.";

/// Rejected import; `detail` is for logs
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{}", INVALID_CATALOG_MESSAGE)]
pub struct ImportError {
    pub detail: String,
}

impl ImportError {
    fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

/// Catalog pack file contents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogPack {
    pub schema_version: String,
    pub items: Vec<CatalogItem>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPack {
    schema_version: String,
    items: Vec<RawItem>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawItem {
    id: String,
    name: String,
    base_price: f64,
    weight: f64,
    category: Option<String>,
    notes: Option<String>,
    tags: Option<Vec<String>>,
    legal_status: Option<String>,
    source: Option<ItemOrigin>,
}

/// Parse and validate a catalog pack. Items without a `source` are tagged
/// as imported.
pub fn parse_catalog_pack(payload: &str) -> Result<CatalogPack, ImportError> {
    let raw: RawPack = serde_json::from_str(payload).map_err(|e| {
        warn!("Catalog pack rejected: {}", e);
        ImportError::new(e.to_string())
    })?;

    if raw.schema_version.is_empty() {
        return Err(ImportError::new("schemaVersion is empty"));
    }

    let items = raw
        .items
        .into_iter()
        .enumerate()
        .map(|(index, item)| validate_item(index, item))
        .collect::<Result<Vec<_>, _>>()
        .inspect_err(|e| warn!("Catalog pack rejected: {}", e.detail))?;

    info!("Catalog pack accepted: {} items", items.len());
    Ok(CatalogPack {
        schema_version: raw.schema_version,
        items,
    })
}

fn validate_item(index: usize, raw: RawItem) -> Result<CatalogItem, ImportError> {
    if raw.id.is_empty() {
        return Err(ImportError::new(format!("items[{}].id is empty", index)));
    }
    if raw.name.is_empty() {
        return Err(ImportError::new(format!("items[{}].name is empty", index)));
    }
    if !(raw.base_price.is_finite() && raw.base_price >= 0.0) {
        return Err(ImportError::new(format!("items[{}].basePrice must be >= 0", index)));
    }
    if !(raw.weight.is_finite() && raw.weight >= 0.0) {
        return Err(ImportError::new(format!("items[{}].weight must be >= 0", index)));
    }

    Ok(CatalogItem {
        id: raw.id,
        name: raw.name,
        base_price: raw.base_price,
        weight: raw.weight,
        category: raw.category,
        notes: raw.notes,
        tags: raw.tags.unwrap_or_default(),
        legal_status: raw.legal_status,
        origin: raw.source.unwrap_or(ItemOrigin::Imported),
    })
}

/// Export a setting's catalog in the same schema the importer reads
pub fn export_catalog(setting: &ShopSetting) -> CatalogPack {
    CatalogPack {
        schema_version: crate::types::LEGACY_SCHEMA_VERSION.to_string(),
        items: setting.catalog.clone(),
    }
}
