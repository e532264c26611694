//! ============================================================================
//! Push Payload - Canonical document plus flat compatibility view
//! ============================================================================
//! Both views are derived from the one canonical `CampaignState` at push
//! time. The flat `catalog`/`locations` pair mirrors the active setting for
//! consumers that predate settings and rule configs.
//! ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

use super::SyncError;
use crate::rules::preview_location;
use crate::types::{CampaignState, CatalogItem, ShopLocation, ShopSetting};

/// Wire shape of a pushed campaign
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncPayload {
    pub schema_version: String,
    pub active_setting_id: String,
    pub settings: Vec<ShopSetting>,
    pub catalog: Vec<CatalogItem>,
    pub locations: Vec<ShopLocation>,
}

/// Bake a location's rule preview into its flat fields. Markup is already
/// inside the computed prices, so `percent_markup` becomes 0.
pub fn derive_legacy_fields(location: &ShopLocation, catalog: &[CatalogItem]) -> ShopLocation {
    let preview = preview_location(catalog, location);
    if widens_to_whole_catalog(preview.len(), catalog) {
        warn!(
            "Location {} stocks nothing under its rules; flat consumers will show the whole catalog",
            location.id
        );
    }

    let available_item_ids = preview.iter().map(|item| item.id.clone()).collect();
    let manual_prices: BTreeMap<String, f64> = preview
        .into_iter()
        .map(|item| (item.id, item.final_price))
        .collect();

    ShopLocation {
        available_item_ids,
        manual_prices,
        percent_markup: 0.0,
        ..location.clone()
    }
}

/// An empty flat availability list means "everything" to the player view
pub fn widens_to_whole_catalog(preview_len: usize, catalog: &[CatalogItem]) -> bool {
    preview_len == 0 && !catalog.is_empty()
}

fn refresh_setting(setting: &ShopSetting) -> ShopSetting {
    ShopSetting {
        locations: setting
            .locations
            .iter()
            .map(|location| derive_legacy_fields(location, &setting.catalog))
            .collect(),
        ..setting.clone()
    }
}

/// Serialize the campaign with both views populated
pub fn build_push_payload(campaign: &CampaignState) -> Result<Value, SyncError> {
    let settings: Vec<ShopSetting> = campaign.settings.iter().map(refresh_setting).collect();

    let active_index = campaign.active_setting_index();
    let (catalog, locations) = settings
        .get(active_index)
        .map(|active| (active.catalog.clone(), active.locations.clone()))
        .unwrap_or_default();

    let payload = SyncPayload {
        schema_version: campaign.schema_version.clone(),
        active_setting_id: campaign.active_setting_id.clone(),
        settings,
        catalog,
        locations,
    };

    serde_json::to_value(&payload).map_err(|e| SyncError::Encode(e.to_string()))
}
