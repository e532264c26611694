//! ============================================================================
//! Shop View - Player-facing read model
//! ============================================================================
//! Built only from a location's flat fields (`availableItemIds`,
//! `manualPrices`, `percentMarkup`), so it works for any document that
//! follows the compatibility contract, rule configs or not.
//! ============================================================================

use crate::rules::legacy_price;
use crate::types::{CampaignState, CatalogItem, LocationSummary, ShopLocation, ShopView, ShopViewItem};

/// Items a player sees at `location`. An empty `available_item_ids` means
/// the whole catalog is on offer.
pub fn build_location_shop_view(location: &ShopLocation, catalog: &[CatalogItem]) -> ShopView {
    let show_all = location.available_item_ids.is_empty();

    let items = catalog
        .iter()
        .filter(|item| show_all || location.available_item_ids.contains(&item.id))
        .map(|item| ShopViewItem {
            id: item.id.clone(),
            name: item.name.clone(),
            base_price: item.base_price,
            final_price: legacy_price(
                item.base_price,
                location.percent_markup,
                location.manual_prices.get(&item.id).copied(),
            ),
            weight: item.weight,
            category: item.category.clone(),
            notes: item.notes.clone(),
            tags: item.tags.clone(),
            legal_status: item.legal_status.clone(),
        })
        .collect();

    ShopView {
        location_id: location.id.clone(),
        location_name: location.name.clone(),
        items,
    }
}

/// Every location in the campaign, optionally limited to one setting
pub fn list_locations(campaign: &CampaignState, setting_id: Option<&str>) -> Vec<LocationSummary> {
    campaign
        .settings
        .iter()
        .filter(|setting| setting_id.map_or(true, |id| setting.id == id))
        .flat_map(|setting| {
            setting.locations.iter().map(move |location| LocationSummary {
                id: location.id.clone(),
                name: location.name.clone(),
                setting_id: setting.id.clone(),
            })
        })
        .collect()
}

/// Find a location anywhere in the campaign and build its view
pub fn shop_view_for(campaign: &CampaignState, location_id: &str) -> Option<ShopView> {
    campaign
        .find_location(location_id)
        .map(|(setting, location)| build_location_shop_view(location, &setting.catalog))
}
