//! ============================================================================
//! Campaign Store - Authoritative in-memory campaign state
//! ============================================================================
//! Queries and mutations over one normalized campaign. Edits target the
//! active setting, except setting creation and the location-id uniqueness
//! check, which span the whole campaign. Invalid targets are reported with
//! `false`/`None`, never with a panic or error.
//!
//! Each mutation bumps a revision published on a `watch` channel so UI
//! layers can re-render without the store knowing about them.
//! ============================================================================

use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::ids::{slugify, unique_id};
use super::normalize::{normalize_campaign_with, SettingTemplate};
use crate::rules::preview_location;
use crate::types::{
    default_share_columns, CampaignState, CatalogItem, ItemOrigin, PreviewItem, RuleConfig,
    ShopLocation, ShopSetting, SHARE_COLUMN_NAMES,
};

/// Campaign state plus sync status flags
pub struct CampaignStore {
    campaign: CampaignState,
    is_syncing: bool,
    sync_error: Option<String>,
    revision: watch::Sender<u64>,
}

impl CampaignStore {
    /// Wrap a campaign. One with no settings gets the built-in setting.
    pub fn new(campaign: CampaignState) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            campaign: with_setting(campaign),
            is_syncing: false,
            sync_error: None,
            revision,
        }
    }

    /// Restore from a persisted snapshot, seeding the built-in setting when
    /// there is nothing usable
    pub fn from_snapshot(snapshot: Option<&Value>) -> Self {
        let campaign = normalize_campaign_with(snapshot.unwrap_or(&Value::Null), &SettingTemplate::built_in());
        info!(
            "Campaign loaded: {} settings, {} locations",
            campaign.settings.len(),
            campaign.location_count()
        );
        Self::new(campaign)
    }

    /// Canonical JSON for persistence
    pub fn snapshot(&self) -> serde_json::Result<Value> {
        serde_json::to_value(&self.campaign)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn campaign(&self) -> &CampaignState {
        &self.campaign
    }

    pub fn active_setting(&self) -> &ShopSetting {
        // In bounds: `new` and `replace_campaign` keep at least one setting
        &self.campaign.settings[self.campaign.active_setting_index()]
    }

    pub fn location(&self, location_id: &str) -> Option<&ShopLocation> {
        self.active_setting().location(location_id)
    }

    /// Rule-based preview for a location of the active setting
    pub fn preview_location(&self, location_id: &str) -> Option<Vec<PreviewItem>> {
        let setting = self.active_setting();
        setting
            .location(location_id)
            .map(|location| preview_location(&setting.catalog, location))
    }

    pub fn is_syncing(&self) -> bool {
        self.is_syncing
    }

    pub fn sync_error(&self) -> Option<&str> {
        self.sync_error.as_deref()
    }

    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    /// Receiver that changes on every mutation
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    // ========================================================================
    // Settings
    // ========================================================================

    /// Create an empty setting and make it active. Returns the new id.
    pub fn add_setting(&mut self, name: &str) -> String {
        let base = match slugify(name) {
            slug if slug.is_empty() => format!("setting-{}", self.campaign.settings.len() + 1),
            slug => slug,
        };
        let id = unique_id(&base, |candidate| {
            self.campaign.settings.iter().any(|s| s.id == candidate)
        });
        let display = match name.trim() {
            "" => "New Setting",
            trimmed => trimmed,
        };

        self.campaign.settings.push(ShopSetting::new(id.clone(), display));
        self.campaign.active_setting_id = id.clone();
        info!("Added setting {} and switched to it", id);
        self.touch();
        id
    }

    pub fn set_active_setting(&mut self, setting_id: &str) -> bool {
        if !self.campaign.settings.iter().any(|s| s.id == setting_id) {
            warn!("Cannot activate unknown setting {}", setting_id);
            return false;
        }
        self.campaign.active_setting_id = setting_id.to_string();
        self.touch();
        true
    }

    // ========================================================================
    // Locations
    // ========================================================================

    /// Add a location with default rules. Ids are unique across all settings.
    pub fn add_location(&mut self, name: &str) -> String {
        let base = match slugify(name) {
            slug if slug.is_empty() => "location".to_string(),
            slug => slug,
        };
        let id = unique_id(&base, |candidate| self.campaign.has_location_id(candidate));
        let display = match name.trim() {
            "" => "New Location",
            trimmed => trimmed,
        };

        self.active_setting_mut()
            .locations
            .push(ShopLocation::new(id.clone(), display));
        info!("Added location {}", id);
        self.touch();
        id
    }

    pub fn remove_location(&mut self, location_id: &str) -> bool {
        let locations = &mut self.active_setting_mut().locations;
        let before = locations.len();
        locations.retain(|l| l.id != location_id);
        let removed = locations.len() != before;
        if removed {
            info!("Removed location {}", location_id);
            self.touch();
        }
        removed
    }

    pub fn rename_location(&mut self, location_id: &str, name: &str) -> bool {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return false;
        }
        let renamed = self
            .location_mut(location_id)
            .map(|location| location.name = trimmed.to_string())
            .is_some();
        if renamed {
            self.touch();
        }
        renamed
    }

    /// Replace a location's rules with `updater(current)`
    pub fn set_location_rules<F>(&mut self, location_id: &str, updater: F) -> bool
    where
        F: FnOnce(RuleConfig) -> RuleConfig,
    {
        let Some(location) = self.location_mut(location_id) else {
            debug!("Rule edit for unknown location {}", location_id);
            return false;
        };
        let current = std::mem::take(&mut location.rules);
        location.rules = updater(current);
        debug!("Updated rules for location {}", location_id);
        self.touch();
        true
    }

    /// Player-view columns, restricted to known names; empty restores defaults
    pub fn set_share_columns(&mut self, location_id: &str, columns: &[String]) -> bool {
        let mut picked: Vec<String> = Vec::new();
        for column in columns {
            if SHARE_COLUMN_NAMES.contains(&column.as_str()) && !picked.contains(column) {
                picked.push(column.clone());
            }
        }
        if picked.is_empty() {
            picked = default_share_columns();
        }

        let updated = self
            .location_mut(location_id)
            .map(|location| location.share_columns = picked)
            .is_some();
        if updated {
            self.touch();
        }
        updated
    }

    // ========================================================================
    // Catalog
    // ========================================================================

    /// Append an item; refused when the id already exists in the catalog
    pub fn add_catalog_item(&mut self, item: CatalogItem) -> bool {
        let catalog = &mut self.active_setting_mut().catalog;
        if catalog.iter().any(|existing| existing.id == item.id) {
            warn!("Catalog already has an item with id {}", item.id);
            return false;
        }
        debug!("Added catalog item {}", item.id);
        catalog.push(item);
        self.touch();
        true
    }

    /// Edit a non-built-in item in place. The id is kept.
    pub fn update_catalog_item<F>(&mut self, item_id: &str, updater: F) -> bool
    where
        F: FnOnce(CatalogItem) -> CatalogItem,
    {
        let catalog = &mut self.active_setting_mut().catalog;
        let Some(slot) = catalog.iter_mut().find(|i| i.id == item_id) else {
            return false;
        };
        if slot.is_built_in() {
            warn!("Refusing to edit built-in item {}", item_id);
            return false;
        }
        let mut next = updater(slot.clone());
        next.id = slot.id.clone();
        *slot = next;
        self.touch();
        true
    }

    /// Copy an item into a custom one with id `custom-{id}` (suffixed on
    /// collision). Returns the new id.
    pub fn clone_catalog_item_to_custom(&mut self, item_id: &str) -> Option<String> {
        let catalog = &mut self.active_setting_mut().catalog;
        let original = catalog.iter().find(|i| i.id == item_id)?.clone();

        let base = format!("custom-{}", original.id);
        let id = unique_id(&base, |candidate| catalog.iter().any(|i| i.id == candidate));
        let copy = CatalogItem {
            id: id.clone(),
            origin: ItemOrigin::Custom,
            ..original
        };
        catalog.push(copy);
        info!("Cloned catalog item {} into {}", item_id, id);
        self.touch();
        Some(id)
    }

    /// Delete an item; built-in items are refused
    pub fn delete_catalog_item(&mut self, item_id: &str) -> bool {
        let catalog = &mut self.active_setting_mut().catalog;
        let Some(position) = catalog.iter().position(|i| i.id == item_id) else {
            return false;
        };
        if catalog[position].is_built_in() {
            warn!("Refusing to delete built-in item {}", item_id);
            return false;
        }
        catalog.remove(position);
        info!("Deleted catalog item {}", item_id);
        self.touch();
        true
    }

    /// Merge a validated import into the active catalog. Items without an
    /// explicit origin are tagged imported; built-ins are never replaced.
    /// Returns how many items were added or replaced.
    pub fn import_catalog(&mut self, items: Vec<CatalogItem>) -> usize {
        let catalog = &mut self.active_setting_mut().catalog;
        let mut merged = 0;

        for item in items {
            match catalog.iter_mut().find(|existing| existing.id == item.id) {
                Some(existing) if existing.is_built_in() => {
                    debug!("Import skipped built-in item {}", item.id);
                }
                Some(existing) => {
                    *existing = item;
                    merged += 1;
                }
                None => {
                    catalog.push(item);
                    merged += 1;
                }
            }
        }

        info!("Imported {} catalog items", merged);
        if merged > 0 {
            self.touch();
        }
        merged
    }

    // ========================================================================
    // Sync Plumbing
    // ========================================================================

    /// Swap in a whole campaign (pull results)
    pub fn replace_campaign(&mut self, campaign: CampaignState) {
        self.campaign = with_setting(campaign);
        self.touch();
    }

    pub(crate) fn begin_sync(&mut self) {
        self.is_syncing = true;
        self.sync_error = None;
    }

    pub(crate) fn finish_sync(&mut self, error: Option<String>) {
        self.is_syncing = false;
        self.sync_error = error;
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn active_setting_mut(&mut self) -> &mut ShopSetting {
        let index = self.campaign.active_setting_index();
        &mut self.campaign.settings[index]
    }

    fn location_mut(&mut self, location_id: &str) -> Option<&mut ShopLocation> {
        self.active_setting_mut()
            .locations
            .iter_mut()
            .find(|l| l.id == location_id)
    }

    fn touch(&mut self) {
        self.revision.send_modify(|rev| *rev += 1);
    }
}

/// Seed the built-in setting into a campaign that has none
fn with_setting(mut campaign: CampaignState) -> CampaignState {
    if campaign.settings.is_empty() {
        warn!("Campaign has no settings, seeding the built-in setting");
        let setting = SettingTemplate::built_in().to_setting();
        campaign.active_setting_id = setting.id.clone();
        campaign.settings.push(setting);
    }
    campaign
}

impl Default for CampaignStore {
    fn default() -> Self {
        Self::from_snapshot(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::edits;
    use crate::types::PriceSource;

    fn lockpick() -> CatalogItem {
        CatalogItem::new("custom-lockpick-set", "Lockpick Set", 120.0, 0.5)
            .with_category("tool")
            .with_tags(&["restricted", "tool"])
            .with_legal_status("restricted")
    }

    #[test]
    fn test_default_store_has_built_in_setting() {
        let store = CampaignStore::default();
        assert_eq!(store.campaign().settings.len(), 1);
        assert_eq!(store.active_setting().catalog.len(), 3);
        assert!(!store.is_syncing());
        assert!(store.sync_error().is_none());
    }

    #[test]
    fn test_add_location_slugifies_and_suffixes() {
        let mut store = CampaignStore::default();
        assert_eq!(store.add_location("Riverfall"), "riverfall");
        assert_eq!(store.add_location("Riverfall"), "riverfall-2");
        assert_eq!(store.add_location("   "), "location");
        assert_eq!(store.location("location").map(|l| l.name.as_str()), Some("New Location"));
    }

    #[test]
    fn test_location_ids_unique_across_settings() {
        let mut store = CampaignStore::default();
        store.add_location("Riverfall");
        store.add_setting("Noir City");
        assert_eq!(store.add_location("Riverfall"), "riverfall-2");
        assert_eq!(store.active_setting().locations.len(), 1);
    }

    fn empty_campaign() -> CampaignState {
        CampaignState {
            schema_version: "2.0".into(),
            active_setting_id: "gone".into(),
            settings: Vec::new(),
        }
    }

    #[test]
    fn test_new_seeds_setting_into_empty_campaign() {
        let mut store = CampaignStore::new(empty_campaign());
        assert_eq!(store.campaign().settings.len(), 1);
        assert_eq!(store.active_setting().id, store.campaign().active_setting_id);
        assert_eq!(store.add_location("Riverfall"), "riverfall");
        assert!(store.location("riverfall").is_some());
    }

    #[test]
    fn test_replace_campaign_keeps_a_setting() {
        let mut store = CampaignStore::default();
        store.replace_campaign(empty_campaign());
        assert_eq!(store.active_setting().catalog.len(), 3);
        assert!(store.add_catalog_item(lockpick()));
    }

    #[test]
    fn test_rename_location() {
        let mut store = CampaignStore::default();
        let id = store.add_location("Downtown");
        assert!(store.rename_location(&id, "  Old Town  "));
        assert_eq!(store.location(&id).unwrap().name, "Old Town");
        assert_eq!(store.location(&id).unwrap().id, id);

        let revision = store.revision();
        assert!(!store.rename_location(&id, "   "));
        assert_eq!(store.location(&id).unwrap().name, "Old Town");
        assert!(!store.rename_location("ghost", "Nowhere"));
        assert_eq!(store.revision(), revision);
    }

    #[test]
    fn test_remove_location() {
        let mut store = CampaignStore::default();
        let downtown = store.add_location("Downtown");
        store.add_location("The Strip");
        assert!(store.remove_location(&downtown));
        assert!(!store.remove_location(&downtown));
        let ids: Vec<_> = store.active_setting().locations.iter().map(|l| l.id.clone()).collect();
        assert_eq!(ids, vec!["the-strip".to_string()]);
    }

    #[test]
    fn test_set_location_rules_applies_transform() {
        let mut store = CampaignStore::default();
        let id = store.add_location("Downtown");
        assert!(store.set_location_rules(&id, |r| edits::with_markup(edits::toggle_include_category(r, "tool"), 15.0)));
        let rules = &store.location(&id).unwrap().rules;
        assert_eq!(rules.include_categories, vec!["tool".to_string()]);
        assert_eq!(rules.markup_percent, 15.0);
        assert!(!store.set_location_rules("ghost", |r| r));
    }

    #[test]
    fn test_add_setting_switches_active() {
        let mut store = CampaignStore::default();
        assert_eq!(store.add_setting("70s Vegas"), "70s-vegas");
        assert_eq!(store.campaign().active_setting_id, "70s-vegas");
        assert!(store.active_setting().catalog.is_empty());
        assert_eq!(store.add_setting("70s Vegas"), "70s-vegas-2");
        assert_eq!(store.add_setting(""), "setting-4");
        assert!(store.set_active_setting("default-setting"));
        assert!(!store.set_active_setting("ghost"));
    }

    #[test]
    fn test_catalog_edits() {
        let mut store = CampaignStore::default();
        assert!(store.add_catalog_item(lockpick()));
        assert!(!store.add_catalog_item(lockpick()));
        assert!(!store.delete_catalog_item("vegas-snub-revolver"));

        let clone = store.clone_catalog_item_to_custom("vegas-snub-revolver").unwrap();
        assert_eq!(clone, "custom-vegas-snub-revolver");
        let again = store.clone_catalog_item_to_custom("vegas-snub-revolver").unwrap();
        assert_eq!(again, "custom-vegas-snub-revolver-2");
        assert!(store.delete_catalog_item(&clone));
        assert!(!store.delete_catalog_item("ghost"));
        assert!(store.clone_catalog_item_to_custom("ghost").is_none());
    }

    #[test]
    fn test_update_catalog_item_refuses_built_in() {
        let mut store = CampaignStore::default();
        store.add_catalog_item(lockpick());
        assert!(store.update_catalog_item("custom-lockpick-set", |mut i| {
            i.base_price = 150.0;
            i.id = "renamed".into();
            i
        }));
        let item = store.active_setting().item("custom-lockpick-set").unwrap();
        assert_eq!(item.base_price, 150.0);
        assert!(!store.update_catalog_item("vegas-wiretap-kit", |i| i));
    }

    #[test]
    fn test_import_catalog_merges() {
        let mut store = CampaignStore::default();
        let imported = vec![
            lockpick().with_origin(ItemOrigin::Imported),
            CatalogItem::new("vegas-snub-revolver", "Knockoff", 1.0, 1.0),
        ];
        assert_eq!(store.import_catalog(imported), 1);
        assert_eq!(store.active_setting().catalog.len(), 4);
        assert_eq!(store.active_setting().item("vegas-snub-revolver").unwrap().name, "Snub Revolver");
    }

    #[test]
    fn test_share_columns_filtered() {
        let mut store = CampaignStore::default();
        let id = store.add_location("Downtown");
        let columns = vec!["notes".to_string(), "bogus".to_string(), "notes".to_string(), "name".to_string()];
        assert!(store.set_share_columns(&id, &columns));
        assert_eq!(store.location(&id).unwrap().share_columns, vec!["notes".to_string(), "name".to_string()]);
        assert!(store.set_share_columns(&id, &[]));
        assert_eq!(store.location(&id).unwrap().share_columns, default_share_columns());
    }

    #[test]
    fn test_preview_location_uses_active_catalog() {
        let mut store = CampaignStore::default();
        store.add_catalog_item(lockpick());
        let id = store.add_location("Downtown");
        store.set_location_rules(&id, |r| RuleConfig {
            include_categories: vec!["tool".into()],
            pinned_item_ids: vec!["vegas-wiretap-kit".into()],
            ..r
        });
        let preview = store.preview_location(&id).unwrap();
        assert_eq!(preview.len(), 2);
        assert_eq!(preview[0].id, "custom-lockpick-set");
        assert_eq!(preview[1].source, PriceSource::Pinned);
        assert!(store.preview_location("ghost").is_none());
    }

    #[test]
    fn test_mutations_bump_revision() {
        let mut store = CampaignStore::default();
        let rx = store.subscribe();
        let start = store.revision();
        store.add_location("Downtown");
        assert_eq!(store.revision(), start + 1);
        assert!(rx.has_changed().unwrap());
        store.remove_location("ghost");
        assert_eq!(store.revision(), start + 1);
    }

    #[test]
    fn test_snapshot_is_canonical_document() {
        let mut store = CampaignStore::default();
        store.add_location("Downtown");
        let snapshot = store.snapshot().unwrap();
        assert_eq!(snapshot["schemaVersion"], "2.0");
        assert_eq!(snapshot["settings"][0]["locations"][0]["id"], "downtown");
    }

    #[test]
    fn test_snapshot_round_trips_through_normalizer() {
        let mut store = CampaignStore::default();
        store.add_location("Downtown");
        store.add_setting("Noir");
        let restored = CampaignStore::from_snapshot(Some(&store.snapshot().unwrap()));
        assert_eq!(restored.campaign(), store.campaign());
    }
}
