//! ============================================================================
//! Campaign Normalizer - Any JSON in, canonical campaign out
//! ============================================================================
//! Total function over `serde_json::Value`: garbage, partial and legacy
//! documents all come out as a structurally valid "2.0" campaign with at
//! least one setting. Nothing here returns an error; bad fields fall back
//! to defaults and unusable entries are dropped with a `debug!`.
//!
//! ```text
//! not an object ───────────────────────────► template setting
//! schemaVersion "2.0" + settings[] ────────► normalize each setting
//! anything else (catalog[] / locations[]) ─► wrap into template setting
//! ```
//! ============================================================================

use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

use crate::presets::{built_in_catalog, BUILT_IN_SETTING_NAME, DEFAULT_SETTING_ID};
use crate::types::{
    default_share_columns, CampaignState, CatalogItem, ItemOrigin, PricingProfile, Rounding,
    RuleConfig, ShopLocation, ShopSetting, CANONICAL_SCHEMA_VERSION,
};

const DEFAULT_SETTING_NAME: &str = "Default Setting";
const DEFAULT_LOCATION_NAME: &str = "New Location";

/// The setting synthesized when a document carries none
#[derive(Debug, Clone)]
pub struct SettingTemplate {
    pub id: String,
    pub name: String,
    /// Used when the document has no catalog of its own
    pub catalog: Vec<CatalogItem>,
}

impl SettingTemplate {
    /// "Default Setting" with an empty catalog
    pub fn generic() -> Self {
        Self {
            id: DEFAULT_SETTING_ID.to_string(),
            name: DEFAULT_SETTING_NAME.to_string(),
            catalog: Vec::new(),
        }
    }

    /// "70s Vegas" seeded with the built-in catalog, used by clients
    pub fn built_in() -> Self {
        Self {
            id: DEFAULT_SETTING_ID.to_string(),
            name: BUILT_IN_SETTING_NAME.to_string(),
            catalog: built_in_catalog(),
        }
    }

    pub(crate) fn to_setting(&self) -> ShopSetting {
        ShopSetting {
            id: self.id.clone(),
            name: self.name.clone(),
            catalog: self.catalog.clone(),
            locations: Vec::new(),
        }
    }
}

impl Default for SettingTemplate {
    fn default() -> Self {
        Self::generic()
    }
}

/// Normalize with the generic template
pub fn normalize_campaign(raw: &Value) -> CampaignState {
    normalize_campaign_with(raw, &SettingTemplate::generic())
}

/// Normalize, synthesizing `template` wherever a setting is missing
pub fn normalize_campaign_with(raw: &Value, template: &SettingTemplate) -> CampaignState {
    let Some(doc) = raw.as_object() else {
        debug!("Campaign document is not an object, using default setting");
        return single_setting(template.to_setting());
    };

    let is_canonical = doc.get("schemaVersion").and_then(Value::as_str) == Some(CANONICAL_SCHEMA_VERSION);
    if let (true, Some(settings)) = (is_canonical, doc.get("settings").and_then(Value::as_array)) {
        return normalize_canonical(doc, settings, template);
    }

    debug!("Upgrading flat campaign document to schema {}", CANONICAL_SCHEMA_VERSION);
    let mut setting = template.to_setting();
    let catalog = normalize_catalog(doc.get("catalog"));
    if !catalog.is_empty() {
        setting.catalog = catalog;
    }
    setting.locations = normalize_locations(doc.get("locations"));
    single_setting(setting)
}

fn single_setting(setting: ShopSetting) -> CampaignState {
    CampaignState {
        schema_version: CANONICAL_SCHEMA_VERSION.to_string(),
        active_setting_id: setting.id.clone(),
        settings: vec![setting],
    }
}

fn normalize_canonical(
    doc: &Map<String, Value>,
    raw_settings: &[Value],
    template: &SettingTemplate,
) -> CampaignState {
    let settings: Vec<ShopSetting> = raw_settings
        .iter()
        .enumerate()
        .map(|(index, raw)| normalize_setting(raw, index))
        .collect();

    if settings.is_empty() {
        return single_setting(template.to_setting());
    }

    let fallback_active = settings[0].id.clone();
    let active_setting_id = doc
        .get("activeSettingId")
        .and_then(Value::as_str)
        .filter(|id| settings.iter().any(|s| s.id == *id))
        .map(str::to_string)
        .unwrap_or(fallback_active);

    CampaignState {
        schema_version: CANONICAL_SCHEMA_VERSION.to_string(),
        active_setting_id,
        settings,
    }
}

/// Missing id becomes `setting-{n}` (1-based position)
pub fn normalize_setting(raw: &Value, index: usize) -> ShopSetting {
    let obj = raw.as_object();
    ShopSetting {
        id: obj
            .and_then(|o| non_blank(o, "id"))
            .unwrap_or_else(|| format!("setting-{}", index + 1)),
        name: obj
            .and_then(|o| non_blank(o, "name"))
            .unwrap_or_else(|| DEFAULT_SETTING_NAME.to_string()),
        catalog: normalize_catalog(obj.and_then(|o| o.get("catalog"))),
        locations: normalize_locations(obj.and_then(|o| o.get("locations"))),
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// Items without an id are dropped; repeated ids keep the first entry
pub fn normalize_catalog(raw: Option<&Value>) -> Vec<CatalogItem> {
    let Some(entries) = raw.and_then(Value::as_array) else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut items = Vec::with_capacity(entries.len());
    for entry in entries {
        match normalize_item(entry) {
            Some(item) if seen.insert(item.id.clone()) => items.push(item),
            Some(item) => debug!("Dropping duplicate catalog item {}", item.id),
            None => debug!("Dropping catalog entry without an id"),
        }
    }
    items
}

pub fn normalize_item(raw: &Value) -> Option<CatalogItem> {
    let obj = raw.as_object()?;
    let id = non_blank(obj, "id")?;

    Some(CatalogItem {
        name: non_blank(obj, "name").unwrap_or_else(|| id.clone()),
        base_price: non_negative(obj, "basePrice"),
        weight: non_negative(obj, "weight"),
        category: non_blank(obj, "category"),
        notes: non_blank(obj, "notes"),
        tags: string_set(obj.get("tags")),
        legal_status: non_blank(obj, "legalStatus"),
        origin: obj
            .get("source")
            .and_then(Value::as_str)
            .and_then(ItemOrigin::parse)
            .unwrap_or_default(),
        id,
    })
}

// ============================================================================
// Locations & Rules
// ============================================================================

fn normalize_locations(raw: Option<&Value>) -> Vec<ShopLocation> {
    raw.and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .enumerate()
                .filter_map(|(index, entry)| normalize_location(entry, index))
                .collect()
        })
        .unwrap_or_default()
}

/// Non-object entries are dropped; a missing id becomes `location-{n}`
pub fn normalize_location(raw: &Value, index: usize) -> Option<ShopLocation> {
    let obj = raw.as_object()?;

    Some(ShopLocation {
        id: non_blank(obj, "id").unwrap_or_else(|| format!("location-{}", index + 1)),
        name: non_blank(obj, "name").unwrap_or_else(|| DEFAULT_LOCATION_NAME.to_string()),
        available_item_ids: string_set(obj.get("availableItemIds")),
        percent_markup: number(obj.get("percentMarkup")).unwrap_or(0.0),
        manual_prices: number_map(obj.get("manualPrices")),
        rules: normalize_rules(obj.get("rules")),
        share_columns: match obj.get("shareColumns") {
            Some(Value::Array(_)) => string_set(obj.get("shareColumns")),
            _ => default_share_columns(),
        },
    })
}

pub fn normalize_rules(raw: Option<&Value>) -> RuleConfig {
    let Some(obj) = raw.and_then(Value::as_object) else {
        return RuleConfig::default();
    };

    RuleConfig {
        include_categories: string_set(obj.get("includeCategories")),
        include_tags: string_set(obj.get("includeTags")),
        exclude_tags: string_set(obj.get("excludeTags")),
        legal_statuses: string_set(obj.get("legalStatuses")),
        markup_percent: number(obj.get("markupPercent")).unwrap_or(0.0),
        pricing_profile: normalize_pricing_profile(obj.get("pricingProfile")),
        pinned_item_ids: string_set(obj.get("pinnedItemIds")),
        banned_item_ids: string_set(obj.get("bannedItemIds")),
        manual_price_overrides: number_map(obj.get("manualPriceOverrides")),
    }
}

fn normalize_pricing_profile(raw: Option<&Value>) -> PricingProfile {
    let Some(obj) = raw.and_then(Value::as_object) else {
        return PricingProfile::default();
    };
    let fallback = PricingProfile::default();

    PricingProfile {
        id: non_blank(obj, "id").unwrap_or(fallback.id),
        name: non_blank(obj, "name").unwrap_or(fallback.name),
        category_modifiers: number_map(obj.get("categoryModifiers")),
        rounding: match obj.get("rounding").and_then(Value::as_str) {
            Some("none") => Rounding::Exact,
            _ => Rounding::Integer,
        },
    }
}

// ============================================================================
// Field Coercion
// ============================================================================

fn non_blank(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

/// Finite number, accepting numeric strings
fn number(raw: Option<&Value>) -> Option<f64> {
    let value = match raw? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    value.is_finite().then_some(value)
}

fn non_negative(obj: &Map<String, Value>, key: &str) -> f64 {
    number(obj.get(key)).map(|n| n.max(0.0)).unwrap_or(0.0)
}

/// String array with non-strings dropped and duplicates removed, order kept
fn string_set(raw: Option<&Value>) -> Vec<String> {
    let Some(entries) = raw.and_then(Value::as_array) else {
        return Vec::new();
    };
    let mut seen = HashSet::new();
    entries
        .iter()
        .filter_map(Value::as_str)
        .filter(|s| seen.insert(s.to_string()))
        .map(str::to_string)
        .collect()
}

fn number_map(raw: Option<&Value>) -> BTreeMap<String, f64> {
    raw.and_then(Value::as_object)
        .map(|obj| {
            obj.iter()
                .filter_map(|(key, value)| number(Some(value)).map(|n| (key.clone(), n)))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn assert_single_default(campaign: &CampaignState) {
        assert_eq!(campaign.schema_version, "2.0");
        assert_eq!(campaign.settings.len(), 1);
        assert_eq!(campaign.active_setting_id, campaign.settings[0].id);
    }

    #[test]
    fn test_garbage_inputs_are_total() {
        for raw in [Value::Null, json!({}), json!({ "garbage": true }), json!(42), json!("x"), json!([])] {
            let campaign = normalize_campaign(&raw);
            assert_single_default(&campaign);
            assert_eq!(campaign.settings[0].name, "Default Setting");
            assert!(campaign.settings[0].catalog.is_empty());
            assert!(campaign.settings[0].locations.is_empty());
        }
    }

    #[test]
    fn test_built_in_template_seeds_catalog() {
        let campaign = normalize_campaign_with(&Value::Null, &SettingTemplate::built_in());
        assert_single_default(&campaign);
        assert_eq!(campaign.settings[0].name, "70s Vegas");
        assert_eq!(campaign.settings[0].catalog.len(), 3);
    }

    #[test]
    fn test_legacy_document_upgrades() {
        let campaign = normalize_campaign(&json!({
            "schemaVersion": "1.0",
            "catalog": [{ "id": "rope", "name": "Rope", "basePrice": 10, "weight": 1 }],
            "locations": [{ "id": "riverfall", "name": "Riverfall", "availableItemIds": [], "percentMarkup": 0, "manualPrices": {} }]
        }));
        assert_single_default(&campaign);
        assert_eq!(campaign.active_setting_id, "default-setting");
        let setting = &campaign.settings[0];
        assert_eq!(setting.catalog.len(), 1);
        assert_eq!(setting.locations.len(), 1);
        assert_eq!(setting.locations[0].rules, RuleConfig::default());
        assert_eq!(setting.locations[0].share_columns, default_share_columns());
    }

    #[test]
    fn test_legacy_empty_catalog_uses_template() {
        let campaign = normalize_campaign_with(
            &json!({ "schemaVersion": "2.0", "catalog": [], "locations": [] }),
            &SettingTemplate::built_in(),
        );
        assert_eq!(campaign.settings[0].catalog.len(), 3);
        assert_eq!(campaign.location_count(), 0);
    }

    #[test]
    fn test_canonical_fills_missing_fields() {
        let campaign = normalize_campaign(&json!({
            "schemaVersion": "2.0",
            "activeSettingId": "nowhere",
            "settings": [
                { "name": "  ", "catalog": "nope", "locations": [{ "id": "strip", "name": "" }, 7] },
                { "id": "noir", "name": "Noir City" }
            ]
        }));
        assert_eq!(campaign.settings.len(), 2);
        let first = &campaign.settings[0];
        assert_eq!(first.id, "setting-1");
        assert_eq!(first.name, "Default Setting");
        assert!(first.catalog.is_empty());
        assert_eq!(first.locations.len(), 1);
        assert_eq!(first.locations[0].name, "New Location");
        assert_eq!(campaign.active_setting_id, "setting-1");
    }

    #[test]
    fn test_active_setting_kept_when_valid() {
        let campaign = normalize_campaign(&json!({
            "schemaVersion": "2.0",
            "activeSettingId": "noir",
            "settings": [{ "id": "vegas", "name": "Vegas" }, { "id": "noir", "name": "Noir" }]
        }));
        assert_eq!(campaign.active_setting_id, "noir");
    }

    #[test]
    fn test_canonical_with_no_settings_synthesizes_one() {
        let campaign = normalize_campaign(&json!({ "schemaVersion": "2.0", "settings": [] }));
        assert_single_default(&campaign);
    }

    #[test]
    fn test_rules_are_coerced() {
        let rules = normalize_rules(Some(&json!({
            "includeTags": ["tool", "tool", 3, "melee"],
            "markupPercent": "15",
            "pricingProfile": { "rounding": "none", "categoryModifiers": { "firearm": 20, "bad": "x" } },
            "manualPriceOverrides": { "rope": 12, "torch": null }
        })));
        assert_eq!(rules.include_tags, vec!["tool".to_string(), "melee".to_string()]);
        assert_eq!(rules.markup_percent, 15.0);
        assert_eq!(rules.pricing_profile.id, "default");
        assert_eq!(rules.pricing_profile.rounding, Rounding::Exact);
        assert_eq!(rules.pricing_profile.category_modifiers.len(), 1);
        assert_eq!(rules.manual_price_overrides.len(), 1);
    }

    #[test]
    fn test_items_are_coerced() {
        let catalog = normalize_catalog(Some(&json!([
            { "id": "rope", "basePrice": -5, "weight": "2", "source": "built-in", "tags": ["a"] },
            { "id": "rope", "name": "Duplicate" },
            { "name": "No id" },
            "junk"
        ])));
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog[0].name, "rope");
        assert_eq!(catalog[0].base_price, 0.0);
        assert_eq!(catalog[0].weight, 2.0);
        assert!(catalog[0].is_built_in());
    }
}
