//! ============================================================================
//! Core Types for the Shop Engine
//! ============================================================================
//! Catalog items, pricing profiles, per-location rule configs and the
//! versioned campaign document. Field names serialize in camelCase so the
//! JSON stays wire-compatible with the document store and player views.
//! ============================================================================

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Canonical campaign schema version
pub const CANONICAL_SCHEMA_VERSION: &str = "2.0";

/// Schema version of the flat catalog/locations documents
pub const LEGACY_SCHEMA_VERSION: &str = "1.0";

/// Columns exposed in the read-only player view when none are configured
pub const DEFAULT_SHARE_COLUMNS: [&str; 4] = ["name", "category", "finalPrice", "weight"];

/// Every column the player view knows how to render
pub const SHARE_COLUMN_NAMES: [&str; 8] = [
    "name",
    "category",
    "basePrice",
    "finalPrice",
    "weight",
    "notes",
    "tags",
    "legalStatus",
];

pub fn default_share_columns() -> Vec<String> {
    DEFAULT_SHARE_COLUMNS.iter().map(|c| c.to_string()).collect()
}

// ============================================================================
// Catalog
// ============================================================================

/// Where a catalog item came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ItemOrigin {
    /// Shipped with the application, cannot be deleted
    BuiltIn,
    #[default]
    Custom,
    Imported,
}

impl ItemOrigin {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "built-in" => Some(ItemOrigin::BuiltIn),
            "custom" => Some(ItemOrigin::Custom),
            "imported" => Some(ItemOrigin::Imported),
            _ => None,
        }
    }
}

/// One purchasable good
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub id: String,
    pub name: String,
    pub base_price: f64,
    pub weight: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legal_status: Option<String>,
    #[serde(rename = "source", default)]
    pub origin: ItemOrigin,
}

impl CatalogItem {
    /// Create a custom item with no classification metadata
    pub fn new(id: impl Into<String>, name: impl Into<String>, base_price: f64, weight: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            base_price,
            weight,
            category: None,
            notes: None,
            tags: Vec::new(),
            legal_status: None,
            origin: ItemOrigin::Custom,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_legal_status(mut self, status: impl Into<String>) -> Self {
        self.legal_status = Some(status.into());
        self
    }

    pub fn with_origin(mut self, origin: ItemOrigin) -> Self {
        self.origin = origin;
        self
    }

    pub fn is_built_in(&self) -> bool {
        self.origin == ItemOrigin::BuiltIn
    }
}

// ============================================================================
// Pricing & Rules
// ============================================================================

/// Rounding applied at the end of the pricing pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Rounding {
    /// Round to the nearest whole price, halves away from zero
    #[default]
    #[serde(rename = "integer")]
    Integer,
    /// Keep the computed floating value
    #[serde(rename = "none")]
    Exact,
}

/// Category-level price modifiers, shared by reference across locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingProfile {
    pub id: String,
    pub name: String,
    /// Category name -> percentage modifier
    #[serde(default)]
    pub category_modifiers: BTreeMap<String, f64>,
    #[serde(default)]
    pub rounding: Rounding,
}

impl Default for PricingProfile {
    fn default() -> Self {
        Self {
            id: "default".to_string(),
            name: "Default".to_string(),
            category_modifiers: BTreeMap::new(),
            rounding: Rounding::Integer,
        }
    }
}

/// Filter, pricing and exception configuration for one shop location.
/// Empty inclusion sets mean "no constraint".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct RuleConfig {
    pub include_categories: Vec<String>,
    pub include_tags: Vec<String>,
    pub exclude_tags: Vec<String>,
    pub legal_statuses: Vec<String>,
    pub markup_percent: f64,
    pub pricing_profile: PricingProfile,
    pub pinned_item_ids: Vec<String>,
    pub banned_item_ids: Vec<String>,
    /// Item id -> price that replaces the computed price
    pub manual_price_overrides: BTreeMap<String, f64>,
}

impl RuleConfig {
    pub fn is_pinned(&self, item_id: &str) -> bool {
        self.pinned_item_ids.iter().any(|id| id == item_id)
    }

    pub fn is_banned(&self, item_id: &str) -> bool {
        self.banned_item_ids.iter().any(|id| id == item_id)
    }

    pub fn override_for(&self, item_id: &str) -> Option<f64> {
        self.manual_price_overrides.get(item_id).copied()
    }
}

// ============================================================================
// Campaign
// ============================================================================

/// A single shop within a setting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopLocation {
    pub id: String,
    pub name: String,
    /// Derived for flat-document consumers; empty means "whole catalog"
    #[serde(default)]
    pub available_item_ids: Vec<String>,
    /// Derived; always 0 once rule-based pricing is baked into manual prices
    #[serde(default)]
    pub percent_markup: f64,
    /// Derived; item id -> final price
    #[serde(default)]
    pub manual_prices: BTreeMap<String, f64>,
    #[serde(default)]
    pub rules: RuleConfig,
    #[serde(default = "default_share_columns")]
    pub share_columns: Vec<String>,
}

impl ShopLocation {
    /// New location with default rules and default player columns
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            available_item_ids: Vec::new(),
            percent_markup: 0.0,
            manual_prices: BTreeMap::new(),
            rules: RuleConfig::default(),
            share_columns: default_share_columns(),
        }
    }
}

/// A named partition of a campaign with its own catalog and locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopSetting {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub catalog: Vec<CatalogItem>,
    #[serde(default)]
    pub locations: Vec<ShopLocation>,
}

impl ShopSetting {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            catalog: Vec::new(),
            locations: Vec::new(),
        }
    }

    pub fn location(&self, location_id: &str) -> Option<&ShopLocation> {
        self.locations.iter().find(|l| l.id == location_id)
    }

    pub fn item(&self, item_id: &str) -> Option<&CatalogItem> {
        self.catalog.iter().find(|i| i.id == item_id)
    }
}

/// The versioned campaign document. Always holds at least one setting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignState {
    pub schema_version: String,
    pub active_setting_id: String,
    pub settings: Vec<ShopSetting>,
}

impl CampaignState {
    /// Active setting, falling back to the first one when the id dangles.
    /// None only for a campaign with no settings at all.
    pub fn active_setting(&self) -> Option<&ShopSetting> {
        self.settings
            .iter()
            .find(|s| s.id == self.active_setting_id)
            .or_else(|| self.settings.first())
    }

    pub fn active_setting_index(&self) -> usize {
        self.settings
            .iter()
            .position(|s| s.id == self.active_setting_id)
            .unwrap_or(0)
    }

    /// Total location count across every setting
    pub fn location_count(&self) -> usize {
        self.settings.iter().map(|s| s.locations.len()).sum()
    }

    /// Find a location anywhere in the campaign, with its owning setting
    pub fn find_location(&self, location_id: &str) -> Option<(&ShopSetting, &ShopLocation)> {
        self.settings
            .iter()
            .find_map(|s| s.location(location_id).map(|l| (s, l)))
    }

    pub fn has_location_id(&self, location_id: &str) -> bool {
        self.find_location(location_id).is_some()
    }
}

// ============================================================================
// Read Models
// ============================================================================

/// How a preview line item ended up in the shop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceSource {
    Rule,
    Pinned,
    Override,
}

/// One line of a rule-based shop preview
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewItem {
    pub id: String,
    pub name: String,
    pub base_price: f64,
    pub final_price: f64,
    pub weight: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legal_status: Option<String>,
    pub source: PriceSource,
}

/// Player-facing item row served by the document store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopViewItem {
    pub id: String,
    pub name: String,
    pub base_price: f64,
    pub final_price: f64,
    pub weight: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legal_status: Option<String>,
}

/// Player-facing shop read model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopView {
    pub location_id: String,
    pub location_name: String,
    pub items: Vec<ShopViewItem>,
}

/// Location summary for share-link pickers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationSummary {
    pub id: String,
    pub name: String,
    pub setting_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_serializes_kebab_case() {
        let item = CatalogItem::new("rope", "Rope", 10.0, 1.0).with_origin(ItemOrigin::BuiltIn);
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["source"], "built-in");
        assert_eq!(json["basePrice"], 10.0);
        assert!(json.get("tags").is_none());
    }

    #[test]
    fn test_rounding_wire_names() {
        assert_eq!(serde_json::to_value(Rounding::Integer).unwrap(), "integer");
        assert_eq!(serde_json::to_value(Rounding::Exact).unwrap(), "none");
    }

    #[test]
    fn test_active_setting_falls_back_to_first() {
        let campaign = CampaignState {
            schema_version: CANONICAL_SCHEMA_VERSION.into(),
            active_setting_id: "missing".into(),
            settings: vec![ShopSetting::new("vegas", "Vegas")],
        };
        assert_eq!(campaign.active_setting().map(|s| s.id.as_str()), Some("vegas"));
        assert_eq!(campaign.active_setting_index(), 0);
    }

    #[test]
    fn test_active_setting_of_empty_campaign() {
        let campaign = CampaignState {
            schema_version: CANONICAL_SCHEMA_VERSION.into(),
            active_setting_id: "vegas".into(),
            settings: Vec::new(),
        };
        assert!(campaign.active_setting().is_none());
    }

    #[test]
    fn test_location_count_spans_settings() {
        let mut a = ShopSetting::new("a", "A");
        a.locations.push(ShopLocation::new("x", "X"));
        let mut b = ShopSetting::new("b", "B");
        b.locations.push(ShopLocation::new("y", "Y"));
        b.locations.push(ShopLocation::new("z", "Z"));
        let campaign = CampaignState {
            schema_version: CANONICAL_SCHEMA_VERSION.into(),
            active_setting_id: "a".into(),
            settings: vec![a, b],
        };
        assert_eq!(campaign.location_count(), 3);
        assert_eq!(campaign.find_location("z").map(|(s, _)| s.id.as_str()), Some("b"));
    }
}
