//! ============================================================================
//! Presets - Built-in catalog, pricing profiles and vocabularies
//! ============================================================================
//! Seed data for the "70s Vegas" setting shipped with the application.
//! ============================================================================

use std::collections::BTreeMap;

use crate::types::{CatalogItem, ItemOrigin, PricingProfile, Rounding};

/// Id of the synthesized default setting
pub const DEFAULT_SETTING_ID: &str = "default-setting";

/// Display name of the built-in setting
pub const BUILT_IN_SETTING_NAME: &str = "70s Vegas";

pub const LEGAL_STATUSES: [&str; 6] = [
    "legal",
    "restricted",
    "illegal",
    "underground",
    "military",
    "police",
];

pub const VEGAS_TAG_POOL: [&str; 17] = [
    "legal",
    "restricted",
    "illegal",
    "underground",
    "military",
    "police",
    "firearm",
    "melee",
    "tool",
    "cleaning",
    "disposal",
    "surveillance",
    "interrogation",
    "deception",
    "restraint",
    "medical",
    "luxury",
];

/// Items every fresh client campaign starts with
pub fn built_in_catalog() -> Vec<CatalogItem> {
    vec![
        CatalogItem::new("vegas-snub-revolver", "Snub Revolver", 180.0, 1.1)
            .with_category("firearm")
            .with_tags(&["restricted", "firearm", "street"])
            .with_legal_status("restricted")
            .with_origin(ItemOrigin::BuiltIn),
        CatalogItem::new("vegas-wiretap-kit", "Wiretap Kit", 420.0, 2.3)
            .with_category("surveillance")
            .with_tags(&["restricted", "surveillance", "professional"])
            .with_legal_status("restricted")
            .with_origin(ItemOrigin::BuiltIn),
        CatalogItem::new("vegas-cleanup-solvent", "Cleanup Solvent", 65.0, 1.5)
            .with_category("cleaning")
            .with_tags(&["legal", "cleaning", "starter"])
            .with_legal_status("legal")
            .with_origin(ItemOrigin::BuiltIn),
    ]
}

/// Selectable pricing profiles
pub fn pricing_profiles() -> Vec<PricingProfile> {
    vec![
        PricingProfile::default(),
        PricingProfile {
            id: "black-market".to_string(),
            name: "Black Market".to_string(),
            category_modifiers: BTreeMap::from([
                ("firearm".to_string(), 20.0),
                ("surveillance".to_string(), 15.0),
            ]),
            rounding: Rounding::Integer,
        },
    ]
}

pub fn pricing_profile(id: &str) -> Option<PricingProfile> {
    pricing_profiles().into_iter().find(|p| p.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_built_in_catalog_is_built_in() {
        let catalog = built_in_catalog();
        assert_eq!(catalog.len(), 3);
        assert!(catalog.iter().all(|i| i.is_built_in()));
    }

    #[test]
    fn test_pricing_profile_lookup() {
        let profile = pricing_profile("black-market").unwrap();
        assert_eq!(profile.category_modifiers.get("firearm"), Some(&20.0));
        assert!(pricing_profile("nope").is_none());
    }
}
