//! ============================================================================
//! Pricing Pipeline - Deterministic final price for a catalog item
//! ============================================================================
//! Fixed order: base -> category modifier -> location markup -> manual
//! override -> rounding. An override replaces the marked-up value, and is
//! still rounded by the profile.
//! ============================================================================

use crate::types::{CatalogItem, Rounding, RuleConfig};

/// Result of running the pipeline for one item
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceQuote {
    pub final_price: f64,
    /// True when a manual override replaced the computed value
    pub overridden: bool,
}

/// Run the full pricing pipeline
pub fn quote(item: &CatalogItem, rules: &RuleConfig) -> PriceQuote {
    let category_modifier = item
        .category
        .as_ref()
        .and_then(|category| rules.pricing_profile.category_modifiers.get(category))
        .copied()
        .unwrap_or(0.0);

    let category_adjusted = item.base_price * (1.0 + category_modifier / 100.0);
    let marked_up = category_adjusted * (1.0 + rules.markup_percent / 100.0);

    let (value, overridden) = match rules.override_for(&item.id) {
        Some(manual) => (manual, true),
        None => (marked_up, false),
    };

    PriceQuote {
        final_price: apply_rounding(value, rules.pricing_profile.rounding),
        overridden,
    }
}

/// Final price only
pub fn price(item: &CatalogItem, rules: &RuleConfig) -> f64 {
    quote(item, rules).final_price
}

pub fn apply_rounding(value: f64, rounding: Rounding) -> f64 {
    match rounding {
        // f64::round rounds halves away from zero
        Rounding::Integer => value.round(),
        Rounding::Exact => value,
    }
}

/// Flat-document price: a manual price wins, otherwise base plus percent
/// markup rounded to an integer. Used by the player view, which never
/// looks at rule configs.
pub fn legacy_price(base_price: f64, percent_markup: f64, manual_price: Option<f64>) -> f64 {
    match manual_price {
        Some(manual) => manual,
        None => (base_price * (1.0 + percent_markup / 100.0)).round(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PricingProfile;
    use std::collections::BTreeMap;

    fn revolver() -> CatalogItem {
        CatalogItem::new("snub", "Snub Revolver", 180.0, 1.0).with_category("firearm")
    }

    fn black_market(rounding: Rounding) -> RuleConfig {
        RuleConfig {
            markup_percent: 12.0,
            pricing_profile: PricingProfile {
                id: "black-market".into(),
                name: "Black Market".into(),
                category_modifiers: BTreeMap::from([("firearm".to_string(), 20.0)]),
                rounding,
            },
            ..RuleConfig::default()
        }
    }

    #[test]
    fn test_pipeline_order() {
        // 180 * 1.20 = 216, * 1.12 = 241.92 -> 242
        let q = quote(&revolver(), &black_market(Rounding::Integer));
        assert_eq!(q.final_price, 242.0);
        assert!(!q.overridden);
    }

    #[test]
    fn test_override_replaces_computed_price() {
        let mut rules = black_market(Rounding::Integer);
        rules.manual_price_overrides.insert("snub".into(), 333.0);
        let q = quote(&revolver(), &rules);
        assert_eq!(q.final_price, 333.0);
        assert!(q.overridden);
    }

    #[test]
    fn test_no_rounding_keeps_fraction() {
        let p = price(&revolver(), &black_market(Rounding::Exact));
        assert!((p - 241.92).abs() < 1e-9);
    }

    #[test]
    fn test_override_still_rounded_by_profile() {
        let mut rules = black_market(Rounding::Integer);
        rules.manual_price_overrides.insert("snub".into(), 99.5);
        assert_eq!(price(&revolver(), &rules), 100.0);
    }

    #[test]
    fn test_unmapped_category_has_no_modifier() {
        let item = CatalogItem::new("rope", "Rope", 10.0, 1.0).with_category("tool");
        let rules = RuleConfig {
            markup_percent: 10.0,
            ..RuleConfig::default()
        };
        assert_eq!(price(&item, &rules), 11.0);
        let bare = CatalogItem::new("bare", "Bare", 10.0, 1.0);
        assert_eq!(price(&bare, &black_market(Rounding::Integer)), 11.0);
    }

    #[test]
    fn test_pricing_is_deterministic() {
        let rules = black_market(Rounding::Exact);
        let first = quote(&revolver(), &rules);
        for _ in 0..10 {
            assert_eq!(quote(&revolver(), &rules), first);
        }
    }

    #[test]
    fn test_legacy_price() {
        assert_eq!(legacy_price(10.0, 10.0, None), 11.0);
        assert_eq!(legacy_price(10.0, 10.0, Some(4.0)), 4.0);
        assert_eq!(legacy_price(5.0, 10.0, None), 6.0);
    }
}
