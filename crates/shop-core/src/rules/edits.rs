//! Pure `RuleConfig -> RuleConfig` transforms for rule-editing actions.
//! Compose them inside `CampaignStore::set_location_rules`.

use crate::types::{PricingProfile, RuleConfig};

/// Add `target` if absent, remove it if present
pub fn toggle_value(values: &[String], target: &str) -> Vec<String> {
    if values.iter().any(|v| v == target) {
        values.iter().filter(|v| *v != target).cloned().collect()
    } else {
        let mut next = values.to_vec();
        next.push(target.to_string());
        next
    }
}

pub fn toggle_include_category(mut rules: RuleConfig, category: &str) -> RuleConfig {
    rules.include_categories = toggle_value(&rules.include_categories, category);
    rules
}

pub fn toggle_include_tag(mut rules: RuleConfig, tag: &str) -> RuleConfig {
    rules.include_tags = toggle_value(&rules.include_tags, tag);
    rules
}

pub fn toggle_exclude_tag(mut rules: RuleConfig, tag: &str) -> RuleConfig {
    rules.exclude_tags = toggle_value(&rules.exclude_tags, tag);
    rules
}

pub fn toggle_legal_status(mut rules: RuleConfig, status: &str) -> RuleConfig {
    rules.legal_statuses = toggle_value(&rules.legal_statuses, status);
    rules
}

pub fn toggle_pin(mut rules: RuleConfig, item_id: &str) -> RuleConfig {
    rules.pinned_item_ids = toggle_value(&rules.pinned_item_ids, item_id);
    rules
}

pub fn toggle_ban(mut rules: RuleConfig, item_id: &str) -> RuleConfig {
    rules.banned_item_ids = toggle_value(&rules.banned_item_ids, item_id);
    rules
}

pub fn with_markup(mut rules: RuleConfig, markup_percent: f64) -> RuleConfig {
    rules.markup_percent = markup_percent;
    rules
}

/// Set the manual price for an item, or clear it with `None`
pub fn with_price_override(mut rules: RuleConfig, item_id: &str, price: Option<f64>) -> RuleConfig {
    match price {
        Some(value) => {
            rules.manual_price_overrides.insert(item_id.to_string(), value);
        }
        None => {
            rules.manual_price_overrides.remove(item_id);
        }
    }
    rules
}

pub fn with_pricing_profile(mut rules: RuleConfig, profile: PricingProfile) -> RuleConfig {
    rules.pricing_profile = profile;
    rules
}
