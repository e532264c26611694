//! ============================================================================
//! Rule Matcher - Catalog item membership for a location
//! ============================================================================
//! Clauses are AND-ed. Empty inclusion sets never constrain. An excluded
//! tag rejects the item no matter what else matches.
//! ============================================================================

use crate::types::{CatalogItem, RuleConfig};

/// Whether `item` belongs in a shop configured with `rules`
pub fn matches(item: &CatalogItem, rules: &RuleConfig) -> bool {
    if item.tags.iter().any(|tag| rules.exclude_tags.contains(tag)) {
        return false;
    }

    let category_match = rules.include_categories.is_empty()
        || item
            .category
            .as_ref()
            .is_some_and(|category| rules.include_categories.contains(category));

    let tag_match = rules.include_tags.is_empty()
        || item.tags.iter().any(|tag| rules.include_tags.contains(tag));

    let legal_match = rules.legal_statuses.is_empty()
        || item
            .legal_status
            .as_ref()
            .is_some_and(|status| rules.legal_statuses.contains(status));

    category_match && tag_match && legal_match
}
