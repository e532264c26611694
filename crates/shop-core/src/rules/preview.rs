//! ============================================================================
//! Shop Preview Builder - Item list for one location
//! ============================================================================
//! Rule matches first, then pinned items appended, then bans removed.
//! Bans always win over pins; pins never resurrect items missing from the
//! catalog.
//! ============================================================================

use std::collections::HashMap;
use tracing::debug;

use super::matcher::matches;
use super::pricing::quote;
use crate::types::{CatalogItem, PreviewItem, PriceSource, RuleConfig, ShopLocation};

/// Working-set entry: the item and whether a rule matched it
struct Entry<'a> {
    item: &'a CatalogItem,
    rule_matched: bool,
}

/// Insertion-ordered set keyed by item id. A repeated id replaces the
/// stored item but keeps its original position.
#[derive(Default)]
struct WorkingSet<'a> {
    entries: Vec<Option<Entry<'a>>>,
    index: HashMap<&'a str, usize>,
}

impl<'a> WorkingSet<'a> {
    fn upsert(&mut self, item: &'a CatalogItem, rule_matched: bool) {
        match self.index.get(item.id.as_str()) {
            Some(&slot) => {
                let previous_match = self.entries[slot]
                    .as_ref()
                    .is_some_and(|e| e.rule_matched);
                self.entries[slot] = Some(Entry {
                    item,
                    rule_matched: rule_matched || previous_match,
                });
            }
            None => {
                self.index.insert(item.id.as_str(), self.entries.len());
                self.entries.push(Some(Entry { item, rule_matched }));
            }
        }
    }

    fn remove(&mut self, item_id: &str) {
        if let Some(slot) = self.index.remove(item_id) {
            self.entries[slot] = None;
        }
    }

    fn into_entries(self) -> impl Iterator<Item = Entry<'a>> {
        self.entries.into_iter().flatten()
    }
}

/// Build the priced item list for a catalog under one rule config
pub fn build_preview(catalog: &[CatalogItem], rules: &RuleConfig) -> Vec<PreviewItem> {
    let mut working = WorkingSet::default();

    for item in catalog.iter().filter(|item| matches(item, rules)) {
        working.upsert(item, true);
    }

    for item in catalog.iter().filter(|item| rules.is_pinned(&item.id)) {
        working.upsert(item, false);
    }

    for banned in &rules.banned_item_ids {
        working.remove(banned);
    }

    let items: Vec<PreviewItem> = working
        .into_entries()
        .map(|entry| {
            let priced = quote(entry.item, rules);
            let source = if priced.overridden {
                PriceSource::Override
            } else if !entry.rule_matched {
                PriceSource::Pinned
            } else {
                PriceSource::Rule
            };

            PreviewItem {
                id: entry.item.id.clone(),
                name: entry.item.name.clone(),
                base_price: entry.item.base_price,
                final_price: priced.final_price,
                weight: entry.item.weight,
                category: entry.item.category.clone(),
                notes: entry.item.notes.clone(),
                tags: entry.item.tags.clone(),
                legal_status: entry.item.legal_status.clone(),
                source,
            }
        })
        .collect();

    debug!(
        "Preview built: {} of {} catalog items",
        items.len(),
        catalog.len()
    );
    items
}

/// Preview for a location's own rules
pub fn preview_location(catalog: &[CatalogItem], location: &ShopLocation) -> Vec<PreviewItem> {
    build_preview(catalog, &location.rules)
}
