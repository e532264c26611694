//! ============================================================================
//! Campaign Module - Versioned campaign document and its state store
//! ============================================================================
//! - `normalize`: any JSON (null, partial, flat "1.0" documents) -> canonical
//!   "2.0" campaign with at least one setting
//! - `store`: in-memory authoritative state and its mutation operations
//! - `ids`: slug ids with `-2`, `-3`, ... collision suffixes
//!
//! ## Usage
//! ```rust,ignore
//! use shop_core::campaign::CampaignStore;
//!
//! let mut store = CampaignStore::from_snapshot(None);
//! let id = store.add_location("Riverfall");
//! store.set_location_rules(&id, |rules| edits::toggle_include_tag(rules, "firearm"));
//! ```
//! ============================================================================

mod ids;
mod normalize;
mod store;

pub use ids::{slugify, unique_id};
pub use normalize::{
    normalize_campaign, normalize_campaign_with, normalize_catalog, normalize_item,
    normalize_location, normalize_rules, normalize_setting, SettingTemplate,
};
pub use store::CampaignStore;
