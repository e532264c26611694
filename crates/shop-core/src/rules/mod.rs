//! ============================================================================
//! Rules Module - Rule-based shop inventory
//! ============================================================================
//! Decides which catalog items a location stocks and what they cost.
//!
//! ## Pipeline
//! ```text
//! catalog ──► matcher (include/exclude/legal) ──► + pins ──► − bans
//!                                                              │
//!                        base ─► category modifier ─► markup ─► override ─► rounding
//! ```
//!
//! Every function here is pure and synchronous; identical inputs always
//! produce identical output, including item order.
//!
//! ## Usage
//! ```rust,ignore
//! use shop_core::rules::{build_preview, edits};
//!
//! let rules = edits::toggle_pin(location.rules.clone(), "vegas-wiretap-kit");
//! let items = build_preview(&setting.catalog, &rules);
//! ```
//! ============================================================================

pub mod edits;
mod matcher;
mod preview;
mod pricing;

pub use matcher::matches;
pub use preview::{build_preview, preview_location};
pub use pricing::{apply_rounding, legacy_price, price, quote, PriceQuote};
