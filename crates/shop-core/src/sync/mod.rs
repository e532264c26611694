//! ============================================================================
//! Sync Module - Pull/push against the campaign document server
//! ============================================================================
//! - `remote`: transport seam (`CampaignRemote`) and its reqwest implementation
//! - `compat`: canonical + flat compatibility payload built for every push
//! - `controller`: pull safety check, push-all and single-location push
//!
//! Failures never escape as panics; the controller records them as the
//! store's sync error string.
//! ============================================================================

mod compat;
mod controller;
mod remote;

pub use compat::{build_push_payload, derive_legacy_fields, widens_to_whole_catalog, SyncPayload};
pub use controller::{evaluate_pull, merge_location, PullOutcome, SyncController};
pub use remote::{CampaignRemote, HttpCampaignRemote};

#[cfg(test)]
pub(crate) use remote::testing;

/// Sync failures, rendered as the user-facing message
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SyncError {
    #[error("Unable to reach campaign server: {0}")]
    Transport(String),

    #[error("Server responded with {0}")]
    Status(u16),

    #[error("Campaign server returned an unreadable document: {0}")]
    Decode(String),

    #[error("Failed to encode campaign: {0}")]
    Encode(String),

    /// Policy rejection, not a transport failure
    #[error(
        "Local data kept: server returned no shop locations while {local_locations} exist locally. Push to overwrite the server copy."
    )]
    EmptyRemote { local_locations: usize },

    #[error("Location not found: {0}")]
    UnknownLocation(String),
}
