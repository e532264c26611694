// ============================================================================
// Sync Controller - pull / push / push-one-location
// ============================================================================
// Last writer wins at the document level. The only conflict guard is the
// empty-remote check on pull: a server with zero locations never replaces
// a local campaign that has some.
// ============================================================================

use tracing::{debug, info, warn};

use super::compat::build_push_payload;
use super::remote::CampaignRemote;
use super::SyncError;
use crate::campaign::{normalize_campaign_with, CampaignStore, SettingTemplate};
use crate::types::{CampaignState, ShopSetting};

/// Result of a pull, as seen by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullOutcome {
    /// Remote campaign replaced local state
    Applied,
    /// Remote looked wiped; local state kept and the reason recorded
    KeptLocal,
    /// Transport or decode failure recorded as the sync error
    Failed,
}

/// Decide whether a pulled campaign may replace the local one
pub fn evaluate_pull(
    local: &CampaignState,
    remote: CampaignState,
) -> Result<CampaignState, SyncError> {
    let local_locations = local.location_count();
    let remote_locations = remote.location_count();

    if local_locations > 0 && remote_locations == 0 {
        return Err(SyncError::EmptyRemote { local_locations });
    }
    Ok(remote)
}

/// Fold one local location into a freshly fetched remote campaign.
///
/// Only the target's rules are taken from `local` when the remote already
/// has it. A location the remote lacks is appended to its setting, and a
/// setting the remote lacks is added with the local catalog and just this
/// location.
pub fn merge_location(
    mut remote: CampaignState,
    local: &CampaignState,
    location_id: &str,
) -> Result<CampaignState, SyncError> {
    let (local_setting, local_location) = local
        .find_location(location_id)
        .ok_or_else(|| SyncError::UnknownLocation(location_id.to_string()))?;

    match remote.settings.iter_mut().find(|s| s.id == local_setting.id) {
        Some(setting) => match setting.locations.iter_mut().find(|l| l.id == location_id) {
            Some(existing) => existing.rules = local_location.rules.clone(),
            None => setting.locations.push(local_location.clone()),
        },
        None => remote.settings.push(ShopSetting {
            locations: vec![local_location.clone()],
            ..local_setting.clone()
        }),
    }
    Ok(remote)
}

/// Drives sync operations against a `CampaignRemote`
pub struct SyncController<R: CampaignRemote> {
    remote: R,
}

impl<R: CampaignRemote> SyncController<R> {
    pub fn new(remote: R) -> Self {
        Self { remote }
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    async fn fetch_normalized(&self) -> Result<CampaignState, SyncError> {
        let raw = self.remote.fetch_campaign().await?;
        Ok(normalize_campaign_with(&raw, &SettingTemplate::built_in()))
    }

    /// Fetch the remote campaign and apply it unless the safety check trips
    pub async fn pull(&self, store: &mut CampaignStore) -> PullOutcome {
        store.begin_sync();

        let evaluated = match self.fetch_normalized().await {
            Ok(remote) => evaluate_pull(store.campaign(), remote),
            Err(e) => Err(e),
        };

        match evaluated {
            Ok(campaign) => {
                info!(
                    "Pulled campaign: {} settings, {} locations",
                    campaign.settings.len(),
                    campaign.location_count()
                );
                store.replace_campaign(campaign);
                store.finish_sync(None);
                PullOutcome::Applied
            }
            Err(e @ SyncError::EmptyRemote { .. }) => {
                warn!("{}", e);
                store.finish_sync(Some(e.to_string()));
                PullOutcome::KeptLocal
            }
            Err(e) => {
                warn!("Pull failed: {}", e);
                store.finish_sync(Some(e.to_string()));
                PullOutcome::Failed
            }
        }
    }

    /// Overwrite the remote with the whole local campaign
    pub async fn push_all(&self, store: &mut CampaignStore) -> bool {
        store.begin_sync();

        let result = match build_push_payload(store.campaign()) {
            Ok(payload) => self.remote.put_campaign(&payload).await,
            Err(e) => Err(e),
        };
        self.settle("Push", store, result)
    }

    /// Pull, merge one location's rules in, push the merged campaign.
    /// Local state is not modified.
    pub async fn push_location(&self, store: &mut CampaignStore, location_id: &str) -> bool {
        store.begin_sync();

        let result = self.merge_and_push(store.campaign(), location_id).await;
        self.settle("Location push", store, result)
    }

    async fn merge_and_push(
        &self,
        local: &CampaignState,
        location_id: &str,
    ) -> Result<(), SyncError> {
        if !local.has_location_id(location_id) {
            return Err(SyncError::UnknownLocation(location_id.to_string()));
        }
        let remote = self.fetch_normalized().await?;
        let merged = merge_location(remote, local, location_id)?;
        debug!("Merged location {} into remote campaign", location_id);

        let payload = build_push_payload(&merged)?;
        self.remote.put_campaign(&payload).await
    }

    fn settle(&self, action: &str, store: &mut CampaignStore, result: Result<(), SyncError>) -> bool {
        match result {
            Ok(()) => {
                info!("{} succeeded", action);
                store.finish_sync(None);
                true
            }
            Err(e) => {
                warn!("{} failed: {}", action, e);
                store.finish_sync(Some(e.to_string()));
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::campaign::normalize_campaign;
    use crate::rules::edits;
    use crate::sync::testing::{DownRemote, MemoryRemote};
    use crate::types::{CatalogItem, ShopLocation};
    use serde_json::json;

    fn store_with_location() -> (CampaignStore, String) {
        let mut store = CampaignStore::from_snapshot(None);
        let id = store.add_location("Riverfall");
        (store, id)
    }

    #[tokio::test]
    async fn test_pull_keeps_local_when_remote_is_empty() {
        let (mut store, id) = store_with_location();
        let remote = MemoryRemote::with(json!({ "schemaVersion": "1.0", "catalog": [], "locations": [] }));
        let controller = SyncController::new(remote);

        assert_eq!(controller.pull(&mut store).await, PullOutcome::KeptLocal);
        assert!(store.location(&id).is_some());
        assert!(store.sync_error().unwrap().contains("Local data kept"));
        assert!(!store.is_syncing());
    }

    #[tokio::test]
    async fn test_pull_accepts_empty_remote_when_local_is_empty() {
        let mut store = CampaignStore::from_snapshot(None);
        let controller = SyncController::new(MemoryRemote::default());

        assert_eq!(controller.pull(&mut store).await, PullOutcome::Applied);
        assert!(store.sync_error().is_none());
        assert_eq!(store.campaign().location_count(), 0);
    }

    #[tokio::test]
    async fn test_pull_replaces_local_wholesale() {
        let (mut store, local_id) = store_with_location();
        let remote = MemoryRemote::with(json!({
            "schemaVersion": "1.0",
            "catalog": [{ "id": "rope", "name": "Rope", "basePrice": 10, "weight": 1 }],
            "locations": [{ "id": "harbor", "name": "Harbor" }]
        }));
        let controller = SyncController::new(remote);

        assert_eq!(controller.pull(&mut store).await, PullOutcome::Applied);
        assert!(store.location(&local_id).is_none());
        assert!(store.location("harbor").is_some());
        assert_eq!(store.active_setting().catalog[0].id, "rope");
    }

    #[tokio::test]
    async fn test_pull_failure_sets_error() {
        let (mut store, id) = store_with_location();
        let controller = SyncController::new(DownRemote);

        assert_eq!(controller.pull(&mut store).await, PullOutcome::Failed);
        assert_eq!(store.sync_error(), Some("Server responded with 503"));
        assert!(store.location(&id).is_some());
    }

    #[tokio::test]
    async fn test_push_all_sends_dual_payload() {
        let mut store = CampaignStore::from_snapshot(None);
        store.add_catalog_item(
            CatalogItem::new("custom-lockpick-set", "Lockpick Set", 100.0, 0.5).with_tags(&["lockpick"]),
        );
        let id = store.add_location("Fence");
        store.set_location_rules(&id, |rules| {
            edits::with_markup(edits::toggle_include_tag(rules, "lockpick"), 20.0)
        });

        let controller = SyncController::new(MemoryRemote::default());
        assert!(controller.push_all(&mut store).await);

        let puts = controller.remote().puts.lock().await;
        let payload = &puts[0];
        assert!(payload["settings"].is_array());
        assert_eq!(payload["locations"][0]["availableItemIds"], json!(["custom-lockpick-set"]));
        assert_eq!(payload["locations"][0]["manualPrices"]["custom-lockpick-set"], json!(120.0));
    }

    #[tokio::test]
    async fn test_push_failure_reports_false() {
        let (mut store, _) = store_with_location();
        let controller = SyncController::new(DownRemote);
        assert!(!controller.push_all(&mut store).await);
        assert!(store.sync_error().unwrap().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_push_location_only_touches_target() {
        let (mut local, target) = store_with_location();
        let other = local.add_location("Harbor");
        let setting_id = local.active_setting().id.clone();

        // Remote has both locations; "Harbor" was edited remotely
        let mut remote_state = local.campaign().clone();
        {
            let setting = &mut remote_state.settings[0];
            let harbor = setting.locations.iter_mut().find(|l| l.id == other).unwrap();
            harbor.rules = edits::with_markup(harbor.rules.clone(), 50.0);
        }
        let remote = MemoryRemote::with(serde_json::to_value(&remote_state).unwrap());

        local.set_location_rules(&target, |rules| edits::toggle_include_tag(rules, "firearm"));
        let before = local.campaign().clone();

        let controller = SyncController::new(remote);
        assert!(controller.push_location(&mut local, &target).await);
        assert_eq!(local.campaign(), &before);

        let stored = controller.remote().document.lock().await.clone().unwrap();
        let merged = normalize_campaign(&stored);
        let setting = merged.settings.iter().find(|s| s.id == setting_id).unwrap();
        assert_eq!(setting.location(&target).unwrap().rules.include_tags, vec!["firearm"]);
        assert_eq!(setting.location(&other).unwrap().rules.markup_percent, 50.0);
    }

    #[tokio::test]
    async fn test_push_location_unknown_id() {
        let (mut store, _) = store_with_location();
        let controller = SyncController::new(MemoryRemote::default());
        assert!(!controller.push_location(&mut store, "nowhere").await);
        assert_eq!(store.sync_error(), Some("Location not found: nowhere"));
        assert!(controller.remote().puts.lock().await.is_empty());
    }

    #[test]
    fn test_evaluate_pull_counts_all_settings() {
        let mut local = normalize_campaign(&json!(null));
        let mut second = ShopSetting::new("space", "Space");
        second.locations.push(ShopLocation::new("dock", "Dock"));
        local.settings.push(second);

        let empty = normalize_campaign(&json!(null));
        let err = evaluate_pull(&local, empty).unwrap_err();
        assert_eq!(err, SyncError::EmptyRemote { local_locations: 1 });
    }

    #[test]
    fn test_merge_adds_missing_setting() {
        let remote = normalize_campaign(&json!(null));
        let mut local = remote.clone();
        let mut space = ShopSetting::new("space", "Space");
        space.catalog.push(CatalogItem::new("blaster", "Blaster", 50.0, 1.0));
        space.locations.push(ShopLocation::new("dock", "Dock"));
        space.locations.push(ShopLocation::new("bar", "Bar"));
        local.settings.push(space);

        let merged = merge_location(remote, &local, "dock").unwrap();
        let added = merged.settings.iter().find(|s| s.id == "space").unwrap();
        assert_eq!(added.catalog.len(), 1);
        assert_eq!(added.locations.len(), 1);
        assert_eq!(added.locations[0].id, "dock");
    }
}
