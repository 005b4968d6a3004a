//! Update resolution: cached lookups over the configured update sources.
//!
//! A single resolution ends in one of three ways: a fresh cache hit, a fetch
//! whose result is then cached for [`CACHE_TTL_HOURS`], or no result at all.
//! Fetch failures never escape; callers treat "no result" as "up to date".

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};
use serde::Serialize;

use crate::clock::Clock;
use crate::config::{PluginIdentity, UpdateSourceConfig};
use crate::fetch::ReleaseFetcher;
use crate::history::{InstallerEvent, LastUpdate};
use crate::store::{CacheStore, StoreError};
use crate::update::{
    DetailSections, PluginDetails, UpdateError, UpdateInfo, UpdateOffer, should_notify,
};

pub const UPDATE_CACHE_KEY: &str = "fra_update_info";
pub const LAST_UPDATE_KEY: &str = "fra_last_update";
pub const CACHE_TTL_HOURS: i64 = 12;

const PLUGIN_DESCRIPTION: &str = "Guides people relocating to France through visas, \
    housing, healthcare, banking and administrative steps.";

/// What the update cache currently holds, fresh or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CachedUpdate {
    pub info: UpdateInfo,
    pub expires_at: Option<DateTime<Utc>>,
    pub fresh: bool,
}

pub struct UpdateResolver {
    fetcher: Arc<dyn ReleaseFetcher>,
    store: Arc<dyn CacheStore>,
    clock: Arc<dyn Clock>,
}

impl UpdateResolver {
    pub fn new(
        fetcher: Arc<dyn ReleaseFetcher>,
        store: Arc<dyn CacheStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            fetcher,
            store,
            clock,
        }
    }

    /// Latest release info, from cache when fresh, otherwise fetched and
    /// cached. `None` means nothing usable could be found.
    pub async fn resolve_update(
        &self,
        current_version: &str,
        config: &UpdateSourceConfig,
    ) -> Option<UpdateInfo> {
        if let Some(info) = self.cached_info() {
            debug!(
                "Using cached update info {} (running {current_version})",
                info.version
            );
            return Some(info);
        }

        match self.fetch(config).await {
            Ok(info) => {
                debug!(
                    "Fetched update info {} (running {current_version})",
                    info.version
                );
                self.store_info(&info);
                Some(info)
            }
            Err(UpdateError::NotConfigured) => {
                debug!("No update source configured, skipping update check");
                None
            }
            Err(e) => {
                warn!("Update check failed: {e}");
                None
            }
        }
    }

    /// Drop the cached release info, forcing the next resolution to fetch.
    pub fn invalidate_cache(&self) {
        if let Err(e) = self.store.delete(UPDATE_CACHE_KEY) {
            warn!("Failed to clear update cache: {e}");
        }
    }

    pub async fn force_check(
        &self,
        current_version: &str,
        config: &UpdateSourceConfig,
    ) -> Option<UpdateInfo> {
        self.invalidate_cache();
        self.resolve_update(current_version, config).await
    }

    /// Periodic host entry point: an update offer when a newer release exists.
    pub async fn check_for_update(
        &self,
        current_version: &str,
        config: &UpdateSourceConfig,
        identity: &PluginIdentity,
    ) -> Option<UpdateOffer> {
        let info = self.resolve_update(current_version, config).await?;
        if !should_notify(current_version, &info) {
            return None;
        }

        info!(
            "Update available for {}: {current_version} -> {}",
            identity.slug, info.version
        );
        Some(UpdateOffer {
            slug: identity.slug.clone(),
            plugin: identity.basename.clone(),
            new_version: info.version,
            url: info.url,
            package: info.package,
            requires: info.requires,
            tested: info.tested,
            requires_php: info.requires_php,
        })
    }

    /// Details for the host's "view details" dialog, or `None` when the
    /// request is for some other plugin.
    pub async fn plugin_details(
        &self,
        current_version: &str,
        config: &UpdateSourceConfig,
        identity: &PluginIdentity,
        requested_slug: &str,
    ) -> Option<PluginDetails> {
        if requested_slug != identity.slug {
            return None;
        }

        let info = self.resolve_update(current_version, config).await?;
        let last_updated = self
            .last_update()
            .map(|record| record.updated_at.to_rfc3339());

        Some(PluginDetails {
            name: identity.name.clone(),
            slug: identity.slug.clone(),
            version: info.version,
            homepage: info.url,
            download_link: info.package,
            requires: info.requires,
            tested: info.tested,
            requires_php: info.requires_php,
            last_updated,
            sections: DetailSections {
                description: PLUGIN_DESCRIPTION.to_string(),
                changelog: info.changelog.unwrap_or_default(),
            },
        })
    }

    /// Installer callback. Records the update and clears the cache when the
    /// event confirms our own plugin was updated; returns whether it did.
    pub fn on_installer_complete(
        &self,
        event: &InstallerEvent,
        identity: &PluginIdentity,
        installed_version: &str,
    ) -> bool {
        if !event.is_self_update(identity) {
            return false;
        }

        match self.record_last_update(installed_version) {
            Ok(()) => info!("Recorded self-update to {installed_version}"),
            Err(e) => warn!("Failed to record self-update to {installed_version}: {e}"),
        }
        self.invalidate_cache();
        true
    }

    fn record_last_update(&self, installed_version: &str) -> Result<(), StoreError> {
        let record = LastUpdate {
            version: installed_version.to_string(),
            updated_at: self.clock.now(),
        };
        let value = serde_json::to_string(&record).map_err(StoreError::Encode)?;
        self.store.set(LAST_UPDATE_KEY, value, None)
    }

    /// The cached release info and its expiry, without fetching. Expired
    /// entries are reported with `fresh: false`.
    #[must_use]
    pub fn cached_update(&self) -> Option<CachedUpdate> {
        let record = self.store.get(UPDATE_CACHE_KEY)?;
        let info = serde_json::from_str(&record.value).ok()?;
        Some(CachedUpdate {
            info,
            expires_at: record.expires_at,
            fresh: record.is_fresh(self.clock.now()),
        })
    }

    #[must_use]
    pub fn last_update(&self) -> Option<LastUpdate> {
        let record = self.store.get(LAST_UPDATE_KEY)?;
        serde_json::from_str(&record.value).ok()
    }

    fn cached_info(&self) -> Option<UpdateInfo> {
        let record = self.store.get(UPDATE_CACHE_KEY)?;
        if !record.is_fresh(self.clock.now()) {
            debug!("Cached update info expired");
            return None;
        }
        serde_json::from_str(&record.value).ok()
    }

    fn store_info(&self, info: &UpdateInfo) {
        let expires_at = self.clock.now() + Duration::hours(CACHE_TTL_HOURS);
        let value = match serde_json::to_string(info) {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to encode update info: {e}");
                return;
            }
        };
        if let Err(e) = self.store.set(UPDATE_CACHE_KEY, value, Some(expires_at)) {
            warn!("Failed to cache update info: {e}");
        }
    }

    async fn fetch(&self, config: &UpdateSourceConfig) -> Result<UpdateInfo, UpdateError> {
        let mut last_error = UpdateError::NotConfigured;

        if let Some(url) = config.update_url() {
            match self.fetcher.fetch_manifest(url.as_str()).await {
                Ok(info) => return Ok(info),
                Err(e) => {
                    debug!("Custom update endpoint failed: {e}");
                    last_error = e;
                }
            }
        }

        if let Some(repo) = config.github_repo() {
            return self.fetcher.fetch_latest_release(repo).await;
        }

        Err(last_error)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::clock::ManualClock;
    use crate::config::GitHubRepo;
    use crate::history::{InstallerAction, PackageKind};
    use crate::store::MemoryStore;

    #[derive(Default)]
    struct FakeFetcher {
        manifest: Mutex<Option<UpdateInfo>>,
        release: Mutex<Option<UpdateInfo>>,
        manifest_calls: AtomicUsize,
        release_calls: AtomicUsize,
    }

    impl FakeFetcher {
        fn with_manifest(info: Option<UpdateInfo>) -> Self {
            let fetcher = Self::default();
            *fetcher.manifest.lock().unwrap() = info;
            fetcher
        }

        fn with_release(info: Option<UpdateInfo>) -> Self {
            let fetcher = Self::default();
            *fetcher.release.lock().unwrap() = info;
            fetcher
        }

        fn calls(&self) -> usize {
            self.manifest_calls.load(Ordering::SeqCst) + self.release_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ReleaseFetcher for FakeFetcher {
        async fn fetch_manifest(&self, _url: &str) -> Result<UpdateInfo, UpdateError> {
            self.manifest_calls.fetch_add(1, Ordering::SeqCst);
            self.manifest
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| UpdateError::MalformedPayload("no manifest".to_string()))
        }

        async fn fetch_latest_release(
            &self,
            _repo: &GitHubRepo,
        ) -> Result<UpdateInfo, UpdateError> {
            self.release_calls.fetch_add(1, Ordering::SeqCst);
            self.release
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| UpdateError::MalformedPayload("no release".to_string()))
        }
    }

    struct Harness {
        fetcher: Arc<FakeFetcher>,
        store: Arc<MemoryStore>,
        clock: Arc<ManualClock>,
        resolver: UpdateResolver,
    }

    fn harness(fetcher: FakeFetcher) -> Harness {
        let fetcher = Arc::new(fetcher);
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap(),
        ));
        let resolver = UpdateResolver::new(fetcher.clone(), store.clone(), clock.clone());
        Harness {
            fetcher,
            store,
            clock,
            resolver,
        }
    }

    fn custom_only() -> UpdateSourceConfig {
        UpdateSourceConfig::new(Some("https://updates.example.com/fra.json"), None).unwrap()
    }

    fn github_only() -> UpdateSourceConfig {
        UpdateSourceConfig::new(None, Some("example/france-relocation-assistant")).unwrap()
    }

    fn both_sources() -> UpdateSourceConfig {
        UpdateSourceConfig::new(
            Some("https://updates.example.com/fra.json"),
            Some("example/france-relocation-assistant"),
        )
        .unwrap()
    }

    fn manifest_info() -> UpdateInfo {
        let mut info = UpdateInfo::new("3.2.0");
        info.package = "https://x/pkg.zip".to_string();
        info
    }

    #[tokio::test]
    async fn resolves_within_ttl_with_a_single_fetch() {
        let h = harness(FakeFetcher::with_manifest(Some(manifest_info())));

        let first = h.resolver.resolve_update("3.1.0", &custom_only()).await;
        h.clock.advance(Duration::hours(11));
        let second = h.resolver.resolve_update("3.1.0", &custom_only()).await;

        assert_eq!(first, Some(manifest_info()));
        assert_eq!(second, Some(manifest_info()));
        assert_eq!(h.fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn refetches_after_ttl_expires() {
        let h = harness(FakeFetcher::with_manifest(Some(manifest_info())));

        h.resolver.resolve_update("3.1.0", &custom_only()).await;
        h.clock.advance(Duration::hours(CACHE_TTL_HOURS));
        h.resolver.resolve_update("3.1.0", &custom_only()).await;

        assert_eq!(h.fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn force_check_always_fetches() {
        let h = harness(FakeFetcher::with_manifest(Some(manifest_info())));

        h.resolver.resolve_update("3.1.0", &custom_only()).await;
        h.resolver.force_check("3.1.0", &custom_only()).await;
        h.resolver.force_check("3.1.0", &custom_only()).await;

        assert_eq!(h.fetcher.calls(), 3);
    }

    #[tokio::test]
    async fn cache_write_carries_twelve_hour_expiry() {
        let h = harness(FakeFetcher::with_manifest(Some(manifest_info())));
        let start = h.clock.now();

        h.resolver.resolve_update("3.1.0", &custom_only()).await;

        let record = h.store.get(UPDATE_CACHE_KEY).expect("info should be cached");
        assert_eq!(record.expires_at, Some(start + Duration::hours(12)));
    }

    #[tokio::test]
    async fn custom_endpoint_wins_over_github() {
        let fetcher = FakeFetcher::with_manifest(Some(manifest_info()));
        *fetcher.release.lock().unwrap() = Some(UpdateInfo::new("9.0.0"));
        let h = harness(fetcher);

        let info = h.resolver.resolve_update("3.1.0", &both_sources()).await;

        assert_eq!(info.map(|i| i.version), Some("3.2.0".to_string()));
        assert_eq!(h.fetcher.release_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn falls_back_to_github_when_custom_endpoint_fails() {
        let h = harness(FakeFetcher::with_release(Some(UpdateInfo::new("3.3.0"))));

        let info = h.resolver.resolve_update("3.1.0", &both_sources()).await;

        assert_eq!(info.map(|i| i.version), Some("3.3.0".to_string()));
        assert_eq!(h.fetcher.manifest_calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.fetcher.release_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failures_and_missing_config_yield_nothing_and_cache_nothing() {
        let h = harness(FakeFetcher::default());

        assert!(h.resolver.resolve_update("3.1.0", &custom_only()).await.is_none());
        assert!(h.resolver.resolve_update("3.1.0", &github_only()).await.is_none());
        assert!(
            h.resolver
                .resolve_update("3.1.0", &UpdateSourceConfig::default())
                .await
                .is_none()
        );
        assert!(h.store.get(UPDATE_CACHE_KEY).is_none());
        assert_eq!(h.fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn check_for_update_offers_only_newer_releases() {
        let h = harness(FakeFetcher::with_manifest(Some(manifest_info())));
        let identity = PluginIdentity::default();

        let offer = h
            .resolver
            .check_for_update("3.1.0", &custom_only(), &identity)
            .await
            .expect("newer release should be offered");
        assert_eq!(offer.new_version, "3.2.0");
        assert_eq!(offer.plugin, identity.basename);
        assert_eq!(offer.package, "https://x/pkg.zip");

        assert!(
            h.resolver
                .check_for_update("3.2.0", &custom_only(), &identity)
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn plugin_details_ignores_foreign_slugs() {
        let h = harness(FakeFetcher::with_manifest(Some(manifest_info())));
        let identity = PluginIdentity::default();

        assert!(
            h.resolver
                .plugin_details("3.1.0", &custom_only(), &identity, "akismet")
                .await
                .is_none()
        );
        assert_eq!(h.fetcher.calls(), 0);

        let details = h
            .resolver
            .plugin_details("3.1.0", &custom_only(), &identity, &identity.slug)
            .await
            .expect("details for our slug");
        assert_eq!(details.version, "3.2.0");
        assert_eq!(details.download_link, "https://x/pkg.zip");
        assert!(details.last_updated.is_none());
    }

    #[tokio::test]
    async fn self_update_records_history_and_clears_cache() {
        let h = harness(FakeFetcher::with_manifest(Some(manifest_info())));
        let identity = PluginIdentity::default();
        h.resolver.resolve_update("3.1.0", &custom_only()).await;

        let event = InstallerEvent {
            action: InstallerAction::Update,
            kind: PackageKind::Plugin,
            packages: vec![identity.basename.clone()],
            succeeded: true,
        };
        assert!(h.resolver.on_installer_complete(&event, &identity, "3.2.0"));

        assert!(h.store.get(UPDATE_CACHE_KEY).is_none());
        let last = h.resolver.last_update().expect("history should be recorded");
        assert_eq!(last.version, "3.2.0");
        assert_eq!(last.updated_at, h.clock.now());
    }

    struct ReadOnlyStore;

    impl CacheStore for ReadOnlyStore {
        fn get(&self, _key: &str) -> Option<crate::store::CacheRecord> {
            None
        }

        fn set(
            &self,
            _key: &str,
            _value: String,
            _expires_at: Option<DateTime<Utc>>,
        ) -> Result<(), StoreError> {
            Err(StoreError::Io {
                context: "read-only store",
                source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            })
        }

        fn delete(&self, _key: &str) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[test]
    fn failed_history_write_is_reported_not_recorded() {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap(),
        ));
        let resolver = UpdateResolver::new(
            Arc::new(FakeFetcher::default()),
            Arc::new(ReadOnlyStore),
            clock,
        );
        let identity = PluginIdentity::default();
        let event = InstallerEvent {
            action: InstallerAction::Update,
            kind: PackageKind::Plugin,
            packages: vec![identity.basename.clone()],
            succeeded: true,
        };

        assert!(matches!(
            resolver.record_last_update("3.2.0"),
            Err(StoreError::Io { .. })
        ));
        assert!(resolver.on_installer_complete(&event, &identity, "3.2.0"));
        assert!(resolver.last_update().is_none());
    }

    #[tokio::test]
    async fn cached_update_reports_expiry_and_freshness() {
        let h = harness(FakeFetcher::with_manifest(Some(manifest_info())));
        let start = h.clock.now();
        assert!(h.resolver.cached_update().is_none());

        h.resolver.resolve_update("3.1.0", &custom_only()).await;
        let cached = h.resolver.cached_update().expect("info should be cached");
        assert_eq!(cached.info, manifest_info());
        assert_eq!(cached.expires_at, Some(start + Duration::hours(CACHE_TTL_HOURS)));
        assert!(cached.fresh);

        h.clock.advance(Duration::hours(CACHE_TTL_HOURS));
        let stale = h.resolver.cached_update().expect("expired entry is still listed");
        assert!(!stale.fresh);
    }

    #[tokio::test]
    async fn unrelated_installer_events_touch_nothing() {
        let h = harness(FakeFetcher::with_manifest(Some(manifest_info())));
        let identity = PluginIdentity::default();
        h.resolver.resolve_update("3.1.0", &custom_only()).await;

        let event = InstallerEvent {
            action: InstallerAction::Update,
            kind: PackageKind::Plugin,
            packages: vec!["akismet/akismet.php".to_string()],
            succeeded: true,
        };
        assert!(!h.resolver.on_installer_complete(&event, &identity, "5.0"));

        assert!(h.store.get(UPDATE_CACHE_KEY).is_some());
        assert!(h.resolver.last_update().is_none());
    }
}
