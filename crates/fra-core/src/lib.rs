//! Update resolution for the France Relocation Assistant plugin.
//!
//! This crate decides whether a newer plugin release exists and where to
//! download it, independent of the host that schedules the checks:
//! - Version comparison for dotted release numbers.
//! - Release metadata from a custom JSON endpoint or GitHub releases.
//! - A TTL-aware record store with in-memory and on-disk backends.
//! - The resolver itself, plus the host's manual-check and installer hooks.

pub mod clock;
mod config;
mod fetch;
mod history;
pub mod manual;
mod nonce;
mod resolver;
pub mod store;
mod update;
mod version;

/// Injectable time source.
pub use clock::{Clock, ManualClock, SystemClock};
/// Validated update source settings and plugin identity.
pub use config::{ConfigError, GitHubRepo, PluginIdentity, UpdateSourceConfig};
/// Release metadata fetching over HTTP.
pub use fetch::{DEFAULT_GITHUB_API_BASE, FETCH_TIMEOUT, HttpReleaseFetcher, ReleaseFetcher};
/// Installer events and the durable self-update record.
pub use history::{InstallerAction, InstallerEvent, LastUpdate, PackageKind};
/// Admin manual-check entry point and response payloads.
pub use manual::{
    Caller, ManualCheckError, ManualCheckRequest, ManualCheckResponse, handle_manual_check,
    update_notice,
};
/// Request-forgery tokens for admin actions.
pub use nonce::NonceVerifier;
/// The cached update resolver.
pub use resolver::{
    CACHE_TTL_HOURS, CachedUpdate, LAST_UPDATE_KEY, UPDATE_CACHE_KEY, UpdateResolver,
};
/// Record stores.
pub use store::{CacheRecord, CacheStore, JsonFileStore, MemoryStore, StoreError};
/// Update metadata model, GitHub release mapping and notification check.
pub use update::{
    DetailSections, GitHubAsset, GitHubRelease, PluginDetails, UpdateError, UpdateInfo,
    UpdateOffer, info_from_release, parse_manifest, select_package, should_notify,
};
/// Version comparison helpers.
pub use version::{compare_versions, is_newer_version, version_from_tag};
