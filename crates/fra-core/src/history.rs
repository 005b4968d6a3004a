use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::PluginIdentity;

/// Durable note of the most recent successful self-update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastUpdate {
    pub version: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallerAction {
    Install,
    Update,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageKind {
    Plugin,
    Theme,
    Core,
    Translation,
}

/// What the host's package installer reports once it finishes a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallerEvent {
    pub action: InstallerAction,
    pub kind: PackageKind,
    pub packages: Vec<String>,
    pub succeeded: bool,
}

impl InstallerEvent {
    /// Whether this event confirms that our own plugin was updated. Fresh
    /// installs do not count.
    #[must_use]
    pub fn is_self_update(&self, identity: &PluginIdentity) -> bool {
        self.succeeded
            && self.action == InstallerAction::Update
            && self.kind == PackageKind::Plugin
            && self
                .packages
                .iter()
                .any(|package| package == &identity.basename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(kind: PackageKind, packages: &[&str], succeeded: bool) -> InstallerEvent {
        InstallerEvent {
            action: InstallerAction::Update,
            kind,
            packages: packages.iter().map(ToString::to_string).collect(),
            succeeded,
        }
    }

    #[test]
    fn self_update_requires_our_basename() {
        let identity = PluginIdentity::default();

        assert!(
            event(
                PackageKind::Plugin,
                &["akismet/akismet.php", identity.basename.as_str()],
                true
            )
            .is_self_update(&identity)
        );
        assert!(
            !event(PackageKind::Plugin, &["akismet/akismet.php"], true).is_self_update(&identity)
        );
    }

    #[test]
    fn installs_are_not_self_updates() {
        let identity = PluginIdentity::default();
        let mut install = event(PackageKind::Plugin, &[identity.basename.as_str()], true);
        install.action = InstallerAction::Install;

        assert!(!install.is_self_update(&identity));
    }

    #[test]
    fn failed_or_non_plugin_events_are_ignored() {
        let identity = PluginIdentity::default();

        let ours = [identity.basename.as_str()];

        assert!(!event(PackageKind::Plugin, &ours, false).is_self_update(&identity));
        assert!(!event(PackageKind::Theme, &ours, true).is_self_update(&identity));
    }
}
