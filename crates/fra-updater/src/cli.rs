use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use fra_core::{InstallerAction, PackageKind};

/// Update checks for the France Relocation Assistant plugin
#[derive(Parser, Debug)]
#[command(name = "fra-updater")]
#[command(about = "Resolve and report France Relocation Assistant updates")]
#[command(version)]
pub struct Cli {
    /// Settings file to use instead of the per-user default
    #[arg(long, value_name = "PATH", global = true)]
    pub settings: Option<PathBuf>,

    /// Running plugin version, overriding `current_version` from settings
    #[arg(long, value_name = "VERSION", global = true)]
    pub current_version: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Scheduled check: print an update offer when a newer release exists
    Check,
    /// Clear the cache and check again
    ForceCheck,
    /// Drop the cached release info
    ClearCache,
    /// Print the "view details" payload for a plugin slug
    Details {
        /// Slug being asked about; defaults to ours
        #[arg(long)]
        slug: Option<String>,
    },
    /// Print the admin notice text, if an update is available
    Notice,
    /// Issue a manual-check token for a user
    IssueNonce {
        #[arg(long)]
        user_id: u64,
    },
    /// Run the guarded manual check and print its JSON response
    ManualCheck {
        #[arg(long)]
        user_id: u64,
        /// Capability held by the caller; repeat for several
        #[arg(long = "capability", value_name = "CAP")]
        capabilities: Vec<String>,
        #[arg(long)]
        nonce: String,
    },
    /// Report a finished installer run
    InstallerComplete {
        #[arg(long, value_enum)]
        action: ActionArg,
        #[arg(long, value_enum)]
        kind: KindArg,
        /// Package basename touched by the run; repeat for several
        #[arg(long = "package", value_name = "BASENAME")]
        packages: Vec<String>,
        /// Version now installed
        #[arg(long)]
        installed_version: String,
        /// The run did not succeed
        #[arg(long)]
        failed: bool,
    },
    /// Show the cached release info and the last self-update
    Status,
    /// Update the settings file; a blank value clears a source
    Configure {
        #[arg(long, value_name = "URL")]
        update_url: Option<String>,
        /// Release repository as owner/name
        #[arg(long, value_name = "OWNER/NAME")]
        github_repo: Option<String>,
        #[arg(long)]
        nonce_secret: Option<String>,
        #[arg(long)]
        debug_logging: Option<bool>,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionArg {
    Install,
    Update,
}

impl From<ActionArg> for InstallerAction {
    fn from(value: ActionArg) -> Self {
        match value {
            ActionArg::Install => Self::Install,
            ActionArg::Update => Self::Update,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindArg {
    Plugin,
    Theme,
    Core,
    Translation,
}

impl From<KindArg> for PackageKind {
    fn from(value: KindArg) -> Self {
        match value {
            KindArg::Plugin => Self::Plugin,
            KindArg::Theme => Self::Theme,
            KindArg::Core => Self::Core,
            KindArg::Translation => Self::Translation,
        }
    }
}
