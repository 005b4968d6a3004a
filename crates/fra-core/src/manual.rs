//! The admin "check for updates now" action.

use log::{info, warn};
use serde::Serialize;
use thiserror::Error;

use crate::config::UpdateSourceConfig;
use crate::nonce::NonceVerifier;
use crate::resolver::UpdateResolver;
use crate::update::{UpdateInfo, should_notify};

pub const MANUAL_CHECK_ACTION: &str = "fra_check_update";
pub const REQUIRED_CAPABILITY: &str = "update_plugins";

const PRODUCT_NAME: &str = "France Relocation Assistant";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ManualCheckError {
    #[error("Security check failed.")]
    InvalidNonce,
    #[error("You do not have permission to check for updates.")]
    PermissionDenied,
}

/// The user invoking an admin action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: u64,
    pub capabilities: Vec<String>,
}

impl Caller {
    #[must_use]
    pub fn can(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|c| c == capability)
    }
}

#[derive(Debug, Clone)]
pub struct ManualCheckRequest {
    pub caller: Caller,
    pub nonce: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateReport {
    pub has_update: bool,
    pub current_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_version: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureData {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ManualCheckData {
    Report(UpdateReport),
    Failure(FailureData),
}

/// JSON body answered to the manual check, `{"success": .., "data": ..}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManualCheckResponse {
    pub success: bool,
    pub data: ManualCheckData,
}

impl ManualCheckResponse {
    fn report(report: UpdateReport) -> Self {
        Self {
            success: true,
            data: ManualCheckData::Report(report),
        }
    }

    fn failure(error: ManualCheckError) -> Self {
        Self {
            success: false,
            data: ManualCheckData::Failure(FailureData {
                message: error.to_string(),
            }),
        }
    }
}

/// Admin notice text for an available update.
#[must_use]
pub fn update_notice(current_version: &str, info: &UpdateInfo) -> Option<String> {
    should_notify(current_version, info).then(|| {
        format!(
            "{PRODUCT_NAME} {} is available (installed: {current_version}).",
            info.version
        )
    })
}

/// Check the caller may run a manual check.
///
/// # Errors
/// Returns [`ManualCheckError::InvalidNonce`] for a bad token and
/// [`ManualCheckError::PermissionDenied`] when the caller lacks
/// [`REQUIRED_CAPABILITY`].
pub fn authorize(
    request: &ManualCheckRequest,
    nonces: &NonceVerifier,
) -> Result<(), ManualCheckError> {
    if !nonces.verify(&request.nonce, MANUAL_CHECK_ACTION, request.caller.user_id) {
        return Err(ManualCheckError::InvalidNonce);
    }
    if !request.caller.can(REQUIRED_CAPABILITY) {
        return Err(ManualCheckError::PermissionDenied);
    }
    Ok(())
}

/// Run a forced update check on behalf of an admin. Unauthorized callers get
/// a failure payload and nothing is fetched or cleared.
pub async fn handle_manual_check(
    resolver: &UpdateResolver,
    nonces: &NonceVerifier,
    request: &ManualCheckRequest,
    current_version: &str,
    config: &UpdateSourceConfig,
) -> ManualCheckResponse {
    if let Err(error) = authorize(request, nonces) {
        warn!(
            "Rejected manual update check from user {}: {error}",
            request.caller.user_id
        );
        return ManualCheckResponse::failure(error);
    }

    info!("Manual update check by user {}", request.caller.user_id);
    let info = resolver.force_check(current_version, config).await;

    let report = match info {
        Some(info) if should_notify(current_version, &info) => UpdateReport {
            has_update: true,
            current_version: current_version.to_string(),
            message: format!(
                "Version {} is available. You are running {current_version}.",
                info.version
            ),
            new_version: Some(info.version),
        },
        _ => UpdateReport {
            has_update: false,
            current_version: current_version.to_string(),
            new_version: None,
            message: format!("You are running the latest version ({current_version})."),
        },
    };
    ManualCheckResponse::report(report)
}
