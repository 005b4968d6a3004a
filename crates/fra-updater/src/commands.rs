use std::path::PathBuf;
use std::sync::Arc;

use fra_core::{
    Caller, Clock, InstallerEvent, ManualCheckRequest, NonceVerifier, PluginIdentity,
    UpdateResolver, UpdateSourceConfig, handle_manual_check, manual::MANUAL_CHECK_ACTION,
    update_notice,
};
use log::info;
use serde_json::{Value, json};

use crate::cli::Command;
use crate::error::AppError;
use crate::settings::UpdaterSettings;

/// Everything a command needs, wired by `main` or by tests.
pub struct Context {
    pub settings: UpdaterSettings,
    pub settings_path: PathBuf,
    pub source: UpdateSourceConfig,
    pub identity: PluginIdentity,
    pub current_version: String,
    pub resolver: UpdateResolver,
    pub clock: Arc<dyn Clock>,
}

impl Context {
    fn nonces(&self) -> Result<NonceVerifier, AppError> {
        let secret = self.settings.nonce_secret()?;
        Ok(NonceVerifier::new(secret, self.clock.clone()))
    }
}

/// Run one host entry point and return its JSON output.
pub async fn run(command: Command, ctx: &Context) -> Result<Value, AppError> {
    let current = ctx.current_version.as_str();

    let output = match command {
        Command::Check => {
            let offer = ctx
                .resolver
                .check_for_update(current, &ctx.source, &ctx.identity)
                .await;
            json!({ "current_version": current, "update": offer })
        }
        Command::ForceCheck => {
            let info = ctx.resolver.force_check(current, &ctx.source).await;
            let has_update = info
                .as_ref()
                .is_some_and(|info| fra_core::should_notify(current, info));
            json!({ "current_version": current, "has_update": has_update, "info": info })
        }
        Command::ClearCache => {
            ctx.resolver.invalidate_cache();
            info!("Update cache cleared");
            json!({ "cleared": true })
        }
        Command::Details { slug } => {
            let slug = slug.unwrap_or_else(|| ctx.identity.slug.clone());
            let details = ctx
                .resolver
                .plugin_details(current, &ctx.source, &ctx.identity, &slug)
                .await;
            json!({ "details": details })
        }
        Command::Notice => {
            let notice = ctx
                .resolver
                .resolve_update(current, &ctx.source)
                .await
                .and_then(|info| update_notice(current, &info));
            json!({ "notice": notice })
        }
        Command::IssueNonce { user_id } => {
            let token = ctx.nonces()?.issue(MANUAL_CHECK_ACTION, user_id);
            json!({ "action": MANUAL_CHECK_ACTION, "user_id": user_id, "nonce": token })
        }
        Command::ManualCheck {
            user_id,
            capabilities,
            nonce,
        } => {
            let nonces = ctx.nonces()?;
            let request = ManualCheckRequest {
                caller: Caller {
                    user_id,
                    capabilities,
                },
                nonce,
            };
            let response =
                handle_manual_check(&ctx.resolver, &nonces, &request, current, &ctx.source).await;
            serde_json::to_value(response).map_err(AppError::Json)?
        }
        Command::InstallerComplete {
            action,
            kind,
            packages,
            installed_version,
            failed,
        } => {
            let event = InstallerEvent {
                action: action.into(),
                kind: kind.into(),
                packages,
                succeeded: !failed,
            };
            let recorded = ctx
                .resolver
                .on_installer_complete(&event, &ctx.identity, &installed_version);
            json!({ "recorded": recorded })
        }
        Command::Status => {
            json!({
                "current_version": current,
                "sources_configured": ctx.source.is_configured(),
                "cached": ctx.resolver.cached_update(),
                "last_update": ctx.resolver.last_update(),
            })
        }
        Command::Configure {
            update_url,
            github_repo,
            nonce_secret,
            debug_logging,
        } => {
            let mut settings = ctx.settings.clone();
            if let Some(url) = update_url {
                settings.update_url = non_blank(url);
            }
            if let Some(repo) = github_repo {
                settings.github_repo = non_blank(repo);
            }
            if let Some(secret) = nonce_secret {
                settings.nonce_secret = non_blank(secret);
            }
            if let Some(enabled) = debug_logging {
                settings.debug_logging = enabled;
            }

            settings.save_to_path(&ctx.settings_path)?;
            info!("Saved settings to {}", ctx.settings_path.display());
            json!({
                "saved": ctx.settings_path.display().to_string(),
                "sources_configured": settings.source_config()?.is_configured(),
            })
        }
    };

    Ok(output)
}

fn non_blank(value: String) -> Option<String> {
    (!value.trim().is_empty()).then_some(value)
}
