//! `engineo apply` - drive the full workflow end to end.
//!
//! Preview, estimate, confirmation, rails, execute in one process, because
//! drafts and the confirmation gate live in memory. The two confirmation
//! factors map to `--acknowledge` and `--phrase`; without both the run
//! stops at the gate exactly as the interactive flow would.

use crate::commands::parse_scope;
use crate::project::ProjectFile;
use engineo_audit::AuditLogger;
use engineo_core::{EngineoConfig, PlaybookId};
use engineo_runtime::{PlaybookRun, RuntimeError};
use std::path::Path;
use std::sync::Arc;

#[allow(clippy::too_many_arguments)]
pub async fn run(
    config: &EngineoConfig,
    project_path: &Path,
    playbook: &str,
    scope: &str,
    ids: Option<&str>,
    principal: &str,
    acknowledge: bool,
    phrase: &str,
) -> anyhow::Result<()> {
    let playbook: PlaybookId = playbook.parse()?;
    let (option, explicit) = parse_scope(scope, ids)?;

    let loaded = ProjectFile::load(project_path)?.open(config);
    let audit = Arc::new(AuditLogger::new(config.audit.clone())?);

    let mut run = PlaybookRun::new(
        loaded.collaborators.clone(),
        audit,
        config,
        loaded.project_id.clone(),
        principal,
        playbook,
    );

    let outcome = drive(&mut run, option, &explicit, acknowledge, phrase).await;

    // Preview and draft generation consumed quota even when the apply was
    // blocked; persist whatever state the run left behind.
    let file = loaded.into_file().await?;
    file.save(project_path)?;

    match outcome {
        Ok(()) => Ok(()),
        Err(RuntimeError::RailBlocked(result)) => Err(anyhow::anyhow!(
            "blocked by safety rail ({}): {}",
            result.block_reason,
            result.message
        )),
        Err(e) => Err(e.into()),
    }
}

async fn drive(
    run: &mut PlaybookRun,
    option: engineo_core::ScopeOption,
    explicit: &std::collections::BTreeSet<engineo_core::AssetId>,
    acknowledge: bool,
    phrase: &str,
) -> Result<(), RuntimeError> {
    let scope = run.resolve_scope(option, explicit).await?;
    println!("scope: {} assets ({})", scope.len(), scope.option);

    let preview = run.generate_preview().await?;
    println!(
        "preview: {} samples{}",
        preview.samples.len(),
        if preview.limit_reached {
            " (daily limit reached)"
        } else {
            ""
        }
    );

    let drafts = run.generate_drafts().await?;
    println!(
        "drafts: {} generated, {} already valid{}",
        drafts.generated,
        drafts.already_valid,
        if drafts.limit_reached {
            " (daily limit reached)"
        } else {
            ""
        }
    );

    let estimate = run.continue_to_estimate().await?;
    println!(
        "estimate: {} assets, ~{} tokens, can_proceed={}",
        estimate.total_affected_assets, estimate.estimated_tokens, estimate.can_proceed
    );
    if !estimate.can_proceed {
        let reasons: Vec<String> = estimate.reasons.iter().map(|r| r.to_string()).collect();
        return Err(RuntimeError::InvalidTransition(format!(
            "cannot apply: {}",
            reasons.join(", ")
        )));
    }

    run.continue_to_apply().await?;
    run.acknowledge(acknowledge);
    run.type_phrase(phrase);
    if !run.is_confirmable() {
        return Err(RuntimeError::InvalidTransition(
            "confirmation incomplete: pass --acknowledge and --phrase apply".to_string(),
        ));
    }

    let result = run.confirm_and_apply().await?;
    println!(
        "applied: {} updated, {} skipped of {} attempted{}",
        result.updated,
        result.skipped,
        result.attempted,
        if result.limit_reached {
            " (stopped by daily limit)"
        } else {
            ""
        }
    );
    Ok(())
}
