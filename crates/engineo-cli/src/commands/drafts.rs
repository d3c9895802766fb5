//! `engineo drafts` - fill the draft cache for a scope.
//!
//! Drafts live in process memory, so this command mainly demonstrates the
//! quota behavior of bulk generation; the consumed usage is persisted back
//! to the project file.

use crate::commands::parse_scope;
use crate::project::ProjectFile;
use engineo_audit::AuditLogger;
use engineo_core::{EngineoConfig, PlaybookCatalog, PlaybookId, RunId};
use engineo_policy::resolve_scope;
use engineo_runtime::{AssetStore, DraftService};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

pub async fn run(
    config: &EngineoConfig,
    project_path: &Path,
    playbook: &str,
    scope: &str,
    ids: Option<&str>,
) -> anyhow::Result<()> {
    let playbook: PlaybookId = playbook.parse()?;
    let (option, explicit) = parse_scope(scope, ids)?;

    let loaded = ProjectFile::load(project_path)?.open(config);
    let catalog = PlaybookCatalog::from_config(&config.automation);
    let def = catalog
        .get(playbook)
        .ok_or_else(|| anyhow::anyhow!("playbook '{}' not in catalog", playbook))?
        .clone();

    let matching: BTreeSet<_> = loaded
        .store
        .list_matching(&loaded.project_id, def.target_field)
        .await?
        .into_iter()
        .map(|a| a.id)
        .collect();
    let scope = resolve_scope(option, &explicit, &matching)?;

    let service = DraftService::new(
        loaded.collaborators.clone(),
        config.automation.drafts.ttl(),
        Arc::new(AuditLogger::new(config.audit.clone())?),
    );
    let outcome = service
        .generate(&loaded.project_id, RunId::new(), &def, &scope)
        .await?;

    println!(
        "drafts generated: {} (already valid: {}{})",
        outcome.generated,
        outcome.already_valid,
        if outcome.limit_reached {
            ", stopped by daily limit"
        } else {
            ""
        }
    );

    let file = loaded.into_file().await?;
    file.save(project_path)?;
    Ok(())
}
