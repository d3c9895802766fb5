//! `engineo estimate` - compute the eligibility estimate for a playbook.

use crate::commands::parse_scope;
use crate::project::ProjectFile;
use engineo_audit::AuditLogger;
use engineo_core::{EngineoConfig, PlaybookCatalog, PlaybookId, RunId, TargetField};
use engineo_policy::resolve_scope;
use engineo_runtime::{AssetStore, EstimateResolver};
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
    let field: TargetField = catalog
        .get(playbook)
        .map(|d| d.target_field)
        .ok_or_else(|| anyhow::anyhow!("playbook '{}' not in catalog", playbook))?;

    let matching: BTreeSet<_> = loaded
        .store
        .list_matching(&loaded.project_id, field)
        .await?
        .into_iter()
        .map(|a| a.id)
        .collect();
    let scope = resolve_scope(option, &explicit, &matching)?;

    let resolver = EstimateResolver::new(
        loaded.collaborators.clone(),
        catalog,
        config.plans.clone(),
        Arc::new(AuditLogger::new(config.audit.clone())?),
    );
    let estimate = resolver
        .estimate(&loaded.project_id, RunId::new(), playbook, &scope)
        .await?;

    println!("{}", serde_json::to_string_pretty(&estimate)?);
    Ok(())
}
