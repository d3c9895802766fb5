//! `engineo preview` - generate a bounded before/after sample.

use crate::commands::parse_scope;
use crate::project::ProjectFile;
use engineo_audit::AuditLogger;
use engineo_core::{EngineoConfig, PlaybookCatalog, PlaybookId, PreviewSample, RunId};
use engineo_policy::resolve_scope;
use engineo_runtime::{AssetStore, PreviewError, PreviewGenerator};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

pub async fn run(
    config: &EngineoConfig,
    project_path: &Path,
    playbook: &str,
    scope: &str,
    ids: Option<&str>,
    samples: Option<usize>,
) -> anyhow::Result<()> {
    let playbook: PlaybookId = playbook.parse()?;
    let (option, explicit) = parse_scope(scope, ids)?;
    let sample_size = samples.unwrap_or(config.automation.preview.sample_size);

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

    let generator = PreviewGenerator::new(
        loaded.collaborators.clone(),
        config.automation.drafts.ttl(),
        Arc::new(AuditLogger::new(config.audit.clone())?),
    );
    let outcome = generator
        .preview(&loaded.project_id, RunId::new(), &def, &scope, sample_size)
        .await;

    let (samples, limit_reached) = match outcome {
        Ok(samples) => (samples, false),
        Err(PreviewError::AiDailyLimitReached { samples }) => (samples, true),
        Err(e) => return Err(e.into()),
    };

    print_samples(&samples);
    if limit_reached {
        println!("(stopped early: daily AI usage limit reached)");
    }

    // Preview consumes quota; persist the updated counter.
    let file = loaded.into_file().await?;
    file.save(project_path)?;
    Ok(())
}

fn print_samples(samples: &[PreviewSample]) {
    if samples.is_empty() {
        println!("no samples: nothing in scope matches this playbook");
        return;
    }
    for sample in samples {
        println!("asset {} ({})", sample.asset_id, sample.asset_title);
        println!(
            "  current:  {}",
            sample.current_value.as_deref().unwrap_or("(empty)")
        );
        println!("  proposed: {}", sample.proposed_value);
        for warning in &sample.warnings {
            println!("  warning:  {}", warning);
        }
    }
}
