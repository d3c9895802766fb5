//! Subcommand implementations.

pub mod apply;
pub mod audit;
pub mod drafts;
pub mod estimate;
pub mod playbooks;
pub mod preview;

use engineo_core::{AssetId, ScopeOption};
use std::collections::BTreeSet;

/// Parse the `--scope` / `--ids` argument pair.
///
/// `all` targets every currently matching asset; `selected` requires a
/// comma-separated `--ids` list.
pub fn parse_scope(
    scope: &str,
    ids: Option<&str>,
) -> anyhow::Result<(ScopeOption, BTreeSet<AssetId>)> {
    let option = match scope {
        "all" => ScopeOption::AllExisting,
        "selected" => ScopeOption::OnlySelected,
        other => {
            return Err(anyhow::anyhow!(
                "unknown scope '{}' (expected 'all' or 'selected')",
                other
            ));
        }
    };

    let explicit: BTreeSet<AssetId> = ids
        .map(|list| {
            list.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(AssetId::new)
                .collect()
        })
        .unwrap_or_default();

    if option == ScopeOption::OnlySelected && explicit.is_empty() {
        return Err(anyhow::anyhow!("--scope selected requires --ids"));
    }

    Ok((option, explicit))
}
