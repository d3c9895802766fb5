//! Scope resolution: turning a scope option plus candidate asset sets into
//! the concrete target set for one run.

use crate::error::PolicyError;
use engineo_core::{AssetId, ScopeOption, ScopeSelection};
use std::collections::BTreeSet;

/// Resolve the concrete asset set for a run.
///
/// - `ONLY_SELECTED` requires a non-empty explicit selection; the result is
///   the explicit ids intersected with the currently matching set, so the
///   resolved scope is always a subset of assets that exist (and still have
///   the gap) at resolution time.
/// - `ALL_EXISTING` ignores the explicit selection and targets every
///   currently matching asset.
/// - `NEW_ONLY` / `EXISTING_AND_NEW` are reserved and rejected before any
///   estimate or apply can see them.
///
/// Staleness after resolution is tolerated here; the safety rails re-validate
/// the set immediately before apply.
pub fn resolve_scope(
    option: ScopeOption,
    explicit_ids: &BTreeSet<AssetId>,
    matching_ids: &BTreeSet<AssetId>,
) -> Result<ScopeSelection, PolicyError> {
    if option.is_reserved() {
        return Err(PolicyError::reserved_scope_option(option));
    }

    let asset_ids = match option {
        ScopeOption::OnlySelected => {
            if explicit_ids.is_empty() {
                return Err(PolicyError::empty_selection());
            }
            explicit_ids.intersection(matching_ids).cloned().collect()
        }
        ScopeOption::AllExisting => matching_ids.clone(),
        ScopeOption::NewOnly | ScopeOption::ExistingAndNew => unreachable!("rejected above"),
    };

    Ok(ScopeSelection { option, asset_ids })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PolicyErrorKind;

    fn ids(v: &[&str]) -> BTreeSet<AssetId> {
        v.iter().map(|s| AssetId::new(*s)).collect()
    }

    #[test]
    fn all_existing_ignores_explicit_selection() {
        let scope = resolve_scope(
            ScopeOption::AllExisting,
            &ids(&["p9"]),
            &ids(&["p1", "p2", "p3"]),
        )
        .unwrap();
        assert_eq!(scope.option, ScopeOption::AllExisting);
        assert_eq!(scope.len(), 3);
        assert!(!scope.contains(&AssetId::new("p9")));
    }

    #[test]
    fn only_selected_intersects_with_matching() {
        let scope = resolve_scope(
            ScopeOption::OnlySelected,
            &ids(&["p1", "p4"]),
            &ids(&["p1", "p2", "p3"]),
        )
        .unwrap();
        assert_eq!(scope.len(), 1);
        assert!(scope.contains(&AssetId::new("p1")));
    }

    #[test]
    fn only_selected_requires_explicit_ids() {
        let err = resolve_scope(ScopeOption::OnlySelected, &ids(&[]), &ids(&["p1"])).unwrap_err();
        assert_eq!(err.kind, PolicyErrorKind::EmptySelection);
    }

    #[test]
    fn reserved_options_are_rejected() {
        for option in [ScopeOption::NewOnly, ScopeOption::ExistingAndNew] {
            let err = resolve_scope(option, &ids(&["p1"]), &ids(&["p1"])).unwrap_err();
            assert_eq!(err.kind, PolicyErrorKind::ReservedScopeOption);
        }
    }
}
