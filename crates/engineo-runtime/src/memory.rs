//! In-memory collaborator implementations.
//!
//! These back the CLI's local project files and the crate's own tests. They
//! are deliberately simple but honest about the boundary semantics: the
//! asset store counts writes (so blocked runs can prove zero mutations) and
//! the entitlements meter consumes atomically.

use crate::adapter::{
    AssetRef, AssetStore, Authorizer, DraftCache, EntitlementsProvider, QuotaError, SuggestError,
    Suggestion, SuggestionProvider,
};
use async_trait::async_trait;
use engineo_core::{
    AssetId, Capabilities, Draft, EntitlementSnapshot, ProjectId, TargetField,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};

#[derive(Debug, Clone)]
struct AssetRecord {
    title: String,
    seo_title: Option<String>,
    seo_description: Option<String>,
}

impl AssetRecord {
    fn field(&self, field: TargetField) -> &Option<String> {
        match field {
            TargetField::SeoTitle => &self.seo_title,
            TargetField::SeoDescription => &self.seo_description,
        }
    }

    fn field_mut(&mut self, field: TargetField) -> &mut Option<String> {
        match field {
            TargetField::SeoTitle => &mut self.seo_title,
            TargetField::SeoDescription => &mut self.seo_description,
        }
    }
}

fn is_missing(value: &Option<String>) -> bool {
    match value {
        None => true,
        Some(s) => s.trim().is_empty(),
    }
}

/// Asset store over an in-memory product table. Counts writes so tests can
/// assert that blocked runs mutate nothing.
pub struct MemoryAssetStore {
    records: RwLock<BTreeMap<AssetId, AssetRecord>>,
    writes: AtomicU64,
}

impl MemoryAssetStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
            writes: AtomicU64::new(0),
        }
    }

    pub fn insert_asset(
        &self,
        id: &str,
        title: &str,
        seo_title: Option<&str>,
        seo_description: Option<&str>,
    ) {
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        records.insert(
            AssetId::new(id),
            AssetRecord {
                title: title.to_string(),
                seo_title: seo_title.map(str::to_string),
                seo_description: seo_description.map(str::to_string),
            },
        );
    }

    /// Set a field value directly, bypassing the write counter. Used to
    /// simulate out-of-band edits between estimate and apply.
    pub fn set_field(&self, id: &str, field: TargetField, value: &str) {
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        if let Some(record) = records.get_mut(&AssetId::new(id)) {
            *record.field_mut(field) = Some(value.to_string());
        }
    }

    pub fn field_value(&self, id: &str, field: TargetField) -> Option<String> {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        records.get(&AssetId::new(id)).and_then(|r| r.field(field).clone())
    }

    /// Number of writes that went through `write_field`.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }
}

impl Default for MemoryAssetStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AssetStore for MemoryAssetStore {
    async fn list_matching(
        &self,
        _project: &ProjectId,
        field: TargetField,
    ) -> anyhow::Result<Vec<AssetRef>> {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        Ok(records
            .iter()
            .filter(|(_, r)| is_missing(r.field(field)))
            .map(|(id, r)| AssetRef {
                id: id.clone(),
                title: r.title.clone(),
                current_value: r.field(field).clone(),
            })
            .collect())
    }

    async fn write_field(
        &self,
        _project: &ProjectId,
        asset: &AssetId,
        field: TargetField,
        value: &str,
    ) -> anyhow::Result<()> {
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        let record = records
            .get_mut(asset)
            .ok_or_else(|| anyhow::anyhow!("asset '{}' not found", asset))?;
        *record.field_mut(field) = Some(value.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Entitlements with an atomic daily meter. The plan can be swapped at any
/// time to simulate mid-run downgrades.
pub struct MeteredEntitlements {
    plan: RwLock<String>,
    limit: u64,
    used: Mutex<u64>,
}

impl MeteredEntitlements {
    pub fn new(plan: &str, daily_limit: u64) -> Self {
        Self::with_used(plan, daily_limit, 0)
    }

    /// Start the meter with tokens already consumed today.
    pub fn with_used(plan: &str, daily_limit: u64, used: u64) -> Self {
        Self {
            plan: RwLock::new(plan.to_string()),
            limit: daily_limit,
            used: Mutex::new(used),
        }
    }

    pub fn set_plan(&self, plan: &str) {
        let mut current = self.plan.write().unwrap_or_else(|e| e.into_inner());
        *current = plan.to_string();
    }
}

#[async_trait]
impl EntitlementsProvider for MeteredEntitlements {
    async fn snapshot(&self, _project: &ProjectId) -> anyhow::Result<EntitlementSnapshot> {
        let plan = self.plan.read().unwrap_or_else(|e| e.into_inner()).clone();
        let used = *self.used.lock().unwrap_or_else(|e| e.into_inner());
        Ok(EntitlementSnapshot {
            plan,
            daily_limit: self.limit,
            used,
        })
    }

    async fn try_consume(&self, _project: &ProjectId, units: u64) -> Result<(), QuotaError> {
        let mut used = self.used.lock().unwrap_or_else(|e| e.into_inner());
        if *used + units > self.limit {
            return Err(QuotaError::Exhausted);
        }
        *used += units;
        Ok(())
    }
}

/// Deterministic rule-based suggestions: the same asset always yields the
/// same value, which keeps previews reproducible.
pub struct RuleSuggestionProvider;

impl RuleSuggestionProvider {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RuleSuggestionProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SuggestionProvider for RuleSuggestionProvider {
    async fn suggest(
        &self,
        _project: &ProjectId,
        asset: &AssetRef,
        field: TargetField,
    ) -> Result<Suggestion, SuggestError> {
        let value = match field {
            TargetField::SeoTitle => format!("{} | Shop Online", asset.title),
            TargetField::SeoDescription => format!(
                "Discover {} in our store. Quality you can trust, fast shipping and easy returns.",
                asset.title
            ),
        };

        let recommended = match field {
            TargetField::SeoTitle => 60,
            TargetField::SeoDescription => 160,
        };
        let mut warnings = Vec::new();
        if value.chars().count() > recommended {
            warnings.push(format!("exceeds the recommended {} characters", recommended));
        }

        Ok(Suggestion { value, warnings })
    }
}

/// Draft cache keyed by (project, asset, field).
pub struct MemoryDraftCache {
    entries: RwLock<BTreeMap<(ProjectId, AssetId, TargetField), Draft>>,
}

impl MemoryDraftCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
        }
    }
}

impl Default for MemoryDraftCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DraftCache for MemoryDraftCache {
    async fn get(
        &self,
        project: &ProjectId,
        asset: &AssetId,
        field: TargetField,
    ) -> anyhow::Result<Option<Draft>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        Ok(entries
            .get(&(project.clone(), asset.clone(), field))
            .cloned())
    }

    async fn put(
        &self,
        project: &ProjectId,
        asset: &AssetId,
        field: TargetField,
        draft: Draft,
    ) -> anyhow::Result<()> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert((project.clone(), asset.clone(), field), draft);
        Ok(())
    }
}

/// Authorizer that returns the same capabilities for every principal.
pub struct StaticAuthorizer {
    capabilities: Capabilities,
}

impl StaticAuthorizer {
    pub fn new(capabilities: Capabilities) -> Self {
        Self { capabilities }
    }
}

#[async_trait]
impl Authorizer for StaticAuthorizer {
    async fn capabilities(
        &self,
        _project: &ProjectId,
        _principal: &str,
    ) -> anyhow::Result<Capabilities> {
        Ok(self.capabilities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn matching_means_missing_or_empty() {
        let store = MemoryAssetStore::new();
        store.insert_asset("p1", "Red Mug", None, None);
        store.insert_asset("p2", "Blue Mug", Some(""), None);
        store.insert_asset("p3", "Green Mug", Some("Green Mug | Shop"), None);

        let matching = store
            .list_matching(&ProjectId::new("proj_1"), TargetField::SeoTitle)
            .await
            .unwrap();
        let ids: Vec<_> = matching.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p2"]);
    }

    #[tokio::test]
    async fn meter_refuses_overdraft() {
        let meter = MeteredEntitlements::new("pro", 3);
        let project = ProjectId::new("proj_1");

        meter.try_consume(&project, 2).await.unwrap();
        assert!(matches!(
            meter.try_consume(&project, 2).await,
            Err(QuotaError::Exhausted)
        ));
        meter.try_consume(&project, 1).await.unwrap();

        let snapshot = meter.snapshot(&project).await.unwrap();
        assert_eq!(snapshot.used, 3);
        assert_eq!(snapshot.daily().remaining, 0);
    }

    #[tokio::test]
    async fn suggestions_are_deterministic() {
        let provider = RuleSuggestionProvider::new();
        let asset = AssetRef {
            id: AssetId::new("p1"),
            title: "Red Mug".to_string(),
            current_value: None,
        };
        let project = ProjectId::new("proj_1");

        let a = provider
            .suggest(&project, &asset, TargetField::SeoTitle)
            .await
            .unwrap();
        let b = provider
            .suggest(&project, &asset, TargetField::SeoTitle)
            .await
            .unwrap();
        assert_eq!(a.value, b.value);
        assert_eq!(a.value, "Red Mug | Shop Online");
    }
}
