use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

// Configuration types shared across all EngineO crates
pub mod config;

// Re-export commonly used config types for convenience
pub use config::{
    AuditConfig,
    AutomationConfig,
    DraftsConfig,
    // Main config
    EngineoConfig,
    PlansConfig,
    PlaybookOverride,
    PreviewConfig,
    StorageBackend,
};

/// Opaque identifier for a project (one connected storefront).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(pub String);

impl ProjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque identifier for a content asset (e.g. a product record).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(pub String);

impl AssetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier for one playbook run context. All audit events emitted by a run
/// share its id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Static catalog identifier for a playbook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybookId {
    MissingSeoTitle,
    MissingSeoDescription,
}

impl PlaybookId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingSeoTitle => "missing_seo_title",
            Self::MissingSeoDescription => "missing_seo_description",
        }
    }
}

impl fmt::Display for PlaybookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PlaybookId {
    type Err = UnknownPlaybook;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "missing_seo_title" => Ok(Self::MissingSeoTitle),
            "missing_seo_description" => Ok(Self::MissingSeoDescription),
            other => Err(UnknownPlaybook(other.to_string())),
        }
    }
}

/// Error returned when parsing an unknown playbook identifier.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown playbook '{0}'")]
pub struct UnknownPlaybook(pub String);

/// The asset field a playbook fills in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TargetField {
    SeoTitle,
    SeoDescription,
}

impl fmt::Display for TargetField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SeoTitle => write!(f, "seoTitle"),
            Self::SeoDescription => write!(f, "seoDescription"),
        }
    }
}

/// One entry of the static playbook catalog. Immutable after startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybookDefinition {
    pub id: PlaybookId,
    pub target_field: TargetField,
    pub name: String,
    pub description: String,
    /// Deterministic token cost per affected asset for this playbook.
    pub tokens_per_asset: u64,
}

/// The built-in playbook catalog, optionally adjusted by configuration.
#[derive(Debug, Clone)]
pub struct PlaybookCatalog {
    playbooks: Vec<PlaybookDefinition>,
}

impl PlaybookCatalog {
    /// The built-in catalog.
    pub fn builtin() -> Self {
        Self {
            playbooks: vec![
                PlaybookDefinition {
                    id: PlaybookId::MissingSeoTitle,
                    target_field: TargetField::SeoTitle,
                    name: "Missing SEO title".to_string(),
                    description: "Fill empty SEO titles from product content".to_string(),
                    tokens_per_asset: 60,
                },
                PlaybookDefinition {
                    id: PlaybookId::MissingSeoDescription,
                    target_field: TargetField::SeoDescription,
                    name: "Missing SEO description".to_string(),
                    description: "Fill empty SEO descriptions from product content".to_string(),
                    tokens_per_asset: 160,
                },
            ],
        }
    }

    /// Build the catalog with per-playbook overrides from configuration.
    pub fn from_config(config: &AutomationConfig) -> Self {
        let mut catalog = Self::builtin();
        for def in &mut catalog.playbooks {
            if let Some(over) = config.playbooks.get(&def.id) {
                if let Some(tokens) = over.tokens_per_asset {
                    def.tokens_per_asset = tokens;
                }
                if let Some(name) = &over.name {
                    def.name = name.clone();
                }
            }
        }
        catalog
    }

    pub fn get(&self, id: PlaybookId) -> Option<&PlaybookDefinition> {
        self.playbooks.iter().find(|p| p.id == id)
    }

    pub fn all(&self) -> &[PlaybookDefinition] {
        &self.playbooks
    }
}

/// How the target set of a run is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScopeOption {
    /// Only the explicitly selected assets.
    OnlySelected,
    /// All assets currently matching the playbook's gap condition.
    AllExisting,
    /// Reserved: future assets only. Not executable.
    NewOnly,
    /// Reserved: existing plus future assets. Not executable.
    ExistingAndNew,
}

impl ScopeOption {
    /// Reserved options are represented for forward compatibility but are
    /// never executable in the current version.
    pub fn is_reserved(&self) -> bool {
        matches!(self, Self::NewOnly | Self::ExistingAndNew)
    }
}

impl fmt::Display for ScopeOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OnlySelected => write!(f, "ONLY_SELECTED"),
            Self::AllExisting => write!(f, "ALL_EXISTING"),
            Self::NewOnly => write!(f, "NEW_ONLY"),
            Self::ExistingAndNew => write!(f, "EXISTING_AND_NEW"),
        }
    }
}

/// The resolved target set for one run. Asset ids are unique and iterate in a
/// stable order, which is what makes preview sampling deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeSelection {
    pub option: ScopeOption,
    pub asset_ids: BTreeSet<AssetId>,
}

impl ScopeSelection {
    pub fn len(&self) -> usize {
        self.asset_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.asset_ids.is_empty()
    }

    pub fn contains(&self, id: &AssetId) -> bool {
        self.asset_ids.contains(id)
    }
}

/// A reason an estimate cannot proceed. All holding reasons are reported
/// together so callers can display every blocking cause at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockingReason {
    PlanNotEligible,
    NoAffectedProducts,
    AiDailyLimitReached,
    TokenCapWouldBeExceeded,
}

impl fmt::Display for BlockingReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PlanNotEligible => write!(f, "plan_not_eligible"),
            Self::NoAffectedProducts => write!(f, "no_affected_products"),
            Self::AiDailyLimitReached => write!(f, "ai_daily_limit_reached"),
            Self::TokenCapWouldBeExceeded => write!(f, "token_cap_would_be_exceeded"),
        }
    }
}

/// Daily AI usage counters, denominated in tokens, at the time an estimate
/// was computed. The remaining value is advisory-stale: consumers must
/// re-check before any quota-consuming action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiDailyLimit {
    pub limit: u64,
    pub used: u64,
    pub remaining: u64,
}

impl AiDailyLimit {
    pub fn new(limit: u64, used: u64) -> Self {
        Self {
            limit,
            used,
            remaining: limit.saturating_sub(used),
        }
    }

    pub fn exhausted(&self) -> bool {
        self.remaining == 0
    }
}

/// A derived, disposable snapshot of whether and how a playbook can run.
/// Computed on demand, never persisted, recomputed after any apply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybookEstimate {
    pub total_affected_assets: u64,
    pub estimated_tokens: u64,
    pub plan_id: String,
    pub eligible: bool,
    pub can_proceed: bool,
    pub reasons: BTreeSet<BlockingReason>,
    pub ai_daily_limit: AiDailyLimit,
    /// Signature of the resolved scope and target field; the safety rails
    /// compare it against a fresh read to detect staleness.
    pub scope_signature: String,
}

/// One before/after pair for human review. Never written back automatically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewSample {
    pub asset_id: AssetId,
    pub asset_title: String,
    pub field: TargetField,
    pub current_value: Option<String>,
    pub proposed_value: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Why the safety rails blocked a run, if they did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RailBlockReason {
    EntitlementDenied,
    ScopeChanged,
    DraftExpired,
    DailyLimitReached,
    None,
}

impl fmt::Display for RailBlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EntitlementDenied => write!(f, "entitlement_denied"),
            Self::ScopeChanged => write!(f, "scope_changed"),
            Self::DraftExpired => write!(f, "draft_expired"),
            Self::DailyLimitReached => write!(f, "daily_limit_reached"),
            Self::None => write!(f, "none"),
        }
    }
}

/// Outcome of the pre-execution guard chain. If `blocked` is true the apply
/// executor must not run and zero assets may be mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyRailResult {
    pub blocked: bool,
    pub block_reason: RailBlockReason,
    pub message: String,
}

impl SafetyRailResult {
    /// All checks passed; execution may start.
    pub fn clear() -> Self {
        Self {
            blocked: false,
            block_reason: RailBlockReason::None,
            message: String::new(),
        }
    }

    pub fn block(reason: RailBlockReason, message: impl Into<String>) -> Self {
        Self {
            blocked: true,
            block_reason: reason,
            message: message.into(),
        }
    }
}

/// Outcome of one apply invocation. Created once per run, surfaced to the
/// user and logged; never retried automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ApplyResult {
    pub attempted: u64,
    pub updated: u64,
    pub skipped: u64,
    pub limit_reached: bool,
}

/// An unapplied suggestion cached for an asset/field pair, valid until
/// `expires_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    pub value: String,
    pub generated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Draft {
    pub fn new(value: impl Into<String>, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            value: value.into(),
            generated_at: now,
            expires_at: now + ttl,
        }
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Capability flags for the calling principal on one project. Gates the
/// apply affordance; never relied on as the sole check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub can_view: bool,
    pub can_apply: bool,
}

/// Plan tier and usage counters as reported by the entitlements collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitlementSnapshot {
    pub plan: String,
    pub daily_limit: u64,
    pub used: u64,
}

impl EntitlementSnapshot {
    pub fn daily(&self) -> AiDailyLimit {
        AiDailyLimit::new(self.daily_limit, self.used)
    }
}
