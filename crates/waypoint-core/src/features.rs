//! # Feature Catalog
//!
//! The pure domain model behind feature selection.
//!
//! Feature ids arrive as strings (coarse legacy ids such as `token-limits` or
//! granular ones such as `token-limits-request`). They are normalized once into
//! the closed `FeatureGroup` enumeration; every decision downstream (step slot,
//! synthesized text, capability governance) is an exhaustive `match` on the
//! enum, so adding a group without a slot does not compile.
//!
//! Labels, descriptions and widgets for the UI live with the authored
//! `Component` records, not here.

use crate::primitives::FEATURE_ID_SEPARATOR;
use crate::types::ComponentId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// =============================================================================
// FEATURE GROUPS
// =============================================================================

/// A family of features that share one recipe step.
///
/// Declaration order is the order in which synthesized steps are appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeatureGroup {
    TokenLimits,
    TokenMetrics,
    SemanticCaching,
    ContentSafety,
    ModelBackends,
    McpSupport,
    LoadBalancing,
    CircuitBreaker,
    Authentication,
    Authorization,
    Transformation,
    ResiliencePolicies,
}

/// Where a group's step comes from in a composed recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepSlot {
    /// An authored step with this number in the base recipe.
    Fixed(u32),
    /// No authored step; one summary step is generated.
    Synthesized,
}

impl FeatureGroup {
    /// Every group, in declaration order.
    pub const ALL: [FeatureGroup; 12] = [
        FeatureGroup::TokenLimits,
        FeatureGroup::TokenMetrics,
        FeatureGroup::SemanticCaching,
        FeatureGroup::ContentSafety,
        FeatureGroup::ModelBackends,
        FeatureGroup::McpSupport,
        FeatureGroup::LoadBalancing,
        FeatureGroup::CircuitBreaker,
        FeatureGroup::Authentication,
        FeatureGroup::Authorization,
        FeatureGroup::Transformation,
        FeatureGroup::ResiliencePolicies,
    ];

    /// Feature-id prefixes that belong to this group.
    ///
    /// The first entry is the canonical (coarse) id of the group.
    #[must_use]
    pub const fn id_prefixes(self) -> &'static [&'static str] {
        match self {
            Self::TokenLimits => &["token-limits"],
            Self::TokenMetrics => &["token-metrics"],
            Self::SemanticCaching => &["semantic-caching"],
            Self::ContentSafety => &["content-safety"],
            Self::ModelBackends => &["model-backends", "azure-openai", "openai", "ai-foundry"],
            Self::McpSupport => &["mcp-support"],
            Self::LoadBalancing => &["load-balancing"],
            Self::CircuitBreaker => &["circuit-breaker"],
            Self::Authentication => &["authentication"],
            Self::Authorization => &["authorization"],
            Self::Transformation => &[
                "transformation",
                "request-transformation",
                "response-transformation",
            ],
            Self::ResiliencePolicies => &["resilience"],
        }
    }

    /// The coarse id that selects the whole group.
    #[must_use]
    pub const fn canonical_id(self) -> &'static str {
        self.id_prefixes()[0]
    }

    /// The recipe step this group maps to.
    #[must_use]
    pub const fn slot(self) -> StepSlot {
        match self {
            Self::TokenLimits => StepSlot::Fixed(3),
            Self::TokenMetrics => StepSlot::Fixed(4),
            Self::SemanticCaching => StepSlot::Fixed(5),
            Self::ContentSafety => StepSlot::Fixed(6),
            Self::ModelBackends => StepSlot::Fixed(7),
            Self::McpSupport
            | Self::LoadBalancing
            | Self::CircuitBreaker
            | Self::Authentication
            | Self::Authorization
            | Self::Transformation
            | Self::ResiliencePolicies => StepSlot::Synthesized,
        }
    }

    /// Title and description of the generated step for this group.
    ///
    /// Fixed-slot groups also carry text: it is used when a recipe lacks the
    /// authored step for the slot.
    #[must_use]
    pub const fn summary(self) -> (&'static str, &'static str) {
        match self {
            Self::TokenLimits => (
                "Configure token limits",
                "Apply per-consumer token rate limits and quotas to model calls.",
            ),
            Self::TokenMetrics => (
                "Emit token metrics",
                "Publish prompt and completion token counts to the monitoring workspace.",
            ),
            Self::SemanticCaching => (
                "Enable semantic caching",
                "Attach an embeddings backend and cache similar prompts at the gateway.",
            ),
            Self::ContentSafety => (
                "Apply content safety",
                "Screen prompts and completions through the content safety service.",
            ),
            Self::ModelBackends => (
                "Register model backends",
                "Add the selected model endpoints as gateway backends.",
            ),
            Self::McpSupport => (
                "Expose MCP servers",
                "Publish tool endpoints through the gateway as Model Context Protocol servers.",
            ),
            Self::LoadBalancing => (
                "Configure load balancing",
                "Group backends into a pool and distribute requests across them.",
            ),
            Self::CircuitBreaker => (
                "Configure circuit breaker",
                "Trip unhealthy backends out of rotation and retry them after a cool-down.",
            ),
            Self::Authentication => (
                "Configure authentication",
                "Validate caller identity with subscription keys or OAuth tokens.",
            ),
            Self::Authorization => (
                "Configure authorization",
                "Restrict operations by role and claim before forwarding requests.",
            ),
            Self::Transformation => (
                "Configure request and response transformation",
                "Rewrite headers and payloads on the way in and out of the gateway.",
            ),
            Self::ResiliencePolicies => (
                "Apply resilience policies",
                "Add retry, timeout and fallback policies to backend calls.",
            ),
        }
    }

    /// Classify a feature id into its group, if any.
    ///
    /// Matching is by prefix: an id belongs to a group when it equals one of
    /// the group's prefixes or refines it (`prefix` + `-` + suffix).
    #[must_use]
    pub fn classify(id: &str) -> Option<FeatureGroup> {
        Self::ALL.into_iter().find(|group| {
            group
                .id_prefixes()
                .iter()
                .any(|prefix| is_refinement(id, prefix))
        })
    }
}

/// Check whether `id` is `base` or a granular refinement of it.
#[must_use]
pub fn is_refinement(id: &str, base: &str) -> bool {
    match id.strip_prefix(base) {
        Some("") => true,
        Some(rest) => rest.starts_with(FEATURE_ID_SEPARATOR),
        None => false,
    }
}

/// Check whether two ids are related by prefix in either direction.
#[must_use]
pub fn prefix_related(a: &str, b: &str) -> bool {
    is_refinement(a, b) || is_refinement(b, a)
}

// =============================================================================
// FEATURE SELECTION
// =============================================================================

/// A feature selection that passed the compatibility gate.
///
/// There is no public constructor besides `empty()`: a non-empty selection is
/// only produced by `CompatibilityEngine::admit`, so the composer cannot be
/// handed a selection with error-level conflicts.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FeatureSelection {
    features: BTreeSet<ComponentId>,
}

impl FeatureSelection {
    /// The empty selection. Always admissible.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn admitted(features: BTreeSet<ComponentId>) -> Self {
        Self { features }
    }

    /// Selected feature ids, sorted.
    pub fn ids(&self) -> impl Iterator<Item = &ComponentId> {
        self.features.iter()
    }

    /// Check whether the exact id was selected.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.features.iter().any(|f| f.as_str() == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Groups represented by the selection.
    #[must_use]
    pub fn groups(&self) -> BTreeSet<FeatureGroup> {
        self.features
            .iter()
            .filter_map(|id| FeatureGroup::classify(id.as_str()))
            .collect()
    }

    /// Selected ids that belong to no group.
    #[must_use]
    pub fn unrecognized(&self) -> Vec<ComponentId> {
        self.features
            .iter()
            .filter(|id| FeatureGroup::classify(id.as_str()).is_none())
            .cloned()
            .collect()
    }

    /// Check whether any selected id is prefix-related to `id`.
    #[must_use]
    pub fn touches(&self, id: &str) -> bool {
        self.features.iter().any(|f| prefix_related(f.as_str(), id))
    }
}

// =============================================================================
// TESTS
// =============================================================================
