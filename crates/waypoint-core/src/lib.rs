//! # waypoint-core
//!
//! The deterministic decision-wizard engine for Waypoint - THE LOGIC.
//!
//! A user answers questions in an authored decision graph, toggles optional
//! features, and receives a deployment recipe tailored to those choices.
//!
//! ## Architectural Constraints
//!
//! The CORE:
//! - Never mutates the authored graph; sessions are the only mutable state
//! - Is deterministic: `BTreeMap`/`BTreeSet` everywhere, sorted tie-breaks
//! - Never panics; every failure is a `WizardError`
//! - Has NO async, NO network dependencies (pure Rust)
//!
//! Fetching the authoritative dataset and keeping the mirror fresh lives in
//! the `waypoint` app crate.

// =============================================================================
// MODULES
// =============================================================================

pub mod compatibility;
pub mod composer;
pub mod features;
pub mod graph;
pub mod integrity;
pub mod navigation;
pub mod primitives;
pub mod reconstruct;
pub mod sample;
pub mod storage;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    CapabilityDetail, CompatibilityRule, Component, ComponentId, ConfigField, Node, NodeId,
    NodeOption, NodeType, OptionId, Path, Recipe, RuleKind, Step, VersionToken, WizardError,
    pair_key,
};

// =============================================================================
// RE-EXPORTS: Wizard Engine
// =============================================================================

pub use compatibility::{
    AdmissionVerdict, CompatibilityEngine, CompatibilityIssue, CompatibilityReport,
};
pub use composer::{ComposedRecipe, ComposedStep, RecipeComposer, StepSource};
pub use features::{FeatureGroup, FeatureSelection, StepSlot};
pub use graph::{Dataset, Graph, GraphStore};
pub use integrity::{
    IntegrityReport, IntegrityViolation, inspect_integrity, validate_graph_integrity,
};
pub use navigation::{BackOutcome, Breadcrumb, HistoryEntry, NavigationEngine, NavigationSession};
pub use reconstruct::{PathReconstructor, ReconstructedPath};
pub use storage::RedbMirror;
