//! # Core Type Definitions
//!
//! This module contains all core types for the Waypoint decision graph:
//! - Identifiers (`NodeId`, `OptionId`, `ComponentId`, `VersionToken`)
//! - Authored records (`Node`, `NodeOption`, `Path`, `Recipe`, `Component`, `CompatibilityRule`)
//! - Error types (`WizardError`)
//!
//! ## Determinism Guarantees
//!
//! All identifiers implement `Ord` so collections keyed by them can live in
//! `BTreeMap`/`BTreeSet` and iterate in a stable order. The one exception is
//! `VersionToken`, which is deliberately equality-only.
//!
//! ## Wire Format
//!
//! Records serialize with camelCase field names, matching the authoritative
//! store's plain-record exchange format.

use crate::compatibility::CompatibilityIssue;
use crate::features::FeatureGroup;
use crate::integrity::IntegrityReport;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Create an identifier from anything string-like.
            #[must_use]
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            /// Get the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(
    /// Identifier of a node in the decision graph.
    NodeId
);

string_id!(
    /// Identifier of an option. Option ids are globally unique, not per node.
    OptionId
);

string_id!(
    /// Identifier of a selectable component or feature.
    ComponentId
);

/// Opaque marker of the authoritative dataset revision.
///
/// Compared only by equality: no `Ord`, no parsing. A different token means
/// "refresh", never "newer" or "older".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionToken(pub String);

impl VersionToken {
    /// Create a token from anything string-like.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the token as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// NODE
// =============================================================================

/// The role a node plays in the decision graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeType {
    /// The single entry point of the graph.
    Root,
    /// An ordinary question with fixed outgoing edges.
    Question,
    /// A node whose options are togglable features rather than edges.
    FeatureSelection,
    /// A node owning a recipe. Ends navigation.
    Terminal,
}

/// A point in the decision graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    pub question: String,
    #[serde(default)]
    pub description: String,
    pub node_type: NodeType,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl Node {
    /// Create a node with no description or tags.
    #[must_use]
    pub fn new(id: impl Into<NodeId>, question: impl Into<String>, node_type: NodeType) -> Self {
        Self {
            id: id.into(),
            question: question.into(),
            description: String::new(),
            node_type,
            tags: BTreeSet::new(),
        }
    }

    /// Check if this node ends navigation.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.node_type == NodeType::Terminal
    }
}

// =============================================================================
// OPTION
// =============================================================================

/// A user-choosable answer attached to exactly one node.
///
/// Named `NodeOption` to stay clear of `std::option::Option`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeOption {
    pub id: OptionId,
    pub node_id: NodeId,
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub pros: Vec<String>,
    #[serde(default)]
    pub cons: Vec<String>,
    #[serde(default)]
    pub when_to_use: String,
    #[serde(default)]
    pub when_not_to_use: String,
}

impl NodeOption {
    /// Create an option with only the required fields set.
    #[must_use]
    pub fn new(
        id: impl Into<OptionId>,
        node_id: impl Into<NodeId>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            node_id: node_id.into(),
            label: label.into(),
            description: String::new(),
            pros: Vec::new(),
            cons: Vec::new(),
            when_to_use: String::new(),
            when_not_to_use: String::new(),
        }
    }
}

// =============================================================================
// PATH
// =============================================================================

/// A directed edge `(from_node, from_option) -> to_node`.
///
/// `(from_node_id, from_option_id)` is the primary key: an option has at most
/// one destination. Field order makes the derived `Ord` sort by that key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Path {
    pub from_node_id: NodeId,
    pub from_option_id: OptionId,
    pub to_node_id: NodeId,
}

impl Path {
    #[must_use]
    pub fn new(
        from_node_id: impl Into<NodeId>,
        from_option_id: impl Into<OptionId>,
        to_node_id: impl Into<NodeId>,
    ) -> Self {
        Self {
            from_node_id: from_node_id.into(),
            from_option_id: from_option_id.into(),
            to_node_id: to_node_id.into(),
        }
    }
}

// =============================================================================
// RECIPE
// =============================================================================

/// One numbered step of a recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub number: u32,
    pub title: String,
    #[serde(default)]
    pub description: String,
}

impl Step {
    #[must_use]
    pub fn new(number: u32, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            number,
            title: title.into(),
            description: description.into(),
        }
    }
}

/// One configurable parameter a renderer must ask for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigField {
    pub name: String,
    pub kind: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default_value: Option<String>,
}

/// A node of the capability-detail tree that travels alongside the steps.
///
/// A node carrying a `group` governs its whole subtree: when that group is
/// unselected the subtree is removed. Nodes below a governed node are kept
/// only when their id is prefix-related to a selected feature id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityDetail {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub group: Option<FeatureGroup>,
    #[serde(default)]
    pub children: Vec<CapabilityDetail>,
}

impl CapabilityDetail {
    #[must_use]
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            group: None,
            children: Vec::new(),
        }
    }

    /// Mark this node as governed by a feature group.
    #[must_use]
    pub fn governed_by(mut self, group: FeatureGroup) -> Self {
        self.group = Some(group);
        self
    }

    /// Attach child capabilities.
    #[must_use]
    pub fn with_children(mut self, children: Vec<CapabilityDetail>) -> Self {
        self.children = children;
        self
    }
}

/// The deployment recipe owned by a terminal node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub node_id: NodeId,
    pub title: String,
    pub steps: Vec<Step>,
    #[serde(default)]
    pub config_schema: Vec<ConfigField>,
    #[serde(default)]
    pub capabilities: Vec<CapabilityDetail>,
}

impl Recipe {
    #[must_use]
    pub fn new(node_id: impl Into<NodeId>, title: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            node_id: node_id.into(),
            title: title.into(),
            steps,
            config_schema: Vec::new(),
            capabilities: Vec::new(),
        }
    }
}

// =============================================================================
// COMPONENTS & RULES
// =============================================================================

/// An addressable unit a user can select.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    pub id: ComponentId,
    pub name: String,
    #[serde(default)]
    pub category: String,
}

impl Component {
    #[must_use]
    pub fn new(
        id: impl Into<ComponentId>,
        name: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: category.into(),
        }
    }
}

/// Severity of a compatibility rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    /// Blocks the combination.
    Error,
    /// Allowed, but the caller should show the conflict.
    Warning,
    /// Purely informational.
    Info,
}

/// A rule about an unordered pair of components.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompatibilityRule {
    pub component_id1: ComponentId,
    pub component_id2: ComponentId,
    #[serde(rename = "type")]
    pub kind: RuleKind,
    #[serde(default)]
    pub reason: String,
}

impl CompatibilityRule {
    #[must_use]
    pub fn new(
        a: impl Into<ComponentId>,
        b: impl Into<ComponentId>,
        kind: RuleKind,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            component_id1: a.into(),
            component_id2: b.into(),
            kind,
            reason: reason.into(),
        }
    }

    /// The pair in canonical (sorted) order, used as the storage key.
    #[must_use]
    pub fn pair_key(&self) -> (ComponentId, ComponentId) {
        pair_key(&self.component_id1, &self.component_id2)
    }
}

/// Canonical order for an unordered pair of components.
#[must_use]
pub fn pair_key(a: &ComponentId, b: &ComponentId) -> (ComponentId, ComponentId) {
    if a <= b {
        (a.clone(), b.clone())
    } else {
        (b.clone(), a.clone())
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the Waypoint system.
///
/// - No silent failures
/// - Use `Result<T, WizardError>` for fallible operations
/// - The CORE never panics; all errors are recoverable
#[derive(Debug, Error)]
pub enum WizardError {
    /// No edge leaves `node` through `option`.
    #[error("No path from node '{node}' via option '{option}'")]
    PathNotFound { node: NodeId, option: OptionId },

    /// The requested node was not found in the graph.
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// The node exists but no route from the root leads to it.
    #[error("Node '{0}' cannot be reached from the root")]
    Unreachable(NodeId),

    /// The requested option was not found in the graph.
    #[error("Option not found: {0}")]
    OptionNotFound(OptionId),

    /// The terminal node has no recipe.
    #[error("Recipe not found for node: {0}")]
    RecipeNotFound(NodeId),

    /// The graph has no root node.
    #[error("Graph has no root node")]
    RootNotFound,

    /// A recipe was requested for a node that does not end navigation.
    #[error("Node '{0}' is not a terminal node")]
    NotTerminal(NodeId),

    /// A feature operation was attempted away from a feature-selection node.
    #[error("Node '{0}' is not a feature-selection node")]
    NotFeatureSelection(NodeId),

    /// A saved session does not fit the graph it is resumed against.
    #[error("Invalid session: {0}")]
    InvalidSession(String),

    /// Structural validation failed; the report lists every violation.
    #[error("Graph integrity violated: {} violation(s)", .0.violations.len())]
    GraphIntegrity(IntegrityReport),

    /// A feature selection contains error-level conflicts.
    #[error("Incompatible selection: {} blocking conflict(s)", .0.len())]
    IncompatibleSelection(Vec<CompatibilityIssue>),

    /// The authoritative store could not be reached or answered badly.
    #[error("Authoritative store unavailable: {0}")]
    StoreUnavailable(String),

    /// The mirror version moved underneath an in-flight replace.
    #[error("Mirror version changed during sync (expected {expected:?}, found {found:?})")]
    VersionConflict {
        expected: Option<VersionToken>,
        found: Option<VersionToken>,
    },

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_key_is_order_independent() {
        let a = ComponentId::new("semantic-caching");
        let b = ComponentId::new("content-safety");
        assert_eq!(pair_key(&a, &b), pair_key(&b, &a));
        assert_eq!(pair_key(&a, &b).0, b);
    }

    #[test]
    fn path_orders_by_primary_key() {
        let mut paths = vec![
            Path::new("b", "x", "c"),
            Path::new("a", "z", "c"),
            Path::new("a", "y", "d"),
        ];
        paths.sort();
        let keys: Vec<_> = paths
            .iter()
            .map(|p| (p.from_node_id.as_str(), p.from_option_id.as_str()))
            .collect();
        assert_eq!(keys, vec![("a", "y"), ("a", "z"), ("b", "x")]);
    }

    #[test]
    fn records_use_camel_case_wire_names() {
        let path = Path::new("root", "opt-a", "next");
        let json = serde_json::to_value(&path).expect("encode");
        assert_eq!(json["fromNodeId"], "root");
        assert_eq!(json["fromOptionId"], "opt-a");
        assert_eq!(json["toNodeId"], "next");

        let node = Node::new("fs", "Pick features", NodeType::FeatureSelection);
        let json = serde_json::to_value(&node).expect("encode");
        assert_eq!(json["nodeType"], "feature-selection");
    }

    #[test]
    fn duplicate_tags_collapse() {
        let node: Node = serde_json::from_value(serde_json::json!({
            "id": "tier",
            "question": "Which tier?",
            "nodeType": "question",
            "tags": ["pricing", "sla", "pricing"]
        }))
        .expect("decode");
        let tags: Vec<&str> = node.tags.iter().map(String::as_str).collect();
        assert_eq!(tags, vec!["pricing", "sla"]);
    }

    #[test]
    fn rule_survives_postcard_encoding() {
        let rule = CompatibilityRule::new("a", "b", RuleKind::Warning, "soft");
        let bytes = postcard::to_allocvec(&rule).expect("encode");
        let decoded: CompatibilityRule = postcard::from_bytes(&bytes).expect("decode");
        assert_eq!(decoded, rule);
    }

    #[test]
    fn terminal_check() {
        assert!(Node::new("t", "Done", NodeType::Terminal).is_terminal());
        assert!(!Node::new("q", "Which?", NodeType::Question).is_terminal());
    }
}
