//! # Navigation Engine
//!
//! Walks a user through the decision graph one option at a time.
//!
//! The engine borrows a read-only `GraphStore` and owns a `NavigationSession`.
//! The session is plain data and serializes to JSON (URL state, saved
//! sessions). Its history always starts at the root; `resume` replays it
//! against the graph, which also recomputes the confirmed feature selection.
//!
//! ## Feature Selection
//!
//! On a feature-selection node options are not edges. Features are toggled
//! into a pending set, each addition gated by the compatibility engine. The
//! reserved submit pseudo-option, or the node's own authored option, admits
//! the set and follows the node's single outgoing edge. Pending picks never
//! outlive the node they were made on.

use crate::compatibility::{AdmissionVerdict, CompatibilityEngine};
use crate::composer::{ComposedRecipe, RecipeComposer};
use crate::features::FeatureSelection;
use crate::graph::GraphStore;
use crate::primitives::FEATURE_SELECTION_SUBMIT;
use crate::reconstruct::{PathReconstructor, ReconstructedPath};
use crate::{ComponentId, Node, NodeId, NodeOption, NodeType, OptionId, Recipe, WizardError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// =============================================================================
// SESSION STATE
// =============================================================================

/// One forward move: leaving `node_id` through `option_id`.
///
/// A submit move also records the features that were submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub node_id: NodeId,
    pub option_id: OptionId,
    #[serde(default)]
    pub features: Vec<ComponentId>,
}

impl HistoryEntry {
    fn is_submit(&self) -> bool {
        self.option_id.as_str() == FEATURE_SELECTION_SUBMIT
    }
}

/// Position, history and feature state of one walk through the graph.
///
/// The confirmed selection is not serialized; it is derived from the last
/// submit in the history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationSession {
    current: NodeId,
    history: Vec<HistoryEntry>,
    #[serde(default)]
    pending: BTreeSet<ComponentId>,
    #[serde(skip)]
    confirmed: Option<FeatureSelection>,
}

impl NavigationSession {
    /// A fresh session positioned at `root`.
    #[must_use]
    pub fn at(root: NodeId) -> Self {
        Self {
            current: root,
            history: Vec::new(),
            pending: BTreeSet::new(),
            confirmed: None,
        }
    }

    #[must_use]
    pub fn current(&self) -> &NodeId {
        &self.current
    }

    #[must_use]
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.history.len()
    }
}

/// Result of stepping back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackOutcome {
    /// Moved to this node.
    Moved(NodeId),
    /// Already at the start; nothing changed.
    AtRoot,
}

/// One element of the trail shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Breadcrumb {
    pub node_id: NodeId,
    pub question: String,
    pub option_label: String,
}

// =============================================================================
// ENGINE
// =============================================================================

/// Drives a `NavigationSession` over a graph store.
pub struct NavigationEngine<'g, G: GraphStore + ?Sized> {
    graph: &'g G,
    compatibility: CompatibilityEngine,
    session: NavigationSession,
}

impl<'g, G: GraphStore + ?Sized> NavigationEngine<'g, G> {
    /// Start a session at the root.
    pub fn new(graph: &'g G) -> Result<Self, WizardError> {
        let root = graph.root()?;
        Ok(Self {
            graph,
            compatibility: CompatibilityEngine::from_store(graph)?,
            session: NavigationSession::at(root.id),
        })
    }

    /// Continue a saved session.
    ///
    /// The history is replayed from the root and the pending features are
    /// gated again, so a session saved against another graph fails instead of
    /// resuming in an impossible state.
    pub fn resume(graph: &'g G, session: NavigationSession) -> Result<Self, WizardError> {
        let mut engine = Self::replay(graph, &session.history)?;
        if engine.session.current != session.current {
            return Err(WizardError::InvalidSession(format!(
                "history ends at '{}' but the session is at '{}'",
                engine.session.current, session.current
            )));
        }
        for feature in &session.pending {
            let verdict = engine.add_feature(feature)?;
            if !verdict.can_add {
                return Err(WizardError::IncompatibleSelection(verdict.errors));
            }
        }
        Ok(engine)
    }

    /// Rebuild a session by re-applying a recorded history from the root.
    ///
    /// Every move is validated again, so a history recorded against an older
    /// graph fails instead of producing an impossible position.
    pub fn replay(graph: &'g G, history: &[HistoryEntry]) -> Result<Self, WizardError> {
        let mut engine = Self::new(graph)?;
        for entry in history {
            if entry.node_id != engine.session.current {
                return Err(WizardError::PathNotFound {
                    node: entry.node_id.clone(),
                    option: entry.option_id.clone(),
                });
            }
            if entry.is_submit() {
                engine.session.pending = entry.features.iter().cloned().collect();
            }
            engine.select_option(&entry.option_id)?;
        }
        Ok(engine)
    }

    #[must_use]
    pub fn session(&self) -> &NavigationSession {
        &self.session
    }

    #[must_use]
    pub fn into_session(self) -> NavigationSession {
        self.session
    }

    #[must_use]
    pub fn compatibility(&self) -> &CompatibilityEngine {
        &self.compatibility
    }

    #[must_use]
    pub fn current_id(&self) -> &NodeId {
        &self.session.current
    }

    pub fn current_node(&self) -> Result<Node, WizardError> {
        self.graph.require_node(&self.session.current)
    }

    /// Options offered at the current node.
    pub fn options(&self) -> Result<Vec<NodeOption>, WizardError> {
        self.graph.options(&self.session.current)
    }

    /// Move along `(current, option)`.
    ///
    /// On a feature-selection node the submit pseudo-option and the node's
    /// authored option both submit the pending features. On failure the
    /// position, history and feature state are unchanged.
    pub fn select_option(&mut self, option: &OptionId) -> Result<NodeId, WizardError> {
        let node = self.current_node()?;
        let is_submit = option.as_str() == FEATURE_SELECTION_SUBMIT;

        if node.node_type == NodeType::FeatureSelection {
            if !is_submit && self.graph.resolve(&node.id, option)?.is_none() {
                return Err(WizardError::PathNotFound {
                    node: node.id,
                    option: option.clone(),
                });
            }
            return self.submit_features();
        }
        if is_submit {
            return Err(WizardError::NotFeatureSelection(node.id));
        }

        let from = node.id;
        let to = self
            .graph
            .resolve(&from, option)?
            .ok_or_else(|| WizardError::PathNotFound {
                node: from.clone(),
                option: option.clone(),
            })?;

        self.session.history.push(HistoryEntry {
            node_id: from,
            option_id: option.clone(),
            features: Vec::new(),
        });
        self.session.current = to.clone();
        Ok(to)
    }

    fn submit_features(&mut self) -> Result<NodeId, WizardError> {
        let from = self.require_feature_selection()?.id;
        let pending: Vec<ComponentId> = self.session.pending.iter().cloned().collect();
        let selection = self.compatibility.admit(&pending)?;

        let successor = self
            .graph
            .outbound(&from)?
            .into_iter()
            .next()
            .ok_or_else(|| WizardError::PathNotFound {
                node: from.clone(),
                option: OptionId::from(FEATURE_SELECTION_SUBMIT),
            })?;

        self.session.history.push(HistoryEntry {
            node_id: from,
            option_id: OptionId::from(FEATURE_SELECTION_SUBMIT),
            features: pending,
        });
        self.session.pending.clear();
        self.session.confirmed = Some(selection);
        self.session.current = successor.to_node_id.clone();
        Ok(successor.to_node_id)
    }

    /// Step back one move.
    ///
    /// Stepping back over a submit restores that feature set as pending.
    /// Stepping back off a feature-selection node drops its pending picks.
    pub fn go_back(&mut self) -> BackOutcome {
        let Some(entry) = self.session.history.pop() else {
            return BackOutcome::AtRoot;
        };
        if entry.is_submit() {
            self.session.pending = entry.features.into_iter().collect();
            self.session.confirmed = self.last_submitted();
        } else {
            self.session.pending.clear();
        }
        self.session.current = entry.node_id.clone();
        BackOutcome::Moved(entry.node_id)
    }

    /// The selection of the latest submit still in the history.
    fn last_submitted(&self) -> Option<FeatureSelection> {
        self.session
            .history
            .iter()
            .rev()
            .find(|entry| entry.is_submit())
            .and_then(|entry| self.compatibility.admit(&entry.features).ok())
    }

    /// Return to the root and forget everything.
    pub fn reset(&mut self) -> Result<(), WizardError> {
        let root = self.graph.root()?;
        self.session = NavigationSession::at(root.id);
        Ok(())
    }

    /// The trail from the root to the current node.
    pub fn breadcrumbs(&self) -> Result<Vec<Breadcrumb>, WizardError> {
        self.session
            .history
            .iter()
            .map(|entry| {
                let node = self.graph.require_node(&entry.node_id)?;
                let option_label = if entry.is_submit() {
                    submit_label(&entry.features)
                } else {
                    self.graph
                        .option(&entry.option_id)?
                        .map(|o| o.label)
                        .ok_or_else(|| WizardError::OptionNotFound(entry.option_id.clone()))?
                };
                Ok(Breadcrumb {
                    node_id: entry.node_id.clone(),
                    question: node.question,
                    option_label,
                })
            })
            .collect()
    }

    /// A one-line, human-readable account of the choices made.
    pub fn explain_path(&self) -> Result<String, WizardError> {
        let crumbs = self.breadcrumbs()?;
        if crumbs.is_empty() {
            return Ok("No choices made yet".to_string());
        }
        Ok(crumbs
            .iter()
            .map(|c| c.option_label.as_str())
            .collect::<Vec<_>>()
            .join(" > "))
    }

    // -------------------------------------------------------------------------
    // Feature selection
    // -------------------------------------------------------------------------

    /// Add a feature to the pending set if it is compatible with it.
    ///
    /// The verdict is returned either way; the feature is only added when
    /// `can_add` is true.
    pub fn add_feature(&mut self, feature: &ComponentId) -> Result<AdmissionVerdict, WizardError> {
        self.require_feature_selection()?;
        let existing: Vec<ComponentId> = self.session.pending.iter().cloned().collect();
        let verdict = self.compatibility.can_add(feature, &existing);
        if verdict.can_add {
            self.session.pending.insert(feature.clone());
        }
        Ok(verdict)
    }

    /// Remove a feature from the pending set. Returns whether it was present.
    pub fn remove_feature(&mut self, feature: &ComponentId) -> bool {
        self.session.pending.remove(feature)
    }

    /// Flip a feature: remove it when pending, otherwise try to add it.
    ///
    /// Returns the verdict when an addition was attempted.
    pub fn toggle_feature(
        &mut self,
        feature: &ComponentId,
    ) -> Result<Option<AdmissionVerdict>, WizardError> {
        if self.remove_feature(feature) {
            return Ok(None);
        }
        self.add_feature(feature).map(Some)
    }

    pub fn pending_features(&self) -> impl Iterator<Item = &ComponentId> {
        self.session.pending.iter()
    }

    /// The selection submitted on the way to the current node, if any.
    #[must_use]
    pub fn confirmed_features(&self) -> Option<&FeatureSelection> {
        self.session.confirmed.as_ref()
    }

    fn require_feature_selection(&self) -> Result<Node, WizardError> {
        let node = self.current_node()?;
        if node.node_type != NodeType::FeatureSelection {
            return Err(WizardError::NotFeatureSelection(node.id));
        }
        Ok(node)
    }

    // -------------------------------------------------------------------------
    // Deep links and recipes
    // -------------------------------------------------------------------------

    /// Jump straight to `target`, synthesizing a history for it.
    ///
    /// Feature state is cleared: a feature-selection node on the way is
    /// recorded as submitted with no features.
    /// A target no route from the root reaches fails with `Unreachable` and
    /// leaves the session as it was.
    pub fn jump_to(&mut self, target: &NodeId) -> Result<ReconstructedPath, WizardError> {
        let path = PathReconstructor::reconstruct(self.graph, target)?;
        if !path.reached_root {
            return Err(WizardError::Unreachable(target.clone()));
        }
        let history = path
            .hops
            .iter()
            .map(|hop| {
                let from = self.graph.require_node(&hop.from_node_id)?;
                let option_id = if from.node_type == NodeType::FeatureSelection {
                    OptionId::from(FEATURE_SELECTION_SUBMIT)
                } else {
                    hop.from_option_id.clone()
                };
                Ok(HistoryEntry {
                    node_id: from.id,
                    option_id,
                    features: Vec::new(),
                })
            })
            .collect::<Result<Vec<_>, WizardError>>()?;
        let confirmed = history
            .iter()
            .any(HistoryEntry::is_submit)
            .then(FeatureSelection::empty);
        self.session = NavigationSession {
            current: target.clone(),
            history,
            pending: BTreeSet::new(),
            confirmed,
        };
        Ok(path)
    }

    /// The base recipe of the current terminal node.
    pub fn recipe(&self) -> Result<Recipe, WizardError> {
        let node = self.current_node()?;
        if !node.is_terminal() {
            return Err(WizardError::NotTerminal(node.id));
        }
        self.graph
            .recipe(&node.id)?
            .ok_or(WizardError::RecipeNotFound(node.id))
    }

    /// The recipe of the current terminal node, composed with the confirmed features.
    pub fn compose(&self) -> Result<ComposedRecipe, WizardError> {
        let empty = FeatureSelection::empty();
        let selection = self.session.confirmed.as_ref().unwrap_or(&empty);
        RecipeComposer::compose_for(self.graph, &self.session.current, selection)
    }
}

fn submit_label(features: &[ComponentId]) -> String {
    if features.is_empty() {
        return "No optional features".to_string();
    }
    let names: Vec<&str> = features.iter().map(ComponentId::as_str).collect();
    format!("Confirmed features: {}", names.join(", "))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Dataset, Graph};
    use crate::{CompatibilityRule, Component, Path, RuleKind, Step};

    fn wizard() -> Graph {
        let dataset = Dataset {
            nodes: vec![
                crate::Node::new("root", "What are you building?", NodeType::Root),
                crate::Node::new("hosting", "Where does it run?", NodeType::Question),
                crate::Node::new("features", "Which features?", NodeType::FeatureSelection),
                crate::Node::new("done", "Your recipe", NodeType::Terminal),
            ],
            options: vec![
                NodeOption::new("gateway", "root", "AI gateway"),
                NodeOption::new("managed", "hosting", "Managed"),
                NodeOption::new("generate", "features", "Generate recipe"),
            ],
            paths: vec![
                Path::new("root", "gateway", "hosting"),
                Path::new("hosting", "managed", "features"),
                Path::new("features", "generate", "done"),
            ],
            recipes: vec![Recipe::new(
                "done",
                "Gateway recipe",
                (1u32..=8).map(|n| Step::new(n, format!("Step {n}"), "")).collect(),
            )],
            components: vec![
                Component::new("semantic-caching", "Semantic caching", "feature"),
                Component::new("mcp-support", "MCP", "feature"),
                Component::new("token-limits", "Token limits", "feature"),
            ],
            rules: vec![CompatibilityRule::new(
                "mcp-support",
                "semantic-caching",
                RuleKind::Error,
                "Tool calls cannot be cached",
            )],
        };
        Graph::try_from(dataset).expect("valid wizard")
    }

    fn walk_to_features(engine: &mut NavigationEngine<'_, Graph>) {
        engine.select_option(&OptionId::from("gateway")).expect("gateway");
        engine.select_option(&OptionId::from("managed")).expect("managed");
    }

    #[test]
    fn select_option_moves_and_records() {
        let graph = wizard();
        let mut engine = NavigationEngine::new(&graph).expect("engine");
        let next = engine.select_option(&OptionId::from("gateway")).expect("move");
        assert_eq!(next, NodeId::from("hosting"));
        assert_eq!(engine.session().depth(), 1);
    }

    #[test]
    fn invalid_option_leaves_position_unchanged() {
        let graph = wizard();
        let mut engine = NavigationEngine::new(&graph).expect("engine");
        let result = engine.select_option(&OptionId::from("managed"));
        assert!(matches!(result, Err(WizardError::PathNotFound { .. })));
        assert_eq!(engine.current_id(), &NodeId::from("root"));
        assert_eq!(engine.session().depth(), 0);
    }

    #[test]
    fn back_at_root_is_noop() {
        let graph = wizard();
        let mut engine = NavigationEngine::new(&graph).expect("engine");
        assert_eq!(engine.go_back(), BackOutcome::AtRoot);
        engine.select_option(&OptionId::from("gateway")).expect("move");
        assert_eq!(engine.go_back(), BackOutcome::Moved(NodeId::from("root")));
        assert_eq!(engine.go_back(), BackOutcome::AtRoot);
    }

    #[test]
    fn features_are_gated_and_submitted() {
        let graph = wizard();
        let mut engine = NavigationEngine::new(&graph).expect("engine");
        walk_to_features(&mut engine);

        let verdict = engine
            .add_feature(&ComponentId::from("semantic-caching"))
            .expect("add");
        assert!(verdict.can_add);
        let verdict = engine
            .add_feature(&ComponentId::from("mcp-support"))
            .expect("add");
        assert!(!verdict.can_add);
        assert_eq!(engine.pending_features().count(), 1);

        let next = engine
            .select_option(&OptionId::from(FEATURE_SELECTION_SUBMIT))
            .expect("submit");
        assert_eq!(next, NodeId::from("done"));
        let confirmed = engine.confirmed_features().expect("confirmed");
        assert!(confirmed.contains("semantic-caching"));

        let crumbs = engine.breadcrumbs().expect("crumbs");
        assert_eq!(crumbs[2].option_label, "Confirmed features: semantic-caching");
    }

    #[test]
    fn back_over_submit_restores_pending() {
        let graph = wizard();
        let mut engine = NavigationEngine::new(&graph).expect("engine");
        walk_to_features(&mut engine);
        engine
            .add_feature(&ComponentId::from("token-limits"))
            .expect("add");
        engine
            .select_option(&OptionId::from(FEATURE_SELECTION_SUBMIT))
            .expect("submit");

        assert_eq!(engine.go_back(), BackOutcome::Moved(NodeId::from("features")));
        assert!(engine.confirmed_features().is_none());
        let pending: Vec<_> = engine.pending_features().cloned().collect();
        assert_eq!(pending, vec![ComponentId::from("token-limits")]);
    }

    #[test]
    fn toggle_adds_then_removes() {
        let graph = wizard();
        let mut engine = NavigationEngine::new(&graph).expect("engine");
        walk_to_features(&mut engine);
        let id = ComponentId::from("token-limits");

        let verdict = engine.toggle_feature(&id).expect("toggle");
        assert!(verdict.is_some_and(|v| v.can_add));
        assert_eq!(engine.pending_features().count(), 1);

        assert!(engine.toggle_feature(&id).expect("toggle").is_none());
        assert_eq!(engine.pending_features().count(), 0);
    }

    #[test]
    fn add_feature_requires_feature_node() {
        let graph = wizard();
        let mut engine = NavigationEngine::new(&graph).expect("engine");
        let result = engine.add_feature(&ComponentId::from("token-limits"));
        assert!(matches!(result, Err(WizardError::NotFeatureSelection(_))));
    }

    #[test]
    fn explain_path_joins_labels() {
        let graph = wizard();
        let mut engine = NavigationEngine::new(&graph).expect("engine");
        assert_eq!(engine.explain_path().expect("explain"), "No choices made yet");
        walk_to_features(&mut engine);
        engine
            .select_option(&OptionId::from(FEATURE_SELECTION_SUBMIT))
            .expect("submit");
        assert_eq!(
            engine.explain_path().expect("explain"),
            "AI gateway > Managed > No optional features"
        );
    }

    #[test]
    fn compose_uses_confirmed_selection() {
        let graph = wizard();
        let mut engine = NavigationEngine::new(&graph).expect("engine");
        walk_to_features(&mut engine);
        engine
            .add_feature(&ComponentId::from("token-limits"))
            .expect("add");
        engine
            .select_option(&OptionId::from(FEATURE_SELECTION_SUBMIT))
            .expect("submit");
        let composed = engine.compose().expect("compose");
        assert_eq!(composed.steps.len(), 4);
    }

    #[test]
    fn compose_away_from_terminal_fails() {
        let graph = wizard();
        let engine = NavigationEngine::new(&graph).expect("engine");
        assert!(matches!(engine.compose(), Err(WizardError::NotTerminal(_))));
    }

    #[test]
    fn jump_then_replay_reaches_same_node() {
        let graph = wizard();
        let mut engine = NavigationEngine::new(&graph).expect("engine");
        let path = engine.jump_to(&NodeId::from("features")).expect("jump");
        assert!(path.reached_root);

        let replayed =
            NavigationEngine::replay(&graph, engine.session().history()).expect("replay");
        assert_eq!(replayed.current_id(), &NodeId::from("features"));
        assert_eq!(replayed.session().history(), engine.session().history());
    }

    #[test]
    fn reset_returns_to_root() {
        let graph = wizard();
        let mut engine = NavigationEngine::new(&graph).expect("engine");
        walk_to_features(&mut engine);
        engine.reset().expect("reset");
        assert_eq!(engine.current_id(), &NodeId::from("root"));
        assert!(engine.session().history().is_empty());
    }

    /// root -> m -> c, plus a cycle b <-> e that the root never reaches.
    fn stray_cycle() -> Graph {
        let edges = [
            ("root", "rm", "m"),
            ("m", "mc", "c"),
            ("b", "be", "e"),
            ("e", "eb", "b"),
            ("b", "bc", "c"),
        ];
        let dataset = Dataset {
            nodes: vec![
                crate::Node::new("root", "Start?", NodeType::Root),
                crate::Node::new("m", "Middle?", NodeType::Question),
                crate::Node::new("c", "Common?", NodeType::Question),
                crate::Node::new("b", "Stray b?", NodeType::Question),
                crate::Node::new("e", "Stray e?", NodeType::Question),
            ],
            options: edges
                .iter()
                .map(|(from, opt, _)| NodeOption::new(*opt, *from, *opt))
                .collect(),
            paths: edges
                .iter()
                .map(|(from, opt, to)| Path::new(*from, *opt, *to))
                .collect(),
            ..Dataset::default()
        };
        Graph::try_from(dataset).expect("valid graph")
    }

    #[test]
    fn jump_follows_route_from_root() {
        let graph = stray_cycle();
        let mut engine = NavigationEngine::new(&graph).expect("engine");
        engine.jump_to(&NodeId::from("c")).expect("jump");

        let history = engine.session().history();
        assert_eq!(history[0].node_id, NodeId::from("root"));
        let replayed = NavigationEngine::replay(&graph, history).expect("replay");
        assert_eq!(replayed.current_id(), &NodeId::from("c"));

        assert_eq!(engine.go_back(), BackOutcome::Moved(NodeId::from("m")));
        assert_eq!(engine.go_back(), BackOutcome::Moved(NodeId::from("root")));
        assert_eq!(engine.go_back(), BackOutcome::AtRoot);
        assert_eq!(engine.current_id(), &NodeId::from("root"));
    }

    #[test]
    fn jump_to_unreachable_node_keeps_session() {
        let graph = stray_cycle();
        let mut engine = NavigationEngine::new(&graph).expect("engine");
        engine.select_option(&OptionId::from("rm")).expect("move");

        let result = engine.jump_to(&NodeId::from("e"));
        assert!(matches!(result, Err(WizardError::Unreachable(_))));
        assert_eq!(engine.current_id(), &NodeId::from("m"));
        assert_eq!(engine.session().depth(), 1);
    }

    #[test]
    fn jump_past_feature_node_records_empty_submit() {
        let graph = wizard();
        let mut engine = NavigationEngine::new(&graph).expect("engine");
        engine.jump_to(&NodeId::from("done")).expect("jump");

        let last = engine.session().history().last().expect("entry");
        assert_eq!(last.option_id.as_str(), FEATURE_SELECTION_SUBMIT);
        assert!(engine.confirmed_features().is_some_and(FeatureSelection::is_empty));

        let replayed =
            NavigationEngine::replay(&graph, engine.session().history()).expect("replay");
        assert_eq!(replayed.session(), engine.session());
    }

    #[test]
    fn authored_option_on_feature_node_submits() {
        let graph = wizard();
        let mut engine = NavigationEngine::new(&graph).expect("engine");
        walk_to_features(&mut engine);
        engine
            .add_feature(&ComponentId::from("token-limits"))
            .expect("add");

        let next = engine
            .select_option(&OptionId::from("generate"))
            .expect("generate");
        assert_eq!(next, NodeId::from("done"));
        assert_eq!(engine.pending_features().count(), 0);
        assert!(
            engine
                .confirmed_features()
                .is_some_and(|s| s.contains("token-limits"))
        );
        assert_eq!(engine.compose().expect("compose").steps.len(), 4);
    }

    #[test]
    fn authored_option_runs_compatibility_gate() {
        let graph = wizard();
        let mut engine = NavigationEngine::new(&graph).expect("engine");
        walk_to_features(&mut engine);
        engine
            .add_feature(&ComponentId::from("mcp-support"))
            .expect("add");
        let mut session = engine.into_session();
        session.pending.insert(ComponentId::from("semantic-caching"));

        let mut engine = NavigationEngine {
            graph: &graph,
            compatibility: CompatibilityEngine::from_store(&graph).expect("rules"),
            session,
        };
        let result = engine.select_option(&OptionId::from("generate"));
        assert!(matches!(result, Err(WizardError::IncompatibleSelection(_))));
        assert_eq!(engine.current_id(), &NodeId::from("features"));
        assert_eq!(engine.pending_features().count(), 2);
    }

    #[test]
    fn unknown_option_on_feature_node_keeps_picks() {
        let graph = wizard();
        let mut engine = NavigationEngine::new(&graph).expect("engine");
        walk_to_features(&mut engine);
        engine
            .add_feature(&ComponentId::from("token-limits"))
            .expect("add");

        let result = engine.select_option(&OptionId::from("bogus"));
        assert!(matches!(result, Err(WizardError::PathNotFound { .. })));
        assert_eq!(engine.current_id(), &NodeId::from("features"));
        assert_eq!(engine.pending_features().count(), 1);
    }

    #[test]
    fn submit_away_from_feature_node_fails() {
        let graph = wizard();
        let mut engine = NavigationEngine::new(&graph).expect("engine");
        let result = engine.select_option(&OptionId::from(FEATURE_SELECTION_SUBMIT));
        assert!(matches!(result, Err(WizardError::NotFeatureSelection(_))));
        assert_eq!(engine.session().depth(), 0);
    }

    #[test]
    fn back_off_feature_node_drops_pending() {
        let graph = wizard();
        let mut engine = NavigationEngine::new(&graph).expect("engine");
        walk_to_features(&mut engine);
        engine
            .add_feature(&ComponentId::from("token-limits"))
            .expect("add");

        assert_eq!(engine.go_back(), BackOutcome::Moved(NodeId::from("hosting")));
        assert_eq!(engine.pending_features().count(), 0);
        engine.select_option(&OptionId::from("managed")).expect("managed");
        assert_eq!(engine.pending_features().count(), 0);
    }

    #[test]
    fn session_survives_json_and_resume() {
        let graph = wizard();
        let mut engine = NavigationEngine::new(&graph).expect("engine");
        walk_to_features(&mut engine);
        engine
            .add_feature(&ComponentId::from("token-limits"))
            .expect("add");
        engine
            .select_option(&OptionId::from(FEATURE_SELECTION_SUBMIT))
            .expect("submit");

        let json = serde_json::to_value(engine.session()).expect("encode");
        assert_eq!(json["current"], "done");
        assert!(json.get("confirmed").is_none());

        let saved: NavigationSession = serde_json::from_value(json).expect("decode");
        let resumed = NavigationEngine::resume(&graph, saved).expect("resume");
        assert_eq!(resumed.session(), engine.session());
        assert_eq!(resumed.compose().expect("compose").steps.len(), 4);
    }

    #[test]
    fn resume_keeps_pending_picks() {
        let graph = wizard();
        let mut engine = NavigationEngine::new(&graph).expect("engine");
        walk_to_features(&mut engine);
        engine
            .add_feature(&ComponentId::from("semantic-caching"))
            .expect("add");

        let json = serde_json::to_string(engine.session()).expect("encode");
        let saved: NavigationSession = serde_json::from_str(&json).expect("decode");
        let resumed = NavigationEngine::resume(&graph, saved).expect("resume");
        let pending: Vec<_> = resumed.pending_features().cloned().collect();
        assert_eq!(pending, vec![ComponentId::from("semantic-caching")]);
    }

    #[test]
    fn resume_rejects_session_off_its_history() {
        let graph = wizard();
        let mut engine = NavigationEngine::new(&graph).expect("engine");
        walk_to_features(&mut engine);

        let mut json = serde_json::to_value(engine.session()).expect("encode");
        json["current"] = serde_json::json!("done");
        let saved: NavigationSession = serde_json::from_value(json).expect("decode");
        let result = NavigationEngine::resume(&graph, saved);
        assert!(matches!(result, Err(WizardError::InvalidSession(_))));
    }
}
