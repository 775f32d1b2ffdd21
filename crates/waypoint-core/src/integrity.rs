//! # Graph Integrity
//!
//! Structural validation of an authored dataset before it is served.
//!
//! The policy is reject: a dataset with any violation is refused as a whole,
//! so the previous good mirror keeps serving. Validation never stops at the
//! first problem; the report lists every violation found.

use crate::graph::Dataset;
use crate::{ComponentId, NodeId, NodeType, OptionId, Path, WizardError, pair_key};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// One structural problem in a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "violation", rename_all = "kebab-case")]
pub enum IntegrityViolation {
    NoRoot,
    MultipleRoots { roots: Vec<NodeId> },
    DuplicateNode { node: NodeId },
    DuplicateOption { option: OptionId },
    OptionWithoutNode { option: OptionId, node: NodeId },
    PathFromMissingNode { path: Path },
    PathToMissingNode { path: Path },
    PathOptionMismatch { path: Path },
    DuplicatePath { path: Path },
    RecipeWithoutNode { node: NodeId },
    RecipeOnNonTerminal { node: NodeId },
    DuplicateRecipe { node: NodeId },
    DuplicateStepNumber { node: NodeId, number: u32 },
    OrphanNode { node: NodeId },
    FeatureSelectionSuccessors { node: NodeId, count: usize },
    DuplicateComponent { component: ComponentId },
    RuleWithUnknownComponent { component: ComponentId },
    SelfRule { component: ComponentId },
    DuplicateRule { first: ComponentId, second: ComponentId },
}

impl fmt::Display for IntegrityViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoRoot => write!(f, "no root node"),
            Self::MultipleRoots { roots } => {
                let ids: Vec<&str> = roots.iter().map(NodeId::as_str).collect();
                write!(f, "multiple root nodes: {}", ids.join(", "))
            }
            Self::DuplicateNode { node } => write!(f, "duplicate node '{node}'"),
            Self::DuplicateOption { option } => write!(f, "duplicate option '{option}'"),
            Self::OptionWithoutNode { option, node } => {
                write!(f, "option '{option}' belongs to missing node '{node}'")
            }
            Self::PathFromMissingNode { path } => write!(
                f,
                "path ({}, {}) starts at a missing node",
                path.from_node_id, path.from_option_id
            ),
            Self::PathToMissingNode { path } => write!(
                f,
                "path ({}, {}) leads to missing node '{}'",
                path.from_node_id, path.from_option_id, path.to_node_id
            ),
            Self::PathOptionMismatch { path } => write!(
                f,
                "path ({}, {}) uses an option that node does not own",
                path.from_node_id, path.from_option_id
            ),
            Self::DuplicatePath { path } => write!(
                f,
                "duplicate path key ({}, {})",
                path.from_node_id, path.from_option_id
            ),
            Self::RecipeWithoutNode { node } => write!(f, "recipe for missing node '{node}'"),
            Self::RecipeOnNonTerminal { node } => {
                write!(f, "recipe attached to non-terminal node '{node}'")
            }
            Self::DuplicateRecipe { node } => write!(f, "node '{node}' owns more than one recipe"),
            Self::DuplicateStepNumber { node, number } => {
                write!(f, "recipe '{node}' repeats step number {number}")
            }
            Self::OrphanNode { node } => write!(f, "node '{node}' has no incoming path"),
            Self::FeatureSelectionSuccessors { node, count } => write!(
                f,
                "feature-selection node '{node}' has {count} outgoing paths, expected 1"
            ),
            Self::DuplicateComponent { component } => {
                write!(f, "duplicate component '{component}'")
            }
            Self::RuleWithUnknownComponent { component } => {
                write!(f, "rule references unknown component '{component}'")
            }
            Self::SelfRule { component } => {
                write!(f, "rule pairs component '{component}' with itself")
            }
            Self::DuplicateRule { first, second } => {
                write!(f, "more than one rule for pair ({first}, {second})")
            }
        }
    }
}

/// The outcome of validating a dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IntegrityReport {
    pub total_nodes: usize,
    pub total_options: usize,
    pub total_paths: usize,
    pub total_recipes: usize,
    pub total_rules: usize,
    pub violations: Vec<IntegrityViolation>,
}

impl IntegrityReport {
    #[must_use]
    pub fn has_issues(&self) -> bool {
        !self.violations.is_empty()
    }
}

/// Validate a dataset, failing with `GraphIntegrity` on any violation.
pub fn validate_graph_integrity(dataset: &Dataset) -> Result<IntegrityReport, WizardError> {
    let report = inspect_integrity(dataset);
    if report.has_issues() {
        return Err(WizardError::GraphIntegrity(report));
    }
    Ok(report)
}

/// Collect every violation in a dataset without failing.
#[must_use]
pub fn inspect_integrity(dataset: &Dataset) -> IntegrityReport {
    let mut violations = Vec::new();

    // Nodes
    let mut nodes: BTreeMap<&NodeId, NodeType> = BTreeMap::new();
    for node in &dataset.nodes {
        if nodes.insert(&node.id, node.node_type).is_some() {
            violations.push(IntegrityViolation::DuplicateNode {
                node: node.id.clone(),
            });
        }
    }

    let roots: Vec<NodeId> = dataset
        .nodes
        .iter()
        .filter(|n| n.node_type == NodeType::Root)
        .map(|n| n.id.clone())
        .collect();
    match roots.len() {
        0 => violations.push(IntegrityViolation::NoRoot),
        1 => {}
        _ => violations.push(IntegrityViolation::MultipleRoots {
            roots: roots.clone(),
        }),
    }

    // Options
    let mut owners: BTreeMap<&OptionId, &NodeId> = BTreeMap::new();
    for option in &dataset.options {
        if owners.insert(&option.id, &option.node_id).is_some() {
            violations.push(IntegrityViolation::DuplicateOption {
                option: option.id.clone(),
            });
        }
        if !nodes.contains_key(&option.node_id) {
            violations.push(IntegrityViolation::OptionWithoutNode {
                option: option.id.clone(),
                node: option.node_id.clone(),
            });
        }
    }

    // Paths
    let mut keys: BTreeSet<(&NodeId, &OptionId)> = BTreeSet::new();
    let mut has_inbound: BTreeSet<&NodeId> = BTreeSet::new();
    let mut outbound_count: BTreeMap<&NodeId, usize> = BTreeMap::new();
    for path in &dataset.paths {
        if !keys.insert((&path.from_node_id, &path.from_option_id)) {
            violations.push(IntegrityViolation::DuplicatePath { path: path.clone() });
        }
        if !nodes.contains_key(&path.from_node_id) {
            violations.push(IntegrityViolation::PathFromMissingNode { path: path.clone() });
        }
        if !nodes.contains_key(&path.to_node_id) {
            violations.push(IntegrityViolation::PathToMissingNode { path: path.clone() });
        }
        if owners.get(&path.from_option_id) != Some(&&path.from_node_id) {
            violations.push(IntegrityViolation::PathOptionMismatch { path: path.clone() });
        }
        has_inbound.insert(&path.to_node_id);
        *outbound_count.entry(&path.from_node_id).or_default() += 1;
    }

    for (id, node_type) in &nodes {
        if *node_type != NodeType::Root && !has_inbound.contains(id) {
            violations.push(IntegrityViolation::OrphanNode {
                node: (*id).clone(),
            });
        }
        if *node_type == NodeType::FeatureSelection {
            let count = outbound_count.get(id).copied().unwrap_or(0);
            if count != 1 {
                violations.push(IntegrityViolation::FeatureSelectionSuccessors {
                    node: (*id).clone(),
                    count,
                });
            }
        }
    }

    // Recipes
    let mut recipe_owners: BTreeSet<&NodeId> = BTreeSet::new();
    for recipe in &dataset.recipes {
        match nodes.get(&recipe.node_id) {
            None => violations.push(IntegrityViolation::RecipeWithoutNode {
                node: recipe.node_id.clone(),
            }),
            Some(NodeType::Terminal) => {}
            Some(_) => violations.push(IntegrityViolation::RecipeOnNonTerminal {
                node: recipe.node_id.clone(),
            }),
        }
        if !recipe_owners.insert(&recipe.node_id) {
            violations.push(IntegrityViolation::DuplicateRecipe {
                node: recipe.node_id.clone(),
            });
        }
        let mut numbers = BTreeSet::new();
        for step in &recipe.steps {
            if !numbers.insert(step.number) {
                violations.push(IntegrityViolation::DuplicateStepNumber {
                    node: recipe.node_id.clone(),
                    number: step.number,
                });
            }
        }
    }

    // Components and rules
    let mut components: BTreeSet<&ComponentId> = BTreeSet::new();
    for component in &dataset.components {
        if !components.insert(&component.id) {
            violations.push(IntegrityViolation::DuplicateComponent {
                component: component.id.clone(),
            });
        }
    }

    let mut pairs = BTreeSet::new();
    for rule in &dataset.rules {
        for id in [&rule.component_id1, &rule.component_id2] {
            if !components.contains(id) {
                violations.push(IntegrityViolation::RuleWithUnknownComponent {
                    component: id.clone(),
                });
            }
        }
        if rule.component_id1 == rule.component_id2 {
            violations.push(IntegrityViolation::SelfRule {
                component: rule.component_id1.clone(),
            });
            continue;
        }
        let (first, second) = pair_key(&rule.component_id1, &rule.component_id2);
        if !pairs.insert((first.clone(), second.clone())) {
            violations.push(IntegrityViolation::DuplicateRule { first, second });
        }
    }

    IntegrityReport {
        total_nodes: dataset.nodes.len(),
        total_options: dataset.options.len(),
        total_paths: dataset.paths.len(),
        total_recipes: dataset.recipes.len(),
        total_rules: dataset.rules.len(),
        violations,
    }
}

// =============================================================================
// TESTS
// =============================================================================
