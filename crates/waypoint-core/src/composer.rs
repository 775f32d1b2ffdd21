//! # Recipe Composer
//!
//! Turns a base recipe plus an admitted feature selection into the final
//! ordered, renumbered step list and the matching capability tree.
//!
//! ## Composition Rules
//!
//! 1. Core steps (the leading steps and the last authored step) are always kept.
//! 2. A selected group with a fixed slot keeps the authored step in that slot.
//! 3. A selected group without an authored step gets one synthesized step,
//!    appended in `FeatureGroup` declaration order.
//! 4. Everything else is dropped and the result is renumbered `1..=n`.
//!
//! The capability tree is filtered by the same selection, so the groups that
//! appear in the steps and in the tree are always the selected groups.

use crate::features::{FeatureGroup, FeatureSelection, StepSlot};
use crate::graph::GraphStore;
use crate::primitives::LEADING_CORE_STEPS;
use crate::{CapabilityDetail, ComponentId, ConfigField, NodeId, Recipe, Step, WizardError};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Where a composed step came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "group", rename_all = "kebab-case")]
pub enum StepSource {
    /// An always-included authored step.
    Core,
    /// The authored step in a selected group's fixed slot.
    Feature(FeatureGroup),
    /// A generated summary step for a selected group.
    Synthesized(FeatureGroup),
}

impl StepSource {
    #[must_use]
    pub fn group(self) -> Option<FeatureGroup> {
        match self {
            Self::Core => None,
            Self::Feature(group) | Self::Synthesized(group) => Some(group),
        }
    }
}

/// One step of a composed recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComposedStep {
    pub number: u32,
    pub title: String,
    pub description: String,
    pub source: StepSource,
}

/// A recipe tailored to a feature selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposedRecipe {
    pub node_id: NodeId,
    pub title: String,
    pub steps: Vec<ComposedStep>,
    pub config_schema: Vec<ConfigField>,
    pub capabilities: Vec<CapabilityDetail>,
    /// Selected feature ids, sorted.
    pub features: Vec<ComponentId>,
    /// Groups represented by the selection.
    pub groups: Vec<FeatureGroup>,
    /// Selected ids that match no group; they contribute no step.
    pub unrecognized: Vec<ComponentId>,
}

impl ComposedRecipe {
    /// Groups that contributed a step.
    #[must_use]
    pub fn step_groups(&self) -> BTreeSet<FeatureGroup> {
        self.steps.iter().filter_map(|s| s.source.group()).collect()
    }

    /// Groups that govern a node of the capability tree.
    #[must_use]
    pub fn capability_groups(&self) -> BTreeSet<FeatureGroup> {
        let mut groups = BTreeSet::new();
        collect_groups(&self.capabilities, &mut groups);
        groups
    }

    /// The composed steps as plain recipe steps.
    #[must_use]
    pub fn to_steps(&self) -> Vec<Step> {
        self.steps
            .iter()
            .map(|s| Step::new(s.number, s.title.clone(), s.description.clone()))
            .collect()
    }
}

fn collect_groups(nodes: &[CapabilityDetail], out: &mut BTreeSet<FeatureGroup>) {
    for node in nodes {
        if let Some(group) = node.group {
            out.insert(group);
        }
        collect_groups(&node.children, out);
    }
}

/// Composes recipes from base recipes and feature selections.
pub struct RecipeComposer;

impl RecipeComposer {
    /// Compose the recipe owned by a terminal node.
    pub fn compose_for<G: GraphStore + ?Sized>(
        graph: &G,
        node: &NodeId,
        selection: &FeatureSelection,
    ) -> Result<ComposedRecipe, WizardError> {
        let owner = graph.require_node(node)?;
        if !owner.is_terminal() {
            return Err(WizardError::NotTerminal(node.clone()));
        }
        let recipe = graph
            .recipe(node)?
            .ok_or_else(|| WizardError::RecipeNotFound(node.clone()))?;
        Ok(Self::compose(&recipe, selection))
    }

    /// Compose a base recipe with an admitted selection.
    #[must_use]
    pub fn compose(recipe: &Recipe, selection: &FeatureSelection) -> ComposedRecipe {
        let groups = selection.groups();
        let core = Self::core_step_numbers(recipe);
        let authored: BTreeSet<u32> = recipe.steps.iter().map(|s| s.number).collect();

        // Slot -> selected group that owns it, for slots the recipe can serve.
        let mut slot_owner: BTreeMap<u32, FeatureGroup> = BTreeMap::new();
        let mut synthesized: Vec<FeatureGroup> = Vec::new();
        for group in FeatureGroup::ALL.into_iter().filter(|g| groups.contains(g)) {
            match group.slot() {
                StepSlot::Fixed(n) if authored.contains(&n) && !core.contains(&n) => {
                    slot_owner.insert(n, group);
                }
                StepSlot::Fixed(_) | StepSlot::Synthesized => synthesized.push(group),
            }
        }

        let mut steps: Vec<ComposedStep> = recipe
            .steps
            .iter()
            .filter_map(|step| {
                let source = if core.contains(&step.number) {
                    StepSource::Core
                } else {
                    StepSource::Feature(*slot_owner.get(&step.number)?)
                };
                Some(ComposedStep {
                    number: step.number,
                    title: step.title.clone(),
                    description: step.description.clone(),
                    source,
                })
            })
            .collect();

        steps.extend(synthesized.into_iter().map(|group| {
            let (title, description) = group.summary();
            ComposedStep {
                number: 0,
                title: title.to_string(),
                description: description.to_string(),
                source: StepSource::Synthesized(group),
            }
        }));

        for (number, step) in (1u32..).zip(steps.iter_mut()) {
            step.number = number;
        }

        ComposedRecipe {
            node_id: recipe.node_id.clone(),
            title: recipe.title.clone(),
            steps,
            config_schema: recipe.config_schema.clone(),
            capabilities: Self::filter_capabilities(&recipe.capabilities, selection),
            features: selection.ids().cloned().collect(),
            groups: groups.into_iter().collect(),
            unrecognized: selection.unrecognized(),
        }
    }

    /// Step numbers that are always included: the leading steps and the last one.
    #[must_use]
    pub fn core_step_numbers(recipe: &Recipe) -> BTreeSet<u32> {
        let mut core: BTreeSet<u32> = recipe
            .steps
            .iter()
            .map(|s| s.number)
            .filter(|n| (1..=LEADING_CORE_STEPS).contains(n))
            .collect();
        if let Some(last) = recipe.steps.iter().map(|s| s.number).max() {
            core.insert(last);
        }
        core
    }

    /// Filter a capability tree to a selection.
    ///
    /// Subtrees governed by an unselected group are removed. Below a governed
    /// node, children survive when prefix-related to a selected id, or when the
    /// group's coarse id itself was selected. Selected groups missing from the
    /// tree get a summary node appended.
    #[must_use]
    pub fn filter_capabilities(
        tree: &[CapabilityDetail],
        selection: &FeatureSelection,
    ) -> Vec<CapabilityDetail> {
        let groups = selection.groups();
        let mut filtered = filter_nodes(tree, selection, &groups, None);

        let mut present = BTreeSet::new();
        collect_groups(&filtered, &mut present);
        for group in groups.difference(&present) {
            let (title, description) = group.summary();
            let mut node = CapabilityDetail::new(group.canonical_id(), title).governed_by(*group);
            node.description = description.to_string();
            filtered.push(node);
        }
        filtered
    }
}

fn filter_nodes(
    nodes: &[CapabilityDetail],
    selection: &FeatureSelection,
    groups: &BTreeSet<FeatureGroup>,
    governing: Option<FeatureGroup>,
) -> Vec<CapabilityDetail> {
    nodes
        .iter()
        .filter_map(|node| {
            let scope = match node.group {
                Some(group) if !groups.contains(&group) => return None,
                Some(group) => Some(group),
                None => {
                    if let Some(group) = governing {
                        let coarse = selection.contains(group.canonical_id());
                        if !coarse && !selection.touches(&node.id) {
                            return None;
                        }
                    }
                    governing
                }
            };
            let mut kept = node.clone();
            kept.children = filter_nodes(&node.children, selection, groups, scope);
            Some(kept)
        })
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================
