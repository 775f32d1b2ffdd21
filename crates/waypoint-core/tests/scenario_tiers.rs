//! # Scenario Tier Tests (S0-S3)
//!
//! End-to-end walks through the sample gateway wizard.
//!
//! ## Tiers
//! - S0: Graph Integrity
//! - S1: Navigation
//! - S2: Compatibility Gate
//! - S3: Recipe Composition

use waypoint_core::sample::gateway_dataset;
use waypoint_core::{
    CompatibilityEngine, ComponentId, FeatureGroup, Graph, GraphStore, NavigationEngine, NodeId,
    OptionId, RecipeComposer, StepSource, WizardError,
    primitives::FEATURE_SELECTION_SUBMIT,
};

fn graph() -> Graph {
    Graph::try_from(gateway_dataset()).expect("sample graph")
}

fn ids(list: &[&str]) -> Vec<ComponentId> {
    list.iter().map(|s| ComponentId::from(*s)).collect()
}

// =============================================================================
// TIER S0: GRAPH INTEGRITY
// =============================================================================

mod s0_graph_integrity {
    use super::*;
    use waypoint_core::{IntegrityViolation, NodeType, inspect_integrity};

    /// S0.1: The sample dataset has exactly one root.
    #[test]
    fn single_root() {
        let graph = graph();
        assert_eq!(graph.root().expect("root").node_type, NodeType::Root);
    }

    /// S0.2: A second root is rejected as a whole.
    #[test]
    fn second_root_rejected() {
        let mut dataset = gateway_dataset();
        if let Some(node) = dataset.nodes.iter_mut().find(|n| n.id.as_str() == "hosting") {
            node.node_type = NodeType::Root;
        }
        assert!(matches!(
            Graph::try_from(dataset),
            Err(WizardError::GraphIntegrity(_))
        ));
    }

    /// S0.3: An invalid path fails like every other orphan class.
    #[test]
    fn invalid_path_fails_hard() {
        let mut dataset = gateway_dataset();
        dataset.paths.push(waypoint_core::Path::new("tier", "opt-managed", "recipe-dev"));
        let report = inspect_integrity(&dataset);
        assert!(
            report
                .violations
                .iter()
                .any(|v| matches!(v, IntegrityViolation::PathOptionMismatch { .. }))
        );
    }
}

// =============================================================================
// TIER S1: NAVIGATION
// =============================================================================

mod s1_navigation {
    use super::*;

    /// S1.1: A bogus option from the root fails and leaves the position alone.
    #[test]
    fn bogus_option_from_root() {
        let graph = graph();
        let mut engine = NavigationEngine::new(&graph).expect("engine");
        let result = engine.select_option(&OptionId::from("bogus"));
        assert!(matches!(result, Err(WizardError::PathNotFound { .. })));
        assert_eq!(engine.current_id(), &NodeId::from("root"));
    }

    /// S1.2: A full walk ends at a terminal node with readable breadcrumbs.
    #[test]
    fn full_walk_to_recipe() {
        let graph = graph();
        let mut engine = NavigationEngine::new(&graph).expect("engine");
        for option in ["opt-ai-gateway", "opt-managed", "opt-premium"] {
            engine.select_option(&OptionId::from(option)).expect("move");
        }
        engine
            .add_feature(&ComponentId::from("token-limits-request"))
            .expect("add");
        engine
            .select_option(&OptionId::from(FEATURE_SELECTION_SUBMIT))
            .expect("submit");

        assert!(engine.current_node().expect("node").is_terminal());
        assert_eq!(
            engine.explain_path().expect("explain"),
            "Model APIs > Managed in the cloud > Premium > Confirmed features: token-limits-request"
        );
        assert_eq!(engine.compose().expect("compose").steps.len(), 4);
    }

    /// S1.3: A deep link to a node with two inbound edges picks the first and says so.
    #[test]
    fn deep_link_reports_ambiguity() {
        let graph = graph();
        let mut engine = NavigationEngine::new(&graph).expect("engine");
        let path = engine.jump_to(&NodeId::from("tier")).expect("jump");
        assert!(path.reached_root);
        assert_eq!(path.ambiguous_nodes, vec![NodeId::from("tier")]);
        assert_eq!(path.hops[1].from_option_id, OptionId::from("opt-managed"));
        assert_eq!(engine.breadcrumbs().expect("crumbs").len(), 2);
    }
}

// =============================================================================
// TIER S2: COMPATIBILITY GATE
// =============================================================================

mod s2_compatibility {
    use super::*;
    use waypoint_core::{CompatibilityRule, RuleKind};

    /// S2.1: canAdd(B, [A]) with an (A, B, error) rule is refused with that pair.
    #[test]
    fn error_rule_refuses_candidate() {
        let engine = CompatibilityEngine::new([CompatibilityRule::new(
            "A",
            "B",
            RuleKind::Error,
            "incompatible",
        )]);
        let verdict = engine.can_add(&ComponentId::from("B"), &ids(&["A"]));
        assert!(!verdict.can_add);
        assert_eq!(verdict.errors.len(), 1);
        assert_eq!(verdict.errors[0].component_a, ComponentId::from("A"));
        assert_eq!(verdict.errors[0].component_b, ComponentId::from("B"));
    }

    /// S2.2: Unknown ids are simply compatible.
    #[test]
    fn unknown_ids_are_compatible() {
        let engine = CompatibilityEngine::from_store(&graph()).expect("engine");
        let verdict = engine.can_add(&ComponentId::from("nonexistent"), &ids(&["token-limits"]));
        assert!(verdict.can_add);
        assert!(verdict.warnings.is_empty());
    }

    /// S2.3: Submitting a conflicting selection is blocked at the gate.
    #[test]
    fn conflicting_submission_blocked() {
        let graph = graph();
        let engine = CompatibilityEngine::from_store(&graph).expect("engine");
        let result = engine.admit(&ids(&["mcp-support", "semantic-caching"]));
        assert!(matches!(result, Err(WizardError::IncompatibleSelection(_))));
    }

    /// S2.4: A warning is surfaced but does not block.
    #[test]
    fn warning_is_soft() {
        let engine = CompatibilityEngine::from_store(&graph()).expect("engine");
        let verdict = engine.can_add(&ComponentId::from("content-safety"), &ids(&["semantic-caching"]));
        assert!(verdict.can_add);
        assert_eq!(verdict.warnings.len(), 1);
    }
}

// =============================================================================
// TIER S3: RECIPE COMPOSITION
// =============================================================================

mod s3_composition {
    use super::*;

    fn compose(features: &[&str]) -> waypoint_core::ComposedRecipe {
        let graph = graph();
        let selection = CompatibilityEngine::from_store(&graph)
            .expect("engine")
            .admit(&ids(features))
            .expect("admissible");
        RecipeComposer::compose_for(&graph, &NodeId::from("recipe-dev"), &selection)
            .expect("compose")
    }

    /// S3.1: A granular token-limit pick yields four renumbered steps.
    #[test]
    fn granular_token_limit() {
        let composed = compose(&["token-limits-request"]);
        let numbers: Vec<u32> = composed.steps.iter().map(|s| s.number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
        assert_eq!(composed.steps[2].title, "Configure token limits");
    }

    /// S3.2: MCP support adds exactly one synthesized step.
    #[test]
    fn mcp_support_is_synthesized() {
        let composed = compose(&["mcp-support"]);
        let numbers: Vec<u32> = composed.steps.iter().map(|s| s.number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
        assert_eq!(
            composed
                .steps
                .iter()
                .filter(|s| s.source == StepSource::Synthesized(FeatureGroup::McpSupport))
                .count(),
            1
        );
    }

    /// S3.3: Several features of one group still yield one step.
    #[test]
    fn one_step_per_group() {
        let composed = compose(&["authentication-oauth", "authentication-key", "authentication"]);
        assert_eq!(composed.steps.len(), 4);
    }

    /// S3.4: A granular model pick keeps its parent capability.
    #[test]
    fn granular_pick_keeps_parent_capability() {
        let composed = compose(&["azure-openai-gpt4"]);
        let backends = composed
            .capabilities
            .iter()
            .find(|c| c.id == "model-backends")
            .expect("model backends kept");
        let azure = backends
            .children
            .iter()
            .find(|c| c.id == "azure-openai")
            .expect("parent kept");
        let models: Vec<&str> = azure.children.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(models, vec!["azure-openai-gpt4"]);
        assert!(backends.children.iter().all(|c| c.id != "ai-foundry"));
    }

    /// S3.5: Composition away from a terminal node is refused.
    #[test]
    fn non_terminal_refused() {
        let graph = graph();
        let result = RecipeComposer::compose_for(
            &graph,
            &NodeId::from("tier"),
            &waypoint_core::FeatureSelection::empty(),
        );
        assert!(matches!(result, Err(WizardError::NotTerminal(_))));
    }
}
