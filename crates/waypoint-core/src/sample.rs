//! # Sample Dataset
//!
//! A small but complete gateway-deployment wizard.
//!
//! Used to bootstrap a file-backed store (`waypoint demo`) and as the shared
//! fixture for tests and benchmarks. It exercises every node type, a node with
//! two inbound edges, fixed-slot and synthesized feature groups, and all three
//! rule severities.

use crate::features::FeatureGroup;
use crate::graph::Dataset;
use crate::{
    CapabilityDetail, CompatibilityRule, Component, ConfigField, Node, NodeOption, NodeType, Path,
    Recipe, RuleKind, Step,
};

fn option(id: &str, node: &str, label: &str, description: &str) -> NodeOption {
    let mut option = NodeOption::new(id, node, label);
    option.description = description.to_string();
    option
}

fn gateway_recipe(node: &str, title: &str, tier: &str) -> Recipe {
    let steps = vec![
        Step::new(1, "Create resource group", "Create a resource group to hold the gateway and its dependencies."),
        Step::new(2, "Deploy API Management", format!("Deploy an API Management instance on the {tier} tier.")),
        Step::new(3, "Configure token limits", "Add the token limit policy to the model API."),
        Step::new(4, "Emit token metrics", "Add the token metric policy and connect Application Insights."),
        Step::new(5, "Enable semantic caching", "Register an embeddings backend and add the semantic cache policies."),
        Step::new(6, "Apply content safety", "Connect the content safety service and add the screening policy."),
        Step::new(7, "Register model backends", "Import each model endpoint as a backend with managed identity."),
        Step::new(8, "Verify the deployment", "Call the gateway endpoint and check the policy trace."),
    ];
    let mut recipe = Recipe::new(node, title, steps);
    recipe.config_schema = vec![
        ConfigField {
            name: "resourceGroup".to_string(),
            kind: "string".to_string(),
            required: true,
            default_value: None,
        },
        ConfigField {
            name: "location".to_string(),
            kind: "string".to_string(),
            required: true,
            default_value: Some("eastus".to_string()),
        },
    ];
    recipe.capabilities = vec![
        CapabilityDetail::new("gateway", "Managed gateway"),
        CapabilityDetail::new("token-limits", "Token limits")
            .governed_by(FeatureGroup::TokenLimits)
            .with_children(vec![
                CapabilityDetail::new("token-limits-request", "Per-request limit"),
                CapabilityDetail::new("token-limits-tpm", "Tokens per minute"),
            ]),
        CapabilityDetail::new("token-metrics", "Token metrics").governed_by(FeatureGroup::TokenMetrics),
        CapabilityDetail::new("semantic-caching", "Semantic caching")
            .governed_by(FeatureGroup::SemanticCaching),
        CapabilityDetail::new("content-safety", "Content safety")
            .governed_by(FeatureGroup::ContentSafety),
        CapabilityDetail::new("model-backends", "Model backends")
            .governed_by(FeatureGroup::ModelBackends)
            .with_children(vec![
                CapabilityDetail::new("azure-openai", "Azure OpenAI").with_children(vec![
                    CapabilityDetail::new("azure-openai-gpt4", "GPT-4 deployment"),
                    CapabilityDetail::new("azure-openai-gpt35", "GPT-3.5 deployment"),
                ]),
                CapabilityDetail::new("ai-foundry", "AI Foundry models"),
            ]),
    ];
    recipe
}

/// The gateway wizard dataset.
#[must_use]
pub fn gateway_dataset() -> Dataset {
    let nodes = vec![
        Node::new("root", "What are you putting behind the gateway?", NodeType::Root),
        Node::new("hosting", "Where should the gateway run?", NodeType::Question),
        Node::new("tier", "Which API Management tier do you need?", NodeType::Question),
        Node::new("features-dev", "Which gateway features do you need?", NodeType::FeatureSelection),
        Node::new("features-prod", "Which gateway features do you need?", NodeType::FeatureSelection),
        Node::new("features-mcp", "Which features should the MCP gateway add?", NodeType::FeatureSelection),
        Node::new("recipe-dev", "Developer gateway recipe", NodeType::Terminal),
        Node::new("recipe-prod", "Production gateway recipe", NodeType::Terminal),
        Node::new("recipe-mcp", "MCP gateway recipe", NodeType::Terminal),
    ];

    let options = vec![
        option("opt-ai-gateway", "root", "Model APIs", "Put chat and embedding models behind one gateway."),
        option("opt-mcp-gateway", "root", "MCP servers", "Publish tools to agents through the gateway."),
        option("opt-managed", "hosting", "Managed in the cloud", "Run the gateway as a managed service."),
        option("opt-self-hosted", "hosting", "Self-hosted", "Run the gateway container in your own cluster."),
        option("opt-developer", "tier", "Developer", "No SLA; for evaluation and testing."),
        option("opt-premium", "tier", "Premium", "Multi-region, zone redundant, VNet integrated."),
        option("opt-dev-generate", "features-dev", "Generate recipe", ""),
        option("opt-prod-generate", "features-prod", "Generate recipe", ""),
        option("opt-mcp-generate", "features-mcp", "Generate recipe", ""),
    ];

    let paths = vec![
        Path::new("root", "opt-ai-gateway", "hosting"),
        Path::new("root", "opt-mcp-gateway", "features-mcp"),
        Path::new("hosting", "opt-managed", "tier"),
        Path::new("hosting", "opt-self-hosted", "tier"),
        Path::new("tier", "opt-developer", "features-dev"),
        Path::new("tier", "opt-premium", "features-prod"),
        Path::new("features-dev", "opt-dev-generate", "recipe-dev"),
        Path::new("features-prod", "opt-prod-generate", "recipe-prod"),
        Path::new("features-mcp", "opt-mcp-generate", "recipe-mcp"),
    ];

    let recipes = vec![
        gateway_recipe("recipe-dev", "Developer AI gateway", "Developer"),
        gateway_recipe("recipe-prod", "Production AI gateway", "Premium"),
        gateway_recipe("recipe-mcp", "MCP gateway", "Standard v2"),
    ];

    let components = [
        ("token-limits", "Token limits"),
        ("token-limits-request", "Per-request token limit"),
        ("token-limits-tpm", "Tokens-per-minute limit"),
        ("token-metrics", "Token metrics"),
        ("semantic-caching", "Semantic caching"),
        ("content-safety", "Content safety"),
        ("model-backends", "Model backends"),
        ("azure-openai", "Azure OpenAI"),
        ("azure-openai-gpt4", "Azure OpenAI GPT-4"),
        ("azure-openai-gpt35", "Azure OpenAI GPT-3.5"),
        ("ai-foundry", "AI Foundry"),
        ("mcp-support", "MCP server support"),
        ("load-balancing", "Load balancing"),
        ("circuit-breaker", "Circuit breaker"),
        ("authentication", "Authentication"),
        ("authorization", "Authorization"),
        ("request-transformation", "Request transformation"),
        ("response-transformation", "Response transformation"),
        ("resilience-retry", "Retry policy"),
    ]
    .into_iter()
    .map(|(id, name)| Component::new(id, name, "feature"))
    .collect();

    let rules = vec![
        CompatibilityRule::new(
            "token-limits-request",
            "token-limits-tpm",
            RuleKind::Error,
            "Choose one token limit strategy",
        ),
        CompatibilityRule::new(
            "mcp-support",
            "semantic-caching",
            RuleKind::Error,
            "Tool calls cannot be served from the semantic cache",
        ),
        CompatibilityRule::new(
            "semantic-caching",
            "content-safety",
            RuleKind::Warning,
            "Cached completions skip content screening",
        ),
        CompatibilityRule::new(
            "load-balancing",
            "circuit-breaker",
            RuleKind::Info,
            "Circuit breaking works per backend in the pool",
        ),
    ];

    Dataset {
        nodes,
        options,
        paths,
        recipes,
        components,
        rules,
    }
}
