//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.
//! Every read command runs against the redb mirror, so the wizard works
//! offline once `sync` has filled it.

use serde::Serialize;
use std::path::{Path, PathBuf};
use waypoint::store::read_document;
use waypoint::{AuthoredDocument, CacheSynchronizer, StoreBackend, SyncOutcome, WaypointConfig};
use waypoint_core::sample::gateway_dataset;
use waypoint_core::{
    CompatibilityEngine, ComponentId, GraphStore, NavigationEngine, NodeId, NodeType, OptionId,
    RecipeComposer, RedbMirror, VersionToken, WizardError, inspect_integrity,
};

/// Version token written into `waypoint demo` output.
const DEMO_VERSION: &str = "demo-1";

fn open_mirror(config: &WaypointConfig) -> Result<RedbMirror, WizardError> {
    RedbMirror::open(&config.mirror)
}

fn synchronizer(config: &WaypointConfig) -> Result<CacheSynchronizer<StoreBackend>, WizardError> {
    let store = StoreBackend::from_location(&config.store, config.api_key.clone());
    Ok(CacheSynchronizer::new(store, open_mirror(config)?))
}

fn print_json<T: Serialize>(value: &T) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

fn component_ids(list: &[String]) -> Vec<ComponentId> {
    list.iter().map(|s| ComponentId::from(s.as_str())).collect()
}

/// Validate output path (parent must be an existing directory).
fn validate_output_path(path: &Path) -> Result<PathBuf, WizardError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        WizardError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(WizardError::IoError(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| WizardError::IoError("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

// =============================================================================
// SYNC / CLEAR / STATUS
// =============================================================================

/// Refresh the mirror.
pub async fn cmd_sync(
    config: &WaypointConfig,
    json_mode: bool,
    force: bool,
) -> Result<(), WizardError> {
    let sync = synchronizer(config)?;
    let outcome = if force {
        sync.force_reload().await?
    } else {
        sync.sync().await?
    };

    if json_mode {
        print_json(&outcome);
        return Ok(());
    }

    match outcome {
        SyncOutcome::UpToDate { version } => println!("Mirror up to date (version {version})"),
        SyncOutcome::Reloaded {
            previous,
            version,
            nodes,
        } => {
            let previous = previous.map_or_else(|| "none".to_string(), |v| v.to_string());
            println!("Mirror reloaded: {previous} -> {version} ({nodes} nodes)");
        }
        SyncOutcome::Repaired { version, nodes } => {
            println!("Mirror repaired at version {version} ({nodes} nodes)");
        }
    }
    Ok(())
}

/// Wipe the mirror.
pub async fn cmd_clear(config: &WaypointConfig) -> Result<(), WizardError> {
    synchronizer(config)?.clear_all().await?;
    println!("Mirror cleared: {}", config.mirror.display());
    Ok(())
}

/// Show mirror status.
pub fn cmd_status(config: &WaypointConfig, json_mode: bool) -> Result<(), WizardError> {
    let mirror = open_mirror(config)?;
    let version = mirror.version()?;
    let nodes = mirror.node_count()?;
    let components = mirror.components()?.len();
    let rules = mirror.rules()?.len();
    let healthy = mirror.has_root_options()?;

    if json_mode {
        let output = serde_json::json!({
            "mirror": config.mirror.to_string_lossy(),
            "store": config.store,
            "version": version,
            "node_count": nodes,
            "component_count": components,
            "rule_count": rules,
            "healthy": healthy
        });
        print_json(&output);
        return Ok(());
    }

    println!("Waypoint Mirror Status");
    println!("======================");
    println!("Mirror:  {}", config.mirror.display());
    println!("Store:   {}", config.store);
    println!(
        "Version: {}",
        version.map_or_else(|| "(empty)".to_string(), |v| v.to_string())
    );
    println!();
    println!("Nodes:      {}", nodes);
    println!("Components: {}", components);
    println!("Rules:      {}", rules);
    if !healthy {
        println!();
        println!("Mirror has no root options; run `waypoint sync`.");
    }
    Ok(())
}

// =============================================================================
// VALIDATE COMMAND
// =============================================================================

/// Validate a dataset document.
pub async fn cmd_validate(file: &Path, json_mode: bool) -> Result<(), WizardError> {
    let document = read_document(file).await?;
    let report = inspect_integrity(&document.dataset);

    if json_mode {
        print_json(&serde_json::json!({
            "version": document.version,
            "report": report
        }));
    } else {
        println!("Dataset {} (version {})", file.display(), document.version);
        println!(
            "  {} nodes, {} options, {} paths, {} recipes, {} rules",
            report.total_nodes,
            report.total_options,
            report.total_paths,
            report.total_recipes,
            report.total_rules
        );
        if report.has_issues() {
            println!();
            println!("Violations:");
            for violation in &report.violations {
                println!("  - {violation}");
            }
        } else {
            println!("  OK");
        }
    }

    if report.has_issues() {
        return Err(WizardError::GraphIntegrity(report));
    }
    Ok(())
}

// =============================================================================
// WALK / TRACE
// =============================================================================

/// Replay option ids from the root.
pub fn cmd_walk(
    config: &WaypointConfig,
    json_mode: bool,
    options: &[String],
    features: &[String],
) -> Result<(), WizardError> {
    let mirror = open_mirror(config)?;
    let mut engine = NavigationEngine::new(&mirror)?;

    for option in options {
        if engine.current_node()?.node_type == NodeType::FeatureSelection {
            for feature in component_ids(features) {
                let verdict = engine.add_feature(&feature)?;
                for warning in &verdict.warnings {
                    tracing::warn!(
                        a = %warning.component_a,
                        b = %warning.component_b,
                        "{}",
                        warning.reason
                    );
                }
                if !verdict.can_add {
                    return Err(WizardError::IncompatibleSelection(verdict.errors));
                }
            }
        }
        engine.select_option(&OptionId::from(option.as_str()))?;
    }

    let current = engine.current_node()?;
    let breadcrumbs = engine.breadcrumbs()?;
    let composed = if current.is_terminal() {
        Some(engine.compose()?)
    } else {
        None
    };

    if json_mode {
        print_json(&serde_json::json!({
            "current": current.id,
            "question": current.question,
            "breadcrumbs": breadcrumbs,
            "explanation": engine.explain_path()?,
            "recipe": composed
        }));
        return Ok(());
    }

    println!("{}", engine.explain_path()?);
    println!();
    println!("Now at: {} - {}", current.id, current.question);
    match composed {
        Some(recipe) => print_recipe(&recipe),
        None => {
            for option in engine.options()? {
                println!("  [{}] {}", option.id, option.label);
            }
        }
    }
    Ok(())
}

/// Reconstruct the path to a node.
pub fn cmd_trace(config: &WaypointConfig, json_mode: bool, node: &str) -> Result<(), WizardError> {
    let mirror = open_mirror(config)?;
    let mut engine = NavigationEngine::new(&mirror)?;
    let path = engine.jump_to(&NodeId::from(node))?;
    if !path.is_unique() {
        tracing::warn!(
            nodes = ?path.ambiguous_nodes,
            "Several inbound edges; showing the first in sorted order"
        );
    }
    let breadcrumbs = engine.breadcrumbs()?;

    if json_mode {
        print_json(&serde_json::json!({
            "path": path,
            "breadcrumbs": breadcrumbs
        }));
        return Ok(());
    }

    for crumb in &breadcrumbs {
        println!("{} -> {}", crumb.question, crumb.option_label);
    }
    if path.hops.is_empty() {
        println!("{node} is the root");
    }
    Ok(())
}

// =============================================================================
// CHECK / COMPOSE
// =============================================================================

/// Evaluate compatibility rules.
pub fn cmd_check(
    config: &WaypointConfig,
    json_mode: bool,
    components: &[String],
    add: Option<&str>,
) -> Result<(), WizardError> {
    let mirror = open_mirror(config)?;
    let engine = CompatibilityEngine::from_store(&mirror)?;
    let existing = component_ids(components);

    if let Some(candidate) = add {
        let verdict = engine.can_add(&ComponentId::from(candidate), &existing);
        if json_mode {
            print_json(&verdict);
            return Ok(());
        }
        println!(
            "{candidate}: {}",
            if verdict.can_add { "can be added" } else { "blocked" }
        );
        for issue in verdict.errors.iter().chain(&verdict.warnings) {
            println!(
                "  [{:?}] {} + {}: {}",
                issue.kind, issue.component_a, issue.component_b, issue.reason
            );
        }
        return Ok(());
    }

    let report = engine.check_all(&existing);
    if json_mode {
        print_json(&report);
        return Ok(());
    }
    println!(
        "{} errors, {} warnings, {} info",
        report.errors.len(),
        report.warnings.len(),
        report.info.len()
    );
    for issue in report
        .errors
        .iter()
        .chain(&report.warnings)
        .chain(&report.info)
    {
        println!(
            "  [{:?}] {} + {}: {}",
            issue.kind, issue.component_a, issue.component_b, issue.reason
        );
    }
    Ok(())
}

/// Compose a terminal node's recipe.
pub fn cmd_compose(
    config: &WaypointConfig,
    json_mode: bool,
    node: &str,
    features: &[String],
) -> Result<(), WizardError> {
    let mirror = open_mirror(config)?;
    let selection = CompatibilityEngine::from_store(&mirror)?.admit(&component_ids(features))?;
    let composed = RecipeComposer::compose_for(&mirror, &NodeId::from(node), &selection)?;

    if !composed.unrecognized.is_empty() {
        tracing::warn!(ids = ?composed.unrecognized, "Features outside every group add no step");
    }

    if json_mode {
        print_json(&composed);
        return Ok(());
    }
    print_recipe(&composed);
    Ok(())
}

fn print_recipe(recipe: &waypoint_core::ComposedRecipe) {
    println!();
    println!("{}", recipe.title);
    println!("{}", "=".repeat(recipe.title.len()));
    for step in &recipe.steps {
        println!("{}. {}", step.number, step.title);
        if !step.description.is_empty() {
            println!("   {}", step.description);
        }
    }
    if !recipe.features.is_empty() {
        let names: Vec<&str> = recipe.features.iter().map(ComponentId::as_str).collect();
        println!();
        println!("Features: {}", names.join(", "));
    }
}

// =============================================================================
// DEMO COMMAND
// =============================================================================

/// Write the sample dataset as an authored document.
pub fn cmd_demo(output: &Path) -> Result<(), WizardError> {
    let path = validate_output_path(output)?;
    let document = AuthoredDocument {
        version: VersionToken::new(DEMO_VERSION),
        dataset: gateway_dataset(),
    };
    let json = serde_json::to_string_pretty(&document)
        .map_err(|e| WizardError::SerializationError(e.to_string()))?;
    std::fs::write(&path, json + "\n")
        .map_err(|e| WizardError::IoError(format!("Write {}: {e}", path.display())))?;
    println!("Wrote sample dataset to {}", path.display());
    Ok(())
}
