//! # redb-backed Mirror
//!
//! A disk-backed, read-optimized copy of the authoritative dataset.
//!
//! The mirror is only ever written as a whole: `replace_all` clears every
//! table and refills it inside one write transaction, together with the new
//! version token. Readers therefore see either the old dataset and old token
//! or the new dataset and new token, never a mix.
//!
//! The replace is also a compare-and-swap on the version token, so two
//! overlapping refreshes cannot both commit on top of the same base.

use crate::graph::{Dataset, Graph, GraphStore};
use crate::primitives::VERSION_KEY;
use crate::{
    CompatibilityRule, Component, ComponentId, Node, NodeId, NodeOption, NodeType, OptionId, Path,
    Recipe, VersionToken, WizardError,
};
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use std::collections::BTreeMap;

/// Table for nodes: node_id -> serialized Node bytes
const NODES: TableDefinition<&str, &[u8]> = TableDefinition::new("nodes");

/// Table for options in authored order: (node_id, ordinal) -> serialized NodeOption bytes
const OPTIONS: TableDefinition<(&str, u32), &[u8]> = TableDefinition::new("options");

/// Table for option lookup: option_id -> (node_id, ordinal)
const OPTION_INDEX: TableDefinition<&str, (&str, u32)> = TableDefinition::new("option_index");

/// Table for edges: (from_node, from_option) -> to_node
const PATHS: TableDefinition<(&str, &str), &str> = TableDefinition::new("paths");

/// Table for reverse edges: (to_node, from_node, from_option) -> ()
const INBOUND: TableDefinition<(&str, &str, &str), ()> = TableDefinition::new("inbound");

/// Table for recipes: node_id -> serialized Recipe bytes
const RECIPES: TableDefinition<&str, &[u8]> = TableDefinition::new("recipes");

/// Table for components: component_id -> serialized Component bytes
const COMPONENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("components");

/// Table for rules in authored order: ordinal -> serialized CompatibilityRule bytes
const RULES: TableDefinition<u32, &[u8]> = TableDefinition::new("rules");

/// Table for metadata: key string -> value string
const METADATA: TableDefinition<&str, &str> = TableDefinition::new("metadata");

/// A disk-backed mirror of the authoritative dataset.
pub struct RedbMirror {
    /// The redb database handle.
    db: Database,
    /// Cached root id, refreshed on every replace.
    root: Option<NodeId>,
}

impl std::fmt::Debug for RedbMirror {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbMirror")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl RedbMirror {
    /// Open or create a mirror at the given path.
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self, WizardError> {
        let db =
            Database::create(path.as_ref()).map_err(|e| WizardError::IoError(e.to_string()))?;

        // Initialize tables if they don't exist
        {
            let write_txn = db
                .begin_write()
                .map_err(|e| WizardError::IoError(e.to_string()))?;
            let _ = write_txn
                .open_table(NODES)
                .map_err(|e| WizardError::IoError(e.to_string()))?;
            let _ = write_txn
                .open_table(OPTIONS)
                .map_err(|e| WizardError::IoError(e.to_string()))?;
            let _ = write_txn
                .open_table(OPTION_INDEX)
                .map_err(|e| WizardError::IoError(e.to_string()))?;
            let _ = write_txn
                .open_table(PATHS)
                .map_err(|e| WizardError::IoError(e.to_string()))?;
            let _ = write_txn
                .open_table(INBOUND)
                .map_err(|e| WizardError::IoError(e.to_string()))?;
            let _ = write_txn
                .open_table(RECIPES)
                .map_err(|e| WizardError::IoError(e.to_string()))?;
            let _ = write_txn
                .open_table(COMPONENTS)
                .map_err(|e| WizardError::IoError(e.to_string()))?;
            let _ = write_txn
                .open_table(RULES)
                .map_err(|e| WizardError::IoError(e.to_string()))?;
            let _ = write_txn
                .open_table(METADATA)
                .map_err(|e| WizardError::IoError(e.to_string()))?;
            write_txn
                .commit()
                .map_err(|e| WizardError::IoError(e.to_string()))?;
        }

        let mut mirror = Self { db, root: None };
        mirror.root = mirror.find_root()?;
        Ok(mirror)
    }

    fn find_root(&self) -> Result<Option<NodeId>, WizardError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| WizardError::IoError(e.to_string()))?;
        let table = read_txn
            .open_table(NODES)
            .map_err(|e| WizardError::IoError(e.to_string()))?;
        for entry in table
            .iter()
            .map_err(|e| WizardError::IoError(e.to_string()))?
        {
            let (_, value) = entry.map_err(|e| WizardError::IoError(e.to_string()))?;
            let node: Node = postcard::from_bytes(value.value())
                .map_err(|e| WizardError::SerializationError(e.to_string()))?;
            if node.node_type == NodeType::Root {
                return Ok(Some(node.id));
            }
        }
        Ok(None)
    }

    /// The version token of the mirrored dataset, if any.
    pub fn version(&self) -> Result<Option<VersionToken>, WizardError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| WizardError::IoError(e.to_string()))?;
        let table = read_txn
            .open_table(METADATA)
            .map_err(|e| WizardError::IoError(e.to_string()))?;
        Ok(table
            .get(VERSION_KEY)
            .map_err(|e| WizardError::IoError(e.to_string()))?
            .map(|v| VersionToken::new(v.value())))
    }

    /// Check that the mirror actually serves something: a root with options.
    pub fn has_root_options(&self) -> Result<bool, WizardError> {
        match &self.root {
            Some(root) => Ok(!self.options(root)?.is_empty()),
            None => Ok(false),
        }
    }

    /// Replace the whole mirror with a validated graph, in one transaction.
    ///
    /// The stored version must still equal `expected`; otherwise nothing is
    /// written and `VersionConflict` is returned.
    pub fn replace_all(
        &mut self,
        graph: &Graph,
        version: &VersionToken,
        expected: Option<&VersionToken>,
    ) -> Result<(), WizardError> {
        let dataset = graph.to_dataset();

        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| WizardError::IoError(e.to_string()))?;

        let found = {
            let meta = write_txn
                .open_table(METADATA)
                .map_err(|e| WizardError::IoError(e.to_string()))?;
            meta.get(VERSION_KEY)
                .map_err(|e| WizardError::IoError(e.to_string()))?
                .map(|v| VersionToken::new(v.value()))
        };
        if found.as_ref() != expected {
            write_txn
                .abort()
                .map_err(|e| WizardError::IoError(e.to_string()))?;
            return Err(WizardError::VersionConflict {
                expected: expected.cloned(),
                found,
            });
        }

        {
            let mut nodes = write_txn
                .open_table(NODES)
                .map_err(|e| WizardError::IoError(e.to_string()))?;
            let mut options = write_txn
                .open_table(OPTIONS)
                .map_err(|e| WizardError::IoError(e.to_string()))?;
            let mut option_index = write_txn
                .open_table(OPTION_INDEX)
                .map_err(|e| WizardError::IoError(e.to_string()))?;
            let mut paths = write_txn
                .open_table(PATHS)
                .map_err(|e| WizardError::IoError(e.to_string()))?;
            let mut inbound = write_txn
                .open_table(INBOUND)
                .map_err(|e| WizardError::IoError(e.to_string()))?;
            let mut recipes = write_txn
                .open_table(RECIPES)
                .map_err(|e| WizardError::IoError(e.to_string()))?;
            let mut components = write_txn
                .open_table(COMPONENTS)
                .map_err(|e| WizardError::IoError(e.to_string()))?;
            let mut rules = write_txn
                .open_table(RULES)
                .map_err(|e| WizardError::IoError(e.to_string()))?;
            let mut meta = write_txn
                .open_table(METADATA)
                .map_err(|e| WizardError::IoError(e.to_string()))?;

            nodes
                .retain(|_, _| false)
                .map_err(|e| WizardError::IoError(e.to_string()))?;
            options
                .retain(|_, _| false)
                .map_err(|e| WizardError::IoError(e.to_string()))?;
            option_index
                .retain(|_, _| false)
                .map_err(|e| WizardError::IoError(e.to_string()))?;
            paths
                .retain(|_, _| false)
                .map_err(|e| WizardError::IoError(e.to_string()))?;
            inbound
                .retain(|_, _| false)
                .map_err(|e| WizardError::IoError(e.to_string()))?;
            recipes
                .retain(|_, _| false)
                .map_err(|e| WizardError::IoError(e.to_string()))?;
            components
                .retain(|_, _| false)
                .map_err(|e| WizardError::IoError(e.to_string()))?;
            rules
                .retain(|_, _| false)
                .map_err(|e| WizardError::IoError(e.to_string()))?;

            for node in &dataset.nodes {
                let bytes = postcard::to_allocvec(node)
                    .map_err(|e| WizardError::SerializationError(e.to_string()))?;
                nodes
                    .insert(node.id.as_str(), bytes.as_slice())
                    .map_err(|e| WizardError::IoError(e.to_string()))?;
            }

            let mut ordinals: BTreeMap<&NodeId, u32> = BTreeMap::new();
            for option in &dataset.options {
                let ordinal = ordinals.entry(&option.node_id).or_insert(0);
                let bytes = postcard::to_allocvec(option)
                    .map_err(|e| WizardError::SerializationError(e.to_string()))?;
                options
                    .insert((option.node_id.as_str(), *ordinal), bytes.as_slice())
                    .map_err(|e| WizardError::IoError(e.to_string()))?;
                option_index
                    .insert(option.id.as_str(), (option.node_id.as_str(), *ordinal))
                    .map_err(|e| WizardError::IoError(e.to_string()))?;
                *ordinal = ordinal.saturating_add(1);
            }

            for path in &dataset.paths {
                paths
                    .insert(
                        (path.from_node_id.as_str(), path.from_option_id.as_str()),
                        path.to_node_id.as_str(),
                    )
                    .map_err(|e| WizardError::IoError(e.to_string()))?;
                inbound
                    .insert(
                        (
                            path.to_node_id.as_str(),
                            path.from_node_id.as_str(),
                            path.from_option_id.as_str(),
                        ),
                        (),
                    )
                    .map_err(|e| WizardError::IoError(e.to_string()))?;
            }

            for recipe in &dataset.recipes {
                let bytes = postcard::to_allocvec(recipe)
                    .map_err(|e| WizardError::SerializationError(e.to_string()))?;
                recipes
                    .insert(recipe.node_id.as_str(), bytes.as_slice())
                    .map_err(|e| WizardError::IoError(e.to_string()))?;
            }

            for component in &dataset.components {
                let bytes = postcard::to_allocvec(component)
                    .map_err(|e| WizardError::SerializationError(e.to_string()))?;
                components
                    .insert(component.id.as_str(), bytes.as_slice())
                    .map_err(|e| WizardError::IoError(e.to_string()))?;
            }

            for (ordinal, rule) in (0u32..).zip(&dataset.rules) {
                let bytes = postcard::to_allocvec(rule)
                    .map_err(|e| WizardError::SerializationError(e.to_string()))?;
                rules
                    .insert(ordinal, bytes.as_slice())
                    .map_err(|e| WizardError::IoError(e.to_string()))?;
            }

            meta.insert(VERSION_KEY, version.as_str())
                .map_err(|e| WizardError::IoError(e.to_string()))?;
        }

        write_txn
            .commit()
            .map_err(|e| WizardError::IoError(e.to_string()))?;

        self.root = Some(graph.root_id().clone());
        Ok(())
    }

    /// Drop every mirrored record and the version token.
    pub fn clear_all(&mut self) -> Result<(), WizardError> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| WizardError::IoError(e.to_string()))?;
        {
            write_txn
                .open_table(NODES)
                .map_err(|e| WizardError::IoError(e.to_string()))?
                .retain(|_, _| false)
                .map_err(|e| WizardError::IoError(e.to_string()))?;
            write_txn
                .open_table(OPTIONS)
                .map_err(|e| WizardError::IoError(e.to_string()))?
                .retain(|_, _| false)
                .map_err(|e| WizardError::IoError(e.to_string()))?;
            write_txn
                .open_table(OPTION_INDEX)
                .map_err(|e| WizardError::IoError(e.to_string()))?
                .retain(|_, _| false)
                .map_err(|e| WizardError::IoError(e.to_string()))?;
            write_txn
                .open_table(PATHS)
                .map_err(|e| WizardError::IoError(e.to_string()))?
                .retain(|_, _| false)
                .map_err(|e| WizardError::IoError(e.to_string()))?;
            write_txn
                .open_table(INBOUND)
                .map_err(|e| WizardError::IoError(e.to_string()))?
                .retain(|_, _| false)
                .map_err(|e| WizardError::IoError(e.to_string()))?;
            write_txn
                .open_table(RECIPES)
                .map_err(|e| WizardError::IoError(e.to_string()))?
                .retain(|_, _| false)
                .map_err(|e| WizardError::IoError(e.to_string()))?;
            write_txn
                .open_table(COMPONENTS)
                .map_err(|e| WizardError::IoError(e.to_string()))?
                .retain(|_, _| false)
                .map_err(|e| WizardError::IoError(e.to_string()))?;
            write_txn
                .open_table(RULES)
                .map_err(|e| WizardError::IoError(e.to_string()))?
                .retain(|_, _| false)
                .map_err(|e| WizardError::IoError(e.to_string()))?;
            write_txn
                .open_table(METADATA)
                .map_err(|e| WizardError::IoError(e.to_string()))?
                .retain(|_, _| false)
                .map_err(|e| WizardError::IoError(e.to_string()))?;
        }
        write_txn
            .commit()
            .map_err(|e| WizardError::IoError(e.to_string()))?;
        self.root = None;
        Ok(())
    }

    /// Read every mirrored record back into plain-record form.
    pub fn load_dataset(&self) -> Result<Dataset, WizardError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| WizardError::IoError(e.to_string()))?;
        let mut dataset = Dataset::default();

        let table = read_txn
            .open_table(NODES)
            .map_err(|e| WizardError::IoError(e.to_string()))?;
        for entry in table
            .iter()
            .map_err(|e| WizardError::IoError(e.to_string()))?
        {
            let (_, value) = entry.map_err(|e| WizardError::IoError(e.to_string()))?;
            dataset.nodes.push(
                postcard::from_bytes(value.value())
                    .map_err(|e| WizardError::SerializationError(e.to_string()))?,
            );
        }

        let table = read_txn
            .open_table(OPTIONS)
            .map_err(|e| WizardError::IoError(e.to_string()))?;
        for entry in table
            .iter()
            .map_err(|e| WizardError::IoError(e.to_string()))?
        {
            let (_, value) = entry.map_err(|e| WizardError::IoError(e.to_string()))?;
            dataset.options.push(
                postcard::from_bytes(value.value())
                    .map_err(|e| WizardError::SerializationError(e.to_string()))?,
            );
        }

        let table = read_txn
            .open_table(PATHS)
            .map_err(|e| WizardError::IoError(e.to_string()))?;
        for entry in table
            .iter()
            .map_err(|e| WizardError::IoError(e.to_string()))?
        {
            let (key, value) = entry.map_err(|e| WizardError::IoError(e.to_string()))?;
            let (from, option) = key.value();
            dataset.paths.push(Path::new(from, option, value.value()));
        }

        let table = read_txn
            .open_table(RECIPES)
            .map_err(|e| WizardError::IoError(e.to_string()))?;
        for entry in table
            .iter()
            .map_err(|e| WizardError::IoError(e.to_string()))?
        {
            let (_, value) = entry.map_err(|e| WizardError::IoError(e.to_string()))?;
            dataset.recipes.push(
                postcard::from_bytes(value.value())
                    .map_err(|e| WizardError::SerializationError(e.to_string()))?,
            );
        }

        dataset.components = self.components()?;
        dataset.rules = self.rules()?;
        Ok(dataset)
    }

    /// Load the mirror into an in-memory graph, re-validating it.
    pub fn snapshot(&self) -> Result<Graph, WizardError> {
        Graph::try_from(self.load_dataset()?)
    }

    fn get_bytes<T: serde::de::DeserializeOwned>(
        &self,
        definition: TableDefinition<'static, &'static str, &'static [u8]>,
        key: &str,
    ) -> Result<Option<T>, WizardError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| WizardError::IoError(e.to_string()))?;
        let table = read_txn
            .open_table(definition)
            .map_err(|e| WizardError::IoError(e.to_string()))?;
        match table
            .get(key)
            .map_err(|e| WizardError::IoError(e.to_string()))?
        {
            Some(data) => Ok(Some(
                postcard::from_bytes(data.value())
                    .map_err(|e| WizardError::SerializationError(e.to_string()))?,
            )),
            None => Ok(None),
        }
    }
}

impl GraphStore for RedbMirror {
    fn root(&self) -> Result<Node, WizardError> {
        let root = self.root.as_ref().ok_or(WizardError::RootNotFound)?;
        self.node(root)?.ok_or(WizardError::RootNotFound)
    }

    fn node(&self, id: &NodeId) -> Result<Option<Node>, WizardError> {
        self.get_bytes(NODES, id.as_str())
    }

    fn options(&self, node: &NodeId) -> Result<Vec<NodeOption>, WizardError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| WizardError::IoError(e.to_string()))?;
        let table = read_txn
            .open_table(OPTIONS)
            .map_err(|e| WizardError::IoError(e.to_string()))?;
        let mut result = Vec::new();
        for entry in table
            .range((node.as_str(), 0u32)..=(node.as_str(), u32::MAX))
            .map_err(|e| WizardError::IoError(e.to_string()))?
        {
            let (_, value) = entry.map_err(|e| WizardError::IoError(e.to_string()))?;
            result.push(
                postcard::from_bytes(value.value())
                    .map_err(|e| WizardError::SerializationError(e.to_string()))?,
            );
        }
        Ok(result)
    }

    fn option(&self, id: &OptionId) -> Result<Option<NodeOption>, WizardError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| WizardError::IoError(e.to_string()))?;
        let index = read_txn
            .open_table(OPTION_INDEX)
            .map_err(|e| WizardError::IoError(e.to_string()))?;
        let Some(location) = index
            .get(id.as_str())
            .map_err(|e| WizardError::IoError(e.to_string()))?
        else {
            return Ok(None);
        };
        let table = read_txn
            .open_table(OPTIONS)
            .map_err(|e| WizardError::IoError(e.to_string()))?;
        match table
            .get(location.value())
            .map_err(|e| WizardError::IoError(e.to_string()))?
        {
            Some(data) => Ok(Some(
                postcard::from_bytes(data.value())
                    .map_err(|e| WizardError::SerializationError(e.to_string()))?,
            )),
            None => Ok(None),
        }
    }

    fn resolve(&self, node: &NodeId, option: &OptionId) -> Result<Option<NodeId>, WizardError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| WizardError::IoError(e.to_string()))?;
        let table = read_txn
            .open_table(PATHS)
            .map_err(|e| WizardError::IoError(e.to_string()))?;
        Ok(table
            .get((node.as_str(), option.as_str()))
            .map_err(|e| WizardError::IoError(e.to_string()))?
            .map(|v| NodeId::new(v.value())))
    }

    fn outbound(&self, node: &NodeId) -> Result<Vec<Path>, WizardError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| WizardError::IoError(e.to_string()))?;
        let table = read_txn
            .open_table(PATHS)
            .map_err(|e| WizardError::IoError(e.to_string()))?;
        let mut result = Vec::new();
        for entry in table
            .range((node.as_str(), "")..)
            .map_err(|e| WizardError::IoError(e.to_string()))?
        {
            let (key, value) = entry.map_err(|e| WizardError::IoError(e.to_string()))?;
            let (from, option) = key.value();
            if from != node.as_str() {
                break;
            }
            result.push(Path::new(from, option, value.value()));
        }
        Ok(result)
    }

    fn inbound(&self, node: &NodeId) -> Result<Vec<Path>, WizardError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| WizardError::IoError(e.to_string()))?;
        let table = read_txn
            .open_table(INBOUND)
            .map_err(|e| WizardError::IoError(e.to_string()))?;
        let mut result = Vec::new();
        for entry in table
            .range((node.as_str(), "", "")..)
            .map_err(|e| WizardError::IoError(e.to_string()))?
        {
            let (key, _) = entry.map_err(|e| WizardError::IoError(e.to_string()))?;
            let (to, from, option) = key.value();
            if to != node.as_str() {
                break;
            }
            result.push(Path::new(from, option, to));
        }
        Ok(result)
    }

    fn recipe(&self, node: &NodeId) -> Result<Option<Recipe>, WizardError> {
        self.get_bytes(RECIPES, node.as_str())
    }

    fn component(&self, id: &ComponentId) -> Result<Option<Component>, WizardError> {
        self.get_bytes(COMPONENTS, id.as_str())
    }

    fn components(&self) -> Result<Vec<Component>, WizardError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| WizardError::IoError(e.to_string()))?;
        let table = read_txn
            .open_table(COMPONENTS)
            .map_err(|e| WizardError::IoError(e.to_string()))?;
        let mut result = Vec::new();
        for entry in table
            .iter()
            .map_err(|e| WizardError::IoError(e.to_string()))?
        {
            let (_, value) = entry.map_err(|e| WizardError::IoError(e.to_string()))?;
            result.push(
                postcard::from_bytes(value.value())
                    .map_err(|e| WizardError::SerializationError(e.to_string()))?,
            );
        }
        Ok(result)
    }

    fn rules(&self) -> Result<Vec<CompatibilityRule>, WizardError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| WizardError::IoError(e.to_string()))?;
        let table = read_txn
            .open_table(RULES)
            .map_err(|e| WizardError::IoError(e.to_string()))?;
        let mut result = Vec::new();
        for entry in table
            .iter()
            .map_err(|e| WizardError::IoError(e.to_string()))?
        {
            let (_, value) = entry.map_err(|e| WizardError::IoError(e.to_string()))?;
            result.push(
                postcard::from_bytes(value.value())
                    .map_err(|e| WizardError::SerializationError(e.to_string()))?,
            );
        }
        Ok(result)
    }

    fn node_count(&self) -> Result<usize, WizardError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| WizardError::IoError(e.to_string()))?;
        let table = read_txn
            .open_table(NODES)
            .map_err(|e| WizardError::IoError(e.to_string()))?;
        Ok(table
            .len()
            .map_err(|e| WizardError::IoError(e.to_string()))? as usize)
    }
}

// =============================================================================
// TESTS
// =============================================================================
