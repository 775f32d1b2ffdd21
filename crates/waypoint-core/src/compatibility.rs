//! # Compatibility Engine
//!
//! Pairwise rule evaluation over component selections.
//!
//! Rules are stored under the canonical (sorted) pair key, so a lookup is
//! symmetric no matter which way round the rule was authored. Every reported
//! issue also names its pair in canonical order.
//!
//! The engine is also the only gate that turns a set of ids into a
//! `FeatureSelection`: a selection with an error-level conflict never reaches
//! the composer.

use crate::features::FeatureSelection;
use crate::graph::GraphStore;
use crate::{CompatibilityRule, ComponentId, RuleKind, WizardError, pair_key};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// A rule that fired for a specific pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompatibilityIssue {
    pub component_a: ComponentId,
    pub component_b: ComponentId,
    #[serde(rename = "type")]
    pub kind: RuleKind,
    pub reason: String,
}

impl CompatibilityIssue {
    /// Check whether the issue involves `id`.
    #[must_use]
    pub fn involves(&self, id: &ComponentId) -> bool {
        &self.component_a == id || &self.component_b == id
    }
}

/// Issues of one pairwise evaluation, split by severity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompatibilityReport {
    pub errors: Vec<CompatibilityIssue>,
    pub warnings: Vec<CompatibilityIssue>,
    pub info: Vec<CompatibilityIssue>,
}

impl CompatibilityReport {
    /// True when at least one error-level rule fired.
    #[must_use]
    pub fn is_blocking(&self) -> bool {
        !self.errors.is_empty()
    }

    fn push(&mut self, issue: CompatibilityIssue) {
        match issue.kind {
            RuleKind::Error => self.errors.push(issue),
            RuleKind::Warning => self.warnings.push(issue),
            RuleKind::Info => self.info.push(issue),
        }
    }
}

/// Whether a component may join an existing selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionVerdict {
    pub can_add: bool,
    pub errors: Vec<CompatibilityIssue>,
    pub warnings: Vec<CompatibilityIssue>,
}

/// Evaluates compatibility rules over sets of components.
#[derive(Debug, Clone, Default)]
pub struct CompatibilityEngine {
    rules: BTreeMap<(ComponentId, ComponentId), CompatibilityRule>,
}

impl CompatibilityEngine {
    /// Build an engine from authored rules.
    ///
    /// When two rules cover the same unordered pair the first one wins.
    #[must_use]
    pub fn new(rules: impl IntoIterator<Item = CompatibilityRule>) -> Self {
        let mut map = BTreeMap::new();
        for rule in rules {
            map.entry(rule.pair_key()).or_insert(rule);
        }
        Self { rules: map }
    }

    /// Build an engine from the rules held by a graph store.
    pub fn from_store<G: GraphStore + ?Sized>(store: &G) -> Result<Self, WizardError> {
        Ok(Self::new(store.rules()?))
    }

    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Look up the rule for an unordered pair.
    ///
    /// Symmetric: `check_pair(a, b) == check_pair(b, a)`. A component is
    /// never in conflict with itself.
    #[must_use]
    pub fn check_pair(&self, a: &ComponentId, b: &ComponentId) -> Option<CompatibilityIssue> {
        if a == b {
            return None;
        }
        let key = pair_key(a, b);
        self.rules.get(&key).map(|rule| CompatibilityIssue {
            component_a: key.0.clone(),
            component_b: key.1.clone(),
            kind: rule.kind,
            reason: rule.reason.clone(),
        })
    }

    /// Evaluate every unordered pair in `ids`.
    ///
    /// Duplicate ids are collapsed first, so a pair is reported once. The
    /// order of the report follows the sorted pair order.
    #[must_use]
    pub fn check_all(&self, ids: &[ComponentId]) -> CompatibilityReport {
        let unique: Vec<&ComponentId> = ids.iter().collect::<BTreeSet<_>>().into_iter().collect();
        let mut report = CompatibilityReport::default();
        for (i, a) in unique.iter().enumerate() {
            for b in &unique[i + 1..] {
                if let Some(issue) = self.check_pair(a, b) {
                    report.push(issue);
                }
            }
        }
        report
    }

    #[must_use]
    pub fn errors(&self, ids: &[ComponentId]) -> Vec<CompatibilityIssue> {
        self.check_all(ids).errors
    }

    #[must_use]
    pub fn warnings(&self, ids: &[ComponentId]) -> Vec<CompatibilityIssue> {
        self.check_all(ids).warnings
    }

    #[must_use]
    pub fn info(&self, ids: &[ComponentId]) -> Vec<CompatibilityIssue> {
        self.check_all(ids).info
    }

    /// Decide whether `candidate` may join `existing`.
    ///
    /// Only issues involving the candidate count: conflicts already present
    /// inside `existing` do not block it.
    #[must_use]
    pub fn can_add(&self, candidate: &ComponentId, existing: &[ComponentId]) -> AdmissionVerdict {
        let mut ids = existing.to_vec();
        ids.push(candidate.clone());
        let report = self.check_all(&ids);

        let errors: Vec<_> = report
            .errors
            .into_iter()
            .filter(|issue| issue.involves(candidate))
            .collect();
        let warnings: Vec<_> = report
            .warnings
            .into_iter()
            .filter(|issue| issue.involves(candidate))
            .collect();

        AdmissionVerdict {
            can_add: errors.is_empty(),
            errors,
            warnings,
        }
    }

    /// Admit a set of features through the compatibility gate.
    ///
    /// Fails with `IncompatibleSelection` listing every error-level conflict.
    pub fn admit(&self, ids: &[ComponentId]) -> Result<FeatureSelection, WizardError> {
        let report = self.check_all(ids);
        if report.is_blocking() {
            return Err(WizardError::IncompatibleSelection(report.errors));
        }
        Ok(FeatureSelection::admitted(ids.iter().cloned().collect()))
    }
}

// =============================================================================
// TESTS
// =============================================================================
