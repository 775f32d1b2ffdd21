//! # Cache Synchronizer
//!
//! Keeps the local redb mirror in step with the authoritative store.
//!
//! ## Protocol
//!
//! 1. Fetch the remote version token.
//! 2. Equal to the mirror's token and the mirror serves root options: done.
//!    Equal but the mirror is hollow: reload anyway.
//! 3. Otherwise fetch the full dataset, validate it, and replace the mirror
//!    and its token in one redb transaction.
//!
//! A dataset that fails validation is rejected as a whole and the last good
//! mirror stays in place. Every step runs under the mirror lock, so syncs in
//! one process never interleave; the compare-and-swap inside `replace_all`
//! catches writers in other processes.

use crate::store::AuthoritativeStore;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use waypoint_core::{Graph, RedbMirror, VersionToken, WizardError};

/// What a sync did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum SyncOutcome {
    /// Versions matched and the mirror was healthy.
    UpToDate { version: VersionToken },
    /// The mirror was replaced with a new dataset.
    Reloaded {
        previous: Option<VersionToken>,
        version: VersionToken,
        nodes: usize,
    },
    /// Versions matched but the mirror had no root options; it was refilled.
    Repaired { version: VersionToken, nodes: usize },
}

/// Owns the sync protocol between one store and one mirror.
pub struct CacheSynchronizer<S> {
    store: S,
    mirror: Arc<Mutex<RedbMirror>>,
}

impl<S: AuthoritativeStore> CacheSynchronizer<S> {
    pub fn new(store: S, mirror: RedbMirror) -> Self {
        Self::with_shared(store, Arc::new(Mutex::new(mirror)))
    }

    /// Use a mirror shared with other synchronizers or readers.
    pub fn with_shared(store: S, mirror: Arc<Mutex<RedbMirror>>) -> Self {
        Self { store, mirror }
    }

    /// Handle to the mirror, for readers.
    pub fn mirror(&self) -> Arc<Mutex<RedbMirror>> {
        Arc::clone(&self.mirror)
    }

    pub async fn local_version(&self) -> Result<Option<VersionToken>, WizardError> {
        self.mirror.lock().await.version()
    }

    /// Bring the mirror up to date with the store.
    pub async fn sync(&self) -> Result<SyncOutcome, WizardError> {
        let mut mirror = self.mirror.lock().await;
        let local = mirror.version()?;
        let remote = self.store.fetch_version().await?;

        if local.as_ref() == Some(&remote) {
            if mirror.has_root_options()? {
                tracing::debug!(version = %remote, "Mirror up to date");
                return Ok(SyncOutcome::UpToDate { version: remote });
            }
            tracing::warn!(
                version = %remote,
                "Mirror version matches but root has no options, forcing reload"
            );
            let nodes = self.reload(&mut mirror, &remote, local.as_ref()).await?;
            return Ok(SyncOutcome::Repaired {
                version: remote,
                nodes,
            });
        }

        let nodes = self.reload(&mut mirror, &remote, local.as_ref()).await?;
        Ok(SyncOutcome::Reloaded {
            previous: local,
            version: remote,
            nodes,
        })
    }

    /// Replace the mirror regardless of versions.
    pub async fn force_reload(&self) -> Result<SyncOutcome, WizardError> {
        let mut mirror = self.mirror.lock().await;
        let local = mirror.version()?;
        let remote = self.store.fetch_version().await?;
        let nodes = self.reload(&mut mirror, &remote, local.as_ref()).await?;
        Ok(SyncOutcome::Reloaded {
            previous: local,
            version: remote,
            nodes,
        })
    }

    /// Wipe the mirror and its version token.
    pub async fn clear_all(&self) -> Result<(), WizardError> {
        self.mirror.lock().await.clear_all()?;
        tracing::info!("Mirror cleared");
        Ok(())
    }

    async fn reload(
        &self,
        mirror: &mut RedbMirror,
        version: &VersionToken,
        expected: Option<&VersionToken>,
    ) -> Result<usize, WizardError> {
        let dataset = self.store.fetch_dataset().await?;

        let graph = match Graph::from_dataset(dataset) {
            Ok(graph) => graph,
            Err(WizardError::GraphIntegrity(report)) => {
                for violation in &report.violations {
                    tracing::warn!(%violation, "Rejected record");
                }
                tracing::warn!(
                    store = %self.store.location(),
                    version = %version,
                    violations = report.violations.len(),
                    "Dataset failed validation, keeping last good mirror"
                );
                return Err(WizardError::GraphIntegrity(report));
            }
            Err(e) => return Err(e),
        };

        if let Err(e) = mirror.replace_all(&graph, version, expected) {
            if matches!(e, WizardError::VersionConflict { .. }) {
                tracing::warn!(error = %e, "Sync superseded by another writer");
            }
            return Err(e);
        }

        let nodes = graph.nodes().count();
        tracing::info!(
            store = %self.store.location(),
            previous = ?expected.map(VersionToken::as_str),
            version = %version,
            nodes,
            "Mirror reloaded"
        );
        Ok(nodes)
    }
}
