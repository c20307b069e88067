//! # Resolution Ledger
//!
//! The ledger records every reference visited during one resolution pass, keyed by the
//! [`Path`] at which the reference sits in the root document. It is created fresh for each
//! pass and dropped with it; nothing is cached between passes.
//!
//! ## Lifecycle of an entry
//!
//! 1. [`Ledger::register`] inserts a pending [`ResolvedEntity`] before its fetch is issued, so
//!    a failed pass still shows which identities were in flight.
//! 2. [`Ledger::attach`] stores the entity's payload as soon as it arrives, and again once its
//!    own subtree has settled and conditional gates may have rewritten it.
//! 3. [`Ledger::rebuild`] splices every payload back into a copy of the document.
//!
//! ## Concurrency
//!
//! Concurrent branches of a pass share one ledger. Each branch writes distinct paths, and the
//! internal lock is only held for the duration of a map operation (never across an `.await`).

use crate::error::ResolverError;
use crate::path::Path;
use crate::reference::ResourceRef;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use tracing::warn;

/// One reference visited during a pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedEntity {
    pub reference: ResourceRef,
    pub path: Path,
    pub meta: Option<Value>,
    /// `None` until the entity's payload has been attached.
    pub data: Option<Value>,
}

impl ResolvedEntity {
    pub fn pending(reference: ResourceRef, path: Path, meta: Option<Value>) -> Self {
        Self {
            reference,
            path,
            meta,
            data: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.data.is_some()
    }

    /// `{ ...data, <meta_key>: meta }`, or `None` while pending.
    fn spliced(&self, meta_key: &str) -> Option<Value> {
        let mut payload = self.data.clone()?;
        if let (Some(object), Some(meta)) = (payload.as_object_mut(), &self.meta) {
            object.insert(meta_key.to_string(), meta.clone());
        }
        Some(payload)
    }
}

/// Path-ordered map of the references visited in one pass.
#[derive(Debug, Default)]
pub struct Ledger {
    entries: Mutex<BTreeMap<Path, ResolvedEntity>>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<Path, ResolvedEntity>> {
        // A poisoned map only means another branch panicked mid-insert; the data is still a
        // valid map.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Inserts a pending entity. Fails if its path is already taken.
    pub fn register(&self, entity: ResolvedEntity) -> Result<(), ResolverError> {
        let mut entries = self.lock();
        if entries.contains_key(&entity.path) {
            warn!(path = %entity.path, "Ledger collision");
            return Err(ResolverError::LedgerCollision(entity.path));
        }
        entries.insert(entity.path.clone(), entity);
        Ok(())
    }

    /// Stores (or replaces) the payload of the entity at `path`. Returns `false` if nothing is
    /// registered there.
    pub fn attach(&self, path: &Path, data: Value) -> bool {
        match self.lock().get_mut(path) {
            Some(entity) => {
                entity.data = Some(data);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.lock().contains_key(path)
    }

    /// A snapshot of the entity at `path`.
    pub fn get(&self, path: &Path) -> Option<ResolvedEntity> {
        self.lock().get(path).cloned()
    }

    /// Registered paths in ancestor-first order.
    pub fn paths(&self) -> Vec<Path> {
        self.lock().keys().cloned().collect()
    }

    /// Snapshots of all entities in ancestor-first order.
    pub fn entities(&self) -> Vec<ResolvedEntity> {
        self.lock().values().cloned().collect()
    }

    /// Splices every attached payload into a copy of `original`.
    ///
    /// Entries are applied in path order, so each ancestor lands before the references nested
    /// inside it and the result does not depend on the order in which entries were registered.
    /// Pending entries are skipped. `original` is never modified.
    pub fn rebuild(&self, original: &Value, meta_key: &str) -> Value {
        let mut tree = original.clone();
        for entity in self.lock().values() {
            let Some(payload) = entity.spliced(meta_key) else {
                warn!(path = %entity.path, "Skipping unresolved entity during rebuild");
                continue;
            };
            if !entity.path.set(&mut tree, payload) {
                warn!(path = %entity.path, "Rebuild target is unreachable");
            }
        }
        tree
    }
}
