//! Tool registry: immutable snapshots behind an atomically swapped pointer.
//!
//! Readers load the current snapshot without locking; the single writer
//! (registry sync) builds a complete new snapshot and publishes it with one
//! pointer swap. A reader holding an older snapshot keeps a valid view until
//! it drops its `Arc`.

use arc_swap::ArcSwap;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::tools::definition::{ToolDefinition, TransportKind, TransportSpec};

// =============================================================================
// Tool handle
// =============================================================================

/// Immutable call-time view of a tool definition.
///
/// Kept distinct from `ToolDefinition` so templates can later be precompiled
/// here without touching the registry contract.
#[derive(Debug)]
pub struct ToolHandle {
    definition: ToolDefinition,
}

impl ToolHandle {
    pub fn new(definition: ToolDefinition) -> Self {
        Self { definition }
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn description(&self) -> Option<&str> {
        self.definition.description.as_deref()
    }

    pub fn input_schema(&self) -> &Value {
        &self.definition.input_schema
    }

    pub fn transport(&self) -> &TransportSpec {
        &self.definition.transport
    }

    pub fn transport_kind(&self) -> TransportKind {
        self.definition.transport_kind()
    }

    pub fn summary(&self) -> ToolSummary {
        ToolSummary {
            name: self.definition.name.clone(),
            description: self.definition.description.clone(),
            input_schema: self.definition.input_schema.clone(),
        }
    }
}

/// Listing entry exposed by both front ends.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolSummary {
    pub name: String,
    pub description: Option<String>,
    pub input_schema: Value,
}

// =============================================================================
// Snapshot
// =============================================================================

/// Fully built name → handle map. Never mutated after publication.
#[derive(Debug, Default)]
pub struct RegistrySnapshot {
    tools: HashMap<String, Arc<ToolHandle>>,
}

impl RegistrySnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a definition while building. Returns the handle it displaced, if
    /// two definitions share a name.
    pub fn insert(&mut self, definition: ToolDefinition) -> Option<Arc<ToolHandle>> {
        let name = definition.name.clone();
        self.tools.insert(name, Arc::new(ToolHandle::new(definition)))
    }

    pub fn get(&self, name: &str) -> Option<Arc<ToolHandle>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Listing sorted by name.
    pub fn summaries(&self) -> Vec<ToolSummary> {
        let mut summaries: Vec<ToolSummary> = self.tools.values().map(|h| h.summary()).collect();
        summaries.sort_by(|a, b| a.name.cmp(&b.name));
        summaries
    }
}

impl FromIterator<ToolDefinition> for RegistrySnapshot {
    fn from_iter<I: IntoIterator<Item = ToolDefinition>>(iter: I) -> Self {
        let mut snapshot = Self::new();
        for definition in iter {
            snapshot.insert(definition);
        }
        snapshot
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Live tool registry. Empty until the first `replace`.
#[derive(Debug)]
pub struct ToolRegistry {
    current: ArcSwap<RegistrySnapshot>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(RegistrySnapshot::new()),
        }
    }

    /// Look up a tool in the current snapshot.
    pub fn get(&self, name: &str) -> Option<Arc<ToolHandle>> {
        self.current.load().get(name)
    }

    /// List tools of the snapshot current at call time.
    pub fn list(&self) -> Vec<ToolSummary> {
        self.current.load().summaries()
    }

    /// Pin the current snapshot for a multi-step read.
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        self.current.load_full()
    }

    pub fn len(&self) -> usize {
        self.current.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.load().is_empty()
    }

    /// Publish a new snapshot. Only registry sync calls this.
    pub fn replace(&self, snapshot: RegistrySnapshot) {
        self.current.store(Arc::new(snapshot));
    }
}
