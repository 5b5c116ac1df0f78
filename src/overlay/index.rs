//! Identifier -> live nodes index

use crate::dom::{LiveDocument, NodeId};
use std::collections::HashMap;

/// Lookup of every live node carrying an identifier
///
/// Rebuilt lazily when the document's generation moves.
#[derive(Debug, Default)]
pub struct IdentifierIndex {
    generation: Option<u64>,
    nodes: HashMap<String, Vec<NodeId>>,
}

impl IdentifierIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild if the document changed since the last refresh
    pub fn refresh<D: LiveDocument>(&mut self, document: &D) {
        let generation = document.generation();
        if self.generation == Some(generation) {
            return;
        }
        self.nodes.clear();
        for (node, id) in document.elements_with_attribute(crate::ID_ATTRIBUTE) {
            self.nodes.entry(id).or_default().push(node);
        }
        self.generation = Some(generation);
        log::trace!("Identifier index rebuilt: {} identifiers", self.nodes.len());
    }

    /// Live nodes for `id`, in document order
    pub fn nodes(&self, id: &str) -> &[NodeId] {
        self.nodes.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn first(&self, id: &str) -> Option<NodeId> {
        self.nodes(id).first().copied()
    }

    /// Number of distinct identifiers
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// `(identifier, instance count)` pairs, sorted by identifier
    pub fn counts(&self) -> Vec<(String, usize)> {
        let mut counts: Vec<_> = self
            .nodes
            .iter()
            .map(|(id, nodes)| (id.clone(), nodes.len()))
            .collect();
        counts.sort();
        counts
    }

    /// Forget everything; the next refresh rebuilds
    pub fn invalidate(&mut self) {
        self.generation = None;
        self.nodes.clear();
    }
}
