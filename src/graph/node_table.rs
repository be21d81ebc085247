//! In-memory evaluation graph stored as an index-addressed node table
//!
//! # Layout
//!
//! - **Slots**: `Vec<Option<NodeEntry<V>>>`, addressed by [`NodeId`]. A swept node
//!   leaves a tombstone (`None`). Tombstones become reusable only once a sweep
//!   has finished, since by then no surviving edge can still name them.
//! - **Index**: `NodeKey → NodeId` for lookups by identity.
//! - **Edges**: stored on both ends. `deps` keeps evaluation order, `rdeps` is a
//!   deduplicated list of consumers.
//!
//! Deleting a node only clears its slot and index entry. References to it held
//! by surviving nodes stay in place until [`FocusGraph::strip_dangling_edges`]
//! runs, which is what the sweep's edge phase does.

use super::heap::HeapSize;
use super::key::{NodeId, NodeKey};
use super::FocusGraph;
use crate::core::error::{FocusError, FocusResult};
use std::collections::HashMap;
use std::mem::size_of;

/// A single node: identity, computed value and edges.
#[derive(Debug, Clone)]
pub struct NodeEntry<V> {
  pub key: NodeKey,
  value: Option<V>,
  deps: Vec<NodeId>,
  rdeps: Vec<NodeId>,
  dirty: bool,
}

impl<V> NodeEntry<V> {
  fn new(key: NodeKey) -> Self {
    Self {
      key,
      value: None,
      deps: Vec::new(),
      rdeps: Vec::new(),
      dirty: false,
    }
  }
}

/// Node table implementing [`FocusGraph`].
#[derive(Debug)]
pub struct InMemoryGraph<V> {
  slots: Vec<Option<NodeEntry<V>>>,
  index: HashMap<NodeKey, NodeId>,
  live: usize,
  /// Deleted, possibly still referenced by dangling edges
  vacated: Vec<NodeId>,
  /// Deleted and unreferenced; handed out again by `get_or_insert`
  free: Vec<NodeId>,
  sweep_in_progress: bool,
}

impl<V> Default for InMemoryGraph<V> {
  fn default() -> Self {
    Self::new()
  }
}

impl<V> InMemoryGraph<V> {
  pub fn new() -> Self {
    Self {
      slots: Vec::new(),
      index: HashMap::new(),
      live: 0,
      vacated: Vec::new(),
      free: Vec::new(),
      sweep_in_progress: false,
    }
  }

  fn entry(&self, id: NodeId) -> Option<&NodeEntry<V>> {
    self.slots.get(id.index()).and_then(Option::as_ref)
  }

  fn entry_mut(&mut self, id: NodeId) -> Option<&mut NodeEntry<V>> {
    self.slots.get_mut(id.index()).and_then(Option::as_mut)
  }

  /// Look up a node by key, creating an empty (valueless) entry if absent.
  pub fn get_or_insert(&mut self, key: &NodeKey) -> FocusResult<NodeId> {
    if let Some(id) = self.index.get(key) {
      return Ok(*id);
    }
    let id = match self.free.pop() {
      Some(id) => {
        self.slots[id.index()] = Some(NodeEntry::new(key.clone()));
        id
      }
      None => {
        let raw = u32::try_from(self.slots.len())
          .map_err(|_| FocusError::message(format!("node table is full ({} slots)", self.slots.len())))?;
        self.slots.push(Some(NodeEntry::new(key.clone())));
        NodeId(raw)
      }
    };
    self.index.insert(key.clone(), id);
    self.live += 1;
    Ok(id)
  }

  /// Computed value of a node, if it has been evaluated.
  pub fn value(&self, id: NodeId) -> Option<&V> {
    self.entry(id).and_then(|e| e.value.as_ref())
  }

  /// Value of the node with the given key.
  pub fn value_of(&self, key: &NodeKey) -> Option<&V> {
    self.index.get(key).and_then(|id| self.value(*id))
  }

  /// A node is clean when it has a value and has not been invalidated.
  pub fn is_clean(&self, id: NodeId) -> bool {
    self.entry(id).is_some_and(|e| e.value.is_some() && !e.dirty)
  }

  /// Store a freshly computed value and replace the node's dependency edges.
  ///
  /// Rdep references held by former deps are removed; new deps gain this node
  /// as an rdep. Clears the dirty flag.
  pub fn set_value(&mut self, id: NodeId, value: V, deps: Vec<NodeId>) {
    let old_deps = match self.entry_mut(id) {
      Some(entry) => std::mem::take(&mut entry.deps),
      None => return,
    };
    for dep in old_deps {
      if let Some(dep_entry) = self.entry_mut(dep) {
        dep_entry.rdeps.retain(|r| *r != id);
      }
    }
    for dep in &deps {
      if let Some(dep_entry) = self.entry_mut(*dep)
        && !dep_entry.rdeps.contains(&id)
      {
        dep_entry.rdeps.push(id);
      }
    }
    if let Some(entry) = self.entry_mut(id) {
      entry.value = Some(value);
      entry.deps = deps;
      entry.dirty = false;
    }
  }

  /// Mark the given nodes and everything that transitively consumes them dirty.
  ///
  /// Returns the number of nodes newly marked.
  pub fn invalidate(&mut self, seeds: &[NodeId]) -> usize {
    let mut stack: Vec<NodeId> = seeds.to_vec();
    let mut marked = 0;
    while let Some(id) = stack.pop() {
      let Some(entry) = self.entry_mut(id) else {
        continue;
      };
      if entry.dirty {
        continue;
      }
      entry.dirty = true;
      marked += 1;
      stack.extend(entry.rdeps.iter().copied());
    }
    marked
  }

  /// Drop every node and start over with an empty table.
  pub fn clear(&mut self) {
    self.slots.clear();
    self.index.clear();
    self.live = 0;
    self.vacated.clear();
    self.free.clear();
    self.sweep_in_progress = false;
  }

  /// True when a sweep started and never finished; the table must not be trusted.
  pub fn is_corrupt(&self) -> bool {
    self.sweep_in_progress
  }

  /// Iterate over live keys.
  pub fn keys(&self) -> impl Iterator<Item = &NodeKey> {
    self.slots.iter().flatten().map(|e| &e.key)
  }

  pub fn contains(&self, key: &NodeKey) -> bool {
    self.index.contains_key(key)
  }
}

impl<V: HeapSize> InMemoryGraph<V> {
  fn entry_heap_size(entry: &NodeEntry<V>) -> usize {
    entry.key.name.capacity()
      + entry.value.heap_size()
      + (entry.deps.capacity() + entry.rdeps.capacity()) * size_of::<NodeId>()
      // index entry: key copy plus id
      + size_of::<NodeKey>()
      + entry.key.name.capacity()
      + size_of::<NodeId>()
  }
}

impl<V: HeapSize> FocusGraph for InMemoryGraph<V> {
  fn node_ids(&self) -> Vec<NodeId> {
    self
      .slots
      .iter()
      .enumerate()
      .filter(|(_, slot)| slot.is_some())
      .map(|(i, _)| NodeId(i as u32))
      .collect()
  }

  fn id_bound(&self) -> usize {
    self.slots.len()
  }

  fn node_count(&self) -> usize {
    self.live
  }

  fn key(&self, id: NodeId) -> Option<&NodeKey> {
    self.entry(id).map(|e| &e.key)
  }

  fn find(&self, key: &NodeKey) -> Option<NodeId> {
    self.index.get(key).copied()
  }

  fn deps(&self, id: NodeId) -> &[NodeId] {
    self.entry(id).map(|e| e.deps.as_slice()).unwrap_or(&[])
  }

  fn rdeps(&self, id: NodeId) -> &[NodeId] {
    self.entry(id).map(|e| e.rdeps.as_slice()).unwrap_or(&[])
  }

  fn rdep_edge_count(&self) -> usize {
    self.slots.iter().flatten().map(|e| e.rdeps.len()).sum()
  }

  fn estimate_heap_bytes(&self) -> usize {
    let table = self.slots.capacity() * size_of::<Option<NodeEntry<V>>>();
    table + self.slots.iter().flatten().map(Self::entry_heap_size).sum::<usize>()
  }

  fn delete_node(&mut self, id: NodeId) -> bool {
    let Some(slot) = self.slots.get_mut(id.index()) else {
      return false;
    };
    match slot.take() {
      Some(entry) => {
        self.index.remove(&entry.key);
        self.live -= 1;
        self.vacated.push(id);
        true
      }
      None => false,
    }
  }

  fn strip_dangling_edges(&mut self, id: NodeId) -> (usize, usize) {
    let Some(entry) = self.slots.get(id.index()).and_then(Option::as_ref) else {
      return (0, 0);
    };
    let is_live = |other: &NodeId| self.slots.get(other.index()).is_some_and(Option::is_some);
    let deps: Vec<NodeId> = entry.deps.iter().copied().filter(|d| is_live(d)).collect();
    let rdeps: Vec<NodeId> = entry.rdeps.iter().copied().filter(|r| is_live(r)).collect();

    let Some(entry) = self.entry_mut(id) else {
      return (0, 0);
    };
    let removed = (entry.deps.len() - deps.len(), entry.rdeps.len() - rdeps.len());
    entry.deps = deps;
    entry.rdeps = rdeps;
    entry.deps.shrink_to_fit();
    entry.rdeps.shrink_to_fit();
    removed
  }

  fn begin_sweep(&mut self) {
    self.sweep_in_progress = true;
  }

  /// Edges were stripped by the sweep, so every vacated slot is now unreferenced.
  fn finish_sweep(&mut self) {
    self.free.append(&mut self.vacated);
    self.sweep_in_progress = false;
  }
}
