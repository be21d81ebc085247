//! Graph primitives shared by the evaluation engine and the focuser
//!
//! - **key**: node identity (`NodeKey`) and table address (`NodeId`)
//! - **node_table**: the index-addressed in-memory graph
//! - **heap**: approximate heap accounting for payloads
//! - **target_graph**: petgraph view over declared targets (build order, cycles)
//!
//! The focuser only ever talks to a graph through [`FocusGraph`], so it can be
//! driven by the in-memory table here or by any other engine that exposes the
//! same operations.

pub mod heap;
pub mod key;
pub mod node_table;
pub mod target_graph;

pub use heap::HeapSize;
pub use key::{NodeId, NodeKey, NodeKind};
pub use node_table::InMemoryGraph;
pub use target_graph::TargetGraph;

/// Graph access the focuser needs from its owning evaluation engine.
///
/// Read methods take `&self` and must be safe to call from several threads at
/// once (marking may fan out). Mutating methods are only called while the
/// focuser holds the graph exclusively.
pub trait FocusGraph {
  /// Ids of every live node.
  fn node_ids(&self) -> Vec<NodeId>;

  /// One past the largest id ever handed out (sizing for mark tables).
  fn id_bound(&self) -> usize;

  /// Number of live nodes.
  fn node_count(&self) -> usize;

  fn key(&self, id: NodeId) -> Option<&NodeKey>;

  fn find(&self, key: &NodeKey) -> Option<NodeId>;

  /// Direct dependencies. Empty for unknown ids.
  fn deps(&self, id: NodeId) -> &[NodeId];

  /// Direct reverse dependencies. Empty for unknown ids.
  fn rdeps(&self, id: NodeId) -> &[NodeId];

  /// Total rdep references across all live nodes.
  fn rdep_edge_count(&self) -> usize;

  fn estimate_heap_bytes(&self) -> usize;

  /// Remove a node and its payload. Edges pointing at it from other nodes are
  /// left dangling. Returns false if the id was not live.
  fn delete_node(&mut self, id: NodeId) -> bool;

  /// Remove references to deleted nodes from a live node.
  /// Returns `(deps removed, rdeps removed)`.
  fn strip_dangling_edges(&mut self, id: NodeId) -> (usize, usize);

  /// Called before the first deletion of a sweep.
  fn begin_sweep(&mut self);

  /// Called once every dangling reference has been stripped.
  fn finish_sweep(&mut self);
}
