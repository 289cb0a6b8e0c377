//! # Node instance (part of C5, Graph IR)
//!
//! A [`NodeInstance`] places a [`NodeType`] within a [`crate::core::graph_function::GraphFunction`],
//! per `spec.md` §3. It owns its node type and the four parallel connection
//! arrays that record the fan-in/fan-out-1 exec edges and fan-in-1/fan-out
//! data edges.

use crate::backend::Backend;
use crate::core::node_type::NodeType;
use crate::core::types::Position;
use smallvec::SmallVec;
use uuid::Uuid;

/// `(peer node id, peer slot index)`.
pub type Endpoint = (Uuid, usize);

/// A placement of a [`NodeType`] within a function (`spec.md` §3).
#[derive(Clone)]
pub struct NodeInstance<B: Backend> {
    pub id: Uuid,
    pub position: Position,
    pub node_type: NodeType<B>,
    /// Fan-in allowed: every peer driving exec input `i`.
    pub input_exec: Vec<SmallVec<[Endpoint; 2]>>,
    /// Fan-out-1: at most one successor per exec output (`spec.md` §3, and
    /// the stricter reading mandated by the Open Questions in §9).
    pub output_exec: Vec<Option<Endpoint>>,
    /// Fan-in-1: at most one producer per data input.
    pub input_data: Vec<Option<Endpoint>>,
    /// Fan-out allowed: every consumer of data output `i`.
    pub output_data: Vec<SmallVec<[Endpoint; 4]>>,
}

impl<B: Backend> NodeInstance<B> {
    pub fn new(node_type: NodeType<B>, position: Position) -> Self {
        let data_inputs = node_type.data_inputs.len();
        let data_outputs = node_type.data_outputs.len();
        let exec_inputs = node_type.exec_inputs.len();
        let exec_outputs = node_type.exec_outputs.len();
        Self {
            id: Uuid::new_v4(),
            position,
            node_type,
            input_exec: vec![SmallVec::new(); exec_inputs],
            output_exec: vec![None; exec_outputs],
            input_data: vec![None; data_inputs],
            output_data: vec![SmallVec::new(); data_outputs],
        }
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    pub fn is_pure(&self) -> bool {
        self.node_type.is_pure()
    }
}

impl<B: Backend> std::fmt::Debug for NodeInstance<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeInstance")
            .field("id", &self.id)
            .field("node_type", &self.node_type.qualified_name())
            .finish()
    }
}
