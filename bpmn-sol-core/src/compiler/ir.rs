use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};

/// One pool of the collaboration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    /// Display name. Falls back to the id when the diagram omits it.
    pub name: String,
    /// The contained process, if the pool is not collapsed.
    pub process_ref: Option<String>,
}

/// Flow node, one per BPMN element.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum FlowNode {
    Start {
        id: String,
        name: Option<String>,
        process_id: String,
    },
    End {
        id: String,
        name: Option<String>,
        process_id: String,
    },
    Task {
        id: String,
        name: Option<String>,
        process_id: String,
    },
    Gateway {
        id: String,
        name: Option<String>,
        process_id: String,
    },
    /// Intermediate catch event without a timer definition (message catch).
    CatchEvent {
        id: String,
        name: Option<String>,
        process_id: String,
    },
    /// Intermediate catch event carrying a timer definition. `payload` is
    /// the raw text of the timer child (`timeDuration` etc.), unparsed.
    Timer {
        id: String,
        name: Option<String>,
        process_id: String,
        payload: Option<String>,
    },
}

impl FlowNode {
    pub fn id(&self) -> &str {
        match self {
            FlowNode::Start { id, .. }
            | FlowNode::End { id, .. }
            | FlowNode::Task { id, .. }
            | FlowNode::Gateway { id, .. }
            | FlowNode::CatchEvent { id, .. }
            | FlowNode::Timer { id, .. } => id,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            FlowNode::Start { name, .. }
            | FlowNode::End { name, .. }
            | FlowNode::Task { name, .. }
            | FlowNode::Gateway { name, .. }
            | FlowNode::CatchEvent { name, .. }
            | FlowNode::Timer { name, .. } => name.as_deref(),
        }
    }

    pub fn process_id(&self) -> &str {
        match self {
            FlowNode::Start { process_id, .. }
            | FlowNode::End { process_id, .. }
            | FlowNode::Task { process_id, .. }
            | FlowNode::Gateway { process_id, .. }
            | FlowNode::CatchEvent { process_id, .. }
            | FlowNode::Timer { process_id, .. } => process_id,
        }
    }

    /// Display label used in diagnostics: the name when present, else the id.
    pub fn label(&self) -> &str {
        self.name().unwrap_or_else(|| self.id())
    }

    pub fn is_timer(&self) -> bool {
        matches!(self, FlowNode::Timer { .. })
    }
}

/// Edge kind. Sequence flows stay inside a process, message flows cross pools.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowKind {
    Sequence,
    Message,
}

/// Flow edge, one per sequence or message flow.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FlowEdge {
    pub id: String,
    pub kind: FlowKind,
    pub name: Option<String>,
}

/// The decoded collaboration: a directed graph of BPMN elements plus the
/// pool and process tables. Node and edge insertion order is the source
/// document order, which every downstream stage relies on for byte-stable
/// output.
pub type FlowGraph = DiGraph<FlowNode, FlowEdge>;

#[derive(Debug, Default)]
pub struct ProcessGraph {
    pub graph: FlowGraph,
    /// Pools in document order.
    pub participants: Vec<Participant>,
    /// Process ids in document order.
    pub processes: Vec<String>,
}

impl ProcessGraph {
    /// Find a node by its BPMN element id.
    pub fn find_node_by_id(&self, element_id: &str) -> Option<NodeIndex> {
        self.graph
            .node_indices()
            .find(|&idx| self.graph[idx].id() == element_id)
    }

    /// Find the start node.
    pub fn find_start(&self) -> Option<NodeIndex> {
        self.graph
            .node_indices()
            .find(|&idx| matches!(&self.graph[idx], FlowNode::Start { .. }))
    }

    /// Outgoing edges of `idx` in document order.
    ///
    /// `edges_directed` walks a node's adjacency list newest-first, so a
    /// global scan over `edge_references` (edge-index order = insertion
    /// order) is used instead.
    pub fn outgoing(&self, idx: NodeIndex) -> Vec<(NodeIndex, &FlowEdge)> {
        self.graph
            .edge_references()
            .filter(|e| e.source() == idx)
            .map(|e| (e.target(), e.weight()))
            .collect()
    }

    /// Incoming edges of `idx` in document order.
    pub fn incoming(&self, idx: NodeIndex) -> Vec<(NodeIndex, &FlowEdge)> {
        self.graph
            .edge_references()
            .filter(|e| e.target() == idx)
            .map(|e| (e.source(), e.weight()))
            .collect()
    }
}
