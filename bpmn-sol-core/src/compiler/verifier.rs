use super::ir::{FlowKind, FlowNode, ProcessGraph};
use petgraph::visit::{Dfs, EdgeRef};

/// A structural defect found in the element graph.
#[derive(Debug, Clone)]
pub struct VerifyError {
    pub message: String,
    pub element_id: Option<String>,
}

impl std::fmt::Display for VerifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(id) = &self.element_id {
            write!(f, "[{}] {}", id, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

/// Verify the invariants emission depends on. An empty list means the
/// graph is compilable.
pub fn verify(pg: &ProcessGraph) -> Vec<VerifyError> {
    let mut errors = Vec::new();

    let starts: Vec<_> = pg
        .graph
        .node_indices()
        .filter(|&idx| matches!(&pg.graph[idx], FlowNode::Start { .. }))
        .collect();

    if starts.is_empty() {
        errors.push(VerifyError {
            message: "no start event found".to_string(),
            element_id: None,
        });
    } else if starts.len() > 1 {
        errors.push(VerifyError {
            message: format!("expected exactly one start event, found {}", starts.len()),
            element_id: None,
        });
    }

    let ends = pg
        .graph
        .node_indices()
        .filter(|&idx| matches!(&pg.graph[idx], FlowNode::End { .. }))
        .count();

    if ends == 0 {
        errors.push(VerifyError {
            message: "no end event found".to_string(),
            element_id: None,
        });
    }

    errors
}

/// Non-fatal structural findings: nodes the start event cannot reach and
/// sequence flows that cross a process boundary. The emitter handles both
/// shapes; they usually indicate a modelling mistake.
pub fn structural_warnings(pg: &ProcessGraph) -> Vec<VerifyError> {
    let mut warnings = Vec::new();

    if let Some(start_idx) = pg.find_start() {
        let mut reachable = std::collections::HashSet::new();
        let mut dfs = Dfs::new(&pg.graph, start_idx);
        while let Some(nx) = dfs.next(&pg.graph) {
            reachable.insert(nx);
        }
        for idx in pg.graph.node_indices() {
            if !reachable.contains(&idx) {
                warnings.push(VerifyError {
                    message: format!("element '{}' is unreachable from the start event", pg.graph[idx].id()),
                    element_id: Some(pg.graph[idx].id().to_string()),
                });
            }
        }
    }

    for edge in pg.graph.edge_references() {
        if edge.weight().kind == FlowKind::Sequence {
            let from = &pg.graph[edge.source()];
            let to = &pg.graph[edge.target()];
            if from.process_id() != to.process_id() {
                warnings.push(VerifyError {
                    message: format!(
                        "sequence flow '{}' crosses process boundary ({} -> {})",
                        edge.weight().id,
                        from.process_id(),
                        to.process_id()
                    ),
                    element_id: Some(edge.weight().id.clone()),
                });
            }
        }
    }

    warnings
}
