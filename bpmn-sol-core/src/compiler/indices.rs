use super::ir::{FlowKind, FlowNode, ProcessGraph};
use super::names;
use crate::types::{CompileError, CompileWarning, BLOCKS_PER_DAY, FALLBACK_TIMER_BLOCKS, UNKNOWN_PARTICIPANT};
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::LazyLock;

static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^P(\d+)D$").unwrap());

/// Everything the emitter needs to know about one exclusive gateway.
#[derive(Clone, Debug, Serialize)]
pub struct GatewayInfo {
    pub id: String,
    pub participant: String,
    /// Source ids of incoming sequence flows, document order.
    pub dependencies: Vec<String>,
    pub yes_target: Option<String>,
    pub no_target: Option<String>,
}

/// A timer with its deadline duration resolved to blocks.
#[derive(Clone, Debug, Serialize)]
pub struct TimerInfo {
    pub id: String,
    pub duration_blocks: u64,
}

/// The emission-ready model derived from a verified `ProcessGraph`.
#[derive(Debug, Serialize)]
pub struct CompilationUnit {
    pub contract_name: String,
    /// `(display name, address)` pairs in document order.
    pub participants: Vec<(String, String)>,
    pub process_to_participant: BTreeMap<String, String>,
    /// Element id → owning participant display name (or the sentinel).
    pub element_participant: BTreeMap<String, String>,
    /// Element id → incoming sequence-flow source ids, document order.
    pub dependencies: BTreeMap<String, Vec<String>>,
    /// Gateways in document order.
    pub gateways: Vec<GatewayInfo>,
    /// Timers in document order.
    pub timers: Vec<TimerInfo>,
    /// Element id → emitted operation identifier.
    pub op_names: BTreeMap<String, String>,
    pub warnings: Vec<CompileWarning>,
}

impl CompilationUnit {
    pub fn duration_of(&self, timer_id: &str) -> u64 {
        self.timers
            .iter()
            .find(|t| t.id == timer_id)
            .map(|t| t.duration_blocks)
            .unwrap_or(FALLBACK_TIMER_BLOCKS)
    }
}

/// Map each contained process id to its pool's display name. The first
/// pool referencing a process wins; later ones are reported.
pub fn build_process_to_participant(
    pg: &ProcessGraph,
    warnings: &mut Vec<CompileWarning>,
) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    for participant in &pg.participants {
        let Some(process_ref) = &participant.process_ref else {
            continue;
        };
        if map.contains_key(process_ref) {
            warnings.push(CompileWarning {
                element_id: Some(participant.id.clone()),
                message: format!(
                    "multiple participants reference process '{}'; keeping the first",
                    process_ref
                ),
            });
            continue;
        }
        map.insert(process_ref.clone(), participant.name.clone());
    }
    map
}

/// Source ids of sequence flows targeting `element_id`, in document order.
/// Message flows are not dependencies.
pub fn dependencies_of(pg: &ProcessGraph, element_id: &str) -> Vec<String> {
    let Some(idx) = pg.find_node_by_id(element_id) else {
        return Vec::new();
    };
    pg.incoming(idx)
        .into_iter()
        .filter(|(_, edge)| edge.kind == FlowKind::Sequence)
        .map(|(source, _)| pg.graph[source].id().to_string())
        .collect()
}

/// Resolve the owning participant of an element through its containing
/// process, falling back to the sentinel.
pub fn participant_for_element(
    node: &FlowNode,
    process_to_participant: &BTreeMap<String, String>,
    warnings: &mut Vec<CompileWarning>,
) -> String {
    match process_to_participant.get(node.process_id()) {
        Some(name) => name.clone(),
        None => {
            warnings.push(CompileWarning {
                element_id: Some(node.id().to_string()),
                message: format!(
                    "no participant owns process '{}'; caller checks fall back to {}",
                    node.process_id(),
                    UNKNOWN_PARTICIPANT
                ),
            });
            UNKNOWN_PARTICIPANT.to_string()
        }
    }
}

/// Convert a timer payload to a block count. `PnD` means n days at 7200
/// blocks per day; anything else (including `timeDate`/`timeCycle` text
/// and missing payloads) falls back to 30 days.
pub fn timer_blocks(payload: Option<&str>) -> (u64, bool) {
    let Some(text) = payload else {
        return (FALLBACK_TIMER_BLOCKS, true);
    };
    let Some(caps) = DURATION_RE.captures(text.trim()) else {
        return (FALLBACK_TIMER_BLOCKS, true);
    };
    caps[1]
        .parse::<u64>()
        .ok()
        .and_then(|days| days.checked_mul(BLOCKS_PER_DAY))
        .map_or((FALLBACK_TIMER_BLOCKS, true), |blocks| (blocks, false))
}

/// Derive the full emission-ready model. Fails when a participant lacks a
/// well-formed address or two operations collide on a name.
pub fn build_compilation_unit(
    pg: &ProcessGraph,
    contract_name: &str,
    addresses: &[(String, String)],
) -> Result<CompilationUnit, CompileError> {
    names::validate_contract_name(contract_name)?;

    let mut warnings = Vec::new();

    let mut participants = Vec::new();
    for participant in &pg.participants {
        let address = addresses
            .iter()
            .find(|(name, _)| name == &participant.name)
            .map(|(_, addr)| addr.clone())
            .ok_or_else(|| CompileError::InvalidAddress(participant.name.clone()))?;
        names::validate_address(&participant.name, &address)?;
        participants.push((participant.name.clone(), address));
    }

    let process_to_participant = build_process_to_participant(pg, &mut warnings);

    let mut element_participant = BTreeMap::new();
    let mut dependencies = BTreeMap::new();
    let mut gateways = Vec::new();
    let mut timers = Vec::new();

    for idx in pg.graph.node_indices() {
        let node = &pg.graph[idx];
        let owner = participant_for_element(node, &process_to_participant, &mut warnings);
        element_participant.insert(node.id().to_string(), owner.clone());
        dependencies.insert(node.id().to_string(), dependencies_of(pg, node.id()));

        match node {
            FlowNode::Gateway { id, .. } => {
                let (yes_target, no_target) = branch_targets(pg, idx, &mut warnings);
                gateways.push(GatewayInfo {
                    id: id.clone(),
                    participant: owner,
                    dependencies: dependencies_of(pg, id),
                    yes_target,
                    no_target,
                });
            }
            FlowNode::Timer { id, payload, .. } => {
                let (duration_blocks, fell_back) = timer_blocks(payload.as_deref());
                if fell_back {
                    warnings.push(CompileWarning {
                        element_id: Some(id.clone()),
                        message: format!(
                            "timer duration '{}' is not of the form PnD; using the 30-day fallback ({} blocks)",
                            payload.as_deref().unwrap_or("<missing>"),
                            FALLBACK_TIMER_BLOCKS
                        ),
                    });
                }
                timers.push(TimerInfo {
                    id: id.clone(),
                    duration_blocks,
                });
            }
            _ => {}
        }
    }

    let op_names = names::plan_operation_names(pg)?;

    Ok(CompilationUnit {
        contract_name: contract_name.to_string(),
        participants,
        process_to_participant,
        element_participant,
        dependencies,
        gateways,
        timers,
        op_names,
        warnings,
    })
}

/// Resolve a gateway's yes/no branch targets from its outgoing sequence
/// flow labels, case-insensitively. Either branch may be absent.
fn branch_targets(
    pg: &ProcessGraph,
    idx: petgraph::graph::NodeIndex,
    warnings: &mut Vec<CompileWarning>,
) -> (Option<String>, Option<String>) {
    let mut yes = None;
    let mut no = None;
    for (target, edge) in pg.outgoing(idx) {
        if edge.kind != FlowKind::Sequence {
            continue;
        }
        let Some(label) = edge.name.as_deref() else {
            continue;
        };
        let slot = if label.eq_ignore_ascii_case("yes") {
            &mut yes
        } else if label.eq_ignore_ascii_case("no") {
            &mut no
        } else {
            continue;
        };
        if slot.is_some() {
            warnings.push(CompileWarning {
                element_id: Some(pg.graph[idx].id().to_string()),
                message: format!(
                    "gateway has more than one '{}' branch; keeping the first",
                    label
                ),
            });
            continue;
        }
        *slot = Some(pg.graph[target].id().to_string());
    }
    (yes, no)
}
