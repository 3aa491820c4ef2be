use super::ir::{FlowNode, ProcessGraph};
use crate::types::CompileError;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

static CONTRACT_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

static ADDRESS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^0x[0-9a-fA-F]{40}$").unwrap());

/// Operation names the contract template always emits. A diagram element
/// whose sanitized name lands on one of these is a collision.
pub const RESERVED_OPERATION_NAMES: &[&str] = &[
    "gatewayAction",
    "pause",
    "unpause",
    "updateParticipantAddress",
    "resetElementState",
    "updateBlockLimit",
];

/// Check the target contract name against the identifier grammar.
pub fn validate_contract_name(name: &str) -> Result<(), CompileError> {
    if CONTRACT_NAME_RE.is_match(name) {
        Ok(())
    } else {
        Err(CompileError::InvalidContractName(name.to_string()))
    }
}

/// Check a participant address literal: `0x` followed by 40 hex digits.
pub fn validate_address(participant: &str, address: &str) -> Result<(), CompileError> {
    if ADDRESS_RE.is_match(address) {
        Ok(())
    } else {
        Err(CompileError::InvalidAddress(participant.to_string()))
    }
}

/// Turn a BPMN element label into a Solidity operation identifier.
///
/// Non-alphanumeric characters become token boundaries; the first token
/// keeps its spelling with the leading character lowercased, subsequent
/// tokens are capitalized. A leading digit gets an `f` prefix. The result
/// is a fixed point: `sanitize(sanitize(x)) == sanitize(x)`.
pub fn sanitize(raw: &str) -> String {
    let spaced: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { ' ' })
        .collect();
    let mut tokens = spaced.split_whitespace();

    let mut out = String::new();
    match tokens.next() {
        None => return "unnamedTask".to_string(),
        Some(first) => {
            let mut chars = first.chars();
            if let Some(c) = chars.next() {
                out.extend(c.to_lowercase());
                out.push_str(chars.as_str());
            }
        }
    }
    for token in tokens {
        let mut chars = token.chars();
        if let Some(c) = chars.next() {
            out.extend(c.to_uppercase());
            out.push_str(&chars.as_str().to_lowercase());
        }
    }

    if out.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        out.insert(0, 'f');
    }
    out
}

/// Uppercase the first character, used for `trigger<Name>` timer operations.
pub fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        None => String::new(),
        Some(c) => c.to_uppercase().chain(chars).collect(),
    }
}

/// Assign one operation name to every start event, task, intermediate
/// catch event, and timer. Fails with `NameCollision` when two elements
/// (or an element and a fixed template operation) land on the same
/// identifier.
pub fn plan_operation_names(pg: &ProcessGraph) -> Result<BTreeMap<String, String>, CompileError> {
    let mut used: HashMap<String, String> = RESERVED_OPERATION_NAMES
        .iter()
        .map(|&n| (n.to_string(), n.to_string()))
        .collect();
    let mut plan = BTreeMap::new();

    for idx in pg.graph.node_indices() {
        let node = &pg.graph[idx];
        let op = match node {
            FlowNode::Start { .. } | FlowNode::Task { .. } | FlowNode::CatchEvent { .. } => {
                sanitize(node.label())
            }
            FlowNode::Timer { .. } => format!("trigger{}", capitalize(&sanitize(node.label()))),
            FlowNode::End { .. } | FlowNode::Gateway { .. } => continue,
        };

        if let Some(previous) = used.insert(op.clone(), node.label().to_string()) {
            return Err(CompileError::NameCollision(
                previous,
                node.label().to_string(),
            ));
        }
        plan.insert(node.id().to_string(), op);
    }

    Ok(plan)
}
