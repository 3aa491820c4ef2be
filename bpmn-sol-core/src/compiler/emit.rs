use super::indices::CompilationUnit;
use super::ir::{FlowNode, ProcessGraph};
use crate::types::{CompileError, UNKNOWN_PARTICIPANT};
use petgraph::graph::NodeIndex;
use std::fmt::Write;

/// Emit the complete contract source for a verified graph and its derived
/// model. Output is a deterministic function of the inputs; two runs over
/// the same diagram produce byte-identical text.
pub fn emit_contract(pg: &ProcessGraph, unit: &CompilationUnit) -> Result<String, CompileError> {
    render(pg, unit).map_err(|e| CompileError::Emission(e.to_string()))
}

fn render(pg: &ProcessGraph, unit: &CompilationUnit) -> Result<String, std::fmt::Error> {
    let mut out = String::new();

    header(&mut out, unit)?;
    storage(&mut out)?;
    constructor(&mut out, pg, unit)?;
    admin_operations(&mut out)?;
    audit_helper(&mut out)?;

    for idx in nodes_of(pg, |n| matches!(n, FlowNode::Start { .. })) {
        start_operation(&mut out, pg, unit, idx)?;
    }
    for idx in nodes_of(pg, |n| matches!(n, FlowNode::Task { .. })) {
        element_operation(&mut out, pg, unit, idx, OpFlavor::Task)?;
    }
    for idx in nodes_of(pg, |n| matches!(n, FlowNode::CatchEvent { .. })) {
        element_operation(&mut out, pg, unit, idx, OpFlavor::Event)?;
    }
    for idx in nodes_of(pg, |n| matches!(n, FlowNode::Timer { .. })) {
        timer_operation(&mut out, pg, unit, idx)?;
    }

    gateway_dispatch(&mut out)?;

    writeln!(out, "}}")?;
    Ok(out)
}

fn nodes_of(pg: &ProcessGraph, pred: impl Fn(&FlowNode) -> bool) -> Vec<NodeIndex> {
    pg.graph
        .node_indices()
        .filter(|&idx| pred(&pg.graph[idx]))
        .collect()
}

/// Escape an element id or participant name for use in a Solidity string
/// literal.
fn sol_str(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('"', "\\\"")
}

// ─── Header and storage layout ────────────────────────────────

fn header(out: &mut String, unit: &CompilationUnit) -> std::fmt::Result {
    writeln!(out, "// SPDX-License-Identifier: MIT")?;
    writeln!(out, "pragma solidity ^0.8.20;")?;
    writeln!(out)?;
    writeln!(
        out,
        "import \"@openzeppelin/contracts/utils/ReentrancyGuard.sol\";"
    )?;
    writeln!(out, "import \"@openzeppelin/contracts/access/Ownable.sol\";")?;
    writeln!(out, "import \"@openzeppelin/contracts/utils/Pausable.sol\";")?;
    writeln!(out)?;
    writeln!(out, "/// @title {}", unit.contract_name)?;
    writeln!(
        out,
        "/// @notice On-chain state machine compiled from a BPMN collaboration diagram."
    )?;
    writeln!(
        out,
        "/// @dev Every diagram element is a named node with a DISABLED/ENABLED/DONE"
    )?;
    writeln!(
        out,
        "/// lifecycle; exclusive gateways are resolved through gatewayAction."
    )?;
    writeln!(
        out,
        "contract {} is ReentrancyGuard, Ownable, Pausable {{",
        unit.contract_name
    )
}

fn storage(out: &mut String) -> std::fmt::Result {
    writeln!(out, "    enum ElementState {{ DISABLED, ENABLED, DONE }}")?;
    writeln!(out)?;
    writeln!(out, "    struct AuditEntry {{")?;
    writeln!(out, "        string elementId;")?;
    writeln!(out, "        address caller;")?;
    writeln!(out, "        uint256 timestamp;")?;
    writeln!(out, "    }}")?;
    writeln!(out)?;
    writeln!(out, "    struct GatewayData {{")?;
    writeln!(out, "        string participant;")?;
    writeln!(out, "        string[] dependencies;")?;
    writeln!(out, "        string yesTarget;")?;
    writeln!(out, "        string noTarget;")?;
    writeln!(out, "    }}")?;
    writeln!(out)?;
    writeln!(
        out,
        "    mapping(string => ElementState) public elementStates;"
    )?;
    writeln!(
        out,
        "    mapping(string => address) public participantAddresses;"
    )?;
    writeln!(out, "    mapping(string => uint256) public blockLimits;")?;
    writeln!(out, "    mapping(string => GatewayData) internal gateways;")?;
    writeln!(out)?;
    writeln!(out, "    AuditEntry[] public auditLog;")?;
    writeln!(out)?;
    writeln!(out, "    event TaskCompleted(string elementId);")?;
    writeln!(
        out,
        "    event TimerScheduled(string elementId, uint256 deadlineBlock);"
    )?;
    writeln!(out)
}

// ─── Constructor ──────────────────────────────────────────────

fn constructor(out: &mut String, pg: &ProcessGraph, unit: &CompilationUnit) -> std::fmt::Result {
    writeln!(out, "    constructor() Ownable(msg.sender) {{")?;

    for (name, address) in &unit.participants {
        writeln!(
            out,
            "        participantAddresses[\"{}\"] = {};",
            sol_str(name),
            address
        )?;
    }

    for idx in pg.graph.node_indices() {
        if let FlowNode::Start { id, .. } = &pg.graph[idx] {
            writeln!(
                out,
                "        elementStates[\"{}\"] = ElementState.ENABLED;",
                sol_str(id)
            )?;
        }
    }

    // Explicit DISABLED writes for every other non-timer element; storage
    // defaults would produce the same state but not the same audit trail.
    for idx in pg.graph.node_indices() {
        let node = &pg.graph[idx];
        if matches!(node, FlowNode::Start { .. } | FlowNode::Timer { .. }) {
            continue;
        }
        writeln!(
            out,
            "        elementStates[\"{}\"] = ElementState.DISABLED;",
            sol_str(node.id())
        )?;
    }

    for timer in &unit.timers {
        let id = sol_str(&timer.id);
        writeln!(
            out,
            "        blockLimits[\"{}\"] = block.number + {};",
            id, timer.duration_blocks
        )?;
        writeln!(
            out,
            "        elementStates[\"{}\"] = ElementState.ENABLED;",
            id
        )?;
        writeln!(
            out,
            "        emit TimerScheduled(\"{}\", block.number + {});",
            id, timer.duration_blocks
        )?;
    }

    for gateway in &unit.gateways {
        let id = sol_str(&gateway.id);
        writeln!(
            out,
            "        gateways[\"{}\"].participant = \"{}\";",
            id,
            sol_str(&gateway.participant)
        )?;
        for dep in &gateway.dependencies {
            writeln!(
                out,
                "        gateways[\"{}\"].dependencies.push(\"{}\");",
                id,
                sol_str(dep)
            )?;
        }
        writeln!(
            out,
            "        gateways[\"{}\"].yesTarget = \"{}\";",
            id,
            gateway.yes_target.as_deref().map(sol_str).unwrap_or_default()
        )?;
        writeln!(
            out,
            "        gateways[\"{}\"].noTarget = \"{}\";",
            id,
            gateway.no_target.as_deref().map(sol_str).unwrap_or_default()
        )?;
    }

    writeln!(out, "    }}")?;
    writeln!(out)
}

// ─── Administrative operations ────────────────────────────────

fn admin_operations(out: &mut String) -> std::fmt::Result {
    writeln!(
        out,
        "    function updateParticipantAddress(string memory participant, address newAddress) public onlyOwner {{"
    )?;
    writeln!(
        out,
        "        require(newAddress != address(0), \"Participant address cannot be zero\");"
    )?;
    writeln!(
        out,
        "        participantAddresses[participant] = newAddress;"
    )?;
    writeln!(out, "    }}")?;
    writeln!(out)?;
    writeln!(
        out,
        "    function updateBlockLimit(string memory elementId, uint256 newDeadline) public onlyOwner {{"
    )?;
    writeln!(out, "        blockLimits[elementId] = newDeadline;")?;
    writeln!(out, "    }}")?;
    writeln!(out)?;
    writeln!(out, "    function pause() public onlyOwner {{")?;
    writeln!(out, "        _pause();")?;
    writeln!(out, "    }}")?;
    writeln!(out)?;
    writeln!(out, "    function unpause() public onlyOwner {{")?;
    writeln!(out, "        _unpause();")?;
    writeln!(out, "    }}")?;
    writeln!(out)?;
    writeln!(
        out,
        "    function resetElementState(string memory elementId) public onlyOwner {{"
    )?;
    writeln!(
        out,
        "        elementStates[elementId] = ElementState.DISABLED;"
    )?;
    writeln!(out, "    }}")?;
    writeln!(out)
}

fn audit_helper(out: &mut String) -> std::fmt::Result {
    writeln!(out, "    function _recordAudit(string memory elementId) private {{")?;
    writeln!(out, "        auditLog.push(AuditEntry({{")?;
    writeln!(out, "            elementId: elementId,")?;
    writeln!(out, "            caller: msg.sender,")?;
    writeln!(out, "            timestamp: block.timestamp")?;
    writeln!(out, "        }}));")?;
    writeln!(out, "    }}")?;
    writeln!(out)
}

// ─── Element operations ───────────────────────────────────────

#[derive(Clone, Copy)]
enum OpFlavor {
    Task,
    Event,
}

impl OpFlavor {
    fn not_enabled(self) -> &'static str {
        match self {
            OpFlavor::Task => "Task not enabled",
            OpFlavor::Event => "Event not enabled",
        }
    }

    fn caller_verb(self) -> &'static str {
        match self {
            OpFlavor::Task => "perform this task",
            OpFlavor::Event => "trigger this event",
        }
    }
}

fn start_operation(
    out: &mut String,
    pg: &ProcessGraph,
    unit: &CompilationUnit,
    idx: NodeIndex,
) -> std::fmt::Result {
    let node = &pg.graph[idx];
    let id = sol_str(node.id());
    let op = &unit.op_names[node.id()];
    let owner = &unit.element_participant[node.id()];

    writeln!(
        out,
        "    function {}() public nonReentrant whenNotPaused {{",
        op
    )?;
    writeln!(
        out,
        "        require(elementStates[\"{}\"] == ElementState.ENABLED, \"Start event not enabled\");",
        id
    )?;
    caller_guard(out, owner, "start the process")?;
    writeln!(out, "        elementStates[\"{}\"] = ElementState.DONE;", id)?;
    writeln!(out, "        _recordAudit(\"{}\");", id)?;
    writeln!(out, "        emit TaskCompleted(\"{}\");", id)?;
    arm_successors(out, pg, unit, idx)?;
    writeln!(out, "    }}")?;
    writeln!(out)
}

fn element_operation(
    out: &mut String,
    pg: &ProcessGraph,
    unit: &CompilationUnit,
    idx: NodeIndex,
    flavor: OpFlavor,
) -> std::fmt::Result {
    let node = &pg.graph[idx];
    let id = sol_str(node.id());
    let op = &unit.op_names[node.id()];
    let owner = &unit.element_participant[node.id()];

    writeln!(
        out,
        "    function {}() public nonReentrant whenNotPaused {{",
        op
    )?;
    writeln!(
        out,
        "        require(elementStates[\"{}\"] == ElementState.ENABLED, \"{}\");",
        id,
        flavor.not_enabled()
    )?;
    caller_guard(out, owner, flavor.caller_verb())?;
    dependency_guard(out, &unit.dependencies[node.id()])?;
    writeln!(out, "        elementStates[\"{}\"] = ElementState.DONE;", id)?;
    writeln!(out, "        _recordAudit(\"{}\");", id)?;
    writeln!(out, "        emit TaskCompleted(\"{}\");", id)?;
    arm_successors(out, pg, unit, idx)?;
    writeln!(out, "    }}")?;
    writeln!(out)
}

fn timer_operation(
    out: &mut String,
    pg: &ProcessGraph,
    unit: &CompilationUnit,
    idx: NodeIndex,
) -> std::fmt::Result {
    let node = &pg.graph[idx];
    let id = sol_str(node.id());
    let op = &unit.op_names[node.id()];

    // Timers are facts of the chain: no caller restriction, only the
    // block-number deadline.
    writeln!(
        out,
        "    function {}() public nonReentrant whenNotPaused {{",
        op
    )?;
    writeln!(
        out,
        "        require(elementStates[\"{}\"] == ElementState.ENABLED, \"Timer not enabled\");",
        id
    )?;
    writeln!(
        out,
        "        require(block.number >= blockLimits[\"{}\"], \"Timer deadline not reached\");",
        id
    )?;
    writeln!(out, "        elementStates[\"{}\"] = ElementState.DONE;", id)?;
    writeln!(out, "        _recordAudit(\"{}\");", id)?;
    writeln!(out, "        emit TaskCompleted(\"{}\");", id)?;
    arm_successors(out, pg, unit, idx)?;
    writeln!(out, "    }}")?;
    writeln!(out)
}

/// Caller guard, omitted for elements owned by the sentinel participant.
fn caller_guard(out: &mut String, owner: &str, verb: &str) -> std::fmt::Result {
    if owner == UNKNOWN_PARTICIPANT {
        return Ok(());
    }
    writeln!(
        out,
        "        require(msg.sender == participantAddresses[\"{}\"], \"Only {} can {}\");",
        sol_str(owner),
        owner,
        verb
    )
}

/// Guard shape per dependency count: none / single equality / disjunction.
fn dependency_guard(out: &mut String, deps: &[String]) -> std::fmt::Result {
    match deps {
        [] => Ok(()),
        [only] => writeln!(
            out,
            "        require(elementStates[\"{}\"] == ElementState.DONE, \"Dependency not completed\");",
            sol_str(only)
        ),
        many => {
            let clauses: Vec<String> = many
                .iter()
                .map(|d| format!("elementStates[\"{}\"] == ElementState.DONE", sol_str(d)))
                .collect();
            writeln!(out, "        require(")?;
            writeln!(out, "            {},", clauses.join(" || "))?;
            writeln!(
                out,
                "            \"At least one dependency must be completed\""
            )?;
            writeln!(out, "        );")
        }
    }
}

/// Enable every sequence- and message-flow successor; timer successors also
/// get a fresh deadline.
fn arm_successors(
    out: &mut String,
    pg: &ProcessGraph,
    unit: &CompilationUnit,
    idx: NodeIndex,
) -> std::fmt::Result {
    for (target, _) in pg.outgoing(idx) {
        let node = &pg.graph[target];
        let id = sol_str(node.id());
        if node.is_timer() {
            let blocks = unit.duration_of(node.id());
            writeln!(
                out,
                "        blockLimits[\"{}\"] = block.number + {};",
                id, blocks
            )?;
            writeln!(
                out,
                "        elementStates[\"{}\"] = ElementState.ENABLED;",
                id
            )?;
            writeln!(
                out,
                "        emit TimerScheduled(\"{}\", block.number + {});",
                id, blocks
            )?;
        } else {
            writeln!(
                out,
                "        elementStates[\"{}\"] = ElementState.ENABLED;",
                id
            )?;
        }
    }
    Ok(())
}

// ─── Gateway dispatch ─────────────────────────────────────────

/// One data-driven operation covers every exclusive gateway.
fn gateway_dispatch(out: &mut String) -> std::fmt::Result {
    writeln!(
        out,
        "    function gatewayAction(string memory gatewayId, bool condition) public nonReentrant whenNotPaused {{"
    )?;
    writeln!(
        out,
        "        require(elementStates[gatewayId] == ElementState.ENABLED, \"Gateway not enabled\");"
    )?;
    writeln!(out, "        GatewayData storage gateway = gateways[gatewayId];")?;
    writeln!(out, "        require(")?;
    writeln!(
        out,
        "            msg.sender == participantAddresses[gateway.participant],"
    )?;
    writeln!(
        out,
        "            \"Only the owning participant can resolve this gateway\""
    )?;
    writeln!(out, "        );")?;
    writeln!(
        out,
        "        for (uint256 i = 0; i < gateway.dependencies.length; i++) {{"
    )?;
    writeln!(out, "            require(")?;
    writeln!(
        out,
        "                elementStates[gateway.dependencies[i]] == ElementState.DONE,"
    )?;
    writeln!(
        out,
        "                \"All gateway dependencies must be completed\""
    )?;
    writeln!(out, "            );")?;
    writeln!(out, "        }}")?;
    writeln!(out, "        elementStates[gatewayId] = ElementState.DONE;")?;
    writeln!(out, "        _recordAudit(gatewayId);")?;
    writeln!(out, "        emit TaskCompleted(gatewayId);")?;
    writeln!(
        out,
        "        if (condition && bytes(gateway.yesTarget).length != 0) {{"
    )?;
    writeln!(
        out,
        "            elementStates[gateway.yesTarget] = ElementState.ENABLED;"
    )?;
    writeln!(
        out,
        "        }} else if (!condition && bytes(gateway.noTarget).length != 0) {{"
    )?;
    writeln!(
        out,
        "            elementStates[gateway.noTarget] = ElementState.ENABLED;"
    )?;
    writeln!(out, "        }}")?;
    writeln!(out, "    }}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::indices::build_compilation_unit;
    use crate::compiler::ir::{FlowEdge, FlowKind, Participant};

    const ADDR_1: &str = "0x5B38Da6a701c568545dCfcB03FcB875f56beddC4";
    const ADDR_2: &str = "0xAb8483F64d9C6d1EcF9b849Ae677dD3315835cb2";

    fn seq(id: &str, name: Option<&str>) -> FlowEdge {
        FlowEdge {
            id: id.to_string(),
            kind: FlowKind::Sequence,
            name: name.map(str::to_string),
        }
    }

    /// Start → task A → gateway G (yes → B, no → C), one pool "P1".
    fn sign_off_graph() -> ProcessGraph {
        let mut pg = ProcessGraph::default();
        pg.participants.push(Participant {
            id: "pool1".to_string(),
            name: "P1".to_string(),
            process_ref: Some("proc".to_string()),
        });
        pg.processes.push("proc".to_string());

        let mk = |id: &str, name: &str| (id.to_string(), Some(name.to_string()));

        let (id, name) = mk("Start_1", "Start Event");
        let s = pg.graph.add_node(FlowNode::Start {
            id,
            name,
            process_id: "proc".to_string(),
        });
        let (id, name) = mk("A", "A");
        let a = pg.graph.add_node(FlowNode::Task {
            id,
            name,
            process_id: "proc".to_string(),
        });
        let g = pg.graph.add_node(FlowNode::Gateway {
            id: "G".to_string(),
            name: None,
            process_id: "proc".to_string(),
        });
        let (id, name) = mk("B", "B");
        let b = pg.graph.add_node(FlowNode::Task {
            id,
            name,
            process_id: "proc".to_string(),
        });
        let (id, name) = mk("C", "C");
        let c = pg.graph.add_node(FlowNode::Task {
            id,
            name,
            process_id: "proc".to_string(),
        });
        let e = pg.graph.add_node(FlowNode::End {
            id: "End_1".to_string(),
            name: None,
            process_id: "proc".to_string(),
        });

        pg.graph.add_edge(s, a, seq("f1", None));
        pg.graph.add_edge(a, g, seq("f2", None));
        pg.graph.add_edge(g, b, seq("f3", Some("Yes")));
        pg.graph.add_edge(g, c, seq("f4", Some("No")));
        pg.graph.add_edge(b, e, seq("f5", None));
        pg.graph.add_edge(c, e, seq("f6", None));
        pg
    }

    fn compile_sign_off() -> String {
        let pg = sign_off_graph();
        let unit = build_compilation_unit(
            &pg,
            "SignOff",
            &[("P1".to_string(), ADDR_1.to_string())],
        )
        .unwrap();
        emit_contract(&pg, &unit).unwrap()
    }

    #[test]
    fn emits_header_and_bases() {
        let src = compile_sign_off();
        assert!(src.starts_with("// SPDX-License-Identifier: MIT"));
        assert!(src.contains("pragma solidity ^0.8.20;"));
        assert!(src.contains("contract SignOff is ReentrancyGuard, Ownable, Pausable {"));
        assert!(src.contains("import \"@openzeppelin/contracts/access/Ownable.sol\";"));
    }

    #[test]
    fn constructor_wires_participants_and_states() {
        let src = compile_sign_off();
        assert!(src.contains(&format!("participantAddresses[\"P1\"] = {};", ADDR_1)));
        assert!(src.contains("elementStates[\"Start_1\"] = ElementState.ENABLED;"));
        assert!(src.contains("elementStates[\"G\"] = ElementState.DISABLED;"));
        assert!(src.contains("elementStates[\"End_1\"] = ElementState.DISABLED;"));
    }

    #[test]
    fn constructor_writes_gateway_record() {
        let src = compile_sign_off();
        assert!(src.contains("gateways[\"G\"].participant = \"P1\";"));
        assert!(src.contains("gateways[\"G\"].dependencies.push(\"A\");"));
        assert!(src.contains("gateways[\"G\"].yesTarget = \"B\";"));
        assert!(src.contains("gateways[\"G\"].noTarget = \"C\";"));
    }

    #[test]
    fn one_operation_per_node_and_one_dispatch() {
        let src = compile_sign_off();
        for op in ["function startEvent()", "function a()", "function b()", "function c()"] {
            assert_eq!(src.matches(op).count(), 1, "missing {}", op);
        }
        assert_eq!(src.matches("function gatewayAction(").count(), 1);
        // Gateways never get a per-element operation.
        assert!(!src.contains("function g()"));
    }

    #[test]
    fn task_guards_are_complete() {
        let src = compile_sign_off();
        assert!(src.contains(
            "require(elementStates[\"A\"] == ElementState.ENABLED, \"Task not enabled\");"
        ));
        assert!(src.contains(
            "require(msg.sender == participantAddresses[\"P1\"], \"Only P1 can perform this task\");"
        ));
        assert!(src.contains(
            "require(elementStates[\"Start_1\"] == ElementState.DONE, \"Dependency not completed\");"
        ));
    }

    #[test]
    fn disjunctive_merge_guard() {
        let mut pg = sign_off_graph();
        let m = pg.graph.add_node(FlowNode::Task {
            id: "M".to_string(),
            name: Some("M".to_string()),
            process_id: "proc".to_string(),
        });
        let b = pg.find_node_by_id("B").unwrap();
        let c = pg.find_node_by_id("C").unwrap();
        pg.graph.add_edge(b, m, seq("f7", None));
        pg.graph.add_edge(c, m, seq("f8", None));

        let unit = build_compilation_unit(
            &pg,
            "SignOff",
            &[("P1".to_string(), ADDR_1.to_string())],
        )
        .unwrap();
        let src = emit_contract(&pg, &unit).unwrap();
        assert!(src.contains(
            "elementStates[\"B\"] == ElementState.DONE || elementStates[\"C\"] == ElementState.DONE"
        ));
        assert!(src.contains("\"At least one dependency must be completed\""));
    }

    #[test]
    fn timer_successor_is_rearmed_with_deadline() {
        let mut pg = ProcessGraph::default();
        pg.participants.push(Participant {
            id: "pool".to_string(),
            name: "P1".to_string(),
            process_ref: Some("proc".to_string()),
        });
        let s = pg.graph.add_node(FlowNode::Start {
            id: "S".to_string(),
            name: Some("Start Event".to_string()),
            process_id: "proc".to_string(),
        });
        let t = pg.graph.add_node(FlowNode::Timer {
            id: "T".to_string(),
            name: Some("T".to_string()),
            process_id: "proc".to_string(),
            payload: Some("P5D".to_string()),
        });
        let e = pg.graph.add_node(FlowNode::End {
            id: "E".to_string(),
            name: None,
            process_id: "proc".to_string(),
        });
        pg.graph.add_edge(s, t, seq("f1", None));
        pg.graph.add_edge(t, e, seq("f2", None));

        let unit = build_compilation_unit(
            &pg,
            "Timed",
            &[("P1".to_string(), ADDR_2.to_string())],
        )
        .unwrap();
        let src = emit_contract(&pg, &unit).unwrap();

        // Armed once at deployment and once when the start event fires.
        assert_eq!(
            src.matches("blockLimits[\"T\"] = block.number + 36000;").count(),
            2
        );
        assert_eq!(
            src.matches("emit TimerScheduled(\"T\", block.number + 36000);").count(),
            2
        );
        assert!(src.contains("function triggerT() public nonReentrant whenNotPaused {"));
        assert!(src.contains(
            "require(block.number >= blockLimits[\"T\"], \"Timer deadline not reached\");"
        ));
        // No caller guard inside the timer operation.
        let trigger_body = &src[src.find("function triggerT").unwrap()..];
        let trigger_body = &trigger_body[..trigger_body.find("\n    }").unwrap()];
        assert!(!trigger_body.contains("msg.sender"));
    }

    #[test]
    fn unknown_participant_omits_caller_guard() {
        let mut pg = ProcessGraph::default();
        pg.graph.add_node(FlowNode::Task {
            id: "T1".to_string(),
            name: Some("Lone Task".to_string()),
            process_id: "nowhere".to_string(),
        });
        let unit = build_compilation_unit(&pg, "Orphan", &[]).unwrap();
        let src = emit_contract(&pg, &unit).unwrap();
        let body = &src[src.find("function loneTask").unwrap()..];
        let body = &body[..body.find("\n    }").unwrap()];
        assert!(!body.contains("msg.sender == participantAddresses"));
    }

    #[test]
    fn admin_operations_are_owner_gated() {
        let src = compile_sign_off();
        for sig in [
            "function updateParticipantAddress(string memory participant, address newAddress) public onlyOwner {",
            "function updateBlockLimit(string memory elementId, uint256 newDeadline) public onlyOwner {",
            "function pause() public onlyOwner {",
            "function unpause() public onlyOwner {",
            "function resetElementState(string memory elementId) public onlyOwner {",
        ] {
            assert!(src.contains(sig), "missing admin operation: {}", sig);
        }
        assert!(src.contains("require(newAddress != address(0), \"Participant address cannot be zero\");"));
    }

    #[test]
    fn output_is_byte_stable() {
        assert_eq!(compile_sign_off(), compile_sign_off());
    }
}
