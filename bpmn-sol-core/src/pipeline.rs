use crate::compiler::ir::{FlowNode, ProcessGraph};
use crate::compiler::{emit, indices, names, parser, verifier};
use crate::types::{CompileError, CompileWarning, CompiledContract};
use sha2::{Digest, Sha256};

/// User-supplied inputs gathered before compilation.
#[derive(Clone, Debug)]
pub struct CompileRequest {
    pub contract_name: String,
    /// `(display name, address)` per participant, document order.
    pub participant_addresses: Vec<(String, String)>,
}

/// Compile a parsed collaboration into a contract artifact.
///
/// Validation and model errors abort before anything is produced;
/// warnings ride along on the artifact.
pub fn compile(pg: &ProcessGraph, request: &CompileRequest) -> Result<CompiledContract, CompileError> {
    names::validate_contract_name(&request.contract_name)?;

    let errors = verifier::verify(pg);
    if !errors.is_empty() {
        let msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        return Err(CompileError::ModelInvalid(msgs.join("; ")));
    }

    let mut unit = indices::build_compilation_unit(
        pg,
        &request.contract_name,
        &request.participant_addresses,
    )?;

    for finding in verifier::structural_warnings(pg) {
        unit.warnings.push(CompileWarning {
            element_id: finding.element_id.clone(),
            message: finding.message,
        });
    }
    for warning in &unit.warnings {
        tracing::warn!(%warning, "compile warning");
    }
    if tracing::enabled!(tracing::Level::DEBUG) {
        if let Ok(dump) = serde_json::to_string(&unit) {
            tracing::debug!(unit = %dump, "derived compilation unit");
        }
    }

    let source = emit::emit_contract(pg, &unit)?;

    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    let source_digest: [u8; 32] = hasher.finalize().into();

    let count = |pred: fn(&FlowNode) -> bool| {
        pg.graph
            .node_indices()
            .filter(|&idx| pred(&pg.graph[idx]))
            .count()
    };

    let artifact = CompiledContract {
        contract_name: request.contract_name.clone(),
        source,
        source_digest,
        task_ops: count(|n| matches!(n, FlowNode::Task { .. })),
        event_ops: count(|n| matches!(n, FlowNode::CatchEvent { .. })),
        timer_ops: count(|n| matches!(n, FlowNode::Timer { .. })),
        gateway_count: count(|n| matches!(n, FlowNode::Gateway { .. })),
        warnings: unit.warnings,
    };

    tracing::info!(
        contract = %artifact.contract_name,
        digest = %artifact.digest_hex(),
        tasks = artifact.task_ops,
        timers = artifact.timer_ops,
        gateways = artifact.gateway_count,
        "emitted contract"
    );

    Ok(artifact)
}

/// Parse and compile in one step. XML and flow-resolution failures become
/// `ModelInvalid`.
pub fn compile_xml(xml: &str, request: &CompileRequest) -> Result<CompiledContract, CompileError> {
    let pg =
        parser::parse_diagram(xml).map_err(|e| CompileError::ModelInvalid(e.to_string()))?;
    compile(&pg, request)
}
