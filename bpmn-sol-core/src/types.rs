use serde::{Deserialize, Serialize};
use std::fmt::Write;
use thiserror::Error;

// ─── Block-time constants ─────────────────────────────────────

/// Blocks per day under the one-block ≈ 12-second assumption.
pub const BLOCKS_PER_DAY: u64 = 7200;

/// Deadline applied to timers whose payload is missing or not `PnD`.
pub const FALLBACK_TIMER_BLOCKS: u64 = 30 * BLOCKS_PER_DAY;

/// Participant name used when an element's enclosing process has no pool.
///
/// The emitted contract carries this literal as a mapping key with no
/// address behind it, so operations owned by it reject every caller.
pub const UNKNOWN_PARTICIPANT: &str = "UnknownParticipant";

// ─── Errors ───────────────────────────────────────────────────

/// Fatal compilation errors. Each variant carries the user-visible message.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("invalid contract name '{0}': expected [A-Za-z_][A-Za-z0-9_]*")]
    InvalidContractName(String),

    #[error("invalid address for participant '{0}': expected 0x followed by 40 hex digits")]
    InvalidAddress(String),

    #[error("model invalid: {0}")]
    ModelInvalid(String),

    #[error("operation name collision: '{0}' and '{1}' sanitize to the same identifier")]
    NameCollision(String, String),

    #[error("emission failed: {0}")]
    Emission(String),
}

/// Non-fatal diagnostics collected during compilation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CompileWarning {
    pub element_id: Option<String>,
    pub message: String,
}

impl std::fmt::Display for CompileWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(id) = &self.element_id {
            write!(f, "[{}] {}", id, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

// ─── Compile artifact ─────────────────────────────────────────

/// The output of the compiler pipeline: one self-contained Solidity source.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CompiledContract {
    pub contract_name: String,
    pub source: String,
    /// SHA-256 of `source`, used as the artifact version key.
    pub source_digest: [u8; 32],
    pub task_ops: usize,
    pub event_ops: usize,
    pub timer_ops: usize,
    pub gateway_count: usize,
    pub warnings: Vec<CompileWarning>,
}

impl CompiledContract {
    /// Lowercase hex form of the artifact digest.
    pub fn digest_hex(&self) -> String {
        self.source_digest.iter().fold(String::new(), |mut acc, b| {
            let _ = write!(acc, "{:02x}", b);
            acc
        })
    }
}
