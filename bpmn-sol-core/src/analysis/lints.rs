use regex::Regex;
use std::sync::LazyLock;

static LOW_LEVEL_CALL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.(call|delegatecall|staticcall)\s*[({]").unwrap());

static PUBLIC_FN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"function\s+(\w+)\s*\([^)]*\)\s*(public|external)").unwrap());

static DEPRECATED_TRANSFER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.(transfer|send)\s*\(").unwrap());

static PUBLIC_PRIMITIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*(uint\d*|int\d*|address|bool|bytes\d+)\s+public\s+(\w+)\s*;").unwrap()
});

/// Guard modifiers that satisfy the unprotected-function check.
const GUARD_TOKENS: &[&str] = &["onlyOwner", "nonReentrant", "whenNotPaused", "whenPaused"];

/// How far past a function signature the guard check looks.
const GUARD_WINDOW: usize = 200;

/// Severity level for a lint diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LintLevel {
    Error,
    Warning,
    Info,
}

/// A single diagnostic produced by the post-generation lint pass.
#[derive(Debug, Clone)]
pub struct LintDiagnostic {
    /// Rule identifier: "S1", "S2", etc.
    pub rule: String,
    pub level: LintLevel,
    pub message: String,
    pub line: Option<usize>,
}

impl std::fmt::Display for LintDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let level = match self.level {
            LintLevel::Error => "ERROR",
            LintLevel::Warning => "WARN",
            LintLevel::Info => "INFO",
        };
        match self.line {
            Some(line) => write!(
                f,
                "[{}:{}] {} (line {})",
                self.rule, level, self.message, line
            ),
            None => write!(f, "[{}:{}] {}", self.rule, level, self.message),
        }
    }
}

/// Lint the emitted contract text.
///
/// ## Rules
///
/// - **S1 (Unchecked low-level call):** a `.call`/`.delegatecall`/
///   `.staticcall` whose subsequent line carries neither a `require` nor a
///   `success` check.
/// - **S2 (Unprotected public function):** a `public`/`external` function
///   with none of the guard modifiers within 200 characters of its
///   signature.
/// - **S3 (Deprecated transfer primitive):** `.transfer(...)` or
///   `.send(...)` on an address.
/// - **S4 (Public primitive state variable):** a `public` state variable
///   of primitive type.
pub fn lint_source(source: &str) -> Vec<LintDiagnostic> {
    let mut diags = Vec::new();
    lint_s1_unchecked_calls(source, &mut diags);
    lint_s2_unprotected_functions(source, &mut diags);
    lint_s3_deprecated_transfers(source, &mut diags);
    lint_s4_public_primitives(source, &mut diags);
    diags
}

fn lint_s1_unchecked_calls(source: &str, diags: &mut Vec<LintDiagnostic>) {
    let lines: Vec<&str> = source.lines().collect();
    for (i, line) in lines.iter().enumerate() {
        if !LOW_LEVEL_CALL_RE.is_match(line) {
            continue;
        }
        let next = lines.get(i + 1).copied().unwrap_or("");
        if next.contains("require") || next.contains("success") {
            continue;
        }
        diags.push(LintDiagnostic {
            rule: "S1".to_string(),
            level: LintLevel::Warning,
            message: "low-level call without a success check on the following line".to_string(),
            line: Some(i + 1),
        });
    }
}

fn lint_s2_unprotected_functions(source: &str, diags: &mut Vec<LintDiagnostic>) {
    for caps in PUBLIC_FN_RE.captures_iter(source) {
        let Some(m) = caps.get(0) else { continue };
        let window_end = (m.start() + GUARD_WINDOW).min(source.len());
        let window = &source[m.start()..window_end];
        if GUARD_TOKENS.iter().any(|t| window.contains(t)) {
            continue;
        }
        diags.push(LintDiagnostic {
            rule: "S2".to_string(),
            level: LintLevel::Warning,
            message: format!(
                "public function '{}' has no access, reentrancy, or pause modifier",
                &caps[1]
            ),
            line: Some(line_of(source, m.start())),
        });
    }
}

fn lint_s3_deprecated_transfers(source: &str, diags: &mut Vec<LintDiagnostic>) {
    for m in DEPRECATED_TRANSFER_RE.find_iter(source) {
        diags.push(LintDiagnostic {
            rule: "S3".to_string(),
            level: LintLevel::Warning,
            message: "deprecated balance-transfer primitive; forward gas explicitly instead"
                .to_string(),
            line: Some(line_of(source, m.start())),
        });
    }
}

fn lint_s4_public_primitives(source: &str, diags: &mut Vec<LintDiagnostic>) {
    for caps in PUBLIC_PRIMITIVE_RE.captures_iter(source) {
        let Some(m) = caps.get(0) else { continue };
        diags.push(LintDiagnostic {
            rule: "S4".to_string(),
            level: LintLevel::Info,
            message: format!("public state variable '{}' of primitive type", &caps[2]),
            line: Some(line_of(source, m.start())),
        });
    }
}

fn line_of(source: &str, offset: usize) -> usize {
    source[..offset].bytes().filter(|&b| b == b'\n').count() + 1
}
