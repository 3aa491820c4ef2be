//! Post-generation analysis: the external analyzer driver, the regex lint
//! pass over the emitted text, and the consolidated report.

pub mod lints;
pub mod report;
pub mod slither;

use lints::{LintDiagnostic, LintLevel};
use slither::{AnalyzerConfig, AnalyzerRun};
use std::path::Path;

/// Consolidated result of both analysis passes.
#[derive(Debug)]
pub struct SecurityAnalysisResult {
    pub analyzer: AnalyzerRun,
    pub custom_findings: Vec<LintDiagnostic>,
    pub has_errors: bool,
}

/// Run the external analyzer and the lint pass over a written contract
/// file. Nothing here fails the compilation: every problem is folded into
/// the returned result.
pub fn analyze_contract(contract_path: &Path) -> SecurityAnalysisResult {
    let config = AnalyzerConfig::from_env();
    analyze_contract_with(&config, contract_path)
}

/// Same as [`analyze_contract`] with an explicit analyzer configuration.
pub fn analyze_contract_with(
    config: &AnalyzerConfig,
    contract_path: &Path,
) -> SecurityAnalysisResult {
    let analyzer = slither::run_analyzer(config, contract_path);

    let custom_findings = match std::fs::read_to_string(contract_path) {
        Ok(source) => lints::lint_source(&source),
        Err(e) => {
            tracing::warn!(error = %e, "could not read emitted contract for lint checks");
            vec![LintDiagnostic {
                rule: "IO".to_string(),
                level: LintLevel::Error,
                message: format!("could not read '{}': {}", contract_path.display(), e),
                line: None,
            }]
        }
    };

    let has_errors = analyzer.has_errors;
    SecurityAnalysisResult {
        analyzer,
        custom_findings,
        has_errors,
    }
}
