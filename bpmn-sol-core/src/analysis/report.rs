use super::SecurityAnalysisResult;
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::fmt::Write;
use std::path::{Path, PathBuf};

const DEPLOYMENT_RECOMMENDATIONS: &[&str] = &[
    "Verify every participant address before deployment; the owner can rotate a key later with updateParticipantAddress.",
    "Record the artifact digest above and compare it against the source submitted for on-chain verification.",
    "Pause the contract with pause() before rotating participant addresses on a live process.",
    "Timer deadlines assume one block every ~12 seconds; re-derive durations if the target chain runs a different cadence.",
    "Deploy from a dedicated owner key; resetElementState and the pause switch are owner-only escape hatches.",
];

const WORKFLOW_NOTES: &[&str] = &[
    "Every element operation checks its ENABLED state and (except timers) the owning participant's address.",
    "Tasks with several incoming flows complete when at least one dependency is DONE; model AND-joins as converging gateways.",
    "Timer operations may be called by anyone once the deadline block has passed; the deadline is set at deployment and refreshed when the predecessor completes.",
    "Exclusive gateways are resolved off-chain and submitted through gatewayAction(gatewayId, condition).",
    "Cycles in the diagram re-enable DONE elements by design; the audit log keeps the full firing history.",
];

/// Write `SecurityReport_<unixMillis>.txt` into `dir` and return its path.
pub fn write_report(
    dir: &Path,
    contract_name: &str,
    digest_hex: &str,
    analysis: &SecurityAnalysisResult,
) -> Result<PathBuf> {
    let now = Utc::now();
    let path = dir.join(format!("SecurityReport_{}.txt", now.timestamp_millis()));
    let body = render_report(contract_name, digest_hex, analysis, now)?;
    std::fs::write(&path, body)?;
    tracing::info!(report = %path.display(), "wrote security report");
    Ok(path)
}

/// Render the report body. Pure, so the layout is testable without
/// touching the filesystem.
pub fn render_report(
    contract_name: &str,
    digest_hex: &str,
    analysis: &SecurityAnalysisResult,
    generated_at: DateTime<Utc>,
) -> Result<String> {
    let mut out = String::new();

    writeln!(out, "============================================================")?;
    writeln!(out, " Security Analysis Report - {}", contract_name)?;
    writeln!(out, " Generated: {}", generated_at.to_rfc3339())?;
    writeln!(out, " Artifact SHA-256: {}", digest_hex)?;
    writeln!(out, "============================================================")?;
    writeln!(out)?;

    writeln!(out, "--- Static Analyzer Results ---")?;
    writeln!(out, "Command: {}", analysis.analyzer.command)?;
    writeln!(out, "Working directory: {}", analysis.analyzer.workdir.display())?;
    match analysis.analyzer.exit_code {
        Some(code) => writeln!(out, "Exit code: {}", code)?,
        None => writeln!(out, "Exit code: not available")?,
    }
    if let Some(failure) = &analysis.analyzer.failure {
        writeln!(out, "Analyzer did not complete: {}", failure)?;
    } else if analysis.analyzer.findings.is_empty() {
        writeln!(out, "No analyzer findings.")?;
    } else {
        writeln!(out, "Findings ({}):", analysis.analyzer.findings.len())?;
        for (i, finding) in analysis.analyzer.findings.iter().enumerate() {
            writeln!(out)?;
            writeln!(out, "[{}] {}", i + 1, finding)?;
        }
    }
    if analysis.has_errors {
        writeln!(out)?;
        writeln!(out, "Analyzer reported errors; treat this artifact as unverified.")?;
    }
    writeln!(out)?;

    writeln!(out, "--- Custom Lint Findings ---")?;
    if analysis.custom_findings.is_empty() {
        writeln!(out, "No custom lint findings.")?;
    } else {
        for diag in &analysis.custom_findings {
            writeln!(out, "{}", diag)?;
        }
    }
    writeln!(out)?;

    writeln!(out, "--- Deployment Recommendations ---")?;
    for line in DEPLOYMENT_RECOMMENDATIONS {
        writeln!(out, "- {}", line)?;
    }
    writeln!(out)?;

    writeln!(out, "--- BPMN Workflow Notes ---")?;
    for line in WORKFLOW_NOTES {
        writeln!(out, "- {}", line)?;
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::lints::{LintDiagnostic, LintLevel};
    use crate::analysis::slither::AnalyzerRun;

    fn sample_analysis() -> SecurityAnalysisResult {
        SecurityAnalysisResult {
            analyzer: AnalyzerRun {
                findings: vec!["INFO:Detectors:\nReentrancy in X".to_string()],
                has_errors: false,
                exit_code: Some(0),
                command: "slither Example.sol --solc-remaps @openzeppelin=node_modules/@openzeppelin".to_string(),
                workdir: ".".into(),
                failure: None,
            },
            custom_findings: vec![LintDiagnostic {
                rule: "S2".to_string(),
                level: LintLevel::Warning,
                message: "public function 'naked' has no access, reentrancy, or pause modifier"
                    .to_string(),
                line: Some(12),
            }],
            has_errors: false,
        }
    }

    #[test]
    fn report_has_all_four_sections() {
        let body = render_report("Example", "ab".repeat(32).as_str(), &sample_analysis(), Utc::now())
            .unwrap();
        for section in [
            "--- Static Analyzer Results ---",
            "--- Custom Lint Findings ---",
            "--- Deployment Recommendations ---",
            "--- BPMN Workflow Notes ---",
        ] {
            assert!(body.contains(section), "missing section {}", section);
        }
        assert!(body.contains("Exit code: 0"));
        assert!(body.contains("[S2:WARN]"));
        assert!(body.contains("Artifact SHA-256: abab"));
    }

    #[test]
    fn failure_text_replaces_findings() {
        let mut analysis = sample_analysis();
        analysis.analyzer.failure = Some("analyzer unavailable: No such file".to_string());
        let body = render_report("Example", "00", &analysis, Utc::now()).unwrap();
        assert!(body.contains("Analyzer did not complete: analyzer unavailable"));
    }

    #[test]
    fn report_file_lands_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_report(dir.path(), "Example", "00", &sample_analysis()).unwrap();
        assert!(path.file_name().unwrap().to_string_lossy().starts_with("SecurityReport_"));
        let body = std::fs::read_to_string(&path).unwrap();
        assert!(body.contains("Security Analysis Report - Example"));
    }
}
