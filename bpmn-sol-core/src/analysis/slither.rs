use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::time::{Duration, Instant};

pub const DEFAULT_ANALYZER: &str = "slither";
pub const DEFAULT_REMAP: &str = "@openzeppelin=node_modules/@openzeppelin";

/// Hard ceiling on analyzer runtime; hitting it is recorded as a timeout,
/// never as a clean run.
pub const ANALYZER_TIMEOUT: Duration = Duration::from_secs(120);

/// Lines starting with one of these begin a new finding.
const FINDING_MARKERS: &[&str] = &["INFO:Detectors:", "INFO:Slither:", "WARNING:", "Warning:"];

/// How the analyzer child process is launched. `from_env` honors the
/// host-settable variables; tests construct configs directly.
#[derive(Clone, Debug)]
pub struct AnalyzerConfig {
    pub program: String,
    pub workdir: PathBuf,
    pub remap: String,
    pub timeout: Duration,
}

impl AnalyzerConfig {
    pub fn from_env() -> Self {
        Self {
            program: DEFAULT_ANALYZER.to_string(),
            workdir: std::env::var("ANALYZER_WORKDIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".")),
            remap: std::env::var("ANALYZER_REMAP").unwrap_or_else(|_| DEFAULT_REMAP.to_string()),
            timeout: ANALYZER_TIMEOUT,
        }
    }
}

/// Outcome of one analyzer invocation. Every failure mode lands in
/// `failure` instead of an error: analyzer trouble never fails the build.
#[derive(Debug, Default)]
pub struct AnalyzerRun {
    pub findings: Vec<String>,
    pub has_errors: bool,
    pub exit_code: Option<i32>,
    /// The equivalent shell command line, for the report.
    pub command: String,
    pub workdir: PathBuf,
    pub failure: Option<String>,
}

/// Run the analyzer over the emitted contract, echoing its merged output
/// and grouping it into findings.
pub fn run_analyzer(config: &AnalyzerConfig, contract_path: &Path) -> AnalyzerRun {
    let mut run = AnalyzerRun {
        command: format!(
            "{} {} --solc-remaps {}",
            config.program,
            contract_path.display(),
            config.remap
        ),
        workdir: config.workdir.clone(),
        ..Default::default()
    };

    if !run.workdir.is_dir() {
        run.failure = Some(format!(
            "analyzer working directory '{}' does not exist",
            run.workdir.display()
        ));
        tracing::warn!(failure = %run.failure.as_deref().unwrap_or(""), "skipping analyzer");
        return run;
    }

    let child = Command::new(&config.program)
        .arg(contract_path)
        .arg("--solc-remaps")
        .arg(&config.remap)
        .current_dir(&run.workdir)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn();

    let mut child = match child {
        Ok(child) => child,
        Err(e) => {
            run.failure = Some(format!("analyzer unavailable: {}", e));
            tracing::warn!(program = %config.program, error = %e, "could not spawn analyzer");
            return run;
        }
    };

    // Fan both pipes into one channel so stderr is merged into stdout.
    let (tx, rx) = mpsc::channel::<String>();
    let mut readers = Vec::new();
    if let Some(stdout) = child.stdout.take() {
        let tx = tx.clone();
        readers.push(std::thread::spawn(move || {
            for line in BufReader::new(stdout).lines().map_while(Result::ok) {
                if tx.send(line).is_err() {
                    break;
                }
            }
        }));
    }
    if let Some(stderr) = child.stderr.take() {
        let tx = tx.clone();
        readers.push(std::thread::spawn(move || {
            for line in BufReader::new(stderr).lines().map_while(Result::ok) {
                if tx.send(line).is_err() {
                    break;
                }
            }
        }));
    }
    drop(tx);

    let started = Instant::now();
    let mut lines = Vec::new();
    let mut timed_out = false;
    loop {
        match rx.recv_timeout(Duration::from_millis(200)) {
            Ok(line) => {
                println!("{}", line);
                lines.push(line);
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                if started.elapsed() > config.timeout {
                    let _ = child.kill();
                    timed_out = true;
                    break;
                }
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }
    for reader in readers {
        let _ = reader.join();
    }
    while let Ok(line) = rx.try_recv() {
        lines.push(line);
    }

    match child.wait() {
        Ok(status) => run.exit_code = status.code(),
        Err(e) => run.failure = Some(format!("failed to wait on analyzer: {}", e)),
    }

    let (findings, has_errors) = group_findings(&lines);
    run.findings = findings;
    run.has_errors = has_errors;

    if timed_out {
        run.failure = Some(format!(
            "analyzer timed out after {} s",
            config.timeout.as_secs()
        ));
        tracing::warn!("analyzer timed out");
    } else if run.exit_code.is_some_and(|c| c != 0) {
        tracing::warn!(exit_code = ?run.exit_code, "analyzer exited non-zero");
    }

    run
}

/// Group merged output lines into findings. A marker line opens a new
/// finding; `Error:`/`error:` lines become standalone findings and flip
/// the error flag; other lines attach to the open finding.
pub fn group_findings(lines: &[String]) -> (Vec<String>, bool) {
    let mut findings = Vec::new();
    let mut current: Option<String> = None;
    let mut has_errors = false;

    for line in lines {
        if line.contains("Error:") || line.contains("error:") {
            has_errors = true;
            if let Some(finding) = current.take() {
                findings.push(finding);
            }
            findings.push(line.clone());
            continue;
        }
        if FINDING_MARKERS.iter().any(|m| line.starts_with(m)) {
            if let Some(finding) = current.take() {
                findings.push(finding);
            }
            current = Some(line.clone());
        } else if let Some(finding) = current.as_mut() {
            finding.push('\n');
            finding.push_str(line);
        }
    }
    if let Some(finding) = current.take() {
        findings.push(finding);
    }

    (findings, has_errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn groups_detector_blocks() {
        let input = lines(&[
            "INFO:Detectors:",
            "Reentrancy in Contract.foo()",
            "  External calls:",
            "INFO:Detectors:",
            "Unused state variable",
        ]);
        let (findings, has_errors) = group_findings(&input);
        assert_eq!(findings.len(), 2);
        assert!(findings[0].contains("Reentrancy"));
        assert!(findings[1].contains("Unused state"));
        assert!(!has_errors);
    }

    #[test]
    fn error_lines_are_standalone_and_flip_the_flag() {
        let input = lines(&[
            "INFO:Detectors:",
            "Something benign",
            "Error: source file not found",
        ]);
        let (findings, has_errors) = group_findings(&input);
        assert!(has_errors);
        assert_eq!(findings.len(), 2);
        assert!(findings[1].starts_with("Error:"));
    }

    #[test]
    fn lines_before_any_marker_are_dropped() {
        let input = lines(&["'solc --version' running", "INFO:Slither:analyzed 1 contract"]);
        let (findings, _) = group_findings(&input);
        assert_eq!(findings.len(), 1);
    }

    #[test]
    fn missing_binary_is_a_recorded_failure() {
        let config = AnalyzerConfig {
            program: "definitely-not-a-real-analyzer-binary".to_string(),
            workdir: PathBuf::from("."),
            remap: DEFAULT_REMAP.to_string(),
            timeout: Duration::from_secs(5),
        };
        let run = run_analyzer(&config, Path::new("Missing.sol"));
        assert!(run.failure.is_some());
        assert!(run.findings.is_empty());
    }

    #[test]
    fn missing_workdir_is_a_recorded_failure() {
        let config = AnalyzerConfig {
            program: DEFAULT_ANALYZER.to_string(),
            workdir: PathBuf::from("/nonexistent/analyzer/workdir"),
            remap: DEFAULT_REMAP.to_string(),
            timeout: Duration::from_secs(5),
        };
        let run = run_analyzer(&config, Path::new("Missing.sol"));
        assert!(run
            .failure
            .as_deref()
            .is_some_and(|f| f.contains("does not exist")));
    }

    #[test]
    fn config_from_env_honors_overrides() {
        std::env::set_var("ANALYZER_WORKDIR", "/tmp");
        std::env::set_var("ANALYZER_REMAP", "@openzeppelin=vendor/oz");
        let config = AnalyzerConfig::from_env();
        assert_eq!(config.workdir, PathBuf::from("/tmp"));
        assert_eq!(config.remap, "@openzeppelin=vendor/oz");
        std::env::remove_var("ANALYZER_WORKDIR");
        std::env::remove_var("ANALYZER_REMAP");
    }

    #[test]
    fn harmless_program_reports_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let config = AnalyzerConfig {
            program: "true".to_string(),
            workdir: dir.path().to_path_buf(),
            remap: DEFAULT_REMAP.to_string(),
            timeout: Duration::from_secs(5),
        };
        let run = run_analyzer(&config, Path::new("Anything.sol"));
        assert_eq!(run.exit_code, Some(0));
        assert!(run.failure.is_none());
    }
}
