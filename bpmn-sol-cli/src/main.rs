use anyhow::{bail, Context, Result};
use bpmn_sol_core::analysis;
use bpmn_sol_core::compiler::{names, parser};
use bpmn_sol_core::pipeline::{self, CompileRequest};
use std::io::{self, BufRead, Write};
use std::path::Path;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let stdin = io::stdin();
    let mut input = stdin.lock();

    let diagram_path = prompt(&mut input, "Path to BPMN diagram: ")?;
    let xml = std::fs::read_to_string(&diagram_path)
        .with_context(|| format!("cannot read diagram '{}'", diagram_path))?;

    let contract_name = prompt(&mut input, "Contract name: ")?;
    names::validate_contract_name(&contract_name)?;

    let graph = parser::parse_diagram(&xml)
        .with_context(|| format!("'{}' is not a usable BPMN diagram", diagram_path))?;

    let mut participant_addresses = Vec::new();
    for participant in &graph.participants {
        let address = prompt(
            &mut input,
            &format!("Address for participant '{}': ", participant.name),
        )?;
        names::validate_address(&participant.name, &address)?;
        participant_addresses.push((participant.name.clone(), address));
    }

    let artifact = pipeline::compile(
        &graph,
        &CompileRequest {
            contract_name,
            participant_addresses,
        },
    )?;

    let out_path = format!("{}.sol", artifact.contract_name);
    std::fs::write(&out_path, &artifact.source)
        .with_context(|| format!("cannot write '{}'", out_path))?;

    println!();
    println!(
        "Wrote {} ({} bytes, sha256 {})",
        out_path,
        artifact.source.len(),
        artifact.digest_hex()
    );
    println!(
        "Operations: {} task(s), {} event(s), {} timer(s); {} gateway(s) behind gatewayAction",
        artifact.task_ops, artifact.event_ops, artifact.timer_ops, artifact.gateway_count
    );
    for warning in &artifact.warnings {
        println!("warning: {}", warning);
    }
    println!();

    // Analyzer trouble is reported, never fatal.
    let result = analysis::analyze_contract(Path::new(&out_path));
    match analysis::report::write_report(
        Path::new("."),
        &artifact.contract_name,
        &artifact.digest_hex(),
        &result,
    ) {
        Ok(report_path) => println!("Security report: {}", report_path.display()),
        Err(e) => tracing::warn!(error = %e, "could not write security report"),
    }

    Ok(())
}

fn prompt(input: &mut impl BufRead, message: &str) -> Result<String> {
    print!("{}", message);
    io::stdout().flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        bail!("unexpected end of input");
    }
    Ok(line.trim().to_string())
}
