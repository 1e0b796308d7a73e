//! Kill command - terminate a process by PID after confirmation.

use std::io::{self, BufRead, Write};

use anyhow::Result;
use portpilot_core::domain::parse_pid;
use portpilot_core::{PortBackend, PortPilotEngine, SettingsRepository};
use serde_json::json;
use tracing::warn;

pub async fn run<B: PortBackend + 'static, R: SettingsRepository>(
    engine: &PortPilotEngine<B, R>,
    pid: &str,
    yes: bool,
    json: bool,
) -> Result<()> {
    let pid = parse_pid(pid)?;

    // Only needed for the process name in the prompt
    if let Err(e) = engine.refresh().await {
        warn!(error = %e, "could not list ports before kill");
    }

    let intent = engine.request_kill(pid);
    let ports: Vec<u16> = engine
        .registry()
        .find_by_pid(pid)
        .iter()
        .map(|r| r.port)
        .collect();

    if !yes {
        let prompt = if ports.is_empty() {
            format!("Kill {} (PID {})? [y/N] ", intent.display_name, pid)
        } else {
            format!(
                "Kill {} (PID {}) listening on {}? [y/N] ",
                intent.display_name,
                pid,
                join_ports(&ports)
            )
        };
        if !confirm(&prompt, io::stdin().lock())? {
            engine.cancel_kill();
            println!("Cancelled.");
            return Ok(());
        }
    }

    if let Err(e) = engine.confirm_kill().await {
        anyhow::bail!(engine.error().unwrap_or_else(|| e.to_string()));
    }

    if json {
        let output = json!({
            "pid": pid,
            "process_name": intent.display_name,
            "ports": ports,
            "remaining": engine.snapshot().len(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("Killed {} (PID {})", intent.display_name, pid);
    println!("{}", engine.metrics().summary());
    Ok(())
}

fn join_ports(ports: &[u16]) -> String {
    ports
        .iter()
        .map(|p| format!(":{}", p))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Print `prompt` and read one answer line from `input`.
fn confirm(prompt: &str, mut input: impl BufRead) -> Result<bool> {
    print!("{}", prompt);
    io::stdout().flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}
