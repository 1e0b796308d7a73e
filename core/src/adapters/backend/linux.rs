//! Linux port listing using ss.

use std::process::Stdio;

use regex::Regex;
use tokio::process::Command;

use crate::domain::PortRecord;
use crate::error::{Error, Result};

use super::utils::Utils;
use super::Platform;

/// Linux-specific backend.
pub struct LinuxPlatform;

impl LinuxPlatform {
    pub fn new() -> Self {
        Self
    }

    /// Parse `ss -Htlnp` output. One row may carry several owning processes.
    fn parse_ss_output(&self, output: &str) -> Result<Vec<PortRecord>> {
        let users = Regex::new(r#"\("(.+?)",pid=(\d+),fd=\d+\)"#)
            .map_err(|e| Error::ParseError(format!("Invalid ss pattern: {}", e)))?;

        let mut records = Vec::new();
        for line in output.lines() {
            let components: Vec<&str> = line.split_whitespace().collect();
            if components.len() < 6 {
                continue;
            }

            let Some(port) = Utils::parse_port(components[3]) else {
                continue;
            };

            let process_column = components[5..].join(" ");
            for caps in users.captures_iter(&process_column) {
                let Ok(pid) = caps[2].parse::<u32>() else {
                    continue;
                };
                records.push(PortRecord::new(port, pid, &caps[1]));
            }
        }

        Ok(records)
    }
}

impl Default for LinuxPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl Platform for LinuxPlatform {
    async fn list(&self) -> Result<Vec<PortRecord>> {
        let output = Command::new("ss")
            .args(["-Htlnp"])
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
            .await
            .map_err(|e| Error::CommandFailed(format!("Failed to run ss: {}", e)))?;

        let stdout = String::from_utf8(output.stdout)
            .map_err(|e| Error::ParseError(format!("Invalid UTF-8 in ss output: {}", e)))?;

        let mut records = self.parse_ss_output(&stdout)?;
        for record in &mut records {
            if let Ok(exe) = tokio::fs::read_link(format!("/proc/{}/exe", record.pid)).await {
                record.process_path = Some(exe.to_string_lossy().into_owned());
            }
        }
        Ok(records)
    }
}
