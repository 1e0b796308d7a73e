//! macOS port listing using lsof and ps.

use std::collections::HashMap;
use std::process::Stdio;

use tokio::process::Command;

use crate::domain::PortRecord;
use crate::error::{Error, Result};

use super::utils::Utils;
use super::Platform;

/// macOS-specific backend using lsof.
pub struct DarwinPlatform;

impl DarwinPlatform {
    /// Create a new macOS backend.
    pub fn new() -> Self {
        Self
    }

    /// Executable path for every process, keyed by pid.
    async fn get_process_paths(&self) -> HashMap<u32, String> {
        let output = match Command::new("/bin/ps")
            .args(["-axo", "pid=,comm="])
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
            .await
        {
            Ok(output) => output,
            Err(_) => return HashMap::new(),
        };

        let stdout = match String::from_utf8(output.stdout) {
            Ok(s) => s,
            Err(_) => return HashMap::new(),
        };

        stdout
            .lines()
            .filter_map(|line| {
                let mut parts = line.trim().splitn(2, char::is_whitespace);
                let pid = parts.next()?.trim().parse::<u32>().ok()?;
                let path = parts.next()?.trim();
                (!path.is_empty()).then(|| (pid, path.to_string()))
            })
            .collect()
    }

    /// Parse lsof output into records.
    fn parse_lsof_output(&self, output: &str, paths: &HashMap<u32, String>) -> Vec<PortRecord> {
        let mut records = Vec::new();

        for line in output.lines().skip(1) {
            let components: Vec<&str> = line.split_whitespace().collect();
            if components.len() < 9 {
                continue;
            }

            let process_name = components[0].replace("\\x20", " ").replace("\\x2f", "/");

            let pid: u32 = match components[1].parse() {
                Ok(p) => p,
                Err(_) => continue,
            };

            let address = components[8..]
                .iter()
                .rev()
                .find(|c| c.contains(':') && !c.starts_with("0x") && !c.starts_with("0t"));
            let Some(port) = address.and_then(|a| Utils::parse_port(a)) else {
                continue;
            };

            let mut record = PortRecord::new(port, pid, process_name);
            record.process_path = paths.get(&pid).cloned();
            records.push(record);
        }

        records
    }
}

impl Default for DarwinPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl Platform for DarwinPlatform {
    async fn list(&self) -> Result<Vec<PortRecord>> {
        let output = Command::new("/usr/sbin/lsof")
            .args(["-iTCP", "-sTCP:LISTEN", "-P", "-n", "+c", "0"])
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
            .await
            .map_err(|e| Error::CommandFailed(format!("Failed to run lsof: {}", e)))?;

        let stdout = String::from_utf8(output.stdout)
            .map_err(|e| Error::ParseError(format!("Invalid UTF-8 in lsof output: {}", e)))?;

        let paths = self.get_process_paths().await;
        Ok(self.parse_lsof_output(&stdout, &paths))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lsof_output() {
        let platform = DarwinPlatform::new();
        let mut paths = HashMap::new();
        paths.insert(34805, "/opt/homebrew/bin/node".to_string());

        let output = r#"COMMAND    PID  USER   FD   TYPE             DEVICE SIZE/OFF NODE NAME
node     34805  code   19u  IPv6 0x3d8015e195af1f3f      0t0  TCP [::1]:3000 (LISTEN)
nginx        1  root    6u  IPv4 0x1234567890abcdef      0t0  TCP *:80 (LISTEN)
"#;

        let records = platform.parse_lsof_output(output, &paths);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].port, 3000);
        assert_eq!(records[0].display_path(), Some("/opt/homebrew/bin/node"));
        assert_eq!(records[1], PortRecord::new(80, 1, "nginx"));
    }
}
