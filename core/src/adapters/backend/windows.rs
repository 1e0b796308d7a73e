//! Windows port listing using netstat and tasklist.

use std::collections::HashMap;
use std::process::Stdio;

use tokio::process::Command;

use crate::domain::PortRecord;
use crate::error::{Error, Result};

use super::utils::Utils;
use super::Platform;

/// Windows-specific backend.
pub struct WindowsPlatform;

impl WindowsPlatform {
    pub fn new() -> Self {
        Self
    }

    /// Image names for every process, keyed by pid.
    async fn get_image_names(&self) -> HashMap<u32, String> {
        let output = match Command::new("tasklist")
            .args(["/FO", "CSV", "/NH"])
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
            .await
        {
            Ok(output) => output,
            Err(_) => return HashMap::new(),
        };

        String::from_utf8_lossy(&output.stdout)
            .lines()
            .filter_map(parse_tasklist_line)
            .collect()
    }

    /// Parse `netstat -ano -p TCP` rows in the LISTENING state.
    fn parse_netstat_output(&self, output: &str, names: &HashMap<u32, String>) -> Vec<PortRecord> {
        output
            .lines()
            .filter_map(|line| {
                let components: Vec<&str> = line.split_whitespace().collect();
                if components.len() < 5
                    || !components[0].starts_with("TCP")
                    || components[3] != "LISTENING"
                {
                    return None;
                }
                let port = Utils::parse_port(components[1])?;
                let pid: u32 = components[4].parse().ok()?;
                let name = names.get(&pid).cloned().unwrap_or_default();
                Some(PortRecord::new(port, pid, name))
            })
            .collect()
    }
}

/// `"node.exe","1234","Console","1","25,000 K"` -> `(1234, "node.exe")`.
fn parse_tasklist_line(line: &str) -> Option<(u32, String)> {
    let mut fields = line.split("\",\"");
    let name = fields.next()?.trim().trim_start_matches('"');
    let pid = fields.next()?.trim_end_matches('"').parse().ok()?;
    (!name.is_empty()).then(|| (pid, name.to_string()))
}

impl Default for WindowsPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl Platform for WindowsPlatform {
    async fn list(&self) -> Result<Vec<PortRecord>> {
        let output = Command::new("netstat")
            .args(["-ano", "-p", "TCP"])
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
            .await
            .map_err(|e| Error::CommandFailed(format!("Failed to run netstat: {}", e)))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let names = self.get_image_names().await;
        Ok(self.parse_netstat_output(&stdout, &names))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_netstat_output() {
        let mut names = HashMap::new();
        names.insert(4321, "node.exe".to_string());

        let output = r#"
Active Connections

  Proto  Local Address          Foreign Address        State           PID
  TCP    0.0.0.0:135            0.0.0.0:0              LISTENING       1012
  TCP    127.0.0.1:3000         0.0.0.0:0              LISTENING       4321
  TCP    127.0.0.1:52000        127.0.0.1:3000         ESTABLISHED     999
  TCP    [::]:3000              [::]:0                 LISTENING       4321
  UDP    0.0.0.0:5353           *:*                                    2222
"#;

        let records = WindowsPlatform::new().parse_netstat_output(output, &names);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0], PortRecord::new(135, 1012, ""));
        assert_eq!(records[1], PortRecord::new(3000, 4321, "node.exe"));
    }

    #[test]
    fn test_parse_tasklist_line() {
        assert_eq!(
            parse_tasklist_line(r#""node.exe","4321","Console","1","52,000 K""#),
            Some((4321, "node.exe".to_string()))
        );
        assert_eq!(parse_tasklist_line("INFO: No tasks are running"), None);
    }
}
