//! Listening port domain model.

use serde::{Deserialize, Serialize};

// ============================================================================
// PortRecord
// ============================================================================

/// One listening TCP port and the process that owns it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortRecord {
    /// The port number (e.g., 3000, 8080).
    pub port: u16,
    /// Process ID of the owning process.
    pub pid: u32,
    /// Human-readable process name. Empty when unresolved.
    #[serde(default)]
    pub process_name: String,
    /// Full executable path, when known.
    #[serde(default)]
    pub process_path: Option<String>,
}

impl PortRecord {
    /// Create a record with an unknown process path.
    pub fn new(port: u16, pid: u32, process_name: impl Into<String>) -> Self {
        Self {
            port,
            pid,
            process_name: process_name.into(),
            process_path: None,
        }
    }

    /// Attach an executable path.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.process_path = Some(path.into());
        self
    }

    /// Row key. The same pid may own several ports, so both halves are needed.
    pub fn key(&self) -> (u32, u16) {
        (self.pid, self.port)
    }

    /// The executable path when it adds information over the name.
    pub fn display_path(&self) -> Option<&str> {
        self.process_path
            .as_deref()
            .filter(|path| !path.is_empty() && *path != self.process_name)
    }

    /// Name shown in lists and dialogs. Falls back to `PID n` when unresolved.
    pub fn display_name(&self) -> String {
        if self.process_name.is_empty() {
            format!("PID {}", self.pid)
        } else {
            self.process_name.clone()
        }
    }

    /// Check whether this record matches a filter token.
    ///
    /// The token matches when it is a substring of the port number, the
    /// lowercased process name, or the pid. Surrounding whitespace in the
    /// token is ignored, so an empty or whitespace-only token matches
    /// everything.
    pub fn matches(&self, token: &str) -> bool {
        let token = token.trim();
        if token.is_empty() {
            return true;
        }
        let token = token.to_lowercase();
        self.port.to_string().contains(&token)
            || self.process_name.to_lowercase().contains(&token)
            || self.pid.to_string().contains(&token)
    }
}

impl std::fmt::Display for PortRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            ":{} (PID: {}, Process: {})",
            self.port,
            self.pid,
            self.display_name()
        )
    }
}

// ============================================================================
// Pid validation
// ============================================================================

/// Validate a raw pid coming from a caller.
pub fn validate_pid(raw: i64) -> crate::Result<u32> {
    if raw <= 0 {
        return Err(crate::Error::InvalidPid(raw.to_string()));
    }
    u32::try_from(raw).map_err(|_| crate::Error::InvalidPid(raw.to_string()))
}

/// Parse and validate a pid typed by a user.
pub fn parse_pid(input: &str) -> crate::Result<u32> {
    let trimmed = input.trim();
    let raw: i64 = trimmed
        .parse()
        .map_err(|_| crate::Error::InvalidPid(trimmed.to_string()))?;
    validate_pid(raw)
}

/// Apply a filter token to a list of records, keeping order.
pub fn filter_records(records: &[PortRecord], token: &str) -> Vec<PortRecord> {
    records.iter().filter(|r| r.matches(token)).cloned().collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<PortRecord> {
        vec![
            PortRecord::new(3000, 111, "node"),
            PortRecord::new(8080, 222, "java"),
        ]
    }

    #[test]
    fn test_matches_by_name_port_and_pid() {
        let record = PortRecord::new(5432, 987, "Postgres");
        assert!(record.matches("postgres"));
        assert!(record.matches("POST"));
        assert!(record.matches("543"));
        assert!(record.matches("98"));
        assert!(!record.matches("mysql"));
    }

    #[test]
    fn test_blank_token_matches_everything() {
        let record = PortRecord::new(80, 1, "");
        assert!(record.matches(""));
        assert!(record.matches("   "));
    }

    #[test]
    fn test_token_is_trimmed_before_matching() {
        let record = PortRecord::new(3000, 111, "node");
        assert!(record.matches("node "));
        assert!(record.matches("  3000\t"));
        assert!(!record.matches("no de"));
    }

    #[test]
    fn test_filter_scenario() {
        let filtered = filter_records(&sample(), "node");
        assert_eq!(filtered, vec![PortRecord::new(3000, 111, "node")]);
    }

    #[test]
    fn test_filter_is_idempotent() {
        let records = vec![
            PortRecord::new(3000, 111, "node"),
            PortRecord::new(3001, 112, "nodemon"),
            PortRecord::new(8080, 3000, "java"),
            PortRecord::new(9000, 4, "php"),
        ];
        for token in ["node", "300", "", "ja", "zzz"] {
            let once = filter_records(&records, token);
            let twice = filter_records(&once, token);
            assert_eq!(once, twice, "token {token:?}");
        }
    }

    #[test]
    fn test_display_path() {
        let record = PortRecord::new(3000, 1, "node.exe").with_path("node.exe");
        assert_eq!(record.display_path(), None);

        let record = PortRecord::new(3000, 1, "node.exe").with_path("C:\\bin\\node.exe");
        assert_eq!(record.display_path(), Some("C:\\bin\\node.exe"));

        let record = PortRecord::new(3000, 1, "node").with_path("");
        assert_eq!(record.display_path(), None);
    }

    #[test]
    fn test_display_name_fallback() {
        assert_eq!(PortRecord::new(1, 42, "").display_name(), "PID 42");
        assert_eq!(PortRecord::new(1, 42, "nginx").display_name(), "nginx");
    }

    #[test]
    fn test_validate_pid() {
        assert_eq!(validate_pid(1234).unwrap(), 1234);
        assert!(validate_pid(0).is_err());
        assert!(validate_pid(-1).is_err());
        assert!(validate_pid(i64::from(u32::MAX) + 1).is_err());
    }

    #[test]
    fn test_parse_pid() {
        assert_eq!(parse_pid(" 77 ").unwrap(), 77);
        assert!(parse_pid("12.5").is_err());
        assert!(parse_pid("abc").is_err());
        assert!(parse_pid("-4").is_err());
    }

    #[test]
    fn test_deserialize_backend_shape() {
        let json = r#"{"port":3000,"pid":111,"process_name":"node","process_path":null}"#;
        let record: PortRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record, PortRecord::new(3000, 111, "node"));
        assert_eq!(record.key(), (111, 3000));
    }
}
