use std::collections::HashSet;

use crate::domain::PortRecord;

pub struct Utils;

impl Utils {
    /// Parse an address:port string and return the port.
    ///
    /// Handles multiple address formats:
    /// - IPv4: "127.0.0.1:3000" or "*:8080"
    /// - IPv6: "\[::1]:3000" or "\[fe80::1]:8080"
    /// - Scoped: "127.0.0.53%lo:53"
    pub fn parse_port(address: &str) -> Option<u16> {
        if address.starts_with('[') {
            let bracket_end = address.find(']')?;
            if bracket_end + 1 >= address.len() || address.as_bytes()[bracket_end + 1] != b':' {
                return None;
            }
            address[bracket_end + 2..].parse().ok()
        } else {
            let last_colon = address.rfind(':')?;
            address[last_colon + 1..].parse().ok()
        }
    }

    /// Last component of an executable path, for either separator.
    pub fn name_from_path(path: &str) -> Option<&str> {
        path.rsplit(['/', '\\'])
            .next()
            .filter(|name| !name.is_empty())
    }

    /// Drop duplicate `(port, pid)` rows and order by port, then pid.
    ///
    /// The same socket shows up once per address family, so duplicates are
    /// normal. Records with port 0 or pid 0 are not listening sockets we
    /// can act on and are dropped.
    pub fn finalize(records: Vec<PortRecord>) -> Vec<PortRecord> {
        let mut seen: HashSet<(u32, u16)> = HashSet::new();
        let mut out: Vec<PortRecord> = records
            .into_iter()
            .filter(|r| r.port != 0 && r.pid != 0)
            .filter(|r| seen.insert(r.key()))
            .map(|mut r| {
                if r.process_name.is_empty() {
                    r.process_name = r
                        .process_path
                        .as_deref()
                        .and_then(Utils::name_from_path)
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("PID {}", r.pid));
                }
                r
            })
            .collect();
        out.sort_by_key(|r| (r.port, r.pid));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ipv4_address() {
        assert_eq!(Utils::parse_port("127.0.0.1:3000"), Some(3000));
        assert_eq!(Utils::parse_port("*:8080"), Some(8080));
        assert_eq!(Utils::parse_port("0.0.0.0:*"), None);
        assert_eq!(Utils::parse_port("127.0.0.53%lo:53"), Some(53));
    }

    #[test]
    fn test_parse_ipv6_address() {
        assert_eq!(Utils::parse_port("[::1]:3000"), Some(3000));
        assert_eq!(Utils::parse_port("[fe80::1]:8080"), Some(8080));
        assert_eq!(Utils::parse_port("[::1]"), None);
    }

    #[test]
    fn test_name_from_path() {
        assert_eq!(Utils::name_from_path("/usr/bin/node"), Some("node"));
        assert_eq!(Utils::name_from_path("C:\\Tools\\java.exe"), Some("java.exe"));
        assert_eq!(Utils::name_from_path("/"), None);
    }

    #[test]
    fn test_finalize_dedupes_and_sorts() {
        let records = vec![
            PortRecord::new(8080, 2, "java"),
            PortRecord::new(3000, 1, "node"),
            PortRecord::new(3000, 1, "node"),
            PortRecord::new(22, 9, "").with_path("/usr/sbin/sshd"),
            PortRecord::new(443, 5, ""),
            PortRecord::new(0, 5, "bogus"),
        ];
        let out = Utils::finalize(records);
        let ports: Vec<u16> = out.iter().map(|r| r.port).collect();
        assert_eq!(ports, vec![22, 443, 3000, 8080]);
        assert_eq!(out[0].process_name, "sshd");
        assert_eq!(out[1].process_name, "PID 5");
    }
}
