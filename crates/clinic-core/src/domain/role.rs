//! What the rest of the application learns once the election is over.

use std::fmt;
use std::net::IpAddr;

/// The mode the application runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    /// Still listening for a beacon.
    Discovering,
    /// This instance hosts the backend.
    Server,
    /// Another instance hosts the backend; this one connects to it.
    Client,
}

impl fmt::Display for AppMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AppMode::Discovering => "discovering",
            AppMode::Server => "server",
            AppMode::Client => "client",
        };
        f.write_str(s)
    }
}

/// Location of the backend service, local or remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerInfo {
    pub ip: IpAddr,
    pub port: u16,
}

impl ServerInfo {
    pub fn new(ip: IpAddr, port: u16) -> Self {
        Self { ip, port }
    }

    /// Base HTTP URL of the backend, e.g. `http://192.168.1.20:8000`.
    pub fn url(&self) -> String {
        match self.ip {
            IpAddr::V4(ip) => format!("http://{ip}:{}", self.port),
            IpAddr::V6(ip) => format!("http://[{ip}]:{}", self.port),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_info_url_for_ipv4() {
        // Arrange
        let info = ServerInfo::new("192.168.1.20".parse().unwrap(), 8000);

        // Act / Assert
        assert_eq!(info.url(), "http://192.168.1.20:8000");
    }

    #[test]
    fn test_server_info_url_brackets_ipv6() {
        let info = ServerInfo::new("fe80::1".parse().unwrap(), 8000);
        assert_eq!(info.url(), "http://[fe80::1]:8000");
    }

    #[test]
    fn test_app_mode_display() {
        assert_eq!(AppMode::Discovering.to_string(), "discovering");
        assert_eq!(AppMode::Server.to_string(), "server");
        assert_eq!(AppMode::Client.to_string(), "client");
    }
}
