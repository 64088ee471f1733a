//! Best-effort detection of this machine's LAN address.
//!
//! The server reports its own address to the rest of the application (and,
//! through it, to the user) as the place clients should connect to.
//!
//! # How it works
//!
//! "Connecting" a UDP socket sends nothing on the wire; it only asks the OS
//! routing table which local interface would be used to reach the target.
//! Reading back the socket's local address therefore yields the LAN IP of the
//! default-route interface, without any packet leaving the machine.

use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};

use tracing::debug;

/// Any routable address works; nothing is sent to it.
const ROUTE_PROBE_TARGET: &str = "8.8.8.8:80";

/// Returns the LAN address of the default-route interface, or `127.0.0.1` if
/// it cannot be determined (no network, no default route).
pub fn detect_local_ip() -> IpAddr {
    match route_source_addr(ROUTE_PROBE_TARGET) {
        Ok(addr) if !addr.ip().is_unspecified() => addr.ip(),
        Ok(_) => IpAddr::V4(Ipv4Addr::LOCALHOST),
        Err(e) => {
            debug!("local IP detection failed, falling back to loopback: {e}");
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        }
    }
}

fn route_source_addr(target: &str) -> std::io::Result<SocketAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0")?;
    socket.connect(target)?;
    socket.local_addr()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
