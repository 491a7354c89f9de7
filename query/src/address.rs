//! Expansion of peer addresses into the endpoint forms worth querying.
//!
//! Peers report each other by bare IP, while the neighbor endpoint usually
//! listens on a well known RPC port. Both forms are tried since some nodes
//! sit behind a reverse proxy on port 80 and others only expose the RPC port.

use std::net::Ipv6Addr;

/// Returns the candidate `host[:port]` endpoints for a peer address.
///
/// The address as given always comes first. If it does not already carry a
/// port, the same host suffixed with `default_port` follows. Bare IPv6
/// literals are bracketed so both forms can be placed in a URL.
///
/// # Arguments
///
/// * `address` - The peer address, exactly as discovered.
/// * `default_port` - The network's default RPC port.
///
/// # Returns
///
/// One or two endpoints, never containing duplicates.
pub fn candidate_endpoints(address: &str, default_port: u16) -> Vec<String> {
    let address = address.trim();

    if has_port(address) {
        return vec![address.to_string()];
    }

    let host = match address.parse::<Ipv6Addr>() {
        Ok(_) => format!("[{address}]"),
        Err(_) => address.to_string(),
    };

    let with_port = format!("{host}:{default_port}");
    let mut endpoints = vec![host];
    if !endpoints.contains(&with_port) {
        endpoints.push(with_port);
    }
    endpoints
}

/// Whether an address string already names an explicit port.
fn has_port(address: &str) -> bool {
    // Bracketed IPv6, e.g. `[::1]:8080`.
    if let Some(rest) = address.strip_prefix('[') {
        return match rest.split_once(']') {
            Some((_, tail)) => tail
                .strip_prefix(':')
                .is_some_and(|port| port.parse::<u16>().is_ok()),
            None => false,
        };
    }

    match address.rsplit_once(':') {
        // More than one colon means an unbracketed IPv6 literal.
        Some((host, port)) => !host.contains(':') && port.parse::<u16>().is_ok(),
        None => false,
    }
}
