//! Application configuration
//!
//! All options are supplied when the application is constructed; the core
//! reads no environment variables. `host` and `port` are what the
//! out-of-context broadcast client posts back to, and
//! `broadcast_allowed_hosts` is the peer allow-list enforced by the
//! broadcast ingress.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::IpAddr;

/// Configuration for a socketapi application
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocketConfig {
    /// Host the out-of-context broadcast client posts back to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port for the same
    #[serde(default = "default_port")]
    pub port: u16,

    /// Peer addresses permitted to use the broadcast ingress
    ///
    /// The literal entry `localhost` admits any loopback address.
    #[serde(default = "default_allowed_hosts")]
    pub broadcast_allowed_hosts: HashSet<String>,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_allowed_hosts() -> HashSet<String> {
    ["127.0.0.1", "::1", "localhost"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            broadcast_allowed_hosts: default_allowed_hosts(),
        }
    }
}

impl SocketConfig {
    /// Whether a peer address may call the broadcast ingress
    pub fn allows_peer(&self, peer: IpAddr) -> bool {
        if self.broadcast_allowed_hosts.contains(&peer.to_string()) {
            return true;
        }
        self.broadcast_allowed_hosts.contains("localhost") && peer.is_loopback()
    }
}
