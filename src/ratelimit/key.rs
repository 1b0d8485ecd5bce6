//! Rate-limit key resolution.
//!
//! Maps an inbound request to the identity it is counted under and the
//! request limit for that identity. A request carrying a non-empty
//! `API_KEY` token is keyed by the token; anything else is keyed by its
//! normalized source address.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use parking_lot::RwLock;

/// The identity a request is grouped under for counting.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClientKey {
    /// Keyed by an API token value.
    Token(String),
    /// Keyed by a normalized client address.
    Address(String),
}

impl ClientKey {
    /// The raw identity string.
    pub fn as_str(&self) -> &str {
        match self {
            ClientKey::Token(t) => t,
            ClientKey::Address(a) => a,
        }
    }
}

impl std::fmt::Display for ClientKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientKey::Token(t) => write!(f, "token:{}", t),
            ClientKey::Address(a) => write!(f, "addr:{}", a),
        }
    }
}

/// Resolves `(key, limit)` for each request.
///
/// Holds the process default limit and the per-token override table. The
/// table can be updated at runtime; resolution re-reads it on every call,
/// so an edit takes effect on the next request without touching any open
/// window.
pub struct KeyResolver {
    /// Limit applied to any key without an explicit override.
    default_limit: u32,
    /// Per-token limit overrides.
    overrides: RwLock<HashMap<String, u32>>,
}

impl KeyResolver {
    /// Create a resolver with the given default limit and token overrides.
    pub fn new(default_limit: u32, overrides: HashMap<String, u32>) -> Self {
        Self {
            default_limit,
            overrides: RwLock::new(overrides),
        }
    }

    /// Resolve the counting key and limit for a request.
    ///
    /// Never fails: an absent or empty token falls back to address
    /// keying, and a token without an override gets the default limit.
    pub fn resolve(&self, token: Option<&str>, remote_addr: &str) -> (ClientKey, u32) {
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            let limit = self
                .overrides
                .read()
                .get(token)
                .copied()
                .unwrap_or(self.default_limit);
            return (ClientKey::Token(token.to_string()), limit);
        }

        (
            ClientKey::Address(normalize_addr(remote_addr)),
            self.default_limit,
        )
    }

    /// Add or update the limit override for a token.
    pub fn set_token_limit(&self, token: &str, limit: u32) {
        self.overrides.write().insert(token.to_string(), limit);
    }

    /// The limit applied to keys without an override.
    pub fn default_limit(&self) -> u32 {
        self.default_limit
    }
}

/// Normalize a source address to its IP, dropping the ephemeral port so
/// that reconnects from the same host count against the same key. An
/// unparseable address is used verbatim.
fn normalize_addr(remote_addr: &str) -> String {
    if let Ok(sock) = remote_addr.parse::<SocketAddr>() {
        return sock.ip().to_string();
    }
    if let Ok(ip) = remote_addr.parse::<IpAddr>() {
        return ip.to_string();
    }
    remote_addr.to_string()
}
