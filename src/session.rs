//! Data model shared by the negotiation engine and the handshake façade
//! (spec §3). Nothing here performs I/O; it is the plain-data contract
//! between the auth core and its caller.

use std::collections::HashMap;

use zeroize::Zeroize;

/// Caller-owned credentials for one authentication attempt.
///
/// `password` is zeroized on drop; the rest of the crate is careful to
/// zero any intermediate hash/ciphertext buffer derived from it before
/// releasing it too (spec §5, Resource policy).
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user: String,
    pub password: Vec<u8>,
    pub database: Option<String>,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<Vec<u8>>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
            database: None,
        }
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }
}

impl Drop for Credentials {
    fn drop(&mut self) {
        self.password.zeroize();
    }
}

/// Summary of the server's initial handshake greeting, as produced by the
/// (out-of-scope) greeting parser (spec §3, §6.2).
#[derive(Debug, Clone)]
pub struct ServerGreeting {
    /// e.g. `50718` for `5.7.18`, parsed by the collaborator from the
    /// human-readable version string.
    pub server_version_numeric: u32,
    pub server_capabilities: crate::constant::CapabilityFlags,
    pub server_default_charset: u8,
    pub thread_id: u32,
    /// The "salt": typically 20 bytes, sometimes reported as 21 with a
    /// trailing NUL folded in by the greeting parser.
    pub auth_plugin_data: Vec<u8>,
    pub server_plugin_name: String,
}

impl ServerGreeting {
    /// `true` when `5.1.13 < version < 5.1.18`, the window in which MySQL
    /// echoes a duplicate ERR packet after a failed `COM_CHANGE_USER`
    /// (spec §4.6, §9).
    pub fn has_change_user_duplicate_err_bug(&self) -> bool {
        (50113..50118).contains(&self.server_version_numeric)
    }

    /// `true` for servers new enough to carry a 2-byte charset field in
    /// `COM_CHANGE_USER` (spec §4.2).
    pub fn supports_change_user_charset(&self) -> bool {
        self.server_version_numeric >= 50123
    }

    /// `true` for servers that forget the session charset across
    /// `COM_CHANGE_USER` and need a `SET NAMES` replayed afterward
    /// (spec §4.6).
    pub fn forgets_charset_on_change_user(&self) -> bool {
        self.server_version_numeric < 50123
    }
}

/// How eagerly the façade should attempt a TLS upgrade before authenticating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TlsMode {
    #[default]
    Disabled,
    Preferred,
    Required,
}

/// Caller-owned options for one session (spec §3, §6.5).
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub max_packet_size: u32,
    /// Overrides `ServerGreeting::server_default_charset` when set.
    pub client_charset_name: Option<String>,
    /// Sent only when the server advertises `CLIENT_CONNECT_ATTRS`.
    pub connect_attrs: HashMap<String, String>,
    pub tls_mode: TlsMode,
    /// PEM file for the RSA-encrypting mechanisms; if absent, the public
    /// key is fetched over the wire instead.
    pub sha2_public_key_path: Option<String>,
    /// Fallback mechanism name substituted when the server requests one
    /// unknown to the client on the first negotiation attempt.
    pub default_auth_protocol: String,
    /// `true` when the transport is TLS-protected or a local UNIX socket
    /// (spec glossary: "secure transport"). Drives the `caching_sha2_password`
    /// full-auth branch (spec §4.4.4).
    pub transport_is_secure: bool,
}

impl SessionOptions {
    pub fn new() -> Self {
        Self {
            max_packet_size: 16 * 1024 * 1024,
            client_charset_name: None,
            connect_attrs: HashMap::new(),
            tls_mode: TlsMode::Disabled,
            sha2_public_key_path: None,
            default_auth_protocol: crate::mechanism::DEFAULT_MECHANISM.to_string(),
            transport_is_secure: false,
        }
    }
}
