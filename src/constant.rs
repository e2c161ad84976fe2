//! Wire-level constants consulted by the authentication driver (spec §6.4).

/// The subset of MySQL command bytes the auth driver itself emits. Regular
/// command dispatch belongs to the query-execution layer and is out of
/// scope here (spec §1); `Query` is kept only for the one-off `SET NAMES`
/// the change-user façade re-issues against pre-5.1.23 servers (spec §4.6).
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandByte {
    Quit = 0x01,
    Query = 0x03,
    ChangeUser = 0x11,
}

bitflags::bitflags! {
    /// Client/server capability flags (spec §6.4). Only the bits the auth
    /// driver reads or sets are documented; the rest exist so capability
    /// words round-trip untouched through [`crate::wire::handshake`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CapabilityFlags: u32 {
        const CLIENT_LONG_PASSWORD = 0x0000_0001;
        const CLIENT_FOUND_ROWS = 0x0000_0002;
        const CLIENT_LONG_FLAG = 0x0000_0004;
        /// Database (schema) name can be specified on connect.
        const CLIENT_CONNECT_WITH_DB = 0x0000_0008;
        const CLIENT_NO_SCHEMA = 0x0000_0010;
        const CLIENT_COMPRESS = 0x0000_0020;
        const CLIENT_ODBC = 0x0000_0040;
        const CLIENT_LOCAL_FILES = 0x0000_0080;
        const CLIENT_IGNORE_SPACE = 0x0000_0100;
        const CLIENT_PROTOCOL_41 = 0x0000_0200;
        const CLIENT_INTERACTIVE = 0x0000_0400;
        /// Use SSL encryption for the session.
        const CLIENT_SSL = 0x0000_0800;
        const CLIENT_IGNORE_SIGPIPE = 0x0000_1000;
        const CLIENT_TRANSACTIONS = 0x0000_2000;
        const CLIENT_RESERVED = 0x0000_4000;
        /// Old flag for 4.1 authentication (the auth-response-with-length field).
        const CLIENT_SECURE_CONNECTION = 0x0000_8000;
        const CLIENT_MULTI_STATEMENTS = 0x0001_0000;
        const CLIENT_MULTI_RESULTS = 0x0002_0000;
        const CLIENT_PS_MULTI_RESULTS = 0x0004_0000;
        /// Pluggable authentication: server sends/expects a plugin name.
        const CLIENT_PLUGIN_AUTH = 0x0008_0000;
        /// Connection attributes (`connect_attrs`) are sent.
        const CLIENT_CONNECT_ATTRS = 0x0010_0000;
        /// Auth response is length-encoded rather than a single length byte.
        const CLIENT_PLUGIN_AUTH_LENENC_CLIENT_DATA = 0x0020_0000;
        const CLIENT_CAN_HANDLE_EXPIRED_PASSWORDS = 0x0040_0000;
        const CLIENT_SESSION_TRACK = 0x0080_0000;
        const CLIENT_DEPRECATE_EOF = 0x0100_0000;
        const CLIENT_ZSTD_COMPRESSION_ALGORITHM = 0x0400_0000;
        const CLIENT_QUERY_ATTRIBUTES = 0x0800_0000;
        const CLIENT_MULTI_FACTOR_AUTHENTICATION = 0x1000_0000;
        const CLIENT_SSL_VERIFY_SERVER_CERT = 0x4000_0000;
        const CLIENT_REMEMBER_OPTIONS = 0x8000_0000;
    }
}

/// Capability bits the auth driver always requests when the server offers
/// them, matching the always-on set a 4.1+ session negotiates.
pub const CAPABILITIES_ALWAYS_ENABLED: CapabilityFlags = CapabilityFlags::CLIENT_LONG_PASSWORD
    .union(CapabilityFlags::CLIENT_PROTOCOL_41)
    .union(CapabilityFlags::CLIENT_TRANSACTIONS)
    .union(CapabilityFlags::CLIENT_SECURE_CONNECTION)
    .union(CapabilityFlags::CLIENT_PLUGIN_AUTH)
    .union(CapabilityFlags::CLIENT_PLUGIN_AUTH_LENENC_CLIENT_DATA);
