//! Packets the auth driver itself builds and sends: `HandshakeResponse41`,
//! `SSLRequest`, `COM_CHANGE_USER`, and the client's half of an auth-switch
//! exchange (spec §4.2, §6.2-§6.3).

use crate::constant::{CapabilityFlags, CommandByte};
use crate::error::Result;
use crate::wire::primitive::*;

/// The client's reply to the server's initial greeting.
///
/// `auth_response` already holds the scrambled credentials produced by the
/// chosen mechanism (spec §4.3); this codec only knows how to lay the bytes
/// out on the wire, never how to compute them.
#[derive(Debug, Clone)]
pub struct HandshakeResponse41 {
    pub client_capabilities: CapabilityFlags,
    pub max_packet_size: u32,
    pub charset: u8,
    pub username: String,
    pub auth_response: Vec<u8>,
    pub database: Option<String>,
    pub auth_plugin_name: String,
    pub connect_attrs: Vec<(String, String)>,
}

fn write_connect_attrs(out: &mut Vec<u8>, attrs: &[(String, String)]) {
    let mut encoded = Vec::new();
    for (key, value) in attrs {
        write_bytes_lenenc(&mut encoded, key.as_bytes());
        write_bytes_lenenc(&mut encoded, value.as_bytes());
    }
    write_bytes_lenenc(out, &encoded);
}

pub fn write_handshake_response(out: &mut Vec<u8>, response: &HandshakeResponse41) {
    let mut caps = response.client_capabilities;
    caps |= crate::constant::CAPABILITIES_ALWAYS_ENABLED;
    if response.database.is_some() {
        caps |= CapabilityFlags::CLIENT_CONNECT_WITH_DB;
    }
    if !response.connect_attrs.is_empty() {
        caps |= CapabilityFlags::CLIENT_CONNECT_ATTRS;
    }

    write_int_4(out, caps.bits());
    write_int_4(out, response.max_packet_size);
    write_int_1(out, response.charset);
    out.extend_from_slice(&[0u8; 23]);
    write_string_null(out, &response.username);
    write_bytes_lenenc(out, &response.auth_response);
    if let Some(database) = &response.database {
        write_string_null(out, database);
    }
    write_string_null(out, &response.auth_plugin_name);
    if !response.connect_attrs.is_empty() {
        write_connect_attrs(out, &response.connect_attrs);
    }
}

/// `SSLRequest`: the truncated `HandshakeResponse41` sent before the TLS
/// handshake, carrying nothing past the capability/charset prefix (spec
/// §4.5 step "maybe upgrade").
pub fn write_ssl_request(out: &mut Vec<u8>, client_capabilities: CapabilityFlags, max_packet_size: u32, charset: u8) {
    let caps = client_capabilities | crate::constant::CAPABILITIES_ALWAYS_ENABLED | CapabilityFlags::CLIENT_SSL;
    write_int_4(out, caps.bits());
    write_int_4(out, max_packet_size);
    write_int_1(out, charset);
    out.extend_from_slice(&[0u8; 23]);
}

/// The server's request to switch mechanisms, received as an `0xFE` packet
/// (spec §4.5). The "salt" field is reused by `authentication_ldap_sasl_client`
/// to smuggle a SASL sub-mechanism name instead of scramble bytes (spec §4.4.5).
#[derive(Debug, Clone)]
pub struct AuthSwitchRequest {
    pub plugin_name: String,
    pub plugin_data: Vec<u8>,
}

pub fn read_auth_switch_request(payload: &[u8]) -> Result<AuthSwitchRequest> {
    let (_header, data) = read_int_1(payload)?;
    let (plugin_name, data) = read_string_null(data)?;
    Ok(AuthSwitchRequest {
        plugin_name: String::from_utf8_lossy(plugin_name).into_owned(),
        plugin_data: data.to_vec(),
    })
}

/// The client's reply to an auth-switch request: just the new mechanism's
/// initial response, with no header byte (spec §4.5).
pub fn write_auth_switch_response(out: &mut Vec<u8>, auth_response: &[u8]) {
    out.extend_from_slice(auth_response);
}

/// `COM_CHANGE_USER`, re-authenticating an already-established connection
/// under different credentials (spec §4.6). Pre-5.1.23 servers forget the
/// connection's charset across this command; the façade is responsible for
/// re-issuing `SET NAMES` afterwards when [`crate::session::ServerGreeting::forgets_charset_on_change_user`]
/// is true.
#[derive(Debug, Clone)]
pub struct ChangeUserRequest {
    pub username: String,
    pub auth_response: Vec<u8>,
    pub database: Option<String>,
    pub charset: u8,
    pub auth_plugin_name: String,
    pub connect_attrs: Vec<(String, String)>,
}

pub fn write_change_user(out: &mut Vec<u8>, request: &ChangeUserRequest, include_charset: bool, include_attrs: bool) {
    write_int_1(out, CommandByte::ChangeUser as u8);
    write_string_null(out, &request.username);
    write_bytes_lenenc(out, &request.auth_response);
    match &request.database {
        Some(database) => write_string_null(out, database),
        None => write_int_1(out, 0),
    }
    if include_charset {
        write_int_2(out, request.charset as u16);
        write_string_null(out, &request.auth_plugin_name);
        if include_attrs && !request.connect_attrs.is_empty() {
            write_connect_attrs(out, &request.connect_attrs);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handshake_response_sets_connect_with_db_when_database_present() {
        let response = HandshakeResponse41 {
            client_capabilities: CapabilityFlags::empty(),
            max_packet_size: 16 * 1024 * 1024,
            charset: 33,
            username: "root".into(),
            auth_response: vec![1, 2, 3],
            database: Some("test".into()),
            auth_plugin_name: "mysql_native_password".into(),
            connect_attrs: Vec::new(),
        };
        let mut out = Vec::new();
        write_handshake_response(&mut out, &response);

        let caps = u32::from_le_bytes([out[0], out[1], out[2], out[3]]);
        assert!(caps & CapabilityFlags::CLIENT_CONNECT_WITH_DB.bits() != 0);
        assert!(out.windows(4).any(|w| w == b"test"));
        assert!(out.ends_with(b"mysql_native_password\0"));
    }

    #[test]
    fn change_user_without_charset_stops_after_database() {
        let request = ChangeUserRequest {
            username: "alice".into(),
            auth_response: vec![9, 9],
            database: None,
            charset: 33,
            auth_plugin_name: "mysql_native_password".into(),
            connect_attrs: Vec::new(),
        };
        let mut out = Vec::new();
        write_change_user(&mut out, &request, false, false);
        assert_eq!(out, vec![0x11, b'a', b'l', b'i', b'c', b'e', 0, 2, 9, 9, 0]);
    }

    #[test]
    fn auth_switch_request_round_trips_plugin_name_and_data() {
        let mut payload = vec![0xfe];
        payload.extend_from_slice(b"caching_sha2_password\0");
        payload.extend_from_slice(&[7u8; 20]);
        let parsed = read_auth_switch_request(&payload).unwrap();
        assert_eq!(parsed.plugin_name, "caching_sha2_password");
        assert_eq!(parsed.plugin_data, vec![7u8; 20]);
    }
}
