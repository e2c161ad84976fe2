//! Entry points for one connection's authentication: `run_connect_auth` and
//! `run_change_user_auth` (spec §4.6, component C6).

use tracing::{debug, info, warn};

use crate::constant::{CapabilityFlags, CommandByte};
use crate::error::{Error, Result};
use crate::negotiate::{resolve_initial_mechanism, run_negotiation};
use crate::session::{Credentials, ServerGreeting, SessionOptions, TlsMode};
use crate::transport::{PacketTransport, TlsOptions};
use crate::wire::{self, ChangeUserRequest, HandshakeResponse41};

/// A minimal, hand-picked charset table. Full collation lookup belongs to a
/// richer configuration layer than this crate carries (spec §6.5 only asks
/// for a name-to-override, not a catalog).
fn resolve_charset(client_charset_name: Option<&str>, server_default: u8) -> u8 {
    match client_charset_name {
        None => server_default,
        Some("utf8mb4") => 45,
        Some("utf8") => 33,
        Some("latin1") => 8,
        Some("binary") => 63,
        Some(other) => {
            warn!(charset = other, "unrecognised client charset name, keeping server default");
            server_default
        }
    }
}

fn extra_client_capabilities(has_database: bool, has_connect_attrs: bool) -> CapabilityFlags {
    let mut caps = CapabilityFlags::empty();
    if has_database {
        caps |= CapabilityFlags::CLIENT_CONNECT_WITH_DB;
    }
    if has_connect_attrs {
        caps |= CapabilityFlags::CLIENT_CONNECT_ATTRS;
    }
    caps
}

/// Upgrades the transport to TLS in place if `tls_mode` asks for it and the
/// server offers `CLIENT_SSL` (spec §4.6). Returns whether the transport is
/// now secure.
fn maybe_upgrade_tls(
    transport: &mut dyn PacketTransport,
    tls_mode: TlsMode,
    server_capabilities: CapabilityFlags,
    client_capabilities: CapabilityFlags,
    max_packet_size: u32,
    charset: u8,
    already_secure: bool,
) -> Result<bool> {
    if already_secure || tls_mode == TlsMode::Disabled {
        return Ok(already_secure);
    }
    let offered = server_capabilities.contains(CapabilityFlags::CLIENT_SSL);
    if tls_mode == TlsMode::Required && !offered {
        return Err(Error::BadConfig(
            "tls_mode is required but the server does not advertise CLIENT_SSL".into(),
        ));
    }
    if !offered {
        return Ok(false);
    }

    let mut ssl_request = Vec::new();
    wire::write_ssl_request(&mut ssl_request, client_capabilities, max_packet_size, charset);
    transport.write_packet(&ssl_request)?;
    transport.upgrade_to_tls(&TlsOptions::default())?;
    debug!("upgraded connection to TLS before authenticating");
    Ok(true)
}

/// Runs the initial authentication for a freshly handshaken connection
/// (spec §4.6). Returns the name of the mechanism that finally succeeded.
pub fn run_connect_auth(
    transport: &mut dyn PacketTransport,
    creds: &Credentials,
    greeting: &ServerGreeting,
    options: &SessionOptions,
) -> Result<String> {
    let charset = resolve_charset(options.client_charset_name.as_deref(), greeting.server_default_charset);
    let connect_attrs: Vec<(String, String)> =
        if greeting.server_capabilities.contains(CapabilityFlags::CLIENT_CONNECT_ATTRS) {
            options.connect_attrs.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
        } else {
            Vec::new()
        };
    let client_capabilities = extra_client_capabilities(creds.database.is_some(), !connect_attrs.is_empty());

    let transport_is_secure = maybe_upgrade_tls(
        transport,
        options.tls_mode,
        greeting.server_capabilities,
        client_capabilities,
        options.max_packet_size,
        charset,
        options.transport_is_secure,
    )?;

    let (mechanism, substituted) = resolve_initial_mechanism(&greeting.server_plugin_name, &options.default_auth_protocol);
    if substituted {
        info!(
            requested = %greeting.server_plugin_name,
            fallback = crate::mechanism::DEFAULT_MECHANISM,
            "server requested a mechanism unknown to this client, substituting the default"
        );
    }
    let mechanism_name_for_header = mechanism.name().to_string();

    run_negotiation(
        transport,
        mechanism,
        greeting.auth_plugin_data.clone(),
        &creds.user,
        &creds.password,
        transport_is_secure,
        options.sha2_public_key_path.as_deref(),
        |transport, auth_response| {
            let response = HandshakeResponse41 {
                client_capabilities,
                max_packet_size: options.max_packet_size,
                charset,
                username: creds.user.clone(),
                auth_response,
                database: creds.database.clone(),
                auth_plugin_name: mechanism_name_for_header.clone(),
                connect_attrs: connect_attrs.clone(),
            };
            let mut out = Vec::new();
            wire::write_handshake_response(&mut out, &response);
            transport.write_packet(&out)
        },
        |_transport| Ok(()),
    )
}

/// Re-authenticates an already-open connection under different credentials
/// (spec §4.6). `connection_user`/`connection_password` are the connection's
/// currently recorded credentials; on success they are atomically replaced
/// with `new_creds` (new buffer allocated and swapped in, old one dropped --
/// and zeroed by [`Credentials`]'s `Drop` -- only afterward, never before).
/// `silent` is accepted for parity with the original entry point but does
/// not change behaviour here: all errors already surface to the caller,
/// who decides whether to log them.
#[allow(clippy::too_many_arguments)]
pub fn run_change_user_auth(
    transport: &mut dyn PacketTransport,
    connection_user: &mut String,
    connection_password: &mut Vec<u8>,
    new_creds: Credentials,
    greeting: &ServerGreeting,
    options: &SessionOptions,
    silent: bool,
) -> Result<String> {
    let charset = resolve_charset(options.client_charset_name.as_deref(), greeting.server_default_charset);
    let connect_attrs: Vec<(String, String)> =
        if greeting.server_capabilities.contains(CapabilityFlags::CLIENT_CONNECT_ATTRS) {
            options.connect_attrs.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
        } else {
            Vec::new()
        };
    let include_charset = greeting.supports_change_user_charset();
    let has_duplicate_err_bug = greeting.has_change_user_duplicate_err_bug();

    let (mechanism, substituted) = resolve_initial_mechanism(&greeting.server_plugin_name, &options.default_auth_protocol);
    if substituted && !silent {
        info!(
            requested = %greeting.server_plugin_name,
            fallback = crate::mechanism::DEFAULT_MECHANISM,
            "server requested a mechanism unknown to this client during change-user, substituting the default"
        );
    }
    let mechanism_name_for_header = mechanism.name().to_string();
    let username = new_creds.user.clone();
    let database = new_creds.database.clone();

    let result = run_negotiation(
        transport,
        mechanism,
        greeting.auth_plugin_data.clone(),
        &new_creds.user,
        &new_creds.password,
        options.transport_is_secure,
        options.sha2_public_key_path.as_deref(),
        |transport, auth_response| {
            let request = ChangeUserRequest {
                username: username.clone(),
                auth_response,
                database: database.clone(),
                charset,
                auth_plugin_name: mechanism_name_for_header.clone(),
                connect_attrs: connect_attrs.clone(),
            };
            let mut out = Vec::new();
            wire::write_change_user(&mut out, &request, include_charset, include_charset);
            transport.write_packet(&out)
        },
        |transport| {
            if has_duplicate_err_bug {
                debug!("server is in the 5.1.13-5.1.18 duplicate-ERR window, discarding one extra packet");
                transport.read_packet()?;
            }
            Ok(())
        },
    );

    let final_mechanism = result?;

    *connection_user = new_creds.user.clone();
    *connection_password = new_creds.password.clone();

    if greeting.forgets_charset_on_change_user() {
        if let Some(name) = &options.client_charset_name {
            reissue_set_names(transport, name)?;
        } else {
            debug!("server forgets charset across change-user but no client_charset_name was configured to restore");
        }
    }

    Ok(final_mechanism)
}

/// Servers older than 5.1.23 forget the connection's charset across
/// `COM_CHANGE_USER`; restore it with a plain `SET NAMES` (spec §4.6).
/// Not a general query-execution path: only the OK/ERR reply is consulted.
fn reissue_set_names(transport: &mut dyn PacketTransport, charset_name: &str) -> Result<()> {
    let mut command = vec![CommandByte::Query as u8];
    command.extend_from_slice(format!("SET NAMES '{charset_name}'").as_bytes());
    transport.write_packet(&command)?;
    match wire::read_server_reply(&transport.read_packet()?)? {
        wire::ServerReply::Ok(_) => Ok(()),
        wire::ServerReply::Err {
            error_code,
            sql_state,
            message,
        } => Err(Error::ServerError {
            error_code,
            sql_state,
            message,
        }),
        _ => Err(Error::InvalidPacket),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionOptions;
    use crate::transport::mock::MockTransport;

    fn greeting(plugin: &str, version: u32) -> ServerGreeting {
        ServerGreeting {
            server_version_numeric: version,
            server_capabilities: CapabilityFlags::CLIENT_PROTOCOL_41,
            server_default_charset: 33,
            thread_id: 7,
            auth_plugin_data: (1u8..=20).collect(),
            server_plugin_name: plugin.to_string(),
        }
    }

    #[test]
    fn connect_auth_succeeds_with_native_password() {
        let mut transport = MockTransport::with_replies(vec![vec![0x00, 0, 0, 2, 0, 0, 0]]);
        let creds = Credentials::new("root", b"secret".to_vec());
        let greeting = greeting("mysql_native_password", 80_034);
        let options = SessionOptions::new();

        let mechanism = run_connect_auth(&mut transport, &creds, &greeting, &options).unwrap();
        assert_eq!(mechanism, "mysql_native_password");
        assert_eq!(transport.writes.len(), 1);
    }

    #[test]
    fn connect_auth_skips_tls_when_disabled_even_if_offered() {
        let mut transport = MockTransport::with_replies(vec![vec![0x00, 0, 0, 2, 0, 0, 0]]);
        let creds = Credentials::new("root", b"secret".to_vec());
        let mut greeting = greeting("mysql_native_password", 80_034);
        greeting.server_capabilities |= CapabilityFlags::CLIENT_SSL;
        let options = SessionOptions::new();

        run_connect_auth(&mut transport, &creds, &greeting, &options).unwrap();
        assert_eq!(transport.tls_upgrades, 0);
    }

    #[test]
    fn connect_auth_required_tls_fails_fast_when_not_offered() {
        let mut transport = MockTransport::default();
        let creds = Credentials::new("root", b"secret".to_vec());
        let greeting = greeting("mysql_native_password", 80_034);
        let mut options = SessionOptions::new();
        options.tls_mode = TlsMode::Required;

        let err = run_connect_auth(&mut transport, &creds, &greeting, &options).unwrap_err();
        assert!(matches!(err, Error::BadConfig(_)));
    }

    #[test]
    fn change_user_swaps_credentials_only_after_success() {
        let mut transport = MockTransport::with_replies(vec![vec![0x00, 0, 0, 2, 0, 0, 0]]);
        let greeting = greeting("mysql_native_password", 80_034);
        let options = SessionOptions::new();

        let mut user = "old_user".to_string();
        let mut password = b"old_password".to_vec();
        let new_creds = Credentials::new("new_user", b"new_password".to_vec());

        let mechanism = run_change_user_auth(
            &mut transport,
            &mut user,
            &mut password,
            new_creds,
            &greeting,
            &options,
            false,
        )
        .unwrap();

        assert_eq!(mechanism, "mysql_native_password");
        assert_eq!(user, "new_user");
        assert_eq!(password, b"new_password".to_vec());
    }

    #[test]
    fn change_user_does_not_swap_credentials_on_failure() {
        let mut payload = vec![0xff, 0x15, 0x04, b'#'];
        payload.extend_from_slice(b"28000");
        payload.extend_from_slice(b"Access denied");
        let mut transport = MockTransport::with_replies(vec![payload]);
        let greeting = greeting("mysql_native_password", 80_034);
        let options = SessionOptions::new();

        let mut user = "old_user".to_string();
        let mut password = b"old_password".to_vec();
        let new_creds = Credentials::new("new_user", b"new_password".to_vec());

        let err = run_change_user_auth(
            &mut transport,
            &mut user,
            &mut password,
            new_creds,
            &greeting,
            &options,
            false,
        )
        .unwrap_err();

        assert!(matches!(err, Error::ServerError { .. }));
        assert_eq!(user, "old_user");
        assert_eq!(password, b"old_password".to_vec());
    }

    #[test]
    fn change_user_duplicate_err_bug_window_discards_extra_packet() {
        let mut payload = vec![0xff, 0x15, 0x04, b'#'];
        payload.extend_from_slice(b"28000");
        payload.extend_from_slice(b"Access denied");
        let duplicate = payload.clone();
        let mut transport = MockTransport::with_replies(vec![payload, duplicate]);
        let greeting = greeting("mysql_native_password", 50_115);
        let options = SessionOptions::new();

        let mut user = "old_user".to_string();
        let mut password = b"old_password".to_vec();
        let new_creds = Credentials::new("new_user", b"new_password".to_vec());

        let err = run_change_user_auth(
            &mut transport,
            &mut user,
            &mut password,
            new_creds,
            &greeting,
            &options,
            false,
        )
        .unwrap_err();

        assert!(matches!(err, Error::ServerError { .. }));
        assert!(transport.inbound.is_empty());
    }

    #[test]
    fn change_user_duplicate_err_bug_window_discards_extra_packet_on_legacy_sentinel() {
        let duplicate = vec![0xfe];
        let mut transport = MockTransport::with_replies(vec![vec![0xfe], duplicate]);
        let greeting = greeting("mysql_native_password", 50_115);
        let options = SessionOptions::new();

        let mut user = "old_user".to_string();
        let mut password = b"old_password".to_vec();
        let new_creds = Credentials::new("new_user", b"new_password".to_vec());

        let err = run_change_user_auth(
            &mut transport,
            &mut user,
            &mut password,
            new_creds,
            &greeting,
            &options,
            false,
        )
        .unwrap_err();

        assert!(matches!(err, Error::LegacyAuthRejected));
        assert!(transport.inbound.is_empty());
        assert_eq!(user, "old_user");
        assert_eq!(password, b"old_password".to_vec());
    }
}
