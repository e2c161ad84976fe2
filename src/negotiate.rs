//! The auth-switch retry loop (spec §4.5, component C5). This module never
//! builds the first on-wire packet itself -- `HandshakeResponse41` and
//! `COM_CHANGE_USER` differ in shape and belong to the façade (spec §4.6) --
//! but it owns every packet read and write from that point on.

use crate::error::{Error, Result};
use crate::mechanism::{Mechanism, MechanismContext, MoreDataOutcome};
use crate::wire::{self, ServerReply};

/// Defence against a server that never stops requesting switches (spec
/// §4.5, "Switch-loop termination": unbounded in principle, capped here).
const MAX_SWITCHES: u32 = 4;

/// Resolves the mechanism the server's greeting (or change-user request)
/// named, substituting `fallback_name` exactly once if the name is
/// unrecognised (spec §4.5 "Fallback on unknown mechanism", §6.5
/// `default_auth_protocol`). Only this, the very first selection of an
/// attempt, ever falls back; an unknown mechanism named by a later
/// auth-switch is always a hard error.
pub fn resolve_initial_mechanism(requested_name: &str, fallback_name: &str) -> (Mechanism, bool) {
    match Mechanism::from_name(requested_name) {
        Some(mechanism) => (mechanism, false),
        None => (
            Mechanism::from_name(fallback_name)
                .or_else(|| Mechanism::from_name(crate::mechanism::DEFAULT_MECHANISM))
                .expect("DEFAULT_MECHANISM is always registered"),
            true,
        ),
    }
}

/// Drives one full auth attempt to completion: sends the initial response
/// via `send_first`, then loops reading server packets until a terminal OK
/// or ERR. Returns the name of the mechanism that actually produced the
/// final client payload (spec §3 invariant 3).
pub fn run_negotiation(
    transport: &mut dyn crate::transport::PacketTransport,
    mut mechanism: Mechanism,
    mut salt: Vec<u8>,
    username: &str,
    password: &[u8],
    transport_is_secure: bool,
    sha2_public_key_path: Option<&str>,
    send_first: impl FnOnce(&mut dyn crate::transport::PacketTransport, Vec<u8>) -> Result<()>,
    mut on_server_error: impl FnMut(&mut dyn crate::transport::PacketTransport) -> Result<()>,
) -> Result<String> {
    let first_response = mechanism.initial_response(
        &mut MechanismContext {
            transport: &mut *transport,
            transport_is_secure,
            sha2_public_key_path,
            username,
        },
        &salt,
        password,
    )?;
    send_first(transport, first_response)?;

    let mut switches = 0u32;

    loop {
        let payload = transport.read_packet()?;
        match wire::read_server_reply(&payload)? {
            ServerReply::Ok(_) => return Ok(mechanism.name().to_string()),
            ServerReply::Err {
                error_code,
                sql_state,
                message,
            } => {
                on_server_error(transport)?;
                return Err(Error::ServerError {
                    error_code,
                    sql_state,
                    message,
                });
            }
            ServerReply::OldAuthSentinel => {
                on_server_error(transport)?;
                return Err(Error::LegacyAuthRejected);
            }
            ServerReply::AuthSwitch(req) => {
                switches += 1;
                if switches > MAX_SWITCHES {
                    return Err(Error::TooManySwitches(MAX_SWITCHES));
                }

                mechanism = Mechanism::from_name(&req.plugin_name)
                    .ok_or(Error::UnknownMechanism(req.plugin_name))?;
                salt = req.plugin_data;

                let response = mechanism.initial_response(
                    &mut MechanismContext {
                        transport: &mut *transport,
                        transport_is_secure,
                        sha2_public_key_path,
                        username,
                    },
                    &salt,
                    password,
                )?;
                let mut out = Vec::new();
                wire::write_auth_switch_response(&mut out, &response);
                transport.write_packet(&out)?;
            }
            ServerReply::AuthMoreData(data) => {
                let outcome = mechanism.handle_more_data(
                    &mut MechanismContext {
                        transport: &mut *transport,
                        transport_is_secure,
                        sha2_public_key_path,
                        username,
                    },
                    &data,
                    &salt,
                    password,
                )?;
                if let MoreDataOutcome::Continue(bytes) = outcome {
                    transport.write_packet(&bytes)?;
                }
            }
        }
    }
}
