//! `authentication_ldap_sasl_client`: drives a [`ScramClient`] over the
//! `AuthMoreData` channel (spec §4.4.5).
//!
//! The server reuses the handshake's "salt" field to carry the SASL
//! sub-mechanism name instead of scramble bytes. This is a protocol quirk
//! to preserve, not fix (spec §9).

use crate::error::{Error, Result};
use crate::mechanism::MoreDataOutcome;
use crate::sasl::{ScramClient, ScramVariant};

pub const NAME: &str = "authentication_ldap_sasl_client";

/// Packets in this exchange are bounded to 1518 bytes (spec §4.4.5).
const MAX_PACKET_LEN: usize = 1518;

pub fn start(username: &str, password: &[u8], sub_mechanism: &[u8]) -> Result<(ScramClient, Vec<u8>)> {
    let name = std::str::from_utf8(sub_mechanism).unwrap_or_default();
    let variant = match name {
        "SCRAM-SHA-1" => ScramVariant::Sha1,
        "SCRAM-SHA-256" => ScramVariant::Sha256,
        other => return Err(Error::SaslUnsupported(other.to_string())),
    };

    let client = ScramClient::new(variant, username, password);
    let first = client.client_first();
    if first.len() > MAX_PACKET_LEN {
        return Err(Error::SaslFailure(
            "client-first message exceeds the SASL packet bound".into(),
        ));
    }
    Ok((client, first))
}

pub fn handle_more_data(client: &mut ScramClient, data: &[u8]) -> Result<MoreDataOutcome> {
    if data.len() > MAX_PACKET_LEN {
        return Err(Error::SaslFailure(
            "server SASL message exceeds the packet bound".into(),
        ));
    }
    match client.step(data)? {
        Some(response) => Ok(MoreDataOutcome::Continue(response)),
        None => Ok(MoreDataOutcome::Done),
    }
}
