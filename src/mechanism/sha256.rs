//! `sha256_password`: RSA-OAEP-encrypted password over an insecure
//! transport, or cleartext once TLS is active (spec §4.4.3).

use crate::crypto::{parse_rsa_public_key_pem, rsa_oaep_encrypt, xor_stream_inplace, RsaPublicKey};
use crate::error::{Error, Result};
use crate::transport::PacketTransport;

pub const NAME: &str = "sha256_password";

pub fn initial_response(
    password: &[u8],
    salt: &[u8],
    transport_is_secure: bool,
    pem_path: Option<&str>,
    transport: &mut dyn PacketTransport,
) -> Result<Vec<u8>> {
    if password.is_empty() {
        return Ok(Vec::new());
    }
    if transport_is_secure {
        let mut response = password.to_vec();
        response.push(0);
        return Ok(response);
    }

    let pubkey = acquire_public_key(pem_path, transport)?;
    let mut masked = password.to_vec();
    masked.push(0);
    xor_stream_inplace(&mut masked, salt);
    rsa_oaep_encrypt(&pubkey, &masked)
}

/// Loads the server's RSA public key from a local PEM file if configured,
/// else requests it over the wire with a single `0x01` byte and parses the
/// PEM the server sends back (spec §4.4.3, reused by `caching_sha2_password`'s
/// full-auth path).
pub fn acquire_public_key(
    pem_path: Option<&str>,
    transport: &mut dyn PacketTransport,
) -> Result<RsaPublicKey> {
    if let Some(path) = pem_path {
        let pem = std::fs::read(path)?;
        return parse_rsa_public_key_pem(&pem);
    }
    transport.write_packet(&[0x01])?;
    let response = transport.read_packet()?;
    if response.is_empty() {
        return Err(Error::KeyUnavailable);
    }
    parse_rsa_public_key_pem(&response)
}
