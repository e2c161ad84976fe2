//! `caching_sha2_password`: the cached-challenge fast path, falling back to
//! a full RSA or cleartext exchange identical in spirit to `sha256_password`
//! (spec §4.4.4).

use crate::crypto::{sha256, xor_block};
use crate::error::{Error, Result};
use crate::mechanism::MoreDataOutcome;
use crate::transport::PacketTransport;

pub const NAME: &str = "caching_sha2_password";

pub const REQUEST_PUBLIC_KEY: u8 = 0x02;
pub const FAST_AUTH_SUCCESS: u8 = 0x03;
pub const PERFORM_FULL_AUTH: u8 = 0x04;

/// `SHA256(password) XOR SHA256(SHA256(SHA256(password)) || salt)`.
///
/// The XOR order is mirrored from `mysql_native_password`: there the salt
/// salts the *inner* hash, here it salts the already-doubled one.
pub fn scramble(password: &[u8], salt: &[u8]) -> Result<Vec<u8>> {
    if password.is_empty() {
        return Ok(Vec::new());
    }
    if salt.len() < 20 {
        return Err(Error::MalformedSalt);
    }
    let salt = &salt[..20];

    let stage1 = sha256(password);
    let stage2 = sha256(&stage1);
    let mut salted = Vec::with_capacity(52);
    salted.extend_from_slice(&stage2);
    salted.extend_from_slice(salt);
    let stage3 = sha256(&salted);

    let mut out = vec![0u8; 32];
    xor_block(&mut out, &stage1, &stage3, 32);
    Ok(out)
}

pub fn handle_more_data(
    data: &[u8],
    password: &[u8],
    salt: &[u8],
    transport_is_secure: bool,
    pem_path: Option<&str>,
    transport: &mut dyn PacketTransport,
) -> Result<MoreDataOutcome> {
    match data.first() {
        Some(&FAST_AUTH_SUCCESS) => Ok(MoreDataOutcome::Done),
        Some(&PERFORM_FULL_AUTH) => full_auth(password, salt, transport_is_secure, pem_path, transport),
        Some(&REQUEST_PUBLIC_KEY) => {
            tracing::warn!("unsolicited public-key request from caching_sha2_password server");
            Ok(MoreDataOutcome::Done)
        }
        other => {
            tracing::warn!(byte = ?other, "unexpected caching_sha2_password AuthMoreData byte");
            Ok(MoreDataOutcome::Done)
        }
    }
}

fn full_auth(
    password: &[u8],
    salt: &[u8],
    transport_is_secure: bool,
    pem_path: Option<&str>,
    transport: &mut dyn PacketTransport,
) -> Result<MoreDataOutcome> {
    if transport_is_secure {
        let mut response = password.to_vec();
        response.push(0);
        return Ok(MoreDataOutcome::Continue(response));
    }

    #[cfg(feature = "sha256")]
    {
        let pubkey = crate::mechanism::sha256::acquire_public_key(pem_path, transport)?;
        let mut masked = password.to_vec();
        masked.push(0);
        crate::crypto::xor_stream_inplace(&mut masked, salt);
        let ciphertext = crate::crypto::rsa_oaep_encrypt(&pubkey, &masked)?;
        Ok(MoreDataOutcome::Continue(ciphertext))
    }
    #[cfg(not(feature = "sha256"))]
    {
        let _ = (salt, pem_path, transport);
        Err(Error::NotImplemented(
            "caching_sha2_password full-auth over plaintext requires the sha256 feature",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockTransport;

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    #[test]
    fn empty_password_yields_empty_response() {
        assert_eq!(scramble(b"", &[0u8; 20]).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn rejects_salt_shorter_than_twenty_bytes() {
        assert!(matches!(
            scramble(b"secret", &[0u8; 10]),
            Err(Error::MalformedSalt)
        ));
    }

    #[test]
    fn scramble_is_thirty_two_bytes() {
        let salt: Vec<u8> = (1u8..=20).collect();
        let response = scramble(b"secret", &salt).unwrap();
        assert_eq!(response.len(), 32);
        assert_eq!(hex(&response).len(), 64);
    }

    #[test]
    fn fast_auth_success_needs_no_client_payload() {
        let mut transport = MockTransport::default();
        let outcome =
            handle_more_data(&[FAST_AUTH_SUCCESS], b"secret", &[1u8; 20], false, None, &mut transport)
                .unwrap();
        assert!(matches!(outcome, MoreDataOutcome::Done));
        assert!(transport.writes.is_empty());
    }

    #[test]
    fn full_auth_over_secure_transport_sends_cleartext() {
        let mut transport = MockTransport::default();
        let outcome = handle_more_data(
            &[PERFORM_FULL_AUTH],
            b"secret",
            &[1u8; 20],
            true,
            None,
            &mut transport,
        )
        .unwrap();
        match outcome {
            MoreDataOutcome::Continue(bytes) => assert_eq!(bytes, b"secret\0".to_vec()),
            MoreDataOutcome::Done => panic!("expected Continue"),
        }
    }
}
