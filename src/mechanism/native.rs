//! `mysql_native_password`: the legacy SHA-1 challenge-response (spec §4.4.1).

use crate::crypto::{sha1, xor_block};
use crate::error::{Error, Result};

pub const NAME: &str = "mysql_native_password";

/// `SHA1(password) XOR SHA1(salt || SHA1(SHA1(password)))`.
pub fn scramble(password: &[u8], salt: &[u8]) -> Result<Vec<u8>> {
    if password.is_empty() {
        return Ok(Vec::new());
    }
    if salt.len() < 20 {
        return Err(Error::MalformedSalt);
    }
    let salt = &salt[..20];

    let stage1 = sha1(password);
    let stage2 = sha1(&stage1);
    let mut salted = Vec::with_capacity(40);
    salted.extend_from_slice(salt);
    salted.extend_from_slice(&stage2);
    let stage3 = sha1(&salted);

    let mut out = vec![0u8; 20];
    xor_block(&mut out, &stage1, &stage3, 20);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

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
    fn matches_reference_vector() {
        let salt: Vec<u8> = (1u8..=20).collect();
        let response = scramble(b"secret", &salt).unwrap();
        assert_eq!(hex(&response), "14e65579d9eb9b7e9c0e1c06d9f75f7a3e3f07d9");
    }

    #[test]
    fn response_is_self_inverting_against_sha1_password() {
        let salt = vec![3u8; 20];
        let response = scramble(b"hunter2", &salt).unwrap();
        let stage1 = crate::crypto::sha1(b"hunter2");
        let mut recovered_stage3 = vec![0u8; 20];
        xor_block(&mut recovered_stage3, &response, &stage1, 20);
        let stage2 = crate::crypto::sha1(&stage1);
        let mut salted = salt;
        salted.extend_from_slice(&stage2);
        assert_eq!(recovered_stage3, crate::crypto::sha1(&salted));
    }
}
