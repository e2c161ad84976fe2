//! RSA-OAEP public-key encryption for `sha256_password` / full-auth
//! `caching_sha2_password` (spec §4.1). SHA-1 is the OAEP hash, matching
//! the wire format MySQL servers expect since 8.0.5.

use rand::rngs::OsRng;
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs8::DecodePublicKey;
use rsa::Oaep;

use crate::error::{Error, Result};

pub struct RsaPublicKey(rsa::RsaPublicKey);

/// Parses a PEM-encoded RSA public key, accepting both PKCS#1
/// (`RSA PUBLIC KEY`) and SubjectPublicKeyInfo (`PUBLIC KEY`) framings --
/// servers have shipped both over the years.
pub fn parse_rsa_public_key_pem(pem: &[u8]) -> Result<RsaPublicKey> {
    let text = std::str::from_utf8(pem).map_err(|_| Error::BadPublicKey)?;
    rsa::RsaPublicKey::from_public_key_pem(text)
        .or_else(|_| rsa::RsaPublicKey::from_pkcs1_pem(text))
        .map(RsaPublicKey)
        .map_err(|_| Error::BadPublicKey)
}

/// Encrypts `plaintext` under `pubkey` with PKCS#1 OAEP / SHA-1.
///
/// Fails with [`Error::PasswordTooLong`] if the key is too small to carry
/// `plaintext` under OAEP padding (`key_size_bytes <= len(plaintext) + 41`
/// for a SHA-1 OAEP hash).
pub fn rsa_oaep_encrypt(pubkey: &RsaPublicKey, plaintext: &[u8]) -> Result<Vec<u8>> {
    let key_size_bytes = rsa::traits::PublicKeyParts::size(&pubkey.0);
    if key_size_bytes <= plaintext.len() + 41 {
        return Err(Error::PasswordTooLong);
    }
    let padding = Oaep::new::<sha1::Sha1>();
    pubkey
        .0
        .encrypt(&mut OsRng, padding, plaintext)
        .map_err(|_| Error::PasswordTooLong)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::pkcs8::EncodePublicKey;
    use rsa::RsaPrivateKey;

    fn test_key(bits: usize) -> (RsaPrivateKey, RsaPublicKey) {
        let mut rng = OsRng;
        let priv_key = RsaPrivateKey::new(&mut rng, bits).unwrap();
        let pub_key = rsa::RsaPublicKey::from(&priv_key);
        (priv_key, RsaPublicKey(pub_key))
    }

    #[test]
    fn encrypt_then_decrypt_roundtrips() {
        let (priv_key, pub_key) = test_key(2048);
        let plaintext = b"hunter2\0";
        let ciphertext = rsa_oaep_encrypt(&pub_key, plaintext).unwrap();
        let padding = Oaep::new::<sha1::Sha1>();
        let decrypted = priv_key.decrypt(padding, &ciphertext).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn rejects_plaintext_too_large_for_key() {
        let (_priv, pub_key) = test_key(512);
        // 512-bit key -> 64-byte modulus; 64 - 41 = 23 usable bytes.
        let plaintext = vec![0u8; 30];
        assert!(matches!(
            rsa_oaep_encrypt(&pub_key, &plaintext),
            Err(Error::PasswordTooLong)
        ));
    }

    #[test]
    fn parses_both_pem_framings() {
        let (_priv, pub_key) = test_key(1024);
        let spki_pem = pub_key
            .0
            .to_public_key_pem(rsa::pkcs8::LineEnding::LF)
            .unwrap();
        let parsed = parse_rsa_public_key_pem(spki_pem.as_bytes()).unwrap();
        assert_eq!(
            rsa::traits::PublicKeyParts::n(&parsed.0),
            rsa::traits::PublicKeyParts::n(&pub_key.0)
        );
    }
}
