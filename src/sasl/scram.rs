//! A single SCRAM exchange, generalized over SHA-1 and SHA-256 so the LDAP
//! mechanism can offer both profiles from one implementation (spec §4.4.5,
//! §4.7).

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use pbkdf2::pbkdf2;
use rand::distributions::Alphanumeric;
use rand::Rng;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScramVariant {
    Sha1,
    Sha256,
}

impl ScramVariant {
    fn hash(self, data: &[u8]) -> Vec<u8> {
        match self {
            ScramVariant::Sha1 => Sha1::digest(data).to_vec(),
            ScramVariant::Sha256 => Sha256::digest(data).to_vec(),
        }
    }

    fn hmac(self, key: &[u8], data: &[u8]) -> Vec<u8> {
        match self {
            ScramVariant::Sha1 => {
                let mut mac =
                    Hmac::<Sha1>::new_from_slice(key).expect("HMAC accepts keys of any length");
                mac.update(data);
                mac.finalize().into_bytes().to_vec()
            }
            ScramVariant::Sha256 => {
                let mut mac =
                    Hmac::<Sha256>::new_from_slice(key).expect("HMAC accepts keys of any length");
                mac.update(data);
                mac.finalize().into_bytes().to_vec()
            }
        }
    }

    fn pbkdf2_derive(self, password: &[u8], salt: &[u8], iterations: u32) -> Vec<u8> {
        match self {
            ScramVariant::Sha1 => {
                let mut out = vec![0u8; 20];
                pbkdf2::<Hmac<Sha1>>(password, salt, iterations, &mut out)
                    .expect("20-byte output is valid for HMAC-SHA1");
                out
            }
            ScramVariant::Sha256 => {
                let mut out = vec![0u8; 32];
                pbkdf2::<Hmac<Sha256>>(password, salt, iterations, &mut out)
                    .expect("32-byte output is valid for HMAC-SHA256");
                out
            }
        }
    }
}

#[derive(Debug)]
enum Stage {
    ClientFirstSent,
    ClientFinalSent {
        salted_password: Vec<u8>,
        auth_message: String,
    },
    Done,
}

/// One client-side SCRAM exchange, fed one server message at a time via
/// [`ScramClient::step`].
pub struct ScramClient {
    variant: ScramVariant,
    password: Vec<u8>,
    client_nonce: String,
    client_first_bare: String,
    stage: Stage,
}

impl std::fmt::Debug for ScramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScramClient")
            .field("variant", &self.variant)
            .field("password", &"[redacted]")
            .field("client_nonce", &self.client_nonce)
            .field("client_first_bare", &self.client_first_bare)
            .field("stage", &self.stage)
            .finish()
    }
}

impl ScramClient {
    pub fn new(variant: ScramVariant, username: &str, password: &[u8]) -> Self {
        let client_nonce: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(24)
            .map(char::from)
            .collect();
        let client_first_bare = format!("n={},r={}", saslprep_escape(username), client_nonce);
        Self {
            variant,
            password: password.to_vec(),
            client_nonce,
            client_first_bare,
            stage: Stage::ClientFirstSent,
        }
    }

    pub fn client_first(&self) -> Vec<u8> {
        format!("n,,{}", self.client_first_bare).into_bytes()
    }

    /// Feeds one server message; returns the client's reply, or `None` once
    /// the server's final signature has verified.
    pub fn step(&mut self, server_message: &[u8]) -> Result<Option<Vec<u8>>> {
        match std::mem::replace(&mut self.stage, Stage::Done) {
            Stage::ClientFirstSent => {
                let (client_final, salted_password, auth_message) =
                    self.process_server_first(server_message)?;
                self.stage = Stage::ClientFinalSent {
                    salted_password,
                    auth_message,
                };
                Ok(Some(client_final))
            }
            Stage::ClientFinalSent {
                salted_password,
                auth_message,
            } => {
                self.verify_server_final(server_message, &salted_password, &auth_message)?;
                Ok(None)
            }
            Stage::Done => Err(Error::SaslFailure("SCRAM exchange already completed".into())),
        }
    }

    fn process_server_first(&self, data: &[u8]) -> Result<(Vec<u8>, Vec<u8>, String)> {
        let text = std::str::from_utf8(data)
            .map_err(|_| Error::SaslFailure("server-first is not UTF-8".into()))?;

        let mut server_nonce = None;
        let mut salt_b64 = None;
        let mut iterations = None;
        for field in text.split(',') {
            if let Some(v) = field.strip_prefix("r=") {
                server_nonce = Some(v.to_string());
            } else if let Some(v) = field.strip_prefix("s=") {
                salt_b64 = Some(v.to_string());
            } else if let Some(v) = field.strip_prefix("i=") {
                iterations = v.parse::<u32>().ok();
            }
        }
        let server_nonce =
            server_nonce.ok_or_else(|| Error::SaslFailure("server-first missing nonce".into()))?;
        let salt_b64 =
            salt_b64.ok_or_else(|| Error::SaslFailure("server-first missing salt".into()))?;
        let iterations = iterations
            .ok_or_else(|| Error::SaslFailure("server-first missing iteration count".into()))?;

        if !server_nonce.starts_with(&self.client_nonce) {
            return Err(Error::SaslFailure(
                "server nonce does not extend client nonce".into(),
            ));
        }

        let salt = BASE64
            .decode(salt_b64.as_bytes())
            .map_err(|_| Error::SaslFailure("server-first salt is not valid base64".into()))?;
        let salted_password = self.variant.pbkdf2_derive(&self.password, &salt, iterations);

        let channel_binding = BASE64.encode("n,,");
        let client_final_without_proof = format!("c={channel_binding},r={server_nonce}");
        let auth_message = format!(
            "{},{},{}",
            self.client_first_bare, text, client_final_without_proof
        );

        let client_key = self.variant.hmac(&salted_password, b"Client Key");
        let stored_key = self.variant.hash(&client_key);
        let client_signature = self.variant.hmac(&stored_key, auth_message.as_bytes());
        let client_proof: Vec<u8> = client_key
            .iter()
            .zip(client_signature.iter())
            .map(|(a, b)| a ^ b)
            .collect();

        let client_final = format!(
            "{client_final_without_proof},p={}",
            BASE64.encode(&client_proof)
        );
        Ok((client_final.into_bytes(), salted_password, auth_message))
    }

    fn verify_server_final(
        &self,
        data: &[u8],
        salted_password: &[u8],
        auth_message: &str,
    ) -> Result<()> {
        let text = std::str::from_utf8(data)
            .map_err(|_| Error::SaslFailure("server-final is not UTF-8".into()))?;
        if let Some(err) = text.strip_prefix("e=") {
            return Err(Error::SaslFailure(format!(
                "server rejected SCRAM exchange: {err}"
            )));
        }
        let signature_b64 = text
            .strip_prefix("v=")
            .ok_or_else(|| Error::SaslFailure("server-final missing signature".into()))?;
        let expected = BASE64
            .decode(signature_b64.as_bytes())
            .map_err(|_| Error::SaslFailure("server-final signature is not valid base64".into()))?;

        let server_key = self.variant.hmac(salted_password, b"Server Key");
        let server_signature = self.variant.hmac(&server_key, auth_message.as_bytes());

        if server_signature.ct_eq(&expected).unwrap_u8() != 1 {
            return Err(Error::SaslFailure("server signature mismatch".into()));
        }
        Ok(())
    }
}

fn saslprep_escape(name: &str) -> String {
    name.replace('=', "=3D").replace(',', "=2C")
}
