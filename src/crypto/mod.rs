//! Crypto primitives shared by the mechanisms (spec §4.1, component C1).
//!
//! No mechanism calls into a crypto backend directly; everything funnels
//! through here so the backend can be swapped in one place (spec §9 notes
//! the original's Windows/UNIX crypto fork and asks for exactly one
//! RSA-OAEP/SHA library instead).

mod sha;
mod xor;

pub use sha::{sha1, sha256};
pub use xor::{xor_block, xor_stream_inplace};

#[cfg(feature = "sha256")]
mod rsa_oaep;
#[cfg(feature = "sha256")]
pub use rsa_oaep::{parse_rsa_public_key_pem, rsa_oaep_encrypt, RsaPublicKey};
