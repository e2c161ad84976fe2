//! SHA-1 / SHA-256 one-shot digests, grounded on the stage1/stage2/stage3
//! hashing used by `mysql_native_password` and `caching_sha2_password`.

use sha1::Sha1;
use sha2::{Digest, Sha256};

pub fn sha1(data: &[u8]) -> [u8; 20] {
    let mut hasher = Sha1::new();
    hasher.update(data);
    hasher.finalize().into()
}

pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}
