//! Keyed hashing (HMAC) over the supported [`Algorithm`]s.

use hmac::{
    digest::{InvalidLength, KeyInit},
    Hmac, Mac,
};
use kode_core::Algorithm;
use sha1::Sha1;
use sha2::{Sha256, Sha512};

/// Failure of the underlying MAC primitive.
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    /// The MAC refused the given key.
    #[error("the given key has an invalid length")]
    KeyLength(#[from] InvalidLength),
}

type MacFn = fn(&[u8], &[u8]) -> Result<Vec<u8>, HashError>;

/// Look up the HMAC implementation for an algorithm.
fn mac_fn(algorithm: Algorithm) -> MacFn {
    match algorithm {
        Algorithm::Sha1 => compute::<Hmac<Sha1>>,
        Algorithm::Sha256 => compute::<Hmac<Sha256>>,
        Algorithm::Sha512 => compute::<Hmac<Sha512>>,
    }
}

/// Compute the HMAC of `message` under `key`. The result has the native digest size of the hash
/// function, see [`Algorithm::digest_len`].
pub fn hmac(key: &[u8], message: &[u8], algorithm: Algorithm) -> Result<Vec<u8>, HashError> {
    mac_fn(algorithm)(key, message)
}

fn compute<M: Mac + KeyInit>(key: &[u8], message: &[u8]) -> Result<Vec<u8>, HashError> {
    let mut mac = <M as KeyInit>::new_from_slice(key)?;
    Mac::update(&mut mac, message);

    Ok(mac.finalize().into_bytes().to_vec())
}
