use secrecy::{ExposeSecret, Zeroize};

use crate::base32::{self, DecodeError, DecodeMode};

/// Raw secret bytes of an account, decoded from the stored base32 string right before use.
///
/// The content is wiped from memory when dropped and never serialized.
#[cfg_attr(test, derive(Debug, PartialEq))]
pub struct Key(Vec<u8>);

impl Key {
    #[must_use]
    pub fn new(content: Vec<u8>) -> Self {
        Self(content)
    }

    /// Decode a base32 encoded secret into a key.
    pub fn decode(secret: &str, mode: DecodeMode) -> Result<Self, DecodeError> {
        base32::decode_with(secret, mode).map(Self)
    }
}

impl Drop for Key {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl Zeroize for Key {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

impl ExposeSecret<Vec<u8>> for Key {
    fn expose_secret(&self) -> &Vec<u8> {
        &self.0
    }
}

#[cfg(test)]
impl secrecy::DebugSecret for Key {}
