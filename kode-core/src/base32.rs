//! Base32 ([RFC 4648]) conversion of account secrets.
//!
//! Authenticator secrets are usually typed or pasted by hand, so the default decoder is lenient:
//! any character outside of the base32 alphabet is skipped and no length checks are done. The
//! [`DecodeMode::Strict`] mode rejects such input instead.
//!
//! [RFC 4648]: https://www.rfc-editor.org/rfc/rfc4648

/// Error returned by the strict decoder. The lenient decoder never fails.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The input contained characters outside the alphabet or had an impossible length.
    #[error("invalid base32 secret")]
    Invalid(#[from] data_encoding::DecodeError),
}

/// How forgiving secret decoding should be.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DecodeMode {
    /// Skip any unknown characters.
    #[default]
    Lenient,
    /// Reject unknown characters and lengths that don't form whole bytes.
    Strict,
}

/// Decode the input according to the given `mode`.
pub fn decode_with(input: &str, mode: DecodeMode) -> Result<Vec<u8>, DecodeError> {
    match mode {
        DecodeMode::Lenient => Ok(decode(input)),
        DecodeMode::Strict => decode_strict(input),
    }
}

/// Decode a base32 string, ignoring case, trailing `=` padding and any character that is not part
/// of the alphabet. Leftover bits that don't fill a whole byte are dropped.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn decode(input: &str) -> Vec<u8> {
    let input = input.trim_end_matches('=');
    let mut output = Vec::with_capacity(input.len() * 5 / 8);
    let mut buffer = 0_u32;
    let mut bits = 0_u32;

    for value in input
        .bytes()
        .filter_map(|c| symbol_value(c.to_ascii_uppercase()))
    {
        buffer = (buffer << 5) | u32::from(value);
        bits += 5;

        if bits >= 8 {
            bits -= 8;
            output.push((buffer >> bits) as u8);
            buffer &= (1 << bits) - 1;
        }
    }

    output
}

/// Decode a base32 string, failing on anything but alphabet characters (in any case) followed by
/// optional `=` padding.
pub fn decode_strict(input: &str) -> Result<Vec<u8>, DecodeError> {
    let input = input.trim_end_matches('=').to_ascii_uppercase();
    data_encoding::BASE32_NOPAD
        .decode(input.as_bytes())
        .map_err(Into::into)
}

/// Encode raw bytes as padded base32 string.
#[must_use]
pub fn encode(data: &[u8]) -> String {
    data_encoding::BASE32.encode(data)
}

#[inline]
fn symbol_value(c: u8) -> Option<u8> {
    match c {
        b'A'..=b'Z' => Some(c - b'A'),
        b'2'..=b'7' => Some(c - b'2' + 26),
        _ => None,
    }
}
