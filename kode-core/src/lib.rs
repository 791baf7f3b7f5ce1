//! # Kode Core
//!
//! Core component of **Kode** that is shared between all other components and serves as building
//! block. It describes [`Account`]s and the global [`Settings`], which together hold everything
//! needed to create new OTPs, and contains the base32 and `otpauth` URL parsing logic.

#![deny(rust_2018_idioms, clippy::all, clippy::pedantic)]
#![allow(clippy::inline_always, clippy::missing_errors_doc)]

use std::{
    fmt::{self, Display},
    num::NonZeroU64,
    str::FromStr,
};

pub use key::Key;
pub use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

pub use self::base32::{DecodeError, DecodeMode};
#[cfg(feature = "otpurl")]
pub use self::url::{parse as parse_otpauth_uri, ParseError, ParsedAccount};

pub mod base32;
mod key;
#[cfg(feature = "otpurl")]
mod url;

/// Default refresh period of codes, in seconds.
pub const DEFAULT_PERIOD: NonZeroU64 = match NonZeroU64::new(30) {
    Some(v) => v,
    None => unreachable!(),
};

/// Hash function used inside the HMAC to create the final code.
///
/// Unknown names are rejected while parsing and never reach the generator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Algorithm {
    /// SHA-1 algorithm, most common.
    #[default]
    #[serde(rename = "SHA-1")]
    Sha1,
    /// SHA(2)-256 algorithm.
    #[serde(rename = "SHA-256")]
    Sha256,
    /// SHA(2)-512 algorithm.
    #[serde(rename = "SHA-512")]
    Sha512,
}

impl Algorithm {
    /// All supported algorithms.
    pub const ALL: [Self; 3] = [Self::Sha1, Self::Sha256, Self::Sha512];

    /// Size in bytes of the digest that the HMAC with this hash function produces.
    #[must_use]
    pub const fn digest_len(self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha256 => 32,
            Self::Sha512 => 64,
        }
    }

    /// Name as used in the `algorithm` parameter of `otpauth` URLs.
    #[must_use]
    pub const fn url_name(self) -> &'static str {
        match self {
            Self::Sha1 => "SHA1",
            Self::Sha256 => "SHA256",
            Self::Sha512 => "SHA512",
        }
    }
}

impl Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Sha1 => "SHA-1",
            Self::Sha256 => "SHA-256",
            Self::Sha512 => "SHA-512",
        })
    }
}

/// The given name doesn't describe any supported [`Algorithm`].
#[derive(Debug, thiserror::Error)]
#[error("unsupported algorithm `{0}`")]
pub struct UnknownAlgorithm(String);

impl FromStr for Algorithm {
    type Err = UnknownAlgorithm;

    /// Accepts both the `SHA-1` and the `SHA1` spelling, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.replace('-', "");
        Ok(if name.eq_ignore_ascii_case("sha1") {
            Self::Sha1
        } else if name.eq_ignore_ascii_case("sha256") {
            Self::Sha256
        } else if name.eq_ignore_ascii_case("sha512") {
            Self::Sha512
        } else {
            return Err(UnknownAlgorithm(s.to_owned()));
        })
    }
}

/// Amount of digits of a generated code. Only `6` and `8` are allowed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Digits(u8);

impl Digits {
    pub const SIX: Self = Self(6);
    pub const EIGHT: Self = Self(8);

    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl Default for Digits {
    fn default() -> Self {
        Self::SIX
    }
}

impl Display for Digits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Errors for invalid [`Settings`] values.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// The code length is neither 6 nor 8.
    #[error("code length must be 6 or 8, but got {0}")]
    Digits(u8),
}

impl TryFrom<u8> for Digits {
    type Error = SettingsError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            6 | 8 => Ok(Self(value)),
            _ => Err(SettingsError::Digits(value)),
        }
    }
}

impl From<Digits> for u8 {
    fn from(value: Digits) -> Self {
        value.0
    }
}

/// Global settings that apply to all accounts, unless overridden by a single account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Amount of digits of generated codes.
    pub code_length: Digits,
    /// Seconds that a code stays valid.
    pub refresh_period: NonZeroU64,
    /// Hash function for the HMAC.
    pub algorithm: Algorithm,
    /// Whether to write a daily backup of all accounts and settings.
    pub auto_backup: bool,
    /// Reject secrets that contain characters outside the base32 alphabet, instead of skipping
    /// them.
    pub strict_secrets: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            code_length: Digits::SIX,
            refresh_period: DEFAULT_PERIOD,
            algorithm: Algorithm::Sha1,
            auto_backup: false,
            strict_secrets: false,
        }
    }
}

impl Settings {
    #[must_use]
    pub fn decode_mode(&self) -> DecodeMode {
        if self.strict_secrets {
            DecodeMode::Strict
        } else {
            DecodeMode::Lenient
        }
    }
}

/// Per account values that take precedence over the global [`Settings`]. These usually come from
/// the parameters of an `otpauth` URL.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<Algorithm>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digits: Option<Digits>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<NonZeroU64>,
}

impl Overrides {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.algorithm.is_none() && self.digits.is_none() && self.period.is_none()
    }
}

/// Kode account, a named secret to create OTPs for a single service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
    /// Display name, unique among all accounts.
    pub name: String,
    /// Base32 encoded secret, only decoded right before generating a code.
    pub secret: String,
    /// Generation parameters specific to this account.
    pub overrides: Overrides,
}

impl Account {
    #[must_use]
    pub fn new(name: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            secret: secret.into(),
            overrides: Overrides::default(),
        }
    }

    /// Resolve the generation parameters for this account, preferring its own overrides over the
    /// global settings.
    #[must_use]
    pub fn params(&self, settings: &Settings) -> Params {
        Params {
            period: self.overrides.period.unwrap_or(settings.refresh_period),
            digits: self.overrides.digits.unwrap_or(settings.code_length).get(),
            algorithm: self.overrides.algorithm.unwrap_or(settings.algorithm),
            mode: settings.decode_mode(),
        }
    }
}

#[cfg(feature = "otpurl")]
impl FromStr for Account {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        crate::url::parse(s).map(Into::into)
    }
}

/// Everything besides the secret that is needed to generate a code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Params {
    /// Seconds per time window.
    pub period: NonZeroU64,
    /// Amount of digits in the code.
    pub digits: u8,
    /// Hash function for the HMAC.
    pub algorithm: Algorithm,
    /// How to decode the base32 secret.
    pub mode: DecodeMode,
}

impl Default for Params {
    fn default() -> Self {
        (&Settings::default()).into()
    }
}

impl From<&Settings> for Params {
    fn from(settings: &Settings) -> Self {
        Self {
            period: settings.refresh_period,
            digits: settings.code_length.get(),
            algorithm: settings.algorithm,
            mode: settings.decode_mode(),
        }
    }
}
