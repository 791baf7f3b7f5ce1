use std::num::NonZeroU64;

use crate::{Account, Algorithm, Digits, Overrides};

/// Label used when the URL doesn't carry one.
const UNKNOWN_LABEL: &str = "Unknown";

/// Any error that can happen when parsing an [`Account`](crate::Account) from an URL.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The input didn't form a valid URL.
    #[error("the URL is not valid")]
    InvalidUri(#[from] url::ParseError),
    /// An unknown scheme was used in the URL.
    #[error("the scheme `{0}` is not supported, only `otpauth`")]
    UnsupportedScheme(String),
    /// The host part of the URL named an OTP type other than `totp`.
    #[error("OTP type is `{0}` but only `totp` is supported")]
    UnsupportedType(String),
    /// The required `secret` parameter is absent or empty.
    #[error("the `secret` parameter is missing")]
    MissingSecret,
    /// An optional parameter was present but held an unusable value.
    #[error("invalid value `{value}` for parameter `{name}`")]
    InvalidParameter { name: &'static str, value: String },
    /// The label was no proper UTF-8 after percent-decoding.
    #[error("string is not valid UTF-8")]
    InvalidUtf8(#[from] std::str::Utf8Error),
}

/// Account information as transported in an `otpauth://totp/...` URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedAccount {
    /// Account label, with any `issuer:` prefix removed.
    pub label: String,
    /// Issuer from the `issuer` parameter, or the label prefix if the parameter is absent.
    pub issuer: Option<String>,
    /// Base32 encoded secret, exactly as found in the URL.
    pub secret: String,
    /// Optional `algorithm`, `digits` and `period` parameters.
    pub overrides: Overrides,
}

impl ParsedAccount {
    /// Display name combining issuer and label, like `Example (alice@example.com)`.
    #[must_use]
    pub fn name(&self) -> String {
        match &self.issuer {
            Some(issuer) => format!("{issuer} ({})", self.label),
            None => self.label.clone(),
        }
    }
}

impl From<ParsedAccount> for Account {
    fn from(parsed: ParsedAccount) -> Self {
        Self {
            name: parsed.name(),
            secret: parsed.secret,
            overrides: parsed.overrides,
        }
    }
}

pub fn parse(value: &str) -> Result<ParsedAccount, ParseError> {
    let url = url::Url::parse(value)?;

    if url.scheme() != "otpauth" {
        return Err(ParseError::UnsupportedScheme(url.scheme().to_owned()));
    }

    let otp_type = url.host_str().unwrap_or_default();
    if !otp_type.eq_ignore_ascii_case("totp") {
        return Err(ParseError::UnsupportedType(otp_type.to_owned()));
    }

    let mut secret = None;
    let mut issuer = None;
    let mut overrides = Overrides::default();

    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "secret" => secret = Some(value.into_owned()),
            "issuer" => issuer = Some(value.into_owned()),
            "algorithm" => {
                overrides.algorithm = Some(
                    value
                        .parse::<Algorithm>()
                        .map_err(|_| invalid_param("algorithm", &value))?,
                );
            }
            "digits" => {
                overrides.digits = Some(
                    value
                        .parse::<u8>()
                        .ok()
                        .and_then(|d| Digits::try_from(d).ok())
                        .ok_or_else(|| invalid_param("digits", &value))?,
                );
            }
            "period" => {
                overrides.period = Some(
                    value
                        .parse::<NonZeroU64>()
                        .map_err(|_| invalid_param("period", &value))?,
                );
            }
            _ => {}
        }
    }

    let secret = secret
        .filter(|s| !s.is_empty())
        .ok_or(ParseError::MissingSecret)?;
    let issuer = issuer.filter(|i| !i.is_empty());

    let label = url.path().rsplit('/').next().unwrap_or_default();
    let label = percent_encoding::percent_decode_str(label).decode_utf8()?;

    let (label, label_issuer) = match label.split_once(':') {
        Some((prefix, label)) => (label.trim(), Some(prefix.trim())),
        None => (label.as_ref(), None),
    };
    let label = if label.is_empty() {
        UNKNOWN_LABEL
    } else {
        label
    };

    Ok(ParsedAccount {
        label: label.to_owned(),
        issuer: issuer.or_else(|| {
            label_issuer
                .filter(|i| !i.is_empty())
                .map(ToOwned::to_owned)
        }),
        secret,
        overrides,
    })
}

fn invalid_param(name: &'static str, value: &str) -> ParseError {
    ParseError::InvalidParameter {
        name,
        value: value.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_from_string() {
        let account = parse(
            "otpauth://totp/Example:alice@example.com?secret=JBSWY3DPEHPK3PXP&issuer=Example",
        )
        .unwrap();

        assert_eq!("Example (alice@example.com)", account.name());
        assert_eq!("JBSWY3DPEHPK3PXP", account.secret);
        assert!(account.overrides.is_empty());

        let account = Account::from(account);
        assert_eq!("Example (alice@example.com)", account.name);
        assert_eq!("JBSWY3DPEHPK3PXP", account.secret);
    }

    #[test]
    fn overrides_from_string() {
        let account = parse(
            "otpauth://totp/Test%20This:me?secret=JBSWY3DPEHPK3PXP&algorithm=sha256&digits=8&period=60",
        )
        .unwrap();
        let expect = ParsedAccount {
            label: "me".to_owned(),
            issuer: Some("Test This".to_owned()),
            secret: "JBSWY3DPEHPK3PXP".to_owned(),
            overrides: Overrides {
                algorithm: Some(Algorithm::Sha256),
                digits: Some(Digits::EIGHT),
                period: NonZeroU64::new(60),
            },
        };

        assert_eq!(expect, account);
    }

    #[test]
    fn plain_label() {
        let account = parse("otpauth://totp/alice?secret=JBSWY3DPEHPK3PXP").unwrap();
        assert_eq!("alice", account.name());
        assert_eq!(None, account.issuer);
    }

    #[test]
    fn issuer_from_label_prefix() {
        let account = parse("otpauth://totp/ACME:bob?secret=JBSWY3DPEHPK3PXP").unwrap();
        assert_eq!(Some("ACME"), account.issuer.as_deref());
        assert_eq!("ACME (bob)", account.name());

        let account =
            parse("otpauth://totp/ACME:bob?secret=JBSWY3DPEHPK3PXP&issuer=Other").unwrap();
        assert_eq!("Other (bob)", account.name());
    }

    #[test]
    fn empty_label() {
        let account = parse("otpauth://totp/?secret=JBSWY3DPEHPK3PXP&issuer=ACME").unwrap();
        assert_eq!("ACME (Unknown)", account.name());
    }

    #[test]
    fn unsupported_scheme() {
        assert!(matches!(
            parse("https://example.com"),
            Err(ParseError::UnsupportedScheme(s)) if s == "https"
        ));
    }

    #[test]
    fn unsupported_type() {
        assert!(matches!(
            parse("otpauth://hotp/Label?secret=JBSWY3DPEHPK3PXP&counter=1"),
            Err(ParseError::UnsupportedType(t)) if t == "hotp"
        ));
    }

    #[test]
    fn missing_secret() {
        assert!(matches!(
            parse("otpauth://totp/Label"),
            Err(ParseError::MissingSecret)
        ));
        assert!(matches!(
            parse("otpauth://totp/Label?secret="),
            Err(ParseError::MissingSecret)
        ));
    }

    #[test]
    fn invalid_uri() {
        assert!(matches!(
            parse("not a valid authenticator code"),
            Err(ParseError::InvalidUri(_))
        ));
    }

    #[test]
    fn invalid_parameters() {
        for (url, param) in [
            ("otpauth://totp/L?secret=AA&algorithm=md5", "algorithm"),
            ("otpauth://totp/L?secret=AA&digits=7", "digits"),
            ("otpauth://totp/L?secret=AA&digits=six", "digits"),
            ("otpauth://totp/L?secret=AA&period=0", "period"),
        ] {
            assert!(
                matches!(parse(url), Err(ParseError::InvalidParameter { name, .. }) if name == param),
                "{url}"
            );
        }
    }
}
