/// Scheme-qualified bucket identifiers
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors produced while parsing a bucket identifier
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseBucketError {
    #[error("missing '://' separator in bucket identifier: {0}")]
    MissingSeparator(String),

    #[error("invalid scheme in bucket identifier: {0}")]
    InvalidScheme(String),

    #[error("empty bucket name in bucket identifier: {0}")]
    EmptyName(String),
}

/// A bucket addressed as `<scheme>://<name>`, e.g. `gs://photos` or `fs:///srv/data`.
///
/// The scheme picks the provider; the name is opaque to everything but that
/// provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BucketUri {
    scheme: String,
    name: String,
}

impl BucketUri {
    /// Build an identifier from its parts
    pub fn new(scheme: impl Into<String>, name: impl Into<String>) -> Result<Self, ParseBucketError> {
        let scheme = scheme.into();
        let name = name.into();
        let display = format!("{}://{}", scheme, name);

        let mut chars = scheme.chars();
        let valid_scheme = chars.next().is_some_and(|c| c.is_ascii_lowercase())
            && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "+-.".contains(c));
        if !valid_scheme {
            return Err(ParseBucketError::InvalidScheme(display));
        }
        if name.is_empty() {
            return Err(ParseBucketError::EmptyName(display));
        }

        Ok(Self { scheme, name })
    }

    /// Provider tag, e.g. `s3`, `gs`, `fs`
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Provider-specific bucket name
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl FromStr for BucketUri {
    type Err = ParseBucketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (scheme, name) = s
            .split_once("://")
            .ok_or_else(|| ParseBucketError::MissingSeparator(s.to_string()))?;
        Self::new(scheme, name)
    }
}

impl TryFrom<String> for BucketUri {
    type Error = ParseBucketError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BucketUri> for String {
    fn from(uri: BucketUri) -> Self {
        uri.to_string()
    }
}

impl fmt::Display for BucketUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_provider_buckets() {
        let gs: BucketUri = "gs://photos".parse().unwrap();
        assert_eq!(gs.scheme(), "gs");
        assert_eq!(gs.name(), "photos");

        let fs: BucketUri = "fs:///srv/mirror".parse().unwrap();
        assert_eq!(fs.scheme(), "fs");
        assert_eq!(fs.name(), "/srv/mirror");
    }

    #[test]
    fn test_rejects_malformed_identifiers() {
        assert!(matches!(
            "photos".parse::<BucketUri>(),
            Err(ParseBucketError::MissingSeparator(_))
        ));
        assert!(matches!(
            "://photos".parse::<BucketUri>(),
            Err(ParseBucketError::InvalidScheme(_))
        ));
        assert!(matches!(
            "S3://photos".parse::<BucketUri>(),
            Err(ParseBucketError::InvalidScheme(_))
        ));
        assert!(matches!(
            "s3://".parse::<BucketUri>(),
            Err(ParseBucketError::EmptyName(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_display_parses_back(
            scheme in "[a-z][a-z0-9]{0,4}",
            name in "[a-zA-Z0-9/_.-]{1,24}",
        ) {
            let uri = BucketUri::new(scheme.clone(), name.clone()).unwrap();
            let parsed: BucketUri = uri.to_string().parse().unwrap();
            prop_assert_eq!(parsed.scheme(), scheme.as_str());
            prop_assert_eq!(parsed.name(), name.as_str());
        }
    }
}
