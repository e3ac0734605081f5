//! Protocol version handling.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Negotiated protocol revision.
///
/// Versions are small integers. Early releases of the protocol used textual
/// version identifiers (`"0.2.1"` and friends); any string version is mapped
/// to [`ProtocolVersion::V0`] for backward compatibility.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct ProtocolVersion(u16);

impl ProtocolVersion {
    /// The legacy pre-integer-versioning revision.
    pub const V0: Self = Self(0);
    /// The first integer-versioned revision.
    pub const V1: Self = Self(1);
    /// The latest revision this codec speaks.
    pub const LATEST: Self = Self::V1;

    /// Creates a version from its integer value.
    #[must_use]
    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    /// Parses a wire value into a version.
    ///
    /// Integers must fit in `[0, 65535]`. Strings are legacy version
    /// identifiers and map to [`ProtocolVersion::V0`]. Anything else fails
    /// with `InvalidParams`.
    pub fn parse(raw: &Value) -> Result<Self> {
        match raw {
            Value::Number(_) => {
                let value = raw
                    .as_u64()
                    .and_then(|n| u16::try_from(n).ok())
                    .ok_or_else(|| {
                        Error::invalid_params(format!(
                            "protocol version must be an integer between 0 and {}",
                            u16::MAX
                        ))
                    })?;
                Ok(Self(value))
            }
            Value::String(_) => Ok(Self::V0),
            other => Err(Error::invalid_params(format!(
                "protocol version must be an integer or string, got {other}"
            ))),
        }
    }

    /// The integer value of this version.
    #[must_use]
    pub const fn value(self) -> u16 {
        self.0
    }
}

impl From<u16> for ProtocolVersion {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

impl From<ProtocolVersion> for u16 {
    fn from(version: ProtocolVersion) -> Self {
        version.0
    }
}

impl PartialEq<u16> for ProtocolVersion {
    fn eq(&self, other: &u16) -> bool {
        self.0 == *other
    }
}

impl std::fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
