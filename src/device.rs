//! Device identifiers.
//!
//! Tracked devices are addressed by their IMEI. Validation happens here, before
//! any track is fetched; the segmentation engine never sees an invalid id.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Result, StrollError};

/// Number of leading ASCII digits a device identifier must start with.
pub const DEVICE_ID_DIGITS: usize = 15;

/// A validated device identifier.
///
/// Accepted when the trimmed input starts with 15 ASCII digits. Whatever follows
/// those digits is kept as part of the identifier and passed to the track source
/// unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceId(String);

impl DeviceId {
    /// Validate and wrap an identifier.
    ///
    /// # Example
    /// ```
    /// use stroll_tracker::DeviceId;
    ///
    /// assert!(DeviceId::parse("356938035643809").is_ok());
    /// assert!(DeviceId::parse("35693803564").is_err());
    /// ```
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let leading_digits = trimmed.bytes().take_while(u8::is_ascii_digit).count();
        if leading_digits < DEVICE_ID_DIGITS {
            return Err(StrollError::InvalidDeviceId {
                input: input.to_string(),
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DeviceId {
    type Err = StrollError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DeviceId {
    type Error = StrollError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<DeviceId> for String {
    fn from(id: DeviceId) -> Self {
        id.0
    }
}

impl AsRef<str> for DeviceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
