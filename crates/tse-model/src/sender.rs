//! Sender dataset ids.
//!
//! A sender id has the shape `<orgCode><period>.<ordinal>`, e.g. `AT1706.00`:
//! organisation `AT`, period `1706` (June 2017) and version ordinal `0`.
//! Everything before the dot is the report code, which identifies one report
//! across all of its versions.

use std::fmt;
use std::str::FromStr;

use crate::error::{ModelError, Result};

/// A parsed sender dataset id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SenderId {
    report_code: String,
    ordinal: u32,
}

impl SenderId {
    /// Build a sender id from its parts.
    pub fn new(report_code: impl Into<String>, ordinal: u32) -> Self {
        Self {
            report_code: report_code.into(),
            ordinal,
        }
    }

    /// Parse a sender id, failing on a missing or non-numeric suffix.
    ///
    /// The report code must be ASCII letters and digits.
    pub fn parse(value: &str) -> Result<Self> {
        let value = value.trim();
        let (code, suffix) = value
            .rsplit_once('.')
            .ok_or_else(|| ModelError::MissingVersionSuffix(value.to_string()))?;

        if code.is_empty() || !code.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(ModelError::InvalidReportCode(value.to_string()));
        }

        if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ModelError::InvalidVersionSuffix {
                sender_id: value.to_string(),
                suffix: suffix.to_string(),
            });
        }

        let ordinal = suffix
            .parse::<u32>()
            .map_err(|_| ModelError::InvalidVersionSuffix {
                sender_id: value.to_string(),
                suffix: suffix.to_string(),
            })?;

        Ok(Self {
            report_code: code.to_string(),
            ordinal,
        })
    }

    /// Report code shared by all versions (`AT1706`).
    pub fn report_code(&self) -> &str {
        &self.report_code
    }

    /// Version ordinal (`0` for `.00`).
    pub fn ordinal(&self) -> u32 {
        self.ordinal
    }

    /// Sender id of the following version.
    pub fn next_version(&self) -> Self {
        Self::new(self.report_code.clone(), self.ordinal + 1)
    }

    /// Leading alphabetic organisation code (`AT`).
    pub fn org_code(&self) -> &str {
        let end = self
            .report_code
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(self.report_code.len());
        &self.report_code[..end]
    }

    /// Trailing period digits (`1706`).
    pub fn period(&self) -> &str {
        &self.report_code[self.org_code().len()..]
    }

    /// Reporting year decoded from a `YYMM` period.
    pub fn year(&self) -> Option<u16> {
        let period = self.period();
        if period.len() != 4 {
            return None;
        }
        period.get(..2)?.parse::<u16>().ok().map(|yy| 2000 + yy)
    }

    /// Reporting month decoded from a `YYMM` period.
    pub fn month(&self) -> Option<u8> {
        let period = self.period();
        if period.len() != 4 {
            return None;
        }
        period
            .get(2..)?
            .parse::<u8>()
            .ok()
            .filter(|m| (1..=12).contains(m))
    }
}

impl fmt::Display for SenderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.report_code, self.ordinal)
    }
}

impl FromStr for SenderId {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
