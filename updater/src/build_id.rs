//! Semantic wrapper for daily build numbers.
//!
//! This module provides the [`BuildId`] newtype so build numbers are passed
//! explicitly rather than as raw integers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

/// A daily build number, as used by the CI run counter and the mirror.
///
/// Build numbers are strictly positive. Ordering follows the numeric value,
/// which tracks build recency under normal operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct BuildId(NonZeroU32);

/// Errors arising from invalid build numbers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildIdError {
    /// Zero is not a valid build number.
    #[error("build number must be positive")]
    Zero,

    /// The input was not a decimal integer.
    #[error("invalid build number \"{value}\"")]
    Invalid {
        /// The rejected input.
        value: String,
    },
}

impl BuildId {
    /// Create a build id from a raw number.
    ///
    /// # Errors
    ///
    /// Returns [`BuildIdError::Zero`] when `value` is zero.
    ///
    /// # Examples
    ///
    /// ```
    /// use gtnh_updater::build_id::BuildId;
    ///
    /// let id = BuildId::new(482).expect("positive build number");
    /// assert_eq!(id.get(), 482);
    /// assert!(BuildId::new(0).is_err());
    /// ```
    pub fn new(value: u32) -> Result<Self, BuildIdError> {
        NonZeroU32::new(value).map(Self).ok_or(BuildIdError::Zero)
    }

    /// Return the raw build number.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }
}

impl TryFrom<u32> for BuildId {
    type Error = BuildIdError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BuildId> for u32 {
    fn from(id: BuildId) -> Self {
        id.get()
    }
}

impl FromStr for BuildId {
    type Err = BuildIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(BuildIdError::Invalid { value: s.to_owned() });
        }
        let value = s
            .parse::<u32>()
            .map_err(|_| BuildIdError::Invalid { value: s.to_owned() })?;
        Self::new(value)
    }
}

impl fmt::Display for BuildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "daily-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn display_uses_daily_prefix() {
        let id = BuildId::new(482).expect("valid id");
        assert_eq!(id.to_string(), "daily-482");
    }

    #[rstest]
    #[case::plain("77", 77)]
    #[case::leading_zeros("0042", 42)]
    fn parses_decimal_digits(#[case] input: &str, #[case] expected: u32) {
        let id: BuildId = input.parse().expect("valid id");
        assert_eq!(id.get(), expected);
    }

    #[rstest]
    #[case::empty("")]
    #[case::signed("+5")]
    #[case::negative("-5")]
    #[case::word("latest")]
    #[case::whitespace(" 5")]
    fn rejects_non_digit_input(#[case] input: &str) {
        assert!(matches!(
            input.parse::<BuildId>(),
            Err(BuildIdError::Invalid { .. })
        ));
    }

    #[test]
    fn rejects_zero() {
        assert_eq!("0".parse::<BuildId>(), Err(BuildIdError::Zero));
    }

    #[test]
    fn orders_by_numeric_value() {
        let older = BuildId::new(9).expect("valid id");
        let newer = BuildId::new(10).expect("valid id");
        assert!(older < newer);
    }

    #[test]
    fn serde_uses_plain_integer() {
        let id: BuildId = serde_json::from_str("482").expect("deserialize");
        assert_eq!(id.get(), 482);
        assert_eq!(serde_json::to_string(&id).expect("serialize"), "482");
        assert!(serde_json::from_str::<BuildId>("0").is_err());
    }
}
