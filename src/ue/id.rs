//! The UE identifier, the only primary key in the system

use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Positive integer identifying one simulated UE
///
/// Every resource name, subscriber number and slice selector is derived from
/// this value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u32")]
pub struct UeId(NonZeroU32);

impl UeId {
    /// The first id handed out
    pub const FIRST: UeId = UeId(NonZeroU32::MIN);

    /// Create an id, returning `None` for zero
    pub fn new(value: u32) -> Option<Self> {
        NonZeroU32::new(value).map(Self)
    }

    /// The raw numeric value
    pub fn get(self) -> u32 {
        self.0.get()
    }

    /// The id that follows this one
    pub fn next(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }
}

impl fmt::Display for UeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<UeId> for u32 {
    fn from(id: UeId) -> Self {
        id.get()
    }
}

impl TryFrom<u64> for UeId {
    type Error = Error;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        u32::try_from(value)
            .ok()
            .and_then(UeId::new)
            .ok_or_else(|| {
                Error::validation(format!("ue_id must be in 1..={}, got {value}", u32::MAX))
            })
    }
}

impl TryFrom<i64> for UeId {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u64::try_from(value)
            .map_err(|_| Error::validation(format!("ue_id must be positive, got {value}")))
            .and_then(UeId::try_from)
    }
}

impl FromStr for UeId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: u64 = s
            .parse()
            .map_err(|_| Error::validation(format!("ue_id is not a positive integer: {s:?}")))?;
        UeId::try_from(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_not_an_id() {
        assert!(UeId::new(0).is_none());
        assert_eq!(UeId::new(7).map(UeId::get), Some(7));
    }

    #[test]
    fn parses_from_path_segments() {
        assert_eq!("42".parse::<UeId>().unwrap().get(), 42);
        assert!("0".parse::<UeId>().is_err());
        assert!("-3".parse::<UeId>().is_err());
        assert!("ue3".parse::<UeId>().is_err());
        assert!("4294967296".parse::<UeId>().is_err());
    }

    #[test]
    fn signed_conversion_rejects_negatives() {
        assert!(UeId::try_from(-1i64).is_err());
        assert_eq!(UeId::try_from(9i64).unwrap().get(), 9);
    }

    #[test]
    fn serde_uses_the_bare_integer() {
        let id = UeId::new(12).unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "12");
        assert_eq!(serde_json::from_str::<UeId>("12").unwrap(), id);
        assert!(serde_json::from_str::<UeId>("0").is_err());
    }

    #[test]
    fn next_saturates_at_the_top() {
        assert_eq!(UeId::new(1).unwrap().next(), UeId::new(2));
        assert_eq!(UeId::new(u32::MAX).unwrap().next(), None);
    }
}
