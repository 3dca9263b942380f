use crate::types::errors::AmountError;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Money in the smallest currency unit.
///
/// Store exports sometimes render integer columns as `50000.00`, so a fraction
/// is accepted when it is all zeros and rejected otherwise.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub fn new(value: i64) -> Self {
        Amount(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    //NOTE: Saturates at i64::MAX instead of wrapping
    pub fn saturating_add(self, rhs: Amount) -> Amount {
        Amount(self.0.saturating_add(rhs.0))
    }
}

impl Display for Amount {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();

        if value.is_empty() {
            return Err(AmountError::InvalidFormat("Value is an empty string".to_string()));
        }

        let (integer, fraction) = match value.split_once('.') {
            Some((integer, fraction)) => (integer, Some(fraction)),
            None => (value, None)
        };

        if let Some(fraction) = fraction {
            if fraction.contains('.') {
                return Err(AmountError::InvalidFormat("Value has more than one decimal point".to_string()));
            }

            if !fraction.chars().all(|c| c == '0') {
                return Err(AmountError::InvalidFormat(format!("Value [{value}] is not a whole number of units")));
            }
        }

        if integer.is_empty() || integer == "-" || integer == "+" {
            return Err(AmountError::InvalidFormat(format!("Value [{value}] has no integer part")));
        }

        Ok(Amount(integer.parse()?))
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(self.0)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Amount::from_str(&value).map_err(de::Error::custom)
    }
}
