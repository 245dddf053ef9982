use std::{
    fmt::Display,
    ops::{Add, AddAssign},
};

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const CURRENCY_CODE: &str = "INR";

//--------------------------------------        Paise        ---------------------------------------------------------
/// An amount of Indian rupees, held in paise.
///
/// Over JSON, amounts travel as rupee numbers (e.g. `499.5`), which is what storefront clients send and expect. Inside
/// the system, and in the database, the integer number of paise is used.
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, Eq, Ord, PartialOrd, Hash)]
#[sqlx(transparent)]
pub struct Paise(i64);

op!(binary Paise, Add, add);
op!(inplace Paise, AddAssign, add_assign);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Value cannot be represented as an amount in paise: {0}")]
pub struct PaiseConversionError(String);

impl From<i64> for Paise {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl Display for Paise {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}₹{}.{:02}", abs / 100, abs % 100)
    }
}

impl Paise {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn from_rupees(rupees: i64) -> Self {
        Self(rupees * 100)
    }

    /// Converts a rupee amount, as supplied by a client, into paise. Fractions of a paisa are rounded to the nearest
    /// paisa. Negative, infinite and NaN values are rejected, as are values too large to be held in paise.
    pub fn try_from_rupees(rupees: f64) -> Result<Self, PaiseConversionError> {
        if !rupees.is_finite() {
            return Err(PaiseConversionError(format!("{rupees} is not a finite number")));
        }
        if rupees < 0.0 {
            return Err(PaiseConversionError(format!("{rupees} is negative")));
        }
        let paise = (rupees * 100.0).round();
        if paise >= i64::MAX as f64 {
            return Err(PaiseConversionError(format!("{rupees} is too large")));
        }
        #[allow(clippy::cast_possible_truncation)]
        Ok(Self(paise as i64))
    }

    /// The amount in rupees, for display purposes and for the JSON representation.
    #[allow(clippy::cast_precision_loss)]
    pub fn as_rupees(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    pub fn checked_mul(self, rhs: i64) -> Option<Self> {
        self.0.checked_mul(rhs).map(Self)
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }
}

impl Serialize for Paise {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_rupees())
    }
}

impl<'de> Deserialize<'de> for Paise {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let rupees = f64::deserialize(deserializer)?;
        Paise::try_from_rupees(rupees).map_err(de::Error::custom)
    }
}
