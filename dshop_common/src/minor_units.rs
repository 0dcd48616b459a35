use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

//--------------------------------------     MinorUnits      ---------------------------------------------------------
/// An amount of money expressed in the smallest unit of its currency (e.g. cents).
///
/// Order payloads carry totals as integers in minor units, so all arithmetic on them is integer arithmetic.
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, Eq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct MinorUnits(i64);

op!(binary MinorUnits, Add, add);
op!(binary MinorUnits, Sub, sub);
op!(inplace MinorUnits, SubAssign, sub_assign);
op!(unary MinorUnits, Neg, neg);

impl Sum for MinorUnits {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in minor units: {0}")]
pub struct MinorUnitsConversionError(String);

impl From<i64> for MinorUnits {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl TryFrom<u64> for MinorUnits {
    type Error = MinorUnitsConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        i64::try_from(value)
            .map(Self)
            .map_err(|_| MinorUnitsConversionError(format!("Value {value} is too large to convert to MinorUnits")))
    }
}

impl Display for MinorUnits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl MinorUnits {
    pub fn value(&self) -> i64 {
        self.0
    }

    /// Divides the amount by `divisor`, rounding towards negative infinity.
    ///
    /// A zero divisor yields zero.
    pub fn div_floor(&self, divisor: i64) -> Self {
        if divisor == 0 {
            return Self::default();
        }
        Self(self.0.div_euclid(divisor))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(MinorUnits::from(10050).to_string(), "100.50");
        assert_eq!(MinorUnits::from(7).to_string(), "0.07");
        assert_eq!(MinorUnits::from(-250).to_string(), "-2.50");
    }

    #[test]
    fn div_floor_rounds_down() {
        assert_eq!(MinorUnits::from(10050).div_floor(200), MinorUnits::from(50));
        assert_eq!(MinorUnits::from(199).div_floor(200), MinorUnits::from(0));
        assert_eq!(MinorUnits::from(400).div_floor(200), MinorUnits::from(2));
        assert_eq!(MinorUnits::from(400).div_floor(0), MinorUnits::from(0));
    }

    #[test]
    fn serde_is_transparent() {
        let v: MinorUnits = serde_json::from_str("1234").unwrap();
        assert_eq!(v.value(), 1234);
        assert_eq!(serde_json::to_string(&v).unwrap(), "1234");
    }
}
