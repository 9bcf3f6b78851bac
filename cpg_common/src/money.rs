use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Mul, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

//--------------------------------------     MicroUnit       ---------------------------------------------------------

/// An exact monetary amount, counted in the asset's minor units (e.g. micro-USDT).
///
/// Amounts are plain signed 64-bit integers so that accumulation never drifts; floating point is never used for
/// money anywhere in the gateway.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct MicroUnit(i64);

op!(binary MicroUnit, Add, add);
op!(binary MicroUnit, Sub, sub);
op!(inplace MicroUnit, SubAssign, sub_assign);
op!(unary MicroUnit, Neg, neg);

impl Mul<i64> for MicroUnit {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for MicroUnit {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in minor units: {0}")]
pub struct MicroUnitConversionError(String);

impl From<i64> for MicroUnit {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for MicroUnit {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for MicroUnit {}

impl TryFrom<u64> for MicroUnit {
    type Error = MicroUnitConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(MicroUnitConversionError(format!("Value {} is too large to convert to MicroUnit", value)))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Display for MicroUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}µ", self.0)
    }
}

impl MicroUnit {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// The fee portion of this amount at the given rate in basis points, rounded down.
    ///
    /// The intermediate product is widened to `i128` so that large amounts cannot overflow.
    pub fn fee_portion(&self, basis_points: u16) -> MicroUnit {
        let fee = (self.0 as i128 * i128::from(basis_points)) / 10_000;
        #[allow(clippy::cast_possible_truncation)]
        MicroUnit(fee as i64)
    }

    /// This amount less the fee at the given rate in basis points.
    pub fn less_fee(&self, basis_points: u16) -> MicroUnit {
        *self - self.fee_portion(basis_points)
    }
}
