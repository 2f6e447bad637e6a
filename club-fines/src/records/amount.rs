use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A non-negative amount of money: whole units plus a sub-unit in `0..=99`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount {
    value: u32,
    sub_unit: u8,
}

impl Amount {
    pub const ZERO: Amount = Amount {
        value: 0,
        sub_unit: 0,
    };

    /// Builds an amount, carrying sub-units of 100 or more into the whole part.
    pub fn new(value: u32, sub_unit: u32) -> Self {
        Self {
            value: value.saturating_add(sub_unit / 100),
            sub_unit: (sub_unit % 100) as u8,
        }
    }

    /// None for negative or non-finite numbers.
    pub fn from_f64(number: f64) -> Option<Self> {
        if !number.is_finite() || number < 0.0 || number > f64::from(u32::MAX) {
            return None;
        }
        let cents = (number * 100.0).round() as u64;
        let value = u32::try_from(cents / 100).ok()?;
        Some(Self::new(value, (cents % 100) as u32))
    }

    pub fn value(&self) -> u32 {
        self.value
    }

    pub fn sub_unit(&self) -> u8 {
        self.sub_unit
    }

    pub fn as_f64(&self) -> f64 {
        f64::from(self.value) + f64::from(self.sub_unit) / 100.0
    }

    fn cents(&self) -> u64 {
        u64::from(self.value) * 100 + u64::from(self.sub_unit)
    }

    fn from_cents(cents: u64) -> Self {
        let value = u32::try_from(cents / 100).unwrap_or(u32::MAX);
        Self::new(value, (cents % 100) as u32)
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Amount) -> Amount {
        Amount::from_cents(self.cents() + rhs.cents())
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, rhs: Amount) {
        *self = *self + rhs;
    }
}

/// Saturates at zero.
impl Sub for Amount {
    type Output = Amount;

    fn sub(self, rhs: Amount) -> Amount {
        Amount::from_cents(self.cents().saturating_sub(rhs.cents()))
    }
}

impl Mul<u32> for Amount {
    type Output = Amount;

    fn mul(self, count: u32) -> Amount {
        Amount::from_cents(self.cents().saturating_mul(u64::from(count)))
    }
}

impl std::iter::Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Amount {
        iter.fold(Amount::ZERO, Add::add)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.value, self.sub_unit)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let number = f64::deserialize(deserializer)?;
        Amount::from_f64(number).ok_or_else(|| {
            serde::de::Error::custom(format!("{number} is not a valid amount of money"))
        })
    }
}
