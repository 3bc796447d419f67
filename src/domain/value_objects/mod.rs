//! Value Objects for pricing

use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Decimal places kept on every derived money amount.
pub const MONEY_DP: u32 = 2;

/// Round a money amount to cents, half away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// Convert a Decimal to f64 for ratio math.
pub fn to_f64(value: Decimal) -> f64 { value.to_f64().unwrap_or_default() }

/// Percentage value object, 0 to 100 inclusive. Used for VAT rates and discounts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Percentage(Decimal);

impl Percentage {
    pub fn new(value: Decimal) -> Result<Self, PercentageError> {
        if value.is_sign_negative() && !value.is_zero() { return Err(PercentageError::Negative); }
        if value > Decimal::ONE_HUNDRED { return Err(PercentageError::AboveHundred); }
        Ok(Self(value))
    }
    pub fn zero() -> Self { Self(Decimal::ZERO) }
    pub fn value(&self) -> Decimal { self.0 }
    /// The percentage as a fraction, e.g. 24 -> 0.24
    pub fn fraction(&self) -> Decimal { self.0 / Decimal::ONE_HUNDRED }
}

impl TryFrom<Decimal> for Percentage {
    type Error = PercentageError;
    fn try_from(value: Decimal) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<Percentage> for Decimal {
    fn from(p: Percentage) -> Self { p.0 }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}%", self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum PercentageError { Negative, AboveHundred }
impl std::error::Error for PercentageError {}
impl fmt::Display for PercentageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Negative => write!(f, "percentage must not be negative"),
            Self::AboveHundred => write!(f, "percentage must not exceed 100"),
        }
    }
}

/// validator hook for request fields that carry a percentage.
pub fn validate_percentage(value: &Decimal) -> Result<(), validator::ValidationError> {
    Percentage::new(*value).map(|_| ()).map_err(|_| {
        let mut err = validator::ValidationError::new("percentage_range");
        err.message = Some("must be between 0 and 100".into());
        err
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn test_round_money_half_up() {
        assert_eq!(round_money(Decimal::new(12345, 3)), Decimal::new(1235, 2));
        assert_eq!(round_money(Decimal::new(12344, 3)), Decimal::new(1234, 2));
    }
    #[test]
    fn test_percentage_bounds() {
        assert!(Percentage::new(Decimal::ZERO).is_ok());
        assert!(Percentage::new(Decimal::ONE_HUNDRED).is_ok());
        assert_eq!(Percentage::new(Decimal::new(-1, 0)), Err(PercentageError::Negative));
        assert_eq!(Percentage::new(Decimal::new(101, 0)), Err(PercentageError::AboveHundred));
        assert_eq!(Percentage::new(Decimal::new(24, 0)).unwrap().fraction(), Decimal::new(24, 2));
    }
    #[test]
    fn test_percentage_rejected_by_serde() {
        assert!(serde_json::from_str::<Percentage>("150").is_err());
        assert_eq!(serde_json::from_str::<Percentage>("25").unwrap().value(), Decimal::new(25, 0));
    }
}
