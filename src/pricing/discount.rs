//! Product discounts: effective price and time-based status.
//!
//! A discount's status is never stored. It is derived on every read from the
//! wall clock and the optional start/end dates.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::value_objects::Percentage;

/// A discount ending within this many days is reported as expiring.
pub const EXPIRING_WITHIN_DAYS: i64 = 7;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Percentage discount attached to a product.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Discount {
    pub original_price: Decimal,
    pub percentage: Percentage,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub reason: Option<String>,
    pub reason_is: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountStatus {
    Inactive,
    Scheduled,
    Active,
    Expiring,
    Expired,
}

impl DiscountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inactive => "inactive",
            Self::Scheduled => "scheduled",
            Self::Active => "active",
            Self::Expiring => "expiring",
            Self::Expired => "expired",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "inactive" => Some(Self::Inactive),
            "scheduled" => Some(Self::Scheduled),
            "active" => Some(Self::Active),
            "expiring" => Some(Self::Expiring),
            "expired" => Some(Self::Expired),
            _ => None,
        }
    }

    /// Ordering used by the admin listing.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Active => 0,
            Self::Expiring => 1,
            Self::Scheduled => 2,
            Self::Expired => 3,
            Self::Inactive => 4,
        }
    }

    /// Whether the discounted price currently applies.
    pub fn in_effect(&self) -> bool { matches!(self, Self::Active | Self::Expiring) }
}

/// Status of an optional discount at `now`.
///
/// Conditions are checked in a fixed order: inactive, scheduled, expired,
/// expiring, active. The first match wins.
pub fn status(discount: Option<&Discount>, now: DateTime<Utc>) -> DiscountStatus {
    let Some(discount) = discount else {
        return DiscountStatus::Inactive;
    };
    if discount.start_date.is_some_and(|start| start > now) {
        return DiscountStatus::Scheduled;
    }
    if let Some(end) = discount.end_date {
        if end < now {
            return DiscountStatus::Expired;
        }
        if end - now <= Duration::days(EXPIRING_WITHIN_DAYS) {
            return DiscountStatus::Expiring;
        }
    }
    DiscountStatus::Active
}

/// `original * (1 - percent / 100)`, unrounded.
pub fn effective_price(original_price: Decimal, percentage: Percentage) -> Decimal {
    original_price * (Decimal::ONE - percentage.fraction())
}

/// Whole days (rounded up) until the discount starts when scheduled, or until
/// it ends when running with an end date.
pub fn days_remaining(discount: &Discount, now: DateTime<Utc>) -> Option<i64> {
    match status(Some(discount), now) {
        DiscountStatus::Scheduled => discount.start_date.map(|start| ceil_days(start - now)),
        DiscountStatus::Active | DiscountStatus::Expiring => discount.end_date.map(|end| ceil_days(end - now)),
        _ => None,
    }
}

fn ceil_days(span: Duration) -> i64 {
    let millis = span.num_milliseconds();
    millis.div_euclid(MILLIS_PER_DAY) + i64::from(millis.rem_euclid(MILLIS_PER_DAY) != 0)
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DiscountError {
    #[error("Original price must be greater than zero")]
    MissingOriginalPrice,
    #[error("Discount percentage must be between 0 and 100")]
    PercentageOutOfRange,
    #[error("Discount start date must not be after its end date")]
    StartAfterEnd,
}

/// Unvalidated discount as submitted by an admin.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountInput {
    pub original_price: Decimal,
    pub percentage: Decimal,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub reason: Option<String>,
    pub reason_is: Option<String>,
}

impl DiscountInput {
    pub fn into_discount(self) -> Result<Discount, DiscountError> {
        if self.original_price <= Decimal::ZERO {
            return Err(DiscountError::MissingOriginalPrice);
        }
        let percentage = Percentage::new(self.percentage).map_err(|_| DiscountError::PercentageOutOfRange)?;
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(DiscountError::StartAfterEnd);
            }
        }
        Ok(Discount {
            original_price: self.original_price,
            percentage,
            start_date: self.start_date,
            end_date: self.end_date,
            reason: self.reason.filter(|r| !r.is_empty()),
            reason_is: self.reason_is.filter(|r| !r.is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn discount(start: Option<Duration>, end: Option<Duration>, now: DateTime<Utc>) -> Discount {
        Discount {
            original_price: Decimal::new(1999, 0),
            percentage: Percentage::new(Decimal::new(25, 0)).unwrap(),
            start_date: start.map(|d| now + d),
            end_date: end.map(|d| now + d),
            reason: None,
            reason_is: None,
        }
    }

    #[test]
    fn test_status_transitions() {
        let now = Utc::now();
        assert_eq!(status(None, now), DiscountStatus::Inactive);
        assert_eq!(status(Some(&discount(None, Some(Duration::days(3)), now)), now), DiscountStatus::Expiring);
        assert_eq!(status(Some(&discount(None, Some(Duration::days(10)), now)), now), DiscountStatus::Active);
        assert_eq!(status(Some(&discount(None, None, now)), now), DiscountStatus::Active);
        assert_eq!(status(Some(&discount(None, Some(Duration::days(-1)), now)), now), DiscountStatus::Expired);
    }

    #[test]
    fn test_scheduled_wins_over_end_date() {
        let now = Utc::now();
        let d = discount(Some(Duration::days(2)), Some(Duration::days(-1)), now);
        assert_eq!(status(Some(&d), now), DiscountStatus::Scheduled);
        let d = discount(Some(Duration::days(2)), Some(Duration::days(3)), now);
        assert_eq!(status(Some(&d), now), DiscountStatus::Scheduled);
    }

    #[test]
    fn test_expiring_boundary_is_inclusive() {
        let now = Utc::now();
        let d = discount(None, Some(Duration::days(7)), now);
        assert_eq!(status(Some(&d), now), DiscountStatus::Expiring);
        let d = discount(None, Some(Duration::days(7) + Duration::seconds(1)), now);
        assert_eq!(status(Some(&d), now), DiscountStatus::Active);
    }

    #[test]
    fn test_effective_price() {
        let pct = Percentage::new(Decimal::new(25, 0)).unwrap();
        assert_eq!(effective_price(Decimal::new(1999, 0), pct), Decimal::new(149925, 2));
        assert_eq!(effective_price(Decimal::new(1999, 0), Percentage::zero()), Decimal::new(1999, 0));
    }

    #[test]
    fn test_days_remaining_rounds_up() {
        let now = Utc::now();
        let d = discount(None, Some(Duration::days(2) + Duration::hours(1)), now);
        assert_eq!(days_remaining(&d, now), Some(3));
        let d = discount(Some(Duration::hours(5)), None, now);
        assert_eq!(days_remaining(&d, now), Some(1));
        let d = discount(None, None, now);
        assert_eq!(days_remaining(&d, now), None);
        let d = discount(None, Some(Duration::days(-2)), now);
        assert_eq!(days_remaining(&d, now), None);
    }

    #[test]
    fn test_input_validation() {
        let now = Utc::now();
        let input = |price: i64, pct: i64, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>| DiscountInput {
            original_price: Decimal::new(price, 0),
            percentage: Decimal::new(pct, 0),
            start_date: start,
            end_date: end,
            reason: Some(String::new()),
            reason_is: None,
        };
        assert_eq!(input(0, 10, None, None).into_discount(), Err(DiscountError::MissingOriginalPrice));
        assert_eq!(input(100, 101, None, None).into_discount(), Err(DiscountError::PercentageOutOfRange));
        assert_eq!(input(100, -5, None, None).into_discount(), Err(DiscountError::PercentageOutOfRange));
        assert_eq!(
            input(100, 10, Some(now + Duration::days(2)), Some(now)).into_discount(),
            Err(DiscountError::StartAfterEnd)
        );
        let ok = input(100, 10, Some(now), Some(now + Duration::days(1))).into_discount().unwrap();
        assert_eq!(ok.reason, None);
    }
}
