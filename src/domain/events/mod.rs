//! Domain events
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "aggregate", content = "event", rename_all = "snake_case")]
pub enum DomainEvent {
    Discount(DiscountEvent),
    VatProfile(VatProfileEvent),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DiscountEvent {
    Set { product_id: i64, percentage: Decimal, price: Decimal },
    Removed { product_id: i64, restored_price: Decimal },
    Extended { product_id: i64, end_date: DateTime<Utc> },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VatProfileEvent {
    Created { profile_id: i64, vat_rate: Decimal },
    Updated { profile_id: i64, vat_rate: Decimal },
    Deleted { profile_id: i64 },
    CategoriesAssigned { profile_id: i64, category_ids: Vec<i64> },
}

impl DomainEvent {
    /// NATS subject the event is published on.
    pub fn subject(&self) -> String {
        let (aggregate, kind) = match self {
            Self::Discount(e) => ("discount", match e {
                DiscountEvent::Set { .. } => "set",
                DiscountEvent::Removed { .. } => "removed",
                DiscountEvent::Extended { .. } => "extended",
            }),
            Self::VatProfile(e) => ("vat_profile", match e {
                VatProfileEvent::Created { .. } => "created",
                VatProfileEvent::Updated { .. } => "updated",
                VatProfileEvent::Deleted { .. } => "deleted",
                VatProfileEvent::CategoriesAssigned { .. } => "categories_assigned",
            }),
        };
        format!("olfong.{aggregate}.{kind}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn test_subject_and_shape() {
        let e = DomainEvent::Discount(DiscountEvent::Removed { product_id: 4, restored_price: Decimal::new(2990, 0) });
        assert_eq!(e.subject(), "olfong.discount.removed");
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["aggregate"], "discount");
        assert_eq!(json["event"]["type"], "removed");
        assert_eq!(json["event"]["product_id"], 4);
    }
}
