//! Order Aggregate

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::aggregates::vat_profile::ProfileSummary;
use crate::pricing::vat::{self, LineItem, VatSummary};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus { #[default] Pending, Confirmed, Processing, Shipped, Delivered, Cancelled, Refunded }

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Confirmed => "CONFIRMED",
            Self::Processing => "PROCESSING",
            Self::Shipped => "SHIPPED",
            Self::Delivered => "DELIVERED",
            Self::Cancelled => "CANCELLED",
            Self::Refunded => "REFUNDED",
        }
    }
    /// Cancelled orders never count toward revenue.
    pub fn counts_as_revenue(&self) -> bool { *self != Self::Cancelled }
}

/// An order or cart line joined with its product, category and VAT profile.
/// Every joined column is optional because the related rows may be gone.
#[derive(Clone, Debug, Default, PartialEq, Eq, sqlx::FromRow)]
pub struct OrderLine {
    pub product_id: Option<i64>,
    pub product_name: Option<String>,
    pub quantity: i32,
    pub unit_price: Option<Decimal>,
    pub category_vat_rate: Option<Decimal>,
    pub profile_id: Option<i64>,
    pub profile_name: Option<String>,
    pub profile_name_is: Option<String>,
    pub profile_vat_rate: Option<Decimal>,
}

impl OrderLine {
    fn profile(&self) -> Option<ProfileSummary> {
        Some(ProfileSummary {
            id: self.profile_id?,
            name: self.profile_name.clone().unwrap_or_default(),
            name_is: self.profile_name_is.clone().unwrap_or_default(),
            vat_rate: self.profile_vat_rate.unwrap_or(Decimal::ZERO),
        })
    }

    /// None when the line has lost its product.
    pub fn to_line_item(&self) -> Option<LineItem> {
        let product_id = self.product_id?;
        let profile = self.profile();
        Some(LineItem {
            product_id: Some(product_id),
            product_name: self.product_name.clone(),
            quantity: u32::try_from(self.quantity).unwrap_or(0),
            unit_price: self.unit_price.unwrap_or(Decimal::ZERO),
            vat_rate: profile.as_ref().map(|p| p.vat_rate).or(self.category_vat_rate),
            profile,
        })
    }
}

/// VAT summary over joined lines; lines without a product are logged and skipped.
pub fn vat_summary(lines: &[OrderLine]) -> VatSummary {
    let items: Vec<LineItem> = lines
        .iter()
        .filter_map(|line| {
            let item = line.to_line_item();
            if item.is_none() {
                tracing::warn!(quantity = line.quantity, "order line missing product data, skipped from VAT");
            }
            item
        })
        .collect();
    vat::aggregate(&items)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(product_id: Option<i64>, price: i64, qty: i32, profile_rate: Option<i64>) -> OrderLine {
        OrderLine {
            product_id,
            product_name: Some("Víking Gylltur".into()),
            quantity: qty,
            unit_price: Some(Decimal::new(price, 0)),
            category_vat_rate: None,
            profile_id: profile_rate.map(|_| 1),
            profile_name: profile_rate.map(|_| "Standard".into()),
            profile_name_is: profile_rate.map(|_| "Almennt".into()),
            profile_vat_rate: profile_rate.map(|r| Decimal::new(r, 0)),
        }
    }

    #[test]
    fn test_vat_summary_skips_orphan_lines() {
        let lines = vec![line(Some(1), 5000, 2, Some(24)), line(None, 9999, 1, Some(24)), line(Some(2), 3000, 1, Some(24))];
        let summary = vat_summary(&lines);
        assert_eq!(summary.item_breakdowns.len(), 2);
        assert_eq!(summary.grand_total, Decimal::new(13000, 0));
        assert_eq!(summary.item_breakdowns[0].profile_id, Some(1));
    }

    #[test]
    fn test_legacy_category_rate_used_without_profile() {
        let mut l = line(Some(1), 1110, 1, None);
        l.category_vat_rate = Some(Decimal::new(11, 0));
        let item = l.to_line_item().unwrap();
        assert_eq!(item.vat_rate, Some(Decimal::new(11, 0)));
        assert!(item.profile.is_none());
    }

    #[test]
    fn test_cancelled_is_not_revenue() {
        assert!(!OrderStatus::Cancelled.counts_as_revenue());
        assert!(OrderStatus::Delivered.counts_as_revenue());
    }
}
