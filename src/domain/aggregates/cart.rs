//! Cart Aggregate

use rust_decimal::Decimal;

use crate::domain::aggregates::order::{self, OrderLine};
use crate::pricing::vat::VatSummary;

#[derive(Clone, Debug)]
pub struct Cart {
    session_id: String,
    lines: Vec<OrderLine>,
}

impl Cart {
    pub fn from_lines(session_id: impl Into<String>, lines: Vec<OrderLine>) -> Self {
        Self { session_id: session_id.into(), lines }
    }

    pub fn session_id(&self) -> &str { &self.session_id }
    pub fn lines(&self) -> &[OrderLine] { &self.lines }
    pub fn is_empty(&self) -> bool { self.lines.is_empty() }
    pub fn item_count(&self) -> i64 { self.lines.iter().map(|l| i64::from(l.quantity.max(0))).sum() }

    /// VAT-inclusive sum of the priced lines. Overflowing lines count as zero
    /// and an overflowing sum is zero.
    pub fn subtotal(&self) -> Decimal {
        self.lines
            .iter()
            .filter_map(|l| l.unit_price?.checked_mul(Decimal::from(l.quantity.max(0))))
            .try_fold(Decimal::ZERO, |acc, amount| acc.checked_add(amount))
            .unwrap_or_default()
    }

    pub fn vat_summary(&self) -> VatSummary { order::vat_summary(&self.lines) }
}
