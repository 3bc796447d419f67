//! Product Aggregate

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::events::{DiscountEvent, DomainEvent};
use crate::domain::value_objects::Percentage;
use crate::pricing::discount::{self, Discount, DiscountStatus};

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    id: i64,
    name: String,
    name_is: Option<String>,
    price: Decimal,
    category_id: Option<i64>,
    is_active: bool,
    discount: Option<Discount>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

/// Flat product row as stored.
#[derive(Clone, Debug, PartialEq, Eq, sqlx::FromRow)]
pub struct ProductRecord {
    pub id: i64,
    pub name: String,
    pub name_is: Option<String>,
    pub price: Decimal,
    pub category_id: Option<i64>,
    pub is_active: bool,
    pub has_discount: bool,
    pub original_price: Option<Decimal>,
    pub discount_percentage: Option<Decimal>,
    pub discount_start_date: Option<DateTime<Utc>>,
    pub discount_end_date: Option<DateTime<Utc>>,
    pub discount_reason: Option<String>,
    pub discount_reason_is: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProductRecord> for Product {
    fn from(r: ProductRecord) -> Self {
        let discount = match (r.has_discount, r.original_price, r.discount_percentage) {
            (true, Some(original_price), Some(pct)) => Some(Discount {
                original_price,
                percentage: Percentage::new(pct).unwrap_or_else(|_| Percentage::zero()),
                start_date: r.discount_start_date,
                end_date: r.discount_end_date,
                reason: r.discount_reason,
                reason_is: r.discount_reason_is,
            }),
            _ => None,
        };
        Self {
            id: r.id, name: r.name, name_is: r.name_is, price: r.price, category_id: r.category_id,
            is_active: r.is_active, discount, updated_at: r.updated_at, events: vec![],
        }
    }
}

impl Product {
    pub fn create(id: i64, name: impl Into<String>, price: Decimal) -> Self {
        Self {
            id, name: name.into(), name_is: None, price, category_id: None, is_active: true,
            discount: None, updated_at: Utc::now(), events: vec![],
        }
    }

    pub fn in_category(mut self, category_id: i64) -> Self { self.category_id = Some(category_id); self }

    pub fn id(&self) -> i64 { self.id }
    pub fn name(&self) -> &str { &self.name }
    pub fn name_is(&self) -> Option<&str> { self.name_is.as_deref() }
    pub fn price(&self) -> Decimal { self.price }
    pub fn category_id(&self) -> Option<i64> { self.category_id }
    pub fn is_active(&self) -> bool { self.is_active }
    pub fn discount(&self) -> Option<&Discount> { self.discount.as_ref() }
    pub fn discount_status(&self, now: DateTime<Utc>) -> DiscountStatus { discount::status(self.discount.as_ref(), now) }

    /// Replaces any existing discount and reprices from the original price.
    pub fn set_discount(&mut self, d: Discount) {
        self.price = discount::effective_price(d.original_price, d.percentage);
        self.raise_event(DomainEvent::Discount(DiscountEvent::Set {
            product_id: self.id, percentage: d.percentage.value(), price: self.price,
        }));
        self.discount = Some(d);
        self.touch();
    }

    /// Restores the original price. Returns false when there was no discount.
    pub fn remove_discount(&mut self) -> bool {
        let Some(d) = self.discount.take() else { return false };
        self.price = d.original_price;
        self.raise_event(DomainEvent::Discount(DiscountEvent::Removed { product_id: self.id, restored_price: self.price }));
        self.touch();
        true
    }

    /// Pushes the end date forward. Open-ended discounts are left alone.
    pub fn extend_discount(&mut self, days: i64) -> bool {
        let Some(end) = self.discount.as_mut().and_then(|d| d.end_date.as_mut()) else { return false };
        *end += Duration::days(days);
        let end_date = *end;
        self.raise_event(DomainEvent::Discount(DiscountEvent::Extended { product_id: self.id, end_date }));
        self.touch();
        true
    }

    pub fn to_record(&self) -> ProductRecord {
        let d = self.discount.as_ref();
        ProductRecord {
            id: self.id,
            name: self.name.clone(),
            name_is: self.name_is.clone(),
            price: self.price,
            category_id: self.category_id,
            is_active: self.is_active,
            has_discount: d.is_some(),
            original_price: d.map(|d| d.original_price),
            discount_percentage: d.map(|d| d.percentage.value()),
            discount_start_date: d.and_then(|d| d.start_date),
            discount_end_date: d.and_then(|d| d.end_date),
            discount_reason: d.and_then(|d| d.reason.clone()),
            discount_reason_is: d.and_then(|d| d.reason_is.clone()),
            updated_at: self.updated_at,
        }
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}
