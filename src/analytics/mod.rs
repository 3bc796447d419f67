//! Analytics rollup: metrics over a window compared with the window before it.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::to_f64;
use crate::pricing::vat::{self, ProfileVatTotal, VatSummary};

/// Percentage change from `previous` to `current`.
///
/// A zero baseline reports 100 when anything happened and 0 otherwise.
pub fn growth(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        return if current > 0.0 { 100.0 } else { 0.0 };
    }
    ((current - previous) / previous) * 100.0
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeRange {
    #[serde(rename = "7d")]
    Week,
    #[default]
    #[serde(rename = "30d")]
    Month,
    #[serde(rename = "90d")]
    Quarter,
    #[serde(rename = "1y")]
    Year,
}

impl TimeRange {
    /// Unknown values fall back to 30 days.
    pub fn parse(value: &str) -> Self {
        match value {
            "7d" => Self::Week,
            "90d" => Self::Quarter,
            "1y" => Self::Year,
            _ => Self::Month,
        }
    }

    pub fn days(&self) -> i64 {
        match self {
            Self::Week => 7,
            Self::Month => 30,
            Self::Quarter => 90,
            Self::Year => 365,
        }
    }

    /// Current window ending at `now` and the equal-length window before it.
    pub fn windows(&self, now: DateTime<Utc>) -> Periods {
        let span = Duration::days(self.days());
        let current = AnalyticsWindow { start: now - span, end: now };
        Periods { previous: current.preceding(), current }
    }
}

/// Inclusive time window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct AnalyticsWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl AnalyticsWindow {
    pub fn contains(&self, at: DateTime<Utc>) -> bool { at >= self.start && at <= self.end }

    pub fn preceding(&self) -> Self {
        let span = self.end - self.start;
        Self { start: self.start - span, end: self.start }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Periods {
    pub current: AnalyticsWindow,
    pub previous: AnalyticsWindow,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Metric {
    pub current: f64,
    pub previous: f64,
    pub growth: f64,
}

impl Metric {
    pub fn compare(current: f64, previous: f64) -> Self {
        Self { current, previous, growth: growth(current, previous) }
    }
}

/// Raw counts for one window.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PeriodTotals {
    pub revenue: Decimal,
    pub orders: i64,
    pub customers: i64,
    pub products: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Metrics {
    pub revenue: Metric,
    pub orders: Metric,
    pub customers: Metric,
    pub products: Metric,
    pub vat: Metric,
}

/// Each metric is compared independently against the previous window.
pub fn rollup(current: &PeriodTotals, previous: &PeriodTotals, current_vat: &VatSummary, previous_vat: &VatSummary) -> Metrics {
    Metrics {
        revenue: Metric::compare(to_f64(current.revenue), to_f64(previous.revenue)),
        orders: Metric::compare(current.orders as f64, previous.orders as f64),
        customers: Metric::compare(current.customers as f64, previous.customers as f64),
        products: Metric::compare(current.products as f64, previous.products as f64),
        vat: Metric::compare(to_f64(current_vat.total_vat), to_f64(previous_vat.total_vat)),
    }
}

#[derive(Clone, Debug, PartialEq, Eq, sqlx::FromRow)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StatusShare {
    pub status: String,
    pub count: i64,
    pub percentage: f64,
}

pub fn status_distribution(counts: &[StatusCount]) -> Vec<StatusShare> {
    let total: i64 = counts.iter().map(|c| c.count).sum();
    counts
        .iter()
        .map(|c| StatusShare {
            status: c.status.clone(),
            count: c.count,
            percentage: if total > 0 { c.count as f64 / total as f64 * 100.0 } else { 0.0 },
        })
        .collect()
}

/// Units sold and revenue for one product in a window.
#[derive(Clone, Debug, PartialEq, Eq, sqlx::FromRow)]
pub struct ProductSales {
    pub product_id: i64,
    pub name: Option<String>,
    pub name_is: Option<String>,
    pub category: Option<String>,
    pub category_is: Option<String>,
    pub quantity: i64,
    pub revenue: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopProduct {
    pub id: i64,
    pub name: String,
    pub name_is: String,
    pub category: String,
    pub category_is: String,
    pub sales: i64,
    pub revenue: Decimal,
    pub growth: f64,
}

impl TopProduct {
    pub fn from_sales(sales: ProductSales, previous_revenue: Decimal) -> Self {
        Self {
            id: sales.product_id,
            name: sales.name.unwrap_or_else(|| "Unknown Product".to_string()),
            name_is: sales.name_is.unwrap_or_else(|| "Óþekkt vara".to_string()),
            category: sales.category.unwrap_or_else(|| "Unknown".to_string()),
            category_is: sales.category_is.unwrap_or_else(|| "Óþekkt flokkur".to_string()),
            sales: sales.quantity,
            growth: growth(to_f64(sales.revenue), to_f64(previous_revenue)),
            revenue: sales.revenue,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct DailyRevenue {
    pub date: NaiveDate,
    pub revenue: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    pub metrics: Metrics,
    pub order_status_distribution: Vec<StatusShare>,
    pub top_products: Vec<TopProduct>,
    pub time_range: TimeRange,
    pub period: Periods,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VatRollup {
    pub time_range: TimeRange,
    pub period: Periods,
    pub total_before_vat: Decimal,
    pub total_vat: Decimal,
    pub grand_total: Decimal,
    pub by_profile: Vec<ProfileVatTotal>,
    pub vat: Metric,
}

impl VatRollup {
    pub fn build(time_range: TimeRange, period: Periods, current: &VatSummary, previous: &VatSummary) -> Self {
        Self {
            time_range,
            period,
            total_before_vat: current.total_before_vat,
            total_vat: current.total_vat,
            grand_total: current.grand_total,
            by_profile: vat::vat_by_profile(current),
            vat: Metric::compare(to_f64(current.total_vat), to_f64(previous.total_vat)),
        }
    }
}
