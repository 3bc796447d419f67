//! Analytics report, revenue trend and VAT rollup.

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::error::ApiResult;
use super::response::{success, ApiResponse};
use super::AppState;
use crate::analytics::{self, AnalyticsReport, DailyRevenue, Periods, TimeRange, TopProduct, VatRollup};
use crate::domain::aggregates::order;

const TOP_PRODUCTS: i64 = 10;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeQuery {
    pub time_range: Option<String>,
}

impl RangeQuery {
    fn range(&self) -> TimeRange {
        self.time_range.as_deref().map(TimeRange::parse).unwrap_or_default()
    }
}

pub async fn report(State(s): State<AppState>, Query(q): Query<RangeQuery>) -> ApiResult<Json<ApiResponse<AnalyticsReport>>> {
    let time_range = q.range();
    let period = time_range.windows(Utc::now());
    let (current, previous) = tokio::try_join!(s.store.period_totals(&period.current), s.store.period_totals(&period.previous))?;
    let (current_lines, previous_lines) =
        tokio::try_join!(s.store.lines_between(&period.current), s.store.lines_between(&period.previous))?;
    let metrics = analytics::rollup(&current, &previous, &order::vat_summary(&current_lines), &order::vat_summary(&previous_lines));

    let statuses = s.store.order_status_counts(&period.current).await?;
    let mut top_products = Vec::new();
    for sales in s.store.top_products(&period.current, TOP_PRODUCTS).await? {
        let previous_revenue = s.store.product_revenue(sales.product_id, &period.previous).await?;
        top_products.push(TopProduct::from_sales(sales, previous_revenue));
    }

    tracing::debug!(time_range = ?time_range, orders = current.orders, "analytics report built");
    let report = AnalyticsReport {
        metrics,
        order_status_distribution: analytics::status_distribution(&statuses),
        top_products,
        time_range,
        period,
    };
    Ok(success(report, "Analytics data retrieved successfully"))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueTrend {
    pub time_range: TimeRange,
    pub period: Periods,
    pub days: Vec<DailyRevenue>,
}

pub async fn revenue_trend(State(s): State<AppState>, Query(q): Query<RangeQuery>) -> ApiResult<Json<ApiResponse<RevenueTrend>>> {
    let time_range = q.range();
    let period = time_range.windows(Utc::now());
    let mut days = s.store.daily_revenue(period.current.start).await?;
    days.sort_by_key(|d| d.date);
    Ok(success(RevenueTrend { time_range, period, days }, "Revenue trend retrieved successfully"))
}

pub async fn vat_rollup(State(s): State<AppState>, Query(q): Query<RangeQuery>) -> ApiResult<Json<ApiResponse<VatRollup>>> {
    let time_range = q.range();
    let period = time_range.windows(Utc::now());
    let (current, previous) =
        tokio::try_join!(s.store.lines_between(&period.current), s.store.lines_between(&period.previous))?;
    let rollup = VatRollup::build(time_range, period, &order::vat_summary(&current), &order::vat_summary(&previous));
    Ok(success(rollup, "VAT analytics retrieved successfully"))
}
