//! Data access seam.
//!
//! Handlers receive an `Arc<dyn Store>` through the router state. The
//! Postgres implementation backs the service; the in-memory one backs tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::analytics::{AnalyticsWindow, DailyRevenue, PeriodTotals, ProductSales, StatusCount};
use crate::domain::aggregates::{Category, NewVatProfile, OrderLine, Product, Setting, VatProfile, VatProfileChanges};
use crate::Result;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait Store: Send + Sync {
    // VAT profiles
    async fn list_vat_profiles(&self) -> Result<Vec<VatProfile>>;
    async fn get_vat_profile(&self, id: i64) -> Result<Option<VatProfile>>;
    /// Clears the default flag elsewhere when the new profile is the default.
    async fn create_vat_profile(&self, profile: NewVatProfile) -> Result<VatProfile>;
    async fn update_vat_profile(&self, id: i64, changes: VatProfileChanges) -> Result<Option<VatProfile>>;
    async fn delete_vat_profile(&self, id: i64) -> Result<()>;
    async fn count_profile_categories(&self, id: i64) -> Result<i64>;
    async fn assign_categories(&self, profile_id: i64, category_ids: &[i64]) -> Result<()>;
    async fn get_category(&self, id: i64) -> Result<Option<Category>>;

    // Products
    async fn get_product(&self, id: i64) -> Result<Option<Product>>;
    /// Writes price and discount columns only.
    async fn save_product_pricing(&self, product: &Product) -> Result<()>;
    async fn products_with_discounts(&self) -> Result<Vec<Product>>;

    // Orders and carts
    /// None when the order does not exist.
    async fn order_lines(&self, order_id: i64) -> Result<Option<Vec<OrderLine>>>;
    async fn cart_lines(&self, session_id: &str) -> Result<Vec<OrderLine>>;

    // Analytics
    async fn period_totals(&self, window: &AnalyticsWindow) -> Result<PeriodTotals>;
    async fn order_status_counts(&self, window: &AnalyticsWindow) -> Result<Vec<StatusCount>>;
    async fn top_products(&self, window: &AnalyticsWindow, limit: i64) -> Result<Vec<ProductSales>>;
    async fn product_revenue(&self, product_id: i64, window: &AnalyticsWindow) -> Result<Decimal>;
    /// Lines of non-cancelled orders placed inside the window.
    async fn lines_between(&self, window: &AnalyticsWindow) -> Result<Vec<OrderLine>>;
    async fn daily_revenue(&self, since: DateTime<Utc>) -> Result<Vec<DailyRevenue>>;

    // Settings
    async fn settings(&self, category: &str) -> Result<Vec<Setting>>;
}
