//! PostgreSQL store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::collections::HashMap;

use super::Store;
use crate::analytics::{AnalyticsWindow, DailyRevenue, PeriodTotals, ProductSales, StatusCount};
use crate::domain::aggregates::{
    Category, CategoryRef, NewVatProfile, OrderLine, Product, ProductRecord, ProfileSummary, Setting, VatProfile,
    VatProfileChanges,
};
use crate::Result;

const PROFILE_COLUMNS: &str = "id, name, name_is, description, description_is, vat_rate, is_default, sort_order";

const PRODUCT_COLUMNS: &str = "id, name, name_is, price, category_id, is_active, has_discount, original_price, \
    discount_percentage, discount_start_date, discount_end_date, discount_reason, discount_reason_is, updated_at";

/// Line columns over `products pr`, `categories c` and `vat_profiles vp`.
const LINE_JOINS: &str = "LEFT JOIN products pr ON pr.id = li.product_id \
    LEFT JOIN categories c ON c.id = pr.category_id \
    LEFT JOIN vat_profiles vp ON vp.id = c.vat_profile_id";

const LINE_COLUMNS: &str = "pr.id AS product_id, pr.name AS product_name, li.quantity, \
    c.vat_rate AS category_vat_rate, vp.id AS profile_id, vp.name AS profile_name, \
    vp.name_is AS profile_name_is, vp.vat_rate AS profile_vat_rate";

#[derive(sqlx::FromRow)]
struct ProfileRow {
    id: i64,
    name: String,
    name_is: String,
    description: Option<String>,
    description_is: Option<String>,
    vat_rate: Decimal,
    is_default: bool,
    sort_order: i32,
}

#[derive(sqlx::FromRow)]
struct ProfileCategoryRow { profile_id: i64, id: i64, name: String, name_is: Option<String> }

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: i64,
    name: String,
    name_is: Option<String>,
    legacy_vat_rate: Option<Decimal>,
    profile_id: Option<i64>,
    profile_name: Option<String>,
    profile_name_is: Option<String>,
    profile_vat_rate: Option<Decimal>,
}

impl From<CategoryRow> for Category {
    fn from(r: CategoryRow) -> Self {
        let profile = match (r.profile_id, r.profile_vat_rate) {
            (Some(id), Some(vat_rate)) => Some(ProfileSummary {
                id,
                name: r.profile_name.unwrap_or_default(),
                name_is: r.profile_name_is.unwrap_or_default(),
                vat_rate,
            }),
            _ => None,
        };
        Category { id: r.id, name: r.name, name_is: r.name_is, legacy_vat_rate: r.legacy_vat_rate, profile }
    }
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self { Self { pool } }

    /// Connects and applies pending migrations.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new().max_connections(max_connections).connect(url).await?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| crate::CommerceError::Storage(e.to_string()))?;
        Ok(Self::new(pool))
    }

    async fn load_profiles(&self, rows: Vec<ProfileRow>) -> Result<Vec<VatProfile>> {
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let categories = sqlx::query_as::<_, ProfileCategoryRow>(
            "SELECT vat_profile_id AS profile_id, id, name, name_is FROM categories WHERE vat_profile_id = ANY($1) ORDER BY name",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_profile: HashMap<i64, Vec<CategoryRef>> = HashMap::new();
        for c in categories {
            by_profile.entry(c.profile_id).or_default().push(CategoryRef { id: c.id, name: c.name, name_is: c.name_is });
        }

        Ok(rows
            .into_iter()
            .map(|r| VatProfile {
                categories: by_profile.remove(&r.id).unwrap_or_default(),
                id: r.id,
                name: r.name,
                name_is: r.name_is,
                description: r.description,
                description_is: r.description_is,
                vat_rate: r.vat_rate,
                is_default: r.is_default,
                sort_order: r.sort_order,
            })
            .collect())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn list_vat_profiles(&self) -> Result<Vec<VatProfile>> {
        let rows = sqlx::query_as::<_, ProfileRow>(&format!("SELECT {PROFILE_COLUMNS} FROM vat_profiles ORDER BY sort_order ASC, id ASC"))
            .fetch_all(&self.pool)
            .await?;
        self.load_profiles(rows).await
    }

    async fn get_vat_profile(&self, id: i64) -> Result<Option<VatProfile>> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!("SELECT {PROFILE_COLUMNS} FROM vat_profiles WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(self.load_profiles(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn create_vat_profile(&self, p: NewVatProfile) -> Result<VatProfile> {
        let mut tx = self.pool.begin().await?;
        if p.is_default {
            sqlx::query("UPDATE vat_profiles SET is_default = FALSE WHERE is_default").execute(&mut *tx).await?;
        }
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO vat_profiles (name, name_is, description, description_is, vat_rate, is_default) VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
        )
        .bind(&p.name)
        .bind(&p.name_is)
        .bind(&p.description)
        .bind(&p.description_is)
        .bind(p.vat_rate.value())
        .bind(p.is_default)
        .fetch_one(&mut *tx)
        .await?;
        if !p.category_ids.is_empty() {
            sqlx::query("UPDATE categories SET vat_profile_id = $1 WHERE id = ANY($2)")
                .bind(id)
                .bind(&p.category_ids)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        self.get_vat_profile(id).await?.ok_or(crate::CommerceError::NotFound("VAT profile"))
    }

    async fn update_vat_profile(&self, id: i64, changes: VatProfileChanges) -> Result<Option<VatProfile>> {
        let mut tx = self.pool.begin().await?;
        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM vat_profiles WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Ok(None);
        }
        if changes.is_default == Some(true) {
            sqlx::query("UPDATE vat_profiles SET is_default = FALSE WHERE is_default AND id <> $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        sqlx::query(
            "UPDATE vat_profiles SET name = COALESCE(NULLIF($2, ''), name), name_is = COALESCE(NULLIF($3, ''), name_is), \
             description = COALESCE($4, description), description_is = COALESCE($5, description_is), \
             vat_rate = COALESCE($6, vat_rate), is_default = COALESCE($7, is_default), updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(&changes.name)
        .bind(&changes.name_is)
        .bind(&changes.description)
        .bind(&changes.description_is)
        .bind(changes.vat_rate.map(|r| r.value()))
        .bind(changes.is_default)
        .execute(&mut *tx)
        .await?;
        if let Some(category_ids) = &changes.category_ids {
            sqlx::query("UPDATE categories SET vat_profile_id = NULL WHERE vat_profile_id = $1 AND NOT (id = ANY($2))")
                .bind(id)
                .bind(category_ids)
                .execute(&mut *tx)
                .await?;
            sqlx::query("UPDATE categories SET vat_profile_id = $1 WHERE id = ANY($2)")
                .bind(id)
                .bind(category_ids)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        self.get_vat_profile(id).await
    }

    async fn delete_vat_profile(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM vat_profiles WHERE id = $1").bind(id).execute(&self.pool).await?;
        Ok(())
    }

    async fn count_profile_categories(&self, id: i64) -> Result<i64> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM categories WHERE vat_profile_id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn assign_categories(&self, profile_id: i64, category_ids: &[i64]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE categories SET vat_profile_id = NULL WHERE vat_profile_id = $1 AND NOT (id = ANY($2))")
            .bind(profile_id)
            .bind(category_ids)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE categories SET vat_profile_id = $1 WHERE id = ANY($2)")
            .bind(profile_id)
            .bind(category_ids)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn get_category(&self, id: i64) -> Result<Option<Category>> {
        let row = sqlx::query_as::<_, CategoryRow>(
            "SELECT c.id, c.name, c.name_is, c.vat_rate AS legacy_vat_rate, vp.id AS profile_id, vp.name AS profile_name, \
             vp.name_is AS profile_name_is, vp.vat_rate AS profile_vat_rate \
             FROM categories c LEFT JOIN vat_profiles vp ON vp.id = c.vat_profile_id WHERE c.id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Category::from))
    }

    async fn get_product(&self, id: i64) -> Result<Option<Product>> {
        let record = sqlx::query_as::<_, ProductRecord>(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record.map(Product::from))
    }

    async fn save_product_pricing(&self, product: &Product) -> Result<()> {
        let r = product.to_record();
        sqlx::query(
            "UPDATE products SET price = $2, has_discount = $3, original_price = $4, discount_percentage = $5, \
             discount_start_date = $6, discount_end_date = $7, discount_reason = $8, discount_reason_is = $9, \
             updated_at = $10 WHERE id = $1",
        )
        .bind(r.id)
        .bind(r.price)
        .bind(r.has_discount)
        .bind(r.original_price)
        .bind(r.discount_percentage)
        .bind(r.discount_start_date)
        .bind(r.discount_end_date)
        .bind(&r.discount_reason)
        .bind(&r.discount_reason_is)
        .bind(r.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn products_with_discounts(&self) -> Result<Vec<Product>> {
        let records = sqlx::query_as::<_, ProductRecord>(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE has_discount ORDER BY id"))
            .fetch_all(&self.pool)
            .await?;
        Ok(records.into_iter().map(Product::from).collect())
    }

    async fn order_lines(&self, order_id: i64) -> Result<Option<Vec<OrderLine>>> {
        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM orders WHERE id = $1")
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Ok(None);
        }
        let lines = sqlx::query_as::<_, OrderLine>(&format!(
            "SELECT {LINE_COLUMNS}, li.price AS unit_price FROM order_items li {LINE_JOINS} WHERE li.order_id = $1 ORDER BY li.id"
        ))
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(Some(lines))
    }

    async fn cart_lines(&self, session_id: &str) -> Result<Vec<OrderLine>> {
        Ok(sqlx::query_as::<_, OrderLine>(&format!(
            "SELECT {LINE_COLUMNS}, pr.price AS unit_price FROM cart_items li {LINE_JOINS} WHERE li.session_id = $1 ORDER BY li.id"
        ))
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn period_totals(&self, window: &AnalyticsWindow) -> Result<PeriodTotals> {
        let revenue = sqlx::query_scalar::<_, Decimal>(
            "SELECT COALESCE(SUM(total_amount), 0) FROM orders WHERE status <> 'CANCELLED' AND created_at BETWEEN $1 AND $2",
        )
        .bind(window.start)
        .bind(window.end)
        .fetch_one(&self.pool);
        let orders = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM orders WHERE created_at BETWEEN $1 AND $2")
            .bind(window.start)
            .bind(window.end)
            .fetch_one(&self.pool);
        let customers = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM users WHERE role = 'CUSTOMER' AND created_at BETWEEN $1 AND $2",
        )
        .bind(window.start)
        .bind(window.end)
        .fetch_one(&self.pool);
        let products = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM products WHERE is_active AND created_at BETWEEN $1 AND $2",
        )
        .bind(window.start)
        .bind(window.end)
        .fetch_one(&self.pool);

        let (revenue, orders, customers, products) = tokio::try_join!(revenue, orders, customers, products)?;
        Ok(PeriodTotals { revenue, orders, customers, products })
    }

    async fn order_status_counts(&self, window: &AnalyticsWindow) -> Result<Vec<StatusCount>> {
        Ok(sqlx::query_as::<_, StatusCount>(
            "SELECT status, COUNT(*) AS count FROM orders WHERE created_at BETWEEN $1 AND $2 GROUP BY status ORDER BY status",
        )
        .bind(window.start)
        .bind(window.end)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn top_products(&self, window: &AnalyticsWindow, limit: i64) -> Result<Vec<ProductSales>> {
        Ok(sqlx::query_as::<_, ProductSales>(
            "SELECT oi.product_id AS product_id, pr.name, pr.name_is, c.name AS category, c.name_is AS category_is, \
             SUM(oi.quantity)::BIGINT AS quantity, SUM(oi.price * oi.quantity) AS revenue \
             FROM order_items oi JOIN orders o ON o.id = oi.order_id \
             LEFT JOIN products pr ON pr.id = oi.product_id LEFT JOIN categories c ON c.id = pr.category_id \
             WHERE o.status <> 'CANCELLED' AND o.created_at BETWEEN $1 AND $2 AND oi.product_id IS NOT NULL \
             GROUP BY oi.product_id, pr.name, pr.name_is, c.name, c.name_is \
             ORDER BY revenue DESC LIMIT $3",
        )
        .bind(window.start)
        .bind(window.end)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn product_revenue(&self, product_id: i64, window: &AnalyticsWindow) -> Result<Decimal> {
        Ok(sqlx::query_scalar(
            "SELECT COALESCE(SUM(oi.price * oi.quantity), 0) FROM order_items oi JOIN orders o ON o.id = oi.order_id \
             WHERE oi.product_id = $1 AND o.status <> 'CANCELLED' AND o.created_at BETWEEN $2 AND $3",
        )
        .bind(product_id)
        .bind(window.start)
        .bind(window.end)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn lines_between(&self, window: &AnalyticsWindow) -> Result<Vec<OrderLine>> {
        Ok(sqlx::query_as::<_, OrderLine>(&format!(
            "SELECT {LINE_COLUMNS}, li.price AS unit_price FROM order_items li JOIN orders o ON o.id = li.order_id {LINE_JOINS} \
             WHERE o.status <> 'CANCELLED' AND o.created_at BETWEEN $1 AND $2 ORDER BY li.id"
        ))
        .bind(window.start)
        .bind(window.end)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn daily_revenue(&self, since: DateTime<Utc>) -> Result<Vec<DailyRevenue>> {
        Ok(sqlx::query_as::<_, DailyRevenue>(
            "SELECT DATE(created_at) AS date, SUM(total_amount) AS revenue FROM orders \
             WHERE created_at >= $1 AND status <> 'CANCELLED' GROUP BY DATE(created_at) ORDER BY date ASC",
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn settings(&self, category: &str) -> Result<Vec<Setting>> {
        Ok(sqlx::query_as::<_, Setting>("SELECT key, value, category FROM settings WHERE category = $1")
            .bind(category)
            .fetch_all(&self.pool)
            .await?)
    }
}
