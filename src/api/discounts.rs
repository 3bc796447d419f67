//! Discount administration and the storefront discounted listing.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::error::ApiResult;
use super::response::{success, ApiResponse};
use super::AppState;
use crate::domain::aggregates::Product;
use crate::pricing::discount::{self, Discount, DiscountInput, DiscountStatus};
use crate::CommerceError;

#[derive(Debug, Deserialize)]
pub struct DiscountedQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ProductList {
    pub products: Vec<Product>,
}

/// Products whose discount is in effect right now, deepest discount first.
pub async fn discounted_products(
    State(s): State<AppState>,
    Query(q): Query<DiscountedQuery>,
) -> ApiResult<Json<ApiResponse<ProductList>>> {
    let now = Utc::now();
    let mut products: Vec<Product> = s
        .store
        .products_with_discounts()
        .await?
        .into_iter()
        .filter(|p| p.is_active() && p.discount_status(now).in_effect())
        .collect();
    products.sort_by(|a, b| percent(b).cmp(&percent(a)));
    products.truncate(q.limit.unwrap_or(20));
    Ok(success(ProductList { products }, "Discounted products fetched successfully"))
}

fn percent(p: &Product) -> Decimal {
    p.discount().map(|d| d.percentage.value()).unwrap_or_default()
}

#[derive(Debug, Deserialize)]
pub struct AdminQuery {
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountListItem {
    pub product_id: i64,
    pub name: String,
    pub name_is: Option<String>,
    pub price: Decimal,
    pub discount: Discount,
    pub status: DiscountStatus,
    pub days_remaining: Option<i64>,
}

#[derive(Debug, Default, Serialize)]
pub struct DiscountCounts {
    pub total: usize,
    pub active: usize,
    pub expiring: usize,
    pub scheduled: usize,
    pub expired: usize,
}

impl DiscountCounts {
    fn add(&mut self, status: DiscountStatus) {
        self.total += 1;
        match status {
            DiscountStatus::Active => self.active += 1,
            DiscountStatus::Expiring => self.expiring += 1,
            DiscountStatus::Scheduled => self.scheduled += 1,
            DiscountStatus::Expired => self.expired += 1,
            DiscountStatus::Inactive => {}
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DiscountList {
    pub discounts: Vec<DiscountListItem>,
    pub summary: DiscountCounts,
}

/// Admin view of every discount. Summary counts ignore the status filter.
pub async fn list_discounts(
    State(s): State<AppState>,
    Query(q): Query<AdminQuery>,
) -> ApiResult<Json<ApiResponse<DiscountList>>> {
    let filter = match q.status.as_deref().filter(|v| !v.is_empty() && *v != "all") {
        Some(v) => Some(
            DiscountStatus::parse(v).ok_or_else(|| CommerceError::Validation(format!("unknown discount status: {v}")))?,
        ),
        None => None,
    };
    let now = Utc::now();
    let mut summary = DiscountCounts::default();
    let mut discounts = Vec::new();
    for product in s.store.products_with_discounts().await? {
        let Some(d) = product.discount() else { continue };
        let status = discount::status(Some(d), now);
        summary.add(status);
        if filter.is_some_and(|f| f != status) {
            continue;
        }
        discounts.push(DiscountListItem {
            product_id: product.id(),
            name: product.name().to_string(),
            name_is: product.name_is().map(str::to_string),
            price: product.price(),
            discount: d.clone(),
            status,
            days_remaining: discount::days_remaining(d, now),
        });
    }
    discounts.sort_by(|a, b| a.status.rank().cmp(&b.status.rank()).then_with(|| a.name.cmp(&b.name)));
    Ok(success(DiscountList { discounts, summary }, "Discounts fetched successfully"))
}

#[derive(Debug, Serialize)]
pub struct ProductData {
    pub product: Product,
}

async fn load(s: &AppState, id: i64) -> Result<Product, CommerceError> {
    s.store.get_product(id).await?.ok_or(CommerceError::NotFound("Product"))
}

/// Events are taken before the save so the stored copy carries none.
async fn save(s: &AppState, product: &mut Product) -> Result<(), CommerceError> {
    let events = product.take_events();
    s.store.save_product_pricing(product).await?;
    s.events.publish_all(events).await;
    Ok(())
}

pub async fn set_discount(
    State(s): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<DiscountInput>,
) -> ApiResult<Json<ApiResponse<ProductData>>> {
    let discount = input.into_discount()?;
    let mut product = load(&s, id).await?;
    product.set_discount(discount);
    save(&s, &mut product).await?;
    tracing::info!(product_id = id, price = %product.price(), "discount set");
    Ok(success(ProductData { product }, "Discount set successfully"))
}

pub async fn remove_discount(State(s): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<ApiResponse<ProductData>>> {
    let mut product = load(&s, id).await?;
    if product.remove_discount() {
        save(&s, &mut product).await?;
        tracing::info!(product_id = id, price = %product.price(), "discount removed");
    }
    Ok(success(ProductData { product }, "Discount removed successfully"))
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkResult {
    pub updated: Vec<i64>,
    pub skipped: Vec<i64>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BulkRemoveRequest {
    #[validate(length(min = 1, message = "At least one product id is required"))]
    pub product_ids: Vec<i64>,
}

pub async fn bulk_remove(
    State(s): State<AppState>,
    Json(r): Json<BulkRemoveRequest>,
) -> ApiResult<Json<ApiResponse<BulkResult>>> {
    r.validate()?;
    let mut result = BulkResult::default();
    for id in r.product_ids {
        match s.store.get_product(id).await? {
            Some(mut product) => {
                if product.remove_discount() {
                    save(&s, &mut product).await?;
                    result.updated.push(id);
                } else {
                    result.skipped.push(id);
                }
            }
            None => result.skipped.push(id),
        }
    }
    tracing::info!(removed = result.updated.len(), skipped = result.skipped.len(), "bulk discount removal");
    let message = format!("Removed discounts from {} products", result.updated.len());
    Ok(success(result, message))
}

pub async fn cleanup_expired(State(s): State<AppState>) -> ApiResult<Json<ApiResponse<BulkResult>>> {
    let now = Utc::now();
    let mut result = BulkResult::default();
    for mut product in s.store.products_with_discounts().await? {
        if product.discount_status(now) != DiscountStatus::Expired {
            continue;
        }
        product.remove_discount();
        save(&s, &mut product).await?;
        result.updated.push(product.id());
    }
    tracing::info!(removed = result.updated.len(), "expired discounts cleaned up");
    let message = format!("Cleaned up {} expired discounts", result.updated.len());
    Ok(success(result, message))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ExtendRequest {
    #[validate(length(min = 1, message = "At least one product id is required"))]
    pub product_ids: Vec<i64>,
    #[validate(range(min = 1, max = 365))]
    pub days: i64,
}

/// Products without a discount end date are reported as skipped.
pub async fn extend_discounts(
    State(s): State<AppState>,
    Json(r): Json<ExtendRequest>,
) -> ApiResult<Json<ApiResponse<BulkResult>>> {
    r.validate()?;
    let mut result = BulkResult::default();
    for id in r.product_ids {
        match s.store.get_product(id).await? {
            Some(mut product) => {
                if product.extend_discount(r.days) {
                    save(&s, &mut product).await?;
                    result.updated.push(id);
                } else {
                    result.skipped.push(id);
                }
            }
            None => result.skipped.push(id),
        }
    }
    let message = format!("Extended {} discounts by {} days", result.updated.len(), r.days);
    Ok(success(result, message))
}
