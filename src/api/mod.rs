//! HTTP surface.

pub mod analytics;
pub mod discounts;
pub mod error;
pub mod response;
pub mod vat;

use std::sync::Arc;

use axum::{routing::{get, post, put}, Json, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::PricingConfig;
use crate::publisher::EventPublisher;
use crate::store::Store;

#[derive(Clone)]
pub struct AppState { pub store: Arc<dyn Store>, pub events: EventPublisher, pub pricing: PricingConfig }

impl AppState {
    pub fn new(store: Arc<dyn Store>, events: EventPublisher, pricing: PricingConfig) -> Self {
        Self { store, events, pricing }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "olfong-commerce"})) }))
        .route("/api/v1/vat-profiles", get(vat::list_vat_profiles).post(vat::create_vat_profile))
        .route("/api/v1/vat-profiles/:id", get(vat::get_vat_profile).put(vat::update_vat_profile).delete(vat::delete_vat_profile))
        .route("/api/v1/vat-profiles/:id/categories", post(vat::assign_categories))
        .route("/api/v1/categories/:id/vat-rate", get(vat::category_vat_rate))
        .route("/api/v1/settings/vat", get(vat::vat_settings))
        .route("/api/v1/vat/breakdown", post(vat::vat_breakdown))
        .route("/api/v1/vat/order", post(vat::order_vat_quote))
        .route("/api/v1/orders/:id/vat", get(vat::order_vat))
        .route("/api/v1/cart/:session/vat", get(vat::cart_vat))
        .route("/api/v1/products/discounted", get(discounts::discounted_products))
        .route("/api/v1/products/:id/discount", put(discounts::set_discount).delete(discounts::remove_discount))
        .route("/api/v1/discounts", get(discounts::list_discounts))
        .route("/api/v1/discounts/bulk-remove", post(discounts::bulk_remove))
        .route("/api/v1/discounts/cleanup-expired", post(discounts::cleanup_expired))
        .route("/api/v1/discounts/extend", post(discounts::extend_discounts))
        .route("/api/v1/analytics", get(analytics::report))
        .route("/api/v1/analytics/revenue-trend", get(analytics::revenue_trend))
        .route("/api/v1/analytics/vat", get(analytics::vat_rollup))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
