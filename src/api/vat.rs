//! VAT profiles, rate lookups and VAT breakdowns for orders and carts.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::error::ApiResult;
use super::response::{success, success_message, ApiResponse};
use super::AppState;
use crate::domain::aggregates::vat_profile::{resolve_category_rate, VAT_SETTINGS_CATEGORY};
use crate::domain::aggregates::{order, Cart, NewVatProfile, VatProfile, VatProfileChanges, VatSettings};
use crate::domain::events::{DomainEvent, VatProfileEvent};
use crate::domain::value_objects::{validate_percentage, Percentage};
use crate::pricing::vat::{self, ProfileVatTotal, SimpleItem, VatBreakdown, VatInfo, VatSummary};
use crate::CommerceError;

#[derive(Debug, Serialize)] pub struct ProfileList { pub profiles: Vec<VatProfile> }
#[derive(Debug, Serialize)] pub struct ProfileData { pub profile: VatProfile }

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateVatProfileRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Icelandic name is required"))]
    pub name_is: String,
    pub description: Option<String>,
    pub description_is: Option<String>,
    #[validate(custom = "validate_percentage")]
    pub vat_rate: Decimal,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub category_ids: Vec<i64>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateVatProfileRequest {
    #[validate(length(min = 1))]
    pub name: Option<String>,
    #[validate(length(min = 1))]
    pub name_is: Option<String>,
    pub description: Option<String>,
    pub description_is: Option<String>,
    #[validate(custom = "validate_percentage")]
    pub vat_rate: Option<Decimal>,
    pub is_default: Option<bool>,
    pub category_ids: Option<Vec<i64>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignCategoriesRequest {
    #[serde(default)]
    pub category_ids: Vec<i64>,
}

fn percentage(value: Decimal) -> Result<Percentage, CommerceError> {
    Percentage::new(value).map_err(|e| CommerceError::Validation(e.to_string()))
}

pub async fn list_vat_profiles(State(s): State<AppState>) -> ApiResult<Json<ApiResponse<ProfileList>>> {
    let profiles = s.store.list_vat_profiles().await?;
    Ok(success(ProfileList { profiles }, "VAT profiles fetched successfully"))
}

pub async fn get_vat_profile(State(s): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<ApiResponse<ProfileData>>> {
    let profile = s.store.get_vat_profile(id).await?.ok_or(CommerceError::NotFound("VAT profile"))?;
    Ok(success(ProfileData { profile }, "VAT profile fetched successfully"))
}

pub async fn create_vat_profile(
    State(s): State<AppState>,
    Json(r): Json<CreateVatProfileRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<ProfileData>>)> {
    r.validate()?;
    let profile = s
        .store
        .create_vat_profile(NewVatProfile {
            vat_rate: percentage(r.vat_rate)?,
            name: r.name,
            name_is: r.name_is,
            description: r.description,
            description_is: r.description_is,
            is_default: r.is_default,
            category_ids: r.category_ids,
        })
        .await?;
    tracing::info!(profile_id = profile.id, vat_rate = %profile.vat_rate, "VAT profile created");
    s.events
        .publish_all(vec![DomainEvent::VatProfile(VatProfileEvent::Created { profile_id: profile.id, vat_rate: profile.vat_rate })])
        .await;
    Ok((StatusCode::CREATED, success(ProfileData { profile }, "VAT profile created successfully")))
}

pub async fn update_vat_profile(
    State(s): State<AppState>,
    Path(id): Path<i64>,
    Json(r): Json<UpdateVatProfileRequest>,
) -> ApiResult<Json<ApiResponse<ProfileData>>> {
    r.validate()?;
    let changes = VatProfileChanges {
        vat_rate: r.vat_rate.map(percentage).transpose()?,
        name: r.name,
        name_is: r.name_is,
        description: r.description,
        description_is: r.description_is,
        is_default: r.is_default,
        category_ids: r.category_ids,
    };
    let profile = s.store.update_vat_profile(id, changes).await?.ok_or(CommerceError::NotFound("VAT profile"))?;
    tracing::info!(profile_id = id, vat_rate = %profile.vat_rate, "VAT profile updated");
    s.events
        .publish_all(vec![DomainEvent::VatProfile(VatProfileEvent::Updated { profile_id: id, vat_rate: profile.vat_rate })])
        .await;
    Ok(success(ProfileData { profile }, "VAT profile updated successfully"))
}

pub async fn delete_vat_profile(State(s): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<ApiResponse<()>>> {
    s.store.get_vat_profile(id).await?.ok_or(CommerceError::NotFound("VAT profile"))?;
    if s.store.count_profile_categories(id).await? > 0 {
        return Err(CommerceError::Conflict(
            "Cannot delete profile with assigned categories. Reassign categories first.".to_string(),
        )
        .into());
    }
    s.store.delete_vat_profile(id).await?;
    tracing::info!(profile_id = id, "VAT profile deleted");
    s.events.publish_all(vec![DomainEvent::VatProfile(VatProfileEvent::Deleted { profile_id: id })]).await;
    Ok(success_message("VAT profile deleted successfully"))
}

pub async fn assign_categories(
    State(s): State<AppState>,
    Path(id): Path<i64>,
    Json(r): Json<AssignCategoriesRequest>,
) -> ApiResult<Json<ApiResponse<ProfileData>>> {
    s.store.get_vat_profile(id).await?.ok_or(CommerceError::NotFound("VAT profile"))?;
    s.store.assign_categories(id, &r.category_ids).await?;
    let profile = s.store.get_vat_profile(id).await?.ok_or(CommerceError::NotFound("VAT profile"))?;
    s.events
        .publish_all(vec![DomainEvent::VatProfile(VatProfileEvent::CategoriesAssigned { profile_id: id, category_ids: r.category_ids })])
        .await;
    Ok(success(ProfileData { profile }, "Categories assigned to profile successfully"))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryVatRate { pub category_id: i64, pub vat_rate: Decimal, pub profile_id: Option<i64> }

/// Unknown categories resolve to the configured default rate.
pub async fn category_vat_rate(State(s): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<ApiResponse<CategoryVatRate>>> {
    let category = s.store.get_category(id).await?;
    let vat_rate = resolve_category_rate(category.as_ref(), s.pricing.default_vat_rate);
    let profile_id = category.and_then(|c| c.profile).map(|p| p.id);
    Ok(success(CategoryVatRate { category_id: id, vat_rate, profile_id }, "VAT rate resolved"))
}

pub async fn vat_settings(State(s): State<AppState>) -> ApiResult<Json<ApiResponse<VatSettings>>> {
    let rows = s.store.settings(VAT_SETTINGS_CATEGORY).await?;
    Ok(success(VatSettings::from_settings(&rows), "VAT settings retrieved successfully"))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakdownRequest {
    pub price: Decimal,
    pub vat_rate: Option<Decimal>,
    pub vat_profile_id: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakdownResponse {
    #[serde(flatten)]
    pub breakdown: VatBreakdown,
    pub vat_rate: Decimal,
    pub vat_info: Option<VatInfo>,
}

/// Rate precedence: the named profile, then the posted rate, then the default.
pub async fn vat_breakdown(State(s): State<AppState>, Json(r): Json<BreakdownRequest>) -> ApiResult<Json<ApiResponse<BreakdownResponse>>> {
    let profile = match r.vat_profile_id {
        Some(id) => Some(s.store.get_vat_profile(id).await?.ok_or(CommerceError::NotFound("VAT profile"))?),
        None => None,
    };
    let vat_rate = profile.as_ref().map(|p| p.vat_rate).or(r.vat_rate).unwrap_or(s.pricing.default_vat_rate);
    let response = BreakdownResponse {
        breakdown: vat::decompose(r.price, vat_rate),
        vat_rate,
        vat_info: vat::format_vat_info(r.price, profile.as_ref(), &s.pricing.currency),
    };
    Ok(success(response, "VAT breakdown calculated"))
}

#[derive(Debug, Deserialize)]
pub struct OrderVatRequest {
    #[serde(default)]
    pub items: Vec<SimpleItem>,
}

pub async fn order_vat_quote(Json(r): Json<OrderVatRequest>) -> ApiResult<Json<ApiResponse<VatSummary>>> {
    Ok(success(vat::aggregate_simple(&r.items), "Order VAT calculated"))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderVatResponse {
    pub order_id: i64,
    #[serde(flatten)]
    pub summary: VatSummary,
    pub by_profile: Vec<ProfileVatTotal>,
}

pub async fn order_vat(State(s): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<ApiResponse<OrderVatResponse>>> {
    let lines = s.store.order_lines(id).await?.ok_or(CommerceError::NotFound("Order"))?;
    let summary = order::vat_summary(&lines);
    let by_profile = vat::vat_by_profile(&summary);
    Ok(success(OrderVatResponse { order_id: id, summary, by_profile }, "Order VAT breakdown retrieved"))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartVatResponse {
    pub session_id: String,
    pub item_count: i64,
    #[serde(flatten)]
    pub summary: VatSummary,
    pub by_profile: Vec<ProfileVatTotal>,
}

pub async fn cart_vat(State(s): State<AppState>, Path(session): Path<String>) -> ApiResult<Json<ApiResponse<CartVatResponse>>> {
    let lines = s.store.cart_lines(&session).await?;
    let cart = Cart::from_lines(session, lines);
    let summary = cart.vat_summary();
    let response = CartVatResponse {
        session_id: cart.session_id().to_string(),
        item_count: cart.item_count(),
        by_profile: vat::vat_by_profile(&summary),
        summary,
    };
    Ok(success(response, "Cart VAT breakdown retrieved"))
}
