//! Ölföng Commerce
//!
//! Pricing backend for an Icelandic beverage store. Shelf prices include VAT;
//! this crate backs the tax out again for receipts and reports.
//!
//! ## Features
//! - VAT decomposition per line, per order, per cart and per tax-rate profile
//! - VAT profile administration and category rate resolution
//! - Time-windowed product discounts with derived status
//! - Period-over-period analytics with growth figures

use thiserror::Error;

pub mod analytics;
pub mod api;
pub mod config;
pub mod domain;
pub mod pricing;
pub mod publisher;
pub mod store;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum CommerceError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Event error: {0}")]
    Event(String),
}

impl From<sqlx::Error> for CommerceError {
    fn from(err: sqlx::Error) -> Self {
        CommerceError::Storage(err.to_string())
    }
}

impl From<pricing::DiscountError> for CommerceError {
    fn from(err: pricing::DiscountError) -> Self {
        CommerceError::Validation(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CommerceError>;
