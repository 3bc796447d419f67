//! Pricing core: VAT decomposition and product discounts.
//!
//! Everything here is pure and synchronous. Callers fetch the rows they need
//! and hand them in.

pub mod discount;
pub mod vat;

pub use discount::{Discount, DiscountError, DiscountInput, DiscountStatus};
pub use vat::{aggregate, decompose, LineItem, VatBreakdown, VatSummary};
