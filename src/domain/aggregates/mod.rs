//! Aggregates module
pub mod product;
pub mod order;
pub mod cart;
pub mod vat_profile;

pub use product::{Product, ProductRecord};
pub use order::{OrderLine, OrderStatus};
pub use cart::Cart;
pub use vat_profile::{Category, CategoryRef, NewVatProfile, ProfileSummary, Setting, VatProfile, VatProfileChanges, VatSettings};
