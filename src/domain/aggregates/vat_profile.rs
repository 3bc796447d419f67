//! VAT Profile Aggregate

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::Percentage;

pub const DEFAULT_VAT_RATE: i64 = 24;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VatProfile {
    pub id: i64,
    pub name: String,
    pub name_is: String,
    pub description: Option<String>,
    pub description_is: Option<String>,
    pub vat_rate: Decimal,
    pub is_default: bool,
    pub sort_order: i32,
    pub categories: Vec<CategoryRef>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRef { pub id: i64, pub name: String, pub name_is: Option<String> }

/// Identity of a profile as carried on line items and reports.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSummary { pub id: i64, pub name: String, pub name_is: String, pub vat_rate: Decimal }

impl From<&VatProfile> for ProfileSummary {
    fn from(p: &VatProfile) -> Self {
        Self { id: p.id, name: p.name.clone(), name_is: p.name_is.clone(), vat_rate: p.vat_rate }
    }
}

#[derive(Clone, Debug)]
pub struct NewVatProfile {
    pub name: String,
    pub name_is: String,
    pub description: Option<String>,
    pub description_is: Option<String>,
    pub vat_rate: Percentage,
    pub is_default: bool,
    pub category_ids: Vec<i64>,
}

/// Partial update. `category_ids`, when present, replaces the assigned set.
#[derive(Clone, Debug, Default)]
pub struct VatProfileChanges {
    pub name: Option<String>,
    pub name_is: Option<String>,
    pub description: Option<String>,
    pub description_is: Option<String>,
    pub vat_rate: Option<Percentage>,
    pub is_default: Option<bool>,
    pub category_ids: Option<Vec<i64>>,
}

impl VatProfile {
    pub fn apply(&mut self, changes: &VatProfileChanges) {
        if let Some(name) = changes.name.as_ref().filter(|n| !n.is_empty()) { self.name = name.clone(); }
        if let Some(name_is) = changes.name_is.as_ref().filter(|n| !n.is_empty()) { self.name_is = name_is.clone(); }
        if let Some(d) = &changes.description { self.description = Some(d.clone()); }
        if let Some(d) = &changes.description_is { self.description_is = Some(d.clone()); }
        if let Some(rate) = changes.vat_rate { self.vat_rate = rate.value(); }
        if let Some(is_default) = changes.is_default { self.is_default = is_default; }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub name_is: Option<String>,
    /// Rate stored on the category before profiles existed.
    pub legacy_vat_rate: Option<Decimal>,
    pub profile: Option<ProfileSummary>,
}

impl Category {
    /// Profile rate, else the legacy category rate, else `default`.
    pub fn vat_rate(&self, default: Decimal) -> Decimal {
        self.profile
            .as_ref()
            .map(|p| p.vat_rate)
            .or(self.legacy_vat_rate.filter(|r| !r.is_zero()))
            .unwrap_or(default)
    }
}

pub fn resolve_category_rate(category: Option<&Category>, default: Decimal) -> Decimal {
    category.map_or(default, |c| c.vat_rate(default))
}

/// Key/value row from the settings table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Setting { pub key: String, pub value: String, pub category: String }

pub const VAT_SETTINGS_CATEGORY: &str = "VAT";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VatSettings {
    pub enabled: bool,
    pub rate: i64,
    pub country: String,
    pub display_in_admin: bool,
    pub include_in_customer_price: bool,
    pub show_breakdown: bool,
}

impl Default for VatSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            rate: DEFAULT_VAT_RATE,
            country: "IS".to_string(),
            display_in_admin: true,
            include_in_customer_price: true,
            show_breakdown: true,
        }
    }
}

impl VatSettings {
    /// Unknown keys are ignored; unparsable numbers keep the default.
    pub fn from_settings(settings: &[Setting]) -> Self {
        let mut out = Self::default();
        for s in settings {
            let flag = s.value == "true";
            match s.key.as_str() {
                "vatEnabled" => out.enabled = flag,
                "vatRate" => out.rate = s.value.trim().parse().unwrap_or(out.rate),
                "vatCountry" => out.country = s.value.clone(),
                "vatDisplayInAdmin" => out.display_in_admin = flag,
                "vatIncludeInCustomerPrice" => out.include_in_customer_price = flag,
                "vatShowBreakdown" => out.show_breakdown = flag,
                _ => {}
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(profile_rate: Option<i64>, legacy: Option<i64>) -> Category {
        Category {
            id: 7,
            name: "Wine".into(),
            name_is: Some("Vín".into()),
            legacy_vat_rate: legacy.map(|r| Decimal::new(r, 0)),
            profile: profile_rate.map(|r| ProfileSummary { id: 1, name: "P".into(), name_is: "P".into(), vat_rate: Decimal::new(r, 0) }),
        }
    }

    #[test]
    fn test_category_rate_resolution() {
        let default = Decimal::new(DEFAULT_VAT_RATE, 0);
        assert_eq!(resolve_category_rate(Some(&category(Some(11), Some(24))), default), Decimal::new(11, 0));
        assert_eq!(resolve_category_rate(Some(&category(None, Some(11))), default), Decimal::new(11, 0));
        assert_eq!(resolve_category_rate(Some(&category(None, None)), default), default);
        assert_eq!(resolve_category_rate(None, default), default);
    }

    #[test]
    fn test_vat_settings_defaults_and_overrides() {
        assert_eq!(VatSettings::from_settings(&[]), VatSettings::default());
        let rows = vec![
            Setting { key: "vatRate".into(), value: "11".into(), category: "VAT".into() },
            Setting { key: "vatEnabled".into(), value: "false".into(), category: "VAT".into() },
            Setting { key: "vatCountry".into(), value: "NO".into(), category: "VAT".into() },
        ];
        let s = VatSettings::from_settings(&rows);
        assert_eq!(s.rate, 11);
        assert!(!s.enabled);
        assert_eq!(s.country, "NO");
        assert!(s.show_breakdown);
    }

    #[test]
    fn test_apply_changes_keeps_unset_fields() {
        let mut p = VatProfile {
            id: 1, name: "Standard".into(), name_is: "Almennt".into(), description: None, description_is: None,
            vat_rate: Decimal::new(24, 0), is_default: false, sort_order: 0, categories: vec![],
        };
        p.apply(&VatProfileChanges { vat_rate: Some(Percentage::new(Decimal::new(11, 0)).unwrap()), name: Some(String::new()), ..Default::default() });
        assert_eq!(p.vat_rate, Decimal::new(11, 0));
        assert_eq!(p.name, "Standard");
    }
}
