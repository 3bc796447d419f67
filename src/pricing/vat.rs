//! VAT decomposition for tax-inclusive prices.
//!
//! Every stored price already contains VAT, so the tax portion is backed out:
//! `before = total / (1 + rate / 100)` and `vat = total - before`.
//!
//! Invalid input never raises. A non-positive total yields an all-zero
//! breakdown and a negative rate yields a zero split with the total passed
//! through. Amounts too large for a `Decimal` count as zero.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::aggregates::vat_profile::{ProfileSummary, VatProfile};
use crate::domain::value_objects::round_money;

pub const DEFAULT_CURRENCY: &str = "ISK";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VatBreakdown {
    pub price_before_vat: Decimal,
    pub vat_amount: Decimal,
    pub total_price: Decimal,
}

/// Split a VAT-inclusive total at `rate_percent`.
pub fn decompose(total: Decimal, rate_percent: Decimal) -> VatBreakdown {
    if total <= Decimal::ZERO {
        return VatBreakdown::default();
    }
    if rate_percent.is_sign_negative() && !rate_percent.is_zero() {
        return VatBreakdown { total_price: round_money(total), ..VatBreakdown::default() };
    }

    let before = total / (Decimal::ONE + rate_percent / Decimal::ONE_HUNDRED);
    let vat = total - before;

    VatBreakdown {
        price_before_vat: round_money(before),
        vat_amount: round_money(vat),
        total_price: round_money(total),
    }
}

pub fn vat_amount(total: Decimal, rate_percent: Decimal) -> Decimal {
    decompose(total, rate_percent).vat_amount
}

pub fn price_before_vat(total: Decimal, rate_percent: Decimal) -> Decimal {
    decompose(total, rate_percent).price_before_vat
}

/// One priced line of an order or cart.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineItem {
    pub product_id: Option<i64>,
    pub product_name: Option<String>,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub vat_rate: Option<Decimal>,
    pub profile: Option<ProfileSummary>,
}

impl LineItem {
    pub fn new(unit_price: Decimal, quantity: u32, vat_rate: Option<Decimal>) -> Self {
        Self { product_id: None, product_name: None, quantity, unit_price, vat_rate, profile: None }
    }

    /// None when `unit_price * quantity` does not fit in a `Decimal`.
    pub fn line_total(&self) -> Option<Decimal> { self.unit_price.checked_mul(Decimal::from(self.quantity)) }
}

/// Loosely specified item as posted to the VAT calculator.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleItem {
    pub price: Option<Decimal>,
    pub quantity: Option<u32>,
    pub vat_rate: Option<Decimal>,
}

impl SimpleItem {
    /// Items without a price are dropped; quantity defaults to one.
    pub fn to_line_item(&self) -> Option<LineItem> {
        let price = self.price.filter(|p| !p.is_zero())?;
        let quantity = self.quantity.filter(|q| *q > 0).unwrap_or(1);
        Some(LineItem::new(price, quantity, self.vat_rate))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemVatBreakdown {
    pub product_id: Option<i64>,
    pub product_name: Option<String>,
    pub quantity: u32,
    pub price_per_unit: Decimal,
    pub price_before_vat: Decimal,
    pub vat: Decimal,
    pub total_price: Decimal,
    pub profile_id: Option<i64>,
    pub profile: Option<ProfileSummary>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VatSummary {
    pub total_before_vat: Decimal,
    pub total_vat: Decimal,
    pub grand_total: Decimal,
    pub item_breakdowns: Vec<ItemVatBreakdown>,
}

/// Sum VAT over a set of lines.
///
/// Each line's breakdown is rounded to cents before it is accumulated; the
/// sums are rounded once more at the end. A line whose total overflows gets a
/// zero breakdown, and totals that overflow give an empty summary.
pub fn aggregate(items: &[LineItem]) -> VatSummary {
    let mut total_before = Decimal::ZERO;
    let mut total_vat = Decimal::ZERO;
    let mut item_breakdowns = Vec::with_capacity(items.len());

    for item in items {
        let rate = item.vat_rate.unwrap_or(Decimal::ZERO);
        let breakdown = item.line_total().map(|total| decompose(total, rate)).unwrap_or_default();

        let (Some(before), Some(vat)) =
            (total_before.checked_add(breakdown.price_before_vat), total_vat.checked_add(breakdown.vat_amount))
        else {
            return VatSummary::default();
        };
        total_before = before;
        total_vat = vat;

        item_breakdowns.push(ItemVatBreakdown {
            product_id: item.product_id,
            product_name: item.product_name.clone(),
            quantity: item.quantity,
            price_per_unit: item.unit_price,
            price_before_vat: breakdown.price_before_vat,
            vat: breakdown.vat_amount,
            total_price: breakdown.total_price,
            profile_id: item.profile.as_ref().map(|p| p.id),
            profile: item.profile.clone(),
        });
    }

    let Some(grand_total) = total_before.checked_add(total_vat) else {
        return VatSummary::default();
    };
    VatSummary {
        total_before_vat: round_money(total_before),
        total_vat: round_money(total_vat),
        grand_total: round_money(grand_total),
        item_breakdowns,
    }
}

pub fn aggregate_simple(items: &[SimpleItem]) -> VatSummary {
    let lines: Vec<LineItem> = items.iter().filter_map(SimpleItem::to_line_item).collect();
    aggregate(&lines)
}

/// VAT totals of one tax-rate profile. `profile` is None for lines whose
/// category has no profile.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileVatTotal {
    pub profile: Option<ProfileSummary>,
    pub item_count: usize,
    pub total_before_vat: Decimal,
    pub total_vat: Decimal,
    pub grand_total: Decimal,
}

pub fn vat_by_profile(summary: &VatSummary) -> Vec<ProfileVatTotal> {
    let mut buckets: BTreeMap<Option<i64>, ProfileVatTotal> = BTreeMap::new();
    for item in &summary.item_breakdowns {
        let bucket = buckets.entry(item.profile_id).or_insert_with(|| ProfileVatTotal {
            profile: item.profile.clone(),
            item_count: 0,
            total_before_vat: Decimal::ZERO,
            total_vat: Decimal::ZERO,
            grand_total: Decimal::ZERO,
        });
        bucket.item_count += 1;
        bucket.total_before_vat += item.price_before_vat;
        bucket.total_vat += item.vat;
    }
    buckets
        .into_values()
        .map(|mut b| {
            b.total_before_vat = round_money(b.total_before_vat);
            b.total_vat = round_money(b.total_vat);
            b.grand_total = round_money(b.total_before_vat + b.total_vat);
            b
        })
        .collect()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VatInfo {
    pub profile_name: String,
    pub profile_name_is: String,
    pub vat_rate: Decimal,
    pub description: Option<String>,
    pub description_is: Option<String>,
    pub price_before_vat: Decimal,
    pub vat_amount: Decimal,
    pub total_price: Decimal,
    pub currency: String,
}

/// Display block for a price under a profile.
pub fn format_vat_info(total: Decimal, profile: Option<&VatProfile>, currency: &str) -> Option<VatInfo> {
    let profile = profile?;
    let breakdown = decompose(total, profile.vat_rate);
    Some(VatInfo {
        profile_name: profile.name.clone(),
        profile_name_is: profile.name_is.clone(),
        vat_rate: profile.vat_rate,
        description: profile.description.clone(),
        description_is: profile.description_is.clone(),
        price_before_vat: breakdown.price_before_vat,
        vat_amount: breakdown.vat_amount,
        total_price: breakdown.total_price,
        currency: currency.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(v: i64, scale: u32) -> Decimal { Decimal::new(v, scale) }

    fn standard() -> ProfileSummary {
        ProfileSummary { id: 1, name: "Standard".into(), name_is: "Almennt".into(), vat_rate: dec(24, 0) }
    }

    fn reduced() -> ProfileSummary {
        ProfileSummary { id: 2, name: "Reduced".into(), name_is: "Lækkað".into(), vat_rate: dec(11, 0) }
    }

    #[test]
    fn test_decompose_standard_rate() {
        let b = decompose(dec(1999, 0), dec(24, 0));
        assert_eq!(b.price_before_vat, dec(161210, 2));
        assert_eq!(b.vat_amount, dec(38690, 2));
        assert_eq!(b.total_price, dec(1999, 0));
    }

    #[test]
    fn test_decompose_zero_rate_and_zero_total() {
        assert_eq!(
            decompose(dec(5000, 0), Decimal::ZERO),
            VatBreakdown { price_before_vat: dec(5000, 0), vat_amount: Decimal::ZERO, total_price: dec(5000, 0) }
        );
        assert_eq!(decompose(Decimal::ZERO, dec(24, 0)), VatBreakdown::default());
    }

    #[test]
    fn test_decompose_invalid_inputs_default_to_zero() {
        assert_eq!(decompose(dec(-100, 0), dec(24, 0)), VatBreakdown::default());
        let b = decompose(dec(100, 0), dec(-5, 0));
        assert_eq!(b.price_before_vat, Decimal::ZERO);
        assert_eq!(b.vat_amount, Decimal::ZERO);
        assert_eq!(b.total_price, dec(100, 0));
    }

    #[test]
    fn test_decompose_parts_sum_to_total() {
        let tolerance = dec(2, 2);
        for total in [1, 99, 1999, 4590, 123457, 999999] {
            for rate in [0, 11, 24, 25] {
                let b = decompose(dec(total, 0), dec(rate, 0));
                let diff = (b.price_before_vat + b.vat_amount - dec(total, 0)).abs();
                assert!(diff <= tolerance, "total {total} rate {rate} off by {diff}");
            }
        }
    }

    #[test]
    fn test_projections() {
        assert_eq!(vat_amount(dec(1240, 0), dec(24, 0)), dec(240, 0));
        assert_eq!(price_before_vat(dec(1240, 0), dec(24, 0)), dec(1000, 0));
    }

    #[test]
    fn test_aggregate_empty() {
        assert_eq!(aggregate(&[]), VatSummary::default());
    }

    #[test]
    fn test_aggregate_two_lines() {
        let items = vec![
            LineItem::new(dec(5000, 0), 2, Some(dec(24, 0))),
            LineItem::new(dec(3000, 0), 1, Some(dec(24, 0))),
        ];
        let summary = aggregate(&items);
        assert_eq!(summary.grand_total, dec(13000, 0));
        assert_eq!(summary.total_vat, dec(251613, 2));
        assert_eq!(summary.total_before_vat, dec(1048387, 2));
        assert_eq!(summary.item_breakdowns.len(), 2);
        assert_eq!(summary.item_breakdowns[0].total_price, dec(10000, 0));
    }

    #[test]
    fn test_aggregate_overflowing_amounts() {
        let huge = Decimal::from_i128_with_scale(5 * 10i128.pow(27), 0);
        let items = vec![LineItem::new(huge, 100, Some(dec(24, 0))), LineItem::new(dec(1240, 0), 1, Some(dec(24, 0)))];
        let summary = aggregate(&items);
        assert_eq!(summary.item_breakdowns.len(), 2);
        assert_eq!(summary.item_breakdowns[0].total_price, Decimal::ZERO);
        assert_eq!(summary.total_vat, dec(240, 0));
        assert_eq!(summary.grand_total, dec(1240, 0));

        let big = Decimal::from_i128_with_scale(5 * 10i128.pow(28), 0);
        assert_eq!(aggregate(&[LineItem::new(big, 1, None), LineItem::new(big, 1, None)]), VatSummary::default());
    }

    #[test]
    fn test_aggregate_missing_rate_is_untaxed() {
        let summary = aggregate(&[LineItem::new(dec(800, 0), 3, None)]);
        assert_eq!(summary.total_before_vat, dec(2400, 0));
        assert_eq!(summary.total_vat, Decimal::ZERO);
    }

    #[test]
    fn test_aggregate_simple_skips_unpriced() {
        let items = vec![
            SimpleItem { price: Some(dec(1240, 0)), quantity: None, vat_rate: Some(dec(24, 0)) },
            SimpleItem { price: None, quantity: Some(4), vat_rate: Some(dec(24, 0)) },
            SimpleItem { price: Some(Decimal::ZERO), quantity: Some(1), vat_rate: None },
        ];
        let summary = aggregate_simple(&items);
        assert_eq!(summary.item_breakdowns.len(), 1);
        assert_eq!(summary.item_breakdowns[0].quantity, 1);
        assert_eq!(summary.total_vat, dec(240, 0));
    }

    #[test]
    fn test_vat_by_profile_groups_lines() {
        let mut wine = LineItem::new(dec(2490, 0), 2, Some(dec(24, 0)));
        wine.profile = Some(standard());
        let mut beer = LineItem::new(dec(450, 0), 6, Some(dec(24, 0)));
        beer.profile = Some(standard());
        let mut juice = LineItem::new(dec(333, 0), 1, Some(dec(11, 0)));
        juice.profile = Some(reduced());
        let loose = LineItem::new(dec(100, 0), 1, None);

        let groups = vat_by_profile(&aggregate(&[wine, beer, juice, loose]));
        assert_eq!(groups.len(), 3);
        assert!(groups[0].profile.is_none());
        assert_eq!(groups[1].profile.as_ref().map(|p| p.id), Some(1));
        assert_eq!(groups[1].item_count, 2);
        assert_eq!(groups[1].grand_total, dec(7680, 0));
        assert_eq!(groups[2].item_count, 1);
    }

    #[test]
    fn test_format_vat_info() {
        assert!(format_vat_info(dec(1240, 0), None, DEFAULT_CURRENCY).is_none());
        let profile = VatProfile {
            id: 1,
            name: "Standard".into(),
            name_is: "Almennt".into(),
            description: Some("Alcoholic beverages".into()),
            description_is: None,
            vat_rate: dec(24, 0),
            is_default: true,
            sort_order: 0,
            categories: vec![],
        };
        let info = format_vat_info(dec(1240, 0), Some(&profile), DEFAULT_CURRENCY).unwrap();
        assert_eq!(info.vat_amount, dec(240, 0));
        assert_eq!(info.currency, "ISK");
        assert_eq!(info.profile_name_is, "Almennt");
    }
}
