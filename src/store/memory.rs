//! In-process store over a single `RwLock`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::Store;
use crate::analytics::{AnalyticsWindow, DailyRevenue, PeriodTotals, ProductSales, StatusCount};
use crate::domain::aggregates::{
    Category, CategoryRef, NewVatProfile, OrderLine, OrderStatus, Product, ProfileSummary, Setting, VatProfile,
    VatProfileChanges,
};
use crate::{CommerceError, Result};

#[derive(Clone, Debug)]
pub struct MemoryCategory {
    pub id: i64,
    pub name: String,
    pub name_is: Option<String>,
    pub legacy_vat_rate: Option<Decimal>,
    pub profile_id: Option<i64>,
}

#[derive(Clone, Debug)]
pub struct MemoryOrderItem { pub product_id: i64, pub quantity: i32, pub price: Decimal }

#[derive(Clone, Debug)]
pub struct MemoryOrder {
    pub id: i64,
    pub status: OrderStatus,
    pub total_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub items: Vec<MemoryOrderItem>,
}

#[derive(Default)]
struct State {
    profiles: BTreeMap<i64, VatProfile>,
    categories: BTreeMap<i64, MemoryCategory>,
    products: BTreeMap<i64, (Product, DateTime<Utc>)>,
    orders: Vec<MemoryOrder>,
    carts: HashMap<String, Vec<(i64, i32)>>,
    customers: Vec<DateTime<Utc>>,
    settings: Vec<Setting>,
    next_profile_id: i64,
}

impl State {
    fn profile_view(&self, profile: &VatProfile) -> VatProfile {
        let mut view = profile.clone();
        view.categories = self
            .categories
            .values()
            .filter(|c| c.profile_id == Some(profile.id))
            .map(|c| CategoryRef { id: c.id, name: c.name.clone(), name_is: c.name_is.clone() })
            .collect();
        view
    }

    fn category(&self, id: i64) -> Option<Category> {
        let c = self.categories.get(&id)?;
        Some(Category {
            id: c.id,
            name: c.name.clone(),
            name_is: c.name_is.clone(),
            legacy_vat_rate: c.legacy_vat_rate,
            profile: c.profile_id.and_then(|pid| self.profiles.get(&pid)).map(ProfileSummary::from),
        })
    }

    fn line(&self, product_id: i64, quantity: i32, price: Option<Decimal>) -> OrderLine {
        let Some((product, _)) = self.products.get(&product_id) else {
            return OrderLine { quantity, unit_price: price, ..Default::default() };
        };
        let category = product.category_id().and_then(|id| self.category(id));
        let profile = category.as_ref().and_then(|c| c.profile.clone());
        OrderLine {
            product_id: Some(product.id()),
            product_name: Some(product.name().to_string()),
            quantity,
            unit_price: price.or(Some(product.price())),
            category_vat_rate: category.and_then(|c| c.legacy_vat_rate),
            profile_id: profile.as_ref().map(|p| p.id),
            profile_name: profile.as_ref().map(|p| p.name.clone()),
            profile_name_is: profile.as_ref().map(|p| p.name_is.clone()),
            profile_vat_rate: profile.map(|p| p.vat_rate),
        }
    }

    fn revenue_orders<'a>(&'a self, window: &'a AnalyticsWindow) -> impl Iterator<Item = &'a MemoryOrder> + 'a {
        self.orders.iter().filter(move |o| o.status.counts_as_revenue() && window.contains(o.created_at))
    }

    fn set_default(&mut self, id: i64) {
        for p in self.profiles.values_mut() {
            p.is_default = p.id == id;
        }
    }

    fn attach_categories(&mut self, profile_id: i64, category_ids: &[i64]) {
        for c in self.categories.values_mut() {
            if category_ids.contains(&c.id) {
                c.profile_id = Some(profile_id);
            } else if c.profile_id == Some(profile_id) {
                c.profile_id = None;
            }
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>> {
        self.state.read().map_err(|_| CommerceError::Storage("memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>> {
        self.state.write().map_err(|_| CommerceError::Storage("memory store lock poisoned".into()))
    }

    pub fn add_category(&self, category: MemoryCategory) -> Result<()> {
        self.write()?.categories.insert(category.id, category);
        Ok(())
    }

    pub fn add_product(&self, product: Product, created_at: DateTime<Utc>) -> Result<()> {
        self.write()?.products.insert(product.id(), (product, created_at));
        Ok(())
    }

    pub fn add_order(&self, order: MemoryOrder) -> Result<()> {
        self.write()?.orders.push(order);
        Ok(())
    }

    pub fn add_cart_item(&self, session_id: &str, product_id: i64, quantity: i32) -> Result<()> {
        self.write()?.carts.entry(session_id.to_string()).or_default().push((product_id, quantity));
        Ok(())
    }

    pub fn add_customer(&self, created_at: DateTime<Utc>) -> Result<()> {
        self.write()?.customers.push(created_at);
        Ok(())
    }

    pub fn add_setting(&self, setting: Setting) -> Result<()> {
        self.write()?.settings.push(setting);
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn list_vat_profiles(&self) -> Result<Vec<VatProfile>> {
        let state = self.read()?;
        let mut profiles: Vec<VatProfile> = state.profiles.values().map(|p| state.profile_view(p)).collect();
        profiles.sort_by_key(|p| p.sort_order);
        Ok(profiles)
    }

    async fn get_vat_profile(&self, id: i64) -> Result<Option<VatProfile>> {
        let state = self.read()?;
        Ok(state.profiles.get(&id).map(|p| state.profile_view(p)))
    }

    async fn create_vat_profile(&self, new: NewVatProfile) -> Result<VatProfile> {
        let mut state = self.write()?;
        state.next_profile_id += 1;
        let id = state.next_profile_id;
        let profile = VatProfile {
            id,
            name: new.name,
            name_is: new.name_is,
            description: new.description,
            description_is: new.description_is,
            vat_rate: new.vat_rate.value(),
            is_default: new.is_default,
            sort_order: 0,
            categories: vec![],
        };
        state.profiles.insert(id, profile);
        if new.is_default {
            state.set_default(id);
        }
        state.attach_categories(id, &new.category_ids);
        let view = state.profiles.get(&id).map(|p| state.profile_view(p));
        view.ok_or(CommerceError::NotFound("VAT profile"))
    }

    async fn update_vat_profile(&self, id: i64, changes: VatProfileChanges) -> Result<Option<VatProfile>> {
        let mut state = self.write()?;
        let Some(profile) = state.profiles.get_mut(&id) else { return Ok(None) };
        profile.apply(&changes);
        if changes.is_default == Some(true) {
            state.set_default(id);
        }
        if let Some(category_ids) = &changes.category_ids {
            state.attach_categories(id, category_ids);
        }
        Ok(state.profiles.get(&id).map(|p| state.profile_view(p)))
    }

    async fn delete_vat_profile(&self, id: i64) -> Result<()> {
        self.write()?.profiles.remove(&id);
        Ok(())
    }

    async fn count_profile_categories(&self, id: i64) -> Result<i64> {
        Ok(self.read()?.categories.values().filter(|c| c.profile_id == Some(id)).count() as i64)
    }

    async fn assign_categories(&self, profile_id: i64, category_ids: &[i64]) -> Result<()> {
        self.write()?.attach_categories(profile_id, category_ids);
        Ok(())
    }

    async fn get_category(&self, id: i64) -> Result<Option<Category>> {
        Ok(self.read()?.category(id))
    }

    async fn get_product(&self, id: i64) -> Result<Option<Product>> {
        Ok(self.read()?.products.get(&id).map(|(p, _)| p.clone()))
    }

    async fn save_product_pricing(&self, product: &Product) -> Result<()> {
        let mut state = self.write()?;
        let entry = state.products.get_mut(&product.id()).ok_or(CommerceError::NotFound("Product"))?;
        entry.0 = product.clone();
        Ok(())
    }

    async fn products_with_discounts(&self) -> Result<Vec<Product>> {
        Ok(self.read()?.products.values().filter(|(p, _)| p.discount().is_some()).map(|(p, _)| p.clone()).collect())
    }

    async fn order_lines(&self, order_id: i64) -> Result<Option<Vec<OrderLine>>> {
        let state = self.read()?;
        Ok(state
            .orders
            .iter()
            .find(|o| o.id == order_id)
            .map(|o| o.items.iter().map(|i| state.line(i.product_id, i.quantity, Some(i.price))).collect()))
    }

    async fn cart_lines(&self, session_id: &str) -> Result<Vec<OrderLine>> {
        let state = self.read()?;
        Ok(state
            .carts
            .get(session_id)
            .map(|items| items.iter().map(|(pid, qty)| state.line(*pid, *qty, None)).collect())
            .unwrap_or_default())
    }

    async fn period_totals(&self, window: &AnalyticsWindow) -> Result<PeriodTotals> {
        let state = self.read()?;
        Ok(PeriodTotals {
            revenue: state.revenue_orders(window).fold(Decimal::ZERO, |acc, o| acc.saturating_add(o.total_amount)),
            orders: state.orders.iter().filter(|o| window.contains(o.created_at)).count() as i64,
            customers: state.customers.iter().filter(|at| window.contains(**at)).count() as i64,
            products: state
                .products
                .values()
                .filter(|(p, at)| p.is_active() && window.contains(*at))
                .count() as i64,
        })
    }

    async fn order_status_counts(&self, window: &AnalyticsWindow) -> Result<Vec<StatusCount>> {
        let state = self.read()?;
        let mut counts: BTreeMap<&'static str, i64> = BTreeMap::new();
        for o in state.orders.iter().filter(|o| window.contains(o.created_at)) {
            *counts.entry(o.status.as_str()).or_default() += 1;
        }
        Ok(counts.into_iter().map(|(status, count)| StatusCount { status: status.to_string(), count }).collect())
    }

    async fn top_products(&self, window: &AnalyticsWindow, limit: i64) -> Result<Vec<ProductSales>> {
        let state = self.read()?;
        let mut totals: BTreeMap<i64, (i64, Decimal)> = BTreeMap::new();
        for item in state.revenue_orders(window).flat_map(|o| o.items.iter()) {
            let entry = totals.entry(item.product_id).or_default();
            entry.0 += i64::from(item.quantity);
            entry.1 = entry.1.saturating_add(item.price.saturating_mul(Decimal::from(item.quantity)));
        }
        let mut sales: Vec<ProductSales> = totals
            .into_iter()
            .map(|(product_id, (quantity, revenue))| {
                let product = state.products.get(&product_id).map(|(p, _)| p);
                let category = product.and_then(|p| p.category_id()).and_then(|id| state.categories.get(&id));
                ProductSales {
                    product_id,
                    name: product.map(|p| p.name().to_string()),
                    name_is: product.and_then(|p| p.name_is().map(str::to_string)),
                    category: category.map(|c| c.name.clone()),
                    category_is: category.and_then(|c| c.name_is.clone()),
                    quantity,
                    revenue,
                }
            })
            .collect();
        sales.sort_by(|a, b| b.revenue.cmp(&a.revenue));
        sales.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(sales)
    }

    async fn product_revenue(&self, product_id: i64, window: &AnalyticsWindow) -> Result<Decimal> {
        let state = self.read()?;
        Ok(state
            .revenue_orders(window)
            .flat_map(|o| o.items.iter())
            .filter(|i| i.product_id == product_id)
            .fold(Decimal::ZERO, |acc, i| acc.saturating_add(i.price.saturating_mul(Decimal::from(i.quantity)))))
    }

    async fn lines_between(&self, window: &AnalyticsWindow) -> Result<Vec<OrderLine>> {
        let state = self.read()?;
        Ok(state
            .revenue_orders(window)
            .flat_map(|o| o.items.iter())
            .map(|i| state.line(i.product_id, i.quantity, Some(i.price)))
            .collect())
    }

    async fn daily_revenue(&self, since: DateTime<Utc>) -> Result<Vec<DailyRevenue>> {
        let state = self.read()?;
        let mut days = BTreeMap::new();
        for o in state.orders.iter().filter(|o| o.status.counts_as_revenue() && o.created_at >= since) {
            let day = days.entry(o.created_at.date_naive()).or_insert(Decimal::ZERO);
            *day = day.saturating_add(o.total_amount);
        }
        Ok(days.into_iter().map(|(date, revenue)| DailyRevenue { date, revenue }).collect())
    }

    async fn settings(&self, category: &str) -> Result<Vec<Setting>> {
        Ok(self.read()?.settings.iter().filter(|s| s.category == category).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::Percentage;

    fn new_profile(name: &str, rate: i64, is_default: bool, category_ids: Vec<i64>) -> NewVatProfile {
        NewVatProfile {
            name: name.into(),
            name_is: name.into(),
            description: None,
            description_is: None,
            vat_rate: Percentage::new(Decimal::new(rate, 0)).unwrap(),
            is_default,
            category_ids,
        }
    }

    fn category(id: i64) -> MemoryCategory {
        MemoryCategory { id, name: format!("cat-{id}"), name_is: None, legacy_vat_rate: None, profile_id: None }
    }

    #[tokio::test]
    async fn test_single_default_profile() {
        let store = MemoryStore::new();
        let a = store.create_vat_profile(new_profile("A", 24, true, vec![])).await.unwrap();
        let b = store.create_vat_profile(new_profile("B", 11, true, vec![])).await.unwrap();
        let profiles = store.list_vat_profiles().await.unwrap();
        let defaults: Vec<i64> = profiles.iter().filter(|p| p.is_default).map(|p| p.id).collect();
        assert_eq!(defaults, vec![b.id]);
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn test_assign_categories_replaces_set() {
        let store = MemoryStore::new();
        for id in 1..=3 {
            store.add_category(category(id)).unwrap();
        }
        let p = store.create_vat_profile(new_profile("A", 24, false, vec![1, 2])).await.unwrap();
        assert_eq!(p.categories.len(), 2);
        store.assign_categories(p.id, &[3]).await.unwrap();
        let p = store.get_vat_profile(p.id).await.unwrap().unwrap();
        assert_eq!(p.categories.iter().map(|c| c.id).collect::<Vec<_>>(), vec![3]);
        assert_eq!(store.count_profile_categories(p.id).await.unwrap(), 1);
        assert_eq!(store.get_category(3).await.unwrap().unwrap().profile.map(|s| s.id), Some(p.id));
    }

    #[tokio::test]
    async fn test_order_lines_join_profile() {
        let store = MemoryStore::new();
        store.add_category(category(1)).unwrap();
        let p = store.create_vat_profile(new_profile("Standard", 24, true, vec![1])).await.unwrap();
        store.add_product(Product::create(10, "Gull", Decimal::new(450, 0)).in_category(1), Utc::now()).unwrap();
        store
            .add_order(MemoryOrder {
                id: 1,
                status: OrderStatus::Delivered,
                total_amount: Decimal::new(900, 0),
                created_at: Utc::now(),
                items: vec![
                    MemoryOrderItem { product_id: 10, quantity: 2, price: Decimal::new(450, 0) },
                    MemoryOrderItem { product_id: 99, quantity: 1, price: Decimal::new(100, 0) },
                ],
            })
            .unwrap();
        let lines = store.order_lines(1).await.unwrap().unwrap();
        assert_eq!(lines[0].profile_id, Some(p.id));
        assert_eq!(lines[1].product_id, None);
        assert!(store.order_lines(2).await.unwrap().is_none());
    }
}
