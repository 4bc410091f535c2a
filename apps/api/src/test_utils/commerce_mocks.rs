//! In-memory store for sites and their orders.
//!
//! Sites and orders share one lock so order inserts and counter updates
//! are observed together, like the database transaction they stand in for.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::use_cases::{
        order_ledger::{
            LedgerWrite, NewOrder, OrderProfile, OrderRepoTrait, SiteCounters, UsageTotals,
        },
        site::{NewSite, SiteCredentials, SiteProfile, SiteRepoTrait},
    },
    domain::entities::{billing_period::BillingPeriod, site::SiteStatus},
};

#[derive(Default)]
struct CommerceState {
    sites: HashMap<Uuid, SiteProfile>,
    orders: Vec<OrderProfile>,
}

#[derive(Default)]
pub struct InMemoryCommerceStore {
    state: Mutex<CommerceState>,
    fail_writes: AtomicBool,
}

impl InMemoryCommerceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sites(sites: Vec<SiteProfile>) -> Self {
        let store = Self::default();
        store.state.lock().unwrap().sites = sites.into_iter().map(|s| (s.id, s)).collect();
        store
    }

    pub fn get_site(&self, id: Uuid) -> Option<SiteProfile> {
        self.state.lock().unwrap().sites.get(&id).cloned()
    }

    pub fn get_all_sites(&self) -> Vec<SiteProfile> {
        self.state.lock().unwrap().sites.values().cloned().collect()
    }

    pub fn get_all_orders(&self) -> Vec<OrderProfile> {
        self.state.lock().unwrap().orders.clone()
    }

    /// Overwrite the counters of a site without touching its orders.
    pub fn corrupt_counters(&self, site_id: Uuid, order_count: i64, revenue_cents: i64) {
        if let Some(site) = self.state.lock().unwrap().sites.get_mut(&site_id) {
            site.order_count = order_count;
            site.revenue_cents = revenue_cents;
        }
    }

    /// Make every subsequent order insert fail with a database error.
    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    fn usage<F>(&self, period: BillingPeriod, belongs: F) -> UsageTotals
    where
        F: Fn(&CommerceState, &OrderProfile) -> bool,
    {
        let guard = self.state.lock().unwrap();
        let state: &CommerceState = &guard;
        state
            .orders
            .iter()
            .filter(|o| o.status.is_completed())
            .filter(|o| period.contains(o.occurred_at))
            .filter(|o| belongs(state, o))
            .fold(UsageTotals::default(), |acc, o| UsageTotals {
                order_count: acc.order_count + 1,
                revenue_cents: acc.revenue_cents + o.amount_cents,
            })
    }
}

#[async_trait]
impl SiteRepoTrait for InMemoryCommerceStore {
    async fn create(&self, site: &NewSite) -> AppResult<SiteProfile> {
        let mut state = self.state.lock().unwrap();
        if state.sites.values().any(|s| s.domain == site.domain) {
            return Err(AppError::InvalidInput("Domain is already in use".into()));
        }
        let now = Utc::now();
        let profile = SiteProfile {
            id: Uuid::new_v4(),
            user_id: site.user_id,
            domain: site.domain.clone(),
            name: site.name.clone(),
            product_type: site.product_type.clone(),
            status: SiteStatus::Creating,
            order_count: 0,
            revenue_cents: 0,
            currency: "EUR".to_string(),
            admin_url: None,
            consumer_key: None,
            consumer_secret: None,
            provisioning_task_id: None,
            last_order_at: None,
            last_sync_at: None,
            created_at: now,
            updated_at: now,
        };
        state.sites.insert(profile.id, profile.clone());
        Ok(profile)
    }

    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<SiteProfile>> {
        Ok(self.get_site(id))
    }

    async fn get_by_domain(&self, domain: &str) -> AppResult<Option<SiteProfile>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .sites
            .values()
            .find(|s| s.domain == domain)
            .cloned())
    }

    async fn get_by_task_id(&self, task_id: &str) -> AppResult<Option<SiteProfile>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .sites
            .values()
            .find(|s| s.provisioning_task_id.as_deref() == Some(task_id))
            .cloned())
    }

    async fn list_by_user(&self, user_id: Uuid) -> AppResult<Vec<SiteProfile>> {
        let mut sites: Vec<_> = self
            .state
            .lock()
            .unwrap()
            .sites
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        sites.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sites)
    }

    async fn list_all(&self) -> AppResult<Vec<SiteProfile>> {
        let mut sites = self.get_all_sites();
        sites.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sites)
    }

    async fn set_pending_task(&self, id: Uuid, task_id: &str) -> AppResult<SiteProfile> {
        let mut state = self.state.lock().unwrap();
        let site = state.sites.get_mut(&id).ok_or(AppError::NotFound)?;
        site.provisioning_task_id = Some(task_id.to_string());
        site.updated_at = Utc::now();
        Ok(site.clone())
    }

    async fn activate(&self, id: Uuid, credentials: &SiteCredentials) -> AppResult<SiteProfile> {
        let mut state = self.state.lock().unwrap();
        let site = state.sites.get_mut(&id).ok_or(AppError::NotFound)?;
        site.status = SiteStatus::Active;
        site.consumer_key = Some(credentials.consumer_key.clone());
        site.consumer_secret = Some(credentials.consumer_secret.clone());
        site.admin_url = credentials.admin_url.clone();
        site.provisioning_task_id = None;
        site.updated_at = Utc::now();
        Ok(site.clone())
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let mut state = self.state.lock().unwrap();
        state.sites.remove(&id);
        state.orders.retain(|o| o.site_id != id);
        Ok(())
    }
}

#[async_trait]
impl OrderRepoTrait for InMemoryCommerceStore {
    async fn insert_completed_order(&self, order: &NewOrder) -> AppResult<LedgerWrite> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Database("simulated write failure".into()));
        }

        let mut state = self.state.lock().unwrap();
        if state
            .orders
            .iter()
            .any(|o| o.site_id == order.site_id && o.upstream_order_id == order.upstream_order_id)
        {
            return Ok(LedgerWrite::Duplicate);
        }

        let profile = OrderProfile {
            id: Uuid::new_v4(),
            site_id: order.site_id,
            upstream_order_id: order.upstream_order_id.clone(),
            customer_ref: order.customer_ref.clone(),
            customer_email: order.customer_email.clone(),
            amount_cents: order.amount_cents,
            currency: order.currency.clone(),
            status: order.status,
            line_items: order.line_items.clone(),
            billing_period_start: order.period.start(),
            billing_period_end: order.period.last_instant(),
            metadata: order.metadata.clone(),
            occurred_at: order.occurred_at,
            created_at: Utc::now(),
        };

        let site = state
            .sites
            .get_mut(&order.site_id)
            .ok_or_else(|| AppError::Database("site row missing".into()))?;
        site.order_count += 1;
        site.revenue_cents += order.amount_cents;
        site.last_order_at = Some(
            site.last_order_at
                .map_or(order.occurred_at, |prev| prev.max(order.occurred_at)),
        );
        site.updated_at = Utc::now();

        state.orders.push(profile.clone());
        Ok(LedgerWrite::Inserted(profile))
    }

    async fn usage_for_site(&self, site_id: Uuid, period: BillingPeriod) -> AppResult<UsageTotals> {
        Ok(self.usage(period, |_, o| o.site_id == site_id))
    }

    async fn usage_for_user(&self, user_id: Uuid, period: BillingPeriod) -> AppResult<UsageTotals> {
        Ok(self.usage(period, |state, o| {
            state
                .sites
                .get(&o.site_id)
                .is_some_and(|s| s.user_id == user_id)
        }))
    }

    async fn recompute_site_counters(&self, site_id: Uuid) -> AppResult<SiteCounters> {
        let mut state = self.state.lock().unwrap();
        let (order_count, revenue_cents, last_order_at) = state
            .orders
            .iter()
            .filter(|o| o.site_id == site_id && o.status.is_completed())
            .fold((0i64, 0i64, None::<DateTime<Utc>>), |(n, r, last), o| {
                (
                    n + 1,
                    r + o.amount_cents,
                    Some(last.map_or(o.occurred_at, |l| l.max(o.occurred_at))),
                )
            });

        let site = state.sites.get_mut(&site_id).ok_or(AppError::NotFound)?;
        site.order_count = order_count;
        site.revenue_cents = revenue_cents;
        site.last_order_at = last_order_at;
        site.updated_at = Utc::now();

        Ok(SiteCounters {
            order_count,
            revenue_cents,
            last_order_at,
        })
    }
}
