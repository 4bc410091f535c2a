//! Mocks for billing storage and the external payment and provisioning services.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::use_cases::{
        billing::{
            BillingPortal, BillingProfile, BillingRepoTrait, NewPayment, PaymentRecord,
            SubscriptionLink, UsageSnapshot,
        },
        site::{ProvisionOutcome, ProvisionRequest, ProvisionStatus, SiteCredentials, SiteProvisioner},
    },
    domain::entities::billing::SubscriptionStatus,
};

// ============================================================================
// Billing records
// ============================================================================

#[derive(Default)]
pub struct InMemoryBillingRepo {
    pub records: Mutex<HashMap<Uuid, BillingProfile>>,
    pub payments: Mutex<Vec<PaymentRecord>>,
    pub processed_events: Mutex<HashSet<String>>,
}

impl InMemoryBillingRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, billing: BillingProfile) {
        self.records.lock().unwrap().insert(billing.user_id, billing);
    }

    pub fn get(&self, user_id: Uuid) -> Option<BillingProfile> {
        self.records.lock().unwrap().get(&user_id).cloned()
    }

    pub fn payments(&self) -> Vec<PaymentRecord> {
        self.payments.lock().unwrap().clone()
    }

    fn find(&self, pred: impl Fn(&BillingProfile) -> bool) -> Option<BillingProfile> {
        self.records.lock().unwrap().values().find(|b| pred(b)).cloned()
    }
}

#[async_trait]
impl BillingRepoTrait for InMemoryBillingRepo {
    async fn get_by_user(&self, user_id: Uuid) -> AppResult<Option<BillingProfile>> {
        Ok(self.get(user_id))
    }

    async fn get_by_customer_id(&self, customer_id: &str) -> AppResult<Option<BillingProfile>> {
        Ok(self.find(|b| b.stripe_customer_id == customer_id))
    }

    async fn get_by_subscription_id(
        &self,
        subscription_id: &str,
    ) -> AppResult<Option<BillingProfile>> {
        Ok(self.find(|b| b.stripe_subscription_id.as_deref() == Some(subscription_id)))
    }

    async fn upsert_subscription(&self, link: &SubscriptionLink) -> AppResult<BillingProfile> {
        let mut records = self.records.lock().unwrap();
        let now = Utc::now();
        let record = records.entry(link.user_id).or_insert_with(|| BillingProfile {
            user_id: link.user_id,
            stripe_customer_id: link.stripe_customer_id.clone(),
            stripe_subscription_id: None,
            stripe_subscription_item_id: None,
            subscription_status: SubscriptionStatus::Incomplete,
            current_period_start: None,
            current_period_end: None,
            usage: UsageSnapshot::default(),
            invoice_email: link.invoice_email.clone(),
            invoice_business_name: None,
            invoice_vat_number: None,
            created_at: now,
            updated_at: now,
        });
        record.stripe_customer_id = link.stripe_customer_id.clone();
        record.stripe_subscription_id = link.stripe_subscription_id.clone();
        record.stripe_subscription_item_id = link.stripe_subscription_item_id.clone();
        record.subscription_status = link.status;
        record.current_period_start = Some(link.period_start);
        record.current_period_end = Some(link.period_end);
        record.invoice_email = link.invoice_email.clone();
        record.updated_at = now;
        Ok(record.clone())
    }

    async fn update_subscription_status(
        &self,
        user_id: Uuid,
        status: SubscriptionStatus,
        period_start: Option<DateTime<Utc>>,
        period_end: Option<DateTime<Utc>>,
    ) -> AppResult<()> {
        let mut records = self.records.lock().unwrap();
        let record = records.get_mut(&user_id).ok_or(AppError::NotFound)?;
        record.subscription_status = status;
        if period_start.is_some() {
            record.current_period_start = period_start;
        }
        if period_end.is_some() {
            record.current_period_end = period_end;
        }
        record.updated_at = Utc::now();
        Ok(())
    }

    async fn update_usage_snapshot(
        &self,
        user_id: Uuid,
        snapshot: &UsageSnapshot,
    ) -> AppResult<bool> {
        let mut records = self.records.lock().unwrap();
        match records.get_mut(&user_id) {
            Some(record) => {
                record.usage = snapshot.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn append_payment(&self, payment: &NewPayment) -> AppResult<bool> {
        let mut payments = self.payments.lock().unwrap();
        if payments
            .iter()
            .any(|p| {
                p.processor_reference == payment.processor_reference && p.status == payment.status
            })
        {
            return Ok(false);
        }
        payments.push(PaymentRecord {
            id: Uuid::new_v4(),
            user_id: payment.user_id,
            amount_cents: payment.amount_cents,
            currency: payment.currency.clone(),
            status: payment.status,
            processor_reference: payment.processor_reference.clone(),
            paid_at: payment.paid_at,
            created_at: Utc::now(),
        });
        Ok(true)
    }

    async fn list_payments(&self, user_id: Uuid) -> AppResult<Vec<PaymentRecord>> {
        let mut payments: Vec<_> = self
            .payments()
            .into_iter()
            .filter(|p| p.user_id == user_id)
            .collect();
        payments.sort_by(|a, b| b.paid_at.cmp(&a.paid_at));
        Ok(payments)
    }

    async fn is_event_processed(&self, event_id: &str) -> AppResult<bool> {
        Ok(self.processed_events.lock().unwrap().contains(event_id))
    }

    async fn mark_event_processed(&self, event_id: &str, _event_type: &str) -> AppResult<()> {
        self.processed_events
            .lock()
            .unwrap()
            .insert(event_id.to_string());
        Ok(())
    }
}

// ============================================================================
// Billing portal
// ============================================================================

#[derive(Default)]
pub struct MockBillingPortal;

#[async_trait]
impl BillingPortal for MockBillingPortal {
    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> AppResult<String> {
        Ok(format!(
            "https://billing.test/session/{customer_id}?return_url={return_url}"
        ))
    }
}

// ============================================================================
// Site provisioner
// ============================================================================

enum ProvisionerMode {
    Ready(SiteCredentials),
    Pending(String),
    Failing(String),
}

/// Recorded request, without the password.
#[derive(Debug, Clone)]
pub struct RecordedProvisionRequest {
    pub domain: String,
    pub name: String,
    pub user_id: Uuid,
    pub product_type: String,
}

pub struct MockSiteProvisioner {
    mode: ProvisionerMode,
    status: Mutex<ProvisionStatus>,
    requests: Mutex<Vec<RecordedProvisionRequest>>,
}

impl MockSiteProvisioner {
    fn with_mode(mode: ProvisionerMode) -> Self {
        Self {
            mode,
            status: Mutex::new(ProvisionStatus::Pending),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Provisions synchronously with `credentials`.
    pub fn ready(credentials: SiteCredentials) -> Self {
        Self::with_mode(ProvisionerMode::Ready(credentials))
    }

    /// Queues every request under `task_id`.
    pub fn pending(task_id: &str) -> Self {
        Self::with_mode(ProvisionerMode::Pending(task_id.to_string()))
    }

    pub fn failing(reason: &str) -> Self {
        Self::with_mode(ProvisionerMode::Failing(reason.to_string()))
    }

    /// Status reported for queued tasks from now on.
    pub fn set_status(&self, status: ProvisionStatus) {
        *self.status.lock().unwrap() = status;
    }

    pub fn requests(&self) -> Vec<RecordedProvisionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl SiteProvisioner for MockSiteProvisioner {
    async fn create_site(&self, request: &ProvisionRequest) -> AppResult<ProvisionOutcome> {
        self.requests.lock().unwrap().push(RecordedProvisionRequest {
            domain: request.domain.clone(),
            name: request.name.clone(),
            user_id: request.user_id,
            product_type: request.product_type.clone(),
        });

        match &self.mode {
            ProvisionerMode::Ready(credentials) => Ok(ProvisionOutcome::Ready(credentials.clone())),
            ProvisionerMode::Pending(task_id) => Ok(ProvisionOutcome::Pending {
                task_id: task_id.clone(),
            }),
            ProvisionerMode::Failing(reason) => Err(AppError::UpstreamProvisioning(reason.clone())),
        }
    }

    async fn task_status(&self, _task_id: &str) -> AppResult<ProvisionStatus> {
        Ok(self.status.lock().unwrap().clone())
    }
}
