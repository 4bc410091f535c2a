use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionStatus {
    Active,
    PastDue,
    Canceled,
    Unpaid,
    Incomplete,
    Trialing,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Canceled => "canceled",
            SubscriptionStatus::Unpaid => "unpaid",
            SubscriptionStatus::Incomplete => "incomplete",
            SubscriptionStatus::Trialing => "trialing",
        }
    }

    /// Also used for Stripe subscription statuses, which share the vocabulary.
    pub fn from_str(s: &str) -> Self {
        match s {
            "active" => SubscriptionStatus::Active,
            "past_due" => SubscriptionStatus::PastDue,
            "canceled" | "incomplete_expired" => SubscriptionStatus::Canceled,
            "unpaid" => SubscriptionStatus::Unpaid,
            "trialing" => SubscriptionStatus::Trialing,
            _ => SubscriptionStatus::Incomplete,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Succeeded,
    Failed,
    Pending,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Succeeded => "succeeded",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Pending => "pending",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "succeeded" => PaymentStatus::Succeeded,
            "failed" => PaymentStatus::Failed,
            _ => PaymentStatus::Pending,
        }
    }
}

/// Flat monthly fee plus a fee per completed order, in minor units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BillingPricing {
    pub base_fee_cents: i64,
    pub per_order_fee_cents: i64,
}

impl Default for BillingPricing {
    fn default() -> Self {
        Self {
            base_fee_cents: 100,
            per_order_fee_cents: 50,
        }
    }
}

impl BillingPricing {
    pub fn bill(&self, order_count: i64) -> MonthlyBill {
        let order_count = order_count.max(0);
        let usage_cents = order_count.saturating_mul(self.per_order_fee_cents);
        MonthlyBill {
            order_count,
            base_cents: self.base_fee_cents,
            usage_cents,
            total_cents: self.base_fee_cents.saturating_add(usage_cents),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MonthlyBill {
    pub order_count: i64,
    pub base_cents: i64,
    pub usage_cents: i64,
    pub total_cents: i64,
}
