use serde::{Deserialize, Serialize};

/// WooCommerce order status as reported by the storefront.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Pending,
    Processing,
    OnHold,
    Completed,
    Cancelled,
    Refunded,
    Failed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::OnHold => "on-hold",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
            OrderStatus::Failed => "failed",
        }
    }

    /// Lenient conversion: WooCommerce sends `wc-` prefixed statuses from some hooks.
    pub fn from_str(s: &str) -> Self {
        let s = s.trim().to_ascii_lowercase();
        match s.strip_prefix("wc-").unwrap_or(s.as_str()) {
            "processing" => OrderStatus::Processing,
            "on-hold" | "on_hold" => OrderStatus::OnHold,
            "completed" => OrderStatus::Completed,
            "cancelled" | "canceled" => OrderStatus::Cancelled,
            "refunded" => OrderStatus::Refunded,
            "failed" => OrderStatus::Failed,
            _ => OrderStatus::Pending,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, OrderStatus::Completed)
    }
}

/// What the storefront says happened to the order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderEventKind {
    Created,
    Updated,
    Completed,
    Deleted,
    Other(String),
}

impl OrderEventKind {
    pub fn as_str(&self) -> &str {
        match self {
            OrderEventKind::Created => "created",
            OrderEventKind::Updated => "updated",
            OrderEventKind::Completed => "completed",
            OrderEventKind::Deleted => "deleted",
            OrderEventKind::Other(topic) => topic,
        }
    }

    /// Derive the kind from the delivery topic and the order's status.
    ///
    /// Stores configured with `order.updated` or `order.created` hooks still
    /// produce billable events when the order already is completed.
    pub fn from_topic(topic: &str, status: OrderStatus) -> Self {
        let topic = topic.trim().to_ascii_lowercase();
        match topic.as_str() {
            "order.completed" | "order.created" | "order.updated" if status.is_completed() => {
                OrderEventKind::Completed
            }
            "order.created" => OrderEventKind::Created,
            "order.updated" | "order.completed" => OrderEventKind::Updated,
            "order.deleted" => OrderEventKind::Deleted,
            _ => OrderEventKind::Other(topic),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LineItem {
    pub product_id: Option<String>,
    pub name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
}
