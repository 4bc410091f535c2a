//! Parsing of WooCommerce order webhook bodies.
//!
//! Two payload shapes are accepted and told apart by their discriminator key:
//!
//! - `eventType`: the compact shape emitted by the storefront plugin,
//!   `{ eventType, order: { id, siteId, amount | total, status, ... } }`
//! - `event`: a full WooCommerce order resource wrapped as
//!   `{ event, order: { id, status, total, currency, date_*, billing, line_items, ... } }`
//!
//! Both are normalized into a single [`OrderEvent`]. Unknown extra fields are
//! ignored.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use woosell_types::money::{self, MoneyError};

use crate::application::helpers::site_ref::normalize_site_ref;
use crate::domain::entities::order::{LineItem, OrderEventKind, OrderStatus};

pub const DEFAULT_CURRENCY: &str = "EUR";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("body is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("invalid field `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

impl ParseError {
    /// The payload field the error refers to, if any.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            ParseError::InvalidJson(_) => None,
            ParseError::MissingField(field) => Some(field),
            ParseError::InvalidField { field, .. } => Some(field),
        }
    }
}

/// Canonical order event produced from either payload shape.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderEvent {
    pub kind: OrderEventKind,
    pub upstream_order_id: String,
    pub site_ref: String,
    pub amount_cents: i64,
    pub currency: String,
    pub status: OrderStatus,
    pub line_items: Vec<LineItem>,
    pub customer_ref: Option<String>,
    pub customer_email: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub metadata: Value,
}

/// Inbound body, tagged by the discriminator key present.
#[derive(Debug)]
pub enum WebhookEnvelope {
    Simplified(SimplifiedEnvelope),
    Full(FullEnvelope),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimplifiedEnvelope {
    event_type: String,
    order: Option<SimplifiedOrder>,
    #[serde(alias = "site_id")]
    site_id: Option<Value>,
    domain: Option<String>,
    #[serde(alias = "site_url")]
    site_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SimplifiedOrder {
    id: Option<Value>,
    #[serde(alias = "site_id")]
    site_id: Option<Value>,
    domain: Option<String>,
    #[serde(alias = "site_url")]
    site_url: Option<String>,
    amount: Option<Value>,
    total: Option<Value>,
    status: Option<String>,
    currency: Option<String>,
    #[serde(alias = "customer_email")]
    customer_email: Option<String>,
    #[serde(alias = "customer_id")]
    customer_id: Option<Value>,
    billing: Option<WooBilling>,
    #[serde(alias = "line_items")]
    line_items: Option<Vec<WooLineItem>>,
    #[serde(alias = "date_completed")]
    date_completed: Option<String>,
    #[serde(alias = "date_created")]
    date_created: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FullEnvelope {
    event: String,
    order: Option<WooOrder>,
    #[serde(alias = "siteId")]
    site_id: Option<Value>,
    domain: Option<String>,
    #[serde(alias = "siteUrl")]
    site_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WooOrder {
    id: Option<Value>,
    status: Option<String>,
    currency: Option<String>,
    total: Option<Value>,
    customer_id: Option<Value>,
    billing: Option<WooBilling>,
    line_items: Option<Vec<WooLineItem>>,
    date_created: Option<String>,
    date_created_gmt: Option<String>,
    date_completed: Option<String>,
    date_completed_gmt: Option<String>,
    #[serde(alias = "siteId")]
    site_id: Option<Value>,
    domain: Option<String>,
    #[serde(alias = "siteUrl")]
    site_url: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct WooBilling {
    email: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WooLineItem {
    #[serde(alias = "productId")]
    product_id: Option<Value>,
    name: Option<String>,
    quantity: Option<Value>,
    price: Option<Value>,
    #[serde(alias = "unitPrice")]
    unit_price: Option<Value>,
    total: Option<Value>,
}

/// Shape-independent view used to build the event.
struct OrderFields {
    shape: &'static str,
    topic: String,
    id: Option<Value>,
    status: Option<String>,
    amount: Option<(&'static str, Value)>,
    currency: Option<String>,
    customer_id: Option<Value>,
    customer_email: Option<String>,
    billing: WooBilling,
    line_items: Vec<WooLineItem>,
    // Ordered by preference.
    dates: Vec<(&'static str, Option<String>)>,
    explicit_site_refs: Vec<Option<String>>,
    site_urls: Vec<Option<String>>,
}

impl WebhookEnvelope {
    pub fn from_slice(raw_body: &[u8]) -> Result<Self, ParseError> {
        let value: Value = serde_json::from_slice(raw_body)
            .map_err(|e| ParseError::InvalidJson(e.to_string()))?;
        let Some(object) = value.as_object() else {
            return Err(ParseError::InvalidJson("expected a JSON object".into()));
        };

        if object.contains_key("eventType") {
            serde_json::from_value(value)
                .map(WebhookEnvelope::Simplified)
                .map_err(|e| invalid("eventType", e))
        } else if object.contains_key("event") {
            serde_json::from_value(value)
                .map(WebhookEnvelope::Full)
                .map_err(|e| invalid("event", e))
        } else {
            Err(ParseError::MissingField("eventType"))
        }
    }

    fn into_fields(self) -> Result<OrderFields, ParseError> {
        match self {
            WebhookEnvelope::Simplified(env) => {
                let order = env.order.ok_or(ParseError::MissingField("order"))?;
                let amount = match (order.amount, order.total) {
                    (Some(amount), _) => Some(("amount", amount)),
                    (None, Some(total)) => Some(("total", total)),
                    (None, None) => None,
                };
                Ok(OrderFields {
                    shape: "simplified",
                    topic: env.event_type,
                    id: order.id,
                    status: order.status,
                    amount,
                    currency: order.currency,
                    customer_id: order.customer_id,
                    customer_email: order.customer_email,
                    billing: order.billing.unwrap_or_default(),
                    line_items: order.line_items.unwrap_or_default(),
                    dates: vec![
                        ("date_completed", order.date_completed),
                        ("date_created", order.date_created),
                    ],
                    explicit_site_refs: vec![
                        order.site_id.as_ref().and_then(scalar_to_string),
                        order.domain,
                        env.site_id.as_ref().and_then(scalar_to_string),
                        env.domain,
                    ],
                    site_urls: vec![order.site_url, env.site_url],
                })
            }
            WebhookEnvelope::Full(env) => {
                let order = env.order.ok_or(ParseError::MissingField("order"))?;
                Ok(OrderFields {
                    shape: "full",
                    topic: env.event,
                    id: order.id,
                    status: order.status,
                    amount: order.total.map(|total| ("total", total)),
                    currency: order.currency,
                    customer_id: order.customer_id,
                    customer_email: None,
                    billing: order.billing.unwrap_or_default(),
                    line_items: order.line_items.unwrap_or_default(),
                    dates: vec![
                        ("date_completed_gmt", order.date_completed_gmt),
                        ("date_completed", order.date_completed),
                        ("date_created_gmt", order.date_created_gmt),
                        ("date_created", order.date_created),
                    ],
                    explicit_site_refs: vec![
                        order.site_id.as_ref().and_then(scalar_to_string),
                        order.domain,
                        env.site_id.as_ref().and_then(scalar_to_string),
                        env.domain,
                    ],
                    site_urls: vec![order.site_url, env.site_url],
                })
            }
        }
    }
}

/// Parse a raw webhook body into an [`OrderEvent`].
///
/// `source_hint` is the `X-WC-Webhook-Source` header, used as the last
/// fallback for identifying the site. `received_at` stands in for the order
/// timestamp when the payload carries none.
pub fn parse_order_webhook(
    raw_body: &[u8],
    source_hint: Option<&str>,
    received_at: DateTime<Utc>,
) -> Result<OrderEvent, ParseError> {
    let fields = WebhookEnvelope::from_slice(raw_body)?.into_fields()?;

    let upstream_order_id = fields
        .id
        .as_ref()
        .and_then(scalar_to_string)
        .ok_or(ParseError::MissingField("order.id"))?;

    let raw_status = fields
        .status
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(ParseError::MissingField("order.status"))?;
    let status = OrderStatus::from_str(raw_status);

    let (amount_field, amount_value) = fields.amount.ok_or(ParseError::MissingField("order.amount"))?;
    let amount_cents = amount_to_cents(amount_field, &amount_value)?;

    let currency = match fields.currency.as_deref().map(str::trim) {
        None | Some("") => DEFAULT_CURRENCY.to_string(),
        Some(code) if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) => {
            code.to_ascii_uppercase()
        }
        Some(code) => {
            return Err(ParseError::InvalidField {
                field: "order.currency",
                reason: format!("`{code}` is not an ISO 4217 code"),
            });
        }
    };

    let site_ref = fields
        .explicit_site_refs
        .into_iter()
        .chain(fields.site_urls)
        .chain(std::iter::once(source_hint.map(str::to_string)))
        .flatten()
        .find_map(|candidate| normalize_site_ref(&candidate))
        .ok_or(ParseError::MissingField("siteId"))?;

    let mut occurred_at = None;
    for (field, raw) in fields.dates {
        let Some(raw) = raw.as_deref().map(str::trim).filter(|s| !s.is_empty()) else {
            continue;
        };
        occurred_at = Some(parse_timestamp(raw).ok_or_else(|| ParseError::InvalidField {
            field,
            reason: format!("`{raw}` is not a timestamp"),
        })?);
        break;
    }

    let line_items = fields
        .line_items
        .iter()
        .map(to_line_item)
        .collect::<Result<Vec<_>, _>>()?;

    let customer_ref = fields
        .customer_id
        .as_ref()
        .and_then(scalar_to_string)
        .filter(|id| id != "0");

    let customer_email = fields
        .customer_email
        .or(fields.billing.email.clone())
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty());

    let customer_name = [fields.billing.first_name, fields.billing.last_name]
        .into_iter()
        .flatten()
        .map(|part| part.trim().to_string())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    let kind = OrderEventKind::from_topic(&fields.topic, status);

    let mut metadata = serde_json::json!({
        "shape": fields.shape,
        "topic": fields.topic,
        "raw_status": raw_status,
    });
    if !customer_name.is_empty() {
        metadata["customer_name"] = Value::String(customer_name);
    }

    Ok(OrderEvent {
        kind,
        upstream_order_id,
        site_ref,
        amount_cents,
        currency,
        status,
        line_items,
        customer_ref,
        customer_email,
        occurred_at: occurred_at.unwrap_or(received_at),
        metadata,
    })
}

fn invalid(field: &'static str, err: serde_json::Error) -> ParseError {
    ParseError::InvalidField {
        field,
        reason: err.to_string(),
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn amount_to_cents(field: &'static str, value: &Value) -> Result<i64, ParseError> {
    let parsed = match value {
        Value::Number(n) => money::number_to_minor_units(n),
        Value::String(s) => money::parse_minor_units(s),
        Value::Null => return Err(ParseError::MissingField("order.amount")),
        other => Err(MoneyError::NotANumber(other.to_string())),
    };
    parsed.map_err(|e| ParseError::InvalidField {
        field: if field == "total" { "order.total" } else { "order.amount" },
        reason: e.to_string(),
    })
}

/// RFC 3339, or a naive ISO-8601 timestamp which is taken to be UTC.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn to_line_item(item: &WooLineItem) -> Result<LineItem, ParseError> {
    let quantity = item
        .quantity
        .as_ref()
        .and_then(|q| match q {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
        .unwrap_or(1)
        .max(0);

    let price = item.unit_price.as_ref().or(item.price.as_ref());
    let unit_price_cents = match price {
        Some(value) => amount_to_cents("amount", value).map_err(|e| match e {
            ParseError::InvalidField { reason, .. } => ParseError::InvalidField {
                field: "order.line_items.price",
                reason,
            },
            other => other,
        })?,
        None => match item.total.as_ref() {
            Some(total) if quantity > 0 => amount_to_cents("total", total).map(|t| t / quantity)?,
            _ => 0,
        },
    };

    Ok(LineItem {
        product_id: item.product_id.as_ref().and_then(scalar_to_string),
        name: item.name.clone().unwrap_or_default(),
        quantity,
        unit_price_cents,
    })
}
