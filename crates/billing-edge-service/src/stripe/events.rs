//! Typed Stripe webhook events.
//!
//! Only the fields this service logs or hands to hooks are modelled. All of
//! them are optional or defaulted so new provider fields never break parsing.

use std::collections::HashMap;

use serde::Deserialize;

/// Errors from turning a verified payload into an `Event`.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    /// The payload is not a Stripe event envelope.
    #[error("invalid event envelope: {0}")]
    Envelope(#[source] serde_json::Error),

    /// The event object did not match its declared type.
    #[error("invalid {event_type} object: {source}")]
    Object {
        /// The declared event type.
        event_type: String,
        /// The underlying parse error.
        #[source]
        source: serde_json::Error,
    },
}

/// A verified Stripe event.
#[derive(Debug, Clone)]
pub struct Event {
    /// Event ID (`evt_...`).
    pub id: String,
    /// Created timestamp (Unix).
    pub created: i64,
    /// Whether the event came from live mode.
    pub livemode: bool,
    /// The typed payload.
    pub payload: EventPayload,
}

/// The event kinds this service understands.
#[derive(Debug, Clone)]
pub enum EventPayload {
    /// `checkout.session.completed`
    CheckoutSessionCompleted(CheckoutSession),
    /// `customer.subscription.created`
    SubscriptionCreated(StripeSubscription),
    /// `customer.subscription.updated`
    SubscriptionUpdated(StripeSubscription),
    /// `customer.subscription.deleted`
    SubscriptionDeleted(StripeSubscription),
    /// `invoice.paid`
    InvoicePaid(Invoice),
    /// `invoice.payment_failed`
    InvoicePaymentFailed(Invoice),
    /// Any other event type.
    Unhandled {
        /// The declared event type.
        event_type: String,
    },
}

impl EventPayload {
    /// The Stripe event type string.
    #[must_use]
    pub fn event_type(&self) -> &str {
        match self {
            Self::CheckoutSessionCompleted(_) => "checkout.session.completed",
            Self::SubscriptionCreated(_) => "customer.subscription.created",
            Self::SubscriptionUpdated(_) => "customer.subscription.updated",
            Self::SubscriptionDeleted(_) => "customer.subscription.deleted",
            Self::InvoicePaid(_) => "invoice.paid",
            Self::InvoicePaymentFailed(_) => "invoice.payment_failed",
            Self::Unhandled { event_type } => event_type,
        }
    }
}

#[derive(Deserialize)]
struct Envelope {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    created: i64,
    #[serde(default)]
    livemode: bool,
    data: EnvelopeData,
}

#[derive(Deserialize)]
struct EnvelopeData {
    object: serde_json::Value,
}

impl Event {
    /// Parse a verified webhook body.
    ///
    /// # Errors
    ///
    /// Returns `EventError` if the body is not an event envelope or a known
    /// event's object has the wrong shape.
    pub fn from_slice(payload: &[u8]) -> Result<Self, EventError> {
        let envelope: Envelope = serde_json::from_slice(payload).map_err(EventError::Envelope)?;
        let event_type = envelope.event_type;

        let payload =
            typed_payload(&event_type, envelope.data.object).map_err(|source| EventError::Object {
                event_type: event_type.clone(),
                source,
            })?;

        Ok(Self {
            id: envelope.id,
            created: envelope.created,
            livemode: envelope.livemode,
            payload,
        })
    }
}

fn typed_payload(
    event_type: &str,
    object: serde_json::Value,
) -> Result<EventPayload, serde_json::Error> {
    Ok(match event_type {
        "checkout.session.completed" => {
            EventPayload::CheckoutSessionCompleted(serde_json::from_value(object)?)
        }
        "customer.subscription.created" => {
            EventPayload::SubscriptionCreated(serde_json::from_value(object)?)
        }
        "customer.subscription.updated" => {
            EventPayload::SubscriptionUpdated(serde_json::from_value(object)?)
        }
        "customer.subscription.deleted" => {
            EventPayload::SubscriptionDeleted(serde_json::from_value(object)?)
        }
        "invoice.paid" => EventPayload::InvoicePaid(serde_json::from_value(object)?),
        "invoice.payment_failed" => {
            EventPayload::InvoicePaymentFailed(serde_json::from_value(object)?)
        }
        other => EventPayload::Unhandled {
            event_type: other.to_string(),
        },
    })
}

/// Stripe Checkout session object.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutSession {
    /// Session ID (`cs_...`).
    pub id: String,
    /// Customer ID.
    #[serde(default)]
    pub customer: Option<String>,
    /// Email collected before the customer object existed.
    #[serde(default)]
    pub customer_email: Option<String>,
    /// Customer details collected at checkout.
    #[serde(default)]
    pub customer_details: Option<CustomerDetails>,
    /// Total amount in the smallest currency unit.
    #[serde(default)]
    pub amount_total: Option<i64>,
    /// Three-letter ISO currency code.
    #[serde(default)]
    pub currency: Option<String>,
    /// Checkout mode (`payment`, `subscription`, `setup`).
    #[serde(default)]
    pub mode: Option<String>,
    /// Payment status.
    #[serde(default)]
    pub payment_status: Option<String>,
    /// Subscription created by the session, for subscription mode.
    #[serde(default)]
    pub subscription: Option<String>,
    /// Metadata set when the session was created.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Customer details on a Checkout session.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerDetails {
    /// Customer email.
    #[serde(default)]
    pub email: Option<String>,
    /// Customer name.
    #[serde(default)]
    pub name: Option<String>,
}

/// Order fields extracted from a completed Checkout session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSummary<'a> {
    /// Product name from metadata.
    pub product: Option<&'a str>,
    /// Pricing tier from metadata.
    pub tier: Option<&'a str>,
    /// Customer email.
    pub customer_email: Option<&'a str>,
    /// Total amount in the smallest currency unit.
    pub amount_total: Option<i64>,
    /// Currency code.
    pub currency: Option<&'a str>,
    /// Session ID.
    pub session_id: &'a str,
}

impl CheckoutSession {
    /// Extract the order fields logged for a completed checkout.
    #[must_use]
    pub fn order_summary(&self) -> OrderSummary<'_> {
        let meta = |key: &str| self.metadata.get(key).map(String::as_str);
        OrderSummary {
            product: meta("product_name").or_else(|| meta("product")),
            tier: meta("tier"),
            customer_email: self
                .customer_details
                .as_ref()
                .and_then(|d| d.email.as_deref())
                .or(self.customer_email.as_deref()),
            amount_total: self.amount_total,
            currency: self.currency.as_deref(),
            session_id: &self.id,
        }
    }
}

/// Stripe subscription object.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StripeSubscription {
    /// Subscription ID (`sub_...`).
    pub id: String,
    /// Subscription status.
    #[serde(default)]
    pub status: Option<String>,
    /// Customer ID.
    #[serde(default)]
    pub customer: Option<String>,
    /// Whether the subscription ends with the current period.
    #[serde(default)]
    pub cancel_at_period_end: bool,
    /// Current period start (Unix).
    #[serde(default)]
    pub current_period_start: Option<i64>,
    /// Current period end (Unix).
    #[serde(default)]
    pub current_period_end: Option<i64>,
}

/// Stripe invoice object.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Invoice {
    /// Invoice ID (`in_...`).
    pub id: String,
    /// Amount paid in the smallest currency unit.
    #[serde(default)]
    pub amount_paid: i64,
    /// Amount due in the smallest currency unit.
    #[serde(default)]
    pub amount_due: i64,
    /// Currency code.
    #[serde(default)]
    pub currency: Option<String>,
    /// Customer ID.
    #[serde(default)]
    pub customer: Option<String>,
    /// Email of the paying customer.
    #[serde(default)]
    pub customer_email: Option<String>,
    /// Subscription the invoice belongs to.
    #[serde(default)]
    pub subscription: Option<String>,
}
