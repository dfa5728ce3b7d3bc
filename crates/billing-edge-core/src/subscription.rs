//! Subscription records.
//!
//! A `Subscription` mirrors one row of the hosted `subscriptions` table. Only
//! the renewal sweep mutates it, and only its period columns.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::period::BillingPeriod;
use crate::{SubscriptionId, UserId};

/// A user's subscription to a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Unique subscription identifier.
    pub id: SubscriptionId,

    /// The owning user.
    pub user_id: UserId,

    /// Display name of the subscribed product.
    pub product_name: String,

    /// How often the subscription bills.
    pub interval: BillingInterval,

    /// Lifecycle status.
    pub status: SubscriptionStatus,

    /// Whether the subscription ends when the current period does.
    pub cancel_at_period_end: bool,

    /// Start of the current billing period.
    pub current_period_start: DateTime<Utc>,

    /// End of the current billing period.
    pub current_period_end: DateTime<Utc>,

    /// When the record was last written.
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    /// Whether the renewal sweep should roll this subscription forward at `now`.
    ///
    /// Only active subscriptions that are not cancelling and whose period has
    /// elapsed (`current_period_end <= now`) are due.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == SubscriptionStatus::Active
            && !self.cancel_at_period_end
            && self.current_period_end <= now
    }

    /// The current billing period.
    #[must_use]
    pub const fn period(&self) -> BillingPeriod {
        BillingPeriod {
            start: self.current_period_start,
            end: self.current_period_end,
        }
    }
}

/// Billing interval of a subscription.
///
/// Stored as text. Anything other than `year` is treated as monthly, so an
/// unexpected value still renews on the default cadence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BillingInterval {
    /// Renews every calendar month.
    #[default]
    Month,
    /// Renews every calendar year.
    Year,
}

impl BillingInterval {
    /// The canonical text form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Month => "month",
            Self::Year => "year",
        }
    }

    /// Number of calendar months one interval spans.
    #[must_use]
    pub const fn months(self) -> u32 {
        match self {
            Self::Month => 1,
            Self::Year => 12,
        }
    }
}

impl From<&str> for BillingInterval {
    fn from(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("year") {
            Self::Year
        } else {
            Self::Month
        }
    }
}

impl From<String> for BillingInterval {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<BillingInterval> for String {
    fn from(interval: BillingInterval) -> Self {
        interval.as_str().to_string()
    }
}

impl fmt::Display for BillingInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a subscription, using the payment provider's names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SubscriptionStatus {
    /// Subscription is active and billing.
    Active,
    /// Subscription was canceled.
    Canceled,
    /// Latest payment failed; provider is retrying.
    PastDue,
    /// In a trial period.
    Trialing,
    /// Initial payment has not completed.
    Incomplete,
    /// Initial payment never completed.
    IncompleteExpired,
    /// Retries exhausted without payment.
    Unpaid,
    /// Paused by the customer or merchant.
    Paused,
    /// A status this service does not recognise.
    Unknown,
}

impl SubscriptionStatus {
    /// The canonical text form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Canceled => "canceled",
            Self::PastDue => "past_due",
            Self::Trialing => "trialing",
            Self::Incomplete => "incomplete",
            Self::IncompleteExpired => "incomplete_expired",
            Self::Unpaid => "unpaid",
            Self::Paused => "paused",
            Self::Unknown => "unknown",
        }
    }
}

impl From<&str> for SubscriptionStatus {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "active" => Self::Active,
            // Both spellings appear in the wild.
            "canceled" | "cancelled" => Self::Canceled,
            "past_due" => Self::PastDue,
            "trialing" => Self::Trialing,
            "incomplete" => Self::Incomplete,
            "incomplete_expired" => Self::IncompleteExpired,
            "unpaid" => Self::Unpaid,
            "paused" => Self::Paused,
            _ => Self::Unknown,
        }
    }
}

impl From<String> for SubscriptionStatus {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<SubscriptionStatus> for String {
    fn from(status: SubscriptionStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
