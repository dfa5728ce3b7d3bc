//! Billing period arithmetic.
//!
//! Periods are half-open calendar spans. Renewing a period always starts the
//! new one exactly where the old one ended.

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{BillingError, Result};
use crate::subscription::BillingInterval;

/// Upper bound on periods a single renewal may skip forward (100 years of months).
pub const MAX_CATCH_UP_PERIODS: u32 = 1200;

/// A billing period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingPeriod {
    /// Inclusive start.
    pub start: DateTime<Utc>,
    /// Exclusive end.
    pub end: DateTime<Utc>,
}

impl BillingInterval {
    /// Advance `instant` by one interval in calendar terms.
    ///
    /// Days past the end of the target month clamp to its last day, so
    /// Jan 31 plus one month is the last day of February.
    ///
    /// # Errors
    ///
    /// Returns `BillingError::PeriodOverflow` if the result is out of range.
    pub fn advance(self, instant: DateTime<Utc>) -> Result<DateTime<Utc>> {
        instant
            .checked_add_months(Months::new(self.months()))
            .ok_or(BillingError::PeriodOverflow { from: instant })
    }
}

impl BillingPeriod {
    /// The period immediately following this one.
    ///
    /// # Errors
    ///
    /// Returns `BillingError::PeriodOverflow` if the new end is out of range.
    pub fn following(&self, interval: BillingInterval) -> Result<Self> {
        Ok(Self {
            start: self.end,
            end: interval.advance(self.end)?,
        })
    }

    /// The first period in the chain of following periods that ends after `now`.
    ///
    /// A subscription one interval behind gets exactly `following`; one that
    /// missed several sweeps skips ahead to the period containing `now`.
    ///
    /// # Errors
    ///
    /// Returns `BillingError::PeriodOverflow` if arithmetic leaves the
    /// representable range or more than `MAX_CATCH_UP_PERIODS` steps are needed.
    pub fn renew_through(&self, interval: BillingInterval, now: DateTime<Utc>) -> Result<Self> {
        let mut period = self.following(interval)?;
        let mut steps = 1;
        while period.end <= now {
            if steps >= MAX_CATCH_UP_PERIODS {
                return Err(BillingError::PeriodOverflow { from: period.end });
            }
            period = period.following(interval)?;
            steps += 1;
        }
        Ok(period)
    }
}
