
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::identifiers::ProviderId;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubscriptionPlan {
    #[default]
    Pro,
}

impl fmt::Display for SubscriptionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubscriptionPlan::Pro => write!(f, "Pro"),
        }
    }
}

/// Billing state of a provider's marketplace membership.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubscriptionStatus {
    /// Enrolled but nothing earned yet.
    #[default]
    Pending,
    /// Became active once the provider settled their first consultation.
    Active,
    /// Explicitly renewed for another period.
    Renewed,
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubscriptionStatus::Pending => write!(f, "pending"),
            SubscriptionStatus::Active => write!(f, "active"),
            SubscriptionStatus::Renewed => write!(f, "renewed"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub provider_id: ProviderId,
    pub plan: SubscriptionPlan,
    pub status: SubscriptionStatus,
    pub renews_at: NaiveDate,
    pub enrolled_at: DateTime<Utc>,
}
