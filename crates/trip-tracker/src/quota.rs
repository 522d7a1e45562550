use serde::{Deserialize, Serialize};

use crate::models::PlanTier;

/// Automatic trip allowance for the current billing period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionQuota {
    pub plan_tier: PlanTier,
    pub auto_trips_used_this_period: u32,
}

impl SubscriptionQuota {
    #[must_use]
    pub const fn new(plan_tier: PlanTier, auto_trips_used_this_period: u32) -> Self {
        Self { plan_tier, auto_trips_used_this_period }
    }

    /// Whether another automatic trip may start under a free-tier `limit`.
    #[must_use]
    pub const fn allows_auto_trip(&self, limit: u32) -> bool {
        match self.plan_tier {
            PlanTier::Premium => true,
            PlanTier::Free => self.auto_trips_used_this_period < limit,
        }
    }

    /// Count one automatic trip start if allowed; returns whether it was.
    pub const fn try_consume(&mut self, limit: u32) -> bool {
        if !self.allows_auto_trip(limit) {
            return false;
        }
        self.auto_trips_used_this_period = self.auto_trips_used_this_period.saturating_add(1);
        true
    }

    /// Trips left this period, `None` when unlimited.
    #[must_use]
    pub const fn remaining(&self, limit: u32) -> Option<u32> {
        match self.plan_tier {
            PlanTier::Premium => None,
            PlanTier::Free => Some(limit.saturating_sub(self.auto_trips_used_this_period)),
        }
    }

    pub const fn reset_period(&mut self) {
        self.auto_trips_used_this_period = 0;
    }
}
