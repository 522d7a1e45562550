use std::env;

use tracing::warn;
use trip_tracker::{PlanTier, SubscriptionQuota};

/// Subscription state supplied by the host environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostConfig {
    pub plan_tier: PlanTier,
    pub auto_trips_used: u32,
}

impl HostConfig {
    #[must_use]
    pub fn from_env() -> Self {
        let plan_tier = env::var("PLAN_TIER").map_or(PlanTier::Free, |value| {
            value.parse().unwrap_or_else(|err| {
                warn!(error = %err, "PLAN_TIER not recognized, using free");
                PlanTier::Free
            })
        });
        let auto_trips_used = env::var("AUTO_TRIPS_USED")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .unwrap_or_default();

        Self { plan_tier, auto_trips_used }
    }

    #[must_use]
    pub const fn quota(&self) -> SubscriptionQuota {
        SubscriptionQuota::new(self.plan_tier, self.auto_trips_used)
    }
}
