//! Bridges [`HealthState`] transitions into [`gatekeeper_core`]'s generic
//! health-trigger mechanism, so a health tracker can proactively drive other
//! patterns (e.g. force a circuit breaker open) without those patterns
//! depending on this crate.

use crate::HealthState;
use gatekeeper_core::{SharedHealthTrigger, TriggerHealth};

impl From<HealthState> for TriggerHealth {
    fn from(status: HealthState) -> Self {
        match status {
            HealthState::Healthy => TriggerHealth::Healthy,
            HealthState::Degraded => TriggerHealth::Degraded,
            HealthState::Unhealthy | HealthState::Unknown => TriggerHealth::Unhealthy,
        }
    }
}

/// Notifies all triggers when health status changes.
///
/// Only sends notifications when the effective trigger status changes
/// (e.g., Healthy -> Unhealthy), not on every health check.
pub(crate) fn notify_triggers(triggers: &[SharedHealthTrigger], from: HealthState, to: HealthState) {
    let from_trigger = TriggerHealth::from(from);
    let to_trigger = TriggerHealth::from(to);

    if from_trigger == to_trigger {
        return;
    }

    for trigger in triggers {
        match to_trigger {
            TriggerHealth::Healthy => trigger.trigger_healthy(),
            TriggerHealth::Degraded => trigger.trigger_degraded(),
            TriggerHealth::Unhealthy => trigger.trigger_unhealthy(),
        }
    }
}
