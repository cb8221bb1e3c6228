//! Per-structure alert evaluation.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::structure::{Structure, StructureState};

/// Thresholds applied to every structure in a poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertThresholds {
    /// Warn when fuel runs out sooner than this.
    pub too_soon: TimeDelta,
    /// Warn when an extraction arrives sooner than this.
    pub detonation_warning: TimeDelta,
    /// Warn when a jump gate holds less Liquid Ozone than this.
    pub jumpgate_fuel_warn: i64,
    /// Warn when a starbase holds fewer hours of strontium than this.
    pub stront_hours: i64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            too_soon: TimeDelta::days(3),
            detonation_warning: TimeDelta::days(1),
            jumpgate_fuel_warn: 500_000,
            stront_hours: 12,
        }
    }
}

impl AlertThresholds {
    /// Sets the fuel warning window.
    #[must_use]
    pub const fn with_too_soon(mut self, too_soon: TimeDelta) -> Self {
        self.too_soon = too_soon;
        self
    }

    /// Sets the extraction warning window.
    #[must_use]
    pub const fn with_detonation_warning(mut self, warning: TimeDelta) -> Self {
        self.detonation_warning = warning;
        self
    }

    /// Sets the Liquid Ozone threshold.
    #[must_use]
    pub const fn with_jumpgate_fuel_warn(mut self, quantity: i64) -> Self {
        self.jumpgate_fuel_warn = quantity;
        self
    }

    /// Sets the strontium threshold.
    #[must_use]
    pub const fn with_stront_hours(mut self, hours: i64) -> Self {
        self.stront_hours = hours;
        self
    }
}

/// Alert facts for one accessible structure, plus the values needed to
/// render them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructureAlerts {
    /// Structure id.
    pub structure_id: i64,
    /// Structure name.
    pub name: String,
    /// Current state.
    pub state: StructureState,
    /// A moon drill has no extraction scheduled.
    pub needs_detonation: bool,
    /// The scheduled extraction arrives soon.
    pub detonates_soon: bool,
    /// A jump gate is low on Liquid Ozone.
    pub needs_ozone: bool,
    /// Fuel runs out soon.
    pub needs_fuel: bool,
    /// An armor or hull timer is running.
    pub reinforced: bool,
    /// In a vulnerability window.
    pub vulnerable: bool,
    /// A quantum core is installed.
    pub has_core: bool,
    /// A quantum core is required and missing.
    pub needs_core: bool,
    /// Unanchoring is scheduled.
    pub unanchoring: bool,
    /// Hourly fuel burn of the fitted services, when every module has a rate.
    pub fuel_rate: Option<f64>,
    /// Why the fuel rate could not be computed.
    pub fuel_rate_error: Option<String>,
    /// Liquid Ozone in the fuel bay.
    pub jump_fuel: i64,
    /// Scheduled extraction.
    pub detonation: Option<DateTime<Utc>>,
    /// End of the current state timer.
    pub state_timer_end: Option<DateTime<Utc>>,
    /// When the fuel bay runs dry.
    pub fuel_expires: Option<DateTime<Utc>>,
    /// Names of online services.
    pub online_services: Vec<String>,
    /// Names of offline services.
    pub offline_services: Vec<String>,
}

/// Outcome of evaluating one structure.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StructureReport {
    /// Access was denied; nothing else is known.
    Inaccessible {
        /// Structure id.
        structure_id: i64,
        /// Solar system.
        system_id: i32,
        /// Solar system name, when resolved.
        system_name: Option<String>,
    },
    /// Predicates for an accessible structure.
    Alerts(StructureAlerts),
}

impl StructureReport {
    /// The fuel rate failure carried by an accessible structure, if any.
    #[must_use]
    pub fn fuel_rate_error(&self) -> Option<&str> {
        match self {
            Self::Alerts(alerts) => alerts.fuel_rate_error.as_deref(),
            Self::Inaccessible { .. } => None,
        }
    }
}

/// Evaluates every alert predicate for a structure.
///
/// Inaccessible structures are reported as such without touching their
/// fitting or fuel. A service module without a fuel attribute only voids
/// the fuel rate; the other predicates are still evaluated.
#[must_use]
pub fn evaluate(structure: &Structure, now: DateTime<Utc>, thresholds: &AlertThresholds) -> StructureReport {
    if !structure.accessible {
        debug!(structure_id = structure.structure_id, "structure is inaccessible");
        return StructureReport::Inaccessible {
            structure_id: structure.structure_id,
            system_id: structure.system_id,
            system_name: structure.system_name.clone(),
        };
    }

    let (fuel_rate, fuel_rate_error) = match structure.fuel_rate() {
        Ok(rate) => (Some(rate), None),
        Err(err) => {
            debug!(structure_id = structure.structure_id, error = %err, "fuel rate unavailable");
            (None, Some(err.to_string()))
        }
    };
    let alerts = StructureAlerts {
        structure_id: structure.structure_id,
        name: structure.name.clone(),
        state: structure.state,
        needs_detonation: structure.needs_detonation(),
        detonates_soon: structure.detonates_soon(now, thresholds.detonation_warning),
        needs_ozone: structure.needs_ozone(thresholds.jumpgate_fuel_warn),
        needs_fuel: structure.needs_fuel(now, thresholds.too_soon),
        reinforced: structure.reinforced(),
        vulnerable: structure.vulnerable(),
        has_core: structure.has_core(),
        needs_core: structure.needs_core(),
        unanchoring: structure.unanchoring(),
        fuel_rate,
        fuel_rate_error,
        jump_fuel: structure.jump_fuel(),
        detonation: structure.detonation,
        state_timer_end: structure.state_timer_end,
        fuel_expires: structure.fuel_expires,
        online_services: structure.online_services.clone(),
        offline_services: structure.offline_services.clone(),
    };
    debug!(
        structure_id = alerts.structure_id,
        needs_fuel = alerts.needs_fuel,
        needs_core = alerts.needs_core,
        reinforced = alerts.reinforced,
        vulnerable = alerts.vulnerable,
        "evaluated structure"
    );
    StructureReport::Alerts(alerts)
}
