//! Upwell structures and their alert predicates.
//!
//! A [`Structure`] is assembled fresh on every poll from the corporation
//! structures endpoint, the structure's contents and the extraction schedule.
//! Each predicate is independent; [`crate::alerts::evaluate`] collects them.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::asset::{Asset, contents_of};
use crate::catalog::{ItemType, TypeCatalog};
use crate::error::{CoreError, Result};
use crate::fitting::{FittedItem, Fitting, Slot};
use crate::fuel::{FuelBonusTable, fuel_rate};

/// Name shown for structures the corporation cannot dock at.
pub const INACCESSIBLE_NAME: &str = "Inaccessible Structure";
/// Service that requires a scheduled moon extraction.
pub const MOON_DRILLING_SERVICE: &str = "Moon Drilling";
/// Type name of the jump bridge structure.
pub const JUMP_GATE_TYPE_NAME: &str = "Ansiblex Jump Gate";
/// Fuel consumed by jump gates per jump.
pub const JUMP_FUEL_TYPE_NAME: &str = "Liquid Ozone";

/// The lifecycle or siege state of a structure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureState {
    /// Services can run.
    Online,
    /// No fuel or services.
    Offline,
    /// Coming online.
    Onlining,
    /// Being unanchored.
    Unanchoring,
    /// Anchored but not yet onlined.
    Anchoring,
    /// Vulnerable while anchoring.
    AnchorVulnerable,
    /// Vulnerable after deployment.
    DeployVulnerable,
    /// Cannot be attacked while fitting changes apply.
    FittingInvulnerable,
    /// Legacy online state.
    OnlineDeprecated,
    /// Vulnerable while onlining.
    OnliningVulnerable,
    /// Shield vulnerability window.
    ShieldVulnerable,
    /// Armor timer running.
    ArmorReinforce,
    /// Armor vulnerability window.
    ArmorVulnerable,
    /// Hull timer running.
    HullReinforce,
    /// Hull vulnerability window.
    HullVulnerable,
    /// Unanchored.
    Unanchored,
    /// Any state not listed above.
    #[default]
    #[serde(other)]
    Unknown,
}

impl StructureState {
    /// Returns the state as its API string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
            Self::Onlining => "onlining",
            Self::Unanchoring => "unanchoring",
            Self::Anchoring => "anchoring",
            Self::AnchorVulnerable => "anchor_vulnerable",
            Self::DeployVulnerable => "deploy_vulnerable",
            Self::FittingInvulnerable => "fitting_invulnerable",
            Self::OnlineDeprecated => "online_deprecated",
            Self::OnliningVulnerable => "onlining_vulnerable",
            Self::ShieldVulnerable => "shield_vulnerable",
            Self::ArmorReinforce => "armor_reinforce",
            Self::ArmorVulnerable => "armor_vulnerable",
            Self::HullReinforce => "hull_reinforce",
            Self::HullVulnerable => "hull_vulnerable",
            Self::Unanchored => "unanchored",
            Self::Unknown => "unknown",
        }
    }

    /// Returns true while a reinforcement timer is running.
    #[must_use]
    pub const fn is_reinforced(&self) -> bool {
        matches!(self, Self::ArmorReinforce | Self::HullReinforce)
    }

    /// Returns true during a vulnerability window.
    #[must_use]
    pub const fn is_vulnerable(&self) -> bool {
        matches!(
            self,
            Self::DeployVulnerable | Self::ArmorVulnerable | Self::HullVulnerable
        )
    }

    /// Human-readable title, e.g. `Armor Reinforce`.
    #[must_use]
    pub fn title(&self) -> String {
        self.as_str()
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                chars.next().map_or_else(String::new, |first| {
                    first.to_uppercase().chain(chars).collect()
                })
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for StructureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of a structure service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceState {
    /// Running.
    Online,
    /// Installed but not running.
    Offline,
    /// Being removed.
    Cleanup,
}

/// A structure service as reported by ESI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    /// Service name, e.g. `Moon Drilling`.
    pub name: String,
    /// Current state.
    pub state: ServiceState,
}

/// One entry of the corporation structures endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureRecord {
    /// Structure id.
    pub structure_id: i64,
    /// Owning corporation.
    #[serde(default)]
    pub corporation_id: Option<i64>,
    /// Hull type id.
    pub type_id: i32,
    /// Solar system.
    pub system_id: i32,
    /// Installed services.
    #[serde(default)]
    pub services: Vec<Service>,
    /// When the fuel bay runs dry.
    #[serde(default)]
    pub fuel_expires: Option<DateTime<Utc>>,
    /// Current state.
    #[serde(default)]
    pub state: StructureState,
    /// End of the current state timer.
    #[serde(default)]
    pub state_timer_end: Option<DateTime<Utc>>,
    /// Scheduled unanchor completion.
    #[serde(default)]
    pub unanchors_at: Option<DateTime<Utc>>,
    /// Assigned access profile.
    #[serde(default)]
    pub profile_id: Option<i64>,
}

/// Whether the corporation can see inside a structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructureAccess {
    /// Docking rights: name and location are known.
    Accessible {
        /// Structure name.
        name: String,
        /// Solar system from the structure info endpoint.
        system_id: i32,
    },
    /// The structure info endpoint refused access.
    Inaccessible,
}

/// Pre-fetched data shared while assembling structures.
#[derive(Debug, Clone, Copy)]
pub struct AssemblyContext<'a> {
    /// Type metadata for hulls and contents.
    pub catalog: &'a TypeCatalog,
    /// Corporation assets, `None` if they could not be read.
    pub assets: Option<&'a [Asset]>,
    /// Access outcome keyed by structure id.
    pub access: &'a HashMap<i64, StructureAccess>,
    /// Scheduled extraction chunk arrival keyed by structure id.
    pub detonations: &'a HashMap<i64, DateTime<Utc>>,
    /// Solar system names keyed by system id.
    pub system_names: &'a HashMap<i32, String>,
}

/// A corporation-owned Upwell structure.
#[derive(Debug, Clone)]
pub struct Structure {
    /// Structure id.
    pub structure_id: i64,
    /// Hull type.
    pub structure_type: Arc<ItemType>,
    /// Solar system.
    pub system_id: i32,
    /// Solar system name, when resolved.
    pub system_name: Option<String>,
    /// Structure name.
    pub name: String,
    /// False when the API denies access.
    pub accessible: bool,
    /// Current state.
    pub state: StructureState,
    /// End of the current state timer.
    pub state_timer_end: Option<DateTime<Utc>>,
    /// Scheduled unanchor completion.
    pub unanchors_at: Option<DateTime<Utc>>,
    /// When the fuel bay runs dry.
    pub fuel_expires: Option<DateTime<Utc>>,
    /// Names of online services.
    pub online_services: Vec<String>,
    /// Names of offline services.
    pub offline_services: Vec<String>,
    /// Scheduled extraction chunk arrival.
    pub detonation: Option<DateTime<Utc>>,
    /// Installed equipment.
    pub fitting: Fitting,
    /// Fuel bay contents.
    pub fuel: Vec<FittedItem>,
    /// Assigned access profile.
    pub profile_id: Option<i64>,
    fuel_bonus: Arc<FuelBonusTable>,
    fuel_rate: OnceLock<f64>,
}

impl Structure {
    /// Starts building a structure.
    #[must_use]
    pub fn builder(structure_id: i64, structure_type: Arc<ItemType>) -> StructureBuilder {
        StructureBuilder::new(structure_id, structure_type)
    }

    /// Assembles a structure from its API record and pre-fetched context.
    ///
    /// Contents are only attached when assets are available; otherwise the
    /// fitting is empty and core/ozone checks are meaningless.
    pub fn from_record(
        record: &StructureRecord,
        ctx: &AssemblyContext<'_>,
        fuel_bonus: Arc<FuelBonusTable>,
    ) -> Result<Self> {
        let structure_type = ctx.catalog.require(record.type_id)?;
        let mut builder = Self::builder(record.structure_id, structure_type)
            .system(record.system_id)
            .state(record.state)
            .fuel_bonus(fuel_bonus);
        builder.state_timer_end = record.state_timer_end;
        builder.unanchors_at = record.unanchors_at;
        builder.fuel_expires = record.fuel_expires;
        builder.profile_id = record.profile_id;
        builder.detonation = ctx.detonations.get(&record.structure_id).copied();

        match ctx.access.get(&record.structure_id) {
            Some(StructureAccess::Accessible { name, system_id }) => {
                builder = builder.name(name.clone()).system(*system_id);
            }
            Some(StructureAccess::Inaccessible) | None => {
                builder = builder.accessible(false);
            }
        }
        if let Some(system_name) = ctx.system_names.get(&builder.system_id) {
            builder = builder.system_name(system_name.clone());
        }
        for service in &record.services {
            builder = builder.service(service.name.clone(), service.state);
        }

        if let Some(assets) = ctx.assets {
            let contents: Vec<&Asset> = contents_of(assets, record.structure_id).collect();
            let fitting = Fitting::from_assets(contents.iter().copied(), ctx.catalog)?;
            let fuel = contents
                .iter()
                .filter(|a| a.is_structure_fuel())
                .map(|a| -> Result<FittedItem> {
                    let item_type = ctx.catalog.require(a.type_id)?;
                    Ok(FittedItem::new(a.item_id, item_type).with_quantity(a.quantity))
                })
                .collect::<Result<Vec<_>>>()?;
            builder = builder.fitting(fitting).fuel(fuel);
        }

        builder.build()
    }

    /// Hourly fuel consumption of the fitted services.
    ///
    /// Computed on first call and cached for the lifetime of this value.
    pub fn fuel_rate(&self) -> Result<f64> {
        if let Some(rate) = self.fuel_rate.get() {
            return Ok(*rate);
        }
        let rate = fuel_rate(&self.structure_type, &self.fitting, &self.fuel_bonus)?;
        Ok(*self.fuel_rate.get_or_init(|| rate))
    }

    /// Type name of the hull.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.structure_type.name
    }

    /// A moon drill is online with no extraction scheduled.
    #[must_use]
    pub fn needs_detonation(&self) -> bool {
        self.detonation.is_none()
            && self
                .online_services
                .iter()
                .any(|s| s == MOON_DRILLING_SERVICE)
    }

    /// The scheduled extraction arrives within `warning`.
    #[must_use]
    pub fn detonates_soon(&self, now: DateTime<Utc>, warning: TimeDelta) -> bool {
        self.detonation.is_some_and(|at| at - now < warning)
    }

    /// Liquid Ozone in the fuel bay.
    #[must_use]
    pub fn jump_fuel(&self) -> i64 {
        self.fuel
            .iter()
            .filter(|f| f.name() == JUMP_FUEL_TYPE_NAME)
            .map(|f| f.quantity)
            .sum()
    }

    /// A jump gate is below the ozone threshold.
    #[must_use]
    pub fn needs_ozone(&self, warn_below: i64) -> bool {
        self.type_name() == JUMP_GATE_TYPE_NAME && self.jump_fuel() < warn_below
    }

    /// Fuel runs out within `too_soon`, unless the structure unanchors first.
    #[must_use]
    pub fn needs_fuel(&self, now: DateTime<Utc>, too_soon: TimeDelta) -> bool {
        let Some(expires) = self.fuel_expires else {
            return false;
        };
        if expires - now >= too_soon {
            return false;
        }
        !self.unanchors_at.is_some_and(|at| at < expires)
    }

    /// An armor or hull timer is running.
    #[must_use]
    pub const fn reinforced(&self) -> bool {
        self.state.is_reinforced()
    }

    /// The structure is in a vulnerability window.
    #[must_use]
    pub const fn vulnerable(&self) -> bool {
        self.state.is_vulnerable()
    }

    /// A quantum core is installed.
    #[must_use]
    pub fn has_core(&self) -> bool {
        !self.fitting.slot(Slot::QuantumCoreRoom).is_empty()
    }

    /// The hull requires a quantum core and has none.
    #[must_use]
    pub fn needs_core(&self) -> bool {
        !is_upwell_group(&self.structure_type.group_name) && !self.has_core()
    }

    /// Unanchoring has been scheduled.
    #[must_use]
    pub const fn unanchoring(&self) -> bool {
        self.unanchors_at.is_some()
    }

    /// Packaged volume of the hull plus everything inside it.
    #[must_use]
    pub fn packaged_volume(&self) -> f64 {
        self.structure_type.packaged_volume + self.fitting.packaged_volume()
    }
}

/// Groups such as `Upwell Jump Gate` and `Upwell Cyno Beacon` carry no core.
///
/// This is a name match on the group; there is no API tag for core-exempt
/// hull families.
#[must_use]
pub fn is_upwell_group(group_name: &str) -> bool {
    group_name.starts_with("Upwell")
}

impl fmt::Display for Structure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) - {}", self.name, self.structure_id, self.type_name())
    }
}

/// Builder for [`Structure`].
#[derive(Debug, Clone)]
pub struct StructureBuilder {
    structure_id: i64,
    structure_type: Arc<ItemType>,
    system_id: i32,
    system_name: Option<String>,
    name: String,
    accessible: bool,
    state: StructureState,
    state_timer_end: Option<DateTime<Utc>>,
    unanchors_at: Option<DateTime<Utc>>,
    fuel_expires: Option<DateTime<Utc>>,
    online_services: Vec<String>,
    offline_services: Vec<String>,
    detonation: Option<DateTime<Utc>>,
    fitting: Fitting,
    fuel: Vec<FittedItem>,
    profile_id: Option<i64>,
    fuel_bonus: Option<Arc<FuelBonusTable>>,
}

impl StructureBuilder {
    fn new(structure_id: i64, structure_type: Arc<ItemType>) -> Self {
        Self {
            structure_id,
            structure_type,
            system_id: 0,
            system_name: None,
            name: String::new(),
            accessible: true,
            state: StructureState::Online,
            state_timer_end: None,
            unanchors_at: None,
            fuel_expires: None,
            online_services: Vec::new(),
            offline_services: Vec::new(),
            detonation: None,
            fitting: Fitting::new(),
            fuel: Vec::new(),
            profile_id: None,
            fuel_bonus: None,
        }
    }

    /// Sets the name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the solar system.
    #[must_use]
    pub const fn system(mut self, system_id: i32) -> Self {
        self.system_id = system_id;
        self
    }

    /// Sets the solar system name.
    #[must_use]
    pub fn system_name(mut self, name: impl Into<String>) -> Self {
        self.system_name = Some(name.into());
        self
    }

    /// Sets whether the structure is accessible.
    #[must_use]
    pub const fn accessible(mut self, accessible: bool) -> Self {
        self.accessible = accessible;
        self
    }

    /// Sets the state.
    #[must_use]
    pub const fn state(mut self, state: StructureState) -> Self {
        self.state = state;
        self
    }

    /// Sets the end of the state timer.
    #[must_use]
    pub const fn state_timer_end(mut self, at: DateTime<Utc>) -> Self {
        self.state_timer_end = Some(at);
        self
    }

    /// Schedules unanchoring.
    #[must_use]
    pub const fn unanchors_at(mut self, at: DateTime<Utc>) -> Self {
        self.unanchors_at = Some(at);
        self
    }

    /// Sets the fuel expiry.
    #[must_use]
    pub const fn fuel_expires(mut self, at: DateTime<Utc>) -> Self {
        self.fuel_expires = Some(at);
        self
    }

    /// Sets the scheduled extraction.
    #[must_use]
    pub const fn detonation(mut self, at: DateTime<Utc>) -> Self {
        self.detonation = Some(at);
        self
    }

    /// Adds a service. Services being cleaned up are not listed.
    #[must_use]
    pub fn service(mut self, name: impl Into<String>, state: ServiceState) -> Self {
        match state {
            ServiceState::Online => self.online_services.push(name.into()),
            ServiceState::Offline => self.offline_services.push(name.into()),
            ServiceState::Cleanup => {}
        }
        self
    }

    /// Sets the fitting.
    #[must_use]
    pub fn fitting(mut self, fitting: Fitting) -> Self {
        self.fitting = fitting;
        self
    }

    /// Sets the fuel bay contents.
    #[must_use]
    pub fn fuel(mut self, fuel: Vec<FittedItem>) -> Self {
        self.fuel = fuel;
        self
    }

    /// Sets the fuel bonus table used by [`Structure::fuel_rate`].
    #[must_use]
    pub fn fuel_bonus(mut self, table: Arc<FuelBonusTable>) -> Self {
        self.fuel_bonus = Some(table);
        self
    }

    /// Validates and builds the structure.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidStructure` if the id is not positive.
    pub fn build(self) -> Result<Structure> {
        if self.structure_id <= 0 {
            return Err(CoreError::InvalidStructure {
                reason: format!("structure id must be positive, got {}", self.structure_id),
            });
        }
        let name = if !self.accessible {
            INACCESSIBLE_NAME.to_string()
        } else if self.name.is_empty() {
            self.structure_type.name.clone()
        } else {
            self.name
        };
        debug!(
            structure_id = self.structure_id,
            name = %name,
            type_name = %self.structure_type.name,
            accessible = self.accessible,
            state = %self.state,
            "built structure"
        );

        Ok(Structure {
            structure_id: self.structure_id,
            structure_type: self.structure_type,
            system_id: self.system_id,
            system_name: self.system_name,
            name,
            accessible: self.accessible,
            state: self.state,
            state_timer_end: self.state_timer_end,
            unanchors_at: self.unanchors_at,
            fuel_expires: self.fuel_expires,
            online_services: self.online_services,
            offline_services: self.offline_services,
            detonation: self.detonation,
            fitting: self.fitting,
            fuel: self.fuel,
            profile_id: self.profile_id,
            fuel_bonus: self.fuel_bonus.unwrap_or_default(),
            fuel_rate: OnceLock::new(),
        })
    }
}
