//! Legacy starbase (control tower) checks.
//!
//! Towers report their fuel bay but not their modules. Modules are anchored
//! in space and attributed to the closest tower.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::alerts::AlertThresholds;
use crate::asset::{Asset, is_system_id};
use crate::catalog::ItemType;
use crate::error::{CoreError, Result};
use crate::report::format_timestamp;

/// Type id of Strontium Clathrates.
pub const STRONTIUM_TYPE_ID: i32 = 16275;
/// Fuel block type ids (Amarr, Caldari, Gallente, Minmatar order not implied).
pub const FUEL_BLOCK_TYPE_IDS: [i32; 4] = [4051, 4246, 4247, 4312];
/// Group of the tower hulls themselves.
pub const CONTROL_TOWER_GROUP: &str = "Control Tower";
/// Category shared by towers and their modules.
pub const STARBASE_CATEGORY: &str = "Starbase";
/// Module group that makes an offline tower worth reporting.
pub const DEFENSIVE_MODULE_GROUP: &str = "Shield Hardening Array";
/// Fuel discount in systems held by the corporation's alliance.
pub const SOVEREIGNTY_MULTIPLIER: f64 = 0.75;

/// Starbase state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StarbaseState {
    /// Anchored without power.
    Offline,
    /// Powered.
    Online,
    /// Coming online.
    Onlining,
    /// Reinforcement timer running.
    Reinforced,
    /// Being unanchored.
    Unanchoring,
    /// Any state not listed above.
    #[default]
    #[serde(other)]
    Unknown,
}

impl StarbaseState {
    /// Returns the state as its API string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Offline => "offline",
            Self::Online => "online",
            Self::Onlining => "onlining",
            Self::Reinforced => "reinforced",
            Self::Unanchoring => "unanchoring",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for StarbaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the corporation starbases endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StarbaseRecord {
    /// Starbase id.
    pub starbase_id: i64,
    /// Tower type.
    pub type_id: i32,
    /// Solar system.
    pub system_id: i32,
    /// Anchoring moon.
    #[serde(default)]
    pub moon_id: Option<i32>,
    /// Current state.
    #[serde(default)]
    pub state: StarbaseState,
    /// Reinforcement end, or when the tower entered its state.
    #[serde(default)]
    pub reinforced_until: Option<DateTime<Utc>>,
    /// When the tower came online.
    #[serde(default)]
    pub onlined_since: Option<DateTime<Utc>>,
    /// Scheduled unanchor.
    #[serde(default)]
    pub unanchor_at: Option<DateTime<Utc>>,
}

/// A stack in a tower's fuel bay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StarbaseFuel {
    /// Fuel type.
    pub type_id: i32,
    /// Units in the bay.
    pub quantity: i64,
}

/// Coordinates of an item in space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// X.
    pub x: f64,
    /// Y.
    pub y: f64,
    /// Z.
    pub z: f64,
}

impl Position {
    /// Creates a position.
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance.
    #[must_use]
    pub fn distance(&self, other: &Self) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2) + (self.z - other.z).powi(2)).sqrt()
    }
}

/// Returns the id of the candidate closest to `source`.
#[must_use]
pub fn nearest(source: &Position, candidates: &HashMap<i64, Position>) -> Option<i64> {
    candidates
        .iter()
        .map(|(id, position)| (*id, source.distance(position)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(id, _)| id)
}

/// Groups modules under the tower nearest to each.
///
/// Modules are dropped when there are no towers.
pub fn assign_modules<T>(
    modules: impl IntoIterator<Item = (T, Position)>,
    towers: &HashMap<i64, Position>,
) -> HashMap<i64, Vec<T>> {
    let mut assigned: HashMap<i64, Vec<T>> = HashMap::new();
    for (module, position) in modules {
        if let Some(tower) = nearest(&position, towers) {
            assigned.entry(tower).or_default().push(module);
        }
    }
    assigned
}

/// True for towers and tower modules anchored in space.
#[must_use]
pub fn is_starbase_item(asset: &Asset, item_type: &ItemType) -> bool {
    is_system_id(asset.location_id) && item_type.category_name == STARBASE_CATEGORY
}

/// Tower size, derived from the hull name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TowerSize {
    /// `... Control Tower Small`.
    Small,
    /// `... Control Tower Medium`.
    Medium,
    /// Everything else.
    Large,
}

impl TowerSize {
    /// Classifies a tower by its type name.
    #[must_use]
    pub fn of(tower_type: &ItemType) -> Self {
        if tower_type.name.contains("Small") {
            Self::Small
        } else if tower_type.name.contains("Medium") {
            Self::Medium
        } else {
            Self::Large
        }
    }
}

/// Hourly consumption of fuel blocks and strontium.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TowerRates {
    /// Fuel blocks per hour.
    pub fuel_blocks: f64,
    /// Strontium per hour while reinforced.
    pub strontium: f64,
}

/// Tower fuel consumption per tower size, with optional per-type overrides.
///
/// A table loaded from JSON replaces the defaults:
///
/// ```json
/// {"by_size": {"large": {"fuel_blocks": 40, "strontium": 400}},
///  "by_type": {"27780": {"fuel_blocks": 36, "strontium": 400}}}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TowerFuelTable {
    /// Rates per size.
    pub by_size: HashMap<TowerSize, TowerRates>,
    /// Rates for specific tower types, overriding the size entry.
    #[serde(default)]
    pub by_type: HashMap<i32, TowerRates>,
}

impl Default for TowerFuelTable {
    fn default() -> Self {
        let by_size = [
            (TowerSize::Large, TowerRates { fuel_blocks: 40.0, strontium: 400.0 }),
            (TowerSize::Medium, TowerRates { fuel_blocks: 20.0, strontium: 200.0 }),
            (TowerSize::Small, TowerRates { fuel_blocks: 10.0, strontium: 100.0 }),
        ]
        .into_iter()
        .collect();
        Self {
            by_size,
            by_type: HashMap::new(),
        }
    }
}

impl TowerFuelTable {
    /// Parses a table from JSON and validates it.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or a rate is not positive.
    pub fn from_json(json: &str) -> Result<Self> {
        let table: Self = serde_json::from_str(json)?;
        table.validate()?;
        Ok(table)
    }

    /// Reads a table from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Io` if the file cannot be read, or any error
    /// from [`TowerFuelTable::from_json`].
    pub fn from_path(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|source| CoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::from_json(&json)?;
        debug!(
            path = %path.display(),
            sizes = table.by_size.len(),
            types = table.by_type.len(),
            "loaded tower fuel table"
        );
        Ok(table)
    }

    /// Checks every rate is finite and positive.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidTowerFuel` naming the first bad entry.
    pub fn validate(&self) -> Result<()> {
        let entries = self
            .by_size
            .iter()
            .map(|(size, rates)| (format!("{size:?}").to_lowercase(), rates))
            .chain(self.by_type.iter().map(|(type_id, rates)| (format!("type {type_id}"), rates)));
        for (key, rates) in entries {
            for (fuel, rate) in [("fuel blocks", rates.fuel_blocks), ("strontium", rates.strontium)] {
                if !rate.is_finite() || rate <= 0.0 {
                    return Err(CoreError::InvalidTowerFuel {
                        reason: format!("{fuel} rate {rate} for {key} must be positive"),
                    });
                }
            }
        }
        Ok(())
    }

    /// Hourly consumption of a fuel type by a tower, if it burns it.
    #[must_use]
    pub fn rate(&self, tower_type: &ItemType, fuel_type_id: i32) -> Option<f64> {
        let rates = self
            .by_type
            .get(&tower_type.type_id)
            .or_else(|| self.by_size.get(&TowerSize::of(tower_type)))?;
        if fuel_type_id == STRONTIUM_TYPE_ID {
            Some(rates.strontium)
        } else if FUEL_BLOCK_TYPE_IDS.contains(&fuel_type_id) {
            Some(rates.fuel_blocks)
        } else {
            None
        }
    }
}

/// A corporation control tower with its fuel and modules.
#[derive(Debug, Clone)]
pub struct Starbase {
    /// Starbase id.
    pub starbase_id: i64,
    /// Tower type.
    pub tower_type: Arc<ItemType>,
    /// Solar system.
    pub system_id: i32,
    /// Moon name, or a placeholder when unresolved.
    pub moon_name: String,
    /// Current state.
    pub state: StarbaseState,
    /// Reinforcement end, or when the tower entered its state.
    pub reinforced_until: Option<DateTime<Utc>>,
    /// Fuel bay contents.
    pub fuels: Vec<StarbaseFuel>,
    /// Types of the modules attributed to this tower.
    pub modules: Vec<Arc<ItemType>>,
}

impl Starbase {
    /// Creates a starbase from its record and tower type.
    #[must_use]
    pub fn new(record: &StarbaseRecord, tower_type: Arc<ItemType>, moon_name: Option<String>) -> Self {
        let moon_name = moon_name.unwrap_or_else(|| match record.moon_id {
            Some(moon_id) => format!("Moon {moon_id}"),
            None => format!("Starbase {}", record.starbase_id),
        });
        Self {
            starbase_id: record.starbase_id,
            tower_type,
            system_id: record.system_id,
            moon_name,
            state: record.state,
            reinforced_until: record.reinforced_until,
            fuels: Vec::new(),
            modules: Vec::new(),
        }
    }

    /// Sets the fuel bay contents.
    #[must_use]
    pub fn with_fuels(mut self, fuels: Vec<StarbaseFuel>) -> Self {
        self.fuels = fuels;
        self
    }

    /// Sets the attributed modules.
    #[must_use]
    pub fn with_modules(mut self, modules: Vec<Arc<ItemType>>) -> Self {
        self.modules = modules;
        self
    }

    /// True if a shield hardening array is anchored at this tower.
    #[must_use]
    pub fn has_defensive_modules(&self) -> bool {
        self.modules
            .iter()
            .any(|m| m.group_name == DEFENSIVE_MODULE_GROUP)
    }
}

/// Checks a tower's fuel, strontium and state.
///
/// `in_sovereignty` applies the sovereignty fuel discount. Offline towers
/// skip the fuel arithmetic and are only reported when they are unfuelled
/// or carry defensive modules.
#[must_use]
pub fn check_starbase(
    starbase: &Starbase,
    in_sovereignty: bool,
    thresholds: &AlertThresholds,
    table: &TowerFuelTable,
) -> Vec<String> {
    let multiplier = if in_sovereignty { SOVEREIGNTY_MULTIPLIER } else { 1.0 };
    let offline = starbase.state == StarbaseState::Offline;
    let too_soon_days = thresholds.too_soon.num_seconds() as f64 / 86_400.0;
    let mut messages = Vec::new();
    let mut has_fuel = false;

    for fuel in &starbase.fuels {
        let Some(base) = table.rate(&starbase.tower_type, fuel.type_id) else {
            warn!(
                starbase_id = starbase.starbase_id,
                tower = %starbase.tower_type.name,
                fuel_type_id = fuel.type_id,
                "no consumption rate for tower fuel"
            );
            continue;
        };
        let rate = base * multiplier;
        if fuel.type_id == STRONTIUM_TYPE_ID {
            if offline {
                continue;
            }
            let hours = (fuel.quantity as f64 / rate).floor() as i64;
            if hours < thresholds.stront_hours {
                messages.push(format!("{} has {hours} hours of stront", starbase.moon_name));
            }
        } else {
            has_fuel = true;
            if offline {
                continue;
            }
            let days = fuel.quantity as f64 / (rate * 24.0);
            if days < too_soon_days {
                let unit = if (days - 1.0).abs() < f64::EPSILON { "day" } else { "days" };
                messages.push(format!("{} has {days:.1} {unit} of fuel", starbase.moon_name));
            }
        }
    }

    if starbase.state != StarbaseState::Online {
        if offline && has_fuel && !starbase.has_defensive_modules() {
            debug!(starbase_id = starbase.starbase_id, "ignoring fuelled offline tower");
            return messages;
        }
        let mut message = format!("{} is {}", starbase.moon_name, starbase.state);
        if let Some(at) = starbase.reinforced_until {
            let preposition = if starbase.state == StarbaseState::Reinforced {
                "until"
            } else {
                "since"
            };
            message.push_str(&format!(" {preposition} {}", format_timestamp(at)));
        }
        messages.push(message);
    }
    messages
}
