//! Service module fuel consumption.
//!
//! A structure burns fuel for each online service module. Some hull families
//! consume less for their specialised services; those discounts live in a
//! [`FuelBonusTable`] keyed by structure group (or, for hull-specific
//! exceptions, structure type) and then by module group.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::{ATTR_SERVICE_FUEL_PER_HOUR, ItemType};
use crate::error::{CoreError, Result};
use crate::fitting::Fitting;

/// Structure group: Engineering Complex.
pub const GROUP_ENGINEERING_COMPLEX: i32 = 1404;
/// Structure group: Refinery.
pub const GROUP_REFINERY: i32 = 1406;
/// Structure group: Citadel.
pub const GROUP_CITADEL: i32 = 1657;

/// Module group: Structure Engineering Service Module.
pub const GROUP_ENGINEERING_SERVICE: i32 = 1415;
/// Module group: Structure Resource Processing Service Module.
pub const GROUP_RESOURCE_PROCESSING_SERVICE: i32 = 1322;
/// Module group: Structure Citadel Service Module.
pub const GROUP_CITADEL_SERVICE: i32 = 1321;

type BonusMap = HashMap<i32, HashMap<i32, f64>>;

/// Fuel multipliers per structure and module group.
///
/// Lookups try the structure's exact type first, then its group. Pairs with
/// no entry consume at the module's base rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuelBonusTable {
    /// structure group id -> module group id -> multiplier.
    #[serde(default)]
    pub by_group: BonusMap,
    /// structure type id -> module group id -> multiplier.
    #[serde(default)]
    pub by_type: BonusMap,
}

impl Default for FuelBonusTable {
    fn default() -> Self {
        Self::empty()
            .with_group_bonus(GROUP_ENGINEERING_COMPLEX, GROUP_ENGINEERING_SERVICE, 0.75)
            .with_group_bonus(GROUP_REFINERY, GROUP_RESOURCE_PROCESSING_SERVICE, 0.80)
            .with_group_bonus(GROUP_CITADEL, GROUP_CITADEL_SERVICE, 0.75)
    }
}

impl FuelBonusTable {
    /// Creates a table with no discounts.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            by_group: HashMap::new(),
            by_type: HashMap::new(),
        }
    }

    /// Adds a discount for every hull in a structure group.
    #[must_use]
    pub fn with_group_bonus(mut self, structure_group: i32, module_group: i32, multiplier: f64) -> Self {
        self.by_group
            .entry(structure_group)
            .or_default()
            .insert(module_group, multiplier);
        self
    }

    /// Adds a discount for one hull type, overriding its group entry.
    #[must_use]
    pub fn with_type_bonus(mut self, structure_type: i32, module_group: i32, multiplier: f64) -> Self {
        self.by_type
            .entry(structure_type)
            .or_default()
            .insert(module_group, multiplier);
        self
    }

    /// Parses a table from JSON and validates it.
    pub fn from_json(json: &str) -> Result<Self> {
        let table: Self = serde_json::from_str(json)?;
        table.validate()?;
        Ok(table)
    }

    /// Reads a table from a JSON file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|source| CoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::from_json(&json)?;
        debug!(
            path = %path.display(),
            groups = table.by_group.len(),
            types = table.by_type.len(),
            "loaded fuel bonus table"
        );
        Ok(table)
    }

    /// Checks every multiplier is finite and positive.
    pub fn validate(&self) -> Result<()> {
        let entries = self
            .by_group
            .iter()
            .chain(&self.by_type)
            .flat_map(|(structure, modules)| modules.iter().map(move |(m, v)| (*structure, *m, *v)));
        for (structure, module, multiplier) in entries {
            if !multiplier.is_finite() || multiplier <= 0.0 {
                return Err(CoreError::InvalidFuelBonus {
                    reason: format!(
                        "multiplier {multiplier} for structure {structure} and module group {module} must be positive"
                    ),
                });
            }
        }
        Ok(())
    }

    /// Returns the multiplier for a module group fitted to a structure type.
    #[must_use]
    pub fn multiplier(&self, structure_type: &ItemType, module_group: i32) -> f64 {
        self.by_type
            .get(&structure_type.type_id)
            .and_then(|modules| modules.get(&module_group))
            .or_else(|| {
                self.by_group
                    .get(&structure_type.group_id)
                    .and_then(|modules| modules.get(&module_group))
            })
            .copied()
            .unwrap_or(1.0)
    }
}

/// Computes the hourly fuel consumption of a structure's service modules.
///
/// # Errors
///
/// Returns `CoreError::MissingFuelAttribute` if a service module type has no
/// fuel consumption attribute.
pub fn fuel_rate(structure_type: &ItemType, fitting: &Fitting, table: &FuelBonusTable) -> Result<f64> {
    let mut rate = 0.0;
    for service in fitting.services() {
        let module = &service.item_type;
        let hourly = module
            .attribute(ATTR_SERVICE_FUEL_PER_HOUR)
            .ok_or_else(|| CoreError::MissingFuelAttribute {
                type_id: module.type_id,
                name: module.name.clone(),
            })?;
        rate += hourly * table.multiplier(structure_type, module.group_id);
    }
    Ok(rate)
}
