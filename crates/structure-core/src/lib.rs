//! Fitting, fuel and alert-state model for corporation structures.
//!
//! `structure-core` takes pre-fetched corporation data (assets, structure
//! records, the extraction schedule and item type metadata) and derives
//! maintenance alerts. It performs no I/O of its own.
//!
//! # Features
//!
//! - **Fittings**: group a structure's contents by equipment slot
//! - **Fuel model**: hourly service fuel burn with data-driven hull discounts
//! - **Alerts**: independent predicates for fuel, cores, extractions and timers
//! - **Digest**: render alerts into the message posted to chat
//! - **Starbases**: fuel, strontium and state checks for control towers
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use chrono::{TimeDelta, Utc};
//! use structure_core::{
//!     AlertThresholds, Digest, ItemType, ReportOptions, Structure, evaluate,
//! };
//!
//! let raitaru = Arc::new(ItemType::new(35825, "Raitaru").with_group(1404, "Engineering Complex"));
//! let now = Utc::now();
//! let structure = Structure::builder(1_032_110_505_696, raitaru)
//!     .name("GE-8JV - Factory")
//!     .fuel_expires(now + TimeDelta::days(1))
//!     .build()
//!     .unwrap();
//!
//! let report = evaluate(&structure, now, &AlertThresholds::default());
//! let mut digest = Digest::new("Test Corp");
//! digest.push_report(&report, &ReportOptions::default());
//! assert!(digest.text().contains("Runs out of fuel on"));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod alerts;
pub mod asset;
pub mod catalog;
pub mod error;
pub mod fitting;
pub mod fuel;
pub mod report;
pub mod starbase;
pub mod structure;

pub use alerts::{AlertThresholds, StructureAlerts, StructureReport, evaluate};
pub use asset::{Asset, contents_of, is_station_id, is_system_id};
pub use catalog::{ATTR_FIGHTER_SQUADRON_SIZE, ATTR_SERVICE_FUEL_PER_HOUR, ItemType, TypeCatalog};
pub use error::{CoreError, Result};
pub use fitting::{FittedItem, Fitting, Slot};
pub use fuel::{FuelBonusTable, fuel_rate};
pub use report::{Digest, ReportOptions, format_timestamp, structure_lines, structure_message};
pub use starbase::{
    Position, Starbase, StarbaseFuel, StarbaseRecord, StarbaseState, TowerFuelTable, TowerRates,
    assign_modules, check_starbase, is_starbase_item, nearest,
};
pub use structure::{
    AssemblyContext, Service, ServiceState, Structure, StructureAccess, StructureBuilder,
    StructureRecord, StructureState, is_upwell_group,
};
