//! Owned inventory items as reported by the corporation assets endpoint.

use serde::{Deserialize, Serialize};

/// Location flag of the fuel bay of an Upwell structure.
pub const STRUCTURE_FUEL_FLAG: &str = "StructureFuel";

/// An owned inventory item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// Unique item id.
    pub item_id: i64,
    /// Item type id.
    pub type_id: i32,
    /// Owning structure, container or solar system.
    pub location_id: i64,
    /// Slot or hangar tag such as `HiSlot3` or `StructureFuel`.
    #[serde(default)]
    pub location_flag: String,
    /// Kind of location (`station`, `solar_system`, `item`, `other`).
    #[serde(default)]
    pub location_type: String,
    /// Stack size.
    #[serde(default = "default_quantity")]
    pub quantity: i64,
    /// Whether the item is assembled (unstacked).
    #[serde(default)]
    pub is_singleton: bool,
}

const fn default_quantity() -> i64 {
    1
}

impl Asset {
    /// Creates an asset with quantity 1.
    #[must_use]
    pub fn new(
        item_id: i64,
        type_id: i32,
        location_id: i64,
        location_flag: impl Into<String>,
    ) -> Self {
        Self {
            item_id,
            type_id,
            location_id,
            location_flag: location_flag.into(),
            location_type: String::new(),
            quantity: 1,
            is_singleton: true,
        }
    }

    /// Sets the quantity.
    #[must_use]
    pub const fn with_quantity(mut self, quantity: i64) -> Self {
        self.quantity = quantity;
        self
    }

    /// Returns true if the item sits in a structure fuel bay.
    #[must_use]
    pub fn is_structure_fuel(&self) -> bool {
        self.location_flag == STRUCTURE_FUEL_FLAG
    }
}

/// Returns true if the id is in the solar system range (30000000-39999999).
#[must_use]
pub const fn is_system_id(location_id: i64) -> bool {
    location_id >= 30_000_000 && location_id <= 39_999_999
}

/// Returns true if the id is in the NPC station range (60000000-64000000).
#[must_use]
pub const fn is_station_id(location_id: i64) -> bool {
    location_id >= 60_000_000 && location_id <= 64_000_000
}

/// Returns the assets located directly in the given structure.
pub fn contents_of(assets: &[Asset], location_id: i64) -> impl Iterator<Item = &Asset> {
    assets.iter().filter(move |a| a.location_id == location_id)
}
