//! ESI response bodies.
//!
//! Only the fields the bot reads are modelled; everything else is ignored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use structure_core::{Position, StarbaseFuel};

/// `GET /universe/structures/{id}/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureInfo {
    /// Structure name.
    pub name: String,
    /// Solar system.
    pub solar_system_id: i32,
    /// Hull type.
    #[serde(default)]
    pub type_id: Option<i32>,
    /// Owning corporation.
    #[serde(default)]
    pub owner_id: Option<i64>,
}

/// One entry of `GET /corporation/{id}/mining/extractions/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extraction {
    /// Refinery performing the extraction.
    pub structure_id: i64,
    /// Moon being mined.
    #[serde(default)]
    pub moon_id: Option<i32>,
    /// When the chunk is ready to detonate.
    pub chunk_arrival_time: DateTime<Utc>,
    /// When the extraction started.
    #[serde(default)]
    pub extraction_start_time: Option<DateTime<Utc>>,
    /// Automatic fracture time.
    #[serde(default)]
    pub natural_decay_time: Option<DateTime<Utc>>,
}

/// A dogma attribute value on a type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DogmaAttribute {
    /// Attribute id.
    pub attribute_id: u32,
    /// Value.
    pub value: f64,
}

/// `GET /universe/types/{id}/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeInfo {
    /// Type id.
    pub type_id: i32,
    /// Type name.
    pub name: String,
    /// Owning group.
    pub group_id: i32,
    /// Packaged volume in m3.
    #[serde(default)]
    pub packaged_volume: Option<f64>,
    /// Cargo capacity in m3.
    #[serde(default)]
    pub capacity: Option<f64>,
    /// Dogma attributes.
    #[serde(default)]
    pub dogma_attributes: Vec<DogmaAttribute>,
}

/// `GET /universe/groups/{id}/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupInfo {
    /// Group id.
    pub group_id: i32,
    /// Group name.
    pub name: String,
    /// Owning category.
    pub category_id: i32,
}

/// `GET /universe/categories/{id}/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryInfo {
    /// Category id.
    pub category_id: i32,
    /// Category name.
    pub name: String,
}

/// `GET /corporations/{id}/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorporationInfo {
    /// Corporation name.
    pub name: String,
    /// Ticker.
    #[serde(default)]
    pub ticker: String,
    /// Alliance membership.
    #[serde(default)]
    pub alliance_id: Option<i64>,
}

/// One entry of `GET /sovereignty/map/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SovereigntyEntry {
    /// System id.
    pub system_id: i32,
    /// Holding alliance.
    #[serde(default)]
    pub alliance_id: Option<i64>,
    /// Holding corporation.
    #[serde(default)]
    pub corporation_id: Option<i64>,
    /// Holding faction.
    #[serde(default)]
    pub faction_id: Option<i64>,
}

/// One entry of `POST /corporations/{id}/assets/locations/`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AssetLocation {
    /// Item id.
    pub item_id: i64,
    /// Coordinates in space.
    pub position: Position,
}

/// `GET /corporations/{id}/starbases/{starbase_id}/`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StarbaseDetail {
    /// Fuel bay contents.
    #[serde(default)]
    pub fuels: Vec<StarbaseFuel>,
}

/// An id/name pair from `POST /universe/ids/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdEntry {
    /// Resolved id.
    pub id: i64,
    /// Name as matched.
    pub name: String,
}

/// One entry of `POST /universe/names/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameEntry {
    /// Id.
    pub id: i64,
    /// Name.
    pub name: String,
    /// Category such as `corporation` or `solar_system`.
    pub category: String,
}
