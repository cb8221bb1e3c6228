//! Item type catalog.
//!
//! Every asset, module and structure hull refers to an [`ItemType`] by id.
//! The catalog is built once per poll from ESI type/group/category data and
//! shared read-only by everything derived from it.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Dogma attribute: fuel blocks consumed per hour by a service module.
pub const ATTR_SERVICE_FUEL_PER_HOUR: u32 = 2109;

/// Dogma attribute: number of fighters in a squadron.
pub const ATTR_FIGHTER_SQUADRON_SIZE: u32 = 2215;

/// Immutable metadata for one item type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemType {
    /// The type id.
    pub type_id: i32,
    /// Display name.
    pub name: String,
    /// Group the type belongs to.
    pub group_id: i32,
    /// Name of the group.
    pub group_name: String,
    /// Category the group belongs to.
    pub category_id: i32,
    /// Name of the category.
    pub category_name: String,
    /// Volume when packaged, in m3.
    pub packaged_volume: f64,
    /// Cargo capacity, in m3.
    pub capacity: f64,
    /// Dogma attribute values keyed by attribute id.
    #[serde(default)]
    pub attributes: HashMap<u32, f64>,
}

impl ItemType {
    /// Creates a type with no group, category or attributes.
    #[must_use]
    pub fn new(type_id: i32, name: impl Into<String>) -> Self {
        Self {
            type_id,
            name: name.into(),
            group_id: 0,
            group_name: String::new(),
            category_id: 0,
            category_name: String::new(),
            packaged_volume: 0.0,
            capacity: 0.0,
            attributes: HashMap::new(),
        }
    }

    /// Sets the group.
    #[must_use]
    pub fn with_group(mut self, group_id: i32, group_name: impl Into<String>) -> Self {
        self.group_id = group_id;
        self.group_name = group_name.into();
        self
    }

    /// Sets the category.
    #[must_use]
    pub fn with_category(mut self, category_id: i32, category_name: impl Into<String>) -> Self {
        self.category_id = category_id;
        self.category_name = category_name.into();
        self
    }

    /// Sets the packaged volume.
    #[must_use]
    pub const fn with_packaged_volume(mut self, volume: f64) -> Self {
        self.packaged_volume = volume;
        self
    }

    /// Sets the capacity.
    #[must_use]
    pub const fn with_capacity(mut self, capacity: f64) -> Self {
        self.capacity = capacity;
        self
    }

    /// Adds a dogma attribute value.
    #[must_use]
    pub fn with_attribute(mut self, attribute_id: u32, value: f64) -> Self {
        self.attributes.insert(attribute_id, value);
        self
    }

    /// Returns a dogma attribute value.
    #[must_use]
    pub fn attribute(&self, attribute_id: u32) -> Option<f64> {
        self.attributes.get(&attribute_id).copied()
    }
}

impl std::fmt::Display for ItemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - ({})", self.name, self.type_id)
    }
}

/// Lookup of item types by id.
#[derive(Debug, Clone, Default)]
pub struct TypeCatalog {
    types: HashMap<i32, Arc<ItemType>>,
}

impl TypeCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a type, replacing any previous entry with the same id.
    pub fn insert(&mut self, item_type: ItemType) -> Arc<ItemType> {
        let item_type = Arc::new(item_type);
        self.types.insert(item_type.type_id, Arc::clone(&item_type));
        item_type
    }

    /// Returns the type with the given id.
    #[must_use]
    pub fn get(&self, type_id: i32) -> Option<&Arc<ItemType>> {
        self.types.get(&type_id)
    }

    /// Returns the type with the given id or an `UnknownType` error.
    pub fn require(&self, type_id: i32) -> Result<Arc<ItemType>> {
        self.types
            .get(&type_id)
            .cloned()
            .ok_or(CoreError::UnknownType { type_id })
    }

    /// Finds a type by exact name.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<&Arc<ItemType>> {
        self.types.values().find(|t| t.name == name)
    }

    /// Returns true if the catalog has an entry for the id.
    #[must_use]
    pub fn contains(&self, type_id: i32) -> bool {
        self.types.contains_key(&type_id)
    }

    /// Number of types in the catalog.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns true if the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Iterates over all types in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ItemType>> {
        self.types.values()
    }
}

impl FromIterator<ItemType> for TypeCatalog {
    fn from_iter<I: IntoIterator<Item = ItemType>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for item_type in iter {
            catalog.insert(item_type);
        }
        catalog
    }
}
