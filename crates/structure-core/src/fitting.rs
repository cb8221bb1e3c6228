//! Structure fittings reconstructed from asset location flags.
//!
//! ESI reports fitted modules as ordinary assets whose `location_id` is the
//! structure and whose `location_flag` names the slot, usually with a numeric
//! suffix (`HiSlot3`, `ServiceSlot0`). [`Fitting::from_assets`] groups those
//! assets by slot using an ordered list of prefixes.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::asset::Asset;
use crate::catalog::{ATTR_FIGHTER_SQUADRON_SIZE, ItemType, TypeCatalog};
use crate::error::Result;

/// An equipment slot category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Slot {
    /// Cargo hold.
    Cargo,
    /// Drone bay.
    DroneBay,
    /// Fighter bay.
    FighterBay,
    /// Fighter launch tube.
    FighterTube,
    /// High power slot.
    HiSlot,
    /// Low power slot.
    LoSlot,
    /// Medium power slot.
    MedSlot,
    /// Rig slot.
    RigSlot,
    /// Service module slot.
    ServiceSlot,
    /// Subsystem slot.
    SubSystemSlot,
    /// Structure fuel bay.
    StructureFuel,
    /// Quantum core room.
    QuantumCoreRoom,
}

impl Slot {
    /// All slots in matching order. No name is a prefix of a later one.
    pub const ALL: [Self; 12] = [
        Self::Cargo,
        Self::DroneBay,
        Self::FighterBay,
        Self::FighterTube,
        Self::HiSlot,
        Self::LoSlot,
        Self::MedSlot,
        Self::RigSlot,
        Self::ServiceSlot,
        Self::SubSystemSlot,
        Self::StructureFuel,
        Self::QuantumCoreRoom,
    ];

    /// Returns the flag prefix for this slot.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cargo => "Cargo",
            Self::DroneBay => "DroneBay",
            Self::FighterBay => "FighterBay",
            Self::FighterTube => "FighterTube",
            Self::HiSlot => "HiSlot",
            Self::LoSlot => "LoSlot",
            Self::MedSlot => "MedSlot",
            Self::RigSlot => "RigSlot",
            Self::ServiceSlot => "ServiceSlot",
            Self::SubSystemSlot => "SubSystemSlot",
            Self::StructureFuel => "StructureFuel",
            Self::QuantumCoreRoom => "QuantumCoreRoom",
        }
    }

    /// Returns the first slot whose name prefixes the location flag.
    #[must_use]
    pub fn from_flag(flag: &str) -> Option<Self> {
        if flag.is_empty() {
            return None;
        }
        Self::ALL
            .into_iter()
            .find(|slot| flag.starts_with(slot.as_str()))
    }

    const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An item installed in, or stored in, a structure slot.
#[derive(Debug, Clone)]
pub struct FittedItem {
    /// Item id of the underlying asset.
    pub item_id: i64,
    /// Type metadata.
    pub item_type: Arc<ItemType>,
    /// Effective quantity.
    pub quantity: i64,
}

impl FittedItem {
    /// Creates a fitted item with quantity 1.
    #[must_use]
    pub const fn new(item_id: i64, item_type: Arc<ItemType>) -> Self {
        Self {
            item_id,
            item_type,
            quantity: 1,
        }
    }

    /// Sets the quantity.
    #[must_use]
    pub const fn with_quantity(mut self, quantity: i64) -> Self {
        self.quantity = quantity;
        self
    }

    /// The type name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.item_type.name
    }

    fn name_count(&self) -> String {
        if self.quantity > 1 {
            format!("{} ({})", self.item_type.name, self.quantity)
        } else {
            self.item_type.name.clone()
        }
    }
}

/// Items grouped by slot. Every slot is always present, possibly empty.
#[derive(Debug, Clone, Default)]
pub struct Fitting {
    slots: [Vec<FittedItem>; 12],
}

impl Fitting {
    /// Creates a fitting with every slot empty.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Groups a structure's contents by slot.
    ///
    /// Assets with an empty or unrecognised flag are dropped. Fighter tubes
    /// report a squadron token, so their quantity is replaced by the type's
    /// squadron size attribute when it has one.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::UnknownType` if a slotted asset's type is not in
    /// the catalog.
    pub fn from_assets<'a, I>(assets: I, catalog: &TypeCatalog) -> Result<Self>
    where
        I: IntoIterator<Item = &'a Asset>,
    {
        let mut fitting = Self::new();
        for asset in assets {
            let Some(slot) = Slot::from_flag(&asset.location_flag) else {
                trace!(
                    item_id = asset.item_id,
                    flag = %asset.location_flag,
                    "asset flag matches no slot"
                );
                continue;
            };
            let item_type = catalog.require(asset.type_id)?;
            let quantity = if slot == Slot::FighterTube {
                item_type
                    .attribute(ATTR_FIGHTER_SQUADRON_SIZE)
                    .map_or(asset.quantity, |size| size as i64)
            } else {
                asset.quantity
            };
            fitting.push(
                slot,
                FittedItem::new(asset.item_id, item_type).with_quantity(quantity),
            );
        }
        Ok(fitting)
    }

    /// Adds an item to a slot.
    #[must_use]
    pub fn with_item(mut self, slot: Slot, item: FittedItem) -> Self {
        self.push(slot, item);
        self
    }

    /// Adds an item to a slot.
    pub fn push(&mut self, slot: Slot, item: FittedItem) {
        self.slots[slot.index()].push(item);
    }

    /// Returns the items in a slot.
    #[must_use]
    pub fn slot(&self, slot: Slot) -> &[FittedItem] {
        &self.slots[slot.index()]
    }

    /// Service modules.
    #[must_use]
    pub fn services(&self) -> &[FittedItem] {
        self.slot(Slot::ServiceSlot)
    }

    /// Returns true if every slot is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Vec::is_empty)
    }

    /// Iterates over `(slot, items)` pairs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (Slot, &[FittedItem])> {
        Slot::ALL.into_iter().map(|slot| (slot, self.slot(slot)))
    }

    /// Total packaged volume of all items, in m3.
    #[must_use]
    pub fn packaged_volume(&self) -> f64 {
        self.slots
            .iter()
            .flatten()
            .map(|item| item.item_type.packaged_volume * item.quantity as f64)
            .sum()
    }

    fn counts(&self) -> HashMap<(Slot, i32), i64> {
        let mut counts = HashMap::new();
        for (slot, items) in self.iter() {
            for item in items {
                *counts.entry((slot, item.item_type.type_id)).or_insert(0) += item.quantity;
            }
        }
        counts
    }

    /// Compares the contents of two fittings slot by slot.
    ///
    /// A fitting is greater than another if it holds everything the other
    /// holds plus more. Fittings where each holds something the other lacks
    /// are incomparable.
    #[must_use]
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        let ours = self.counts();
        let theirs = other.counts();
        let keys: BTreeSet<_> = ours.keys().chain(theirs.keys()).copied().collect();

        let mut more = false;
        let mut less = false;
        for key in keys {
            let diff = ours.get(&key).copied().unwrap_or(0) - theirs.get(&key).copied().unwrap_or(0);
            match diff.cmp(&0) {
                Ordering::Greater => more = true,
                Ordering::Less => less = true,
                Ordering::Equal => {}
            }
        }

        match (more, less) {
            (false, false) => Some(Ordering::Equal),
            (true, false) => Some(Ordering::Greater),
            (false, true) => Some(Ordering::Less),
            (true, true) => None,
        }
    }
}

impl PartialEq for Fitting {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Some(Ordering::Equal)
    }
}

impl PartialOrd for Fitting {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.compare(other)
    }
}

impl fmt::Display for Fitting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut lines: Vec<String> = self
            .iter()
            .filter(|(_, items)| !items.is_empty())
            .map(|(slot, items)| {
                let mut names: Vec<String> = items.iter().map(FittedItem::name_count).collect();
                names.sort();
                format!("{slot}: {}", names.join(", "))
            })
            .collect();
        lines.sort();
        f.write_str(&lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ATTR_SERVICE_FUEL_PER_HOUR;
    use proptest::prelude::*;

    const PAINTER: i32 = 35_949;
    const FIGHTER: i32 = 40_556;
    const FACTORY: i32 = 35_878;

    fn catalog() -> TypeCatalog {
        [
            ItemType::new(PAINTER, "Standup Target Painter I").with_packaged_volume(4000.0),
            ItemType::new(FIGHTER, "Standup Einherji I")
                .with_packaged_volume(1000.0)
                .with_attribute(ATTR_FIGHTER_SQUADRON_SIZE, 4.0),
            ItemType::new(FACTORY, "Standup Manufacturing Plant I")
                .with_attribute(ATTR_SERVICE_FUEL_PER_HOUR, 12.0),
        ]
        .into_iter()
        .collect()
    }

    fn item(catalog: &TypeCatalog, type_id: i32, quantity: i64) -> FittedItem {
        FittedItem::new(1, catalog.require(type_id).unwrap()).with_quantity(quantity)
    }

    mod slot_tests {
        use super::*;
        use test_case::test_case;

        #[test_case("HiSlot3", Some(Slot::HiSlot) ; "numbered high slot")]
        #[test_case("ServiceSlot2", Some(Slot::ServiceSlot) ; "numbered service slot")]
        #[test_case("FighterTube", Some(Slot::FighterTube) ; "bare fighter tube")]
        #[test_case("FighterTube4", Some(Slot::FighterTube) ; "numbered fighter tube")]
        #[test_case("FighterBay", Some(Slot::FighterBay) ; "fighter bay")]
        #[test_case("StructureFuel", Some(Slot::StructureFuel) ; "fuel bay")]
        #[test_case("QuantumCoreRoom", Some(Slot::QuantumCoreRoom) ; "core room")]
        #[test_case("CorpSAG1", None ; "corp hangar")]
        #[test_case("", None ; "empty flag")]
        fn slot_from_flag(flag: &str, expected: Option<Slot>) {
            assert_eq!(Slot::from_flag(flag), expected);
        }

        #[test]
        fn no_slot_name_prefixes_a_later_one() {
            for (i, earlier) in Slot::ALL.iter().enumerate() {
                for later in &Slot::ALL[i + 1..] {
                    assert!(!later.as_str().starts_with(earlier.as_str()));
                }
            }
        }
    }

    mod builder_tests {
        use super::*;

        #[test]
        fn service_slot_lands_only_in_service_slot() {
            let catalog = catalog();
            let assets = [Asset::new(7, FACTORY, 100, "ServiceSlot2")];
            let fitting = Fitting::from_assets(&assets, &catalog).unwrap();

            for (slot, items) in fitting.iter() {
                if slot == Slot::ServiceSlot {
                    assert_eq!(items.len(), 1);
                    assert_eq!(items[0].item_id, 7);
                } else {
                    assert!(items.is_empty(), "{slot} should be empty");
                }
            }
        }

        #[test]
        fn fighter_tube_uses_squadron_size() {
            let catalog = catalog();
            let assets = [Asset::new(1, FIGHTER, 100, "FighterTube0").with_quantity(1)];
            let fitting = Fitting::from_assets(&assets, &catalog).unwrap();

            assert_eq!(fitting.slot(Slot::FighterTube)[0].quantity, 4);
        }

        #[test]
        fn fighter_tube_without_attribute_keeps_quantity() {
            let catalog = catalog();
            let assets = [Asset::new(1, PAINTER, 100, "FighterTube0").with_quantity(2)];
            let fitting = Fitting::from_assets(&assets, &catalog).unwrap();

            assert_eq!(fitting.slot(Slot::FighterTube)[0].quantity, 2);
        }

        #[test]
        fn fighter_bay_keeps_reported_quantity() {
            let catalog = catalog();
            let assets = [Asset::new(1, FIGHTER, 100, "FighterBay").with_quantity(9)];
            let fitting = Fitting::from_assets(&assets, &catalog).unwrap();

            assert_eq!(fitting.slot(Slot::FighterBay)[0].quantity, 9);
        }

        #[test]
        fn empty_input_is_empty_fitting() {
            let assets: [Asset; 0] = [];
            let fitting = Fitting::from_assets(&assets, &catalog()).unwrap();
            assert!(fitting.is_empty());
            assert!(fitting.iter().all(|(_, items)| items.is_empty()));
        }

        #[test]
        fn unrecognised_flags_are_dropped() {
            let catalog = catalog();
            let assets = [
                Asset::new(1, PAINTER, 100, ""),
                Asset::new(2, PAINTER, 100, "CorpSAG3"),
                Asset::new(3, PAINTER, 100, "AutoFit"),
            ];
            let fitting = Fitting::from_assets(&assets, &catalog).unwrap();
            assert!(fitting.is_empty());
        }

        #[test]
        fn unknown_type_in_slot_is_an_error() {
            let assets = [Asset::new(1, 999, 100, "MedSlot0")];
            assert!(Fitting::from_assets(&assets, &catalog()).is_err());
        }

        #[test]
        fn unknown_type_outside_slots_is_ignored() {
            let assets = [Asset::new(1, 999, 100, "CorpSAG1")];
            assert!(Fitting::from_assets(&assets, &catalog()).unwrap().is_empty());
        }
    }

    mod comparison_tests {
        use super::*;

        fn painters(n: usize) -> Fitting {
            let catalog = catalog();
            (0..n).fold(Fitting::new(), |f, _| {
                f.with_item(Slot::MedSlot, item(&catalog, PAINTER, 1))
            })
        }

        fn with_fighters(quantity: i64) -> Fitting {
            let catalog = catalog();
            painters(1).with_item(Slot::FighterBay, item(&catalog, FIGHTER, quantity))
        }

        #[test]
        fn equal_fittings() {
            assert_eq!(painters(1), painters(1));
            assert!(painters(1) >= painters(1));
            assert!(painters(1) <= painters(1));
        }

        #[test]
        fn fewer_modules_is_less() {
            assert!(painters(1) < painters(2));
            assert!(painters(2) > painters(1));
            assert_ne!(painters(1), painters(2));
        }

        #[test]
        fn quantity_counts() {
            assert!(with_fighters(1) < with_fighters(2));
            assert!(with_fighters(2) > with_fighters(1));
        }

        #[test]
        fn same_type_in_different_slots_differs() {
            let catalog = catalog();
            let med = Fitting::new().with_item(Slot::MedSlot, item(&catalog, PAINTER, 1));
            let high = Fitting::new().with_item(Slot::HiSlot, item(&catalog, PAINTER, 1));
            assert_eq!(med.compare(&high), None);
        }
    }

    #[test]
    fn packaged_volume_sums_quantities() {
        assert!((Fitting::new().packaged_volume()).abs() < f64::EPSILON);
        let catalog = catalog();
        let fitting = Fitting::new()
            .with_item(Slot::MedSlot, item(&catalog, PAINTER, 1))
            .with_item(Slot::FighterBay, item(&catalog, FIGHTER, 2));
        assert!((fitting.packaged_volume() - 6000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn display_lists_slots_sorted() {
        let catalog = catalog();
        let fitting = Fitting::new()
            .with_item(Slot::MedSlot, item(&catalog, PAINTER, 1))
            .with_item(Slot::FighterBay, item(&catalog, FIGHTER, 2));
        assert_eq!(
            fitting.to_string(),
            "FighterBay: Standup Einherji I (2)\nMedSlot: Standup Target Painter I"
        );
    }

    fn flag_strategy() -> impl Strategy<Value = String> {
        prop_oneof![
            (0usize..Slot::ALL.len(), 0u8..8)
                .prop_map(|(i, n)| format!("{}{n}", Slot::ALL[i].as_str())),
            "[A-Za-z]{0,12}",
        ]
    }

    proptest! {
        #[test]
        fn every_slotted_asset_lands_exactly_once(flags in prop::collection::vec(flag_strategy(), 0..40)) {
            let catalog = catalog();
            let assets: Vec<Asset> = flags
                .iter()
                .enumerate()
                .map(|(i, flag)| Asset::new(i as i64, PAINTER, 100, flag.clone()))
                .collect();
            let fitting = Fitting::from_assets(&assets, &catalog).unwrap();

            let expected = assets.iter().filter(|a| Slot::from_flag(&a.location_flag).is_some()).count();
            let placed: usize = fitting.iter().map(|(_, items)| items.len()).sum();
            prop_assert_eq!(placed, expected);

            for (slot, items) in fitting.iter() {
                for placed_item in items {
                    let flag = &assets[placed_item.item_id as usize].location_flag;
                    prop_assert_eq!(Slot::from_flag(flag), Some(slot));
                }
            }
        }
    }
}
