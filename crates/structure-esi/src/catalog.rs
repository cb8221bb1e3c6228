//! Builds the [`TypeCatalog`] from ESI type, group and category metadata.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use futures::{StreamExt, TryStreamExt, stream};
use tracing::debug;

use structure_core::{ItemType, TypeCatalog};

use crate::api::EsiApi;
use crate::error::Result;
use crate::models::{CategoryInfo, GroupInfo, TypeInfo};

/// Combines the three metadata records into an [`ItemType`].
#[must_use]
pub fn build_item_type(info: &TypeInfo, group: &GroupInfo, category: &CategoryInfo) -> ItemType {
    info.dogma_attributes.iter().fold(
        ItemType::new(info.type_id, info.name.clone())
            .with_group(group.group_id, group.name.clone())
            .with_category(category.category_id, category.name.clone())
            .with_packaged_volume(info.packaged_volume.unwrap_or(0.0))
            .with_capacity(info.capacity.unwrap_or(0.0)),
        |item, attr| item.with_attribute(attr.attribute_id, attr.value),
    )
}

/// Fetches metadata for types not yet in a catalog.
///
/// Each type, group and category is requested once per call, with up to
/// `concurrency` requests in flight.
#[derive(Debug)]
pub struct CatalogLoader<C> {
    client: Arc<C>,
    concurrency: usize,
}

impl<C: EsiApi> CatalogLoader<C> {
    /// Creates a loader.
    #[must_use]
    pub fn new(client: Arc<C>, concurrency: usize) -> Self {
        Self {
            client,
            concurrency: concurrency.max(1),
        }
    }

    /// Adds the given types, and anything they need, to `catalog`.
    pub async fn extend(&self, catalog: &mut TypeCatalog, type_ids: impl IntoIterator<Item = i32>) -> Result<()> {
        let wanted: BTreeSet<i32> = type_ids.into_iter().filter(|id| !catalog.contains(*id)).collect();
        if wanted.is_empty() {
            return Ok(());
        }
        debug!(count = wanted.len(), "loading item types");

        let client = &self.client;
        let types: Vec<TypeInfo> = stream::iter(wanted)
            .map(|id| client.type_info(id))
            .buffer_unordered(self.concurrency)
            .try_collect()
            .await?;

        let group_ids: BTreeSet<i32> = types.iter().map(|t| t.group_id).collect();
        let groups: HashMap<i32, GroupInfo> = stream::iter(group_ids)
            .map(|id| client.group_info(id))
            .buffer_unordered(self.concurrency)
            .map_ok(|g| (g.group_id, g))
            .try_collect()
            .await?;

        let category_ids: BTreeSet<i32> = groups.values().map(|g| g.category_id).collect();
        let categories: HashMap<i32, CategoryInfo> = stream::iter(category_ids)
            .map(|id| client.category_info(id))
            .buffer_unordered(self.concurrency)
            .map_ok(|c| (c.category_id, c))
            .try_collect()
            .await?;

        for info in &types {
            let Some(group) = groups.get(&info.group_id) else { continue };
            let Some(category) = categories.get(&group.category_id) else { continue };
            catalog.insert(build_item_type(info, group, category));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::FakeEsi;
    use crate::models::DogmaAttribute;
    use structure_core::ATTR_SERVICE_FUEL_PER_HOUR;

    fn type_info(type_id: i32, name: &str, group_id: i32) -> TypeInfo {
        TypeInfo {
            type_id,
            name: name.to_string(),
            group_id,
            packaged_volume: None,
            capacity: None,
            dogma_attributes: Vec::new(),
        }
    }

    fn fake() -> FakeEsi {
        let mut fake = FakeEsi::new();
        let mut plant = type_info(35878, "Standup Manufacturing Plant I", 1415);
        plant.packaged_volume = Some(4000.0);
        plant.dogma_attributes.push(DogmaAttribute {
            attribute_id: ATTR_SERVICE_FUEL_PER_HOUR,
            value: 12.0,
        });
        fake.types.insert(35878, plant);
        fake.types.insert(35825, type_info(35825, "Raitaru", 1404));
        fake.types.insert(35826, type_info(35826, "Azbel", 1404));
        for (group_id, name, category_id) in [
            (1415, "Structure Engineering Service Module", 66),
            (1404, "Engineering Complex", 65),
        ] {
            fake.groups.insert(
                group_id,
                GroupInfo {
                    group_id,
                    name: name.to_string(),
                    category_id,
                },
            );
        }
        for (category_id, name) in [(66, "Structure Module"), (65, "Structure")] {
            fake.categories.insert(
                category_id,
                CategoryInfo {
                    category_id,
                    name: name.to_string(),
                },
            );
        }
        fake
    }

    #[test]
    fn test_build_item_type() {
        let fake = fake();
        let item = build_item_type(&fake.types[&35878], &fake.groups[&1415], &fake.categories[&66]);
        assert_eq!(item.group_name, "Structure Engineering Service Module");
        assert_eq!(item.category_name, "Structure Module");
        assert!((item.packaged_volume - 4000.0).abs() < f64::EPSILON);
        assert_eq!(item.attribute(ATTR_SERVICE_FUEL_PER_HOUR), Some(12.0));
    }

    #[tokio::test]
    async fn test_extend_fetches_each_id_once() {
        let fake = Arc::new(fake());
        let loader = CatalogLoader::new(Arc::clone(&fake), 4);
        let mut catalog = TypeCatalog::new();

        loader.extend(&mut catalog, [35878, 35825, 35826, 35825]).await.unwrap();
        assert_eq!(catalog.len(), 3);
        assert_eq!(fake.calls("type_info"), 3);
        assert_eq!(fake.calls("group_info"), 2);
        assert_eq!(fake.calls("category_info"), 2);
        assert_eq!(catalog.get(35826).unwrap().group_name, "Engineering Complex");
    }

    #[tokio::test]
    async fn test_extend_skips_known_types() {
        let fake = Arc::new(fake());
        let loader = CatalogLoader::new(Arc::clone(&fake), 4);
        let mut catalog = TypeCatalog::new();
        loader.extend(&mut catalog, [35825]).await.unwrap();
        loader.extend(&mut catalog, [35825]).await.unwrap();
        assert_eq!(fake.calls("type_info"), 1);
    }

    #[tokio::test]
    async fn test_unknown_type_fails() {
        let loader = CatalogLoader::new(Arc::new(fake()), 4);
        let mut catalog = TypeCatalog::new();
        assert!(loader.extend(&mut catalog, [1]).await.is_err());
    }
}
