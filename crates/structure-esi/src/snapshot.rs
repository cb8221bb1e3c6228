//! Gathers everything the alert model needs for one corporation.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::{StreamExt, TryStreamExt, stream};
use tracing::{debug, info, warn};

use structure_core::{
    Asset, AssemblyContext, FuelBonusTable, ItemType, Position, Starbase, StarbaseFuel, Structure,
    StructureAccess, StructureRecord, TypeCatalog, assign_modules, is_starbase_item, is_system_id,
};
use structure_core::starbase::CONTROL_TOWER_GROUP;

use crate::api::EsiApi;
use crate::catalog::CatalogLoader;
use crate::error::{EsiError, Result};
use crate::names::NameResolver;

/// Pre-fetched corporation data.
#[derive(Debug, Clone)]
pub struct CorporationSnapshot {
    /// Corporation id.
    pub corporation_id: i64,
    /// Corporation name as configured.
    pub corporation_name: String,
    /// Structure records.
    pub structures: Vec<StructureRecord>,
    /// Docking access per structure.
    pub access: HashMap<i64, StructureAccess>,
    /// Chunk arrival per refinery.
    pub detonations: HashMap<i64, DateTime<Utc>>,
    /// Corporation assets, or why they could not be read.
    pub assets: std::result::Result<Vec<Asset>, String>,
    /// Types of structures, their contents and starbase items.
    pub catalog: TypeCatalog,
    /// Names of the systems structures sit in.
    pub system_names: HashMap<i32, String>,
    /// Control towers.
    pub starbases: Vec<Starbase>,
    /// Systems held by the corporation's alliance.
    pub sovereignty_systems: HashSet<i32>,
}

impl CorporationSnapshot {
    /// Assets, when they could be read.
    #[must_use]
    pub fn assets(&self) -> Option<&[Asset]> {
        self.assets.as_deref().ok()
    }

    /// Why assets are missing, if they are.
    #[must_use]
    pub fn assets_error(&self) -> Option<&str> {
        self.assets.as_ref().err().map(String::as_str)
    }

    /// True if the alliance holds sovereignty in `system_id`.
    #[must_use]
    pub fn in_sovereignty(&self, system_id: i32) -> bool {
        self.sovereignty_systems.contains(&system_id)
    }

    /// Assembles every structure, keeping per-structure failures separate.
    #[must_use]
    pub fn structures(&self, fuel_bonus: &Arc<FuelBonusTable>) -> Vec<(i64, structure_core::Result<Structure>)> {
        let ctx = AssemblyContext {
            catalog: &self.catalog,
            assets: self.assets(),
            access: &self.access,
            detonations: &self.detonations,
            system_names: &self.system_names,
        };
        self.structures
            .iter()
            .map(|record| {
                let structure = Structure::from_record(record, &ctx, Arc::clone(fuel_bonus));
                (record.structure_id, structure)
            })
            .collect()
    }
}

/// Loads a [`CorporationSnapshot`] through an [`EsiApi`].
#[derive(Debug)]
pub struct SnapshotLoader<C> {
    client: Arc<C>,
    names: NameResolver<C>,
    catalog: CatalogLoader<C>,
    concurrency: usize,
    include_starbases: bool,
}

impl<C: EsiApi> SnapshotLoader<C> {
    /// Creates a loader with up to `concurrency` requests in flight.
    #[must_use]
    pub fn new(client: Arc<C>, concurrency: usize) -> Self {
        Self {
            names: NameResolver::new(Arc::clone(&client)),
            catalog: CatalogLoader::new(Arc::clone(&client), concurrency),
            client,
            concurrency: concurrency.max(1),
            include_starbases: true,
        }
    }

    /// Enables or disables starbase loading.
    #[must_use]
    pub const fn with_starbases(mut self, include: bool) -> Self {
        self.include_starbases = include;
        self
    }

    /// Loads the named corporation.
    ///
    /// An asset failure is recorded in the snapshot; any other failure
    /// aborts the load.
    pub async fn load(&self, corporation_name: &str) -> Result<CorporationSnapshot> {
        let corporation_id = self.names.corporation_id(corporation_name).await?;
        info!(corporation = corporation_name, corporation_id, "loading corporation");

        let structures = self.client.corporation_structures(corporation_id).await?;
        let access = self.structure_access(&structures).await?;
        let detonations: HashMap<i64, DateTime<Utc>> = self
            .client
            .mining_extractions(corporation_id)
            .await?
            .into_iter()
            .map(|e| (e.structure_id, e.chunk_arrival_time))
            .collect();

        let assets = match self.client.corporation_assets(corporation_id).await {
            Ok(assets) => Ok(assets),
            Err(err) => {
                warn!(corporation_id, error = %err, "corporation assets unavailable");
                Err(err.to_string())
            }
        };

        let structure_ids: HashSet<i64> = structures.iter().map(|s| s.structure_id).collect();
        let mut type_ids: Vec<i32> = structures.iter().map(|s| s.type_id).collect();
        if let Ok(assets) = &assets {
            type_ids.extend(
                assets
                    .iter()
                    .filter(|a| structure_ids.contains(&a.location_id) || is_system_id(a.location_id))
                    .map(|a| a.type_id),
            );
        }
        let mut catalog = TypeCatalog::new();
        self.catalog.extend(&mut catalog, type_ids).await?;

        let starbases = match &assets {
            Ok(assets) if self.include_starbases => {
                self.load_starbases(corporation_id, assets, &mut catalog).await?
            }
            Err(_) if self.include_starbases => {
                warn!(corporation_id, "skipping starbase checks without assets");
                Vec::new()
            }
            _ => Vec::new(),
        };
        let sovereignty_systems = if starbases.is_empty() {
            HashSet::new()
        } else {
            self.sovereignty_systems(corporation_id).await?
        };

        let system_ids: Vec<i64> = structures
            .iter()
            .map(|s| i64::from(s.system_id))
            .chain(access.values().filter_map(|a| match a {
                StructureAccess::Accessible { system_id, .. } => Some(i64::from(*system_id)),
                StructureAccess::Inaccessible => None,
            }))
            .collect();
        let system_names = self
            .names
            .names(&system_ids)
            .await?
            .into_iter()
            .filter_map(|(id, name)| i32::try_from(id).ok().map(|id| (id, name)))
            .collect();

        info!(
            corporation_id,
            structures = structures.len(),
            starbases = starbases.len(),
            assets_available = assets.is_ok(),
            "corporation loaded"
        );
        Ok(CorporationSnapshot {
            corporation_id,
            corporation_name: corporation_name.to_string(),
            structures,
            access,
            detonations,
            assets,
            catalog,
            system_names,
            starbases,
            sovereignty_systems,
        })
    }

    async fn structure_access(&self, structures: &[StructureRecord]) -> Result<HashMap<i64, StructureAccess>> {
        stream::iter(structures)
            .map(|record| async move {
                let access = match self.client.universe_structure(record.structure_id).await {
                    Ok(info) => StructureAccess::Accessible {
                        name: info.name,
                        system_id: info.solar_system_id,
                    },
                    Err(EsiError::Forbidden { .. }) => {
                        debug!(structure_id = record.structure_id, "structure is inaccessible");
                        StructureAccess::Inaccessible
                    }
                    Err(err) => return Err(err),
                };
                Ok((record.structure_id, access))
            })
            .buffer_unordered(self.concurrency)
            .try_collect()
            .await
    }

    async fn load_starbases(
        &self,
        corporation_id: i64,
        assets: &[Asset],
        catalog: &mut TypeCatalog,
    ) -> Result<Vec<Starbase>> {
        let records = self.client.corporation_starbases(corporation_id).await?;
        if records.is_empty() {
            return Ok(Vec::new());
        }
        self.catalog.extend(catalog, records.iter().map(|r| r.type_id)).await?;

        let tower_ids: HashSet<i64> = records.iter().map(|r| r.starbase_id).collect();
        let modules: Vec<(&Asset, Arc<ItemType>)> = assets
            .iter()
            .filter(|a| !tower_ids.contains(&a.item_id))
            .filter_map(|a| {
                let item_type = catalog.get(a.type_id)?;
                (is_starbase_item(a, item_type) && item_type.group_name != CONTROL_TOWER_GROUP)
                    .then(|| (a, Arc::clone(item_type)))
            })
            .collect();

        let item_ids: Vec<i64> = tower_ids
            .iter()
            .copied()
            .chain(modules.iter().map(|(a, _)| a.item_id))
            .collect();
        let positions: HashMap<i64, Position> = self
            .client
            .asset_locations(corporation_id, &item_ids)
            .await?
            .into_iter()
            .map(|l| (l.item_id, l.position))
            .collect();

        // Coordinates are per system, so modules only match towers in the same one.
        let mut towers_by_system: HashMap<i64, HashMap<i64, Position>> = HashMap::new();
        for record in &records {
            if let Some(position) = positions.get(&record.starbase_id) {
                towers_by_system
                    .entry(i64::from(record.system_id))
                    .or_default()
                    .insert(record.starbase_id, *position);
            }
        }
        let mut modules_by_system: HashMap<i64, Vec<(Arc<ItemType>, Position)>> = HashMap::new();
        for (asset, item_type) in modules {
            if let Some(position) = positions.get(&asset.item_id) {
                modules_by_system
                    .entry(asset.location_id)
                    .or_default()
                    .push((item_type, *position));
            }
        }
        let mut tower_modules: HashMap<i64, Vec<Arc<ItemType>>> = HashMap::new();
        for (system_id, system_modules) in modules_by_system {
            if let Some(towers) = towers_by_system.get(&system_id) {
                tower_modules.extend(assign_modules(system_modules, towers));
            }
        }

        let moon_ids: Vec<i64> = records.iter().filter_map(|r| r.moon_id.map(i64::from)).collect();
        let moon_names = self.names.names(&moon_ids).await?;

        let mut fuels: HashMap<i64, Vec<StarbaseFuel>> = stream::iter(&records)
            .map(|record| async move {
                let detail = self
                    .client
                    .starbase_detail(corporation_id, record.starbase_id, record.system_id)
                    .await?;
                Ok::<_, EsiError>((record.starbase_id, detail.fuels))
            })
            .buffer_unordered(self.concurrency)
            .try_collect()
            .await?;

        records
            .iter()
            .map(|record| -> Result<Starbase> {
                let tower_type = catalog.require(record.type_id)?;
                let moon_name = record
                    .moon_id
                    .and_then(|moon_id| moon_names.get(&i64::from(moon_id)).cloned());
                Ok(Starbase::new(record, tower_type, moon_name)
                    .with_fuels(fuels.remove(&record.starbase_id).unwrap_or_default())
                    .with_modules(tower_modules.remove(&record.starbase_id).unwrap_or_default()))
            })
            .collect()
    }

    async fn sovereignty_systems(&self, corporation_id: i64) -> Result<HashSet<i32>> {
        let corporation = self.client.corporation(corporation_id).await?;
        let Some(alliance_id) = corporation.alliance_id else {
            return Ok(HashSet::new());
        };
        Ok(self
            .client
            .sovereignty_map()
            .await?
            .into_iter()
            .filter(|entry| entry.alliance_id == Some(alliance_id))
            .map(|entry| entry.system_id)
            .collect())
    }
}
