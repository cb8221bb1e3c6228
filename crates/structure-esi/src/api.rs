//! The ESI operations the bot needs, as a trait so loaders can run against a fake.

use std::collections::{HashMap, HashSet};
use std::future::Future;

use parking_lot::Mutex;

use structure_core::{Asset, StarbaseRecord, StructureRecord};

use crate::error::{EsiError, Result};
use crate::models::{
    AssetLocation, CategoryInfo, CorporationInfo, Extraction, GroupInfo, IdEntry, NameEntry,
    SovereigntyEntry, StarbaseDetail, StructureInfo, TypeInfo,
};

/// ESI endpoints used by the loaders.
///
/// Implemented by [`EsiClient`](crate::EsiClient) and by [`FakeEsi`].
pub trait EsiApi: Send + Sync {
    /// `GET /universe/structures/{id}/`. Fails with `Forbidden` without docking rights.
    fn universe_structure(&self, structure_id: i64) -> impl Future<Output = Result<StructureInfo>> + Send;

    /// `GET /corporations/{id}/structures/`, all pages.
    fn corporation_structures(
        &self,
        corporation_id: i64,
    ) -> impl Future<Output = Result<Vec<StructureRecord>>> + Send;

    /// `GET /corporation/{id}/mining/extractions/`, all pages.
    fn mining_extractions(&self, corporation_id: i64) -> impl Future<Output = Result<Vec<Extraction>>> + Send;

    /// `GET /corporations/{id}/assets/`, all pages.
    fn corporation_assets(&self, corporation_id: i64) -> impl Future<Output = Result<Vec<Asset>>> + Send;

    /// `POST /corporations/{id}/assets/locations/`.
    fn asset_locations(
        &self,
        corporation_id: i64,
        item_ids: &[i64],
    ) -> impl Future<Output = Result<Vec<AssetLocation>>> + Send;

    /// `GET /corporations/{id}/starbases/`, all pages.
    fn corporation_starbases(
        &self,
        corporation_id: i64,
    ) -> impl Future<Output = Result<Vec<StarbaseRecord>>> + Send;

    /// `GET /corporations/{id}/starbases/{starbase_id}/`.
    fn starbase_detail(
        &self,
        corporation_id: i64,
        starbase_id: i64,
        system_id: i32,
    ) -> impl Future<Output = Result<StarbaseDetail>> + Send;

    /// `GET /corporations/{id}/`.
    fn corporation(&self, corporation_id: i64) -> impl Future<Output = Result<CorporationInfo>> + Send;

    /// `GET /sovereignty/map/`.
    fn sovereignty_map(&self) -> impl Future<Output = Result<Vec<SovereigntyEntry>>> + Send;

    /// `GET /universe/types/{id}/`.
    fn type_info(&self, type_id: i32) -> impl Future<Output = Result<TypeInfo>> + Send;

    /// `GET /universe/groups/{id}/`.
    fn group_info(&self, group_id: i32) -> impl Future<Output = Result<GroupInfo>> + Send;

    /// `GET /universe/categories/{id}/`.
    fn category_info(&self, category_id: i32) -> impl Future<Output = Result<CategoryInfo>> + Send;

    /// `POST /universe/ids/`, keyed by plural category (`corporations`, `systems`...).
    fn universe_ids(
        &self,
        names: &[String],
    ) -> impl Future<Output = Result<HashMap<String, Vec<IdEntry>>>> + Send;

    /// `POST /universe/names/`.
    fn universe_names(&self, ids: &[i64]) -> impl Future<Output = Result<Vec<NameEntry>>> + Send;
}

/// In-memory [`EsiApi`] for tests.
///
/// Missing entries answer `NotFound`; every call is recorded.
#[derive(Debug, Default)]
pub struct FakeEsi {
    /// Corporation names and ids.
    pub corporations: HashMap<i64, CorporationInfo>,
    /// Structure records per corporation.
    pub structures: HashMap<i64, Vec<StructureRecord>>,
    /// Structure info for docking-accessible structures.
    pub structure_info: HashMap<i64, StructureInfo>,
    /// Structures that answer `Forbidden`.
    pub forbidden: HashSet<i64>,
    /// Extractions per corporation.
    pub extractions: HashMap<i64, Vec<Extraction>>,
    /// Assets per corporation; absent means the call fails.
    pub assets: HashMap<i64, Vec<Asset>>,
    /// Item positions.
    pub locations: HashMap<i64, structure_core::Position>,
    /// Starbases per corporation.
    pub starbases: HashMap<i64, Vec<StarbaseRecord>>,
    /// Starbase fuel bays.
    pub starbase_details: HashMap<i64, StarbaseDetail>,
    /// Sovereignty map.
    pub sovereignty: Vec<SovereigntyEntry>,
    /// Type metadata.
    pub types: HashMap<i32, TypeInfo>,
    /// Group metadata.
    pub groups: HashMap<i32, GroupInfo>,
    /// Category metadata.
    pub categories: HashMap<i32, CategoryInfo>,
    /// Names of systems, moons and other entities.
    pub names: HashMap<i64, NameEntry>,
    calls: Mutex<Vec<String>>,
}

impl FakeEsi {
    /// Creates an empty fake.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a corporation.
    #[must_use]
    pub fn with_corporation(mut self, corporation_id: i64, name: &str, alliance_id: Option<i64>) -> Self {
        self.corporations.insert(
            corporation_id,
            CorporationInfo {
                name: name.to_string(),
                ticker: String::new(),
                alliance_id,
            },
        );
        self
    }

    /// Registers an entity name.
    #[must_use]
    pub fn with_name(mut self, id: i64, name: &str, category: &str) -> Self {
        self.names.insert(
            id,
            NameEntry {
                id,
                name: name.to_string(),
                category: category.to_string(),
            },
        );
        self
    }

    /// Number of calls made to `method`.
    #[must_use]
    pub fn calls(&self, method: &str) -> usize {
        self.calls.lock().iter().filter(|c| *c == method).count()
    }

    fn record(&self, method: &str) {
        self.calls.lock().push(method.to_string());
    }
}

impl EsiApi for FakeEsi {
    async fn universe_structure(&self, structure_id: i64) -> Result<StructureInfo> {
        self.record("universe_structure");
        let path = format!("/universe/structures/{structure_id}/");
        if self.forbidden.contains(&structure_id) {
            return Err(EsiError::Forbidden { path });
        }
        self.structure_info.get(&structure_id).cloned().ok_or(EsiError::NotFound { path })
    }

    async fn corporation_structures(&self, corporation_id: i64) -> Result<Vec<StructureRecord>> {
        self.record("corporation_structures");
        Ok(self.structures.get(&corporation_id).cloned().unwrap_or_default())
    }

    async fn mining_extractions(&self, corporation_id: i64) -> Result<Vec<Extraction>> {
        self.record("mining_extractions");
        Ok(self.extractions.get(&corporation_id).cloned().unwrap_or_default())
    }

    async fn corporation_assets(&self, corporation_id: i64) -> Result<Vec<Asset>> {
        self.record("corporation_assets");
        match self.assets.get(&corporation_id) {
            Some(assets) => Ok(assets.clone()),
            None => Err(EsiError::Status {
                path: format!("/corporations/{corporation_id}/assets/"),
                status: 503,
                body: "assets unavailable".to_string(),
            }),
        }
    }

    async fn asset_locations(&self, _corporation_id: i64, item_ids: &[i64]) -> Result<Vec<AssetLocation>> {
        self.record("asset_locations");
        Ok(item_ids
            .iter()
            .filter_map(|id| {
                self.locations.get(id).map(|position| AssetLocation {
                    item_id: *id,
                    position: *position,
                })
            })
            .collect())
    }

    async fn corporation_starbases(&self, corporation_id: i64) -> Result<Vec<StarbaseRecord>> {
        self.record("corporation_starbases");
        Ok(self.starbases.get(&corporation_id).cloned().unwrap_or_default())
    }

    async fn starbase_detail(&self, corporation_id: i64, starbase_id: i64, _system_id: i32) -> Result<StarbaseDetail> {
        self.record("starbase_detail");
        let path = format!("/corporations/{corporation_id}/starbases/{starbase_id}/");
        self.starbase_details.get(&starbase_id).cloned().ok_or(EsiError::NotFound { path })
    }

    async fn corporation(&self, corporation_id: i64) -> Result<CorporationInfo> {
        self.record("corporation");
        let path = format!("/corporations/{corporation_id}/");
        self.corporations.get(&corporation_id).cloned().ok_or(EsiError::NotFound { path })
    }

    async fn sovereignty_map(&self) -> Result<Vec<SovereigntyEntry>> {
        self.record("sovereignty_map");
        Ok(self.sovereignty.clone())
    }

    async fn type_info(&self, type_id: i32) -> Result<TypeInfo> {
        self.record("type_info");
        let path = format!("/universe/types/{type_id}/");
        self.types.get(&type_id).cloned().ok_or(EsiError::NotFound { path })
    }

    async fn group_info(&self, group_id: i32) -> Result<GroupInfo> {
        self.record("group_info");
        let path = format!("/universe/groups/{group_id}/");
        self.groups.get(&group_id).cloned().ok_or(EsiError::NotFound { path })
    }

    async fn category_info(&self, category_id: i32) -> Result<CategoryInfo> {
        self.record("category_info");
        let path = format!("/universe/categories/{category_id}/");
        self.categories.get(&category_id).cloned().ok_or(EsiError::NotFound { path })
    }

    async fn universe_ids(&self, names: &[String]) -> Result<HashMap<String, Vec<IdEntry>>> {
        self.record("universe_ids");
        let mut found: HashMap<String, Vec<IdEntry>> = HashMap::new();
        for (id, corp) in &self.corporations {
            if names.iter().any(|name| name.eq_ignore_ascii_case(&corp.name)) {
                found.entry("corporations".to_string()).or_default().push(IdEntry {
                    id: *id,
                    name: corp.name.clone(),
                });
            }
        }
        Ok(found)
    }

    async fn universe_names(&self, ids: &[i64]) -> Result<Vec<NameEntry>> {
        self.record("universe_names");
        Ok(ids.iter().filter_map(|id| self.names.get(id).cloned()).collect())
    }
}
