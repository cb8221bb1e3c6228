//! Cached name and id lookups.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::api::EsiApi;
use crate::error::{EsiError, Result};

/// Maximum entries per `/universe/ids/` or `/universe/names/` request.
pub const NAME_CHUNK: usize = 400;

/// Resolves names to ids and back, remembering every answer.
///
/// Name lookups ignore case; ESI answers with the canonical spelling.
#[derive(Debug)]
pub struct NameResolver<C> {
    client: Arc<C>,
    ids: RwLock<HashMap<(String, String), i64>>,
    names: RwLock<HashMap<i64, String>>,
}

impl<C: EsiApi> NameResolver<C> {
    /// Creates a resolver with empty caches.
    #[must_use]
    pub fn new(client: Arc<C>) -> Self {
        Self {
            client,
            ids: RwLock::new(HashMap::new()),
            names: RwLock::new(HashMap::new()),
        }
    }

    /// Ids for `names` in `category` (plural form, e.g. `corporations`).
    ///
    /// The result is keyed by the names as given. Names with no match are
    /// absent from it.
    pub async fn ids(&self, category: &str, names: &[&str]) -> Result<HashMap<String, i64>> {
        let missing: Vec<String> = {
            let cache = self.ids.read();
            names
                .iter()
                .filter(|name| !cache.contains_key(&id_key(category, name)))
                .map(|name| (*name).to_string())
                .collect()
        };

        for chunk in missing.chunks(NAME_CHUNK) {
            debug!(category, count = chunk.len(), "resolving names");
            let found = self.client.universe_ids(chunk).await?;
            let mut ids = self.ids.write();
            let mut known = self.names.write();
            for (found_category, entries) in found {
                for entry in entries {
                    known.insert(entry.id, entry.name.clone());
                    ids.insert(id_key(&found_category, &entry.name), entry.id);
                }
            }
        }

        let cache = self.ids.read();
        Ok(names
            .iter()
            .filter_map(|name| {
                cache
                    .get(&id_key(category, name))
                    .map(|id| ((*name).to_string(), *id))
            })
            .collect())
    }

    /// Id of a single corporation.
    pub async fn corporation_id(&self, name: &str) -> Result<i64> {
        self.ids("corporations", &[name])
            .await?
            .get(name)
            .copied()
            .ok_or_else(|| EsiError::NameNotFound {
                name: name.to_string(),
                category: "corporations".to_string(),
            })
    }

    /// Names for `ids`; unknown ids are absent from the result.
    pub async fn names(&self, ids: &[i64]) -> Result<HashMap<i64, String>> {
        let mut missing: Vec<i64> = {
            let cache = self.names.read();
            ids.iter().filter(|id| !cache.contains_key(id)).copied().collect()
        };
        missing.sort_unstable();
        missing.dedup();

        for chunk in missing.chunks(NAME_CHUNK) {
            debug!(count = chunk.len(), "resolving ids");
            let found = self.client.universe_names(chunk).await?;
            let mut names = self.names.write();
            for entry in found {
                names.insert(entry.id, entry.name);
            }
        }

        let cache = self.names.read();
        Ok(ids
            .iter()
            .filter_map(|id| cache.get(id).map(|name| (*id, name.clone())))
            .collect())
    }
}

fn id_key(category: &str, name: &str) -> (String, String) {
    (category.to_string(), name.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::FakeEsi;

    fn resolver() -> (Arc<FakeEsi>, NameResolver<FakeEsi>) {
        let fake = Arc::new(
            FakeEsi::new()
                .with_corporation(98_000_001, "Test Corp", None)
                .with_name(30_000_142, "Jita", "solar_system")
                .with_name(40_009_082, "Jita IV - Moon 4", "moon"),
        );
        (Arc::clone(&fake), NameResolver::new(fake))
    }

    #[tokio::test]
    async fn test_corporation_id_is_cached() {
        let (fake, resolver) = resolver();
        assert_eq!(resolver.corporation_id("Test Corp").await.unwrap(), 98_000_001);
        assert_eq!(resolver.corporation_id("Test Corp").await.unwrap(), 98_000_001);
        assert_eq!(fake.calls("universe_ids"), 1);
    }

    #[tokio::test]
    async fn test_corporation_id_ignores_case() {
        let (fake, resolver) = resolver();
        assert_eq!(resolver.corporation_id("test corp").await.unwrap(), 98_000_001);
        assert_eq!(resolver.corporation_id("TEST CORP").await.unwrap(), 98_000_001);
        assert_eq!(fake.calls("universe_ids"), 1);

        let ids = resolver.ids("corporations", &["Test CORP"]).await.unwrap();
        assert_eq!(ids.get("Test CORP"), Some(&98_000_001));
    }

    #[tokio::test]
    async fn test_unknown_corporation() {
        let (_, resolver) = resolver();
        let err = resolver.corporation_id("Nobody").await.unwrap_err();
        assert!(matches!(err, EsiError::NameNotFound { .. }));
    }

    #[tokio::test]
    async fn test_names_only_fetch_missing() {
        let (fake, resolver) = resolver();
        let first = resolver.names(&[30_000_142]).await.unwrap();
        assert_eq!(first[&30_000_142], "Jita");

        let second = resolver.names(&[30_000_142, 40_009_082, 40_009_082]).await.unwrap();
        assert_eq!(second.len(), 2);
        assert_eq!(second[&40_009_082], "Jita IV - Moon 4");
        assert_eq!(fake.calls("universe_names"), 2);

        resolver.names(&[30_000_142, 40_009_082]).await.unwrap();
        assert_eq!(fake.calls("universe_names"), 2);
    }

    #[tokio::test]
    async fn test_id_lookup_fills_name_cache() {
        let (fake, resolver) = resolver();
        resolver.corporation_id("Test Corp").await.unwrap();
        let names = resolver.names(&[98_000_001]).await.unwrap();
        assert_eq!(names[&98_000_001], "Test Corp");
        assert_eq!(fake.calls("universe_names"), 0);
    }

    #[tokio::test]
    async fn test_large_lookups_are_chunked() {
        let (fake, resolver) = resolver();
        let ids: Vec<i64> = (1..=(NAME_CHUNK as i64 * 2 + 1)).collect();
        resolver.names(&ids).await.unwrap();
        assert_eq!(fake.calls("universe_names"), 3);
    }
}
