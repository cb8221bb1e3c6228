//! HTTP client for ESI, with authenticated routes proxied through Neucore.
//!
//! Public routes go straight to `{esi_host}{version}{path}`. Authenticated
//! routes are sent to the Neucore ESI proxy, which takes the versioned path
//! and its query string in a single `esi-path-query` parameter and picks
//! the token of the configured datasource character.

use std::collections::HashMap;

use reqwest::header::{AUTHORIZATION, HeaderMap};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;
use url::form_urlencoded;

use structure_core::{Asset, StarbaseRecord, StructureRecord};

use crate::api::EsiApi;
use crate::config::{EsiConfig, NeucoreConfig};
use crate::error::{EsiError, Result};
use crate::models::{
    AssetLocation, CategoryInfo, CorporationInfo, Extraction, GroupInfo, IdEntry, NameEntry,
    SovereigntyEntry, StarbaseDetail, StructureInfo, TypeInfo,
};

/// Header carrying the datasource character id (`Neucore-EveCharacter`).
pub const NEUCORE_CHARACTER_HEADER: &str = "neucore-evecharacter";
/// Header carrying the optional Neucore login name (`Neucore-EveLogin`).
pub const NEUCORE_LOGIN_HEADER: &str = "neucore-evelogin";
/// Query parameter holding the proxied ESI path.
pub const ESI_PATH_QUERY: &str = "esi-path-query";
/// Response header with the total page count (`X-Pages`).
pub const PAGES_HEADER: &str = "x-pages";
/// Maximum item ids per asset location request.
pub const ASSET_LOCATION_CHUNK: usize = 1000;

/// Where a request is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Directly to ESI, no token.
    Public,
    /// Through Neucore with the datasource character's token.
    Authenticated,
}

/// ESI client.
#[derive(Debug, Clone)]
pub struct EsiClient {
    http: reqwest::Client,
    config: EsiConfig,
}

impl EsiClient {
    /// Creates a client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: EsiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .build()?;
        Ok(Self { http, config })
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &EsiConfig {
        &self.config
    }

    fn neucore(&self) -> Result<&NeucoreConfig> {
        self.config.neucore.as_ref().ok_or_else(|| EsiError::InvalidConfig {
            reason: "authenticated ESI route requires Neucore credentials".to_string(),
        })
    }

    /// Builds the URL for a request.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or an authenticated route is
    /// requested without Neucore credentials.
    pub fn request_url(&self, route: Route, path: &str, query: &[(&str, String)]) -> Result<Url> {
        let versioned = format!("{}{path}", self.config.esi_version);
        match route {
            Route::Public => {
                let base = self.config.esi_host.as_str().trim_end_matches('/');
                let mut url = Url::parse(&format!("{base}{versioned}"))?;
                if !query.is_empty() {
                    url.query_pairs_mut()
                        .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
                }
                Ok(url)
            }
            Route::Authenticated => {
                let mut url = self.neucore()?.host.clone();
                let path_query = if query.is_empty() {
                    versioned
                } else {
                    let encoded = form_urlencoded::Serializer::new(String::new())
                        .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())))
                        .finish();
                    format!("{versioned}?{encoded}")
                };
                url.query_pairs_mut().append_pair(ESI_PATH_QUERY, &path_query);
                Ok(url)
            }
        }
    }

    fn route_headers(&self, route: Route) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        if route == Route::Authenticated {
            let neucore = self.neucore()?;
            headers.insert(AUTHORIZATION, header_value(&neucore.authorization())?);
            headers.insert(
                NEUCORE_CHARACTER_HEADER,
                header_value(&neucore.datasource.character_id.to_string())?,
            );
            if let Some(login) = &neucore.datasource.login {
                headers.insert(NEUCORE_LOGIN_HEADER, header_value(login)?);
            }
        }
        Ok(headers)
    }

    /// Sends one request, retrying transient failures with backoff.
    async fn execute(
        &self,
        method: Method,
        route: Route,
        path: &str,
        query: &[(&str, String)],
        body: Option<&serde_json::Value>,
    ) -> Result<(HeaderMap, Vec<u8>)> {
        let url = self.request_url(route, path, query)?;
        let headers = self.route_headers(route)?;
        let retry = &self.config.retry;

        let mut attempt = 0;
        loop {
            attempt += 1;
            debug!(%method, path, attempt, "ESI request");
            match self.attempt(method.clone(), &url, &headers, path, body).await {
                Ok(response) => return Ok(response),
                Err(err) if err.is_retryable() && retry.should_retry(attempt) => {
                    let delay = retry.delay_for_attempt(attempt);
                    warn!(path, attempt, ?delay, error = %err, "ESI request failed, retrying");
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn attempt(
        &self,
        method: Method,
        url: &Url,
        headers: &HeaderMap,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<(HeaderMap, Vec<u8>)> {
        let mut request = self.http.request(method, url.clone()).headers(headers.clone());
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.bytes().await?.to_vec();

        match status {
            s if s.is_success() => Ok((headers, bytes)),
            StatusCode::FORBIDDEN => Err(EsiError::Forbidden { path: path.to_string() }),
            StatusCode::NOT_FOUND => Err(EsiError::NotFound { path: path.to_string() }),
            s => Err(EsiError::Status {
                path: path.to_string(),
                status: s.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            }),
        }
    }

    /// GETs and decodes a single response.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, non-success status or an
    /// undecodable body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        route: Route,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let (_, body) = self.execute(Method::GET, route, path, query, None).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// GETs every page of a list endpoint and concatenates them.
    ///
    /// # Errors
    ///
    /// Returns an error if any page fails.
    pub async fn get_paged<T: DeserializeOwned>(
        &self,
        route: Route,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>> {
        let (headers, body) = self.execute(Method::GET, route, path, query, None).await?;
        let mut items: Vec<T> = serde_json::from_slice(&body)?;
        let pages = page_count(&headers);

        for page in 2..=pages {
            let mut paged_query = query.to_vec();
            paged_query.push(("page", page.to_string()));
            let (_, body) = self.execute(Method::GET, route, path, &paged_query, None).await?;
            let mut page_items: Vec<T> = serde_json::from_slice(&body)?;
            items.append(&mut page_items);
        }
        if pages > 1 {
            debug!(path, pages, items = items.len(), "fetched paged endpoint");
        }
        Ok(items)
    }

    /// POSTs a JSON body and decodes the response.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, non-success status or an
    /// undecodable body.
    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        route: Route,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let body = serde_json::to_value(body)?;
        let (_, response) = self.execute(Method::POST, route, path, &[], Some(&body)).await?;
        Ok(serde_json::from_slice(&response)?)
    }
}

fn header_value(value: &str) -> Result<reqwest::header::HeaderValue> {
    reqwest::header::HeaderValue::from_str(value).map_err(|err| EsiError::InvalidConfig {
        reason: format!("invalid header value: {err}"),
    })
}

/// Reads `X-Pages`, defaulting to a single page.
fn page_count(headers: &HeaderMap) -> u32 {
    headers
        .get(PAGES_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(1)
}

impl EsiApi for EsiClient {
    async fn universe_structure(&self, structure_id: i64) -> Result<StructureInfo> {
        let path = format!("/universe/structures/{structure_id}/");
        self.get_json(Route::Authenticated, &path, &[]).await
    }

    async fn corporation_structures(&self, corporation_id: i64) -> Result<Vec<StructureRecord>> {
        let path = format!("/corporations/{corporation_id}/structures/");
        self.get_paged(Route::Authenticated, &path, &[]).await
    }

    async fn mining_extractions(&self, corporation_id: i64) -> Result<Vec<Extraction>> {
        let path = format!("/corporation/{corporation_id}/mining/extractions/");
        self.get_paged(Route::Authenticated, &path, &[]).await
    }

    async fn corporation_assets(&self, corporation_id: i64) -> Result<Vec<Asset>> {
        let path = format!("/corporations/{corporation_id}/assets/");
        self.get_paged(Route::Authenticated, &path, &[]).await
    }

    async fn asset_locations(&self, corporation_id: i64, item_ids: &[i64]) -> Result<Vec<AssetLocation>> {
        let path = format!("/corporations/{corporation_id}/assets/locations/");
        let mut locations = Vec::with_capacity(item_ids.len());
        for chunk in item_ids.chunks(ASSET_LOCATION_CHUNK) {
            let mut batch: Vec<AssetLocation> = self.post_json(Route::Authenticated, &path, chunk).await?;
            locations.append(&mut batch);
        }
        Ok(locations)
    }

    async fn corporation_starbases(&self, corporation_id: i64) -> Result<Vec<StarbaseRecord>> {
        let path = format!("/corporations/{corporation_id}/starbases/");
        self.get_paged(Route::Authenticated, &path, &[]).await
    }

    async fn starbase_detail(
        &self,
        corporation_id: i64,
        starbase_id: i64,
        system_id: i32,
    ) -> Result<StarbaseDetail> {
        let path = format!("/corporations/{corporation_id}/starbases/{starbase_id}/");
        self.get_json(Route::Authenticated, &path, &[("system_id", system_id.to_string())])
            .await
    }

    async fn corporation(&self, corporation_id: i64) -> Result<CorporationInfo> {
        let path = format!("/corporations/{corporation_id}/");
        self.get_json(Route::Public, &path, &[]).await
    }

    async fn sovereignty_map(&self) -> Result<Vec<SovereigntyEntry>> {
        self.get_json(Route::Public, "/sovereignty/map/", &[]).await
    }

    async fn type_info(&self, type_id: i32) -> Result<TypeInfo> {
        let path = format!("/universe/types/{type_id}/");
        self.get_json(Route::Public, &path, &[]).await
    }

    async fn group_info(&self, group_id: i32) -> Result<GroupInfo> {
        let path = format!("/universe/groups/{group_id}/");
        self.get_json(Route::Public, &path, &[]).await
    }

    async fn category_info(&self, category_id: i32) -> Result<CategoryInfo> {
        let path = format!("/universe/categories/{category_id}/");
        self.get_json(Route::Public, &path, &[]).await
    }

    async fn universe_ids(&self, names: &[String]) -> Result<HashMap<String, Vec<IdEntry>>> {
        self.post_json(Route::Public, "/universe/ids/", names).await
    }

    async fn universe_names(&self, ids: &[i64]) -> Result<Vec<NameEntry>> {
        self.post_json(Route::Public, "/universe/names/", ids).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{NeucoreConfig, RetryConfig};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    fn neucore() -> NeucoreConfig {
        NeucoreConfig::new(
            "https://neucore.example.com/api/app/v2/esi",
            "7",
            "hunter2",
            "96061222:director".parse().unwrap(),
        )
        .unwrap()
    }

    fn client(esi_host: &str) -> EsiClient {
        let config = EsiConfig::new(esi_host)
            .unwrap()
            .with_neucore(neucore())
            .with_retry(RetryConfig {
                initial_delay: std::time::Duration::from_millis(1),
                max_delay: std::time::Duration::from_millis(5),
                backoff_multiplier: 2.0,
                max_attempts: 3,
            });
        EsiClient::new(config).unwrap()
    }

    /// Serves canned responses, one connection each, returning the request heads.
    async fn serve(responses: Vec<(u16, Vec<(&'static str, String)>, String)>) -> (String, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let mut requests = Vec::new();
            for (status, headers, body) in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut request = Vec::new();
                let mut buf = [0u8; 4096];
                loop {
                    let n = socket.read(&mut buf).await.unwrap();
                    request.extend_from_slice(&buf[..n]);
                    let text = String::from_utf8_lossy(&request).to_string();
                    if let Some(split) = text.find("\r\n\r\n") {
                        let length = text[..split]
                            .lines()
                            .find_map(|l| {
                                l.to_ascii_lowercase()
                                    .strip_prefix("content-length:")
                                    .map(|v| v.trim().parse::<usize>().unwrap())
                            })
                            .unwrap_or(0);
                        if request.len() >= split + 4 + length {
                            break;
                        }
                    }
                    if n == 0 {
                        break;
                    }
                }
                let extra: String = headers.iter().map(|(k, v)| format!("{k}: {v}\r\n")).collect();
                let response = format!(
                    "HTTP/1.1 {status} X\r\ncontent-type: application/json\r\ncontent-length: {}\r\n{extra}connection: close\r\n\r\n{body}",
                    body.len()
                );
                socket.write_all(response.as_bytes()).await.unwrap();
                requests.push(String::from_utf8_lossy(&request).to_string());
            }
            requests
        });
        (base, handle)
    }

    mod url_tests {
        use super::*;

        #[test]
        fn test_public_url() {
            let client = client("https://esi.evetech.net");
            let url = client
                .request_url(Route::Public, "/universe/types/35832/", &[])
                .unwrap();
            assert_eq!(url.as_str(), "https://esi.evetech.net/latest/universe/types/35832/");
        }

        #[test]
        fn test_public_url_with_query() {
            let client = client("https://esi.evetech.net/");
            let url = client
                .request_url(Route::Public, "/corporations/1/assets/", &[("page", "2".to_string())])
                .unwrap();
            assert_eq!(url.as_str(), "https://esi.evetech.net/latest/corporations/1/assets/?page=2");
        }

        #[test]
        fn test_authenticated_url_wraps_path() {
            let client = client("https://esi.evetech.net");
            let url = client
                .request_url(Route::Authenticated, "/corporations/98000001/structures/", &[])
                .unwrap();
            let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
            assert_eq!(url.path(), "/api/app/v2/esi");
            assert_eq!(
                pairs,
                vec![(
                    ESI_PATH_QUERY.to_string(),
                    "/latest/corporations/98000001/structures/".to_string()
                )]
            );
        }

        #[test]
        fn test_authenticated_url_nests_query() {
            let client = client("https://esi.evetech.net");
            let url = client
                .request_url(
                    Route::Authenticated,
                    "/corporations/1/starbases/2/",
                    &[("system_id", "30000142".to_string()), ("page", "3".to_string())],
                )
                .unwrap();
            let pairs: HashMap<String, String> = url.query_pairs().into_owned().collect();
            assert_eq!(
                pairs[ESI_PATH_QUERY],
                "/latest/corporations/1/starbases/2/?system_id=30000142&page=3"
            );
        }

        #[test]
        fn test_authenticated_without_neucore() {
            let client = EsiClient::new(EsiConfig::new("https://esi.evetech.net").unwrap()).unwrap();
            let result = client.request_url(Route::Authenticated, "/x/", &[]);
            assert!(matches!(result, Err(EsiError::InvalidConfig { .. })));
        }
    }

    mod header_tests {
        use super::*;

        #[test]
        fn test_authenticated_headers() {
            let headers = client("https://esi.evetech.net")
                .route_headers(Route::Authenticated)
                .unwrap();
            assert_eq!(headers[AUTHORIZATION], "Bearer NzpodW50ZXIy");
            assert_eq!(headers[NEUCORE_CHARACTER_HEADER], "96061222");
            assert_eq!(headers[NEUCORE_LOGIN_HEADER], "director");
        }

        #[test]
        fn test_public_headers_are_empty() {
            let headers = client("https://esi.evetech.net").route_headers(Route::Public).unwrap();
            assert!(headers.is_empty());
        }

        #[test]
        fn test_page_count() {
            let mut headers = HeaderMap::new();
            assert_eq!(page_count(&headers), 1);
            headers.insert(PAGES_HEADER, "3".parse().unwrap());
            assert_eq!(page_count(&headers), 3);
            headers.insert(PAGES_HEADER, "junk".parse().unwrap());
            assert_eq!(page_count(&headers), 1);
        }
    }

    mod http_tests {
        use super::*;

        #[tokio::test]
        async fn test_paged_results_are_concatenated() {
            let (base, server) = serve(vec![
                (200, vec![("X-Pages", "2".to_string())], "[1, 2]".to_string()),
                (200, vec![("X-Pages", "2".to_string())], "[3]".to_string()),
            ])
            .await;
            let items: Vec<i64> = client(&base)
                .get_paged(Route::Public, "/markets/prices/", &[])
                .await
                .unwrap();
            assert_eq!(items, vec![1, 2, 3]);

            let requests = server.await.unwrap();
            assert!(requests[0].starts_with("GET /latest/markets/prices/ "));
            assert!(requests[1].starts_with("GET /latest/markets/prices/?page=2 "));
        }

        #[tokio::test]
        async fn test_forbidden_is_not_retried() {
            let (base, server) = serve(vec![(403, vec![], r#"{"error":"forbidden"}"#.to_string())]).await;
            let err = client(&base)
                .get_json::<serde_json::Value>(Route::Public, "/universe/structures/1/", &[])
                .await
                .unwrap_err();
            assert!(matches!(err, EsiError::Forbidden { .. }));
            assert_eq!(server.await.unwrap().len(), 1);
        }

        #[tokio::test]
        async fn test_server_error_is_retried() {
            let (base, server) = serve(vec![
                (502, vec![], "bad gateway".to_string()),
                (200, vec![], r#"{"name": "Test Corp", "ticker": "TEST"}"#.to_string()),
            ])
            .await;
            let corp = client(&base).corporation(98_000_001).await.unwrap();
            assert_eq!(corp.name, "Test Corp");
            assert_eq!(server.await.unwrap().len(), 2);
        }

        #[tokio::test]
        async fn test_server_error_gives_up() {
            let (base, server) = serve(vec![
                (500, vec![], "a".to_string()),
                (500, vec![], "b".to_string()),
                (500, vec![], "c".to_string()),
            ])
            .await;
            let err = client(&base).sovereignty_map().await.unwrap_err();
            assert!(matches!(err, EsiError::Status { status: 500, .. }));
            assert_eq!(server.await.unwrap().len(), 3);
        }

        #[tokio::test]
        async fn test_post_sends_json_body() {
            let (base, server) = serve(vec![(
                200,
                vec![],
                r#"[{"id": 30000142, "name": "Jita", "category": "solar_system"}]"#.to_string(),
            )])
            .await;
            let names = client(&base).universe_names(&[30_000_142]).await.unwrap();
            assert_eq!(names[0].name, "Jita");

            let requests = server.await.unwrap();
            assert!(requests[0].starts_with("POST /latest/universe/names/ "));
            assert!(requests[0].ends_with("[30000142]"));
        }
    }
}
