//! NuGet v3 client: service index discovery plus the search query service.

use super::{RegistryClient, RegistryPackageInfo};
use crate::error::{RegistryError, Result};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

const SEARCH_SERVICE_TYPE: &str = "SearchQueryService";

/// A v3 service index: the resources a feed offers
#[derive(Debug, Deserialize)]
pub struct ServiceIndex {
    #[serde(default)]
    resources: Vec<ServiceResource>,
}

impl ServiceIndex {
    /// First advertised search endpoint
    pub fn search_endpoint(&self) -> Option<&str> {
        self.resources
            .iter()
            .find(|r| r.kind.is_search())
            .map(|r| r.id.as_str())
    }
}

#[derive(Debug, Deserialize)]
struct ServiceResource {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@type")]
    kind: ResourceType,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ResourceType {
    One(String),
    Many(Vec<String>),
}

impl ResourceType {
    fn is_search(&self) -> bool {
        match self {
            ResourceType::One(kind) => kind.starts_with(SEARCH_SERVICE_TYPE),
            ResourceType::Many(kinds) => kinds.iter().any(|k| k.starts_with(SEARCH_SERVICE_TYPE)),
        }
    }
}

/// Search query service response
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    data: Vec<SearchResult>,
}

impl SearchResponse {
    /// Version of the first hit whose id is `name`, ignoring case
    pub fn published_version(&self, name: &str) -> Option<&str> {
        self.data
            .iter()
            .find(|hit| hit.id.eq_ignore_ascii_case(name))
            .map(|hit| hit.version.as_str())
    }
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    id: String,
    version: String,
}

/// Registry client speaking the NuGet v3 protocol
#[derive(Debug)]
pub struct NugetClient {
    http: reqwest::Client,
    /// Service index URL to search endpoint, resolved once per run
    search_endpoints: Mutex<HashMap<String, String>>,
}

impl NugetClient {
    /// Create a client with a request timeout
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RegistryError::Http {
                url: String::new(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            http,
            search_endpoints: Mutex::new(HashMap::new()),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        url: &str,
    ) -> Result<T> {
        let response = request.send().await.map_err(|e| RegistryError::Http {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let status = response.status();
        if !status.is_success() {
            return Err(RegistryError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }
            .into());
        }

        let document = response.json::<T>().await.map_err(|e| {
            let (url, reason) = (url.to_string(), e.to_string());
            if e.is_decode() {
                RegistryError::InvalidResponse { url, reason }
            } else {
                RegistryError::Http { url, reason }
            }
        })?;
        Ok(document)
    }

    fn cached_endpoint(&self, source: &str) -> Option<String> {
        self.search_endpoints
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(source)
            .cloned()
    }

    async fn search_endpoint(&self, source: &str) -> Result<String> {
        if let Some(endpoint) = self.cached_endpoint(source) {
            return Ok(endpoint);
        }

        let index: ServiceIndex = self.get_json(self.http.get(source), source).await?;
        let endpoint = index
            .search_endpoint()
            .map(str::to_string)
            .ok_or_else(|| RegistryError::NoSearchService {
                source_url: source.to_string(),
            })?;

        log::trace!("Search endpoint for {source}: {endpoint}");
        self.search_endpoints
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(source.to_string(), endpoint.clone());
        Ok(endpoint)
    }

    async fn search(&self, source: &str, name: &str, include_prerelease: bool) -> Result<Option<String>> {
        let endpoint = self.search_endpoint(source).await?;
        let request = self.http.get(&endpoint).query(&[
            ("q", format!("packageid:{name}")),
            ("prerelease", include_prerelease.to_string()),
            ("semVerLevel", "2.0.0".to_string()),
            ("take", "1".to_string()),
        ]);

        let response: SearchResponse = self.get_json(request, &endpoint).await?;
        Ok(response.published_version(name).map(str::to_string))
    }
}

impl RegistryClient for NugetClient {
    async fn latest_version(
        &self,
        name: &str,
        include_prerelease: bool,
        sources: &[String],
    ) -> Result<RegistryPackageInfo> {
        for source in sources {
            if let Some(version) = self.search(source, name, include_prerelease).await? {
                log::debug!("{name} is published at {version} on {source}");
                return Ok(RegistryPackageInfo {
                    name: name.to_string(),
                    latest_version: Some(version),
                });
            }
        }

        log::debug!("{name} has never been published");
        Ok(RegistryPackageInfo::never_published(name))
    }
}
