//! Package registry queries.

mod nuget;

pub use nuget::{NugetClient, SearchResponse, ServiceIndex};

use crate::error::Result;
use std::future::Future;

/// Version reported for a package the registry has never seen
pub const NEVER_PUBLISHED: &str = "0.0.0";

/// Latest published version of one package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryPackageInfo {
    /// Package name as queried
    pub name: String,
    /// Latest published version; `None` if never published
    pub latest_version: Option<String>,
}

impl RegistryPackageInfo {
    /// Info for a package with no published versions
    pub fn never_published(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            latest_version: None,
        }
    }

    /// Latest version, or [`NEVER_PUBLISHED`]
    pub fn version_or_sentinel(&self) -> &str {
        self.latest_version.as_deref().unwrap_or(NEVER_PUBLISHED)
    }
}

/// Looks up what a registry already has.
pub trait RegistryClient: Send + Sync + 'static {
    /// Latest version of `name` across `sources`, consulted in order.
    ///
    /// A package absent from every source is not an error.
    fn latest_version(
        &self,
        name: &str,
        include_prerelease: bool,
        sources: &[String],
    ) -> impl Future<Output = Result<RegistryPackageInfo>> + Send;
}
