//! Decides which declared candidates are newly releasable.
//!
//! The only question asked of the registry is "is this exact version already
//! published". There is no newer-than comparison: downgrades and forks are
//! legitimate release targets.

use crate::error::Result;
use crate::pipeline::ParallelRunner;
use crate::registry::{RegistryClient, RegistryPackageInfo};
use crate::release::{CandidateSet, ReleaseCandidate};
use crate::retry::{RetryPolicy, retry_with_backoff};
use std::collections::HashMap;
use std::sync::Arc;

/// Latest published version per package, keyed by lowercase name
#[derive(Debug, Clone, Default)]
pub struct PublishedVersions {
    by_name: HashMap<String, RegistryPackageInfo>,
}

impl PublishedVersions {
    /// Index lookups by name; repeated names keep the first result
    pub fn from_lookups(lookups: impl IntoIterator<Item = RegistryPackageInfo>) -> Self {
        let mut by_name = HashMap::new();
        for info in lookups {
            by_name.entry(info.name.to_lowercase()).or_insert(info);
        }
        Self { by_name }
    }

    /// Registry info for `name`, ignoring case
    pub fn get(&self, name: &str) -> Option<&RegistryPackageInfo> {
        self.by_name.get(&name.to_lowercase())
    }

    /// True when the registry already has this candidate's exact version
    pub fn is_published(&self, candidate: &ReleaseCandidate) -> bool {
        self.get(candidate.name())
            .and_then(|info| info.latest_version.as_deref())
            .is_some_and(|version| candidate.is_version(version))
    }
}

/// Query the registry for every candidate concurrently.
///
/// Each lookup is retried on its own; one failing lookup does not stop the
/// others, but its error is returned once all of them have finished.
pub async fn fetch_published<R: RegistryClient>(
    registry: &Arc<R>,
    runner: &ParallelRunner,
    retry: RetryPolicy,
    candidates: &CandidateSet,
    sources: &[String],
) -> Result<PublishedVersions> {
    let names: Vec<String> = candidates.iter().map(|c| c.name().to_string()).collect();
    let registry = Arc::clone(registry);
    let sources: Arc<[String]> = sources.into();

    let lookups = runner
        .run(names, move |name: String| {
            let registry = Arc::clone(&registry);
            let sources = Arc::clone(&sources);
            async move {
                let operation = format!("Registry lookup for {name}");
                retry_with_backoff(
                    || registry.latest_version(&name, true, &sources),
                    retry,
                    &operation,
                )
                .await
            }
        })
        .await?;

    Ok(PublishedVersions::from_lookups(lookups))
}

/// Remove every candidate whose exact version is already published.
///
/// Returns the removed candidates in declaration order.
pub fn remove_published(
    candidates: &mut CandidateSet,
    published: &PublishedVersions,
) -> Vec<ReleaseCandidate> {
    let already: Vec<String> = candidates
        .iter()
        .filter(|c| published.is_published(c))
        .map(|c| c.name().to_string())
        .collect();

    already
        .iter()
        .filter_map(|name| candidates.remove(name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(name: &str, version: &str, pre: Option<&str>) -> ReleaseCandidate {
        ReleaseCandidate::new(name, version, pre).expect("valid candidate")
    }

    fn published(name: &str, version: Option<&str>) -> RegistryPackageInfo {
        RegistryPackageInfo {
            name: name.to_string(),
            latest_version: version.map(str::to_string),
        }
    }

    #[test]
    fn test_removes_exact_matches_and_keeps_the_rest() {
        let mut set: CandidateSet = vec![
            candidate("Acme.Core", "1.2.0", None),
            candidate("Acme.Web", "2.0.0", None),
            candidate("Acme.Data", "0.9.0", None),
            candidate("Acme.Cli", "1.0.0", None),
        ]
        .into_iter()
        .collect();

        let lookups = PublishedVersions::from_lookups(vec![
            published("acme.core", Some("1.2.0")),
            published("Acme.Web", Some("1.9.0")),
            published("Acme.Data", Some("1.0.0")),
            published("Acme.Cli", None),
        ]);

        let removed = remove_published(&mut set, &lookups);

        assert_eq!(
            removed.iter().map(|c| c.name()).collect::<Vec<_>>(),
            vec!["Acme.Core"]
        );
        assert_eq!(
            set.iter().map(|c| c.name()).collect::<Vec<_>>(),
            vec!["Acme.Web", "Acme.Data", "Acme.Cli"]
        );
    }

    #[test]
    fn test_pre_release_is_part_of_identity() {
        let mut set: CandidateSet = vec![
            candidate("Acme.Core", "1.2.0", Some("beta")),
            candidate("Acme.Web", "1.2.0", None),
        ]
        .into_iter()
        .collect();

        let lookups = PublishedVersions::from_lookups(vec![
            published("Acme.Core", Some("1.2.0")),
            published("Acme.Web", Some("1.2.0-beta")),
        ]);

        assert!(remove_published(&mut set, &lookups).is_empty());
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_duplicate_lookups_keep_first() {
        let lookups = PublishedVersions::from_lookups(vec![
            published("Acme.Core", Some("1.0.0")),
            published("ACME.CORE", Some("2.0.0")),
        ]);
        assert_eq!(
            lookups.get("acme.core").and_then(|i| i.latest_version.clone()),
            Some("1.0.0".to_string())
        );
    }

    #[test]
    fn test_everything_published_empties_the_set() {
        let mut set: CandidateSet = vec![candidate("Acme.Core", "1.2.0", None)]
            .into_iter()
            .collect();
        let lookups = PublishedVersions::from_lookups(vec![published("Acme.Core", Some("1.2.0"))]);

        remove_published(&mut set, &lookups);
        assert!(set.is_empty());
    }
}
