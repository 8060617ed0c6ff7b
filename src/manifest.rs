//! The per-repository release manifest, `lib.release.json`.

use crate::config::PUBLIC_NUGET_SOURCE;
use crate::error::{ManifestError, Result};
use crate::release::{CandidateSet, ReleaseCandidate};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Manifest file name searched for under the release root
pub const MANIFEST_FILE_NAME: &str = "lib.release.json";

/// Declared releases, test projects and registry sources
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReleaseManifest {
    /// Libraries to consider for release
    #[serde(default, alias = "releases")]
    pub releases: Vec<DeclaredRelease>,
    /// Test project directories, relative to root
    #[serde(default, alias = "tests")]
    pub tests: Vec<String>,
    /// Registry service index URLs
    #[serde(default, alias = "sources")]
    pub sources: Vec<String>,
}

/// One entry of `Releases`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeclaredRelease {
    /// Package name; also the project directory and file stem
    #[serde(alias = "name")]
    pub name: String,
    /// Numeric `major.minor.patch`
    #[serde(alias = "version")]
    pub version: String,
    /// Optional pre-release label
    #[serde(default, alias = "preRelease", alias = "prerelease")]
    pub pre_release: Option<String>,
}

impl ReleaseManifest {
    /// Parse manifest JSON; `path` is only used for error messages
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        let mut manifest: ReleaseManifest =
            serde_json::from_str(content).map_err(|e| ManifestError::Invalid {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        manifest.sources.retain(|s| !s.trim().is_empty());
        if manifest.sources.is_empty() {
            manifest.sources.push(PUBLIC_NUGET_SOURCE.to_string());
        }
        Ok(manifest)
    }

    /// Read and parse a manifest file
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::parse(&content, path)
    }

    /// Candidates in declaration order; repeated names keep the first entry
    pub fn candidates(&self) -> Result<CandidateSet> {
        let mut set = CandidateSet::new();
        for release in &self.releases {
            let candidate = ReleaseCandidate::new(
                release.name.trim(),
                &release.version,
                release.pre_release.as_deref(),
            )?;
            if !set.insert(candidate) {
                log::warn!(
                    "Duplicate release '{}' in {}; keeping the first entry",
                    release.name,
                    MANIFEST_FILE_NAME
                );
            }
        }
        Ok(set)
    }
}

/// Every manifest file under `root`, sorted, skipping `.git` directories
pub fn find_manifests(root: &Path) -> Vec<PathBuf> {
    let mut found: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| entry.file_name() != ".git")
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file() && entry.file_name() == MANIFEST_FILE_NAME)
        .map(|entry| entry.into_path())
        .collect();
    found.sort();
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_pascal_case() {
        let json = r#"{
            "Releases": [
                {"Name": "Acme.Core", "Version": "1.2.0", "PreRelease": ""},
                {"Name": "Acme.Web", "Version": "2.0.0", "PreRelease": "rc.1"}
            ],
            "Tests": ["Acme.Core.Tests"],
            "Sources": ["https://nuget.example.org/v3/index.json"]
        }"#;

        let manifest = ReleaseManifest::parse(json, Path::new(MANIFEST_FILE_NAME)).expect("valid");
        assert_eq!(manifest.releases.len(), 2);
        assert_eq!(manifest.tests, vec!["Acme.Core.Tests"]);
        assert_eq!(
            manifest.sources,
            vec!["https://nuget.example.org/v3/index.json"]
        );

        let candidates = manifest.candidates().expect("valid candidates");
        assert_eq!(
            candidates.iter().map(|c| c.to_string()).collect::<Vec<_>>(),
            vec!["Acme.Core: 1.2.0", "Acme.Web: 2.0.0-rc.1"]
        );
    }

    #[test]
    fn test_parse_camel_case_and_default_source() {
        let json = r#"{"releases": [{"name": "Acme.Core", "version": "1.2.0", "preRelease": null}]}"#;

        let manifest = ReleaseManifest::parse(json, Path::new(MANIFEST_FILE_NAME)).expect("valid");
        assert_eq!(manifest.releases[0].name, "Acme.Core");
        assert!(manifest.tests.is_empty());
        assert_eq!(manifest.sources, vec![PUBLIC_NUGET_SOURCE]);
    }

    #[test]
    fn test_duplicate_names_collapse() {
        let json = r#"{"Releases": [
            {"Name": "Acme.Core", "Version": "1.2.0"},
            {"Name": "ACME.CORE", "Version": "1.3.0"}
        ]}"#;

        let manifest = ReleaseManifest::parse(json, Path::new(MANIFEST_FILE_NAME)).expect("valid");
        let candidates = manifest.candidates().expect("valid candidates");
        assert_eq!(candidates.len(), 1);
        assert_eq!(
            candidates.get("acme.core").map(|c| c.numeric_version()),
            Some("1.2.0".to_string())
        );
    }

    #[test]
    fn test_invalid_json_is_manifest_error() {
        let err = ReleaseManifest::parse("{not json", Path::new("x/lib.release.json"))
            .expect_err("invalid");
        assert!(err.to_string().contains("x/lib.release.json"));
    }

    #[test]
    fn test_find_manifests_skips_git() {
        let dir = TempDir::new().expect("tempdir");
        let nested = dir.path().join("build");
        let git = dir.path().join(".git");
        std::fs::create_dir_all(&nested).expect("mkdir");
        std::fs::create_dir_all(&git).expect("mkdir");
        std::fs::write(nested.join(MANIFEST_FILE_NAME), "{}").expect("write");
        std::fs::write(git.join(MANIFEST_FILE_NAME), "{}").expect("write");

        assert_eq!(
            find_manifests(dir.path()),
            vec![nested.join(MANIFEST_FILE_NAME)]
        );
    }
}
