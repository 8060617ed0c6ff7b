//! Shared state for one release run.

use crate::error::{ManifestError, ProjectError, Result};
use semver::{BuildMetadata, Prerelease, Version};
use std::fmt;
use std::path::{Path, PathBuf};

/// A library targeted for possible release in this run.
///
/// Identity is the name, compared case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseCandidate {
    name: String,
    version: Version,
    project_file: Option<PathBuf>,
}

impl ReleaseCandidate {
    /// Build a candidate from a numeric version and an optional pre-release label
    pub fn new(name: impl Into<String>, version: &str, pre_release: Option<&str>) -> Result<Self> {
        let name = name.into();
        let invalid = |reason: String| ManifestError::InvalidVersion {
            name: name.clone(),
            version: version.to_string(),
            reason,
        };

        let mut parsed = parse_numeric_version(version).map_err(invalid)?;
        if let Some(label) = pre_release.map(str::trim).filter(|l| !l.is_empty()) {
            parsed.pre = Prerelease::new(label)
                .map_err(|e| invalid(format!("invalid pre-release label '{label}': {e}")))?;
        }

        Ok(Self {
            name,
            version: parsed,
            project_file: None,
        })
    }

    /// Package name as declared
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Full semantic version, pre-release label included
    pub fn version(&self) -> &Version {
        &self.version
    }

    /// `major.minor.patch` without the pre-release label
    pub fn numeric_version(&self) -> String {
        format!(
            "{}.{}.{}",
            self.version.major, self.version.minor, self.version.patch
        )
    }

    /// Pre-release label, if any
    pub fn pre_release(&self) -> Option<&str> {
        (!self.version.pre.is_empty()).then(|| self.version.pre.as_str())
    }

    /// True when `name` identifies this candidate
    pub fn has_name(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// True when `published` is exactly this candidate's version identity.
    ///
    /// Registry versions that parse as semver are compared as versions, so
    /// build metadata is ignored; anything else is compared as text.
    pub fn is_version(&self, published: &str) -> bool {
        let published = published.trim();
        match Version::parse(published) {
            Ok(v) => {
                v.major == self.version.major
                    && v.minor == self.version.minor
                    && v.patch == self.version.patch
                    && v.pre == self.version.pre
            }
            Err(_) => published == self.version.to_string(),
        }
    }

    /// Resolved build-metadata file
    pub fn project_file(&self) -> Option<&Path> {
        self.project_file.as_deref()
    }

    /// Resolved build-metadata file, or a fault if resolution never happened
    pub fn require_project_file(&self) -> Result<&Path> {
        self.project_file().ok_or_else(|| {
            ProjectError::Unresolved {
                name: self.name.clone(),
            }
            .into()
        })
    }

    /// Record the resolved build-metadata file
    pub fn set_project_file(&mut self, path: PathBuf) {
        self.project_file = Some(path);
    }
}

impl fmt::Display for ReleaseCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.version)
    }
}

/// Accepts `1`, `1.2` and `1.2.3`; rejects labels and metadata
fn parse_numeric_version(text: &str) -> std::result::Result<Version, String> {
    let text = text.trim();
    if text.is_empty() {
        return Err("version is empty".to_string());
    }

    let parts: Vec<&str> = text.split('.').collect();
    if parts.len() > 3 {
        return Err("expected major.minor.patch".to_string());
    }

    let mut numbers = [0u64; 3];
    for (slot, part) in numbers.iter_mut().zip(&parts) {
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(format!("'{part}' is not a number"));
        }
        *slot = part
            .parse()
            .map_err(|e| format!("'{part}' is not a number: {e}"))?;
    }

    Ok(Version {
        major: numbers[0],
        minor: numbers[1],
        patch: numbers[2],
        pre: Prerelease::EMPTY,
        build: BuildMetadata::EMPTY,
    })
}

/// Ordered, name-unique collection of candidates
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateSet {
    candidates: Vec<ReleaseCandidate>,
}

impl CandidateSet {
    /// Empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a candidate; returns false if one with the same name already exists
    pub fn insert(&mut self, candidate: ReleaseCandidate) -> bool {
        if self.contains(candidate.name()) {
            return false;
        }
        self.candidates.push(candidate);
        true
    }

    /// Whether a candidate with this name exists
    pub fn contains(&self, name: &str) -> bool {
        self.candidates.iter().any(|c| c.has_name(name))
    }

    /// Look up a candidate by name
    pub fn get(&self, name: &str) -> Option<&ReleaseCandidate> {
        self.candidates.iter().find(|c| c.has_name(name))
    }

    /// Remove and return the candidate with this name
    pub fn remove(&mut self, name: &str) -> Option<ReleaseCandidate> {
        let index = self.candidates.iter().position(|c| c.has_name(name))?;
        Some(self.candidates.remove(index))
    }

    /// Candidates in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &ReleaseCandidate> {
        self.candidates.iter()
    }

    /// Mutable access in declaration order
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ReleaseCandidate> {
        self.candidates.iter_mut()
    }

    /// Owned copies, for handing to parallel units
    pub fn to_vec(&self) -> Vec<ReleaseCandidate> {
        self.candidates.clone()
    }

    /// Number of candidates
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// True when no candidates remain
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

impl FromIterator<ReleaseCandidate> for CandidateSet {
    fn from_iter<I: IntoIterator<Item = ReleaseCandidate>>(iter: I) -> Self {
        let mut set = CandidateSet::new();
        for candidate in iter {
            set.insert(candidate);
        }
        set
    }
}

/// Mutable state threaded through every pipeline step
#[derive(Clone)]
pub struct ReleaseContext {
    /// Repository root; absolute once the root step has run
    pub root: PathBuf,
    /// Publish credential
    pub api_key: String,
    /// Skip the test step
    pub skip_tests: bool,
    /// Candidates still in play
    pub candidates: CandidateSet,
    /// Test project directories relative to root
    pub tests: Vec<String>,
    /// Registry service index URLs, in lookup order
    pub sources: Vec<String>,
}

impl ReleaseContext {
    /// Fresh context before any step has run
    pub fn new(root: impl Into<PathBuf>, api_key: impl Into<String>, skip_tests: bool) -> Self {
        Self {
            root: root.into(),
            api_key: api_key.into(),
            skip_tests,
            candidates: CandidateSet::new(),
            tests: Vec::new(),
            sources: Vec::new(),
        }
    }

    /// Multi-line description for logs; never includes the credential
    pub fn summary(&self) -> String {
        let mut out = format!("root: {}\nskip tests: {}\n", self.root.display(), self.skip_tests);
        out.push_str(&format!("candidates ({}):\n", self.candidates.len()));
        for candidate in self.candidates.iter() {
            let project = candidate
                .project_file()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "<unresolved>".to_string());
            out.push_str(&format!("  - {candidate} [{project}]\n"));
        }
        out.push_str(&format!("tests: {}\n", self.tests.join(", ")));
        out.push_str(&format!("sources: {}", self.sources.join(", ")));
        out
    }
}

impl fmt::Debug for ReleaseContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReleaseContext")
            .field("root", &self.root)
            .field("api_key", &"***")
            .field("skip_tests", &self.skip_tests)
            .field("candidates", &self.candidates)
            .field("tests", &self.tests)
            .field("sources", &self.sources)
            .finish()
    }
}
