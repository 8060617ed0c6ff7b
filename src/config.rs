//! Runtime configuration for release runs.
//!
//! Values come from CLI flags, falling back to `NUGET_RELEASE_*` environment
//! variables, falling back to defaults.

use std::path::PathBuf;
use std::time::Duration;

/// Public NuGet v3 service index
pub const PUBLIC_NUGET_SOURCE: &str = "https://api.nuget.org/v3/index.json";

/// Configuration for a release run
#[derive(Debug, Clone)]
pub struct ReleaseConfig {
    /// Base directory used to anchor a relative or missing root
    pub fallback_root: PathBuf,
    /// Registry to push to; defaults to the first manifest source
    pub push_source: Option<String>,
    /// Upper bound on concurrently running units within a step
    pub max_parallel: usize,
    /// Retries for a single registry lookup
    pub registry_retries: u32,
    /// Timeout for one external command invocation
    pub command_timeout: Duration,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            fallback_root: default_fallback_root(),
            push_source: None,
            max_parallel: num_cpus::get().max(1) * 2,
            registry_retries: 3,
            command_timeout: Duration::from_secs(1800),
        }
    }
}

impl ReleaseConfig {
    /// Parse a numeric environment variable, clamped to `max`
    fn parse_env(var_name: &str, default: u64, max: u64) -> u64 {
        std::env::var(var_name)
            .ok()
            .and_then(|s| s.trim().parse::<u64>().ok())
            .map(|v| v.min(max))
            .unwrap_or(default)
    }

    /// Create config from environment variables with fallback to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let fallback_root = std::env::var_os("NUGET_RELEASE_FALLBACK_ROOT")
            .map(PathBuf::from)
            .unwrap_or(defaults.fallback_root);
        let push_source = std::env::var("NUGET_RELEASE_PUSH_SOURCE")
            .ok()
            .filter(|s| !s.trim().is_empty());

        Self {
            fallback_root,
            push_source,
            max_parallel: Self::parse_env(
                "NUGET_RELEASE_MAX_PARALLEL",
                defaults.max_parallel as u64,
                256,
            )
            .max(1) as usize,
            registry_retries: Self::parse_env("NUGET_RELEASE_RETRY_REGISTRY", 3, 10) as u32,
            command_timeout: Duration::from_secs(Self::parse_env(
                "NUGET_RELEASE_COMMAND_TIMEOUT",
                defaults.command_timeout.as_secs(),
                86_400,
            )),
        }
    }

    /// Validate settings are usable
    pub fn validate(&self) -> Result<(), String> {
        if self.max_parallel == 0 {
            return Err("max_parallel must be at least 1".to_string());
        }
        if self.command_timeout.is_zero() {
            return Err("command timeout must be greater than zero".to_string());
        }
        if let Some(source) = &self.push_source
            && !(source.starts_with("http://") || source.starts_with("https://"))
        {
            return Err(format!("push source must be an http(s) URL: {source}"));
        }
        Ok(())
    }
}

/// `C:\Projects` on Windows, `<home>/Projects` elsewhere
fn default_fallback_root() -> PathBuf {
    if cfg!(windows) {
        PathBuf::from(r"C:\Projects")
    } else {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("/"))
            .join("Projects")
    }
}
