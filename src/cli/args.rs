//! Command line argument parsing and validation.
//!
//! Point the tool at a repository root and it releases whatever
//! `lib.release.json` declares that the registry does not have yet.

use crate::config::ReleaseConfig;
use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// Release .NET libraries to NuGet
#[derive(Parser, Debug, Clone)]
#[command(
    name = "nuget_release",
    version,
    about = "Release .NET libraries declared in lib.release.json to NuGet",
    long_about = "Gate on a clean working tree, skip packages whose version is already \
published, patch project versions, test, pack and push. Patched project files are \
always restored afterwards.

A relative ROOT is resolved under --fallback-root (default ~/Projects), not the
current directory.

Usage:
  nuget_release /src/acme --api-key <KEY>
  NUGET_API_KEY=<KEY> nuget_release acme --fallback-root /src --skip-tests"
)]
pub struct Args {
    /// Repository root; relative paths are anchored under the fallback root
    #[arg(index = 1, value_name = "ROOT", default_value = ".")]
    pub root: PathBuf,

    /// Registry API key used for pushing
    #[arg(long, env = "NUGET_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Skip running test projects
    #[arg(long)]
    pub skip_tests: bool,

    /// Base directory for relative roots
    #[arg(long, env = "NUGET_RELEASE_FALLBACK_ROOT", value_name = "DIR")]
    pub fallback_root: Option<PathBuf>,

    /// Registry to push to (defaults to the first manifest source)
    #[arg(long, env = "NUGET_RELEASE_PUSH_SOURCE", value_name = "URL")]
    pub push_source: Option<String>,

    /// Maximum concurrent units within a step
    #[arg(long, env = "NUGET_RELEASE_MAX_PARALLEL", value_name = "N")]
    pub max_parallel: Option<usize>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only print errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.api_key.trim().is_empty() {
            return Err("An API key is required (--api-key or NUGET_API_KEY)".to_string());
        }
        if self.root.as_os_str().is_empty() {
            return Err("Release root must not be empty".to_string());
        }
        Ok(())
    }

    /// Layer explicit flags over environment-derived configuration
    pub fn to_config(&self) -> ReleaseConfig {
        let mut config = ReleaseConfig::from_env();
        if let Some(root) = &self.fallback_root {
            config.fallback_root = root.clone();
        }
        if let Some(source) = &self.push_source {
            config.push_source = Some(source.clone());
        }
        if let Some(max) = self.max_parallel {
            config.max_parallel = max;
        }
        config
    }

    /// Default log filter for the requested verbosity; `--quiet` wins over `-v`
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).expect("valid arguments")
    }

    #[test]
    fn test_flags() {
        let args = parse(&[
            "nuget_release",
            "libs",
            "--api-key",
            "k",
            "--skip-tests",
            "--max-parallel",
            "3",
            "-vv",
        ]);
        assert_eq!(args.root, PathBuf::from("libs"));
        assert!(args.skip_tests);
        assert_eq!(args.log_level(), "trace");
        assert_eq!(args.to_config().max_parallel, 3);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_blank_api_key_is_invalid() {
        let args = parse(&["nuget_release", "--api-key", " "]);
        assert_eq!(args.root, PathBuf::from("."));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_quiet_only_logs_errors() {
        let args = parse(&["nuget_release", "--api-key", "k", "-q", "-v"]);
        assert_eq!(args.log_level(), "error");
        assert_eq!(parse(&["nuget_release", "--api-key", "k"]).log_level(), "info");
    }

    #[test]
    fn test_push_source_flag_overrides_config() {
        let args = parse(&[
            "nuget_release",
            "--api-key",
            "k",
            "--push-source",
            "https://nuget.example.org/v3/index.json",
        ]);
        assert_eq!(
            args.to_config().push_source.as_deref(),
            Some("https://nuget.example.org/v3/index.json")
        );
    }
}
