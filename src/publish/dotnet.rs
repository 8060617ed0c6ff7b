//! [`PackageTool`] backed by the `dotnet` CLI.

use super::{CommandOutput, PackageTool, run_command};
use crate::error::Result;
use std::path::Path;
use std::time::Duration;

/// Runs `dotnet test`, `dotnet pack` and `dotnet nuget push`
#[derive(Debug, Clone)]
pub struct DotnetCli {
    program: String,
    timeout: Duration,
}

impl DotnetCli {
    /// Use `dotnet` from PATH
    pub fn new(timeout: Duration) -> Self {
        Self::with_program("dotnet", timeout)
    }

    /// Use a specific executable
    pub fn with_program(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    /// Arguments for `dotnet test`
    pub fn test_args(project_file: &Path) -> Vec<String> {
        vec![
            "test".to_string(),
            project_file.display().to_string(),
            "-c".to_string(),
            "Release".to_string(),
        ]
    }

    /// Arguments for `dotnet pack`
    pub fn pack_args(project_file: &Path, output_dir: &Path) -> Vec<String> {
        vec![
            "pack".to_string(),
            project_file.display().to_string(),
            "-c".to_string(),
            "Release".to_string(),
            "--force".to_string(),
            "-o".to_string(),
            output_dir.display().to_string(),
        ]
    }

    /// Arguments for `dotnet nuget push`
    pub fn push_args(package: &Path, api_key: &str, source: &str) -> Vec<String> {
        vec![
            "nuget".to_string(),
            "push".to_string(),
            package.display().to_string(),
            "--api-key".to_string(),
            api_key.to_string(),
            "--source".to_string(),
            source.to_string(),
            "--skip-duplicate".to_string(),
        ]
    }
}

impl PackageTool for DotnetCli {
    async fn test(&self, project_file: &Path) -> Result<CommandOutput> {
        run_command(&self.program, &Self::test_args(project_file), &[], self.timeout).await
    }

    async fn pack(&self, project_file: &Path, output_dir: &Path) -> Result<CommandOutput> {
        let args = Self::pack_args(project_file, output_dir);
        run_command(&self.program, &args, &[], self.timeout).await
    }

    async fn push(&self, package: &Path, api_key: &str, source: &str) -> Result<CommandOutput> {
        let args = Self::push_args(package, api_key, source);
        run_command(&self.program, &args, &[api_key], self.timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publish::display_command;

    #[test]
    fn test_pack_args() {
        let args = DotnetCli::pack_args(
            Path::new("/repo/Acme.Core/Acme.Core.csproj"),
            Path::new("/repo/Acme.Core/bin/.nupkg"),
        );
        assert_eq!(
            args.join(" "),
            "pack /repo/Acme.Core/Acme.Core.csproj -c Release --force -o /repo/Acme.Core/bin/.nupkg"
        );
    }

    #[test]
    fn test_push_command_line_hides_key() {
        let args = DotnetCli::push_args(
            Path::new("Acme.Core.1.2.0.nupkg"),
            "secret",
            "https://api.nuget.org/v3/index.json",
        );
        assert_eq!(
            display_command("dotnet", &args, &["secret"]),
            "dotnet nuget push Acme.Core.1.2.0.nupkg --api-key *** --source https://api.nuget.org/v3/index.json --skip-duplicate"
        );
    }
}
