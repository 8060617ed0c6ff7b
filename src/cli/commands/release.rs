//! The release command: wire real collaborators into the pipeline and run it.

use crate::cli::{Args, OutputManager};
use crate::error::{CliError, Result};
use crate::git::GitCli;
use crate::pipeline::SUCCESS;
use crate::publish::DotnetCli;
use crate::registry::NugetClient;
use crate::release::{ReleaseContext, ReleaseServices, build_release_pipeline};
use std::sync::Arc;
use std::time::Duration;

/// Per-request timeout for registry HTTP calls
const REGISTRY_TIMEOUT: Duration = Duration::from_secs(30);

/// Run the full release pipeline and report the outcome
pub async fn execute_release(args: &Args, output: &OutputManager) -> Result<i32> {
    let config = args.to_config();
    config
        .validate()
        .map_err(|reason| CliError::InvalidArguments { reason })?;

    output.section("NuGet release")?;
    output.info(&format!("Root: {}", args.root.display()))?;
    if args.skip_tests {
        output.warn("Tests will be skipped")?;
    }

    let services = ReleaseServices {
        registry: Arc::new(NugetClient::new(REGISTRY_TIMEOUT)?),
        gate: Arc::new(GitCli::default()),
        tools: Arc::new(DotnetCli::new(config.command_timeout)),
    };
    let pipeline = build_release_pipeline(services, &config);
    log::debug!("Pipeline steps: {}", pipeline.step_names().join(" -> "));

    let mut ctx = ReleaseContext::new(&args.root, args.api_key.as_str(), args.skip_tests);
    let code = pipeline.run(&mut ctx).await?;

    if code == SUCCESS {
        output.success(&format!("Released {} package(s)", ctx.candidates.len()))?;
        for candidate in ctx.candidates.iter() {
            output.indent(&candidate.to_string())?;
        }
    } else {
        output.error(&format!("Release finished with status {code}; see the log above"));
    }

    Ok(code)
}
