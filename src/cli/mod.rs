//! Command line interface for nuget_release.

mod args;
pub mod commands;
mod output;

pub use args::Args;
pub use commands::execute_command;
pub use output::OutputManager;

use crate::error::Result;

/// Run the CLI with already parsed arguments
pub async fn run(args: Args) -> Result<i32> {
    execute_command(args).await
}

/// Initialise `env_logger`; `RUST_LOG` takes precedence over `default_level`
pub fn init_logging(default_level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .format_target(false)
        .init();
}

/// Map a pipeline status code to a process exit code.
///
/// Codes whose low byte is zero would read as success to a shell, so they
/// become 1.
pub fn exit_status(code: i32) -> i32 {
    if code != 0 && code & 0xFF == 0 { 1 } else { code }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_status() {
        assert_eq!(exit_status(0), 0);
        assert_eq!(exit_status(400), 400);
        assert_eq!(exit_status(1), 1);
        assert_eq!(exit_status(512), 1);
        assert_eq!(exit_status(1024), 1);
    }
}
