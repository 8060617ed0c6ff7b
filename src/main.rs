//! nuget_release - gated, self-restoring releases of .NET libraries to NuGet.

use nuget_release::cli::{self, Args, OutputManager};
use std::process;

#[tokio::main]
async fn main() {
    let args = Args::parse_args();
    cli::init_logging(args.log_level());

    match cli::run(args).await {
        Ok(code) => process::exit(cli::exit_status(code)),
        Err(e) => {
            // Never quiet for fatal errors
            let output = OutputManager::new(false);
            output.error(&format!("Fatal error: {e}"));

            let suggestions = e.recovery_suggestions();
            if !suggestions.is_empty() {
                let _ = output.println("\n💡 Recovery suggestions:");
                for suggestion in suggestions {
                    let _ = output.indent(&suggestion);
                }
            }

            process::exit(1);
        }
    }
}
