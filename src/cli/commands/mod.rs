//! Command execution: argument validation, then the release workflow.

mod release;

pub use release::execute_release;

use crate::cli::{Args, OutputManager};
use crate::error::Result;

/// Execute the release described by parsed arguments
pub async fn execute_command(args: Args) -> Result<i32> {
    let output = OutputManager::new(args.quiet);

    if let Err(validation_error) = args.validate() {
        output.error(&format!("Invalid arguments: {validation_error}"));
        return Ok(1);
    }

    execute_release(&args, &output).await
}
