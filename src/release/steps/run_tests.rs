//! Run every declared test project.

use super::files_with_extension;
use crate::error::{ProjectError, ReleaseError, Result};
use crate::pipeline::{BoxFuture, ParallelRunner, PipelineStep, SUCCESS, sum_codes};
use crate::publish::PackageTool;
use crate::release::ReleaseContext;
use crate::version::PROJECT_EXTENSION;
use futures_util::FutureExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Runs `test` for each test project; any failure faults the run
#[derive(Debug)]
pub struct RunTestsStep<T> {
    tools: Arc<T>,
    runner: ParallelRunner,
}

impl<T: PackageTool> RunTestsStep<T> {
    /// Run tests with `tools`, fanned out through `runner`
    pub fn new(tools: Arc<T>, runner: ParallelRunner) -> Self {
        Self { tools, runner }
    }
}

/// The one project file in a test directory
async fn single_project(dir: &Path) -> Result<PathBuf> {
    let mut found = files_with_extension(dir, PROJECT_EXTENSION)?;
    match found.len() {
        1 => Ok(found.remove(0)),
        count => Err(ProjectError::AmbiguousProject {
            dir: dir.to_path_buf(),
            found: count,
        }
        .into()),
    }
}

impl<T: PackageTool> PipelineStep<ReleaseContext> for RunTestsStep<T> {
    fn name(&self) -> &str {
        "run-tests"
    }

    fn run<'a>(&'a self, ctx: &'a mut ReleaseContext) -> BoxFuture<'a, Result<i32>> {
        async move {
            if ctx.skip_tests {
                log::info!("Skipping tests");
                return Ok(SUCCESS);
            }
            if ctx.tests.is_empty() {
                log::warn!("No test projects declared");
                return Ok(SUCCESS);
            }

            let root: Arc<Path> = ctx.root.as_path().into();
            let tools = Arc::clone(&self.tools);
            let codes = self
                .runner
                .run(ctx.tests.clone(), move |test: String| {
                    let tools = Arc::clone(&tools);
                    let dir = root.join(&test);
                    async move {
                        let project = single_project(&dir).await?;
                        log::info!("Running tests in {}", project.display());
                        tools.test(&project).await?.ensure_success()?;
                        log::info!("Tests passed: {test}");
                        Ok::<i32, ReleaseError>(SUCCESS)
                    }
                })
                .await?;

            Ok(sum_codes(&codes))
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::release::steps::testing::{ScriptedTools, output};
    use tempfile::TempDir;

    fn test_dir(root: &Path, name: &str, projects: &[&str]) {
        let dir = root.join(name);
        std::fs::create_dir_all(&dir).expect("mkdir");
        for project in projects {
            std::fs::write(dir.join(project), "<Project />").expect("write");
        }
    }

    fn context(root: &Path, tests: &[&str], skip_tests: bool) -> ReleaseContext {
        let mut ctx = ReleaseContext::new(root, "secret", skip_tests);
        ctx.tests = tests.iter().map(|t| t.to_string()).collect();
        ctx
    }

    async fn run_step(tools: ScriptedTools, ctx: &mut ReleaseContext) -> (Result<i32>, Vec<String>) {
        let tools = Arc::new(tools);
        let step = RunTestsStep::new(Arc::clone(&tools), ParallelRunner::bounded(2));
        let result = step.run(ctx).await;
        (result, tools.calls())
    }

    #[tokio::test]
    async fn test_runs_every_test_project() {
        let dir = TempDir::new().expect("tempdir");
        test_dir(dir.path(), "Acme.Core.Tests", &["Acme.Core.Tests.csproj"]);
        test_dir(dir.path(), "Acme.Web.Tests", &["Acme.Web.Tests.csproj"]);
        let mut ctx = context(dir.path(), &["Acme.Core.Tests", "Acme.Web.Tests"], false);

        let (result, mut calls) = run_step(ScriptedTools::default(), &mut ctx).await;
        calls.sort();

        assert_eq!(result.expect("tests pass"), SUCCESS);
        assert_eq!(
            calls,
            vec!["test Acme.Core.Tests.csproj", "test Acme.Web.Tests.csproj"]
        );
    }

    #[tokio::test]
    async fn test_skip_flag_and_empty_list_run_nothing() {
        let dir = TempDir::new().expect("tempdir");
        test_dir(dir.path(), "Acme.Core.Tests", &["Acme.Core.Tests.csproj"]);

        let mut skipped = context(dir.path(), &["Acme.Core.Tests"], true);
        let (result, calls) = run_step(ScriptedTools::default(), &mut skipped).await;
        assert_eq!(result.expect("skipped"), SUCCESS);
        assert!(calls.is_empty());

        let mut empty = context(dir.path(), &[], false);
        let (result, calls) = run_step(ScriptedTools::default(), &mut empty).await;
        assert_eq!(result.expect("nothing to run"), SUCCESS);
        assert!(calls.is_empty());
    }

    #[tokio::test]
    async fn test_failing_tests_are_a_fault() {
        let dir = TempDir::new().expect("tempdir");
        test_dir(dir.path(), "Acme.Core.Tests", &["Acme.Core.Tests.csproj"]);
        let mut ctx = context(dir.path(), &["Acme.Core.Tests"], false);
        let tools = ScriptedTools {
            test_output: output(1, &["Failed!  - Failed: 1, Passed: 11"], &[]),
            ..ScriptedTools::default()
        };

        let (result, _) = run_step(tools, &mut ctx).await;

        assert!(matches!(result, Err(ReleaseError::Command(_))));
    }

    #[tokio::test]
    async fn test_directory_without_project_is_ambiguous() {
        let dir = TempDir::new().expect("tempdir");
        test_dir(dir.path(), "Acme.Core.Tests", &["README.md"]);
        let mut ctx = context(dir.path(), &["Acme.Core.Tests"], false);

        let (result, calls) = run_step(ScriptedTools::default(), &mut ctx).await;

        assert!(matches!(
            result,
            Err(ReleaseError::Project(ProjectError::AmbiguousProject { found: 0, .. }))
        ));
        assert!(calls.is_empty());
    }

    #[tokio::test]
    async fn test_directory_with_two_projects_is_ambiguous() {
        let dir = TempDir::new().expect("tempdir");
        test_dir(
            dir.path(),
            "Acme.Core.Tests",
            &["Acme.Core.Tests.csproj", "Acme.Core.Benchmarks.csproj"],
        );
        let mut ctx = context(dir.path(), &["Acme.Core.Tests"], false);

        let (result, calls) = run_step(ScriptedTools::default(), &mut ctx).await;

        assert!(matches!(
            result,
            Err(ReleaseError::Project(ProjectError::AmbiguousProject { found: 2, .. }))
        ));
        assert!(calls.is_empty());
    }
}
