// ABOUTME: Command implementations for each migration workflow
// ABOUTME: Exports add, update, and list plus the shared failure policy and run report

pub mod add;
pub mod list;
pub mod update;

pub use add::{generate_migrations, AddOptions};
pub use list::list_contexts;
pub use update::apply_migrations;

use anyhow::Result;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::PathBuf;

use crate::discovery::ContextTarget;
use crate::error::WorkflowError;
use crate::runner::CommandOutput;

/// What a workflow does when a toolchain command fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Stop at the first failing context and exit non-zero
    FailFast,
    /// Report the failure and move on to the next context
    Continue,
}

/// Workflow step that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    ResolveProject,
    Build,
    AddMigration,
    UpdateDatabase,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Step::ResolveProject => "resolve project",
            Step::Build => "build",
            Step::AddMigration => "migrations add",
            Step::UpdateDatabase => "database update",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextFailure {
    pub context: String,
    pub step: Step,
    /// Captured error output of the failing command
    pub output: String,
}

/// Outcome of a workflow over all selected contexts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Contexts whose commands all succeeded, in processing order
    pub succeeded: Vec<String>,
    pub failed: Vec<ContextFailure>,
}

impl RunReport {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }

    /// Print the closing summary.
    pub fn print(&self, success_message: &str) {
        if self.all_succeeded() {
            println!("{}", success_message);
            return;
        }
        println!(
            "{} of {} context(s) failed:",
            self.failed.len(),
            self.failed.len() + self.succeeded.len()
        );
        for failure in &self.failed {
            println!("  ✗ {} ({})", failure.context, failure.step);
        }
    }
}

impl RunReport {
    /// Record a failed step. Under fail-fast the failure becomes the run's error.
    fn record_failure(
        &mut self,
        policy: FailurePolicy,
        failure: ContextFailure,
        error: anyhow::Error,
    ) -> Result<()> {
        self.failed.push(failure);
        match policy {
            FailurePolicy::FailFast => Err(error),
            FailurePolicy::Continue => Ok(()),
        }
    }
}

/// Resolve a target's descriptor to an absolute path, recording a failure
/// when it cannot be resolved.
///
/// `Ok(None)` means the target was skipped under [`FailurePolicy::Continue`].
fn resolve_descriptor(
    target: &ContextTarget,
    policy: FailurePolicy,
    report: &mut RunReport,
) -> Result<Option<PathBuf>> {
    match fs::canonicalize(&target.descriptor) {
        Ok(descriptor) => {
            tracing::info!("Resolved project file: {}", descriptor.display());
            Ok(Some(descriptor))
        }
        Err(err) => {
            eprintln!(
                "Cannot resolve project file {} for DbContext: {}: {}",
                target.descriptor.display(),
                target.name,
                err
            );
            let failure = ContextFailure {
                context: target.name.clone(),
                step: Step::ResolveProject,
                output: err.to_string(),
            };
            let error = WorkflowError::ProjectNotResolved {
                context: target.name.clone(),
                descriptor: target.descriptor.display().to_string(),
                reason: err.to_string(),
            };
            report.record_failure(policy, failure, error.into())?;
            Ok(None)
        }
    }
}

/// Record a toolchain command that could not be started at all.
fn record_launch_failure(
    report: &mut RunReport,
    policy: FailurePolicy,
    target: &ContextTarget,
    step: Step,
    error: anyhow::Error,
) -> Result<()> {
    eprintln!("Could not run {} for DbContext: {}: {:#}", step, target.name, error);
    let failure = ContextFailure {
        context: target.name.clone(),
        step,
        output: format!("{:#}", error),
    };
    report.record_failure(policy, failure, error)
}

/// Print a failed command's captured error output to stderr.
fn print_failure(headline: &str, output: &CommandOutput) {
    eprintln!("{}", headline);
    let text = output.error_text();
    if !text.is_empty() {
        eprintln!("{}", text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_from_config_names() {
        #[derive(Deserialize)]
        struct Wrapper {
            policy: FailurePolicy,
        }
        let parsed: Wrapper = toml::from_str("policy = \"fail-fast\"").unwrap();
        assert_eq!(parsed.policy, FailurePolicy::FailFast);
        let parsed: Wrapper = toml::from_str("policy = \"continue\"").unwrap();
        assert_eq!(parsed.policy, FailurePolicy::Continue);
        assert!(toml::from_str::<Wrapper>("policy = \"retry\"").is_err());
    }

    #[test]
    fn test_report_all_succeeded() {
        let mut report = RunReport::default();
        report.succeeded.push("OrdersDbContext".to_string());
        assert!(report.all_succeeded());

        report.failed.push(ContextFailure {
            context: "BookingsDbContext".to_string(),
            step: Step::UpdateDatabase,
            output: String::new(),
        });
        assert!(!report.all_succeeded());
    }

    #[test]
    fn test_record_failure_respects_policy() {
        let failure = ContextFailure {
            context: "OrdersDbContext".to_string(),
            step: Step::Build,
            output: String::new(),
        };

        let mut report = RunReport::default();
        assert!(report
            .record_failure(FailurePolicy::Continue, failure.clone(), anyhow::anyhow!("boom"))
            .is_ok());
        assert!(report
            .record_failure(FailurePolicy::FailFast, failure, anyhow::anyhow!("boom"))
            .is_err());
        assert_eq!(report.failed.len(), 2);
    }

    #[test]
    fn test_step_display() {
        assert_eq!(Step::AddMigration.to_string(), "migrations add");
    }
}
