// ABOUTME: Migration-generation workflow
// ABOUTME: Builds each context's project, then authors a ULID-named migration for it

use anyhow::Result;

use super::{
    print_failure, record_launch_failure, resolve_descriptor, ContextFailure, FailurePolicy,
    RunReport, Step,
};
use crate::discovery::ContextTarget;
use crate::error::WorkflowError;
use crate::naming::MigrationNamer;
use crate::runner::CommandRunner;
use crate::toolchain::Toolchain;

#[derive(Debug, Clone, Copy)]
pub struct AddOptions {
    pub policy: FailurePolicy,
    /// Build the project before adding the migration
    pub build: bool,
}

impl Default for AddOptions {
    fn default() -> Self {
        Self {
            policy: FailurePolicy::FailFast,
            build: true,
        }
    }
}

/// Add one new migration per target, in order.
///
/// Under [`FailurePolicy::FailFast`] the first failure (unresolvable project
/// file, failed build, failed `migrations add`) ends the run with an error;
/// migrations already written for earlier contexts stay on disk. Under
/// [`FailurePolicy::Continue`] failures are recorded and the next target runs.
pub fn generate_migrations(
    targets: &[ContextTarget],
    toolchain: &Toolchain,
    runner: &mut dyn CommandRunner,
    namer: &mut dyn MigrationNamer,
    options: &AddOptions,
) -> Result<RunReport> {
    let policy = options.policy;
    let mut report = RunReport::default();

    for target in targets {
        let Some(descriptor) = resolve_descriptor(target, policy, &mut report)? else {
            continue;
        };

        if options.build {
            tracing::info!("Building project: {}", descriptor.display());
            let output = match runner.run(toolchain.program(), &toolchain.build_args(&descriptor)) {
                Ok(output) => output,
                Err(err) => {
                    record_launch_failure(&mut report, policy, target, Step::Build, err)?;
                    continue;
                }
            };
            if !output.success() {
                print_failure(
                    &format!("Build failed for project: {}", descriptor.display()),
                    &output,
                );
                let failure = ContextFailure {
                    context: target.name.clone(),
                    step: Step::Build,
                    output: output.error_text(),
                };
                let error = WorkflowError::BuildFailed {
                    context: target.name.clone(),
                    descriptor: descriptor.display().to_string(),
                };
                report.record_failure(policy, failure, error.into())?;
                continue;
            }
        }

        let migration = namer.next_name()?;
        tracing::info!(
            "Adding migration {} for {} (output dir: {})",
            migration,
            target.name,
            toolchain.output_dir(&target.name)
        );
        let args = toolchain.add_migration_args(&migration, &target.name, &descriptor);
        let output = match runner.run(toolchain.program(), &args) {
            Ok(output) => output,
            Err(err) => {
                record_launch_failure(&mut report, policy, target, Step::AddMigration, err)?;
                continue;
            }
        };
        if !output.success() {
            print_failure(
                &format!("Migration failed for DbContext: {}", target.name),
                &output,
            );
            let failure = ContextFailure {
                context: target.name.clone(),
                step: Step::AddMigration,
                output: output.error_text(),
            };
            let error = WorkflowError::MigrationAddFailed {
                context: target.name.clone(),
                migration,
            };
            report.record_failure(policy, failure, error.into())?;
            continue;
        }

        println!("Added migration {} for {}", migration, target.name);
        report.succeeded.push(target.name.clone());
    }

    Ok(report)
}
