// ABOUTME: Migration-application workflow
// ABOUTME: Applies pending migrations for each context, reporting failures per context

use anyhow::Result;

use super::{
    print_failure, record_launch_failure, resolve_descriptor, ContextFailure, FailurePolicy,
    RunReport, Step,
};
use crate::discovery::ContextTarget;
use crate::error::WorkflowError;
use crate::runner::CommandRunner;
use crate::toolchain::Toolchain;

/// Run `database update` for every target, in order.
///
/// Re-applying is a no-op at the toolchain level, so a partially failed run
/// can simply be repeated. With [`FailurePolicy::Continue`] (the usual choice
/// here) every target is attempted, including after a project file that
/// cannot be resolved or a toolchain that cannot be started.
pub fn apply_migrations(
    targets: &[ContextTarget],
    toolchain: &Toolchain,
    runner: &mut dyn CommandRunner,
    policy: FailurePolicy,
) -> Result<RunReport> {
    let mut report = RunReport::default();

    for target in targets {
        let Some(descriptor) = resolve_descriptor(target, policy, &mut report)? else {
            continue;
        };
        tracing::info!("Applying pending migrations for DbContext: {}", target.name);

        let args = toolchain.database_update_args(&target.name, &descriptor);
        let output = match runner.run(toolchain.program(), &args) {
            Ok(output) => output,
            Err(err) => {
                record_launch_failure(&mut report, policy, target, Step::UpdateDatabase, err)?;
                continue;
            }
        };

        if output.success() {
            println!("Migration applied successfully for DbContext: {}.", target.name);
            report.succeeded.push(target.name.clone());
            continue;
        }

        print_failure(
            &format!("Failed to apply migration for DbContext: {}.", target.name),
            &output,
        );
        let failure = ContextFailure {
            context: target.name.clone(),
            step: Step::UpdateDatabase,
            output: output.error_text(),
        };
        let error = WorkflowError::DatabaseUpdateFailed {
            context: target.name.clone(),
        };
        report.record_failure(policy, failure, error.into())?;
    }

    Ok(report)
}
