// ABOUTME: Typed errors for aborted migration runs
// ABOUTME: Raised when a fail-fast workflow stops on a toolchain failure

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("Cannot resolve project file {descriptor} (context {context}): {reason}")]
    ProjectNotResolved {
        context: String,
        descriptor: String,
        reason: String,
    },

    #[error("Build failed for project {descriptor} (context {context})")]
    BuildFailed { context: String, descriptor: String },

    #[error("Migration {migration} could not be added for context {context}")]
    MigrationAddFailed { context: String, migration: String },

    #[error("Failed to apply migrations for context {context}")]
    DatabaseUpdateFailed { context: String },
}

impl WorkflowError {
    /// Context the run stopped at.
    pub fn context(&self) -> &str {
        match self {
            WorkflowError::ProjectNotResolved { context, .. }
            | WorkflowError::BuildFailed { context, .. }
            | WorkflowError::MigrationAddFailed { context, .. }
            | WorkflowError::DatabaseUpdateFailed { context } => context,
        }
    }
}
