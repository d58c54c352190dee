// ABOUTME: Library root for dbcontext-migrator
// ABOUTME: Discovery, toolchain invocation, and the add/update/list workflows

pub mod commands;
pub mod config;
pub mod discovery;
pub mod error;
pub mod naming;
pub mod preflight;
pub mod runner;
pub mod toolchain;

pub use config::Settings;
pub use discovery::{discover, ContextTarget, Discovery, DiscoveryIssue};
pub use error::WorkflowError;
pub use runner::{CommandOutput, CommandRunner};
