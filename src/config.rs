// ABOUTME: Layered configuration for discovery, toolchain, and workflow policy
// ABOUTME: Built-in defaults, optionally overridden by a dbcontext-migrator.toml file

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::commands::FailurePolicy;

/// File name looked up in the scan root when no `--config` is given.
pub const CONFIG_FILE_NAME: &str = "dbcontext-migrator.toml";

/// Complete settings for a run.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub discovery: DiscoveryConfig,
    pub toolchain: ToolchainConfig,
    pub workflow: WorkflowConfig,
}

/// Naming rules used to find projects, contexts, and descriptors.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct DiscoveryConfig {
    /// Directory name suffix identifying an infrastructure project
    pub project_suffix: String,
    /// Path fragments (relative to the root) that disqualify a project directory
    pub excluded_projects: Vec<String>,
    /// Child directory holding the context sources
    pub contexts_dir: String,
    /// File name suffix identifying a context source
    pub context_suffix: String,
    /// File name suffixes that disqualify a context source
    pub excluded_context_suffixes: Vec<String>,
    /// Path fragments (relative to the contexts directory) that disqualify a context source
    pub excluded_context_fragments: Vec<String>,
    /// Extension of the build-project descriptor, without the dot
    pub descriptor_extension: String,
    /// Directory names never descended into
    pub ignored_dirs: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            project_suffix: ".Infrastructure".to_string(),
            excluded_projects: vec!["BuildingBlocks.Infrastructure".to_string()],
            contexts_dir: "Contexts".to_string(),
            context_suffix: "DbContext.cs".to_string(),
            excluded_context_suffixes: vec!["ReadOnlyDbContext.cs".to_string()],
            excluded_context_fragments: vec!["Contracts".to_string()],
            descriptor_extension: "csproj".to_string(),
            ignored_dirs: vec![
                ".git".to_string(),
                "bin".to_string(),
                "obj".to_string(),
                "node_modules".to_string(),
            ],
        }
    }
}

/// External toolchain invocation settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ToolchainConfig {
    /// Program to execute (looked up on PATH)
    pub program: String,
    /// Subcommand prefix for migration operations (`dotnet ef ...`)
    pub ef_subcommand: Vec<String>,
    /// Parent of the per-context migration output directory
    pub migrations_dir: String,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            program: "dotnet".to_string(),
            ef_subcommand: vec!["ef".to_string()],
            migrations_dir: "Migrations".to_string(),
        }
    }
}

/// Failure policy defaults for each workflow.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct WorkflowConfig {
    pub add_policy: FailurePolicy,
    pub update_policy: FailurePolicy,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            add_policy: FailurePolicy::FailFast,
            update_policy: FailurePolicy::Continue,
        }
    }
}

impl Settings {
    /// Parse settings from TOML text. Missing keys fall back to defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse configuration")
    }

    /// Load settings from an explicit file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Resolve settings for a run.
    ///
    /// An explicit path must exist. Without one, `<root>/dbcontext-migrator.toml`
    /// is used when present, otherwise the built-in defaults.
    pub fn load(explicit: Option<&Path>, root: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        let candidate = root.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            tracing::debug!("Using config file {}", candidate.display());
            return Self::from_file(&candidate);
        }
        Ok(Self::default())
    }
}

/// Default scan root: the parent of the current working directory.
///
/// Operators run the tool from a `Scripts` folder inside the solution, so the
/// solution root is one level up. Falls back to the working directory itself
/// when it has no parent.
pub fn default_root() -> Result<PathBuf> {
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    Ok(cwd.parent().map(Path::to_path_buf).unwrap_or(cwd))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_match_solution_layout() {
        let settings = Settings::default();
        assert_eq!(settings.discovery.project_suffix, ".Infrastructure");
        assert_eq!(settings.discovery.contexts_dir, "Contexts");
        assert_eq!(settings.toolchain.program, "dotnet");
        assert_eq!(settings.workflow.add_policy, FailurePolicy::FailFast);
        assert_eq!(settings.workflow.update_policy, FailurePolicy::Continue);
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let settings = Settings::from_toml_str(
            r#"
            [toolchain]
            program = "/opt/dotnet/dotnet"

            [workflow]
            update_policy = "fail-fast"
            "#,
        )
        .unwrap();

        assert_eq!(settings.toolchain.program, "/opt/dotnet/dotnet");
        assert_eq!(settings.toolchain.ef_subcommand, vec!["ef".to_string()]);
        assert_eq!(settings.workflow.update_policy, FailurePolicy::FailFast);
        assert_eq!(settings.workflow.add_policy, FailurePolicy::FailFast);
        assert_eq!(settings.discovery, DiscoveryConfig::default());
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let result = Settings::from_toml_str(
            r#"
            [discovery]
            project_sufix = ".Data"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_load_prefers_root_config_file() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[discovery]\nproject_suffix = \".Persistence\"\n",
        )
        .unwrap();

        let settings = Settings::load(None, dir.path()).unwrap();
        assert_eq!(settings.discovery.project_suffix, ".Persistence");
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let settings = Settings::load(None, dir.path()).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = Settings::load(Some(&missing), dir.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
