// ABOUTME: Walks a solution tree to find infrastructure projects and their DbContexts
// ABOUTME: Produces one (context, build descriptor) record per context in a single pass

use anyhow::{bail, Context, Result};
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::config::DiscoveryConfig;

/// A database context ready to be handed to the toolchain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextTarget {
    /// Context identifier (file stem, e.g. `OrdersDbContext`)
    pub name: String,
    /// Source file the identifier was taken from
    pub context_file: PathBuf,
    /// Infrastructure project directory that owns the context
    pub project_dir: PathBuf,
    /// Build-project descriptor (`*.csproj`) for the project directory
    pub descriptor: PathBuf,
}

/// Non-fatal problem found while walking the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryIssue {
    /// Project directory has no contexts directory
    MissingContextsDir { project_dir: PathBuf },
    /// Contexts directory exists but holds no qualifying files
    NoContextFiles { contexts_dir: PathBuf },
    /// Context found but no descriptor exists anywhere under its project
    MissingDescriptor { context: String, project_dir: PathBuf },
}

impl fmt::Display for DiscoveryIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscoveryIssue::MissingContextsDir { project_dir } => {
                write!(f, "No 'Contexts' directory found in: {}", project_dir.display())
            }
            DiscoveryIssue::NoContextFiles { contexts_dir } => {
                write!(f, "No DbContext files found in {}", contexts_dir.display())
            }
            DiscoveryIssue::MissingDescriptor {
                context,
                project_dir,
            } => write!(
                f,
                "Skipping {}: no build project file found under {}",
                context,
                project_dir.display()
            ),
        }
    }
}

/// Result of walking a root directory.
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    /// Canonical scan root
    pub root: PathBuf,
    /// Every qualifying project directory, in traversal order
    pub project_dirs: Vec<PathBuf>,
    /// Contexts with a resolved descriptor, in traversal order
    pub targets: Vec<ContextTarget>,
    pub issues: Vec<DiscoveryIssue>,
}

impl Discovery {
    /// True when no qualifying project directory exists under the root.
    pub fn found_no_projects(&self) -> bool {
        self.project_dirs.is_empty()
    }

    /// Keep only the named contexts. An empty selection keeps everything.
    ///
    /// Returns the requested names that matched no discovered context.
    pub fn retain_contexts(&mut self, names: &[String]) -> Vec<String> {
        if names.is_empty() {
            return Vec::new();
        }
        let unknown = names
            .iter()
            .filter(|name| !self.targets.iter().any(|t| &t.name == *name))
            .cloned()
            .collect();
        self.targets.retain(|t| names.contains(&t.name));
        unknown
    }
}

/// Discover every context under `root`.
///
/// Traversal is sorted by entry name at every level, so the order of
/// `targets` is stable across runs and platforms.
pub fn discover(root: &Path, config: &DiscoveryConfig) -> Result<Discovery> {
    let root = fs::canonicalize(root)
        .with_context(|| format!("Failed to resolve root directory {}", root.display()))?;
    if !root.is_dir() {
        bail!("Root path {} is not a directory", root.display());
    }
    // Unreadable subdirectories are skipped during the walk; an unreadable root is an error.
    fs::read_dir(&root)
        .with_context(|| format!("Failed to read root directory {}", root.display()))?;

    tracing::info!("Scanning {} for '*{}' directories", root.display(), config.project_suffix);

    let mut project_dirs = Vec::new();
    collect_project_dirs(&root, &root, config, &mut project_dirs)?;

    let mut discovery = Discovery {
        root,
        project_dirs,
        ..Default::default()
    };

    for project_dir in discovery.project_dirs.clone() {
        tracing::info!("Found project directory: {}", project_dir.display());
        inspect_project(&project_dir, config, &mut discovery)?;
    }

    for issue in &discovery.issues {
        tracing::warn!("{}", issue);
    }

    Ok(discovery)
}

fn inspect_project(
    project_dir: &Path,
    config: &DiscoveryConfig,
    discovery: &mut Discovery,
) -> Result<()> {
    let contexts_dir = project_dir.join(&config.contexts_dir);
    if !contexts_dir.is_dir() {
        discovery.issues.push(DiscoveryIssue::MissingContextsDir {
            project_dir: project_dir.to_path_buf(),
        });
        return Ok(());
    }

    let mut context_files = Vec::new();
    collect_context_files(&contexts_dir, &contexts_dir, config, &mut context_files)?;
    if context_files.is_empty() {
        discovery
            .issues
            .push(DiscoveryIssue::NoContextFiles { contexts_dir });
        return Ok(());
    }

    // One descriptor per project directory; every context in it shares it.
    let descriptor = find_descriptor(project_dir, config)?;

    for context_file in context_files {
        let Some(name) = context_file
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
        else {
            continue;
        };
        tracing::info!("Found context {} in {}", name, context_file.display());

        match &descriptor {
            Some(descriptor) => discovery.targets.push(ContextTarget {
                name,
                context_file,
                project_dir: project_dir.to_path_buf(),
                descriptor: descriptor.clone(),
            }),
            None => discovery.issues.push(DiscoveryIssue::MissingDescriptor {
                context: name,
                project_dir: project_dir.to_path_buf(),
            }),
        }
    }

    Ok(())
}

/// Read a directory's entries, with their file types, sorted by file name.
///
/// A directory or entry the process may not read is skipped with a warning.
/// Any other I/O error is returned.
fn sorted_entries(dir: &Path) -> Result<Vec<(fs::DirEntry, fs::FileType)>> {
    let read_dir = match fs::read_dir(dir) {
        Ok(read_dir) => read_dir,
        Err(err) if err.kind() == ErrorKind::PermissionDenied => {
            tracing::warn!("Skipping unreadable directory {}: {}", dir.display(), err);
            return Ok(Vec::new());
        }
        Err(err) => {
            return Err(err).with_context(|| format!("Failed to read directory {}", dir.display()))
        }
    };

    let mut entries = Vec::new();
    for entry in read_dir {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if err.kind() == ErrorKind::PermissionDenied => {
                tracing::warn!("Skipping unreadable entry in {}: {}", dir.display(), err);
                continue;
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("Failed to list directory {}", dir.display()))
            }
        };
        match entry.file_type() {
            Ok(file_type) => entries.push((entry, file_type)),
            Err(err) if err.kind() == ErrorKind::PermissionDenied => {
                tracing::warn!("Skipping unreadable entry {}: {}", entry.path().display(), err);
            }
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("Failed to read file type of {}", entry.path().display())
                })
            }
        }
    }
    entries.sort_by_key(|(entry, _)| entry.file_name());
    Ok(entries)
}

fn is_ignored(entry: &fs::DirEntry, config: &DiscoveryConfig) -> bool {
    let name = entry.file_name();
    let name = name.to_string_lossy();
    config.ignored_dirs.iter().any(|ignored| *ignored == *name)
}

fn relative_contains(path: &Path, base: &Path, fragments: &[String]) -> bool {
    let relative = path.strip_prefix(base).unwrap_or(path).to_string_lossy();
    fragments.iter().any(|fragment| relative.contains(fragment.as_str()))
}

fn collect_project_dirs(
    root: &Path,
    dir: &Path,
    config: &DiscoveryConfig,
    out: &mut Vec<PathBuf>,
) -> Result<()> {
    for (entry, file_type) in sorted_entries(dir)? {
        // Symlinked directories are not followed.
        if !file_type.is_dir() || is_ignored(&entry, config) {
            continue;
        }
        let path = entry.path();
        let name = entry.file_name();
        if name.to_string_lossy().ends_with(&config.project_suffix)
            && !relative_contains(&path, root, &config.excluded_projects)
        {
            out.push(path.clone());
        }
        collect_project_dirs(root, &path, config, out)?;
    }
    Ok(())
}

fn collect_context_files(
    contexts_dir: &Path,
    dir: &Path,
    config: &DiscoveryConfig,
    out: &mut Vec<PathBuf>,
) -> Result<()> {
    for (entry, file_type) in sorted_entries(dir)? {
        let path = entry.path();
        if file_type.is_dir() {
            if !is_ignored(&entry, config) {
                collect_context_files(contexts_dir, &path, config, out)?;
            }
            continue;
        }

        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !name.ends_with(&config.context_suffix) {
            continue;
        }
        if config
            .excluded_context_suffixes
            .iter()
            .any(|suffix| name.ends_with(suffix.as_str()))
        {
            tracing::debug!("Ignoring read-only context {}", path.display());
            continue;
        }
        if relative_contains(&path, contexts_dir, &config.excluded_context_fragments) {
            tracing::debug!("Ignoring contract {}", path.display());
            continue;
        }
        out.push(path);
    }
    Ok(())
}

/// Find the first descriptor under `dir`.
///
/// Files directly in a directory win over anything in its subdirectories.
fn find_descriptor(dir: &Path, config: &DiscoveryConfig) -> Result<Option<PathBuf>> {
    let suffix = format!(".{}", config.descriptor_extension);
    let entries = sorted_entries(dir)?;

    for (entry, file_type) in &entries {
        if file_type.is_file() && entry.file_name().to_string_lossy().ends_with(&suffix) {
            return Ok(Some(entry.path()));
        }
    }

    for (entry, file_type) in &entries {
        if file_type.is_dir() && !is_ignored(entry, config) {
            if let Some(found) = find_descriptor(&entry.path(), config)? {
                return Ok(Some(found));
            }
        }
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    #[test]
    fn test_descriptor_prefers_shallow_file() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("Nested/Deep.csproj"));
        touch(&dir.path().join("Top.csproj"));

        let found = find_descriptor(dir.path(), &DiscoveryConfig::default())
            .unwrap()
            .unwrap();
        assert_eq!(found.file_name().unwrap(), "Top.csproj");
    }

    #[test]
    fn test_descriptor_skips_build_output() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("obj/Stale.csproj"));

        let found = find_descriptor(dir.path(), &DiscoveryConfig::default()).unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn test_context_files_filters() {
        let dir = tempdir().unwrap();
        let contexts = dir.path().join("Contexts");
        touch(&contexts.join("OrdersDbContext.cs"));
        touch(&contexts.join("OrdersReadOnlyDbContext.cs"));
        touch(&contexts.join("ReadOnlyOrdersDbContext.cs"));
        touch(&contexts.join("Contracts/IOrdersDbContext.cs"));
        touch(&contexts.join("EnumerationConverters.cs"));

        let mut files = Vec::new();
        collect_context_files(&contexts, &contexts, &DiscoveryConfig::default(), &mut files)
            .unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|f| f.file_name().unwrap().to_string_lossy().into_owned())
            .collect();

        // `ReadOnlyOrdersDbContext.cs` does not end with `ReadOnlyDbContext.cs`.
        assert_eq!(names, vec!["OrdersDbContext.cs", "ReadOnlyOrdersDbContext.cs"]);
    }

    #[test]
    fn test_retain_contexts_reports_unknown_names() {
        let target = |name: &str| ContextTarget {
            name: name.to_string(),
            context_file: PathBuf::from(format!("{name}.cs")),
            project_dir: PathBuf::from("P.Infrastructure"),
            descriptor: PathBuf::from("P.csproj"),
        };
        let mut discovery = Discovery {
            targets: vec![target("ADbContext"), target("BDbContext")],
            ..Default::default()
        };

        let unknown = discovery.retain_contexts(&["BDbContext".to_string(), "Nope".to_string()]);

        assert_eq!(unknown, vec!["Nope".to_string()]);
        assert_eq!(discovery.targets.len(), 1);
        assert_eq!(discovery.targets[0].name, "BDbContext");
    }

    #[test]
    fn test_retain_contexts_empty_selection_keeps_all() {
        let mut discovery = Discovery::default();
        assert!(discovery.retain_contexts(&[]).is_empty());
    }

    #[test]
    fn test_issue_display() {
        let issue = DiscoveryIssue::MissingContextsDir {
            project_dir: PathBuf::from("Orders.Infrastructure"),
        };
        assert_eq!(
            issue.to_string(),
            "No 'Contexts' directory found in: Orders.Infrastructure"
        );
    }
}
