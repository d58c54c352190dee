// ABOUTME: Lists what discovery found without running the toolchain
// ABOUTME: Shows project directories, context targets, and discovery issues

use std::fmt::Write;

use crate::config::DiscoveryConfig;
use crate::discovery::Discovery;

/// Render the discovery result as operator-facing text.
pub fn render_listing(discovery: &Discovery, config: &DiscoveryConfig) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "Directories ending with '{}' (excluding {}):",
        config.project_suffix,
        config.excluded_projects.join(", ")
    );
    for dir in &discovery.project_dirs {
        let _ = writeln!(out, "  {}", display_relative(discovery, dir));
    }

    let _ = writeln!(out);
    if discovery.targets.is_empty() {
        let _ = writeln!(out, "No DbContexts found.");
    } else {
        let _ = writeln!(out, "DbContexts:");
        let width = discovery
            .targets
            .iter()
            .map(|t| t.name.len())
            .max()
            .unwrap_or(0);
        for target in &discovery.targets {
            let _ = writeln!(
                out,
                "  {:width$}  {}",
                target.name,
                display_relative(discovery, &target.descriptor),
                width = width
            );
        }
    }

    if !discovery.issues.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Issues:");
        for issue in &discovery.issues {
            let _ = writeln!(out, "  • {}", issue);
        }
    }

    out
}

fn display_relative(discovery: &Discovery, path: &std::path::Path) -> String {
    path.strip_prefix(&discovery.root)
        .unwrap_or(path)
        .display()
        .to_string()
}

/// Print the discovery result.
pub fn list_contexts(discovery: &Discovery, config: &DiscoveryConfig) {
    print!("{}", render_listing(discovery, config));
}
