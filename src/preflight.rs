// ABOUTME: Pre-flight checks run before any toolchain command is executed
// ABOUTME: Verifies the dotnet program is installed and the EF tool responds

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use which::which;

use crate::runner::CommandRunner;
use crate::toolchain::Toolchain;

/// Locate the toolchain program on PATH (or accept an existing path).
///
/// # Errors
///
/// Returns an error with installation instructions if the program is missing.
pub fn check_toolchain(program: &str) -> Result<PathBuf> {
    match which(program) {
        Ok(path) => {
            tracing::debug!("Using toolchain at {}", path.display());
            Ok(path)
        }
        Err(_) => bail!(
            "Toolchain program '{}' was not found.\n\
             \n\
             Please install the .NET SDK:\n\
             - Ubuntu/Debian: sudo apt-get install dotnet-sdk-8.0\n\
             - macOS: brew install --cask dotnet-sdk\n\
             - Windows: Download from https://dotnet.microsoft.com/download\n\
             \n\
             Or point --toolchain at the dotnet executable.",
            program
        ),
    }
}

/// Confirm the EF command-line tool is installed by asking it for its version.
///
/// Returns the reported version string.
pub fn check_ef_tool(runner: &mut dyn CommandRunner, toolchain: &Toolchain) -> Result<String> {
    let output = runner
        .run(toolchain.program(), &toolchain.ef_version_args())
        .context("Failed to query the EF tool version")?;

    if !output.success() {
        bail!(
            "The EF Core command-line tool is not available: {}\n\
             \n\
             Install it with: dotnet tool install --global dotnet-ef",
            output.error_text()
        );
    }

    let version = String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::trim)
        .rev()
        .find(|line| !line.is_empty())
        .unwrap_or_default()
        .to_string();
    tracing::info!("EF tool version: {}", version);
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::CommandOutput;
    use std::ffi::OsString;

    struct Canned(CommandOutput);

    impl CommandRunner for Canned {
        fn run(&mut self, _program: &str, _args: &[OsString]) -> Result<CommandOutput> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_check_toolchain_missing_program() {
        let err = check_toolchain("nonexistent_dotnet_xyz").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("nonexistent_dotnet_xyz"));
        assert!(msg.contains("was not found"));
    }

    #[test]
    fn test_check_ef_tool_reads_last_line() {
        let mut runner = Canned(CommandOutput {
            status: Some(0),
            stdout: b"Entity Framework Core .NET Command-line Tools\n8.0.11\n".to_vec(),
            stderr: Vec::new(),
        });
        let version = check_ef_tool(&mut runner, &Toolchain::default()).unwrap();
        assert_eq!(version, "8.0.11");
    }

    #[test]
    fn test_check_ef_tool_ignores_trailing_blank_lines() {
        let mut runner = Canned(CommandOutput {
            status: Some(0),
            stdout: b"Entity Framework Core .NET Command-line Tools\n9.0.1\n\n   \n".to_vec(),
            stderr: Vec::new(),
        });
        let version = check_ef_tool(&mut runner, &Toolchain::default()).unwrap();
        assert_eq!(version, "9.0.1");
    }

    #[test]
    fn test_check_ef_tool_failure_has_install_hint() {
        let mut runner = Canned(CommandOutput {
            status: Some(1),
            stdout: Vec::new(),
            stderr: b"Could not execute because the specified command or file was not found."
                .to_vec(),
        });
        let err = check_ef_tool(&mut runner, &Toolchain::default()).unwrap_err();
        assert!(err.to_string().contains("dotnet tool install --global dotnet-ef"));
    }
}
