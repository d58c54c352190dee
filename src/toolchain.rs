// ABOUTME: Argument contracts for the dotnet build and EF migration commands
// ABOUTME: Turns a context target into the exact argument lists the toolchain expects

use std::ffi::OsString;
use std::path::Path;

use crate::config::ToolchainConfig;

/// Builds argument lists for the external toolchain.
///
/// Paths are passed as raw `OsString`s so project files with non-UTF-8 names
/// reach the toolchain unchanged.
#[derive(Debug, Clone)]
pub struct Toolchain {
    config: ToolchainConfig,
}

impl Toolchain {
    pub fn new(config: ToolchainConfig) -> Self {
        Self { config }
    }

    pub fn program(&self) -> &str {
        &self.config.program
    }

    fn ef_prefix(&self) -> Vec<OsString> {
        self.config.ef_subcommand.iter().map(OsString::from).collect()
    }

    /// `build <descriptor>`
    pub fn build_args(&self, descriptor: &Path) -> Vec<OsString> {
        vec!["build".into(), descriptor.as_os_str().to_os_string()]
    }

    /// Per-context output directory, relative to the project: `Migrations/<context>`.
    ///
    /// Always joined with `/` so the argument is identical on every platform.
    pub fn output_dir(&self, context: &str) -> String {
        format!("{}/{}", self.config.migrations_dir, context)
    }

    /// `ef migrations add <name> --context <ctx> --output-dir Migrations/<ctx> --project <descriptor>`
    pub fn add_migration_args(
        &self,
        name: &str,
        context: &str,
        descriptor: &Path,
    ) -> Vec<OsString> {
        let mut args = self.ef_prefix();
        args.extend([
            "migrations".into(),
            "add".into(),
            name.into(),
            "--context".into(),
            context.into(),
            "--output-dir".into(),
            self.output_dir(context).into(),
            "--project".into(),
            descriptor.as_os_str().to_os_string(),
        ]);
        args
    }

    /// `ef database update --context <ctx> --project <descriptor>`
    pub fn database_update_args(&self, context: &str, descriptor: &Path) -> Vec<OsString> {
        let mut args = self.ef_prefix();
        args.extend([
            "database".into(),
            "update".into(),
            "--context".into(),
            context.into(),
            "--project".into(),
            descriptor.as_os_str().to_os_string(),
        ]);
        args
    }

    /// `ef --version`, used to check the EF tool is installed.
    pub fn ef_version_args(&self) -> Vec<OsString> {
        let mut args = self.ef_prefix();
        args.push("--version".into());
        args
    }
}

impl Default for Toolchain {
    fn default() -> Self {
        Self::new(ToolchainConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_args() {
        let toolchain = Toolchain::default();
        assert_eq!(
            toolchain.build_args(Path::new("/src/Orders.Infrastructure/Orders.csproj")),
            vec!["build", "/src/Orders.Infrastructure/Orders.csproj"]
        );
    }

    #[test]
    fn test_add_migration_args() {
        let toolchain = Toolchain::default();
        let args = toolchain.add_migration_args(
            "01JGCYYR8FG39DH4D88VB13BXA",
            "OrdersDbContext",
            Path::new("/src/Orders.csproj"),
        );
        assert_eq!(
            args,
            vec![
                "ef",
                "migrations",
                "add",
                "01JGCYYR8FG39DH4D88VB13BXA",
                "--context",
                "OrdersDbContext",
                "--output-dir",
                "Migrations/OrdersDbContext",
                "--project",
                "/src/Orders.csproj",
            ]
        );
    }

    #[test]
    fn test_database_update_args() {
        let toolchain = Toolchain::default();
        let args =
            toolchain.database_update_args("BookingsDbContext", Path::new("/src/Bookings.csproj"));
        assert_eq!(
            args,
            vec![
                "ef",
                "database",
                "update",
                "--context",
                "BookingsDbContext",
                "--project",
                "/src/Bookings.csproj",
            ]
        );
    }

    #[test]
    fn test_custom_ef_prefix_and_migrations_dir() {
        let toolchain = Toolchain::new(ToolchainConfig {
            program: "dotnet".to_string(),
            ef_subcommand: vec!["tool".to_string(), "run".to_string(), "dotnet-ef".to_string()],
            migrations_dir: "Data/Migrations".to_string(),
        });
        let args = toolchain.add_migration_args("N", "C", Path::new("p.csproj"));
        assert_eq!(&args[..5], &["tool", "run", "dotnet-ef", "migrations", "add"]);
        assert!(args.iter().any(|arg| arg == "Data/Migrations/C"));
        assert_eq!(toolchain.ef_version_args(), vec!["tool", "run", "dotnet-ef", "--version"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_descriptor_is_passed_unchanged() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let raw = OsStr::from_bytes(b"/src/Ord\xffers.Infrastructure/Orders.csproj");
        let descriptor = Path::new(raw);
        let toolchain = Toolchain::default();

        assert_eq!(toolchain.build_args(descriptor)[1], raw);
        assert_eq!(
            toolchain
                .database_update_args("OrdersDbContext", descriptor)
                .last()
                .unwrap(),
            raw
        );
        assert_eq!(
            toolchain
                .add_migration_args("N", "OrdersDbContext", descriptor)
                .last()
                .unwrap()
                .as_bytes(),
            raw.as_bytes()
        );
    }
}
