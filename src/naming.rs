// ABOUTME: Generates names for new migration steps
// ABOUTME: Monotonic ULIDs keep names unique and sortable by creation time

use anyhow::{anyhow, Result};
use ulid::Generator;

/// Source of unique, time-sortable migration names.
pub trait MigrationNamer {
    fn next_name(&mut self) -> Result<String>;
}

/// ULID-based namer.
///
/// Uses a monotonic generator so names created within the same millisecond
/// still sort in creation order.
pub struct UlidNamer {
    generator: Generator,
}

impl UlidNamer {
    pub fn new() -> Self {
        Self {
            generator: Generator::new(),
        }
    }
}

impl Default for UlidNamer {
    fn default() -> Self {
        Self::new()
    }
}

impl MigrationNamer for UlidNamer {
    fn next_name(&mut self) -> Result<String> {
        let ulid = self
            .generator
            .generate()
            .map_err(|e| anyhow!("Failed to generate migration name: {}", e))?;
        Ok(ulid.to_string())
    }
}
