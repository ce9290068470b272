//! CLI command implementations

pub mod credentials;
pub mod drop;
pub mod fire;
pub mod list;
pub mod register;
pub mod show;

use cdc_webhook_engine::{TriggerExecutor, TriggerRegistry};
use serde::Serialize;

use crate::OutputFormat;

/// Context passed to all commands
pub struct CommandContext {
    pub executor: TriggerExecutor,
    pub output_format: OutputFormat,
    pub quiet: bool,
}

impl CommandContext {
    pub fn registry(&self) -> &TriggerRegistry {
        self.executor.registry()
    }

    pub fn default_schema(&self) -> &str {
        self.registry().default_schema()
    }

    /// Check if output should be JSON
    pub fn is_json(&self) -> bool {
        matches!(self.output_format, OutputFormat::Json)
    }

    /// Print info message if not quiet
    pub fn info(&self, msg: &str) {
        if !self.quiet {
            println!("{}", msg);
        }
    }

    pub fn print_json<T: Serialize>(&self, value: &T) -> anyhow::Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }
}
