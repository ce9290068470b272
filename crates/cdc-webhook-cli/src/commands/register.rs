//! register command - validate and store a trigger

use super::CommandContext;
use crate::utils::{parse_headers, parse_table_ref};
use anyhow::{Context, Result};
use cdc_webhook_core::types::CreateTrigger;
use clap::Args;
use colored::Colorize;

#[derive(Args)]
pub struct RegisterArgs {
    /// Read the whole registration from a JSON file instead of flags
    #[arg(long, conflicts_with_all = ["name", "table", "operations", "url"])]
    pub from_json: Option<String>,

    /// Trigger name
    #[arg(long, required_unless_present = "from_json")]
    pub name: Option<String>,

    /// Table as [schema.]table
    #[arg(long, required_unless_present = "from_json")]
    pub table: Option<String>,

    /// Operations to watch (INSERT, UPDATE, DELETE)
    #[arg(long, value_delimiter = ',', required_unless_present = "from_json")]
    pub operations: Vec<String>,

    /// Webhook URL
    #[arg(long, required_unless_present = "from_json")]
    pub url: Option<String>,

    /// Header as "Name: value" (repeatable)
    #[arg(long = "header", short = 'H')]
    pub headers: Vec<String>,

    /// Columns whose change fires an UPDATE (default: any column)
    #[arg(long, value_delimiter = ',')]
    pub update_columns: Vec<String>,

    /// Per-attempt timeout in milliseconds
    #[arg(long, allow_negative_numbers = true)]
    pub timeout_ms: Option<i64>,

    /// Abort the writing transaction when delivery fails
    #[arg(long)]
    pub cancel_on_failure: bool,

    /// BEFORE or AFTER
    #[arg(long)]
    pub timing: Option<String>,

    /// Retries after the first attempt
    #[arg(long, allow_negative_numbers = true)]
    pub retry_number: Option<i64>,

    /// Base wait between attempts in milliseconds
    #[arg(long, allow_negative_numbers = true)]
    pub retry_interval_ms: Option<i64>,

    /// LINEAR or EXPONENTIAL
    #[arg(long)]
    pub retry_backoff: Option<String>,

    /// NONE or PRIVATE
    #[arg(long)]
    pub security: Option<String>,
}

impl RegisterArgs {
    fn into_request(self, default_schema: &str) -> Result<CreateTrigger> {
        if let Some(path) = &self.from_json {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path))?;
            return serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path));
        }

        let (schema, table) = parse_table_ref(self.table.as_deref().unwrap_or_default(), default_schema)?;
        let mut request = CreateTrigger::new(
            self.name.unwrap_or_default(),
            table,
            self.operations,
            self.url.unwrap_or_default(),
        )
        .schema(schema)
        .update_columns(self.update_columns)
        .cancel_on_failure(self.cancel_on_failure);
        request.headers = parse_headers(&self.headers)?;
        request.timeout_ms = self.timeout_ms;
        request.trigger_timing = self.timing;
        request.retry_number = self.retry_number;
        request.retry_interval_ms = self.retry_interval_ms;
        request.retry_backoff = self.retry_backoff;
        request.security = self.security;

        Ok(request)
    }
}

pub async fn execute(ctx: &CommandContext, args: RegisterArgs) -> Result<()> {
    let request = args.into_request(ctx.default_schema())?;
    let definition = ctx.registry().register(request).await?;

    if ctx.is_json() {
        // PRIVATE definitions serialize without their endpoint
        return ctx.print_json(&definition);
    }

    ctx.info(&format!(
        "{}: {} (security {})",
        "register".green(),
        definition.id,
        definition.security()
    ));
    Ok(())
}
