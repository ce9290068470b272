//! list command - list triggers

use super::CommandContext;
use crate::utils::{format_datetime, parse_table_ref};
use anyhow::Result;
use cdc_webhook_core::types::TriggerDefinition;
use colored::Colorize;
use serde::Serialize;

#[derive(Serialize)]
struct TriggerInfo {
    schema: String,
    table: String,
    name: String,
    timing: String,
    operations: Vec<String>,
    security: String,
    cancel_on_failure: bool,
    created_at: String,
}

impl From<&TriggerDefinition> for TriggerInfo {
    fn from(definition: &TriggerDefinition) -> Self {
        Self {
            schema: definition.id.schema.clone(),
            table: definition.id.table.clone(),
            name: definition.id.name.clone(),
            timing: definition.timing.to_string(),
            operations: definition
                .operations
                .iter()
                .map(|op| op.to_string())
                .collect(),
            security: definition.security().to_string(),
            cancel_on_failure: definition.cancel_on_failure,
            created_at: format_datetime(&definition.created_at),
        }
    }
}

pub async fn execute(ctx: &CommandContext, table: Option<&str>) -> Result<()> {
    let triggers = match table {
        Some(table) => {
            let (schema, table) = parse_table_ref(table, ctx.default_schema())?;
            ctx.registry().list(&schema, &table).await?
        }
        None => ctx.registry().list_all().await?,
    };

    let infos: Vec<TriggerInfo> = triggers.iter().map(TriggerInfo::from).collect();

    if ctx.is_json() {
        return ctx.print_json(&infos);
    }

    if infos.is_empty() {
        ctx.info("No triggers registered");
        return Ok(());
    }

    for info in &infos {
        println!(
            "{}  {}.{}.{}  {} {}  {}{}",
            info.created_at.dimmed(),
            info.schema,
            info.table,
            info.name.bold(),
            info.timing,
            info.operations.join("|"),
            info.security,
            if info.cancel_on_failure {
                "  cancel_on_failure".yellow().to_string()
            } else {
                String::new()
            }
        );
    }

    Ok(())
}
