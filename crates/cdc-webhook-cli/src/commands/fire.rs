//! fire command - deliver one hand-written row change

use super::CommandContext;
use crate::utils::{parse_row, parse_trigger_ref};
use anyhow::Result;
use cdc_webhook_core::types::{Operation, RowChange};
use cdc_webhook_engine::FiringOutcome;
use clap::Args;
use colored::Colorize;

#[derive(Args)]
pub struct FireArgs {
    /// Trigger as [schema.]table.name
    pub trigger: String,

    /// INSERT, UPDATE or DELETE
    #[arg(long)]
    pub op: String,

    /// Old row image as a JSON object (UPDATE, DELETE)
    #[arg(long)]
    pub old: Option<String>,

    /// New row image as a JSON object (INSERT, UPDATE)
    #[arg(long)]
    pub new: Option<String>,
}

pub async fn execute(ctx: &CommandContext, args: FireArgs) -> Result<()> {
    let id = parse_trigger_ref(&args.trigger, ctx.default_schema())?;
    let operation: Operation = args.op.parse()?;

    let old = args.old.as_deref().map(parse_row).transpose()?;
    let new = args.new.as_deref().map(parse_row).transpose()?;
    match operation {
        Operation::Insert if new.is_none() => anyhow::bail!("INSERT requires --new"),
        Operation::Update if old.is_none() || new.is_none() => {
            anyhow::bail!("UPDATE requires --old and --new")
        }
        Operation::Delete if old.is_none() => anyhow::bail!("DELETE requires --old"),
        _ => {}
    }
    let change = RowChange {
        operation,
        old,
        new,
    };

    match ctx.executor.fire(&id, &change).await {
        Ok(FiringOutcome::Missing) => anyhow::bail!("Trigger not found: {}", id),
        Ok(FiringOutcome::Skipped) => {
            ctx.info(&format!("{}: {} did not match", "skipped".yellow(), id));
        }
        Ok(FiringOutcome::Delivered { attempts }) => {
            ctx.info(&format!(
                "{}: {} after {} attempt(s)",
                "delivered".green(),
                id,
                attempts
            ));
        }
        Ok(FiringOutcome::Failed { attempts, cause }) => {
            ctx.info(&format!(
                "{}: {} after {} attempt(s): {}",
                "failed".red(),
                id,
                attempts,
                cause
            ));
        }
        Err(e) if e.aborts_transaction() => {
            anyhow::bail!("{} (the host transaction would be rolled back)", e);
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}
