//! drop command - remove a trigger and its credentials

use super::CommandContext;
use crate::utils::parse_trigger_ref;
use anyhow::Result;
use colored::Colorize;

pub async fn execute(ctx: &CommandContext, trigger: &str) -> Result<()> {
    let id = parse_trigger_ref(trigger, ctx.default_schema())?;

    if !ctx.registry().drop_trigger(&id).await? {
        anyhow::bail!("Trigger not found: {}", id);
    }

    ctx.info(&format!("{}: {}", "drop".red(), id));
    Ok(())
}
