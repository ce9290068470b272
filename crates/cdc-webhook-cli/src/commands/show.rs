//! show command - print the inspectable definition of a trigger

use super::CommandContext;
use crate::utils::parse_trigger_ref;
use anyhow::Result;
use serde::Serialize;

#[derive(Serialize)]
struct ShowResult {
    trigger: String,
    ddl: String,
}

pub async fn execute(ctx: &CommandContext, trigger: &str) -> Result<()> {
    let id = parse_trigger_ref(trigger, ctx.default_schema())?;

    let Some(ddl) = ctx.registry().inspect(&id).await? else {
        anyhow::bail!("Trigger not found: {}", id);
    };

    if ctx.is_json() {
        return ctx.print_json(&ShowResult {
            trigger: id.to_string(),
            ddl,
        });
    }

    println!("{}", ddl);
    Ok(())
}
