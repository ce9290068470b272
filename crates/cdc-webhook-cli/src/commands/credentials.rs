//! credentials and rotate commands - PRIVATE trigger endpoints

use super::CommandContext;
use crate::utils::{format_datetime, parse_headers, parse_trigger_ref};
use anyhow::Result;
use cdc_webhook_core::types::WebhookEndpoint;
use colored::Colorize;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Serialize)]
struct CredentialInfo {
    trigger: String,
    webhook_url: String,
    headers: BTreeMap<String, String>,
    updated_at: String,
}

pub async fn show(ctx: &CommandContext, trigger: &str, reveal: bool) -> Result<()> {
    let id = parse_trigger_ref(trigger, ctx.default_schema())?;
    let credential = ctx.registry().credentials(&id).await?;

    let endpoint = &credential.endpoint;
    let info = CredentialInfo {
        trigger: id.to_string(),
        webhook_url: if reveal {
            endpoint.url.clone()
        } else {
            endpoint.masked_url()
        },
        headers: endpoint
            .headers
            .iter()
            .map(|(name, value)| {
                let shown = if reveal { value.clone() } else { "****".to_string() };
                (name.clone(), shown)
            })
            .collect(),
        updated_at: format_datetime(&credential.updated_at),
    };

    if ctx.is_json() {
        return ctx.print_json(&info);
    }

    println!("{}: {}", "Trigger".bold(), info.trigger);
    println!("{}: {}", "Webhook URL".bold(), info.webhook_url);
    for (name, value) in &info.headers {
        println!("{}: {}: {}", "Header".bold(), name, value);
    }
    println!("{}: {}", "Updated".bold(), info.updated_at);
    Ok(())
}

pub async fn rotate(ctx: &CommandContext, trigger: &str, url: String, headers: &[String]) -> Result<()> {
    let id = parse_trigger_ref(trigger, ctx.default_schema())?;
    let endpoint = WebhookEndpoint {
        url,
        headers: parse_headers(headers)?,
    };

    ctx.registry().rotate_credentials(&id, endpoint).await?;

    ctx.info(&format!("{}: {}", "rotate".green(), id));
    Ok(())
}
