//! Roll command handlers

use anyhow::{bail, Result};

use sheetsync_core::models::RollVisibility;
use sheetsync_core::{Config, RollRequest, StatKey, SyncClient};

use crate::output::Output;

/// Show the roll log
pub fn list(client: &SyncClient, output: &Output) -> Result<()> {
    output.print_rolls(&client.state().roll_log);
    Ok(())
}

/// Roll against a stat on the given sheet, or on the active one
pub async fn roll(
    client: &mut SyncClient,
    stat: StatKey,
    sheet: Option<String>,
    context: String,
    hidden: bool,
    config: &Config,
    output: &Output,
) -> Result<()> {
    let Some(sheet_id) = sheet.or_else(|| client.state().active_sheet_id.clone()) else {
        bail!("No active sheet. Pass --sheet or run `sheetsync activate <id>` first");
    };
    if !client.state().instances.contains(&sheet_id) {
        bail!("Instance not found: {}", sheet_id);
    }

    let request = RollRequest {
        sheet_id,
        stat,
        context,
        visibility: if hidden {
            RollVisibility::Hidden
        } else {
            RollVisibility::Visible
        },
    };

    let intent_id = client.submit_roll(request);
    super::report(client, &intent_id, config, output).await?;

    if let Some(entry) = client
        .state()
        .roll_log
        .iter()
        .find(|entry| entry.intent_id.as_deref() == Some(intent_id.as_str()))
    {
        if let Some(ref result) = entry.result_text {
            output.message(result);
        }
    }

    Ok(())
}
