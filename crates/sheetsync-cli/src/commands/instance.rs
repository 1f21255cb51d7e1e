//! Instance command handlers

use anyhow::Result;

use sheetsync_core::{Config, IntentBody, SheetInstance, SyncClient};

use crate::output::Output;

/// List all instances in presentation order
pub fn list(client: &SyncClient, output: &Output) -> Result<()> {
    let state = client.state();
    let instances: Vec<&SheetInstance> = state.instances.iter().collect();
    output.print_instances(&instances, state.active_sheet_id.as_deref());
    Ok(())
}

/// Focus an instance, or clear the focus
pub async fn activate(
    client: &mut SyncClient,
    sheet_id: Option<String>,
    config: &Config,
    output: &Output,
) -> Result<()> {
    let intent = client.new_intent(IntentBody::SetActiveSheet { sheet_id });
    super::send_and_report(client, intent, config, output).await
}

/// Remove an instance
pub async fn remove(
    client: &mut SyncClient,
    instance_id: String,
    config: &Config,
    output: &Output,
) -> Result<()> {
    let intent = client.new_intent(IntentBody::RemoveInstance { instance_id });
    super::send_and_report(client, intent, config, output).await
}
