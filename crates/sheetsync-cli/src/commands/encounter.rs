//! Encounter command handlers

use anyhow::{bail, Context, Result};

use sheetsync_core::models::EncounterEntry;
use sheetsync_core::{Config, EncounterPreset, IdSource, IntentBody, RandomIds, SyncClient};

use crate::output::Output;

/// List encounter presets
pub fn list(client: &SyncClient, output: &Output) -> Result<()> {
    let encounters: Vec<&EncounterPreset> = client.state().encounters.iter().collect();
    output.print_encounters(&encounters);
    Ok(())
}

/// Save an encounter preset
pub async fn save(
    client: &mut SyncClient,
    name: String,
    id: Option<String>,
    entries: Vec<String>,
    config: &Config,
    output: &Output,
) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        bail!("Encounter name cannot be empty");
    }

    let id = id.unwrap_or_else(|| RandomIds.next_id("encounter"));
    let mut encounter = EncounterPreset::new(id, name);
    encounter.entries = entries
        .iter()
        .map(|entry| parse_entry(entry))
        .collect::<Result<Vec<_>>>()?;

    let intent = client.new_intent(IntentBody::SaveEncounter { encounter });
    super::send_and_report(client, intent, config, output).await
}

/// Spawn every roster line of a preset
pub async fn spawn(
    client: &mut SyncClient,
    encounter_id: String,
    config: &Config,
    output: &Output,
) -> Result<()> {
    let intent = client.new_intent(IntentBody::SpawnEncounter { encounter_id });
    super::send_and_report(client, intent, config, output).await
}

/// Parse `template_id[:count]`; the count defaults to 1
pub fn parse_entry(entry: &str) -> Result<EncounterEntry> {
    let (template_id, count) = match entry.rsplit_once(':') {
        Some((template_id, count)) => {
            let count: u32 = count
                .trim()
                .parse()
                .with_context(|| format!("Invalid count in roster entry '{}'", entry))?;
            (template_id.trim(), count)
        }
        None => (entry.trim(), 1),
    };

    if template_id.is_empty() {
        bail!("Roster entry '{}' has no template id", entry);
    }
    if count == 0 {
        bail!("Roster entry '{}' must spawn at least one instance", entry);
    }

    Ok(EncounterEntry {
        template_id: template_id.to_string(),
        count,
    })
}
