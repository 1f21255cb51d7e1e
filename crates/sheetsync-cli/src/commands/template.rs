//! Template command handlers

use anyhow::{bail, Context, Result};

use sheetsync_core::models::{StatMap, TemplateChanges};
use sheetsync_core::store::selectors;
use sheetsync_core::{
    Action, Config, IdSource, IntentBody, RandomIds, SheetKind, SheetTemplate, StatKey, SyncClient,
};

use crate::output::Output;

/// Fields for a new template
pub struct TemplateDraft {
    pub name: String,
    pub kind: SheetKind,
    pub id: Option<String>,
    pub notes: Option<String>,
    pub stats: Vec<String>,
    pub tags: Vec<String>,
}

/// Fields to change on an existing template; empty lists leave the field alone
pub struct TemplateEdit {
    pub name: Option<String>,
    pub kind: Option<SheetKind>,
    pub notes: Option<String>,
    pub stats: Vec<String>,
    pub tags: Vec<String>,
}

/// List templates, optionally filtered by name or tag
pub fn list(client: &mut SyncClient, search: Option<String>, output: &Output) -> Result<()> {
    client.dispatch(Action::SetTemplateSearch(search.unwrap_or_default()));
    let templates = selectors::search_templates(client.state());
    output.print_templates(&templates);
    Ok(())
}

/// Create a template
pub async fn create(
    client: &mut SyncClient,
    draft: TemplateDraft,
    config: &Config,
    output: &Output,
) -> Result<()> {
    let name = draft.name.trim();
    if name.is_empty() {
        bail!("Template name cannot be empty");
    }

    let id = draft
        .id
        .unwrap_or_else(|| RandomIds.next_id("template"));
    let mut template = SheetTemplate::new(id, draft.kind, name);
    template.notes = draft.notes.unwrap_or_default();
    template.stats = parse_stats(&draft.stats)?;
    for tag in draft.tags {
        template = template.with_tag(tag);
    }

    let intent = client.new_intent(IntentBody::CreateTemplate { template });
    super::send_and_report(client, intent, config, output).await
}

/// Update a template
pub async fn update(
    client: &mut SyncClient,
    template_id: String,
    edit: TemplateEdit,
    config: &Config,
    output: &Output,
) -> Result<()> {
    let changes = TemplateChanges {
        kind: edit.kind,
        name: edit.name,
        notes: edit.notes,
        stats: if edit.stats.is_empty() {
            None
        } else {
            Some(parse_stats(&edit.stats)?)
        },
        tags: if edit.tags.is_empty() {
            None
        } else {
            Some(edit.tags)
        },
    };
    if changes.is_empty() {
        bail!("Nothing to update. Pass at least one of --name, --kind, --notes, --stat, --tag");
    }

    let intent = client.new_intent(IntentBody::UpdateTemplate {
        template_id,
        changes,
    });
    super::send_and_report(client, intent, config, output).await
}

/// Spawn instances of a template
pub async fn spawn(
    client: &mut SyncClient,
    template_id: String,
    count: u32,
    config: &Config,
    output: &Output,
) -> Result<()> {
    let intent = client.new_intent(IntentBody::InstantiateTemplate {
        template_id,
        count: count.max(1),
    });
    super::send_and_report(client, intent, config, output).await
}

/// Parse `key=value` pairs into a stat map
pub fn parse_stats(pairs: &[String]) -> Result<StatMap> {
    let mut stats = StatMap::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("Invalid stat '{}'. Expected key=value", pair);
        };
        let key: StatKey = key.parse().map_err(anyhow::Error::msg)?;
        let value: f64 = value
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for stat '{}'", key))?;
        if !value.is_finite() {
            bail!("Stat '{}' must be a finite number", key);
        }
        stats.insert(key, value);
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stats() {
        let stats = parse_stats(&[
            "strength=40".to_string(),
            "Carry Weight = 12.5".to_string(),
            "pain-tolerance=3".to_string(),
        ])
        .unwrap();

        assert_eq!(stats.get(&StatKey::Strength), Some(&40.0));
        assert_eq!(stats.get(&StatKey::CarryWeight), Some(&12.5));
        assert_eq!(stats.get(&StatKey::PainTolerance), Some(&3.0));
    }

    #[test]
    fn test_parse_stats_rejects_bad_input() {
        assert!(parse_stats(&["strength".to_string()]).is_err());
        assert!(parse_stats(&["luck=7".to_string()]).is_err());
        assert!(parse_stats(&["will=lots".to_string()]).is_err());
        assert!(parse_stats(&["will=NaN".to_string()]).is_err());
    }

    #[test]
    fn test_parse_stats_last_value_wins() {
        let stats = parse_stats(&["mana=1".to_string(), "mana=2".to_string()]).unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats.get(&StatKey::Mana), Some(&2.0));
    }
}
