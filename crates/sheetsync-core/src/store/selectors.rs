//! Read-side helpers over [`AppState`]
//!
//! Everything here is a pure function of the state; nothing is cached.

use serde::Serialize;

use super::AppState;
use crate::models::{ItemTemplate, SheetInstance, SheetKind, SheetTemplate, StatMap};

/// Label shown when a sheet has no active weapon
pub const NO_WEAPON_LABEL: &str = "None";

/// Everything the console needs to render one sheet
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetDetail<'a> {
    pub instance: &'a SheetInstance,
    pub template: Option<&'a SheetTemplate>,
    /// Template stats with local overrides applied
    pub stats: StatMap,
    pub note: Option<&'a str>,
    pub active_weapon: String,
}

/// Detail for one instance, if it exists
pub fn sheet_detail<'a>(state: &'a AppState, sheet_id: &str) -> Option<SheetDetail<'a>> {
    let instance = state.instances.get(sheet_id)?;
    let template = state.templates.get(&instance.template_id);

    let mut stats = template.map(|t| t.stats.clone()).unwrap_or_default();
    if let Some(overrides) = state.scratch.stat_overrides.get(sheet_id) {
        stats.extend(overrides.iter().map(|(key, value)| (*key, *value)));
    }

    Some(SheetDetail {
        instance,
        template,
        stats,
        note: state.scratch.notes.get(sheet_id).map(String::as_str),
        active_weapon: active_weapon_label(state, sheet_id),
    })
}

/// Detail for the focused instance
pub fn active_sheet_detail(state: &AppState) -> Option<SheetDetail<'_>> {
    let sheet_id = state.active_sheet_id.as_deref()?;
    sheet_detail(state, sheet_id)
}

/// Player instances in presentation order
pub fn player_instances(state: &AppState) -> Vec<&SheetInstance> {
    state
        .instances
        .iter()
        .filter(|instance| instance.kind == SheetKind::Player)
        .collect()
}

/// Templates whose name or any tag contains the current search text (case-insensitive)
pub fn search_templates(state: &AppState) -> Vec<&SheetTemplate> {
    let needle = state.template_search.trim().to_lowercase();
    state
        .templates
        .iter()
        .filter(|template| {
            needle.is_empty()
                || template.name.to_lowercase().contains(&needle)
                || template
                    .tags
                    .iter()
                    .any(|tag| tag.to_lowercase().contains(&needle))
        })
        .collect()
}

/// Catalog items on a sheet, paired with their inventory entry ids
pub fn sheet_equipment<'a>(
    state: &'a AppState,
    sheet_id: &str,
) -> Vec<(&'a str, &'a ItemTemplate)> {
    state
        .scratch
        .equipment
        .get(sheet_id)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| {
                    let item = state.item_templates.get(&entry.item_template_id)?;
                    Some((entry.id.as_str(), item))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Name of the active weapon, or "None"
pub fn active_weapon_label(state: &AppState, sheet_id: &str) -> String {
    let Some(inventory_id) = state.scratch.active_weapon.get(sheet_id) else {
        return NO_WEAPON_LABEL.to_string();
    };

    sheet_equipment(state, sheet_id)
        .into_iter()
        .find(|(entry_id, _)| entry_id == inventory_id)
        .map(|(_, item)| item.name.clone())
        .unwrap_or_else(|| NO_WEAPON_LABEL.to_string())
}
