//! Local scratch state
//!
//! Per-sheet notes, equipment, active weapon and stat overrides. Held only on
//! the client and never sent to the backend.

use std::collections::HashMap;

use crate::models::{SheetInventoryItem, StatMap};

#[derive(Debug, Clone, Default)]
pub struct ScratchState {
    pub notes: HashMap<String, String>,
    pub equipment: HashMap<String, Vec<SheetInventoryItem>>,
    /// Inventory entry id of the active weapon per sheet
    pub active_weapon: HashMap<String, String>,
    pub stat_overrides: HashMap<String, StatMap>,
}

impl ScratchState {
    pub fn set_note(&mut self, sheet_id: &str, note: String) {
        self.notes.insert(sheet_id.to_string(), note);
    }

    pub fn add_equipment(&mut self, sheet_id: &str, entry: SheetInventoryItem) {
        self.equipment
            .entry(sheet_id.to_string())
            .or_default()
            .push(entry);
    }

    /// Remove an inventory entry, clearing the active weapon if it pointed there
    pub fn remove_equipment(&mut self, sheet_id: &str, inventory_item_id: &str) {
        if let Some(entries) = self.equipment.get_mut(sheet_id) {
            entries.retain(|entry| entry.id != inventory_item_id);
        }
        if self.active_weapon.get(sheet_id).map(String::as_str) == Some(inventory_item_id) {
            self.active_weapon.remove(sheet_id);
        }
    }

    pub fn set_active_weapon(&mut self, sheet_id: &str, inventory_item_id: Option<String>) {
        match inventory_item_id {
            Some(id) => {
                self.active_weapon.insert(sheet_id.to_string(), id);
            }
            None => {
                self.active_weapon.remove(sheet_id);
            }
        }
    }

    /// Replace the overrides for a sheet. Non-finite values are dropped.
    pub fn set_stat_overrides(&mut self, sheet_id: &str, overrides: StatMap) {
        let sanitized: StatMap = overrides
            .into_iter()
            .filter(|(_, value)| value.is_finite())
            .collect();
        self.stat_overrides.insert(sheet_id.to_string(), sanitized);
    }

    pub fn clear_stat_overrides(&mut self, sheet_id: &str) {
        self.stat_overrides.remove(sheet_id);
    }

    /// Drop everything held for a sheet
    pub fn forget_sheet(&mut self, sheet_id: &str) {
        self.notes.remove(sheet_id);
        self.equipment.remove(sheet_id);
        self.active_weapon.remove(sheet_id);
        self.stat_overrides.remove(sheet_id);
    }

    /// Keep only sheets for which `keep` returns true
    pub fn retain_sheets(&mut self, keep: impl Fn(&str) -> bool) {
        self.notes.retain(|id, _| keep(id));
        self.equipment.retain(|id, _| keep(id));
        self.active_weapon.retain(|id, _| keep(id));
        self.stat_overrides.retain(|id, _| keep(id));
    }

    /// Prune inventory entries referencing a deleted item template
    pub fn prune_item_template(&mut self, item_template_id: &str) {
        for entries in self.equipment.values_mut() {
            entries.retain(|entry| entry.item_template_id != item_template_id);
        }

        let equipment = &self.equipment;
        self.active_weapon.retain(|sheet_id, inventory_id| {
            equipment
                .get(sheet_id)
                .is_some_and(|entries| entries.iter().any(|entry| &entry.id == inventory_id))
        });
    }
}
