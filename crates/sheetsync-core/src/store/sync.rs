//! Reduction of backend-delivered state
//!
//! Snapshots replace every synchronized collection wholesale; patches fold
//! their ops through the state strictly in array order.

use super::collection::OrderedCollection;
use super::AppState;
use crate::models::{RollLogEntry, RollStatus};
use crate::sync::{AppSnapshot, PatchOp};

pub(super) fn apply_snapshot(state: &mut AppState, snapshot: AppSnapshot) {
    state.templates = OrderedCollection::from_vec(snapshot.templates);
    state.instances = OrderedCollection::from_vec(snapshot.instances);
    state.encounters = OrderedCollection::from_vec(snapshot.encounters);
    state.roll_log = snapshot.roll_log;
    state.active_sheet_id = snapshot.active_sheet_id;

    let instances = &state.instances;
    state.scratch.retain_sheets(|sheet_id| instances.contains(sheet_id));
    if let Some(ref entered) = state.player_console_sheet_id {
        if !state.instances.contains(entered) {
            state.player_console_sheet_id = None;
        }
    }
}

pub(super) fn apply_patch(state: &mut AppState, ops: Vec<PatchOp>) {
    for op in ops {
        apply_op(state, op);
    }
}

fn apply_op(state: &mut AppState, op: PatchOp) {
    match op {
        PatchOp::UpsertTemplate(template) => {
            state.templates.upsert(template);
        }
        PatchOp::RemoveTemplate(target) => {
            state.templates.remove(&target.id);
        }
        PatchOp::UpsertInstance(instance) => {
            state.instances.upsert(instance);
        }
        PatchOp::RemoveInstance(target) => {
            state.instances.remove(&target.id);
            if state.active_sheet_id.as_deref() == Some(target.id.as_str()) {
                state.active_sheet_id = state.instances.first_id().map(str::to_string);
            }
            if state.player_console_sheet_id.as_deref() == Some(target.id.as_str()) {
                state.player_console_sheet_id = None;
            }
            state.scratch.forget_sheet(&target.id);
        }
        PatchOp::UpsertEncounter(encounter) => {
            state.encounters.upsert(encounter);
        }
        PatchOp::RemoveEncounter(target) => {
            state.encounters.remove(&target.id);
        }
        PatchOp::SetActiveSheet(target) => {
            state.active_sheet_id = target.sheet_id;
        }
        PatchOp::AddRollLog(entry) => add_roll(&mut state.roll_log, entry),
        PatchOp::UpdateRollLog(update) => {
            if let Some(existing) = state.roll_log.iter_mut().find(|e| e.id == update.id) {
                existing.merge(&update);
            }
        }
    }
}

/// Prepend an authoritative entry, or replace the entry it supersedes in place.
///
/// An entry supersedes one with the same id, or a local placeholder (pending,
/// or failed after a timeout) carrying the same originating intent id.
fn add_roll(roll_log: &mut Vec<RollLogEntry>, entry: RollLogEntry) {
    let superseded = roll_log.iter().position(|existing| {
        existing.id == entry.id
            || (matches!(existing.status, RollStatus::Pending | RollStatus::Failed)
                && existing.intent_id.is_some()
                && existing.intent_id == entry.intent_id)
    });

    match superseded {
        Some(position) => roll_log[position] = entry,
        None => roll_log.insert(0, entry),
    }
}

pub(super) fn optimistic_add_roll(state: &mut AppState, entry: RollLogEntry) {
    state.roll_log.insert(0, entry);
}

pub(super) fn fail_optimistic_roll(state: &mut AppState, intent_id: &str, error: String) {
    let pending = state.roll_log.iter_mut().find(|entry| {
        entry.status == RollStatus::Pending && entry.intent_id.as_deref() == Some(intent_id)
    });
    if let Some(entry) = pending {
        entry.status = RollStatus::Failed;
        entry.error = Some(error);
    }
}
