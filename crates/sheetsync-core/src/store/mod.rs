//! Domain store
//!
//! The single source of truth for shared game state plus client-only scratch
//! data. All mutation goes through [`reduce`], a pure `(state, action) ->
//! state` function; [`Store`] owns the current state and is handed to whoever
//! needs it. There is no global instance.
//!
//! ## Usage
//!
//! ```ignore
//! let mut store = Store::new(AppState::new(TransportMode::Simulated));
//! store.dispatch(Action::SetTemplateSearch("orc".into()));
//! let templates = selectors::search_templates(store.state());
//! ```

mod collection;
mod feedback;
mod scratch;
pub mod selectors;
mod sync;

use serde::{Deserialize, Serialize};

pub use collection::OrderedCollection;
pub use feedback::{FeedbackQueue, FeedbackStatus, IntentFeedbackItem, MAX_INTENT_FEEDBACK_ITEMS};
pub use scratch::ScratchState;

use crate::config::TransportMode;
use crate::models::{
    EncounterPreset, ItemTemplate, Role, RollLogEntry, SheetInstance, SheetInventoryItem,
    SheetTemplate, StatMap,
};
use crate::sync::{AppSnapshot, PatchOp};

/// Connection status as seen by the view layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug, Clone, Default)]
pub struct ConnectionState {
    pub status: ConnectionStatus,
    pub transport: TransportMode,
    /// Connection-level error, if any
    pub error: Option<String>,
}

/// Which GM page is showing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GmView {
    #[default]
    Console,
    TemplateLibrary,
    CreateTemplate,
    EncounterPresets,
}

/// The full reduced state tree
#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub role: Option<Role>,
    pub player_console_sheet_id: Option<String>,
    pub gm_authenticated: bool,
    pub gm_view: GmView,
    pub template_search: String,
    pub connection: ConnectionState,

    pub templates: OrderedCollection<SheetTemplate>,
    pub instances: OrderedCollection<SheetInstance>,
    pub encounters: OrderedCollection<EncounterPreset>,
    /// Most recent first
    pub roll_log: Vec<RollLogEntry>,
    pub active_sheet_id: Option<String>,

    /// Intent ids sent but not yet resolved, in send order
    pub pending_intent_ids: Vec<String>,
    pub intent_feedback: FeedbackQueue,

    pub item_templates: OrderedCollection<ItemTemplate>,
    pub scratch: ScratchState,
}

impl AppState {
    pub fn new(transport: TransportMode) -> Self {
        Self {
            connection: ConnectionState {
                transport,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Seed the local item catalog
    pub fn with_item_library(mut self, items: Vec<ItemTemplate>) -> Self {
        self.item_templates = OrderedCollection::from_vec(items);
        self
    }

    pub fn is_pending(&self, intent_id: &str) -> bool {
        self.pending_intent_ids.iter().any(|id| id == intent_id)
    }
}

/// Everything that can change the state tree
#[derive(Debug, Clone)]
pub enum Action {
    // UI-local
    SetRole(Option<Role>),
    SetPlayerConsoleSheet(Option<String>),
    SetGmAuthenticated(bool),
    SetGmView(GmView),
    SetTemplateSearch(String),
    ConnectionStatus(ConnectionStatus),
    ConnectionError(Option<String>),

    // Pending intents and feedback
    QueueIntent(String),
    ClearIntent(String),
    PushIntentFeedback(IntentFeedbackItem),
    DismissIntentFeedback(String),

    // Scratch state
    SetSheetNote {
        sheet_id: String,
        note: String,
    },
    AddSheetEquipment {
        sheet_id: String,
        entry: SheetInventoryItem,
    },
    RemoveSheetEquipment {
        sheet_id: String,
        inventory_item_id: String,
    },
    SetSheetActiveWeapon {
        sheet_id: String,
        inventory_item_id: Option<String>,
    },
    /// Overrides must be finite; anything else is dropped
    SetSheetStatOverrides {
        sheet_id: String,
        overrides: StatMap,
    },
    ClearSheetStatOverrides {
        sheet_id: String,
    },

    // Item catalog
    UpsertItemTemplate(ItemTemplate),
    RemoveItemTemplate(String),

    // Sync
    ApplySnapshot(AppSnapshot),
    ApplyPatch(Vec<PatchOp>),

    // Optimistic roll log
    OptimisticAddRoll(RollLogEntry),
    FailOptimisticRoll {
        intent_id: String,
        error: String,
    },
}

/// Pure reduction: consume the current state and an action, return the next state
pub fn reduce(mut state: AppState, action: Action) -> AppState {
    match action {
        Action::SetRole(role) => {
            if role != Some(Role::Gm) {
                state.gm_view = GmView::Console;
            }
            state.role = role;
        }
        Action::SetPlayerConsoleSheet(sheet_id) => state.player_console_sheet_id = sheet_id,
        Action::SetGmAuthenticated(value) => state.gm_authenticated = value,
        Action::SetGmView(view) => state.gm_view = view,
        Action::SetTemplateSearch(value) => state.template_search = value,
        Action::ConnectionStatus(status) => state.connection.status = status,
        Action::ConnectionError(error) => state.connection.error = error,

        Action::QueueIntent(intent_id) => {
            if !state.is_pending(&intent_id) {
                state.pending_intent_ids.push(intent_id);
            }
        }
        Action::ClearIntent(intent_id) => state.pending_intent_ids.retain(|id| id != &intent_id),
        Action::PushIntentFeedback(item) => state.intent_feedback.push(item),
        Action::DismissIntentFeedback(id) => {
            state.intent_feedback.dismiss(&id);
        }

        Action::SetSheetNote { sheet_id, note } => state.scratch.set_note(&sheet_id, note),
        Action::AddSheetEquipment { sheet_id, entry } => {
            state.scratch.add_equipment(&sheet_id, entry)
        }
        Action::RemoveSheetEquipment {
            sheet_id,
            inventory_item_id,
        } => state.scratch.remove_equipment(&sheet_id, &inventory_item_id),
        Action::SetSheetActiveWeapon {
            sheet_id,
            inventory_item_id,
        } => state.scratch.set_active_weapon(&sheet_id, inventory_item_id),
        Action::SetSheetStatOverrides {
            sheet_id,
            overrides,
        } => state.scratch.set_stat_overrides(&sheet_id, overrides),
        Action::ClearSheetStatOverrides { sheet_id } => {
            state.scratch.clear_stat_overrides(&sheet_id)
        }

        Action::UpsertItemTemplate(item) => {
            state.item_templates.upsert(item);
        }
        Action::RemoveItemTemplate(item_id) => {
            state.item_templates.remove(&item_id);
            state.scratch.prune_item_template(&item_id);
        }

        Action::ApplySnapshot(snapshot) => sync::apply_snapshot(&mut state, snapshot),
        Action::ApplyPatch(ops) => sync::apply_patch(&mut state, ops),
        Action::OptimisticAddRoll(entry) => sync::optimistic_add_roll(&mut state, entry),
        Action::FailOptimisticRoll { intent_id, error } => {
            sync::fail_optimistic_roll(&mut state, &intent_id, error)
        }
    }
    state
}

/// Owner of the current state; the only way in is [`Store::dispatch`]
#[derive(Debug, Default)]
pub struct Store {
    state: AppState,
}

impl Store {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn dispatch(&mut self, action: Action) {
        let current = std::mem::take(&mut self.state);
        self.state = reduce(current, action);
    }
}
