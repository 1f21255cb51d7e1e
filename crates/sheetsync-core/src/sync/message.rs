//! Sync protocol message types
//!
//! Intents flow from the client to the backend, events flow back. Both travel
//! as JSON text frames on the socket transport and by value on the simulated
//! backend.

use serde::{Deserialize, Serialize};

use crate::models::{
    EncounterPreset, RollLogEntry, RollLogUpdate, RollRequest, Role, SheetInstance, SheetTemplate,
    TemplateChanges,
};

/// Correlation id assigned by the client to every intent
pub type IntentId = String;

/// A client-originated request for the backend to change state
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Intent {
    #[serde(rename = "intentId")]
    pub intent_id: IntentId,
    #[serde(flatten)]
    pub body: IntentBody,
}

/// Intent type and payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum IntentBody {
    /// Forward a GM credential; the backend decides whether it is valid
    AuthenticateGm { password: String },

    CreateTemplate { template: SheetTemplate },

    UpdateTemplate {
        #[serde(rename = "templateId")]
        template_id: String,
        changes: TemplateChanges,
    },

    /// Spawn `count` instances (at least one) of a template
    InstantiateTemplate {
        #[serde(rename = "templateId")]
        template_id: String,
        count: u32,
    },

    SaveEncounter { encounter: EncounterPreset },

    SpawnEncounter {
        #[serde(rename = "encounterId")]
        encounter_id: String,
    },

    SubmitRoll {
        request: RollRequest,
        #[serde(rename = "requestedByRole")]
        requested_by_role: Role,
    },

    SetActiveSheet {
        #[serde(rename = "sheetId")]
        sheet_id: Option<String>,
    },

    RemoveInstance {
        #[serde(rename = "instanceId")]
        instance_id: String,
    },
}

impl IntentBody {
    /// Human-readable label used in feedback messages
    pub fn label(&self) -> String {
        match self {
            IntentBody::AuthenticateGm { .. } => "GM authentication".to_string(),
            IntentBody::CreateTemplate { template } => {
                format!("Template create: {}", template.name)
            }
            IntentBody::UpdateTemplate { .. } => "Template update".to_string(),
            IntentBody::InstantiateTemplate { .. } => "Template spawn".to_string(),
            IntentBody::SaveEncounter { encounter } => {
                format!("Encounter save: {}", encounter.name)
            }
            IntentBody::SpawnEncounter { .. } => "Encounter spawn".to_string(),
            IntentBody::SubmitRoll { request, .. } => format!("Roll: {}", request.stat.as_str()),
            IntentBody::SetActiveSheet { .. } => "Active sheet change".to_string(),
            IntentBody::RemoveInstance { .. } => "Instance remove".to_string(),
        }
    }
}

impl Intent {
    pub fn new(intent_id: impl Into<IntentId>, body: IntentBody) -> Self {
        Self {
            intent_id: intent_id.into(),
            body,
        }
    }

    pub fn authenticate_gm(intent_id: impl Into<IntentId>, password: impl Into<String>) -> Self {
        Self::new(
            intent_id,
            IntentBody::AuthenticateGm {
                password: password.into(),
            },
        )
    }

    pub fn create_template(intent_id: impl Into<IntentId>, template: SheetTemplate) -> Self {
        Self::new(intent_id, IntentBody::CreateTemplate { template })
    }

    pub fn update_template(
        intent_id: impl Into<IntentId>,
        template_id: impl Into<String>,
        changes: TemplateChanges,
    ) -> Self {
        Self::new(
            intent_id,
            IntentBody::UpdateTemplate {
                template_id: template_id.into(),
                changes,
            },
        )
    }

    /// Create an instantiate intent; `count` is clamped to at least 1
    pub fn instantiate_template(
        intent_id: impl Into<IntentId>,
        template_id: impl Into<String>,
        count: u32,
    ) -> Self {
        Self::new(
            intent_id,
            IntentBody::InstantiateTemplate {
                template_id: template_id.into(),
                count: count.max(1),
            },
        )
    }

    pub fn save_encounter(intent_id: impl Into<IntentId>, encounter: EncounterPreset) -> Self {
        Self::new(intent_id, IntentBody::SaveEncounter { encounter })
    }

    pub fn spawn_encounter(
        intent_id: impl Into<IntentId>,
        encounter_id: impl Into<String>,
    ) -> Self {
        Self::new(
            intent_id,
            IntentBody::SpawnEncounter {
                encounter_id: encounter_id.into(),
            },
        )
    }

    pub fn submit_roll(intent_id: impl Into<IntentId>, request: RollRequest, role: Role) -> Self {
        Self::new(
            intent_id,
            IntentBody::SubmitRoll {
                request,
                requested_by_role: role,
            },
        )
    }

    pub fn set_active_sheet(intent_id: impl Into<IntentId>, sheet_id: Option<String>) -> Self {
        Self::new(intent_id, IntentBody::SetActiveSheet { sheet_id })
    }

    pub fn remove_instance(intent_id: impl Into<IntentId>, instance_id: impl Into<String>) -> Self {
        Self::new(
            intent_id,
            IntentBody::RemoveInstance {
                instance_id: instance_id.into(),
            },
        )
    }

    /// Encode as a JSON text frame
    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Decode from a JSON text frame
    pub fn decode(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

/// Reference to an entity by id (payload of the `remove_*` ops)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntityRef {
    pub id: String,
}

impl EntityRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Payload of the `set_active_sheet` op
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActiveSheetRef {
    #[serde(rename = "sheetId")]
    pub sheet_id: Option<String>,
}

/// One incremental, self-contained mutation to a single collection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
pub enum PatchOp {
    UpsertTemplate(SheetTemplate),
    RemoveTemplate(EntityRef),
    UpsertInstance(SheetInstance),
    RemoveInstance(EntityRef),
    UpsertEncounter(EncounterPreset),
    RemoveEncounter(EntityRef),
    SetActiveSheet(ActiveSheetRef),
    AddRollLog(RollLogEntry),
    UpdateRollLog(RollLogUpdate),
}

/// Complete replacement of all synchronized state
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppSnapshot {
    #[serde(default)]
    pub templates: Vec<SheetTemplate>,
    #[serde(default)]
    pub instances: Vec<SheetInstance>,
    #[serde(default)]
    pub encounters: Vec<EncounterPreset>,
    #[serde(default)]
    pub roll_log: Vec<RollLogEntry>,
    #[serde(default)]
    pub active_sheet_id: Option<String>,
}

/// Backend-originated notification
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    Snapshot { snapshot: AppSnapshot },

    Patch {
        #[serde(
            rename = "requestId",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        request_id: Option<IntentId>,
        ops: Vec<PatchOp>,
    },

    Ack {
        #[serde(rename = "requestId")]
        request_id: IntentId,
    },

    /// Untagged (no request id) errors are transport-level failures
    Error {
        #[serde(
            rename = "requestId",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        request_id: Option<IntentId>,
        message: String,
    },
}

impl ServerEvent {
    pub fn patch(request_id: impl Into<IntentId>, ops: Vec<PatchOp>) -> Self {
        ServerEvent::Patch {
            request_id: Some(request_id.into()),
            ops,
        }
    }

    pub fn ack(request_id: impl Into<IntentId>) -> Self {
        ServerEvent::Ack {
            request_id: request_id.into(),
        }
    }

    /// Correlated error
    pub fn rejected(request_id: impl Into<IntentId>, message: impl Into<String>) -> Self {
        ServerEvent::Error {
            request_id: Some(request_id.into()),
            message: message.into(),
        }
    }

    /// Transport-level error with no correlation id
    pub fn transport_error(message: impl Into<String>) -> Self {
        ServerEvent::Error {
            request_id: None,
            message: message.into(),
        }
    }

    /// Correlation id, if the event carries one
    pub fn request_id(&self) -> Option<&str> {
        match self {
            ServerEvent::Snapshot { .. } => None,
            ServerEvent::Patch { request_id, .. } | ServerEvent::Error { request_id, .. } => {
                request_id.as_deref()
            }
            ServerEvent::Ack { request_id } => Some(request_id),
        }
    }

    /// Encode as a JSON text frame
    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Decode from a JSON text frame
    pub fn decode(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}
