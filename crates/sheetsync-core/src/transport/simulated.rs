//! Simulated backend
//!
//! An in-process stand-in for the authoritative server. It owns its own copy
//! of the shared state, validates every intent synchronously and answers with
//! the same events a real backend would send: a correlated `error`, or a
//! `patch` followed by an `ack`.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use super::{EventHub, Transport, TransportError};
use crate::config::{TransportMode, DEFAULT_SIMULATED_LATENCY_MS};
use crate::ids::{IdSource, RandomIds};
use crate::models::{
    RollLogEntry, RollStatus, SheetInstance, SheetKind, SheetTemplate, StatKey, TemplateChanges,
};
use crate::sync::{ActiveSheetRef, AppSnapshot, EntityRef, Intent, IntentBody, PatchOp, ServerEvent};

const ROLL_RESULT_TEXT: &str = "Simulated result only. Awaiting authoritative resolution.";

/// Starting state: a player base template, a goblin template and one active player
pub fn seed_snapshot() -> AppSnapshot {
    let player_base = SheetTemplate {
        notes: "Starter player sheet template".to_string(),
        ..SheetTemplate::new("template_player_base", SheetKind::Player, "Player Base")
    }
    .with_stat(StatKey::Strength, 50.0)
    .with_stat(StatKey::Dexterity, 50.0)
    .with_stat(StatKey::Constitution, 50.0)
    .with_stat(StatKey::Perception, 50.0)
    .with_stat(StatKey::Arcane, 30.0)
    .with_stat(StatKey::Will, 40.0)
    .with_tag("starter");

    let goblin = SheetTemplate {
        notes: "Enemy template".to_string(),
        ..SheetTemplate::new("template_goblin", SheetKind::Enemy, "Goblin")
    }
    .with_stat(StatKey::Strength, 25.0)
    .with_stat(StatKey::Dexterity, 35.0)
    .with_stat(StatKey::Constitution, 20.0)
    .with_stat(StatKey::Perception, 25.0)
    .with_stat(StatKey::Will, 10.0)
    .with_tag("enemy")
    .with_tag("goblin");

    let player_one = SheetInstance {
        notes: "Active character".to_string(),
        ..SheetInstance::spawn("instance_player_1", &player_base, "Player One")
    };

    AppSnapshot {
        templates: vec![player_base, goblin],
        instances: vec![player_one],
        encounters: Vec::new(),
        roll_log: Vec::new(),
        active_sheet_id: Some("instance_player_1".to_string()),
    }
}

/// In-process backend used when no server is available
pub struct SimulatedBackend {
    hub: EventHub,
    snapshot: Arc<Mutex<AppSnapshot>>,
    ids: Box<dyn IdSource>,
    latency: Duration,
    pending_snapshot: Option<JoinHandle<()>>,
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedBackend {
    pub fn new() -> Self {
        Self {
            hub: EventHub::new(),
            snapshot: Arc::new(Mutex::new(seed_snapshot())),
            ids: Box::new(RandomIds),
            latency: Duration::from_millis(DEFAULT_SIMULATED_LATENCY_MS),
            pending_snapshot: None,
        }
    }

    /// Replace the seeded state
    pub fn with_snapshot(self, snapshot: AppSnapshot) -> Self {
        *lock(&self.snapshot) = snapshot;
        self
    }

    /// Use a different id source for minted instances and rolls
    pub fn with_ids(mut self, ids: Box<dyn IdSource>) -> Self {
        self.ids = ids;
        self
    }

    /// Delay before the snapshot is delivered on connect (zero: before `connect` returns)
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Copy of the backend's authoritative state
    pub fn snapshot(&self) -> AppSnapshot {
        lock(&self.snapshot).clone()
    }

    fn handle(&mut self, intent: Intent) {
        let request_id = intent.intent_id;
        debug!("Simulated backend handling {}", request_id);

        let outcome = {
            let mut snapshot = lock(&self.snapshot);
            apply_intent(&mut snapshot, self.ids.as_mut(), &request_id, intent.body)
        };

        match outcome {
            Ok(Some(ops)) => {
                self.hub.emit(ServerEvent::patch(request_id.clone(), ops));
                self.hub.emit(ServerEvent::ack(request_id));
            }
            Ok(None) => self.hub.emit(ServerEvent::ack(request_id)),
            Err(message) => self.hub.emit(ServerEvent::rejected(request_id, message)),
        }
    }
}

#[async_trait]
impl Transport for SimulatedBackend {
    fn mode(&self) -> TransportMode {
        TransportMode::Simulated
    }

    async fn connect(&mut self) -> Result<(), TransportError> {
        if let Some(task) = self.pending_snapshot.take() {
            task.abort();
        }

        if self.latency.is_zero() {
            let snapshot = self.snapshot();
            self.hub.emit(ServerEvent::Snapshot { snapshot });
            return Ok(());
        }

        let hub = self.hub.clone();
        let state = Arc::clone(&self.snapshot);
        let latency = self.latency;
        self.pending_snapshot = Some(tokio::spawn(async move {
            tokio::time::sleep(latency).await;
            let snapshot = lock(&state).clone();
            hub.emit(ServerEvent::Snapshot { snapshot });
        }));
        Ok(())
    }

    fn disconnect(&mut self) {
        if let Some(task) = self.pending_snapshot.take() {
            task.abort();
        }
        self.hub
            .emit(ServerEvent::transport_error("Simulated transport disconnected"));
    }

    fn send_intent(&mut self, intent: Intent) {
        self.handle(intent);
    }

    fn subscribe(&mut self) -> mpsc::UnboundedReceiver<ServerEvent> {
        self.hub.subscribe()
    }
}

fn lock(snapshot: &Mutex<AppSnapshot>) -> std::sync::MutexGuard<'_, AppSnapshot> {
    snapshot.lock().unwrap_or_else(|e| e.into_inner())
}

/// Validate and apply one intent.
///
/// `Ok(Some(ops))` means patch then ack, `Ok(None)` ack only, `Err` a correlated error.
fn apply_intent(
    snapshot: &mut AppSnapshot,
    ids: &mut dyn IdSource,
    request_id: &str,
    body: IntentBody,
) -> Result<Option<Vec<PatchOp>>, String> {
    let ops = match body {
        IntentBody::AuthenticateGm { password } => {
            if password.is_empty() {
                return Err("GM password cannot be empty".to_string());
            }
            return Ok(None);
        }
        IntentBody::CreateTemplate { mut template } => {
            template.updated_at = Utc::now();
            move_to_front(&mut snapshot.templates, template.clone(), |t| &t.id);
            vec![PatchOp::UpsertTemplate(template)]
        }
        IntentBody::UpdateTemplate {
            template_id,
            changes,
        } => vec![PatchOp::UpsertTemplate(update_template(
            snapshot,
            &template_id,
            &changes,
        )?)],
        IntentBody::InstantiateTemplate { template_id, count } => {
            let template = find_template(snapshot, &template_id)?;
            let mut ops = Vec::new();
            for instance in spawn_instances(&template, count, ids) {
                snapshot.instances.insert(0, instance.clone());
                snapshot.active_sheet_id = Some(instance.id.clone());
                let sheet_id = Some(instance.id.clone());
                ops.push(PatchOp::UpsertInstance(instance));
                ops.push(PatchOp::SetActiveSheet(ActiveSheetRef { sheet_id }));
            }
            ops
        }
        IntentBody::SaveEncounter { mut encounter } => {
            encounter.updated_at = Utc::now();
            move_to_front(&mut snapshot.encounters, encounter.clone(), |e| &e.id);
            vec![PatchOp::UpsertEncounter(encounter)]
        }
        IntentBody::SpawnEncounter { encounter_id } => {
            let encounter = snapshot
                .encounters
                .iter()
                .find(|e| e.id == encounter_id)
                .cloned()
                .ok_or_else(|| "Encounter not found".to_string())?;

            let mut ops = Vec::new();
            for entry in &encounter.entries {
                // Entries pointing at deleted templates are skipped
                let Ok(template) = find_template(snapshot, &entry.template_id) else {
                    continue;
                };
                for instance in spawn_instances(&template, entry.count, ids) {
                    snapshot.instances.insert(0, instance.clone());
                    ops.push(PatchOp::UpsertInstance(instance));
                }
            }
            ops
        }
        IntentBody::SubmitRoll {
            request,
            requested_by_role,
        } => {
            let mut entry = RollLogEntry::pending(ids.next_id("roll"), request, requested_by_role);
            entry.status = RollStatus::Resolved;
            entry.result_text = Some(ROLL_RESULT_TEXT.to_string());
            entry.intent_id = Some(request_id.to_string());
            snapshot.roll_log.insert(0, entry.clone());
            vec![PatchOp::AddRollLog(entry)]
        }
        IntentBody::SetActiveSheet { sheet_id } => {
            snapshot.active_sheet_id = sheet_id.clone();
            vec![PatchOp::SetActiveSheet(ActiveSheetRef { sheet_id })]
        }
        IntentBody::RemoveInstance { instance_id } => {
            let position = snapshot
                .instances
                .iter()
                .position(|i| i.id == instance_id)
                .ok_or_else(|| "Instance not found".to_string())?;
            snapshot.instances.remove(position);

            let mut ops = vec![PatchOp::RemoveInstance(EntityRef::new(instance_id.clone()))];
            if snapshot.active_sheet_id.as_deref() == Some(instance_id.as_str()) {
                let next = snapshot.instances.first().map(|i| i.id.clone());
                snapshot.active_sheet_id = next.clone();
                ops.push(PatchOp::SetActiveSheet(ActiveSheetRef { sheet_id: next }));
            }
            ops
        }
    };
    Ok(Some(ops))
}

fn find_template(snapshot: &AppSnapshot, template_id: &str) -> Result<SheetTemplate, String> {
    snapshot
        .templates
        .iter()
        .find(|t| t.id == template_id)
        .cloned()
        .ok_or_else(|| "Template not found".to_string())
}

fn update_template(
    snapshot: &mut AppSnapshot,
    template_id: &str,
    changes: &TemplateChanges,
) -> Result<SheetTemplate, String> {
    let template = snapshot
        .templates
        .iter_mut()
        .find(|t| t.id == template_id)
        .ok_or_else(|| "Template not found".to_string())?;
    template.apply_changes(changes);
    Ok(template.clone())
}

/// Mint `max(1, count)` instances, numbering names only when more than one is requested
fn spawn_instances(
    template: &SheetTemplate,
    count: u32,
    ids: &mut dyn IdSource,
) -> Vec<SheetInstance> {
    let amount = count.max(1);
    (1..=amount)
        .map(|n| {
            let name = if count > 1 {
                format!("{} {}", template.name, n)
            } else {
                template.name.clone()
            };
            SheetInstance::spawn(ids.next_id("instance"), template, name)
        })
        .collect()
}

fn move_to_front<T>(list: &mut Vec<T>, value: T, id: impl Fn(&T) -> &String) {
    let value_id = id(&value).clone();
    list.retain(|existing| id(existing) != &value_id);
    list.insert(0, value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SequentialIds;
    use crate::models::{EncounterPreset, Role, RollRequest, RollVisibility};

    fn backend() -> (SimulatedBackend, mpsc::UnboundedReceiver<ServerEvent>) {
        let mut backend = SimulatedBackend::new()
            .with_ids(Box::new(SequentialIds::new()))
            .with_latency(Duration::ZERO);
        let rx = backend.subscribe();
        (backend, rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<ServerEvent>) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_zero_latency_connect_emits_seed_snapshot() {
        let (mut backend, mut rx) = backend();
        backend.connect().await.unwrap();

        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        let ServerEvent::Snapshot { snapshot } = &events[0] else {
            panic!("expected snapshot, got {:?}", events[0]);
        };
        let template_ids: Vec<&str> = snapshot.templates.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(template_ids, vec!["template_player_base", "template_goblin"]);
        assert_eq!(snapshot.active_sheet_id.as_deref(), Some("instance_player_1"));
        assert_eq!(snapshot.templates[1].stats.get(&StatKey::Will), Some(&10.0));
    }

    #[tokio::test]
    async fn test_latency_delays_snapshot() {
        let mut backend = SimulatedBackend::new().with_latency(Duration::from_millis(20));
        let mut rx = backend.subscribe();
        backend.connect().await.unwrap();
        assert!(rx.try_recv().is_err());

        let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(event, ServerEvent::Snapshot { .. }));
    }

    #[test]
    fn test_create_template_patches_then_acks() {
        let (mut backend, mut rx) = backend();
        let template = SheetTemplate::new("t1", SheetKind::Enemy, "Orc");
        backend.send_intent(Intent::create_template("t1-intent", template));

        let events = drain(&mut rx);
        assert_eq!(events.len(), 2);
        match &events[0] {
            ServerEvent::Patch { request_id, ops } => {
                assert_eq!(request_id.as_deref(), Some("t1-intent"));
                assert!(matches!(&ops[..], [PatchOp::UpsertTemplate(t)] if t.id == "t1"));
            }
            other => panic!("expected patch, got {:?}", other),
        }
        assert_eq!(events[1], ServerEvent::ack("t1-intent"));
        assert_eq!(backend.snapshot().templates[0].id, "t1");
    }

    #[test]
    fn test_empty_gm_password_is_rejected() {
        let (mut backend, mut rx) = backend();
        backend.send_intent(Intent::authenticate_gm("auth-1", ""));
        backend.send_intent(Intent::authenticate_gm("auth-2", "hunter2"));

        assert_eq!(
            drain(&mut rx),
            vec![
                ServerEvent::rejected("auth-1", "GM password cannot be empty"),
                ServerEvent::ack("auth-2"),
            ]
        );
    }

    #[test]
    fn test_update_unknown_template() {
        let (mut backend, mut rx) = backend();
        backend.send_intent(Intent::update_template(
            "u1",
            "missing",
            TemplateChanges::default(),
        ));
        assert_eq!(
            drain(&mut rx),
            vec![ServerEvent::rejected("u1", "Template not found")]
        );
    }

    #[test]
    fn test_instantiate_numbers_names_and_moves_active() {
        let (mut backend, mut rx) = backend();
        backend.send_intent(Intent::instantiate_template("spawn", "template_goblin", 2));

        let events = drain(&mut rx);
        let ServerEvent::Patch { ops, .. } = &events[0] else {
            panic!("expected patch");
        };
        assert_eq!(ops.len(), 4);
        assert!(matches!(&ops[0], PatchOp::UpsertInstance(i) if i.name == "Goblin 1" && i.id == "instance_1"));
        assert!(matches!(&ops[1], PatchOp::SetActiveSheet(r) if r.sheet_id.as_deref() == Some("instance_1")));
        assert!(matches!(&ops[2], PatchOp::UpsertInstance(i) if i.name == "Goblin 2"));
        assert_eq!(events[1], ServerEvent::ack("spawn"));

        let snapshot = backend.snapshot();
        assert_eq!(snapshot.instances[0].id, "instance_2");
        assert_eq!(snapshot.active_sheet_id.as_deref(), Some("instance_2"));
    }

    #[test]
    fn test_instantiate_single_keeps_plain_name() {
        let (mut backend, mut rx) = backend();
        backend.send_intent(Intent::new(
            "spawn",
            IntentBody::InstantiateTemplate {
                template_id: "template_goblin".to_string(),
                count: 0,
            },
        ));

        let events = drain(&mut rx);
        let ServerEvent::Patch { ops, .. } = &events[0] else {
            panic!("expected patch");
        };
        assert_eq!(ops.len(), 2);
        assert!(matches!(&ops[0], PatchOp::UpsertInstance(i) if i.name == "Goblin"));
    }

    #[test]
    fn test_instantiate_unknown_template_is_single_error() {
        let (mut backend, mut rx) = backend();
        let before = backend.snapshot().instances;
        backend.send_intent(Intent::instantiate_template("spawn", "nope", 3));

        assert_eq!(
            drain(&mut rx),
            vec![ServerEvent::rejected("spawn", "Template not found")]
        );
        assert_eq!(backend.snapshot().instances, before);
    }

    #[test]
    fn test_spawn_encounter_skips_missing_templates() {
        let (mut backend, mut rx) = backend();
        let encounter = EncounterPreset::new("enc1", "Ambush")
            .with_entry("template_goblin", 3)
            .with_entry("template_deleted", 2);
        backend.send_intent(Intent::save_encounter("save", encounter));
        backend.send_intent(Intent::spawn_encounter("spawn", "enc1"));
        backend.send_intent(Intent::spawn_encounter("spawn-missing", "enc9"));

        let events = drain(&mut rx);
        assert_eq!(events.len(), 5);
        let ServerEvent::Patch { ops, .. } = &events[2] else {
            panic!("expected patch");
        };
        assert_eq!(ops.len(), 3);
        assert!(ops
            .iter()
            .all(|op| matches!(op, PatchOp::UpsertInstance(i) if i.template_id == "template_goblin")));
        assert_eq!(
            events[4],
            ServerEvent::rejected("spawn-missing", "Encounter not found")
        );
    }

    #[test]
    fn test_submit_roll_resolves_with_intent_id() {
        let (mut backend, mut rx) = backend();
        let request = RollRequest {
            sheet_id: "instance_player_1".to_string(),
            stat: StatKey::Perception,
            context: "Search the room".to_string(),
            visibility: RollVisibility::Hidden,
        };
        backend.send_intent(Intent::submit_roll("roll-intent", request, Role::Player));

        let events = drain(&mut rx);
        let ServerEvent::Patch { ops, .. } = &events[0] else {
            panic!("expected patch");
        };
        let [PatchOp::AddRollLog(entry)] = &ops[..] else {
            panic!("expected add_roll_log");
        };
        assert_eq!(entry.id, "roll_1");
        assert_eq!(entry.status, RollStatus::Resolved);
        assert_eq!(entry.intent_id.as_deref(), Some("roll-intent"));
        assert!(entry.result_text.is_some());
    }

    #[test]
    fn test_remove_active_instance_moves_pointer() {
        let (mut backend, mut rx) = backend();
        backend.send_intent(Intent::remove_instance("rm", "instance_player_1"));
        backend.send_intent(Intent::remove_instance("rm-again", "instance_player_1"));

        let events = drain(&mut rx);
        let ServerEvent::Patch { ops, .. } = &events[0] else {
            panic!("expected patch");
        };
        assert_eq!(
            ops,
            &vec![
                PatchOp::RemoveInstance(EntityRef::new("instance_player_1")),
                PatchOp::SetActiveSheet(ActiveSheetRef { sheet_id: None }),
            ]
        );
        assert_eq!(
            events[2],
            ServerEvent::rejected("rm-again", "Instance not found")
        );
    }

    #[test]
    fn test_disconnect_emits_untagged_error() {
        let (mut backend, mut rx) = backend();
        backend.disconnect();
        assert_eq!(
            drain(&mut rx),
            vec![ServerEvent::transport_error("Simulated transport disconnected")]
        );
    }
}
