//! Sync client implementation
//!
//! The façade the view layer talks to. It owns the transport and the store,
//! assigns correlation ids, tracks every outstanding intent and turns backend
//! events into store actions and lifecycle feedback.

use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::message::{Intent, IntentBody, ServerEvent};
use super::state::{IntentTable, OutstandingIntent, UNKNOWN_INTENT_LABEL};
use crate::config::{Config, TransportMode, DEFAULT_INTENT_TIMEOUT_SECS};
use crate::ids::{IdSource, RandomIds};
use crate::models::{default_item_library, Role, RollLogEntry, RollRequest};
use crate::store::{Action, AppState, ConnectionStatus, FeedbackStatus, IntentFeedbackItem, Store};
use crate::transport::{self, Transport};

/// Synchronization client
pub struct SyncClient {
    transport: Box<dyn Transport>,
    events: mpsc::UnboundedReceiver<ServerEvent>,
    store: Store,
    ids: Box<dyn IdSource>,
    intents: IntentTable,
    intent_timeout: Duration,
    snapshot_received: bool,
}

impl SyncClient {
    /// Create a client around an explicit transport and store
    pub fn new(mut transport: Box<dyn Transport>, store: Store) -> Self {
        let events = transport.subscribe();
        Self {
            transport,
            events,
            store,
            ids: Box::new(RandomIds),
            intents: IntentTable::new(),
            intent_timeout: Duration::from_secs(DEFAULT_INTENT_TIMEOUT_SECS),
            snapshot_received: false,
        }
    }

    /// Build the transport, store and timeout from configuration
    pub fn from_config(config: &Config) -> Self {
        let state = AppState::new(config.transport).with_item_library(default_item_library());
        let mut store = Store::new(state);
        store.dispatch(Action::SetRole(Some(config.role)));

        Self::new(transport::from_config(config), store)
            .with_intent_timeout(config.intent_timeout())
    }

    /// Use a different id source for intent, feedback and optimistic roll ids
    pub fn with_ids(mut self, ids: Box<dyn IdSource>) -> Self {
        self.ids = ids;
        self
    }

    pub fn with_intent_timeout(mut self, timeout: Duration) -> Self {
        self.intent_timeout = timeout;
        self
    }

    /// Read-only view of the current state
    pub fn state(&self) -> &AppState {
        self.store.state()
    }

    /// Dispatch a UI-local action straight to the store
    pub fn dispatch(&mut self, action: Action) {
        self.store.dispatch(action);
    }

    pub fn mode(&self) -> TransportMode {
        self.transport.mode()
    }

    /// True while an intent awaits its ack or error
    pub fn is_outstanding(&self, intent_id: &str) -> bool {
        self.intents.contains(intent_id)
    }

    /// Open the transport. Failure is recorded in the connection state, not returned.
    pub async fn connect(&mut self) -> ConnectionStatus {
        info!("Connecting {} transport", self.transport.mode());
        self.dispatch(Action::ConnectionStatus(ConnectionStatus::Connecting));
        self.dispatch(Action::ConnectionError(None));

        match self.transport.connect().await {
            Ok(()) => {
                info!("Transport connected");
                self.dispatch(Action::ConnectionStatus(ConnectionStatus::Connected));
            }
            Err(e) => {
                warn!("Transport connection failed: {}", e);
                self.dispatch(Action::ConnectionStatus(ConnectionStatus::Disconnected));
                self.dispatch(Action::ConnectionError(Some(format!(
                    "Failed to connect transport: {}",
                    e
                ))));
            }
        }

        self.state().connection.status
    }

    pub fn disconnect(&mut self) {
        info!("Disconnecting transport");
        self.transport.disconnect();
        self.dispatch(Action::ConnectionStatus(ConnectionStatus::Disconnected));
    }

    /// Wrap a body in an intent with a fresh correlation id
    pub fn new_intent(&mut self, body: IntentBody) -> Intent {
        Intent::new(self.ids.next_id("intent"), body)
    }

    /// Record an intent as pending, announce it and hand it to the transport
    pub fn send_intent(&mut self, intent: Intent) {
        let entry = OutstandingIntent::for_intent(&intent, Instant::now());
        debug!("Sending intent {} ({})", intent.intent_id, entry.label);

        let message = format!("{} pending...", entry.label);
        self.intents.record(intent.intent_id.clone(), entry);
        self.dispatch(Action::QueueIntent(intent.intent_id.clone()));
        self.push_feedback(Some(intent.intent_id.clone()), FeedbackStatus::Pending, message);

        self.transport.send_intent(intent);
    }

    /// Submit a roll as the current role, showing a pending entry right away.
    ///
    /// Returns the intent id.
    pub fn submit_roll(&mut self, request: RollRequest) -> String {
        let role = self.state().role.unwrap_or(Role::Player);
        let intent = Intent::submit_roll(self.ids.next_id("intent"), request.clone(), role);
        let intent_id = intent.intent_id.clone();

        let mut entry = RollLogEntry::pending(self.ids.next_id("local_roll"), request, role);
        entry.intent_id = Some(intent_id.clone());
        self.dispatch(Action::OptimisticAddRoll(entry));

        self.send_intent(intent);
        intent_id
    }

    /// Apply one backend event
    pub fn handle_event(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::Snapshot { snapshot } => {
                debug!(
                    "Applying snapshot: {} templates, {} instances",
                    snapshot.templates.len(),
                    snapshot.instances.len()
                );
                self.snapshot_received = true;
                self.dispatch(Action::ApplySnapshot(snapshot));
            }
            ServerEvent::Patch { request_id, ops } => {
                debug!("Applying patch of {} ops (request {:?})", ops.len(), request_id);
                self.dispatch(Action::ApplyPatch(ops));
            }
            ServerEvent::Ack { request_id } => self.on_ack(request_id),
            ServerEvent::Error {
                request_id: Some(request_id),
                message,
            } => self.on_rejected(request_id, message),
            ServerEvent::Error {
                request_id: None,
                message,
            } => self.on_transport_error(message),
        }
    }

    fn on_ack(&mut self, request_id: String) {
        if self.intents.take_expired(&request_id) {
            debug!("Ignoring late ack for timed out intent {}", request_id);
            return;
        }

        let entry = self.intents.resolve(&request_id);
        if entry.as_ref().is_some_and(|e| e.authenticates_gm) {
            self.dispatch(Action::SetGmAuthenticated(true));
        }

        let label = label_of(entry.as_ref());
        self.push_feedback(
            Some(request_id.clone()),
            FeedbackStatus::Success,
            format!("{} synced.", label),
        );
        self.dispatch(Action::ClearIntent(request_id));
    }

    fn on_rejected(&mut self, request_id: String, message: String) {
        if self.intents.take_expired(&request_id) {
            debug!(
                "Ignoring late error for timed out intent {}: {}",
                request_id, message
            );
            return;
        }

        let entry = self.intents.resolve(&request_id);
        debug!("Intent {} rejected: {}", request_id, message);
        if entry.as_ref().is_some_and(|e| e.optimistic_roll) {
            self.dispatch(Action::FailOptimisticRoll {
                intent_id: request_id.clone(),
                error: message.clone(),
            });
        }

        let label = label_of(entry.as_ref());
        self.push_feedback(
            Some(request_id.clone()),
            FeedbackStatus::Error,
            format!("{} failed: {}", label, message),
        );
        self.dispatch(Action::ClearIntent(request_id));
    }

    fn on_transport_error(&mut self, message: String) {
        warn!("Transport error: {}", message);
        self.dispatch(Action::ConnectionError(Some(message.clone())));
        self.push_feedback(
            None,
            FeedbackStatus::Error,
            format!("Transport error: {}", message),
        );
    }

    /// Fail every intent that has waited longer than the timeout. Returns their ids.
    pub fn expire_timed_out(&mut self, now: Instant) -> Vec<String> {
        let expired = self.intents.expire(now, self.intent_timeout);
        let mut ids = Vec::with_capacity(expired.len());

        for (intent_id, entry) in expired {
            warn!("Intent {} ({}) timed out", intent_id, entry.label);
            if entry.optimistic_roll {
                self.dispatch(Action::FailOptimisticRoll {
                    intent_id: intent_id.clone(),
                    error: "Timed out".to_string(),
                });
            }
            self.push_feedback(
                Some(intent_id.clone()),
                FeedbackStatus::Error,
                format!("{} timed out", entry.label),
            );
            self.dispatch(Action::ClearIntent(intent_id.clone()));
            ids.push(intent_id);
        }
        ids
    }

    /// Apply every event already queued without waiting, then expire overdue intents.
    ///
    /// Returns the number of events applied.
    pub fn process_events(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.events.try_recv() {
            self.handle_event(event);
            applied += 1;
        }
        self.expire_timed_out(Instant::now());
        applied
    }

    /// Wait for and apply the next event. Returns false once the transport is gone.
    pub async fn next_event(&mut self) -> bool {
        match self.events.recv().await {
            Some(event) => {
                self.handle_event(event);
                true
            }
            None => false,
        }
    }

    /// Pump events until the intent is answered or `wait` elapses.
    ///
    /// Returns true if the intent was resolved by the backend or by the timeout.
    pub async fn settle(&mut self, intent_id: &str, wait: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + wait;
        self.process_events();

        while self.intents.contains(intent_id) {
            match tokio::time::timeout_at(deadline, self.events.recv()).await {
                Ok(Some(event)) => self.handle_event(event),
                Ok(None) | Err(_) => break,
            }
            self.expire_timed_out(Instant::now());
        }
        self.expire_timed_out(Instant::now());

        !self.intents.contains(intent_id)
    }

    /// Pump events until a snapshot has been applied or `wait` elapses
    pub async fn wait_for_snapshot(&mut self, wait: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + wait;
        self.process_events();

        while !self.snapshot_received {
            match tokio::time::timeout_at(deadline, self.events.recv()).await {
                Ok(Some(event)) => self.handle_event(event),
                Ok(None) | Err(_) => break,
            }
        }
        self.snapshot_received
    }

    fn push_feedback(
        &mut self,
        intent_id: Option<String>,
        status: FeedbackStatus,
        message: String,
    ) {
        let item =
            IntentFeedbackItem::new(self.ids.next_id("feedback"), intent_id, status, message);
        self.dispatch(Action::PushIntentFeedback(item));
    }
}

fn label_of(entry: Option<&OutstandingIntent>) -> &str {
    entry.map_or(UNKNOWN_INTENT_LABEL, |e| e.label.as_str())
}
