//! sheetsync core library
//!
//! This crate provides the client-side state synchronization engine for a
//! tabletop role-playing console: it keeps a local, render-ready copy of
//! shared game state consistent with an authoritative backend while giving
//! immediate feedback for actions that are not yet confirmed.
//!
//! # Architecture
//!
//! - **Store**: single source of truth, mutated only through a pure reducer
//! - **Transport**: simulated in-process backend or a WebSocket connection
//! - **SyncClient**: correlates intents with backend answers
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::load()?;
//! let mut client = SyncClient::from_config(&config);
//! client.connect().await;
//! client.wait_for_snapshot(Duration::from_secs(2)).await;
//!
//! let intent = client.new_intent(IntentBody::InstantiateTemplate {
//!     template_id: "template_goblin".into(),
//!     count: 3,
//! });
//! let intent_id = intent.intent_id.clone();
//! client.send_intent(intent);
//! client.settle(&intent_id, Duration::from_secs(5)).await;
//! ```
//!
//! # Modules
//!
//! - `models`: sheets, encounters, rolls and catalog items
//! - `store`: state tree, actions, reducer and selectors
//! - `sync`: message model and the sync client
//! - `transport`: transport trait with simulated and socket implementations
//! - `ids`: injectable identifier sources
//! - `config`: application configuration

pub mod config;
pub mod ids;
pub mod models;
pub mod store;
pub mod sync;
pub mod transport;

pub use config::{Config, TransportMode};
pub use ids::{IdSource, RandomIds, SequentialIds};
pub use models::{
    EncounterPreset, ItemTemplate, Role, RollLogEntry, RollRequest, SheetInstance, SheetKind,
    SheetTemplate, StatKey,
};
pub use store::{Action, AppState, ConnectionStatus, Store};
pub use sync::{Intent, IntentBody, PatchOp, ServerEvent, SyncClient};
pub use transport::{SimulatedBackend, SocketTransport, Transport, TransportError};
