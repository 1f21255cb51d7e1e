//! Synchronization with an authoritative backend
//!
//! Provides the message model shared with the backend and the client that
//! reconciles backend events with the local store.
//!
//! ## Protocol
//!
//! 1. The client connects and the backend sends a full snapshot
//! 2. Each intent carries a client-assigned id
//! 3. The backend answers with zero or more patches, then exactly one ack or error
//! 4. Errors without an id are transport failures
//!
//! ## Usage
//!
//! ```ignore
//! let mut client = SyncClient::from_config(&config);
//! client.connect().await;
//! client.wait_for_snapshot(Duration::from_secs(2)).await;
//! let intent = client.new_intent(IntentBody::SpawnEncounter { encounter_id });
//! ```

mod client;
mod message;
mod state;

pub use client::SyncClient;
pub use message::{
    ActiveSheetRef, AppSnapshot, EntityRef, Intent, IntentBody, IntentId, PatchOp, ServerEvent,
};
pub use state::{IntentTable, OutstandingIntent};
