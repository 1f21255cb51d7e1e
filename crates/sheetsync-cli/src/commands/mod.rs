//! Command handlers

pub mod config;
pub mod encounter;
pub mod instance;
pub mod roll;
pub mod status;
pub mod template;

use anyhow::{bail, Result};
use tracing::debug;

use sheetsync_core::store::FeedbackStatus;
use sheetsync_core::{Config, Intent, SyncClient};

use crate::output::Output;

/// Send an intent, wait for it to settle and report the outcome
pub async fn send_and_report(
    client: &mut SyncClient,
    intent: Intent,
    config: &Config,
    output: &Output,
) -> Result<()> {
    let intent_id = intent.intent_id.clone();
    client.send_intent(intent);
    report(client, &intent_id, config, output).await
}

/// Wait for an already-sent intent and report its latest feedback
pub async fn report(
    client: &mut SyncClient,
    intent_id: &str,
    config: &Config,
    output: &Output,
) -> Result<()> {
    // Leave a little headroom past the timeout so expiry is reported locally
    let wait = config.intent_timeout() + std::time::Duration::from_millis(250);
    let settled = client.settle(intent_id, wait).await;
    debug!("Intent {} settled: {}", intent_id, settled);

    let outcome = client
        .state()
        .intent_feedback
        .for_intent(intent_id)
        .find(|item| item.status != FeedbackStatus::Pending)
        .map(|item| (item.status, item.message.clone()));

    match outcome {
        Some((FeedbackStatus::Success, message)) => {
            output.success(&message);
            Ok(())
        }
        Some((_, message)) => bail!("{}", message),
        None => bail!("No answer for intent {}", intent_id),
    }
}
