//! Status and session command handlers

use anyhow::Result;
use serde::Serialize;

use sheetsync_core::store::{selectors, FeedbackStatus, IntentFeedbackItem};
use sheetsync_core::{Config, ConnectionStatus, IntentBody, SyncClient};

use crate::output::{Output, OutputFormat};

#[derive(Serialize)]
struct StatusReport<'a> {
    transport: &'a str,
    connected: bool,
    error: Option<&'a str>,
    role: Option<&'a str>,
    gm_authenticated: bool,
    active_sheet: Option<selectors::SheetDetail<'a>>,
    counts: Counts,
    feedback: Vec<&'a IntentFeedbackItem>,
}

#[derive(Serialize)]
struct Counts {
    templates: usize,
    instances: usize,
    encounters: usize,
    rolls: usize,
    pending_intents: usize,
}

/// Show connection state, counts and recent feedback
pub fn show(client: &SyncClient, config: &Config, output: &Output) -> Result<()> {
    let state = client.state();
    let report = StatusReport {
        transport: state.connection.transport.as_str(),
        connected: state.connection.status == ConnectionStatus::Connected,
        error: state.connection.error.as_deref(),
        role: state.role.as_ref().map(|role| role.as_str()),
        gm_authenticated: state.gm_authenticated,
        active_sheet: selectors::active_sheet_detail(state),
        counts: Counts {
            templates: state.templates.len(),
            instances: state.instances.len(),
            encounters: state.encounters.len(),
            rolls: state.roll_log.len(),
            pending_intents: state.pending_intent_ids.len(),
        },
        feedback: state.intent_feedback.iter().collect(),
    };

    match output.format {
        OutputFormat::Json => output.print_json(&report),
        OutputFormat::Quiet => {
            println!("{:?}", state.connection.status);
        }
        OutputFormat::Human => {
            println!("sheetsync Status");
            println!("================");
            println!();
            println!("Connection:");
            println!("  Transport: {}", report.transport);
            if client.mode() == sheetsync_core::TransportMode::Socket {
                println!("  Server:    {}", config.socket_url);
            }
            println!("  Status:    {:?}", state.connection.status);
            if let Some(error) = report.error {
                println!("  Error:     {}", error);
            }
            println!();
            println!("Session:");
            println!("  Role:      {}", report.role.unwrap_or("(none)"));
            println!(
                "  GM auth:   {}",
                if report.gm_authenticated { "yes" } else { "no" }
            );
            match report.active_sheet {
                Some(ref detail) => println!(
                    "  Active:    {} ({}), weapon: {}",
                    detail.instance.name, detail.instance.id, detail.active_weapon
                ),
                None => println!("  Active:    (none)"),
            }
            println!();
            println!("Contents:");
            println!("  Templates:  {}", report.counts.templates);
            println!("  Instances:  {}", report.counts.instances);
            println!("  Encounters: {}", report.counts.encounters);
            println!("  Rolls:      {}", report.counts.rolls);
            println!("  Pending:    {}", report.counts.pending_intents);

            if !report.feedback.is_empty() {
                println!();
                println!("── Feedback ──");
                for item in &report.feedback {
                    println!(
                        "[{}] {:<7} {}",
                        item.created_at.format("%H:%M:%S"),
                        status_label(item.status),
                        item.message
                    );
                }
            }
        }
    }

    Ok(())
}

/// Forward a GM password to the backend
pub async fn authenticate(
    client: &mut SyncClient,
    password: String,
    config: &Config,
    output: &Output,
) -> Result<()> {
    let intent = client.new_intent(IntentBody::AuthenticateGm { password });
    super::send_and_report(client, intent, config, output).await
}

fn status_label(status: FeedbackStatus) -> &'static str {
    match status {
        FeedbackStatus::Pending => "pending",
        FeedbackStatus::Success => "ok",
        FeedbackStatus::Error => "error",
    }
}
