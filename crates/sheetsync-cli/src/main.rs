//! sheetsync CLI
//!
//! Command-line front end for the sheetsync console. Every command connects
//! to the configured transport, waits for the initial snapshot, and then
//! either prints part of the synchronized state or sends one intent and
//! reports how it settled.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use sheetsync_core::{Config, ConnectionStatus, Role, SheetKind, StatKey, SyncClient, TransportMode};

mod commands;
mod output;

use output::{Output, OutputFormat};

/// How long to wait for the first snapshot after connecting
const SNAPSHOT_WAIT: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "sheetsync")]
#[command(about = "sheetsync - shared state for tabletop game consoles")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Transport to use (simulated or socket)
    #[arg(long, global = true)]
    transport: Option<TransportMode>,

    /// WebSocket URL for the socket transport
    #[arg(long, global = true)]
    url: Option<String>,

    /// Act as this role (player or gm)
    #[arg(long, global = true)]
    role: Option<Role>,

    /// Log to stderr (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show connection state, counts and recent feedback
    Status,
    /// List sheet templates
    Templates {
        /// Filter by name or tag (case-insensitive)
        #[arg(short, long)]
        search: Option<String>,
    },
    /// List sheet instances
    Instances,
    /// Show the roll log
    Rolls,
    /// Create a sheet template
    CreateTemplate {
        /// Template name
        name: String,
        /// Sheet kind (player or enemy)
        #[arg(short, long, default_value = "player")]
        kind: SheetKind,
        /// Explicit template id (generated if omitted)
        #[arg(long)]
        id: Option<String>,
        /// Template notes
        #[arg(short, long)]
        notes: Option<String>,
        /// Stat value as key=value (repeatable)
        #[arg(short, long = "stat")]
        stats: Vec<String>,
        /// Tag (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,
    },
    /// Change fields of an existing template
    UpdateTemplate {
        /// Template id
        template_id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(short, long)]
        kind: Option<SheetKind>,
        #[arg(short, long)]
        notes: Option<String>,
        /// Replace all stats (key=value, repeatable)
        #[arg(short, long = "stat")]
        stats: Vec<String>,
        /// Replace all tags (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,
    },
    /// Spawn instances of a template
    Spawn {
        /// Template id
        template_id: String,
        /// Number of instances
        #[arg(short, long, default_value_t = 1)]
        count: u32,
    },
    /// Manage encounter presets
    Encounter {
        #[command(subcommand)]
        command: EncounterCommands,
    },
    /// Roll against a stat
    Roll {
        /// Stat to roll (e.g. strength, "carry weight")
        stat: StatKey,
        /// Sheet to roll for (defaults to the active sheet)
        #[arg(long)]
        sheet: Option<String>,
        /// What the roll is for
        #[arg(short, long, default_value = "")]
        context: String,
        /// Hide the result from players
        #[arg(long)]
        hidden: bool,
    },
    /// Focus a sheet instance (omit the id to clear)
    Activate {
        /// Instance id
        sheet_id: Option<String>,
    },
    /// Remove a sheet instance
    #[command(alias = "rm")]
    RemoveInstance {
        /// Instance id
        instance_id: String,
    },
    /// Authenticate as game master
    Auth {
        /// GM password
        password: String,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum EncounterCommands {
    /// Save an encounter preset
    Save {
        /// Encounter name
        name: String,
        /// Explicit encounter id (generated if omitted)
        #[arg(long)]
        id: Option<String>,
        /// Roster line as template_id[:count] (repeatable)
        #[arg(short, long = "entry")]
        entries: Vec<String>,
    },
    /// Spawn every roster line of a preset
    Spawn {
        /// Encounter id
        encounter_id: String,
    },
    /// List encounter presets
    #[command(alias = "ls")]
    List,
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (transport, socket_url, intent_timeout_secs, simulated_latency_ms, role)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    // Config commands don't need a connection
    if let Commands::Config { command } = &cli.command {
        return match command.clone() {
            Some(ConfigCommands::Show) | None => commands::config::show(&output),
            Some(ConfigCommands::Set { key, value }) => commands::config::set(key, value, &output),
        };
    }

    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(transport) = cli.transport {
        config.transport = transport;
    }
    if let Some(url) = cli.url {
        config.socket_url = url;
    }
    if let Some(role) = cli.role {
        config.role = role;
    }

    let mut client = connect(&config).await?;

    let result = match cli.command {
        Commands::Status => commands::status::show(&client, &config, &output),
        Commands::Templates { search } => commands::template::list(&mut client, search, &output),
        Commands::Instances => commands::instance::list(&client, &output),
        Commands::Rolls => commands::roll::list(&client, &output),
        Commands::CreateTemplate {
            name,
            kind,
            id,
            notes,
            stats,
            tags,
        } => {
            let draft = commands::template::TemplateDraft {
                name,
                kind,
                id,
                notes,
                stats,
                tags,
            };
            commands::template::create(&mut client, draft, &config, &output).await
        }
        Commands::UpdateTemplate {
            template_id,
            name,
            kind,
            notes,
            stats,
            tags,
        } => {
            let edit = commands::template::TemplateEdit {
                name,
                kind,
                notes,
                stats,
                tags,
            };
            commands::template::update(&mut client, template_id, edit, &config, &output).await
        }
        Commands::Spawn { template_id, count } => {
            commands::template::spawn(&mut client, template_id, count, &config, &output).await
        }
        Commands::Encounter { command } => match command {
            EncounterCommands::Save { name, id, entries } => {
                commands::encounter::save(&mut client, name, id, entries, &config, &output).await
            }
            EncounterCommands::Spawn { encounter_id } => {
                commands::encounter::spawn(&mut client, encounter_id, &config, &output).await
            }
            EncounterCommands::List => commands::encounter::list(&client, &output),
        },
        Commands::Roll {
            stat,
            sheet,
            context,
            hidden,
        } => commands::roll::roll(&mut client, stat, sheet, context, hidden, &config, &output).await,
        Commands::Activate { sheet_id } => {
            commands::instance::activate(&mut client, sheet_id, &config, &output).await
        }
        Commands::RemoveInstance { instance_id } => {
            commands::instance::remove(&mut client, instance_id, &config, &output).await
        }
        Commands::Auth { password } => {
            commands::status::authenticate(&mut client, password, &config, &output).await
        }
        Commands::Config { .. } => unreachable!(), // Handled above
    };

    client.disconnect();
    result
}

/// Connect and wait for the first snapshot
async fn connect(config: &Config) -> Result<SyncClient> {
    let mut client = SyncClient::from_config(config);

    if client.connect().await != ConnectionStatus::Connected {
        let reason = client
            .state()
            .connection
            .error
            .clone()
            .unwrap_or_else(|| "unknown error".to_string());
        bail!("{}", reason);
    }

    if !client.wait_for_snapshot(SNAPSHOT_WAIT).await {
        bail!(
            "No snapshot received from {} transport within {}s",
            config.transport,
            SNAPSHOT_WAIT.as_secs()
        );
    }

    Ok(client)
}

/// Log to stderr when -v is given or SHEETSYNC_LOG is set
fn init_logging(verbose: u8) {
    let level = match (std::env::var("SHEETSYNC_LOG"), verbose) {
        (Ok(level), 0) => level,
        (_, 0) => return,
        (_, 1) => "info".to_string(),
        _ => "debug".to_string(),
    };

    let env_filter = EnvFilter::new(format!("sheetsync_core={},sheetsync_cli={}", level, level));

    // Ignore error if already initialized
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
