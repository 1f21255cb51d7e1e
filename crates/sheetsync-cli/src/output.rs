//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use serde::Serialize;

use sheetsync_core::models::{EncounterPreset, RollLogEntry, RollStatus, RollVisibility};
use sheetsync_core::{SheetInstance, SheetTemplate};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Print any serializable value as pretty JSON
    pub fn print_json<T: Serialize + ?Sized>(&self, value: &T) {
        match serde_json::to_string_pretty(value) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Failed to serialize output: {}", e),
        }
    }

    /// Print a list of templates
    pub fn print_templates(&self, templates: &[&SheetTemplate]) {
        match self.format {
            OutputFormat::Human => {
                if templates.is_empty() {
                    println!("No templates found.");
                    return;
                }
                for template in templates {
                    let tags = if template.tags.is_empty() {
                        String::new()
                    } else {
                        format!(" [{}]", template.tags.join(", "))
                    };
                    println!(
                        "{} | {:<6} | {}{} | {} stat(s)",
                        truncate(&template.id, 24),
                        template.kind,
                        truncate(&template.name, 30),
                        tags,
                        template.stats.len()
                    );
                }
                println!("\n{} template(s)", templates.len());
            }
            OutputFormat::Json => self.print_json(templates),
            OutputFormat::Quiet => {
                for template in templates {
                    println!("{}", template.id);
                }
            }
        }
    }

    /// Print a list of instances, marking the active one
    pub fn print_instances(&self, instances: &[&SheetInstance], active: Option<&str>) {
        match self.format {
            OutputFormat::Human => {
                if instances.is_empty() {
                    println!("No instances found.");
                    return;
                }
                for instance in instances {
                    let marker = if Some(instance.id.as_str()) == active {
                        "*"
                    } else {
                        " "
                    };
                    println!(
                        "{} {} | {:<6} | {} | from {}",
                        marker,
                        truncate(&instance.id, 24),
                        instance.kind,
                        truncate(&instance.name, 30),
                        instance.template_id
                    );
                }
                println!("\n{} instance(s)", instances.len());
            }
            OutputFormat::Json => self.print_json(instances),
            OutputFormat::Quiet => {
                for instance in instances {
                    println!("{}", instance.id);
                }
            }
        }
    }

    /// Print a list of encounter presets
    pub fn print_encounters(&self, encounters: &[&EncounterPreset]) {
        match self.format {
            OutputFormat::Human => {
                if encounters.is_empty() {
                    println!("No encounters found.");
                    return;
                }
                for encounter in encounters {
                    let roster: Vec<String> = encounter
                        .entries
                        .iter()
                        .map(|entry| format!("{} x{}", entry.template_id, entry.count))
                        .collect();
                    println!(
                        "{} | {} | {}",
                        truncate(&encounter.id, 24),
                        truncate(&encounter.name, 30),
                        roster.join(", ")
                    );
                }
                println!("\n{} encounter(s)", encounters.len());
            }
            OutputFormat::Json => self.print_json(encounters),
            OutputFormat::Quiet => {
                for encounter in encounters {
                    println!("{}", encounter.id);
                }
            }
        }
    }

    /// Print the roll log, most recent first
    pub fn print_rolls(&self, rolls: &[RollLogEntry]) {
        match self.format {
            OutputFormat::Human => {
                if rolls.is_empty() {
                    println!("No rolls yet.");
                    return;
                }
                for roll in rolls {
                    let outcome = match roll.status {
                        RollStatus::Pending => "pending".to_string(),
                        RollStatus::Resolved => roll.result_text.clone().unwrap_or_default(),
                        RollStatus::Failed => {
                            format!("failed: {}", roll.error.as_deref().unwrap_or("unknown"))
                        }
                    };
                    let hidden = if roll.request.visibility == RollVisibility::Hidden {
                        " (hidden)"
                    } else {
                        ""
                    };
                    println!(
                        "[{}] {} {} on {}{} - {}",
                        roll.created_at.format("%H:%M:%S"),
                        roll.requested_by_role,
                        roll.request.stat.label(),
                        roll.request.sheet_id,
                        hidden,
                        truncate_line(&outcome, 60)
                    );
                }
                println!("\n{} roll(s)", rolls.len());
            }
            OutputFormat::Json => self.print_json(rolls),
            OutputFormat::Quiet => {
                for roll in rolls {
                    println!("{}", roll.id);
                }
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

/// Truncate a string to max length, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Truncate to first line and max length
fn truncate_line(s: &str, max_len: usize) -> String {
    let first_line = s.lines().next().unwrap_or("");
    truncate(first_line, max_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_flags() {
        assert_eq!(OutputFormat::from_flags(false, false), OutputFormat::Human);
        assert_eq!(OutputFormat::from_flags(true, false), OutputFormat::Json);
        assert_eq!(OutputFormat::from_flags(false, true), OutputFormat::Quiet);
        // Quiet takes precedence
        assert_eq!(OutputFormat::from_flags(true, true), OutputFormat::Quiet);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("this is a long string", 10), "this is...");
        assert_eq!(truncate("Ørkenrøver", 6), "Ørk...");
    }

    #[test]
    fn test_truncate_line() {
        assert_eq!(truncate_line("single line", 20), "single line");
        assert_eq!(truncate_line("line one\nline two", 20), "line one");
        assert_eq!(
            truncate_line("very long single line here", 10),
            "very lo..."
        );
    }
}
