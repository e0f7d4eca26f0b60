//! Command execution.

use crate::Commands;
use colored::Colorize;
use flowd_client::Client;
use serde_json::Value;

/// Executes a command and returns the formatted output.
pub async fn execute(client: &Client, cmd: Commands) -> Result<String, Box<dyn std::error::Error>> {
    match cmd {
        Commands::Repl => unreachable!(),

        Commands::Ping => {
            client.ping().await?;
            Ok("PONG".green().to_string())
        }

        Commands::Info => {
            let info = client.info().await?;
            Ok(format_json(&info))
        }

        Commands::CreateDefinition { definition } => {
            let def_json = parse_json_arg(&definition)?;
            let result = client.create_definition(def_json).await?;

            Ok(format!(
                "{} definition {} (checksum: {})",
                "Created".green(),
                result.definition_id.cyan(),
                result.checksum
            ))
        }

        Commands::GetDefinition { id } => {
            let result = client.get_definition(&id).await?;
            Ok(format!(
                "{}\n{}",
                format!("Definition {} (checksum: {})", id.cyan(), result.checksum).bold(),
                format_json(&result.definition)
            ))
        }

        Commands::ListDefinitions => {
            let result = client.list_definitions().await?;

            if result.items.is_empty() {
                return Ok("No definitions registered".yellow().to_string());
            }

            let mut output = String::new();
            for item in &result.items {
                output.push_str(&format!(
                    "  {} {} ({} states, {} actions, checksum: {})\n",
                    item.id.cyan(),
                    item.name,
                    item.states,
                    item.actions,
                    item.checksum
                ));
            }
            Ok(output)
        }

        Commands::ListStates { id } => {
            let result = client.list_states(&id).await?;

            let mut output = format!("{}\n", format!("States of {}", id.cyan()).bold());
            for state in &result.states {
                output.push_str(&format!("  {}\n", format_state(state)));
            }
            Ok(output)
        }

        Commands::ListActions { id } => {
            let result = client.list_actions(&id).await?;

            let mut output = format!("{}\n", format!("Actions of {}", id.cyan()).bold());
            for action in &result.actions {
                output.push_str(&format!("  {}\n", format_action(action)));
            }
            Ok(output)
        }

        Commands::StartInstance { definition } => {
            let result = client.start_instance(&definition).await?;

            Ok(format!(
                "{} instance {}\n  Definition: {}\n  State: {}",
                "Started".green(),
                result.instance_id.cyan(),
                result.definition_id,
                result.current_state_id.yellow()
            ))
        }

        Commands::GetInstance { id } => {
            let result = client.get_instance(&id).await?;

            let mut output = format!(
                "{}\n  Definition: {}\n  State: {}\n  Created: {}\n  Updated: {}",
                format!("Instance {}", id.cyan()).bold(),
                result.definition_id,
                result.current_state_id.yellow(),
                result.created_at,
                result.updated_at
            );

            if result.history.is_empty() {
                output.push_str("\n  History: (empty)");
            } else {
                output.push_str(&format!("\n  History ({}):", result.history.len()));
                for (i, entry) in result.history.iter().enumerate() {
                    output.push_str(&format!(
                        "\n    [{}] {}: {} → {} ({})",
                        i + 1,
                        entry.action_id.cyan(),
                        entry.from_state_id,
                        entry.to_state_id.yellow(),
                        entry.timestamp
                    ));
                }
            }
            Ok(output)
        }

        Commands::ListInstances {
            definition,
            state,
            limit,
        } => {
            let result = client
                .list_instances(definition.as_deref(), state.as_deref(), limit)
                .await?;

            if result.items.is_empty() {
                return Ok("No instances".yellow().to_string());
            }

            let mut output = String::new();
            for item in &result.items {
                output.push_str(&format!(
                    "  {} {} (state: {}, transitions: {})\n",
                    item.id.cyan(),
                    item.definition_id,
                    item.current_state_id.yellow(),
                    item.history_len
                ));
            }
            if result.items.len() < result.count {
                output.push_str(&format!(
                    "{}\n",
                    format!("  ({} of {} shown)", result.items.len(), result.count).dimmed()
                ));
            }
            Ok(output)
        }

        Commands::ExecuteAction { instance, action } => {
            let result = client.execute_action(&instance, &action).await?;

            Ok(format!(
                "{} action {} on {}\n  {} → {}\n  At: {}",
                "Applied".green(),
                action.cyan(),
                instance,
                result.from_state_id,
                result.to_state_id.yellow(),
                result.timestamp
            ))
        }

        // HashToken is handled directly in main.rs (no server connection needed)
        Commands::HashToken { .. } => unreachable!(),
    }
}

/// Formats a state object as a single display line.
pub fn format_state(state: &Value) -> String {
    let id = state["id"].as_str().unwrap_or("?");
    let name = state["name"].as_str().unwrap_or("");

    let mut markers = Vec::new();
    if state["is_initial"].as_bool().unwrap_or(false) {
        markers.push("initial".green().to_string());
    }
    if state["is_final"].as_bool().unwrap_or(false) {
        markers.push("final".yellow().to_string());
    }
    if !state["enabled"].as_bool().unwrap_or(true) {
        markers.push("disabled".red().to_string());
    }

    if markers.is_empty() {
        format!("{} {}", id.cyan(), name)
    } else {
        format!("{} {} [{}]", id.cyan(), name, markers.join(", "))
    }
}

/// Formats an action object as a single display line.
pub fn format_action(action: &Value) -> String {
    let id = action["id"].as_str().unwrap_or("?");
    let from = match &action["from_states"] {
        Value::String(s) => s.clone(),
        Value::Array(a) => a
            .iter()
            .filter_map(|v| v.as_str())
            .collect::<Vec<_>>()
            .join(", "),
        _ => "?".to_string(),
    };
    let to = action["to_state"].as_str().unwrap_or("?");

    let disabled = if !action["enabled"].as_bool().unwrap_or(true) {
        format!(" [{}]", "disabled".red())
    } else {
        String::new()
    };

    format!("{} {} → {}{}", id.cyan(), from, to.yellow(), disabled)
}

/// Parses a JSON argument (either inline JSON or @file.json).
pub fn parse_json_arg(arg: &str) -> Result<Value, Box<dyn std::error::Error>> {
    if let Some(path) = arg.strip_prefix('@') {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    } else {
        Ok(serde_json::from_str(arg)?)
    }
}

/// Formats JSON for display.
pub fn format_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
