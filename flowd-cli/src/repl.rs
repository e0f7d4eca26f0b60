//! Interactive REPL.

use crate::commands::{format_action, format_json, format_state, parse_json_arg};
use colored::Colorize;
use flowd_client::Client;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Config, Editor};
use std::net::SocketAddr;

const HELP_TEXT: &str = r#"
Available commands:
  help                            Show this help
  ping                            Ping the server
  info                            Get server info

  create-definition <def>         Register a definition (JSON or @file.json)
  get-definition <id>             Get a definition
  list-definitions                List all definitions
  states <definition_id>          List states of a definition
  actions <definition_id>         List actions of a definition

  start <definition_id>           Start a new instance
  get <instance_id>               Get instance state and history
  instances [def_id] [state_id]   List instances with optional filters
  exec <instance_id> <action_id>  Execute an action

  quit, exit                      Exit the REPL
"#;

pub async fn run(client: Client, addr: SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", "flowd CLI".bold().cyan());
    println!("Connecting to {}...", addr);

    // Connect
    client.connect().await?;
    println!("{}", "Connected!".green());

    // Spawn read loop
    let conn = client.connection();
    tokio::spawn(async move {
        let _ = conn.read_loop().await;
    });

    // Give read_loop a chance to start
    tokio::task::yield_now().await;

    // Create readline editor
    let config = Config::builder()
        .history_ignore_space(true)
        .auto_add_history(true)
        .build();
    let mut rl: Editor<(), DefaultHistory> = Editor::with_config(config)?;

    // Load history
    let history_path = std::env::var("HOME")
        .map(|h| std::path::PathBuf::from(h).join(".flowd_history"))
        .unwrap_or_else(|_| ".flowd_history".into());
    let _ = rl.load_history(&history_path);

    println!("Type 'help' for available commands.\n");

    loop {
        let prompt = format!("{} ", "flowd>".cyan());
        match rl.readline(&prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                match execute_repl_command(&client, line).await {
                    Ok(Some(output)) => println!("{}\n", output),
                    Ok(None) => break, // Exit command
                    Err(e) => println!("{}: {}\n", "Error".red(), e),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("^D");
                break;
            }
            Err(err) => {
                println!("{}: {:?}", "Error".red(), err);
                break;
            }
        }
    }

    // Save history
    let _ = rl.save_history(&history_path);

    // Disconnect
    let _ = client.close().await;
    println!("{}", "Disconnected.".dimmed());

    Ok(())
}

async fn execute_repl_command(
    client: &Client,
    line: &str,
) -> Result<Option<String>, Box<dyn std::error::Error>> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.is_empty() {
        return Ok(Some(String::new()));
    }

    let cmd = parts[0].to_lowercase();
    let args = &parts[1..];

    match cmd.as_str() {
        "help" | "?" => Ok(Some(HELP_TEXT.to_string())),

        "quit" | "exit" | "q" => Ok(None),

        "ping" => {
            client.ping().await?;
            Ok(Some("PONG".green().to_string()))
        }

        "info" => {
            let info = client.info().await?;
            Ok(Some(format_json(&info)))
        }

        "create-definition" | "cd" => {
            if args.is_empty() {
                return Ok(Some(
                    "Usage: create-definition <definition_json | @file.json>".to_string(),
                ));
            }
            let definition = parse_json_arg(&args.join(" "))?;

            let result = client.create_definition(definition).await?;
            Ok(Some(format!(
                "{} {} (checksum: {})",
                "Created".green(),
                result.definition_id.cyan(),
                result.checksum
            )))
        }

        "get-definition" | "gd" => {
            if args.is_empty() {
                return Ok(Some("Usage: get-definition <id>".to_string()));
            }
            let result = client.get_definition(args[0]).await?;
            Ok(Some(format_json(&result.definition)))
        }

        "list-definitions" | "ld" => {
            let result = client.list_definitions().await?;
            if result.items.is_empty() {
                return Ok(Some("No definitions".yellow().to_string()));
            }
            let mut output = String::new();
            for item in &result.items {
                output.push_str(&format!(
                    "  {} {} ({} states, {} actions)\n",
                    item.id.cyan(),
                    item.name,
                    item.states,
                    item.actions
                ));
            }
            Ok(Some(output))
        }

        "states" => {
            if args.is_empty() {
                return Ok(Some("Usage: states <definition_id>".to_string()));
            }
            let result = client.list_states(args[0]).await?;
            let mut output = String::new();
            for state in &result.states {
                output.push_str(&format!("  {}\n", format_state(state)));
            }
            Ok(Some(output))
        }

        "actions" => {
            if args.is_empty() {
                return Ok(Some("Usage: actions <definition_id>".to_string()));
            }
            let result = client.list_actions(args[0]).await?;
            let mut output = String::new();
            for action in &result.actions {
                output.push_str(&format!("  {}\n", format_action(action)));
            }
            Ok(Some(output))
        }

        "start" | "s" => {
            if args.is_empty() {
                return Ok(Some("Usage: start <definition_id>".to_string()));
            }
            let result = client.start_instance(args[0]).await?;
            Ok(Some(format!(
                "{} {} (state: {})",
                "Started".green(),
                result.instance_id.cyan(),
                result.current_state_id.yellow()
            )))
        }

        "get" | "g" => {
            if args.is_empty() {
                return Ok(Some("Usage: get <instance_id>".to_string()));
            }
            let result = client.get_instance(args[0]).await?;
            let mut output = format!(
                "{} {} (state: {})",
                result.definition_id.cyan(),
                result.instance_id,
                result.current_state_id.yellow()
            );
            for entry in &result.history {
                output.push_str(&format!(
                    "\n  {}: {} → {}",
                    entry.action_id.cyan(),
                    entry.from_state_id,
                    entry.to_state_id
                ));
            }
            Ok(Some(output))
        }

        "instances" | "ls" => {
            let definition_id = args.first().copied();
            let current_state_id = args.get(1).copied();

            let result = client
                .list_instances(definition_id, current_state_id, None)
                .await?;
            if result.items.is_empty() {
                return Ok(Some("No instances".yellow().to_string()));
            }
            let mut output = String::new();
            for item in &result.items {
                output.push_str(&format!(
                    "  {} {} (state: {})\n",
                    item.id.cyan(),
                    item.definition_id,
                    item.current_state_id.yellow()
                ));
            }
            Ok(Some(output))
        }

        "exec" | "x" => {
            if args.len() < 2 {
                return Ok(Some("Usage: exec <instance_id> <action_id>".to_string()));
            }
            let result = client.execute_action(args[0], args[1]).await?;
            Ok(Some(format!(
                "{} {} → {}",
                result.action_id.cyan(),
                result.from_state_id,
                result.to_state_id.yellow()
            )))
        }

        _ => Ok(Some(format!(
            "Unknown command: {}. Type 'help' for help.",
            cmd
        ))),
    }
}
