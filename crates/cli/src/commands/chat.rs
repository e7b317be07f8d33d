//! `rulecraft chat`: interactive mode.

use rulecraft_cli::{Input, read_input, render, shortcut};
use rulecraft_config::AppConfig;
use rulecraft_core::{CommandParser, DialogEvent};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

pub async fn run(offline: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    let parser: Option<Arc<dyn CommandParser>> = if offline {
        None
    } else {
        match rulecraft_cli::parser(&config) {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                warn!("Parser unavailable, continuing offline: {e}");
                None
            }
        }
    };
    let online = parser.is_some();
    let (mut session, events) = rulecraft_cli::session(&config, parser);

    let mut rx = events.subscribe();
    tokio::spawn(async move {
        loop {
            let event = match rx.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Dropped dialog events");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };
            match event.as_ref() {
                DialogEvent::ProgramGenerated { app_id, name, .. } => {
                    info!(%app_id, %name, "Program ready to install")
                }
                DialogEvent::DeviceSelected { device_id, kind, .. } => {
                    info!(%device_id, %kind, "Device selected for setup")
                }
                _ => {}
            }
        }
    });

    println!();
    println!("  Rulecraft: Interactive Mode");
    println!();
    if online {
        println!("  Parser:    {}", config.parser.url);
    } else {
        println!("  Parser:    offline");
    }
    println!("  Type what you want automated, or `\\c <json>` for a structured command.");
    println!("  Type 'exit' or Ctrl+C to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("  You > ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };

        let result = match read_input(&line) {
            Ok(Input::Quit) => break,
            Ok(Input::Empty) => continue,
            Ok(Input::Command(command)) => session.handle_command(command).await,
            Ok(Input::Text(text)) => match shortcut(session.pending(), &text) {
                Some(command) => session.handle_command(command).await,
                None => session.handle_raw(&text).await,
            },
            Err(e) => {
                eprintln!("  [Error] Not a valid command: {e}");
                continue;
            }
        };

        match result {
            Ok(replies) => {
                println!();
                for reply in &replies {
                    for line in render(reply).lines() {
                        println!("  Rulecraft > {line}");
                    }
                }
                println!();
            }
            Err(e) => eprintln!("  [Error] {e}"),
        }
    }

    println!();
    println!("  Goodbye!");
    println!();
    Ok(())
}
