//! `rulecraft generate`: one structured command, scripted answers, one program.

use rulecraft_cli::{render, run_script};
use rulecraft_config::AppConfig;
use rulecraft_core::Reply;

pub async fn run(command: &str, answers: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let (mut session, _events) = rulecraft_cli::session(&config, None);

    let mut inputs = Vec::with_capacity(answers.len() + 1);
    inputs.push(command);
    inputs.extend(answers.iter().map(String::as_str));

    let mut program = None;
    for reply in run_script(&mut session, &inputs).await? {
        if let Reply::Program { .. } = &reply {
            program = Some(reply);
        } else {
            eprintln!("{}", render(&reply));
        }
    }

    match program {
        Some(program) => {
            println!("{}", render(&program));
            Ok(())
        }
        None => Err(match session.pending() {
            Some(prompt) => format!("No program generated, still waiting for: {}", prompt.question),
            None => "No program generated".to_string(),
        }
        .into()),
    }
}
