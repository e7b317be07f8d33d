//! `rulecraft status`: show configuration status.

use rulecraft_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let caps = rulecraft_cli::capabilities(&config);

    println!("Rulecraft Status");
    println!("================");
    println!("  Config dir:    {}", AppConfig::config_dir().display());
    println!("  Parser:        {} ({})", config.parser.url, config.parser.locale);
    println!("  Schemas:       {} configured + builtins", config.schemas.len());
    println!("  Devices:       {}", config.devices.len());
    println!("  Contacts:      {}", config.contacts.len());
    println!("  Feeds:         {}", config.feeds.len());
    println!(
        "  Discovery:     {}",
        if caps.discovery.is_some() {
            format!("enabled ({}s timeout)", config.discovery.timeout_secs)
        } else {
            "disabled".into()
        }
    );
    println!("  Confirmation:  {}", if caps.settings.confirm_programs { "on" } else { "off" });

    if AppConfig::config_path().exists() {
        println!("\n  Config file found");
    } else {
        println!("\n  No config file: run `rulecraft onboard` first");
    }

    Ok(())
}
