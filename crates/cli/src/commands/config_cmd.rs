//! `tabsweep config`: Print the configuration.

use tabsweep_config::AppConfig;

pub async fn run(default: bool) -> Result<(), Box<dyn std::error::Error>> {
    if default {
        print!("{}", AppConfig::default_toml());
        return Ok(());
    }

    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    println!("# {}", AppConfig::config_path().display());
    print!("{}", config.to_toml());
    Ok(())
}
