//! `tabsweep status`: Show the effective settings.

use tabsweep_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let settings = &config.settings;
    let engine = &config.engine;

    println!("tabsweep status");
    println!("===============");
    println!("  Config dir:      {}", AppConfig::config_dir().display());
    println!(
        "  Auto-archive:    {}",
        if settings.auto_archive { "enabled" } else { "disabled" }
    );
    println!("  Threshold:       {} {}", settings.threshold, settings.unit);
    println!(
        "  Private tabs:    {}",
        if settings.include_private { "archived" } else { "kept" }
    );
    println!(
        "  Group ordering:  {}",
        if settings.reorder_groups { "enabled" } else { "disabled" }
    );
    println!(
        "  Remove retries:  {} x {}ms",
        engine.eviction_retry.max_attempts, engine.eviction_retry.delay_ms
    );
    println!(
        "  Move retries:    {} x {}ms",
        engine.reorder_retry.max_attempts, engine.reorder_retry.delay_ms
    );

    if AppConfig::config_path().exists() {
        println!("\n  Config file found");
    } else {
        println!("\n  No config file, using defaults (see `tabsweep config --default`)");
    }

    Ok(())
}
