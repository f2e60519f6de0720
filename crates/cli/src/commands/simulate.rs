//! `tabsweep simulate`: Run the engine against a scenario file.
//!
//! The scenario is loaded into an in-memory workspace, a startup scan runs,
//! the engine's clock jumps forward, and a second scan closes whatever became
//! due in the meantime. The event loop is not started, so the output depends
//! only on the scenario, the settings and the advance.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use tabsweep_config::AppConfig;
use tabsweep_core::{
    Clock, ContainerId, Entity, EntityFilter, EntityId, EventBus, ManualClock, ResourceManager,
    Settings, SystemClock, timer_name,
};
use tabsweep_engine::{Engine, ReconcileReport};
use tabsweep_runtime::{InMemoryWorkspace, Scenario, TokioTimerService, WatchSettingsStore};
use tracing::info;

#[derive(Debug, Serialize)]
pub struct Simulation {
    pub settings: Settings,
    pub advance_minutes: i64,
    pub startup: ReconcileReport,
    pub after_advance: ReconcileReport,
    pub containers: Vec<ContainerView>,
    pub ledger: Vec<LedgerRow>,
    pub timers: Vec<TimerRow>,
}

#[derive(Debug, Serialize)]
pub struct ContainerView {
    pub id: ContainerId,
    pub focused: bool,
    pub private: bool,
    pub tabs: Vec<Entity>,
}

#[derive(Debug, Serialize)]
pub struct LedgerRow {
    pub entity: EntityId,
    pub last_active: String,
    pub idle_minutes: i64,
}

#[derive(Debug, Serialize)]
pub struct TimerRow {
    pub entity: EntityId,
    pub fires_in_secs: u64,
}

pub async fn run(
    path: &Path,
    advance_minutes: i64,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let scenario = load_scenario(path)?;

    let simulation = simulate(&scenario, &config, advance_minutes).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&simulation)?);
    } else {
        print_simulation(&simulation);
    }
    Ok(())
}

pub fn load_scenario(path: &Path) -> Result<Scenario, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read scenario {}: {e}", path.display()))?;
    let scenario: Scenario = toml::from_str(&content)
        .map_err(|e| format!("Failed to parse scenario {}: {e}", path.display()))?;
    Ok(scenario)
}

pub async fn simulate(
    scenario: &Scenario,
    config: &AppConfig,
    advance_minutes: i64,
) -> Result<Simulation, Box<dyn std::error::Error>> {
    let bus = EventBus::default();
    let workspace = Arc::new(InMemoryWorkspace::from_scenario(scenario, bus.clone()));
    let timers = Arc::new(TokioTimerService::new(bus.clone()));
    let store = Arc::new(WatchSettingsStore::new(bus, Some(config.settings.clone())));
    let clock = ManualClock::new(SystemClock.now_ms());

    let engine = Engine::new(
        workspace.clone(),
        timers.clone(),
        store,
        config.engine.clone(),
    )
    .with_clock(Arc::new(clock.clone()))
    .with_fallback_settings(config.settings.clone());

    if !engine.load_settings().await {
        return Err("settings store unavailable".into());
    }
    let startup = engine.reconcile().await;

    clock.advance_minutes(advance_minutes);
    info!(minutes = advance_minutes, "Clock advanced");
    let after_advance = engine.reconcile().await;

    let entities = workspace.list_entities(EntityFilter::all()).await?;
    let containers = workspace
        .list_containers()
        .await?
        .into_iter()
        .map(|c| ContainerView {
            id: c.id,
            focused: c.focused,
            private: c.private,
            tabs: entities
                .iter()
                .filter(|e| e.container == c.id)
                .cloned()
                .collect(),
        })
        .collect();

    let now = clock.now_ms();
    let snapshot = engine.snapshot().await;
    let ledger = snapshot
        .ledger
        .iter()
        .map(|&(entity, last_active)| LedgerRow {
            entity,
            last_active: format_timestamp(last_active),
            idle_minutes: (now - last_active) / 60_000,
        })
        .collect();
    let mut timer_rows = Vec::with_capacity(snapshot.timers.len());
    for entity in snapshot.timers {
        if let Some(remaining) = timers.remaining(&timer_name(entity)).await {
            timer_rows.push(TimerRow {
                entity,
                fires_in_secs: remaining.as_secs(),
            });
        }
    }

    let settings = engine
        .settings()
        .await
        .map(|s| s.as_ref().clone())
        .unwrap_or_else(|| config.settings.clone());

    Ok(Simulation {
        settings,
        advance_minutes,
        startup,
        after_advance,
        containers,
        ledger,
        timers: timer_rows,
    })
}

fn format_timestamp(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| ms.to_string())
}

fn print_simulation(sim: &Simulation) {
    let s = &sim.settings;
    println!(
        "Settings: archive after {} {} ({}), group ordering {}",
        s.threshold,
        s.unit,
        if s.auto_archive { "on" } else { "off" },
        if s.reorder_groups { "on" } else { "off" }
    );
    print_report("Startup scan", &sim.startup);
    println!("Clock advanced {} minutes", sim.advance_minutes);
    print_report("Second scan", &sim.after_advance);

    for container in &sim.containers {
        let mut flags = Vec::new();
        if container.focused {
            flags.push("focused");
        }
        if container.private {
            flags.push("private");
        }
        println!();
        if flags.is_empty() {
            println!("Window {}", container.id);
        } else {
            println!("Window {} ({})", container.id, flags.join(", "));
        }
        if container.tabs.is_empty() {
            println!("  (no tabs)");
        }
        for tab in &container.tabs {
            let mut marks = Vec::new();
            if tab.active {
                marks.push("active".to_string());
            }
            if tab.pinned {
                marks.push("pinned".to_string());
            }
            if let Some(group) = tab.group {
                marks.push(format!("group {group}"));
            }
            println!("  {:>3}  {:<24} {}", tab.id, tab.title, marks.join(" "));
        }
    }

    println!();
    println!("Ledger");
    if sim.ledger.is_empty() {
        println!("  (empty)");
    }
    for row in &sim.ledger {
        println!(
            "  tab {:>3}  last active {}  idle {}m",
            row.entity, row.last_active, row.idle_minutes
        );
    }

    println!();
    println!("Timers");
    if sim.timers.is_empty() {
        println!("  (none)");
    }
    for row in &sim.timers {
        println!("  tab {:>3}  fires in {}m", row.entity, row.fires_in_secs.div_ceil(60));
    }
}

fn print_report(label: &str, report: &ReconcileReport) {
    println!(
        "{label}: {} tabs, {} active, {} countdowns started, {} timers armed, {} archived, {} moved",
        report.entities,
        report.active,
        report.started,
        report.armed,
        report.evicted.len(),
        report.moved
    );
}
