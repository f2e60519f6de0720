//! Shared fixtures for the engine's unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tabsweep_config::EngineConfig;
use tabsweep_core::{ContainerId, EntityId, EventBus, ManualClock, Settings, ThresholdUnit, TimerError, TimerService};
use tabsweep_runtime::{InMemoryWorkspace, TabSpec, WatchSettingsStore};

use crate::engine::Engine;

pub use tabsweep_core::Clock;

pub const EPOCH: i64 = 1_700_000_000_000;

/// Settings with a threshold of `n` minutes, everything else default.
pub fn minutes(n: u32) -> Settings {
    Settings {
        threshold: n,
        unit: ThresholdUnit::Minutes,
        ..Settings::default()
    }
}

/// Timers that never fire on their own; tests inspect what was armed.
///
/// Every call yields first so concurrent callers interleave.
#[derive(Default)]
pub struct RecordingTimers {
    armed: Mutex<HashMap<String, Duration>>,
    stacked: AtomicUsize,
}

impl RecordingTimers {
    pub fn delay_of(&self, name: &str) -> Option<Duration> {
        self.armed.lock().unwrap().get(name).copied()
    }

    /// Creations that landed on a name which was still armed.
    pub fn stacked(&self) -> usize {
        self.stacked.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TimerService for RecordingTimers {
    async fn create_timer(&self, name: &str, delay: Duration) -> Result<(), TimerError> {
        tokio::task::yield_now().await;
        if self.armed.lock().unwrap().insert(name.to_string(), delay).is_some() {
            self.stacked.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    async fn clear_timer(&self, name: &str) -> Result<bool, TimerError> {
        tokio::task::yield_now().await;
        Ok(self.armed.lock().unwrap().remove(name).is_some())
    }

    async fn list_timers(&self) -> Result<Vec<String>, TimerError> {
        let mut names: Vec<String> = self.armed.lock().unwrap().keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

pub struct Harness {
    pub engine: Engine,
    pub workspace: Arc<InMemoryWorkspace>,
    pub timers: Arc<RecordingTimers>,
    pub clock: ManualClock,
    pub store: Arc<WatchSettingsStore>,
    pub bus: EventBus,
}

impl Harness {
    /// An engine with `settings` already applied.
    pub async fn new(settings: Settings) -> Self {
        let h = Self::unconfigured().await;
        h.engine.replace_settings(Some(settings)).await;
        h
    }

    /// An engine that has not loaded settings yet.
    pub async fn unconfigured() -> Self {
        let bus = EventBus::new(256);
        let workspace = Arc::new(InMemoryWorkspace::new(bus.clone()));
        let timers = Arc::new(RecordingTimers::default());
        let clock = ManualClock::new(EPOCH);
        let store = Arc::new(WatchSettingsStore::new(bus.clone(), None));
        let engine = Engine::new(
            workspace.clone(),
            timers.clone(),
            store.clone(),
            EngineConfig::default(),
        )
        .with_clock(Arc::new(clock.clone()));
        Self {
            engine,
            workspace,
            timers,
            clock,
            store,
            bus,
        }
    }

    /// Open an unfocused window holding `tabs`, in order.
    pub async fn window(&self, tabs: Vec<TabSpec>) -> (ContainerId, Vec<EntityId>) {
        let container = self.workspace.open_container(false).await;
        let mut ids = Vec::with_capacity(tabs.len());
        for spec in tabs {
            ids.push(self.workspace.open_entity(container, spec).await.unwrap());
        }
        (container, ids)
    }
}
