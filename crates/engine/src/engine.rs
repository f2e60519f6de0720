//! The engine context: collaborators plus the process-wide state.
//!
//! One [`Engine`] exists per process. Clones share everything, which lets
//! debounced work run on spawned tasks.

use std::collections::HashSet;
use std::sync::Arc;

use tabsweep_config::EngineConfig;
use tabsweep_core::{
    Clock, ContainerId, Entity, EntityId, ResourceManager, Settings, SettingsStore, SystemClock,
    TimerService, parse_timer_name,
};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::ledger::ActivityLedger;
use crate::retry::RetryPolicy;

/// Ledger and eviction timers at one instant.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct EngineSnapshot {
    /// (tab, last active ms), sorted by tab
    pub ledger: Vec<(EntityId, i64)>,
    /// Outstanding eviction timers, sorted
    pub timers: Vec<EntityId>,
}

#[derive(Clone)]
pub struct Engine {
    pub(crate) resources: Arc<dyn ResourceManager>,
    pub(crate) timers: Arc<dyn TimerService>,
    settings_store: Arc<dyn SettingsStore>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) config: EngineConfig,
    /// Used when the store has nothing, or its settings were removed
    fallback_settings: Settings,
    pub(crate) ledger: Arc<ActivityLedger>,
    /// `None` until settings are loaded; every entry point no-ops until then
    settings: Arc<RwLock<Option<Arc<Settings>>>>,
    /// Serializes timer clear+create pairs
    pub(crate) timer_gate: Arc<Mutex<()>>,
    /// Windows with a debounced reorder pending
    pub(crate) pending_reorders: Arc<Mutex<HashSet<ContainerId>>>,
}

impl Engine {
    pub fn new(
        resources: Arc<dyn ResourceManager>,
        timers: Arc<dyn TimerService>,
        settings_store: Arc<dyn SettingsStore>,
        config: EngineConfig,
    ) -> Self {
        Self {
            resources,
            timers,
            settings_store,
            clock: Arc::new(SystemClock),
            config,
            fallback_settings: Settings::default(),
            ledger: Arc::new(ActivityLedger::new()),
            settings: Arc::new(RwLock::new(None)),
            timer_gate: Arc::new(Mutex::new(())),
            pending_reorders: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Settings to use when the store holds none.
    pub fn with_fallback_settings(mut self, settings: Settings) -> Self {
        self.fallback_settings = settings;
        self
    }

    pub fn ledger(&self) -> &ActivityLedger {
        &self.ledger
    }

    pub(crate) fn now(&self) -> i64 {
        self.clock.now_ms()
    }

    pub(crate) fn eviction_policy(&self) -> RetryPolicy {
        self.config.eviction_retry.into()
    }

    pub(crate) fn reorder_policy(&self) -> RetryPolicy {
        self.config.reorder_retry.into()
    }

    /// The current settings snapshot, if loaded.
    pub async fn settings(&self) -> Option<Arc<Settings>> {
        self.settings.read().await.clone()
    }

    /// Replace the settings snapshot wholesale. `None` reverts to the
    /// fallback settings.
    pub async fn replace_settings(&self, settings: Option<Settings>) {
        let settings = settings.unwrap_or_else(|| self.fallback_settings.clone());
        info!(
            auto_archive = settings.auto_archive,
            threshold = settings.threshold,
            unit = %settings.unit,
            include_private = settings.include_private,
            reorder_groups = settings.reorder_groups,
            "Settings applied"
        );
        *self.settings.write().await = Some(Arc::new(settings));
    }

    /// Pull settings from the store. A store failure leaves the engine
    /// unconfigured (or on its previous snapshot).
    pub async fn load_settings(&self) -> bool {
        match self.settings_store.get_settings().await {
            Ok(settings) => {
                self.replace_settings(settings).await;
                true
            }
            Err(e) => {
                warn!(error = %e, "Failed to load settings");
                false
            }
        }
    }

    /// Whether the tab is the selection of the window that has input focus.
    ///
    /// Asks the resource manager every time; a failed lookup counts as
    /// "not active".
    pub async fn is_effectively_active(&self, entity: &Entity) -> bool {
        if !entity.active {
            return false;
        }
        match self.resources.focused_container().await {
            Ok(focused) => focused == Some(entity.container),
            Err(e) => {
                debug!(entity = %entity.id, error = %e, "Focus lookup failed, treating as inactive");
                false
            }
        }
    }

    pub async fn snapshot(&self) -> EngineSnapshot {
        let mut timers: Vec<EntityId> = match self.timers.list_timers().await {
            Ok(names) => names.iter().filter_map(|n| parse_timer_name(n)).collect(),
            Err(e) => {
                warn!(error = %e, "Failed to list timers");
                Vec::new()
            }
        };
        timers.sort();
        EngineSnapshot {
            ledger: self.ledger.entries().await,
            timers,
        }
    }
}
