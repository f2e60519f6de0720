//! Settings store that announces every change on the bus.

use async_trait::async_trait;
use tabsweep_core::{EventBus, LifecycleEvent, Settings, SettingsError, SettingsStore};
use tokio::sync::RwLock;
use tracing::info;

pub struct WatchSettingsStore {
    current: RwLock<Option<Settings>>,
    bus: EventBus,
}

impl WatchSettingsStore {
    pub fn new(bus: EventBus, initial: Option<Settings>) -> Self {
        Self {
            current: RwLock::new(initial),
            bus,
        }
    }

    /// Replace the stored settings (`None` clears them) and notify.
    pub async fn update(&self, settings: Option<Settings>) {
        *self.current.write().await = settings.clone();
        info!(cleared = settings.is_none(), "Settings updated");
        self.bus
            .publish(LifecycleEvent::SettingsChanged { settings });
    }
}

#[async_trait]
impl SettingsStore for WatchSettingsStore {
    async fn get_settings(&self) -> Result<Option<Settings>, SettingsError> {
        Ok(self.current.read().await.clone())
    }
}
