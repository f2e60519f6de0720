//! Tokio-backed timer service.
//!
//! Each named timer is one sleeping task. Replacing or clearing a timer aborts
//! its task; a task that wakes up removes its own entry and publishes
//! [`LifecycleEvent::TimerFired`] on the bus.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tabsweep_core::{EventBus, LifecycleEvent, TimerError, TimerService};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

struct PendingTimer {
    handle: JoinHandle<()>,
    generation: u64,
    deadline: Instant,
}

#[derive(Default)]
struct Timers {
    pending: HashMap<String, PendingTimer>,
    next_generation: u64,
}

pub struct TokioTimerService {
    timers: Arc<Mutex<Timers>>,
    bus: EventBus,
}

impl TokioTimerService {
    pub fn new(bus: EventBus) -> Self {
        Self {
            timers: Arc::new(Mutex::new(Timers::default())),
            bus,
        }
    }

    /// Time left before `name` fires, if it is outstanding.
    pub async fn remaining(&self, name: &str) -> Option<Duration> {
        let timers = self.timers.lock().await;
        timers
            .pending
            .get(name)
            .map(|t| t.deadline.saturating_duration_since(Instant::now()))
    }
}

#[async_trait]
impl TimerService for TokioTimerService {
    async fn create_timer(&self, name: &str, delay: Duration) -> Result<(), TimerError> {
        let mut timers = self.timers.lock().await;
        let generation = timers.next_generation;
        timers.next_generation += 1;

        let shared = Arc::clone(&self.timers);
        let bus = self.bus.clone();
        let owned_name = name.to_string();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut timers = shared.lock().await;
                // A newer timer under the same name owns the slot now
                if timers
                    .pending
                    .get(&owned_name)
                    .is_none_or(|t| t.generation != generation)
                {
                    return;
                }
                timers.pending.remove(&owned_name);
            }
            debug!(timer = %owned_name, "Timer fired");
            bus.publish(LifecycleEvent::TimerFired { name: owned_name });
        });

        let replaced = timers.pending.insert(
            name.to_string(),
            PendingTimer {
                handle,
                generation,
                deadline: Instant::now() + delay,
            },
        );
        if let Some(old) = replaced {
            old.handle.abort();
        }
        Ok(())
    }

    async fn clear_timer(&self, name: &str) -> Result<bool, TimerError> {
        let removed = self.timers.lock().await.pending.remove(name);
        Ok(match removed {
            Some(timer) => {
                timer.handle.abort();
                true
            }
            None => false,
        })
    }

    async fn list_timers(&self) -> Result<Vec<String>, TimerError> {
        let mut names: Vec<String> = self.timers.lock().await.pending.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}
