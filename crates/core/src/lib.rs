//! # tabsweep core
//!
//! Domain types, collaborator traits, and error definitions for the tabsweep
//! idle-tab archiver. This crate has **no runtime machinery** of its own: it
//! defines the model that the engine operates on and that concrete
//! collaborators (browser bridge, in-memory workspace, timer facility)
//! implement.
//!
//! ## Collaborators
//!
//! The engine never owns tabs, windows, timers, or persisted settings. It talks
//! to three services through traits defined here:
//! - [`ResourceManager`]: list/get/remove/move tabs, list windows, focus state
//! - [`TimerService`]: named one-shot timers
//! - [`SettingsStore`]: the current [`Settings`] snapshot
//!
//! Notifications from all three arrive as [`LifecycleEvent`]s on an
//! [`EventBus`].

pub mod clock;
pub mod entity;
pub mod error;
pub mod event;
pub mod resource;
pub mod settings;
pub mod timer;

// Re-export key types at crate root for ergonomics
pub use clock::{Clock, ManualClock, SystemClock};
pub use entity::{Container, ContainerId, Entity, EntityFilter, EntityId, GroupId};
pub use error::{ResourceError, SettingsError, TimerError};
pub use event::{EntityChange, EventBus, LifecycleEvent};
pub use resource::ResourceManager;
pub use settings::{Settings, SettingsStore, ThresholdUnit};
pub use timer::{TIMER_PREFIX, TimerService, parse_timer_name, timer_name};
