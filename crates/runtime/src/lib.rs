//! Concrete collaborators for tabsweep.
//!
//! - [`InMemoryWorkspace`]: a browser model for tests and `tabsweep simulate`
//! - [`TokioTimerService`]: named one-shot timers on the tokio runtime
//! - [`WatchSettingsStore`]: settings held in memory, changes published on the bus

pub mod settings;
pub mod timers;
pub mod workspace;

pub use settings::WatchSettingsStore;
pub use timers::TokioTimerService;
pub use workspace::{CallLog, InMemoryWorkspace, Scenario, TabSpec, WindowSpec};
