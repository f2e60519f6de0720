//! The tabsweep engine: archives idle tabs and keeps grouped tabs first.
//!
//! The engine tracks when each tab was last active, arms a named one-shot
//! timer per inactive tab, and closes the tab when its timer fires and it is
//! still eligible. Independently, it keeps every window ordered so that no
//! ungrouped tab sits before a grouped one.
//!
//! 1. **Observe**: lifecycle events arrive on the [`tabsweep_core::EventBus`]
//! 2. **Plan**: [`dispatch::plan`] maps each event to [`Action`]s
//! 3. **Act**: ledger touches, timer arming, eviction, reordering
//! 4. **Reconcile**: at startup, after settings changes, and after lost
//!    events, state is rebuilt from the resource manager's current truth
//!
//! All process-wide state lives in one [`Engine`] value.

pub mod dispatch;
pub mod eligibility;
pub mod engine;
pub mod eviction;
pub mod ledger;
pub mod reconcile;
pub mod reorder;
pub mod retry;
pub mod scheduler;

#[cfg(test)]
mod test_support;

pub use dispatch::{Action, plan};
pub use eligibility::{IneligibleReason, Verdict, evaluate, is_archivable};
pub use engine::{Engine, EngineSnapshot};
pub use eviction::EvictionOutcome;
pub use ledger::ActivityLedger;
pub use reconcile::ReconcileReport;
pub use reorder::{ReorderPlan, ReorderReport, plan_reorder};
pub use retry::{RetryError, RetryPolicy, retry_transient};
pub use scheduler::ArmOutcome;
