//! Eligibility evaluator: may this tab be archived, and when?
//!
//! Pure functions of their inputs. Effective activeness needs a round trip to
//! the resource manager, so the caller resolves it and passes it in.

use tabsweep_core::{Entity, Settings};

/// Why a tab is not a candidate at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IneligibleReason {
    AutoArchiveDisabled,
    Pinned,
    Grouped,
    Private,
    Active,
    /// No ledger entry: activity history unknown
    NoHistory,
}

impl std::fmt::Display for IneligibleReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            IneligibleReason::AutoArchiveDisabled => "auto-archive disabled",
            IneligibleReason::Pinned => "pinned",
            IneligibleReason::Grouped => "grouped",
            IneligibleReason::Private => "private window excluded",
            IneligibleReason::Active => "effectively active",
            IneligibleReason::NoHistory => "no activity history",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Ineligible(IneligibleReason),
    /// A candidate whose threshold has not elapsed yet
    Pending { remaining_ms: u64 },
    /// The threshold has elapsed
    Due,
}

/// Classify a tab given its last-active timestamp and the current time.
pub fn evaluate(
    entity: &Entity,
    last_active: Option<i64>,
    settings: &Settings,
    effectively_active: bool,
    now: i64,
) -> Verdict {
    use IneligibleReason::*;

    if !settings.auto_archive {
        return Verdict::Ineligible(AutoArchiveDisabled);
    }
    if entity.pinned {
        return Verdict::Ineligible(Pinned);
    }
    if entity.is_grouped() {
        return Verdict::Ineligible(Grouped);
    }
    if entity.private && !settings.include_private {
        return Verdict::Ineligible(Private);
    }
    if effectively_active {
        return Verdict::Ineligible(Active);
    }
    let Some(last_active) = last_active else {
        return Verdict::Ineligible(NoHistory);
    };

    // A timestamp from the future counts as zero elapsed time
    let elapsed = u64::try_from(now.saturating_sub(last_active)).unwrap_or(0);
    let threshold = settings.threshold_ms();
    if elapsed >= threshold {
        Verdict::Due
    } else {
        Verdict::Pending {
            remaining_ms: threshold - elapsed,
        }
    }
}

/// Whether the tab should be archived right now.
pub fn is_archivable(
    entity: &Entity,
    last_active: Option<i64>,
    settings: &Settings,
    effectively_active: bool,
    now: i64,
) -> bool {
    evaluate(entity, last_active, settings, effectively_active, now) == Verdict::Due
}
