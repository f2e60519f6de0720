//! End-to-end tests for the tabsweep engine.
//!
//! These tests wire the engine to the in-memory workspace, the tokio timer
//! service and the settings store over one event bus, then drive it the way a
//! browser would: through workspace mutations and the passage of (virtual)
//! time.

use std::sync::Arc;
use std::time::Duration;

use tabsweep_config::EngineConfig;
use tabsweep_core::{
    Clock, ContainerId, EntityId, EventBus, GroupId, Settings, ThresholdUnit, timer_name,
};
use tabsweep_engine::Engine;
use tabsweep_runtime::{
    InMemoryWorkspace, Scenario, TabSpec, TokioTimerService, WatchSettingsStore, WindowSpec,
};
use tokio::time::Instant;

// ── Fixtures ─────────────────────────────────────────────────────────────

/// A clock that follows tokio's (pausable) time.
struct TokioClock {
    start: Instant,
}

impl Clock for TokioClock {
    fn now_ms(&self) -> i64 {
        1_700_000_000_000 + self.start.elapsed().as_millis() as i64
    }
}

struct Browser {
    workspace: Arc<InMemoryWorkspace>,
    timers: Arc<TokioTimerService>,
    store: Arc<WatchSettingsStore>,
    engine: Engine,
}

fn minutes(n: u32) -> Settings {
    Settings {
        threshold: n,
        unit: ThresholdUnit::Minutes,
        ..Settings::default()
    }
}

fn window(focused: bool, tabs: Vec<TabSpec>) -> WindowSpec {
    WindowSpec {
        focused,
        private: false,
        tabs,
    }
}

/// Build the scenario and start the engine's event loop.
async fn launch(windows: Vec<WindowSpec>, settings: Settings) -> Browser {
    let bus = EventBus::default();
    let events = bus.subscribe();
    let workspace = Arc::new(InMemoryWorkspace::from_scenario(&Scenario { windows }, bus.clone()));
    let timers = Arc::new(TokioTimerService::new(bus.clone()));
    let store = Arc::new(WatchSettingsStore::new(bus, Some(settings)));
    let engine = Engine::new(
        workspace.clone(),
        timers.clone(),
        store.clone(),
        EngineConfig::default(),
    )
    .with_clock(Arc::new(TokioClock {
        start: Instant::now(),
    }));

    let runner = engine.clone();
    tokio::spawn(async move { runner.start(events).await });
    settle().await;

    Browser {
        workspace,
        timers,
        store,
        engine,
    }
}

/// Let the engine drain every pending event.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

async fn advance(duration: Duration) {
    tokio::time::sleep(duration).await;
}

// ── Archiving ────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn idle_tabs_are_archived_after_threshold() {
    let b = launch(
        vec![window(
            true,
            vec![
                TabSpec::titled("mail").active(),
                TabSpec::titled("news"),
                TabSpec::pinned("docs"),
                TabSpec::titled("blog"),
            ],
        )],
        minutes(1),
    )
    .await;
    let (mail, news, docs, blog) = (EntityId(1), EntityId(2), EntityId(3), EntityId(4));

    advance(Duration::from_secs(59)).await;
    assert!(b.workspace.contains(news).await);

    advance(Duration::from_secs(2)).await;
    assert!(b.workspace.contains(mail).await);
    assert!(b.workspace.contains(docs).await);
    assert!(!b.workspace.contains(news).await);
    assert!(!b.workspace.contains(blog).await);

    let snapshot = b.engine.snapshot().await;
    assert!(snapshot.timers.is_empty());
    let tracked: Vec<EntityId> = snapshot.ledger.iter().map(|(id, _)| *id).collect();
    assert_eq!(tracked, vec![mail, docs]);
}

#[tokio::test(start_paused = true)]
async fn switching_tabs_restarts_the_countdown() {
    let b = launch(
        vec![
            window(true, vec![TabSpec::titled("a").active(), TabSpec::titled("b")]),
            window(false, vec![TabSpec::titled("c").active()]),
        ],
        minutes(1),
    )
    .await;
    let (a, tab_b, c) = (EntityId(1), EntityId(2), EntityId(3));

    advance(Duration::from_secs(30)).await;
    b.workspace.activate(tab_b).await.unwrap();
    settle().await;
    assert_eq!(b.timers.remaining(&timer_name(tab_b)).await, None);
    let left = b.timers.remaining(&timer_name(a)).await.unwrap();
    assert!(left <= Duration::from_secs(30), "a keeps its history: {left:?}");

    advance(Duration::from_secs(45)).await;
    assert!(!b.workspace.contains(a).await);
    assert!(!b.workspace.contains(c).await);
    assert!(b.workspace.contains(tab_b).await);
}

#[tokio::test(start_paused = true)]
async fn locked_tab_is_archived_after_retries() {
    let b = launch(
        vec![window(false, vec![TabSpec::titled("dragging")])],
        minutes(1),
    )
    .await;
    let id = EntityId(1);
    b.workspace.lock_entity(id, 4).await;

    advance(Duration::from_secs(62)).await;

    assert!(!b.workspace.contains(id).await);
    assert_eq!(b.workspace.calls().await.removes, vec![id; 5]);
    assert!(b.engine.snapshot().await.ledger.is_empty());
}

#[tokio::test(start_paused = true)]
async fn closed_tab_leaves_no_state() {
    let b = launch(
        vec![window(false, vec![TabSpec::titled("a"), TabSpec::titled("b")])],
        minutes(10),
    )
    .await;

    b.workspace.close_container(ContainerId(1)).await.unwrap();
    settle().await;

    let snapshot = b.engine.snapshot().await;
    assert!(snapshot.ledger.is_empty());
    assert!(snapshot.timers.is_empty());
}

// ── Settings ─────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn shorter_threshold_rearms_every_timer() {
    let b = launch(
        vec![window(
            false,
            vec![TabSpec::titled("a"), TabSpec::titled("b"), TabSpec::titled("c")],
        )],
        Settings::default(),
    )
    .await;
    for raw in 1..=3 {
        let left = b.timers.remaining(&timer_name(EntityId(raw))).await.unwrap();
        assert!(left > Duration::from_secs(11 * 3600));
    }

    b.store.update(Some(minutes(5))).await;
    settle().await;

    for raw in 1..=3 {
        let left = b.timers.remaining(&timer_name(EntityId(raw))).await.unwrap();
        assert!(left <= Duration::from_secs(5 * 60));
        assert!(left > Duration::from_secs(4 * 60));
    }
}

#[tokio::test(start_paused = true)]
async fn disabling_auto_archive_clears_timers() {
    let b = launch(
        vec![window(false, vec![TabSpec::titled("a")])],
        minutes(1),
    )
    .await;

    b.store
        .update(Some(Settings {
            auto_archive: false,
            ..minutes(1)
        }))
        .await;
    advance(Duration::from_secs(120)).await;

    assert!(b.workspace.contains(EntityId(1)).await);
    assert!(b.engine.snapshot().await.timers.is_empty());
}

// ── Ordering ─────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn startup_moves_ungrouped_tabs_behind_groups() {
    let b = launch(
        vec![window(
            true,
            vec![
                TabSpec::grouped("g1", 1).active(),
                TabSpec::titled("u"),
                TabSpec::grouped("g2", 1),
            ],
        )],
        minutes(60),
    )
    .await;

    assert_eq!(
        b.workspace.order(ContainerId(1)).await,
        vec![EntityId(1), EntityId(3), EntityId(2)]
    );
}

#[tokio::test(start_paused = true)]
async fn grouping_a_tab_reorders_the_window() {
    let b = launch(
        vec![window(
            true,
            vec![
                TabSpec::titled("a").active(),
                TabSpec::titled("b"),
                TabSpec::titled("c"),
            ],
        )],
        minutes(60),
    )
    .await;

    b.workspace.set_group(EntityId(3), Some(GroupId(7))).await.unwrap();
    settle().await;

    assert_eq!(
        b.workspace.order(ContainerId(1)).await,
        vec![EntityId(3), EntityId(1), EntityId(2)]
    );
    // Grouped tabs are never archived
    assert_eq!(b.timers.remaining(&timer_name(EntityId(3))).await, None);
}
