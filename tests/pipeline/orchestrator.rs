use std::sync::atomic::Ordering;
use std::time::Duration;

use crate::support::helpers::{
    calls, init_tracing, test_config, Branch, FakeIndexer, Harness, SharedRecordingProtocol,
};
use anyhow::Result;
use appvisor::{Orchestrator, ShutdownReason};
use tokio::time::{sleep, timeout};

const TICK: Duration = Duration::from_secs(3);

fn orchestrator(harness: &Harness) -> Result<Orchestrator> {
    Ok(Orchestrator::new(
        test_config(TICK, Duration::ZERO)?,
        harness.collaborators(),
    ))
}

#[tokio::test]
async fn synced_indexer_reports_ready_synced_and_checked() -> Result<()> {
    init_tracing();
    let harness = Harness::new(FakeIndexer::running_at(97, 100, 150));
    let mut orchestrator = orchestrator(&harness)?;

    let context = orchestrator.tick().await;
    assert_eq!(context.tick, 1);
    assert!(context.ready);
    assert!(context.connection.is_connected());
    assert!(context.sync.synced);
    assert!(context.sync.checked);
    assert_eq!(orchestrator.sync_state(), context.sync);

    assert_eq!(harness.status.last(), (Some(true), Some(true), Some(true)));
    let log = harness.status.log();
    assert_eq!(log.heights, vec![(97, 100, 150)]);
    assert_eq!(log.balance_refreshes, 1);
    assert_eq!(
        harness.indexer.endpoints(),
        vec!["http://127.0.0.1:10102".to_string()]
    );

    orchestrator.close().await;
    Ok(())
}

#[tokio::test]
async fn daemon_disconnect_resets_sync_on_the_same_tick() -> Result<()> {
    init_tracing();
    let harness = Harness::new(FakeIndexer::running_at(97, 100, 150));
    let mut orchestrator = orchestrator(&harness)?;

    let context = orchestrator.tick().await;
    assert!(context.ready && context.sync.synced && context.sync.checked);

    harness.connectivity.set_daemon(false);
    let context = orchestrator.tick().await;
    assert!(!context.ready);
    assert!(!context.connection.daemon_connected);
    assert!(!context.sync.synced);
    assert!(!context.sync.checked);
    assert_eq!(harness.status.last(), (Some(false), Some(false), Some(false)));

    harness.connectivity.set_daemon(true);
    harness.indexer.count.store(20, Ordering::SeqCst);
    let context = orchestrator.tick().await;
    assert!(context.ready);
    assert!(context.sync.synced);
    assert!(!context.sync.checked, "checked must be re-earned after a reset");

    orchestrator.close().await;
    Ok(())
}

#[tokio::test]
async fn lagging_or_stopped_indexer_is_not_checked() -> Result<()> {
    init_tracing();
    let harness = Harness::new(FakeIndexer::running_at(90, 100, 500));
    let mut orchestrator = orchestrator(&harness)?;

    let context = orchestrator.tick().await;
    assert!(context.ready);
    assert!(!context.sync.synced);
    assert!(!context.sync.checked);

    harness.indexer.set_heights(100, 100);
    harness.indexer.running.store(false, Ordering::SeqCst);
    let context = orchestrator.tick().await;
    assert!(context.sync.synced);
    assert!(!context.sync.checked);
    assert_eq!(context.sync.indexed_count, 500, "last count is kept while stopped");
    assert!(harness.status.log().heights.len() == 1);

    harness.indexer.initialized.store(false, Ordering::SeqCst);
    let context = orchestrator.tick().await;
    assert!(!context.ready);
    assert!(!context.sync.synced);

    orchestrator.close().await;
    Ok(())
}

#[tokio::test]
async fn disconnect_routes_workers_to_disconnected_branch() -> Result<()> {
    init_tracing();
    let harness = Harness::new(FakeIndexer::running_at(100, 100, 150));
    let mut orchestrator = orchestrator(&harness)?;
    let (protocol, log) = SharedRecordingProtocol::new();
    assert_eq!(orchestrator.spawn_worker(protocol), 0);

    orchestrator.tick().await;
    harness.connectivity.set_wallet(false);
    orchestrator.tick().await;
    harness.connectivity.set_wallet(true);
    harness.connectivity.set_daemon(false);
    orchestrator.tick().await;

    assert_eq!(
        calls(&log),
        vec![
            (1, Branch::Work),
            (2, Branch::Disconnected),
            (3, Branch::Disconnected),
        ]
    );
    let snapshot = orchestrator.telemetry().snapshot();
    assert_eq!(snapshot.acks(), 3);
    assert_eq!(snapshot.work_completed, 1);
    assert_eq!(snapshot.work_disconnected, 2);
    assert_eq!(snapshot.missed_acks, 0);
    assert_eq!(harness.status.log().balance_refreshes, 2);

    orchestrator.close().await;
    let log = log.lock().expect("protocol log poisoned");
    assert_eq!(log.initialized, 1);
    assert_eq!(log.finalized, 1);
    Ok(())
}

#[tokio::test]
async fn endpoint_change_is_forwarded_to_indexer() -> Result<()> {
    init_tracing();
    let harness = Harness::new(FakeIndexer::running_at(100, 100, 150));
    let mut orchestrator = orchestrator(&harness)?;

    orchestrator.tick().await;
    orchestrator.tick().await;
    harness.connectivity.set_endpoint("http://10.0.0.2:10102");
    orchestrator.tick().await;

    assert_eq!(
        harness.indexer.endpoints(),
        vec![
            "http://127.0.0.1:10102".to_string(),
            "http://10.0.0.2:10102".to_string(),
        ]
    );
    orchestrator.close().await;
    Ok(())
}

#[tokio::test]
async fn closing_twice_emits_a_single_done_signal() -> Result<()> {
    init_tracing();
    let harness = Harness::new(FakeIndexer::running_at(100, 100, 150));
    let mut orchestrator = orchestrator(&harness)?;
    let (protocol, log) = SharedRecordingProtocol::new();
    orchestrator.spawn_worker(protocol);
    let mut done = orchestrator.done_signal();
    assert!(!*done.borrow());

    orchestrator.close().await;
    assert!(done.has_changed()?);
    assert!(*done.borrow_and_update());

    timeout(Duration::from_secs(1), orchestrator.close()).await?;
    assert!(!done.has_changed()?);

    assert_eq!(harness.persister.calls.load(Ordering::SeqCst), 1);
    assert_eq!(harness.indexer.stops.load(Ordering::SeqCst), 1);
    assert_eq!(log.lock().expect("protocol log poisoned").finalized, 1);
    assert_eq!(
        orchestrator.shutdown_trigger().reason(),
        Some(ShutdownReason::Requested)
    );
    Ok(())
}

#[tokio::test]
async fn persist_failure_does_not_block_teardown() -> Result<()> {
    init_tracing();
    let harness = Harness::new(FakeIndexer::running_at(100, 100, 150));
    harness.persister.fail.store(true, Ordering::SeqCst);
    let mut orchestrator = orchestrator(&harness)?;
    let done = orchestrator.done_signal();

    orchestrator.close().await;
    assert!(*done.borrow());
    assert_eq!(harness.indexer.stops.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn window_close_stops_the_tick_loop() -> Result<()> {
    init_tracing();
    let harness = Harness::new(FakeIndexer::running_at(100, 100, 150));
    let config = test_config(TICK, Duration::from_secs(3))?;
    let mut orchestrator = Orchestrator::new(config, harness.collaborators());
    let (protocol, log) = SharedRecordingProtocol::new();
    orchestrator.spawn_worker(protocol);

    let trigger = orchestrator.shutdown_trigger();
    let done = orchestrator.done_signal();
    let telemetry = orchestrator.telemetry();
    let handle = tokio::spawn(orchestrator.run());

    sleep(Duration::from_secs(10)).await;
    assert!(trigger.request(ShutdownReason::WindowClose));
    assert!(!trigger.request(ShutdownReason::Interrupt));

    handle.await??;
    assert!(*done.borrow());
    assert_eq!(trigger.reason(), Some(ShutdownReason::WindowClose));

    let ticks = telemetry.snapshot().ticks;
    assert!((1..=3).contains(&ticks), "unexpected tick count {ticks}");
    let recorded = calls(&log);
    assert_eq!(recorded.len() as u64, ticks);
    assert!(recorded.iter().all(|(_, branch)| *branch == Branch::Work));
    assert_eq!(harness.indexer.stops.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn shutdown_during_startup_delay_skips_ticks() -> Result<()> {
    init_tracing();
    let harness = Harness::new(FakeIndexer::running_at(100, 100, 150));
    let config = test_config(TICK, Duration::from_secs(30))?;
    let orchestrator = Orchestrator::new(config, harness.collaborators());
    let trigger = orchestrator.shutdown_trigger();
    let telemetry = orchestrator.telemetry();
    let done = orchestrator.done_signal();

    let handle = tokio::spawn(orchestrator.run());
    sleep(Duration::from_secs(1)).await;
    trigger.request(ShutdownReason::Interrupt);
    handle.await??;

    assert!(*done.borrow());
    assert_eq!(telemetry.snapshot().ticks, 0);
    assert!(harness.status.log().ready.is_empty());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn hung_worker_does_not_block_teardown() -> Result<()> {
    init_tracing();
    let harness = Harness::new(FakeIndexer::running_at(100, 100, 150));
    let config = test_config(TICK, Duration::ZERO)?;
    let mut orchestrator = Orchestrator::new(config, harness.collaborators());
    let (protocol, log) = SharedRecordingProtocol::hanging();
    orchestrator.spawn_worker(protocol);

    let trigger = orchestrator.shutdown_trigger();
    let done = orchestrator.done_signal();
    let telemetry = orchestrator.telemetry();
    let handle = tokio::spawn(orchestrator.run());

    sleep(Duration::from_secs(4)).await;
    trigger.request(ShutdownReason::Interrupt);
    timeout(Duration::from_secs(5), handle).await???;

    assert!(*done.borrow());
    let snapshot = telemetry.snapshot();
    assert_eq!(snapshot.hung_shutdowns, 1);
    assert_eq!(calls(&log), vec![(1, Branch::Work)]);
    assert_eq!(log.lock().expect("protocol log poisoned").finalized, 0);
    Ok(())
}

#[tokio::test]
async fn offset_action_fires_on_every_tenth_tick() -> Result<()> {
    init_tracing();
    let harness = Harness::new(FakeIndexer::running_at(100, 100, 150));
    let mut orchestrator = orchestrator(&harness)?;

    let mut due = Vec::new();
    for _ in 0..21 {
        let context = orchestrator.tick().await;
        if context.offset_due {
            due.push(context.tick);
        }
    }
    assert_eq!(due, vec![10, 20]);
    assert_eq!(orchestrator.telemetry().snapshot().ticks, 21);

    orchestrator.close().await;
    Ok(())
}
