use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use crawltrail_event_bus::{to_mpsc, InMemoryBus};
use parking_lot::Mutex;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use trail_engine::adapters::{
    BusEventsPort, EofPolicy, LineTransport, ManualGate, MemoryQueue, QueuePublisher,
    RecordingMetrics, TrailRuntimeEvent,
};
use trail_engine::drain::{METRIC_CYCLES, METRIC_MESSAGES};
use trail_engine::fixtures::SAMPLE_EVENTS;
use trail_engine::{
    DrainState, FixedClock, ProgressGate, RendererPort, StopReason, TrailError,
    TrailMonitorBuilder, TrailPolicyView, TrailResult, WindowSnapshot,
};

#[derive(Default)]
struct CapturingRenderer {
    frames: Mutex<Vec<WindowSnapshot>>,
}

#[async_trait]
impl RendererPort for CapturingRenderer {
    async fn render(&self, snapshot: &WindowSnapshot) -> TrailResult<()> {
        self.frames.lock().push(snapshot.clone());
        Ok(())
    }
}

struct FailingRenderer;

#[async_trait]
impl RendererPort for FailingRenderer {
    async fn render(&self, _snapshot: &WindowSnapshot) -> TrailResult<()> {
        Err(TrailError::Render("display went away".into()))
    }
}

/// Reports the job active for a fixed number of polls.
struct CountdownGate {
    remaining: AtomicUsize,
}

impl CountdownGate {
    fn new(polls: usize) -> Self {
        Self {
            remaining: AtomicUsize::new(polls),
        }
    }
}

#[async_trait]
impl ProgressGate for CountdownGate {
    async fn progress(&self) -> bool {
        self.remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

fn policy() -> TrailPolicyView {
    TrailPolicyView {
        window_size: 10,
        batch_ceiling: 250,
        poll_interval_ms: 1_000,
        pull_timeout_ms: 100,
        closed_capacity: 100,
        ..TrailPolicyView::default()
    }
}

fn clock() -> Arc<FixedClock> {
    Arc::new(FixedClock(
        Utc.timestamp_millis_opt(1_444_002_263_000).unwrap(),
    ))
}

fn queue() -> (QueuePublisher, Arc<MemoryQueue>) {
    let (publisher, queue) = MemoryQueue::channel(1024);
    (publisher, Arc::new(queue))
}

fn publish_samples(publisher: &QueuePublisher) {
    for body in SAMPLE_EVENTS {
        publisher.try_publish(body).unwrap();
    }
}

#[tokio::test(start_paused = true)]
async fn cycle_drains_early_when_queue_goes_quiet() {
    let (publisher, queue) = queue();
    publish_samples(&publisher);
    let renderer = Arc::new(CapturingRenderer::default());
    let mut monitor = TrailMonitorBuilder::new()
        .with_policy(policy())
        .with_transport(queue.clone())
        .with_renderer(renderer.clone())
        .with_clock(clock())
        .build()
        .unwrap();

    let report = monitor.run_cycle().await.unwrap();
    assert_eq!(report.pulled, 4);
    assert_eq!(report.applied, 4);
    assert!(report.drained_early);
    assert!(report.rendered);
    assert_eq!(monitor.state(), DrainState::Rendering);
    assert_eq!(monitor.trail().closed_len(), 2);

    let frames = renderer.frames.lock();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].segments[0].key.as_str(), "aron.ahmadia.net/");
    assert_eq!(frames[0].markers[0].key.as_str(), "aron.ahmadia.net/");
}

#[tokio::test(start_paused = true)]
async fn batch_ceiling_caps_each_cycle() {
    let (publisher, queue) = queue();
    for i in 0..5 {
        publisher
            .try_publish(format!(
                r#"{{"eventType":"START","url":"http://host/{i}","timestamp":{}}}"#,
                1_000 + i
            ))
            .unwrap();
    }
    let mut monitor = TrailMonitorBuilder::new()
        .with_policy(TrailPolicyView {
            batch_ceiling: 3,
            ..policy()
        })
        .with_transport(queue.clone())
        .with_renderer(Arc::new(CapturingRenderer::default()))
        .with_clock(clock())
        .build()
        .unwrap();

    let first = monitor.run_cycle().await.unwrap();
    assert_eq!(first.pulled, 3);
    assert!(!first.drained_early);

    let second = monitor.run_cycle().await.unwrap();
    assert_eq!(second.pulled, 2);
    assert!(second.drained_early);
    assert_eq!(monitor.trail().open_len(), 5);
}

#[tokio::test(start_paused = true)]
async fn malformed_and_orphan_messages_do_not_stop_the_cycle() {
    let (publisher, queue) = queue();
    publisher.try_publish("not json at all").unwrap();
    publisher
        .try_publish(r#"{"eventType":"PAUSE","url":"http://a/","timestamp":1}"#)
        .unwrap();
    publisher
        .try_publish(r#"{"eventType":"END","url":"http://never-started/","timestamp":5}"#)
        .unwrap();
    publisher
        .try_publish(r#"{"eventType":"START","url":"http://a/","timestamp":10}"#)
        .unwrap();
    let metrics = Arc::new(RecordingMetrics::default());
    let mut monitor = TrailMonitorBuilder::new()
        .with_policy(policy())
        .with_transport(queue.clone())
        .with_renderer(Arc::new(CapturingRenderer::default()))
        .with_metrics(metrics.clone())
        .with_clock(clock())
        .build()
        .unwrap();

    let report = monitor.run_cycle().await.unwrap();
    assert_eq!(report.pulled, 4);
    assert_eq!(report.rejected, 2);
    assert_eq!(report.orphaned, 1);
    assert_eq!(report.applied, 1);
    assert_eq!(monitor.trail().len(), 1);
    assert_eq!(
        metrics.count(METRIC_MESSAGES, Some(("outcome", "rejected"))),
        2
    );
    assert_eq!(metrics.count(METRIC_MESSAGES, Some(("outcome", "orphan"))), 1);
    assert_eq!(metrics.count(METRIC_CYCLES, None), 1);
}

#[tokio::test(start_paused = true)]
async fn empty_trail_skips_rendering() {
    let (_publisher, queue) = queue();
    let renderer = Arc::new(CapturingRenderer::default());
    let mut monitor = TrailMonitorBuilder::new()
        .with_policy(policy())
        .with_transport(queue.clone())
        .with_renderer(renderer.clone())
        .build()
        .unwrap();

    let report = monitor.run_cycle().await.unwrap();
    assert!(!report.rendered);
    assert!(renderer.frames.lock().is_empty());
}

#[tokio::test(start_paused = true)]
async fn renderer_failure_is_not_fatal() {
    let (publisher, queue) = queue();
    publish_samples(&publisher);
    let mut monitor = TrailMonitorBuilder::new()
        .with_policy(policy())
        .with_transport(queue.clone())
        .with_gate(Arc::new(CountdownGate::new(2)))
        .with_renderer(Arc::new(FailingRenderer))
        .build()
        .unwrap();

    let report = monitor.run(CancellationToken::new()).await.unwrap();
    assert_eq!(report.cycles, 2);
    assert_eq!(report.stop, StopReason::JobFinished);
}

#[tokio::test(start_paused = true)]
async fn inactive_job_stops_session_and_releases_transport() {
    let (publisher, queue) = queue();
    publish_samples(&publisher);
    let mut monitor = TrailMonitorBuilder::new()
        .with_policy(policy())
        .with_transport(queue.clone())
        .with_gate(Arc::new(CountdownGate::new(3)))
        .with_renderer(Arc::new(CapturingRenderer::default()))
        .build()
        .unwrap();

    let report = monitor.run(CancellationToken::new()).await.unwrap();
    assert_eq!(report.stop, StopReason::JobFinished);
    assert_eq!(report.cycles, 3);
    assert_eq!(report.messages, 4);
    assert_eq!(monitor.state(), DrainState::Stopped);
    assert_eq!(queue.close_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn manual_gate_finish_ends_the_session() {
    let (_publisher, queue) = queue();
    let (switch, gate) = ManualGate::channel();
    switch.finish();
    let mut monitor = TrailMonitorBuilder::new()
        .with_policy(policy())
        .with_transport(queue.clone())
        .with_gate(Arc::new(gate))
        .with_renderer(Arc::new(CapturingRenderer::default()))
        .build()
        .unwrap();

    let report = monitor.run(CancellationToken::new()).await.unwrap();
    assert_eq!(report.cycles, 0);
    assert_eq!(report.stop, StopReason::JobFinished);
    assert_eq!(queue.close_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn undecodable_bytes_in_a_line_feed_only_reject_that_line() {
    let mut feed = b"\xff\xfe not text\n".to_vec();
    feed.extend_from_slice(br#"{"eventType":"START","url":"http://a.example/","timestamp":1000}"#);
    feed.push(b'\n');
    let (switch, gate) = ManualGate::channel();
    let transport =
        LineTransport::new(Cursor::new(feed), EofPolicy::Idle, "mem").with_eof_switch(switch);
    let mut monitor = TrailMonitorBuilder::new()
        .with_policy(policy())
        .with_transport(Arc::new(transport))
        .with_gate(Arc::new(gate))
        .with_renderer(Arc::new(CapturingRenderer::default()))
        .with_clock(clock())
        .build()
        .unwrap();

    let report = monitor.run(CancellationToken::new()).await.unwrap();
    assert_eq!(report.stop, StopReason::JobFinished);
    assert_eq!(report.messages, 2);
    assert_eq!(report.rejected, 1);
    assert_eq!(monitor.trail().open_len(), 1);
}

#[tokio::test(start_paused = true)]
async fn lost_connection_is_fatal_and_still_releases() {
    let (publisher, queue) = queue();
    publisher.sever();
    let mut monitor = TrailMonitorBuilder::new()
        .with_policy(policy())
        .with_transport(queue.clone())
        .with_renderer(Arc::new(CapturingRenderer::default()))
        .build()
        .unwrap();

    let err = monitor.run(CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, TrailError::Transport(_)));
    assert!(err.is_fatal());
    assert_eq!(monitor.state(), DrainState::Stopped);
    assert_eq!(queue.close_calls(), 1);
    assert!(queue.is_closed());
}

#[tokio::test(start_paused = true)]
async fn cancellation_interrupts_the_inter_cycle_sleep() {
    let (_publisher, queue) = queue();
    let mut monitor = TrailMonitorBuilder::new()
        .with_policy(TrailPolicyView {
            poll_interval_ms: 60_000,
            ..policy()
        })
        .with_transport(queue.clone())
        .with_renderer(Arc::new(CapturingRenderer::default()))
        .build()
        .unwrap();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(5)).await;
        trigger.cancel();
    });

    let started = tokio::time::Instant::now();
    let report = monitor.run(cancel).await.unwrap();
    assert_eq!(report.stop, StopReason::Cancelled);
    assert_eq!(report.cycles, 1);
    assert!(started.elapsed() < Duration::from_secs(60));
    assert_eq!(queue.close_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn pre_cancelled_session_never_polls() {
    let (_publisher, queue) = queue();
    let gate = Arc::new(CountdownGate::new(10));
    let mut monitor = TrailMonitorBuilder::new()
        .with_policy(policy())
        .with_transport(queue.clone())
        .with_gate(gate.clone())
        .with_renderer(Arc::new(CapturingRenderer::default()))
        .build()
        .unwrap();

    let cancel = CancellationToken::new();
    cancel.cancel();
    let report = monitor.run(cancel).await.unwrap();
    assert_eq!(report.stop, StopReason::Cancelled);
    assert_eq!(report.cycles, 0);
    assert_eq!(gate.remaining.load(Ordering::SeqCst), 10);
    assert_eq!(queue.close_calls(), 1);

    let again = monitor.run(CancellationToken::new()).await.unwrap_err();
    assert!(matches!(again, TrailError::InvalidArg(_)));
    assert_eq!(queue.close_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn session_events_reach_the_bus() {
    let (publisher, queue) = queue();
    publish_samples(&publisher);
    let bus = InMemoryBus::<TrailRuntimeEvent>::new(16);
    let mut rx = to_mpsc(bus.clone(), 16);
    let mut monitor = TrailMonitorBuilder::new()
        .with_policy(policy())
        .with_transport(queue.clone())
        .with_gate(Arc::new(CountdownGate::new(1)))
        .with_renderer(Arc::new(CapturingRenderer::default()))
        .with_events(Arc::new(BusEventsPort::new(bus.clone())))
        .build()
        .unwrap();

    monitor.run(CancellationToken::new()).await.unwrap();

    // publishes are spawned, so arrival order is not guaranteed
    let events = [rx.recv().await.unwrap(), rx.recv().await.unwrap()];
    assert!(events
        .iter()
        .any(|e| matches!(e, TrailRuntimeEvent::CycleCompleted { cycle: 1, .. })));
    assert!(events
        .iter()
        .any(|e| matches!(e, TrailRuntimeEvent::SessionStopped { .. })));
}

#[test]
fn builder_requires_transport_and_renderer() {
    let err = TrailMonitorBuilder::new()
        .with_policy(policy())
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, TrailError::InvalidArg(_)));
}

#[test]
fn builder_rejects_invalid_policy() {
    let (_publisher, queue) = queue();
    let err = TrailMonitorBuilder::new()
        .with_policy(TrailPolicyView {
            window_size: 0,
            ..policy()
        })
        .with_transport(queue)
        .with_renderer(Arc::new(CapturingRenderer::default()))
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, TrailError::InvalidArg(_)));
}
