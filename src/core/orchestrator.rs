//! # Retry: orchestrates attempts, result delivery, and cancellation.
//!
//! [`Retry`] owns the command, the policy, the event bus, and the collaborators
//! of a run (gate, timer, subscribers). [`Retry::run`] resolves the executable,
//! spawns every attempt up front, and hands back a [`ResultStream`].
//!
//! ## High-level architecture
//! ```text
//! Retry::run(token) ──► ResultStream (consumer end, cancels run on drop)
//!        │
//!        └─► driver task
//!              ├─ subscriber listener: Bus.subscribe() ─► SubscriberSet::emit(&Event)
//!              ├─ CommandSpec::resolve()
//!              │     └─ Err ─► send lookup result, no attempts
//!              ├─ spawn Attempt[1..=max] into a JoinSet
//!              │     each: gate ─► delay ─► ProcessRunner ─► send result
//!              ├─ join all attempts
//!              ├─ publish RunFinished, wait for subscribers to drain (bounded by grace)
//!              └─ drop last sender ─► stream ends
//! ```
//!
//! ## Rules
//! - The lookup happens-before any attempt is spawned; a failure yields exactly one result
//! - Exactly `max` attempts are spawned once the lookup succeeds
//! - At most one synthetic cancellation result per run (see [`Attempt`])
//! - The stream ends only after every attempt terminated and subscribers drained
//!   or exceeded the grace period (stuck subscribers are aborted)
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use retry_exec::{CommandSpec, Retry, RetryPolicy};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let policy = RetryPolicy::new(3)
//!         .with_concurrency(2)
//!         .with_delay(Duration::from_millis(10));
//!     let retry = Retry::builder(CommandSpec::with_args("sh", ["-c", "exit 1"]), policy).build()?;
//!
//!     let results = retry.run(CancellationToken::new()).collect_all().await;
//!     assert_eq!(results.len(), 3);
//!     assert!(results.iter().all(|r| r.executed && !r.success));
//!     Ok(())
//! }
//! ```
//!
//! [`Attempt`]: crate::core::attempt

use std::sync::Arc;
use std::time::Duration;

use tokio::{
    sync::{broadcast::error::RecvError, mpsc},
    task::{JoinHandle, JoinSet},
};
use tokio_util::sync::CancellationToken;

use crate::{
    command::{AttemptResult, CommandSpec, ProcessRunner},
    config::RetryPolicy,
    core::{
        attempt::{Attempt, AttemptContext},
        gate::{Gate, SemaphoreGate},
        once::SignalOnce,
        stream::ResultStream,
        timer::{Timer, TokioTimer},
    },
    error::ConfigError,
    events::{Bus, Event, EventKind},
    subscribers::{Subscribe, SubscriberSet},
};

/// Default capacity of the event bus ring buffer.
const DEFAULT_BUS_CAPACITY: usize = 1024;

/// Default time subscribers get to drain after the run finished.
const DEFAULT_GRACE: Duration = Duration::from_secs(5);

/// Builder for a [`Retry`] with optional collaborators.
pub struct RetryBuilder {
    command: CommandSpec,
    policy: RetryPolicy,
    timer: Arc<dyn Timer>,
    gate: Option<Arc<dyn Gate>>,
    bus_capacity: usize,
    subscribers: Vec<Arc<dyn Subscribe>>,
    grace: Duration,
}

impl RetryBuilder {
    /// Creates a builder with the wall-clock timer and a semaphore gate.
    pub fn new(command: CommandSpec, policy: RetryPolicy) -> Self {
        Self {
            command,
            policy,
            timer: Arc::new(TokioTimer),
            gate: None,
            bus_capacity: DEFAULT_BUS_CAPACITY,
            subscribers: Vec::new(),
            grace: DEFAULT_GRACE,
        }
    }

    /// Replaces the time source used for the inter-attempt delay.
    pub fn with_timer(mut self, timer: impl Timer) -> Self {
        self.timer = Arc::new(timer);
        self
    }

    /// Replaces the concurrency gate.
    ///
    /// By default a [`SemaphoreGate`] sized by [`RetryPolicy::slots`] is created per run.
    /// A custom gate disables CPU time accounting, since attempts may overlap.
    pub fn with_gate(mut self, gate: Arc<dyn Gate>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Sets the event bus capacity (min 1).
    pub fn with_bus_capacity(mut self, capacity: usize) -> Self {
        self.bus_capacity = capacity;
        self
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive lifecycle events through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Sets how long subscribers may take to drain once the run finished.
    ///
    /// Subscribers still busy afterwards are aborted and a
    /// `GraceExceeded` event is published. Default: 5s.
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Validates the policy and builds the [`Retry`].
    pub fn build(self) -> Result<Retry, ConfigError> {
        self.policy.validate()?;
        Ok(Retry {
            command: self.command,
            policy: self.policy,
            timer: self.timer,
            gate: self.gate,
            bus: Bus::new(self.bus_capacity),
            subscribers: self.subscribers,
            grace: self.grace,
        })
    }
}

/// A validated, ready-to-run retry of one command.
pub struct Retry {
    command: CommandSpec,
    policy: RetryPolicy,
    timer: Arc<dyn Timer>,
    gate: Option<Arc<dyn Gate>>,
    bus: Bus,
    subscribers: Vec<Arc<dyn Subscribe>>,
    grace: Duration,
}

impl Retry {
    /// Starts building a retry.
    pub fn builder(command: CommandSpec, policy: RetryPolicy) -> RetryBuilder {
        RetryBuilder::new(command, policy)
    }

    /// Shorthand for a retry with default collaborators.
    pub fn new(command: CommandSpec, policy: RetryPolicy) -> Result<Self, ConfigError> {
        RetryBuilder::new(command, policy).build()
    }

    /// Event bus of this retry; subscribe before calling [`Retry::run`] to see every event.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// The command being retried.
    pub fn command(&self) -> &CommandSpec {
        &self.command
    }

    /// The validated policy.
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Starts the run and returns its result stream.
    ///
    /// `token` cancels the run: waiting and sleeping attempts stop, running
    /// processes are killed. Dropping the returned stream has the same effect.
    ///
    /// Must be called from within a tokio runtime.
    pub fn run(self, token: CancellationToken) -> ResultStream {
        let token = token.child_token();
        let guard = token.clone().drop_guard();
        let (tx, rx) = mpsc::channel(self.policy.slots());

        tokio::spawn(self.drive(token, tx));
        ResultStream::new(rx, guard)
    }

    /// Driver task: lookup, spawn attempts, join, flush subscribers.
    async fn drive(self, token: CancellationToken, tx: mpsc::Sender<AttemptResult>) {
        let Retry {
            command,
            policy,
            timer,
            gate,
            bus,
            subscribers,
            grace,
        } = self;
        let name = command.name_arc();
        let listener = spawn_listener(&bus, subscribers, grace);

        match command.resolve() {
            Err(err) => {
                bus.publish(
                    Event::new(EventKind::LookupFailed)
                        .with_command(Arc::clone(&name))
                        .with_reason(err.to_string()),
                );
                let _ = tx.send(AttemptResult::not_executed(None, err)).await;
            }
            Ok(program) => {
                // `validate` rejects values above u32::MAX.
                let attempts = u32::try_from(policy.max).unwrap_or(u32::MAX);
                bus.publish(
                    Event::new(EventKind::RunStarted)
                        .with_command(Arc::clone(&name))
                        .with_attempt(attempts),
                );

                let runner = ProcessRunner::new(Arc::clone(&name), program, command.args_arc())
                    .with_cpu_times(gate.is_none() && policy.is_sequential());
                let ctx = AttemptContext {
                    command: Arc::clone(&name),
                    runner,
                    gate: gate.unwrap_or_else(|| -> Arc<dyn Gate> {
                        Arc::new(SemaphoreGate::new(policy.slots()))
                    }),
                    timer,
                    delay: policy.sleep(),
                    cancel_reported: Arc::new(SignalOnce::new()),
                    results: tx.clone(),
                    bus: bus.clone(),
                };

                let mut set = JoinSet::new();
                for index in 1..=attempts {
                    set.spawn(Attempt::new(index, ctx.clone()).run(token.clone()));
                }
                drop(ctx);
                while set.join_next().await.is_some() {}
            }
        }

        bus.publish(Event::new(EventKind::RunFinished).with_command(name));
        if let Some(listener) = listener {
            let _ = listener.await;
        }
        drop(tx);
    }
}

/// Forwards bus events to the subscriber set until the run finishes.
fn spawn_listener(
    bus: &Bus,
    subscribers: Vec<Arc<dyn Subscribe>>,
    grace: Duration,
) -> Option<JoinHandle<()>> {
    if subscribers.is_empty() {
        return None;
    }
    let mut rx = bus.subscribe();
    let set = SubscriberSet::new(subscribers, bus.clone());

    Some(tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(ev) => {
                    set.emit(&ev);
                    if ev.is_run_finished() {
                        break;
                    }
                }
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
        set.shutdown_within(grace).await;
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::timer::manual::manual_timer;
    use crate::core::gate::Slot;
    use crate::error::RetryError;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    fn sh(script: &str) -> CommandSpec {
        CommandSpec::with_args("/bin/sh", ["-c", script])
    }

    /// Waits until `n` events of `kind` were published.
    async fn wait_for(rx: &mut tokio::sync::broadcast::Receiver<Event>, kind: EventKind, n: usize) {
        let mut seen = 0;
        while seen < n {
            let ev = tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .expect("event in time")
                .expect("bus open");
            if ev.kind == kind {
                seen += 1;
            }
        }
    }

    #[tokio::test]
    async fn successful_command_yields_one_result_per_attempt() {
        for (max, concurrency) in [(1, 1), (3, 1), (4, 2), (5, 5)] {
            let policy = RetryPolicy::new(max).with_concurrency(concurrency);
            let results = Retry::new(CommandSpec::with_args("echo", ["foo"]), policy)
                .expect("valid")
                .run(CancellationToken::new())
                .collect_all()
                .await;

            assert_eq!(results.len(), max);
            for r in &results {
                assert!(r.executed);
                assert!(r.error.is_none(), "unexpected error {:?}", r.error);
                assert_eq!(r.stdout_lossy(), "foo\n");
            }
        }
    }

    #[tokio::test]
    async fn attempt_indices_cover_the_whole_policy() {
        let policy = RetryPolicy::new(4).with_concurrency(4);
        let results = Retry::new(CommandSpec::new("true"), policy)
            .expect("valid")
            .run(CancellationToken::new())
            .collect_all()
            .await;

        let mut indices: Vec<u32> = results.iter().filter_map(|r| r.attempt).collect();
        indices.sort_unstable();
        assert_eq!(indices, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn missing_executable_short_circuits() {
        let retry = Retry::new(
            CommandSpec::new("unknown-command-for-retry-tests"),
            RetryPolicy::new(5),
        )
        .expect("valid");
        let mut rx = retry.bus().subscribe();
        let results = retry.run(CancellationToken::new()).collect_all().await;

        assert_eq!(results.len(), 1);
        let r = &results[0];
        assert!(!r.executed);
        assert!(r.attempt.is_none());
        assert!(matches!(r.error, Some(RetryError::NotFound { .. })));
        assert_eq!(
            r.error.as_ref().map(ToString::to_string).as_deref(),
            Some(r#"exec: "unknown-command-for-retry-tests": executable file not found in $PATH"#)
        );

        let mut kinds = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            kinds.push(ev.kind);
        }
        assert_eq!(kinds, vec![EventKind::LookupFailed, EventKind::RunFinished]);
    }

    #[tokio::test]
    async fn failing_command_is_retried_to_the_end() {
        let results = Retry::new(sh("exit 1"), RetryPolicy::new(3))
            .expect("valid")
            .run(CancellationToken::new())
            .collect_all()
            .await;

        assert_eq!(results.len(), 3);
        for r in &results {
            assert!(r.executed);
            assert!(matches!(r.error, Some(RetryError::Exit { code: 1 })));
        }
    }

    #[tokio::test]
    async fn stderr_output_is_not_fatal() {
        let results = Retry::new(sh(">&2 echo \"an error\""), RetryPolicy::new(2))
            .expect("valid")
            .run(CancellationToken::new())
            .collect_all()
            .await;

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.stderr_lossy() == "an error\n"));
    }

    #[tokio::test]
    async fn running_attempts_never_exceed_concurrency() {
        let policy = RetryPolicy::new(6).with_concurrency(2);
        let retry = Retry::new(sh("sleep 0.05"), policy).expect("valid");
        let mut rx = retry.bus().subscribe();
        let results = retry.run(CancellationToken::new()).collect_all().await;
        assert_eq!(results.len(), 6);

        let (mut running, mut peak) = (0usize, 0usize);
        while let Ok(ev) = rx.try_recv() {
            match ev.kind {
                EventKind::AttemptStarting => {
                    running += 1;
                    peak = peak.max(running);
                }
                EventKind::AttemptFinished => running -= 1,
                _ => {}
            }
        }
        assert_eq!(running, 0);
        assert!(peak <= 2, "peak {peak} exceeds concurrency");
    }

    #[tokio::test]
    async fn cancel_before_any_slot_yields_single_result() {
        let token = CancellationToken::new();
        token.cancel();

        let policy = RetryPolicy::new(3).with_concurrency(2);
        let retry = Retry::new(sh("sleep 10"), policy).expect("valid");
        let mut rx = retry.bus().subscribe();
        let results = retry.run(token).collect_all().await;

        assert_eq!(results.len(), 1);
        assert!(!results[0].executed);
        assert!(results[0].is_canceled());

        while let Ok(ev) = rx.try_recv() {
            assert_ne!(ev.kind, EventKind::AttemptStarting);
        }
    }

    #[tokio::test]
    async fn cancel_while_sleeping_releases_and_reports_once() {
        let (timer, _ticker) = manual_timer();
        let policy = RetryPolicy::new(2).with_delay(Duration::from_secs(5));
        let retry = Retry::builder(CommandSpec::new("true"), policy)
            .with_timer(timer)
            .build()
            .expect("valid");
        let mut rx = retry.bus().subscribe();
        let token = CancellationToken::new();
        let stream = retry.run(token.clone());

        wait_for(&mut rx, EventKind::DelayScheduled, 1).await;
        token.cancel();

        let results = stream.collect_all().await;
        assert_eq!(results.len(), 1);
        assert!(results[0].is_canceled());
        assert!(!results[0].executed);
    }

    #[tokio::test]
    async fn cancel_mid_run_reports_running_attempts_individually() {
        let policy = RetryPolicy::new(4).with_concurrency(2);
        let retry = Retry::new(sh("sleep 10"), policy).expect("valid");
        let mut rx = retry.bus().subscribe();
        let token = CancellationToken::new();
        let stream = retry.run(token.clone());

        wait_for(&mut rx, EventKind::AttemptStarting, 2).await;
        token.cancel();

        let results = tokio::time::timeout(Duration::from_secs(5), stream.collect_all())
            .await
            .expect("stream closes after cancel");
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.is_canceled()));
        assert_eq!(results.iter().filter(|r| r.executed).count(), 2);
        assert_eq!(results.iter().filter(|r| !r.executed).count(), 1);
    }

    #[tokio::test]
    async fn delay_is_applied_once_per_attempt() {
        let (timer, ticker) = manual_timer();
        let policy = RetryPolicy::new(2).with_delay(Duration::from_secs(5));
        let retry = Retry::builder(CommandSpec::new("echo"), policy)
            .with_timer(timer)
            .build()
            .expect("valid");
        let mut rx = retry.bus().subscribe();
        let mut stream = retry.run(CancellationToken::new());

        wait_for(&mut rx, EventKind::DelayScheduled, 1).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(stream.try_next().is_none(), "ran before its delay elapsed");

        ticker.tick();
        assert!(stream.next().await.is_some());
        ticker.tick();
        assert!(stream.next().await.is_some());
        assert!(stream.next().await.is_none());

        assert_eq!(
            ticker.requested(),
            vec![Duration::from_secs(5), Duration::from_secs(5)]
        );
    }

    #[tokio::test]
    async fn gate_holds_back_attempts_beyond_concurrency() {
        let (timer, ticker) = manual_timer();
        let policy = RetryPolicy::new(4)
            .with_concurrency(2)
            .with_delay(Duration::from_millis(1));
        let retry = Retry::builder(CommandSpec::new("echo"), policy)
            .with_timer(timer)
            .build()
            .expect("valid");
        let mut stream = retry.run(CancellationToken::new());

        ticker.tick();
        ticker.tick();
        assert!(stream.next().await.is_some());
        assert!(stream.next().await.is_some());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(stream.try_next().is_none(), "no result expected before ticks");

        ticker.tick();
        ticker.tick();
        assert!(stream.next().await.is_some());
        assert!(stream.next().await.is_some());
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn dropping_the_stream_cancels_the_run() {
        let retry = Retry::new(sh("sleep 10"), RetryPolicy::new(2)).expect("valid");
        let mut rx = retry.bus().subscribe();
        let stream = retry.run(CancellationToken::new());

        wait_for(&mut rx, EventKind::AttemptStarting, 1).await;
        drop(stream);
        wait_for(&mut rx, EventKind::RunFinished, 1).await;
    }

    #[tokio::test]
    async fn invalid_policy_is_rejected() {
        let err = Retry::new(CommandSpec::new("true"), RetryPolicy::new(0))
            .err()
            .expect("rejected");
        assert_eq!(err, ConfigError::ZeroAttempts);
    }

    #[derive(Default)]
    struct Recorder {
        kinds: Mutex<Vec<EventKind>>,
    }

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, event: &Event) {
            if let Ok(mut kinds) = self.kinds.lock() {
                kinds.push(event.kind);
            }
        }

        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    #[tokio::test]
    async fn subscribers_are_drained_before_stream_ends() {
        let recorder = Arc::new(Recorder::default());
        let results = Retry::builder(CommandSpec::new("true"), RetryPolicy::new(2))
            .with_subscribers(vec![recorder.clone()])
            .build()
            .expect("valid")
            .run(CancellationToken::new())
            .collect_all()
            .await;
        assert_eq!(results.len(), 2);

        let kinds = recorder.kinds.lock().expect("lock").clone();
        assert_eq!(kinds.first(), Some(&EventKind::RunStarted));
        assert_eq!(kinds.last(), Some(&EventKind::RunFinished));
        let finished = kinds
            .iter()
            .filter(|k| **k == EventKind::AttemptFinished)
            .count();
        assert_eq!(finished, 2);
    }

    struct Hung;

    #[async_trait]
    impl Subscribe for Hung {
        async fn on_event(&self, _event: &Event) {
            std::future::pending::<()>().await;
        }

        fn name(&self) -> &'static str {
            "hung"
        }
    }

    #[tokio::test]
    async fn stuck_subscriber_cannot_hold_the_stream_open() {
        let retry = Retry::builder(CommandSpec::new("true"), RetryPolicy::new(2))
            .with_subscribers(vec![Arc::new(Hung)])
            .with_grace(Duration::from_millis(100))
            .build()
            .expect("valid");
        let mut rx = retry.bus().subscribe();
        let token = CancellationToken::new();
        let stream = retry.run(token.clone());
        token.cancel();

        let results = tokio::time::timeout(Duration::from_secs(3), stream.collect_all())
            .await
            .expect("stream closes once the grace period expires");
        assert!(!results.is_empty());

        let mut grace = None;
        while let Ok(ev) = rx.try_recv() {
            if ev.kind == EventKind::GraceExceeded {
                grace = ev.reason;
            }
        }
        assert_eq!(grace.as_deref(), Some("stuck subscribers: hung"));
    }

    /// Unlimited gate that counts acquisitions.
    #[derive(Default)]
    struct CountingGate {
        acquired: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl Gate for CountingGate {
        async fn acquire(&self, token: &CancellationToken) -> Result<Slot, RetryError> {
            if token.is_cancelled() {
                return Err(RetryError::Canceled);
            }
            self.acquired
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(Slot::unbounded())
        }
    }

    #[tokio::test]
    async fn custom_gate_serves_every_attempt() {
        let gate = Arc::new(CountingGate::default());
        let results = Retry::builder(CommandSpec::new("true"), RetryPolicy::new(3))
            .with_gate(gate.clone())
            .build()
            .expect("valid")
            .run(CancellationToken::new())
            .collect_all()
            .await;

        assert_eq!(results.len(), 3);
        assert_eq!(gate.acquired.load(std::sync::atomic::Ordering::SeqCst), 3);
        // Overlap is up to the gate, so CPU time is not attributed.
        assert!(results.iter().all(|r| r.user_time.is_none() && r.system_time.is_none()));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn default_sequential_gate_measures_cpu_time() {
        let results = Retry::new(CommandSpec::new("true"), RetryPolicy::new(2))
            .expect("valid")
            .run(CancellationToken::new())
            .collect_all()
            .await;

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.user_time.is_some() && r.system_time.is_some()));
    }

    #[tokio::test]
    async fn bus_capacity_bounds_the_event_backlog() {
        let retry = Retry::builder(CommandSpec::new("true"), RetryPolicy::new(2))
            .with_bus_capacity(1)
            .build()
            .expect("valid");
        let mut rx = retry.bus().subscribe();
        let results = retry.run(CancellationToken::new()).collect_all().await;
        assert_eq!(results.len(), 2);

        assert!(matches!(
            rx.try_recv(),
            Err(tokio::sync::broadcast::error::TryRecvError::Lagged(_))
        ));
        let last = rx.try_recv().expect("newest event kept");
        assert_eq!(last.kind, EventKind::RunFinished);
    }

    #[test]
    fn oversized_policy_is_rejected() {
        #[cfg(target_pointer_width = "64")]
        {
            let max = usize::try_from(u64::from(u32::MAX) + 1).expect("64-bit");
            let err = Retry::new(CommandSpec::new("true"), RetryPolicy::new(max))
                .err()
                .expect("rejected");
            assert_eq!(err, ConfigError::TooManyAttempts { limit: u32::MAX });
        }
    }
}
