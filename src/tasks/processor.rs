use std::{sync::Arc, time::Duration};

use tokio::{task::JoinHandle, time::sleep};

use crate::{
    classifier::Classifier,
    db::stats::StatsRecorder,
    domain::{Candidate, ErrorKind, Verdict},
    infrastructure::shutdown::ShutdownListener,
    page::surface::VisualSurface,
    tasks::{backoff::BackoffController, queue::ScanQueue},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Queue empty, waiting for admission to wake the loop.
    Idle,
    /// One classification in flight for the queue head.
    Draining,
    /// Attempt finished; the inter-attempt delay is running.
    Waiting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Head classified and removed.
    Retired(Verdict),
    /// Rate limited; head stays in place for the next attempt.
    Deferred,
    /// Unrecoverable for this page; head removed and uncovered.
    Dropped(ErrorKind),
}

/// Single consumer of the scan queue. Holds the only backoff state, and never
/// has more than one classification outstanding.
pub struct ScanWorker {
    queue: Arc<ScanQueue<Candidate>>,
    classifier: Arc<dyn Classifier>,
    surface: Arc<dyn VisualSurface>,
    stats: Arc<dyn StatsRecorder>,
    backoff: BackoffController,
    state: WorkerState,
}

impl ScanWorker {
    pub fn new(
        queue: Arc<ScanQueue<Candidate>>,
        classifier: Arc<dyn Classifier>,
        surface: Arc<dyn VisualSurface>,
        stats: Arc<dyn StatsRecorder>,
        backoff: BackoffController,
    ) -> Self {
        Self {
            queue,
            classifier,
            surface,
            stats,
            backoff,
            state: WorkerState::Idle,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> WorkerState {
        self.state
    }

    #[cfg(test)]
    pub fn backoff(&self) -> &BackoffController {
        &self.backoff
    }

    pub fn spawn(self, mut shutdown: ShutdownListener) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run(&mut shutdown).await;
        })
    }

    pub async fn run(mut self, shutdown: &mut ShutdownListener) {
        loop {
            if shutdown.is_triggered() {
                break;
            }

            let step = tokio::select! {
                step = self.step() => step,
                _ = shutdown.notified() => break,
            };

            let Some((_, delay)) = step else {
                self.state = WorkerState::Idle;
                tokio::select! {
                    _ = self.queue.wait_for_work() => {}
                    _ = shutdown.notified() => break,
                }
                continue;
            };

            tokio::select! {
                _ = sleep(delay) => {}
                _ = shutdown.notified() => break,
            }
        }
        if self.queue.is_empty() {
            tracing::info!(target: "worker", "scan worker stopped");
        } else {
            tracing::info!(
                target: "worker",
                abandoned = self.queue.len(),
                "scan worker stopped with images still queued"
            );
        }
    }

    /// Runs one `Draining` pass on the queue head. Returns `None` when there
    /// is nothing to do, otherwise the outcome and the delay to wait before
    /// the next pass.
    pub async fn step(&mut self) -> Option<(StepOutcome, Duration)> {
        let candidate = self.queue.peek()?;
        self.state = WorkerState::Draining;
        tracing::debug!(
            target: "worker",
            src = candidate.src(),
            queued = self.queue.len(),
            "classifying image"
        );

        let outcome = match self.classifier.classify(&candidate).await {
            Ok(verdict) => {
                self.queue.pop();
                if self.backoff.is_cooling_down() {
                    tracing::info!(target: "worker", "classifier accepting requests again");
                }
                self.backoff.reset();
                match verdict {
                    Verdict::Safe => self.surface.mark_clear(&candidate),
                    Verdict::Unsafe => self.surface.mark_blocked(&candidate),
                }
                tracing::debug!(
                    target: "worker",
                    src = candidate.src(),
                    state = ?candidate.visual_state(),
                    "verdict applied"
                );
                if let Err(err) = self.stats.record(verdict).await {
                    tracing::warn!(target: "worker", error = %err, "failed to update counters");
                }
                StepOutcome::Retired(verdict)
            }
            Err(err) if err.kind() == ErrorKind::RateLimited => {
                self.backoff.escalate();
                tracing::warn!(
                    target: "worker",
                    src = candidate.src(),
                    cooldown_ms = self.backoff.current().as_millis() as u64,
                    "rate limited; pausing before retry"
                );
                StepOutcome::Deferred
            }
            Err(err) => {
                self.queue.pop();
                self.surface.mark_clear(&candidate);
                tracing::warn!(
                    target: "worker",
                    src = candidate.src(),
                    error = %err,
                    "skipping image after classification failure"
                );
                StepOutcome::Dropped(err.kind())
            }
        };

        self.state = WorkerState::Waiting;
        Some((outcome, self.backoff.current()))
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::{HashMap, VecDeque},
        sync::atomic::{AtomicI64, AtomicUsize, Ordering},
    };

    use futures::future::BoxFuture;
    use parking_lot::Mutex;
    use tokio::time::Instant;

    use super::*;
    use crate::{
        config::PipelineConfig,
        domain::{ClassifyError, ImageElement, VisualState},
        infrastructure::shutdown::Shutdown,
        page::surface::InlineStyleSurface,
        tasks::{admission::AdmissionFilter, ScanPipeline},
    };

    type Scripted = Result<Verdict, ClassifyError>;

    /// Replies from a per-source script and records when each attempt started.
    #[derive(Default)]
    struct ScriptedClassifier {
        scripts: Mutex<HashMap<String, VecDeque<Scripted>>>,
        attempts: Mutex<Vec<(String, Instant)>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl ScriptedClassifier {
        fn script(&self, src: &str, replies: Vec<Scripted>) {
            self.scripts.lock().insert(src.to_string(), replies.into());
        }

        fn attempted(&self) -> Vec<String> {
            self.attempts.lock().iter().map(|(src, _)| src.clone()).collect()
        }

        fn started_at(&self) -> Vec<Instant> {
            self.attempts.lock().iter().map(|(_, at)| *at).collect()
        }
    }

    impl Classifier for ScriptedClassifier {
        fn classify<'a>(
            &'a self,
            image: &'a ImageElement,
        ) -> BoxFuture<'a, Result<Verdict, ClassifyError>> {
            Box::pin(async move {
                let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                self.max_in_flight.fetch_max(running, Ordering::SeqCst);
                self.attempts
                    .lock()
                    .push((image.src().to_string(), Instant::now()));

                // simulated round trip
                sleep(Duration::from_millis(100)).await;

                let reply = self
                    .scripts
                    .lock()
                    .get_mut(image.src())
                    .and_then(|replies| replies.pop_front())
                    .unwrap_or(Ok(Verdict::Safe));
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                reply
            })
        }
    }

    #[derive(Default)]
    struct MemoryStats {
        scanned: AtomicI64,
        blocked: AtomicI64,
    }

    impl MemoryStats {
        fn read(&self) -> (i64, i64) {
            (
                self.scanned.load(Ordering::SeqCst),
                self.blocked.load(Ordering::SeqCst),
            )
        }
    }

    impl StatsRecorder for MemoryStats {
        fn record<'a>(&'a self, verdict: Verdict) -> BoxFuture<'a, anyhow::Result<()>> {
            Box::pin(async move {
                self.scanned.fetch_add(1, Ordering::SeqCst);
                if verdict == Verdict::Unsafe {
                    self.blocked.fetch_add(1, Ordering::SeqCst);
                }
                Ok(())
            })
        }
    }

    struct Harness {
        filter: AdmissionFilter,
        worker: ScanWorker,
        queue: Arc<ScanQueue<Candidate>>,
        classifier: Arc<ScriptedClassifier>,
        stats: Arc<MemoryStats>,
    }

    fn harness() -> Harness {
        let classifier = Arc::new(ScriptedClassifier::default());
        let stats = Arc::new(MemoryStats::default());
        let pipeline = ScanPipeline::new(
            &PipelineConfig::default(),
            classifier.clone(),
            Arc::new(InlineStyleSurface),
            stats.clone(),
        );
        let queue = pipeline.queue.clone();
        Harness {
            filter: pipeline.filter,
            worker: pipeline.worker,
            queue,
            classifier,
            stats,
        }
    }

    fn image(name: &str) -> Candidate {
        ImageElement::new(format!("https://photos.example/{name}.jpg"), 640, 480)
    }

    const BASELINE: Duration = Duration::from_millis(2_000);
    const COOLDOWN: Duration = Duration::from_millis(15_000);

    fn assert_gap(actual: Duration, expected: Duration) {
        assert!(
            actual >= expected && actual < expected + Duration::from_millis(10),
            "gap {actual:?}, expected about {expected:?}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn empty_queue_is_a_noop() {
        let mut h = harness();
        assert!(h.worker.step().await.is_none());
        assert_eq!(h.worker.state(), WorkerState::Idle);
        assert!(h.classifier.attempted().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_keeps_head_and_escalates() {
        let mut h = harness();
        let a = image("a");
        let b = image("b");
        h.classifier.script(a.src(), vec![Err(ClassifyError::RateLimited)]);
        h.filter.admit(a.clone());
        h.filter.admit(b);

        let (outcome, delay) = h.worker.step().await.unwrap();
        assert_eq!(outcome, StepOutcome::Deferred);
        assert_eq!(delay, COOLDOWN);
        assert_eq!(h.queue.len(), 2);
        assert_eq!(h.queue.peek().unwrap().src(), a.src());
        assert_eq!(a.visual_state(), VisualState::Pending);
        assert_eq!(h.worker.state(), WorkerState::Waiting);

        // same head is retried next
        h.worker.step().await.unwrap();
        assert_eq!(h.classifier.attempted(), vec![a.src(), a.src()]);
    }

    #[tokio::test(start_paused = true)]
    async fn success_resets_backoff_after_cooldown() {
        let mut h = harness();
        let a = image("a");
        h.classifier.script(
            a.src(),
            vec![Err(ClassifyError::RateLimited), Ok(Verdict::Safe)],
        );
        h.filter.admit(a.clone());

        h.worker.step().await.unwrap();
        assert_eq!(h.worker.backoff().current(), COOLDOWN);

        let (outcome, delay) = h.worker.step().await.unwrap();
        assert_eq!(outcome, StepOutcome::Retired(Verdict::Safe));
        assert_eq!(delay, BASELINE);
        assert!(h.queue.is_empty());
        assert_eq!(a.visual_state(), VisualState::Clear);
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_error_drops_item_and_leaves_backoff_alone() {
        let mut h = harness();
        let a = image("a");
        let b = image("b");
        h.classifier.script(a.src(), vec![Err(ClassifyError::RateLimited)]);
        h.classifier
            .script(b.src(), vec![Err(ClassifyError::Malformed("eof".into()))]);
        h.filter.admit(a.clone());

        // escalate first so "unchanged" is distinguishable from "reset"
        h.worker.step().await.unwrap();
        h.queue.pop();
        h.filter.admit(b.clone());

        let before = h.queue.len();
        let (outcome, delay) = h.worker.step().await.unwrap();
        assert_eq!(outcome, StepOutcome::Dropped(ErrorKind::Fatal));
        assert_eq!(h.queue.len(), before - 1);
        assert_eq!(delay, COOLDOWN);
        assert_eq!(b.visual_state(), VisualState::Clear);
        assert_eq!(h.stats.read(), (0, 0));
    }

    #[tokio::test(start_paused = true)]
    async fn transient_errors_are_dropped_like_fatal_ones() {
        let mut h = harness();
        let a = image("a");
        h.classifier.script(a.src(), vec![Err(ClassifyError::Timeout)]);
        h.filter.admit(a.clone());

        let (outcome, delay) = h.worker.step().await.unwrap();
        assert_eq!(outcome, StepOutcome::Dropped(ErrorKind::Transient));
        assert_eq!(delay, BASELINE);
        assert!(h.queue.is_empty());
        assert_eq!(a.visual_state(), VisualState::Clear);
    }

    #[tokio::test(start_paused = true)]
    async fn mixed_outcomes_drain_to_expected_page_state() {
        let mut h = harness();
        let (a, b, c) = (image("a"), image("b"), image("c"));
        h.classifier.script(
            a.src(),
            vec![
                Err(ClassifyError::RateLimited),
                Err(ClassifyError::RateLimited),
                Ok(Verdict::Safe),
            ],
        );
        h.classifier.script(b.src(), vec![Ok(Verdict::Unsafe)]);
        h.classifier.script(
            c.src(),
            vec![Err(ClassifyError::DownloadFailed("404".into()))],
        );
        for img in [&a, &b, &c] {
            h.filter.admit(img.clone());
        }

        let mut outcomes = Vec::new();
        while let Some((outcome, _)) = h.worker.step().await {
            outcomes.push(outcome);
        }

        assert_eq!(
            outcomes,
            vec![
                StepOutcome::Deferred,
                StepOutcome::Deferred,
                StepOutcome::Retired(Verdict::Safe),
                StepOutcome::Retired(Verdict::Unsafe),
                StepOutcome::Dropped(ErrorKind::Fatal),
            ]
        );
        assert!(h.queue.is_empty());
        assert_eq!(a.visual_state(), VisualState::Clear);
        assert_eq!(b.visual_state(), VisualState::Blocked);
        assert_eq!(c.visual_state(), VisualState::Clear);
        assert_eq!(h.stats.read(), (2, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn run_paces_attempts_and_wakes_on_new_work() {
        let Harness {
            mut filter,
            worker,
            queue,
            classifier,
            stats,
        } = harness();
        let (a, b, c) = (image("a"), image("b"), image("c"));
        classifier.script(
            a.src(),
            vec![
                Err(ClassifyError::RateLimited),
                Err(ClassifyError::RateLimited),
                Ok(Verdict::Safe),
            ],
        );
        classifier.script(b.src(), vec![Ok(Verdict::Unsafe)]);
        filter.admit(a.clone());
        filter.admit(b.clone());

        let shutdown = Shutdown::new();
        let handle = worker.spawn(shutdown.subscribe());

        sleep(Duration::from_secs(60)).await;
        assert!(queue.is_empty());
        assert_eq!(stats.read(), (2, 1));

        let started = classifier.started_at();
        let round_trip = Duration::from_millis(100);
        assert_gap(started[1] - started[0], round_trip + COOLDOWN);
        assert_gap(started[2] - started[1], round_trip + COOLDOWN);
        assert_gap(started[3] - started[2], round_trip + BASELINE);

        // idle worker picks up late arrivals
        filter.admit(c.clone());
        sleep(Duration::from_secs(1)).await;
        assert_eq!(c.visual_state(), VisualState::Clear);
        assert_eq!(
            classifier.attempted(),
            vec![a.src(), a.src(), a.src(), b.src(), c.src()]
        );
        assert_eq!(classifier.max_in_flight.load(Ordering::SeqCst), 1);

        shutdown.trigger();
        handle.await.unwrap();
    }
}
