//! Poll loop: wires chat source → pipeline → status.
//! One tokio task runs cycles back to back at a fixed interval, so cycles
//! never overlap and the pipeline has a single writer.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior, interval};

use killtrack_core::{JsonFileStore, Pipeline, StoreBackend};
use killtrack_source::{CommandReader, FileReader, LineSource, ProbingLineSource};

use crate::cli::RunOpts;
use crate::status::Status;

pub type SharedPipeline<B> = Arc<Mutex<Pipeline<B>>>;

struct Driver {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Start/stop toggle around the periodic driver.
pub struct Tracker<S: LineSource + 'static, B: StoreBackend + 'static> {
    source: Arc<S>,
    pipeline: SharedPipeline<B>,
    poll_ms: u64,
    status: watch::Sender<Status>,
    driver: Option<Driver>,
}

impl<S: LineSource + 'static, B: StoreBackend + 'static> Tracker<S, B> {
    pub fn new(source: S, pipeline: Pipeline<B>, poll_ms: u64) -> Self {
        let (status, _) = watch::channel(Status::Stopped);
        Self {
            source: Arc::new(source),
            pipeline: Arc::new(Mutex::new(pipeline)),
            poll_ms: poll_ms.max(1),
            status,
            driver: None,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Status> {
        self.status.subscribe()
    }

    pub fn pipeline(&self) -> SharedPipeline<B> {
        Arc::clone(&self.pipeline)
    }

    pub fn is_running(&self) -> bool {
        self.driver.is_some()
    }

    /// No-op when already running. Otherwise resets per-run state and spawns
    /// the driver, which runs its first cycle immediately.
    pub async fn start(&mut self) {
        if self.driver.is_some() {
            return;
        }
        self.pipeline.lock().await.start();
        self.status.send_replace(Status::Ready);

        let (shutdown, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(run_poll_loop(
            Arc::clone(&self.source),
            Arc::clone(&self.pipeline),
            self.poll_ms,
            self.status.clone(),
            shutdown_rx,
        ));
        self.driver = Some(Driver { shutdown, handle });
        tracing::info!(poll_ms = self.poll_ms, "tracker started");
    }

    /// Cancels the driver and waits for it. No cycle starts afterwards; a
    /// cycle still waiting on the chat source is abandoned, and a batch
    /// already being ingested finishes before the session is reset.
    pub async fn stop(&mut self) {
        let Some(driver) = self.driver.take() else {
            return;
        };
        let _ = driver.shutdown.send(true);
        if let Err(e) = driver.handle.await {
            tracing::warn!("poll loop task failed: {e}");
        }
        self.pipeline.lock().await.stop();
        self.status.send_replace(Status::Stopped);
        tracing::info!("tracker stopped");
    }
}

async fn run_poll_loop<S: LineSource + 'static, B: StoreBackend + 'static>(
    source: Arc<S>,
    pipeline: SharedPipeline<B>,
    poll_ms: u64,
    status: watch::Sender<Status>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval(Duration::from_millis(poll_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {}
        }

        let result = tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            result = poll_cycle(&source, &pipeline, poll_ms) => result,
        };
        let next = match result {
            Ok(next) => next,
            Err(e) => {
                tracing::warn!("poll cycle failed: {e}");
                Status::SourceUnavailable(e.to_string())
            }
        };
        status.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}

/// One ingestion cycle. A source that is not ready yields
/// `SourceUnavailable` and leaves all state untouched.
pub async fn poll_cycle<S: LineSource + 'static, B: StoreBackend + 'static>(
    source: &Arc<S>,
    pipeline: &SharedPipeline<B>,
    poll_ms: u64,
) -> anyhow::Result<Status> {
    // Host reads may block (subprocess / file IO).
    let src = Arc::clone(source);
    let fetched = match tokio::task::spawn_blocking(move || src.fetch_recent()).await {
        Ok(Ok(fetched)) => fetched,
        Ok(Err(e)) => {
            tracing::debug!("chat source not ready: {e}");
            return Ok(Status::SourceUnavailable(e.to_string()));
        }
        Err(e) => anyhow::bail!("chat source task failed: {e}"),
    };

    // Store IO is blocking too; the owned guard keeps the single writer.
    let mut guard = Arc::clone(pipeline).lock_owned().await;
    let lines = fetched.lines;
    let report = tokio::task::spawn_blocking(move || guard.ingest(&lines, Utc::now()))
        .await
        .map_err(|e| anyhow::anyhow!("ingest task failed: {e}"))?;
    if !report.is_quiet() {
        tracing::debug!(
            lines = report.lines,
            fresh = report.fresh,
            kills = report.kills,
            pets = report.pets,
            store_errors = report.store_errors,
            "cycle processed"
        );
    }

    Ok(Status::Running {
        via: fetched.via,
        poll_ms,
    })
}

/// Build the probing source from CLI options: command first, then file.
pub fn build_source(opts: &RunOpts) -> ProbingLineSource {
    let mut source = ProbingLineSource::new().with_window(opts.window);
    if let Some(ref program) = opts.chat_cmd {
        let reader = CommandReader::new(program)
            .with_args(opts.chat_args.clone())
            .with_timeout(Duration::from_millis(opts.chat_timeout_ms));
        source = source.with_reader(reader);
    }
    if let Some(ref path) = opts.chat_file {
        source = source.with_reader(FileReader::new(path));
    }
    source
}

/// Run the tracker until ctrl-c or SIGTERM.
pub async fn run_tracker(opts: RunOpts, store_path: &Path) -> anyhow::Result<()> {
    let source = build_source(&opts);
    let readers = source.reader_names().join(", ");
    if readers.is_empty() {
        tracing::warn!("no chat source configured (use --chat-cmd or --chat-file)");
    } else {
        tracing::info!("chat sources: {readers}");
    }
    tracing::info!("records stored in {}", store_path.display());

    let pipeline = Pipeline::new(JsonFileStore::new(store_path));
    let mut tracker = Tracker::new(source, pipeline, opts.poll_interval_ms);

    let mut status_rx = tracker.subscribe();
    let status_logger = tokio::spawn(async move {
        while status_rx.changed().await.is_ok() {
            let status = status_rx.borrow_and_update().clone();
            match status {
                Status::SourceUnavailable(_) => tracing::warn!("{status}"),
                _ => tracing::info!("{status}"),
            }
        }
    });

    tracker.start().await;
    wait_for_shutdown().await;
    if tracker.is_running() {
        tracker.stop().await;
    }

    {
        let pipeline = tracker.pipeline();
        let p = pipeline.lock().await;
        for line in p.debug_lines() {
            tracing::debug!(line = %line, "recent chat line");
        }
    }

    drop(tracker);
    let _ = status_logger.await;
    Ok(())
}

async fn wait_for_shutdown() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => tracing::info!("received ctrl-c, shutting down"),
                    _ = sigterm.recv() => tracing::info!("received SIGTERM, shutting down"),
                }
            }
            Err(e) => {
                tracing::warn!("failed to register SIGTERM handler: {e}");
                ctrl_c.await.ok();
                tracing::info!("received ctrl-c, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        tracing::info!("received ctrl-c, shutting down");
    }
}

// ─── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use killtrack_core::{MemoryStore, Mode, RecordKey};
    use killtrack_source::{FetchedLines, SourceError};

    /// Scripted line source. Replays queued responses, then repeats `steady`.
    struct FakeSource {
        queued: std::sync::Mutex<VecDeque<Result<Vec<String>, String>>>,
        steady: Vec<String>,
        fetches: AtomicUsize,
        panic_on_fetch: bool,
    }

    impl FakeSource {
        fn steady(lines: &[&str]) -> Self {
            Self {
                queued: std::sync::Mutex::new(VecDeque::new()),
                steady: lines.iter().map(|l| l.to_string()).collect(),
                fetches: AtomicUsize::new(0),
                panic_on_fetch: false,
            }
        }

        fn then(self, response: Result<&[&str], &str>) -> Self {
            let response: Result<Vec<String>, String> = response
                .map(|lines| lines.iter().map(|l| l.to_string()).collect())
                .map_err(str::to_string);
            self.queued.lock().expect("lock").push_back(response);
            self
        }

        fn panicking() -> Self {
            Self {
                panic_on_fetch: true,
                ..Self::steady(&[])
            }
        }

        fn fetch_count(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    impl LineSource for FakeSource {
        fn fetch_recent(&self) -> Result<FetchedLines, SourceError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.panic_on_fetch {
                panic!("host exploded");
            }
            let next = self.queued.lock().expect("lock").pop_front();
            match next.unwrap_or_else(|| Ok(self.steady.clone())) {
                Ok(lines) => Ok(FetchedLines {
                    lines,
                    via: "fake".to_string(),
                }),
                Err(note) => Err(SourceError::Unavailable(note)),
            }
        }
    }

    fn new_pipeline() -> SharedPipeline<MemoryStore> {
        Arc::new(Mutex::new(Pipeline::new(MemoryStore::new())))
    }

    // ── poll_cycle ───────────────────────────────────────────────

    #[tokio::test]
    async fn poll_cycle_records_kill() {
        let source = Arc::new(FakeSource::steady(&["You have killed 5 Vorkath (hm)."]));
        let pipeline = new_pipeline();

        let status = poll_cycle(&source, &pipeline, 450).await.expect("cycle");
        assert_eq!(
            status,
            Status::Running {
                via: "fake".into(),
                poll_ms: 450
            }
        );
        let p = pipeline.lock().await;
        let rec = p
            .store()
            .get(&RecordKey::new("vorkath", Mode::Hard))
            .expect("stored");
        assert_eq!(rec.kill_count, 5);
    }

    #[tokio::test]
    async fn poll_cycle_ingests_under_single_writer() {
        let source = Arc::new(FakeSource::steady(&["You have killed 2 Telos."]));
        let pipeline = new_pipeline();

        let held = Arc::clone(&pipeline).lock_owned().await;
        let cycle = tokio::spawn({
            let (source, pipeline) = (Arc::clone(&source), Arc::clone(&pipeline));
            async move { poll_cycle(&source, &pipeline, 450).await }
        });
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(!cycle.is_finished(), "cycle must wait for the pipeline owner");
        assert!(held.records().is_empty());
        drop(held);

        let status = cycle.await.expect("join").expect("cycle");
        assert!(matches!(status, Status::Running { .. }));
        assert_eq!(pipeline.lock().await.records().len(), 1);
    }

    #[tokio::test]
    async fn poll_cycle_unavailable_source_leaves_state() {
        let source = Arc::new(FakeSource::steady(&[]).then(Err("host not ready")));
        let pipeline = new_pipeline();

        let status = poll_cycle(&source, &pipeline, 450).await.expect("cycle");
        assert!(matches!(status, Status::SourceUnavailable(ref n) if n.contains("host not ready")));
        let p = pipeline.lock().await;
        assert!(p.records().is_empty());
        assert!(p.debug_lines().is_empty());
    }

    #[tokio::test]
    async fn poll_cycle_recovers_after_unavailable() {
        let source = Arc::new(
            FakeSource::steady(&["You have killed 1 Nex."]).then(Err("permission missing")),
        );
        let pipeline = new_pipeline();

        let first = poll_cycle(&source, &pipeline, 450).await.expect("cycle 1");
        assert!(matches!(first, Status::SourceUnavailable(_)));
        let second = poll_cycle(&source, &pipeline, 450).await.expect("cycle 2");
        assert!(matches!(second, Status::Running { .. }));
        assert_eq!(pipeline.lock().await.records().len(), 1);
    }

    #[tokio::test]
    async fn poll_cycle_panicking_source_is_contained() {
        let source = Arc::new(FakeSource::panicking());
        let pipeline = new_pipeline();

        let result = poll_cycle(&source, &pipeline, 450).await;
        assert!(result.is_err(), "panic surfaces as a cycle error");
        assert!(pipeline.lock().await.records().is_empty());
    }

    #[tokio::test]
    async fn poll_cycle_redelivery_not_double_counted() {
        let source = Arc::new(FakeSource::steady(&[
            "You have killed 1 Nex.",
            "A golden beam shines over one of your items, You receive: 1x Ancient artefact",
        ]));
        let pipeline = new_pipeline();

        for _ in 0..3 {
            poll_cycle(&source, &pipeline, 450).await.expect("cycle");
        }
        let p = pipeline.lock().await;
        assert_eq!(p.store().backend().writes(), 2);
        assert!(p.store().has_pet(&RecordKey::new("nex", Mode::None)));
    }

    // ── Tracker start/stop ───────────────────────────────────────

    async fn wait_until<F: Fn() -> bool>(cond: F) {
        for _ in 0..200 {
            if cond() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached in time");
    }

    #[tokio::test]
    async fn tracker_runs_until_stopped() {
        let mut tracker = Tracker::new(
            FakeSource::steady(&["You have killed 3 Solak."]),
            Pipeline::new(MemoryStore::new()),
            10,
        );
        let source = Arc::clone(&tracker.source);
        let status = tracker.subscribe();

        tracker.start().await;
        assert!(tracker.is_running());
        wait_until(|| source.fetch_count() >= 3).await;
        assert!(matches!(*status.borrow(), Status::Running { .. }));

        tracker.stop().await;
        assert!(!tracker.is_running());
        assert_eq!(*status.borrow(), Status::Stopped);

        let after_stop = source.fetch_count();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(source.fetch_count(), after_stop, "no cycle after stop");

        let pipeline = tracker.pipeline();
        let p = pipeline.lock().await;
        assert_eq!(p.records().len(), 1);
        assert!(p.session().current_subject.is_none(), "session reset on stop");
    }

    #[tokio::test]
    async fn tracker_start_is_idempotent() {
        let mut tracker = Tracker::new(
            FakeSource::steady(&[]),
            Pipeline::new(MemoryStore::new()),
            10,
        );
        tracker.start().await;
        tracker.start().await;
        assert!(tracker.is_running());
        tracker.stop().await;
        tracker.stop().await;
        assert!(!tracker.is_running());
    }

    #[tokio::test]
    async fn tracker_survives_failing_cycles() {
        let mut tracker = Tracker::new(
            FakeSource::steady(&["You have killed 1 Araxxi."])
                .then(Err("not ready"))
                .then(Err("not ready")),
            Pipeline::new(MemoryStore::new()),
            5,
        );
        let source = Arc::clone(&tracker.source);
        tracker.start().await;
        wait_until(|| source.fetch_count() >= 4).await;
        tracker.stop().await;

        let pipeline = tracker.pipeline();
        assert_eq!(pipeline.lock().await.records().len(), 1);
    }

    #[tokio::test]
    async fn tracker_restart_reprocesses_visible_lines_idempotently() {
        let mut tracker = Tracker::new(
            FakeSource::steady(&["You have killed 7 Telos."]),
            Pipeline::new(MemoryStore::new()),
            5,
        );
        let source = Arc::clone(&tracker.source);

        tracker.start().await;
        wait_until(|| source.fetch_count() >= 1).await;
        tracker.stop().await;
        tracker.start().await;
        let seen = source.fetch_count();
        wait_until(|| source.fetch_count() > seen).await;
        tracker.stop().await;

        let pipeline = tracker.pipeline();
        let records = pipeline.lock().await.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kill_count, 7);
    }

    /// Source whose fetch blocks until released, like a hung host helper.
    struct GatedSource {
        open: std::sync::Mutex<bool>,
        opened: std::sync::Condvar,
        fetches: AtomicUsize,
    }

    impl GatedSource {
        fn closed() -> Self {
            Self {
                open: std::sync::Mutex::new(false),
                opened: std::sync::Condvar::new(),
                fetches: AtomicUsize::new(0),
            }
        }

        fn release(&self) {
            *self.open.lock().expect("lock") = true;
            self.opened.notify_all();
        }
    }

    impl LineSource for GatedSource {
        fn fetch_recent(&self) -> Result<FetchedLines, SourceError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let mut open = self.open.lock().expect("lock");
            while !*open {
                open = self.opened.wait(open).expect("wait");
            }
            Ok(FetchedLines {
                lines: vec!["You have killed 1 Nex.".to_string()],
                via: "gated".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn stop_returns_while_fetch_is_blocked() {
        let mut tracker = Tracker::new(
            GatedSource::closed(),
            Pipeline::new(MemoryStore::new()),
            10,
        );
        let source = Arc::clone(&tracker.source);
        let status = tracker.subscribe();

        tracker.start().await;
        wait_until(|| source.fetches.load(Ordering::SeqCst) >= 1).await;
        let stopped = tokio::time::timeout(Duration::from_secs(2), tracker.stop()).await;
        source.release();

        assert!(stopped.is_ok(), "stop waited on the blocked fetch");
        assert!(!tracker.is_running());
        assert_eq!(*status.borrow(), Status::Stopped);

        // The abandoned fetch completes without touching the store.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(tracker.pipeline().lock().await.records().is_empty());
    }

    // ── build_source ─────────────────────────────────────────────

    #[test]
    fn build_source_orders_command_before_file() {
        let opts = RunOpts {
            poll_interval_ms: 450,
            window: 30,
            chat_cmd: Some("alt1-chat".into()),
            chat_args: vec![],
            chat_timeout_ms: 2000,
            chat_file: Some("chat.txt".into()),
        };
        let source = build_source(&opts);
        assert_eq!(
            source.reader_names(),
            vec!["command `alt1-chat`", "file chat.txt"]
        );
    }

    #[test]
    fn build_source_without_readers_is_unavailable() {
        let opts = RunOpts {
            poll_interval_ms: 450,
            window: 30,
            chat_cmd: None,
            chat_args: vec![],
            chat_timeout_ms: 2000,
            chat_file: None,
        };
        assert!(build_source(&opts).fetch_recent().is_err());
    }
}
