//! Scrape runs: fetch → discover → classify → dedupe → extract → store.
//!
//! The traffic and camera pipelines run on their own threads with their
//! own sessions. Each is bounded by the page timeout; a pipeline that
//! misses it contributes nothing to the run.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};
use traffic_types::{PhaseTimings, ScrapeSummary, SpeedCamera, TrafficJam};

use crate::classify::Classifier;
use crate::config::Config;
use crate::dedup::Deduplicator;
use crate::error::{FetchError, StoreError};
use crate::extract::TrafficExtractor;
use crate::fetch::{PageSession, PageSource, RetryPolicy, WaitCondition};
use crate::page::{self, PageDocument};
use crate::store::TrafficStore;
use crate::types::{Candidate, PipelineKind};

/// Keyword used to find the controls that expand the camera list.
const FLITSER_TRIGGER: &str = "flitser";

const TRAFFIC_WAIT_SELECTOR: &str = "article[data-test-id='traffic-list-road']";
const CAMERAS_WAIT_SELECTOR: &str = "article[data-accordion-road]";

pub const ALREADY_RUNNING: &str = "scrape already in progress";

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

// ── Extraction engine (no I/O) ───────────────────────────────────────────

/// Classifier and extractor built once from the monitored set.
pub struct ExtractionEngine {
    classifier: Classifier,
    extractor: TrafficExtractor,
}

impl ExtractionEngine {
    pub fn new(config: &Config) -> Self {
        Self {
            classifier: Classifier::new(config.monitored.clone()),
            extractor: TrafficExtractor::new(config.monitored.clone(), config.jam_acceptance),
        }
    }

    fn candidates(&self, kind: PipelineKind, pages: &[PageDocument]) -> Vec<Candidate> {
        let discovered: Vec<Candidate> = pages
            .iter()
            .flat_map(|p| page::discover(kind, p))
            .collect();
        let classified = self.classifier.classify(kind, discovered);
        let unique = Deduplicator::new().dedupe(classified);
        debug!(pipeline = kind.as_str(), unique = unique.len(), "deduplicated");
        unique
    }

    pub fn process_traffic(&self, pages: &[PageDocument], at: DateTime<Utc>) -> Vec<TrafficJam> {
        let candidates = self.candidates(PipelineKind::Traffic, pages);
        self.extractor.extract_jams(&candidates, at)
    }

    pub fn process_cameras(&self, pages: &[PageDocument], at: DateTime<Utc>) -> Vec<SpeedCamera> {
        let candidates = self.candidates(PipelineKind::Cameras, pages);
        self.extractor.extract_cameras(&candidates, at)
    }
}

// ── Pipelines over a session ─────────────────────────────────────────────

struct PipelineSetup {
    engine: ExtractionEngine,
    traffic_url: String,
    cameras_url: String,
    page_timeout: Duration,
    retry: RetryPolicy,
}

fn traffic_pages(
    setup: &PipelineSetup,
    session: &mut dyn PageSession,
) -> Result<Vec<PageDocument>, FetchError> {
    let wait = WaitCondition::new(setup.page_timeout).for_selector(TRAFFIC_WAIT_SELECTOR);
    Ok(vec![session.load(&setup.traffic_url, &wait)?])
}

/// The camera page, plus the page as it reads after each flitser toggle.
fn camera_pages(
    setup: &PipelineSetup,
    session: &mut dyn PageSession,
) -> Result<Vec<PageDocument>, FetchError> {
    let wait = WaitCondition::new(setup.page_timeout).for_selector(CAMERAS_WAIT_SELECTOR);
    let page = session.load(&setup.cameras_url, &wait)?;
    let toggles = page.toggle_candidates(FLITSER_TRIGGER);
    debug!(toggles = toggles.len(), "flitser toggles found");

    let mut pages = vec![page.clone()];
    for toggle in &toggles {
        match session.activate(&page, toggle) {
            Ok(expanded) if expanded.html() != page.html() => pages.push(expanded),
            Ok(_) => {}
            Err(e) => warn!(label = %toggle.label, error = %e, "toggle activation failed"),
        }
    }
    Ok(pages)
}

fn run_pipeline<T, F>(
    setup: &PipelineSetup,
    source: &dyn PageSource,
    kind: PipelineKind,
    at: DateTime<Utc>,
    process: F,
) -> Result<Vec<T>, FetchError>
where
    F: FnOnce(&ExtractionEngine, &[PageDocument], DateTime<Utc>) -> Vec<T>,
{
    let mut session = setup
        .retry
        .run(kind.as_str(), || source.open_session())?;
    let pages = match kind {
        PipelineKind::Traffic => traffic_pages(setup, session.as_mut())?,
        PipelineKind::Cameras => camera_pages(setup, session.as_mut())?,
    };
    Ok(process(&setup.engine, &pages, at))
}

/// Result of one pipeline as seen by the orchestrator.
struct PipelineResult<T> {
    records: Vec<T>,
    elapsed_ms: u64,
    error: Option<String>,
}

fn spawn_pipeline<T, F>(
    setup: Arc<PipelineSetup>,
    source: Arc<dyn PageSource>,
    kind: PipelineKind,
    at: DateTime<Utc>,
    process: F,
) -> mpsc::Receiver<(Result<Vec<T>, FetchError>, u64)>
where
    T: Send + 'static,
    F: FnOnce(&ExtractionEngine, &[PageDocument], DateTime<Utc>) -> Vec<T> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let start = Instant::now();
        let result = run_pipeline(&setup, source.as_ref(), kind, at, process);
        // The receiver is gone when the orchestrator already timed out.
        let _ = tx.send((result, millis(start.elapsed())));
    });
    rx
}

fn collect<T>(
    kind: PipelineKind,
    rx: mpsc::Receiver<(Result<Vec<T>, FetchError>, u64)>,
    deadline: Instant,
    timeout: Duration,
) -> PipelineResult<T> {
    let remaining = deadline.saturating_duration_since(Instant::now());
    match rx.recv_timeout(remaining) {
        Ok((Ok(records), elapsed_ms)) => PipelineResult {
            records,
            elapsed_ms,
            error: None,
        },
        Ok((Err(e), elapsed_ms)) => {
            warn!(pipeline = kind.as_str(), error = %e, "pipeline failed");
            PipelineResult {
                records: Vec::new(),
                elapsed_ms,
                error: Some(format!("{}: {e}", kind.as_str())),
            }
        }
        Err(RecvTimeoutError::Timeout) => {
            warn!(pipeline = kind.as_str(), ?timeout, "pipeline timed out");
            PipelineResult {
                records: Vec::new(),
                elapsed_ms: millis(timeout),
                error: Some(format!(
                    "{}: {}",
                    kind.as_str(),
                    FetchError::Timeout(timeout)
                )),
            }
        }
        Err(RecvTimeoutError::Disconnected) => {
            error!(pipeline = kind.as_str(), "pipeline thread exited without a result");
            PipelineResult {
                records: Vec::new(),
                elapsed_ms: 0,
                error: Some(format!("{}: pipeline thread exited", kind.as_str())),
            }
        }
    }
}

// ── Orchestrator ─────────────────────────────────────────────────────────

/// Clears the run flag when a run ends, including by panic.
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct Orchestrator {
    setup: Arc<PipelineSetup>,
    source: Arc<dyn PageSource>,
    store: TrafficStore,
    running: AtomicBool,
}

impl Orchestrator {
    pub fn new(config: &Config, source: Arc<dyn PageSource>, store: TrafficStore) -> Self {
        let setup = PipelineSetup {
            engine: ExtractionEngine::new(config),
            traffic_url: config.traffic_url.clone(),
            cameras_url: config.cameras_url.clone(),
            page_timeout: config.page_timeout(),
            retry: RetryPolicy::from_settings(&config.session_retry),
        };
        Self {
            setup: Arc::new(setup),
            source,
            store,
            running: AtomicBool::new(false),
        }
    }

    pub fn store(&self) -> &TrafficStore {
        &self.store
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// One full run. Never panics on scrape or store failures; problems are
    /// reported in the summary.
    pub fn run(&self) -> ScrapeSummary {
        let started_at = Utc::now();
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            info!("run requested while another is active");
            return ScrapeSummary::failure(ALREADY_RUNNING, started_at);
        }
        let _guard = RunGuard(&self.running);
        let total_start = Instant::now();

        let timeout = self.setup.page_timeout;
        let deadline = Instant::now() + timeout;
        let traffic_rx = spawn_pipeline(
            Arc::clone(&self.setup),
            Arc::clone(&self.source),
            PipelineKind::Traffic,
            started_at,
            |engine: &ExtractionEngine, pages: &[PageDocument], at| {
                engine.process_traffic(pages, at)
            },
        );
        let cameras_rx = spawn_pipeline(
            Arc::clone(&self.setup),
            Arc::clone(&self.source),
            PipelineKind::Cameras,
            started_at,
            |engine: &ExtractionEngine, pages: &[PageDocument], at| {
                engine.process_cameras(pages, at)
            },
        );
        let traffic = collect(PipelineKind::Traffic, traffic_rx, deadline, timeout);
        let cameras = collect(PipelineKind::Cameras, cameras_rx, deadline, timeout);

        let pipeline_errors: Vec<String> = traffic
            .error
            .iter()
            .chain(cameras.error.iter())
            .cloned()
            .collect();

        // A failed pipeline leaves its stored collection as it was.
        let store_start = Instant::now();
        let stored = self.store_results(&traffic, &cameras, started_at);
        let store_ms = millis(store_start.elapsed());

        let timings = PhaseTimings {
            traffic_ms: traffic.elapsed_ms,
            cameras_ms: cameras.elapsed_ms,
            store_ms,
            total_ms: millis(total_start.elapsed()),
        };
        let summary = ScrapeSummary {
            success: stored.is_ok(),
            error: stored.err().map(|e| e.to_string()),
            traffic_jams: traffic.records.len(),
            speed_cameras: cameras.records.len(),
            pipeline_errors,
            timings,
            started_at,
        };

        match &summary.error {
            Some(e) => error!(error = %e, "storing scrape results failed"),
            None => info!(
                traffic_jams = summary.traffic_jams,
                speed_cameras = summary.speed_cameras,
                pipeline_errors = summary.pipeline_errors.len(),
                total_ms = summary.timings.total_ms,
                "scrape run finished"
            ),
        }
        summary
    }

    fn store_results(
        &self,
        traffic: &PipelineResult<TrafficJam>,
        cameras: &PipelineResult<SpeedCamera>,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        if traffic.error.is_none() {
            self.store.replace_traffic_jams(&traffic.records)?;
        }
        if cameras.error.is_none() {
            self.store.replace_speed_cameras(&cameras.records)?;
        }
        if traffic.error.is_none() || cameras.error.is_none() {
            self.store.mark_updated(at)?;
        } else {
            warn!("both pipelines failed, keeping stored data");
        }
        Ok(())
    }
}
