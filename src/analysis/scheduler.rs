//! Fetch scheduling
//!
//! One [`FetchScheduler`] is shared by every URL of a batch. It bounds the
//! number of renders in flight with a semaphore, spaces requests per domain
//! with [`DomainThrottle`], and retries transient failures with exponential
//! backoff. Each URL's candidates go through their own dispatcher task, which
//! streams scores back to the URL's decision engine over a channel.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio::time::Instant;
use url::Url;

use crate::config::AnalysisConfig;
use crate::types::{Candidate, CandidateScore, FetchError, FetchOutcome};

use super::normalizer::ContentNormalizer;
use super::renderer::{RenderedPage, Renderer};
use super::similarity::similarity;
use super::throttle::{DomainThrottle, ThrottleDecision, ThrottleStats};

/// Sentinel cutoff meaning "nothing cancelled yet"
pub const NO_CUTOFF: usize = usize::MAX;

/// Timeouts and retry limits applied to every fetch
#[derive(Debug, Clone)]
pub struct FetchPolicy {
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub retry_backoff: Duration,
    /// Workers a single URL's dispatcher keeps alive at once
    pub window: usize,
}

impl FetchPolicy {
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            request_timeout: config.request_timeout(),
            max_retries: config.max_request_retries,
            retry_backoff: config.retry_backoff(),
            window: config.max_concurrency.max(1),
        }
    }

    /// Delay before re-queueing a task whose `attempt`-th try failed.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.retry_backoff.saturating_mul(1u32 << exponent)
    }
}

/// Candidates of one URL handed to the scheduler
#[derive(Debug)]
pub struct CandidateJob {
    pub domain: String,
    /// Normalized baseline text
    pub baseline: Arc<str>,
    /// Candidates in indicator order
    pub candidates: Vec<Candidate>,
    /// Largest index still worth fetching, lowered by the decision engine
    pub cutoff: Arc<AtomicUsize>,
}

/// A candidate waiting to be fetched, with the attempts made so far
#[derive(Debug)]
struct Task {
    candidate: Candidate,
    attempts: u32,
}

/// Result of one attempt at a task
#[derive(Debug)]
enum Attempt {
    /// Transient failure; run the task again once `ready_at` has passed
    Retry { task: Task, ready_at: Instant },
    /// Final score for a candidate
    Scored(CandidateScore),
}

/// What a worker reports back to its dispatcher
#[derive(Debug)]
enum Step {
    Retry { task: Task, ready_at: Instant },
    Finished(CandidateScore),
    /// Skipped because it fell behind the cutoff
    Cancelled,
}

impl From<Attempt> for Step {
    fn from(attempt: Attempt) -> Self {
        match attempt {
            Attempt::Retry { task, ready_at } => Step::Retry { task, ready_at },
            Attempt::Scored(score) => Step::Finished(score),
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    renders: AtomicU64,
    retries: AtomicU64,
    failures: AtomicU64,
    cancelled: AtomicU64,
}

/// Scheduler counters
#[derive(Debug, Clone, Default)]
pub struct SchedulerStats {
    pub renders: u64,
    pub retries: u64,
    pub failures: u64,
    pub cancelled: u64,
    pub throttle: ThrottleStats,
}

/// Concurrency-bounded, per-domain-throttled fetch executor
#[derive(Debug, Clone)]
pub struct FetchScheduler {
    renderer: Arc<dyn Renderer>,
    normalizer: Arc<ContentNormalizer>,
    permits: Arc<Semaphore>,
    throttle: Arc<DomainThrottle>,
    policy: FetchPolicy,
    counters: Arc<Counters>,
}

impl FetchScheduler {
    pub fn new(
        renderer: Arc<dyn Renderer>,
        normalizer: Arc<ContentNormalizer>,
        config: &AnalysisConfig,
    ) -> Self {
        Self {
            renderer,
            normalizer,
            permits: Arc::new(Semaphore::new(config.max_concurrency.max(1))),
            throttle: Arc::new(DomainThrottle::new(
                config.max_requests_per_domain,
                config.domain_burst,
            )),
            policy: FetchPolicy::from_config(config),
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            renders: self.counters.renders.load(Ordering::Relaxed),
            retries: self.counters.retries.load(Ordering::Relaxed),
            failures: self.counters.failures.load(Ordering::Relaxed),
            cancelled: self.counters.cancelled.load(Ordering::Relaxed),
            throttle: self.throttle.stats(),
        }
    }

    /// Render one URL under a concurrency permit and the domain throttle.
    ///
    /// The domain token is taken only once a permit is held, so requests
    /// queued on the semaphore never spend tokens early. If the domain has
    /// to wait, the permit goes back while it does. Only 2xx pages come
    /// back as `Ok`.
    async fn render_once(&self, domain: &str, url: &Url) -> Result<RenderedPage, FetchError> {
        let permit = loop {
            let permit = self
                .permits
                .acquire()
                .await
                .map_err(|_| FetchError::Transport("scheduler is shut down".to_string()))?;

            match self.throttle.check(domain) {
                ThrottleDecision::Allowed => break permit,
                decision => {
                    drop(permit);
                    let wait = decision.delay();
                    tracing::trace!("Throttling {} for {:?}", domain, wait);
                    tokio::time::sleep(wait).await;
                }
            }
        };

        self.counters.renders.fetch_add(1, Ordering::Relaxed);
        let timeout = self.policy.request_timeout;
        let rendered = match tokio::time::timeout(timeout, self.renderer.render(url, timeout)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(timeout)),
        };
        drop(permit);

        let page = rendered?;
        match page.status {
            429 => {
                self.throttle.record_429(domain, page.retry_after);
                Err(FetchError::Status(429))
            }
            status if page.is_success() => {
                self.throttle.record_success(domain);
                tracing::trace!("{} -> {}", url, status);
                Ok(page)
            }
            status => {
                self.throttle.record_success(domain);
                Err(FetchError::Status(status))
            }
        }
    }

    /// Normalize a page body off the async runtime.
    async fn normalize(&self, body: String) -> Result<String, FetchError> {
        let normalizer = Arc::clone(&self.normalizer);
        tokio::task::spawn_blocking(move || normalizer.normalize(&body))
            .await
            .map_err(|e| FetchError::Transport(format!("normalizer task failed: {}", e)))
    }

    /// Fetch and normalize the baseline, retrying transient failures in place.
    pub async fn fetch_baseline(&self, domain: &str, url: &Url) -> Result<Arc<str>, FetchError> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.render_once(domain, url).await {
                Ok(page) => {
                    let text = self.normalize(page.body).await?;
                    tracing::debug!("Baseline for {} normalized to {} chars", url, text.len());
                    return Ok(Arc::from(text));
                }
                Err(e) if e.is_transient() && attempts <= self.policy.max_retries => {
                    let delay = self.policy.backoff_for(attempts);
                    self.counters.retries.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!("Baseline fetch of {} failed ({}), retrying in {:?}", url, e, delay);
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    self.counters.failures.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!("Baseline fetch of {} failed after {} attempts: {}", url, attempts, e);
                    return Err(e);
                }
            }
        }
    }

    /// One attempt at a candidate: fetch, normalize, compare.
    async fn run_task(&self, domain: &str, baseline: &Arc<str>, mut task: Task) -> Attempt {
        task.attempts += 1;
        let index = task.candidate.index;

        match self.render_once(domain, &task.candidate.test_url).await {
            Ok(page) => {
                let status = page.status;
                let baseline = Arc::clone(baseline);
                let normalizer = Arc::clone(&self.normalizer);
                let attempts = task.attempts;
                let scored = tokio::task::spawn_blocking(move || {
                    let text = normalizer.normalize(&page.body);
                    let score = similarity(&baseline, &text);
                    FetchOutcome {
                        index,
                        normalized_text: Some(text),
                        http_status: Some(status),
                        error: None,
                        attempts,
                    }
                    .score(Some(score))
                })
                .await;

                match scored {
                    Ok(score) => {
                        tracing::debug!(
                            "Candidate #{} {} scored {:.4}",
                            index,
                            task.candidate.test_url,
                            score.similarity.unwrap_or_default()
                        );
                        Attempt::Scored(score)
                    }
                    Err(e) => Attempt::Scored(Self::failed_score(
                        index,
                        FetchError::Transport(format!("normalizer task failed: {}", e)),
                        task.attempts,
                    )),
                }
            }
            Err(e) if e.is_transient() && task.attempts <= self.policy.max_retries => {
                let delay = self.policy.backoff_for(task.attempts);
                self.counters.retries.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("Candidate #{} failed ({}), retrying in {:?}", index, e, delay);
                Attempt::Retry {
                    task,
                    ready_at: Instant::now() + delay,
                }
            }
            Err(e) => {
                self.counters.failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("Candidate #{} {} failed: {}", index, task.candidate.test_url, e);
                Attempt::Scored(Self::failed_score(index, e, task.attempts))
            }
        }
    }

    fn failed_score(index: usize, error: FetchError, attempts: u32) -> CandidateScore {
        let http_status = match error {
            FetchError::Status(status) => Some(status),
            _ => None,
        };
        FetchOutcome {
            index,
            normalized_text: None,
            http_status,
            error: Some(error),
            attempts,
        }
        .score(None)
    }

    /// Start fetching a URL's candidates.
    ///
    /// Candidates are dispatched in indicator order, at most `window` at a
    /// time. A task waiting out its retry backoff does not hold a worker
    /// slot; it rejoins the back of the queue once the backoff has passed.
    /// Anything above the job's cutoff is skipped, and in-flight results
    /// above it are dropped. Dropping the receiver stops dispatch.
    pub fn dispatch(&self, job: CandidateJob) -> mpsc::UnboundedReceiver<CandidateScore> {
        let (score_tx, score_rx) = mpsc::unbounded_channel();
        let scheduler = self.clone();
        tokio::spawn(async move {
            scheduler.run_dispatcher(job, score_tx).await;
        });
        score_rx
    }

    async fn run_dispatcher(self, job: CandidateJob, score_tx: mpsc::UnboundedSender<CandidateScore>) {
        let CandidateJob {
            domain,
            baseline,
            candidates,
            cutoff,
        } = job;
        let domain: Arc<str> = Arc::from(domain);

        let (step_tx, mut step_rx) = mpsc::unbounded_channel::<Step>();
        let mut ready: VecDeque<Task> = candidates
            .into_iter()
            .map(|candidate| Task {
                candidate,
                attempts: 0,
            })
            .collect();
        let mut delayed: Vec<(Instant, Task)> = Vec::new();
        let mut active = 0usize;

        loop {
            if score_tx.is_closed() {
                break;
            }

            let now = Instant::now();
            let (due, waiting): (Vec<_>, Vec<_>) = delayed.drain(..).partition(|(at, _)| *at <= now);
            delayed = waiting;
            let mut due: Vec<Task> = due.into_iter().map(|(_, task)| task).collect();
            due.sort_by_key(|task| task.candidate.index);
            ready.extend(due);

            while active < self.policy.window {
                let Some(task) = ready.pop_front() else {
                    break;
                };
                if task.candidate.index > cutoff.load(Ordering::Acquire) {
                    self.counters.cancelled.fetch_add(1, Ordering::Relaxed);
                    continue;
                }

                active += 1;
                let worker = self.clone();
                let step_tx = step_tx.clone();
                let domain = Arc::clone(&domain);
                let baseline = Arc::clone(&baseline);
                let cutoff = Arc::clone(&cutoff);
                tokio::spawn(async move {
                    let step = if task.candidate.index > cutoff.load(Ordering::Acquire) {
                        Step::Cancelled
                    } else {
                        worker.run_task(&domain, &baseline, task).await.into()
                    };
                    let _ = step_tx.send(step);
                });
            }

            if active == 0 && delayed.is_empty() {
                break;
            }

            let next_ready = delayed.iter().map(|(at, _)| *at).min();
            let step = tokio::select! {
                step = step_rx.recv() => step,
                _ = tokio::time::sleep_until(next_ready.unwrap_or(now)), if next_ready.is_some() => continue,
                _ = score_tx.closed() => break,
            };
            let Some(step) = step else {
                break;
            };
            active -= 1;

            match step {
                Step::Retry { task, ready_at } => {
                    if task.candidate.index > cutoff.load(Ordering::Acquire) {
                        self.counters.cancelled.fetch_add(1, Ordering::Relaxed);
                    } else {
                        delayed.push((ready_at, task));
                    }
                }
                Step::Finished(score) => {
                    if score.index > cutoff.load(Ordering::Acquire) {
                        self.counters.cancelled.fetch_add(1, Ordering::Relaxed);
                        continue;
                    }
                    if score_tx.send(score).is_err() {
                        break;
                    }
                }
                Step::Cancelled => {
                    self.counters.cancelled.fetch_add(1, Ordering::Relaxed);
                }
            }
        }

        tracing::trace!("Dispatcher for {} finished", domain);
    }
}
