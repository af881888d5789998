//! Per-domain request throttling
//!
//! Every domain gets a token bucket refilled at `requests_per_minute / 60`
//! tokens per second. A 429 response puts the domain into exponential
//! backoff on top of the bucket.

use dashmap::DashMap;
use std::time::{Duration, Instant};

/// Decision about whether a request to a domain may go out now
#[derive(Debug, Clone, PartialEq)]
pub enum ThrottleDecision {
    /// A token was taken; the request may proceed
    Allowed,
    /// Bucket is empty; next token arrives after this duration
    WaitFor(Duration),
    /// Domain is backing off after a 429 until the given instant
    RateLimited(Instant),
}

impl ThrottleDecision {
    /// How long to wait before asking again; zero when allowed.
    pub fn delay(&self) -> Duration {
        match self {
            Self::Allowed => Duration::ZERO,
            Self::WaitFor(wait) => *wait,
            Self::RateLimited(until) => until.saturating_duration_since(Instant::now()),
        }
    }
}

/// Token bucket and backoff state of one domain
#[derive(Debug, Clone)]
struct DomainBucket {
    tokens: f64,
    last_refill: Instant,
    consecutive_429s: u32,
    backoff_until: Option<Instant>,
    request_count: u64,
}

impl DomainBucket {
    fn new(capacity: f64) -> Self {
        Self {
            tokens: capacity,
            last_refill: Instant::now(),
            consecutive_429s: 0,
            backoff_until: None,
            request_count: 0,
        }
    }

    fn refill(&mut self, capacity: f64, per_second: f64) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * per_second).min(capacity);
        self.last_refill = now;
    }
}

/// Shared per-domain rate limiter
#[derive(Debug)]
pub struct DomainThrottle {
    buckets: DashMap<String, DomainBucket>,
    capacity: f64,
    per_second: f64,
}

impl DomainThrottle {
    /// Create a throttle allowing `requests_per_minute` per domain with the given burst.
    pub fn new(requests_per_minute: u32, burst: u32) -> Self {
        let requests_per_minute = requests_per_minute.max(1);
        let burst = burst.clamp(1, requests_per_minute);
        Self {
            buckets: DashMap::new(),
            capacity: burst as f64,
            per_second: requests_per_minute as f64 / 60.0,
        }
    }

    /// Try to take a token for `domain`.
    ///
    /// Refill and decrement happen under the entry lock, so two workers can
    /// never spend the same token.
    pub fn check(&self, domain: &str) -> ThrottleDecision {
        let mut bucket = self
            .buckets
            .entry(domain.to_string())
            .or_insert_with(|| DomainBucket::new(self.capacity));

        if let Some(backoff_until) = bucket.backoff_until {
            if Instant::now() < backoff_until {
                return ThrottleDecision::RateLimited(backoff_until);
            }
            bucket.backoff_until = None;
        }

        bucket.refill(self.capacity, self.per_second);

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            bucket.request_count += 1;
            ThrottleDecision::Allowed
        } else {
            let missing = 1.0 - bucket.tokens;
            ThrottleDecision::WaitFor(Duration::from_secs_f64(missing / self.per_second))
        }
    }

    /// Record a 429 response. Backoff is 30s doubling per consecutive 429, max 10 minutes.
    pub fn record_429(&self, domain: &str, retry_after: Option<Duration>) {
        let mut bucket = self
            .buckets
            .entry(domain.to_string())
            .or_insert_with(|| DomainBucket::new(self.capacity));

        bucket.consecutive_429s += 1;
        let backoff = retry_after.unwrap_or_else(|| {
            Duration::from_secs(30 * 2u64.pow(bucket.consecutive_429s.min(5) - 1))
        });
        let capped = backoff.min(Duration::from_secs(600));
        bucket.backoff_until = Some(Instant::now() + capped);

        tracing::warn!("{} answered 429, backing off for {:?}", domain, capped);
    }

    /// Record a response that was not a 429.
    pub fn record_success(&self, domain: &str) {
        if let Some(mut bucket) = self.buckets.get_mut(domain) {
            bucket.consecutive_429s = 0;
        }
    }

    pub fn stats(&self) -> ThrottleStats {
        let now = Instant::now();
        let mut stats = ThrottleStats::default();
        for entry in self.buckets.iter() {
            stats.domains_tracked += 1;
            stats.total_requests += entry.request_count;
            if entry.backoff_until.is_some_and(|until| now < until) {
                stats.rate_limited_domains += 1;
            }
        }
        stats
    }
}

/// Throttle counters
#[derive(Debug, Clone, Default)]
pub struct ThrottleStats {
    pub domains_tracked: usize,
    pub rate_limited_domains: usize,
    pub total_requests: u64,
}
