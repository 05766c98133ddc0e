use reqwest::header::HeaderMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Fallback cooldown when a 429 arrives without a usable reset hint.
const DEFAULT_COOLDOWN: Duration = Duration::from_secs(60);

/// Upper bound on the random jitter added to every cooldown, so that
/// accounts tripped at the same moment do not all wake together.
const COOLDOWN_JITTER_MS: u64 = 1000;

/// Polling interval bounds for the blocking wait variant.
const POLL_MIN_MS: u64 = 50;
const POLL_MAX_MS: u64 = 150;

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub time_window: Duration,
    pub burst_allowance: u32,
}

impl RateLimitConfig {
    /// Reddit allows roughly 100 requests/minute per OAuth account; the
    /// production default stays a little under the observed ceiling.
    pub fn reddit_oauth(requests_per_minute: u32, burst_allowance: u32) -> Self {
        Self {
            max_requests: requests_per_minute,
            time_window: Duration::from_secs(60),
            burst_allowance,
        }
    }
}

#[derive(Debug)]
struct RateState {
    tokens: f64,
    last_refill: Instant,
    cooldown_until: Option<Instant>,
}

impl RateState {
    fn refill(&mut self, now: Instant, capacity: f64, refill_rate: f64) {
        let elapsed = now.duration_since(self.last_refill);
        self.tokens = (self.tokens + elapsed.as_secs_f64() * refill_rate).min(capacity);
        self.last_refill = now;
    }

    fn in_cooldown(&self, now: Instant) -> bool {
        self.cooldown_until.is_some_and(|until| now < until)
    }
}

/// Per-credential token-bucket limiter with reactive cooldown.
///
/// The bucket refills continuously and bounds proactive request rate; the
/// cooldown is set from observed 429s and exhausted quota headers and
/// overrides token availability entirely while active. One lock per
/// credential, so unrelated accounts' traffic never serializes.
#[derive(Debug)]
pub struct RateLimiter {
    capacity: f64,
    refill_rate: f64,
    states: Vec<Mutex<RateState>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig, credential_count: usize) -> Self {
        let capacity = config.burst_allowance as f64;
        let refill_rate = config.max_requests as f64 / config.time_window.as_secs_f64();
        let now = Instant::now();

        let states = (0..credential_count)
            .map(|_| {
                Mutex::new(RateState {
                    tokens: capacity,
                    last_refill: now,
                    cooldown_until: None,
                })
            })
            .collect();

        Self {
            capacity,
            refill_rate,
            states,
        }
    }

    /// Non-blocking: take one token if the credential is usable right now.
    /// Always false while the credential is cooling down.
    pub async fn try_consume(&self, credential_index: usize) -> bool {
        let now = Instant::now();
        let mut state = self.states[credential_index].lock().await;

        if state.in_cooldown(now) {
            return false;
        }

        state.refill(now, self.capacity, self.refill_rate);
        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Blocking variant: polls with short jittered sleeps until a token is
    /// available or the timeout elapses.
    pub async fn await_token(&self, credential_index: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;

        loop {
            if self.try_consume(credential_index).await {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            let pause = Duration::from_millis(fastrand::u64(POLL_MIN_MS..=POLL_MAX_MS));
            sleep(pause).await;
        }
    }

    /// Feed an observed response back into the limiter. A 429, or a
    /// remaining-quota header at zero, puts the credential into cooldown for
    /// the upstream-hinted duration plus jitter.
    pub async fn note_response(
        &self,
        credential_index: usize,
        status_code: u16,
        headers: &HeaderMap,
    ) {
        let quota_exhausted = header_f64(headers, "x-ratelimit-remaining")
            .is_some_and(|remaining| remaining <= 0.0);

        if status_code != 429 && !quota_exhausted {
            return;
        }

        let reset_hint = header_u64(headers, "retry-after")
            .or_else(|| header_u64(headers, "x-ratelimit-reset"))
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_COOLDOWN);
        let jitter = Duration::from_millis(fastrand::u64(0..=COOLDOWN_JITTER_MS));
        let until = Instant::now() + reset_hint + jitter;

        let mut state = self.states[credential_index].lock().await;
        // Cooldowns only ever extend; a shorter hint never cuts one short.
        if state.cooldown_until.map_or(true, |existing| until > existing) {
            state.cooldown_until = Some(until);
        }

        warn!(
            account = credential_index,
            status_code,
            cooldown_secs = reset_hint.as_secs(),
            "rate limit signal observed, credential cooling down"
        );
    }

    pub async fn in_cooldown(&self, credential_index: usize) -> bool {
        let state = self.states[credential_index].lock().await;
        state.in_cooldown(Instant::now())
    }

    pub async fn available_tokens(&self, credential_index: usize) -> f64 {
        let now = Instant::now();
        let mut state = self.states[credential_index].lock().await;
        state.refill(now, self.capacity, self.refill_rate);
        debug!(
            account = credential_index,
            tokens = state.tokens,
            "token bucket inspected"
        );
        state.tokens
    }
}

fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<f64>().ok())
        .map(|v| v.ceil() as u64)
}

fn header_f64(headers: &HeaderMap, name: &str) -> Option<f64> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}
