use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::app::AppState;
use crate::errors::{AppError, AppResult};

const DEFAULT_MAX_REQUESTS: u32 = 120;
const DEFAULT_WINDOW_SECS: u64 = 60;

#[derive(Debug, Clone, Copy)]
struct WindowSlot {
    window_start: Instant,
    count: u32,
}

/// Fixed-window request limiter keyed by client address.
///
/// The counter store belongs to the limiter instance handed to the router,
/// not to a process-global, so tests can build their own limiter and clear
/// it deterministically via [`RateLimiter::reset`].
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    store: Mutex<HashMap<String, WindowSlot>>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            store: Mutex::new(HashMap::new()),
        }
    }

    /// Build from `RATE_LIMIT_MAX_REQUESTS` / `RATE_LIMIT_WINDOW_SECS`.
    pub fn from_env() -> AppResult<Self> {
        let max_requests = match std::env::var("RATE_LIMIT_MAX_REQUESTS") {
            Ok(value) => value.parse::<u32>().map_err(|_| {
                AppError::configuration("RATE_LIMIT_MAX_REQUESTS must be a valid integer")
            })?,
            Err(_) => DEFAULT_MAX_REQUESTS,
        };
        let window_secs = match std::env::var("RATE_LIMIT_WINDOW_SECS") {
            Ok(value) => value.parse::<u64>().map_err(|_| {
                AppError::configuration("RATE_LIMIT_WINDOW_SECS must be a valid integer")
            })?,
            Err(_) => DEFAULT_WINDOW_SECS,
        };

        Ok(Self::new(max_requests, Duration::from_secs(window_secs)))
    }

    /// Record a hit for `key`; returns false once the window budget is spent.
    pub fn check(&self, key: &str) -> bool {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> bool {
        let mut store = self.store.lock().expect("rate limit store poisoned");
        let slot = store.entry(key.to_string()).or_insert(WindowSlot {
            window_start: now,
            count: 0,
        });

        if now.duration_since(slot.window_start) >= self.window {
            slot.window_start = now;
            slot.count = 0;
        }

        slot.count += 1;
        slot.count <= self.max_requests
    }

    pub fn reset(&self) {
        self.store.lock().expect("rate limit store poisoned").clear();
    }
}

/// Middleware rejecting over-limit clients with 429.
pub async fn enforce(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let key = client_key(request.headers());
    if !state.limiter.check(&key) {
        tracing::warn!(client = %key, "rate limit exceeded");
        return AppError::RateLimited.into_response();
    }
    next.run(request).await
}

fn client_key(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.split(',').next().unwrap_or(s).trim().to_string())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(String::from)
        })
        .unwrap_or_else(|| "unknown".to_string())
}
