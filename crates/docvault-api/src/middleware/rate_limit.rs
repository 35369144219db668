//! In-memory request rate limiting.
//!
//! Fixed-window counters keyed by caller (falling back to remote address
//! before authentication), sharded to reduce lock contention. Uploads get a
//! tighter limit than the rest of the API since each one moves real bytes.

use crate::auth::models::CallerContext;
use axum::{
    extract::{Request, State},
    http::{HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use docvault_core::constants::API_PREFIX;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

#[derive(Clone)]
struct RateLimitBucket {
    count: u32,
    reset_at: Instant,
}

impl RateLimitBucket {
    fn new(window_seconds: u64) -> Self {
        Self {
            count: 0,
            reset_at: Instant::now() + Duration::from_secs(window_seconds),
        }
    }

    fn check_and_increment(&mut self, limit: u32, window_seconds: u64) -> (bool, u32) {
        let now = Instant::now();

        if now >= self.reset_at {
            self.count = 0;
            self.reset_at = now + Duration::from_secs(window_seconds);
        }

        if self.count < limit {
            self.count += 1;
            (true, limit.saturating_sub(self.count))
        } else {
            (false, 0)
        }
    }

    fn reset_in(&self) -> Duration {
        self.reset_at.saturating_duration_since(Instant::now())
    }
}

/// Sharded fixed-window rate limiter.
#[derive(Clone)]
pub struct HttpRateLimiter {
    shards: Vec<Arc<Mutex<HashMap<String, RateLimitBucket>>>>,
    shard_count: usize,
    limit_per_minute: u32,
    upload_limit_per_minute: u32,
    window_seconds: u64,
    max_buckets: usize,
}

impl HttpRateLimiter {
    pub fn new(limit_per_minute: u32, upload_limit_per_minute: u32) -> Self {
        Self::with_shards(limit_per_minute, upload_limit_per_minute, 16)
    }

    pub fn with_shards(
        limit_per_minute: u32,
        upload_limit_per_minute: u32,
        shard_count: usize,
    ) -> Self {
        let shards = (0..shard_count)
            .map(|_| Arc::new(Mutex::new(HashMap::new())))
            .collect();
        Self {
            shards,
            shard_count,
            limit_per_minute,
            upload_limit_per_minute,
            window_seconds: 60,
            max_buckets: 10_000,
        }
    }

    fn shard_index(&self, key: &str) -> usize {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % self.shard_count
    }

    pub async fn check_rate_limit(&self, key: &str, limit: u32) -> Result<u32, Duration> {
        let shard = &self.shards[self.shard_index(key)];
        let mut buckets = shard.lock().await;

        // Evict before inserting when the shard is full: expired buckets
        // first, then the oldest one.
        if buckets.len() >= self.max_buckets && !buckets.contains_key(key) {
            let now = Instant::now();
            let grace = Duration::from_secs(self.window_seconds);
            buckets.retain(|_, bucket| {
                bucket.reset_at > now || now.duration_since(bucket.reset_at) < grace
            });

            if buckets.len() >= self.max_buckets {
                let oldest_key = buckets
                    .iter()
                    .min_by_key(|(_, bucket)| bucket.reset_at)
                    .map(|(k, _)| k.clone());
                if let Some(evicted) = oldest_key {
                    buckets.remove(&evicted);
                    tracing::debug!(
                        evicted_key = %evicted,
                        "Evicted oldest rate limit bucket at shard capacity"
                    );
                }
            }
        }

        let window_seconds = self.window_seconds;
        let bucket = buckets
            .entry(key.to_string())
            .or_insert_with(|| RateLimitBucket::new(window_seconds));

        let (allowed, remaining) = bucket.check_and_increment(limit, window_seconds);
        if allowed {
            Ok(remaining)
        } else {
            Err(bucket.reset_in())
        }
    }

    /// Drop buckets whose window expired more than a full window ago.
    /// Driven by a periodic task spawned at startup.
    pub async fn cleanup_expired_buckets(&self) {
        let now = Instant::now();
        let grace = Duration::from_secs(self.window_seconds);
        let mut removed = 0usize;
        for shard in &self.shards {
            let mut buckets = shard.lock().await;
            let before = buckets.len();
            buckets.retain(|_, bucket| now.saturating_duration_since(bucket.reset_at) < grace);
            removed += before - buckets.len();
        }
        if removed > 0 {
            tracing::debug!(removed, "Cleaned up expired rate limit buckets");
        }
    }

    fn limit_for(&self, request: &Request) -> u32 {
        let is_upload = request.method() == axum::http::Method::POST
            && request.uri().path() == format!("{}/documents", API_PREFIX);
        if is_upload {
            self.upload_limit_per_minute
        } else {
            self.limit_per_minute
        }
    }
}

/// Rate limiting middleware.
///
/// Adds `X-RateLimit-Limit` and `X-RateLimit-Remaining` to every response,
/// and `Retry-After` on 429s.
pub async fn rate_limit_middleware(
    State(rate_limiter): State<Arc<HttpRateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let key = if let Some(caller) = request.extensions().get::<CallerContext>() {
        format!("user:{}", caller.user_id)
    } else {
        let addr = request
            .extensions()
            .get::<axum::extract::ConnectInfo<std::net::SocketAddr>>()
            .map(|info| info.0.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        format!("ip:{}", addr)
    };
    let limit = rate_limiter.limit_for(&request);

    match rate_limiter.check_rate_limit(&key, limit).await {
        Ok(remaining) => {
            let mut response = next.run(request).await;
            set_header(&mut response, "X-RateLimit-Limit", &limit.to_string());
            set_header(
                &mut response,
                "X-RateLimit-Remaining",
                &remaining.to_string(),
            );
            response
        }
        Err(reset_in) => {
            tracing::warn!(key = %key, limit, "Rate limit exceeded");

            let mut response = (
                StatusCode::TOO_MANY_REQUESTS,
                axum::Json(serde_json::json!({
                    "error": "Too many requests. Please slow down."
                })),
            )
                .into_response();

            set_header(&mut response, "X-RateLimit-Limit", &limit.to_string());
            set_header(&mut response, "X-RateLimit-Remaining", "0");
            set_header(
                &mut response,
                "Retry-After",
                &reset_in.as_secs().max(1).to_string(),
            );
            response
        }
    }
}

fn set_header(response: &mut Response, name: &'static str, value: &str) {
    if let Ok(header_value) = HeaderValue::from_str(value) {
        response.headers_mut().insert(name, header_value);
    }
}
