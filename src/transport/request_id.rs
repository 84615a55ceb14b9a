//! Request correlation ids.
//!
//! A caller can pin the `X-Request-Id` of every call made while a future runs
//! by wrapping it in [`with_request_id`]. Outside such a scope each request
//! gets a fresh random id.

use rand::RngCore;
use std::future::Future;

tokio::task_local! {
    static REQUEST_ID: String;
}

/// Runs `fut` with `id` as the request id of every call it issues.
pub async fn with_request_id<F>(id: impl Into<String>, fut: F) -> F::Output
where
    F: Future,
{
    REQUEST_ID.scope(id.into(), fut).await
}

/// Request id scoped by [`with_request_id`], if any.
pub fn current_request_id() -> Option<String> {
    REQUEST_ID
        .try_with(|id| id.clone())
        .ok()
        .filter(|id| !id.is_empty())
}

/// 32 random bytes, hex-encoded.
pub fn generate_request_id() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub(crate) fn resolve_request_id() -> String {
    current_request_id().unwrap_or_else(generate_request_id)
}
