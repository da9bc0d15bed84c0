//! Concurrent, fire-and-forget replication to secondary targets.
//!
//! [`dispatch`] is called only after the primary relay succeeded. It
//! spawns a supervisor task that starts one task per secondary, so every
//! secondary is in flight at once and none waits on another. Each task
//! records its own outcome in the request log; the supervisor only counts
//! results and reports panics. Nothing flows back to the caller, whose
//! response has already been built.
//!
//! **Shutdown behavior:** secondary tasks still running when the runtime
//! stops are dropped. Delivery to secondaries is best-effort.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::task::JoinHandle;

use super::relay::{self, failure_event, response_event};
use super::InboundRequest;
use crate::server::AppState;
use crate::sink::TargetRole;

/// Counts of secondary outcomes for one request.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FanOutSummary {
    pub delivered: usize,
    pub failed: usize,
}

/// Start replicating `request` to every secondary of `route_idx`.
///
/// Returns immediately. The handle resolves once every secondary has
/// answered or failed; the request path drops it.
pub fn dispatch(
    state: Arc<AppState>,
    route_idx: usize,
    request: Arc<InboundRequest>,
) -> JoinHandle<FanOutSummary> {
    tokio::spawn(async move {
        let count = state
            .config
            .routes
            .get(route_idx)
            .map_or(0, |route| route.secondaries.len());

        // Spawn everything before awaiting anything.
        let handles: Vec<_> = (0..count)
            .map(|idx| {
                let state = Arc::clone(&state);
                let request = Arc::clone(&request);
                tokio::spawn(async move { mirror(&state, route_idx, idx, &request).await })
            })
            .collect();

        let mut summary = FanOutSummary::default();
        for handle in handles {
            match handle.await {
                Ok(true) => summary.delivered += 1,
                Ok(false) => summary.failed += 1,
                Err(e) => {
                    tracing::error!(
                        request_id = %request.id,
                        error = %e,
                        "secondary task aborted"
                    );
                    state.stats.mirror_failed.fetch_add(1, Ordering::Relaxed);
                    summary.failed += 1;
                }
            }
        }

        tracing::debug!(
            request_id = %request.id,
            delivered = summary.delivered,
            failed = summary.failed,
            "fan-out complete"
        );
        summary
    })
}

/// Send to one secondary and record the outcome. Returns `true` on delivery.
async fn mirror(state: &AppState, route_idx: usize, idx: usize, request: &InboundRequest) -> bool {
    let Some(target) = state
        .config
        .routes
        .get(route_idx)
        .and_then(|route| route.secondaries.get(idx))
    else {
        return false;
    };

    let (exchange, result) =
        relay::send(&state.http_client, target, request, state.config.timeout()).await;

    let (event, delivered) = match result {
        Ok(response) => {
            tracing::info!(
                request_id = %request.id,
                target = %exchange.url,
                status = response.status.as_u16(),
                latency_ms = exchange.latency_ms(),
                "secondary target responded"
            );
            state.stats.mirrored.fetch_add(1, Ordering::Relaxed);
            (
                response_event(&request.id, TargetRole::Secondary, &exchange, &response),
                true,
            )
        }
        Err(e) => {
            tracing::warn!(
                request_id = %request.id,
                target = %exchange.url,
                error = %e,
                latency_ms = exchange.latency_ms(),
                "secondary target failed"
            );
            state.stats.mirror_failed.fetch_add(1, Ordering::Relaxed);
            (
                failure_event(&request.id, TargetRole::Secondary, &exchange, &e),
                false,
            )
        }
    };

    if let Err(e) = state.sink.append(&event).await {
        tracing::error!(
            request_id = %request.id,
            target = %exchange.url,
            error = %e,
            "failed to write secondary record"
        );
    }
    delivered
}
