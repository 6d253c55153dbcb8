use std::future::Future;

use futures::future::join_all;

/// Default number of requests a single window may have in flight.
pub const DEFAULT_CONCURRENCY: usize = 40;

/// Runs `work` over `items` in consecutive windows of `limit` items. Every future in a
/// window is polled concurrently and the whole window is drained before the next one
/// starts, so no more than `limit` invocations are ever outstanding.
///
/// `work` is expected to absorb its own failures; whatever it returns is collected in
/// input order.
pub async fn run_batched<I, T, F, Fut>(items: Vec<I>, limit: usize, work: F) -> Vec<T>
where
    F: Fn(I) -> Fut,
    Fut: Future<Output = T>,
{
    let limit = limit.max(1);
    let mut out = Vec::with_capacity(items.len());
    let mut items = items.into_iter().peekable();
    while items.peek().is_some() {
        let window: Vec<Fut> = items.by_ref().take(limit).map(&work).collect();
        out.extend(join_all(window).await);
    }
    out
}
