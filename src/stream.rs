//! Incremental delivery of one query's result groups.

use std::collections::HashSet;

use futures_util::stream::Stream;
use metasearch_core::{Coordinator, CoordinatorEvent, ResultGroup};
use tokio::sync::broadcast::error::RecvError;

/// Submit `query` and yield each result group as it is published, in
/// completion order.
///
/// Returns `None` for a blank query. The stream ends once every provider
/// has settled. If the stream is superseded by a newer submission on the
/// same coordinator, it ends without yielding the stale groups.
pub fn search_groups(
    coordinator: &Coordinator,
    query: &str,
) -> Option<impl Stream<Item = ResultGroup> + Send + use<>> {
    let mut events = coordinator.subscribe();
    let handle = coordinator.submit(query)?;
    let epoch = handle.epoch().clone();
    let coordinator = coordinator.clone();

    Some(async_stream::stream! {
        let mut sent: HashSet<String> = HashSet::new();
        let settled = handle.settled();
        tokio::pin!(settled);

        loop {
            let next = tokio::select! {
                biased;
                event = events.recv() => Some(event),
                _ = &mut settled => None,
            };
            match next {
                Some(Ok(CoordinatorEvent::GroupPublished { epoch: published, group }))
                    if published == epoch =>
                {
                    sent.insert(group.provider_id.clone());
                    yield group;
                }
                Some(Ok(_)) => {}
                Some(Err(RecvError::Lagged(skipped))) => {
                    tracing::warn!(skipped, "result stream lagged; catching up from snapshot");
                }
                Some(Err(RecvError::Closed)) | None => break,
            }
        }

        // Anything missed while lagging is still in the published state.
        let state = coordinator.snapshot();
        if state.epoch.as_ref() == Some(&epoch) {
            for group in state.groups {
                if sent.insert(group.provider_id.clone()) {
                    yield group;
                }
            }
        }
    })
}
