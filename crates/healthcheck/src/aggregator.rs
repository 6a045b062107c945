//! Reduction of individual outcomes into one category status.

use crate::types::{AggregateResult, Outcome, Status};

/// All-or-nothing reduction: a single DOWN outcome marks the whole set DOWN.
///
/// An empty set is UP. A category nobody registered probes for has
/// nothing to report against, so it does not block the orchestrator.
pub fn reduce(outcomes: Vec<Outcome>) -> AggregateResult {
    let status = if outcomes.iter().all(Outcome::is_up) {
        Status::Up
    } else {
        Status::Down
    };

    AggregateResult {
        status,
        checks: outcomes,
    }
}

/// Merge several results into one, concatenating their checks in order.
pub fn combine(results: impl IntoIterator<Item = AggregateResult>) -> AggregateResult {
    reduce(results.into_iter().flat_map(|result| result.checks).collect())
}
