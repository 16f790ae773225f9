//! Shared plumbing for the tidemark crates.
//!
//! Tidemark is a run-to-completion collector: each invocation searches a
//! social API for a list of domains, aggregates match counts, and writes
//! flat files. The pieces every binary and test needs live here:
//!
//! - [`observability`]: centralised tracing/logging initialisation with a
//!   rolling file sink
//! - [`run_span`]: the per-run tracing span that scopes all events of one
//!   collection pass to a `run_id`
//!
//! Heavier concerns (HTTP, API clients, reporting) live in their own
//! crates so this one stays cheap to depend on.

pub mod observability;

use tracing::Span;
use uuid::Uuid;

/// Build the span that wraps a whole collection run.
///
/// Every event emitted while the span is entered carries the same
/// `run_id`, so one process execution can be isolated in the shared log
/// file. `mode` is the entry point being run (`report` or `track`).
///
/// ```
/// let span = tidemark_common::run_span("report");
/// let _guard = span.enter();
/// tracing::info!("scoped to this run");
/// ```
pub fn run_span(mode: &str) -> Span {
    tracing::info_span!("run", run_id = %Uuid::new_v4(), mode)
}
