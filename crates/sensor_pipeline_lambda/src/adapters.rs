//! Service seams. Each trait is what a handler needs from one managed
//! service; the AWS implementation lives next to it and tests supply
//! in-memory doubles.

use std::future::Future;

pub mod inference;
pub mod label_detector;
pub mod notifier;
pub mod object_store;
pub mod record_table;

/// Runs an SDK future from synchronous adapter code. Requires the
/// multi-threaded runtime the Lambda binaries start with.
pub(crate) fn block_on<F: Future>(future: F) -> F::Output {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
