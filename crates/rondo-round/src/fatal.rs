//! Fatal precondition violations.

use std::panic::Location;

/// Logs a broken call-order invariant with the round and call site, then
/// aborts the calling task.
#[track_caller]
pub(crate) fn precondition_violation(round: i64, what: &str) -> ! {
    let call_site = Location::caller();
    tracing::error!(round, call_site = %call_site, "precondition violated: {}", what);
    panic!("round {}: precondition violated: {} (at {})", round, what, call_site);
}
