//! Error taxonomy.
//!
//! Validation and cancellation failures are *data*, not `Err` — they come
//! back as rejected `Order`s or a `false` boolean. The only things that
//! propagate as `Result<_, EngineError>` are structural setup errors
//! (bad configuration at startup). Matching
//! invariant violations are neither: they are fatal programmer errors that
//! abort the process rather than unwind through a `Result`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Logs and aborts the process. Call this only when a matching invariant
/// has been violated (e.g. a fill would drive a remaining quantity
/// negative) — a state no amount of error-recovery logic should paper
/// over — the process aborts rather than continue with a corrupt book.
#[cold]
pub fn fatal_invariant(message: &str) -> ! {
    tracing::error!(message, "matching invariant violated; aborting");
    std::process::abort()
}
