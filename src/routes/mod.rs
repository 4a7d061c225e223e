//! Router Module Index
//!
//! Splits the `/api/v1` surface by the session guard mode it runs under.
//! The guard is attached as a layer at assembly time in `create_router`,
//! so a handler cannot end up exposed without its guard.

/// Routes reachable without a session. Reading a post runs the guard in
/// optional mode.
pub mod public;

/// Routes behind the required-mode session guard.
pub mod authenticated;
