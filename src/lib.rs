//! Client-side engine for a nested task service: optimistic updates,
//! reconciliation with the server's answer, and depth-safe moves.

pub mod cli;
pub mod engine;
pub mod io;
pub mod model;
pub mod ops;
pub mod remote;
