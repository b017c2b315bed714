//! Terminal timers for practising under exam conditions.
//! `mock` times every question of a mock test against a per question limit and logs one row per
//! question, `study` times study questions and logs one summary row per session. Both logs are
//! plain CSV files that `stats` and `review` can summarize later.
//!

pub mod alarm;
pub mod cli;
pub mod session;
pub mod stats;
pub mod storage;
pub mod timer;
pub mod utils;
