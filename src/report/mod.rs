// file: src/report/mod.rs
// description: run summary module exports
// reference: internal module structure

pub mod summary;

pub use summary::{InputFingerprint, RUN_SUMMARY_NAME, RunSummary};
