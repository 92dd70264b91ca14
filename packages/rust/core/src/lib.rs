//! Corpus pipeline for tallycheck.
//!
//! This crate ties together extraction, aggregation, cross-validation, and
//! artifact writing into one end-to-end run over a directory of pages.

pub mod pipeline;

pub use pipeline::{
    DocumentError, ProgressReporter, RunResult, SilentProgress, TierOutcome, extract_document,
    list_documents, run,
};
