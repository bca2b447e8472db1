//! Prompt AutoTest - batched prompt template testing across LLM models
//!
//! Runs a prompt template over a matrix of synthesized test cases and
//! selected models, scores every output and summarizes pass rates.
//!
//! ## Pipeline
//!
//! 1. [`synth`] produces test cases (model-authored or a deterministic fallback)
//! 2. [`executor::plan`] expands test cases x models into work items
//! 3. [`executor::BatchScheduler`] runs items in rate-limited batches with a
//!    deadline per item; failures become degraded results
//! 4. [`executor::aggregate`] folds results into a [`models::RunSummary`]
//!
//! [`executor::AutoTestRunner`] drives the whole pipeline and publishes
//! progress on a watch channel.

pub mod client;
pub mod config;
pub mod executor;
pub mod models;
pub mod output;
pub mod results;
pub mod synth;
pub mod template;
pub mod utils;
