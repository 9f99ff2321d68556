#![doc = "cov-relay-core: coverage report aggregation and submission pipeline."]

//! This crate contains the pipeline that turns the coverage reports of a
//! multi-module build into per-language submissions to a coverage service:
//! discovery → transform → partition → submit, governed by a failure policy.
//!
//! Transport and version-control access live behind the traits in
//! [`contract`]; the `cov-relay` binary crate provides the live
//! implementations.

pub mod contract;
pub mod coverage;
pub mod credential;
pub mod discovery;
pub mod error;
pub mod language;
pub mod partition;
pub mod policy;
pub mod processor;
pub mod submission;
pub mod transform;

pub use error::ReporterError;
pub use processor::{ProcessingSummary, Processor, ProcessorConfig};
