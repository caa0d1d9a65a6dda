//! Command-line host for the EFA transit query service
//!
//! The binary lives in `main.rs`; argument definitions and output rendering
//! are kept here so they can be tested without a backend.

pub mod cli;
pub mod output;
