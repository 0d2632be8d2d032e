//! Batch conversion of CSV / Excel tables with optional cleaning.
//!
//! Each uploaded file goes through [`data::loader`], [`data::cleaner`],
//! [`data::select`] and [`data::export`]; [`pipeline::run_batch`] drives a
//! whole batch and reports to a [`pipeline::Reporter`].

pub mod app;
pub mod config;
pub mod data;
pub mod error;
pub mod pipeline;

pub use error::SweepError;
