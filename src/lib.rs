//! waflogs - load WAF traffic reports from Athena into CSV files and chart them.
//!
//! This library exposes the core modules for use by the binary and the
//! integration tests.

pub mod athena;
pub mod cli;
pub mod config;
pub mod csv;
pub mod error;
pub mod logging;
pub mod query;
pub mod report;
pub mod signals;
pub mod sql;
