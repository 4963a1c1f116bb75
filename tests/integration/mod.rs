//! Integration tests for waflogs.

pub mod cli_test;
pub mod common;
pub mod executor_test;
pub mod report_test;
