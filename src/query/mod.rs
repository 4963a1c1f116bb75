//! Query execution and result retrieval.
//!
//! The executor drives one query from submission to a CSV file on disk; the
//! fetcher does the paginated download once the query succeeded.

mod executor;
mod fetcher;

pub use executor::{ExecutionOutcome, PollSettings, QueryExecutor};
pub use fetcher::{FetchSummary, ResultFetcher, DEFAULT_PAGE_SIZE, DEFAULT_PREVIEW_ROWS};

/// Number of bytes in a terabyte as Athena bills it (2^40).
pub const TB: f64 = 1_099_511_627_776.0;

/// Price in USD per terabyte scanned.
pub const USD_PER_TB: f64 = 5.0;

/// Estimated cost in USD of scanning `bytes_scanned` bytes.
pub fn estimated_query_cost(bytes_scanned: i64) -> f64 {
    USD_PER_TB * (bytes_scanned as f64 / TB)
}

/// Formats the estimated cost, e.g. `5.00 USD`.
pub fn format_query_cost(bytes_scanned: i64) -> String {
    format!("{:.2} USD", estimated_query_cost(bytes_scanned))
}

/// Formats a byte count with 1024-based units, e.g. `1.5KB`.
pub fn bytes_to_human(bytes: i64) -> String {
    let mut value = bytes as f64;
    for unit in ["", "K", "M", "G", "T", "P", "E", "Z"] {
        if value.abs() < 1024.0 {
            return format!("{value:3.1}{unit}B");
        }
        value /= 1024.0;
    }
    format!("{value:.1}YiB")
}
