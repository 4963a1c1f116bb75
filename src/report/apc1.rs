//! APC1 report: what the APC1 scraper requested on one day.

use super::ReportQuery;
use crate::error::Result;
use crate::sql::{self, Scope};

pub const NAME: &str = "apc1";

/// Renders the report's queries in execution order.
///
/// The first query materializes the day's APC1 traffic as a Parquet table
/// that the other queries read from.
pub fn queries(scope: &Scope) -> Result<Vec<ReportQuery>> {
    Ok(vec![
        ReportQuery::new(
            "create-materialized-view",
            "Parquet waflog view",
            sql::apc1_materialized_view(scope)?,
        ),
        ReportQuery::new(
            "scraped-urls",
            "scraped URLs with request counts",
            sql::apc1_urls(scope, 100)?,
        ),
        ReportQuery::new(
            "scraper-user-agents",
            "scraper User Agents with request counts and time window",
            sql::apc1_user_agents(scope, 1000)?,
        ),
        ReportQuery::new(
            "scraped-products",
            "products scraped",
            sql::apc1_scraped_products(scope, 200_000)?,
        ),
    ])
}
