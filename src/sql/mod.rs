//! SQL templates for WAF log queries.
//!
//! Statements live in `statements/*.sql` with `{{name}}` placeholders and are
//! rendered for a [`Scope`], the WAF and day a query targets.

mod templates;

pub use templates::{
    apc1_materialized_view, apc1_scraped_products, apc1_urls, apc1_user_agents,
    fastest_identities, render, requests_blocked_by,
};

use crate::error::{Result, WaflogsError};
use chrono::{Datelike, NaiveDate};
use std::fmt;
use std::str::FromStr;

/// Web application firewall whose logs are queried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Waf {
    #[default]
    Bc,
    Ecp,
}

impl Waf {
    /// Returns the identifier used in paths and query output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bc => "BC",
            Self::Ecp => "ECP",
        }
    }

    /// Returns the fully qualified log table of this WAF.
    pub fn table(&self) -> &'static str {
        match self {
            Self::Bc => "\"waflogs\".\"waf_logs_p\"",
            Self::Ecp => "\"waflogs\".\"waf_logs_ecp_p\"",
        }
    }
}

impl fmt::Display for Waf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Waf {
    type Err = WaflogsError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "BC" | "bc" => Ok(Self::Bc),
            "ECP" | "ecp" => Ok(Self::Ecp),
            _ => Err(WaflogsError::invalid_input(format!(
                "WAF {s} unknown, must be one of 'BC', 'ECP'"
            ))),
        }
    }
}

/// The WAF and day a query targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scope {
    pub waf: Waf,
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl Scope {
    pub fn new(waf: Waf, date: NaiveDate) -> Self {
        Self {
            waf,
            year: date.year(),
            month: date.month(),
            day: date.day(),
        }
    }

    /// Formats the day as `YYYY-MM-DD`.
    pub fn day_label(&self) -> String {
        format!("{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

/// Columns identifying a client in aggregations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityColumns {
    Ip,
    UserAgent,
}

impl IdentityColumns {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Ip => "client_ip, country",
            Self::UserAgent => "bot_name, bot_category, user_agent",
        }
    }
}

/// WAF rule that terminated a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminatingRule {
    RateLimit,
}

impl TerminatingRule {
    /// Returns the rule id as it appears in the logs.
    pub fn id(&self) -> &'static str {
        match self {
            Self::RateLimit => "rate-limit",
        }
    }
}

/// Renders values as a SQL value list, e.g. `'a','b'`.
pub fn sql_values<'a>(values: impl IntoIterator<Item = &'a str>) -> String {
    let quoted: Vec<String> = values
        .into_iter()
        .map(|v| format!("'{}'", v.replace('\'', "''")))
        .collect();
    quoted.join(",")
}
