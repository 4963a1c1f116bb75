//! Rendering of the embedded statements.

use super::{sql_values, IdentityColumns, Scope, TerminatingRule};
use crate::error::{Result, WaflogsError};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

const REQUESTS_BLOCKED_BY: &str = include_str!("statements/requests_blocked_by.sql");
const FASTEST_IDENTITIES: &str = include_str!("statements/fastest_identities.sql");
const APC1_MATERIALIZED_VIEW: &str = include_str!("statements/apc1_materialized_view.sql");
const APC1_URLS: &str = include_str!("statements/apc1_urls.sql");
const APC1_USER_AGENTS: &str = include_str!("statements/apc1_user_agents.sql");
const APC1_SCRAPED_PRODUCTS: &str = include_str!("statements/apc1_scraped_products.sql");

fn placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{\s*([a-z0-9_]+)\s*\}\}").expect("valid placeholder regex"))
}

/// Substitutes every `{{name}}` in `template` with its value from `vars`.
///
/// A placeholder without a value is an error rather than silently empty.
pub fn render(template: &str, vars: &HashMap<&str, String>) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;

    for caps in placeholder().captures_iter(template) {
        let whole = caps.get(0).map(|m| m.range()).unwrap_or(0..0);
        let name = &caps[1];
        let value = vars
            .get(name)
            .ok_or_else(|| WaflogsError::template(format!("no value for placeholder '{name}'")))?;

        out.push_str(&template[last..whole.start]);
        out.push_str(value);
        last = whole.end;
    }
    out.push_str(&template[last..]);

    Ok(out)
}

fn scope_vars(scope: &Scope) -> HashMap<&'static str, String> {
    HashMap::from([
        ("waf", scope.waf.as_str().to_string()),
        ("waf_table", scope.waf.table().to_string()),
        ("apc1_table", apc1_table(scope)),
        ("year", format!("{}", scope.year)),
        ("month", format!("{:02}", scope.month)),
        ("day", format!("{:02}", scope.day)),
    ])
}

/// Table the APC1 materialized view is written to for `scope`.
fn apc1_table(scope: &Scope) -> String {
    format!(
        "\"waflogs\".\"apc1_{}_{:04}{:02}{:02}\"",
        scope.waf.as_str().to_lowercase(),
        scope.year,
        scope.month,
        scope.day
    )
}

/// Requests per identity terminated by any of `rules`.
pub fn requests_blocked_by(
    scope: &Scope,
    identity: IdentityColumns,
    rules: &[TerminatingRule],
    limit: u32,
) -> Result<String> {
    if rules.is_empty() {
        return Err(WaflogsError::template("at least one terminating rule is required"));
    }

    let mut vars = scope_vars(scope);
    vars.insert("identity_cols", identity.as_sql().to_string());
    vars.insert(
        "terminating_rules",
        sql_values(rules.iter().map(TerminatingRule::id)),
    );
    vars.insert("limit", limit.to_string());
    render(REQUESTS_BLOCKED_BY, &vars)
}

/// Identities with the highest request rate per 5-minute window.
///
/// `custom_where_clause` is inserted verbatim (including its `WHERE`) to
/// narrow the requests considered.
pub fn fastest_identities(
    scope: &Scope,
    identity: IdentityColumns,
    min_rate: u32,
    custom_where_clause: &str,
    limit: u32,
) -> Result<String> {
    let mut vars = scope_vars(scope);
    vars.insert("identity_cols", identity.as_sql().to_string());
    vars.insert("min_rate", min_rate.to_string());
    vars.insert("custom_where_clause", custom_where_clause.to_string());
    vars.insert("limit", limit.to_string());
    render(FASTEST_IDENTITIES, &vars)
}

/// Parquet table holding one day of APC1 traffic.
pub fn apc1_materialized_view(scope: &Scope) -> Result<String> {
    render(APC1_MATERIALIZED_VIEW, &scope_vars(scope))
}

pub fn apc1_urls(scope: &Scope, limit: u32) -> Result<String> {
    with_limit(APC1_URLS, scope, limit)
}

pub fn apc1_user_agents(scope: &Scope, limit: u32) -> Result<String> {
    with_limit(APC1_USER_AGENTS, scope, limit)
}

pub fn apc1_scraped_products(scope: &Scope, limit: u32) -> Result<String> {
    with_limit(APC1_SCRAPED_PRODUCTS, scope, limit)
}

fn with_limit(template: &str, scope: &Scope, limit: u32) -> Result<String> {
    let mut vars = scope_vars(scope);
    vars.insert("limit", limit.to_string());
    render(template, &vars)
}
