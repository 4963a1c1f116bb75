//! Rate limit report: who gets blocked by the rate limit, and who is fast
//! without being blocked or explicitly allowed.

use super::ReportQuery;
use crate::error::Result;
use crate::sql::{self, sql_values, IdentityColumns, Scope, TerminatingRule};

pub const NAME: &str = "rate-limit-report";

/// Result file the trend printer reads.
pub const FASTEST_BOT_USER_AGENTS: &str = "fastest-bot-user-agents-not-black-or-whitelisted";

/// Requests that passed the WAF without an explicit action, apart from
/// possible rate limit blocks.
const NO_EXPLICIT_ACTION: &str = "terminating_rule IN (VALUES 'Default_Action', 'rate-limit')";

/// User agents that are known to be fast and harmless.
const BORING_USER_AGENTS: &[&str] = &["ios-de-1.0.0"];

/// Renders the report's queries in execution order.
pub fn queries(scope: &Scope) -> Result<Vec<ReportQuery>> {
    let rate_limit = [TerminatingRule::RateLimit];

    Ok(vec![
        ReportQuery::new(
            "ips-blocked-by-rate-limit",
            "requests per IP blocked by rate limit",
            sql::requests_blocked_by(scope, IdentityColumns::Ip, &rate_limit, 1000)?,
        ),
        ReportQuery::new(
            "user-agents-blocked-by-rate-limit",
            "requests per User-Agent blocked by rate limit",
            sql::requests_blocked_by(scope, IdentityColumns::UserAgent, &rate_limit, 1000)?,
        ),
        ReportQuery::new(
            "fastest-ips-not-black-or-whitelisted",
            "fastest IPs not black- or whitelisted",
            sql::fastest_identities(
                scope,
                IdentityColumns::Ip,
                400,
                &format!("WHERE {NO_EXPLICIT_ACTION}"),
                1000,
            )?,
        ),
        ReportQuery::new(
            FASTEST_BOT_USER_AGENTS,
            "fastest Bot User-Agents not black- or whitelisted",
            // only bot traffic that is not occasional and slow
            sql::fastest_identities(
                scope,
                IdentityColumns::UserAgent,
                50,
                &format!(
                    "WHERE {NO_EXPLICIT_ACTION} AND signal_nobrowser AND user_agent NOT IN (VALUES {})",
                    sql_values(BORING_USER_AGENTS.iter().copied())
                ),
                1000,
            )?,
        ),
    ])
}
