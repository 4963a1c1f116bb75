//! waflogs - load WAF traffic reports from Athena and chart them.

use std::sync::Arc;

use chrono::Local;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use waflogs::athena::AthenaBackend;
use waflogs::cli::{Cli, Command, ReportTarget};
use waflogs::config::{Config, RunConfig};
use waflogs::error::Result;
use waflogs::query::QueryExecutor;
use waflogs::report::{RateLimitReportPrinter, ReportKind, ReportLoader};
use waflogs::sql::Scope;
use waflogs::{logging, signals};

#[tokio::main]
async fn main() {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();
    logging::init_stderr_logging();

    let cli = Cli::parse_args();
    if let Err(e) = run(cli).await {
        error!("{}: {}", e.category(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let mut config = Config::load_from_file(&config_path)?;
    config.apply_env_overrides();
    if let Some(data_dir) = &cli.data_dir {
        config.results.data_dir = data_dir.clone();
    }

    match &cli.command {
        Command::Load { report } => {
            let run = report.args().run_config(Local::now().date_naive());
            load_report(report.kind(), &config, &run).await
        }
        Command::Report {
            report: ReportTarget::RateLimit(args),
        } => {
            info!("Rate limit trend, waf = {}", args.waf);
            let printer = RateLimitReportPrinter::new(args.waf, &config.results.data_dir);
            printer
                .print(&mut std::io::stdout().lock())
                .map_err(|e| e.context("printing rate limit report"))
        }
    }
}

async fn load_report(kind: ReportKind, config: &Config, run: &RunConfig) -> Result<()> {
    info!("Loading data for the {}", kind.title());
    info!("Params: {}", run.summary());

    // Fail on a bad config before touching AWS.
    config.athena.query_context()?;

    let cancel = CancellationToken::new();
    signals::watch_signals(cancel.clone());

    let backend = AthenaBackend::connect(run.profile.as_deref(), &run.region)
        .await
        .map_err(|e| e.context("making Athena client"))?;
    let executor =
        QueryExecutor::from_config(Arc::new(backend), config, run.skip_existing, cancel)?;

    let mut loader = ReportLoader::new(
        executor,
        kind,
        Scope::new(run.waf, run.date),
        &config.results.data_dir,
    );
    loader
        .run()
        .await
        .map_err(|e| e.context(format!("running {}", kind.title())))?;

    Ok(())
}
