use clap::Parser;
use miette::{IntoDiagnostic, Result};
use paysettle::application::orchestrator::PaymentOrchestrator;
use paysettle::config::OrchestratorConfig;
use paysettle::domain::outcome::{AttemptEvent, ProgressFn};
use paysettle::domain::ports::GatewayClientRef;
#[cfg(feature = "http-gateway")]
use paysettle::infrastructure::http::HttpGateway;
use paysettle::interfaces::scenario::{Scenario, ScenarioReader};
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use url::Url;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Scenario JSON file: the payment request plus scripted collaborators
    scenario: PathBuf,

    /// Orchestrator config JSON. Overrides any config embedded in the scenario.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Base URL of a live gateway. Requires the `http-gateway` feature.
    #[arg(long)]
    gateway_url: Option<Url>,

    /// Debug-level logs on stderr
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let file = File::open(&cli.scenario).into_diagnostic()?;
    let scenario = ScenarioReader::new(file).read().into_diagnostic()?;

    let config = match &cli.config {
        Some(path) => OrchestratorConfig::from_path(path).into_diagnostic()?,
        None => scenario.config.clone().unwrap_or_default(),
    };
    let gateway = gateway_for(&cli, &scenario)?;

    let mut builder =
        PaymentOrchestrator::builder(Arc::new(config), gateway, scenario.browser())
            .progress(print_events());
    if let Some(collector) = scenario.collector() {
        builder = builder.collector(collector);
    }
    if let Some(wallet) = scenario.wallet() {
        builder = builder.wallet(wallet);
    }

    let result = builder
        .build()
        .execute(scenario.request)
        .await
        .into_diagnostic()?;
    info!(outcome = ?result.outcome, "done");

    let summary = serde_json::json!({
        "result": result.outcome,
        "attempt": result.attempt,
    });
    println!("{}", serde_json::to_string(&summary).into_diagnostic()?);

    Ok(())
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("paysettle=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn gateway_for(cli: &Cli, scenario: &Scenario) -> Result<GatewayClientRef> {
    match &cli.gateway_url {
        #[cfg(feature = "http-gateway")]
        Some(url) => Ok(Arc::new(HttpGateway::new(url.clone()).into_diagnostic()?)),
        #[cfg(not(feature = "http-gateway"))]
        Some(_) => {
            eprintln!(
                "WARNING: Live gateway requested via --gateway-url, but 'http-gateway' feature is not enabled. Falling back to the scripted gateway."
            );
            Ok(Arc::new(scenario.scripted_gateway()))
        }
        None => Ok(Arc::new(scenario.scripted_gateway())),
    }
}

/// One JSON line per progress event on stdout.
fn print_events() -> ProgressFn {
    Arc::new(|event: AttemptEvent| match serde_json::to_string(&event) {
        Ok(line) => println!("{line}"),
        Err(err) => warn!(error = %err, "could not encode progress event"),
    })
}
