use std::process::ExitCode;

use barprobe::cli::Cli;
use barprobe::probe::{self, RunOutcome};
use clap::Parser;
use tracing::{error, info, warn};

/// A probe that timed out or aborted under `--strict`.
const EXIT_STRICT_FAILURE: u8 = 2;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let _ = rustls::crypto::ring::default_provider().install_default();
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = match cli.load_config() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            return ExitCode::FAILURE;
        }
    };

    config.init_logging();
    info!(
        instrument_id = %config.probe.instrument_id,
        bar_type = %config.probe.bar_type,
        testnet = config.client.testnet,
        "barprobe starting"
    );

    let credentials = match config.credentials() {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "Missing credentials");
            return ExitCode::FAILURE;
        }
    };

    match probe::execute(&config, credentials).await {
        Ok(report) => {
            let failed = matches!(report.outcome, RunOutcome::TimedOut | RunOutcome::Aborted { .. });
            if config.probe.strict && failed {
                warn!(outcome = ?report.outcome, "No bar received in strict mode");
                return ExitCode::from(EXIT_STRICT_FAILURE);
            }
            info!("barprobe stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %error_chain(&e), "Fatal error");
            ExitCode::FAILURE
        }
    }
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut chain = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        chain.push_str(": ");
        chain.push_str(&cause.to_string());
        source = cause.source();
    }
    chain
}
