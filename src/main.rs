use std::process::ExitCode;

use apismoke::cli::{Cli, OutputFormat};
use apismoke::report::{render_json, render_text};
use apismoke::{CancelHandle, Config, HarnessError, Suite, run_suite};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::FmtSubscriber;

const EXIT_FAILED_TESTS: u8 = 1;
const EXIT_SETUP_ERROR: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("failed to install log subscriber");
    }

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(EXIT_FAILED_TESTS),
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(EXIT_SETUP_ERROR)
        }
    }
}

async fn run(cli: Cli) -> Result<bool, HarnessError> {
    let mut config = Config::load(cli.config.as_deref())?;
    cli.apply_to(&mut config);
    config.validate()?;

    let suite = Suite::from_file(&cli.suite)?;
    info!(suite = %cli.suite.display(), cases = suite.cases.len(), "loaded suite");

    let cancel = CancelHandle::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, cancelling remaining cases");
                cancel.cancel();
            }
        })
    };

    let report = run_suite(&config, &suite, cli.variable_overrides(), &cancel).await;
    ctrl_c.abort();
    let report = report?;

    let rendered = match config.run.output {
        OutputFormat::Text => render_text(&report),
        OutputFormat::Json => render_json(&report)?,
    };
    println!("{rendered}");

    Ok(report.summary.all_passed())
}
