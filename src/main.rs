//! `dfps` daemon entry point.
//!
//! ```text
//! dfps [-o <log_file>] [-n <notify_file>] [--stdin] <config_file>
//! ```
//!
//! Log verbosity comes from `DFPS_LOG` (e.g. `DFPS_LOG=dfps=debug`).
//! With `--stdin`, every line of standard input is parsed as a signal
//! (`input.touch 1`, `topapp.pkgName com.example.app`, ...) and published.

use std::fs::File;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::BufReader;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use dfps::{
    Actuator, AndroidActuator, Bus, ControllerConfig, RateController, Runtime, RuntimeConfig,
    SignalLog, Subscribe, Topic, feed_signals,
};

#[derive(Parser, Debug)]
#[command(name = "dfps")]
#[command(version)]
#[command(about = "Dynamic display refresh-rate controller")]
struct Cli {
    /// Rule file
    config: PathBuf,

    /// Write logs to this file instead of stderr
    #[arg(short = 'o', long = "log", value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Write every applied refresh rate to this file
    #[arg(short = 'n', long = "notify", value_name = "FILE")]
    notify: Option<PathBuf>,

    /// Publish signals read line by line from stdin
    #[arg(long)]
    stdin: bool,
}

fn init_tracing(log_file: Option<&PathBuf>) -> Result<()> {
    let filter = EnvFilter::try_from_env("DFPS_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match log_file {
        Some(path) => {
            let file = File::options()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open log file '{}'", path.display()))?;
            registry
                .with(
                    fmt::layer()
                        .with_ansi(false)
                        .with_thread_names(true)
                        .with_writer(Mutex::new(file)),
                )
                .init();
        }
        None => {
            registry
                .with(
                    fmt::layer()
                        .with_thread_names(true)
                        .with_writer(std::io::stderr),
                )
                .init();
        }
    }
    Ok(())
}

/// Publishes stdin lines as signals until EOF.
async fn feed_stdin(bus: Arc<Bus>) {
    match feed_signals(BufReader::new(tokio::io::stdin()), &bus).await {
        Ok(published) => info!(published, "stdin closed"),
        Err(e) => error!(error = %e, "stdin read failed"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_file.as_ref())?;
    info!(version = env!("CARGO_PKG_VERSION"), "dfps starting");

    let config = match ControllerConfig::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!(reason = e.as_label(), "{e}");
            return Err(e).context("failed to load config");
        }
    };

    let rt = Runtime::start(RuntimeConfig::default())?;

    let mut actuator = AndroidActuator::new();
    if let Some(path) = &cli.notify {
        actuator = actuator.with_notify(path);
    }
    let controller = RateController::new(
        config,
        rt.scheduler(),
        rt.executor(),
        Arc::new(actuator) as Arc<dyn Actuator>,
    );
    controller.start(rt.bus());

    let log = Arc::new(SignalLog::new()) as Arc<dyn Subscribe>;
    for topic in [
        Topic::InputTouch,
        Topic::InputBtn,
        Topic::InputState,
        Topic::TopApp,
        Topic::Offscreen,
    ] {
        rt.bus().subscribe(topic, Arc::clone(&log));
    }

    if cli.stdin {
        tokio::spawn(feed_stdin(Arc::clone(rt.bus())));
    }

    rt.run_until_signal().await?;
    info!("dfps stopped");
    Ok(())
}
