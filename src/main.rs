//! Lungrisk: Lung disease risk inference.
//!
//! Main entry point for the command line application.
//!
//! ```text
//! lungrisk predict [--input <file>]    NDJSON records in, NDJSON results out
//! lungrisk summary [--dataset <file>]  dataset statistics as JSON
//! ```

use anyhow::{bail, Context, Result};
use std::io::{BufRead, BufWriter, IsTerminal, Write};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use lungrisk::adapters::sanitize::SanitizingMakeWriter;
use lungrisk::application::{AnalyticsService, InferenceService};
use lungrisk::config::AppConfig;

const USAGE: &str = "Usage: lungrisk predict [--input <file>] | lungrisk summary [--dataset <file>]";

enum Command {
    Predict { input: Option<PathBuf> },
    Summary { dataset: Option<PathBuf> },
}

fn parse_args() -> Result<Command> {
    let mut args = std::env::args().skip(1);
    let command = args.next().unwrap_or_else(|| "predict".to_string());

    let mut path: Option<PathBuf> = None;
    let flag = match command.as_str() {
        "predict" => "--input",
        "summary" => "--dataset",
        "-h" | "--help" => bail!(USAGE),
        other => bail!("Unknown command {other:?}\n{USAGE}"),
    };

    while let Some(arg) = args.next() {
        if arg == flag {
            let value = args
                .next()
                .with_context(|| format!("{flag} requires a value"))?;
            path = Some(PathBuf::from(value));
        } else {
            bail!("Unexpected argument {arg:?}\n{USAGE}");
        }
    }

    Ok(match command.as_str() {
        "summary" => Command::Summary { dataset: path },
        _ => Command::Predict { input: path },
    })
}

fn main() -> Result<()> {
    // Initialize logging.
    //
    // stdout carries prediction output, so logs go to stderr unless a file
    // is requested.
    let log_mode = std::env::var("LUNGRISK_LOG_MODE").unwrap_or_else(|_| "auto".to_string());
    let use_file = log_mode == "file";

    let (writer, _guard) = if use_file {
        let log_file =
            std::env::var("LUNGRISK_LOG_FILE").unwrap_or_else(|_| "lungrisk.log".to_string());

        if let Some(parent) = std::path::Path::new(&log_file).parent() {
            // Best-effort: don't fail startup just because the directory is missing.
            let _ = std::fs::create_dir_all(parent);
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .with_context(|| format!("Failed to open log file {log_file}"))?;
        tracing_appender::non_blocking(file)
    } else {
        tracing_appender::non_blocking(std::io::stderr())
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(!use_file && std::io::stderr().is_terminal())
                .with_writer(SanitizingMakeWriter::new(writer)),
        )
        .init();

    let command = parse_args()?;
    let config = AppConfig::from_env().context("Failed to load configuration")?;

    match command {
        Command::Predict { input } => run_predict(&config, input),
        Command::Summary { dataset } => run_summary(&config, dataset),
    }
}

fn run_predict(config: &AppConfig, input: Option<PathBuf>) -> Result<()> {
    let service = InferenceService::from_config(config).with_context(|| {
        format!(
            "Failed to load artifacts (model {:?}, scaler {:?})",
            config.model_path, config.scaler_path
        )
    })?;

    let reader: Box<dyn BufRead> = match &input {
        Some(path) => Box::new(std::io::BufReader::new(
            std::fs::File::open(path).with_context(|| format!("Failed to open {path:?}"))?,
        )),
        None => Box::new(std::io::stdin().lock()),
    };

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let (mut answered, mut failed) = (0usize, 0usize);

    for line in reader.lines() {
        let line = line.context("Failed to read input")?;
        if line.trim().is_empty() {
            continue;
        }

        let response = service.predict_json(&line);
        if response.get("error").is_some() {
            failed += 1;
        }
        answered += 1;

        serde_json::to_writer(&mut out, &response)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;

    tracing::info!(records = answered, failed, "Prediction run complete");
    Ok(())
}

fn run_summary(config: &AppConfig, dataset: Option<PathBuf>) -> Result<()> {
    let analytics = match dataset {
        Some(path) => AnalyticsService::load(&path)
            .with_context(|| format!("Failed to load dataset {path:?}"))?,
        None => AnalyticsService::from_config(config)
            .with_context(|| format!("Failed to load dataset {:?}", config.dataset_path))?,
    };
    let summary = analytics.summary().context("Failed to summarize dataset")?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, &summary)?;
    out.write_all(b"\n")?;
    Ok(())
}
