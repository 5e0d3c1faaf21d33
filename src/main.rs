use anyhow::{Context, Result};
use clap::Parser;
use lineprof::cli::Cli;
use lineprof::config::ProfilerConfig;
use lineprof::filter::CallableFilter;
use lineprof::report::ReportSink;
use lineprof::trace_file;
use std::fs::File;
use std::io::{self, BufReader};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Config file values, then command-line overrides
fn load_config(args: &Cli) -> Result<ProfilerConfig> {
    let mut config = match &args.config {
        Some(path) => ProfilerConfig::from_file(path)?,
        None => ProfilerConfig::default(),
    };

    if let Some(format) = args.format {
        config.report.format = format;
    }
    if let Some(output) = &args.output {
        config.report.destination = output.clone();
    }
    if let Some(filter) = &args.filter {
        config.report.filter = Some(filter.clone());
    }
    if args.hide_idle {
        config.report.hide_idle_lines = true;
    }
    if args.no_foreign {
        config.report.include_foreign = false;
    }
    Ok(config)
}

fn main() -> Result<()> {
    let args = Cli::parse();

    init_tracing(args.debug);

    let config = load_config(&args)?;
    let options = config.to_report_options()?;
    if !matches!(options.filter, CallableFilter::All) {
        tracing::debug!("report filter: {:?}", options.filter);
    }

    let outcome = if args.trace.as_os_str() == "-" {
        trace_file::replay_reader(io::stdin().lock())?
    } else {
        let file = File::open(&args.trace)
            .with_context(|| format!("Failed to open trace {}", args.trace.display()))?;
        trace_file::replay_reader(BufReader::new(file))
            .with_context(|| format!("Failed to replay {}", args.trace.display()))?
    };

    tracing::debug!(
        "replayed {} events on {} threads",
        outcome.events,
        outcome.threads
    );

    let status = ReportSink::new(options)
        .produce_report(&outcome.store, &config.report.destination)
        .context("Failed to write report")?;

    tracing::debug!(
        "wrote {} callables to {}",
        status.callables,
        status.destination
    );

    Ok(())
}
