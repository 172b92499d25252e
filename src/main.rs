mod config;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use mailcal_core::cache::CacheLayout;
use mailcal_core::date_range::{DEFAULT_FUTURE_DAYS, DEFAULT_PAST_DAYS};
use mailcal_core::{OutputTarget, Pipeline, RunOptions};
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "mailcal")]
#[command(about = "Collect calendar invitations from a Maildir into a single iCalendar file")]
struct Cli {
    /// Maildir to scan (the directory holding cur/, new/ and tmp/)
    maildir: PathBuf,

    /// Write the calendar to this file instead of standard output ("-" for stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Ignore events that ended more than this many days ago [default: 61]
    #[arg(long, value_name = "DAYS")]
    past_days: Option<u32>,

    /// Ignore events starting more than this many days from now [default: 182]
    #[arg(long, value_name = "DAYS")]
    future_days: Option<u32>,

    /// Add a reminder 5 minutes before upcoming events that have none
    #[arg(long)]
    add_alarm: bool,

    /// Repair calendar attachments whose UTF-8 was encoded twice
    #[arg(long)]
    broken_utf8: bool,

    /// Ignore the cache and regenerate everything
    #[arg(short, long)]
    force: bool,

    /// Increase log output (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Cache directory (defaults to the platform cache dir)
    #[arg(long, value_name = "DIR")]
    cache_dir: Option<PathBuf>,

    /// Config file (defaults to ~/.config/mailcal/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let cfg = config::load_config(cli.config.as_deref())?;
    let options = build_options(cli, cfg)?;

    let mut pipeline = Pipeline::new(options)?;
    let outcome = pipeline.run()?;
    tracing::debug!(
        "Done (extracted: {}, generated: {})",
        outcome.extracted,
        outcome.generated
    );

    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .init();
}

/// Merge command line flags over config file values.
fn build_options(cli: Cli, cfg: config::Config) -> Result<RunOptions> {
    let cache_root = match cli
        .cache_dir
        .or_else(|| cfg.cache_dir.as_deref().map(config::expand_path))
    {
        Some(dir) => dir,
        None => CacheLayout::default_root()?,
    };

    let mut options = RunOptions::new(cli.maildir, cache_root);
    options.output = match cli.output {
        None => OutputTarget::Stdout,
        Some(path) if path == Path::new("-") => OutputTarget::Stdout,
        Some(path) => OutputTarget::File(
            std::path::absolute(&path)
                .with_context(|| format!("Invalid output path {}", path.display()))?,
        ),
    };
    options.past_days = cli.past_days.or(cfg.past_days).unwrap_or(DEFAULT_PAST_DAYS);
    options.future_days = cli
        .future_days
        .or(cfg.future_days)
        .unwrap_or(DEFAULT_FUTURE_DAYS);
    options.add_alarm = cli.add_alarm || cfg.add_alarm;
    options.broken_utf8 = cli.broken_utf8 || cfg.broken_utf8;
    options.force = cli.force;

    Ok(options)
}
