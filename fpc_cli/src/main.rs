use std::{
    fs::write,
    io::{stderr, stdout, Write},
    path::PathBuf,
};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use fpc_core::{
    calendar,
    chrono_tz::Tz,
    feed_client::{FeedSource, DEFAULT_FEED_URL},
    presale_client,
};
use tracing::level_filters::LevelFilter;

/// Extract FC St. Pauli members' ticket presales into an iCalendar file.
///
/// The calendar is written to stdout, logs are written to stderr.
#[derive(Debug, Parser)]
#[command(version)]
pub struct Arguments {
    #[command(subcommand)]
    pub command: Option<Command>,
    /// the RSS feed, a http(s) URL or a file path
    #[arg(long, env = "FPC_FEED_URL", default_value = DEFAULT_FEED_URL)]
    pub feed_url: String,
    /// the time zone of the presale dates
    #[arg(long, default_value = "Europe/Berlin")]
    pub timezone: String,
    /// the log level
    #[arg(long, value_enum, ignore_case = true, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,
    /// write the calendar to this file instead of stdout
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// print how well the feed's ticket announcements are parsed
    Check,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    #[value(alias = "critical")]
    Error,
    #[value(alias = "warning")]
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Arguments::parse();
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::from(args.log_level))
        .with_writer(stderr)
        .init();
    let timezone: Tz = args
        .timezone
        .parse()
        .map_err(|err| anyhow!("unknown timezone {}: {err}", args.timezone))?;
    let source = FeedSource::parse(&args.feed_url)?;
    match args.command {
        Some(Command::Check) => {
            let report = presale_client::check(&source, timezone).await?;
            println!("{report}");
        }
        None => {
            let ics = calendar::generate(&presale_client::get(&source, timezone).await?);
            match args.output {
                Some(path) => write(&path, ics)
                    .with_context(|| format!("failed to write {}", path.display()))?,
                None => stdout()
                    .lock()
                    .write_all(ics.as_bytes())
                    .context("failed to write calendar to stdout")?,
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use clap::Parser;
    use fpc_core::feed_client::DEFAULT_FEED_URL;

    use crate::{Arguments, Command, LogLevel};

    #[test]
    fn test_defaults() {
        let args = Arguments::try_parse_from(["fpc"]).unwrap();
        assert!(args.command.is_none());
        assert_eq!(args.timezone, "Europe/Berlin");
        assert_eq!(args.log_level, LogLevel::Info);
        assert_eq!(args.output, None);
        // the environment may override the feed
        if std::env::var_os("FPC_FEED_URL").is_none() {
            assert_eq!(args.feed_url, DEFAULT_FEED_URL);
        }
    }

    #[test]
    fn test_overrides() {
        let args = Arguments::try_parse_from([
            "fpc",
            "--feed-url",
            "test_data/rss_test.xml",
            "--log-level",
            "DEBUG",
            "--output",
            "presale.ics",
            "check",
        ])
        .unwrap();
        assert!(matches!(args.command, Some(Command::Check)));
        assert_eq!(args.feed_url, "test_data/rss_test.xml");
        assert_eq!(args.log_level, LogLevel::Debug);
        assert_eq!(args.output, Some(PathBuf::from("presale.ics")));
    }

    #[test]
    fn test_log_level_aliases() {
        let args = Arguments::try_parse_from(["fpc", "--log-level", "WARNING"]).unwrap();
        assert_eq!(args.log_level, LogLevel::Warn);
        let args = Arguments::try_parse_from(["fpc", "--log-level", "critical"]).unwrap();
        assert_eq!(args.log_level, LogLevel::Error);
        assert!(Arguments::try_parse_from(["fpc", "--log-level", "verbose"]).is_err());
    }
}
