//! CLI argument definitions.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `cash` | Full cash series |
//! | `live` | Current day and cash balance |
//! | `queue` | Queue size series for one station |
//! | `utilization` | Utilization series for one station |
//! | `materials` | Raw materials ordering state |
//! | `inventory` | Inventory series |
//! | `arrivals` | Job arrivals per day |
//! | `lead-times` | Lead-time series per contract |
//! | `watch` | Poll the live day and print each day change |
//!
//! # Examples
//!
//! ```bash
//! # Current day and cash, credentials from LITTLEFIELD_* variables
//! littlefield live
//!
//! # Station 2 queue, pretty-printed, credentials from a file
//! littlefield --config team.json queue --station 2 --pretty
//!
//! # One JSON line per day change, polling every 20 seconds until Ctrl-C
//! littlefield watch --interval-secs 20
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

/// Live data CLI for a Littlefield factory simulation team.
#[derive(Debug, Parser)]
#[command(
    name = "littlefield",
    author,
    version,
    about = "Query live Littlefield factory data as JSON"
)]
pub struct Cli {
    /// JSON config file. Without it, LITTLEFIELD_* environment variables
    /// are read.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    #[command(flatten)]
    Query(Query),

    /// Poll the live day and print a JSON line whenever it changes.
    ///
    /// Runs until interrupted with Ctrl-C.
    Watch(WatchArgs),
}

impl Command {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Query(query) => query.name(),
            Self::Watch(_) => "watch",
        }
    }
}

/// One-shot queries that print a single JSON document.
#[derive(Debug, Subcommand)]
pub enum Query {
    /// Full cash series.
    Cash,

    /// Current simulation day and cash balance.
    Live,

    /// Queue size series for one station.
    ///
    /// # Examples
    ///
    ///   littlefield queue --station 1
    Queue(StationArgs),

    /// Utilization series for one station.
    Utilization(StationArgs),

    /// Raw materials ordering state.
    Materials,

    /// Inventory series.
    Inventory,

    /// Job arrivals per day.
    Arrivals,

    /// Lead-time series, one per contract.
    LeadTimes,
}

impl Query {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Live => "live",
            Self::Queue(_) => "queue",
            Self::Utilization(_) => "utilization",
            Self::Materials => "materials",
            Self::Inventory => "inventory",
            Self::Arrivals => "arrivals",
            Self::LeadTimes => "lead-times",
        }
    }
}

#[derive(Debug, Args)]
pub struct StationArgs {
    /// Station ordinal (1, 2 or 3).
    #[arg(long)]
    pub station: u8,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Seconds between live day polls.
    #[arg(long, default_value_t = 20, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval_secs: u64,
}

impl WatchArgs {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn station_commands_take_a_station_flag() {
        let cli = Cli::try_parse_from(["littlefield", "queue", "--station", "2", "--pretty"])
            .expect("parses");
        assert!(cli.pretty);
        match cli.command {
            Command::Query(Query::Queue(args)) => assert_eq!(args.station, 2),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn lead_times_uses_kebab_case() {
        let cli = Cli::try_parse_from(["littlefield", "lead-times"]).expect("parses");
        assert_eq!(cli.command.name(), "lead-times");
    }

    #[test]
    fn watch_polls_every_twenty_seconds_by_default() {
        let cli = Cli::try_parse_from(["littlefield", "watch"]).expect("parses");
        match cli.command {
            Command::Watch(args) => assert_eq!(args.interval(), Duration::from_secs(20)),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn watch_rejects_a_zero_interval() {
        assert!(Cli::try_parse_from(["littlefield", "watch", "--interval-secs", "0"]).is_err());
    }
}
