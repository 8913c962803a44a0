pub mod watch;

use std::path::Path;
use std::time::Instant;

use littlefield_core::{DayChangeDetector, Littlefield, LittlefieldConfig};
use serde::Serialize;
use serde_json::Value;

use crate::cli::{Cli, Command, Query};
use crate::error::CliError;
use crate::output;

/// Result of one command, ready to be rendered.
#[derive(Debug, Serialize)]
pub struct CommandOutput {
    pub command: &'static str,
    pub data: Value,
    pub meta: OutputMeta,
}

#[derive(Debug, Serialize)]
pub struct OutputMeta {
    pub latency_ms: u64,
    pub upstream_fetches: u64,
}

#[derive(Debug, Serialize)]
struct LiveData {
    day: u32,
    cash: f64,
}

pub async fn run(cli: &Cli) -> Result<(), CliError> {
    let config = load_config(cli.config.as_deref())?;
    let factory = Littlefield::connect(&config)?;
    tracing::debug!(
        command = cli.command.name(),
        team = %config.credentials.team,
        "running command"
    );

    let outcome = match &cli.command {
        Command::Query(query) => {
            let output = run_query(&factory, query).await;
            output.and_then(|output| output::render(&output, cli.pretty))
        }
        Command::Watch(args) => {
            let detector = DayChangeDetector::new();
            let stop = async {
                if let Err(error) = tokio::signal::ctrl_c().await {
                    tracing::warn!(%error, "cannot listen for Ctrl-C; stopping watch");
                }
            };
            let mut stdout = std::io::stdout().lock();
            watch::watch(&factory, &detector, args.interval(), &mut stdout, stop)
                .await
                .map(|events| tracing::info!(events, "watch stopped"))
        }
    };
    factory.shutdown();
    outcome
}

async fn run_query(factory: &Littlefield, query: &Query) -> Result<CommandOutput, CliError> {
    let started = Instant::now();
    let data = execute(factory, query).await?;

    Ok(CommandOutput {
        command: query.name(),
        data,
        meta: OutputMeta {
            latency_ms: started.elapsed().as_millis() as u64,
            upstream_fetches: factory.cache().upstream_fetches(),
        },
    })
}

pub fn load_config(path: Option<&Path>) -> Result<LittlefieldConfig, CliError> {
    let config = match path {
        Some(path) => LittlefieldConfig::from_json_file(path),
        None => LittlefieldConfig::from_env(),
    };
    config.map_err(CliError::Config)
}

async fn execute(factory: &Littlefield, query: &Query) -> Result<Value, CliError> {
    let data = match query {
        Query::Cash => serde_json::to_value(factory.cash().await?)?,
        Query::Live => {
            let point = factory.live_point().await?;
            serde_json::to_value(LiveData {
                day: point.day,
                cash: point.value,
            })?
        }
        Query::Queue(args) => {
            serde_json::to_value(factory.station(args.station)?.queue_size().await?)?
        }
        Query::Utilization(args) => {
            serde_json::to_value(factory.station(args.station)?.utilization().await?)?
        }
        Query::Materials => serde_json::to_value(factory.materials().info().await?)?,
        Query::Inventory => serde_json::to_value(factory.materials().inventory().await?)?,
        Query::Arrivals => serde_json::to_value(factory.orders().job_arrivals().await?)?,
        Query::LeadTimes => {
            serde_json::to_value(factory.completed_jobs().lead_times().await?)?
        }
    };
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn config_file_is_loaded_when_given() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"{{"credentials": {{"team": "t1", "password": "p", "institution": "uni"}}}}"#
        )
        .expect("write config");

        let config = load_config(Some(file.path())).expect("loads");
        assert_eq!(config.credentials.team, "t1");
    }

    #[test]
    fn missing_config_file_is_a_config_error() {
        let error = load_config(Some(Path::new("/nonexistent/littlefield.json")))
            .expect_err("no such file");
        assert_eq!(error.exit_code(), 10);
    }
}
