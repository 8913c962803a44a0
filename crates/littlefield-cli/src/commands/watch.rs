//! `watch`: polls the live day and prints one JSON line per day change.

use std::future::Future;
use std::io::Write;
use std::time::Duration;

use littlefield_core::{DayChange, DayChangeDetector, Littlefield};
use serde::Serialize;
use tokio::time::MissedTickBehavior;

use crate::error::CliError;

/// A reported day change with the cash balance read alongside it.
#[derive(Debug, Serialize)]
pub struct DayEvent {
    #[serde(flatten)]
    pub change: DayChange,
    pub cash: f64,
}

/// Polls [`Littlefield::live_point`] every `every` until `stop` resolves and
/// writes advances and regressions to `out`. Returns the number of events
/// written.
///
/// Retryable poll failures are logged and retried on the next tick; any
/// other failure ends the watch.
pub async fn watch<W, S>(
    factory: &Littlefield,
    detector: &DayChangeDetector,
    every: Duration,
    out: &mut W,
    stop: S,
) -> Result<u64, CliError>
where
    W: Write,
    S: Future<Output = ()>,
{
    tokio::pin!(stop);
    let mut ticks = tokio::time::interval(every);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut events = 0;

    loop {
        tokio::select! {
            biased;
            () = &mut stop => break,
            _ = ticks.tick() => {}
        }

        let point = match factory.live_point().await {
            Ok(point) => point,
            Err(error) if error.retryable() => {
                tracing::warn!(code = error.code(), %error, "live day poll failed");
                continue;
            }
            Err(error) => return Err(error.into()),
        };

        let change = detector.observe(point.day);
        match change {
            DayChange::First { day } => tracing::info!(day, "watching live day"),
            DayChange::Unchanged { .. } => {}
            DayChange::Advanced { .. } | DayChange::Regressed { .. } => {
                let event = DayEvent {
                    change,
                    cash: point.value,
                };
                serde_json::to_writer(&mut *out, &event)?;
                writeln!(out)?;
                out.flush()?;
                events += 1;
            }
        }
    }

    Ok(events)
}
