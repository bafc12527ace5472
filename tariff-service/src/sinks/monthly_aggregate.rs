use std::time::SystemTime;

use futures::StreamExt;
use tariff_domain::{MonthlyAggregator, MonthlyTable, Reading, Tariff};

use crate::pipeline::{Envelope, Sink, TariffError};

/// Result of draining one upload into monthly totals.
#[derive(Debug, Clone)]
pub struct AggregateOutcome {
    pub table: MonthlyTable,
    pub skipped_rows: usize,
}

/// Prices every reading and sums the prices per calendar month.
///
/// Row-level errors are logged and counted, batch-level errors abort.
pub struct MonthlyAggregateSink {
    tariff: Tariff,
    has_time_of_day: bool,
}

impl MonthlyAggregateSink {
    pub fn new(tariff: Tariff, has_time_of_day: bool) -> Self {
        Self {
            tariff,
            has_time_of_day,
        }
    }
}

#[async_trait::async_trait]
impl Sink<Reading> for MonthlyAggregateSink {
    type Output = AggregateOutcome;

    async fn run<S>(&self, mut input: S) -> Result<AggregateOutcome, TariffError>
    where
        S: futures::Stream<Item = Result<Envelope<Reading>, TariffError>> + Send + Unpin + 'static,
    {
        let mut aggregator = MonthlyAggregator::new(self.has_time_of_day);
        let mut skipped_rows = 0;
        let mut earliest: Option<SystemTime> = None;

        while let Some(item) = input.next().await {
            let env = match item {
                Ok(env) => env,
                Err(e) if e.is_row_level() => {
                    tracing::warn!(error = %e, "skipping row");
                    metrics::counter!("report_rows_skipped_total").increment(1);
                    skipped_rows += 1;
                    continue;
                }
                Err(e) => {
                    tracing::error!(error = %e, "aborting aggregation");
                    return Err(e);
                }
            };

            earliest = Some(earliest.map_or(env.received_at, |t| t.min(env.received_at)));
            aggregator.push(&self.tariff.price(env.payload));
        }

        let accepted = aggregator.len();
        let table = aggregator.finish()?;
        metrics::counter!("report_rows_aggregated_total").increment(accepted as u64);

        // Time from the first parsed row to the finished table.
        if let Some(first) = earliest {
            if let Ok(dur) = SystemTime::now().duration_since(first) {
                metrics::histogram!("report_aggregation_latency_seconds").record(dur.as_secs_f64());
            }
        }

        Ok(AggregateOutcome {
            table,
            skipped_rows,
        })
    }
}
