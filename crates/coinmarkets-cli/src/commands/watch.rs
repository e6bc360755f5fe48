use serde::Serialize;

use coinmarkets_core::{
    AdapterOutcome, AdapterReport, CancellationToken, CycleReport, MarketEngine, UtcDateTime,
};

use crate::cli::WatchArgs;
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct CycleView {
    generation: u64,
    published: bool,
    empty_cycle: bool,
    succeeded: usize,
    failed: usize,
    records: usize,
    completed_at: UtcDateTime,
    adapters: Vec<AdapterView>,
}

#[derive(Debug, Serialize)]
struct AdapterView {
    exchange: String,
    outcome: &'static str,
    elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    records: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

impl From<&CycleReport> for CycleView {
    fn from(report: &CycleReport) -> Self {
        Self {
            generation: report.generation,
            published: report.published,
            empty_cycle: report.is_empty_cycle(),
            succeeded: report.succeeded,
            failed: report.failed,
            records: report.record_count,
            completed_at: report.completed_at,
            adapters: report.adapters.iter().map(AdapterView::from).collect(),
        }
    }
}

impl From<&AdapterReport> for AdapterView {
    fn from(report: &AdapterReport) -> Self {
        let (records, code, detail) = match &report.outcome {
            AdapterOutcome::Succeeded { records } => (Some(*records), None, None),
            AdapterOutcome::Failed { error } => (None, Some(error.code()), Some(error.message().to_owned())),
            AdapterOutcome::TimedOut { after } => {
                (None, None, Some(format!("no answer within {}ms", after.as_millis())))
            }
            AdapterOutcome::Panicked { message } => (None, None, Some(message.clone())),
        };

        Self {
            exchange: report.exchange.to_string(),
            outcome: report.outcome.label(),
            elapsed_ms: report.elapsed.as_millis() as u64,
            records,
            code,
            detail,
        }
    }
}

/// Prints one JSON line per cycle until `--cycles` is reached or Ctrl-C.
pub async fn run(args: &WatchArgs, engine: &MarketEngine, pretty: bool) -> Result<(), CliError> {
    if args.cycles == Some(0) {
        return Ok(());
    }

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    let scheduler = engine.scheduler();
    let interval = scheduler.config().interval;
    let mut completed = 0_u32;

    while let Some(report) = scheduler.run_cycle(&cancel).await {
        output::render(&CycleView::from(&report), pretty)?;
        completed += 1;
        if args.cycles.is_some_and(|limit| completed >= limit) {
            break;
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }

    tracing::info!(cycles = completed, "watch finished");
    Ok(())
}
