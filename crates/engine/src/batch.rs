use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{timeout_at, Instant};
use tracing::{error, info, warn};

use common::{BatchResult, Error, Notifier, Result, SymbolOutcome};

use crate::executor::{ExecutionReport, OrderExecutor};
use crate::runner::SymbolRunner;
use crate::summary::format_summary;

/// Everything one invocation of the orchestrator produced.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub batch: BatchResult,
    pub executions: Vec<ExecutionReport>,
}

/// Runs the symbol runner over a batch of symbols, then hands the result to
/// the order executor and notifiers.
///
/// Holds no state between runs; calling `run_once` twice is two independent runs.
pub struct BatchOrchestrator {
    runner: Arc<SymbolRunner>,
    max_concurrency: usize,
    run_timeout: Option<Duration>,
    executor: Option<OrderExecutor>,
    notifiers: Vec<Arc<dyn Notifier>>,
}

impl BatchOrchestrator {
    pub fn new(runner: SymbolRunner) -> Self {
        Self {
            runner: Arc::new(runner),
            max_concurrency: 1,
            run_timeout: None,
            executor: None,
            notifiers: Vec::new(),
        }
    }

    /// Bound on symbols in flight at once; values below 1 are treated as 1.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn with_run_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.run_timeout = timeout;
        self
    }

    pub fn with_executor(mut self, executor: OrderExecutor) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn with_notifiers(mut self, notifiers: Vec<Arc<dyn Notifier>>) -> Self {
        self.notifiers = notifiers;
        self
    }

    /// One full run: evaluate, execute, notify.
    ///
    /// Only an empty symbol list is an error; symbol, execution and
    /// notification failures are reported inside the result.
    pub async fn run_once(&self, symbols: &[String]) -> Result<RunReport> {
        if symbols.is_empty() {
            return Err(Error::Config("no symbols provided".into()));
        }
        let started_at = Utc::now();
        info!(symbols = symbols.len(), strategies = self.runner.strategies().len(), "Run started");

        let batch = self.run_symbols(symbols).await;
        let counts = batch.counts();
        info!(
            buy = counts.buy,
            sell = counts.sell,
            hold = counts.hold,
            failed = counts.failed,
            "Run finished"
        );

        let executions = match &self.executor {
            Some(executor) => executor.execute(&batch).await,
            None => Vec::new(),
        };

        let report = RunReport { started_at, batch, executions };
        self.notify(&format_summary(&report)).await;
        Ok(report)
    }

    /// Evaluate every symbol; the result has one outcome per symbol in input order.
    pub async fn run_symbols(&self, symbols: &[String]) -> BatchResult {
        let deadline = self.run_timeout.map(|t| Instant::now() + t);
        let permits = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks = JoinSet::new();

        for (index, symbol) in symbols.iter().cloned().enumerate() {
            let runner = Arc::clone(&self.runner);
            let permits = Arc::clone(&permits);
            tasks.spawn(async move {
                let work = async {
                    let Ok(_permit) = permits.acquire_owned().await else {
                        return SymbolOutcome::failed(&symbol, "worker pool closed");
                    };
                    runner.run(&symbol).await
                };
                let outcome = match deadline {
                    Some(deadline) => match timeout_at(deadline, work).await {
                        Ok(outcome) => outcome,
                        Err(_) => {
                            warn!(symbol = %symbol, "Symbol abandoned at run timeout");
                            SymbolOutcome::failed(&symbol, Error::Timeout)
                        }
                    },
                    None => work.await,
                };
                (index, outcome)
            });
        }

        // Slots are indexed by input position so completion order doesn't matter.
        let mut slots: Vec<Option<SymbolOutcome>> = vec![None; symbols.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => slots[index] = Some(outcome),
                Err(e) => error!(error = %e, "Symbol task aborted"),
            }
        }

        let outcomes = slots
            .into_iter()
            .zip(symbols)
            .map(|(slot, symbol)| {
                slot.unwrap_or_else(|| SymbolOutcome::failed(symbol, "runner panicked"))
            })
            .collect();
        BatchResult::new(outcomes)
    }

    /// Send to every notifier concurrently; a failing backend is only logged.
    async fn notify(&self, message: &str) {
        let sends = self.notifiers.iter().map(|notifier| async move {
            match notifier.send(message).await {
                Ok(()) => info!(notifier = %notifier.name(), "Summary delivered"),
                Err(e) => error!(notifier = %notifier.name(), error = %e, "Summary delivery failed"),
            }
        });
        join_all(sends).await;
    }
}
