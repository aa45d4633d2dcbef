pub mod aggregator;
pub mod alpaca;
pub mod batch;
pub mod executor;
pub mod ledger;
pub mod runner;
pub mod schedule;
pub mod summary;

pub use aggregator::Aggregator;
pub use alpaca::AlpacaClient;
pub use batch::{BatchOrchestrator, RunReport};
pub use executor::{ExecutionReport, OrderExecutor};
pub use ledger::{RunLedger, RunRecord};
pub use runner::{RunnerState, SymbolRunner};
pub use schedule::{run_daily, DailySchedule};
pub use summary::format_summary;
