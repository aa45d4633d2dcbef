use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use common::symbols::{load_symbols_file, parse_symbols, require_symbols};
use common::{BrokerClient, Config, ExecutionMode, ScheduleConfig};
use engine::{
    format_summary, run_daily, Aggregator, AlpacaClient, BatchOrchestrator, DailySchedule,
    OrderExecutor, RunLedger, SymbolRunner,
};
use feed::YahooProvider;
use notify::build_notifiers;
use paper::PaperClient;
use strategy::{StrategyFileConfig, StrategyRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Evaluate the symbols once and exit.
    Once,
    /// Run every weekday at the scheduled time until interrupted.
    Schedule,
}

#[derive(Debug, Parser)]
#[command(name = "tradercat", version, about = "Daily multi-strategy trading signals")]
struct Cli {
    #[arg(long, value_enum, default_value_t = Mode::Once)]
    mode: Mode,

    /// Comma-separated symbols, e.g. AAPL,MSFT. Takes precedence over --file.
    #[arg(short = 's', long)]
    symbols: Option<String>,

    /// Symbols file: YAML (`symbols: [...]`) or one symbol per line.
    #[arg(short = 'f', long)]
    file: Option<String>,

    /// Hour of the scheduled run (overrides SCHEDULE_HOUR).
    #[arg(short = 'H', long)]
    hour: Option<u32>,

    /// Minute of the scheduled run (overrides SCHEDULE_MINUTE).
    #[arg(short = 'M', long)]
    minute: Option<u32>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    // ── Config ────────────────────────────────────────────────────────────────
    let mut cfg = Config::from_env()?;
    if cli.hour.is_some() || cli.minute.is_some() {
        cfg.schedule = ScheduleConfig::new(
            cli.hour.unwrap_or(cfg.schedule.hour),
            cli.minute.unwrap_or(cfg.schedule.minute),
            cfg.schedule.timezone,
        )?;
    }
    let symbols = resolve_symbols(&cli)?;
    info!(mode = ?cli.mode, symbols = symbols.len(), execution = %cfg.execution_mode, "TraderCat starting");

    // ── Strategies ────────────────────────────────────────────────────────────
    let registry = StrategyRegistry::from_config(&strategy_file(&cfg)?)?;
    if cfg.lookback_bars < registry.max_lookback() {
        warn!(
            lookback = cfg.lookback_bars,
            required = registry.max_lookback(),
            "LOOKBACK_BARS is below what some strategies need; they will be skipped"
        );
    }

    // ── Pipeline ──────────────────────────────────────────────────────────────
    let runner = SymbolRunner::new(
        Arc::new(YahooProvider::new()?),
        registry.strategies(),
        Aggregator::new(cfg.aggregation).with_weights(registry.weights()),
        cfg.lookback_bars,
    );
    let mut orchestrator = BatchOrchestrator::new(runner)
        .with_max_concurrency(cfg.max_concurrency)
        .with_run_timeout(cfg.run_timeout)
        .with_notifiers(build_notifiers(&cfg.notifiers)?);
    if let Some(executor) = order_executor(&cfg)? {
        orchestrator = orchestrator.with_executor(executor);
    }

    match cli.mode {
        Mode::Once => {
            let report = orchestrator.run_once(&symbols).await?;
            println!("{}", format_summary(&report));
        }
        Mode::Schedule => {
            let schedule = DailySchedule::new(&cfg.schedule)?;
            let ledger = match &cfg.run_ledger_url {
                Some(url) => Some(RunLedger::connect(url).await?),
                None => None,
            };
            let (orchestrator, ledger, symbols) = (&orchestrator, ledger.as_ref(), &symbols);
            run_daily(schedule, move |date| scheduled_run(orchestrator, ledger, symbols, date)).await?;
        }
    }

    info!("TraderCat stopped.");
    Ok(())
}

fn resolve_symbols(cli: &Cli) -> anyhow::Result<Vec<String>> {
    let symbols = match (&cli.symbols, &cli.file) {
        (Some(inline), _) => parse_symbols(inline),
        (None, Some(path)) => load_symbols_file(path)?,
        (None, None) => anyhow::bail!("no symbols provided: pass --symbols or --file"),
    };
    Ok(require_symbols(symbols)?)
}

/// The configured strategy file, or the built-in set when the default path is absent.
fn strategy_file(cfg: &Config) -> common::Result<StrategyFileConfig> {
    if !cfg.strategy_config_explicit && !Path::new(&cfg.strategy_config_path).exists() {
        info!(path = %cfg.strategy_config_path, "No strategy file found, using built-in strategies");
        return Ok(StrategyFileConfig::builtin());
    }
    StrategyFileConfig::load(&cfg.strategy_config_path)
}

fn order_executor(cfg: &Config) -> anyhow::Result<Option<OrderExecutor>> {
    let client: Arc<dyn BrokerClient> = match cfg.execution_mode {
        ExecutionMode::Off => return Ok(None),
        ExecutionMode::Paper => {
            info!(slippage_bps = cfg.paper_slippage_bps, "Paper execution, using PaperClient");
            Arc::new(PaperClient::new(cfg.paper_slippage_bps))
        }
        ExecutionMode::Live => {
            let alpaca = cfg
                .alpaca
                .as_ref()
                .context("live execution requires Alpaca credentials")?;
            info!(base_url = %alpaca.base_url, "Live execution, using AlpacaClient");
            Arc::new(AlpacaClient::new(alpaca)?)
        }
    };
    Ok(Some(OrderExecutor::new(client, cfg.order_quantity, cfg.execution_mode)))
}

async fn scheduled_run(
    orchestrator: &BatchOrchestrator,
    ledger: Option<&RunLedger>,
    symbols: &[String],
    date: NaiveDate,
) {
    if let Some(ledger) = ledger {
        match ledger.claim(date).await {
            Ok(true) => {}
            Ok(false) => {
                info!(date = %date, "Run already recorded for this trading date, skipping");
                return;
            }
            Err(e) => error!(date = %date, error = %e, "Run ledger unavailable, running anyway"),
        }
    }

    let report = match orchestrator.run_once(symbols).await {
        Ok(report) => report,
        Err(e) => {
            error!(date = %date, error = %e, "Scheduled run failed");
            return;
        }
    };
    if let Some(ledger) = ledger {
        if let Err(e) = ledger.complete(date, report.batch.counts()).await {
            error!(date = %date, error = %e, "Failed to record run completion");
        }
    }
}
