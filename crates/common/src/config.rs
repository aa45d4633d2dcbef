use std::time::Duration;

use chrono_tz::Tz;
use url::Url;

use crate::{AggregationMethod, Error, ExecutionMode, Result};

const DEFAULT_STRATEGY_CONFIG_PATH: &str = "config/strategies.toml";

/// All configuration loaded from environment variables at startup.
/// Any malformed value is reported as `Error::Config` before a run starts.
#[derive(Debug, Clone)]
pub struct Config {
    // Strategy config file path
    pub strategy_config_path: String,
    /// True when `STRATEGY_CONFIG_PATH` was set explicitly, in which case a
    /// missing file is an error instead of a fallback to the built-in set.
    pub strategy_config_explicit: bool,

    // Batch
    pub lookback_bars: usize,
    pub max_concurrency: usize,
    pub run_timeout: Option<Duration>,
    pub aggregation: AggregationMethod,

    // Execution
    pub execution_mode: ExecutionMode,
    pub order_quantity: f64,
    pub paper_slippage_bps: f64,
    pub alpaca: Option<AlpacaConfig>,

    // Notification
    pub notifiers: NotifierConfig,

    // Scheduling
    pub schedule: ScheduleConfig,
    pub run_ledger_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AlpacaConfig {
    pub api_key: String,
    pub secret: String,
    pub base_url: Url,
}

/// Notification backends; every configured one is enabled.
#[derive(Debug, Clone, Default)]
pub struct NotifierConfig {
    pub discord_webhook: Option<Url>,
    pub slack_webhook: Option<Url>,
    pub telegram: Option<TelegramConfig>,
}

impl NotifierConfig {
    pub fn is_empty(&self) -> bool {
        self.discord_webhook.is_none() && self.slack_webhook.is_none() && self.telegram.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub token: String,
    pub chat_ids: Vec<i64>,
}

/// Wall-clock time of the daily run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduleConfig {
    pub hour: u32,
    pub minute: u32,
    pub timezone: Tz,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            hour: 16,
            minute: 0,
            timezone: chrono_tz::US::Eastern,
        }
    }
}

impl ScheduleConfig {
    pub fn new(hour: u32, minute: u32, timezone: Tz) -> Result<Self> {
        if hour > 23 {
            return Err(Error::Config(format!("schedule hour must be 0-23, got {hour}")));
        }
        if minute > 59 {
            return Err(Error::Config(format!("schedule minute must be 0-59, got {minute}")));
        }
        Ok(Self { hour, minute, timezone })
    }
}

impl Config {
    /// Load all configuration from environment variables.
    /// Loads `.env` if present.
    pub fn from_env() -> Result<Self> {
        // .env is optional
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let (strategy_config_path, strategy_config_explicit) = match get("STRATEGY_CONFIG_PATH") {
            Some(path) => (path, true),
            None => (DEFAULT_STRATEGY_CONFIG_PATH.to_string(), false),
        };

        let lookback_bars: usize = parse_or(get("LOOKBACK_BARS"), "LOOKBACK_BARS", 120)?;
        if lookback_bars == 0 {
            return Err(Error::Config("LOOKBACK_BARS must be at least 1".into()));
        }

        let max_concurrency: usize = parse_or(get("MAX_CONCURRENCY"), "MAX_CONCURRENCY", 4)?;
        if max_concurrency == 0 {
            return Err(Error::Config("MAX_CONCURRENCY must be at least 1".into()));
        }

        let run_timeout = match get("RUN_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = parse(&raw, "RUN_TIMEOUT_SECS")?;
                if secs == 0 {
                    return Err(Error::Config("RUN_TIMEOUT_SECS must be positive".into()));
                }
                Some(Duration::from_secs(secs))
            }
            None => None,
        };

        let aggregation = match get("AGGREGATION_METHOD").map(|m| m.to_lowercase()).as_deref() {
            None | Some("majority") => AggregationMethod::Majority,
            Some("weighted") => {
                let threshold: f64 = parse_or(get("AGGREGATION_THRESHOLD"), "AGGREGATION_THRESHOLD", 0.2)?;
                if !(0.0..1.0).contains(&threshold) {
                    return Err(Error::Config(format!(
                        "AGGREGATION_THRESHOLD must be in [0, 1), got {threshold}"
                    )));
                }
                AggregationMethod::Weighted { threshold }
            }
            Some(other) => {
                return Err(Error::Config(format!(
                    "AGGREGATION_METHOD must be 'majority' or 'weighted', got: '{other}'"
                )))
            }
        };

        let execution_mode = match get("EXECUTION_MODE").map(|m| m.to_lowercase()).as_deref() {
            None | Some("off") => ExecutionMode::Off,
            Some("paper") => ExecutionMode::Paper,
            Some("live") => ExecutionMode::Live,
            Some(other) => {
                return Err(Error::Config(format!(
                    "EXECUTION_MODE must be 'off', 'paper' or 'live', got: '{other}'"
                )))
            }
        };

        let order_quantity: f64 = parse_or(get("ORDER_QUANTITY"), "ORDER_QUANTITY", 1.0)?;
        if !(order_quantity > 0.0 && order_quantity.is_finite()) {
            return Err(Error::Config(format!("ORDER_QUANTITY must be positive, got {order_quantity}")));
        }

        let paper_slippage_bps: f64 = parse_or(get("PAPER_SLIPPAGE_BPS"), "PAPER_SLIPPAGE_BPS", 10.0)?;
        if paper_slippage_bps < 0.0 {
            return Err(Error::Config("PAPER_SLIPPAGE_BPS must not be negative".into()));
        }

        let alpaca = match (get("ALPACA_API_KEY"), get("ALPACA_SECRET")) {
            (Some(api_key), Some(secret)) => {
                let base = get("ALPACA_BASE_URL")
                    .unwrap_or_else(|| "https://paper-api.alpaca.markets".to_string());
                Some(AlpacaConfig {
                    api_key,
                    secret,
                    base_url: parse_url(&base, "ALPACA_BASE_URL")?,
                })
            }
            _ => None,
        };
        if execution_mode == ExecutionMode::Live && alpaca.is_none() {
            return Err(Error::Config(
                "EXECUTION_MODE=live requires ALPACA_API_KEY and ALPACA_SECRET".into(),
            ));
        }

        let telegram = match (get("TELEGRAM_TOKEN"), get("TELEGRAM_CHAT_IDS")) {
            (Some(token), Some(ids)) => Some(TelegramConfig {
                token,
                chat_ids: parse_chat_ids(&ids)?,
            }),
            (None, None) => None,
            _ => {
                return Err(Error::Config(
                    "TELEGRAM_TOKEN and TELEGRAM_CHAT_IDS must be set together".into(),
                ))
            }
        };

        let notifiers = NotifierConfig {
            discord_webhook: get("DISCORD_WEBHOOK_URL")
                .map(|u| parse_url(&u, "DISCORD_WEBHOOK_URL"))
                .transpose()?,
            slack_webhook: get("SLACK_WEBHOOK_URL")
                .map(|u| parse_url(&u, "SLACK_WEBHOOK_URL"))
                .transpose()?,
            telegram,
        };

        let timezone = match get("SCHEDULE_TIMEZONE") {
            Some(name) => name
                .parse::<Tz>()
                .map_err(|e| Error::Config(format!("SCHEDULE_TIMEZONE '{name}': {e}")))?,
            None => ScheduleConfig::default().timezone,
        };
        let schedule = ScheduleConfig::new(
            parse_or(get("SCHEDULE_HOUR"), "SCHEDULE_HOUR", 16)?,
            parse_or(get("SCHEDULE_MINUTE"), "SCHEDULE_MINUTE", 0)?,
            timezone,
        )?;

        Ok(Config {
            strategy_config_path,
            strategy_config_explicit,
            lookback_bars,
            max_concurrency,
            run_timeout,
            aggregation,
            execution_mode,
            order_quantity,
            paper_slippage_bps,
            alpaca,
            notifiers,
            schedule,
            run_ledger_url: get("RUN_LEDGER_URL"),
        })
    }
}

fn parse<T: std::str::FromStr>(raw: &str, key: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    raw.parse::<T>()
        .map_err(|e| Error::Config(format!("{key} has invalid value '{raw}': {e}")))
}

fn parse_or<T: std::str::FromStr>(raw: Option<String>, key: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match raw {
        Some(raw) => parse(&raw, key),
        None => Ok(default),
    }
}

fn parse_url(raw: &str, key: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| Error::Config(format!("{key} is not a valid URL: {e}")))?;
    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(Error::Config(format!("{key} must be an http(s) URL")));
    }
    Ok(url)
}

fn parse_chat_ids(raw: &str) -> Result<Vec<i64>> {
    let ids = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>().map_err(|_| {
                Error::Config(format!("TELEGRAM_CHAT_IDS contains non-numeric ID: '{s}'"))
            })
        })
        .collect::<Result<Vec<_>>>()?;
    if ids.is_empty() {
        return Err(Error::Config("TELEGRAM_CHAT_IDS is empty".into()));
    }
    Ok(ids)
}
