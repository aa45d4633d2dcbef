pub mod config;
pub mod error;
pub mod exchange;
pub mod notifier;
pub mod provider;
pub mod symbols;
pub mod types;

pub use config::{AlpacaConfig, Config, NotifierConfig, ScheduleConfig, TelegramConfig};
pub use error::{Error, Result};
pub use exchange::BrokerClient;
pub use notifier::Notifier;
pub use provider::DataProvider;
pub use types::*;
