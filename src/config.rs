use clap::Parser;

use crate::domain::Symbol;
use crate::errors::EngineError;

/// Startup configuration, read once at process start; nothing here is
/// mutated afterward.
#[derive(Parser, Debug, Clone)]
#[command(name = "matching-engine")]
#[command(version, about = "Mock stock exchange matching engine")]
pub struct Config {
    /// Order-entry (FIX-style) listen port.
    #[arg(long, default_value_t = 5001)]
    pub fix_port: u16,

    /// Market-data listen port.
    #[arg(long, default_value_t = 5002)]
    pub market_data_port: u16,

    /// Market-data publication interval, in milliseconds.
    #[arg(long, default_value_t = 100)]
    pub publish_interval_ms: u64,

    /// Comma-separated tradeable symbol universe.
    #[arg(long, default_value = "AAPL,MSFT,GOOGL,TSLA")]
    pub symbols: String,

    /// Maximum depth levels reported per side in a snapshot.
    #[arg(long, default_value_t = 10)]
    pub max_depth: usize,

    /// Emit a trace-level log line for every match.
    #[arg(long, default_value_t = false)]
    pub verbose: bool,

    /// Worker thread-pool size for the async runtime.
    #[arg(long, default_value_t = 4)]
    pub worker_threads: usize,

    /// Heartbeat interval, in milliseconds (adapter-level keepalive).
    #[arg(long, default_value_t = 30_000)]
    pub heartbeat_interval_ms: u64,

    /// Sender identifier advertised on the order-entry boundary.
    #[arg(long, default_value = "EXCHANGE")]
    pub sender_id: String,

    /// Target identifier advertised on the order-entry boundary.
    #[arg(long, default_value = "CLIENT")]
    pub target_id: String,
}

impl Config {
    /// Parses [`Self::symbols`] into the validated universe the engine is
    /// constructed with.
    pub fn symbol_universe(&self) -> Result<Vec<Symbol>, EngineError> {
        self.symbols
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<Symbol>().map_err(EngineError::InvalidConfig))
            .collect()
    }
}
