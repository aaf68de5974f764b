pub mod config;
pub mod engine;
pub mod ledger;
pub mod models;
pub mod performance;
pub mod report;
pub mod signals;
pub mod trading_rules;
pub mod trend;
pub mod universe;
pub mod vcp;

pub use config::{EngineConfig, EntryOrdering, SignalConfig};
pub use engine::{SimulationEngine, SimulationError};
pub use ledger::{LedgerError, PortfolioLedger};
pub use models::*;
pub use signals::SignalGenerator;
pub use universe::{Universe, UniverseError};
