use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use log::info;
use sepa_engine::report::{render_backtest_report, render_screening_report};
use sepa_engine::{
    Bar, EngineConfig, EntryOrdering, SignalGenerator, SimulationEngine, Universe,
};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "sepa-engine")]
#[command(about = "Trend-template screening and walk-forward strategy simulation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Screen a universe snapshot for entry candidates
    Screen {
        /// Path to the universe snapshot, JSON mapping symbol to bar series
        #[arg(long = "data-file", value_name = "PATH")]
        data_file: PathBuf,
        /// Limit the printed ranking to the strongest N symbols
        #[arg(long, default_value_t = 20)]
        top: usize,
    },
    /// Run the walk-forward simulation over a universe snapshot
    Backtest {
        /// Path to the universe snapshot, JSON mapping symbol to bar series
        #[arg(long = "data-file", value_name = "PATH")]
        data_file: PathBuf,
        /// Starting cash
        #[arg(long)]
        initial_capital: Option<f64>,
        /// Maximum concurrent positions
        #[arg(long)]
        max_positions: Option<usize>,
        /// Fraction of capital risked per trade
        #[arg(long)]
        risk_per_trade: Option<f64>,
        /// Cap on any single position as a fraction of portfolio
        #[arg(long)]
        max_position_size: Option<f64>,
        /// Trailing window length in years
        #[arg(long)]
        years: Option<u32>,
        /// Anchor date for the trailing window (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        as_of: Option<NaiveDate>,
        /// Entry candidate ordering: universe, symbol or strength
        #[arg(long)]
        entry_ordering: Option<String>,
    },
}

fn load_universe(path: &Path) -> Result<Universe> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open data file {}", path.display()))?;
    let series: BTreeMap<String, Vec<Bar>> = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse universe snapshot {}", path.display()))?;
    let universe = Universe::new(series).context("Universe snapshot failed validation")?;
    info!("Loaded {} symbols from {}", universe.len(), path.display());
    Ok(universe)
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Screen { data_file, top } => {
            let universe = load_universe(&data_file)?;
            let generator = SignalGenerator::new(EngineConfig::default().signal_config());
            let mut signals = generator.screen_universe(&universe);
            signals.truncate(top);
            print!("{}", render_screening_report(&signals));
        }
        Commands::Backtest {
            data_file,
            initial_capital,
            max_positions,
            risk_per_trade,
            max_position_size,
            years,
            as_of,
            entry_ordering,
        } => {
            let universe = load_universe(&data_file)?;
            let mut config = EngineConfig::default();
            if let Some(capital) = initial_capital {
                config.initial_capital = capital;
            }
            if let Some(positions) = max_positions {
                config.max_positions = positions;
            }
            if let Some(risk) = risk_per_trade {
                config.risk_per_trade = risk;
            }
            if let Some(size) = max_position_size {
                config.max_position_size = size;
            }
            if let Some(years) = years {
                config.lookback_years = years;
            }
            config.as_of = as_of;
            if let Some(ordering) = entry_ordering {
                config.entry_ordering = EntryOrdering::parse(&ordering)?;
            }

            let result = SimulationEngine::new(config).run(&universe)?;
            print!("{}", render_backtest_report(&result));
        }
    }
    Ok(())
}
