//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use crate::adapters::file_config_adapter::FileConfigAdapter;
#[cfg(feature = "sqlite")]
use crate::adapters::sqlite_adapter::SqliteStore;
use crate::domain::config_validation::{
    load_import_settings, load_simulation_config, validate_import_config,
    validate_simulation_config,
};
use crate::domain::error::TraderError;
use crate::domain::metrics::LedgerSummary;
use crate::domain::position::Position;
use crate::domain::simulator::{SimulationConfig, SimulationReport, Simulator, TradeEvent};
use crate::ports::config_port::ConfigPort;
use crate::ports::instrument_port::InstrumentRepository;
use crate::ports::position_port::PositionRepository;
use crate::ports::price_port::PriceRepository;

const DEFAULT_LOG_FILTER: &str = "slicetrader=info";

#[derive(Parser, Debug)]
#[command(name = "slicetrader", about = "RSI(2) slice-allocation backtester")]
pub struct Cli {
    /// Log per-instrument decisions as well as session events
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the day-by-day simulation against the stored prices
    Simulate {
        #[arg(short, long)]
        config: PathBuf,
        /// Delete all stored positions before running
        #[arg(long)]
        reset: bool,
    },
    /// Load CSV price files for the configured codes
    Import {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Print the ledger summary and stored positions
    Report {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Validate a configuration file without running anything
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// Installs the global `tracing` subscriber. `RUST_LOG` wins over the
/// built-in filter when set.
pub fn init_logging(verbose: bool) {
    let default = if verbose {
        "slicetrader=debug"
    } else {
        DEFAULT_LOG_FILTER
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Simulate { config, reset } => run_simulate(&config, reset),
        Command::Import { config } => run_import(&config),
        Command::Report { config } => run_report(&config),
        Command::Validate { config } => run_validate(&config),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = TraderError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn fail(err: TraderError) -> ExitCode {
    eprintln!("error: {err}");
    (&err).into()
}

/// Runs the simulation over the given stores and summarizes the resulting
/// ledger.
pub fn run_simulation(
    config: SimulationConfig,
    prices: &dyn PriceRepository,
    instruments: &dyn InstrumentRepository,
    positions: &dyn PositionRepository,
) -> Result<(SimulationReport, LedgerSummary), TraderError> {
    let initial_balance = config.initial_balance;
    let simulator = Simulator::new(config, prices, instruments, positions);
    let report = simulator.run()?;
    let summary = LedgerSummary::compute(&positions.all_positions()?, initial_balance);
    Ok((report, summary))
}

#[cfg(feature = "sqlite")]
fn open_store(config: &dyn ConfigPort) -> Result<SqliteStore, TraderError> {
    let store = SqliteStore::from_config(config)?;
    store.initialize_schema()?;
    Ok(store)
}

fn run_simulate(config_path: &PathBuf, reset: bool) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let sim_config = match load_simulation_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };

    #[cfg(feature = "sqlite")]
    {
        let store = match open_store(&adapter) {
            Ok(s) => s,
            Err(e) => return fail(e),
        };

        if reset {
            match store.reset_positions() {
                Ok(n) => eprintln!("Cleared {} stored positions", n),
                Err(e) => return fail(e),
            }
        }

        eprintln!(
            "Simulating {} to {} (lookback {}, balance {})",
            sim_config.start_date,
            sim_config.end_date,
            sim_config.lookback,
            sim_config.initial_balance,
        );

        let initial_balance = sim_config.initial_balance;
        let (report, summary) = match run_simulation(sim_config, &store, &store, &store) {
            Ok(r) => r,
            Err(e) => return fail(e),
        };

        eprintln!("\n=== Simulation ===");
        eprintln!("Calendar days:    {}", report.days_visited);
        eprintln!("Trading days:     {}", report.trading_days);
        eprintln!("Buys:             {}", report.buy_count());
        eprintln!("Sells:            {}", report.sell_count());
        if let Some(last) = report.events.last() {
            eprintln!("Last trade:       {}", describe_event(last));
        }
        print_summary(&summary, initial_balance);
        ExitCode::SUCCESS
    }

    #[cfg(not(feature = "sqlite"))]
    {
        let _ = (sim_config, reset);
        eprintln!("error: sqlite feature is required for simulate");
        ExitCode::from(1)
    }
}

fn run_import(config_path: &PathBuf) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let settings = match load_import_settings(&adapter) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };

    #[cfg(feature = "sqlite")]
    {
        use crate::adapters::csv_adapter::CsvPriceSource;
        use crate::domain::universe::import_universe;

        let store = match open_store(&adapter) {
            Ok(s) => s,
            Err(e) => return fail(e),
        };
        let source = CsvPriceSource::new(
            settings.csv_dir.clone(),
            &settings.exchange,
            &settings.currency,
        );

        eprintln!(
            "Importing {} codes from {}",
            settings.codes.len(),
            settings.csv_dir.display()
        );
        let report = import_universe(&source, &store, &settings.codes);

        for imported in &report.imported {
            eprintln!("  {}: {} rows [OK]", imported.symbol, imported.rows);
        }
        for skipped in &report.skipped {
            eprintln!("  {}: skipped ({})", skipped.symbol, skipped.reason);
        }
        eprintln!(
            "Imported {} of {} codes, {} rows",
            report.imported.len(),
            settings.codes.len(),
            report.total_rows()
        );

        if report.imported.is_empty() {
            eprintln!("error: no codes imported");
            return ExitCode::from(5);
        }
        if !report.is_complete() {
            eprintln!("warning: {} codes skipped", report.skipped.len());
        }
        ExitCode::SUCCESS
    }

    #[cfg(not(feature = "sqlite"))]
    {
        let _ = settings;
        eprintln!("error: sqlite feature is required for import");
        ExitCode::from(1)
    }
}

fn run_report(config_path: &PathBuf) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let initial_balance = match load_simulation_config(&adapter) {
        Ok(c) => c.initial_balance,
        Err(e) => return fail(e),
    };

    #[cfg(feature = "sqlite")]
    {
        let store = match open_store(&adapter) {
            Ok(s) => s,
            Err(e) => return fail(e),
        };
        let positions = match store.all_positions() {
            Ok(p) => p,
            Err(e) => return fail(e),
        };

        for position in &positions {
            println!("{}", format_position(position));
        }
        print_summary(&LedgerSummary::compute(&positions, initial_balance), initial_balance);
        ExitCode::SUCCESS
    }

    #[cfg(not(feature = "sqlite"))]
    {
        let _ = initial_balance;
        eprintln!("error: sqlite feature is required for report");
        ExitCode::from(1)
    }
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    if let Err(e) = validate_simulation_config(&adapter) {
        return fail(e);
    }
    eprintln!("  [simulation] OK");

    if adapter.get_string("import", "csv_dir").is_some()
        || adapter.get_string("import", "codes").is_some()
    {
        if let Err(e) = validate_import_config(&adapter) {
            return fail(e);
        }
        eprintln!("  [import] OK");
    }

    if adapter.get_string("sqlite", "path").is_none() {
        return fail(TraderError::ConfigMissing {
            section: "sqlite".into(),
            key: "path".into(),
        });
    }
    eprintln!("  [sqlite] OK");

    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}

pub fn describe_event(event: &TradeEvent) -> String {
    match event {
        TradeEvent::Bought {
            date,
            symbol,
            slice,
            shares,
            price,
            ..
        } => format!("{} BUY  {} {} x{} @ {}", date, symbol, slice, shares, price),
        TradeEvent::Sold {
            date,
            symbol,
            slice,
            price,
            ..
        } => format!("{} SELL {} {} @ {}", date, symbol, slice, price),
    }
}

pub fn format_position(position: &Position) -> String {
    let exit = match (position.sell_date, position.sell_price) {
        (Some(date), Some(price)) => format!("{} @ {}", date, price),
        _ => "-".to_string(),
    };
    format!(
        "{:>5} {} {:<6} {:>4} x{:<6} {} @ {} -> {}",
        position.id,
        position.status.symbol(),
        position.symbol,
        position.slice.to_string(),
        position.shares,
        position.buy_date,
        position.buy_price,
        exit,
    )
}

fn print_summary(summary: &LedgerSummary, initial_balance: rust_decimal::Decimal) {
    eprintln!("\n=== Ledger ===");
    eprintln!("Open positions:   {}", summary.open_positions);
    eprintln!("Allocated:        {} of {}", summary.allocation, initial_balance);
    eprintln!("Invested:         {}", summary.invested);
    eprintln!("Closed trades:    {}", summary.closed_positions);
    eprintln!("Realized P&L:     {}", summary.realized_pnl);
    eprintln!(
        "Realized return:  {:.2}%",
        summary.realized_return(initial_balance) * 100.0
    );
    eprintln!("Win Rate:         {:.1}%", summary.win_rate * 100.0);
    eprintln!("Largest win:      {}", summary.largest_win);
    eprintln!("Largest loss:     {}", summary.largest_loss);
    eprintln!("Avg holding days: {:.1}", summary.avg_holding_days);
}
