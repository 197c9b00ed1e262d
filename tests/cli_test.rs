//! CLI command tests with real INI, CSV and SQLite files on disk.

#![cfg(feature = "sqlite")]

mod common;

use clap::Parser;
use common::*;
use rust_decimal_macros::dec;
use slicetrader::adapters::file_config_adapter::FileConfigAdapter;
use slicetrader::adapters::sqlite_adapter::SqliteStore;
use slicetrader::cli::{self, Cli};
use slicetrader::domain::position::PositionStatus;
use slicetrader::domain::simulator::TradeEvent;
use slicetrader::domain::slice::Slice;
use slicetrader::ports::instrument_port::InstrumentRepository;
use slicetrader::ports::position_port::PositionRepository;
use std::fs;
use std::path::Path;
use std::process::ExitCode;
use tempfile::TempDir;

fn same_code(actual: ExitCode, expected: ExitCode) -> bool {
    format!("{:?}", actual) == format!("{:?}", expected)
}

fn run_cli(args: &[&str]) -> ExitCode {
    let mut argv = vec!["slicetrader"];
    argv.extend_from_slice(args);
    cli::run(Cli::parse_from(argv))
}

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// A data directory with one good file (`X`), one broken file (`BAD`)
    /// and a config importing `X,BAD,MISSING`.
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let data = dir.path().join("data");
        fs::create_dir(&data).unwrap();
        fs::write(
            data.join("X.csv"),
            csv_for(date(2024, 1, 1), &closes(199, dec!(100.00), &[dec!(101.00)])),
        )
        .unwrap();
        fs::write(
            data.join("BAD.csv"),
            "date,open,high,low,close,adj_close,volume\n2024-01-01,x,1,1,1,1,1\n",
        )
        .unwrap();
        Self { dir }
    }

    fn last_day(&self) -> chrono::NaiveDate {
        *weekdays_from(date(2024, 1, 1), 200).last().unwrap()
    }

    fn write_config(&self, simulation: &str) -> String {
        let path = self.dir.path().join("slicetrader.ini");
        let content = format!(
            "[simulation]\n{}\n\n[sqlite]\npath = {}\npool_size = 2\n\n[import]\ncsv_dir = {}\ncodes = x, BAD, missing\nexchange = NMS\ncurrency = USD\n",
            simulation,
            self.dir.path().join("slicetrader.db").display(),
            self.dir.path().join("data").display(),
        );
        fs::write(&path, content).unwrap();
        path.display().to_string()
    }

    fn default_config(&self) -> String {
        let last = self.last_day();
        self.write_config(&format!(
            "start_date = {}\nend_date = {}",
            last,
            last.succ_opt().unwrap()
        ))
    }

    fn store(&self, config_path: &str) -> SqliteStore {
        let config = FileConfigAdapter::from_file(Path::new(config_path)).unwrap();
        let store = SqliteStore::from_config(&config).unwrap();
        store.initialize_schema().unwrap();
        store
    }
}

#[test]
fn import_then_simulate_then_report() {
    let ws = Workspace::new();
    let config = ws.default_config();

    let code = run_cli(&["import", "--config", &config]);
    assert!(same_code(code, ExitCode::SUCCESS));

    let store = ws.store(&config);
    let instruments = store.list_all().unwrap();
    assert_eq!(instruments.len(), 1);
    assert_eq!(instruments[0].symbol, "X");
    assert_eq!(instruments[0].exchange, "NMS");

    let code = run_cli(&["simulate", "--config", &config]);
    assert!(same_code(code, ExitCode::SUCCESS));

    let positions = store.all_positions().unwrap();
    assert_eq!(positions.len(), 1);
    assert_eq!(positions[0].symbol, "X");
    assert_eq!(positions[0].slice, Slice::Ten);
    assert_eq!(positions[0].shares, 29);
    assert_eq!(positions[0].buy_price, dec!(101.00));
    assert_eq!(positions[0].buy_date, ws.last_day());
    assert_eq!(positions[0].status, PositionStatus::Open);

    let code = run_cli(&["report", "--config", &config]);
    assert!(same_code(code, ExitCode::SUCCESS));
}

#[test]
fn simulate_reset_clears_previous_run() {
    let ws = Workspace::new();
    let config = ws.default_config();
    assert!(same_code(run_cli(&["import", "--config", &config]), ExitCode::SUCCESS));

    assert!(same_code(run_cli(&["simulate", "--config", &config]), ExitCode::SUCCESS));
    // Replaying the day sells the open lot (101.00 > SMA(5) = 100.20) and
    // buys a fresh one.
    assert!(same_code(run_cli(&["simulate", "--config", &config]), ExitCode::SUCCESS));
    let store = ws.store(&config);
    let statuses: Vec<PositionStatus> =
        store.all_positions().unwrap().iter().map(|p| p.status).collect();
    assert_eq!(statuses, vec![PositionStatus::Closed, PositionStatus::Open]);

    assert!(same_code(
        run_cli(&["simulate", "--config", &config, "--reset"]),
        ExitCode::SUCCESS
    ));
    let slices: Vec<Slice> = store.all_positions().unwrap().iter().map(|p| p.slice).collect();
    assert_eq!(slices, vec![Slice::Ten]);
}

#[test]
fn import_fails_when_nothing_imports() {
    let ws = Workspace::new();
    fs::remove_file(ws.dir.path().join("data").join("X.csv")).unwrap();
    let config = ws.default_config();
    assert!(same_code(
        run_cli(&["import", "--config", &config]),
        ExitCode::from(5)
    ));
}

#[test]
fn validate_accepts_good_config() {
    let ws = Workspace::new();
    let config = ws.default_config();
    assert!(same_code(run_cli(&["validate", "--config", &config]), ExitCode::SUCCESS));
}

#[test]
fn validate_rejects_short_lookback() {
    let ws = Workspace::new();
    let config =
        ws.write_config("start_date = 2024-01-01\nend_date = 2024-06-01\nlookback = 50");
    assert!(same_code(
        run_cli(&["validate", "--config", &config]),
        ExitCode::from(2)
    ));
}

#[test]
fn simulate_rejects_inverted_dates() {
    let ws = Workspace::new();
    let config = ws.write_config("start_date = 2024-06-01\nend_date = 2024-01-01");
    assert!(same_code(
        run_cli(&["simulate", "--config", &config]),
        ExitCode::from(2)
    ));
}

#[test]
fn missing_config_file_is_a_config_error() {
    assert!(same_code(
        run_cli(&["validate", "--config", "/nonexistent/slicetrader.ini"]),
        ExitCode::from(2)
    ));
}

#[test]
fn position_and_event_lines() {
    let ws = Workspace::new();
    let config = ws.default_config();
    assert!(same_code(run_cli(&["import", "--config", &config]), ExitCode::SUCCESS));
    assert!(same_code(run_cli(&["simulate", "--config", &config]), ExitCode::SUCCESS));

    let position = ws.store(&config).all_positions().unwrap().remove(0);
    let line = cli::format_position(&position);
    assert!(line.contains(" O "));
    assert!(line.contains("X"));
    assert!(line.contains("10%"));
    assert!(line.contains("x29"));
    assert!(line.ends_with("-> -"));

    let event = TradeEvent::Sold {
        date: date(2024, 3, 4),
        symbol: "X".into(),
        position_id: position.id,
        slice: Slice::Ten,
        price: dec!(103.50),
    };
    assert_eq!(cli::describe_event(&event), "2024-03-04 SELL X 10% @ 103.50");
}
