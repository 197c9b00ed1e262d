//! SQLite storage adapter.
//!
//! Implements the price, position and instrument repositories over one
//! database with the tables `instrument`, `daily_price` and `position`.
//! Decimals are stored as TEXT to keep their exact scale, dates as
//! `YYYY-MM-DD` so that string order is date order.

use crate::domain::error::TraderError;
use crate::domain::instrument::{Instrument, InstrumentHistory};
use crate::domain::position::{Position, PositionStatus};
use crate::domain::price::{DailyPrice, PriceSeries};
use crate::domain::slice::Slice;
use crate::ports::config_port::ConfigPort;
use crate::ports::import_port::PriceSink;
use crate::ports::instrument_port::InstrumentRepository;
use crate::ports::position_port::PositionRepository;
use crate::ports::price_port::PriceRepository;
use chrono::NaiveDate;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;

const DATE_FORMAT: &str = "%Y-%m-%d";

const POSITION_COLUMNS: &str = "p.id, p.instrument_id, i.symbol, p.buy_price, p.sell_price,
     p.status, p.buy_date, p.sell_date, p.slice, p.shares, p.basket";

pub struct SqliteStore {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteStore {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, TraderError> {
        let db_path =
            config
                .get_string("sqlite", "path")
                .ok_or_else(|| TraderError::ConfigMissing {
                    section: "sqlite".into(),
                    key: "path".into(),
                })?;

        let pool_size = config.get_int("sqlite", "pool_size", 4).max(1) as u32;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool =
            Pool::builder()
                .max_size(pool_size)
                .build(manager)
                .map_err(|e: r2d2::Error| TraderError::Database {
                    reason: e.to_string(),
                })?;

        Ok(Self { pool })
    }

    pub fn in_memory() -> Result<Self, TraderError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e: r2d2::Error| TraderError::Database {
                reason: e.to_string(),
            })?;

        Ok(Self { pool })
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, TraderError> {
        self.pool.get().map_err(|e: r2d2::Error| TraderError::Database {
            reason: e.to_string(),
        })
    }

    pub fn initialize_schema(&self) -> Result<(), TraderError> {
        let conn = self.conn()?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS instrument (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                symbol TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                exchange TEXT NOT NULL,
                currency TEXT NOT NULL,
                first_traded TEXT
            );
            CREATE TABLE IF NOT EXISTS daily_price (
                instrument_id INTEGER NOT NULL REFERENCES instrument(id),
                date TEXT NOT NULL,
                open TEXT NOT NULL,
                high TEXT NOT NULL,
                low TEXT NOT NULL,
                close TEXT NOT NULL,
                adj_close TEXT NOT NULL,
                unadj_close TEXT NOT NULL,
                volume INTEGER NOT NULL,
                PRIMARY KEY (instrument_id, date)
            );
            CREATE INDEX IF NOT EXISTS idx_daily_price_date ON daily_price(date);
            CREATE TABLE IF NOT EXISTS position (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                instrument_id INTEGER NOT NULL REFERENCES instrument(id),
                buy_price TEXT NOT NULL,
                sell_price TEXT,
                status TEXT NOT NULL CHECK (status IN ('O', 'C')),
                buy_date TEXT NOT NULL,
                sell_date TEXT,
                slice INTEGER NOT NULL,
                shares INTEGER NOT NULL,
                basket TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_position_status ON position(status);",
        )
        .map_err(query_err)?;

        Ok(())
    }

    /// Inserts the instrument, or updates the stored row with the same
    /// symbol. Returns the stored id.
    pub fn insert_instrument(&self, instrument: &Instrument) -> Result<i64, TraderError> {
        let conn = self.conn()?;
        upsert_instrument(&conn, instrument).map_err(query_err)
    }

    /// Stores prices for `instrument_id`, replacing rows for dates already
    /// present. Returns the number of rows written.
    pub fn insert_prices(
        &self,
        instrument_id: i64,
        prices: &[DailyPrice],
    ) -> Result<usize, TraderError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;
        let written = write_prices(&tx, instrument_id, prices).map_err(query_err)?;
        tx.commit().map_err(query_err)?;
        Ok(written)
    }

    /// Deletes every stored position. Returns the number removed.
    pub fn reset_positions(&self) -> Result<usize, TraderError> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM position", []).map_err(query_err)
    }

    fn query_positions(&self, filter: &str) -> Result<Vec<Position>, TraderError> {
        let conn = self.conn()?;
        let query = format!(
            "SELECT {} FROM position p JOIN instrument i ON i.id = p.instrument_id {} ORDER BY p.id",
            POSITION_COLUMNS, filter
        );
        let mut stmt = conn.prepare(&query).map_err(query_err)?;
        let rows = stmt.query_map([], position_from_row).map_err(query_err)?;

        let mut positions = Vec::new();
        for row in rows {
            positions.push(row.map_err(query_err)?);
        }
        Ok(positions)
    }
}

fn query_err(e: rusqlite::Error) -> TraderError {
    TraderError::DatabaseQuery {
        reason: e.to_string(),
    }
}

fn conversion_err(idx: usize, ty: Type, reason: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, ty, reason.into())
}

fn decimal_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let text: String = row.get(idx)?;
    Decimal::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn optional_decimal_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Decimal>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(_) => decimal_at(row, idx).map(Some),
        None => Ok(None),
    }
}

fn date_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let text: String = row.get(idx)?;
    NaiveDate::parse_from_str(&text, DATE_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn optional_date_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(_) => date_at(row, idx).map(Some),
        None => Ok(None),
    }
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn price_from_row(row: &Row<'_>) -> rusqlite::Result<DailyPrice> {
    Ok(DailyPrice {
        instrument_id: row.get(0)?,
        date: date_at(row, 1)?,
        open: decimal_at(row, 2)?,
        high: decimal_at(row, 3)?,
        low: decimal_at(row, 4)?,
        close: decimal_at(row, 5)?,
        adjusted_close: decimal_at(row, 6)?,
        unadjusted_close: decimal_at(row, 7)?,
        volume: row.get(8)?,
    })
}

fn position_from_row(row: &Row<'_>) -> rusqlite::Result<Position> {
    let status_symbol: String = row.get(5)?;
    let status = PositionStatus::from_symbol(&status_symbol).ok_or_else(|| {
        conversion_err(5, Type::Text, format!("unknown position status {}", status_symbol))
    })?;
    let percentage: i64 = row.get(8)?;
    let slice = u32::try_from(percentage)
        .ok()
        .and_then(Slice::from_percentage)
        .ok_or_else(|| conversion_err(8, Type::Integer, format!("unknown slice {}", percentage)))?;

    Ok(Position {
        id: row.get(0)?,
        instrument_id: row.get(1)?,
        symbol: row.get(2)?,
        buy_price: decimal_at(row, 3)?,
        sell_price: optional_decimal_at(row, 4)?,
        status,
        buy_date: date_at(row, 6)?,
        sell_date: optional_date_at(row, 7)?,
        slice,
        shares: row.get(9)?,
        basket: row.get(10)?,
    })
}

fn upsert_instrument(conn: &Connection, instrument: &Instrument) -> rusqlite::Result<i64> {
    conn.query_row(
        "INSERT INTO instrument (symbol, name, exchange, currency, first_traded)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(symbol) DO UPDATE SET
             name = excluded.name,
             exchange = excluded.exchange,
             currency = excluded.currency,
             first_traded = excluded.first_traded
         RETURNING id",
        params![
            instrument.symbol,
            instrument.name,
            instrument.exchange,
            instrument.currency,
            instrument.first_traded.map(format_date),
        ],
        |row| row.get(0),
    )
}

fn write_prices(
    conn: &Connection,
    instrument_id: i64,
    prices: &[DailyPrice],
) -> rusqlite::Result<usize> {
    let mut stmt = conn.prepare_cached(
        "INSERT OR REPLACE INTO daily_price
             (instrument_id, date, open, high, low, close, adj_close, unadj_close, volume)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    )?;
    let mut written = 0;
    for price in prices {
        written += stmt.execute(params![
            instrument_id,
            format_date(price.date),
            price.open.to_string(),
            price.high.to_string(),
            price.low.to_string(),
            price.close.to_string(),
            price.adjusted_close.to_string(),
            price.unadjusted_close.to_string(),
            price.volume,
        ])?;
    }
    Ok(written)
}

impl PriceRepository for SqliteStore {
    fn get_window(
        &self,
        instrument_id: i64,
        length: usize,
        as_of: NaiveDate,
    ) -> Result<PriceSeries, TraderError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare_cached(
                "SELECT instrument_id, date, open, high, low, close, adj_close, unadj_close, volume
                 FROM daily_price
                 WHERE instrument_id = ?1 AND date <= ?2
                 ORDER BY date DESC
                 LIMIT ?3",
            )
            .map_err(query_err)?;

        let rows = stmt
            .query_map(
                params![instrument_id, format_date(as_of), length as i64],
                price_from_row,
            )
            .map_err(query_err)?;

        let mut prices = Vec::with_capacity(length);
        for row in rows {
            prices.push(row.map_err(query_err)?);
        }
        PriceSeries::new(prices)
    }

    fn has_price_on(&self, date: NaiveDate) -> Result<bool, TraderError> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM daily_price WHERE date = ?1)",
            params![format_date(date)],
            |row| row.get(0),
        )
        .map_err(query_err)
    }
}

impl PositionRepository for SqliteStore {
    fn open_position_slices(&self) -> Result<Vec<Slice>, TraderError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare_cached("SELECT slice FROM position WHERE status = 'O'")
            .map_err(query_err)?;
        let rows = stmt
            .query_map([], |row| row.get::<_, i64>(0))
            .map_err(query_err)?;

        let mut slices = Vec::new();
        for row in rows {
            let percentage = row.map_err(query_err)?;
            let slice = u32::try_from(percentage)
                .ok()
                .and_then(Slice::from_percentage)
                .ok_or_else(|| TraderError::DatabaseQuery {
                    reason: format!("unknown slice {} in position table", percentage),
                })?;
            slices.push(slice);
        }
        Ok(slices)
    }

    fn insert(&self, mut position: Position) -> Result<Position, TraderError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO position
                 (instrument_id, buy_price, sell_price, status, buy_date, sell_date, slice, shares, basket)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                position.instrument_id,
                position.buy_price.to_string(),
                position.sell_price.map(|p| p.to_string()),
                position.status.symbol(),
                format_date(position.buy_date),
                position.sell_date.map(format_date),
                position.slice.percentage(),
                position.shares,
                position.basket,
            ],
        )
        .map_err(query_err)?;
        position.id = conn.last_insert_rowid();
        Ok(position)
    }

    fn close(
        &self,
        position_id: i64,
        sell_price: Decimal,
        sell_date: NaiveDate,
    ) -> Result<(), TraderError> {
        let conn = self.conn()?;
        let updated = conn
            .execute(
                "UPDATE position SET sell_price = ?1, sell_date = ?2, status = 'C'
                 WHERE id = ?3 AND status = 'O'",
                params![sell_price.to_string(), format_date(sell_date), position_id],
            )
            .map_err(query_err)?;
        if updated == 1 {
            return Ok(());
        }

        let exists: Option<i64> = conn
            .query_row(
                "SELECT id FROM position WHERE id = ?1",
                params![position_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(query_err)?;
        match exists {
            Some(id) => Err(TraderError::PositionAlreadyClosed { id }),
            None => Err(TraderError::DatabaseQuery {
                reason: format!("no position with id {}", position_id),
            }),
        }
    }

    fn all_positions(&self) -> Result<Vec<Position>, TraderError> {
        self.query_positions("")
    }
}

impl InstrumentRepository for SqliteStore {
    fn list_all(&self) -> Result<Vec<Instrument>, TraderError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, symbol, name, exchange, currency, first_traded
                 FROM instrument ORDER BY id",
            )
            .map_err(query_err)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Instrument {
                    id: row.get(0)?,
                    symbol: row.get(1)?,
                    name: row.get(2)?,
                    exchange: row.get(3)?,
                    currency: row.get(4)?,
                    first_traded: optional_date_at(row, 5)?,
                })
            })
            .map_err(query_err)?;

        let mut instruments = Vec::new();
        for row in rows {
            instruments.push(row.map_err(query_err)?);
        }
        Ok(instruments)
    }

    fn open_positions_by_instrument(&self) -> Result<HashMap<i64, Vec<Position>>, TraderError> {
        let mut grouped: HashMap<i64, Vec<Position>> = HashMap::new();
        for position in self.query_positions("WHERE p.status = 'O'")? {
            grouped
                .entry(position.instrument_id)
                .or_default()
                .push(position);
        }
        Ok(grouped)
    }
}

impl PriceSink for SqliteStore {
    fn store_history(&self, history: &InstrumentHistory) -> Result<i64, TraderError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;
        let id = upsert_instrument(&tx, &history.instrument).map_err(query_err)?;
        write_prices(&tx, id, &history.prices).map_err(query_err)?;
        tx.commit().map_err(query_err)?;
        Ok(id)
    }
}
