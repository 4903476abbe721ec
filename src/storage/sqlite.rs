use crate::model::{DrawdownPeriod, StorageError, SummaryStats, SymbolStats};
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, Row};

pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens the database file and creates the schema if needed.
    pub fn new(db_path: &str) -> Result<Self, StorageError> {
        Self::init(Connection::open(db_path)?)
    }

    pub fn in_memory() -> Result<Self, StorageError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StorageError> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS periods (
                symbol TEXT NOT NULL,
                start_at TEXT NOT NULL,
                end_at TEXT NOT NULL,
                ongoing INTEGER NOT NULL,
                max_drawdown REAL NOT NULL,
                trough TEXT NOT NULL,
                peak_price REAL NOT NULL,
                PRIMARY KEY (symbol, start_at)
            );

            CREATE TABLE IF NOT EXISTS symbol_stats (
                symbol TEXT PRIMARY KEY,
                period_count INTEGER NOT NULL,
                deepest_drawdown REAL NOT NULL,
                ongoing INTEGER NOT NULL,
                current_drawdown REAL NOT NULL,
                current_ath REAL NOT NULL,
                last_updated TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS notified (
                symbol TEXT NOT NULL,
                start_at TEXT NOT NULL,
                notified_at TEXT NOT NULL,
                PRIMARY KEY (symbol, start_at)
            );
            ",
        )?;

        // Columns added after the first release of the schema.
        Self::migrate_add_column_if_missing(&conn, "symbol_stats", "avg_duration_secs", "INTEGER")?;
        Self::migrate_add_column_if_missing(&conn, "symbol_stats", "longest_duration_secs", "INTEGER")?;
        Self::migrate_add_column_if_missing(&conn, "symbol_stats", "deepest_start", "TEXT")?;

        Ok(Self { conn })
    }

    /// Adds `column` to `table` unless it already exists.
    fn migrate_add_column_if_missing(
        conn: &Connection,
        table: &str,
        column: &str,
        column_def: &str,
    ) -> Result<(), StorageError> {
        let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
        let existing_columns: Vec<String> = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<Result<_, _>>()?;

        if !existing_columns.iter().any(|c| c == column) {
            conn.execute(&format!("ALTER TABLE {} ADD COLUMN {} {}", table, column, column_def), [])?;
        }
        Ok(())
    }

    /// Replaces every stored period of `symbol` with `periods` in one transaction.
    pub fn replace_periods(&mut self, symbol: &str, periods: &[DrawdownPeriod]) -> Result<(), StorageError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM periods WHERE symbol = ?1", params![symbol])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO periods (symbol, start_at, end_at, ongoing, max_drawdown, trough, peak_price)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for period in periods {
                stmt.execute(params![
                    symbol,
                    period.start.to_rfc3339(),
                    period.end.to_rfc3339(),
                    period.ongoing,
                    period.max_drawdown,
                    period.trough.to_rfc3339(),
                    period.peak_price,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Stored periods of `symbol`, oldest first.
    pub fn get_periods(&self, symbol: &str) -> Result<Vec<DrawdownPeriod>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT start_at, end_at, ongoing, max_drawdown, trough, peak_price
             FROM periods WHERE symbol = ?1 ORDER BY start_at ASC",
        )?;

        let rows = stmt.query_map(params![symbol], Self::map_period)?;
        let mut periods = Vec::new();
        for period in rows {
            let period = period?;
            Self::check_period(symbol, &period)?;
            periods.push(period);
        }
        Ok(periods)
    }

    fn check_period(symbol: &str, period: &DrawdownPeriod) -> Result<(), StorageError> {
        if period.end < period.start || !period.contains(period.trough) {
            return Err(StorageError::Corrupt(format!(
                "{} period {} has end {} / trough {} outside its span",
                symbol, period.start, period.end, period.trough
            )));
        }
        if !(period.max_drawdown <= 0.0 && period.max_drawdown > -1.0) {
            return Err(StorageError::Corrupt(format!(
                "{} period {} has max_drawdown {}",
                symbol, period.start, period.max_drawdown
            )));
        }
        Ok(())
    }

    pub fn update_stats(&self, symbol: &str, stats: &SummaryStats) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO symbol_stats
                (symbol, period_count, deepest_drawdown, ongoing, current_drawdown, current_ath, last_updated,
                 avg_duration_secs, longest_duration_secs, deepest_start)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                symbol,
                stats.period_count as i64,
                stats.deepest_drawdown,
                stats.ongoing,
                stats.current_drawdown,
                stats.current_ath,
                Utc::now().to_rfc3339(),
                stats.average_duration.map(|d| d.num_seconds()),
                stats.longest_duration.map(|d| d.num_seconds()),
                stats.deepest_start.map(|t| t.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    pub fn get_stats(&self, symbol: &str) -> Result<Option<SymbolStats>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT symbol, period_count, deepest_drawdown, ongoing, current_drawdown, current_ath, last_updated,
                    avg_duration_secs, longest_duration_secs, deepest_start
             FROM symbol_stats WHERE symbol = ?1",
        )?;

        let mut rows = stmt.query(params![symbol])?;
        match rows.next()? {
            Some(row) => Ok(Some(Self::map_stats(row)?)),
            None => Ok(None),
        }
    }

    /// Every symbol's latest stats, alphabetically.
    pub fn get_all_stats(&self) -> Result<Vec<SymbolStats>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT symbol, period_count, deepest_drawdown, ongoing, current_drawdown, current_ath, last_updated,
                    avg_duration_secs, longest_duration_secs, deepest_start
             FROM symbol_stats ORDER BY symbol ASC",
        )?;

        let rows = stmt.query_map([], Self::map_stats)?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    pub fn is_notified(&self, symbol: &str, start: DateTime<Utc>) -> Result<bool, StorageError> {
        let mut stmt = self
            .conn
            .prepare("SELECT 1 FROM notified WHERE symbol = ?1 AND start_at = ?2")?;
        let mut rows = stmt.query(params![symbol, start.to_rfc3339()])?;
        Ok(rows.next()?.is_some())
    }

    pub fn mark_notified(&self, symbol: &str, start: DateTime<Utc>) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO notified (symbol, start_at, notified_at) VALUES (?1, ?2, datetime('now'))",
            params![symbol, start.to_rfc3339()],
        )?;
        Ok(())
    }

    fn parse_ts(row: &Row, idx: usize) -> Result<DateTime<Utc>, rusqlite::Error> {
        let raw: String = row.get(idx)?;
        raw.parse().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
    }

    fn parse_opt_ts(row: &Row, idx: usize) -> Result<Option<DateTime<Utc>>, rusqlite::Error> {
        let raw: Option<String> = row.get(idx)?;
        raw.map(|r| {
            r.parse().map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
            })
        })
        .transpose()
    }

    fn map_period(row: &Row) -> Result<DrawdownPeriod, rusqlite::Error> {
        Ok(DrawdownPeriod {
            start: Self::parse_ts(row, 0)?,
            end: Self::parse_ts(row, 1)?,
            ongoing: row.get(2)?,
            max_drawdown: row.get(3)?,
            trough: Self::parse_ts(row, 4)?,
            peak_price: row.get(5)?,
        })
    }

    fn map_stats(row: &Row) -> Result<SymbolStats, rusqlite::Error> {
        let period_count: i64 = row.get(1)?;
        Ok(SymbolStats {
            symbol: row.get(0)?,
            period_count: period_count.max(0) as usize,
            deepest_drawdown: row.get(2)?,
            ongoing: row.get(3)?,
            current_drawdown: row.get(4)?,
            current_ath: row.get(5)?,
            last_updated: Self::parse_ts(row, 6)?,
            average_duration: row.get::<_, Option<i64>>(7)?.map(Duration::seconds),
            longest_duration: row.get::<_, Option<i64>>(8)?.map(Duration::seconds),
            deepest_start: Self::parse_opt_ts(row, 9)?,
        })
    }
}
