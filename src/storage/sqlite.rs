use crate::model::{
    AlertType, ChartAnnotation, Holding, HoldingUpdate, NewHolding, PriceAlert, StorageError,
    WatchlistEntry,
};
use crate::utils::{format_datetime, normalize_symbol, parse_datetime};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens the database file, creating tables and missing columns.
    pub fn new(db_path: &str) -> Result<Self, StorageError> {
        Self::init(Connection::open(db_path)?)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StorageError> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS watchlist (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                symbol TEXT NOT NULL UNIQUE,
                added_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS holdings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                symbol TEXT NOT NULL,
                quantity REAL NOT NULL,
                purchase_price REAL NOT NULL,
                purchase_date TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS alerts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                symbol TEXT NOT NULL,
                alert_type TEXT NOT NULL,
                target_price REAL NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS chart_annotations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                symbol TEXT NOT NULL,
                annotation_type TEXT NOT NULL,
                data TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            ",
        )?;

        // Columns added after the first schema revision.
        Self::migrate_add_column_if_missing(&conn, "holdings", "notes", "TEXT")?;

        Ok(Self { conn })
    }

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
            let alter_sql = format!("ALTER TABLE {} ADD COLUMN {} {}", table, column, column_def);
            conn.execute(&alter_sql, [])?;
        }

        Ok(())
    }

    // --- watchlist ---

    /// Adding a symbol twice keeps the original entry.
    pub fn add_to_watchlist(&self, symbol: &str) -> Result<WatchlistEntry, StorageError> {
        let symbol = normalize_symbol(symbol);
        self.conn.execute(
            "INSERT OR IGNORE INTO watchlist (symbol, added_at) VALUES (?1, ?2)",
            params![symbol, format_datetime(&Utc::now())],
        )?;

        let entry = self.conn.query_row(
            "SELECT id, symbol, added_at FROM watchlist WHERE symbol = ?1",
            params![symbol],
            Self::map_watchlist_entry,
        )?;
        Ok(entry)
    }

    pub fn remove_from_watchlist(&self, symbol: &str) -> Result<(), StorageError> {
        let affected = self.conn.execute(
            "DELETE FROM watchlist WHERE symbol = ?1",
            params![normalize_symbol(symbol)],
        )?;
        if affected == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    /// Newest first.
    pub fn get_watchlist(&self) -> Result<Vec<WatchlistEntry>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, symbol, added_at FROM watchlist ORDER BY added_at DESC, id DESC",
        )?;
        let rows = stmt.query_map([], Self::map_watchlist_entry)?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    pub fn is_in_watchlist(&self, symbol: &str) -> Result<bool, StorageError> {
        let mut stmt = self.conn.prepare("SELECT 1 FROM watchlist WHERE symbol = ?1")?;
        let mut rows = stmt.query(params![normalize_symbol(symbol)])?;
        Ok(rows.next()?.is_some())
    }

    // --- holdings ---

    pub fn add_holding(&self, holding: &NewHolding) -> Result<Holding, StorageError> {
        let purchase_date = holding.purchase_date.unwrap_or_else(Utc::now);
        self.conn.execute(
            "INSERT INTO holdings (symbol, quantity, purchase_price, purchase_date, notes)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                normalize_symbol(&holding.symbol),
                holding.quantity,
                holding.purchase_price,
                format_datetime(&purchase_date),
                holding.notes,
            ],
        )?;
        self.get_holding(self.conn.last_insert_rowid())
    }

    pub fn get_holding(&self, id: i64) -> Result<Holding, StorageError> {
        self.conn
            .query_row(
                "SELECT id, symbol, quantity, purchase_price, purchase_date, notes
                 FROM holdings WHERE id = ?1",
                params![id],
                Self::map_holding,
            )
            .optional()?
            .ok_or(StorageError::NotFound)
    }

    /// Most recent purchase first.
    pub fn get_holdings(&self) -> Result<Vec<Holding>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, symbol, quantity, purchase_price, purchase_date, notes
             FROM holdings ORDER BY purchase_date DESC, id DESC",
        )?;
        let rows = stmt.query_map([], Self::map_holding)?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    /// Only the fields present in `update` change.
    pub fn update_holding(&self, id: i64, update: &HoldingUpdate) -> Result<Holding, StorageError> {
        let affected = self.conn.execute(
            "UPDATE holdings SET
                quantity = COALESCE(?2, quantity),
                purchase_price = COALESCE(?3, purchase_price),
                notes = COALESCE(?4, notes)
             WHERE id = ?1",
            params![id, update.quantity, update.purchase_price, update.notes],
        )?;
        if affected == 0 {
            return Err(StorageError::NotFound);
        }
        self.get_holding(id)
    }

    pub fn delete_holding(&self, id: i64) -> Result<(), StorageError> {
        let affected = self
            .conn
            .execute("DELETE FROM holdings WHERE id = ?1", params![id])?;
        if affected == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    // --- alerts ---

    pub fn create_alert(
        &self,
        symbol: &str,
        alert_type: AlertType,
        target_price: f64,
    ) -> Result<PriceAlert, StorageError> {
        self.conn.execute(
            "INSERT INTO alerts (symbol, alert_type, target_price, is_active, created_at)
             VALUES (?1, ?2, ?3, 1, ?4)",
            params![
                normalize_symbol(symbol),
                alert_type.as_str(),
                target_price,
                format_datetime(&Utc::now()),
            ],
        )?;

        let alert = self.conn.query_row(
            "SELECT id, symbol, alert_type, target_price, is_active, created_at
             FROM alerts WHERE id = ?1",
            params![self.conn.last_insert_rowid()],
            Self::map_alert,
        )?;
        Ok(alert)
    }

    /// Active alerts, newest first.
    pub fn get_active_alerts(&self) -> Result<Vec<PriceAlert>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, symbol, alert_type, target_price, is_active, created_at
             FROM alerts WHERE is_active = 1 ORDER BY created_at DESC, id DESC",
        )?;
        let rows = stmt.query_map([], Self::map_alert)?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    pub fn deactivate_alert(&self, id: i64) -> Result<(), StorageError> {
        let affected = self
            .conn
            .execute("UPDATE alerts SET is_active = 0 WHERE id = ?1", params![id])?;
        if affected == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    // --- chart annotations ---

    pub fn save_chart_annotation(
        &self,
        symbol: &str,
        annotation_type: &str,
        data: &serde_json::Value,
    ) -> Result<ChartAnnotation, StorageError> {
        let created_at = Utc::now();
        let symbol = normalize_symbol(symbol);
        self.conn.execute(
            "INSERT INTO chart_annotations (symbol, annotation_type, data, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![symbol, annotation_type, data.to_string(), format_datetime(&created_at)],
        )?;

        Ok(ChartAnnotation {
            id: self.conn.last_insert_rowid(),
            symbol,
            annotation_type: annotation_type.to_string(),
            data: data.clone(),
            created_at,
        })
    }

    /// Annotations for a symbol in insertion order.
    pub fn get_chart_annotations(&self, symbol: &str) -> Result<Vec<ChartAnnotation>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, symbol, annotation_type, data, created_at
             FROM chart_annotations WHERE symbol = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![normalize_symbol(symbol)], Self::map_annotation)?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    // --- row mapping ---

    fn map_timestamp(row: &Row, idx: usize) -> Result<DateTime<Utc>, rusqlite::Error> {
        let raw: String = row.get(idx)?;
        parse_datetime(&raw).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                idx,
                Type::Text,
                Box::new(StorageError::Corrupt(format!("bad timestamp '{raw}'"))),
            )
        })
    }

    fn map_watchlist_entry(row: &Row) -> Result<WatchlistEntry, rusqlite::Error> {
        Ok(WatchlistEntry {
            id: row.get(0)?,
            symbol: row.get(1)?,
            added_at: Self::map_timestamp(row, 2)?,
        })
    }

    fn map_holding(row: &Row) -> Result<Holding, rusqlite::Error> {
        Ok(Holding {
            id: row.get(0)?,
            symbol: row.get(1)?,
            quantity: row.get(2)?,
            purchase_price: row.get(3)?,
            purchase_date: Self::map_timestamp(row, 4)?,
            notes: row.get(5)?,
        })
    }

    fn map_alert(row: &Row) -> Result<PriceAlert, rusqlite::Error> {
        let kind: String = row.get(2)?;
        let alert_type = AlertType::parse(&kind).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                2,
                Type::Text,
                Box::new(StorageError::Corrupt(format!("unknown alert type '{kind}'"))),
            )
        })?;

        Ok(PriceAlert {
            id: row.get(0)?,
            symbol: row.get(1)?,
            alert_type,
            target_price: row.get(3)?,
            is_active: row.get(4)?,
            created_at: Self::map_timestamp(row, 5)?,
        })
    }

    fn map_annotation(row: &Row) -> Result<ChartAnnotation, rusqlite::Error> {
        let raw: String = row.get(3)?;
        let data = serde_json::from_str(&raw).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e))
        })?;

        Ok(ChartAnnotation {
            id: row.get(0)?,
            symbol: row.get(1)?,
            annotation_type: row.get(2)?,
            data,
            created_at: Self::map_timestamp(row, 4)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn storage() -> SqliteStorage {
        SqliteStorage::open_in_memory().unwrap()
    }

    #[test]
    fn watchlist_is_newest_first_and_deduplicated() {
        let s = storage();
        s.add_to_watchlist("aapl").unwrap();
        s.add_to_watchlist("MSFT").unwrap();
        let again = s.add_to_watchlist("AAPL ").unwrap();

        let list = s.get_watchlist().unwrap();
        let symbols: Vec<&str> = list.iter().map(|e| e.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["MSFT", "AAPL"]);
        assert_eq!(again.id, list[1].id);
        assert!(s.is_in_watchlist("aapl").unwrap());
    }

    #[test]
    fn removing_unknown_symbol_is_not_found() {
        let s = storage();
        assert!(matches!(
            s.remove_from_watchlist("TSLA"),
            Err(StorageError::NotFound)
        ));
        s.add_to_watchlist("TSLA").unwrap();
        s.remove_from_watchlist("tsla").unwrap();
        assert!(!s.is_in_watchlist("TSLA").unwrap());
    }

    #[test]
    fn holdings_crud() {
        let s = storage();
        let older = Utc.with_ymd_and_hms(2023, 1, 10, 0, 0, 0).unwrap();
        let newer = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();

        let first = s
            .add_holding(&NewHolding {
                symbol: "aapl".into(),
                quantity: 10.0,
                purchase_price: 150.0,
                purchase_date: Some(older),
                notes: None,
            })
            .unwrap();
        s.add_holding(&NewHolding {
            symbol: "NVDA".into(),
            quantity: 2.0,
            purchase_price: 900.0,
            purchase_date: Some(newer),
            notes: Some("split pending".into()),
        })
        .unwrap();

        let holdings = s.get_holdings().unwrap();
        assert_eq!(holdings[0].symbol, "NVDA");
        assert_eq!(holdings[1].purchase_date, older);

        let updated = s
            .update_holding(
                first.id,
                &HoldingUpdate {
                    quantity: Some(12.0),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.quantity, 12.0);
        assert_eq!(updated.purchase_price, 150.0);

        s.delete_holding(first.id).unwrap();
        assert!(matches!(s.delete_holding(first.id), Err(StorageError::NotFound)));
        assert!(matches!(
            s.update_holding(first.id, &HoldingUpdate::default()),
            Err(StorageError::NotFound)
        ));
    }

    #[test]
    fn deactivated_alerts_are_hidden() {
        let s = storage();
        let a = s.create_alert("btc", AlertType::Above, 70_000.0).unwrap();
        s.create_alert("ETH", AlertType::Below, 2_500.0).unwrap();
        assert_eq!(a.symbol, "BTC");
        assert!(a.is_active);

        s.deactivate_alert(a.id).unwrap();
        let active = s.get_active_alerts().unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].alert_type, AlertType::Below);
    }

    #[test]
    fn annotations_keep_json_payload() {
        let s = storage();
        s.save_chart_annotation("AAPL", "trendline", &json!({"from": 1, "to": 2}))
            .unwrap();
        s.save_chart_annotation("MSFT", "note", &json!("earnings"))
            .unwrap();

        let notes = s.get_chart_annotations("aapl").unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].data["to"], 2);
    }

    #[test]
    fn reopening_schema_is_idempotent() {
        let s = storage();
        SqliteStorage::migrate_add_column_if_missing(&s.conn, "holdings", "notes", "TEXT").unwrap();
        SqliteStorage::init(s.conn).unwrap();
    }
}
