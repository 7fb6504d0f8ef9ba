//! # SQLite Track Store
//!
//! Track source backed by a SQLite `track_location` table.
//!
//! Rows are streamed straight from the prepared statement into the visitor, so
//! a device's track is never loaded into memory as a whole.
//!
//! ## Schema
//!
//! | Column | Type | Notes |
//! |--------|------|-------|
//! | `imei` | TEXT | Device identifier |
//! | `latitude` | REAL | Degrees |
//! | `longitude` | REAL | Degrees |
//! | `date_track` | INTEGER | Fix time, Unix milliseconds (UTC) |

use chrono::DateTime;
use log::{debug, info};
use rusqlite::{params, Connection, Row};

use crate::{DeviceId, Result, TrackPoint, TrackSource};

const SELECT_TRACK: &str = "SELECT latitude, longitude, date_track FROM track_location \
                            WHERE imei = ?1 ORDER BY date_track ASC, id ASC";

/// SQLite-backed store of raw device fixes.
pub struct SqliteTrackStore {
    db: Connection,
}

impl SqliteTrackStore {
    /// Open (or create) a store at the given path.
    pub fn open(db_path: &str) -> Result<Self> {
        let db = Connection::open(db_path)?;
        Self::init_schema(&db)?;
        info!("[SqliteTrackStore] Opened {}", db_path);
        Ok(Self { db })
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> Result<Self> {
        let db = Connection::open_in_memory()?;
        Self::init_schema(&db)?;
        Ok(Self { db })
    }

    fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS track_location (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                imei TEXT NOT NULL,
                latitude REAL NOT NULL,
                longitude REAL NOT NULL,
                date_track INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_track_location_imei_date
                ON track_location(imei, date_track);",
        )
    }

    /// Store fixes for a device in one transaction. Returns the number inserted.
    pub fn insert_points(&mut self, device: &DeviceId, points: &[TrackPoint]) -> Result<usize> {
        let tx = self.db.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO track_location (imei, latitude, longitude, date_track)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for point in points {
                stmt.execute(params![
                    device.as_str(),
                    point.position.latitude,
                    point.position.longitude,
                    point.timestamp.timestamp_millis(),
                ])?;
            }
        }
        tx.commit()?;
        debug!("[SqliteTrackStore] Inserted {} fixes for {}", points.len(), device);
        Ok(points.len())
    }

    /// Number of fixes stored for a device.
    pub fn point_count(&self, device: &DeviceId) -> Result<u64> {
        let count: i64 = self.db.query_row(
            "SELECT COUNT(*) FROM track_location WHERE imei = ?1",
            params![device.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

impl TrackSource for SqliteTrackStore {
    fn visit_points(
        &self,
        device: &DeviceId,
        visit: &mut dyn FnMut(TrackPoint) -> Result<()>,
    ) -> Result<()> {
        let mut stmt = self.db.prepare_cached(SELECT_TRACK)?;
        let mut rows = stmt.query(params![device.as_str()])?;
        while let Some(row) = rows.next()? {
            visit(track_point_from_row(row)?)?;
        }
        Ok(())
    }
}

/// Map a `(latitude, longitude, date_track)` row to a [`TrackPoint`].
fn track_point_from_row(row: &Row<'_>) -> rusqlite::Result<TrackPoint> {
    let latitude: f64 = row.get(0)?;
    let longitude: f64 = row.get(1)?;
    let millis: i64 = row.get(2)?;
    let timestamp = DateTime::from_timestamp_millis(millis)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(2, millis))?;
    Ok(TrackPoint::new(timestamp, latitude, longitude))
}
