//! SQLite persistence for the latest scrape result.
//!
//! Each collection is replaced wholesale per run (delete-all + insert in one
//! transaction). The `scrape_status` row marks that a run has been stored;
//! until it exists `latest()` returns `None`.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row, params};
use serde::Serialize;
use traffic_types::{FlitserType, SpeedCamera, TrafficJam, TrafficSnapshot};

use crate::error::StoreError;

pub type Result<T> = std::result::Result<T, StoreError>;

pub const SCHEMA_VERSION: u32 = 1;

const LAST_UPDATE_KEY: &str = "last_update";

/// Create tables if they don't exist. Idempotent.
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );
        CREATE TABLE IF NOT EXISTS traffic_jams (
            position INTEGER NOT NULL,
            id TEXT NOT NULL,
            road TEXT NOT NULL,
            direction TEXT NOT NULL,
            source_location TEXT NOT NULL,
            destination_location TEXT NOT NULL,
            route_details TEXT NOT NULL,
            cause TEXT NOT NULL,
            delay_minutes INTEGER NOT NULL,
            length_km REAL NOT NULL,
            last_updated TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_traffic_jams_road ON traffic_jams(road);
        CREATE TABLE IF NOT EXISTS speed_cameras (
            position INTEGER NOT NULL,
            id TEXT NOT NULL,
            road TEXT NOT NULL,
            location TEXT NOT NULL,
            direction TEXT NOT NULL,
            hectometer TEXT NOT NULL,
            flitser_type TEXT NOT NULL,
            is_active INTEGER NOT NULL,
            last_updated TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_speed_cameras_road ON speed_cameras(road);
        CREATE TABLE IF NOT EXISTS scrape_status (
            key TEXT PRIMARY KEY,
            timestamp TEXT NOT NULL
        );",
    )?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [SCHEMA_VERSION],
    )?;
    Ok(())
}

/// Record counts and last update time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreStatus {
    pub traffic_jams: usize,
    pub speed_cameras: usize,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Shared handle; clones use the same connection.
#[derive(Clone)]
pub struct TrafficStore {
    conn: Arc<Mutex<Connection>>,
}

impl TrafficStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    pub fn replace_traffic_jams(&self, jams: &[TrafficJam]) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM traffic_jams", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO traffic_jams (position, id, road, direction, source_location,
                    destination_location, route_details, cause, delay_minutes, length_km,
                    last_updated)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            )?;
            for (i, jam) in jams.iter().enumerate() {
                stmt.execute(params![
                    i as i64,
                    jam.id,
                    jam.road,
                    jam.direction,
                    jam.source_location,
                    jam.destination_location,
                    jam.route_details,
                    jam.cause,
                    jam.delay_minutes,
                    jam.length_km,
                    jam.last_updated,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn replace_speed_cameras(&self, cameras: &[SpeedCamera]) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM speed_cameras", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO speed_cameras (position, id, road, location, direction, hectometer,
                    flitser_type, is_active, last_updated)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for (i, cam) in cameras.iter().enumerate() {
                stmt.execute(params![
                    i as i64,
                    cam.id,
                    cam.road,
                    cam.location,
                    cam.direction,
                    cam.hectometer,
                    cam.flitser_type.as_str(),
                    cam.is_active,
                    cam.last_updated,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn mark_updated(&self, at: DateTime<Utc>) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO scrape_status (key, timestamp) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET timestamp = excluded.timestamp",
            params![LAST_UPDATE_KEY, at],
        )?;
        Ok(())
    }

    fn last_updated(conn: &Connection) -> Result<Option<DateTime<Utc>>> {
        let mut stmt = conn.prepare("SELECT timestamp FROM scrape_status WHERE key = ?1")?;
        let mut rows = stmt.query([LAST_UPDATE_KEY])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    fn jam_from_row(row: &Row<'_>) -> rusqlite::Result<TrafficJam> {
        Ok(TrafficJam {
            id: row.get(0)?,
            road: row.get(1)?,
            direction: row.get(2)?,
            source_location: row.get(3)?,
            destination_location: row.get(4)?,
            route_details: row.get(5)?,
            cause: row.get(6)?,
            delay_minutes: row.get(7)?,
            length_km: row.get(8)?,
            last_updated: row.get(9)?,
        })
    }

    fn camera_from_row(row: &Row<'_>) -> rusqlite::Result<SpeedCamera> {
        let kind: String = row.get(5)?;
        Ok(SpeedCamera {
            id: row.get(0)?,
            road: row.get(1)?,
            location: row.get(2)?,
            direction: row.get(3)?,
            hectometer: row.get(4)?,
            flitser_type: FlitserType::parse(&kind).unwrap_or_default(),
            is_active: row.get(6)?,
            last_updated: row.get(7)?,
        })
    }

    /// The stored snapshot, or `None` if no run has been stored yet.
    pub fn latest(&self) -> Result<Option<TrafficSnapshot>> {
        let conn = self.lock()?;
        let Some(last_updated) = Self::last_updated(&conn)? else {
            return Ok(None);
        };

        let mut stmt = conn.prepare(
            "SELECT id, road, direction, source_location, destination_location, route_details,
                    cause, delay_minutes, length_km, last_updated
             FROM traffic_jams ORDER BY position ASC",
        )?;
        let traffic_jams = stmt
            .query_map([], Self::jam_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = conn.prepare(
            "SELECT id, road, location, direction, hectometer, flitser_type, is_active,
                    last_updated
             FROM speed_cameras ORDER BY position ASC",
        )?;
        let speed_cameras = stmt
            .query_map([], Self::camera_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Some(TrafficSnapshot {
            traffic_jams,
            speed_cameras,
            last_updated,
        }))
    }

    pub fn status(&self) -> Result<StoreStatus> {
        let conn = self.lock()?;
        let jams: i64 = conn.query_row("SELECT COUNT(*) FROM traffic_jams", [], |r| r.get(0))?;
        let cams: i64 = conn.query_row("SELECT COUNT(*) FROM speed_cameras", [], |r| r.get(0))?;
        Ok(StoreStatus {
            traffic_jams: jams as usize,
            speed_cameras: cams as usize,
            last_updated: Self::last_updated(&conn)?,
        })
    }
}
