//! The measurement store: all quality controlled ISD observations in one SQLite file.

use std::{
    collections::HashMap,
    ops::RangeInclusive,
    path::{Path, PathBuf},
};

use chrono::{Duration, NaiveDateTime};
use rusqlite::{params, Connection, OpenFlags, Row};
use tracing::debug;

use super::Observation;
use crate::errors::FogToolsErr;

const SELECT_OBS: &str = "SELECT station, name, date, latitude, longitude, elevation, vis, temp, dew
                          FROM observations";

/// A database of observations.
#[derive(Debug)]
pub struct MeasurementStore {
    path: PathBuf,
    db_conn: Connection,
}

impl MeasurementStore {
    /// Create a new, empty store. An existing file at `path` is replaced.
    pub fn create(path: &Path) -> Result<Self, FogToolsErr> {
        if path.exists() {
            debug!("Replacing {}", path.display());
            std::fs::remove_file(path)?;
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db_conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
        )?;
        db_conn.execute_batch(include_str!("store/create_store.sql"))?;

        Ok(MeasurementStore {
            path: path.to_path_buf(),
            db_conn,
        })
    }

    /// Open an existing store.
    pub fn connect(path: &Path) -> Result<Self, FogToolsErr> {
        if !path.is_file() {
            return Err(FogToolsErr::MissingFile(path.to_path_buf()));
        }

        let db_conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_WRITE)?;
        Self::validate_db_structure(&db_conn)?;
        // Stores written before years were tracked lack that table.
        db_conn.execute_batch(include_str!("store/create_store.sql"))?;

        Ok(MeasurementStore {
            path: path.to_path_buf(),
            db_conn,
        })
    }

    /// The file backing this store.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn validate_db_structure(db_conn: &Connection) -> Result<(), FogToolsErr> {
        let num_tables: i64 = db_conn.query_row(
            "SELECT COUNT(name) FROM sqlite_master WHERE type='table' AND name='observations'",
            [],
            |row| row.get(0),
        )?;

        if num_tables != 1 {
            return Err(FogToolsErr::InvalidSchema);
        }

        Ok(())
    }

    /// Add observations. Returns how many were added.
    pub fn add(&mut self, obs: &[Observation]) -> Result<usize, FogToolsErr> {
        let tx = self.db_conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO observations
                    (station, name, date, latitude, longitude, elevation, vis, temp, dew)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;

            for o in obs {
                stmt.execute(params![
                    o.station,
                    o.name,
                    o.date,
                    o.latitude,
                    o.longitude,
                    o.elevation,
                    o.vis,
                    f64::from(o.temp),
                    f64::from(o.dew),
                ])?;
            }
        }
        tx.commit()?;

        Ok(obs.len())
    }

    /// Open the store at `path`, creating it if there is none.
    pub fn open_or_create(path: &Path) -> Result<Self, FogToolsErr> {
        if path.is_file() {
            Self::connect(path)
        } else {
            Self::create(path)
        }
    }

    /// Record that all observations of `years` have been added.
    pub fn add_years(&mut self, years: RangeInclusive<i32>) -> Result<(), FogToolsErr> {
        let tx = self.db_conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached("INSERT OR IGNORE INTO years (year) VALUES (?1)")?;
            for year in years {
                stmt.execute(params![year])?;
            }
        }
        tx.commit()?;

        Ok(())
    }

    /// Whether the observations of `year` have been collected.
    pub fn covers_year(&self, year: i32) -> Result<bool, FogToolsErr> {
        let n: i64 = self.db_conn.query_row(
            "SELECT COUNT(*) FROM years WHERE year = ?1",
            params![year],
            |row| row.get(0),
        )?;
        Ok(n > 0)
    }

    /// Number of observations in the store.
    pub fn len(&self) -> Result<usize, FogToolsErr> {
        let n: i64 = self
            .db_conn
            .query_row("SELECT COUNT(*) FROM observations", [], |row| row.get(0))?;
        Ok(n.max(0) as usize)
    }

    /// True if there are no observations.
    pub fn is_empty(&self) -> Result<bool, FogToolsErr> {
        Ok(self.len()? == 0)
    }

    /// All observations, ordered by station and time.
    pub fn read_all(&self) -> Result<Vec<Observation>, FogToolsErr> {
        let mut stmt = self
            .db_conn
            .prepare(&format!("{} ORDER BY station, date", SELECT_OBS))?;

        let vals: Result<Vec<Observation>, _> = stmt.query_map([], parse_row)?.collect();
        vals.map_err(FogToolsErr::from)
    }

    /// Observations between `start` and `end`, inclusive.
    pub fn observations_between(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Observation>, FogToolsErr> {
        let mut stmt = self.db_conn.prepare(&format!(
            "{} WHERE date >= ?1 AND date <= ?2 ORDER BY station, date",
            SELECT_OBS
        ))?;

        let vals: Result<Vec<Observation>, _> =
            stmt.query_map(params![start, end], parse_row)?.collect();
        vals.map_err(FogToolsErr::from)
    }

    /// For every station, the observation closest to `t` within `max_dt`.
    ///
    /// Ties go to the earlier observation. Results are ordered by station.
    pub fn nearest_per_station(
        &self,
        t: NaiveDateTime,
        max_dt: Duration,
    ) -> Result<Vec<Observation>, FogToolsErr> {
        let mut nearest: HashMap<String, Observation> = HashMap::new();

        for o in self.observations_between(t - max_dt, t + max_dt)? {
            let dt = (o.date - t).num_seconds().abs();
            match nearest.get(&o.station) {
                Some(prev) if (prev.date - t).num_seconds().abs() <= dt => {}
                _ => {
                    nearest.insert(o.station.clone(), o);
                }
            }
        }

        let mut vals: Vec<Observation> = nearest.into_values().collect();
        vals.sort_by(|a, b| a.station.cmp(&b.station));
        Ok(vals)
    }
}

fn parse_row(row: &Row) -> Result<Observation, rusqlite::Error> {
    let temp: f64 = row.get(7)?;
    let dew: f64 = row.get(8)?;

    Ok(Observation {
        station: row.get(0)?,
        name: row.get(1)?,
        date: row.get(2)?,
        latitude: row.get(3)?,
        longitude: row.get(4)?,
        elevation: row.get(5)?,
        vis: row.get(6)?,
        temp: temp as f32,
        dew: dew as f32,
    })
}

/// Load all observations from the store at `path`.
pub fn read_db(path: &Path) -> Result<Vec<Observation>, FogToolsErr> {
    MeasurementStore::connect(path)?.read_all()
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
