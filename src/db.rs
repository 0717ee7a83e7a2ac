//! Database of fog cases.
//!
//! A case is a time for which ground observations are matched with the satellite scan, the NWP
//! forecast, the NWCSAF cloud microphysics and the terrain around each station. Every input is a
//! [`Source`] that knows where its files for a time are, whether they are there and how to make
//! them. [`FogDB::extend`] ensures all sources for a case and adds one [`FogRecord`] per ground
//! station; [`FogDB::store`] writes the cases to an SQLite file.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use chrono::NaiveDateTime;
use metfor::Celsius;
use rusqlite::{params, Connection, OpenFlags, Row};
use tracing::{info, warn, Level};

use crate::{
    abi::AbiDownloader,
    cache,
    config::Config,
    dem::DemDownloader,
    errors::FogToolsErr,
    isd::{default_stations, IsdClient, Observation},
    logging::LogToTimeFile,
    transport::Fetch,
};

mod ground;
mod nwcsaf;
mod nwp;
mod sat;

pub use ground::{DemSource, GroundSource, MAX_OBSERVATION_OFFSET_MINUTES};
pub use nwcsaf::{link_into, NwcsafSource};
pub use nwp::{run_for, IconSource};
pub use sat::AbiSource;

/// Common interface of everything the fog database is built from.
pub trait Source {
    /// Files holding the data for time `t`.
    fn get_path(&self, t: NaiveDateTime) -> Result<Vec<PathBuf>, FogToolsErr>;

    /// Whether the data for `t` are available locally.
    fn exists(&self, t: NaiveDateTime) -> Result<bool, FogToolsErr> {
        Ok(self.get_path(t)?.iter().all(|p| p.exists()))
    }

    /// Produce the data for `t`, assuming whatever it depends on is in place.
    fn store(&mut self, t: NaiveDateTime) -> Result<(), FogToolsErr>;

    /// Make sure whatever this source is computed from is available.
    fn ensure_deps(&mut self, _t: NaiveDateTime) -> Result<(), FogToolsErr> {
        Ok(())
    }

    /// Make the data for `t` available, producing it only if it does not exist yet.
    fn ensure(&mut self, t: NaiveDateTime) -> Result<(), FogToolsErr> {
        if !self.exists(t)? {
            self.ensure_deps(t)?;
            self.store(t)?;
        }
        Ok(())
    }
}

/// One ground station in one case.
#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq)]
pub struct FogRecord {
    pub station: String,
    pub name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub elevation: Option<f64>,
    /// When the observation was made, within half an hour of the case
    pub obs_time: NaiveDateTime,
    /// Visibility in metres
    pub vis: u32,
    /// Temperature in °C
    pub temp: f32,
    /// Dew point in °C
    pub dew: f32,
    /// Relative humidity as a fraction
    pub rh: Option<f64>,
    /// Elevation tile containing the station
    pub dem_file: Option<PathBuf>,
}

impl FogRecord {
    fn new(obs: Observation, dem_file: Option<PathBuf>) -> Self {
        let rh = metfor::rh(Celsius(f64::from(obs.temp)), Celsius(f64::from(obs.dew)));

        FogRecord {
            station: obs.station,
            name: obs.name,
            latitude: obs.latitude,
            longitude: obs.longitude,
            elevation: obs.elevation,
            obs_time: obs.date,
            vis: obs.vis,
            temp: obs.temp,
            dew: obs.dew,
            rh,
            dem_file,
        }
    }
}

/// Everything collected for one time.
#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq)]
pub struct FogCase {
    pub time: NaiveDateTime,
    /// ABI file per channel
    pub sat_files: BTreeMap<u8, PathBuf>,
    /// ICON forecast step closest to the case
    pub nwp_file: PathBuf,
    /// NWCSAF cloud microphysics
    pub cmic_file: PathBuf,
    pub records: Vec<FogRecord>,
}

/// Builds the database of fog cases.
pub struct FogDB<'a, F: Fetch + ?Sized> {
    ground: GroundSource<'a, F>,
    dem: DemSource<'a, F>,
    nwcsaf: NwcsafSource<'a, F>,
    log_dir: PathBuf,
    stderr_level: Level,
    cases: Vec<FogCase>,
}

impl<'a, F: Fetch + ?Sized> FogDB<'a, F> {
    /// Set up all sources with their files below `cache_dir`.
    ///
    /// Fails if the NWCSAF installation is not known.
    pub fn new(fetch: &'a F, config: &Config, cache_dir: &Path) -> Result<Self, FogToolsErr> {
        let safnwc = config.safnwc()?;

        let abi = AbiSource::new(AbiDownloader::new(
            fetch,
            &config.goes_bucket_url,
            cache_dir,
        ));
        let icon = IconSource::new(&cache_dir.join("icon"), &config.sky_command);
        let nwcsaf = NwcsafSource::new(
            &safnwc.join("export").join("CMIC"),
            safnwc,
            abi,
            icon,
            config,
        );

        let ground = GroundSource::new(
            IsdClient::new(fetch, &config.isd_bucket_url, cache_dir),
            &cache::store_location(cache_dir),
            default_stations(cache_dir)?,
        );
        let dem = DemSource::new(
            DemDownloader::new(fetch, &config.dem_base_url),
            &cache_dir.join("dem"),
        );

        Ok(Self::from_sources(ground, dem, nwcsaf, &config.log_dir()?))
    }

    /// Assemble a database from already configured sources.
    pub fn from_sources(
        ground: GroundSource<'a, F>,
        dem: DemSource<'a, F>,
        nwcsaf: NwcsafSource<'a, F>,
        log_dir: &Path,
    ) -> Self {
        FogDB {
            ground,
            dem,
            nwcsaf,
            log_dir: log_dir.to_path_buf(),
            stderr_level: Level::INFO,
            cases: vec![],
        }
    }

    /// Level at or above which case logs are also written to stderr.
    pub fn set_stderr_level(&mut self, level: Level) {
        self.stderr_level = level;
    }

    /// The cases collected so far.
    pub fn cases(&self) -> &[FogCase] {
        &self.cases
    }

    /// Add the case at `t`, replacing an earlier one for the same time.
    ///
    /// Everything logged meanwhile also goes to a log file for the case. Returns the number of
    /// ground stations in the case.
    pub fn extend(&mut self, t: NaiveDateTime) -> Result<usize, FogToolsErr> {
        let log = LogToTimeFile::new(&self.log_dir, t, self.stderr_level)?;
        info!("Extending fog database with {}", t);
        info!("Logging to {}", log.logfile().display());

        self.ground.ensure(t)?;
        let obs = self.ground.extract(t)?;
        if obs.is_empty() {
            warn!(
                "No ground observations within {} minutes of {}",
                MAX_OBSERVATION_OFFSET_MINUTES, t
            );
            return Ok(0);
        }

        self.dem
            .cover(obs.iter().filter_map(|o| Some((o.latitude?, o.longitude?))));
        self.dem.ensure(t)?;
        self.nwcsaf.ensure(t)?;

        let abi = self.nwcsaf.abi_mut();
        abi.ensure(t)?;
        let sat_files = abi.select_scan(t)?;

        let records: Vec<FogRecord> = obs
            .into_iter()
            .map(|o| {
                let dem_file = match (o.latitude, o.longitude) {
                    (Some(lat), Some(lon)) => self.dem.file_for_point(lat, lon),
                    _ => None,
                };
                FogRecord::new(o, dem_file)
            })
            .collect();
        let n = records.len();

        self.cases.retain(|case| case.time != t);
        self.cases.push(FogCase {
            time: t,
            sat_files,
            nwp_file: self.nwcsaf.icon().step_file(t),
            cmic_file: self.nwcsaf.output_file(t),
            records,
        });

        info!("Added {} stations for {}", n, t);
        Ok(n)
    }

    /// Write all cases to the SQLite file at `path`, creating it if needed.
    ///
    /// Cases already in the file are replaced. Returns the number of records written.
    pub fn store(&self, path: &Path) -> Result<usize, FogToolsErr> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut db_conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
        )?;
        db_conn.execute_batch(include_str!("db/create_fogdb.sql"))?;

        let tx = db_conn.transaction()?;
        let mut written = 0;
        for case in &self.cases {
            tx.execute("DELETE FROM records WHERE time = ?1", params![case.time])?;
            tx.execute("DELETE FROM sat_files WHERE time = ?1", params![case.time])?;
            tx.execute(
                include_str!("db/add_case.sql"),
                params![
                    case.time,
                    path_str(&case.nwp_file),
                    path_str(&case.cmic_file)
                ],
            )?;

            let mut stmt = tx
                .prepare_cached("INSERT INTO sat_files (time, channel, path) VALUES (?1, ?2, ?3)")?;
            for (channel, sat_file) in &case.sat_files {
                stmt.execute(params![case.time, channel, path_str(sat_file)])?;
            }

            let mut stmt = tx.prepare_cached(include_str!("db/add_record.sql"))?;
            for r in &case.records {
                stmt.execute(params![
                    case.time,
                    r.station,
                    r.name,
                    r.latitude,
                    r.longitude,
                    r.elevation,
                    r.obs_time,
                    r.vis,
                    f64::from(r.temp),
                    f64::from(r.dew),
                    r.rh,
                    r.dem_file.as_deref().map(path_str),
                ])?;
                written += 1;
            }
        }
        tx.commit()?;

        info!("Stored {} records to {}", written, path.display());
        Ok(written)
    }
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Load all cases from a fog database written by [`FogDB::store`], ordered by time.
pub fn read_fog_db(path: &Path) -> Result<Vec<FogCase>, FogToolsErr> {
    if !path.is_file() {
        return Err(FogToolsErr::MissingFile(path.to_path_buf()));
    }
    let db_conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;

    let num_tables: i64 = db_conn.query_row(
        "SELECT COUNT(name) FROM sqlite_master
         WHERE type='table' AND name IN ('cases', 'sat_files', 'records')",
        [],
        |row| row.get(0),
    )?;
    if num_tables != 3 {
        return Err(FogToolsErr::InvalidSchema);
    }

    let mut case_stmt =
        db_conn.prepare("SELECT time, nwp_file, cmic_file FROM cases ORDER BY time")?;
    let mut sat_stmt =
        db_conn.prepare("SELECT channel, path FROM sat_files WHERE time = ?1 ORDER BY channel")?;
    let mut rec_stmt = db_conn.prepare(
        "SELECT station, name, latitude, longitude, elevation, obs_time, vis, temp, dew, rh,
                dem_file
         FROM records WHERE time = ?1 ORDER BY station",
    )?;

    let heads: Vec<(NaiveDateTime, String, String)> = case_stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
        .collect::<Result<_, _>>()?;

    let mut cases = Vec::with_capacity(heads.len());
    for (time, nwp_file, cmic_file) in heads {
        let sat_files = sat_stmt
            .query_map(params![time], |row| {
                Ok((row.get::<_, u8>(0)?, PathBuf::from(row.get::<_, String>(1)?)))
            })?
            .collect::<Result<_, _>>()?;
        let records = rec_stmt
            .query_map(params![time], parse_record)?
            .collect::<Result<_, _>>()?;

        cases.push(FogCase {
            time,
            sat_files,
            nwp_file: PathBuf::from(nwp_file),
            cmic_file: PathBuf::from(cmic_file),
            records,
        });
    }

    Ok(cases)
}

fn parse_record(row: &Row) -> Result<FogRecord, rusqlite::Error> {
    let temp: f64 = row.get(7)?;
    let dew: f64 = row.get(8)?;
    let dem_file: Option<String> = row.get(10)?;

    Ok(FogRecord {
        station: row.get(0)?,
        name: row.get(1)?,
        latitude: row.get(2)?,
        longitude: row.get(3)?,
        elevation: row.get(4)?,
        obs_time: row.get(5)?,
        vis: row.get(6)?,
        temp: temp as f32,
        dew: dew as f32,
        rh: row.get(9)?,
        dem_file: dem_file.map(PathBuf::from),
    })
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
