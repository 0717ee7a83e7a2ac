//! Routines related to the Integrated Surface Database (ISD).
//!
//! Station files are downloaded from the public `noaa-global-hourly-pds` bucket, one CSV file
//! per station per year, and cached locally gzip compressed. Quality controlled visibility,
//! temperature and dew point are collected into a [`MeasurementStore`].

use std::{
    io::{Read, Write},
    path::{Path, PathBuf},
};

use chrono::{Datelike, NaiveDate};
use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use tracing::{debug, info, warn};

use crate::{errors::FogToolsErr, transport::Fetch};

mod fog;
mod record;
mod state_prov;
mod stations;
mod store;

pub use fog::{
    count_fogs_per_day, count_fogs_per_period, count_reporting_per_period, days_with_at_least,
    rank_fog_periods, FogCount, Period, RankOptions, SortOrder, DEFAULT_MAX_VIS,
};
pub use record::{
    extract_and_add_all, read_station_csv, Extractor, Observation, RawObservation, Temperature,
    Visibility, MISSING_TEMP, MISSING_VIS, QUALITY_OK,
};
pub use state_prov::{StateProv, NEW_ENGLAND_AND_NY};
pub use stations::{
    bundled_stations, count_station_years, default_stations, load_stations, parse_station_list,
    select_stations, update_station_list, Station,
};
pub use store::{read_db, MeasurementStore};

/// Downloads station files and keeps a local cache of them.
pub struct IsdClient<'a, F: Fetch + ?Sized> {
    fetch: &'a F,
    bucket_url: String,
    cache_dir: PathBuf,
}

impl<'a, F: Fetch + ?Sized> IsdClient<'a, F> {
    /// Create a client caching below `cache_dir`.
    pub fn new(fetch: &'a F, bucket_url: &str, cache_dir: &Path) -> Self {
        IsdClient {
            fetch,
            bucket_url: bucket_url.trim_end_matches('/').to_owned(),
            cache_dir: cache_dir.to_path_buf(),
        }
    }

    /// URL of the file for station `id` in `year`.
    pub fn station_url(&self, year: i32, id: &str) -> String {
        format!("{}/{:04}/{}.csv", self.bucket_url, year, id)
    }

    /// Location of the cached copy of a station file.
    pub fn cache_file(&self, year: i32, id: &str) -> PathBuf {
        self.cache_dir
            .join("isd")
            .join(year.to_string())
            .join(format!("{}.csv.gz", id))
    }

    /// Download a station file, bypassing the cache.
    ///
    /// Returns `None` if the station has no data for that year.
    pub fn dl_station(
        &self,
        year: i32,
        id: &str,
    ) -> Result<Option<Vec<RawObservation>>, FogToolsErr> {
        let url = self.station_url(year, id);
        debug!("Reading from S3: {}", url);

        match self.fetch.fetch(&url)? {
            Some(content) => Ok(Some(read_station_csv(&content)?)),
            None => Ok(None),
        }
    }

    /// Get a station file from the cache, or download it and store it in the cache.
    ///
    /// Returns `None` if the station has no data for that year.
    pub fn get_station(
        &self,
        year: i32,
        id: &str,
    ) -> Result<Option<Vec<RawObservation>>, FogToolsErr> {
        let cache_file = self.cache_file(year, id);

        if cache_file.is_file() {
            debug!("Reading from cache: {}", cache_file.display());
            let mut content = vec![];
            GzDecoder::new(std::fs::File::open(&cache_file)?).read_to_end(&mut content)?;
            return Ok(Some(read_station_csv(&content)?));
        }

        let url = self.station_url(year, id);
        debug!("Reading from S3: {}", url);
        let content = match self.fetch.fetch(&url)? {
            Some(content) => content,
            None => return Ok(None),
        };

        // Parse before caching so a broken download is not kept.
        let rows = read_station_csv(&content)?;

        debug!("Storing to cache: {}", cache_file.display());
        if let Some(parent) = cache_file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::File::create(&cache_file)?;
        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder.write_all(&content)?;
        encoder.finish()?;

        Ok(Some(rows))
    }

    /// Collect all observations of `stations` between `start` and `end` into a new measurement
    /// store at `out`, replacing any existing file. Returns the number of observations stored.
    pub fn create_db(
        &self,
        out: &Path,
        stations: &[Station],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<usize, FogToolsErr> {
        let mut store = MeasurementStore::create(out)?;
        self.fill_store(&mut store, stations, start, end)
    }

    /// Like [`IsdClient::create_db`], but add to the store at `out` if there is one.
    ///
    /// Years the store already covers are skipped.
    pub fn extend_db(
        &self,
        out: &Path,
        stations: &[Station],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<usize, FogToolsErr> {
        let mut store = MeasurementStore::open_or_create(out)?;
        self.fill_store(&mut store, stations, start, end)
    }

    fn fill_store(
        &self,
        store: &mut MeasurementStore,
        stations: &[Station],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<usize, FogToolsErr> {
        let n = count_station_years(stations, start, end);
        info!("Expecting {} station·years", n);

        let extractor = Extractor::new()?;
        let mut count = 0;
        let mut stored = 0;

        for stn in stations {
            let id = stn.id();
            for year in stn.years_in(start, end) {
                count += 1;
                if store.covers_year(year)? {
                    debug!("Already stored, {} for station {}", year, id);
                    continue;
                }
                debug!("Adding to store, {} for station {}, no {}/{}", year, id, count, n);

                match self.get_station(year, &id)? {
                    Some(rows) => stored += store.add(&extractor.extract_and_add_all(&rows))?,
                    None => warn!("Not available: {}/{}", id, year),
                }
            }
        }
        store.add_years(start.year()..=end.year())?;

        debug!("Stored {} observations to {}", stored, store.path().display());
        Ok(stored)
    }
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
