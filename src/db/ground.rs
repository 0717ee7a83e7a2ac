//! Ground observations and terrain as fog database sources.

use std::{
    collections::{BTreeSet, HashSet},
    path::{Path, PathBuf},
};

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use tracing::{info, warn};

use super::Source;
use crate::{
    dem::{get_out_dir, get_src_uri_filename, tile_for_point, DemDownloader, DemFileType},
    errors::FogToolsErr,
    isd::{IsdClient, MeasurementStore, Observation, Station},
    transport::Fetch,
};

/// How far from the case time a ground observation may be.
pub const MAX_OBSERVATION_OFFSET_MINUTES: i64 = 30;

/// ISD observations from the measurement store.
pub struct GroundSource<'a, F: Fetch + ?Sized> {
    client: IsdClient<'a, F>,
    store_path: PathBuf,
    stations: Vec<Station>,
}

impl<'a, F: Fetch + ?Sized> GroundSource<'a, F> {
    /// Create a source reading the store at `store_path`.
    ///
    /// Years missing from the store are added from `stations` with `client`.
    pub fn new(client: IsdClient<'a, F>, store_path: &Path, stations: Vec<Station>) -> Self {
        GroundSource {
            client,
            store_path: store_path.to_path_buf(),
            stations,
        }
    }

    /// For every station, the observation nearest to `t`.
    pub fn extract(&self, t: NaiveDateTime) -> Result<Vec<Observation>, FogToolsErr> {
        MeasurementStore::connect(&self.store_path)?
            .nearest_per_station(t, Duration::minutes(MAX_OBSERVATION_OFFSET_MINUTES))
    }
}

impl<'a, F: Fetch + ?Sized> Source for GroundSource<'a, F> {
    fn get_path(&self, _t: NaiveDateTime) -> Result<Vec<PathBuf>, FogToolsErr> {
        Ok(vec![self.store_path.clone()])
    }

    /// The store exists and holds the year of `t`.
    fn exists(&self, t: NaiveDateTime) -> Result<bool, FogToolsErr> {
        if !self.store_path.is_file() {
            return Ok(false);
        }
        MeasurementStore::connect(&self.store_path)?.covers_year(t.year())
    }

    /// Add the year of `t` to the store, creating it if needed.
    fn store(&mut self, t: NaiveDateTime) -> Result<(), FogToolsErr> {
        let year = t.year();
        let start = NaiveDate::from_ymd_opt(year, 1, 1)
            .ok_or_else(|| FogToolsErr::InvalidTime(t.to_string()))?;
        let end = NaiveDate::from_ymd_opt(year, 12, 31)
            .ok_or_else(|| FogToolsErr::InvalidTime(t.to_string()))?;

        info!("Adding {} to the measurement store", year);
        self.client
            .extend_db(&self.store_path, &self.stations, start, end)?;
        Ok(())
    }
}

/// USGS elevation tiles covering a set of points.
pub struct DemSource<'a, F: Fetch + ?Sized> {
    downloader: DemDownloader<'a, F>,
    base: PathBuf,
    tiles: BTreeSet<(i32, i32)>,
    unavailable: HashSet<(i32, i32)>,
}

impl<'a, F: Fetch + ?Sized> DemSource<'a, F> {
    /// Create a source keeping tiles below `base`.
    pub fn new(downloader: DemDownloader<'a, F>, base: &Path) -> Self {
        DemSource {
            downloader,
            base: base.to_path_buf(),
            tiles: BTreeSet::new(),
            unavailable: HashSet::new(),
        }
    }

    /// Cover exactly the tiles containing these (lat, lon) points.
    pub fn cover(&mut self, points: impl IntoIterator<Item = (f64, f64)>) {
        self.tiles = points
            .into_iter()
            .map(|(lat, lon)| tile_for_point(lat, lon))
            .collect();
    }

    /// The elevation file for the tile containing a point, unless the server has none.
    pub fn file_for_point(&self, lat: f64, lon: f64) -> Option<PathBuf> {
        let tile = tile_for_point(lat, lon);
        if self.unavailable.contains(&tile) {
            None
        } else {
            Some(self.tile_file(tile))
        }
    }

    fn tile_file(&self, (lat, lon): (i32, i32)) -> PathBuf {
        get_out_dir(lat, lon, &self.base).join(get_src_uri_filename(lat, lon, DemFileType::Tif))
    }
}

impl<'a, F: Fetch + ?Sized> Source for DemSource<'a, F> {
    /// Files of the covered tiles, which do not depend on time.
    fn get_path(&self, _t: NaiveDateTime) -> Result<Vec<PathBuf>, FogToolsErr> {
        Ok(self
            .tiles
            .iter()
            .filter(|tile| !self.unavailable.contains(tile))
            .map(|tile| self.tile_file(*tile))
            .collect())
    }

    fn store(&mut self, _t: NaiveDateTime) -> Result<(), FogToolsErr> {
        for &(lat, lon) in &self.tiles {
            let tif = self.tile_file((lat, lon));
            if tif.exists() || self.unavailable.contains(&(lat, lon)) {
                continue;
            }

            let out_dir = get_out_dir(lat, lon, &self.base);
            let written = self.downloader.dl_usgs_dem(lat, lon, &out_dir)?;
            if !written.contains(&tif) {
                warn!("No elevation data for {}", tif.display());
                self.unavailable.insert((lat, lon));
            }
        }

        Ok(())
    }
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
#[cfg(test)]
mod unit {
    use super::*;
    use crate::transport::mock::MockFetcher;

    use tempfile::TempDir;

    const DEM: &str = "https://dem.example/TIFF";

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn obs(station: &str, date: &str, vis: u32) -> Observation {
        Observation {
            station: station.to_owned(),
            name: station.to_owned(),
            date: dt(date),
            latitude: Some(41.7),
            longitude: Some(-71.4),
            elevation: Some(16.0),
            vis,
            temp: 2.0,
            dew: 1.0,
        }
    }

    #[test]
    fn test_ground_extract() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("store.db");
        let mut store = MeasurementStore::create(&path).unwrap();
        store
            .add(&[
                obs("725070", "2019-01-05 11:40", 400),
                obs("725070", "2019-01-05 12:10", 200),
                obs("725054", "2019-01-05 11:25", 100),
            ])
            .unwrap();
        store.add_years(2019..=2019).unwrap();
        drop(store);

        let fetcher = MockFetcher::new();
        let client = IsdClient::new(&fetcher, "https://b", tmp.path());
        let ground = GroundSource::new(client, &path, vec![]);

        assert!(ground.exists(dt("2019-01-05 12:00")).unwrap());
        let near = ground.extract(dt("2019-01-05 12:00")).unwrap();
        assert_eq!(near.len(), 1);
        assert_eq!(near[0].vis, 200);
    }

    #[test]
    fn test_ground_store() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("store.db");
        let fetcher = MockFetcher::new();
        let stations = crate::isd::bundled_stations()
            .unwrap()
            .into_iter()
            .filter(|s| s.id() == "72507014765")
            .collect::<Vec<_>>();
        assert_eq!(stations.len(), 1);
        let mut ground = GroundSource::new(
            IsdClient::new(&fetcher, "https://b", tmp.path()),
            &path,
            stations,
        );

        assert!(!ground.exists(dt("2019-01-05 12:00")).unwrap());
        ground.ensure(dt("2019-01-05 12:00")).unwrap();

        assert_eq!(fetcher.calls(), vec!["https://b/2019/72507014765.csv"]);
        assert!(ground.exists(dt("2019-01-05 12:00")).unwrap());
    }

    #[test]
    fn test_ground_store_adds_missing_year() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("store.db");
        let fetcher = MockFetcher::new();
        let stations = crate::isd::bundled_stations()
            .unwrap()
            .into_iter()
            .filter(|s| s.id() == "72507014765")
            .collect::<Vec<_>>();
        let mut ground = GroundSource::new(
            IsdClient::new(&fetcher, "https://b", tmp.path()),
            &path,
            stations,
        );

        ground.ensure(dt("2017-01-31 08:00")).unwrap();
        assert!(ground.exists(dt("2017-06-01 00:00")).unwrap());
        assert!(!ground.exists(dt("2018-01-31 08:00")).unwrap());

        ground.ensure(dt("2018-01-31 08:00")).unwrap();

        assert_eq!(
            fetcher.calls(),
            vec![
                "https://b/2017/72507014765.csv",
                "https://b/2018/72507014765.csv"
            ]
        );
        assert!(ground.exists(dt("2017-01-31 08:00")).unwrap());
        assert!(ground.exists(dt("2018-01-31 08:00")).unwrap());
    }

    #[test]
    fn test_dem_source() {
        let tmp = TempDir::new().unwrap();
        let fetcher = MockFetcher::new().respond(
            &format!("{}/n42w072/USGS_1_n42w072.tif", DEM),
            b"elevation",
        );
        let mut dem = DemSource::new(DemDownloader::new(&fetcher, DEM), tmp.path());

        dem.cover(vec![(41.7, -71.4), (41.2, -71.9), (44.5, -68.2)]);
        let t = dt("2019-01-05 12:00");
        assert_eq!(dem.get_path(t).unwrap().len(), 2);
        assert!(!dem.exists(t).unwrap());

        dem.ensure(t).unwrap();

        assert!(dem.exists(t).unwrap());
        assert_eq!(
            dem.file_for_point(41.7, -71.4),
            Some(tmp.path().join("n42w072").join("USGS_1_n42w072.tif"))
        );
        assert_eq!(dem.file_for_point(44.5, -68.2), None);

        // Unavailable tiles are not asked for again.
        let n_calls = fetcher.calls().len();
        dem.ensure(t).unwrap();
        assert_eq!(fetcher.calls().len(), n_calls);
    }
}
