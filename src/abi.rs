//! Routines related to interacting with ABI, such as downloading from AWS.

use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
};

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};
use itertools::iproduct;
use regex::Regex;
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};
use tracing::{debug, info};

use crate::{
    errors::FogToolsErr,
    s3,
    transport::{download_to, Fetch},
};

/// Channels used by NWCSAF.
pub const NWCSAF_CHANNELS: [u8; 14] = [2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 13, 14, 15, 16];
/// Channels used by fogpy.
pub const FOGPY_CHANNELS: [u8; 7] = [2, 3, 5, 7, 11, 14, 15];

/// All channels needed by fogpy or NWCSAF.
pub fn default_channels() -> BTreeSet<u8> {
    NWCSAF_CHANNELS
        .iter()
        .chain(FOGPY_CHANNELS.iter())
        .copied()
        .collect()
}

/// ABI scan sector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, EnumIter)]
pub enum Sector {
    /// Contiguous United States
    #[strum(serialize = "C")]
    Conus,
    /// Full disk
    #[strum(serialize = "F")]
    FullDisk,
    /// Mesoscale
    #[strum(serialize = "M")]
    Mesoscale,
}

impl Sector {
    /// Parse a string such as "CF" into a list of sectors.
    pub fn parse_list(s: &str) -> Result<Vec<Sector>, FogToolsErr> {
        s.chars()
            .map(|c| c.to_string().parse::<Sector>().map_err(FogToolsErr::from))
            .collect()
    }
}

/// Get the S3 URI for the hour in which `dt` falls.
pub fn get_s3_uri(dt: NaiveDateTime, sector: Sector) -> String {
    format!(
        "s3://noaa-goes16/{}",
        s3_prefix(dt, sector).trim_end_matches('/')
    )
}

/// The key prefix in the GOES-16 bucket for the hour in which `dt` falls.
pub fn s3_prefix(dt: NaiveDateTime, sector: Sector) -> String {
    format!(
        "ABI-L1b-Rad{}/{:04}/{:03}/{:02}/",
        sector,
        dt.year(),
        dt.ordinal(),
        dt.hour()
    )
}

/// Where to store a downloaded file.
pub fn get_dl_dest(cache_dir: &Path, t: NaiveDateTime, channel: u8, key: &str) -> PathBuf {
    let file_name = key.rsplit('/').next().unwrap_or(key);
    cache_dir
        .join("abi")
        .join(t.format("%Y/%m/%d/%H/%M").to_string())
        .join(channel.to_string())
        .join(file_name)
}

/// Get the starting time from an ABI file name.
pub fn get_time_from_fn(file_name: &str) -> Result<NaiveDateTime, FogToolsErr> {
    let start = Regex::new(r"_s([0-9]{13})([0-9])_")?
        .captures(file_name)
        .ok_or_else(|| FogToolsErr::InvalidTime(format!("no start time in {}", file_name)))?;

    let t = NaiveDateTime::parse_from_str(&start[1], "%Y%j%H%M%S")?;
    let tenths: i64 = start[2]
        .parse()
        .map_err(|_| FogToolsErr::LogicError("regex guarantees a digit"))?;

    Ok(t + Duration::milliseconds(100 * tenths))
}

/// Downloads ABI data from the public GOES-16 bucket into a local cache.
pub struct AbiDownloader<'a, F: Fetch + ?Sized> {
    fetch: &'a F,
    bucket_url: String,
    cache_dir: PathBuf,
}

impl<'a, F: Fetch + ?Sized> AbiDownloader<'a, F> {
    /// Create a downloader writing below `cache_dir`.
    pub fn new(fetch: &'a F, bucket_url: &str, cache_dir: &Path) -> Self {
        AbiDownloader {
            fetch,
            bucket_url: bucket_url.trim_end_matches('/').to_owned(),
            cache_dir: cache_dir.to_path_buf(),
        }
    }

    /// The cache directory files are written to.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Keys for one channel in the hour in which `dt` falls.
    pub fn s3_select(
        &self,
        dt: NaiveDateTime,
        channel: u8,
        sector: Sector,
    ) -> Result<Vec<String>, FogToolsErr> {
        let needle = format!("C{:02}", channel);

        Ok(
            s3::list_keys(self.fetch, &self.bucket_url, &s3_prefix(dt, sector))?
                .into_iter()
                .filter(|key| {
                    key.rsplit('/')
                        .next()
                        .map(|name| name.contains(&needle))
                        .unwrap_or(false)
                })
                .collect(),
        )
    }

    /// Download ABI for a whole day.
    ///
    /// Loops through the hours of the day because the bucket is organised per hour. Files that
    /// are already present are not downloaded again. Returns the paths of all files for the day,
    /// including the ones that were already there.
    pub fn download_abi_day(
        &self,
        date: NaiveDate,
        channels: &[u8],
        sectors: &[Sector],
    ) -> Result<Vec<PathBuf>, FogToolsErr> {
        let midnight = date
            .and_hms_opt(0, 0, 0)
            .ok_or(FogToolsErr::LogicError("midnight always exists"))?;
        let hours = (0..24).map(|h| midnight + Duration::hours(h));
        let mut paths = vec![];

        for (t, channel, sector) in iproduct!(hours, channels.iter(), sectors.iter()) {
            for key in self.s3_select(t, *channel, *sector)? {
                let file_name = key.rsplit('/').next().unwrap_or(&key);
                let scan_time = get_time_from_fn(file_name)?;
                let dest = get_dl_dest(&self.cache_dir, scan_time, *channel, &key);

                if dest.exists() {
                    debug!("Already exists: {}", dest.display());
                } else {
                    info!("Downloading {}", key);
                    let url = s3::object_url(&self.bucket_url, &key);
                    if !download_to(self.fetch, &url, &dest)? {
                        return Err(FogToolsErr::HttpStatus { url, status: 404 });
                    }
                }

                paths.push(dest);
            }
        }

        Ok(paths)
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

    fn ts(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn listing(prefix: &str, names: &[&str]) -> String {
        let contents: String = names
            .iter()
            .map(|n| format!("<Contents><Key>{}{}</Key></Contents>", prefix, n))
            .collect();
        format!(
            "<ListBucketResult><IsTruncated>false</IsTruncated>{}</ListBucketResult>",
            contents
        )
    }

    fn abi_name(channel: u8, doy: u32, hour: u32) -> String {
        format!(
            "OR_ABI-L1b-RadC-M6C{:02}_G16_s2020{:03}{:02}01166_e2020{:03}{:02}03539_c2020{:03}{:02}03598.nc",
            channel, doy, hour, doy, hour, doy, hour
        )
    }

    #[test]
    fn test_get_s3_uri() {
        assert_eq!(
            get_s3_uri(ts(2020, 1, 1, 12), Sector::Conus),
            "s3://noaa-goes16/ABI-L1b-RadC/2020/001/12"
        );
        assert_eq!(
            get_s3_uri(ts(2020, 2, 1, 23), Sector::Conus),
            "s3://noaa-goes16/ABI-L1b-RadC/2020/032/23"
        );
        assert_eq!(
            get_s3_uri(ts(2020, 3, 1, 0), Sector::FullDisk),
            "s3://noaa-goes16/ABI-L1b-RadF/2020/061/00"
        );
    }

    #[test]
    fn test_parse_sector_list() {
        assert_eq!(
            Sector::parse_list("CF").unwrap(),
            vec![Sector::Conus, Sector::FullDisk]
        );
        assert!(Sector::parse_list("CX").is_err());
    }

    #[test]
    fn test_default_channels() {
        let chans = default_channels();
        assert_eq!(chans.len(), 14);
        assert!(!chans.contains(&1));
        assert!(!chans.contains(&12));
    }

    #[test]
    fn test_get_time_from_fn() {
        let t = get_time_from_fn(
            "OR_ABI-L1b-RadC-M6C10_G16_s20200611201166_e20200611203539_c20200611203598.nc",
        )
        .unwrap();
        assert_eq!(
            t,
            NaiveDate::from_ymd_opt(2020, 3, 1)
                .unwrap()
                .and_hms_milli_opt(12, 1, 16, 600)
                .unwrap()
        );
        assert!(get_time_from_fn("banana.nc").is_err());
    }

    #[test]
    fn test_get_dl_dest() {
        let dest = get_dl_dest(
            Path::new("/cache"),
            ts(2020, 3, 1, 12),
            7,
            "ABI-L1b-RadC/2020/061/12/file.nc",
        );
        assert_eq!(dest, PathBuf::from("/cache/abi/2020/03/01/12/00/7/file.nc"));
    }

    #[test]
    fn test_s3_select() {
        let bucket = "https://bucket.example";
        let prefix = "ABI-L1b-RadC/2020/061/12/";
        let body = listing(prefix, &[&abi_name(10, 61, 12), &abi_name(11, 61, 12)]);
        let fetcher = MockFetcher::with_fallback(body.as_bytes());
        let tmp = TempDir::new().unwrap();
        let dl = AbiDownloader::new(&fetcher, bucket, tmp.path());

        let keys = dl.s3_select(ts(2020, 3, 1, 12), 10, Sector::Conus).unwrap();

        assert_eq!(keys, vec![format!("{}{}", prefix, abi_name(10, 61, 12))]);
        assert!(fetcher.calls()[0].contains("prefix=ABI-L1b-RadC%2F2020%2F061%2F12%2F"));
    }

    #[test]
    fn test_download_abi_day() {
        let bucket = "https://bucket.example";
        let tmp = TempDir::new().unwrap();
        let date = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
        let channels = [1u8, 2, 3];

        let mut fetcher = MockFetcher::new();
        for hour in 0..24 {
            let prefix = format!("ABI-L1b-RadC/2020/061/{:02}/", hour);
            let names: Vec<String> = channels.iter().map(|c| abi_name(*c, 61, hour)).collect();
            let refs: Vec<&str> = names.iter().map(String::as_str).collect();
            let url = list_url_for(bucket, &prefix);
            fetcher = fetcher.respond(&url, listing(&prefix, &refs).as_bytes());
            for name in names.iter() {
                fetcher = fetcher.respond(&format!("{}/{}{}", bucket, prefix, name), b"radiances");
            }
        }

        let dl = AbiDownloader::new(&fetcher, bucket, tmp.path());
        let paths = dl.download_abi_day(date, &channels, &[Sector::Conus]).unwrap();

        assert_eq!(paths.len(), 24 * 3);
        assert!(paths.iter().all(|p| p.is_file()));
        let n_downloads = fetcher.calls().iter().filter(|c| c.ends_with(".nc")).count();
        assert_eq!(n_downloads, 24 * 3);

        // A second pass finds everything in place.
        let again = dl.download_abi_day(date, &channels, &[Sector::Conus]).unwrap();
        assert_eq!(again, paths);
        let n_downloads = fetcher.calls().iter().filter(|c| c.ends_with(".nc")).count();
        assert_eq!(n_downloads, 24 * 3);
    }

    fn list_url_for(bucket: &str, prefix: &str) -> String {
        format!(
            "{}/?list-type=2&prefix={}",
            bucket,
            prefix.replace('/', "%2F")
        )
    }
}
