//! ABI full disk scans as a fog database source.

use std::{
    collections::{BTreeMap, HashMap},
    path::{Path, PathBuf},
};

use chrono::NaiveDateTime;
use tracing::debug;

use super::Source;
use crate::{
    abi::{default_channels, get_time_from_fn, AbiDownloader, Sector},
    errors::FogToolsErr,
    transport::Fetch,
};

/// ABI radiances, one file per channel for every scan.
pub struct AbiSource<'a, F: Fetch + ?Sized> {
    downloader: AbiDownloader<'a, F>,
    generated: HashMap<NaiveDateTime, Vec<PathBuf>>,
}

impl<'a, F: Fetch + ?Sized> AbiSource<'a, F> {
    /// Create a source downloading with `downloader`.
    pub fn new(downloader: AbiDownloader<'a, F>) -> Self {
        AbiSource {
            downloader,
            generated: HashMap::new(),
        }
    }

    /// Directory holding the channel directories of the scan starting in the minute of `t`.
    pub fn slot_dir(&self, t: NaiveDateTime) -> PathBuf {
        self.downloader
            .cache_dir()
            .join("abi")
            .join(t.format("%Y/%m/%d/%H/%M").to_string())
    }

    /// Per channel, the earliest scan starting at or after `t` among the files known for `t`.
    pub fn select_scan(&self, t: NaiveDateTime) -> Result<BTreeMap<u8, PathBuf>, FogToolsErr> {
        let mut selected: BTreeMap<u8, (NaiveDateTime, PathBuf)> = BTreeMap::new();

        for path in self.get_path(t)? {
            let channel = match channel_of(&path) {
                Some(channel) => channel,
                None => continue,
            };
            let start = path
                .file_name()
                .map(|name| get_time_from_fn(&name.to_string_lossy()))
                .transpose()?
                .ok_or_else(|| FogToolsErr::MissingFile(path.clone()))?;

            if start < t {
                continue;
            }

            match selected.get(&channel) {
                Some((prev, _)) if *prev <= start => {}
                _ => {
                    selected.insert(channel, (start, path));
                }
            }
        }

        Ok(selected
            .into_iter()
            .map(|(channel, (_, path))| (channel, path))
            .collect())
    }

    fn slot_files(&self, t: NaiveDateTime) -> Result<Vec<PathBuf>, FogToolsErr> {
        let slot = self.slot_dir(t);
        let mut files = vec![];
        for channel in default_channels() {
            files.extend(files_in(&slot.join(channel.to_string()))?);
        }
        Ok(files)
    }
}

impl<'a, F: Fetch + ?Sized> Source for AbiSource<'a, F> {
    /// The files found by the last [`store`](Source::store) or [`ensure`](Source::ensure).
    fn get_path(&self, t: NaiveDateTime) -> Result<Vec<PathBuf>, FogToolsErr> {
        self.generated
            .get(&t)
            .cloned()
            .ok_or_else(|| FogToolsErr::FogDb(format!("no ABI files generated for {}", t)))
    }

    /// True if every channel directory of the slot holds exactly one file.
    fn exists(&self, t: NaiveDateTime) -> Result<bool, FogToolsErr> {
        let slot = self.slot_dir(t);

        for channel in default_channels() {
            match files_in(&slot.join(channel.to_string()))?.len() {
                0 => return Ok(false),
                1 => {}
                n => {
                    return Err(FogToolsErr::FogDb(format!(
                        "expected one file for channel {} in {}, found {}",
                        channel,
                        slot.display(),
                        n
                    )))
                }
            }
        }

        Ok(true)
    }

    fn store(&mut self, t: NaiveDateTime) -> Result<(), FogToolsErr> {
        let channels: Vec<u8> = default_channels().into_iter().collect();
        let paths = self
            .downloader
            .download_abi_day(t.date(), &channels, &[Sector::FullDisk])?;

        debug!("Downloaded or found {} ABI files for {}", paths.len(), t.date());
        self.generated.insert(t, paths);
        Ok(())
    }

    fn ensure(&mut self, t: NaiveDateTime) -> Result<(), FogToolsErr> {
        if self.exists(t)? {
            let files = self.slot_files(t)?;
            self.generated.insert(t, files);
            Ok(())
        } else {
            self.store(t)
        }
    }
}

fn channel_of(path: &Path) -> Option<u8> {
    path.parent()?.file_name()?.to_str()?.parse().ok()
}

fn files_in(dir: &Path) -> Result<Vec<PathBuf>, FogToolsErr> {
    if !dir.is_dir() {
        return Ok(vec![]);
    }

    let mut files = vec![];
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
#[cfg(test)]
pub(crate) mod unit {
    use super::*;
    use crate::transport::mock::MockFetcher;

    use chrono::NaiveDate;
    use tempfile::TempDir;

    const EMPTY_LISTING: &str =
        "<ListBucketResult><IsTruncated>false</IsTruncated></ListBucketResult>";

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(1900, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn scan_name(channel: u8, doy: u32) -> String {
        format!(
            "OR_ABI-L1b-RadF-M3C{:02}_G16_s1900{:03}0000000_e1900{:03}0000000_c1900{:03}0000000.nc",
            channel, doy, doy, doy
        )
    }

    // One file in every channel directory of the slot at `t`.
    pub(crate) fn make_slot(cache: &Path, t: NaiveDateTime) {
        let d = cache.join("abi").join(t.format("%Y/%m/%d/%H/%M").to_string());
        for c in 1..=16 {
            let f = d.join(c.to_string()).join(format!(
                "OR_ABI-L1b-RadF-M3C{:02}_G16_s{}0_e{}0_c{}0.nc",
                c,
                t.format("%Y%j%H%M%S"),
                t.format("%Y%j%H%M%S"),
                t.format("%Y%j%H%M%S"),
            ));
            std::fs::create_dir_all(f.parent().unwrap()).unwrap();
            std::fs::write(f, b"").unwrap();
        }
    }

    #[test]
    fn test_get_path() {
        let tmp = TempDir::new().unwrap();
        let fetcher = MockFetcher::new();
        let mut abi = AbiSource::new(AbiDownloader::new(&fetcher, "https://b", tmp.path()));

        assert!(abi.get_path(ts()).is_err());
        abi.generated.insert(ts(), vec![PathBuf::from("/banana")]);
        assert_eq!(abi.get_path(ts()).unwrap(), vec![PathBuf::from("/banana")]);
    }

    #[test]
    fn test_exists() {
        let tmp = TempDir::new().unwrap();
        let fetcher = MockFetcher::new();
        let abi = AbiSource::new(AbiDownloader::new(&fetcher, "https://b", tmp.path()));

        assert!(!abi.exists(ts()).unwrap());
        make_slot(tmp.path(), ts());
        assert!(abi.exists(ts()).unwrap());

        let extra = abi.slot_dir(ts()).join("3").join("second.nc");
        std::fs::write(extra, b"").unwrap();
        match abi.exists(ts()) {
            Err(FogToolsErr::FogDb(msg)) => assert!(msg.contains("channel 3")),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_store() {
        let tmp = TempDir::new().unwrap();
        let fetcher = MockFetcher::with_fallback(EMPTY_LISTING.as_bytes());
        let mut abi = AbiSource::new(AbiDownloader::new(&fetcher, "https://b", tmp.path()));

        abi.store(ts()).unwrap();

        // One listing per hour and channel.
        assert_eq!(fetcher.calls().len(), 24 * 14);
        assert!(abi.get_path(ts()).unwrap().is_empty());
    }

    #[test]
    fn test_ensure() {
        let tmp = TempDir::new().unwrap();
        let fetcher = MockFetcher::with_fallback(EMPTY_LISTING.as_bytes());
        let mut abi = AbiSource::new(AbiDownloader::new(&fetcher, "https://b", tmp.path()));

        abi.ensure(ts()).unwrap();
        let n_calls = fetcher.calls().len();
        assert!(n_calls > 0);

        make_slot(tmp.path(), ts());
        abi.ensure(ts()).unwrap();
        assert_eq!(fetcher.calls().len(), n_calls);
        // Only the channels in use are picked up.
        assert_eq!(abi.get_path(ts()).unwrap().len(), 14);
    }

    #[test]
    fn test_select_scan() {
        let tmp = TempDir::new().unwrap();
        let fetcher = MockFetcher::new();
        let mut abi = AbiSource::new(AbiDownloader::new(&fetcher, "https://b", tmp.path()));

        let tmp_ref = &tmp;
        let paths: Vec<PathBuf> = [10u8, 11]
            .iter()
            .flat_map(|c| {
                (1..=3).map(move |doy| {
                    tmp_ref.path()
                        .join(c.to_string())
                        .join(scan_name(*c, doy))
                })
            })
            .collect();
        let t = NaiveDate::from_ymd_opt(1900, 1, 2)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        abi.generated.insert(t, paths);

        let selected = abi.select_scan(t).unwrap();

        assert_eq!(selected.len(), 2);
        assert_eq!(
            selected[&10],
            tmp.path().join("10").join(scan_name(10, 2))
        );
        assert_eq!(
            selected[&11],
            tmp.path().join("11").join(scan_name(11, 2))
        );
    }
}
