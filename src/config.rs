//! Runtime configuration shared by all tools.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::errors::FogToolsErr;

/// Settings that can be changed through a YAML file or the environment.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Root in which the `fogtools` cache directory is created.
    pub cache_dir: Option<PathBuf>,
    /// Root below which plots are written, one directory per day.
    pub plot_dir: Option<PathBuf>,
    /// Directory for per-case log files.
    pub log_dir: Option<PathBuf>,
    /// NWCSAF software installation root, overridden by `$SAFNWC`.
    pub safnwc: Option<PathBuf>,
    /// HTTPS endpoint of the ISD bucket on AWS.
    pub isd_bucket_url: String,
    /// Where to get a fresh copy of the ISD station history.
    pub isd_history_url: String,
    /// HTTPS endpoint of the GOES-16 bucket on AWS.
    pub goes_bucket_url: String,
    /// Base URL for USGS 1 arc-second DEM tiles.
    pub dem_base_url: String,
    /// Program (and leading arguments) used to submit SKY requests.
    pub sky_command: Vec<String>,
    /// Program (and arguments) that starts the NWCSAF task manager.
    pub nwcsaf_start_command: Vec<String>,
    /// Program (and leading arguments) that reports the NWCSAF task manager status.
    pub nwcsaf_status_command: Vec<String>,
    /// Seconds between checks for NWCSAF output.
    pub nwcsaf_poll_interval_secs: u64,
    /// Number of checks for NWCSAF output before giving up.
    pub nwcsaf_max_polls: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            cache_dir: None,
            plot_dir: None,
            log_dir: None,
            safnwc: None,
            isd_bucket_url: "https://noaa-global-hourly-pds.s3.amazonaws.com".to_owned(),
            isd_history_url: "https://www.ncei.noaa.gov/pub/data/noaa/isd-history.txt".to_owned(),
            goes_bucket_url: "https://noaa-goes16.s3.amazonaws.com".to_owned(),
            dem_base_url: "https://prd-tnm.s3.amazonaws.com/StagedProducts/Elevation/1/TIFF/"
                .to_owned(),
            sky_command: vec!["sky".to_owned(), "-v".to_owned()],
            nwcsaf_start_command: vec!["SAFNWCTM".to_owned()],
            nwcsaf_status_command: vec!["tm".to_owned()],
            nwcsaf_poll_interval_secs: 10,
            nwcsaf_max_polls: 60,
        }
    }
}

impl Config {
    const FILE_NAME: &'static str = "config.yaml";

    /// Load the configuration.
    ///
    /// If `path` is given it must exist. Otherwise `<config dir>/fogtools/config.yaml` is used if
    /// it exists, and the defaults if it doesn't. Environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self, FogToolsErr> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_location().filter(|p| p.is_file()) {
                Some(path) => Self::from_file(&path)?,
                None => Config::default(),
            },
        };

        Ok(config.with_env_overrides())
    }

    /// Parse the configuration from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self, FogToolsErr> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    /// Parse the configuration from YAML text. Missing keys keep their default.
    pub fn from_yaml(text: &str) -> Result<Self, FogToolsErr> {
        if text.trim().is_empty() {
            return Ok(Config::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    fn default_location() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("fogtools").join(Self::FILE_NAME))
    }

    fn with_env_overrides(mut self) -> Self {
        if let Some(safnwc) = std::env::var_os("SAFNWC").filter(|v| !v.is_empty()) {
            self.safnwc = Some(PathBuf::from(safnwc));
        }
        self
    }

    /// Directory for per-case log files, `<data dir>/fogtools/log` unless configured.
    pub fn log_dir(&self) -> Result<PathBuf, FogToolsErr> {
        match self.log_dir {
            Some(ref dir) => Ok(dir.clone()),
            None => dirs::data_local_dir()
                .map(|d| d.join("fogtools").join("log"))
                .ok_or(FogToolsErr::LogicError("unable to determine data directory")),
        }
    }

    /// NWCSAF installation root, an error if neither configured nor in the environment.
    pub fn safnwc(&self) -> Result<&Path, FogToolsErr> {
        self.safnwc
            .as_deref()
            .ok_or(FogToolsErr::MissingEnvVar("SAFNWC"))
    }
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
#[cfg(test)]
mod unit {
    use super::*;

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(Config::from_yaml("").unwrap(), Config::default());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = Config::from_yaml(
            "cache_dir: /data/cache\nsky_command: [sky, -d]\nnwcsaf_max_polls: 3\n",
        )
        .unwrap();

        assert_eq!(config.cache_dir, Some(PathBuf::from("/data/cache")));
        assert_eq!(config.sky_command, vec!["sky", "-d"]);
        assert_eq!(config.nwcsaf_max_polls, 3);
        assert_eq!(config.goes_bucket_url, Config::default().goes_bucket_url);
    }

    #[test]
    fn test_unknown_key_is_an_error() {
        assert!(Config::from_yaml("banana: 3\n").is_err());
    }

    #[test]
    fn test_missing_safnwc() {
        let config = Config::default();
        match config.safnwc() {
            Err(FogToolsErr::MissingEnvVar("SAFNWC")) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_configured_log_dir() {
        let config = Config {
            log_dir: Some(PathBuf::from("/var/log/fog")),
            ..Config::default()
        };
        assert_eq!(config.log_dir().unwrap(), PathBuf::from("/var/log/fog"));
    }
}
