//! Command line options that are used across applications.

use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};

use crate::{cache, config::Config, errors::FogToolsErr};

/// Struct to package up command line arguments.
#[derive(Clone, Debug)]
pub struct CommonCmdLineArgs {
    // Configuration after applying the file and the environment
    config: Config,
    // The fogtools cache directory, already created
    cache_dir: PathBuf,
    // Number of times -v was given
    verbosity: u8,
}

impl CommonCmdLineArgs {
    /// Create a new set of args.
    pub fn new_app(app_name: &'static str, about: &'static str) -> Command {
        Command::new(app_name)
            .about(about)
            .version(env!("CARGO_PKG_VERSION"))
            .arg(
                Arg::new("cache-dir")
                    .long("cache-dir")
                    .value_name("DIR")
                    .value_parser(value_parser!(PathBuf))
                    .help("Root of the cache directory.")
                    .long_help(concat!(
                        "Root of the cache directory, a 'fogtools' directory is created in it. ",
                        "Defaults to $XDG_CACHE_HOME or ~/.cache."
                    )),
            )
            .arg(
                Arg::new("config")
                    .long("config")
                    .value_name("FILE")
                    .value_parser(value_parser!(PathBuf))
                    .help("YAML configuration file."),
            )
            .arg(
                Arg::new("verbose")
                    .short('v')
                    .long("verbose")
                    .action(ArgAction::Count)
                    .help("Log more, repeat for even more."),
            )
    }

    /// Process a `Command` to get the parsed values out of it and the matches object so an
    /// application can continue with further argument parsing.
    pub fn matches(app: Command) -> Result<(Self, ArgMatches), FogToolsErr> {
        Self::from_arg_matches(app.get_matches())
    }

    // Like `matches`, but parse `args` instead of the process arguments.
    #[cfg(test)]
    fn matches_from<I, T>(app: Command, args: I) -> Result<(Self, ArgMatches), FogToolsErr>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let matches = app
            .try_get_matches_from(args)
            .map_err(|err| FogToolsErr::GeneralError(err.to_string()))?;
        Self::from_arg_matches(matches)
    }

    fn from_arg_matches(matches: ArgMatches) -> Result<(Self, ArgMatches), FogToolsErr> {
        let config = Config::load(matches.get_one::<PathBuf>("config").map(PathBuf::as_path))?;

        let cache_base = matches
            .get_one::<PathBuf>("cache-dir")
            .cloned()
            .or_else(|| config.cache_dir.clone());
        let cache_dir = cache::cache_dir(cache_base.as_deref())?;

        let verbosity = matches.get_count("verbose");

        Ok((
            CommonCmdLineArgs {
                config,
                cache_dir,
                verbosity,
            },
            matches,
        ))
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the cache directory
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// How verbose logging to stderr should be.
    pub fn verbosity(&self) -> u8 {
        self.verbosity
    }

    /// Root below which plots are written.
    pub fn plot_root(&self) -> PathBuf {
        self.config
            .plot_dir
            .clone()
            .unwrap_or_else(|| self.cache_dir.join("plots"))
    }
}

const DATETIME_FORMATS: [&str; 6] = [
    "%Y%m%d%H%M%S",
    "%Y%m%d%H%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: [&str; 2] = ["%Y%m%d", "%Y-%m-%d"];

/// Parse a time stamp given on the command line.
///
/// Dates without a time refer to midnight.
pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime, FogToolsErr> {
    let s = s.trim();

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(|| FogToolsErr::InvalidTime(s.to_owned()))
}

/// Parse a date given on the command line.
pub fn parse_date(s: &str) -> Result<NaiveDate, FogToolsErr> {
    parse_timestamp(s).map(|t| t.date())
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
#[cfg(test)]
mod unit {
    use super::*;

    use tempfile::TempDir;

    fn dt(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(parse_timestamp("201901051230").unwrap(), dt(2019, 1, 5, 12, 30, 0));
        assert_eq!(parse_timestamp("20190105123015").unwrap(), dt(2019, 1, 5, 12, 30, 15));
        assert_eq!(parse_timestamp("20190105").unwrap(), dt(2019, 1, 5, 0, 0, 0));
        assert_eq!(parse_timestamp("2019-01-05").unwrap(), dt(2019, 1, 5, 0, 0, 0));
        assert_eq!(parse_timestamp("2019-01-05T12:30").unwrap(), dt(2019, 1, 5, 12, 30, 0));
        assert_eq!(
            parse_timestamp("2019-01-05T12:30:15").unwrap(),
            dt(2019, 1, 5, 12, 30, 15)
        );
        assert_eq!(parse_timestamp("2019-01-05 12:30").unwrap(), dt(2019, 1, 5, 12, 30, 0));
        assert_eq!(
            parse_timestamp(" 2019-01-05 12:30:15 ").unwrap(),
            dt(2019, 1, 5, 12, 30, 15)
        );

        for bad in &["", "yesterday", "2019-13-05", "2019-01-05 25:00", "201901"] {
            assert!(
                matches!(parse_timestamp(bad), Err(FogToolsErr::InvalidTime(_))),
                "{}",
                bad
            );
        }
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2017-01-01").unwrap(),
            NaiveDate::from_ymd_opt(2017, 1, 1).unwrap()
        );
    }

    #[test]
    fn test_matches_from() {
        let tmp = TempDir::new().unwrap();
        let cfg = tmp.path().join("config.yaml");
        std::fs::write(&cfg, "plot_dir: /plots\n").unwrap();

        let app = CommonCmdLineArgs::new_app("test", "testing").arg(Arg::new("extra"));
        let (common, matches) = CommonCmdLineArgs::matches_from(
            app,
            vec![
                "test",
                "-vv",
                "--cache-dir",
                tmp.path().to_str().unwrap(),
                "--config",
                cfg.to_str().unwrap(),
                "hello",
            ],
        )
        .unwrap();

        assert_eq!(common.verbosity(), 2);
        assert_eq!(common.cache_dir(), tmp.path().join("fogtools"));
        assert!(common.cache_dir().is_dir());
        assert_eq!(common.plot_root(), PathBuf::from("/plots"));
        assert_eq!(matches.get_one::<String>("extra").unwrap(), "hello");
    }

    #[test]
    fn test_matches_from_error() {
        let app = CommonCmdLineArgs::new_app("test", "testing");

        assert!(CommonCmdLineArgs::matches_from(app, vec!["test", "--bogus"]).is_err());
    }
}
