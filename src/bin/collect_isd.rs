//! collect-isd - Collect ISD observations for New England and New York into a measurement store.
use std::path::PathBuf;

use anyhow::{Context, Error};
use clap::{value_parser, Arg, ArgAction};
use fogtools::{
    cache,
    cmd_line::{parse_date, CommonCmdLineArgs},
    isd::{default_stations, update_station_list, IsdClient},
    logging, HttpFetcher,
};

fn main() {
    if let Err(ref e) = run() {
        eprintln!("error: {}", e);

        for cause in e.chain().skip(1) {
            eprintln!("caused by: {}", cause);
        }

        ::std::process::exit(1);
    }
}

fn run() -> Result<(), Error> {
    let app = CommonCmdLineArgs::new_app(
        "collect-isd",
        "Collect ISD observations for New England and New York into a measurement store.",
    )
    .arg(
        Arg::new("out")
            .long("out")
            .value_name("FILE")
            .value_parser(value_parser!(PathBuf))
            .help("Where to write the store.")
            .long_help("Where to write the store. Defaults to store.db in the cache directory."),
    )
    .arg(
        Arg::new("start")
            .long("start")
            .default_value("2017-01-01")
            .help("Starting date for measurements."),
    )
    .arg(
        Arg::new("end")
            .long("end")
            .default_value("2020-12-31")
            .help("Ending date for measurements."),
    )
    .arg(
        Arg::new("update-stations")
            .long("update-stations")
            .action(ArgAction::SetTrue)
            .help("Download a fresh copy of the ISD station list first."),
    );

    let (common, matches) = CommonCmdLineArgs::matches(app)?;
    logging::init_stderr(common.verbosity())?;
    let config = common.config();
    let cache_dir = common.cache_dir();

    let start = parse_date(matches.get_one::<String>("start").context("missing start")?)?;
    let end = parse_date(matches.get_one::<String>("end").context("missing end")?)?;
    let out = matches
        .get_one::<PathBuf>("out")
        .cloned()
        .unwrap_or_else(|| cache::store_location(cache_dir));

    let fetcher = HttpFetcher::new()?;
    if matches.get_flag("update-stations") {
        update_station_list(&fetcher, &config.isd_history_url, cache_dir)?;
    }

    let stations = default_stations(cache_dir)?;
    let client = IsdClient::new(&fetcher, &config.isd_bucket_url, cache_dir);
    let stored = client
        .create_db(&out, &stations, start, end)
        .with_context(|| format!("building {}", out.display()))?;

    println!("Stored {} observations in {}", stored, out.display());
    Ok(())
}
