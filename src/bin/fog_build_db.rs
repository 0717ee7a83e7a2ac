//! fog-build-db - Build the fog database.
use std::path::PathBuf;

use anyhow::{Context, Error};
use clap::{value_parser, Arg, ArgAction};
use fogtools::{
    cmd_line::{parse_timestamp, CommonCmdLineArgs},
    logging, FogDB, HttpFetcher,
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
    let app = CommonCmdLineArgs::new_app("fog-build-db", "Build the fog database.")
        .arg(
            Arg::new("out")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("Where to store the fog database."),
        )
        .arg(
            Arg::new("date")
                .long("date")
                .required(true)
                .num_args(1..)
                .action(ArgAction::Append)
                .help("Add these times to the fog database, e.g. 2019-01-05T12:00."),
        );

    let (common, matches) = CommonCmdLineArgs::matches(app)?;
    logging::init_stderr(common.verbosity())?;

    let out = matches.get_one::<PathBuf>("out").context("missing out")?;
    let dates = matches
        .get_many::<String>("date")
        .context("missing date")?
        .map(|s| parse_timestamp(s))
        .collect::<Result<Vec<_>, _>>()?;

    let fetcher = HttpFetcher::new()?;
    let mut fogdb = FogDB::new(&fetcher, common.config(), common.cache_dir())?;
    fogdb.set_stderr_level(logging::verbosity_level(common.verbosity()));

    for t in dates {
        let n = fogdb
            .extend(t)
            .with_context(|| format!("adding case {}", t))?;
        println!("{}: {} stations", t, n);
    }

    let n = fogdb.store(out)?;
    println!("Stored {} records in {}", n, out.display());
    Ok(())
}
