//! plot-fog-joint-hist - Plot the joint distribution of visibility and dew point depression.
use std::path::PathBuf;

use anyhow::{Context, Error};
use clap::{value_parser, Arg};
use fogtools::{cache, cmd_line::CommonCmdLineArgs, logging, Visualiser};

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
        "plot-fog-joint-hist",
        "Plot the joint distribution of visibility and dew point depression.",
    )
    .arg(
        Arg::new("db")
            .long("db")
            .value_name("FILE")
            .value_parser(value_parser!(PathBuf))
            .help("Measurement store, defaults to the one in the cache directory."),
    )
    .arg(
        Arg::new("out")
            .long("out")
            .value_name("FILE")
            .value_parser(value_parser!(PathBuf))
            .help("Output file, defaults to dewpoint_2dhist.png in the plot directory."),
    );

    let (common, matches) = CommonCmdLineArgs::matches(app)?;
    logging::init_stderr(common.verbosity())?;

    let db = matches
        .get_one::<PathBuf>("db")
        .cloned()
        .unwrap_or_else(|| cache::store_location(common.cache_dir()));

    let vis = Visualiser::from_store(&db, &common.plot_root())
        .with_context(|| format!("reading {}", db.display()))?;
    let out = vis.plot_fog_dt_hist(matches.get_one::<PathBuf>("out").map(PathBuf::as_path))?;

    println!("{}", out.display());
    Ok(())
}
