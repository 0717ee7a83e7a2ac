//! plot-fog-freq - Plot on how many days how many stations reported fog.
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
        "plot-fog-freq",
        "Plot on how many days how many stations reported fog.",
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
            .help("Output file, defaults to fogs_per_day.png in the plot directory."),
    );

    let (common, matches) = CommonCmdLineArgs::matches(app)?;
    logging::init_stderr(common.verbosity())?;

    let db = matches
        .get_one::<PathBuf>("db")
        .cloned()
        .unwrap_or_else(|| cache::store_location(common.cache_dir()));

    let vis = Visualiser::from_store(&db, &common.plot_root())
        .with_context(|| format!("reading {}", db.display()))?;
    let out = vis.plot_fog_frequency(matches.get_one::<PathBuf>("out").map(PathBuf::as_path))?;

    println!("{}", out.display());
    Ok(())
}
