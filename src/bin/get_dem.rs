//! get-dem - Download USGS 1 arc-second DEM tiles.
use std::path::PathBuf;

use anyhow::{Context, Error};
use clap::{value_parser, Arg};
use fogtools::{cmd_line::CommonCmdLineArgs, dem::DemDownloader, logging, HttpFetcher};

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
    let app = CommonCmdLineArgs::new_app("get-dem", "Download USGS 1 arc-second DEM tiles.")
        .arg(
            Arg::new("latrange")
                .long("latrange")
                .num_args(2)
                .value_names(["START", "END"])
                .default_values(["38", "49"])
                .allow_negative_numbers(true)
                .value_parser(value_parser!(i32))
                .help("Latitude range to download, end excluded."),
        )
        .arg(
            Arg::new("lonrange")
                .long("lonrange")
                .num_args(2)
                .value_names(["START", "END"])
                .default_values(["-82", "-66"])
                .allow_negative_numbers(true)
                .value_parser(value_parser!(i32))
                .help("Longitude range to download, end excluded."),
        )
        .arg(
            Arg::new("outdir")
                .long("outdir")
                .default_value(".")
                .value_parser(value_parser!(PathBuf))
                .help("Directory to download to."),
        );

    let (common, matches) = CommonCmdLineArgs::matches(app)?;
    logging::init_stderr(common.verbosity())?;

    let range = |name: &str| -> Result<std::ops::Range<i32>, Error> {
        let vals: Vec<i32> = matches
            .get_many::<i32>(name)
            .with_context(|| format!("missing {}", name))?
            .copied()
            .collect();
        match vals[..] {
            [start, end] => Ok(start..end),
            _ => anyhow::bail!("{} takes two values", name),
        }
    };
    let outdir = matches
        .get_one::<PathBuf>("outdir")
        .context("missing outdir")?;

    let fetcher = HttpFetcher::new()?;
    let downloader = DemDownloader::new(&fetcher, &common.config().dem_base_url);
    let written = downloader.dl_usgs_dem_in_range(range("latrange")?, range("lonrange")?, outdir)?;

    println!("Downloaded {} files to {}", written.len(), outdir.display());
    Ok(())
}
