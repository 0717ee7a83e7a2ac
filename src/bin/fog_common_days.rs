//! fog-common-days - List the periods in which the most stations reported fog.
use std::path::PathBuf;

use anyhow::{Context, Error};
use clap::{value_parser, Arg};
use fogtools::{
    cache,
    cmd_line::CommonCmdLineArgs,
    isd::{rank_fog_periods, read_db, Period, RankOptions, SortOrder},
    logging,
    table::{fog_count_table, TableFormat},
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
    // -v is the visibility threshold here, verbosity is only available as --verbose.
    let app = CommonCmdLineArgs::new_app(
        "fog-common-days",
        "List the periods in which the most stations reported fog.",
    )
    .mut_arg("verbose", |arg| arg.short(None))
    .arg(
        Arg::new("n")
            .short('n')
            .default_value("20")
            .value_parser(value_parser!(usize))
            .help("Number of periods to list."),
    )
    .arg(
        Arg::new("max-vis")
            .short('v')
            .long("max-vis")
            .default_value("1000")
            .value_parser(value_parser!(u32))
            .help("Maximum visibility in metres to count as fog."),
    )
    .arg(
        Arg::new("period")
            .short('p')
            .long("period")
            .default_value("D")
            .value_parser(["H", "D", "M"])
            .help("Group by 'H'our, 'D'ay or 'M'onth."),
    )
    .arg(
        Arg::new("sort")
            .short('s')
            .long("sort")
            .default_value("D")
            .value_parser(["A", "D"])
            .help("Sort 'A'scending or 'D'escending by number of foggy stations."),
    )
    .arg(
        Arg::new("availability")
            .short('a')
            .long("availability")
            .default_value("0")
            .value_parser(value_parser!(f64))
            .help("Minimum percentage of stations that reported in the period."),
    )
    .arg(
        Arg::new("format")
            .short('f')
            .long("format")
            .default_value("markdown")
            .value_parser(["markdown", "csv"])
            .help("Output format."),
    )
    .arg(
        Arg::new("db")
            .long("db")
            .value_name("FILE")
            .value_parser(value_parser!(PathBuf))
            .help("Measurement store, defaults to the one in the cache directory."),
    );

    let (common, matches) = CommonCmdLineArgs::matches(app)?;
    logging::init_stderr(common.verbosity())?;

    let defaults = RankOptions::default();
    let opts = RankOptions {
        n: matches.get_one::<usize>("n").copied().unwrap_or(defaults.n),
        max_vis: matches
            .get_one::<u32>("max-vis")
            .copied()
            .unwrap_or(defaults.max_vis),
        period: matches
            .get_one::<String>("period")
            .context("missing period")?
            .parse::<Period>()?,
        order: matches
            .get_one::<String>("sort")
            .context("missing sort order")?
            .parse::<SortOrder>()?,
        min_availability: matches
            .get_one::<f64>("availability")
            .copied()
            .unwrap_or(defaults.min_availability),
    };
    let format: TableFormat = matches
        .get_one::<String>("format")
        .context("missing format")?
        .parse()?;

    let db = matches
        .get_one::<PathBuf>("db")
        .cloned()
        .unwrap_or_else(|| cache::store_location(common.cache_dir()));
    let obs = read_db(&db).with_context(|| format!("reading {}", db.display()))?;

    let counts = rank_fog_periods(&obs, &opts);
    print!("{}", fog_count_table(&counts, opts.period).render(format)?);

    Ok(())
}
