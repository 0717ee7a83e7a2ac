//! abi-download - Download a day of GOES-16 ABI data into the cache.
use anyhow::{Context, Error};
use clap::{value_parser, Arg, ArgAction};
use fogtools::{
    abi::{AbiDownloader, Sector},
    cmd_line::{parse_date, CommonCmdLineArgs},
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
        "abi-download",
        "Download a day of GOES-16 ABI data into the cache.",
    )
    .arg(
        Arg::new("date")
            .required(true)
            .help("Date to download."),
    )
    .arg(
        Arg::new("channels")
            .required(true)
            .num_args(1..)
            .value_parser(value_parser!(u8).range(1..=16))
            .help("Channels to download."),
    )
    .arg(
        Arg::new("type")
            .long("type")
            .action(ArgAction::Append)
            .value_parser(["C", "F", "M"])
            .help("Download 'C'ONUS, 'F'ull disk, or 'M'esoscale. Defaults to C.")
            .long_help(concat!(
                "Download 'C'ONUS, 'F'ull disk, or 'M'esoscale. Repeat for several sectors, ",
                "defaults to C."
            )),
    );

    let (common, matches) = CommonCmdLineArgs::matches(app)?;
    logging::init_stderr(common.verbosity())?;

    let date = parse_date(matches.get_one::<String>("date").context("missing date")?)?;
    let channels: Vec<u8> = matches
        .get_many::<u8>("channels")
        .context("missing channels")?
        .copied()
        .collect();
    let mut sectors = vec![];
    for tp in matches.get_many::<String>("type").into_iter().flatten() {
        sectors.extend(Sector::parse_list(tp)?);
    }
    if sectors.is_empty() {
        sectors.push(Sector::Conus);
    }

    let fetcher = HttpFetcher::new()?;
    let downloader = AbiDownloader::new(
        &fetcher,
        &common.config().goes_bucket_url,
        common.cache_dir(),
    );
    let files = downloader.download_abi_day(date, &channels, &sectors)?;

    println!("Downloaded {} files to {}", files.len(), common.cache_dir().display());
    Ok(())
}
