//! get-nwp - Request ICON data for NWCSAF from SKY.
use anyhow::{Context, Error};
use clap::Arg;
use fogtools::{
    cmd_line::{parse_timestamp, CommonCmdLineArgs},
    logging, sky, FogToolsErr,
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
    let app = CommonCmdLineArgs::new_app("get-nwp", "Request ICON data for NWCSAF from SKY.")
        .arg(
            Arg::new("date")
                .required(true)
                .help("Start of the ICON run to get, e.g. 2019-01-05T06:00."),
        );

    let (common, matches) = CommonCmdLineArgs::matches(app)?;
    logging::init_stderr(common.verbosity())?;
    let config = common.config();

    let t = parse_timestamp(matches.get_one::<String>("date").context("missing date")?)?;
    sky::verify_period(t)?;

    let safnwc = match config.safnwc() {
        Ok(safnwc) => safnwc,
        Err(FogToolsErr::MissingEnvVar(_)) => {
            eprintln!("Environment variable SAFNWC not set, exiting");
            ::std::process::exit(1);
        }
        Err(err) => return Err(err.into()),
    };

    for file in sky::get_and_send(safnwc, t, &config.sky_command)? {
        println!("{}", file.display());
    }

    Ok(())
}
