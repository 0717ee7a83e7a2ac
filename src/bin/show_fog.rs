//! show-fog - Blend a fog mask onto a background image.
use std::path::PathBuf;

use anyhow::{Context, Error};
use clap::{value_parser, Arg};
use fogtools::{area, cmd_line::CommonCmdLineArgs, logging, vis::blend_fog};
use tracing::{debug, info};

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
    let app = CommonCmdLineArgs::new_app("show-fog", "Blend a fog mask onto a background image.")
        .arg(
            Arg::new("background")
                .long("background")
                .required(true)
                .value_name("PNG")
                .value_parser(value_parser!(PathBuf))
                .help("Background composite, already on the target area."),
        )
        .arg(
            Arg::new("fog-mask")
                .long("fog-mask")
                .required(true)
                .value_name("PNG")
                .value_parser(value_parser!(PathBuf))
                .help("Alpha band of the fog product as a grey scale image."),
        )
        .arg(
            Arg::new("area")
                .short('a')
                .long("area")
                .default_value(area::DEFAULT_AREA)
                .help("Area for which to generate the image."),
        )
        .arg(
            Arg::new("outfile")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("Output file."),
        );

    let (common, matches) = CommonCmdLineArgs::matches(app)?;
    logging::init_stderr(common.verbosity())?;

    let area_name = matches
        .get_one::<String>("area")
        .map(String::as_str)
        .unwrap_or(area::DEFAULT_AREA);
    let area = area::get_area(area_name)?;
    let (dx, dy) = area.pixel_size();
    debug!(
        "Area {}: {}, {:.0} x {:.0} pixels of {} x {}",
        area_name,
        area.proj_string(),
        dx,
        dy,
        area.shape.width,
        area.shape.height
    );

    let background_path = matches
        .get_one::<PathBuf>("background")
        .context("missing background")?;
    let mask_path = matches
        .get_one::<PathBuf>("fog-mask")
        .context("missing fog mask")?;
    let outfile = matches
        .get_one::<PathBuf>("outfile")
        .context("missing output file")?;

    let background = image::open(background_path)
        .with_context(|| format!("reading {}", background_path.display()))?
        .to_rgba8();
    let mask = image::open(mask_path)
        .with_context(|| format!("reading {}", mask_path.display()))?
        .to_luma8();

    area.check_shape(background.width(), background.height())
        .with_context(|| format!("background does not match area {}", area_name))?;

    let blended = blend_fog(&background, &mask)?;
    blended
        .save(outfile)
        .with_context(|| format!("writing {}", outfile.display()))?;

    info!("Wrote {}", outfile.display());
    Ok(())
}
