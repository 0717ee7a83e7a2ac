//! Tools related to the USGS 1 arc-second digital elevation model.

use std::{
    ops::Range,
    path::{Path, PathBuf},
    str::FromStr,
};

use strum::IntoEnumIterator;
use strum_macros::{EnumIter, IntoStaticStr};
use tracing::{debug, warn};

use crate::{
    errors::FogToolsErr,
    transport::{download_to, Fetch},
};

/// Files USGS provides for every tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum DemFileType {
    /// The elevation data itself
    Tif,
    /// Quick look
    Jpg,
    /// Metadata
    Xml,
    /// Footprint as a GeoPackage
    Gpkg,
}

impl FromStr for DemFileType {
    type Err = FogToolsErr;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DemFileType::iter()
            .find(|tp| <&'static str>::from(*tp) == s)
            .ok_or_else(|| FogToolsErr::InvalidDemType(s.to_owned()))
    }
}

/// Label of the tile whose north-west corner is at (`lat`, `lon`), such as `n42w072`.
pub fn get_loc_lab(lat: i32, lon: i32) -> String {
    format!(
        "{}{:02}{}{:03}",
        if lat > 0 { 'n' } else { 's' },
        lat.abs(),
        if lon > 0 { 'e' } else { 'w' },
        lon.abs()
    )
}

/// Directory on the server containing all files for a tile.
pub fn get_src_uri_dir(base_url: &str, lat: i32, lon: i32) -> String {
    format!(
        "{}/{}/",
        base_url.trim_end_matches('/'),
        get_loc_lab(lat, lon)
    )
}

/// File name on the server for one file of a tile.
pub fn get_src_uri_filename(lat: i32, lon: i32, tp: DemFileType) -> String {
    let lab = get_loc_lab(lat, lon);
    match tp {
        DemFileType::Gpkg => format!("{}.gpkg", lab),
        other => format!("USGS_1_{}.{}", lab, <&'static str>::from(other)),
    }
}

/// URIs of all four files of a tile: tif, jpg, xml, gpkg.
pub fn get_src_uris(base_url: &str, lat: i32, lon: i32) -> Vec<String> {
    let d = get_src_uri_dir(base_url, lat, lon);
    DemFileType::iter()
        .map(|tp| d.clone() + &get_src_uri_filename(lat, lon, tp))
        .collect()
}

/// Local directory for the files of a tile.
pub fn get_out_dir(lat: i32, lon: i32, basedir_out: &Path) -> PathBuf {
    basedir_out.join(get_loc_lab(lat, lon))
}

/// Downloads DEM tiles from USGS.
pub struct DemDownloader<'a, F: Fetch + ?Sized> {
    fetch: &'a F,
    base_url: String,
}

impl<'a, F: Fetch + ?Sized> DemDownloader<'a, F> {
    /// Create a new downloader fetching from `base_url`.
    pub fn new(fetch: &'a F, base_url: &str) -> Self {
        DemDownloader {
            fetch,
            base_url: base_url.to_owned(),
        }
    }

    /// Download the files of one tile into `out_dir`. Returns the files written.
    ///
    /// Tiles that only cover water do not exist on the server; those are skipped with a warning.
    pub fn dl_usgs_dem(
        &self,
        lat: i32,
        lon: i32,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, FogToolsErr> {
        let mut written = vec![];

        for src_uri in get_src_uris(&self.base_url, lat, lon) {
            let file_name = src_uri.rsplit('/').next().unwrap_or(&src_uri);
            let dest = out_dir.join(file_name);

            debug!("Downloading {} to {}", src_uri, dest.display());
            if download_to(self.fetch, &src_uri, &dest)? {
                written.push(dest);
            } else {
                warn!("Not available: {}", src_uri);
            }
        }

        Ok(written)
    }

    /// Download all tiles with north-west corners in the half-open ranges.
    pub fn dl_usgs_dem_in_range(
        &self,
        lats: Range<i32>,
        lons: Range<i32>,
        basedir_out: &Path,
    ) -> Result<Vec<PathBuf>, FogToolsErr> {
        let mut written = vec![];

        for lat in lats {
            for lon in lons.clone() {
                let out_dir = get_out_dir(lat, lon, basedir_out);
                written.extend(self.dl_usgs_dem(lat, lon, &out_dir)?);
            }
        }

        Ok(written)
    }
}

/// Label of the tile containing the point (`lat`, `lon`).
///
/// USGS names tiles after their north-west corner.
pub fn tile_for_point(lat: f64, lon: f64) -> (i32, i32) {
    (lat.ceil() as i32, lon.floor() as i32)
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
