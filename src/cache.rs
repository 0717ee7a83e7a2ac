//! Locations on disk for cached downloads and generated plots.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::errors::FogToolsErr;

const CACHE_SUBDIR: &str = "fogtools";

/// Get (and create, if necessary) the directory to use for caching.
///
/// The cache lives in a `fogtools` directory below `base`. If `base` is not given, use
/// `$XDG_CACHE_HOME` or otherwise `~/.cache`.
pub fn cache_dir(base: Option<&Path>) -> Result<PathBuf, FogToolsErr> {
    let cache_root = match base {
        Some(base) => base.to_path_buf(),
        None => default_cache_root()?,
    };

    let cache_dir = cache_root.join(CACHE_SUBDIR);
    std::fs::create_dir_all(&cache_dir)?;

    Ok(cache_dir)
}

fn default_cache_root() -> Result<PathBuf, FogToolsErr> {
    if let Some(xdg) = std::env::var_os("XDG_CACHE_HOME").filter(|val| !val.is_empty()) {
        return Ok(PathBuf::from(xdg));
    }

    dirs::home_dir()
        .map(|home| home.join(".cache"))
        .ok_or(FogToolsErr::LogicError("unable to determine home directory"))
}

/// Get (and create, if necessary) the directory where plots for `date` are written.
pub fn plot_dir(root: &Path, date: NaiveDate) -> Result<PathBuf, FogToolsErr> {
    let pd = root.join(date.format("%Y/%m/%d").to_string());
    std::fs::create_dir_all(&pd)?;
    Ok(pd)
}

/// Get the default location of the ISD measurement store.
pub fn store_location(cache_dir: &Path) -> PathBuf {
    cache_dir.join("store.db")
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
