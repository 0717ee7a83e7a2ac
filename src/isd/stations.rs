//! The ISD station list.

use std::{
    ops::RangeInclusive,
    path::{Path, PathBuf},
    str::FromStr,
};

use chrono::{Datelike, NaiveDate};
use tracing::{debug, info};

use super::{StateProv, NEW_ENGLAND_AND_NY};
use crate::{
    errors::FogToolsErr,
    transport::{download_to, Fetch},
};

const BUNDLED_HISTORY: &str = include_str!("../../data/isd-history.txt");
const HISTORY_FILE: &str = "isd-history.txt";

/// One entry of the ISD station history.
#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq)]
pub struct Station {
    pub usaf: String,
    pub wban: String,
    pub name: String,
    pub ctry: Option<String>,
    /// Raw content of the ST column, which is not always a known state.
    pub st: Option<String>,
    pub call: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub elev: Option<f64>,
    pub begin: NaiveDate,
    pub end: NaiveDate,
}

impl Station {
    /// Identifier used for the files in the AWS bucket, USAF followed by WBAN.
    pub fn id(&self) -> String {
        format!("{}{}", self.usaf, self.wban)
    }

    /// The state or province, if it is one we know about.
    pub fn state(&self) -> Option<StateProv> {
        self.st.as_deref().and_then(|st| StateProv::from_str(st).ok())
    }

    /// The years in which this station reported and which overlap with `start..=end`.
    ///
    /// Empty if there is no overlap.
    pub fn years_in(&self, start: NaiveDate, end: NaiveDate) -> RangeInclusive<i32> {
        self.begin.max(start).year()..=self.end.min(end).year()
    }
}

/// Parse the fixed-width station history as distributed by NCEI.
pub fn parse_station_list(text: &str) -> Result<Vec<Station>, FogToolsErr> {
    let lines: Vec<&str> = text.lines().collect();

    // The legend in the preamble repeats the column header, the table starts after the last one.
    let header = lines
        .iter()
        .rposition(|line| line.starts_with("USAF") && line.contains("WBAN"))
        .ok_or_else(|| FogToolsErr::StationList("no header line".to_owned()))?;

    lines[header + 1..]
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| parse_station_line(line))
        .collect()
}

fn parse_station_line(line: &str) -> Result<Station, FogToolsErr> {
    let required = |first, last, what: &str| -> Result<String, FogToolsErr> {
        let val = field(line, first, last)?;
        if val.is_empty() {
            Err(FogToolsErr::StationList(format!("missing {}: {}", what, line)))
        } else {
            Ok(val.to_owned())
        }
    };
    let optional = |first, last| -> Result<Option<String>, FogToolsErr> {
        let val = field(line, first, last)?;
        Ok(if val.is_empty() {
            None
        } else {
            Some(val.to_owned())
        })
    };
    let number = |first, last| -> Result<Option<f64>, FogToolsErr> {
        optional(first, last)?
            .map(|val| {
                val.parse::<f64>()
                    .map_err(|_| FogToolsErr::StationList(format!("bad number {}: {}", val, line)))
            })
            .transpose()
    };

    Ok(Station {
        usaf: required(1, 6, "USAF")?,
        wban: required(8, 12, "WBAN")?,
        name: field(line, 14, 43)?.to_owned(),
        ctry: optional(44, 45)?,
        st: optional(49, 50)?,
        call: optional(52, 55)?,
        lat: number(58, 64)?,
        lon: number(66, 73)?,
        elev: number(75, 81)?,
        begin: NaiveDate::parse_from_str(&required(83, 90, "BEGIN")?, "%Y%m%d")?,
        end: NaiveDate::parse_from_str(&required(92, 99, "END")?, "%Y%m%d")?,
    })
}

// Columns are 1-based and inclusive; short lines are padded with nothing.
fn field(line: &str, first: usize, last: usize) -> Result<&str, FogToolsErr> {
    let start = (first - 1).min(line.len());
    let end = last.min(line.len());

    line.get(start..end)
        .map(str::trim)
        .ok_or_else(|| FogToolsErr::StationList(format!("not fixed width: {}", line)))
}

/// The copy of the station history compiled into the library.
pub fn bundled_stations() -> Result<Vec<Station>, FogToolsErr> {
    parse_station_list(BUNDLED_HISTORY)
}

/// Load the station history, preferring a copy downloaded into the cache over the bundled one.
pub fn load_stations(cache_dir: &Path) -> Result<Vec<Station>, FogToolsErr> {
    let cached = cache_dir.join(HISTORY_FILE);

    if cached.is_file() {
        debug!("Reading station list from {}", cached.display());
        parse_station_list(&std::fs::read_to_string(&cached)?)
    } else {
        debug!("Using bundled station list");
        bundled_stations()
    }
}

/// Download a fresh copy of the station history into the cache.
pub fn update_station_list<F: Fetch + ?Sized>(
    fetch: &F,
    url: &str,
    cache_dir: &Path,
) -> Result<PathBuf, FogToolsErr> {
    let dest = cache_dir.join(HISTORY_FILE);
    info!("Updating station list from {}", url);

    if !download_to(fetch, url, &dest)? {
        return Err(FogToolsErr::HttpStatus {
            url: url.to_owned(),
            status: 404,
        });
    }

    // Refuse to keep something we could not use later.
    if let Err(err) = parse_station_list(&std::fs::read_to_string(&dest)?) {
        std::fs::remove_file(&dest)?;
        return Err(err);
    }

    Ok(dest)
}

/// Select stations located in one of `states` that reported after `active_after`.
pub fn select_stations(
    stations: &[Station],
    states: &[StateProv],
    active_after: NaiveDate,
) -> Vec<Station> {
    stations
        .iter()
        .filter(|stn| stn.state().map(|st| states.contains(&st)).unwrap_or(false))
        .filter(|stn| stn.end > active_after)
        .cloned()
        .collect()
}

/// Stations in New England and New York that were still reporting in 2020.
pub fn default_stations(cache_dir: &Path) -> Result<Vec<Station>, FogToolsErr> {
    let active_after =
        NaiveDate::from_ymd_opt(2020, 1, 1).ok_or(FogToolsErr::LogicError("valid date"))?;

    Ok(select_stations(
        &load_stations(cache_dir)?,
        &NEW_ENGLAND_AND_NY,
        active_after,
    ))
}

/// Count how many station·years of data exist between `start` and `end`, inclusive.
pub fn count_station_years(stations: &[Station], start: NaiveDate, end: NaiveDate) -> usize {
    stations
        .iter()
        .map(|stn| stn.years_in(start, end).count())
        .sum()
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
