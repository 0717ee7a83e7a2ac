//! Counting how often and where fog was reported.

use std::collections::{BTreeMap, HashSet};

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

use super::Observation;

/// Default maximum visibility in metres to count as fog.
pub const DEFAULT_MAX_VIS: u32 = 150;

/// Time periods observations can be grouped by.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, EnumIter)]
pub enum Period {
    /// Clock hours
    #[strum(serialize = "H")]
    Hour,
    /// Calendar days
    #[strum(serialize = "D")]
    Day,
    /// Calendar months
    #[strum(serialize = "M")]
    Month,
}

impl Period {
    /// The start of the period containing `t`.
    pub fn start_of(self, t: NaiveDateTime) -> NaiveDateTime {
        let nanos = Duration::nanoseconds(i64::from(t.nanosecond()));
        let into_hour = Duration::seconds(i64::from(t.minute() * 60 + t.second())) + nanos;
        let into_day = Duration::seconds(i64::from(t.num_seconds_from_midnight())) + nanos;

        match self {
            Period::Hour => t - into_hour,
            Period::Day => t - into_day,
            Period::Month => t - into_day - Duration::days(i64::from(t.day0())),
        }
    }

    /// Human readable label for the period starting at `start`.
    pub fn label(self, start: NaiveDateTime) -> String {
        let fmt = match self {
            Period::Hour => "%Y-%m-%d %H:00",
            Period::Day => "%Y-%m-%d",
            Period::Month => "%Y-%m",
        };
        start.format(fmt).to_string()
    }
}

/// Order in which ranked periods are listed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumString, IntoStaticStr, EnumIter)]
pub enum SortOrder {
    /// Least foggy first
    #[strum(serialize = "A")]
    Ascending,
    /// Most foggy first
    #[strum(serialize = "D")]
    Descending,
}

fn is_fog(o: &Observation, max_vis: u32) -> bool {
    o.vis > 0 && o.vis < max_vis
}

/// For every period with fog, the number of distinct stations reporting `0 < vis < max_vis` at
/// least once.
pub fn count_fogs_per_period(
    obs: &[Observation],
    max_vis: u32,
    period: Period,
) -> BTreeMap<NaiveDateTime, usize> {
    count_stations(obs.iter().filter(|o| is_fog(o, max_vis)), period)
}

/// Number of stations per calendar day registering fog.
pub fn count_fogs_per_day(obs: &[Observation], max_vis: u32) -> BTreeMap<NaiveDate, usize> {
    count_fogs_per_period(obs, max_vis, Period::Day)
        .into_iter()
        .map(|(start, n)| (start.date(), n))
        .collect()
}

/// For every period, the number of distinct stations with any observation.
pub fn count_reporting_per_period(
    obs: &[Observation],
    period: Period,
) -> BTreeMap<NaiveDateTime, usize> {
    count_stations(obs.iter(), period)
}

fn count_stations<'a>(
    obs: impl Iterator<Item = &'a Observation>,
    period: Period,
) -> BTreeMap<NaiveDateTime, usize> {
    let pairs: HashSet<(NaiveDateTime, &str)> = obs
        .map(|o| (period.start_of(o.date), o.station.as_str()))
        .collect();

    let mut counts = BTreeMap::new();
    for (start, _) in pairs {
        *counts.entry(start).or_insert(0) += 1;
    }
    counts
}

/// How many days had fog at `k` or more stations, for every `k` from 1 up to the most stations
/// foggy on a single day.
pub fn days_with_at_least(per_day: &BTreeMap<NaiveDate, usize>) -> Vec<(usize, usize)> {
    let max = per_day.values().copied().max().unwrap_or(0);

    (1..=max)
        .map(|k| (k, per_day.values().filter(|n| **n >= k).count()))
        .collect()
}

/// Selection criteria for [`rank_fog_periods`].
#[derive(Clone, Copy, Debug)]
pub struct RankOptions {
    /// Number of periods to return
    pub n: usize,
    /// Maximum visibility in metres to count as fog
    pub max_vis: u32,
    /// How to group observations
    pub period: Period,
    /// Sort order
    pub order: SortOrder,
    /// Minimum percentage of all stations in the data that reported during the period
    pub min_availability: f64,
}

impl Default for RankOptions {
    fn default() -> Self {
        RankOptions {
            n: 20,
            max_vis: 1000,
            period: Period::Day,
            order: SortOrder::Descending,
            min_availability: 0.0,
        }
    }
}

/// Fog statistics for one period.
#[derive(Clone, Debug, PartialEq)]
pub struct FogCount {
    /// Start of the period
    pub start: NaiveDateTime,
    /// Stations reporting fog
    pub foggy: usize,
    /// Stations reporting anything
    pub reporting: usize,
    /// Reporting stations as a percentage of all stations
    pub availability: f64,
}

/// Rank periods by the number of stations reporting fog.
pub fn rank_fog_periods(obs: &[Observation], opts: &RankOptions) -> Vec<FogCount> {
    let n_stations = obs
        .iter()
        .map(|o| o.station.as_str())
        .collect::<HashSet<_>>()
        .len();
    let foggy = count_fogs_per_period(obs, opts.max_vis, opts.period);
    let reporting = count_reporting_per_period(obs, opts.period);

    let mut counts: Vec<FogCount> = foggy
        .into_iter()
        .map(|(start, foggy)| {
            let reporting = reporting.get(&start).copied().unwrap_or(foggy);
            FogCount {
                start,
                foggy,
                reporting,
                availability: 100.0 * reporting as f64 / n_stations as f64,
            }
        })
        .filter(|cnt| cnt.availability >= opts.min_availability)
        .collect();

    // Ties are broken chronologically in both orders.
    counts.sort_by(|a, b| match opts.order {
        SortOrder::Descending => b.foggy.cmp(&a.foggy).then(a.start.cmp(&b.start)),
        SortOrder::Ascending => a.foggy.cmp(&b.foggy).then(a.start.cmp(&b.start)),
    });
    counts.truncate(opts.n);
    counts
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
