//! Statistical plots of the ground observations.
//!
//! Plots are written as PNG with a CSV next to them holding the plotted numbers.
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::info;

use crate::{
    cache::plot_dir,
    errors::FogToolsErr,
    isd::{count_fogs_per_day, days_with_at_least, read_db, Observation},
    vis::Colormap,
};

mod canvas;

use self::canvas::{Axes, PALETTE};

/// Visibility thresholds, in metres, for the fog frequency plot.
pub const FREQUENCY_MAX_VIS: [u32; 4] = [250, 500, 750, 1000];

/// Visibility range of the joint histogram.
pub const HIST_VIS_RANGE: (f64, f64) = (0.0, 10000.0);
/// Dew point depression range of the joint histogram.
pub const HIST_DT_RANGE: (f64, f64) = (0.0, 10.0);
/// Bins per axis of the joint histogram.
pub const HIST_BINS: usize = 50;

/// Number of days with fog at `k` or more stations, for one visibility threshold.
#[derive(Clone, Debug, PartialEq)]
pub struct FrequencySeries {
    /// Visibility threshold in metres.
    pub max_vis: u32,
    /// (stations, days) pairs with increasing number of stations.
    pub points: Vec<(usize, usize)>,
}

/// Counts on a regular 2-D grid.
#[derive(Clone, Debug, PartialEq)]
pub struct Histogram2d {
    /// Range covered along x.
    pub x_range: (f64, f64),
    /// Range covered along y.
    pub y_range: (f64, f64),
    /// Number of bins along x.
    pub nx: usize,
    /// Number of bins along y.
    pub ny: usize,
    /// Counts, row by row starting at the lowest y.
    pub counts: Vec<u64>,
}

impl Histogram2d {
    /// Bin the points; points outside the ranges are dropped.
    pub fn new(
        points: impl IntoIterator<Item = (f64, f64)>,
        x_range: (f64, f64),
        y_range: (f64, f64),
        nx: usize,
        ny: usize,
    ) -> Self {
        let mut counts = vec![0; nx * ny];
        let bin = |v: f64, (lo, hi): (f64, f64), n: usize| -> Option<usize> {
            if !(lo..=hi).contains(&v) || hi <= lo {
                return None;
            }
            // The upper edge belongs to the last bin.
            Some((((v - lo) / (hi - lo) * n as f64) as usize).min(n - 1))
        };

        if nx > 0 && ny > 0 {
            for (x, y) in points {
                if let (Some(i), Some(j)) = (bin(x, x_range, nx), bin(y, y_range, ny)) {
                    counts[j * nx + i] += 1;
                }
            }
        }

        Histogram2d {
            x_range,
            y_range,
            nx,
            ny,
            counts,
        }
    }

    /// Count in bin (`i`, `j`).
    pub fn get(&self, i: usize, j: usize) -> u64 {
        self.counts[j * self.nx + i]
    }

    /// The largest count.
    pub fn max(&self) -> u64 {
        self.counts.iter().copied().max().unwrap_or(0)
    }

    fn edges(range: (f64, f64), n: usize, i: usize) -> (f64, f64) {
        let width = (range.1 - range.0) / n as f64;
        (range.0 + i as f64 * width, range.0 + (i + 1) as f64 * width)
    }
}

/// Plots of a set of ground observations.
pub struct Visualiser {
    obs: Vec<Observation>,
    plot_root: PathBuf,
}

impl Visualiser {
    /// Plot these observations, by default into dated directories below `plot_root`.
    pub fn new(obs: Vec<Observation>, plot_root: &Path) -> Self {
        Visualiser {
            obs,
            plot_root: plot_root.to_path_buf(),
        }
    }

    /// Plot the contents of a measurement store.
    pub fn from_store(store: &Path, plot_root: &Path) -> Result<Self, FogToolsErr> {
        Ok(Visualiser::new(read_db(store)?, plot_root))
    }

    /// The data for [`Visualiser::plot_fog_frequency`].
    pub fn fog_frequency(&self) -> Vec<FrequencySeries> {
        FREQUENCY_MAX_VIS
            .iter()
            .map(|&max_vis| FrequencySeries {
                max_vis,
                points: days_with_at_least(&count_fogs_per_day(&self.obs, max_vis)),
            })
            .collect()
    }

    /// Plot how many days had fog at how many stations, one line per visibility threshold.
    ///
    /// Returns the path of the PNG file.
    pub fn plot_fog_frequency(&self, out: Option<&Path>) -> Result<PathBuf, FogToolsErr> {
        let out = self.out_path(out, "fogs_per_day.png")?;
        let series = self.fog_frequency();

        let max_x = series
            .iter()
            .flat_map(|s| s.points.iter().map(|p| p.0))
            .max()
            .unwrap_or(1);
        let max_y = series
            .iter()
            .flat_map(|s| s.points.iter().map(|p| p.1))
            .max()
            .unwrap_or(1);

        let mut axes = Axes::new((0.0, max_x as f64), (0.0, max_y as f64), 20.0, true)?;
        let mut legend = vec![];
        for (s, color) in series.iter().zip(PALETTE.iter().cycle()) {
            let points: Vec<(f64, f64)> = s
                .points
                .iter()
                .map(|(k, days)| (*k as f64, *days as f64))
                .collect();
            axes.line(&points, *color);
            legend.push((format!("vis < {}", s.max_vis), *color));
        }
        axes.legend(&legend);

        axes.finish("No. stations", "No. days", None).save(&out)?;

        let mut wtr = csv::Writer::from_path(out.with_extension("csv"))?;
        wtr.write_record(["max_vis", "stations", "days"])?;
        for s in &series {
            for (k, days) in &s.points {
                wtr.write_record(&[s.max_vis.to_string(), k.to_string(), days.to_string()])?;
            }
        }
        wtr.flush()?;

        info!("Wrote fog frequency plot to {}", out.display());
        Ok(out)
    }

    /// The data for [`Visualiser::plot_fog_dt_hist`]: visibility against dew point depression.
    pub fn fog_dt_hist(&self) -> Histogram2d {
        Histogram2d::new(
            self.obs
                .iter()
                .map(|o| (f64::from(o.vis), f64::from(o.dewpoint_depression()))),
            HIST_VIS_RANGE,
            HIST_DT_RANGE,
            HIST_BINS,
            HIST_BINS,
        )
    }

    /// Plot the joint distribution of visibility and dew point depression.
    ///
    /// Empty bins are left blank and the colour scale is logarithmic. Returns the path of the PNG
    /// file.
    pub fn plot_fog_dt_hist(&self, out: Option<&Path>) -> Result<PathBuf, FogToolsErr> {
        let out = self.out_path(out, "dewpoint_2dhist.png")?;
        let hist = self.fog_dt_hist();
        let colormap = Colormap::viridis();

        let log_max = (hist.max().max(1) as f64).ln();
        let level = |count: u64| {
            if log_max > 0.0 {
                (count as f64).ln() / log_max
            } else {
                0.0
            }
        };

        let mut axes = Axes::new(hist.x_range, hist.y_range, 100.0, false)?;
        for j in 0..hist.ny {
            for i in 0..hist.nx {
                let count = hist.get(i, j);
                if count < 1 {
                    continue;
                }
                let (x0, x1) = Histogram2d::edges(hist.x_range, hist.nx, i);
                let (y0, y1) = Histogram2d::edges(hist.y_range, hist.ny, j);
                axes.rect((x0, y0), (x1, y1), colormap.color_at(level(count)));
            }
        }

        let mut ticks = vec![];
        let mut decade = 1u64;
        while decade <= hist.max().max(1) {
            ticks.push((level(decade), decade.to_string()));
            decade *= 10;
        }
        axes.colorbar(|frac| colormap.color_at(frac), &ticks);

        axes.finish(
            "Visibility [m]",
            "T - T_d [K]",
            Some("Joint distribution visibility vs. Δ dewpoint"),
        )
        .save(&out)?;

        let mut wtr = csv::Writer::from_path(out.with_extension("csv"))?;
        wtr.write_record(["vis_min", "vis_max", "dt_min", "dt_max", "count"])?;
        for j in 0..hist.ny {
            for i in 0..hist.nx {
                let count = hist.get(i, j);
                if count > 0 {
                    let (x0, x1) = Histogram2d::edges(hist.x_range, hist.nx, i);
                    let (y0, y1) = Histogram2d::edges(hist.y_range, hist.ny, j);
                    wtr.write_record(&[
                        x0.to_string(),
                        x1.to_string(),
                        y0.to_string(),
                        y1.to_string(),
                        count.to_string(),
                    ])?;
                }
            }
        }
        wtr.flush()?;

        info!("Wrote joint histogram to {}", out.display());
        Ok(out)
    }

    fn out_path(&self, out: Option<&Path>, default_name: &str) -> Result<PathBuf, FogToolsErr> {
        match out {
            Some(out) => {
                if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)?;
                }
                Ok(out.to_path_buf())
            }
            None => Ok(plot_dir(&self.plot_root, Local::now().date_naive())?.join(default_name)),
        }
    }
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
#[cfg(test)]
mod unit {
    use super::*;

    use chrono::NaiveDateTime;
    use image::Rgba;
    use tempfile::TempDir;

    fn obs(station: &str, date: &str, vis: u32, temp: f32, dew: f32) -> Observation {
        Observation {
            station: station.to_owned(),
            name: station.to_owned(),
            date: NaiveDateTime::parse_from_str(date, "%Y-%m-%d %H:%M").unwrap(),
            latitude: None,
            longitude: None,
            elevation: None,
            vis,
            temp,
            dew,
        }
    }

    fn sample() -> Vec<Observation> {
        vec![
            obs("A", "2019-01-01 06:00", 200, 1.0, 0.5),
            obs("B", "2019-01-01 07:00", 600, 2.0, 1.0),
            obs("C", "2019-01-01 08:00", 900, 3.0, 2.5),
            obs("A", "2019-01-02 06:00", 100, 1.0, 1.0),
            obs("B", "2019-01-02 06:00", 8000, 5.0, -1.0),
            obs("C", "2019-01-03 06:00", 20000, 5.0, -10.0),
        ]
    }

    #[test]
    fn test_fog_frequency() {
        let vis = Visualiser::new(sample(), Path::new("/unused"));

        let series = vis.fog_frequency();

        assert_eq!(series.len(), 4);
        assert_eq!(series[0].max_vis, 250);
        assert_eq!(series[0].points, vec![(1, 2)]);
        assert_eq!(series[1].points, vec![(1, 2)]);
        assert_eq!(series[2].points, vec![(1, 2), (2, 1)]);
        assert_eq!(series[3].points, vec![(1, 2), (2, 1), (3, 1)]);
    }

    #[test]
    fn test_plot_fog_frequency() {
        let tmp = TempDir::new().unwrap();
        let vis = Visualiser::new(sample(), tmp.path());

        let out = vis.plot_fog_frequency(None).unwrap();

        let expected_dir = plot_dir(tmp.path(), Local::now().date_naive()).unwrap();
        assert_eq!(out, expected_dir.join("fogs_per_day.png"));
        let img = image::open(&out).unwrap().to_rgba8();
        assert_eq!(img.dimensions(), (canvas::WIDTH, canvas::HEIGHT));
        // Every threshold has a line or a dot, and a legend entry.
        for color in PALETTE {
            assert!(img.pixels().any(|p| *p == Rgba::from(color)));
        }

        let csv = std::fs::read_to_string(out.with_extension("csv")).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "max_vis,stations,days");
        assert_eq!(lines.len(), 1 + 1 + 1 + 2 + 3);
        assert_eq!(lines[7], "1000,3,1");
    }

    #[test]
    fn test_histogram2d() {
        let hist = Histogram2d::new(
            vec![(0.0, 0.0), (10.0, 10.0), (4.9, 0.1), (5.0, 0.1), (11.0, 1.0), (1.0, -1.0)],
            (0.0, 10.0),
            (0.0, 10.0),
            2,
            2,
        );

        assert_eq!(hist.counts, vec![2, 1, 0, 1]);
        assert_eq!(hist.get(1, 1), 1);
        assert_eq!(hist.max(), 2);
    }

    #[test]
    fn test_plot_fog_dt_hist() {
        let tmp = TempDir::new().unwrap();
        let vis = Visualiser::new(sample(), tmp.path());
        let out = tmp.path().join("sub").join("hist.png");

        let hist = vis.fog_dt_hist();
        // The 20 km observation is outside the plotted range.
        assert_eq!(hist.counts.iter().sum::<u64>(), 5);

        assert_eq!(vis.plot_fog_dt_hist(Some(&out)).unwrap(), out);

        // All bins hold one observation, so they get the bottom colour of the map.
        let img = image::open(&out).unwrap().to_rgba8();
        let bottom = Rgba::from(Colormap::viridis().color_at(0.0));
        assert!(img.pixels().filter(|p| **p == bottom).count() > 5 * 50);
        let csv = std::fs::read_to_string(out.with_extension("csv")).unwrap();
        assert_eq!(csv.lines().count(), 1 + 5);
    }
}
