//! ICON forecasts as a fog database source.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use chrono::{Duration, NaiveDateTime, Timelike};

use super::Source;
use crate::{errors::FogToolsErr, sky};

/// The main ICON run (00, 06, 12 or 18 UTC) most recently started at `t`.
pub fn run_for(t: NaiveDateTime) -> NaiveDateTime {
    let into_run = t.num_seconds_from_midnight() % (6 * 3600);
    t - Duration::seconds(i64::from(into_run)) - Duration::nanoseconds(i64::from(t.nanosecond()))
}

/// ICON fields as requested from SKY for NWCSAF.
pub struct IconSource {
    base: PathBuf,
    sky_command: Vec<String>,
    generated: HashMap<NaiveDateTime, Vec<PathBuf>>,
}

impl IconSource {
    /// Create a source whose files live in `<base>/import/NWP_data`.
    pub fn new(base: &Path, sky_command: &[String]) -> Self {
        IconSource {
            base: base.to_path_buf(),
            sky_command: sky_command.to_vec(),
            generated: HashMap::new(),
        }
    }

    /// The forecast step closest to `t`.
    pub fn step_file(&self, t: NaiveDateTime) -> PathBuf {
        let run = run_for(t);
        let step = ((t - run).num_minutes() + 30) / 60;
        let step = u32::try_from(step).unwrap_or(0).min(sky::LAST_STEP);
        sky::make_icon_nwcsaf_filename(&self.base, run, step)
    }
}

impl Source for IconSource {
    /// What SKY delivered for `t` if it was requested here, the expected files otherwise.
    fn get_path(&self, t: NaiveDateTime) -> Result<Vec<PathBuf>, FogToolsErr> {
        match self.generated.get(&t) {
            Some(files) => Ok(files.clone()),
            None => Ok(sky::expected_files(&self.base, run_for(t))),
        }
    }

    fn store(&mut self, t: NaiveDateTime) -> Result<(), FogToolsErr> {
        let run = run_for(t);
        sky::verify_period(run)?;

        let files = sky::get_and_send(&self.base, run, &self.sky_command)?;
        self.generated.insert(t, files);
        Ok(())
    }
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
