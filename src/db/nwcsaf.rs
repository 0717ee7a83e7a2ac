//! NWCSAF cloud microphysics as a fog database source.
//!
//! NWCSAF runs as a daemon watching `$SAFNWC/import`. Satellite and NWP input is linked there,
//! the task manager is started if needed, and then the output file is waited for.

use std::{
    path::{Path, PathBuf},
    thread,
    time::Duration,
};

use chrono::NaiveDateTime;
use tracing::{debug, info};

use super::{AbiSource, IconSource, Source};
use crate::{config::Config, errors::FogToolsErr, external, transport::Fetch};

/// Cloud microphysics (CMIC) computed by NWCSAF from ABI and ICON.
pub struct NwcsafSource<'a, F: Fetch + ?Sized> {
    base: PathBuf,
    safnwc: PathBuf,
    abi: AbiSource<'a, F>,
    icon: IconSource,
    start_command: Vec<String>,
    status_command: Vec<String>,
    poll_interval: Duration,
    max_polls: u32,
}

impl<'a, F: Fetch + ?Sized> NwcsafSource<'a, F> {
    /// Create a source whose output is found below `base`.
    ///
    /// The commands and polling behaviour are taken from `config`.
    pub fn new(
        base: &Path,
        safnwc: &Path,
        abi: AbiSource<'a, F>,
        icon: IconSource,
        config: &Config,
    ) -> Self {
        NwcsafSource {
            base: base.to_path_buf(),
            safnwc: safnwc.to_path_buf(),
            abi,
            icon,
            start_command: config.nwcsaf_start_command.clone(),
            status_command: config.nwcsaf_status_command.clone(),
            poll_interval: Duration::from_secs(config.nwcsaf_poll_interval_secs),
            max_polls: config.nwcsaf_max_polls,
        }
    }

    /// The satellite dependency, mutably.
    pub fn abi_mut(&mut self) -> &mut AbiSource<'a, F> {
        &mut self.abi
    }

    /// The NWP dependency.
    pub fn icon(&self) -> &IconSource {
        &self.icon
    }

    /// Where NWCSAF picks up satellite data.
    pub fn sat_data_dir(&self) -> PathBuf {
        self.safnwc.join("import").join("Sat_data")
    }

    /// Where NWCSAF picks up NWP data.
    pub fn nwp_data_dir(&self) -> PathBuf {
        self.safnwc.join("import").join("NWP_data")
    }

    /// The CMIC file for `t`.
    pub fn output_file(&self, t: NaiveDateTime) -> PathBuf {
        self.base.join(t.format("%Y/%m/%d").to_string()).join(format!(
            "S_NWC_CMIC_GOES16_NEW-ENGLAND-NR_{}Z.nc",
            t.format("%Y%m%dT%H%M%S")
        ))
    }

    /// Ask the task manager whether NWCSAF is running.
    ///
    /// The status command writes its report to the file passed as `-f<file>`. Exit code 0 with
    /// "Active Mode" in the report means running, exit code 1 means not running.
    pub fn is_running(&self) -> Result<bool, FogToolsErr> {
        let report = tempfile::NamedTempFile::new()?;
        let mut cmd = external::command(&self.status_command)?;
        cmd.arg(format!("-f{}", report.path().display()));
        let program = cmd.get_program().to_string_lossy().into_owned();

        match external::status(cmd)?.code() {
            Some(0) => {
                let text = std::fs::read_to_string(report.path())?;
                if text.contains("Active Mode") {
                    Ok(true)
                } else {
                    Err(FogToolsErr::FogDb(format!(
                        "unexpected task manager report: {}",
                        text.trim()
                    )))
                }
            }
            Some(1) => Ok(false),
            code => Err(FogToolsErr::Command { program, code }),
        }
    }

    /// Launch the NWCSAF task manager.
    pub fn start_running(&self) -> Result<(), FogToolsErr> {
        info!("Starting NWCSAF");
        external::run_checked(external::command(&self.start_command)?)
    }

    /// Wait until the output for `t` appears.
    ///
    /// Fails when NWCSAF is not running or the output does not appear within the configured
    /// number of polls.
    pub fn wait_for_output(&self, t: NaiveDateTime) -> Result<PathBuf, FogToolsErr> {
        let out = self.output_file(t);

        for poll in 0..self.max_polls {
            if out.exists() {
                return Ok(out);
            }
            if !self.is_running()? {
                return Err(FogToolsErr::FogDb(
                    "NWCSAF is not running, no output will appear".to_owned(),
                ));
            }

            debug!("Waiting for {}, {}/{}", out.display(), poll + 1, self.max_polls);
            thread::sleep(self.poll_interval);
        }

        if out.exists() {
            Ok(out)
        } else {
            Err(FogToolsErr::FogDb(format!(
                "no NWCSAF output {} after {} polls",
                out.display(),
                self.max_polls
            )))
        }
    }
}

/// Symlink each of `files` into `dir` under its own name. Existing links are kept.
pub fn link_into(files: &[PathBuf], dir: &Path) -> Result<(), FogToolsErr> {
    std::fs::create_dir_all(dir)?;

    for src in files {
        let name = src
            .file_name()
            .ok_or_else(|| FogToolsErr::MissingFile(src.clone()))?;
        let dest = dir.join(name);

        if dest.symlink_metadata().is_ok() {
            debug!("Already linked: {}", dest.display());
            continue;
        }

        debug!("Linking {} to {}", src.display(), dest.display());
        std::os::unix::fs::symlink(src, &dest)?;
    }

    Ok(())
}

impl<'a, F: Fetch + ?Sized> Source for NwcsafSource<'a, F> {
    fn get_path(&self, t: NaiveDateTime) -> Result<Vec<PathBuf>, FogToolsErr> {
        Ok(vec![self.output_file(t)])
    }

    /// Make sure ABI and ICON are there and visible to NWCSAF.
    fn ensure_deps(&mut self, t: NaiveDateTime) -> Result<(), FogToolsErr> {
        self.abi.ensure(t)?;
        self.icon.ensure(t)?;

        let sat_files: Vec<PathBuf> = self.abi.select_scan(t)?.into_values().collect();
        link_into(&sat_files, &self.sat_data_dir())?;
        link_into(&self.icon.get_path(t)?, &self.nwp_data_dir())
    }

    /// Make sure NWCSAF is running; it processes whatever is linked into its import directory.
    fn store(&mut self, _t: NaiveDateTime) -> Result<(), FogToolsErr> {
        if !self.is_running()? {
            self.start_running()?;
        }
        Ok(())
    }

    fn ensure(&mut self, t: NaiveDateTime) -> Result<(), FogToolsErr> {
        if !self.exists(t)? {
            self.ensure_deps(t)?;
            self.store(t)?;
            self.wait_for_output(t)?;
        }
        Ok(())
    }
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
