//! Utilities related to logging.

use std::{
    collections::BTreeMap,
    fs::File,
    io::BufRead,
    path::{Path, PathBuf},
    sync::Mutex,
};

use chrono::{Local, NaiveDate, NaiveDateTime};
use tracing::{subscriber::DefaultGuard, Level};
use tracing_subscriber::{
    fmt::{self, writer::MakeWriterExt},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::errors::FogToolsErr;

/// Level to log at on stderr for a given number of `-v` flags.
pub fn verbosity_level(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Install the global subscriber writing to stderr. `RUST_LOG` overrides `verbosity`.
pub fn init_stderr(verbosity: u8) -> Result<(), FogToolsErr> {
    let level = verbosity_level(verbosity).as_str().to_lowercase();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,fogtools={}", level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_line_number(true),
        )
        .try_init()
        .map_err(|err| FogToolsErr::GeneralError(err.to_string()))
}

/// While alive, write everything logged on the current thread to a file named after a time.
///
/// Used when processing a case, so that every case gets its own log. Events are also written to
/// stderr at `stderr_level` or above. Dropping the guard restores the previous subscriber.
pub struct LogToTimeFile {
    logfile: PathBuf,
    _guard: DefaultGuard,
}

impl LogToTimeFile {
    /// Start logging to `<log_dir>/<today>/fogdb-<time>.log`.
    pub fn new(
        log_dir: &Path,
        time: NaiveDateTime,
        stderr_level: Level,
    ) -> Result<Self, FogToolsErr> {
        let logfile = Self::logfile_for(log_dir, time, Local::now().date_naive());
        if let Some(parent) = logfile.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(&logfile)?;

        let writer = Mutex::new(file).and(std::io::stderr.with_max_level(stderr_level));
        let subscriber = tracing_subscriber::fmt()
            .with_writer(writer)
            .with_ansi(false)
            .with_max_level(Level::DEBUG)
            .with_line_number(true)
            .finish();

        Ok(LogToTimeFile {
            logfile,
            _guard: tracing::subscriber::set_default(subscriber),
        })
    }

    fn logfile_for(log_dir: &Path, time: NaiveDateTime, today: NaiveDate) -> PathBuf {
        log_dir
            .join(today.format("%Y-%m-%d").to_string())
            .join(format!("fogdb-{}.log", time.format("%Y%m%d-%H%M")))
    }

    /// The file being written to.
    pub fn logfile(&self) -> &Path {
        &self.logfile
    }
}

/// Collect how many pixels each fogpy filter removed, from the content of a log.
pub fn collect_filterstats_from_log<R: BufRead>(
    reader: R,
) -> Result<BTreeMap<String, u64>, FogToolsErr> {
    let lines: Vec<String> = reader.lines().collect::<Result<_, _>>()?;
    let mut stats = BTreeMap::new();

    for (i, line) in lines.iter().enumerate() {
        if !line.contains("Filter results for") {
            continue;
        }

        let filter = line
            .split_whitespace()
            .last()
            .ok_or(FogToolsErr::LogicError("matched line has words"))?;

        // Blank, "Filtering", array size, cumulative masked, previously masked, new filtered.
        let filtered_line = lines.get(i + 6).map(String::as_str).unwrap_or("");
        if !filtered_line.contains("New filtered") {
            return Err(FogToolsErr::MalformedLog(format!(
                "expected 'New filtered' six lines after 'Filter results', got '{}'",
                filtered_line
            )));
        }

        let count: u64 = filtered_line
            .split_whitespace()
            .last()
            .and_then(|word| word.parse().ok())
            .ok_or_else(|| FogToolsErr::MalformedLog(format!("no count in '{}'", filtered_line)))?;

        if stats.insert(filter.to_owned(), count).is_some() {
            return Err(FogToolsErr::MalformedLog(format!(
                "found results for {} multiple times",
                filter
            )));
        }
    }

    Ok(stats)
}

/// Filter statistics for several log files, keyed by file name.
pub fn collect_filterstats_from_logfiles(
    paths: &[PathBuf],
) -> Result<BTreeMap<String, BTreeMap<String, u64>>, FogToolsErr> {
    paths
        .iter()
        .map(|path| {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| FogToolsErr::MissingFile(path.clone()))?;
            let reader = std::io::BufReader::new(File::open(path)?);
            Ok((name, collect_filterstats_from_log(reader)?))
        })
        .collect()
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
