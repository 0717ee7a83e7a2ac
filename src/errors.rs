//! Module for errors.
use std::{error::Error, fmt::Display, path::PathBuf};

/// Error from the fogtools library.
#[derive(Debug)]
pub enum FogToolsErr {
    // Inherited errors from std
    /// Error forwarded from std
    IO(::std::io::Error),

    // Other forwarded errors
    /// Database error
    Database(::rusqlite::Error),
    /// Error forwarded from the HTTP client
    Http(::reqwest::Error),
    /// Error forwarded from the csv crate
    Csv(::csv::Error),
    /// Error forwarded from the image crate
    Image(::image::ImageError),
    /// Error forwarded from serde_yaml
    Yaml(::serde_yaml::Error),
    /// Error forwarded from chrono while parsing a date or time
    TimeParse(::chrono::ParseError),
    /// Error forwarded from the strum crate
    StrumError(strum::ParseError),
    /// Error reading or writing XML, cause information replaced by a string
    Xml(String),
    /// General error with any cause information erased and replaced by a string
    GeneralError(String),

    // My own errors from this crate
    /// A remote server answered with an unexpected status code.
    HttpStatus {
        /// The requested URL
        url: String,
        /// The status code returned
        status: u16,
    },
    /// A DEM file type that USGS does not provide.
    InvalidDemType(String),
    /// A line in the ISD station list does not have the expected layout.
    StationList(String),
    /// Invalid or unparseable time stamp.
    InvalidTime(String),
    /// The requested NWP period cannot be ordered.
    InvalidPeriod(String),
    /// Unknown area name.
    InvalidArea(String),
    /// Logfile content does not have the expected structure.
    MalformedLog(String),
    /// A required environment variable is not set.
    MissingEnvVar(&'static str),
    /// An external command failed.
    Command {
        /// The program that was run
        program: String,
        /// The exit code, if there was one
        code: Option<i32>,
    },
    /// A database file does not have the expected tables.
    InvalidSchema,
    /// Something is wrong with the fog database or one of its sources.
    FogDb(String),
    /// Expected a file that is not there.
    MissingFile(PathBuf),
    /// Two images that must be combined do not have the same size.
    ShapeMismatch {
        /// Expected (width, height)
        expected: (u32, u32),
        /// Actual (width, height)
        actual: (u32, u32),
    },
    /// Not enough data to complete the task.
    NotEnoughData,
    /// There was an internal logic error.
    LogicError(&'static str),
}

impl Display for FogToolsErr {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        use crate::errors::FogToolsErr::*;

        match self {
            IO(err) => write!(f, "std lib io error: {}", err),

            Database(err) => write!(f, "database error: {}", err),
            Http(err) => write!(f, "http error: {}", err),
            Csv(err) => write!(f, "csv error: {}", err),
            Image(err) => write!(f, "image error: {}", err),
            Yaml(err) => write!(f, "yaml error: {}", err),
            TimeParse(err) => write!(f, "error parsing time: {}", err),
            StrumError(err) => write!(f, "error forwarded from strum crate: {}", err),
            Xml(msg) => write!(f, "xml error: {}", msg),
            GeneralError(msg) => write!(f, "general error forwarded: {}", msg),

            HttpStatus { url, status } => write!(f, "HTTP error ({}): {}", status, url),
            InvalidDemType(tp) => write!(f, "Unknown type: {}", tp),
            StationList(msg) => write!(f, "malformed station list: {}", msg),
            InvalidTime(msg) => write!(f, "invalid time: {}", msg),
            InvalidPeriod(msg) => write!(f, "invalid period: {}", msg),
            InvalidArea(name) => write!(f, "unknown area: {}", name),
            MalformedLog(msg) => write!(f, "malformed log: {}", msg),
            MissingEnvVar(var) => write!(f, "Environment variable {} not set", var),
            Command { program, code } => match code {
                Some(code) => write!(f, "command {} failed with exit code {}", program, code),
                None => write!(f, "command {} terminated by signal", program),
            },
            InvalidSchema => write!(f, "invalid database schema"),
            FogDb(msg) => write!(f, "fog database error: {}", msg),
            MissingFile(path) => write!(f, "file not found: {}", path.display()),
            ShapeMismatch { expected, actual } => write!(
                f,
                "shape mismatch: expected {}x{}, got {}x{}",
                expected.0, expected.1, actual.0, actual.1
            ),
            NotEnoughData => write!(f, "not enough data to complete task"),
            LogicError(msg) => write!(f, "internal logic error: {}", msg),
        }
    }
}

impl Error for FogToolsErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        use crate::errors::FogToolsErr::*;

        match self {
            IO(err) => Some(err),
            Database(err) => Some(err),
            Http(err) => Some(err),
            Csv(err) => Some(err),
            Image(err) => Some(err),
            Yaml(err) => Some(err),
            TimeParse(err) => Some(err),
            StrumError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<::std::io::Error> for FogToolsErr {
    fn from(err: ::std::io::Error) -> FogToolsErr {
        FogToolsErr::IO(err)
    }
}

impl From<::rusqlite::Error> for FogToolsErr {
    fn from(err: ::rusqlite::Error) -> FogToolsErr {
        FogToolsErr::Database(err)
    }
}

impl From<::reqwest::Error> for FogToolsErr {
    fn from(err: ::reqwest::Error) -> FogToolsErr {
        FogToolsErr::Http(err)
    }
}

impl From<::csv::Error> for FogToolsErr {
    fn from(err: ::csv::Error) -> FogToolsErr {
        FogToolsErr::Csv(err)
    }
}

impl From<::image::ImageError> for FogToolsErr {
    fn from(err: ::image::ImageError) -> FogToolsErr {
        FogToolsErr::Image(err)
    }
}

impl From<::serde_yaml::Error> for FogToolsErr {
    fn from(err: ::serde_yaml::Error) -> FogToolsErr {
        FogToolsErr::Yaml(err)
    }
}

impl From<::chrono::ParseError> for FogToolsErr {
    fn from(err: ::chrono::ParseError) -> FogToolsErr {
        FogToolsErr::TimeParse(err)
    }
}

impl From<strum::ParseError> for FogToolsErr {
    fn from(err: strum::ParseError) -> FogToolsErr {
        FogToolsErr::StrumError(err)
    }
}

impl From<::quick_xml::Error> for FogToolsErr {
    fn from(err: ::quick_xml::Error) -> FogToolsErr {
        FogToolsErr::Xml(err.to_string())
    }
}

impl From<::regex::Error> for FogToolsErr {
    fn from(err: ::regex::Error) -> FogToolsErr {
        FogToolsErr::GeneralError(err.to_string())
    }
}

impl From<Box<dyn Error>> for FogToolsErr {
    fn from(err: Box<dyn Error>) -> FogToolsErr {
        FogToolsErr::GeneralError(err.to_string())
    }
}
