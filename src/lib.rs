#![deny(missing_docs)]
//! Tools to collect, process, and analyse data for fog detection research.
//!
//! Ground truth comes from the Integrated Surface Database (ISD), imagery from GOES-16 ABI on
//! AWS, cloud microphysics from NWCSAF run on ICON forecasts, and terrain from the USGS DEM.

//
// Public API
//
pub use config::Config;
pub use db::{read_fog_db, FogCase, FogDB, FogRecord, Source};
pub use errors::FogToolsErr;
pub use plot::Visualiser;
pub use transport::{Fetch, HttpFetcher};

pub mod abi;
pub mod area;
pub mod cache;
pub mod cmd_line;
pub mod config;
pub mod db;
pub mod dem;
pub mod isd;
pub mod logging;
pub mod plot;
pub mod s3;
pub mod sky;
pub mod table;
pub mod transport;
pub mod vis;

//
// Implementation only
//
mod errors;
mod external;
