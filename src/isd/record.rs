//! Reading ISD measurements as published in the AWS bucket.
//!
//! The CSV files nest several values in one column, for example `025000,1,9,9` for a visibility
//! of 25 km with its quality and variability codes. See the ISD format document, pages 10-11.

use chrono::NaiveDateTime;
use regex::Regex;
use serde::Deserialize;

use crate::errors::FogToolsErr;

/// Visibility reported when the column could not be parsed.
pub const MISSING_VIS: u32 = 999_999;
/// Temperature or dew point reported when the column could not be parsed.
pub const MISSING_TEMP: f32 = 999.9;
/// Quality codes accepted for visibility, temperature and dew point.
pub const QUALITY_OK: [char; 6] = ['1', '4', '5', 'C', 'I', 'M'];

const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// One row of a station file, restricted to the columns we use.
#[derive(Clone, Debug, PartialEq)]
pub struct RawObservation {
    /// Station ID, USAF followed by WBAN
    pub station: String,
    /// Station name
    pub name: String,
    /// Time of the observation (UTC)
    pub date: NaiveDateTime,
    /// Latitude in degrees north
    pub latitude: Option<f64>,
    /// Longitude in degrees east
    pub longitude: Option<f64>,
    /// Elevation in metres
    pub elevation: Option<f64>,
    /// Undecoded visibility group
    pub vis: String,
    /// Undecoded temperature group
    pub tmp: String,
    /// Undecoded dew point group
    pub dew: String,
}

#[derive(Deserialize)]
struct CsvRow {
    #[serde(rename = "STATION")]
    station: String,
    #[serde(rename = "NAME", default)]
    name: Option<String>,
    #[serde(rename = "DATE")]
    date: String,
    #[serde(rename = "LATITUDE", default)]
    latitude: Option<f64>,
    #[serde(rename = "LONGITUDE", default)]
    longitude: Option<f64>,
    #[serde(rename = "ELEVATION", default)]
    elevation: Option<f64>,
    #[serde(rename = "VIS", default)]
    vis: Option<String>,
    #[serde(rename = "TMP", default)]
    tmp: Option<String>,
    #[serde(rename = "DEW", default)]
    dew: Option<String>,
}

/// Parse the content of a station file.
pub fn read_station_csv(content: &[u8]) -> Result<Vec<RawObservation>, FogToolsErr> {
    let mut rdr = csv::Reader::from_reader(content);

    rdr.deserialize::<CsvRow>()
        .map(|row| {
            let row = row?;
            Ok(RawObservation {
                date: NaiveDateTime::parse_from_str(&row.date, DATE_FORMAT)?,
                station: row.station,
                name: row.name.unwrap_or_default(),
                latitude: row.latitude,
                longitude: row.longitude,
                elevation: row.elevation,
                vis: row.vis.unwrap_or_default(),
                tmp: row.tmp.unwrap_or_default(),
                dew: row.dew.unwrap_or_default(),
            })
        })
        .collect()
}

/// Decoded visibility group.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Visibility {
    /// Horizontal distance in metres
    pub distance: u32,
    /// Quality code for the distance
    pub quality: Option<char>,
    /// Variability code
    pub variability: Option<char>,
    /// Quality code for the variability
    pub variability_quality: Option<char>,
}

/// Decoded temperature or dew point group.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Temperature {
    /// Value in °C
    pub value: f32,
    /// Quality code
    pub quality: Option<char>,
}

/// A measurement with visibility, temperature and dew point decoded and quality controlled.
#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq)]
pub struct Observation {
    pub station: String,
    pub name: String,
    pub date: NaiveDateTime,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub elevation: Option<f64>,
    /// Visibility in metres
    pub vis: u32,
    /// Temperature in °C
    pub temp: f32,
    /// Dew point in °C
    pub dew: f32,
}

impl Observation {
    /// Temperature minus dew point.
    pub fn dewpoint_depression(&self) -> f32 {
        self.temp - self.dew
    }
}

/// Decodes the nested groups in the visibility and temperature columns.
#[derive(Debug, Clone)]
pub struct Extractor {
    vis: Regex,
    temp: Regex,
}

impl Extractor {
    /// Build the extractor.
    pub fn new() -> Result<Self, FogToolsErr> {
        Ok(Extractor {
            vis: Regex::new(r"(\d{6}),(\d),([NV9]),(\d)")?,
            temp: Regex::new(r"([+-]\d{4}),([012345679ACIMPRU])")?,
        })
    }

    /// Decode a visibility group.
    pub fn vis(&self, raw: &str) -> Visibility {
        let first_char = |s: &str| s.chars().next();

        self.vis
            .captures(raw)
            .and_then(|caps| {
                Some(Visibility {
                    distance: caps[1].parse().ok()?,
                    quality: first_char(&caps[2]),
                    variability: first_char(&caps[3]),
                    variability_quality: first_char(&caps[4]),
                })
            })
            .unwrap_or(Visibility {
                distance: MISSING_VIS,
                quality: None,
                variability: None,
                variability_quality: None,
            })
    }

    /// Decode a temperature or dew point group.
    pub fn temp(&self, raw: &str) -> Temperature {
        self.temp
            .captures(raw)
            .and_then(|caps| {
                let tenths: i32 = caps[1].parse().ok()?;
                Some(Temperature {
                    value: tenths as f32 / 10.0,
                    quality: caps[2].chars().next(),
                })
            })
            .unwrap_or(Temperature {
                value: MISSING_TEMP,
                quality: None,
            })
    }

    /// Decode all rows, keeping those whose visibility, temperature and dew point quality codes
    /// are all acceptable.
    pub fn extract_and_add_all(&self, rows: &[RawObservation]) -> Vec<Observation> {
        let ok = |q: Option<char>| q.map(|q| QUALITY_OK.contains(&q)).unwrap_or(false);

        rows.iter()
            .filter_map(|row| {
                let vis = self.vis(&row.vis);
                let temp = self.temp(&row.tmp);
                let dew = self.temp(&row.dew);

                if !(ok(vis.quality) && ok(temp.quality) && ok(dew.quality)) {
                    return None;
                }

                Some(Observation {
                    station: row.station.clone(),
                    name: row.name.clone(),
                    date: row.date,
                    latitude: row.latitude,
                    longitude: row.longitude,
                    elevation: row.elevation,
                    vis: vis.distance,
                    temp: temp.value,
                    dew: dew.value,
                })
            })
            .collect()
    }
}

/// Decode and quality control all rows.
pub fn extract_and_add_all(rows: &[RawObservation]) -> Result<Vec<Observation>, FogToolsErr> {
    Ok(Extractor::new()?.extract_and_add_all(rows))
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
#[cfg(test)]
pub(crate) mod unit {
    use super::*;

    pub(crate) const STATION_CSV: &str = r#""STATION","DATE","SOURCE","LATITUDE","LONGITUDE","ELEVATION","NAME","REPORT_TYPE","CALL_SIGN","QUALITY_CONTROL","WND","CIG","VIS","TMP","DEW","SLP","AA1","AA2","AY1","AY2","GF1","MW1","REM"
"94733099999","2019-01-03T22:00:00","4","-32.5833333","151.1666666","45.0","SINGLETON STP, AS","FM-12","99999","V020","050,1,N,0010,1","22000,1,9,N","025000,1,9,9","+0260,1","+0210,1","99999,9","24,0000,9,1",,"0,1,02,1","0,1,02,1","01,99,1,99,9,99,9,99999,9,99,9,99,9","01,1","SYN05294733 11/75 10502 10260 20210 60004 70100 333 70000="
"94733099999","2019-01-04T04:00:00","4","-32.5833333","151.1666666","45.0","SINGLETON STP, AS","FM-12","99999","V020","090,1,N,0021,1","22000,1,9,N","025000,1,9,9","+0378,1","+0172,1","99999,9","06,0000,9,1",,"0,1,02,1","0,1,02,1","03,99,1,99,9,99,9,99999,9,99,9,99,9","03,1","SYN04294733 11/75 30904 10378 20172 60001 70300="
"94733099999","2019-01-04T22:00:00","4","-32.5833333","151.1666666","45.0","SINGLETON STP, AS","FM-12","99999","V020","290,1,N,0057,1","99999,9,9,N","020000,1,9,9","+0339,1","+0201,1","99999,9","24,0000,9,1",,"0,1,02,1","0,1,02,1",,"02,1","SYN05294733 11970 02911 10339 20201 60004 70200 333 70000="
"94733099999","2019-01-05T22:00:00","4","-32.5833333","151.1666666","45.0","SINGLETON STP, AS","FM-12","99999","V020","200,1,N,0026,1","99999,9,9,N","000100,1,9,9","+0209,1","+0193,1","99999,9","24,0004,3,1",,"1,1,02,1","1,1,02,1","08,99,1,99,9,99,9,99999,9,99,9,99,9","51,1","SYN05294733 11/01 82005 10209 20193 69944 75111 333 70004="
"94733099999","2019-01-08T04:00:00","4","-32.5833333","151.1666666","45.0","SINGLETON STP, AS","FM-12","99999","V020","070,1,N,0026,1","22000,1,9,N","025000,1,9,9","+0344,1","+0213,1","99999,9","06,0000,9,1",,"2,1,02,1","2,1,02,1","04,99,1,99,9,99,9,99999,9,99,9,99,9","02,1","SYN04294733 11/75 40705 10344 20213 60001 70222="
"#;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3 * b.abs()
    }

    #[test]
    fn test_read_station_csv() {
        let rows = read_station_csv(STATION_CSV.as_bytes()).unwrap();

        assert_eq!(rows.len(), 5);
        assert!(rows.iter().all(|r| r.station == "94733099999"));
        assert_eq!(rows[0].name, "SINGLETON STP, AS");
        assert_eq!(rows[0].vis, "025000,1,9,9");
        assert_eq!(rows[0].latitude, Some(-32.5833333));
        assert_eq!(
            rows[3].date,
            NaiveDateTime::parse_from_str("2019-01-05T22:00:00", DATE_FORMAT).unwrap()
        );
    }

    #[test]
    fn test_extract_vis() {
        let rows = read_station_csv(STATION_CSV.as_bytes()).unwrap();
        let ex = Extractor::new().unwrap();
        let vis: Vec<Visibility> = rows.iter().map(|r| ex.vis(&r.vis)).collect();

        assert_eq!(vis.iter().map(|v| v.distance).min(), Some(100));
        assert_eq!(vis.iter().map(|v| v.distance).max(), Some(25000));
        assert!(vis.iter().all(|v| v.quality == Some('1')));
        assert!(vis.iter().all(|v| v.variability == Some('9')));
        assert!(vis.iter().all(|v| v.variability_quality == Some('9')));
    }

    #[test]
    fn test_extract_vis_missing() {
        let ex = Extractor::new().unwrap();
        let vis = ex.vis("");

        assert_eq!(vis.distance, MISSING_VIS);
        assert!(vis.quality.is_none());
    }

    #[test]
    fn test_extract_temp() {
        let rows = read_station_csv(STATION_CSV.as_bytes()).unwrap();
        let ex = Extractor::new().unwrap();

        let tmp: Vec<Temperature> = rows.iter().map(|r| ex.temp(&r.tmp)).collect();
        let min = tmp.iter().map(|t| t.value).fold(f32::INFINITY, f32::min);
        let max = tmp.iter().map(|t| t.value).fold(f32::NEG_INFINITY, f32::max);
        assert!(approx(min, 20.9));
        assert!(approx(max, 37.8));
        assert!(tmp.iter().all(|t| t.quality == Some('1')));

        let dew: Vec<Temperature> = rows.iter().map(|r| ex.temp(&r.dew)).collect();
        let min = dew.iter().map(|t| t.value).fold(f32::INFINITY, f32::min);
        let max = dew.iter().map(|t| t.value).fold(f32::NEG_INFINITY, f32::max);
        assert!(approx(min, 17.2));
        assert!(approx(max, 21.3));
    }

    #[test]
    fn test_extract_temp_negative_and_missing() {
        let ex = Extractor::new().unwrap();

        assert!(approx(ex.temp("-0170,5").value, -17.0));
        assert_eq!(ex.temp("-0170,5").quality, Some('5'));
        assert_eq!(ex.temp("garbage").value, MISSING_TEMP);
    }

    #[test]
    fn test_extract_and_add_all() {
        let rows = read_station_csv(STATION_CSV.as_bytes()).unwrap();
        let obs = extract_and_add_all(&rows).unwrap();

        assert_eq!(obs.len(), 5);
        assert_eq!(obs[3].vis, 100);
        assert!(approx(obs[3].dewpoint_depression(), 1.6));
    }

    #[test]
    fn test_extract_and_add_all_rejects_bad_quality() {
        let mut rows = read_station_csv(STATION_CSV.as_bytes()).unwrap();
        rows[0].vis = "025000,2,9,9".to_owned();
        rows[1].tmp = "+9999,9".to_owned();
        rows[2].dew = String::new();

        let obs = extract_and_add_all(&rows).unwrap();

        assert_eq!(obs.len(), 2);
    }
}
