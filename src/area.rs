//! Named map areas that fog images are produced on.
use std::collections::BTreeMap;

use serde::Deserialize;
use serde_yaml::Value;

use crate::errors::FogToolsErr;

const BUNDLED_AREAS: &str = include_str!("../etc/areas.yaml");

/// The area `show-fog` uses when none is given.
pub const DEFAULT_AREA: &str = "eurol";

/// Grid size in pixels.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
pub struct Shape {
    pub height: u32,
    pub width: u32,
}

/// Corners of the grid in projection coordinates.
#[allow(missing_docs)]
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct AreaExtent {
    pub lower_left_xy: [f64; 2],
    pub upper_right_xy: [f64; 2],
    #[serde(default)]
    pub units: Option<String>,
}

/// A projected, regular grid.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct AreaDefinition {
    /// Free text description
    pub description: String,
    /// PROJ parameters
    pub projection: BTreeMap<String, Value>,
    /// Size of the grid
    pub shape: Shape,
    /// Extent of the grid
    pub area_extent: AreaExtent,
}

impl AreaDefinition {
    /// The projection as a PROJ string, parameters in alphabetical order.
    pub fn proj_string(&self) -> String {
        self.projection
            .iter()
            .map(|(key, val)| match val {
                Value::String(s) => format!("+{}={}", key, s),
                Value::Number(n) => format!("+{}={}", key, n),
                Value::Bool(true) | Value::Null => format!("+{}", key),
                other => format!("+{}={:?}", key, other),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Pixel size (x, y) in projection units.
    pub fn pixel_size(&self) -> (f64, f64) {
        let [x0, y0] = self.area_extent.lower_left_xy;
        let [x1, y1] = self.area_extent.upper_right_xy;
        (
            (x1 - x0) / f64::from(self.shape.width),
            (y1 - y0) / f64::from(self.shape.height),
        )
    }

    /// Check that an image of `width` x `height` pixels covers this area.
    pub fn check_shape(&self, width: u32, height: u32) -> Result<(), FogToolsErr> {
        if (width, height) == (self.shape.width, self.shape.height) {
            Ok(())
        } else {
            Err(FogToolsErr::ShapeMismatch {
                expected: (self.shape.width, self.shape.height),
                actual: (width, height),
            })
        }
    }
}

/// Parse area definitions from YAML text.
pub fn parse_areas(text: &str) -> Result<BTreeMap<String, AreaDefinition>, FogToolsErr> {
    Ok(serde_yaml::from_str(text)?)
}

/// The area definitions shipped with the crate.
pub fn bundled_areas() -> Result<BTreeMap<String, AreaDefinition>, FogToolsErr> {
    parse_areas(BUNDLED_AREAS)
}

/// Look up a bundled area by name.
pub fn get_area(name: &str) -> Result<AreaDefinition, FogToolsErr> {
    bundled_areas()?
        .remove(name)
        .ok_or_else(|| FogToolsErr::InvalidArea(name.to_owned()))
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
#[cfg(test)]
mod unit {
    use super::*;

    #[test]
    fn test_bundled_areas() {
        let areas = bundled_areas().unwrap();

        assert!(areas.contains_key(DEFAULT_AREA));
        assert!(areas.contains_key("new_england"));

        let eurol = &areas["eurol"];
        assert_eq!(eurol.shape, Shape { height: 4800, width: 2560 });
        assert_eq!(eurol.area_extent.units.as_deref(), Some("m"));
        assert!(eurol.proj_string().contains("+proj=stere"));
        assert!(eurol.proj_string().contains("+ellps=WGS84"));

        let (dx, dy) = areas["new_england"].pixel_size();
        assert!((dx - 2000.0).abs() < 1e-9);
        assert!((dy - 2000.0).abs() < 1e-9);
    }

    #[test]
    fn test_get_area() {
        assert_eq!(get_area("new_england").unwrap().shape.width, 600);

        match get_area("atlantis") {
            Err(FogToolsErr::InvalidArea(name)) => assert_eq!(name, "atlantis"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_check_shape() {
        let area = get_area("new_england").unwrap();

        assert!(area.check_shape(600, 600).is_ok());
        assert!(matches!(
            area.check_shape(600, 500),
            Err(FogToolsErr::ShapeMismatch {
                expected: (600, 600),
                actual: (600, 500)
            })
        ));
    }

    #[test]
    fn test_parse_areas() {
        let text = "
tiny:
  description: tiny
  projection: {proj: merc, no_defs: null}
  shape: {height: 2, width: 4}
  area_extent:
    lower_left_xy: [0, 0]
    upper_right_xy: [400, 100]
";
        let areas = parse_areas(text).unwrap();

        assert_eq!(areas["tiny"].area_extent.units, None);
        assert_eq!(areas["tiny"].pixel_size(), (100.0, 50.0));
        assert_eq!(areas["tiny"].proj_string(), "+no_defs +proj=merc");
        assert!(parse_areas("tiny: {description: no shape}").is_err());
    }
}
