//! Colours, colour maps and blending of fog masks onto satellite imagery.
use image::{GrayImage, Rgba, RgbaImage};

use crate::errors::FogToolsErr;

/// An RGBA colour with components in 0..=255.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Color {
    /// Red
    pub r: u8,
    /// Green
    pub g: u8,
    /// Blue
    pub b: u8,
    /// Alpha
    pub a: u8,
}

impl Color {
    /// An opaque colour.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b, a: 255 }
    }

    /// An opaque colour from fractions in 0..=1.
    pub fn from_fractions(r: f64, g: f64, b: f64) -> Self {
        let to_u8 = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        Color::rgb(to_u8(r), to_u8(g), to_u8(b))
    }
}

impl From<Color> for Rgba<u8> {
    fn from(c: Color) -> Self {
        Rgba([c.r, c.g, c.b, c.a])
    }
}

/// Linear interpolation between two colours, `t` is clamped to 0..=1.
pub fn interpolate_color(c1: Color, c2: Color, t: f64) -> Color {
    let t = t.clamp(0.0, 1.0);
    let lerp = |a: u8, b: u8| (f64::from(a) + (f64::from(b) - f64::from(a)) * t).round() as u8;

    Color {
        r: lerp(c1.r, c2.r),
        g: lerp(c1.g, c2.g),
        b: lerp(c1.b, c2.b),
        a: lerp(c1.a, c2.a),
    }
}

/// A piecewise linear colour map over control points sorted by value.
#[derive(Clone, Debug)]
pub struct Colormap {
    stops: Vec<(f64, Color)>,
}

impl Colormap {
    /// Blue for no fog, yellow for fog.
    pub fn fog() -> Self {
        Colormap {
            stops: vec![
                (0.0, Color::from_fractions(0.0, 0.0, 0.8)),
                (1.0, Color::from_fractions(250.0 / 255.0, 200.0 / 255.0, 40.0 / 255.0)),
            ],
        }
    }

    /// A five stop approximation of viridis on 0..=1.
    pub fn viridis() -> Self {
        Colormap {
            stops: vec![
                (0.0, Color::rgb(0x44, 0x01, 0x54)),
                (0.25, Color::rgb(0x3b, 0x52, 0x8b)),
                (0.5, Color::rgb(0x21, 0x91, 0x8c)),
                (0.75, Color::rgb(0x5e, 0xc9, 0x62)),
                (1.0, Color::rgb(0xfd, 0xe7, 0x25)),
            ],
        }
    }

    /// The colour at `value`, clamped to the range of the control points.
    pub fn color_at(&self, value: f64) -> Color {
        let first = self.stops[0];
        if value <= first.0 {
            return first.1;
        }

        for pair in self.stops.windows(2) {
            let ((v0, c0), (v1, c1)) = (pair[0], pair[1]);
            if value <= v1 {
                let t = if v1 > v0 { (value - v0) / (v1 - v0) } else { 1.0 };
                return interpolate_color(c0, c1, t);
            }
        }

        self.stops[self.stops.len() - 1].1
    }
}

/// Linear stretch of `values` onto 0..=1; constant input maps to 0.
pub fn stretch(values: &[f64]) -> Vec<f64> {
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(*v), hi.max(*v))
        });

    if max > min {
        values.iter().map(|v| (v - min) / (max - min)).collect()
    } else {
        vec![0.0; values.len()]
    }
}

/// Blend a fog mask on top of a background image.
///
/// `fog_alpha` is the alpha band of the fog product. Where it is fully opaque no fog is drawn,
/// everywhere else the fog colour is laid over the background at half opacity.
pub fn blend_fog(background: &RgbaImage, fog_alpha: &GrayImage) -> Result<RgbaImage, FogToolsErr> {
    if background.dimensions() != fog_alpha.dimensions() {
        return Err(FogToolsErr::ShapeMismatch {
            expected: background.dimensions(),
            actual: fog_alpha.dimensions(),
        });
    }

    let opacity: Vec<f64> = fog_alpha
        .pixels()
        .map(|p| if p.0[0] == u8::MAX { 0.0 } else { 0.5 })
        .collect();
    let colormap = Colormap::fog();

    let mut blended = background.clone();
    for ((pixel, &op), level) in blended
        .pixels_mut()
        .zip(&opacity)
        .zip(stretch(&opacity))
    {
        let fog = colormap.color_at(level);
        *pixel = composite(*pixel, fog, op);
    }

    Ok(blended)
}

// Source-over compositing of an opaque colour with the given opacity.
fn composite(under: Rgba<u8>, over: Color, opacity: f64) -> Rgba<u8> {
    let Rgba([r, g, b, a]) = under;
    let mix = |u: u8, o: u8| {
        (f64::from(o) * opacity + f64::from(u) * (1.0 - opacity)).round() as u8
    };
    let alpha = opacity + f64::from(a) / 255.0 * (1.0 - opacity);

    Rgba([
        mix(r, over.r),
        mix(g, over.g),
        mix(b, over.b),
        (alpha * 255.0).round() as u8,
    ])
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
