//! Raster line charts and binned 2-D histograms.

use image::{imageops, Rgba, RgbaImage};
use imageproc::{
    drawing::{
        draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut, draw_text_mut,
        text_size,
    },
    rect::Rect,
};
use rusttype::{Font, Scale};

use crate::{errors::FogToolsErr, vis::Color};

const FONT_DATA: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");
const FONT_SIZE: f32 = 14.0;

pub(super) const WIDTH: u32 = 640;
pub(super) const HEIGHT: u32 = 480;

const TOP: f64 = 40.0;
const BOTTOM: f64 = 60.0;
const LEFT: f64 = 70.0;

const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const GRID: Rgba<u8> = Rgba([221, 221, 221, 255]);

/// Line colours, in the order series are added.
pub(super) const PALETTE: [Color; 4] = [
    Color::rgb(0x1f, 0x77, 0xb4),
    Color::rgb(0xff, 0x7f, 0x0e),
    Color::rgb(0x2c, 0xa0, 0x2c),
    Color::rgb(0xd6, 0x27, 0x28),
];

/// Ticks at multiples of 1, 2 or 5 times a power of ten, at most `max_ticks + 1` of them.
pub(super) fn nice_ticks(lo: f64, hi: f64, max_ticks: usize) -> Vec<f64> {
    if hi <= lo || max_ticks == 0 {
        return vec![lo];
    }

    let rough = (hi - lo) / max_ticks as f64;
    let magnitude = 10f64.powf(rough.log10().floor());
    let step = [1.0, 2.0, 5.0, 10.0]
        .iter()
        .map(|m| m * magnitude)
        .find(|step| *step >= rough)
        .unwrap_or(10.0 * magnitude);

    let first = (lo / step).ceil() as i64;
    let last = (hi / step).floor() as i64;
    (first..=last).map(|i| i as f64 * step).collect()
}

fn fmt_tick(v: f64) -> String {
    if v.fract().abs() < 1e-9 {
        format!("{}", v as i64)
    } else {
        format!("{:.1}", v)
    }
}

#[derive(Clone, Copy, Debug)]
enum Anchor {
    Start,
    Middle,
    End,
}

/// A plotting area mapping data coordinates onto an image.
pub(super) struct Axes {
    x: (f64, f64),
    y: (f64, f64),
    right: f64,
    img: RgbaImage,
    font: Font<'static>,
}

impl Axes {
    /// Axes spanning the given data ranges, leaving `right` pixels free on the right.
    pub(super) fn new(
        x: (f64, f64),
        y: (f64, f64),
        right: f64,
        grid: bool,
    ) -> Result<Self, FogToolsErr> {
        let font = Font::try_from_bytes(FONT_DATA)
            .ok_or(FogToolsErr::LogicError("unable to load bundled font"))?;
        let widen = |(lo, hi): (f64, f64)| if hi > lo { (lo, hi) } else { (lo, lo + 1.0) };

        let mut axes = Axes {
            x: widen(x),
            y: widen(y),
            right,
            img: RgbaImage::from_pixel(WIDTH, HEIGHT, WHITE),
            font,
        };

        // Grid lines go in first so the data is drawn over them.
        if grid {
            let (top, bottom) = (TOP, axes.bottom());
            let (left, right) = (LEFT, axes.right());
            for t in nice_ticks(axes.x.0, axes.x.1, 8) {
                let x = axes.px(t);
                axes.segment((x, top), (x, bottom), GRID);
            }
            for t in nice_ticks(axes.y.0, axes.y.1, 8) {
                let y = axes.py(t);
                axes.segment((left, y), (right, y), GRID);
            }
        }

        Ok(axes)
    }

    fn right(&self) -> f64 {
        f64::from(WIDTH) - self.right
    }

    fn bottom(&self) -> f64 {
        f64::from(HEIGHT) - BOTTOM
    }

    pub(super) fn px(&self, x: f64) -> f64 {
        LEFT + (x - self.x.0) / (self.x.1 - self.x.0) * (self.right() - LEFT)
    }

    pub(super) fn py(&self, y: f64) -> f64 {
        self.bottom() - (y - self.y.0) / (self.y.1 - self.y.0) * (self.bottom() - TOP)
    }

    fn segment(&mut self, (x0, y0): (f64, f64), (x1, y1): (f64, f64), color: Rgba<u8>) {
        draw_line_segment_mut(
            &mut self.img,
            (x0 as f32, y0 as f32),
            (x1 as f32, y1 as f32),
            color,
        );
    }

    // Pixel coordinates, at least one pixel is filled.
    fn fill(&mut self, (left, top): (f64, f64), (right, bottom): (f64, f64), color: Rgba<u8>) {
        let (x0, y0) = (left.round() as i32, top.round() as i32);
        let width = (right.round() as i32 - x0).max(1) as u32;
        let height = (bottom.round() as i32 - y0).max(1) as u32;

        draw_filled_rect_mut(&mut self.img, Rect::at(x0, y0).of_size(width, height), color);
    }

    // `y` is the vertical centre of the line of text.
    fn text(&mut self, x: f64, y: f64, anchor: Anchor, text: &str) {
        let scale = Scale::uniform(FONT_SIZE);
        let (width, _) = text_size(scale, &self.font, text);
        let x = match anchor {
            Anchor::Start => x as i32,
            Anchor::Middle => x as i32 - width / 2,
            Anchor::End => x as i32 - width,
        };
        let y = (y - f64::from(FONT_SIZE) / 2.0) as i32;

        draw_text_mut(&mut self.img, BLACK, x, y, scale, &self.font, text);
    }

    // Text reading upwards, centred on (`x`, `y`).
    fn vertical_text(&mut self, x: f64, y: f64, text: &str) {
        let scale = Scale::uniform(FONT_SIZE);
        let (width, _) = text_size(scale, &self.font, text);
        let width = width.max(1) as u32 + 2;
        let height = FONT_SIZE.ceil() as u32 + 4;

        let mut label = RgbaImage::new(width, height);
        draw_text_mut(&mut label, BLACK, 1, 2, scale, &self.font, text);
        let label = imageops::rotate270(&label);

        imageops::overlay(
            &mut self.img,
            &label,
            x as i64 - i64::from(height) / 2,
            y as i64 - i64::from(width) / 2,
        );
    }

    /// Draw a two pixel wide polyline through the points. A single point is drawn as a dot.
    pub(super) fn line(&mut self, points: &[(f64, f64)], color: Color) {
        let pixels: Vec<(f64, f64)> = points
            .iter()
            .map(|&(x, y)| (self.px(x), self.py(y)))
            .collect();

        if let [(x, y)] = pixels[..] {
            self.fill((x - 1.0, y - 1.0), (x + 2.0, y + 2.0), color.into());
        }

        for pair in pixels.windows(2) {
            let ((x0, y0), (x1, y1)) = (pair[0], pair[1]);
            for dy in [0.0, 1.0] {
                self.segment((x0, y0 + dy), (x1, y1 + dy), color.into());
            }
        }
    }

    /// Fill the data-space rectangle from (`x0`, `y0`) to (`x1`, `y1`).
    pub(super) fn rect(&mut self, (x0, y0): (f64, f64), (x1, y1): (f64, f64), color: Color) {
        let (left, right) = (self.px(x0), self.px(x1));
        let (top, bottom) = (self.py(y1), self.py(y0));

        self.fill((left, top), (right, bottom), color.into());
    }

    /// A legend in the upper right corner.
    pub(super) fn legend(&mut self, entries: &[(String, Color)]) {
        let x = self.right() - 120.0;

        for (i, (label, color)) in entries.iter().enumerate() {
            let y = TOP + 15.0 + 18.0 * i as f64;
            for dy in [0.0, 1.0] {
                self.segment((x, y + dy), (x + 25.0, y + dy), (*color).into());
            }
            self.text(x + 30.0, y, Anchor::Start, label);
        }
    }

    /// Draw a vertical colour bar right of the axes, with `ticks` as (position in 0..=1, label).
    pub(super) fn colorbar(&mut self, color_at: impl Fn(f64) -> Color, ticks: &[(f64, String)]) {
        const STEPS: usize = 64;
        let x = self.right() + 20.0;
        let bottom = self.bottom();
        let height = bottom - TOP;
        let step = height / STEPS as f64;

        for i in 0..STEPS {
            let frac = (i as f64 + 0.5) / STEPS as f64;
            let top = bottom - (i + 1) as f64 * step;
            self.fill((x, top), (x + 15.0, top + step + 0.5), color_at(frac).into());
        }

        for (frac, label) in ticks {
            let y = bottom - frac * height;
            self.segment((x + 15.0, y), (x + 19.0, y), BLACK);
            self.text(x + 22.0, y, Anchor::Start, label);
        }
    }

    /// Draw the frame, ticks and labels and hand out the image.
    pub(super) fn finish(mut self, xlabel: &str, ylabel: &str, title: Option<&str>) -> RgbaImage {
        let (left, right) = (LEFT, self.right());
        let (top, bottom) = (TOP, self.bottom());

        for t in nice_ticks(self.x.0, self.x.1, 8) {
            let x = self.px(t);
            self.segment((x, bottom), (x, bottom + 4.0), BLACK);
            self.text(x, bottom + 14.0, Anchor::Middle, &fmt_tick(t));
        }

        for t in nice_ticks(self.y.0, self.y.1, 8) {
            let y = self.py(t);
            self.segment((left - 4.0, y), (left, y), BLACK);
            self.text(left - 7.0, y, Anchor::End, &fmt_tick(t));
        }

        let frame = Rect::at(left as i32, top as i32)
            .of_size((right - left) as u32 + 1, (bottom - top) as u32 + 1);
        draw_hollow_rect_mut(&mut self.img, frame, BLACK);

        let centre = (left + right) / 2.0;
        self.text(centre, f64::from(HEIGHT) - 20.0, Anchor::Middle, xlabel);
        if let Some(title) = title {
            self.text(centre, TOP - 18.0, Anchor::Middle, title);
        }
        self.vertical_text(18.0, (top + bottom) / 2.0, ylabel);

        self.img
    }
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
#[cfg(test)]
mod unit {
    use super::*;

    const RED: Color = Color::rgb(255, 0, 0);

    #[test]
    fn test_nice_ticks() {
        assert_eq!(nice_ticks(0.0, 10.0, 5), vec![0.0, 2.0, 4.0, 6.0, 8.0, 10.0]);
        assert_eq!(
            nice_ticks(0.0, 10000.0, 8),
            vec![0.0, 2000.0, 4000.0, 6000.0, 8000.0, 10000.0]
        );
        assert_eq!(nice_ticks(1.0, 3.5, 8), vec![1.0, 1.5, 2.0, 2.5, 3.0, 3.5]);
        assert_eq!(nice_ticks(3.0, 3.0, 8), vec![3.0]);
    }

    #[test]
    fn test_axes_mapping() {
        let axes = Axes::new((0.0, 10.0), (0.0, 1.0), 20.0, false).unwrap();

        assert!((axes.px(0.0) - LEFT).abs() < 1e-9);
        assert!((axes.px(10.0) - (f64::from(WIDTH) - 20.0)).abs() < 1e-9);
        assert!((axes.py(0.0) - (f64::from(HEIGHT) - BOTTOM)).abs() < 1e-9);
        assert!((axes.py(1.0) - TOP).abs() < 1e-9);
    }

    #[test]
    fn test_rect_and_line() {
        let mut axes = Axes::new((0.0, 10.0), (0.0, 10.0), 20.0, false).unwrap();
        axes.rect((0.0, 0.0), (5.0, 5.0), RED);
        axes.line(&[(0.0, 8.0), (10.0, 8.0)], PALETTE[0]);

        let img = axes.finish("x", "y", Some("title"));

        assert_eq!(img.dimensions(), (WIDTH, HEIGHT));
        // Inside the rectangle, px(2.5) and py(2.5).
        assert_eq!(*img.get_pixel(207, 325), Rgba([255, 0, 0, 255]));
        // Outside of it the background is left alone.
        assert_eq!(*img.get_pixel(400, 325), WHITE);
        // On the line at y = 8, py(8) = 116.
        assert_eq!(*img.get_pixel(400, 116), Rgba::from(PALETTE[0]));
        // The frame.
        assert_eq!(*img.get_pixel(70, 200), BLACK);
        assert_eq!(*img.get_pixel(620, 200), BLACK);
    }

    #[test]
    fn test_grid() {
        let axes = Axes::new((0.0, 10.0), (0.0, 10.0), 20.0, true).unwrap();
        let img = axes.finish("x", "y", None);

        // Vertical grid line at x = 6, px(6) = 400.
        assert_eq!(*img.get_pixel(400, 200), GRID);
    }

    #[test]
    fn test_single_point() {
        let mut axes = Axes::new((0.0, 10.0), (0.0, 10.0), 20.0, false).unwrap();
        axes.line(&[(5.0, 5.0)], RED);

        let img = axes.finish("x", "y", None);

        assert_eq!(*img.get_pixel(345, 230), Rgba([255, 0, 0, 255]));
    }
}
