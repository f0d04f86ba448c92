use std::{collections::BTreeMap, f64::consts::PI, io::Cursor};

use anyhow::Context;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use plotters::{coord::Shift, prelude::*};

use super::aggregate::{PieSlice, Summary, YearMonth};

/// Turns aggregates into PNG bytes. Titles, axis labels and the legend are
/// rendered by the page around the image.
pub trait ChartRenderer: Send + Sync {
    fn bar_chart(&self, totals: &BTreeMap<String, f64>) -> anyhow::Result<Vec<u8>>;
    fn pie_chart(&self, slices: &[PieSlice]) -> anyhow::Result<Vec<u8>>;
    fn line_chart(&self, totals: &BTreeMap<YearMonth, f64>) -> anyhow::Result<Vec<u8>>;
}

/// Embeddable `data:` URIs; `None` when there is nothing to plot.
#[derive(Debug, Clone, Default)]
pub struct Charts {
    pub pie: Option<String>,
    pub bar: Option<String>,
    pub time_series: Option<String>,
}

pub fn render_charts(renderer: &dyn ChartRenderer, summary: &Summary) -> anyhow::Result<Charts> {
    if !summary.has_expenses {
        return Ok(Charts::default());
    }
    let pie = renderer
        .pie_chart(&summary.pie_slices())
        .context("render pie chart")?;
    let bar = renderer
        .bar_chart(&summary.category_totals)
        .context("render bar chart")?;
    let line = renderer
        .line_chart(&summary.monthly_totals)
        .context("render monthly chart")?;
    Ok(Charts {
        pie: Some(data_uri(&pie)),
        bar: Some(data_uri(&bar)),
        time_series: Some(data_uri(&line)),
    })
}

pub fn data_uri(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(png))
}

const SKY_BLUE: RGBColor = RGBColor(135, 206, 235);
const LINE_BLUE: RGBColor = RGBColor(31, 119, 180);
const GRID: RGBColor = RGBColor(220, 220, 220);
const MARGIN: i32 = 40;

/// Wedge colours, cycled. Shared with the page legend.
pub const PALETTE: [(u8, u8, u8); 10] = [
    (31, 119, 180),
    (255, 127, 14),
    (44, 160, 44),
    (214, 39, 40),
    (148, 103, 189),
    (140, 86, 75),
    (227, 119, 194),
    (127, 127, 127),
    (188, 189, 34),
    (23, 190, 207),
];

pub fn palette_color(i: usize) -> RGBColor {
    let (r, g, b) = PALETTE[i % PALETTE.len()];
    RGBColor(r, g, b)
}

/// Draws with plotters' bitmap backend and encodes the result as PNG.
#[derive(Debug, Clone, Copy)]
pub struct PngChartRenderer {
    pub width: u32,
    pub height: u32,
}

impl Default for PngChartRenderer {
    fn default() -> Self {
        Self {
            width: 800,
            height: 480,
        }
    }
}

type Area<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

fn plot_err<E: std::fmt::Debug>(e: E) -> anyhow::Error {
    anyhow::anyhow!("chart drawing failed: {:?}", e)
}

impl PngChartRenderer {
    fn draw_png<F>(&self, draw: F) -> anyhow::Result<Vec<u8>>
    where
        F: FnOnce(&Area<'_>, i32, i32) -> anyhow::Result<()>,
    {
        let (w, h) = (self.width, self.height);
        let mut buf = vec![0u8; (w as usize) * (h as usize) * 3];
        {
            let root = BitMapBackend::with_buffer(&mut buf, (w, h)).into_drawing_area();
            root.fill(&WHITE).map_err(plot_err)?;
            draw(&root, w as i32, h as i32)?;
            root.present().map_err(plot_err)?;
        }
        encode_png(w, h, buf)
    }
}

fn encode_png(width: u32, height: u32, buf: Vec<u8>) -> anyhow::Result<Vec<u8>> {
    let img = image::RgbImage::from_raw(width, height, buf).context("pixel buffer size mismatch")?;
    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut out, image::ImageOutputFormat::Png)
        .context("encode png")?;
    Ok(out.into_inner())
}

/// Maps values onto pixel rows of the plot box, always keeping zero in range.
struct ValueScale {
    lo: f64,
    hi: f64,
    top: i32,
    bottom: i32,
}

impl ValueScale {
    fn new<'a>(values: impl Iterator<Item = &'a f64>, top: i32, bottom: i32) -> Self {
        let (mut lo, mut hi) = (0.0_f64, 0.0_f64);
        for v in values {
            lo = lo.min(*v);
            hi = hi.max(*v);
        }
        if hi - lo < f64::EPSILON {
            hi = lo + 1.0;
        }
        Self { lo, hi, top, bottom }
    }

    fn y(&self, v: f64) -> i32 {
        let frac = (self.hi - v) / (self.hi - self.lo);
        self.top + (frac * f64::from(self.bottom - self.top)).round() as i32
    }
}

fn draw_axes(root: &Area<'_>, scale: &ValueScale, left: i32, right: i32) -> anyhow::Result<()> {
    for i in 0..=4 {
        let v = scale.lo + (scale.hi - scale.lo) * f64::from(i) / 4.0;
        let y = scale.y(v);
        root.draw(&PathElement::new(vec![(left, y), (right, y)], GRID.stroke_width(1)))
            .map_err(plot_err)?;
    }
    let zero = scale.y(0.0);
    root.draw(&PathElement::new(vec![(left, zero), (right, zero)], BLACK.stroke_width(1)))
        .map_err(plot_err)?;
    root.draw(&PathElement::new(
        vec![(left, scale.top), (left, scale.bottom)],
        BLACK.stroke_width(1),
    ))
    .map_err(plot_err)?;
    Ok(())
}

impl ChartRenderer for PngChartRenderer {
    fn bar_chart(&self, totals: &BTreeMap<String, f64>) -> anyhow::Result<Vec<u8>> {
        self.draw_png(|root, w, h| {
            let (left, right) = (MARGIN, w - MARGIN);
            let scale = ValueScale::new(totals.values(), MARGIN, h - MARGIN);
            draw_axes(root, &scale, left, right)?;

            let n = totals.len().max(1) as i32;
            let slot = (right - left) / n;
            let pad = slot / 6;
            let zero = scale.y(0.0);
            for (i, v) in totals.values().enumerate() {
                let x0 = left + slot * i as i32 + pad;
                let x1 = left + slot * (i as i32 + 1) - pad;
                let y = scale.y(*v);
                let (top, bottom) = (y.min(zero), y.max(zero));
                root.draw(&Rectangle::new([(x0, top), (x1, bottom)], SKY_BLUE.filled()))
                    .map_err(plot_err)?;
            }
            Ok(())
        })
    }

    fn pie_chart(&self, slices: &[PieSlice]) -> anyhow::Result<Vec<u8>> {
        self.draw_png(|root, w, h| {
            let (cx, cy) = (f64::from(w) / 2.0, f64::from(h) / 2.0);
            let r = f64::from(w.min(h)) * 0.4;
            // counter-clockwise from 140 degrees
            let mut start = 140.0_f64.to_radians();
            for (i, slice) in slices.iter().enumerate() {
                let sweep = slice.percent / 100.0 * 2.0 * PI;
                let steps = ((sweep.to_degrees()).ceil() as usize).max(2);
                let mut points = Vec::with_capacity(steps + 2);
                points.push((cx.round() as i32, cy.round() as i32));
                for s in 0..=steps {
                    let a = start + sweep * s as f64 / steps as f64;
                    points.push((
                        (cx + r * a.cos()).round() as i32,
                        (cy - r * a.sin()).round() as i32,
                    ));
                }
                root.draw(&Polygon::new(points, palette_color(i).filled()))
                    .map_err(plot_err)?;
                start += sweep;
            }
            Ok(())
        })
    }

    fn line_chart(&self, totals: &BTreeMap<YearMonth, f64>) -> anyhow::Result<Vec<u8>> {
        self.draw_png(|root, w, h| {
            let (left, right) = (MARGIN, w - MARGIN);
            let scale = ValueScale::new(totals.values(), MARGIN, h - MARGIN);
            draw_axes(root, &scale, left, right)?;

            let n = totals.len();
            let points: Vec<(i32, i32)> = totals
                .values()
                .enumerate()
                .map(|(i, v)| {
                    let x = if n <= 1 {
                        (left + right) / 2
                    } else {
                        left + ((right - left) as usize * i / (n - 1)) as i32
                    };
                    (x, scale.y(*v))
                })
                .collect();
            root.draw(&PathElement::new(points.clone(), LINE_BLUE.stroke_width(2)))
                .map_err(plot_err)?;
            for p in points {
                root.draw(&Circle::new(p, 5, LINE_BLUE.filled()))
                    .map_err(plot_err)?;
            }
            Ok(())
        })
    }
}
