use std::io::Write as _;
use tempfile::NamedTempFile;
use tiny_skia::{Color, FillRule, Paint, Path, PathBuilder, Pixmap, Stroke, Transform};

use crate::error::MapError;
use crate::models::TrackPoint;

const WIDTH: u32 = 800;
const HEIGHT: u32 = 600;
const PADDING: f64 = 40.0;
/// Minimum span in degrees so a single point still yields a sensible frame.
const MIN_SPAN_DEG: f64 = 2.0;

pub trait MapRenderer: Send + Sync {
    /// Writes a position map to a temporary file that is removed on drop.
    fn render(
        &self,
        position: &TrackPoint,
        track: &[TrackPoint],
        heading: Option<f64>,
    ) -> Result<NamedTempFile, MapError>;
}

/// Plots the flown track and the aircraft's current position as a PNG.
#[derive(Debug, Default, Clone)]
pub struct PngMapRenderer;

struct Frame {
    min_lon: f64,
    max_lat: f64,
    scale: f64,
    x_offset: f64,
    y_offset: f64,
}

impl Frame {
    fn fit(points: &[(f64, f64)]) -> Self {
        let (mut min_lon, mut max_lon) = (f64::MAX, f64::MIN);
        let (mut min_lat, mut max_lat) = (f64::MAX, f64::MIN);
        for &(lon, lat) in points {
            min_lon = min_lon.min(lon);
            max_lon = max_lon.max(lon);
            min_lat = min_lat.min(lat);
            max_lat = max_lat.max(lat);
        }

        let (width, height) = (f64::from(WIDTH), f64::from(HEIGHT));
        let lon_span = (max_lon - min_lon).max(MIN_SPAN_DEG);
        let lat_span = (max_lat - min_lat).max(MIN_SPAN_DEG);
        let scale = ((width - 2.0 * PADDING) / lon_span).min((height - 2.0 * PADDING) / lat_span);

        // Center the content inside the canvas.
        let x_offset = (width - (max_lon - min_lon) * scale) / 2.0;
        let y_offset = (height - (max_lat - min_lat) * scale) / 2.0;

        Self {
            min_lon,
            max_lat,
            scale,
            x_offset,
            y_offset,
        }
    }

    fn project(&self, lon: f64, lat: f64) -> (f32, f32) {
        (
            (self.x_offset + (lon - self.min_lon) * self.scale) as f32,
            (self.y_offset + (self.max_lat - lat) * self.scale) as f32,
        )
    }
}

fn paint(r: u8, g: u8, b: u8) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(r, g, b, 255);
    paint.anti_alias = true;
    paint
}

/// Arrow pointing north at the origin; rotated by the heading when drawn.
fn marker() -> Option<Path> {
    let mut pb = PathBuilder::new();
    pb.move_to(0.0, -12.0);
    pb.line_to(8.0, 10.0);
    pb.line_to(0.0, 5.0);
    pb.line_to(-8.0, 10.0);
    pb.close();
    pb.finish()
}

impl PngMapRenderer {
    pub fn draw(
        position: &TrackPoint,
        track: &[TrackPoint],
        heading: Option<f64>,
    ) -> Result<Pixmap, MapError> {
        let mut ordered: Vec<&TrackPoint> = track.iter().collect();
        ordered.sort_by_key(|p| p.timestamp);

        let mut coords: Vec<(f64, f64)> = ordered.iter().map(|p| (p.lon, p.lat)).collect();
        coords.push((position.lon, position.lat));
        let frame = Frame::fit(&coords);

        let mut pixmap = Pixmap::new(WIDTH, HEIGHT)
            .ok_or_else(|| MapError::Encode(format!("cannot allocate {WIDTH}x{HEIGHT} canvas")))?;
        pixmap.fill(Color::from_rgba8(0xe8, 0xf1, 0xf8, 0xff));

        if ordered.len() > 1 {
            let mut pb = PathBuilder::new();
            for (i, p) in ordered.iter().enumerate() {
                let (x, y) = frame.project(p.lon, p.lat);
                if i == 0 {
                    pb.move_to(x, y);
                } else {
                    pb.line_to(x, y);
                }
            }
            if let Some(path) = pb.finish() {
                let stroke = Stroke {
                    width: 3.0,
                    ..Stroke::default()
                };
                pixmap.stroke_path(&path, &paint(0, 0, 255), &stroke, Transform::identity(), None);
            }
        }

        let (x, y) = frame.project(position.lon, position.lat);
        if let Some(arrow) = marker() {
            let at = Transform::from_rotate(heading.unwrap_or(0.0) as f32).post_translate(x, y);
            pixmap.fill_path(&arrow, &paint(0, 200, 0), FillRule::Winding, at, None);
            let outline = Stroke {
                width: 1.5,
                ..Stroke::default()
            };
            pixmap.stroke_path(&arrow, &paint(0, 80, 0), &outline, at, None);
        }

        Ok(pixmap)
    }
}

impl MapRenderer for PngMapRenderer {
    fn render(
        &self,
        position: &TrackPoint,
        track: &[TrackPoint],
        heading: Option<f64>,
    ) -> Result<NamedTempFile, MapError> {
        let png = Self::draw(position, track, heading)?
            .encode_png()
            .map_err(|e| MapError::Encode(e.to_string()))?;
        let mut file = tempfile::Builder::new()
            .prefix("aircraft-map-")
            .suffix(".png")
            .tempfile()?;
        file.write_all(&png)?;
        file.flush()?;
        Ok(file)
    }
}
