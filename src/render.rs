use crate::config::MapConfig;
use crate::spatial::RegionIndex;
use crate::types::{ColorScaleBounds, MergedRow};
use anyhow::{Context, Result, anyhow};
use geo::bounding_rect::BoundingRect;
use geo::{LineString, MultiPolygon};
use image::{ImageBuffer, ImageOutputFormat, Rgba, RgbaImage};
use rayon::prelude::*;
use std::f64::consts::PI;
use std::fmt::Write as _;
use std::io::Cursor;
use std::path::Path;

pub const LEGEND_LABEL: &str = "Loomulik iive";

// matplotlib viridis, sampled at nine evenly spaced points
const VIRIDIS: [&str; 9] = [
    "#440154", "#472d7b", "#3b528b", "#2c728e", "#21918c", "#28ae80", "#5ec962", "#addc30", "#fde725",
];

const MAP_PADDING: f64 = 12.0;
const TITLE_HEIGHT: u32 = 40;
const LEGEND_WIDTH: u32 = 110;
const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);

pub fn map_title(year: i32) -> String {
    format!("Loomulik iive maakonniti aastal {}", year)
}

fn hex_to_rgba(hex: &str) -> Rgba<u8> {
    let hex = hex.trim_start_matches('#');
    let r = u8::from_str_radix(&hex[0..2], 16).unwrap_or(0);
    let g = u8::from_str_radix(&hex[2..4], 16).unwrap_or(0);
    let b = u8::from_str_radix(&hex[4..6], 16).unwrap_or(0);
    Rgba([r, g, b, 255])
}

fn rgba_to_hex(color: Rgba<u8>) -> String {
    format!("#{:02x}{:02x}{:02x}", color[0], color[1], color[2])
}

/// Viridis colour at `t` in `0.0..=1.0`, linearly interpolated between stops.
pub fn viridis(t: f64) -> Rgba<u8> {
    let t = t.clamp(0.0, 1.0);
    let scaled = t * (VIRIDIS.len() - 1) as f64;
    let lower = scaled.floor() as usize;
    let upper = (lower + 1).min(VIRIDIS.len() - 1);
    let frac = scaled - lower as f64;

    let a = hex_to_rgba(VIRIDIS[lower]);
    let b = hex_to_rgba(VIRIDIS[upper]);
    let mix = |i: usize| (a[i] as f64 + (b[i] as f64 - a[i] as f64) * frac).round() as u8;
    Rgba([mix(0), mix(1), mix(2), 255])
}

pub fn fill_color(value: i64, bounds: ColorScaleBounds) -> Rgba<u8> {
    viridis(bounds.normalize(value))
}

// Web Mercator at zoom 0, in 0..1 world units with y growing southwards.
fn lon_lat_to_world(lon: f64, lat: f64) -> (f64, f64) {
    let x = (lon + 180.0) / 360.0;
    let lat_rad = lat.to_radians();
    let y = (1.0 - (lat_rad.tan() + (1.0 / lat_rad.cos())).ln() / PI) / 2.0;
    (x, y)
}

fn world_to_lon_lat(x: f64, y: f64) -> (f64, f64) {
    let lon = x * 360.0 - 180.0;
    let lat = (PI * (1.0 - 2.0 * y)).sinh().atan().to_degrees();
    (lon, lat)
}

/// Fits the rows' combined extent into a `width` x `height` pixel box.
#[derive(Debug, Clone, Copy)]
pub struct Projection {
    min_x: f64,
    min_y: f64,
    scale: f64,
    offset_x: f64,
    offset_y: f64,
}

impl Projection {
    pub fn fit<'a, I>(boundaries: I, width: u32, height: u32) -> Option<Self>
    where
        I: IntoIterator<Item = &'a MultiPolygon<f64>>,
    {
        let mut extent: Option<(f64, f64, f64, f64)> = None;
        for rect in boundaries.into_iter().filter_map(|b| b.bounding_rect()) {
            let (x0, y1) = lon_lat_to_world(rect.min().x, rect.min().y);
            let (x1, y0) = lon_lat_to_world(rect.max().x, rect.max().y);
            extent = Some(match extent {
                None => (x0, y0, x1, y1),
                Some((a, b, c, d)) => (a.min(x0), b.min(y0), c.max(x1), d.max(y1)),
            });
        }

        let (min_x, min_y, max_x, max_y) = extent?;
        let span_x = (max_x - min_x).max(f64::EPSILON);
        let span_y = (max_y - min_y).max(f64::EPSILON);
        let avail_w = (width as f64 - 2.0 * MAP_PADDING).max(1.0);
        let avail_h = (height as f64 - 2.0 * MAP_PADDING).max(1.0);
        let scale = (avail_w / span_x).min(avail_h / span_y);

        Some(Self {
            min_x,
            min_y,
            scale,
            offset_x: (width as f64 - span_x * scale) / 2.0,
            offset_y: (height as f64 - span_y * scale) / 2.0,
        })
    }

    pub fn project(&self, lon: f64, lat: f64) -> (f64, f64) {
        let (x, y) = lon_lat_to_world(lon, lat);
        (
            self.offset_x + (x - self.min_x) * self.scale,
            self.offset_y + (y - self.min_y) * self.scale,
        )
    }

    pub fn unproject(&self, px: f64, py: f64) -> (f64, f64) {
        let x = self.min_x + (px - self.offset_x) / self.scale;
        let y = self.min_y + (py - self.offset_y) / self.scale;
        world_to_lon_lat(x, y)
    }
}

pub fn esc(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    out
}

fn ring_path(out: &mut String, ring: &LineString<f64>, projection: &Projection) {
    for (i, coord) in ring.coords().enumerate() {
        let (x, y) = projection.project(coord.x, coord.y);
        let _ = write!(out, "{}{:.1},{:.1}", if i == 0 { 'M' } else { 'L' }, x, y);
    }
    out.push('Z');
}

fn boundary_path(boundary: &MultiPolygon<f64>, projection: &Projection) -> String {
    let mut d = String::new();
    for polygon in boundary {
        ring_path(&mut d, polygon.exterior(), projection);
        for interior in polygon.interiors() {
            ring_path(&mut d, interior, projection);
        }
    }
    d
}

/// Choropleth of natural change as a standalone SVG document: title on top,
/// counties in the middle, colour bar on the right.
pub fn render_map_svg(rows: &[MergedRow], bounds: ColorScaleBounds, year: i32, map: &MapConfig) -> String {
    let width = map.width + LEGEND_WIDTH;
    let height = map.height + TITLE_HEIGHT;
    let mut svg = String::new();

    let _ = write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" class="choropleth" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"#
    );
    svg.push_str(r#"<defs><linearGradient id="iive-scale" x1="0" y1="1" x2="0" y2="0">"#);
    for (i, stop) in VIRIDIS.iter().enumerate() {
        let offset = i as f64 / (VIRIDIS.len() - 1) as f64;
        let _ = write!(svg, r#"<stop offset="{:.3}" stop-color="{}"/>"#, offset, stop);
    }
    svg.push_str("</linearGradient></defs>");

    let _ = write!(
        svg,
        r#"<text class="map-title" x="{}" y="26" text-anchor="middle" font-size="18">{}</text>"#,
        map.width / 2,
        esc(&map_title(year))
    );

    let _ = write!(svg, r#"<g class="regions" transform="translate(0,{})">"#, TITLE_HEIGHT);
    if let Some(projection) = Projection::fit(rows.iter().map(|r| &r.geometry), map.width, map.height) {
        for row in rows {
            let value = row.stats.natural_change();
            let _ = write!(
                svg,
                r##"<path class="region" d="{}" fill="{}" fill-rule="evenodd" stroke="#ffffff" stroke-width="0.6"><title>{}: {}</title></path>"##,
                boundary_path(&row.geometry, &projection),
                rgba_to_hex(fill_color(value, bounds)),
                esc(row.region()),
                value
            );
        }
    }
    svg.push_str("</g>");

    // The bar takes 60% of the map height, like a shrunk matplotlib colorbar.
    let bar_x = map.width + 20;
    let bar_h = (map.height as f64 * 0.6).round();
    let bar_y = TITLE_HEIGHT as f64 + (map.height as f64 - bar_h) / 2.0;
    let _ = write!(
        svg,
        r##"<g class="legend"><rect x="{bar_x}" y="{bar_y:.1}" width="16" height="{bar_h:.1}" fill="url(#iive-scale)" stroke="#333333" stroke-width="0.5"/>"##
    );
    let label_x = bar_x + 22;
    let _ = write!(svg, r#"<text x="{label_x}" y="{:.1}" font-size="11">{}</text>"#, bar_y + 4.0, bounds.max);
    let _ = write!(svg, r#"<text x="{label_x}" y="{:.1}" font-size="11">{}</text>"#, bar_y + bar_h + 4.0, bounds.min);
    let _ = write!(
        svg,
        r#"<text x="{x}" y="{y:.1}" font-size="12" text-anchor="middle" transform="rotate(90 {x} {y:.1})">{label}</text></g>"#,
        x = label_x + 52,
        y = bar_y + bar_h / 2.0,
        label = LEGEND_LABEL
    );

    svg.push_str("</svg>");
    svg
}

/// Raster version of the map: counties on white, colour bar on the right.
pub fn render_map_png(rows: &[MergedRow], bounds: ColorScaleBounds, map: &MapConfig) -> Result<RgbaImage> {
    let map_w = map.width;
    let width = map.width + LEGEND_WIDTH / 2;
    let height = map.height;

    let projection = Projection::fit(rows.iter().map(|r| &r.geometry), map_w, height)
        .ok_or_else(|| anyhow!("No geometry to render"))?;
    let index = RegionIndex::new(rows.iter().map(|r| &r.geometry));
    let colors: Vec<Rgba<u8>> = rows.iter()
        .map(|r| fill_color(r.stats.natural_change(), bounds))
        .collect();

    let bar_x0 = map_w + 15;
    let bar_x1 = bar_x0 + 16;
    let bar_h = (height as f64 * 0.6).round() as u32;
    let bar_y0 = (height - bar_h) / 2;

    let mut buf = vec![0u8; width as usize * height as usize * 4];
    buf.par_chunks_mut(width as usize * 4).enumerate().for_each(|(y, row)| {
        let y = y as u32;
        for x in 0..width {
            let color = if x < map_w {
                let (lon, lat) = projection.unproject(x as f64 + 0.5, y as f64 + 0.5);
                index.locate(lon, lat).map(|i| colors[i]).unwrap_or(BACKGROUND)
            } else if (bar_x0..bar_x1).contains(&x) && (bar_y0..bar_y0 + bar_h).contains(&y) {
                viridis(1.0 - (y - bar_y0) as f64 / bar_h.max(1) as f64)
            } else {
                BACKGROUND
            };
            let offset = x as usize * 4;
            row[offset..offset + 4].copy_from_slice(&color.0);
        }
    });

    ImageBuffer::from_raw(width, height, buf).ok_or_else(|| anyhow!("Raster buffer size mismatch"))
}

pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)
        .context("Failed to encode PNG")?;
    Ok(bytes)
}

/// Writes the map to `path`; `.svg` gets vector output, anything else goes
/// through the image encoder chosen by extension.
pub fn save_map(rows: &[MergedRow], bounds: ColorScaleBounds, year: i32, map: &MapConfig, path: &Path) -> Result<()> {
    let is_svg = path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("svg"))
        .unwrap_or(false);

    if is_svg {
        std::fs::write(path, render_map_svg(rows, bounds, year, map))
            .with_context(|| format!("Failed to write {:?}", path))?;
    } else {
        render_map_png(rows, bounds, map)?
            .save(path)
            .with_context(|| format!("Failed to save map image {:?}", path))?;
    }

    tracing::info!("Wrote map for {} to {:?}", year, path);
    Ok(())
}
