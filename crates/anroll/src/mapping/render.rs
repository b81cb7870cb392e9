//! Image and grid passes over a mapping table.

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use super::{Mapper, MappingTable};
use crate::params::Parameters;

/// Samples per resampled grid line.
pub const GRID_SUBDIVISIONS: usize = 100;

/// Triangulated mesh of mapped points, optionally coloured.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenderData {
    pub width: usize,
    pub height: usize,
    /// Mapped x coordinates, row-major.
    pub x: Vec<f32>,
    /// Mapped y coordinates, row-major.
    pub y: Vec<f32>,
    /// RGBA in `[0, 1]` per point; empty when no source raster was given.
    pub colors: Vec<[f32; 4]>,
    pub triangles: Vec<[u32; 3]>,
}

/// Polylines of the overlay grid.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LineData {
    pub x: Vec<f32>,
    pub y: Vec<f32>,
    /// Index pairs into `x`/`y`.
    pub segments: Vec<[u32; 2]>,
    pub horizontal_lines: usize,
    pub vertical_lines: usize,
}

/// Two triangles per grid quad, row-major vertex indices.
pub fn triangulate(width: usize, height: usize) -> Vec<[u32; 3]> {
    let mut tris = Vec::with_capacity(2 * width.saturating_sub(1) * height.saturating_sub(1));
    for yi in 0..height.saturating_sub(1) {
        for xi in 1..width {
            let top_left = (yi * width + xi - 1) as u32;
            let top = (yi * width + xi) as u32;
            let bottom_left = ((yi + 1) * width + xi - 1) as u32;
            let bottom = ((yi + 1) * width + xi) as u32;
            tris.push([top_left, top, bottom_left]);
            tris.push([top, bottom, bottom_left]);
        }
    }
    tris
}

/// Bilinear RGBA sample; `u` wraps around the vessel, `v` clamps.
fn sample_rgba(img: &RgbaImage, u: f64, v: f64) -> [f32; 4] {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return [0.0; 4];
    }
    let fx = u.rem_euclid(1.0) * w as f64 - 0.5;
    let fy = (v.clamp(0.0, 1.0) * h as f64 - 0.5).clamp(0.0, (h - 1) as f64);
    let x0f = fx.floor();
    let tx = (fx - x0f) as f32;
    let y0 = fy.floor() as u32;
    let ty = (fy - y0 as f64) as f32;
    let x0 = (x0f as i64).rem_euclid(w as i64) as u32;
    let x1 = (x0 + 1) % w;
    let y1 = (y0 + 1).min(h - 1);

    let px = |x: u32, y: u32| img.get_pixel(x, y).0;
    let (a, b, c, d) = (px(x0, y0), px(x1, y0), px(x0, y1), px(x1, y1));
    let mut out = [0.0f32; 4];
    for k in 0..4 {
        let top = a[k] as f32 * (1.0 - tx) + b[k] as f32 * tx;
        let bottom = c[k] as f32 * (1.0 - tx) + d[k] as f32 * tx;
        out[k] = (top * (1.0 - ty) + bottom * ty) / 255.0;
    }
    out
}

/// Map every table point and attach source colours when a raster is given.
///
/// The source coordinate of a table point is its position in the crop
/// window, shifted by the image rotation (wrapping) and vertical shift.
pub fn render_image(
    table: &MappingTable,
    params: &Parameters,
    source: Option<&RgbaImage>,
) -> RenderData {
    let (x, y) = table.points();
    let (w, h) = (table.width(), table.height());
    let colors = match source {
        Some(img) => {
            let frac = |i: usize, n: usize| if n > 1 { i as f64 / (n - 1) as f64 } else { 0.0 };
            let mut colors = Vec::with_capacity(w * h);
            for row in 0..h {
                let v = params.crop_top
                    + (1.0 - params.crop_bottom - params.crop_top) * frac(row, h)
                    + params.vertical_shift;
                for col in 0..w {
                    let u = params.crop_left
                        + (1.0 - params.crop_right - params.crop_left) * frac(col, w)
                        + params.image_rotation;
                    colors.push(sample_rgba(img, u, v));
                }
            }
            colors
        }
        None => Vec::new(),
    };
    RenderData {
        width: w,
        height: h,
        x,
        y,
        colors,
        triangles: triangulate(w, h),
    }
}

/// Uniform Catmull–Rom resampling through `points`, end points repeated.
fn catmull_rom(points: &[[f64; 2]], samples: usize) -> Vec<[f64; 2]> {
    let n = points.len();
    match n {
        0 => return Vec::new(),
        1 => return vec![points[0]; samples],
        _ => {}
    }
    let at = |i: isize| points[i.clamp(0, n as isize - 1) as usize];
    (0..samples)
        .map(|s| {
            let t = (n - 1) as f64 * s as f64 / (samples.max(2) - 1) as f64;
            let seg = (t.floor() as isize).min(n as isize - 2);
            let u = t - seg as f64;
            let (p0, p1, p2, p3) = (at(seg - 1), at(seg), at(seg + 1), at(seg + 2));
            let mut out = [0.0; 2];
            for k in 0..2 {
                out[k] = 0.5
                    * (2.0 * p1[k]
                        + (p2[k] - p0[k]) * u
                        + (2.0 * p0[k] - 5.0 * p1[k] + 4.0 * p2[k] - p3[k]) * u * u
                        + (3.0 * p1[k] - p0[k] - 3.0 * p2[k] + p3[k]) * u * u * u);
            }
            out
        })
        .collect()
}

/// Overlay grid with `grid_x` vertical and `grid_y` horizontal lines, each
/// resampled to [`GRID_SUBDIVISIONS`] points.
pub fn render_grid(mapper: &Mapper<'_>, grid_x: usize, grid_y: usize) -> LineData {
    let table = MappingTable::build(mapper, grid_x, grid_y);
    let mut lines: Vec<Vec<[f64; 2]>> = Vec::with_capacity(grid_x + grid_y);
    for row in 0..grid_y {
        let knots: Vec<[f64; 2]> = (0..grid_x).map(|col| table.point(col, row)).collect();
        lines.push(catmull_rom(&knots, GRID_SUBDIVISIONS));
    }
    for col in 0..grid_x {
        let knots: Vec<[f64; 2]> = (0..grid_y).map(|row| table.point(col, row)).collect();
        lines.push(catmull_rom(&knots, GRID_SUBDIVISIONS));
    }

    let mut out = LineData {
        horizontal_lines: grid_y,
        vertical_lines: grid_x,
        ..LineData::default()
    };
    for line in lines {
        let start = out.x.len() as u32;
        for (i, p) in line.iter().enumerate() {
            out.x.push(p[0] as f32);
            out.y.push(p[1] as f32);
            if i > 0 {
                out.segments.push([start + i as u32 - 1, start + i as u32]);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blend::BlendCurve;
    use crate::contour::ContourModel;
    use crate::mapping::MappingParams;
    use crate::test_utils::vase_samples;
    use approx::assert_abs_diff_eq;
    use image::Rgba;

    #[test]
    fn triangulation_covers_every_quad() {
        let tris = triangulate(4, 3);
        assert_eq!(tris.len(), 2 * 3 * 2);
        assert_eq!(tris[0], [0, 1, 4]);
        assert_eq!(tris[1], [1, 5, 4]);
        assert!(tris.iter().flatten().all(|&i| i < 12));
        assert!(triangulate(1, 5).is_empty());
    }

    #[test]
    fn catmull_rom_interpolates_knots_on_a_line() {
        let knots = [[0.0, 0.0], [1.0, 2.0], [2.0, 4.0], [3.0, 6.0]];
        let out = catmull_rom(&knots, 7);
        assert_eq!(out.len(), 7);
        assert_abs_diff_eq!(out[0][0], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(out[6][1], 6.0, epsilon = 1e-12);
        for p in &out {
            assert_abs_diff_eq!(p[1], 2.0 * p[0], epsilon = 1e-12);
        }
    }

    #[test]
    fn rotation_wraps_horizontally() {
        let mut img = RgbaImage::new(4, 2);
        for y in 0..2 {
            img.put_pixel(0, y, Rgba([255, 0, 0, 255]));
            img.put_pixel(3, y, Rgba([0, 0, 255, 255]));
        }
        let left = sample_rgba(&img, 0.125, 0.5);
        let wrapped = sample_rgba(&img, 1.125, 0.5);
        assert_eq!(left, wrapped);
        let seam = sample_rgba(&img, 0.0, 0.5);
        assert_abs_diff_eq!(seam[0], 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(seam[2], 0.5, epsilon = 1e-6);
    }

    #[test]
    fn image_and_grid_passes_have_consistent_sizes() {
        let contour = ContourModel::fit(&vase_samples(40, 120.0), 1e-6).unwrap();
        let blend = BlendCurve::new(0.5, 0.5);
        let params = Parameters::default();
        let mapper = Mapper::new(&contour, &blend, MappingParams::from(&params));

        let table = MappingTable::build(&mapper, 6, 5);
        let img = RgbaImage::from_pixel(8, 8, Rgba([10, 20, 30, 255]));
        let data = render_image(&table, &params, Some(&img));
        assert_eq!(data.x.len(), 30);
        assert_eq!(data.colors.len(), 30);
        assert_eq!(data.triangles.len(), 2 * 5 * 4);
        assert_abs_diff_eq!(data.colors[7][1], 20.0 / 255.0, epsilon = 1e-6);

        let grid = render_grid(&mapper, 5, 4);
        assert_eq!(grid.x.len(), 9 * GRID_SUBDIVISIONS);
        assert_eq!(grid.segments.len(), 9 * (GRID_SUBDIVISIONS - 1));
        assert_abs_diff_eq!(grid.x[0] as f64, table.point(0, 0)[0], epsilon = 1e-3);
    }
}
