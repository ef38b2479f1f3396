//! Scanline fills into a [`BlurMask`], sampled at pixel centers.
//!
//! Every fill clips to the mask bounds and unions into existing coverage.

use crate::masking::domain::blur_mask::BlurMask;
use crate::shared::geometry::{Point, Rect};

/// Fills a closed polygon using the non-zero winding rule, hard-edged.
pub fn fill_polygon(mask: &mut BlurMask, points: &[Point], value: u8) {
    if points.len() < 3 {
        return;
    }
    let (min_y, max_y) = points
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
            (lo.min(p.y), hi.max(p.y))
        });
    let Some((row_start, row_end)) = rows_between(min_y, max_y, mask.height()) else {
        return;
    };

    let mut crossings: Vec<(f64, i32)> = Vec::with_capacity(points.len());
    for row in row_start..row_end {
        let sy = row as f64 + 0.5;
        crossings.clear();
        for (i, a) in points.iter().enumerate() {
            let b = points[(i + 1) % points.len()];
            let upward = a.y <= sy && sy < b.y;
            let downward = b.y <= sy && sy < a.y;
            if upward || downward {
                let x = a.x + (sy - a.y) * (b.x - a.x) / (b.y - a.y);
                crossings.push((x, if upward { 1 } else { -1 }));
            }
        }
        crossings.sort_by(|l, r| l.0.total_cmp(&r.0));

        let mut winding = 0;
        for pair in crossings.windows(2) {
            winding += pair[0].1;
            if winding != 0 {
                fill_span(mask, row, pair[0].0, pair[1].0, value);
            }
        }
    }
}

/// Fills a disc, hard-edged.
pub fn fill_circle(mask: &mut BlurMask, center: Point, radius: f64, value: u8) {
    if !(radius > 0.0) {
        return;
    }
    let Some((row_start, row_end)) =
        rows_between(center.y - radius, center.y + radius, mask.height())
    else {
        return;
    };
    for row in row_start..row_end {
        let dy = row as f64 + 0.5 - center.y;
        let half = radius * radius - dy * dy;
        if half < 0.0 {
            continue;
        }
        let half = half.sqrt();
        fill_span(mask, row, center.x - half, center.x + half, value);
    }
}

/// Fills the ellipse inscribed in `bounds`.
///
/// With `antialias`, boundary pixels get fractional coverage over roughly
/// one pixel so the edge does not stair-step.
pub fn fill_ellipse(mask: &mut BlurMask, bounds: Rect, value: u8, antialias: bool) {
    let a = bounds.width / 2.0;
    let b = bounds.height / 2.0;
    if !(a > 0.0 && b > 0.0) {
        return;
    }
    let c = bounds.center();
    let Some(pixels) = bounds.inflated(1.0).to_pixel_rect(mask.size()) else {
        return;
    };
    let edge_scale = a.min(b);

    for row in pixels.y..pixels.bottom() {
        let ny = (row as f64 + 0.5 - c.y) / b;
        for col in pixels.x..pixels.right() {
            let nx = (col as f64 + 0.5 - c.x) / a;
            let r = (nx * nx + ny * ny).sqrt();
            let coverage = if antialias {
                (0.5 - (r - 1.0) * edge_scale).clamp(0.0, 1.0)
            } else if r <= 1.0 {
                1.0
            } else {
                0.0
            };
            if coverage > 0.0 {
                mask.union_pixel(col, row, (value as f64 * coverage).round() as u8);
            }
        }
    }
}

/// Pixel rows whose centers fall in `[top, bottom]`, clipped to the mask.
fn rows_between(top: f64, bottom: f64, height: u32) -> Option<(u32, u32)> {
    if !(top.is_finite() && bottom.is_finite()) {
        return None;
    }
    let start = (top - 0.5).ceil().max(0.0);
    let end = ((bottom - 0.5).floor() + 1.0).min(height as f64);
    if end <= start {
        return None;
    }
    Some((start as u32, end as u32))
}

/// Fills pixels of `row` whose centers fall in `[x0, x1)`.
fn fill_span(mask: &mut BlurMask, row: u32, x0: f64, x1: f64, value: u8) {
    let start = (x0 - 0.5).ceil().max(0.0);
    let end = (x1 - 0.5).ceil().min(mask.width() as f64);
    if end > start {
        mask.union_span(row, start as u32, end as u32, value);
    }
}
