// Stencil math: fill contours, combine masks, soften edges.
// Visual expectation: none of this is drawn directly; it decides where a step's color
// is allowed to show up (inside the lips ring, inside the face, ...).
//
// Every operation here is total: for stencils of matching size it always succeeds.
use crate::types::{AlphaStencil, Point, mul_255};

/// How overlapping contours in one fill are resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FillRule {
    /// Each contour fills on its own; overlaps stay filled.
    NonZero,
    /// Overlaps cancel; an inner contour punches a hole (used for the lips ring).
    EvenOdd,
}

/// Rasterize closed polygons into a binary stencil, sampling at pixel centers.
/// Visual: white where the shape is, transparent elsewhere.
pub fn fill_polygons(width: usize, height: usize, polygons: &[Vec<Point>], rule: FillRule) -> AlphaStencil {
    let mut out = AlphaStencil::empty(width, height);
    scan_fill(&mut out, polygons, rule);
    out
}

fn scan_fill(out: &mut AlphaStencil, polygons: &[Vec<Point>], rule: FillRule) {
    let mut crossings: Vec<(f32, i32)> = Vec::new();
    for y in 0..out.height {
        let sy = y as f32 + 0.5;
        crossings.clear();

        for poly in polygons.iter().filter(|p| p.len() >= 3) {
            for (i, &p0) in poly.iter().enumerate() {
                let p1 = poly[(i + 1) % poly.len()];
                if p0.y == p1.y {
                    continue;
                }
                let (lo, hi) = if p0.y < p1.y { (p0.y, p1.y) } else { (p1.y, p0.y) };
                // Half-open span so a vertex shared by two edges is counted once.
                if sy < lo || sy >= hi {
                    continue;
                }
                let x = p0.x + (sy - p0.y) * (p1.x - p0.x) / (p1.y - p0.y);
                let dir = if p1.y > p0.y { 1 } else { -1 };
                crossings.push((x, dir));
            }
        }
        if crossings.len() < 2 {
            continue;
        }
        crossings.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut winding = 0;
        for (k, &(x, dir)) in crossings.iter().enumerate() {
            let inside_before = match rule {
                FillRule::EvenOdd => k % 2 == 1,
                FillRule::NonZero => winding != 0,
            };
            winding += dir;
            if inside_before && k > 0 {
                fill_span(out, y, crossings[k - 1].0, x);
            }
        }
    }
}

/// Set pixels whose centers fall in [x0, x1).
fn fill_span(out: &mut AlphaStencil, y: usize, x0: f32, x1: f32) {
    let start = (x0 - 0.5).ceil().max(0.0) as usize;
    let end = ((x1 - 0.5).ceil().max(0.0) as usize).min(out.width);
    let row = y * out.width;
    for x in start..end {
        out.alpha[row + x] = 255;
    }
}

/// Multiplicative intersection: `a ∩ b`. Full is the identity, empty absorbs, order doesn't matter.
pub fn intersect(a: &AlphaStencil, b: &AlphaStencil) -> AlphaStencil {
    let mut out = a.clone();
    intersect_in_place(&mut out, b);
    out
}

pub fn intersect_in_place(dst: &mut AlphaStencil, other: &AlphaStencil) {
    debug_assert!(other.same_size(dst.width, dst.height));
    for (d, &o) in dst.alpha.iter_mut().zip(other.alpha.iter()) {
        *d = mul_255(*d, o);
    }
}

/// Remove `hole` from `base` wherever the hole is set (destination-out).
pub fn subtract_in_place(base: &mut AlphaStencil, hole: &AlphaStencil) {
    debug_assert!(hole.same_size(base.width, base.height));
    for (d, &h) in base.alpha.iter_mut().zip(hole.alpha.iter()) {
        *d = mul_255(*d, 255 - h);
    }
}

/// Per-pixel max of both stencils.
pub fn union_in_place(dst: &mut AlphaStencil, other: &AlphaStencil) {
    debug_assert!(other.same_size(dst.width, dst.height));
    for (d, &o) in dst.alpha.iter_mut().zip(other.alpha.iter()) {
        *d = (*d).max(o);
    }
}

/// Tight bounding box of non-zero coverage as (min_x, min_y, max_x, max_y), inclusive.
pub fn bounding_box(stencil: &AlphaStencil) -> Option<(usize, usize, usize, usize)> {
    let mut bounds: Option<(usize, usize, usize, usize)> = None;
    for y in 0..stencil.height {
        let row = &stencil.alpha[y * stencil.width..(y + 1) * stencil.width];
        let Some(first) = row.iter().position(|&a| a > 0) else {
            continue;
        };
        let last = row.iter().rposition(|&a| a > 0).unwrap_or(first);
        bounds = Some(match bounds {
            None => (first, y, last, y),
            Some((x0, y0, x1, _)) => (x0.min(first), y0, x1.max(last), y),
        });
    }
    bounds
}

/// Soften edges with a separable box blur of the given radius (0 = unchanged).
/// Edges are extended so the border doesn't darken.
/// Visual: hard polygon edges become a 2–3 px ramp.
pub fn feather(stencil: &AlphaStencil, radius: usize) -> AlphaStencil {
    if radius == 0 || stencil.width == 0 || stencil.height == 0 {
        return stencil.clone();
    }
    let (w, h) = (stencil.width, stencil.height);
    let mut tmp = AlphaStencil::empty(w, h);
    let mut out = AlphaStencil::empty(w, h);

    // Pass 1: horizontal, src → tmp
    for y in 0..h {
        let row = y * w;
        box_line(&stencil.alpha, &mut tmp.alpha, row, 1, w, radius);
    }
    // Pass 2: vertical, tmp → out
    for x in 0..w {
        box_line(&tmp.alpha, &mut out.alpha, x, w, h, radius);
    }
    out
}

/// Sliding-window average over one row or column (`stride` apart, `len` samples).
fn box_line(src: &[u8], dst: &mut [u8], start: usize, stride: usize, len: usize, radius: usize) {
    let r = radius as isize;
    let last = len as isize - 1;
    let win = (2 * radius + 1) as u32;
    let at = |i: isize| src[start + (i.clamp(0, last) as usize) * stride] as u32;

    let mut sum: u32 = (-r..=r).map(at).sum();
    for i in 0..len as isize {
        dst[start + i as usize * stride] = ((sum + win / 2) / win) as u8;
        sum = sum + at(i + r + 1) - at(i - r);
    }
}

/// Grow coverage outward by `margin` pixels (separable max filter).
pub fn dilate(stencil: &AlphaStencil, margin: usize) -> AlphaStencil {
    if margin == 0 {
        return stencil.clone();
    }
    let (w, h) = (stencil.width, stencil.height);
    let mut tmp = AlphaStencil::empty(w, h);
    for y in 0..h {
        for x in 0..w {
            let lo = x.saturating_sub(margin);
            let hi = (x + margin).min(w.saturating_sub(1));
            let row = &stencil.alpha[y * w..(y + 1) * w];
            tmp.alpha[y * w + x] = row[lo..=hi].iter().copied().max().unwrap_or(0);
        }
    }
    let mut out = AlphaStencil::empty(w, h);
    for y in 0..h {
        let lo = y.saturating_sub(margin);
        let hi = (y + margin).min(h.saturating_sub(1));
        for x in 0..w {
            out.alpha[y * w + x] = (lo..=hi).map(|yy| tmp.alpha[yy * w + x]).max().unwrap_or(0);
        }
    }
    out
}

/// Nearest-neighbour resample of a per-pixel id map to (width, height).
pub fn upscale_nearest(ids: &[u8], src_w: usize, src_h: usize, width: usize, height: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(width * height);
    if src_w == 0 || src_h == 0 {
        out.resize(width * height, 0);
        return out;
    }
    for y in 0..height {
        let sy = (y * src_h / height.max(1)).min(src_h - 1);
        for x in 0..width {
            let sx = (x * src_w / width.max(1)).min(src_w - 1);
            out.push(ids[sy * src_w + sx]);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x0: f32, y0: f32, x1: f32, y1: f32) -> Vec<Point> {
        vec![Point::new(x0, y0), Point::new(x1, y0), Point::new(x1, y1), Point::new(x0, y1)]
    }

    fn coverage(s: &AlphaStencil) -> usize {
        s.alpha.iter().filter(|&&a| a == 255).count()
    }

    #[test]
    fn square_fills_exact_pixel_count() {
        let s = fill_polygons(20, 20, &[square(2.0, 3.0, 12.0, 8.0)], FillRule::NonZero);
        assert_eq!(coverage(&s), 10 * 5);
        assert_eq!(s.get(2, 3), 255);
        assert_eq!(s.get(11, 7), 255);
        assert_eq!(s.get(12, 7), 0);
        assert_eq!(bounding_box(&s), Some((2, 3, 11, 7)));
    }

    #[test]
    fn even_odd_punches_a_ring() {
        let outer = square(0.0, 0.0, 10.0, 10.0);
        let inner = square(3.0, 3.0, 7.0, 7.0);
        let ring = fill_polygons(10, 10, &[outer.clone(), inner.clone()], FillRule::EvenOdd);
        assert_eq!(ring.get(5, 5), 0);
        assert_eq!(ring.get(1, 1), 255);
        assert_eq!(coverage(&ring), 100 - 16);

        // Non-zero unions the same pair instead.
        let solid = fill_polygons(10, 10, &[outer, inner], FillRule::NonZero);
        assert_eq!(coverage(&solid), 100);
    }

    #[test]
    fn opposite_windings_cancel_unless_unioned() {
        let mut reversed = square(1.0, 1.0, 5.0, 5.0);
        reversed.reverse();
        let forward = square(3.0, 3.0, 7.0, 7.0);
        let s = fill_polygons(8, 8, &[forward.clone(), reversed.clone()], FillRule::NonZero);
        assert_eq!(s.get(4, 4), 0);
        assert_eq!(coverage(&s), 16 + 16 - 8);

        let mut u = fill_polygons(8, 8, &[forward], FillRule::NonZero);
        union_in_place(&mut u, &fill_polygons(8, 8, &[reversed], FillRule::NonZero));
        assert_eq!(u.get(4, 4), 255);
        assert_eq!(coverage(&u), 16 + 16 - 4);
    }

    #[test]
    fn degenerate_polygons_fill_nothing() {
        let line = vec![Point::new(0.0, 0.0), Point::new(5.0, 5.0)];
        assert!(fill_polygons(8, 8, &[line, Vec::new()], FillRule::NonZero).is_empty());
    }

    #[test]
    fn intersect_identity_commutative_absorbing() {
        let s = AlphaStencil::from_fn(16, 9, |x, y| ((x * 37 + y * 11) % 256) as u8);
        let t = AlphaStencil::from_fn(16, 9, |x, y| ((x * 5 + y * 91) % 256) as u8);
        let full = AlphaStencil::full(16, 9);
        let empty = AlphaStencil::empty(16, 9);

        assert_eq!(intersect(&s, &full), s);
        assert_eq!(intersect(&full, &s), s);
        assert_eq!(intersect(&s, &t), intersect(&t, &s));
        assert_eq!(intersect(&s, &empty), empty);
    }

    #[test]
    fn subtract_removes_hole() {
        let mut base = AlphaStencil::full(4, 1);
        let hole = AlphaStencil::from_fn(4, 1, |x, _| if x < 2 { 255 } else { 0 });
        subtract_in_place(&mut base, &hole);
        assert_eq!(base.alpha, vec![0, 0, 255, 255]);
    }

    #[test]
    fn union_takes_the_stronger_coverage() {
        let mut a = AlphaStencil::from_fn(4, 1, |x, _| [0, 200, 40, 255][x]);
        let b = AlphaStencil::from_fn(4, 1, |x, _| [90, 10, 40, 0][x]);
        union_in_place(&mut a, &b);
        assert_eq!(a.alpha, vec![90, 200, 40, 255]);

        let mut empty = AlphaStencil::empty(4, 1);
        union_in_place(&mut empty, &b);
        assert_eq!(empty, b);
    }

    #[test]
    fn feather_keeps_solid_regions_and_ramps_edges() {
        let s = fill_polygons(20, 20, &[square(5.0, 5.0, 15.0, 15.0)], FillRule::NonZero);
        let f = feather(&s, 1);
        assert_eq!(f.get(10, 10), 255);
        assert_eq!(f.get(0, 0), 0);
        let edge = f.get(5, 10);
        assert!(edge > 0 && edge < 255, "edge = {edge}");
        assert_eq!(feather(&AlphaStencil::full(6, 6), 2), AlphaStencil::full(6, 6));
    }

    #[test]
    fn dilate_grows_by_margin() {
        let mut s = AlphaStencil::empty(9, 9);
        s.set(4, 4, 255);
        let d = dilate(&s, 2);
        assert_eq!(d.get(2, 2), 255);
        assert_eq!(d.get(6, 6), 255);
        assert_eq!(d.get(1, 4), 0);
        assert_eq!(d.alpha.iter().filter(|&&a| a == 255).count(), 25);
    }

    #[test]
    fn nearest_upscale_repeats_cells() {
        let ids = [1u8, 2, 3, 4];
        let up = upscale_nearest(&ids, 2, 2, 4, 4);
        assert_eq!(&up[0..4], &[1, 1, 2, 2]);
        assert_eq!(&up[12..16], &[3, 3, 4, 4]);
    }

    #[test]
    fn empty_stencil_has_no_bounds() {
        assert_eq!(bounding_box(&AlphaStencil::empty(5, 5)), None);
    }
}
