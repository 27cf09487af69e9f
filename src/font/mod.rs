//! Font machinery: the sfnt (TrueType) parser and glyph-outline walking.
//!
//! Font dictionaries are ordinary PostScript dictionaries; a Type 42 font's
//! `/sfnts` strings are concatenated and parsed into a `TrueTypeFontFile`
//! held in the interpreter's font collection, keyed by FontID.

pub mod true_type;

use true_type::{Glyph, GlyphPoint};

/// One step of a glyph outline in font units
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutlineSegment {
    MoveTo { x: f64, y: f64 },
    LineTo { x: f64, y: f64 },
    /// Quadratic Bézier with a single off-curve control point
    QuadTo { cx: f64, cy: f64, x: f64, y: f64 },
    Close,
}

/// Walks a glyph's contours, synthesizing implied on-curve midpoints between
/// consecutive off-curve points. A TrueType-aware backend feeds these
/// segments into its path machinery
pub fn walk_glyph_outline(glyph: &Glyph, mut sink: impl FnMut(OutlineSegment)) {
    let mut start = 0usize;

    for &end in &glyph.end_points_of_contours {
        let contour = &glyph.points[start..=end as usize];
        walk_contour(contour, &mut sink);
        start = end as usize + 1;
    }
}

fn midpoint(a: &GlyphPoint, b: &GlyphPoint) -> (f64, f64) {
    ((a.x + b.x) / 2.0, (a.y + b.y) / 2.0)
}

fn walk_contour(contour: &[GlyphPoint], sink: &mut impl FnMut(OutlineSegment)) {
    if contour.is_empty() {
        return;
    }

    // start at the first on-curve point; when every point is off-curve, a
    // midpoint stands in for it
    let first_on = contour.iter().position(|p| p.on_curve);

    let (start_x, start_y) = match first_on {
        Some(index) => (contour[index].x, contour[index].y),
        None => midpoint(&contour[contour.len() - 1], &contour[0]),
    };

    sink(OutlineSegment::MoveTo {
        x: start_x,
        y: start_y,
    });

    let n = contour.len();
    // with no on-curve point, iteration starts with point 0 as the first
    // control
    let rotation = first_on.unwrap_or(n - 1);

    let mut i = 0;
    while i < n {
        let current = &contour[(rotation + i + 1) % n];

        if current.on_curve {
            sink(OutlineSegment::LineTo {
                x: current.x,
                y: current.y,
            });
            i += 1;
            continue;
        }

        // off-curve control; the segment ends at the next on-curve point or
        // at the midpoint of two consecutive off-curve points
        let next = &contour[(rotation + i + 2) % n];
        let (end_x, end_y) = if next.on_curve {
            (next.x, next.y)
        } else {
            midpoint(current, next)
        };

        sink(OutlineSegment::QuadTo {
            cx: current.x,
            cy: current.y,
            x: end_x,
            y: end_y,
        });

        i += if next.on_curve { 2 } else { 1 };
    }

    sink(OutlineSegment::Close);
}
