use crate::error::EngineError;
use geo::{
    Area, BooleanOps, Coord, Geometry, LineString, MinimumRotatedRect, MultiPolygon, Polygon,
};
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Deepest the partitioner will go before emitting a piece as-is. With each
/// split strictly shrinking area this is never reached in practice; it bounds
/// the work on near-degenerate slivers where area progress breaks down.
const MAX_SPLIT_DEPTH: usize = 64;

/// Canonicalizes any geometry into a multipolygon. Collections keep only
/// their polygonal parts; points, lines and empty geometries become the
/// empty multipolygon.
pub fn wrap_geometry(geom: Geometry<f64>) -> MultiPolygon<f64> {
    match geom {
        Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
        Geometry::MultiPolygon(mp) => mp,
        Geometry::GeometryCollection(gc) => {
            let mut polygons = Vec::new();
            for part in gc.0 {
                polygons.extend(wrap_geometry(part).0);
            }
            MultiPolygon::new(polygons)
        }
        _ => MultiPolygon::new(vec![]),
    }
}

/// Drops the zero-area parts clipping leaves behind.
pub fn prune(mp: MultiPolygon<f64>) -> MultiPolygon<f64> {
    MultiPolygon::new(
        mp.0.into_iter()
            .filter(|p| p.unsigned_area() > 0.0)
            .collect(),
    )
}

pub fn intersection(
    a: &MultiPolygon<f64>,
    b: &MultiPolygon<f64>,
) -> Result<MultiPolygon<f64>, EngineError> {
    guarded(|| a.intersection(b), "intersection")
}

pub fn difference(
    a: &MultiPolygon<f64>,
    b: &MultiPolygon<f64>,
) -> Result<MultiPolygon<f64>, EngineError> {
    guarded(|| a.difference(b), "difference")
}

// The boolean kernel panics on some malformed inputs instead of returning a
// Result. Contain that here so a bad region fails the render cleanly.
fn guarded(
    op: impl FnOnce() -> MultiPolygon<f64>,
    what: &'static str,
) -> Result<MultiPolygon<f64>, EngineError> {
    catch_unwind(AssertUnwindSafe(op))
        .map(prune)
        .map_err(|_| EngineError::GeometryOperationFailed(what))
}

/// Splits a multipolygon in two across the shorter dimension of its
/// minimum-area rotated bounding rectangle, keeping the halves close to
/// square. Returns `None` when the bounding rectangle is too degenerate to
/// cut (empty input, or a point-like collapse).
///
/// The two candidate cut chords join the midpoints of opposite rectangle
/// edges; the cut runs across the longer chord. Each half-rectangle is then
/// intersected with the input, so the halves' union reconstructs it.
pub fn split(
    mp: &MultiPolygon<f64>,
) -> Result<Option<(MultiPolygon<f64>, MultiPolygon<f64>)>, EngineError> {
    let Some(mrr) = mp.minimum_rotated_rect() else {
        return Ok(None);
    };
    // Closed ring: first four coords are the distinct corners.
    let ring = &mrr.exterior().0;
    if ring.len() < 5 {
        return Ok(None);
    }
    let corners = [ring[0], ring[1], ring[2], ring[3]];
    let midpoints = [
        midpoint(corners[0], corners[1]),
        midpoint(corners[1], corners[2]),
        midpoint(corners[2], corners[3]),
        midpoint(corners[3], corners[0]),
    ];

    let chord1 = distance(midpoints[0], midpoints[2]);
    let chord2 = distance(midpoints[1], midpoints[3]);
    if chord1 <= f64::EPSILON && chord2 <= f64::EPSILON {
        return Ok(None);
    }

    let (half1, half2) = if chord1 > chord2 {
        (
            quad(corners[0], corners[1], midpoints[1], midpoints[3]),
            quad(midpoints[1], corners[2], corners[3], midpoints[3]),
        )
    } else {
        (
            quad(corners[0], midpoints[0], midpoints[2], corners[3]),
            quad(midpoints[0], corners[1], corners[2], midpoints[2]),
        )
    };

    let left = intersection(mp, &half1)?;
    let right = intersection(mp, &half2)?;
    Ok(Some((left, right)))
}

/// Cuts a multipolygon into pieces no larger than `threshold`, depth-first
/// with the left branch of every split fully expanded before the right, so
/// the output order is stable for a given input.
///
/// A piece whose split makes no strict area progress (degenerate geometry)
/// is emitted oversized rather than recursed on; together with the depth
/// bound this guarantees termination. Empty pieces are dropped.
pub fn partition(
    mp: MultiPolygon<f64>,
    threshold: f64,
) -> Result<Vec<MultiPolygon<f64>>, EngineError> {
    if threshold <= 0.0 {
        return Err(EngineError::InvalidConfiguration(format!(
            "area threshold must be positive, got {threshold}"
        )));
    }

    let mut pieces = Vec::new();
    let mut stack = vec![(mp, 0usize)];
    while let Some((piece, depth)) = stack.pop() {
        let area = piece.unsigned_area();
        if area == 0.0 {
            continue;
        }
        if area <= threshold || depth >= MAX_SPLIT_DEPTH {
            pieces.push(piece);
            continue;
        }
        match split(&piece)? {
            Some((left, right))
                if left.unsigned_area() < area && right.unsigned_area() < area =>
            {
                // Right below left so the left branch unwinds first.
                stack.push((right, depth + 1));
                stack.push((left, depth + 1));
            }
            _ => pieces.push(piece),
        }
    }
    Ok(pieces)
}

/// Per-polygon coordinate lists along both axes: for each polygon the
/// exterior ring first, then its holes. The nesting the front end's
/// multi-polygon glyph expects.
pub fn unroll(mp: &MultiPolygon<f64>) -> (Vec<Vec<Vec<f64>>>, Vec<Vec<Vec<f64>>>) {
    let mut xs = Vec::with_capacity(mp.0.len());
    let mut ys = Vec::with_capacity(mp.0.len());
    for polygon in &mp.0 {
        let rings: Vec<&LineString<f64>> =
            std::iter::once(polygon.exterior()).chain(polygon.interiors()).collect();
        xs.push(rings.iter().map(|r| r.0.iter().map(|c| c.x).collect()).collect());
        ys.push(rings.iter().map(|r| r.0.iter().map(|c| c.y).collect()).collect());
    }
    (xs, ys)
}

fn midpoint(a: Coord<f64>, b: Coord<f64>) -> Coord<f64> {
    Coord {
        x: (a.x + b.x) / 2.0,
        y: (a.y + b.y) / 2.0,
    }
}

fn distance(a: Coord<f64>, b: Coord<f64>) -> f64 {
    ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
}

fn quad(a: Coord<f64>, b: Coord<f64>, c: Coord<f64>, d: Coord<f64>) -> MultiPolygon<f64> {
    MultiPolygon::new(vec![Polygon::new(
        LineString::from(vec![a, b, c, d, a]),
        vec![],
    )])
}
