//! Ramer-Douglas-Peucker curve simplification.

/// A point in the 2D plane a series is projected into before simplifying.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Distance from `p0` to the line through `p1` and `p2`.
///
/// Degenerates to the distance from `p0` to `p1` when both line points coincide.
#[must_use]
pub fn perpendicular_distance(p0: Vec2, p1: Vec2, p2: Vec2) -> f64 {
    let dx = p2.x - p1.x;
    let dy = p2.y - p1.y;
    let den = dx * dx + dy * dy;
    if den.abs() < f64::EPSILON {
        return (p0.x - p1.x).hypot(p0.y - p1.y);
    }
    let num = dy * p0.x - dx * p0.y + p2.x * p1.y - p2.y * p1.x;
    num.abs() / den.sqrt()
}

/// Simplify `points` with tolerance `epsilon`.
///
/// Produces the same output as the textbook recursive formulation, using an
/// explicit work stack so long series cannot exhaust the call stack. The
/// first and last points are always kept.
pub fn ramer_douglas_peucker<T: Clone>(
    points: &[T],
    epsilon: f64,
    to_vec2: impl Fn(&T) -> Vec2,
) -> Vec<T> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }

    let projected: Vec<Vec2> = points.iter().map(&to_vec2).collect();
    let mut keep = vec![false; n];
    keep[0] = true;
    keep[n - 1] = true;

    let mut stack = vec![(0, n - 1)];
    while let Some((first, last)) = stack.pop() {
        let mut max_distance = 0.0;
        let mut index = first;
        for (offset, p) in projected[first + 1..last].iter().enumerate() {
            let d = perpendicular_distance(*p, projected[first], projected[last]);
            if d > max_distance {
                max_distance = d;
                index = first + 1 + offset;
            }
        }

        if max_distance > epsilon {
            keep[index] = true;
            stack.push((index, last));
            stack.push((first, index));
        }
    }

    points
        .iter()
        .zip(keep)
        .filter_map(|(p, kept)| kept.then(|| p.clone()))
        .collect()
}

/// Reduce `points` to at most `target` entries (never fewer than the two
/// endpoints).
///
/// A slice that already fits is returned unchanged. Otherwise the starting
/// tolerance is `floor(len / target / 2)`, doubled until the result fits.
pub fn simplify<T: Clone>(points: &[T], target: usize, to_vec2: impl Fn(&T) -> Vec2) -> Vec<T> {
    let target = target.max(2);
    if points.len() <= target {
        return points.to_vec();
    }

    #[allow(clippy::cast_precision_loss)]
    let mut epsilon = (points.len() / target / 2) as f64;
    loop {
        let simplified = ramer_douglas_peucker(points, epsilon, &to_vec2);
        if simplified.len() <= target || !epsilon.is_finite() {
            return simplified;
        }
        epsilon = if epsilon < 1.0 { 1.0 } else { epsilon * 2.0 };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn as_vec2(p: &(f64, f64)) -> Vec2 {
        Vec2::new(p.0, p.1)
    }

    #[test]
    fn test_perpendicular_distance() {
        let d = perpendicular_distance(Vec2::new(1.0, 1.0), Vec2::new(0.0, 0.0), Vec2::new(2.0, 0.0));
        assert!((d - 1.0).abs() < 1e-9);

        let same = perpendicular_distance(Vec2::new(3.0, 4.0), Vec2::new(0.0, 0.0), Vec2::new(0.0, 0.0));
        assert!((same - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_straight_line_collapses_to_endpoints() {
        let points: Vec<(f64, f64)> = (0..10).map(|i| (f64::from(i), 2.0 * f64::from(i))).collect();
        let out = ramer_douglas_peucker(&points, 0.5, as_vec2);
        assert_eq!(out, vec![(0.0, 0.0), (9.0, 18.0)]);
    }

    #[test]
    fn test_keeps_peak() {
        let points = vec![(0.0, 0.0), (1.0, 0.1), (2.0, 5.0), (3.0, 0.1), (4.0, 0.0)];
        let out = ramer_douglas_peucker(&points, 1.0, as_vec2);
        assert_eq!(out, vec![(0.0, 0.0), (2.0, 5.0), (4.0, 0.0)]);
    }

    #[test]
    fn test_zero_epsilon_keeps_every_deviating_point() {
        let points = vec![(0.0, 0.0), (1.0, 1.0), (2.0, 0.0), (3.0, 1.0)];
        let out = ramer_douglas_peucker(&points, 0.0, as_vec2);
        assert_eq!(out, points);
    }

    #[test]
    fn test_simplify_noop_at_or_below_target() {
        let points = vec![(0.0, 3.0), (1.0, 9.0), (2.0, 1.0)];
        assert_eq!(simplify(&points, 3, as_vec2), points);
        assert_eq!(simplify(&points, 10, as_vec2), points);
        assert!(simplify::<(f64, f64)>(&[], 5, as_vec2).is_empty());
        assert_eq!(simplify(&[(1.0, 1.0)], 0, as_vec2), vec![(1.0, 1.0)]);
    }

    #[test]
    fn test_simplify_hits_target_and_keeps_endpoints() {
        let points: Vec<(f64, f64)> = (0..1000)
            .map(|i| (f64::from(i), f64::from((i * 37) % 101)))
            .collect();
        let out = simplify(&points, 50, as_vec2);

        assert!(out.len() <= 50);
        assert_eq!(out.first(), points.first());
        assert_eq!(out.last(), points.last());
        assert!(out.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn test_dense_series_at_zero_epsilon() {
        // Alternating spikes split off one point per step.
        let points: Vec<(f64, f64)> = (0..10_000)
            .map(|i| (f64::from(i), if i % 2 == 0 { 0.0 } else { 1000.0 }))
            .collect();
        let out = ramer_douglas_peucker(&points, 0.0, as_vec2);
        assert_eq!(out.len(), points.len());
    }
}
