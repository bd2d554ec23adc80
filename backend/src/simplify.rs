use geo::Simplify;
use geo_types::{Coord, LineString};

use crate::models::Coordinate;

pub const DEFAULT_EPSILON_DEG: f64 = 0.0008;
pub const DEFAULT_MAX_POINTS: usize = 50;

/// Reduces a dense route polyline to at most `max_points` waypoints.
///
/// # Algorithm
/// 1. Ramer-Douglas-Peucker with tolerance `epsilon`, in degrees.
/// 2. If still above `max_points`, keep every `stride`-th point of the
///    simplified line, reserving the last slot.
/// 3. Append the original destination when the sampled line stops short of it.
///
/// Inputs with two points or fewer are returned unchanged. The first and last
/// points of the input are always the first and last points of the output,
/// so a `max_points` below 2 behaves as 2; `Config` rejects such values.
pub fn simplify_route(points: &[Coordinate], epsilon: f64, max_points: usize) -> Vec<Coordinate> {
    if points.len() <= 2 {
        return points.to_vec();
    }
    let max_points = max_points.max(2);
    let destination = points[points.len() - 1];

    let line: LineString<f64> = points
        .iter()
        .map(|p| Coord { x: p.lon, y: p.lat })
        .collect();
    let simplified: Vec<Coordinate> = line
        .simplify(&epsilon)
        .0
        .into_iter()
        .map(|c| Coordinate { lat: c.y, lon: c.x })
        .collect();

    let mut kept = if simplified.len() > max_points {
        downsample(&simplified, max_points)
    } else {
        simplified
    };

    if kept.last() != Some(&destination) {
        kept.push(destination);
    }

    tracing::debug!(
        "simplified route from {} to {} points (epsilon={epsilon})",
        points.len(),
        kept.len()
    );
    kept
}

/// Uniform-stride sampling over all but the final point, leaving room for it.
fn downsample(points: &[Coordinate], max_points: usize) -> Vec<Coordinate> {
    let body = &points[..points.len() - 1];
    let slots = max_points - 1;
    let stride = body.len().div_ceil(slots);
    body.iter().step_by(stride).copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Half circle of radius 20 degrees; every vertex bends well above epsilon.
    fn arc(n: usize) -> Vec<Coordinate> {
        (0..n)
            .map(|i| {
                let t = std::f64::consts::PI * i as f64 / (n - 1) as f64;
                Coordinate {
                    lat: 40.0 + 20.0 * t.sin(),
                    lon: 5.0 + 20.0 * t.cos(),
                }
            })
            .collect()
    }

    #[test]
    fn short_input_is_unchanged() {
        let points = vec![Coordinate::new(45.0, 5.0), Coordinate::new(46.0, 6.0)];
        assert_eq!(simplify_route(&points, 10.0, 50), points);
        assert!(simplify_route(&[], 0.1, 50).is_empty());
    }

    #[test]
    fn collinear_points_collapse_to_endpoints() {
        let points: Vec<Coordinate> = (0..20)
            .map(|i| Coordinate::new(45.0 + i as f64 * 0.001, 5.0))
            .collect();
        let simplified = simplify_route(&points, DEFAULT_EPSILON_DEG, DEFAULT_MAX_POINTS);
        assert_eq!(simplified, vec![points[0], points[19]]);
    }

    #[test]
    fn shape_kept_within_tolerance() {
        let points = arc(10);
        let simplified = simplify_route(&points, DEFAULT_EPSILON_DEG, DEFAULT_MAX_POINTS);
        assert_eq!(simplified, points);
    }

    #[test]
    fn dense_route_is_capped_and_keeps_destination() {
        let points = arc(237);
        let simplified = simplify_route(&points, DEFAULT_EPSILON_DEG, DEFAULT_MAX_POINTS);
        assert!(simplified.len() <= DEFAULT_MAX_POINTS);
        assert_eq!(simplified.first(), points.first());
        assert_eq!(simplified.last(), points.last());
    }

    #[test]
    fn just_over_the_cap_still_fits() {
        // floor(99 / 50) would be a stride of one and keep all 99 points.
        let points = arc(99);
        let simplified = simplify_route(&points, DEFAULT_EPSILON_DEG, 50);
        assert!(simplified.len() <= 50);
        assert_eq!(simplified.last(), points.last());
    }

    #[test]
    fn degenerate_cap_keeps_both_ends() {
        let points = arc(30);
        let simplified = simplify_route(&points, DEFAULT_EPSILON_DEG, 0);
        assert_eq!(simplified, vec![points[0], points[29]]);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn valid_coord() -> impl Strategy<Value = Coordinate> {
            (-60.0..=60.0, -170.0..=170.0).prop_map(|(lat, lon)| Coordinate { lat, lon })
        }

        proptest! {
            #[test]
            fn prop_destination_is_preserved(
                points in prop::collection::vec(valid_coord(), 2..400),
                epsilon in 0.0f64..2.0,
                max_points in 2usize..80
            ) {
                let simplified = simplify_route(&points, epsilon, max_points);
                prop_assert_eq!(simplified.last(), points.last());
                prop_assert_eq!(simplified.first(), points.first());
            }

            #[test]
            fn prop_length_is_bounded(
                points in prop::collection::vec(valid_coord(), 3..400),
                epsilon in 0.0f64..2.0,
                max_points in 2usize..80
            ) {
                let simplified = simplify_route(&points, epsilon, max_points);
                prop_assert!(simplified.len() <= max_points);
                prop_assert!(simplified.len() <= points.len());
            }
        }
    }
}
