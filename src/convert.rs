//! Polyline simplification.
//!
//! Recorded tracks carry a point every few meters; turning them into
//! rideable steps needs only the points where the direction changes.
//! Uses the Ramer-Douglas-Peucker algorithm.

use crate::geo::Coordinate;

/// Meters per degree of latitude in the local planar approximation.
const M_PER_DEG: f64 = 111_320.0;

/// Ramer-Douglas-Peucker line simplification.
///
/// `tolerance_m` controls simplification aggressiveness. Typical values:
/// - 10.0: light simplification, keeps most detail
/// - 50.0: moderate, good for navigation waypoints
/// - 100.0: aggressive, only major direction changes
///
/// Endpoints are always kept.
pub fn simplify(points: &[Coordinate], tolerance_m: f64) -> Vec<Coordinate> {
    if points.len() <= 2 {
        return points.to_vec();
    }

    let first = &points[0];
    let last = &points[points.len() - 1];

    // Find the point with maximum distance from the line
    let mut max_dist = 0.0;
    let mut max_idx = 0;

    for (i, p) in points.iter().enumerate().skip(1).take(points.len() - 2) {
        let dist = perpendicular_distance_m(p, first, last);
        if dist > max_dist {
            max_dist = dist;
            max_idx = i;
        }
    }

    if max_dist > tolerance_m {
        let mut left = simplify(&points[..=max_idx], tolerance_m);
        let right = simplify(&points[max_idx..], tolerance_m);

        // Remove duplicate junction point
        left.pop();
        left.extend(right);
        left
    } else {
        vec![*first, *last]
    }
}

/// Perpendicular distance from point P to the line through A and B, in meters.
///
/// Uses a planar approximation with latitude-cosine scaling.
fn perpendicular_distance_m(p: &Coordinate, a: &Coordinate, b: &Coordinate) -> f64 {
    let cos_lat = ((a.lat + b.lat) / 2.0).to_radians().cos();
    let m_per_deg_lng = M_PER_DEG * cos_lat;

    let ax = a.lng * m_per_deg_lng;
    let ay = a.lat * M_PER_DEG;
    let bx = b.lng * m_per_deg_lng;
    let by = b.lat * M_PER_DEG;
    let px = p.lng * m_per_deg_lng;
    let py = p.lat * M_PER_DEG;

    let dx = bx - ax;
    let dy = by - ay;
    let len_sq = dx * dx + dy * dy;

    if len_sq < 1e-10 {
        // Closed loop: fall back to distance from the shared endpoint
        return ((px - ax).powi(2) + (py - ay).powi(2)).sqrt();
    }

    let cross = ((px - ax) * dy - (py - ay) * dx).abs();
    cross / len_sq.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(lat: f64, lng: f64) -> Coordinate {
        Coordinate::new(lat, lng)
    }

    #[test]
    fn high_tolerance_keeps_endpoints() {
        let points = vec![pt(35.0, 135.0), pt(35.001, 135.001), pt(35.0, 135.002)];
        let result = simplify(&points, 1000.0);
        assert_eq!(result, vec![points[0], points[2]]);
    }

    #[test]
    fn keeps_sharp_corner() {
        let points = vec![
            pt(35.0, 135.0),
            pt(35.0, 135.01),
            pt(35.0, 135.02), // corner
            pt(35.01, 135.02),
            pt(35.02, 135.02),
        ];

        let result = simplify(&points, 10.0);
        assert_eq!(result.len(), 3);
        assert_eq!(result[1], points[2]);
    }

    #[test]
    fn zero_tolerance_keeps_everything_off_line() {
        let points = vec![pt(35.0, 135.0), pt(35.001, 135.001), pt(35.0, 135.002)];
        assert_eq!(simplify(&points, 0.0).len(), 3);
    }

    #[test]
    fn two_points_unchanged() {
        let points = vec![pt(0.0, 0.0), pt(1.0, 1.0)];
        assert_eq!(simplify(&points, 100.0).len(), 2);
    }

    #[test]
    fn straight_line_collapses() {
        let points = vec![
            pt(35.0, 135.0),
            pt(35.0, 135.005),
            pt(35.0, 135.01),
            pt(35.0, 135.015),
            pt(35.0, 135.02),
        ];
        assert_eq!(simplify(&points, 10.0).len(), 2);
    }

    #[test]
    fn closed_loop_keeps_far_point() {
        let points = vec![pt(35.0, 135.0), pt(35.01, 135.0), pt(35.0, 135.0)];
        assert_eq!(simplify(&points, 50.0).len(), 3);
    }
}
