//! Offline route steps.
//!
//! Curated GPX routes can be ridden without a directions provider: the
//! turn at each waypoint is derived from the bearing change between the
//! incoming and outgoing legs, and emitted with the provider's maneuver
//! vocabulary so the engine treats both sources the same way.

use serde::Serialize;

use crate::convert::simplify;
use crate::geo::{bearing, distance_m, Coordinate};
use crate::steps::RouteStep;

/// RDP tolerance for turning a recorded track into steps. Keeps bends
/// of a road while dropping GPS jitter along straight stretches.
pub const DEFAULT_TRACK_TOLERANCE_M: f64 = 10.0;

/// Turn direction categories.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Turn {
    Depart,
    Straight,
    SlightLeft,
    Left,
    SharpLeft,
    SlightRight,
    Right,
    SharpRight,
    UTurn,
    Arrive,
}

impl Turn {
    /// Provider `(type, modifier)` pair for this turn.
    pub fn maneuver(self) -> (&'static str, Option<&'static str>) {
        match self {
            Turn::Depart => ("depart", None),
            Turn::Straight => ("continue", Some("straight")),
            Turn::SlightLeft => ("turn", Some("slight left")),
            Turn::Left => ("turn", Some("left")),
            Turn::SharpLeft => ("turn", Some("sharp left")),
            Turn::SlightRight => ("turn", Some("slight right")),
            Turn::Right => ("turn", Some("right")),
            Turn::SharpRight => ("turn", Some("sharp right")),
            Turn::UTurn => ("turn", Some("uturn")),
            Turn::Arrive => ("arrive", None),
        }
    }

    fn text(self) -> &'static str {
        match self {
            Turn::Depart => "Start riding",
            Turn::Straight => "Continue straight",
            Turn::SlightLeft => "Keep slightly left",
            Turn::Left => "Turn left",
            Turn::SharpLeft => "Turn sharp left",
            Turn::SlightRight => "Keep slightly right",
            Turn::Right => "Turn right",
            Turn::SharpRight => "Turn sharp right",
            Turn::UTurn => "Make a U-turn",
            Turn::Arrive => "You have arrived",
        }
    }
}

/// Build route steps from a waypoint polyline.
///
/// One step per waypoint: `depart` at the first, `arrive` at the last,
/// a classified turn in between. Each step's distance is the leg to the
/// following waypoint. Fewer than 2 points yield no steps.
pub fn steps_from_points(points: &[Coordinate]) -> Vec<RouteStep> {
    if points.len() < 2 {
        return Vec::new();
    }

    let last = points.len() - 1;
    (0..=last)
        .map(|i| {
            let turn = match i {
                0 => Turn::Depart,
                i if i == last => Turn::Arrive,
                i => compute_turn(&points[i - 1], &points[i], &points[i + 1]),
            };
            let leg = if i < last { distance_m(&points[i], &points[i + 1]) } else { 0.0 };

            let instruction = match turn {
                Turn::Arrive => turn.text().to_string(),
                _ => format!("{}, then ride {}", turn.text(), format_distance(leg)),
            };
            let (maneuver_type, modifier) = turn.maneuver();

            RouteStep {
                maneuver_location: points[i],
                instruction,
                maneuver_type: maneuver_type.to_string(),
                maneuver_modifier: modifier.map(str::to_string),
                distance_m: leg,
            }
        })
        .collect()
}

/// Build route steps from a dense recorded track, first dropping
/// points within `tolerance_m` of the simplified line.
pub fn steps_from_track(points: &[Coordinate], tolerance_m: f64) -> Vec<RouteStep> {
    steps_from_points(&simplify(points, tolerance_m))
}

/// Compute the turn direction at point B given the approach from A
/// and the exit toward C.
fn compute_turn(a: &Coordinate, b: &Coordinate, c: &Coordinate) -> Turn {
    // Relative angle: positive = right turn, negative = left turn
    let mut angle = bearing(b, c) - bearing(a, b);

    // Normalize to [-180, 180]
    while angle > 180.0 {
        angle -= 360.0;
    }
    while angle < -180.0 {
        angle += 360.0;
    }

    classify_turn(angle)
}

/// Classify a relative bearing angle into a turn direction.
fn classify_turn(angle: f64) -> Turn {
    let abs_angle = angle.abs();

    if abs_angle > 170.0 {
        Turn::UTurn
    } else if abs_angle > 120.0 {
        if angle > 0.0 { Turn::SharpRight } else { Turn::SharpLeft }
    } else if abs_angle > 60.0 {
        if angle > 0.0 { Turn::Right } else { Turn::Left }
    } else if abs_angle > 20.0 {
        if angle > 0.0 { Turn::SlightRight } else { Turn::SlightLeft }
    } else {
        Turn::Straight
    }
}

/// Human-readable distance for instruction text.
pub fn format_distance(meters: f64) -> String {
    if meters >= 1000.0 {
        format!("{:.1} km", meters / 1000.0)
    } else {
        format!("{} m", (meters / 10.0).round() as i64 * 10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(lat: f64, lng: f64) -> Coordinate {
        Coordinate::new(lat, lng)
    }

    #[test]
    fn classify_straight() {
        assert_eq!(classify_turn(5.0), Turn::Straight);
        assert_eq!(classify_turn(-10.0), Turn::Straight);
    }

    #[test]
    fn classify_right_turn() {
        assert_eq!(classify_turn(90.0), Turn::Right);
        assert_eq!(classify_turn(-90.0), Turn::Left);
        assert_eq!(classify_turn(30.0), Turn::SlightRight);
        assert_eq!(classify_turn(-150.0), Turn::SharpLeft);
    }

    #[test]
    fn classify_u_turn() {
        assert_eq!(classify_turn(175.0), Turn::UTurn);
        assert_eq!(classify_turn(-175.0), Turn::UTurn);
    }

    #[test]
    fn straight_route_steps() {
        let route = vec![pt(35.00, 135.0), pt(35.01, 135.0), pt(35.02, 135.0)];
        let steps = steps_from_points(&route);

        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0].maneuver_type, "depart");
        assert_eq!(steps[1].maneuver_type, "continue");
        assert_eq!(steps[1].maneuver_modifier.as_deref(), Some("straight"));
        assert_eq!(steps[2].maneuver_type, "arrive");
        assert_eq!(steps[2].distance_m, 0.0);
        assert_eq!(steps[1].maneuver_location, route[1]);
    }

    #[test]
    fn right_turn_step() {
        // North then east
        let route = vec![pt(35.00, 135.00), pt(35.01, 135.00), pt(35.01, 135.01)];
        let steps = steps_from_points(&route);

        assert_eq!(steps[1].maneuver_type, "turn");
        assert_eq!(steps[1].maneuver_modifier.as_deref(), Some("right"));
        assert!(steps[1].instruction.starts_with("Turn right"));
        assert_eq!(steps[1].icon(), "↪️");
    }

    #[test]
    fn leg_distance_is_to_next_waypoint() {
        let route = vec![pt(0.0, 0.0), pt(0.0, 0.001)];
        let steps = steps_from_points(&route);
        assert!((steps[0].distance_m - 111.195).abs() < 0.01);
        assert_eq!(steps[0].instruction, "Start riding, then ride 110 m");
        assert_eq!(steps[1].instruction, "You have arrived");
    }

    #[test]
    fn too_few_points() {
        assert!(steps_from_points(&[pt(35.0, 135.0)]).is_empty());
        assert!(steps_from_points(&[]).is_empty());
    }

    #[test]
    fn dense_track_collapses_to_corners() {
        // L-shaped track sampled every ~100 m
        let mut track: Vec<Coordinate> = (0..=10).map(|i| pt(35.0, 135.0 + i as f64 * 0.001)).collect();
        track.extend((1..=10).map(|i| pt(35.0 + i as f64 * 0.001, 135.01)));

        let steps = steps_from_track(&track, 10.0);
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[1].maneuver_modifier.as_deref(), Some("left"));
    }

    #[test]
    fn format_distance_meters() {
        assert_eq!(format_distance(150.0), "150 m");
        assert_eq!(format_distance(5.0), "10 m");
    }

    #[test]
    fn format_distance_km() {
        assert_eq!(format_distance(2500.0), "2.5 km");
    }
}
