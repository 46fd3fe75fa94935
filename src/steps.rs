//! Route steps and the directions-provider response adapter.
//!
//! A `RouteStep` is one maneuver of the route plan. Steps arrive from a
//! directions or map-matching provider as JSON; this module only parses
//! already-fetched responses; it never talks to the network.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geo::Coordinate;

/// One maneuver of the route plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteStep {
    pub maneuver_location: Coordinate,
    pub instruction: String,
    /// Provider maneuver type, e.g. `depart`, `turn`, `arrive`.
    pub maneuver_type: String,
    /// Provider maneuver modifier, e.g. `left`, `slight right`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maneuver_modifier: Option<String>,
    /// Distance travelled along this step, in meters.
    pub distance_m: f64,
}

impl RouteStep {
    /// Banner glyph for this step's maneuver.
    pub fn icon(&self) -> &'static str {
        maneuver_icon(&self.maneuver_type, self.maneuver_modifier.as_deref())
    }
}

/// Map a provider maneuver to the glyph shown in the instruction banner.
pub fn maneuver_icon(maneuver_type: &str, modifier: Option<&str>) -> &'static str {
    match maneuver_type {
        "depart" => "🏁",
        "arrive" => "📍",
        "turn" => match modifier {
            Some(m) if m.contains("right") => "↪️",
            Some(m) if m.contains("left") => "↩️",
            _ => "⬆️",
        },
        "straight" => "⬆️",
        "roundabout" => "🔄",
        _ => "🚲",
    }
}

#[derive(Debug, Deserialize)]
struct ApiManeuver {
    /// `[lng, lat]`
    location: [f64; 2],
    #[serde(default)]
    instruction: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    modifier: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiStep {
    maneuver: ApiManeuver,
    #[serde(default)]
    distance: f64,
}

#[derive(Debug, Deserialize)]
struct ApiLeg {
    #[serde(default)]
    steps: Vec<ApiStep>,
}

#[derive(Debug, Deserialize)]
struct ApiRoute {
    #[serde(default)]
    legs: Vec<ApiLeg>,
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    #[serde(default)]
    routes: Vec<ApiRoute>,
}

#[derive(Debug, Deserialize)]
struct MatchingResponse {
    code: String,
    #[serde(default)]
    matchings: Vec<ApiRoute>,
}

impl From<ApiStep> for RouteStep {
    fn from(step: ApiStep) -> Self {
        let [lng, lat] = step.maneuver.location;
        RouteStep {
            maneuver_location: Coordinate::new(lat, lng),
            instruction: step.maneuver.instruction,
            maneuver_type: step.maneuver.kind,
            maneuver_modifier: step.maneuver.modifier,
            distance_m: step.distance,
        }
    }
}

fn flatten_legs(route: ApiRoute) -> Vec<RouteStep> {
    route
        .legs
        .into_iter()
        .flat_map(|leg| leg.steps)
        .map(RouteStep::from)
        .collect()
}

/// Extract the steps of the first route of a directions response.
pub fn steps_from_directions_json(json: &str) -> Result<Vec<RouteStep>> {
    let response: DirectionsResponse = serde_json::from_str(json)?;
    let route = response
        .routes
        .into_iter()
        .next()
        .ok_or_else(|| Error::Provider("directions response has no routes".into()))?;
    Ok(flatten_legs(route))
}

/// Extract the steps of the first matching of a map-matching response.
pub fn steps_from_matching_json(json: &str) -> Result<Vec<RouteStep>> {
    let response: MatchingResponse = serde_json::from_str(json)?;
    if response.code != "Ok" {
        return Err(Error::Provider(format!("map matching failed: {}", response.code)));
    }
    let matching = response
        .matchings
        .into_iter()
        .next()
        .ok_or_else(|| Error::Provider("map matching returned no matchings".into()))?;
    Ok(flatten_legs(matching))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIRECTIONS: &str = r#"{
      "code": "Ok",
      "routes": [{
        "distance": 420.5,
        "legs": [
          {"steps": [
            {"distance": 120.0, "maneuver": {"location": [135.2194, 35.0757],
              "instruction": "Head east", "type": "depart"}},
            {"distance": 300.5, "maneuver": {"location": [135.2207, 35.0757],
              "instruction": "Turn left", "type": "turn", "modifier": "left"}}
          ]},
          {"steps": [
            {"distance": 0.0, "maneuver": {"location": [135.2210, 35.0784],
              "instruction": "You have arrived", "type": "arrive"}}
          ]}
        ]
      }]
    }"#;

    #[test]
    fn directions_legs_are_flattened_in_order() {
        let steps = steps_from_directions_json(DIRECTIONS).unwrap();

        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0].maneuver_type, "depart");
        assert_eq!(steps[1].maneuver_modifier.as_deref(), Some("left"));
        assert_eq!(steps[2].instruction, "You have arrived");
        assert!((steps[1].distance_m - 300.5).abs() < 1e-9);
    }

    #[test]
    fn location_is_lng_lat_order() {
        let steps = steps_from_directions_json(DIRECTIONS).unwrap();
        let loc = steps[0].maneuver_location;
        assert!((loc.lat - 35.0757).abs() < 1e-9);
        assert!((loc.lng - 135.2194).abs() < 1e-9);
    }

    #[test]
    fn directions_without_routes_is_error() {
        let result = steps_from_directions_json(r#"{"routes": []}"#);
        assert!(matches!(result, Err(Error::Provider(_))));
    }

    #[test]
    fn malformed_json_is_error() {
        assert!(matches!(steps_from_directions_json("not json"), Err(Error::Json(_))));
    }

    #[test]
    fn matching_response_is_parsed() {
        let json = r#"{"code": "Ok", "matchings": [{"legs": [{"steps": [
            {"distance": 50.0, "maneuver": {"location": [1.0, 2.0],
              "instruction": "Go", "type": "depart"}}
        ]}]}]}"#;
        let steps = steps_from_matching_json(json).unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].maneuver_location, Coordinate::new(2.0, 1.0));
    }

    #[test]
    fn matching_failure_code_is_error() {
        let json = r#"{"code": "NoMatch", "matchings": []}"#;
        assert!(matches!(steps_from_matching_json(json), Err(Error::Provider(_))));
    }

    #[test]
    fn icons_follow_maneuver() {
        assert_eq!(maneuver_icon("depart", None), "🏁");
        assert_eq!(maneuver_icon("arrive", None), "📍");
        assert_eq!(maneuver_icon("turn", Some("sharp right")), "↪️");
        assert_eq!(maneuver_icon("turn", Some("slight left")), "↩️");
        assert_eq!(maneuver_icon("turn", None), "⬆️");
        assert_eq!(maneuver_icon("roundabout", Some("right")), "🔄");
        assert_eq!(maneuver_icon("merge", None), "🚲");
    }

    #[test]
    fn route_step_serde_round_trip_keeps_modifier_optional() {
        let json = r#"{"maneuver_location": {"lat": 1.0, "lng": 2.0},
            "instruction": "Go", "maneuver_type": "depart", "distance_m": 10.0}"#;
        let step: RouteStep = serde_json::from_str(json).unwrap();
        assert_eq!(step.maneuver_modifier, None);
        assert!(!serde_json::to_string(&step).unwrap().contains("maneuver_modifier"));
    }
}
