//! GPX 1.1 import and export.
//!
//! Wraps the `gpx` crate. Import extracts tracks, routes, and waypoints
//! of curated route files into serializable structures that can cross
//! the JNI boundary as JSON; export writes a recorded ride as a track.

use serde::{Deserialize, Serialize};
use std::io::Read;

use crate::error::{Error, Result};
use crate::geo::Coordinate;
use crate::record::RecordedRide;

/// A geographic coordinate with optional elevation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub lat: f64,
    pub lng: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ele: Option<f64>,
}

impl Point {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }
}

/// A named sequence of points representing a recorded path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub points: Vec<Point>,
}

/// A named sequence of points representing a planned route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub points: Vec<Point>,
}

/// A single named point of interest along a curated route.
///
/// `icon` comes from the GPX `<sym>` element.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Waypoint {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub point: Point,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// All data extracted from a GPX file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpxData {
    pub tracks: Vec<Track>,
    pub routes: Vec<Route>,
    pub waypoints: Vec<Waypoint>,
}

/// Where a navigable polyline came from. Route points are curated
/// turn points; track points are a dense recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathSource {
    Route,
    Track,
}

impl GpxData {
    /// The polyline to navigate: the first route, else the first track.
    pub fn route_coordinates(&self) -> Option<(PathSource, Vec<Coordinate>)> {
        let (source, points) = match (self.routes.first(), self.tracks.first()) {
            (Some(route), _) => (PathSource::Route, &route.points),
            (None, Some(track)) => (PathSource::Track, &track.points),
            (None, None) => return None,
        };
        Some((source, points.iter().map(Point::coordinate).collect()))
    }
}

fn to_point(wp: &gpx::Waypoint) -> Point {
    Point {
        lat: wp.point().y(),
        lng: wp.point().x(),
        ele: wp.elevation,
    }
}

/// Parse a GPX file from any reader and return structured data.
pub fn parse<R: Read>(reader: R) -> Result<GpxData> {
    let gpx = gpx::read(reader)?;

    let tracks = gpx
        .tracks
        .iter()
        .map(|t| Track {
            name: t.name.clone(),
            points: t
                .segments
                .iter()
                .flat_map(|seg| seg.points.iter())
                .map(to_point)
                .collect(),
        })
        .collect();

    let routes = gpx
        .routes
        .iter()
        .map(|r| Route {
            name: r.name.clone(),
            points: r.points.iter().map(to_point).collect(),
        })
        .collect();

    let waypoints = gpx
        .waypoints
        .iter()
        .map(|wp| Waypoint {
            name: wp.name.clone(),
            point: to_point(wp),
            icon: wp.symbol.clone(),
        })
        .collect();

    Ok(GpxData {
        tracks,
        routes,
        waypoints,
    })
}

/// Parse GPX from a byte slice. Convenience wrapper for JNI.
pub fn parse_bytes(data: &[u8]) -> Result<GpxData> {
    parse(data)
}

/// Parse GPX and return the result as a JSON string.
pub fn parse_to_json(data: &[u8]) -> Result<String> {
    let gpx_data = parse_bytes(data)?;
    Ok(serde_json::to_string(&gpx_data)?)
}

fn to_gpx_time(timestamp_ms: i64) -> Result<gpx::Time> {
    let nanos = i128::from(timestamp_ms) * 1_000_000;
    let time = time::OffsetDateTime::from_unix_timestamp_nanos(nanos)
        .map_err(|e| Error::Time(e.to_string()))?;
    Ok(time.into())
}

/// Serialize a recorded ride as a single-segment GPX 1.1 track.
pub fn write_ride(ride: &RecordedRide) -> Result<String> {
    let mut segment = gpx::TrackSegment::new();
    for sample in &ride.path {
        let mut wp = gpx::Waypoint::new(geo_types::Point::new(
            sample.coordinate.lng,
            sample.coordinate.lat,
        ));
        wp.time = Some(to_gpx_time(sample.timestamp_ms)?);
        segment.points.push(wp);
    }

    let mut track = gpx::Track::new();
    track.name = Some(ride.name.clone());
    track.segments.push(segment);

    let doc = gpx::Gpx {
        version: gpx::GpxVersion::Gpx11,
        creator: Some(format!("ridenav {}", crate::VERSION)),
        tracks: vec![track],
        ..Default::default()
    };

    let mut buf = Vec::new();
    gpx::write(&doc, &mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::PositionSample;

    const MINIMAL_GPX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test"
     xmlns="http://www.topografix.com/GPX/1/1">
  <trk>
    <name>Castle Loop</name>
    <trkseg>
      <trkpt lat="35.0757" lon="135.2194"><ele>210</ele></trkpt>
      <trkpt lat="35.0765" lon="135.2210"><ele>212</ele></trkpt>
      <trkpt lat="35.0771" lon="135.2232"><ele>209</ele></trkpt>
    </trkseg>
  </trk>
  <rte>
    <name>Black Bean Fields</name>
    <rtept lat="35.0700" lon="135.2100"></rtept>
    <rtept lat="35.0800" lon="135.2200"></rtept>
  </rte>
  <wpt lat="35.0757" lon="135.2194">
    <name>Sasayama Castle</name>
    <ele>210</ele>
    <sym>castle</sym>
  </wpt>
</gpx>"#;

    #[test]
    fn parse_minimal_gpx() {
        let data = parse_bytes(MINIMAL_GPX.as_bytes()).unwrap();

        assert_eq!(data.tracks.len(), 1);
        assert_eq!(data.tracks[0].name.as_deref(), Some("Castle Loop"));
        assert_eq!(data.tracks[0].points.len(), 3);

        let p = &data.tracks[0].points[0];
        assert!((p.lat - 35.0757).abs() < 1e-6);
        assert!((p.lng - 135.2194).abs() < 1e-6);
        assert_eq!(p.ele, Some(210.0));
    }

    #[test]
    fn parse_route_and_waypoint() {
        let data = parse_bytes(MINIMAL_GPX.as_bytes()).unwrap();

        assert_eq!(data.routes.len(), 1);
        assert_eq!(data.routes[0].points.len(), 2);
        assert_eq!(data.waypoints.len(), 1);
        assert_eq!(data.waypoints[0].name.as_deref(), Some("Sasayama Castle"));
        assert_eq!(data.waypoints[0].icon.as_deref(), Some("castle"));
    }

    #[test]
    fn route_coordinates_prefer_route_over_track() {
        let data = parse_bytes(MINIMAL_GPX.as_bytes()).unwrap();
        let (source, coords) = data.route_coordinates().unwrap();
        assert_eq!(source, PathSource::Route);
        assert_eq!(coords.len(), 2);
        assert!((coords[0].lat - 35.07).abs() < 1e-6);
    }

    #[test]
    fn route_coordinates_fall_back_to_track() {
        let mut data = parse_bytes(MINIMAL_GPX.as_bytes()).unwrap();
        data.routes.clear();
        let (source, coords) = data.route_coordinates().unwrap();
        assert_eq!(source, PathSource::Track);
        assert_eq!(coords.len(), 3);

        data.tracks.clear();
        assert!(data.route_coordinates().is_none());
    }

    #[test]
    fn parse_to_json_produces_valid_json() {
        let json = parse_to_json(MINIMAL_GPX.as_bytes()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert!(parsed["tracks"].is_array());
        assert!(parsed["routes"].is_array());
        assert!(parsed["waypoints"].is_array());
    }

    #[test]
    fn parse_invalid_xml_returns_error() {
        assert!(matches!(parse_bytes(b"not xml at all"), Err(Error::Gpx(_))));
    }

    #[test]
    fn parse_multi_segment_track() {
        let gpx = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test"
     xmlns="http://www.topografix.com/GPX/1/1">
  <trk>
    <trkseg>
      <trkpt lat="35.0" lon="135.0"></trkpt>
      <trkpt lat="35.1" lon="135.1"></trkpt>
    </trkseg>
    <trkseg>
      <trkpt lat="35.2" lon="135.2"></trkpt>
    </trkseg>
  </trk>
</gpx>"#;

        let data = parse_bytes(gpx.as_bytes()).unwrap();
        // Segments are flattened into a single point list
        assert_eq!(data.tracks[0].points.len(), 3);
        assert_eq!(data.tracks[0].points[0].ele, None);
    }

    #[test]
    fn written_ride_parses_back() {
        let ride = RecordedRide {
            id: "ride_1".into(),
            name: "Morning Ride".into(),
            path: vec![
                PositionSample::new(35.0757, 135.2194, 1_700_000_000_000),
                PositionSample::new(35.0765, 135.2210, 1_700_000_010_000),
            ],
            distance_m: 170.0,
            duration_ms: 10_000,
            avg_speed_kmh: 61.2,
            created_at_ms: 1_700_000_010_000,
        };

        let xml = write_ride(&ride).unwrap();
        let data = parse_bytes(xml.as_bytes()).unwrap();

        assert_eq!(data.tracks.len(), 1);
        assert_eq!(data.tracks[0].name.as_deref(), Some("Morning Ride"));
        assert_eq!(data.tracks[0].points.len(), 2);
        assert!((data.tracks[0].points[1].lng - 135.2210).abs() < 1e-6);
    }
}
