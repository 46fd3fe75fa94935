//! Ride recording.
//!
//! Records the rider's GPS track independently of navigation. Recording
//! can be paused; paused time does not count toward ride duration.
//! All operations take explicit timestamps so the host decides the clock.

use log::info;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::RecordingConfig;
use crate::error::Result;
use crate::geo::{distance_m, PositionSample};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecorderState {
    Idle,
    Recording,
    Paused,
}

/// Live figures for the recording panel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RecordingStats {
    pub distance_m: f64,
    pub duration_ms: i64,
    pub avg_speed_kmh: f64,
    pub point_count: usize,
}

/// A finished ride.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedRide {
    pub id: String,
    pub name: String,
    pub path: Vec<PositionSample>,
    pub distance_m: f64,
    pub duration_ms: i64,
    pub avg_speed_kmh: f64,
    pub created_at_ms: i64,
}

impl RecordedRide {
    /// The ride path as a GeoJSON `LineString` feature.
    pub fn to_geojson(&self) -> serde_json::Value {
        let coordinates: Vec<[f64; 2]> = self
            .path
            .iter()
            .map(|s| [s.coordinate.lng, s.coordinate.lat])
            .collect();

        json!({
            "type": "Feature",
            "properties": { "name": self.name },
            "geometry": {
                "type": "LineString",
                "coordinates": coordinates,
            },
        })
    }
}

fn average_speed_kmh(distance_m: f64, duration_ms: i64) -> f64 {
    if duration_ms > 0 {
        (distance_m / 1000.0) / (duration_ms as f64 / 3_600_000.0)
    } else {
        0.0
    }
}

/// Default ride name, e.g. `Ride 2026-10-18`.
fn default_name(now_ms: i64) -> String {
    match time::OffsetDateTime::from_unix_timestamp_nanos(i128::from(now_ms) * 1_000_000) {
        Ok(t) => format!("Ride {}", t.date()),
        Err(_) => "Ride".to_string(),
    }
}

pub struct TrackRecorder {
    config: RecordingConfig,
    state: RecorderState,
    path: Vec<PositionSample>,
    total_distance_m: f64,
    started_at: i64,
    paused_ms: i64,
    pause_started_at: i64,
}

impl TrackRecorder {
    pub fn new(config: RecordingConfig) -> Self {
        Self {
            config,
            state: RecorderState::Idle,
            path: Vec::new(),
            total_distance_m: 0.0,
            started_at: 0,
            paused_ms: 0,
            pause_started_at: 0,
        }
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    pub fn path(&self) -> &[PositionSample] {
        &self.path
    }

    /// Start a fresh recording, discarding any unsaved path.
    pub fn start(&mut self, now_ms: i64) {
        info!("Recording started");
        self.path.clear();
        self.total_distance_m = 0.0;
        self.started_at = now_ms;
        self.paused_ms = 0;
        self.state = RecorderState::Recording;
    }

    pub fn pause(&mut self, now_ms: i64) {
        if self.state == RecorderState::Recording {
            self.pause_started_at = now_ms;
            self.state = RecorderState::Paused;
        }
    }

    pub fn resume(&mut self, now_ms: i64) {
        if self.state == RecorderState::Paused {
            self.paused_ms = self
                .paused_ms
                .saturating_add(now_ms.saturating_sub(self.pause_started_at));
            self.state = RecorderState::Recording;
        }
    }

    /// Append a fix. Returns false when it was ignored: not recording,
    /// invalid coordinate, or within the minimum spacing of the last
    /// kept point.
    pub fn add_point(&mut self, sample: PositionSample) -> bool {
        if self.state != RecorderState::Recording || !sample.coordinate.is_valid() {
            return false;
        }

        if let Some(last) = self.path.last() {
            let dist = distance_m(&last.coordinate, &sample.coordinate);
            if dist < self.config.min_point_spacing_m {
                return false;
            }
            self.total_distance_m += dist;
        }

        self.path.push(sample);
        true
    }

    /// Recording time excluding pauses, including one in progress.
    fn elapsed_ms(&self, now_ms: i64) -> i64 {
        let ongoing_pause = match self.state {
            RecorderState::Paused => now_ms.saturating_sub(self.pause_started_at),
            _ => 0,
        };
        now_ms
            .saturating_sub(self.started_at)
            .saturating_sub(self.paused_ms)
            .saturating_sub(ongoing_pause)
            .max(0)
    }

    pub fn stats(&self, now_ms: i64) -> RecordingStats {
        if self.state == RecorderState::Idle {
            return RecordingStats {
                distance_m: 0.0,
                duration_ms: 0,
                avg_speed_kmh: 0.0,
                point_count: 0,
            };
        }

        let duration_ms = self.elapsed_ms(now_ms);
        RecordingStats {
            distance_m: self.total_distance_m,
            duration_ms,
            avg_speed_kmh: average_speed_kmh(self.total_distance_m, duration_ms),
            point_count: self.path.len(),
        }
    }

    /// Finish the recording. Returns `None` if nothing was being recorded.
    pub fn stop(&mut self, name: Option<&str>, now_ms: i64) -> Option<RecordedRide> {
        if self.state == RecorderState::Idle {
            return None;
        }

        let duration_ms = self.elapsed_ms(now_ms);
        let ride = RecordedRide {
            id: format!("ride_{now_ms}"),
            name: name.map_or_else(|| default_name(now_ms), str::to_string),
            path: std::mem::take(&mut self.path),
            distance_m: self.total_distance_m,
            duration_ms,
            avg_speed_kmh: average_speed_kmh(self.total_distance_m, duration_ms),
            created_at_ms: now_ms,
        };

        info!(
            "Recording stopped: {:.0} m over {} s",
            ride.distance_m,
            ride.duration_ms / 1000
        );
        self.state = RecorderState::Idle;
        self.total_distance_m = 0.0;
        Some(ride)
    }
}

/// Saved rides, newest first, capped in length.
#[derive(Debug, Clone)]
pub struct RideLog {
    rides: Vec<RecordedRide>,
    max_rides: usize,
}

impl RideLog {
    pub fn new(max_rides: usize) -> Self {
        Self {
            rides: Vec::new(),
            max_rides,
        }
    }

    /// Restore a log previously produced by `to_json`.
    pub fn from_json(json: &str, max_rides: usize) -> Result<Self> {
        let mut rides: Vec<RecordedRide> = serde_json::from_str(json)?;
        rides.truncate(max_rides);
        Ok(Self { rides, max_rides })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.rides)?)
    }

    /// Insert a ride at the front, dropping the oldest beyond the cap.
    pub fn push(&mut self, ride: RecordedRide) {
        self.rides.insert(0, ride);
        self.rides.truncate(self.max_rides);
    }

    /// Remove a ride by id. Returns false if no ride had that id.
    pub fn delete(&mut self, id: &str) -> bool {
        let before = self.rides.len();
        self.rides.retain(|r| r.id != id);
        self.rides.len() != before
    }

    pub fn rides(&self) -> &[RecordedRide] {
        &self.rides
    }
}
