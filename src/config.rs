//! Tunable thresholds.
//!
//! The host passes configuration as a JSON document; every field is
//! optional and falls back to the defaults below.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Navigation engine thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavConfig {
    /// Steps scanned from the search floor.
    pub search_window: usize,
    /// Upper bound of the FAR band, in meters (inclusive).
    pub far_max_m: f64,
    /// Lower bound of the FAR band, in meters (exclusive).
    pub far_min_m: f64,
    /// Upper bound of the NEAR band, in meters (inclusive).
    pub near_max_m: f64,
    /// Distance to the nearest maneuver beyond which the rider is off route.
    pub off_route_threshold_m: f64,
    /// Minimum gap between two off-route alerts.
    pub off_route_cooldown_ms: i64,
    /// Weight of the newest reading in the speed filter.
    pub speed_smoothing: f64,
    /// Speak the upcoming instruction alongside the FAR tone.
    pub voice_enabled: bool,
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            search_window: crate::locate::DEFAULT_WINDOW,
            far_max_m: 55.0,
            far_min_m: 30.0,
            near_max_m: 15.0,
            off_route_threshold_m: 25.0,
            off_route_cooldown_ms: 10_000,
            speed_smoothing: crate::speed::DEFAULT_SMOOTHING,
            voice_enabled: true,
        }
    }
}

/// Track recorder settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    /// Fixes closer than this to the previous kept point are dropped.
    pub min_point_spacing_m: f64,
    /// Rides kept in the ride log.
    pub max_saved_rides: usize,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            min_point_spacing_m: 3.0,
            max_saved_rides: 20,
        }
    }
}

/// Spot voice guide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuideConfig {
    pub announce_radius_m: f64,
    /// A spot is not announced again within this window.
    pub cooldown_ms: i64,
}

impl Default for GuideConfig {
    fn default() -> Self {
        Self {
            announce_radius_m: 200.0,
            cooldown_ms: 60_000,
        }
    }
}

/// Complete configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub navigation: NavConfig,
    pub recording: RecordingConfig,
    pub guide: GuideConfig,
}

impl Config {
    /// Parse a configuration document. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
