//! Spoken guide for points of interest along the ride.
//!
//! While enabled, each position update checks the loaded spots and
//! produces at most one announcement for a spot within range that has
//! not been announced recently. Speech playback belongs to the host.

use std::collections::HashMap;

use log::debug;
use serde::Serialize;
use serde_json::Value;

use crate::config::GuideConfig;
use crate::error::{Error, Result};
use crate::geo::{distance_m, Coordinate};

/// A point of interest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Spot {
    pub name: String,
    /// Free-form category such as `shrine`, `cafe`, `onsen`.
    pub category: String,
    pub location: Coordinate,
}

/// A message for the speech sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Announcement {
    pub spot_index: usize,
    pub message: String,
    pub distance_m: f64,
}

/// Load spots from a GeoJSON `FeatureCollection`. Non-point features
/// are skipped.
pub fn spots_from_geojson(json: &str) -> Result<Vec<Spot>> {
    let doc: Value = serde_json::from_str(json)?;
    let features = doc["features"]
        .as_array()
        .ok_or_else(|| Error::InvalidData("GeoJSON has no features array".into()))?;

    let spots = features
        .iter()
        .filter(|f| f["geometry"]["type"] == "Point")
        .filter_map(|f| {
            let coords = f["geometry"]["coordinates"].as_array()?;
            let lng = coords.first()?.as_f64()?;
            let lat = coords.get(1)?.as_f64()?;
            let props = &f["properties"];
            Some(Spot {
                name: props["name"].as_str().unwrap_or("Unknown spot").to_string(),
                category: props["type"].as_str().unwrap_or_default().to_string(),
                location: Coordinate::new(lat, lng),
            })
        })
        .collect();

    Ok(spots)
}

/// Message spoken for a spot, by category.
pub fn guide_message(spot: &Spot) -> String {
    let name = &spot.name;
    match spot.category.as_str() {
        "shrine" => format!("{name} is just ahead. It is a shrine with a long history, worth a visit."),
        "temple" => format!("{name} is coming up. A quiet and beautiful temple."),
        "cafe" => format!("{name} is close by. A perfect place for a break."),
        "restaurant" => format!("{name} is in sight. Enjoy some local food."),
        "viewpoint" => format!("Don't miss this: {name} has a great view."),
        "park" => format!("{name} is nearby. A green spot to rest."),
        "onsen" => format!("{name} is close. A hot spring is the best cure for tired legs."),
        "museum" => format!("{name} is ahead. Take a look at the local culture."),
        _ => format!("{name} is ahead. Why not stop by?"),
    }
}

pub struct SpotGuide {
    config: GuideConfig,
    spots: Vec<Spot>,
    enabled: bool,
    /// Spot index -> time of last announcement.
    announced: HashMap<usize, i64>,
}

impl SpotGuide {
    pub fn new(config: GuideConfig, spots: Vec<Spot>) -> Self {
        Self {
            config,
            spots,
            enabled: false,
            announced: HashMap::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn toggle(&mut self) -> bool {
        self.enabled = !self.enabled;
        self.enabled
    }

    /// Forget announcement history so every spot can be announced again.
    pub fn reset_announcements(&mut self) {
        self.announced.clear();
    }

    pub fn spots(&self) -> &[Spot] {
        &self.spots
    }

    /// Check for a spot to announce at `position`. Nothing is produced
    /// while disabled or while the host is still speaking.
    pub fn update_position(
        &mut self,
        position: &Coordinate,
        now_ms: i64,
        is_speaking: bool,
    ) -> Option<Announcement> {
        if !self.enabled || is_speaking {
            return None;
        }

        for (index, spot) in self.spots.iter().enumerate() {
            let dist = distance_m(position, &spot.location);
            if dist > self.config.announce_radius_m || dist.is_nan() {
                continue;
            }

            let cooled_down = self
                .announced
                .get(&index)
                .map_or(true, |&at| now_ms.saturating_sub(at) > self.config.cooldown_ms);
            if !cooled_down {
                continue;
            }

            debug!("Announcing {} ({:.0} m)", spot.name, dist);
            self.announced.insert(index, now_ms);
            return Some(Announcement {
                spot_index: index,
                message: guide_message(spot),
                distance_m: dist,
            });
        }

        None
    }
}
