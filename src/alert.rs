//! Maneuver proximity alerts and off-route alerts.
//!
//! Proximity alerts are one-shot per maneuver: each `(maneuver, stage)`
//! pair fires at most once per session. The off-route alert is a
//! recurring condition instead and is rate-limited by a cooldown.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::NavConfig;

/// Proximity alert tier for an upcoming maneuver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Around 50 m out: single warning tone.
    Far,
    /// Around 10 m out: double turn tone.
    Near,
}

impl Stage {
    fn bit(self) -> u8 {
        match self {
            Stage::Far => 0b01,
            Stage::Near => 0b10,
        }
    }
}

/// Stages already fired for one maneuver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageSet(u8);

impl StageSet {
    pub fn contains(&self, stage: Stage) -> bool {
        self.0 & stage.bit() != 0
    }

    /// Mark `stage` as fired. Returns false if it already was.
    pub fn insert(&mut self, stage: Stage) -> bool {
        let fresh = !self.contains(stage);
        self.0 |= stage.bit();
        fresh
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

/// Fired stages keyed by maneuver (step) index.
#[derive(Debug, Clone, Default)]
pub struct AlertStages {
    fired: BTreeMap<usize, StageSet>,
}

impl AlertStages {
    pub fn has_fired(&self, maneuver: usize, stage: Stage) -> bool {
        self.fired
            .get(&maneuver)
            .is_some_and(|set| set.contains(stage))
    }

    /// Record `stage` for `maneuver`. Returns true only the first time.
    pub fn mark(&mut self, maneuver: usize, stage: Stage) -> bool {
        self.fired.entry(maneuver).or_default().insert(stage)
    }

    /// A maneuver counts as reached once its NEAR stage has fired.
    pub fn is_reached(&self, maneuver: usize) -> bool {
        self.has_fired(maneuver, Stage::Near)
    }

    /// Lower bound of the nearest-step search: the highest maneuver index
    /// with any fired stage, or 0 before the first alert.
    ///
    /// The step cursor only moves past a maneuver once an alert for it
    /// has fired, not merely because the rider was nearest to it.
    pub fn search_floor(&self) -> usize {
        self.fired
            .iter()
            .rev()
            .find(|(_, set)| !set.is_empty())
            .map(|(&index, _)| index)
            .unwrap_or(0)
    }

    pub fn clear(&mut self) {
        self.fired.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.fired.values().all(StageSet::is_empty)
    }
}

/// Side effect emitted by the engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Alert {
    ApproachWarning,
    ImminentTurn,
    OffRoute,
    Announce { text: String },
}

/// Receiver of the engine's audio cues.
///
/// Calls happen synchronously inside a location update and must return
/// quickly; implementations schedule playback and return.
pub trait AlertSink {
    /// Single tone, maneuver about 50 m ahead.
    fn play_approach_warning(&mut self);

    /// Double tone, maneuver about 10 m ahead.
    fn play_imminent_turn(&mut self);

    /// Low buzzer, rider left the route.
    fn play_off_route_alert(&mut self);

    /// Optional speech of an upcoming instruction.
    fn announce(&mut self, _text: &str) {}
}

/// Collects alerts for hosts that poll instead of reacting, e.g. across FFI.
impl AlertSink for Vec<Alert> {
    fn play_approach_warning(&mut self) {
        self.push(Alert::ApproachWarning);
    }

    fn play_imminent_turn(&mut self) {
        self.push(Alert::ImminentTurn);
    }

    fn play_off_route_alert(&mut self) {
        self.push(Alert::OffRoute);
    }

    fn announce(&mut self, text: &str) {
        self.push(Alert::Announce { text: text.to_string() });
    }
}

/// Evaluate the proximity stages for the maneuver at index `maneuver`,
/// `distance_m` away. Returns the stages that fired on this call.
pub fn evaluate_proximity(
    distance_m: f64,
    maneuver: usize,
    stages: &mut AlertStages,
    config: &NavConfig,
) -> Vec<Stage> {
    let mut fired = Vec::new();

    if distance_m <= config.far_max_m
        && distance_m > config.far_min_m
        && stages.mark(maneuver, Stage::Far)
    {
        fired.push(Stage::Far);
    }

    if distance_m <= config.near_max_m
        && distance_m > 0.0
        && stages.mark(maneuver, Stage::Near)
    {
        fired.push(Stage::Near);
    }

    fired
}

/// Outcome of one off-route check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffRouteCheck {
    pub is_off_route: bool,
    pub should_alert: bool,
}

/// Off-route detection with a cooldown on the audible alert.
#[derive(Debug, Clone, Default)]
pub struct OffRouteMonitor {
    last_alert_at: Option<i64>,
}

impl OffRouteMonitor {
    pub fn check(&mut self, nearest_m: f64, now_ms: i64, config: &NavConfig) -> OffRouteCheck {
        let is_off_route = nearest_m > config.off_route_threshold_m;
        let cooled_down = match self.last_alert_at {
            Some(at) => now_ms.saturating_sub(at) > config.off_route_cooldown_ms,
            None => true,
        };

        let should_alert = is_off_route && cooled_down;
        if should_alert {
            self.last_alert_at = Some(now_ms);
        }

        OffRouteCheck {
            is_off_route,
            should_alert,
        }
    }

    pub fn last_alert_at(&self) -> Option<i64> {
        self.last_alert_at
    }
}
