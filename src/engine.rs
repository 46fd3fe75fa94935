//! Turn-by-turn navigation session.
//!
//! `NavigationEngine` owns one ride's state: the route steps, the speed
//! filter, the fired alert stages, and the step cursor. It is purely
//! reactive; every state change happens synchronously inside
//! `update_position`, driven by the host's location callback. Calls must
//! be serialized by the host.

use log::{debug, info};
use serde::Serialize;

use crate::alert::{evaluate_proximity, AlertSink, AlertStages, OffRouteMonitor, Stage};
use crate::config::NavConfig;
use crate::geo::{distance_m, Coordinate, PositionSample};
use crate::locate::{locate, StepMatch};
use crate::speed::SpeedEstimator;
use crate::steps::RouteStep;

/// Snapshot of the engine for the display layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavigationState {
    pub current_step: Option<RouteStep>,
    pub current_step_index: Option<usize>,
    pub next_step: Option<RouteStep>,
    /// Banner text: the upcoming maneuver, or the current one at the end
    /// of the route.
    pub instruction: Option<String>,
    pub icon: Option<&'static str>,
    /// Distance to the upcoming maneuver in meters.
    pub distance_to_next_m: Option<f64>,
    /// Distance to the nearest maneuver inside the search window.
    pub distance_to_nearest_m: Option<f64>,
    pub current_speed_kmh: f64,
    pub is_navigating: bool,
    pub is_off_route: bool,
}

pub struct NavigationEngine<S: AlertSink> {
    config: NavConfig,
    sink: S,
    steps: Vec<RouteStep>,
    is_active: bool,
    speed: SpeedEstimator,
    alert_stages: AlertStages,
    off_route: OffRouteMonitor,
    current_step_index: Option<usize>,
    nearest: Option<StepMatch>,
    distance_to_next_m: Option<f64>,
    is_off_route: bool,
}

impl<S: AlertSink> NavigationEngine<S> {
    pub fn new(config: NavConfig, sink: S) -> Self {
        let speed = SpeedEstimator::new(config.speed_smoothing);
        Self {
            config,
            sink,
            steps: Vec::new(),
            is_active: false,
            speed,
            alert_stages: AlertStages::default(),
            off_route: OffRouteMonitor::default(),
            current_step_index: None,
            nearest: None,
            distance_to_next_m: None,
            is_off_route: false,
        }
    }

    /// Load the route to follow. Progress and fired alerts are reset;
    /// an active session stays active.
    pub fn set_steps(&mut self, steps: Vec<RouteStep>) {
        info!("Route loaded with {} steps", steps.len());
        self.steps = steps;
        self.reset_progress();
    }

    /// Begin (or restart) a session with a clean alert slate.
    pub fn start(&mut self) {
        info!("Starting navigation");
        self.reset_progress();
        self.is_active = true;
    }

    /// End the session. Safe to call at any time, repeatedly.
    ///
    /// The smoothed speed is kept; its value between sessions is stale.
    pub fn stop(&mut self) {
        if self.is_active {
            info!("Stopping navigation");
        }
        self.is_active = false;
        self.current_step_index = None;
        self.nearest = None;
        self.distance_to_next_m = None;
        self.is_off_route = false;
    }

    /// Ingest a fix stamped with the current wall-clock time.
    pub fn update_location(&mut self, lat: f64, lng: f64) {
        self.update_position(PositionSample::now(Coordinate::new(lat, lng)));
    }

    /// Ingest one fix. No-op unless a session is active with a route.
    pub fn update_position(&mut self, sample: PositionSample) {
        if !self.is_active || self.steps.is_empty() {
            return;
        }

        self.speed.update(sample);
        let position = sample.coordinate;

        let floor = self.alert_stages.search_floor();
        let Some(nearest) = locate(&self.steps, &position, floor, self.config.search_window) else {
            return;
        };

        let off_route = self
            .off_route
            .check(nearest.distance_m, sample.timestamp_ms, &self.config);
        if off_route.should_alert {
            debug!("Off route, {:.0} m from nearest maneuver", nearest.distance_m);
            self.sink.play_off_route_alert();
        }

        let mut current = self.cursor_for(nearest.index);
        let maneuver = current + 1;
        if let Some(next) = self.steps.get(maneuver) {
            let dist = distance_m(&position, &next.maneuver_location);
            for stage in evaluate_proximity(dist, maneuver, &mut self.alert_stages, &self.config) {
                match stage {
                    Stage::Far => {
                        debug!("Approach warning for step {maneuver} at {dist:.0} m");
                        self.sink.play_approach_warning();
                        if self.config.voice_enabled && !next.instruction.is_empty() {
                            self.sink.announce(&next.instruction);
                        }
                    }
                    Stage::Near => {
                        debug!("Imminent turn for step {maneuver} at {dist:.0} m");
                        self.sink.play_imminent_turn();
                    }
                }
            }
            // A NEAR alert on this fix may have moved the cursor.
            current = self.cursor_for(nearest.index);
        }

        let target = self.steps.get(current + 1).or_else(|| self.steps.get(current));
        self.distance_to_next_m = target.map(|step| distance_m(&position, &step.maneuver_location));
        self.current_step_index = Some(current);
        self.nearest = Some(nearest);
        self.is_off_route = off_route.is_off_route;
    }

    /// Step the rider is riding along, given the nearest maneuver.
    ///
    /// A maneuver that has not been reached yet is still ahead, so the
    /// rider is on the step before it. Never returns less than the
    /// current cursor.
    fn cursor_for(&self, nearest: usize) -> usize {
        let located = if nearest == 0 || self.alert_stages.is_reached(nearest) {
            nearest
        } else {
            nearest - 1
        };
        self.current_step_index.map_or(located, |current| current.max(located))
    }

    fn reset_progress(&mut self) {
        self.alert_stages.clear();
        self.current_step_index = None;
        self.nearest = None;
        self.distance_to_next_m = None;
        self.is_off_route = false;
    }

    pub fn state(&self) -> NavigationState {
        let current_step = self.current_step_index.and_then(|i| self.steps.get(i));
        let next_step = self.current_step_index.and_then(|i| self.steps.get(i + 1));
        let banner = next_step.or(current_step);

        NavigationState {
            current_step: current_step.cloned(),
            current_step_index: self.current_step_index,
            next_step: next_step.cloned(),
            instruction: banner.map(|s| s.instruction.clone()),
            icon: banner.map(RouteStep::icon),
            distance_to_next_m: self.distance_to_next_m,
            distance_to_nearest_m: self.nearest.map(|m| m.distance_m),
            current_speed_kmh: self.speed.speed_kmh(),
            is_navigating: self.is_active,
            is_off_route: self.is_off_route,
        }
    }

    pub fn is_navigating(&self) -> bool {
        self.is_active
    }

    pub fn current_step_index(&self) -> Option<usize> {
        self.current_step_index
    }

    pub fn speed_kmh(&self) -> f64 {
        self.speed.speed_kmh()
    }

    /// Lower bound of the nearest-step search, derived from alert history.
    pub fn search_floor(&self) -> usize {
        self.alert_stages.search_floor()
    }

    pub fn alert_stages(&self) -> &AlertStages {
        &self.alert_stages
    }

    pub fn steps(&self) -> &[RouteStep] {
        &self.steps
    }

    pub fn config(&self) -> &NavConfig {
        &self.config
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}
