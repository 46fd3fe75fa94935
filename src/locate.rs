//! Nearest-step search over a bounded forward window.

use serde::Serialize;

use crate::geo::{distance_m, Coordinate};
use crate::steps::RouteStep;

/// Number of steps scanned from the search floor.
pub const DEFAULT_WINDOW: usize = 10;

/// The step whose maneuver is nearest to a position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StepMatch {
    pub index: usize,
    pub distance_m: f64,
}

/// Find the step nearest to `position` among `steps[floor..floor + window]`.
///
/// Ties go to the lowest index. Returns `None` when the window is empty
/// or no distance compares (NaN input).
pub fn locate(
    steps: &[RouteStep],
    position: &Coordinate,
    floor: usize,
    window: usize,
) -> Option<StepMatch> {
    let end = steps.len().min(floor.saturating_add(window));
    let mut best: Option<StepMatch> = None;

    for (index, step) in steps.iter().enumerate().take(end).skip(floor) {
        let dist = distance_m(position, &step.maneuver_location);

        let is_better = match &best {
            Some(prev) => dist < prev.distance_m,
            None => !dist.is_nan(),
        };

        if is_better {
            best = Some(StepMatch { index, distance_m: dist });
        }
    }

    best
}
