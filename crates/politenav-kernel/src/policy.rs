//! Tuning parameters for the interceptor and the speed policy derived from
//! them.

use politenav_types::NavError;
use serde::{Deserialize, Serialize};

/// Reconfigurable tuning set.  Loaded once at start-up and replaced only via
/// explicit reconfiguration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterceptorParams {
    /// An obstacle this close (metres) triggers a retreat.
    pub safety_radius: f64,
    /// An obstacle this close (metres) reduces the advised speed.
    pub caution_radius: f64,
    /// Multiplier applied to the nominal max speed while cautious.
    pub cautious_factor: f64,
    /// How far behind the robot the retreat waypoint is placed (metres).
    pub retreat_distance: f64,
    /// Arrival tolerance for the retreat waypoint (metres).
    pub goal_tolerance: f64,
}

impl Default for InterceptorParams {
    fn default() -> Self {
        Self {
            safety_radius: 2.0,
            caution_radius: 10.0,
            cautious_factor: 0.1,
            retreat_distance: 2.0,
            goal_tolerance: 0.2,
        }
    }
}

impl InterceptorParams {
    /// Check every field for a physically meaningful value.
    ///
    /// # Errors
    ///
    /// [`NavError::Config`] naming the first offending field.
    pub fn validate(&self) -> Result<(), NavError> {
        let distances = [
            ("safety_radius", self.safety_radius),
            ("caution_radius", self.caution_radius),
            ("retreat_distance", self.retreat_distance),
            ("goal_tolerance", self.goal_tolerance),
        ];
        for (name, value) in distances {
            if !value.is_finite() || value < 0.0 {
                return Err(NavError::Config(format!(
                    "{name} must be a finite, non-negative distance (got {value})"
                )));
            }
        }
        if !(self.cautious_factor > 0.0 && self.cautious_factor <= 1.0) {
            return Err(NavError::Config(format!(
                "cautious_factor must lie in (0, 1] (got {})",
                self.cautious_factor
            )));
        }
        Ok(())
    }

    /// Set the field called `name` to `value`.  Returns `false` for names
    /// that do not belong to this parameter set.
    ///
    /// The legacy node parameter names (`ped_minimum_distance`,
    /// `caution_detection_range`, `cautious_speed`, `temp_goal_distance`,
    /// `temp_goal_tolerance`) are accepted too.
    pub fn apply(&mut self, name: &str, value: f64) -> bool {
        let slot = match name {
            "safety_radius" | "ped_minimum_distance" => &mut self.safety_radius,
            "caution_radius" | "caution_detection_range" => &mut self.caution_radius,
            "cautious_factor" | "cautious_speed" => &mut self.cautious_factor,
            "retreat_distance" | "temp_goal_distance" => &mut self.retreat_distance,
            "goal_tolerance" | "temp_goal_tolerance" => &mut self.goal_tolerance,
            _ => return false,
        };
        *slot = value;
        true
    }
}

/// Speed limits and radii in effect for a single planning request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedPolicy {
    pub nominal_max_speed: f64,
    pub reduced_max_speed: f64,
    pub caution_radius: f64,
    pub safety_radius: f64,
    pub goal_tolerance: f64,
    pub retreat_distance: f64,
}

impl SpeedPolicy {
    /// Combine the controller's nominal max speed with the current tuning.
    pub fn new(nominal_max_speed: f64, params: &InterceptorParams) -> Self {
        Self {
            nominal_max_speed,
            reduced_max_speed: params.cautious_factor * nominal_max_speed,
            caution_radius: params.caution_radius,
            safety_radius: params.safety_radius,
            goal_tolerance: params.goal_tolerance,
            retreat_distance: params.retreat_distance,
        }
    }
}
