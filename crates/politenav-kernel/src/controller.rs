//! Resolution of the active downstream controller.
//!
//! The configured keyword (`<node namespace>/local_planner`) selects one of a
//! closed set of controllers.  Its parameters live under
//! `<node namespace>/move_base_flex/<PluginName>`, from which the nominal
//! `max_vel_x` is read once.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use politenav_types::NavError;

use crate::speed_advisor::MAX_SPEED_PARAM;

/// Read-only view of the parameter server (or a static stand-in).
pub trait ParameterSource {
    fn get_str(&self, key: &str) -> Option<String>;
    fn get_f64(&self, key: &str) -> Option<f64>;
}

/// In-memory [`ParameterSource`] backed by a map of fully qualified keys.
#[derive(Debug, Clone, Default)]
pub struct StaticParameters {
    strings: HashMap<String, String>,
    numbers: HashMap<String, f64>,
}

impl StaticParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_str(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.strings.insert(key.into(), value.into());
    }

    pub fn set_f64(&mut self, key: impl Into<String>, value: f64) {
        self.numbers.insert(key.into(), value);
    }
}

impl ParameterSource for StaticParameters {
    fn get_str(&self, key: &str) -> Option<String> {
        self.strings.get(key).cloned()
    }

    fn get_f64(&self, key: &str) -> Option<f64> {
        self.numbers.get(key).copied()
    }
}

/// Supported downstream controllers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocalPlanner {
    Teb,
    Mpc,
    Dwa,
    Cohan,
}

impl LocalPlanner {
    /// Name under which the controller plugin registers its parameters.
    pub fn plugin_name(self) -> &'static str {
        match self {
            LocalPlanner::Teb => "TebLocalPlannerROS",
            LocalPlanner::Mpc => "MpcLocalPlannerROS",
            LocalPlanner::Dwa => "DwaLocalPlannerROS",
            LocalPlanner::Cohan => "HAtebLocalPlannerROS",
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            LocalPlanner::Teb => "teb",
            LocalPlanner::Mpc => "mpc",
            LocalPlanner::Dwa => "dwa",
            LocalPlanner::Cohan => "cohan",
        }
    }
}

impl FromStr for LocalPlanner {
    type Err = NavError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "teb" => Ok(LocalPlanner::Teb),
            "mpc" => Ok(LocalPlanner::Mpc),
            "dwa" => Ok(LocalPlanner::Dwa),
            "cohan" => Ok(LocalPlanner::Cohan),
            other => Err(NavError::UnknownController(other.to_string())),
        }
    }
}

impl fmt::Display for LocalPlanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// The resolved controller and what was read from its namespace.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerBinding {
    pub planner: LocalPlanner,
    /// e.g. `/robot1/move_base_flex/TebLocalPlannerROS`
    pub namespace: String,
    pub nominal_max_speed: f64,
}

impl ControllerBinding {
    /// Reconfiguration service of the controller.
    pub fn set_parameters_service(&self) -> String {
        format!("{}/set_parameters", self.namespace)
    }
}

/// Parameter namespace of `planner` under `node_namespace`.
pub fn parameter_namespace(node_namespace: &str, planner: LocalPlanner) -> String {
    format!(
        "{}/move_base_flex/{}",
        node_namespace.trim_end_matches('/'),
        planner.plugin_name()
    )
}

/// Look up the active controller and its nominal max speed.
///
/// # Errors
///
/// - [`NavError::MissingParameter`] – keyword or `max_vel_x` not set.
/// - [`NavError::UnknownController`] – keyword outside the supported set.
/// - [`NavError::Config`] – `max_vel_x` is not a positive number.
pub fn resolve(
    source: &dyn ParameterSource,
    node_namespace: &str,
) -> Result<ControllerBinding, NavError> {
    let keyword_key = format!("{}/local_planner", node_namespace.trim_end_matches('/'));
    let keyword = source
        .get_str(&keyword_key)
        .ok_or(NavError::MissingParameter(keyword_key))?;
    let planner: LocalPlanner = keyword.parse()?;

    let namespace = parameter_namespace(node_namespace, planner);
    let speed_key = format!("{namespace}/{MAX_SPEED_PARAM}");
    let nominal_max_speed = source
        .get_f64(&speed_key)
        .ok_or_else(|| NavError::MissingParameter(speed_key.clone()))?;
    if !(nominal_max_speed.is_finite() && nominal_max_speed > 0.0) {
        return Err(NavError::Config(format!(
            "{speed_key} must be a positive speed (got {nominal_max_speed})"
        )));
    }

    Ok(ControllerBinding {
        planner,
        namespace,
        nominal_max_speed,
    })
}
