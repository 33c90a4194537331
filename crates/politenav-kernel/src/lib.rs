//! `politenav-kernel` – Reactive Safety Override
//!
//! Sits between a global planner and a trajectory-following controller and
//! decides, per planning request, whether the base plan is passed through or
//! replaced by a retreat waypoint.  It also advises the controller's max
//! speed according to how close the nearest obstacle is.
//!
//! # Modules
//!
//! - [`engine`] – [`PlanOverrideEngine`][engine::PlanOverrideEngine]:
//!   the orchestrator.  Owns the base plan, the obstacle snapshot and the
//!   `Normal` / `Retreating` state machine, and implements the
//!   [`InterPlanner`][engine::InterPlanner] capability.
//! - [`proximity`] – [`ProximityEvaluator`][proximity::ProximityEvaluator]:
//!   distance from the robot to every obstacle and a three-way
//!   classification of the nearest one.
//! - [`retreat`] – [`retreat_waypoint`][retreat::retreat_waypoint]:
//!   a point straight behind the robot.
//! - [`speed_advisor`] – [`SpeedAdvisor`][speed_advisor::SpeedAdvisor] and
//!   the [`ParameterSink`][speed_advisor::ParameterSink] seam to the
//!   downstream controller.
//! - [`controller`] – resolution of the active controller and its nominal
//!   max speed from a [`ParameterSource`][controller::ParameterSource].
//! - [`policy`] – [`InterceptorParams`][policy::InterceptorParams] and the
//!   per-request [`SpeedPolicy`][policy::SpeedPolicy].
//! - [`store`] – base plan and obstacle snapshot containers.

pub mod controller;
pub mod engine;
pub mod policy;
pub mod proximity;
pub mod retreat;
pub mod speed_advisor;
pub mod store;

pub use controller::{
    ControllerBinding, LocalPlanner, ParameterSource, StaticParameters, parameter_namespace,
};
pub use engine::{
    DEFAULT_PLAN_COST, EngineStatus, InterPlanner, PlanOverrideEngine, SafetyMode, SafetyState,
};
pub use policy::{InterceptorParams, SpeedPolicy};
pub use proximity::{Classification, ProximityEvaluator, ProximityReport};
pub use retreat::retreat_waypoint;
pub use speed_advisor::{MAX_SPEED_PARAM, ParameterSink, SpeedAdvisor};
pub use store::{BasePlanStore, ObstacleSnapshot};
