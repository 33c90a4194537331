//! [`PlanOverrideEngine`] – the reactive interceptor between the global
//! planner and the trajectory controller.
//!
//! Each planning request is answered with either the stored base plan or a
//! single retreat waypoint.  A hysteresis flag ([`SafetyState`]) keeps the
//! robot heading for the same retreat waypoint until it arrives there:
//!
//! ```text
//!            nearest obstacle <= safety radius
//!   Normal ───────────────────────────────────▶ Retreating { goal }
//!     ▲                                              │
//!     └──────────── |robot - goal| <= goal tolerance ┘
//! ```
//!
//! On arrival the same request is re-evaluated as `Normal`, so it may resume
//! the base plan or start a fresh retreat straight away.
//!
//! # Consistency
//!
//! The base plan, the safety state, the tuning parameters and the obstacle
//! snapshot share one [`Mutex`].  A planning request therefore never mixes
//! values from two points in time, and an obstacle update is seen either in
//! full or not at all.  The speed advisory is pushed after the lock has been
//! released.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use politenav_kernel::{InterceptorParams, ParameterSink, PlanOverrideEngine, SafetyState};
//! use politenav_types::{LabeledPoint, NavError, ObstacleBatch, Point3, Pose, Waypoint};
//!
//! struct NullSink;
//! impl ParameterSink for NullSink {
//!     fn set(&self, _name: &str, _value: f64) -> Result<(), NavError> { Ok(()) }
//! }
//!
//! let engine = PlanOverrideEngine::new(InterceptorParams::default(), 1.0, Arc::new(NullSink));
//! let here = Waypoint::new(Pose::new(Point3::new(0.0, 0.0, 0.0), 0.0), "map");
//!
//! engine.update_obstacles(ObstacleBatch::now(vec![LabeledPoint {
//!     id: "ped".into(),
//!     location: Point3::new(1.0, 0.0, 0.0),
//! }]));
//!
//! let outcome = engine.compute_path(&here, &here);
//! assert_eq!(outcome.path.len(), 1);
//! assert!((outcome.path[0].pose.position.x + 2.0).abs() < 1e-9);
//! assert!(matches!(engine.safety_state(), SafetyState::Retreating { .. }));
//! ```

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use politenav_types::{NavError, ObstacleBatch, OutcomeCode, PlanOutcome, Waypoint};
use tracing::{debug, error, info, warn};

use crate::controller::{self, ControllerBinding, ParameterSource};
use crate::policy::{InterceptorParams, SpeedPolicy};
use crate::proximity::{Classification, ProximityEvaluator};
use crate::retreat::retreat_waypoint;
use crate::speed_advisor::{ParameterSink, SpeedAdvisor};
use crate::store::{BasePlanStore, ObstacleSnapshot};

/// Cost reported with every path.  Not a meaningful path cost.
pub const DEFAULT_PLAN_COST: f64 = 0.0;

// ────────────────────────────────────────────────────────────────────────────
// Capability interface
// ────────────────────────────────────────────────────────────────────────────

/// The planner capability a host integration layer adapts to its plugin ABI.
pub trait InterPlanner: Send + Sync {
    /// Answer a planning request.  `goal` is accepted for interface
    /// compatibility.
    fn compute_path(&self, start: &Waypoint, goal: &Waypoint) -> PlanOutcome;

    /// Replace the base plan.  Returns `true` on success.
    fn set_plan(&self, plan: Vec<Waypoint>) -> bool;

    /// Request cancellation.  Returns `false` when unsupported.
    fn cancel(&self) -> bool;
}

// ────────────────────────────────────────────────────────────────────────────
// State
// ────────────────────────────────────────────────────────────────────────────

/// Hysteresis flag of the interceptor.
#[derive(Debug, Clone, PartialEq)]
pub enum SafetyState {
    /// Following the base plan.
    Normal,
    /// Steering towards a fixed retreat waypoint.
    Retreating { goal: Waypoint },
}

/// [`SafetyState`] without the payload, for status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafetyMode {
    Normal,
    Retreating,
}

impl SafetyState {
    pub fn mode(&self) -> SafetyMode {
        match self {
            SafetyState::Normal => SafetyMode::Normal,
            SafetyState::Retreating { .. } => SafetyMode::Retreating,
        }
    }
}

/// Point-in-time summary of the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineStatus {
    pub armed: bool,
    pub mode: SafetyMode,
    pub base_plan_len: usize,
    pub obstacle_count: usize,
    pub obstacles_stamp: Option<DateTime<Utc>>,
}

struct Armed {
    nominal_max_speed: f64,
    sink: Arc<dyn ParameterSink>,
}

struct EngineState {
    base_plan: BasePlanStore,
    obstacles: ObstacleSnapshot,
    safety: SafetyState,
    params: InterceptorParams,
}

// ────────────────────────────────────────────────────────────────────────────
// PlanOverrideEngine
// ────────────────────────────────────────────────────────────────────────────

/// Reactive safety override for a single planning session.
///
/// Share it as `Arc<PlanOverrideEngine>` between the obstacle feed and the
/// planning caller; every method takes `&self`.
pub struct PlanOverrideEngine {
    /// `None` when initialisation failed: the engine then passes the base
    /// plan through untouched and never pushes speeds.
    armed: Option<Armed>,
    state: Mutex<EngineState>,
}

impl PlanOverrideEngine {
    /// Build an armed engine from an already known nominal max speed.
    ///
    /// `params` are taken as-is; see [`PlanOverrideEngine::initialize`] for
    /// the validating constructor.
    pub fn new(
        params: InterceptorParams,
        nominal_max_speed: f64,
        sink: Arc<dyn ParameterSink>,
    ) -> Self {
        Self::build(
            params,
            Some(Armed {
                nominal_max_speed,
                sink,
            }),
        )
    }

    /// Build a pass-through engine that never overrides the base plan.
    pub fn disarmed(params: InterceptorParams) -> Self {
        Self::build(params, None)
    }

    /// Resolve the active controller from `source`, read its nominal max
    /// speed and connect a sink to it via `connect_sink`.
    ///
    /// Any failure is logged and yields a [disarmed](Self::disarmed) engine
    /// instead of an error: the host keeps running with the unmodified base
    /// plan.
    pub fn initialize<F>(
        params: InterceptorParams,
        source: &dyn ParameterSource,
        node_namespace: &str,
        connect_sink: F,
    ) -> Self
    where
        F: FnOnce(&ControllerBinding) -> Arc<dyn ParameterSink>,
    {
        if let Err(e) = params.validate() {
            error!(error = %e, "invalid interceptor parameters; staying disarmed");
            return Self::disarmed(params);
        }

        match controller::resolve(source, node_namespace) {
            Ok(binding) => {
                info!(
                    controller = %binding.planner,
                    namespace = %binding.namespace,
                    nominal_max_speed = binding.nominal_max_speed,
                    "interceptor armed"
                );
                let sink = connect_sink(&binding);
                Self::new(params, binding.nominal_max_speed, sink)
            }
            Err(e) => {
                error!(error = %e, node_namespace, "controller lookup failed; staying disarmed");
                Self::disarmed(params)
            }
        }
    }

    fn build(params: InterceptorParams, armed: Option<Armed>) -> Self {
        Self {
            armed,
            state: Mutex::new(EngineState {
                base_plan: BasePlanStore::default(),
                obstacles: ObstacleSnapshot::default(),
                safety: SafetyState::Normal,
                params,
            }),
        }
    }

    /// Whether the engine may override plans and push speeds.
    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    /// Replace the obstacle snapshot with `batch`.
    pub fn update_obstacles(&self, batch: ObstacleBatch) {
        let snapshot = ObstacleSnapshot::from(batch);
        let count = snapshot.len();
        // The previous snapshot is dropped after the guard is released.
        let _previous = std::mem::replace(&mut self.lock().obstacles, snapshot);
        debug!(count, "obstacle snapshot replaced");
    }

    /// Replace the base plan.  Always succeeds; the safety state is kept.
    pub fn set_plan(&self, plan: Vec<Waypoint>) -> bool {
        let len = plan.len();
        let _previous = std::mem::replace(&mut self.lock().base_plan, {
            let mut store = BasePlanStore::default();
            store.replace(plan);
            store
        });
        debug!(len, "base plan replaced");
        true
    }

    /// Cancellation is not supported.
    pub fn cancel(&self) -> bool {
        false
    }

    /// Answer a planning request from the robot's current pose `start`.
    pub fn compute_path(&self, start: &Waypoint, _goal: &Waypoint) -> PlanOutcome {
        let Some(armed) = &self.armed else {
            return passthrough(self.lock().base_plan.waypoints().to_vec());
        };

        let (outcome, advisor, classification) = {
            let mut state = self.lock();
            let policy = SpeedPolicy::new(armed.nominal_max_speed, &state.params);
            let report = ProximityEvaluator::new(policy.safety_radius, policy.caution_radius)
                .evaluate(&start.pose, &state.obstacles);

            if let SafetyState::Retreating { goal } = &state.safety {
                let remaining = start.position().planar_distance_to(goal.position());
                if remaining <= policy.goal_tolerance {
                    info!(remaining, "retreat waypoint reached; back to normal");
                    state.safety = SafetyState::Normal;
                }
            }

            if state.safety == SafetyState::Normal
                && report.classification == Classification::WithinSafetyRadius
            {
                let goal = retreat_waypoint(start, policy.retreat_distance);
                warn!(
                    nearest = report.nearest.unwrap_or(f64::NAN),
                    goal_x = goal.pose.position.x,
                    goal_y = goal.pose.position.y,
                    "obstacle inside safety radius; retreating"
                );
                state.safety = SafetyState::Retreating { goal };
            }

            let outcome = match &state.safety {
                SafetyState::Retreating { goal } => retreat(goal.clone()),
                SafetyState::Normal => passthrough(state.base_plan.waypoints().to_vec()),
            };
            (outcome, SpeedAdvisor::new(policy), report.classification)
        };

        advisor.advise(armed.sink.as_ref(), classification);
        outcome
    }

    /// Swap in new tuning parameters.  Takes effect on the next request.
    ///
    /// # Errors
    ///
    /// [`NavError::Config`] when `params` fail validation; the previous
    /// parameters stay active.
    pub fn reconfigure(&self, params: InterceptorParams) -> Result<(), NavError> {
        params.validate()?;
        info!(?params, "interceptor reconfigured");
        self.lock().params = params;
        Ok(())
    }

    /// Current tuning parameters.
    pub fn params(&self) -> InterceptorParams {
        self.lock().params.clone()
    }

    pub fn safety_state(&self) -> SafetyState {
        self.lock().safety.clone()
    }

    pub fn status(&self) -> EngineStatus {
        let state = self.lock();
        EngineStatus {
            armed: self.is_armed(),
            mode: state.safety.mode(),
            base_plan_len: state.base_plan.len(),
            obstacle_count: state.obstacles.len(),
            obstacles_stamp: state.obstacles.stamp(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        // A panic while holding the lock cannot leave the state half-written
        // (every mutation is a single assignment), so keep serving.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl InterPlanner for PlanOverrideEngine {
    fn compute_path(&self, start: &Waypoint, goal: &Waypoint) -> PlanOutcome {
        PlanOverrideEngine::compute_path(self, start, goal)
    }

    fn set_plan(&self, plan: Vec<Waypoint>) -> bool {
        PlanOverrideEngine::set_plan(self, plan)
    }

    fn cancel(&self) -> bool {
        PlanOverrideEngine::cancel(self)
    }
}

fn passthrough(path: Vec<Waypoint>) -> PlanOutcome {
    PlanOutcome {
        path,
        cost: DEFAULT_PLAN_COST,
        outcome: OutcomeCode::Success,
        message: None,
    }
}

fn retreat(goal: Waypoint) -> PlanOutcome {
    PlanOutcome {
        path: vec![goal],
        cost: DEFAULT_PLAN_COST,
        outcome: OutcomeCode::Success,
        message: Some("retreating from obstacle".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{StaticParameters, parameter_namespace, LocalPlanner};
    use crate::speed_advisor::tests::{FailingSink, RecordingSink};
    use politenav_types::{LabeledPoint, Point3, Pose};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{OnceLock, Weak};
    use std::thread;

    // ------------------------------------------------------------------ helpers

    fn wp(x: f64, y: f64, yaw: f64) -> Waypoint {
        Waypoint::new(Pose::new(Point3::new(x, y, 0.0), yaw), "map")
    }

    fn batch(points: &[(f64, f64, f64)]) -> ObstacleBatch {
        ObstacleBatch::now(
            points
                .iter()
                .enumerate()
                .map(|(i, &(x, y, z))| LabeledPoint {
                    id: format!("ped_{i}"),
                    location: Point3::new(x, y, z),
                })
                .collect(),
        )
    }

    fn base_plan() -> Vec<Waypoint> {
        vec![wp(1.0, 0.0, 0.0), wp(2.0, 0.0, 0.0), wp(3.0, 1.0, 0.5)]
    }

    fn engine_with(nominal: f64) -> (PlanOverrideEngine, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let engine = PlanOverrideEngine::new(InterceptorParams::default(), nominal, sink.clone());
        engine.set_plan(base_plan());
        (engine, sink)
    }

    // ------------------------------------------------------------------ scenarios

    #[test]
    fn empty_snapshot_returns_base_plan() {
        let (engine, sink) = engine_with(1.0);
        let here = wp(0.0, 0.0, 0.0);

        let outcome = engine.compute_path(&here, &here);

        assert_eq!(outcome.path, base_plan());
        assert_eq!(outcome.outcome, OutcomeCode::Success);
        assert_eq!(outcome.cost, DEFAULT_PLAN_COST);
        assert!(outcome.message.is_none());
        assert_eq!(engine.safety_state(), SafetyState::Normal);
        assert_eq!(sink.values(), vec![1.0]);
    }

    #[test]
    fn obstacle_inside_safety_radius_triggers_retreat() {
        let (engine, _sink) = engine_with(1.0);
        engine.update_obstacles(batch(&[(1.0, 0.0, 0.0)]));
        let here = wp(0.0, 0.0, 0.0);

        let outcome = engine.compute_path(&here, &here);

        assert_eq!(outcome.path.len(), 1);
        let goal = &outcome.path[0];
        assert!((goal.pose.position.x + 2.0).abs() < 1e-12);
        assert!(goal.pose.position.y.abs() < 1e-12);
        assert_eq!(goal.pose.position.z, 0.0);
        assert_eq!(goal.frame_id, "map");
        assert_eq!(outcome.outcome, OutcomeCode::Success);
        assert!(outcome.message.is_some());
        assert_eq!(
            engine.safety_state(),
            SafetyState::Retreating { goal: goal.clone() }
        );
    }

    #[test]
    fn reaching_retreat_goal_reverts_to_normal() {
        let (engine, _sink) = engine_with(1.0);
        engine.update_obstacles(batch(&[(1.0, 0.0, 0.0)]));
        let here = wp(0.0, 0.0, 0.0);
        engine.compute_path(&here, &here);

        // 0.15 m short of the goal at (-2, 0); the obstacle is now 2.85 m away.
        let near_goal = wp(-1.85, 0.0, 0.0);
        let outcome = engine.compute_path(&near_goal, &near_goal);

        assert_eq!(engine.safety_state(), SafetyState::Normal);
        assert_eq!(outcome.path, base_plan());
    }

    #[test]
    fn cautious_obstacle_reduces_speed_without_retreat() {
        let (engine, sink) = engine_with(1.0);
        engine.update_obstacles(batch(&[(5.0, 0.0, 0.0)]));
        let here = wp(0.0, 0.0, 0.0);

        let outcome = engine.compute_path(&here, &here);

        assert_eq!(engine.safety_state(), SafetyState::Normal);
        assert_eq!(outcome.path, base_plan());
        let pushed = sink.values();
        assert_eq!(pushed.len(), 1);
        assert!((pushed[0] - 0.1).abs() < 1e-12);
    }

    // ------------------------------------------------------------------ properties

    #[test]
    fn obstacles_beyond_safety_radius_never_override() {
        let (engine, _sink) = engine_with(1.0);
        let here = wp(0.0, 0.0, 0.0);
        for d in [2.0001, 2.5, 5.0, 9.99, 10.0, 50.0] {
            engine.update_obstacles(batch(&[(0.0, d, 0.0), (-d, 0.0, 0.0)]));
            let outcome = engine.compute_path(&here, &here);
            assert_eq!(outcome.path, base_plan(), "distance {d}");
            assert_eq!(engine.safety_state(), SafetyState::Normal, "distance {d}");
        }
    }

    #[test]
    fn retreat_goal_is_fixed_while_retreating() {
        let (engine, _sink) = engine_with(1.0);
        engine.update_obstacles(batch(&[(1.0, 0.0, 0.0)]));
        let first = engine.compute_path(&wp(0.0, 0.0, 0.0), &wp(0.0, 0.0, 0.0));

        // New readings and a new heading must not move the goal.
        engine.update_obstacles(batch(&[]));
        let second = engine.compute_path(&wp(-0.5, 0.3, 1.2), &wp(0.0, 0.0, 0.0));
        engine.update_obstacles(batch(&[(-0.6, 0.3, 0.0)]));
        let third = engine.compute_path(&wp(-1.0, 0.1, -0.7), &wp(0.0, 0.0, 0.0));

        assert_eq!(first.path, second.path);
        assert_eq!(first.path, third.path);
        assert!(matches!(engine.safety_state(), SafetyState::Retreating { .. }));
    }

    #[test]
    fn retreat_goal_uses_heading_at_transition() {
        let (engine, _sink) = engine_with(1.0);
        engine.update_obstacles(batch(&[(0.0, 1.0, 0.0)]));
        let facing_up = wp(0.0, 0.0, std::f64::consts::FRAC_PI_2);

        let outcome = engine.compute_path(&facing_up, &facing_up);

        let goal = &outcome.path[0];
        assert!(goal.pose.position.x.abs() < 1e-12);
        assert!((goal.pose.position.y + 2.0).abs() < 1e-12);
        assert_eq!(goal.pose.yaw, std::f64::consts::FRAC_PI_2);
    }

    #[test]
    fn arrival_reevaluates_in_the_same_call() {
        let (engine, _sink) = engine_with(1.0);
        engine.update_obstacles(batch(&[(1.0, 0.0, 0.0)]));
        engine.compute_path(&wp(0.0, 0.0, 0.0), &wp(0.0, 0.0, 0.0));

        // The pedestrian followed the robot; arrival immediately re-arms a
        // retreat from the new pose.
        engine.update_obstacles(batch(&[(-1.0, 0.0, 0.0)]));
        let at_goal = wp(-2.0, 0.0, 0.0);
        let outcome = engine.compute_path(&at_goal, &at_goal);

        assert_eq!(outcome.path.len(), 1);
        assert!((outcome.path[0].pose.position.x + 4.0).abs() < 1e-12);
    }

    #[test]
    fn goal_tolerance_boundary_is_inclusive() {
        let (engine, _sink) = engine_with(1.0);
        engine.update_obstacles(batch(&[(1.0, 0.0, 0.0)]));
        engine.compute_path(&wp(0.0, 0.0, 0.0), &wp(0.0, 0.0, 0.0));
        engine.update_obstacles(batch(&[]));

        let outside = wp(-1.75, 0.0, 0.0);
        engine.compute_path(&outside, &outside);
        assert!(matches!(engine.safety_state(), SafetyState::Retreating { .. }));

        let on_boundary = wp(-2.0, 0.2, 0.0);
        engine.compute_path(&on_boundary, &on_boundary);
        assert_eq!(engine.safety_state(), SafetyState::Normal);
    }

    #[test]
    fn pushed_speed_follows_nearest_obstacle_not_last() {
        let (engine, sink) = engine_with(2.0);
        // Nearest (cautious) first, a clear one last.
        engine.update_obstacles(batch(&[(4.0, 0.0, 0.0), (30.0, 0.0, 0.0)]));
        engine.compute_path(&wp(0.0, 0.0, 0.0), &wp(0.0, 0.0, 0.0));

        engine.update_obstacles(batch(&[(30.0, 0.0, 0.0), (40.0, 0.0, 0.0)]));
        engine.compute_path(&wp(0.0, 0.0, 0.0), &wp(0.0, 0.0, 0.0));

        let pushed = sink.values();
        assert_eq!(pushed.len(), 2);
        assert!((pushed[0] - 0.2).abs() < 1e-12);
        assert_eq!(pushed[1], 2.0);
    }

    #[test]
    fn speed_is_advised_while_retreating() {
        let (engine, sink) = engine_with(1.0);
        engine.update_obstacles(batch(&[(1.0, 0.0, 0.0)]));
        engine.compute_path(&wp(0.0, 0.0, 0.0), &wp(0.0, 0.0, 0.0));
        engine.update_obstacles(batch(&[]));
        engine.compute_path(&wp(-0.5, 0.0, 0.0), &wp(0.0, 0.0, 0.0));

        let pushed = sink.values();
        assert!((pushed[0] - 0.1).abs() < 1e-12);
        assert_eq!(pushed[1], 1.0);
    }

    #[test]
    fn failed_push_does_not_affect_path_or_state() {
        let engine =
            PlanOverrideEngine::new(InterceptorParams::default(), 1.0, Arc::new(FailingSink));
        engine.set_plan(base_plan());
        engine.update_obstacles(batch(&[(1.5, 0.0, 0.0)]));

        let outcome = engine.compute_path(&wp(0.0, 0.0, 0.0), &wp(0.0, 0.0, 0.0));

        assert_eq!(outcome.path.len(), 1);
        assert_eq!(outcome.outcome, OutcomeCode::Success);
        assert!(matches!(engine.safety_state(), SafetyState::Retreating { .. }));
    }

    // ------------------------------------------------------------------ plan / cancel

    #[test]
    fn set_plan_replaces_and_keeps_safety_state() {
        let (engine, _sink) = engine_with(1.0);
        engine.update_obstacles(batch(&[(1.0, 0.0, 0.0)]));
        engine.compute_path(&wp(0.0, 0.0, 0.0), &wp(0.0, 0.0, 0.0));

        assert!(engine.set_plan(vec![wp(9.0, 9.0, 0.0)]));
        assert!(matches!(engine.safety_state(), SafetyState::Retreating { .. }));

        engine.update_obstacles(batch(&[]));
        let outcome = engine.compute_path(&wp(-2.0, 0.0, 0.0), &wp(0.0, 0.0, 0.0));
        assert_eq!(outcome.path, vec![wp(9.0, 9.0, 0.0)]);
    }

    #[test]
    fn empty_base_plan_is_returned_as_is() {
        let engine = PlanOverrideEngine::new(
            InterceptorParams::default(),
            1.0,
            Arc::new(RecordingSink::default()),
        );
        let outcome = engine.compute_path(&wp(0.0, 0.0, 0.0), &wp(0.0, 0.0, 0.0));
        assert!(outcome.path.is_empty());
        assert_eq!(outcome.outcome, OutcomeCode::Success);
    }

    #[test]
    fn cancel_is_not_supported() {
        let (engine, _sink) = engine_with(1.0);
        assert!(!engine.cancel());
        let planner: &dyn InterPlanner = &engine;
        assert!(!planner.cancel());
    }

    #[test]
    fn works_through_the_capability_trait() {
        let (engine, _sink) = engine_with(1.0);
        let planner: Arc<dyn InterPlanner> = Arc::new(engine);
        assert!(planner.set_plan(vec![wp(5.0, 0.0, 0.0)]));
        let outcome = planner.compute_path(&wp(0.0, 0.0, 0.0), &wp(5.0, 0.0, 0.0));
        assert_eq!(outcome.path, vec![wp(5.0, 0.0, 0.0)]);
    }

    // ------------------------------------------------------------------ initialisation

    fn jackal_parameters(speed: f64) -> StaticParameters {
        let mut p = StaticParameters::new();
        p.set_str("/jackal/local_planner", "teb");
        p.set_f64(
            format!("{}/max_vel_x", parameter_namespace("/jackal", LocalPlanner::Teb)),
            speed,
        );
        p
    }

    #[test]
    fn initialize_arms_with_looked_up_speed() {
        let sink = Arc::new(RecordingSink::default());
        let sink_for_engine = sink.clone();
        let engine = PlanOverrideEngine::initialize(
            InterceptorParams::default(),
            &jackal_parameters(0.6),
            "/jackal",
            move |binding| {
                assert_eq!(
                    binding.set_parameters_service(),
                    "/jackal/move_base_flex/TebLocalPlannerROS/set_parameters"
                );
                sink_for_engine as Arc<dyn ParameterSink>
            },
        );

        assert!(engine.is_armed());
        engine.compute_path(&wp(0.0, 0.0, 0.0), &wp(0.0, 0.0, 0.0));
        assert_eq!(sink.values(), vec![0.6]);
    }

    #[test]
    fn failed_lookup_leaves_engine_disarmed() {
        let connected = AtomicBool::new(false);
        let engine = PlanOverrideEngine::initialize(
            InterceptorParams::default(),
            &StaticParameters::new(),
            "/jackal",
            |_| {
                connected.store(true, Ordering::SeqCst);
                Arc::new(RecordingSink::default()) as Arc<dyn ParameterSink>
            },
        );

        assert!(!engine.is_armed());
        assert!(!connected.load(Ordering::SeqCst));

        engine.set_plan(base_plan());
        engine.update_obstacles(batch(&[(0.5, 0.0, 0.0)]));
        let outcome = engine.compute_path(&wp(0.0, 0.0, 0.0), &wp(0.0, 0.0, 0.0));
        assert_eq!(outcome.path, base_plan());
        assert_eq!(engine.safety_state(), SafetyState::Normal);
    }

    #[test]
    fn invalid_params_leave_engine_disarmed() {
        let params = InterceptorParams {
            cautious_factor: 0.0,
            ..Default::default()
        };
        let engine = PlanOverrideEngine::initialize(
            params,
            &jackal_parameters(0.6),
            "/jackal",
            |_| Arc::new(RecordingSink::default()) as Arc<dyn ParameterSink>,
        );
        assert!(!engine.is_armed());
    }

    // ------------------------------------------------------------------ reconfiguration

    #[test]
    fn reconfigure_changes_next_request() {
        let (engine, sink) = engine_with(1.0);
        engine.update_obstacles(batch(&[(5.0, 0.0, 0.0)]));

        let mut params = engine.params();
        params.cautious_factor = 0.5;
        params.safety_radius = 6.0;
        engine.reconfigure(params).unwrap();

        let outcome = engine.compute_path(&wp(0.0, 0.0, 0.0), &wp(0.0, 0.0, 0.0));
        assert_eq!(outcome.path.len(), 1);
        assert_eq!(sink.values(), vec![0.5]);
    }

    #[test]
    fn invalid_reconfigure_keeps_previous_params() {
        let (engine, _sink) = engine_with(1.0);
        let bad = InterceptorParams {
            goal_tolerance: -1.0,
            ..Default::default()
        };
        assert!(matches!(engine.reconfigure(bad), Err(NavError::Config(_))));
        assert_eq!(engine.params(), InterceptorParams::default());
    }

    // ------------------------------------------------------------------ status

    #[test]
    fn status_reflects_state() {
        let (engine, _sink) = engine_with(1.0);
        let obstacles = batch(&[(1.0, 0.0, 0.0), (7.0, 0.0, 0.0)]);
        let stamp = obstacles.stamp;
        engine.update_obstacles(obstacles);
        engine.compute_path(&wp(0.0, 0.0, 0.0), &wp(0.0, 0.0, 0.0));

        let status = engine.status();
        assert!(status.armed);
        assert_eq!(status.mode, SafetyMode::Retreating);
        assert_eq!(status.base_plan_len, 3);
        assert_eq!(status.obstacle_count, 2);
        assert_eq!(status.obstacles_stamp, Some(stamp));
    }

    // ------------------------------------------------------------------ concurrency

    /// A sink that calls back into the engine.  Would deadlock if the push
    /// happened while the state lock is held.
    struct ReentrantSink {
        engine: OnceLock<Weak<PlanOverrideEngine>>,
        seen: Mutex<Vec<SafetyMode>>,
    }

    impl ParameterSink for ReentrantSink {
        fn set(&self, _name: &str, _value: f64) -> Result<(), NavError> {
            if let Some(engine) = self.engine.get().and_then(Weak::upgrade) {
                self.seen.lock().unwrap().push(engine.status().mode);
            }
            Ok(())
        }
    }

    #[test]
    fn speed_push_happens_outside_the_lock() {
        let sink = Arc::new(ReentrantSink {
            engine: OnceLock::new(),
            seen: Mutex::new(Vec::new()),
        });
        let engine = Arc::new(PlanOverrideEngine::new(
            InterceptorParams::default(),
            1.0,
            sink.clone(),
        ));
        sink.engine.set(Arc::downgrade(&engine)).ok();

        engine.update_obstacles(batch(&[(1.0, 0.0, 0.0)]));
        engine.compute_path(&wp(0.0, 0.0, 0.0), &wp(0.0, 0.0, 0.0));

        assert_eq!(sink.seen.lock().unwrap().as_slice(), &[SafetyMode::Retreating]);
    }

    #[test]
    fn concurrent_feed_and_planning() {
        let (engine, sink) = engine_with(1.0);
        let engine = Arc::new(engine);

        let feeder = {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for i in 0..500 {
                    // Every batch is uniformly far: never within caution radius.
                    let d = 20.0 + (i % 7) as f64;
                    engine.update_obstacles(batch(&[(d, 0.0, 0.0), (0.0, d, 0.0), (-d, 0.0, 0.0)]));
                }
            })
        };
        let planner = {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for _ in 0..500 {
                    let outcome = engine.compute_path(&wp(0.0, 0.0, 0.0), &wp(0.0, 0.0, 0.0));
                    assert_eq!(outcome.path, base_plan());
                }
            })
        };

        feeder.join().unwrap();
        planner.join().unwrap();

        assert_eq!(engine.safety_state(), SafetyState::Normal);
        assert!(sink.values().iter().all(|&v| v == 1.0));
        assert_eq!(engine.status().obstacle_count, 3);
    }
}
