use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A point in 3-D space (metres).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean norm of the full x/y/z displacement to `other`.
    pub fn distance_to(&self, other: &Point3) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        let dz = other.z - self.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Distance to `other` projected onto the ground (x/y) plane.
    pub fn planar_distance_to(&self, other: &Point3) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

/// Robot pose: position plus heading around the vertical axis.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub position: Point3,
    /// Heading measured counter-clockwise from +X (radians).
    pub yaw: f64,
}

impl Pose {
    pub fn new(position: Point3, yaw: f64) -> Self {
        Self { position, yaw }
    }

    /// Build a pose from a position and a unit quaternion `(x, y, z, w)`,
    /// keeping only the yaw component of the rotation.
    pub fn from_quaternion(position: Point3, qx: f64, qy: f64, qz: f64, qw: f64) -> Self {
        let siny_cosp = 2.0 * (qw * qz + qx * qy);
        let cosy_cosp = 1.0 - 2.0 * (qy * qy + qz * qz);
        Self {
            position,
            yaw: siny_cosp.atan2(cosy_cosp),
        }
    }

    /// The heading as a unit quaternion `[x, y, z, w]` (pure yaw rotation).
    pub fn orientation(&self) -> [f64; 4] {
        let half = self.yaw * 0.5;
        [0.0, 0.0, half.sin(), half.cos()]
    }
}

/// A pose expressed in a named coordinate frame.
///
/// Used both for entries of the base plan and for the generated retreat goal.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Waypoint {
    pub pose: Pose,
    /// e.g. `"map"`
    pub frame_id: String,
}

impl Waypoint {
    pub fn new(pose: Pose, frame_id: impl Into<String>) -> Self {
        Self {
            pose,
            frame_id: frame_id.into(),
        }
    }

    pub fn position(&self) -> &Point3 {
        &self.pose.position
    }
}

/// One detected person or obstacle as delivered by the obstacle feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledPoint {
    /// Detector-assigned identifier.  Carried for completeness; the
    /// interceptor never tracks identity across batches.
    #[serde(default)]
    pub id: String,
    pub location: Point3,
}

/// A complete obstacle detection batch.  Each delivery replaces the previous
/// one wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObstacleBatch {
    pub points: Vec<LabeledPoint>,
    pub stamp: DateTime<Utc>,
}

impl ObstacleBatch {
    /// Wrap `points` in a batch stamped with the current time.
    pub fn now(points: Vec<LabeledPoint>) -> Self {
        Self {
            points,
            stamp: Utc::now(),
        }
    }
}

/// Result codes of a planning request, following the host navigation
/// framework's result vocabulary.
///
/// Only [`OutcomeCode::Success`] is produced today; the remaining codes are
/// kept so that adapters can translate them without a lookup table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutcomeCode {
    Success,
    Failure,
    Canceled,
    InvalidStart,
    InvalidGoal,
    BlockedStart,
    BlockedGoal,
    NoPathFound,
    PatExceeded,
    EmptyPath,
    TfError,
    NotInitialized,
    InvalidPlugin,
    InternalError,
}

impl OutcomeCode {
    /// Numeric code as understood by the host framework.
    pub fn code(self) -> u32 {
        match self {
            OutcomeCode::Success => 0,
            OutcomeCode::Failure => 50,
            OutcomeCode::Canceled => 51,
            OutcomeCode::InvalidStart => 52,
            OutcomeCode::InvalidGoal => 53,
            OutcomeCode::BlockedStart => 54,
            OutcomeCode::BlockedGoal => 55,
            OutcomeCode::NoPathFound => 56,
            OutcomeCode::PatExceeded => 57,
            OutcomeCode::EmptyPath => 58,
            OutcomeCode::TfError => 59,
            OutcomeCode::NotInitialized => 60,
            OutcomeCode::InvalidPlugin => 61,
            OutcomeCode::InternalError => 62,
        }
    }
}

/// Everything a planning request hands back to its caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanOutcome {
    /// Ordered waypoints to follow.
    pub path: Vec<Waypoint>,
    /// Placeholder cost.  Not meaningful for comparing alternatives.
    pub cost: f64,
    pub outcome: OutcomeCode,
    /// Optional human-readable detail.
    pub message: Option<String>,
}

/// Workspace-wide error type.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NavError {
    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Missing Parameter: {0}")]
    MissingParameter(String),

    #[error("Unknown Controller: '{0}' (expected one of teb, mpc, dwa, cohan)")]
    UnknownController(String),

    #[error("Parameter Push Failed for {name}: {details}")]
    ParameterPush { name: String, details: String },

    #[error("Transport Error: {0}")]
    Transport(String),

    #[error("Parsing Error: {0}")]
    Parsing(String),
}
