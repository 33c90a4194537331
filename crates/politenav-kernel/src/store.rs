//! Caches owned by the engine: the last base plan from the global planner and
//! the most recent obstacle batch.

use chrono::{DateTime, Utc};
use politenav_types::{ObstacleBatch, Point3, Waypoint};

/// Last path handed over by the global planner.  Replaced wholesale.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BasePlanStore {
    plan: Vec<Waypoint>,
}

impl BasePlanStore {
    pub fn replace(&mut self, plan: Vec<Waypoint>) {
        self.plan = plan;
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.plan
    }

    pub fn len(&self) -> usize {
        self.plan.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plan.is_empty()
    }
}

/// Immutable view of one obstacle batch.
///
/// Detector ids are dropped; only locations matter for proximity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObstacleSnapshot {
    points: Vec<Point3>,
    stamp: Option<DateTime<Utc>>,
}

impl ObstacleSnapshot {
    /// Snapshot without a receipt stamp.
    pub fn from_points(points: Vec<Point3>) -> Self {
        Self {
            points,
            stamp: None,
        }
    }

    pub fn points(&self) -> &[Point3] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// When the batch was received, if known.
    pub fn stamp(&self) -> Option<DateTime<Utc>> {
        self.stamp
    }
}

impl From<ObstacleBatch> for ObstacleSnapshot {
    fn from(batch: ObstacleBatch) -> Self {
        Self {
            points: batch.points.into_iter().map(|p| p.location).collect(),
            stamp: Some(batch.stamp),
        }
    }
}
