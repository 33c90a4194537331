//! [`ProximityEvaluator`] – distance of the robot to every detected obstacle
//! and the overall classification of a planning request.

use politenav_types::Pose;

use crate::store::ObstacleSnapshot;

/// How close the nearest obstacle is, relative to the configured radii.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// No obstacle inside the caution radius.
    Clear,
    /// Nearest obstacle inside the caution radius but outside the safety radius.
    WithinCautionRadius,
    /// Nearest obstacle inside the safety radius.
    WithinSafetyRadius,
}

impl Classification {
    /// `true` for both radius classes.
    pub fn is_cautious(self) -> bool {
        !matches!(self, Classification::Clear)
    }
}

/// Per-request proximity result.
#[derive(Debug, Clone, PartialEq)]
pub struct ProximityReport {
    /// Distance to each obstacle, in snapshot order.
    pub distances: Vec<f64>,
    /// Distance to the nearest obstacle, `None` when the snapshot is empty.
    pub nearest: Option<f64>,
    pub classification: Classification,
}

/// Classifies a pose against an obstacle snapshot.
///
/// # Example
///
/// ```
/// use politenav_kernel::proximity::{Classification, ProximityEvaluator};
/// use politenav_kernel::store::ObstacleSnapshot;
/// use politenav_types::{Point3, Pose};
///
/// let evaluator = ProximityEvaluator::new(2.0, 10.0);
/// let snapshot = ObstacleSnapshot::from_points(vec![Point3::new(5.0, 0.0, 0.0)]);
///
/// let report = evaluator.evaluate(&Pose::default(), &snapshot);
/// assert_eq!(report.classification, Classification::WithinCautionRadius);
/// assert_eq!(report.nearest, Some(5.0));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ProximityEvaluator {
    safety_radius: f64,
    caution_radius: f64,
}

impl ProximityEvaluator {
    pub fn new(safety_radius: f64, caution_radius: f64) -> Self {
        Self {
            safety_radius,
            caution_radius,
        }
    }

    /// Measure every obstacle in `snapshot` from `pose` and classify the
    /// request by the globally nearest one.
    pub fn evaluate(&self, pose: &Pose, snapshot: &ObstacleSnapshot) -> ProximityReport {
        let distances: Vec<f64> = snapshot
            .points()
            .iter()
            .map(|point| pose.position.distance_to(point))
            .collect();

        let nearest = distances.iter().copied().reduce(f64::min);

        ProximityReport {
            classification: self.classify(nearest),
            distances,
            nearest,
        }
    }

    /// Classify a nearest-obstacle distance.  Both radii are inclusive.
    pub fn classify(&self, nearest: Option<f64>) -> Classification {
        match nearest {
            Some(d) if d <= self.safety_radius => Classification::WithinSafetyRadius,
            Some(d) if d <= self.caution_radius => Classification::WithinCautionRadius,
            _ => Classification::Clear,
        }
    }
}
