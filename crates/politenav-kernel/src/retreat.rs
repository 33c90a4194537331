//! Retreat goal generation.

use politenav_types::{Point3, Pose, Waypoint};

/// Place a waypoint `retreat_distance` metres behind `current`, along its
/// heading.
///
/// The frame identifier and heading are kept, so the robot backs away
/// without turning around.
///
/// ```
/// use politenav_kernel::retreat::retreat_waypoint;
/// use politenav_types::{Point3, Pose, Waypoint};
///
/// let start = Waypoint::new(Pose::new(Point3::new(0.0, 0.0, 0.0), 0.0), "map");
/// let goal = retreat_waypoint(&start, 2.0);
/// assert!((goal.pose.position.x + 2.0).abs() < 1e-12);
/// assert_eq!(goal.frame_id, "map");
/// ```
pub fn retreat_waypoint(current: &Waypoint, retreat_distance: f64) -> Waypoint {
    let Pose { position, yaw } = current.pose;
    let target = Point3::new(
        position.x - retreat_distance * yaw.cos(),
        position.y - retreat_distance * yaw.sin(),
        position.z,
    );
    Waypoint::new(Pose::new(target, yaw), current.frame_id.clone())
}
