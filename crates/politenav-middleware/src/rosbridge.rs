//! rosbridge v2 frames and the ROS message shapes the interceptor exchanges.
//!
//! Frame builders return serialised JSON ready to be sent as a WebSocket text
//! message.  Message parsers take the `msg` object of an inbound `publish`
//! frame.  Orientation is converted between quaternion and yaw here; the
//! kernel only ever sees yaw.

use politenav_types::{LabeledPoint, NavError, ObstacleBatch, Point3, Pose, Waypoint};
use serde::Deserialize;
use serde_json::{Value, json};

pub const SEMANTIC_DATA_TYPE: &str = "pedsim_msgs/SemanticData";
pub const PATH_TYPE: &str = "nav_msgs/Path";
pub const POSE_STAMPED_TYPE: &str = "geometry_msgs/PoseStamped";
pub const CONFIG_TYPE: &str = "dynamic_reconfigure/Config";

// ────────────────────────────────────────────────────────────────────────────
// Outbound frames
// ────────────────────────────────────────────────────────────────────────────

pub fn subscribe_frame(topic: &str, msg_type: &str) -> String {
    json!({ "op": "subscribe", "topic": topic, "type": msg_type }).to_string()
}

pub fn advertise_frame(topic: &str, msg_type: &str) -> String {
    json!({ "op": "advertise", "topic": topic, "type": msg_type }).to_string()
}

pub fn publish_frame(topic: &str, msg: Value) -> String {
    json!({ "op": "publish", "topic": topic, "msg": msg }).to_string()
}

/// `dynamic_reconfigure/Reconfigure` call setting a single double parameter.
pub fn set_double_frame(id: &str, service: &str, name: &str, value: f64) -> String {
    json!({
        "op": "call_service",
        "id": id,
        "service": service,
        "args": {
            "config": {
                "bools": [],
                "ints": [],
                "strs": [],
                "doubles": [{ "name": name, "value": value }],
                "groups": []
            }
        }
    })
    .to_string()
}

// ────────────────────────────────────────────────────────────────────────────
// Inbound frames
// ────────────────────────────────────────────────────────────────────────────

/// The inbound frames the bridge acts on.  Every other `op` is `Other`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum InboundFrame {
    Publish {
        topic: String,
        msg: Value,
    },
    ServiceResponse {
        #[serde(default)]
        id: Option<String>,
        service: String,
        #[serde(default = "default_true")]
        result: bool,
        #[serde(default)]
        values: Value,
    },
    #[serde(other)]
    Other,
}

fn default_true() -> bool {
    true
}

pub fn parse_frame(text: &str) -> Result<InboundFrame, NavError> {
    serde_json::from_str(text).map_err(|e| NavError::Parsing(format!("rosbridge frame: {e}")))
}

// ────────────────────────────────────────────────────────────────────────────
// Message shapes
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
struct RosPoint {
    #[serde(default)]
    x: f64,
    #[serde(default)]
    y: f64,
    #[serde(default)]
    z: f64,
}

impl From<RosPoint> for Point3 {
    fn from(p: RosPoint) -> Self {
        Point3::new(p.x, p.y, p.z)
    }
}

#[derive(Debug, Deserialize)]
struct RosQuaternion {
    #[serde(default)]
    x: f64,
    #[serde(default)]
    y: f64,
    #[serde(default)]
    z: f64,
    #[serde(default = "unit_w")]
    w: f64,
}

fn unit_w() -> f64 {
    1.0
}

impl Default for RosQuaternion {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            w: 1.0,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RosPose {
    position: RosPoint,
    #[serde(default)]
    orientation: RosQuaternion,
}

impl From<RosPose> for Pose {
    fn from(p: RosPose) -> Self {
        let q = p.orientation;
        Pose::from_quaternion(p.position.into(), q.x, q.y, q.z, q.w)
    }
}

#[derive(Debug, Default, Deserialize)]
struct Header {
    #[serde(default)]
    frame_id: String,
}

#[derive(Debug, Deserialize)]
struct PoseStampedMsg {
    #[serde(default)]
    header: Header,
    pose: RosPose,
}

#[derive(Debug, Deserialize)]
struct PathMsg {
    #[serde(default)]
    header: Header,
    #[serde(default)]
    poses: Vec<PoseStampedMsg>,
}

#[derive(Debug, Deserialize)]
struct SemanticDatum {
    #[serde(default)]
    id: String,
    location: RosPoint,
}

#[derive(Debug, Deserialize)]
struct SemanticDataMsg {
    #[serde(default)]
    points: Vec<SemanticDatum>,
}

#[derive(Debug, Deserialize)]
struct DoubleParameter {
    name: String,
    value: f64,
}

#[derive(Debug, Deserialize)]
struct ConfigMsg {
    #[serde(default)]
    doubles: Vec<DoubleParameter>,
}

fn decode<T: for<'de> Deserialize<'de>>(msg: &Value, what: &str) -> Result<T, NavError> {
    T::deserialize(msg).map_err(|e| NavError::Parsing(format!("{what}: {e}")))
}

/// `pedsim_msgs/SemanticData` → obstacle batch stamped on receipt.
pub fn parse_semantic_data(msg: &Value) -> Result<ObstacleBatch, NavError> {
    let data: SemanticDataMsg = decode(msg, SEMANTIC_DATA_TYPE)?;
    Ok(ObstacleBatch::now(
        data.points
            .into_iter()
            .map(|p| LabeledPoint {
                id: p.id,
                location: p.location.into(),
            })
            .collect(),
    ))
}

pub fn parse_pose_stamped(msg: &Value) -> Result<Waypoint, NavError> {
    let stamped: PoseStampedMsg = decode(msg, POSE_STAMPED_TYPE)?;
    Ok(Waypoint::new(stamped.pose.into(), stamped.header.frame_id))
}

/// `nav_msgs/Path` → waypoints.  A pose without its own frame inherits the
/// path header's frame.
pub fn parse_path(msg: &Value) -> Result<Vec<Waypoint>, NavError> {
    let path: PathMsg = decode(msg, PATH_TYPE)?;
    let frame = path.header.frame_id;
    Ok(path
        .poses
        .into_iter()
        .map(|p| {
            let frame_id = if p.header.frame_id.is_empty() {
                frame.clone()
            } else {
                p.header.frame_id
            };
            Waypoint::new(p.pose.into(), frame_id)
        })
        .collect())
}

/// `dynamic_reconfigure/Config` → `(name, value)` pairs of its doubles.
pub fn parse_config_doubles(msg: &Value) -> Result<Vec<(String, f64)>, NavError> {
    let config: ConfigMsg = decode(msg, CONFIG_TYPE)?;
    Ok(config
        .doubles
        .into_iter()
        .map(|d| (d.name, d.value))
        .collect())
}

fn pose_value(pose: &Pose) -> Value {
    let [x, y, z, w] = pose.orientation();
    json!({
        "position": { "x": pose.position.x, "y": pose.position.y, "z": pose.position.z },
        "orientation": { "x": x, "y": y, "z": z, "w": w }
    })
}

/// Waypoints → `nav_msgs/Path`.  The header frame is taken from the first
/// waypoint.
pub fn path_message(path: &[Waypoint]) -> Value {
    let frame = path.first().map(|w| w.frame_id.as_str()).unwrap_or_default();
    let poses: Vec<Value> = path
        .iter()
        .map(|w| {
            json!({
                "header": { "frame_id": w.frame_id },
                "pose": pose_value(&w.pose)
            })
        })
        .collect();
    json!({ "header": { "frame_id": frame }, "poses": poses })
}
