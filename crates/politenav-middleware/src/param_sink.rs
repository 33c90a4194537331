//! [`RosbridgeParameterSink`] – pushes controller parameters as
//! `dynamic_reconfigure` service calls over rosbridge.
//!
//! `set` only enqueues the frame on the bridge's outbound channel and returns
//! immediately.  The service response, if any, arrives later on the socket
//! and is logged by the bridge.

use std::sync::atomic::{AtomicU64, Ordering};

use politenav_kernel::ParameterSink;
use politenav_types::NavError;
use tokio::sync::mpsc::UnboundedSender;

use crate::rosbridge;

/// Prefix of the rosbridge call ids this sink generates.
pub const CALL_ID_PREFIX: &str = "politenav_set_";

pub struct RosbridgeParameterSink {
    service: String,
    outbound: UnboundedSender<String>,
    next_id: AtomicU64,
}

impl RosbridgeParameterSink {
    /// `service` is the controller's reconfigure service, e.g.
    /// `/robot/move_base_flex/TebLocalPlannerROS/set_parameters`.
    pub fn new(service: impl Into<String>, outbound: UnboundedSender<String>) -> Self {
        Self {
            service: service.into(),
            outbound,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }
}

impl ParameterSink for RosbridgeParameterSink {
    fn set(&self, name: &str, value: f64) -> Result<(), NavError> {
        let id = format!(
            "{CALL_ID_PREFIX}{}",
            self.next_id.fetch_add(1, Ordering::Relaxed)
        );
        let frame = rosbridge::set_double_frame(&id, &self.service, name, value);
        self.outbound
            .send(frame)
            .map_err(|_| NavError::ParameterPush {
                name: name.to_string(),
                details: "rosbridge connection is closed".to_string(),
            })
    }
}
