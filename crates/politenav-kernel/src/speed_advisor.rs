//! [`SpeedAdvisor`] – maps a proximity classification to a max-speed advisory
//! and pushes it to the downstream controller through a [`ParameterSink`].
//!
//! Pushes are best-effort: a failed push is logged and otherwise ignored.  It
//! never changes the safety state or the returned path, and it is never
//! retried.

use politenav_types::NavError;
use tracing::{debug, warn};

use crate::policy::SpeedPolicy;
use crate::proximity::Classification;

/// Name of the controller parameter that carries the advised max speed.
pub const MAX_SPEED_PARAM: &str = "max_vel_x";

/// Write access to the downstream controller's tunable parameters.
///
/// Implementations must not block the caller for long: the engine pushes
/// from inside the planning request.  There is no transactional guarantee;
/// concurrent writers race and the last write wins at the remote end.
pub trait ParameterSink: Send + Sync {
    /// Set parameter `name` to `value`.
    ///
    /// # Errors
    ///
    /// [`NavError::ParameterPush`] when the update could not be handed off.
    fn set(&self, name: &str, value: f64) -> Result<(), NavError>;
}

/// Chooses and publishes the advised max speed.
#[derive(Debug, Clone, Copy)]
pub struct SpeedAdvisor {
    policy: SpeedPolicy,
}

impl SpeedAdvisor {
    pub fn new(policy: SpeedPolicy) -> Self {
        Self { policy }
    }

    /// Reduced speed for either radius class, nominal speed when clear.
    pub fn target_speed(&self, classification: Classification) -> f64 {
        if classification.is_cautious() {
            self.policy.reduced_max_speed
        } else {
            self.policy.nominal_max_speed
        }
    }

    /// Push the speed for `classification` through `sink`.  Failures are
    /// logged and swallowed.
    pub fn advise(&self, sink: &dyn ParameterSink, classification: Classification) {
        push_speed(sink, self.target_speed(classification));
    }
}

/// Fire-and-forget push of `speed` under [`MAX_SPEED_PARAM`].
fn push_speed(sink: &dyn ParameterSink, speed: f64) {
    match sink.set(MAX_SPEED_PARAM, speed) {
        Ok(()) => debug!(param = MAX_SPEED_PARAM, value = speed, "speed advisory pushed"),
        Err(e) => warn!(param = MAX_SPEED_PARAM, value = speed, error = %e, "speed advisory push failed"),
    }
}
