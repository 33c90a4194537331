//! [`InterceptorBridge`] – connects a [`PlanOverrideEngine`] to a
//! `rosbridge_server`.
//!
//! Inbound traffic is routed by topic:
//!
//! | topic (default)                        | action                          |
//! |----------------------------------------|---------------------------------|
//! | `/pedsim_agents/semantic/pedestrian`   | replace the obstacle snapshot   |
//! | `/move_base_flex/global_plan`          | replace the base plan           |
//! | `/move_base_flex/robot_pose`           | plan, publish on `output_path`  |
//! | `/politenav/reconfigure`               | swap interceptor parameters     |
//!
//! Planning triggered by pose messages is rate limited.  A message that
//! fails to parse is logged and dropped; the bridge keeps running.

use std::num::NonZeroU32;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use politenav_kernel::PlanOverrideEngine;
use politenav_types::NavError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::param_sink::CALL_ID_PREFIX;
use crate::rosbridge::{self, InboundFrame};

/// Topic names the bridge subscribes and publishes to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeTopics {
    pub obstacles: String,
    pub global_plan: String,
    pub robot_pose: String,
    pub reconfigure: String,
    pub output_path: String,
}

impl Default for BridgeTopics {
    fn default() -> Self {
        Self {
            obstacles: "/pedsim_agents/semantic/pedestrian".to_string(),
            global_plan: "/move_base_flex/global_plan".to_string(),
            robot_pose: "/move_base_flex/robot_pose".to_string(),
            reconfigure: "/politenav/reconfigure".to_string(),
            output_path: "/politenav/path".to_string(),
        }
    }
}

pub struct InterceptorBridge {
    engine: Arc<PlanOverrideEngine>,
    topics: BridgeTopics,
    outbound: mpsc::UnboundedSender<String>,
    limiter: DefaultDirectRateLimiter,
}

impl InterceptorBridge {
    /// `outbound` is the same channel the engine's parameter sink writes to;
    /// [`run`](Self::run) drains it onto the socket.
    pub fn new(
        engine: Arc<PlanOverrideEngine>,
        topics: BridgeTopics,
        outbound: mpsc::UnboundedSender<String>,
        plan_rate_hz: NonZeroU32,
    ) -> Self {
        Self {
            engine,
            topics,
            outbound,
            limiter: RateLimiter::direct(Quota::per_second(plan_rate_hz)),
        }
    }

    pub fn topics(&self) -> &BridgeTopics {
        &self.topics
    }

    /// Subscriptions and advertisements sent right after connecting.
    pub fn setup_frames(&self) -> Vec<String> {
        let t = &self.topics;
        vec![
            rosbridge::subscribe_frame(&t.obstacles, rosbridge::SEMANTIC_DATA_TYPE),
            rosbridge::subscribe_frame(&t.global_plan, rosbridge::PATH_TYPE),
            rosbridge::subscribe_frame(&t.robot_pose, rosbridge::POSE_STAMPED_TYPE),
            rosbridge::subscribe_frame(&t.reconfigure, rosbridge::CONFIG_TYPE),
            rosbridge::advertise_frame(&t.output_path, rosbridge::PATH_TYPE),
        ]
    }

    /// Handle one inbound text frame.  Errors are logged, never returned.
    pub fn handle_incoming(&self, text: &str) {
        if let Err(e) = self.dispatch(text) {
            warn!(error = %e, "dropping rosbridge message");
        }
    }

    fn dispatch(&self, text: &str) -> Result<(), NavError> {
        match rosbridge::parse_frame(text)? {
            InboundFrame::Publish { topic, msg } => self.on_publish(&topic, &msg),
            InboundFrame::ServiceResponse {
                id,
                service,
                result,
                ..
            } => {
                let ours = id.as_deref().is_some_and(|id| id.starts_with(CALL_ID_PREFIX));
                if ours && !result {
                    warn!(service = %service, id = ?id, "controller rejected parameter update");
                } else {
                    debug!(service = %service, id = ?id, result, "service response");
                }
                Ok(())
            }
            InboundFrame::Other => Ok(()),
        }
    }

    fn on_publish(&self, topic: &str, msg: &Value) -> Result<(), NavError> {
        let t = &self.topics;
        if topic == t.obstacles {
            self.engine
                .update_obstacles(rosbridge::parse_semantic_data(msg)?);
        } else if topic == t.global_plan {
            self.engine.set_plan(rosbridge::parse_path(msg)?);
        } else if topic == t.robot_pose {
            self.on_pose(msg)?;
        } else if topic == t.reconfigure {
            self.on_reconfigure(msg)?;
        } else {
            debug!(topic, "ignoring publish on unknown topic");
        }
        Ok(())
    }

    fn on_pose(&self, msg: &Value) -> Result<(), NavError> {
        if self.limiter.check().is_err() {
            debug!("pose update skipped by plan rate limit");
            return Ok(());
        }
        let start = rosbridge::parse_pose_stamped(msg)?;
        let outcome = self.engine.compute_path(&start, &start);
        let frame = rosbridge::publish_frame(
            &self.topics.output_path,
            rosbridge::path_message(&outcome.path),
        );
        self.outbound
            .send(frame)
            .map_err(|_| NavError::Transport("outbound channel closed".to_string()))
    }

    fn on_reconfigure(&self, msg: &Value) -> Result<(), NavError> {
        let mut params = self.engine.params();
        for (name, value) in rosbridge::parse_config_doubles(msg)? {
            if !params.apply(&name, value) {
                debug!(name = %name, "ignoring unknown interceptor parameter");
            }
        }
        self.engine.reconfigure(params)
    }

    /// Connect to `url` and serve until `shutdown` flips or the connection
    /// drops.
    ///
    /// # Errors
    ///
    /// [`NavError::Transport`] when the connection cannot be established or
    /// fails while running.
    pub async fn run(
        &self,
        url: &str,
        mut outbound_rx: mpsc::UnboundedReceiver<String>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), NavError> {
        let (ws_stream, _) = connect_async(url)
            .await
            .map_err(|e| NavError::Transport(format!("connect to {url}: {e}")))?;
        info!(url, "connected to rosbridge");

        let (mut ws_tx, mut ws_rx) = ws_stream.split();
        for frame in self.setup_frames() {
            ws_tx
                .send(Message::Text(frame.into()))
                .await
                .map_err(|e| NavError::Transport(e.to_string()))?;
        }

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    info!("shutting down rosbridge connection");
                    let _ = ws_tx.send(Message::Close(None)).await;
                    return Ok(());
                }
                frame = outbound_rx.recv() => {
                    let Some(frame) = frame else { return Ok(()) };
                    ws_tx
                        .send(Message::Text(frame.into()))
                        .await
                        .map_err(|e| NavError::Transport(e.to_string()))?;
                }
                msg = ws_rx.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => self.handle_incoming(text.as_str()),
                        Some(Ok(Message::Close(_))) | None => {
                            return Err(NavError::Transport("rosbridge closed the connection".to_string()));
                        }
                        Some(Err(e)) => return Err(NavError::Transport(e.to_string())),
                        _ => {}
                    }
                }
            }
        }
    }
}
