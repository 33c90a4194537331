//! `politenav-middleware` – rosbridge transport
//!
//! Moves obstacle batches, plans, poses and parameter updates between a
//! `rosbridge_server` WebSocket and the interceptor engine without caring
//! about their meaning.
//!
//! # Modules
//!
//! - [`rosbridge`] – frame builders and ROS message codecs.
//! - [`param_sink`] – [`RosbridgeParameterSink`][param_sink::RosbridgeParameterSink]:
//!   fire-and-forget `dynamic_reconfigure` pushes to the downstream
//!   controller.
//! - [`bridge`] – [`InterceptorBridge`][bridge::InterceptorBridge]: topic
//!   routing and the connection loop.

pub mod bridge;
pub mod param_sink;
pub mod rosbridge;

pub use bridge::{BridgeTopics, InterceptorBridge};
pub use param_sink::RosbridgeParameterSink;
