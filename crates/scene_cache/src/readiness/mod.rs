//! Camera binding and readiness
//!
//! Each split-screen [`Camera`] is bound to at most one scene at a time.
//! The [`CameraSceneTracker`] remembers the binding and the tick it last
//! changed; the [`ReadinessGate`] combines that with the minimum loading
//! screen policy to decide whether the camera may show its scene yet.

pub mod assigner;
pub mod camera;
pub mod gate;
pub mod tracker;

pub use assigner::{AssignmentReport, CameraSceneAssigner};
pub use camera::{Camera, CameraError, CameraRig, MAX_SPLIT};
pub use gate::ReadinessGate;
pub use tracker::{CameraSceneRecord, CameraSceneTracker};
