//! Ray-scene intersection core: acceleration structures over triangle
//! meshes, spheres and curve segments, composed into instanced engines.

pub mod accel;
pub mod batch;
pub mod core;
pub mod engine;

pub use crate::engine::{build_engine, Engine, EngineT};
