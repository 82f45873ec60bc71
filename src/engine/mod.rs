mod builder;
mod double_sided;
mod group;
mod leaf;
mod mesh;
pub mod policy;
mod segment;
mod sphere;

pub use builder::*;
pub use double_sided::*;
pub use group::*;
pub use leaf::*;
pub use mesh::*;
pub use segment::*;
pub use sphere::*;

use crate::core::{
    bbox::Bbox, intersection::Intersection, ray::Ray, stats::EngineStats, transform::TimeInterval,
};

/// Capabilities shared by leaf and composite engines.
#[enum_dispatch::enum_dispatch(Engine)]
pub trait EngineT: Send + Sync {
    /// Times at which the engine's transforms are defined.
    fn time_interval(&self) -> TimeInterval;

    /// Nearest hit inside `[ray.t_min, ray.t_max]`. On success `ray.t_max`
    /// is shrunk to the hit and `inter` describes it in world space.
    fn intersect<'a>(&'a self, ray: &mut Ray, inter: &mut Intersection<'a>) -> bool;

    /// Whether anything inside `[ray.t_min, ray.t_max]` blocks the ray.
    fn intersect_any(&self, ray: &Ray) -> bool;

    fn stats(&self) -> EngineStats;

    fn bbox(&self) -> Bbox;

    /// Mean world-space primitive area.
    fn average_area(&self) -> f32;

    /// True if some hit may be rejected by its material in any-hit queries.
    fn is_alpha_tested(&self) -> bool;
}

#[enum_dispatch::enum_dispatch]
pub enum Engine {
    MeshEngine,
    SphereEngine,
    SegmentEngine,
    GroupEngine,
    DoubleSidedEngine,
}

impl Engine {
    pub fn kind(&self) -> &'static str {
        match self {
            Engine::MeshEngine(_) => "mesh",
            Engine::SphereEngine(_) => "sphere",
            Engine::SegmentEngine(_) => "segment",
            Engine::GroupEngine(_) => "group",
            Engine::DoubleSidedEngine(_) => "double-sided",
        }
    }
}
