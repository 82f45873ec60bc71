mod bvh;
mod kdtree;
mod list;
mod params;
mod sah;

pub use bvh::*;
pub use kdtree::*;
pub use list::*;
pub use params::*;
pub use sah::*;

use crate::core::{bbox::Bbox, intersection::Intersection, ray::Ray, stats::AccelStats};

/// Capacity of the explicit traversal stacks. Builders keep tree depth below it.
pub const TRAVERSAL_STACK_SIZE: usize = 64;

/// Indexed collection of primitives an acceleration structure is built over.
pub trait PrimitiveSet: Send + Sync {
    fn prim_count(&self) -> usize;

    fn prim_bbox(&self, index: usize) -> Bbox;

    /// Succeeds only for hits inside `[ray.t_min, ray.t_max]`, and then fills `inter`.
    fn intersect_prim<'a>(&'a self, index: usize, ray: &Ray, inter: &mut Intersection<'a>) -> bool;

    /// Any hit inside the ray interval that is accepted by the occlusion policy.
    fn intersect_prim_any(&self, index: usize, ray: &Ray) -> bool;
}

/// One acceleration strategy, chosen when the structure is built.
pub enum Accel {
    Bvh(BvhAccel),
    KdTree(KdTreeAccel),
    List(ListAccel),
}

impl Accel {
    pub fn build<P: PrimitiveSet>(prims: &P, params: &AccelParams) -> Self {
        match params {
            AccelParams::Bvh(params) => Accel::Bvh(BvhAccel::build(prims, params)),
            AccelParams::KdTree(params) => Accel::KdTree(KdTreeAccel::build(prims, params)),
            AccelParams::List => Accel::List(ListAccel::build(prims)),
        }
    }

    /// Nearest hit, shrinking `ray.t_max` to each accepted hit.
    pub fn intersect<'a, P: PrimitiveSet>(
        &self,
        prims: &'a P,
        ray: &mut Ray,
        inter: &mut Intersection<'a>,
    ) -> bool {
        match self {
            Accel::Bvh(accel) => accel.intersect(prims, ray, inter),
            Accel::KdTree(accel) => accel.intersect(prims, ray, inter),
            Accel::List(accel) => accel.intersect(prims, ray, inter),
        }
    }

    pub fn intersect_any<P: PrimitiveSet>(&self, prims: &P, ray: &Ray) -> bool {
        match self {
            Accel::Bvh(accel) => accel.intersect_any(prims, ray),
            Accel::KdTree(accel) => accel.intersect_any(prims, ray),
            Accel::List(accel) => accel.intersect_any(prims, ray),
        }
    }

    pub fn bbox(&self) -> Bbox {
        match self {
            Accel::Bvh(accel) => accel.bbox(),
            Accel::KdTree(accel) => accel.bbox(),
            Accel::List(accel) => accel.bbox(),
        }
    }

    pub fn stats(&self) -> AccelStats {
        match self {
            Accel::Bvh(accel) => accel.stats(),
            Accel::KdTree(accel) => accel.stats(),
            Accel::List(accel) => accel.stats(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Accel::Bvh(_) => "bvh",
            Accel::KdTree(_) => "kdtree",
            Accel::List(_) => "list",
        }
    }
}
