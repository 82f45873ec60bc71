use std::{f32::consts::PI, sync::Arc};

use crate::{
    accel::{AccelParams, PrimitiveSet},
    core::{
        bbox::Bbox,
        geometry::SegmentData,
        intersection::{DifferentialGeometry, Intersection},
        material::MaterialRef,
        ray::Ray,
        routine::{self, CapsuleHit},
        transform::Transform,
    },
};

use super::{
    policy::{SegmentPolicies, SegmentSample},
    LeafEngine, LeafPrims,
};

/// Curve pieces (hair, fur) intersected as open cylinders.
pub type SegmentEngine = LeafEngine<SegmentPrims>;

pub struct SegmentPrims {
    segments: Arc<SegmentData>,
    material: MaterialRef,
    policies: SegmentPolicies,
    alpha_tested: bool,
}

impl SegmentPrims {
    pub fn new(segments: Arc<SegmentData>, material: MaterialRef) -> Self {
        let policies = SegmentPolicies::select(&segments);
        let alpha_tested = material.is_alpha_tested();
        Self {
            segments,
            material,
            policies,
            alpha_tested,
        }
    }

    fn radius(&self, index: usize) -> f32 {
        (self.policies.radius)(&self.segments, self.segments.segment(index))
    }

    fn hit(&self, index: usize, ray: &Ray) -> Option<CapsuleHit> {
        let [p0, p1] = self.segments.segment_positions(index);
        routine::ray_capsule(ray, p0, p1, self.radius(index))
    }

    fn surface(&self, index: usize, ray: &Ray, hit: &CapsuleHit) -> DifferentialGeometry {
        let [p0, p1] = self.segments.segment_positions(index);
        let seg = SegmentSample {
            indices: self.segments.segment(index),
            s: hit.height / hit.length,
            axis: (p1 - p0) / hit.length,
        };
        DifferentialGeometry {
            position: ray.point_at(hit.t),
            normal: hit.normal,
            shading_normal: hit.normal,
            tangent: (self.policies.tangent)(&self.segments, &seg),
            uv: (self.policies.uv)(&self.segments, &seg),
            st: glam::Vec2::new(seg.s, 0.0),
        }
    }
}

impl PrimitiveSet for SegmentPrims {
    fn prim_count(&self) -> usize {
        self.segments.segment_count()
    }

    fn prim_bbox(&self, index: usize) -> Bbox {
        let r = glam::Vec3A::splat(self.radius(index));
        let [p0, p1] = self.segments.segment_positions(index);
        Bbox::new(p0.min(p1) - r, p0.max(p1) + r)
    }

    fn intersect_prim<'a>(&'a self, index: usize, ray: &Ray, inter: &mut Intersection<'a>) -> bool {
        if let Some(hit) = self.hit(index, ray) {
            inter.t = hit.t;
            inter.ray_epsilon = hit.epsilon;
            inter.dg = self.surface(index, ray, &hit);
            inter.material = Some(self.material.as_ref());
            true
        } else {
            false
        }
    }

    fn intersect_prim_any(&self, index: usize, ray: &Ray) -> bool {
        match self.hit(index, ray) {
            Some(hit) => !self.alpha_tested || self.material.occludes(&self.surface(index, ray, &hit)),
            None => false,
        }
    }
}

impl LeafPrims for SegmentPrims {
    const KIND: &'static str = "segment";

    /// Lateral area of the cylinder.
    fn prim_area(&self, index: usize) -> f32 {
        let [p0, p1] = self.segments.segment_positions(index);
        2.0 * PI * self.radius(index) * (p1 - p0).length()
    }

    fn is_alpha_tested(&self) -> bool {
        self.alpha_tested
    }
}

impl SegmentEngine {
    pub fn from_segments(
        segments: Arc<SegmentData>,
        material: MaterialRef,
        transform: Option<Transform>,
        params: &AccelParams,
        times: &[f32],
    ) -> Self {
        Self::new(SegmentPrims::new(segments, material), transform, params, times)
    }
}
