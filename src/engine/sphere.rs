use std::{f32::consts::PI, sync::Arc};

use crate::{
    accel::{AccelParams, PrimitiveSet},
    core::{
        bbox::Bbox,
        geometry::SphereData,
        intersection::{DifferentialGeometry, Intersection},
        material::MaterialRef,
        ray::Ray,
        routine,
        transform::Transform,
    },
};

use super::{policy::SpherePolicies, LeafEngine, LeafPrims};

pub type SphereEngine = LeafEngine<SpherePrims>;

pub struct SpherePrims {
    spheres: Arc<SphereData>,
    material: MaterialRef,
    policies: SpherePolicies,
    alpha_tested: bool,
}

impl SpherePrims {
    pub fn new(spheres: Arc<SphereData>, material: MaterialRef) -> Self {
        let policies = SpherePolicies::select(&spheres);
        let alpha_tested = material.is_alpha_tested();
        Self {
            spheres,
            material,
            policies,
            alpha_tested,
        }
    }

    fn radius(&self, index: usize) -> f32 {
        (self.policies.radius)(&self.spheres, index)
    }

    fn surface(&self, index: usize, ray: &Ray, t: f32) -> DifferentialGeometry {
        let center = self.spheres.center(index);
        let position = ray.point_at(t);
        let normal = (position - center) / self.radius(index);

        let mut phi = normal.y.atan2(normal.x);
        if phi < 0.0 {
            phi += 2.0 * PI;
        }
        let theta = normal.z.clamp(-1.0, 1.0).acos();
        let uv = glam::Vec2::new(phi / (2.0 * PI), theta / PI);

        let tangent = glam::Vec3A::new(-normal.y, normal.x, 0.0);
        let tangent = if tangent.length_squared() > 0.0 {
            tangent.normalize()
        } else {
            glam::Vec3A::X
        };

        DifferentialGeometry {
            position,
            normal,
            shading_normal: normal,
            tangent,
            uv,
            st: uv,
        }
    }
}

impl PrimitiveSet for SpherePrims {
    fn prim_count(&self) -> usize {
        self.spheres.sphere_count()
    }

    fn prim_bbox(&self, index: usize) -> Bbox {
        let center = self.spheres.center(index);
        let r = glam::Vec3A::splat(self.radius(index));
        Bbox::new(center - r, center + r)
    }

    fn intersect_prim<'a>(&'a self, index: usize, ray: &Ray, inter: &mut Intersection<'a>) -> bool {
        let hit = routine::ray_sphere(ray, self.spheres.center(index), self.radius(index));
        if let Some(hit) = hit {
            inter.t = hit.t;
            inter.ray_epsilon = hit.epsilon;
            inter.dg = self.surface(index, ray, hit.t);
            inter.material = Some(self.material.as_ref());
            true
        } else {
            false
        }
    }

    fn intersect_prim_any(&self, index: usize, ray: &Ray) -> bool {
        match routine::ray_sphere(ray, self.spheres.center(index), self.radius(index)) {
            Some(hit) => {
                !self.alpha_tested || self.material.occludes(&self.surface(index, ray, hit.t))
            }
            None => false,
        }
    }
}

impl LeafPrims for SpherePrims {
    const KIND: &'static str = "sphere";

    fn prim_area(&self, index: usize) -> f32 {
        let r = self.radius(index);
        4.0 * PI * r * r
    }

    fn is_alpha_tested(&self) -> bool {
        self.alpha_tested
    }
}

impl SphereEngine {
    pub fn from_spheres(
        spheres: Arc<SphereData>,
        material: MaterialRef,
        transform: Option<Transform>,
        params: &AccelParams,
        times: &[f32],
    ) -> Self {
        Self::new(SpherePrims::new(spheres, material), transform, params, times)
    }
}
