use std::sync::Arc;

use crate::{
    accel::{AccelParams, PrimitiveSet},
    core::{
        bbox::Bbox,
        geometry::TriangleMeshData,
        intersection::{DifferentialGeometry, Intersection},
        material::MaterialRef,
        ray::Ray,
        routine::{self, TriangleHit},
        transform::Transform,
    },
};

use super::{
    policy::{TrianglePolicies, TriangleSample},
    LeafEngine, LeafPrims,
};

pub type MeshEngine = LeafEngine<MeshPrims>;

pub struct MeshPrims {
    mesh: Arc<TriangleMeshData>,
    material: MaterialRef,
    policies: TrianglePolicies,
    alpha_tested: bool,
}

impl MeshPrims {
    pub fn new(mesh: Arc<TriangleMeshData>, material: MaterialRef) -> Self {
        let policies = TrianglePolicies::select(&mesh);
        let alpha_tested = material.is_alpha_tested();
        Self {
            mesh,
            material,
            policies,
            alpha_tested,
        }
    }

    pub fn mesh(&self) -> &Arc<TriangleMeshData> {
        &self.mesh
    }

    fn surface(&self, index: usize, hit: &TriangleHit) -> DifferentialGeometry {
        let positions = self.mesh.triangle_positions(index);
        let [p0, p1, p2] = positions;
        let b0 = 1.0 - hit.b1 - hit.b2;
        let tri = TriangleSample {
            indices: self.mesh.triangle(index),
            positions,
            bary: [b0, hit.b1, hit.b2],
            face_normal: (p1 - p0).cross(p2 - p0).normalize(),
        };
        DifferentialGeometry {
            position: p0 * b0 + p1 * hit.b1 + p2 * hit.b2,
            normal: tri.face_normal,
            shading_normal: (self.policies.normal)(&self.mesh, &tri),
            tangent: (self.policies.tangent)(&self.mesh, &tri),
            uv: (self.policies.uv)(&self.mesh, &tri),
            st: glam::Vec2::new(hit.b1, hit.b2),
        }
    }
}

impl PrimitiveSet for MeshPrims {
    fn prim_count(&self) -> usize {
        self.mesh.triangle_count()
    }

    fn prim_bbox(&self, index: usize) -> Bbox {
        self.mesh.triangle_bbox(index)
    }

    fn intersect_prim<'a>(&'a self, index: usize, ray: &Ray, inter: &mut Intersection<'a>) -> bool {
        let [p0, p1, p2] = self.mesh.triangle_positions(index);
        if let Some(hit) = routine::ray_triangle(ray, p0, p1, p2) {
            inter.t = hit.t;
            inter.ray_epsilon = hit.epsilon;
            inter.dg = self.surface(index, &hit);
            inter.material = Some(self.material.as_ref());
            true
        } else {
            false
        }
    }

    fn intersect_prim_any(&self, index: usize, ray: &Ray) -> bool {
        let [p0, p1, p2] = self.mesh.triangle_positions(index);
        match routine::ray_triangle(ray, p0, p1, p2) {
            Some(hit) => !self.alpha_tested || self.material.occludes(&self.surface(index, &hit)),
            None => false,
        }
    }
}

impl LeafPrims for MeshPrims {
    const KIND: &'static str = "mesh";

    fn prim_area(&self, index: usize) -> f32 {
        self.mesh.triangle_area(index)
    }

    fn is_alpha_tested(&self) -> bool {
        self.alpha_tested
    }
}

impl MeshEngine {
    pub fn from_mesh(
        mesh: Arc<TriangleMeshData>,
        material: MaterialRef,
        transform: Option<Transform>,
        params: &AccelParams,
        times: &[f32],
    ) -> Self {
        Self::new(MeshPrims::new(mesh, material), transform, params, times)
    }
}
