use crate::core::material::Material;

/// Local surface frame at a hit point.
#[derive(Copy, Clone, Debug)]
pub struct DifferentialGeometry {
    pub position: glam::Vec3A,
    /// Geometric normal of the face or surface.
    pub normal: glam::Vec3A,
    /// Interpolated normal, equal to `normal` when no per-vertex normals exist.
    pub shading_normal: glam::Vec3A,
    pub tangent: glam::Vec3A,
    /// Surface parameterization (texture coordinates).
    pub uv: glam::Vec2,
    /// Primitive-local parameterization (barycentrics, segment position, ...).
    pub st: glam::Vec2,
}

pub struct Intersection<'a> {
    pub t: f32,
    pub dg: DifferentialGeometry,
    pub material: Option<&'a dyn Material>,
    /// Spawned rays should start beyond this distance to avoid self-intersection.
    pub ray_epsilon: f32,
}

impl Default for DifferentialGeometry {
    fn default() -> Self {
        Self {
            position: glam::Vec3A::ZERO,
            normal: glam::Vec3A::Z,
            shading_normal: glam::Vec3A::Z,
            tangent: glam::Vec3A::X,
            uv: glam::Vec2::ZERO,
            st: glam::Vec2::ZERO,
        }
    }
}

impl DifferentialGeometry {
    pub fn transformed_by(&self, trans: &glam::Affine3A, trans_it: &glam::Mat3A) -> Self {
        Self {
            position: trans.transform_point3a(self.position),
            normal: (*trans_it * self.normal).normalize(),
            shading_normal: (*trans_it * self.shading_normal).normalize(),
            tangent: trans.transform_vector3a(self.tangent),
            ..*self
        }
    }

    pub fn face_forward(&mut self, ray_direction: glam::Vec3A) {
        if self.normal.dot(ray_direction) > 0.0 {
            self.normal = -self.normal;
        }
        if self.shading_normal.dot(ray_direction) > 0.0 {
            self.shading_normal = -self.shading_normal;
        }
    }
}

impl Default for Intersection<'_> {
    fn default() -> Self {
        Self {
            t: f32::INFINITY,
            dg: DifferentialGeometry::default(),
            material: None,
            ray_epsilon: 0.0,
        }
    }
}

impl std::fmt::Debug for Intersection<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Intersection")
            .field("t", &self.t)
            .field("dg", &self.dg)
            .field("material", &self.material.map(|mat| mat.name()))
            .field("ray_epsilon", &self.ray_epsilon)
            .finish()
    }
}
