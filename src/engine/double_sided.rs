use std::sync::Arc;

use crate::core::{
    bbox::Bbox, intersection::Intersection, ray::Ray, stats::EngineStats, transform::TimeInterval,
};

use super::{Engine, EngineT};

/// Forwards to another engine and turns the normals of every hit towards
/// the incoming ray.
pub struct DoubleSidedEngine {
    inner: Arc<Engine>,
}

impl DoubleSidedEngine {
    pub fn new(inner: Arc<Engine>) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &Arc<Engine> {
        &self.inner
    }
}

impl EngineT for DoubleSidedEngine {
    fn time_interval(&self) -> TimeInterval {
        self.inner.time_interval()
    }

    fn intersect<'a>(&'a self, ray: &mut Ray, inter: &mut Intersection<'a>) -> bool {
        if self.inner.intersect(ray, inter) {
            inter.dg.face_forward(ray.direction);
            true
        } else {
            false
        }
    }

    fn intersect_any(&self, ray: &Ray) -> bool {
        self.inner.intersect_any(ray)
    }

    fn stats(&self) -> EngineStats {
        self.inner.stats()
    }

    fn bbox(&self) -> Bbox {
        self.inner.bbox()
    }

    fn average_area(&self) -> f32 {
        self.inner.average_area()
    }

    fn is_alpha_tested(&self) -> bool {
        self.inner.is_alpha_tested()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        accel::AccelParams,
        core::{geometry::TriangleMeshData, material::OpaqueMaterial},
        engine::MeshEngine,
    };

    #[test]
    fn normals_face_the_ray() {
        let mesh = TriangleMeshData::new(
            vec![glam::Vec3A::ZERO, glam::Vec3A::X, glam::Vec3A::Y],
            vec![0, 1, 2],
        );
        let inner: Arc<Engine> = Arc::new(
            MeshEngine::from_mesh(
                Arc::new(mesh),
                Arc::new(OpaqueMaterial::new("paper")),
                None,
                &AccelParams::default(),
                &[0.0],
            )
            .into(),
        );
        let engine = DoubleSidedEngine::new(inner.clone());

        for dir in [-1.0_f32, 1.0] {
            let origin = glam::Vec3A::new(0.25, 0.25, -dir);
            let direction = glam::Vec3A::new(0.0, 0.0, dir);

            let mut ray = Ray::new(origin, direction);
            let mut inter = Intersection::default();
            assert!(engine.intersect(&mut ray, &mut inter));
            assert!(inter.dg.normal.dot(direction) < 0.0);
            assert!(inter.dg.shading_normal.dot(direction) < 0.0);

            let mut ray = Ray::new(origin, direction);
            let mut plain = Intersection::default();
            assert!(inner.intersect(&mut ray, &mut plain));
            assert_eq!(plain.dg.normal, glam::Vec3A::Z);
        }
        assert_eq!(engine.stats(), inner.stats());
    }
}
