use std::sync::Arc;

use crate::{
    accel::{Accel, AccelParams, PrimitiveSet},
    core::{
        bbox::Bbox,
        intersection::Intersection,
        material::{Material, MaterialRef},
        ray::Ray,
        stats::EngineStats,
        transform::{TimeInterval, Transform, TransformT},
    },
};

use super::{Engine, EngineT};

/// Distance an occlusion walk advances past a rejected hit at `t = 0`.
const MIN_WALK_STEP: f32 = 1e-6;

/// One placement of a shared engine.
#[derive(Clone)]
pub struct Instance {
    engine: Arc<Engine>,
    transform: Option<Transform>,
    material: Option<MaterialRef>,
}

impl Instance {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self {
            engine,
            transform: None,
            material: None,
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Hits through this instance report `material` instead of the engine's own.
    pub fn with_material(mut self, material: MaterialRef) -> Self {
        self.material = Some(material);
        self
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    fn world_bbox(&self, times: &[f32]) -> Bbox {
        match &self.transform {
            Some(transform) => transform.world_bbox(self.engine.bbox(), times),
            None => self.engine.bbox(),
        }
    }
}

/// How an entry answers any-hit queries, settled when the group is built.
enum Occlusion {
    /// The engine's own any-hit query decides.
    Delegate,
    /// Walk the hits front to back until the override material accepts one.
    Walk,
}

struct Entry {
    instance: Instance,
    bbox: Bbox,
    occlusion: Occlusion,
}

struct Entries(Vec<Entry>);

impl Entry {
    fn walk_any(&self, engine: &Engine, material: &dyn Material, ray: &Ray) -> bool {
        let mut walk = *ray;
        loop {
            let mut inter = Intersection::default();
            if !engine.intersect(&mut walk, &mut inter) {
                return false;
            }
            if material.occludes(&inter.dg) {
                return true;
            }
            walk.t_min = inter.t + inter.ray_epsilon.max(MIN_WALK_STEP);
            walk.t_max = ray.t_max;
            if walk.t_min > walk.t_max {
                return false;
            }
        }
    }

    fn intersect_local_any(&self, ray: &Ray) -> bool {
        match (&self.occlusion, &self.instance.material) {
            (Occlusion::Walk, Some(material)) => {
                self.walk_any(&self.instance.engine, material.as_ref(), ray)
            }
            _ => self.instance.engine.intersect_any(ray),
        }
    }
}

impl PrimitiveSet for Entries {
    fn prim_count(&self) -> usize {
        self.0.len()
    }

    fn prim_bbox(&self, index: usize) -> Bbox {
        self.0[index].bbox
    }

    fn intersect_prim<'a>(&'a self, index: usize, ray: &Ray, inter: &mut Intersection<'a>) -> bool {
        let entry = &self.0[index];
        let hit = match &entry.instance.transform {
            None => {
                let mut ray = *ray;
                entry.instance.engine.intersect(&mut ray, inter)
            }
            Some(transform) => {
                let sample = transform.sample(ray.time);
                let mut local = sample.ray_to_local(ray);
                let hit = entry.instance.engine.intersect(&mut local, inter);
                if hit {
                    inter.dg = sample.dg_to_world(&inter.dg);
                }
                hit
            }
        };
        if hit {
            if let Some(material) = &entry.instance.material {
                inter.material = Some(material.as_ref());
            }
        }
        hit
    }

    fn intersect_prim_any(&self, index: usize, ray: &Ray) -> bool {
        let entry = &self.0[index];
        match &entry.instance.transform {
            None => entry.intersect_local_any(ray),
            Some(transform) => entry.intersect_local_any(&transform.sample(ray.time).ray_to_local(ray)),
        }
    }
}

/// Engines placed by instances, with an accelerator over their world boxes.
pub struct GroupEngine {
    entries: Entries,
    accel: Accel,
    interval: TimeInterval,
    stats: EngineStats,
    average_area: f32,
    alpha_tested: bool,
}

impl GroupEngine {
    pub fn new(instances: Vec<Instance>, params: &AccelParams, times: &[f32]) -> Self {
        let entries = instances
            .into_iter()
            .map(|instance| {
                let occlusion = match &instance.material {
                    Some(material)
                        if material.is_alpha_tested() || instance.engine.is_alpha_tested() =>
                    {
                        Occlusion::Walk
                    }
                    _ => Occlusion::Delegate,
                };
                Entry {
                    bbox: instance.world_bbox(times),
                    instance,
                    occlusion,
                }
            })
            .collect::<Vec<_>>();
        let entries = Entries(entries);
        let accel = Accel::build(&entries, params);

        let mut interval = TimeInterval::ALWAYS;
        let mut stats = EngineStats {
            engines: 1,
            primitives: 0,
            instances: entries.0.len(),
            accel: accel.stats(),
        };
        let mut area_sum = 0.0;
        let mut alpha_tested = false;
        for entry in &entries.0 {
            let engine = &entry.instance.engine;
            interval = interval.intersection(&engine.time_interval());
            if let Some(transform) = &entry.instance.transform {
                interval = interval.intersection(&transform.time_interval());
            }

            let engine_stats = engine.stats();
            let area_scale = entry.instance.transform.as_ref().map_or(1.0, |transform| {
                transform
                    .sample(times.first().copied().unwrap_or(0.0))
                    .area_scale()
            });
            area_sum += engine.average_area() * area_scale * engine_stats.primitives as f32;
            stats = stats.merge(engine_stats);

            alpha_tested |= match &entry.instance.material {
                Some(material) => material.is_alpha_tested(),
                None => engine.is_alpha_tested(),
            };
        }
        let average_area = if stats.primitives > 0 {
            area_sum / stats.primitives as f32
        } else {
            0.0
        };

        log::info!(
            "group engine: {} instances, {} ({})",
            entries.0.len(),
            accel.kind(),
            accel.stats()
        );

        Self {
            entries,
            accel,
            interval,
            stats,
            average_area,
            alpha_tested,
        }
    }

    pub fn instances(&self) -> impl Iterator<Item = &Instance> {
        self.entries.0.iter().map(|entry| &entry.instance)
    }
}

impl EngineT for GroupEngine {
    fn time_interval(&self) -> TimeInterval {
        self.interval
    }

    fn intersect<'a>(&'a self, ray: &mut Ray, inter: &mut Intersection<'a>) -> bool {
        self.accel.intersect(&self.entries, ray, inter)
    }

    fn intersect_any(&self, ray: &Ray) -> bool {
        self.accel.intersect_any(&self.entries, ray)
    }

    fn stats(&self) -> EngineStats {
        self.stats
    }

    fn bbox(&self) -> Bbox {
        self.accel.bbox()
    }

    fn average_area(&self) -> f32 {
        self.average_area
    }

    fn is_alpha_tested(&self) -> bool {
        self.alpha_tested
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        accel::{KdSplit, KdTreeParams},
        core::{
            geometry::{SphereData, TriangleMeshData},
            material::{AlphaMaskMaterial, OpaqueMaterial},
            transform::{MovingTransform, StaticTransform},
        },
        engine::{MeshEngine, SphereEngine},
    };

    fn sphere_engine() -> Arc<Engine> {
        Arc::new(
            SphereEngine::from_spheres(
                Arc::new(SphereData::new(vec![glam::Vec3A::ZERO], 1.0)),
                Arc::new(OpaqueMaterial::new("white")),
                None,
                &AccelParams::default(),
                &[0.0],
            )
            .into(),
        )
    }

    fn translated(x: f32) -> Transform {
        StaticTransform::new(glam::Affine3A::from_translation(glam::Vec3::new(x, 0.0, 0.0))).into()
    }

    #[test]
    fn instances_share_one_engine() {
        let shared = sphere_engine();
        let instances = (0..10)
            .map(|i| Instance::new(shared.clone()).with_transform(translated(3.0 * i as f32)))
            .collect::<Vec<_>>();
        for params in [
            AccelParams::default(),
            AccelParams::KdTree(KdTreeParams::with_split(KdSplit::EqualCount)),
            AccelParams::List,
        ] {
            let group = GroupEngine::new(instances.clone(), &params, &[0.0]);
            assert_eq!(group.bbox().p_max, glam::Vec3A::new(28.0, 1.0, 1.0));
            assert_eq!(group.stats().instances, 10);
            assert_eq!(group.stats().primitives, 10);
            assert_eq!(group.stats().engines, 11);

            let mut ray = Ray::new(glam::Vec3A::new(12.0, 0.0, -5.0), glam::Vec3A::Z);
            let mut inter = Intersection::default();
            assert!(group.intersect(&mut ray, &mut inter));
            assert_eq!(inter.t, 4.0);
            assert_eq!(inter.dg.position, glam::Vec3A::new(12.0, 0.0, -1.0));
            assert_eq!(ray.t_max, 4.0);

            let miss = Ray::new(glam::Vec3A::new(13.5, 0.0, -5.0), glam::Vec3A::Z);
            assert!(!group.intersect_any(&miss));
        }
        assert_eq!(Arc::strong_count(&shared), 11);
    }

    #[test]
    fn nearest_instance_wins_along_the_ray() {
        let shared = sphere_engine();
        let group = GroupEngine::new(
            (0..5)
                .map(|i| Instance::new(shared.clone()).with_transform(translated(3.0 * i as f32)))
                .collect(),
            &AccelParams::default(),
            &[0.0],
        );
        let mut ray = Ray::new(glam::Vec3A::new(20.0, 0.0, 0.0), -glam::Vec3A::X);
        let mut inter = Intersection::default();
        assert!(group.intersect(&mut ray, &mut inter));
        assert_eq!(inter.dg.position, glam::Vec3A::new(13.0, 0.0, 0.0));
        assert_eq!(inter.t, 7.0);
    }

    #[test]
    fn material_override_replaces_hit_material() {
        let shared = sphere_engine();
        let red: MaterialRef = Arc::new(OpaqueMaterial::new("red"));
        let group = GroupEngine::new(
            vec![
                Instance::new(shared.clone()),
                Instance::new(shared).with_transform(translated(5.0)).with_material(red),
            ],
            &AccelParams::default(),
            &[0.0],
        );
        let names = [0.0, 5.0]
            .iter()
            .map(|x| {
                let mut ray = Ray::new(glam::Vec3A::new(*x, 0.0, -5.0), glam::Vec3A::Z);
                let mut inter = Intersection::default();
                assert!(group.intersect(&mut ray, &mut inter));
                inter.material.map(|mat| mat.name().to_owned())
            })
            .collect::<Vec<_>>();
        assert_eq!(names, vec![Some("white".to_owned()), Some("red".to_owned())]);
    }

    #[test]
    fn alpha_override_steps_past_cut_hits() {
        // two stacked quads, uv.x < 0.5 is cut out on both
        let mesh = TriangleMeshData::new(
            vec![
                glam::Vec3A::new(-1.0, -1.0, 0.0),
                glam::Vec3A::new(1.0, -1.0, 0.0),
                glam::Vec3A::new(1.0, 1.0, 0.0),
                glam::Vec3A::new(-1.0, 1.0, 0.0),
                glam::Vec3A::new(-1.0, -1.0, -1.0),
                glam::Vec3A::new(1.0, -1.0, -1.0),
                glam::Vec3A::new(1.0, 1.0, -1.0),
                glam::Vec3A::new(-1.0, 1.0, -1.0),
            ],
            vec![0, 1, 2, 0, 2, 3, 4, 5, 6, 4, 6, 7],
        )
        .with_uvs(vec![
            glam::Vec2::new(0.0, 0.0),
            glam::Vec2::new(1.0, 0.0),
            glam::Vec2::new(1.0, 1.0),
            glam::Vec2::new(0.0, 1.0),
            glam::Vec2::new(1.0, 0.0),
            glam::Vec2::new(1.0, 0.0),
            glam::Vec2::new(1.0, 1.0),
            glam::Vec2::new(1.0, 1.0),
        ]);
        let engine: Arc<Engine> = Arc::new(
            MeshEngine::from_mesh(
                Arc::new(mesh),
                Arc::new(OpaqueMaterial::new("gray")),
                None,
                &AccelParams::default(),
                &[0.0],
            )
            .into(),
        );
        let cutout: MaterialRef = Arc::new(AlphaMaskMaterial::new(
            "cutout",
            Arc::new(|uv: glam::Vec2| if uv.x < 0.5 { 0.0 } else { 1.0 }),
            0.5,
        ));
        let group = GroupEngine::new(
            vec![Instance::new(engine).with_material(cutout)],
            &AccelParams::List,
            &[0.0],
        );
        assert!(group.is_alpha_tested());

        // the first quad is cut here, the second one (uv.x = 1) is solid
        let ray = Ray::new(glam::Vec3A::new(-0.5, 0.0, 1.0), -glam::Vec3A::Z);
        assert!(group.intersect_any(&ray));
        assert!(!group.intersect_any(&ray.with_range(0.0, 1.5)));
    }

    #[test]
    fn moving_instance_bounds_cover_samples() {
        let moving: Transform = MovingTransform::new(
            glam::Affine3A::IDENTITY,
            glam::Affine3A::from_translation(glam::Vec3::new(0.0, 4.0, 0.0)),
            TimeInterval::new(0.0, 1.0),
        )
        .into();
        let group = GroupEngine::new(
            vec![Instance::new(sphere_engine()).with_transform(moving)],
            &AccelParams::default(),
            &[0.0, 0.5, 1.0],
        );
        assert_eq!(group.bbox().p_min.y, -1.0);
        assert_eq!(group.bbox().p_max.y, 5.0);
        assert_eq!(group.time_interval(), TimeInterval::new(0.0, 1.0));

        let ray = Ray::new(glam::Vec3A::new(0.0, 4.0, -5.0), glam::Vec3A::Z);
        assert!(!group.intersect_any(&ray.at_time(0.0)));
        assert!(group.intersect_any(&ray.at_time(1.0)));
    }

    #[test]
    fn empty_group() {
        let group = GroupEngine::new(vec![], &AccelParams::default(), &[0.0]);
        assert!(!group.bbox().is_valid());
        let mut ray = Ray::new(glam::Vec3A::ZERO, glam::Vec3A::Z);
        assert!(!group.intersect(&mut ray, &mut Intersection::default()));
        assert!(!group.intersect_any(&ray));
        assert_eq!(group.average_area(), 0.0);
    }
}
