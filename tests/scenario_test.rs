mod common;

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use ray_engine::{
    accel::{AccelParams, BuildParams, KdSplit, KdTreeAccel, KdTreeParams, PrimitiveSet},
    build_engine,
    core::{
        bbox::Bbox,
        geometry::{SphereData, TriangleMeshData},
        intersection::Intersection,
        ray::Ray,
        transform::TimeInterval,
    },
    engine::{MeshPrims, Shape, Surface},
    EngineT,
};

fn unit_quad() -> TriangleMeshData {
    TriangleMeshData::new(
        vec![
            glam::Vec3A::new(-1.0, -1.0, 0.0),
            glam::Vec3A::new(1.0, -1.0, 0.0),
            glam::Vec3A::new(1.0, 1.0, 0.0),
            glam::Vec3A::new(-1.0, 1.0, 0.0),
        ],
        vec![0, 1, 2, 0, 2, 3],
    )
}

/// `n` x `n` cells over the unit quad, two triangles each.
fn subdivided_quad(n: u32) -> TriangleMeshData {
    let mut positions = vec![];
    for j in 0..=n {
        for i in 0..=n {
            positions.push(glam::Vec3A::new(
                -1.0 + 2.0 * i as f32 / n as f32,
                -1.0 + 2.0 * j as f32 / n as f32,
                0.0,
            ));
        }
    }
    let mut indices = vec![];
    for j in 0..n {
        for i in 0..n {
            let v00 = j * (n + 1) + i;
            let v10 = v00 + 1;
            let v01 = v00 + n + 1;
            let v11 = v01 + 1;
            indices.extend_from_slice(&[v00, v10, v11, v00, v11, v01]);
        }
    }
    TriangleMeshData::new(positions, indices)
}

/// Counts how often each triangle is handed to the intersection routine.
struct CountingMesh {
    prims: MeshPrims,
    tests: Vec<AtomicUsize>,
}

impl CountingMesh {
    fn new(mesh: TriangleMeshData) -> Self {
        let tests = (0..mesh.triangle_count()).map(|_| AtomicUsize::new(0)).collect();
        Self {
            prims: MeshPrims::new(Arc::new(mesh), common::material("gray")),
            tests,
        }
    }

    fn max_tests(&self) -> usize {
        self.tests.iter().map(|c| c.load(Ordering::Relaxed)).max().unwrap_or(0)
    }
}

impl PrimitiveSet for CountingMesh {
    fn prim_count(&self) -> usize {
        self.prims.prim_count()
    }

    fn prim_bbox(&self, index: usize) -> Bbox {
        self.prims.prim_bbox(index)
    }

    fn intersect_prim<'a>(&'a self, index: usize, ray: &Ray, inter: &mut Intersection<'a>) -> bool {
        self.tests[index].fetch_add(1, Ordering::Relaxed);
        self.prims.intersect_prim(index, ray, inter)
    }

    fn intersect_prim_any(&self, index: usize, ray: &Ray) -> bool {
        self.tests[index].fetch_add(1, Ordering::Relaxed);
        self.prims.intersect_prim_any(index, ray)
    }
}

#[test]
fn unit_sphere_through_the_builder() {
    common::init_logging();
    let surfaces = vec![Surface::new(
        Shape::Spheres(Arc::new(SphereData::new(vec![glam::Vec3A::ZERO], 1.0))),
        common::material("white"),
    )];
    for accel in common::all_accels() {
        let engine = build_engine(
            &surfaces,
            &[],
            TimeInterval::ALWAYS,
            1,
            &BuildParams::uniform(accel),
        );
        let mut ray = Ray::new(glam::Vec3A::new(0.0, 0.0, -5.0), glam::Vec3A::new(0.0, 0.0, 1.0));
        let mut inter = Intersection::default();
        assert!(engine.intersect(&mut ray, &mut inter));
        assert_eq!(inter.t, 4.0);
        assert_eq!(inter.dg.position, glam::Vec3A::new(0.0, 0.0, -1.0));
        assert_eq!(inter.dg.normal, glam::Vec3A::new(0.0, 0.0, -1.0));
        assert_eq!(inter.material.map(|mat| mat.name()), Some("white"));
    }
}

#[test]
fn quad_center_gives_one_record() {
    common::init_logging();
    let surfaces = vec![Surface::new(Shape::Mesh(Arc::new(unit_quad())), common::material("gray"))];
    for split in [KdSplit::Median, KdSplit::EqualCount, KdSplit::Sah] {
        let params = BuildParams::uniform(AccelParams::KdTree(KdTreeParams::with_split(split)));
        let engine = build_engine(&surfaces, &[], TimeInterval::ALWAYS, 1, &params);
        let mut ray = Ray::new(glam::Vec3A::new(0.0, 0.0, 2.0), -glam::Vec3A::Z);
        let mut inter = Intersection::default();
        assert!(engine.intersect(&mut ray, &mut inter));
        assert_eq!(inter.t, 2.0);
        assert!(inter.dg.position.abs_diff_eq(glam::Vec3A::ZERO, 1e-6));
        assert!(engine.intersect_any(&Ray::new(glam::Vec3A::new(0.0, 0.0, 2.0), -glam::Vec3A::Z)));
    }
}

#[test]
fn shared_kd_leaves_test_each_triangle_once() {
    common::init_logging();
    // odd subdivision so that the central cells straddle the first split planes
    let mesh = CountingMesh::new(subdivided_quad(5));
    for split in [KdSplit::Median, KdSplit::EqualCount, KdSplit::Sah] {
        let params = KdTreeParams {
            max_prims_in_node: 2,
            ..KdTreeParams::with_split(split)
        };
        let kd = KdTreeAccel::build(&mesh, &params);
        if split == KdSplit::Median {
            assert!(kd.stats().prim_refs > mesh.prim_count());
        }

        mesh.tests.iter().for_each(|c| c.store(0, Ordering::Relaxed));
        let mut ray = Ray::new(glam::Vec3A::new(0.0, 0.0, 2.0), -glam::Vec3A::Z);
        let mut inter = Intersection::default();
        assert!(kd.intersect(&mesh, &mut ray, &mut inter));
        assert!((inter.t - 2.0).abs() < 1e-5);
        assert!(mesh.max_tests() <= 1, "{:?}", split);

        mesh.tests.iter().for_each(|c| c.store(0, Ordering::Relaxed));
        let shadow = Ray::new(glam::Vec3A::new(0.3, -0.1, 2.0), glam::Vec3A::new(-0.1, 0.05, -1.0));
        assert!(kd.intersect_any(&mesh, &shadow));
        assert!(mesh.max_tests() <= 1, "{:?}", split);
    }
}

#[test]
fn empty_scene_misses_everything() {
    common::init_logging();
    for accel in common::all_accels() {
        let engine = build_engine(&[], &[], TimeInterval::ALWAYS, 1, &BuildParams::uniform(accel));
        let bbox = engine.bbox();
        assert!(!bbox.is_valid());
        assert_eq!(bbox.p_min, glam::Vec3A::splat(f32::INFINITY));
        assert_eq!(bbox.p_max, glam::Vec3A::splat(f32::NEG_INFINITY));

        let mut ray = Ray::new(glam::Vec3A::ZERO, glam::Vec3A::X);
        assert!(!engine.intersect(&mut ray, &mut Intersection::default()));
        assert!(!engine.intersect_any(&ray));
        assert_eq!(ray.t_max, f32::INFINITY);
        assert_eq!(engine.stats().primitives, 0);
    }
}

#[test]
fn ray_interval_is_respected() {
    common::init_logging();
    let surfaces = vec![Surface::new(Shape::Mesh(Arc::new(unit_quad())), common::material("gray"))];
    for accel in common::all_accels() {
        let engine = build_engine(&surfaces, &[], TimeInterval::ALWAYS, 1, &BuildParams::uniform(accel));
        let ray = Ray::new(glam::Vec3A::new(0.5, 0.25, 2.0), -glam::Vec3A::Z);
        assert!(!engine.intersect_any(&ray.with_range(0.0, 1.5)));
        assert!(!engine.intersect_any(&ray.with_range(2.5, 10.0)));
        assert!(engine.intersect_any(&ray.with_range(1.5, 2.5)));

        let mut short = ray.with_range(0.0, 1.5);
        assert!(!engine.intersect(&mut short, &mut Intersection::default()));
        assert_eq!(short.t_max, 1.5);
    }
}
