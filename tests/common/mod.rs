#![allow(dead_code)]

use std::sync::Arc;

use rand::{rngs::SmallRng, Rng, SeedableRng};

use ray_engine::{
    accel::{AccelParams, BvhParams, KdSplit, KdTreeParams},
    core::{
        geometry::{SegmentData, SphereData, TriangleMeshData},
        material::{MaterialRef, OpaqueMaterial},
        ray::Ray,
    },
};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn rng(seed: u64) -> SmallRng {
    SmallRng::seed_from_u64(seed)
}

pub fn material(name: &str) -> MaterialRef {
    Arc::new(OpaqueMaterial::new(name))
}

/// Every strategy the builders offer.
pub fn all_accels() -> Vec<AccelParams> {
    vec![
        AccelParams::Bvh(BvhParams::default()),
        AccelParams::KdTree(KdTreeParams::with_split(KdSplit::Median)),
        AccelParams::KdTree(KdTreeParams::with_split(KdSplit::EqualCount)),
        AccelParams::KdTree(KdTreeParams::with_split(KdSplit::Sah)),
        AccelParams::List,
    ]
}

fn random_point(rng: &mut SmallRng, extent: f32) -> glam::Vec3A {
    glam::Vec3A::new(
        rng.gen_range(-extent..extent),
        rng.gen_range(-extent..extent),
        rng.gen_range(-extent..extent),
    )
}

/// Small triangles scattered in a cube of half size `extent`.
pub fn random_triangles(rng: &mut SmallRng, count: usize, extent: f32) -> TriangleMeshData {
    let mut positions = Vec::with_capacity(3 * count);
    for _ in 0..count {
        let center = random_point(rng, extent);
        for _ in 0..3 {
            positions.push(center + random_point(rng, 0.1 * extent));
        }
    }
    let indices = (0..positions.len() as u32).collect();
    TriangleMeshData::new(positions, indices)
}

pub fn random_spheres(rng: &mut SmallRng, count: usize, extent: f32) -> SphereData {
    let centers = (0..count).map(|_| random_point(rng, extent)).collect::<Vec<_>>();
    let radii = (0..count)
        .map(|_| rng.gen_range(0.02 * extent..0.08 * extent))
        .collect();
    SphereData::new(centers, 0.05 * extent).with_radii(radii)
}

pub fn random_strands(rng: &mut SmallRng, count: usize, extent: f32) -> SegmentData {
    let mut positions = Vec::with_capacity(4 * count);
    let mut indices = Vec::with_capacity(6 * count);
    for _ in 0..count {
        let base = positions.len() as u32;
        let mut p = random_point(rng, extent);
        positions.push(p);
        for i in 0..3 {
            p += random_point(rng, 0.1 * extent);
            positions.push(p);
            indices.push(base + i);
            indices.push(base + i + 1);
        }
    }
    SegmentData::new(positions, indices, 0.01 * extent)
}

/// Rays from a shell around the origin aimed at points inside it.
pub fn random_rays(rng: &mut SmallRng, count: usize, extent: f32) -> Vec<Ray> {
    (0..count)
        .map(|_| {
            let origin = random_point(rng, 1.0).normalize_or_zero() * 3.0 * extent;
            let target = random_point(rng, 0.8 * extent);
            Ray::new(origin, (target - origin).normalize())
        })
        .collect()
}
