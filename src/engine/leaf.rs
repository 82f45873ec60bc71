use crate::{
    accel::{Accel, AccelParams, PrimitiveSet},
    core::{
        bbox::Bbox,
        intersection::Intersection,
        ray::Ray,
        stats::EngineStats,
        transform::{TimeInterval, Transform, TransformT},
    },
};

use super::EngineT;

/// Primitive set of a leaf engine: one geometry buffer and one material.
pub trait LeafPrims: PrimitiveSet {
    const KIND: &'static str;

    /// Area of one primitive in the buffer's own space.
    fn prim_area(&self, index: usize) -> f32;

    fn is_alpha_tested(&self) -> bool;
}

/// One accelerated geometry buffer, optionally placed by a transform. Rays
/// are moved to the buffer's space, hits are moved back; the buffer itself is
/// never transformed.
pub struct LeafEngine<P> {
    prims: P,
    accel: Accel,
    transform: Option<Transform>,
    bbox: Bbox,
    average_area: f32,
}

impl<P: LeafPrims> LeafEngine<P> {
    /// `times` are the instants at which a moving transform is sampled to
    /// bound the geometry.
    pub fn new(prims: P, transform: Option<Transform>, params: &AccelParams, times: &[f32]) -> Self {
        let accel = Accel::build(&prims, params);
        let bbox = match &transform {
            Some(transform) => transform.world_bbox(accel.bbox(), times),
            None => accel.bbox(),
        };

        let mut area_sum = 0.0;
        let mut area_count = 0;
        for index in 0..prims.prim_count() {
            let area = prims.prim_area(index);
            if area > 0.0 {
                area_sum += area;
                area_count += 1;
            }
        }
        if area_count < prims.prim_count() {
            log::warn!(
                "{} engine: {} zero-area primitives left out of the average area",
                P::KIND,
                prims.prim_count() - area_count
            );
        }
        let area_scale = transform.as_ref().map_or(1.0, |transform| {
            transform
                .sample(times.first().copied().unwrap_or(0.0))
                .area_scale()
        });
        let average_area = if area_count > 0 {
            area_scale * area_sum / area_count as f32
        } else {
            0.0
        };

        log::info!(
            "{} engine: {} primitives, {} ({})",
            P::KIND,
            prims.prim_count(),
            accel.kind(),
            accel.stats()
        );

        Self {
            prims,
            accel,
            transform,
            bbox,
            average_area,
        }
    }

    pub fn prims(&self) -> &P {
        &self.prims
    }

    pub fn accel(&self) -> &Accel {
        &self.accel
    }

    pub fn transform(&self) -> Option<&Transform> {
        self.transform.as_ref()
    }
}

impl<P: LeafPrims> EngineT for LeafEngine<P> {
    fn time_interval(&self) -> TimeInterval {
        self.transform
            .as_ref()
            .map_or(TimeInterval::ALWAYS, |transform| transform.time_interval())
    }

    fn intersect<'a>(&'a self, ray: &mut Ray, inter: &mut Intersection<'a>) -> bool {
        match &self.transform {
            None => self.accel.intersect(&self.prims, ray, inter),
            Some(transform) => {
                let sample = transform.sample(ray.time);
                let mut local = sample.ray_to_local(ray);
                if !self.accel.intersect(&self.prims, &mut local, inter) {
                    return false;
                }
                ray.t_max = local.t_max;
                inter.dg = sample.dg_to_world(&inter.dg);
                true
            }
        }
    }

    fn intersect_any(&self, ray: &Ray) -> bool {
        match &self.transform {
            None => self.accel.intersect_any(&self.prims, ray),
            Some(transform) => {
                let local = transform.sample(ray.time).ray_to_local(ray);
                self.accel.intersect_any(&self.prims, &local)
            }
        }
    }

    fn stats(&self) -> EngineStats {
        EngineStats {
            engines: 1,
            primitives: self.prims.prim_count(),
            instances: 0,
            accel: self.accel.stats(),
        }
    }

    fn bbox(&self) -> Bbox {
        self.bbox
    }

    fn average_area(&self) -> f32 {
        self.average_area
    }

    fn is_alpha_tested(&self) -> bool {
        self.prims.is_alpha_tested()
    }
}
