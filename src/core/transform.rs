use crate::core::{bbox::Bbox, intersection::DifferentialGeometry, ray::Ray};

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TimeInterval {
    pub start: f32,
    pub end: f32,
}

impl TimeInterval {
    pub const ALWAYS: TimeInterval = TimeInterval {
        start: f32::NEG_INFINITY,
        end: f32::INFINITY,
    };

    pub fn new(start: f32, end: f32) -> Self {
        assert!(start <= end, "time interval [{}, {}] is reversed", start, end);
        Self { start, end }
    }

    pub fn contains(&self, time: f32) -> bool {
        self.start <= time && time <= self.end
    }

    pub fn intersection(&self, another: &TimeInterval) -> TimeInterval {
        TimeInterval {
            start: self.start.max(another.start),
            end: self.end.min(another.end),
        }
    }

    /// `count` evenly spaced times covering the interval, infinite ends are
    /// replaced by 0.
    pub fn samples(&self, count: usize) -> Vec<f32> {
        let start = if self.start.is_finite() { self.start } else { 0.0 };
        let end = if self.end.is_finite() { self.end } else { start };
        if count <= 1 || start == end {
            return vec![start];
        }
        (0..count)
            .map(|i| start + (end - start) * i as f32 / (count - 1) as f32)
            .collect()
    }
}

/// World/local transform pair evaluated at one instant.
#[derive(Debug, Clone, Copy)]
pub struct TransformSample {
    to_world: glam::Affine3A,
    to_local: glam::Affine3A,
    normal_to_world: glam::Mat3A,
}

impl TransformSample {
    pub fn new(to_world: glam::Affine3A) -> Self {
        let det = to_world.matrix3.determinant();
        assert!(
            det != 0.0 && det.is_finite(),
            "transform matrix is singular (det = {})",
            det
        );
        let to_local = to_world.inverse();
        let normal_to_world = to_local.matrix3.transpose();
        Self {
            to_world,
            to_local,
            normal_to_world,
        }
    }

    pub fn to_world(&self) -> &glam::Affine3A {
        &self.to_world
    }

    pub fn to_local(&self) -> &glam::Affine3A {
        &self.to_local
    }

    pub fn ray_to_local(&self, ray: &Ray) -> Ray {
        ray.transformed_by(self.to_local)
    }

    pub fn dg_to_world(&self, dg: &DifferentialGeometry) -> DifferentialGeometry {
        dg.transformed_by(&self.to_world, &self.normal_to_world)
    }

    pub fn bbox_to_world(&self, bbox: Bbox) -> Bbox {
        bbox.transformed_by(self.to_world)
    }

    /// Factor by which areas grow when mapped to world space.
    pub fn area_scale(&self) -> f32 {
        self.to_world.matrix3.determinant().abs().powf(2.0 / 3.0)
    }
}

#[enum_dispatch::enum_dispatch(Transform)]
pub trait TransformT: Send + Sync {
    fn sample(&self, time: f32) -> TransformSample;

    fn is_static(&self) -> bool;

    fn time_interval(&self) -> TimeInterval;

    fn get_transform(&self, time: f32) -> glam::Affine3A {
        *self.sample(time).to_world()
    }

    fn get_inverse_transform(&self, time: f32) -> glam::Affine3A {
        *self.sample(time).to_local()
    }
}

#[enum_dispatch::enum_dispatch]
#[derive(Debug, Clone)]
pub enum Transform {
    StaticTransform,
    MovingTransform,
}

#[derive(Debug, Clone, Copy)]
pub struct StaticTransform {
    sample: TransformSample,
}

impl StaticTransform {
    pub fn new(trans: glam::Affine3A) -> Self {
        Self {
            sample: TransformSample::new(trans),
        }
    }

    pub fn identity() -> Self {
        Self::new(glam::Affine3A::IDENTITY)
    }
}

impl TransformT for StaticTransform {
    fn sample(&self, _time: f32) -> TransformSample {
        self.sample
    }

    fn is_static(&self) -> bool {
        true
    }

    fn time_interval(&self) -> TimeInterval {
        TimeInterval::ALWAYS
    }
}

/// Linear interpolation between two affine keyframes. Outside its interval the
/// nearest keyframe is held.
#[derive(Debug, Clone, Copy)]
pub struct MovingTransform {
    start: glam::Affine3A,
    end: glam::Affine3A,
    interval: TimeInterval,
}

impl MovingTransform {
    /// Aborts if the interpolated matrix is singular anywhere in `interval`,
    /// so that sampling at any ray time stays invertible.
    pub fn new(start: glam::Affine3A, end: glam::Affine3A, interval: TimeInterval) -> Self {
        let res = Self {
            start,
            end,
            interval,
        };
        let end_s = if Self::blends(interval) { 1.0 } else { 0.0 };
        if let Some(s) = res.singular_at(end_s) {
            let time = if s > 0.0 {
                interval.start + s * (interval.end - interval.start)
            } else {
                interval.start
            };
            panic!("moving transform is singular at time {}", time);
        }
        res
    }

    /// An unbounded or empty interval holds the start keyframe.
    fn blends(interval: TimeInterval) -> bool {
        let span = interval.end - interval.start;
        span > 0.0 && span.is_finite()
    }

    fn lerp(&self, s: f32) -> glam::Affine3A {
        glam::Affine3A {
            matrix3: self.start.matrix3 * (1.0 - s) + self.end.matrix3 * s,
            translation: self.start.translation * (1.0 - s) + self.end.translation * s,
        }
    }

    fn interpolate(&self, time: f32) -> glam::Affine3A {
        let span = self.interval.end - self.interval.start;
        let s = if Self::blends(self.interval) {
            ((time - self.interval.start) / span).clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.lerp(s)
    }

    /// A blend factor in `[0, end_s]` where the determinant of the blended
    /// matrix vanishes or changes sign, if any.
    ///
    /// The determinant is a cubic in the blend factor. It is rebuilt from
    /// four samples and checked at both ends and at its turning points.
    fn singular_at(&self, end_s: f32) -> Option<f32> {
        let det = |s: f32| self.lerp(s).matrix3.determinant() as f64;
        let valid = |d: f64| d != 0.0 && d.is_finite();
        if end_s == 0.0 {
            return if valid(det(0.0)) { None } else { Some(0.0) };
        }

        // forward differences over x = 3s, sampled at x = 0, 1, 2, 3
        let d = [det(0.0), det(1.0 / 3.0), det(2.0 / 3.0), det(1.0)];
        if let Some(i) = d.iter().position(|&d| !valid(d)) {
            return Some(i as f32 / 3.0);
        }
        let d1 = d[1] - d[0];
        let d2 = d[2] - 2.0 * d[1] + d[0];
        let d3 = d[3] - 3.0 * d[2] + 3.0 * d[1] - d[0];
        let (a1, a2, a3) = (d1, d2 / 2.0, d3 / 6.0);
        let c0 = d[0];
        let c1 = a1 - a2 + 2.0 * a3;
        let c2 = a2 - 3.0 * a3;
        let c3 = a3;
        let cubic = |x: f64| ((c3 * x + c2) * x + c1) * x + c0;

        // roots of 3 c3 x^2 + 2 c2 x + c1 inside (0, 3)
        let mut xs = vec![0.0, 3.0];
        let disc = c2 * c2 - 3.0 * c3 * c1;
        if disc >= 0.0 {
            let q = -(c2 + c2.signum() * disc.sqrt());
            xs.push(q / (3.0 * c3));
            xs.push(c1 / q);
        }
        xs.retain(|x| (0.0..=3.0).contains(x));
        xs.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let sign = d[0].signum();
        let eps = 1e-6 * d.iter().fold(0.0f64, |m, d| m.max(d.abs()));
        xs.iter()
            .find(|&&x| cubic(x) * sign <= eps)
            .map(|x| (*x / 3.0) as f32)
    }
}

impl TransformT for MovingTransform {
    fn sample(&self, time: f32) -> TransformSample {
        TransformSample::new(self.interpolate(time))
    }

    fn is_static(&self) -> bool {
        false
    }

    fn time_interval(&self) -> TimeInterval {
        self.interval
    }
}

impl Transform {
    /// Union of the world-space box of `local` over the sampled times.
    pub fn world_bbox(&self, local: Bbox, times: &[f32]) -> Bbox {
        if self.is_static() {
            return self.sample(0.0).bbox_to_world(local);
        }
        times.iter().fold(Bbox::empty(), |bbox, time| {
            bbox.merge(self.sample(*time).bbox_to_world(local))
        })
    }
}
