use crate::core::ray::Ray;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Bbox {
    pub p_min: glam::Vec3A,
    pub p_max: glam::Vec3A,
}

impl Bbox {
    pub fn new(p_min: glam::Vec3A, p_max: glam::Vec3A) -> Self {
        Self { p_min, p_max }
    }

    pub fn from_points(points: &[glam::Vec3A]) -> Self {
        points
            .iter()
            .fold(Self::empty(), |bbox, p| bbox.grow(*p))
    }

    /// Inverted box, growing it by any point yields exactly that point.
    pub fn empty() -> Self {
        Self {
            p_min: glam::Vec3A::splat(f32::INFINITY),
            p_max: glam::Vec3A::splat(f32::NEG_INFINITY),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.p_min.x <= self.p_max.x && self.p_min.y <= self.p_max.y && self.p_min.z <= self.p_max.z
    }

    pub fn is_empty(&self) -> bool {
        !self.is_valid()
    }

    pub fn grow(mut self, p: glam::Vec3A) -> Self {
        self.p_min = self.p_min.min(p);
        self.p_max = self.p_max.max(p);
        self
    }

    pub fn merge(mut self, another: Bbox) -> Self {
        self.p_min = self.p_min.min(another.p_min);
        self.p_max = self.p_max.max(another.p_max);
        self
    }

    pub fn diagonal(&self) -> glam::Vec3A {
        self.p_max - self.p_min
    }

    pub fn centroid(&self) -> glam::Vec3A {
        (self.p_min + self.p_max) * 0.5
    }

    pub fn surface_area(&self) -> f32 {
        if self.is_empty() {
            0.0
        } else {
            let d = self.diagonal();
            2.0 * (d.x * d.y + d.y * d.z + d.z * d.x)
        }
    }

    pub fn max_extent(&self) -> usize {
        let d = self.diagonal();
        if d.x > d.y && d.x > d.z {
            0
        } else if d.y > d.z {
            1
        } else {
            2
        }
    }

    /// Relative position of `p` inside the box, 0 at `p_min` and 1 at `p_max` per axis.
    pub fn offset(&self, p: glam::Vec3A) -> glam::Vec3A {
        let mut o = p - self.p_min;
        let d = self.diagonal();
        if d.x > 0.0 {
            o.x /= d.x;
        }
        if d.y > 0.0 {
            o.y /= d.y;
        }
        if d.z > 0.0 {
            o.z /= d.z;
        }
        o
    }

    pub fn overlaps(&self, another: &Bbox) -> bool {
        self.p_min.x <= another.p_max.x
            && self.p_max.x >= another.p_min.x
            && self.p_min.y <= another.p_max.y
            && self.p_max.y >= another.p_min.y
            && self.p_min.z <= another.p_max.z
            && self.p_max.z >= another.p_min.z
    }

    pub fn transformed_by(self, trans: glam::Affine3A) -> Self {
        if self.is_empty() {
            return self;
        }
        (0..8).fold(Bbox::empty(), |bbox, corner| {
            let p = glam::Vec3A::new(
                if corner & 1 == 0 { self.p_min.x } else { self.p_max.x },
                if corner & 2 == 0 { self.p_min.y } else { self.p_max.y },
                if corner & 4 == 0 { self.p_min.z } else { self.p_max.z },
            );
            bbox.grow(trans.transform_point3a(p))
        })
    }

    /// Slab test against `[ray.t_min, ray.t_max]`, returns the clipped parametric range.
    pub fn intersect_ray(&self, ray: &Ray, inv_dir: glam::Vec3A) -> Option<(f32, f32)> {
        let mut t0 = ray.t_min;
        let mut t1 = ray.t_max;
        for axis in 0..3 {
            let t_near = (self.p_min[axis] - ray.origin[axis]) * inv_dir[axis];
            let t_far = (self.p_max[axis] - ray.origin[axis]) * inv_dir[axis];
            let (t_near, t_far) = if t_near > t_far {
                (t_far, t_near)
            } else {
                (t_near, t_far)
            };
            t0 = if t_near > t0 { t_near } else { t0 };
            t1 = if t_far < t1 { t_far } else { t1 };
            if t0 > t1 {
                return None;
            }
        }
        Some((t0, t1))
    }

    pub fn intersect_test(&self, ray: &Ray, inv_dir: glam::Vec3A) -> bool {
        self.intersect_ray(ray, inv_dir).is_some()
    }
}

impl Default for Bbox {
    fn default() -> Self {
        Self::empty()
    }
}
