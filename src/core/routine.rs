//! Ray-primitive intersection routines. They never mutate the ray and only
//! report hits inside `[ray.t_min, ray.t_max]`.

use crate::core::{bbox::Bbox, ray::Ray};

pub const TRIANGLE_EPSILON_SCALE: f32 = 1e-3;
pub const SPHERE_EPSILON_SCALE: f32 = 5e-4;
pub const CAPSULE_EPSILON_SCALE: f32 = 5e-4;

#[derive(Debug, Copy, Clone)]
pub struct TriangleHit {
    pub t: f32,
    /// Barycentric weights of the second and third vertex.
    pub b1: f32,
    pub b2: f32,
    pub epsilon: f32,
}

#[derive(Debug, Copy, Clone)]
pub struct SphereHit {
    pub t: f32,
    pub epsilon: f32,
}

#[derive(Debug, Copy, Clone)]
pub struct CapsuleHit {
    pub t: f32,
    /// Distance of the hit along the segment axis, in `[0, length]`.
    pub height: f32,
    pub length: f32,
    pub normal: glam::Vec3A,
    pub epsilon: f32,
}

pub fn ray_box(bbox: &Bbox, ray: &Ray, inv_dir: glam::Vec3A) -> Option<(f32, f32)> {
    bbox.intersect_ray(ray, inv_dir)
}

pub fn ray_triangle(ray: &Ray, p0: glam::Vec3A, p1: glam::Vec3A, p2: glam::Vec3A) -> Option<TriangleHit> {
    let e1 = p1 - p0;
    let e2 = p2 - p0;
    let s1 = ray.direction.cross(e2);
    let det = s1.dot(e1);
    if det == 0.0 {
        return None;
    }
    let inv_det = 1.0 / det;

    let s = ray.origin - p0;
    let b1 = s.dot(s1) * inv_det;
    if !(0.0..=1.0).contains(&b1) {
        return None;
    }

    let s2 = s.cross(e1);
    let b2 = ray.direction.dot(s2) * inv_det;
    if b2 < 0.0 || b1 + b2 > 1.0 {
        return None;
    }

    let t = e2.dot(s2) * inv_det;
    if t < ray.t_min || t > ray.t_max {
        return None;
    }

    Some(TriangleHit {
        t,
        b1,
        b2,
        epsilon: TRIANGLE_EPSILON_SCALE * t,
    })
}

/// Roots of `a t^2 + b t + c`, ascending. None without two distinct real roots.
fn quadratic(a: f32, b: f32, c: f32) -> Option<(f32, f32)> {
    let disc = b * b - 4.0 * a * c;
    if disc <= 0.0 || a == 0.0 {
        return None;
    }
    let root = disc.sqrt();
    let q = if b < 0.0 {
        -0.5 * (b - root)
    } else {
        -0.5 * (b + root)
    };
    let t0 = q / a;
    let t1 = c / q;
    if t0 > t1 {
        Some((t1, t0))
    } else {
        Some((t0, t1))
    }
}

pub fn ray_sphere(ray: &Ray, center: glam::Vec3A, radius: f32) -> Option<SphereHit> {
    let oc = ray.origin - center;
    let a = ray.direction.length_squared();
    let b = 2.0 * ray.direction.dot(oc);
    let c = oc.length_squared() - radius * radius;
    let (t0, t1) = quadratic(a, b, c)?;
    if t0 > ray.t_max || t1 < ray.t_min {
        return None;
    }
    let t = if t0 >= ray.t_min { t0 } else { t1 };
    if t > ray.t_max {
        return None;
    }
    Some(SphereHit {
        t,
        epsilon: SPHERE_EPSILON_SCALE * t,
    })
}

/// Open cylinder of `radius` around the segment `p0`-`p1`, without end caps.
/// Hits whose outward normal faces along the ray are rejected.
pub fn ray_capsule(ray: &Ray, p0: glam::Vec3A, p1: glam::Vec3A, radius: f32) -> Option<CapsuleHit> {
    let axis = p1 - p0;
    let length = axis.length();
    if length == 0.0 {
        return None;
    }
    let axis = axis / length;

    let op = ray.origin - p0;
    let d_perp = ray.direction - axis * ray.direction.dot(axis);
    let o_perp = op - axis * op.dot(axis);
    let a = d_perp.length_squared();
    let b = 2.0 * d_perp.dot(o_perp);
    let c = o_perp.length_squared() - radius * radius;
    let (t0, t1) = quadratic(a, b, c)?;

    let on_segment = |t: f32| -> Option<f32> {
        if t < ray.t_min || t > ray.t_max {
            return None;
        }
        let height = (ray.point_at(t) - p0).dot(axis);
        if (0.0..=length).contains(&height) {
            Some(height)
        } else {
            None
        }
    };
    let (t, height) = on_segment(t0)
        .map(|h| (t0, h))
        .or_else(|| on_segment(t1).map(|h| (t1, h)))?;

    let normal = (ray.point_at(t) - (p0 + axis * height)) / radius;
    if normal.dot(ray.direction) > 0.0 {
        return None;
    }

    Some(CapsuleHit {
        t,
        height,
        length,
        normal,
        epsilon: CAPSULE_EPSILON_SCALE * t,
    })
}
