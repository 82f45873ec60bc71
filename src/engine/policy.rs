//! Per-attribute behaviors of leaf engines. Each policy is a zero-sized type;
//! a leaf engine picks one per attribute when it is built, from what its
//! geometry buffer stores, and keeps the chosen functions so that hits never
//! ask again whether an attribute exists. A `Stored*` policy is only picked
//! for a buffer that stores the attribute and indexes it unconditionally.

use crate::core::geometry::{SegmentData, SphereData, TriangleMeshData};

/// Where a ray hit a triangle.
pub struct TriangleSample {
    pub indices: [usize; 3],
    pub positions: [glam::Vec3A; 3],
    /// Barycentric weights of the three vertices.
    pub bary: [f32; 3],
    pub face_normal: glam::Vec3A,
}

/// Where a ray hit a segment.
pub struct SegmentSample {
    pub indices: [usize; 2],
    /// Position along the segment, 0 at its first vertex and 1 at its second.
    pub s: f32,
    pub axis: glam::Vec3A,
}

pub trait TriangleAttribute<T> {
    fn eval(mesh: &TriangleMeshData, tri: &TriangleSample) -> T;
}

pub trait SegmentAttribute<T> {
    fn eval(segments: &SegmentData, seg: &SegmentSample) -> T;
}

pub trait RadiusPolicy {
    fn sphere(spheres: &SphereData, index: usize) -> f32;

    fn segment(segments: &SegmentData, indices: [usize; 2]) -> f32;
}

pub type TriangleAttributeFn<T> = fn(&TriangleMeshData, &TriangleSample) -> T;
pub type SegmentAttributeFn<T> = fn(&SegmentData, &SegmentSample) -> T;

fn interpolate3(values: &[glam::Vec3A], tri: &TriangleSample) -> glam::Vec3A {
    let [i0, i1, i2] = tri.indices;
    let [b0, b1, b2] = tri.bary;
    values[i0] * b0 + values[i1] * b1 + values[i2] * b2
}

fn interpolate2(values: &[glam::Vec2], tri: &TriangleSample) -> glam::Vec2 {
    let [i0, i1, i2] = tri.indices;
    let [b0, b1, b2] = tri.bary;
    values[i0] * b0 + values[i1] * b1 + values[i2] * b2
}

fn normalize_or(v: glam::Vec3A, fallback: glam::Vec3A) -> glam::Vec3A {
    let len_sqr = v.length_squared();
    if len_sqr > 0.0 {
        v / len_sqr.sqrt()
    } else {
        fallback
    }
}

fn edge_tangent(tri: &TriangleSample) -> glam::Vec3A {
    let [p0, p1, _] = tri.positions;
    normalize_or(p1 - p0, glam::Vec3A::X)
}

pub struct StoredNormal;
pub struct FaceNormal;

impl TriangleAttribute<glam::Vec3A> for StoredNormal {
    fn eval(mesh: &TriangleMeshData, tri: &TriangleSample) -> glam::Vec3A {
        normalize_or(interpolate3(mesh.stored_normals(), tri), tri.face_normal)
    }
}

impl TriangleAttribute<glam::Vec3A> for FaceNormal {
    fn eval(_mesh: &TriangleMeshData, tri: &TriangleSample) -> glam::Vec3A {
        tri.face_normal
    }
}

pub struct StoredUv;
/// Parameterization of the primitive itself: `(0,0) (1,0) (1,1)` at the
/// triangle corners, `(s, 0)` along a segment.
pub struct ParametricUv;

impl TriangleAttribute<glam::Vec2> for StoredUv {
    fn eval(mesh: &TriangleMeshData, tri: &TriangleSample) -> glam::Vec2 {
        interpolate2(mesh.stored_uvs(), tri)
    }
}

impl TriangleAttribute<glam::Vec2> for ParametricUv {
    fn eval(_mesh: &TriangleMeshData, tri: &TriangleSample) -> glam::Vec2 {
        glam::Vec2::new(tri.bary[1] + tri.bary[2], tri.bary[2])
    }
}

impl SegmentAttribute<glam::Vec2> for StoredUv {
    fn eval(segments: &SegmentData, seg: &SegmentSample) -> glam::Vec2 {
        let uvs = segments.stored_uvs();
        uvs[seg.indices[0]].lerp(uvs[seg.indices[1]], seg.s)
    }
}

impl SegmentAttribute<glam::Vec2> for ParametricUv {
    fn eval(_segments: &SegmentData, seg: &SegmentSample) -> glam::Vec2 {
        glam::Vec2::new(seg.s, 0.0)
    }
}

pub struct StoredTangent;
/// Direction of increasing u, derived from stored uvs.
pub struct UvTangent;
/// First triangle edge, or the segment axis.
pub struct EdgeTangent;

impl TriangleAttribute<glam::Vec3A> for StoredTangent {
    fn eval(mesh: &TriangleMeshData, tri: &TriangleSample) -> glam::Vec3A {
        normalize_or(interpolate3(mesh.stored_tangents(), tri), edge_tangent(tri))
    }
}

impl TriangleAttribute<glam::Vec3A> for UvTangent {
    fn eval(mesh: &TriangleMeshData, tri: &TriangleSample) -> glam::Vec3A {
        let uvs = mesh.stored_uvs();
        let [i0, i1, i2] = tri.indices;
        let u1 = uvs[i1] - uvs[i0];
        let u2 = uvs[i2] - uvs[i0];
        let det = u1.x * u2.y - u1.y * u2.x;
        if det == 0.0 {
            return edge_tangent(tri);
        }
        let [p0, p1, p2] = tri.positions;
        let dpdu = ((p1 - p0) * u2.y - (p2 - p0) * u1.y) / det;
        normalize_or(dpdu, edge_tangent(tri))
    }
}

impl TriangleAttribute<glam::Vec3A> for EdgeTangent {
    fn eval(_mesh: &TriangleMeshData, tri: &TriangleSample) -> glam::Vec3A {
        edge_tangent(tri)
    }
}

impl SegmentAttribute<glam::Vec3A> for StoredTangent {
    fn eval(segments: &SegmentData, seg: &SegmentSample) -> glam::Vec3A {
        let tangents = segments.stored_tangents();
        normalize_or(
            tangents[seg.indices[0]].lerp(tangents[seg.indices[1]], seg.s),
            seg.axis,
        )
    }
}

impl SegmentAttribute<glam::Vec3A> for EdgeTangent {
    fn eval(_segments: &SegmentData, seg: &SegmentSample) -> glam::Vec3A {
        seg.axis
    }
}

pub struct StoredRadius;
pub struct UniformRadius;

impl RadiusPolicy for StoredRadius {
    fn sphere(spheres: &SphereData, index: usize) -> f32 {
        spheres.stored_radii()[index]
    }

    /// Mean of the endpoint radii, segments are intersected as cylinders.
    fn segment(segments: &SegmentData, indices: [usize; 2]) -> f32 {
        let radii = segments.stored_radii();
        0.5 * (radii[indices[0]] + radii[indices[1]])
    }
}

impl RadiusPolicy for UniformRadius {
    fn sphere(spheres: &SphereData, _index: usize) -> f32 {
        spheres.radius()
    }

    fn segment(segments: &SegmentData, _indices: [usize; 2]) -> f32 {
        segments.radius()
    }
}

/// Attribute functions of a triangle mesh engine.
#[derive(Copy, Clone)]
pub struct TrianglePolicies {
    pub normal: TriangleAttributeFn<glam::Vec3A>,
    pub uv: TriangleAttributeFn<glam::Vec2>,
    pub tangent: TriangleAttributeFn<glam::Vec3A>,
}

impl TrianglePolicies {
    pub fn select(mesh: &TriangleMeshData) -> Self {
        Self {
            normal: if mesh.normals().is_some() {
                <StoredNormal as TriangleAttribute<glam::Vec3A>>::eval
            } else {
                <FaceNormal as TriangleAttribute<glam::Vec3A>>::eval
            },
            uv: if mesh.uvs().is_some() {
                <StoredUv as TriangleAttribute<glam::Vec2>>::eval
            } else {
                <ParametricUv as TriangleAttribute<glam::Vec2>>::eval
            },
            tangent: if mesh.tangents().is_some() {
                <StoredTangent as TriangleAttribute<glam::Vec3A>>::eval
            } else if mesh.uvs().is_some() {
                <UvTangent as TriangleAttribute<glam::Vec3A>>::eval
            } else {
                <EdgeTangent as TriangleAttribute<glam::Vec3A>>::eval
            },
        }
    }
}

/// Attribute functions of a segment engine.
#[derive(Copy, Clone)]
pub struct SegmentPolicies {
    pub radius: fn(&SegmentData, [usize; 2]) -> f32,
    pub uv: SegmentAttributeFn<glam::Vec2>,
    pub tangent: SegmentAttributeFn<glam::Vec3A>,
}

impl SegmentPolicies {
    pub fn select(segments: &SegmentData) -> Self {
        Self {
            radius: if segments.radii().is_some() {
                StoredRadius::segment
            } else {
                UniformRadius::segment
            },
            uv: if segments.uvs().is_some() {
                <StoredUv as SegmentAttribute<glam::Vec2>>::eval
            } else {
                <ParametricUv as SegmentAttribute<glam::Vec2>>::eval
            },
            tangent: if segments.tangents().is_some() {
                <StoredTangent as SegmentAttribute<glam::Vec3A>>::eval
            } else {
                <EdgeTangent as SegmentAttribute<glam::Vec3A>>::eval
            },
        }
    }
}

#[derive(Copy, Clone)]
pub struct SpherePolicies {
    pub radius: fn(&SphereData, usize) -> f32,
}

impl SpherePolicies {
    pub fn select(spheres: &SphereData) -> Self {
        Self {
            radius: if spheres.radii().is_some() {
                StoredRadius::sphere
            } else {
                UniformRadius::sphere
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(bary: [f32; 3]) -> TriangleSample {
        TriangleSample {
            indices: [0, 1, 2],
            positions: [
                glam::Vec3A::ZERO,
                glam::Vec3A::new(0.0, 2.0, 0.0),
                glam::Vec3A::new(-2.0, 0.0, 0.0),
            ],
            bary,
            face_normal: glam::Vec3A::Z,
        }
    }

    fn mesh() -> TriangleMeshData {
        TriangleMeshData::new(
            vec![
                glam::Vec3A::ZERO,
                glam::Vec3A::new(0.0, 2.0, 0.0),
                glam::Vec3A::new(-2.0, 0.0, 0.0),
            ],
            vec![0, 1, 2],
        )
    }

    #[test]
    fn bare_mesh_synthesizes_attributes() {
        let mesh = mesh();
        let policies = TrianglePolicies::select(&mesh);
        let tri = sample([0.5, 0.25, 0.25]);
        assert_eq!((policies.normal)(&mesh, &tri), glam::Vec3A::Z);
        assert_eq!((policies.uv)(&mesh, &tri), glam::Vec2::new(0.5, 0.25));
        assert_eq!((policies.tangent)(&mesh, &tri), glam::Vec3A::Y);
    }

    #[test]
    fn stored_attributes_are_interpolated() {
        let mesh = mesh()
            .with_normals(vec![glam::Vec3A::X, glam::Vec3A::Y, glam::Vec3A::Y])
            .with_uvs(vec![
                glam::Vec2::ZERO,
                glam::Vec2::new(1.0, 0.0),
                glam::Vec2::new(0.0, 1.0),
            ]);
        let policies = TrianglePolicies::select(&mesh);
        let tri = sample([0.5, 0.5, 0.0]);
        let normal = (policies.normal)(&mesh, &tri);
        assert!((normal - glam::Vec3A::new(1.0, 1.0, 0.0).normalize()).length() < 1e-6);
        assert_eq!((policies.uv)(&mesh, &tri), glam::Vec2::new(0.5, 0.0));
        // u grows along the first edge
        assert!((policies.tangent)(&mesh, &tri).abs_diff_eq(glam::Vec3A::Y, 1e-6));
    }

    #[test]
    fn radius_policy_follows_buffer() {
        let uniform = SphereData::new(vec![glam::Vec3A::ZERO; 2], 0.5);
        assert_eq!((SpherePolicies::select(&uniform).radius)(&uniform, 1), 0.5);
        let varying = SphereData::new(vec![glam::Vec3A::ZERO; 2], 0.5).with_radii(vec![1.0, 2.0]);
        assert_eq!((SpherePolicies::select(&varying).radius)(&varying, 1), 2.0);

        let strand = SegmentData::from_strand(vec![glam::Vec3A::ZERO, glam::Vec3A::X], 0.1)
            .with_radii(vec![0.2, 0.4]);
        let policies = SegmentPolicies::select(&strand);
        assert!(((policies.radius)(&strand, [0, 1]) - 0.3).abs() < 1e-6);
        let seg = SegmentSample {
            indices: [0, 1],
            s: 0.25,
            axis: glam::Vec3A::X,
        };
        assert_eq!((policies.uv)(&strand, &seg), glam::Vec2::new(0.25, 0.0));
        assert_eq!((policies.tangent)(&strand, &seg), glam::Vec3A::X);
    }

    #[test]
    fn stored_segment_attributes_are_interpolated() {
        let strand = SegmentData::from_strand(vec![glam::Vec3A::ZERO, glam::Vec3A::X], 0.1)
            .with_uvs(vec![glam::Vec2::new(0.0, 1.0), glam::Vec2::new(1.0, 0.0)])
            .with_tangents(vec![glam::Vec3A::Y, glam::Vec3A::Z]);
        assert_eq!(strand.stored_uvs().len(), 2);
        assert!(strand.radii().is_none());

        let policies = SegmentPolicies::select(&strand);
        let seg = SegmentSample {
            indices: [0, 1],
            s: 0.5,
            axis: glam::Vec3A::X,
        };
        assert_eq!((policies.uv)(&strand, &seg), glam::Vec2::new(0.5, 0.5));
        let tangent = (policies.tangent)(&strand, &seg);
        assert!(tangent.abs_diff_eq(glam::Vec3A::new(0.0, 1.0, 1.0).normalize(), 1e-6));
        assert_eq!((policies.radius)(&strand, [0, 1]), 0.1);

        // opposite tangents cancel, the axis takes over
        let flipped = SegmentData::from_strand(vec![glam::Vec3A::ZERO, glam::Vec3A::X], 0.1)
            .with_tangents(vec![glam::Vec3A::Y, -glam::Vec3A::Y]);
        let policies = SegmentPolicies::select(&flipped);
        assert_eq!((policies.tangent)(&flipped, &seg), glam::Vec3A::X);
    }

    #[test]
    fn absent_attributes_are_empty() {
        let mesh = mesh();
        assert!(mesh.normals().is_none() && mesh.uvs().is_none() && mesh.tangents().is_none());
        assert!(mesh.stored_normals().is_empty());
        let spheres = SphereData::new(vec![glam::Vec3A::ZERO], 1.0);
        assert!(spheres.radii().is_none() && spheres.stored_radii().is_empty());

        let mesh = mesh.with_tangents(vec![glam::Vec3A::X; 3]);
        let policies = TrianglePolicies::select(&mesh);
        let tri = sample([1.0, 0.0, 0.0]);
        assert_eq!((policies.normal)(&mesh, &tri), glam::Vec3A::Z);
        assert_eq!((policies.tangent)(&mesh, &tri), glam::Vec3A::X);
    }
}
