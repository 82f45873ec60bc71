//! Flat geometry buffers. They are immutable once built and shared by `Arc`
//! between every engine node that references them. An optional per-vertex
//! attribute is stored as an empty array when absent.

use crate::core::bbox::Bbox;

pub struct TriangleMeshData {
    positions: Vec<glam::Vec3A>,
    normals: Vec<glam::Vec3A>,
    uvs: Vec<glam::Vec2>,
    tangents: Vec<glam::Vec3A>,
    indices: Vec<u32>,
}

pub struct SphereData {
    centers: Vec<glam::Vec3A>,
    radii: Vec<f32>,
    radius: f32,
}

/// Line segments swept by a radius, intersected as uncapped cylinders.
pub struct SegmentData {
    positions: Vec<glam::Vec3A>,
    radii: Vec<f32>,
    radius: f32,
    tangents: Vec<glam::Vec3A>,
    uvs: Vec<glam::Vec2>,
    indices: Vec<u32>,
}

fn present<T>(values: &[T]) -> Option<&[T]> {
    if values.is_empty() {
        None
    } else {
        Some(values)
    }
}

fn check_indices(indices: &[u32], stride: usize, vertex_count: usize, what: &str) {
    assert!(
        indices.len() % stride == 0,
        "{}: index count {} is not a multiple of {}",
        what,
        indices.len(),
        stride
    );
    if let Some(bad) = indices.iter().find(|ind| **ind as usize >= vertex_count) {
        panic!(
            "{}: index {} out of range for {} vertices",
            what, bad, vertex_count
        );
    }
}

fn check_attribute_len(len: usize, vertex_count: usize, what: &str, attr: &str) {
    assert!(
        len == vertex_count,
        "{}: {} {}s given for {} vertices",
        what,
        len,
        attr,
        vertex_count
    );
}

impl TriangleMeshData {
    pub fn new(positions: Vec<glam::Vec3A>, indices: Vec<u32>) -> Self {
        check_indices(&indices, 3, positions.len(), "triangle mesh");
        Self {
            positions,
            normals: Vec::new(),
            uvs: Vec::new(),
            tangents: Vec::new(),
            indices,
        }
    }

    pub fn with_normals(mut self, normals: Vec<glam::Vec3A>) -> Self {
        check_attribute_len(normals.len(), self.positions.len(), "triangle mesh", "normal");
        self.normals = normals;
        self
    }

    pub fn with_uvs(mut self, uvs: Vec<glam::Vec2>) -> Self {
        check_attribute_len(uvs.len(), self.positions.len(), "triangle mesh", "uv");
        self.uvs = uvs;
        self
    }

    pub fn with_tangents(mut self, tangents: Vec<glam::Vec3A>) -> Self {
        check_attribute_len(tangents.len(), self.positions.len(), "triangle mesh", "tangent");
        self.tangents = tangents;
        self
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn triangle(&self, index: usize) -> [usize; 3] {
        [
            self.indices[3 * index] as usize,
            self.indices[3 * index + 1] as usize,
            self.indices[3 * index + 2] as usize,
        ]
    }

    pub fn triangle_positions(&self, index: usize) -> [glam::Vec3A; 3] {
        let [i0, i1, i2] = self.triangle(index);
        [self.positions[i0], self.positions[i1], self.positions[i2]]
    }

    pub fn triangle_bbox(&self, index: usize) -> Bbox {
        Bbox::from_points(&self.triangle_positions(index))
    }

    pub fn triangle_area(&self, index: usize) -> f32 {
        let [p0, p1, p2] = self.triangle_positions(index);
        (p1 - p0).cross(p2 - p0).length() * 0.5
    }

    pub fn positions(&self) -> &[glam::Vec3A] {
        &self.positions
    }

    pub fn normals(&self) -> Option<&[glam::Vec3A]> {
        present(&self.normals)
    }

    pub fn uvs(&self) -> Option<&[glam::Vec2]> {
        present(&self.uvs)
    }

    pub fn tangents(&self) -> Option<&[glam::Vec3A]> {
        present(&self.tangents)
    }

    /// Per-vertex normals, empty when the mesh has none.
    pub fn stored_normals(&self) -> &[glam::Vec3A] {
        &self.normals
    }

    pub fn stored_uvs(&self) -> &[glam::Vec2] {
        &self.uvs
    }

    pub fn stored_tangents(&self) -> &[glam::Vec3A] {
        &self.tangents
    }
}

impl SphereData {
    pub fn new(centers: Vec<glam::Vec3A>, radius: f32) -> Self {
        assert!(radius > 0.0, "sphere set: radius {} is not positive", radius);
        Self {
            centers,
            radii: Vec::new(),
            radius,
        }
    }

    pub fn with_radii(mut self, radii: Vec<f32>) -> Self {
        check_attribute_len(radii.len(), self.centers.len(), "sphere set", "radius");
        self.radii = radii;
        self
    }

    pub fn sphere_count(&self) -> usize {
        self.centers.len()
    }

    pub fn center(&self, index: usize) -> glam::Vec3A {
        self.centers[index]
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn radii(&self) -> Option<&[f32]> {
        present(&self.radii)
    }

    /// Per-sphere radii, empty when every sphere uses `radius`.
    pub fn stored_radii(&self) -> &[f32] {
        &self.radii
    }
}

impl SegmentData {
    pub fn new(positions: Vec<glam::Vec3A>, indices: Vec<u32>, radius: f32) -> Self {
        check_indices(&indices, 2, positions.len(), "segment set");
        assert!(radius > 0.0, "segment set: radius {} is not positive", radius);
        Self {
            positions,
            radii: Vec::new(),
            radius,
            tangents: Vec::new(),
            uvs: Vec::new(),
            indices,
        }
    }

    /// Consecutive points of one strand joined into segments.
    pub fn from_strand(points: Vec<glam::Vec3A>, radius: f32) -> Self {
        let indices = (1..points.len() as u32)
            .flat_map(|i| [i - 1, i])
            .collect::<Vec<_>>();
        Self::new(points, indices, radius)
    }

    pub fn with_radii(mut self, radii: Vec<f32>) -> Self {
        check_attribute_len(radii.len(), self.positions.len(), "segment set", "radius");
        self.radii = radii;
        self
    }

    pub fn with_tangents(mut self, tangents: Vec<glam::Vec3A>) -> Self {
        check_attribute_len(tangents.len(), self.positions.len(), "segment set", "tangent");
        self.tangents = tangents;
        self
    }

    pub fn with_uvs(mut self, uvs: Vec<glam::Vec2>) -> Self {
        check_attribute_len(uvs.len(), self.positions.len(), "segment set", "uv");
        self.uvs = uvs;
        self
    }

    pub fn segment_count(&self) -> usize {
        self.indices.len() / 2
    }

    pub fn segment(&self, index: usize) -> [usize; 2] {
        [
            self.indices[2 * index] as usize,
            self.indices[2 * index + 1] as usize,
        ]
    }

    pub fn segment_positions(&self, index: usize) -> [glam::Vec3A; 2] {
        let [i0, i1] = self.segment(index);
        [self.positions[i0], self.positions[i1]]
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn radii(&self) -> Option<&[f32]> {
        present(&self.radii)
    }

    pub fn tangents(&self) -> Option<&[glam::Vec3A]> {
        present(&self.tangents)
    }

    pub fn uvs(&self) -> Option<&[glam::Vec2]> {
        present(&self.uvs)
    }

    /// Per-vertex radii, empty when every vertex uses `radius`.
    pub fn stored_radii(&self) -> &[f32] {
        &self.radii
    }

    pub fn stored_tangents(&self) -> &[glam::Vec3A] {
        &self.tangents
    }

    pub fn stored_uvs(&self) -> &[glam::Vec2] {
        &self.uvs
    }
}
