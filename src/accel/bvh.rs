use std::cmp::Ordering;

use crate::core::{bbox::Bbox, intersection::Intersection, ray::Ray, stats::AccelStats};

use super::{BvhParams, PrimitiveSet, TRAVERSAL_STACK_SIZE};

const BUCKET_COUNT: usize = 12;
const EQUAL_COUNT_THRESHOLD: usize = 4;
const MAX_DEPTH: usize = TRAVERSAL_STACK_SIZE - 1;
/// Node offsets reach `2n - 1` and must fit in a `u32`.
const MAX_PRIMS: usize = (u32::MAX / 2) as usize;

/// Bounding volume hierarchy flattened depth-first: the first child of an
/// interior node is its successor in `nodes`.
pub struct BvhAccel {
    nodes: Vec<LinearBvhNode>,
    prim_indices: Vec<usize>,
    stats: AccelStats,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LinearBvhNode {
    pub bbox: Bbox,
    pub kind: LinearBvhNodeKind,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LinearBvhNodeKind {
    Leaf { prims_offset: u32, prim_count: u32 },
    Interior { second_child: u32, axis: u8 },
}

enum BuildNode {
    Leaf {
        bbox: Bbox,
        first: usize,
        count: usize,
    },
    Interior {
        bbox: Bbox,
        axis: usize,
        children: [Box<BuildNode>; 2],
    },
}

struct BuildPrim {
    index: usize,
    bbox: Bbox,
    centroid: glam::Vec3A,
}

#[derive(Copy, Clone, Default)]
struct Bucket {
    count: usize,
    bbox: Bbox,
}

fn compare_centroids(a: &BuildPrim, b: &BuildPrim, axis: usize) -> Ordering {
    a.centroid[axis]
        .partial_cmp(&b.centroid[axis])
        .unwrap_or(Ordering::Equal)
        .then(a.index.cmp(&b.index))
}

/// Moves the items matching `pred` to the front, returns their count.
fn partition<T>(items: &mut [T], pred: impl Fn(&T) -> bool) -> usize {
    let mut first = 0;
    for i in 0..items.len() {
        if pred(&items[i]) {
            items.swap(first, i);
            first += 1;
        }
    }
    first
}

struct BvhBuilder<'a> {
    params: &'a BvhParams,
    ordered: Vec<usize>,
    stats: AccelStats,
}

impl BvhBuilder<'_> {
    fn make_leaf(&mut self, prims: &[BuildPrim], bbox: Bbox, depth: usize) -> Box<BuildNode> {
        let first = self.ordered.len();
        self.ordered.extend(prims.iter().map(|prim| prim.index));
        self.stats.leaves += 1;
        self.stats.prim_refs += prims.len();
        self.stats.max_depth = self.stats.max_depth.max(depth);
        Box::new(BuildNode::Leaf {
            bbox,
            first,
            count: prims.len(),
        })
    }

    fn build_recursive(&mut self, prims: &mut [BuildPrim], depth: usize) -> Box<BuildNode> {
        self.stats.nodes += 1;
        let bbox = prims.iter().fold(Bbox::empty(), |bbox, prim| bbox.merge(prim.bbox));
        let count = prims.len();
        if count == 1 {
            return self.make_leaf(prims, bbox, depth);
        }
        if depth >= MAX_DEPTH {
            log::warn!("bvh: depth limit reached with {} primitives in one leaf", count);
            return self.make_leaf(prims, bbox, depth);
        }

        let centroid_bbox = prims
            .iter()
            .fold(Bbox::empty(), |bbox, prim| bbox.grow(prim.centroid));
        let axis = centroid_bbox.max_extent();
        if centroid_bbox.p_max[axis] == centroid_bbox.p_min[axis] {
            return self.make_leaf(prims, bbox, depth);
        }

        let mut mid = if count <= EQUAL_COUNT_THRESHOLD {
            0
        } else {
            let bucket_of = |prim: &BuildPrim| {
                let b = BUCKET_COUNT as f32 * centroid_bbox.offset(prim.centroid)[axis];
                (b as usize).min(BUCKET_COUNT - 1)
            };

            let mut buckets = [Bucket::default(); BUCKET_COUNT];
            for prim in prims.iter() {
                let bucket = &mut buckets[bucket_of(prim)];
                bucket.count += 1;
                bucket.bbox = bucket.bbox.merge(prim.bbox);
            }

            let parent_area = bbox.surface_area();
            let mut best_cost = f32::INFINITY;
            let mut best_split = 0;
            for split in 0..BUCKET_COUNT - 1 {
                let (below, above) = buckets.split_at(split + 1);
                let fold = |buckets: &[Bucket]| {
                    buckets.iter().fold((Bbox::empty(), 0), |(bbox, count), bucket| {
                        (bbox.merge(bucket.bbox), count + bucket.count)
                    })
                };
                let (below_bbox, below_count) = fold(below);
                let (above_bbox, above_count) = fold(above);
                let cost = self.params.sah.split_cost_by_area(
                    parent_area,
                    below_bbox.surface_area(),
                    below_count,
                    above_bbox.surface_area(),
                    above_count,
                );
                if cost < best_cost {
                    best_cost = cost;
                    best_split = split;
                }
            }

            if count <= self.params.max_prims_in_node
                && best_cost >= self.params.sah.leaf_cost(count)
            {
                return self.make_leaf(prims, bbox, depth);
            }
            partition(prims, |prim| bucket_of(prim) <= best_split)
        };

        if mid == 0 || mid == count {
            mid = count / 2;
            prims.select_nth_unstable_by(mid, |a, b| compare_centroids(a, b, axis));
        }

        let (below, above) = prims.split_at_mut(mid);
        let children = [
            self.build_recursive(below, depth + 1),
            self.build_recursive(above, depth + 1),
        ];
        Box::new(BuildNode::Interior {
            bbox,
            axis,
            children,
        })
    }
}

impl BvhAccel {
    pub fn build<P: PrimitiveSet>(prims: &P, params: &BvhParams) -> Self {
        assert!(
            prims.prim_count() <= MAX_PRIMS,
            "bvh: {} primitives exceed the {} a flattened node can address",
            prims.prim_count(),
            MAX_PRIMS
        );
        let mut build_prims = (0..prims.prim_count())
            .map(|index| {
                let bbox = prims.prim_bbox(index);
                BuildPrim {
                    index,
                    bbox,
                    centroid: bbox.centroid(),
                }
            })
            .collect::<Vec<_>>();

        let mut builder = BvhBuilder {
            params,
            ordered: Vec::with_capacity(build_prims.len()),
            stats: AccelStats::default(),
        };
        let mut nodes = Vec::new();
        if !build_prims.is_empty() {
            let root = builder.build_recursive(&mut build_prims, 0);
            nodes.reserve(builder.stats.nodes);
            Self::flatten(&root, &mut nodes);
        }

        assert_eq!(
            builder.ordered.len(),
            build_prims.len(),
            "bvh: ordered primitives do not cover the input"
        );
        log::debug!("bvh: {}", builder.stats);

        Self {
            nodes,
            prim_indices: builder.ordered,
            stats: builder.stats,
        }
    }

    fn flatten(node: &BuildNode, nodes: &mut Vec<LinearBvhNode>) -> usize {
        let offset = nodes.len();
        match node {
            BuildNode::Leaf { bbox, first, count } => nodes.push(LinearBvhNode {
                bbox: *bbox,
                kind: LinearBvhNodeKind::Leaf {
                    prims_offset: *first as u32,
                    prim_count: *count as u32,
                },
            }),
            BuildNode::Interior {
                bbox,
                axis,
                children,
            } => {
                nodes.push(LinearBvhNode {
                    bbox: *bbox,
                    kind: LinearBvhNodeKind::Interior {
                        second_child: 0,
                        axis: *axis as u8,
                    },
                });
                Self::flatten(&children[0], nodes);
                let second_child = Self::flatten(&children[1], nodes) as u32;
                nodes[offset].kind = LinearBvhNodeKind::Interior {
                    second_child,
                    axis: *axis as u8,
                };
            }
        }
        offset
    }

    pub fn nodes(&self) -> &[LinearBvhNode] {
        &self.nodes
    }

    /// Permutation of the input primitive indices, leaves index into it.
    pub fn prim_indices(&self) -> &[usize] {
        &self.prim_indices
    }

    pub fn bbox(&self) -> Bbox {
        self.nodes.first().map_or(Bbox::empty(), |root| root.bbox)
    }

    pub fn stats(&self) -> AccelStats {
        self.stats
    }

    fn leaf_prims(&self, prims_offset: u32, prim_count: u32) -> &[usize] {
        let start = prims_offset as usize;
        &self.prim_indices[start..start + prim_count as usize]
    }

    pub fn intersect<'a, P: PrimitiveSet>(
        &self,
        prims: &'a P,
        ray: &mut Ray,
        inter: &mut Intersection<'a>,
    ) -> bool {
        if self.nodes.is_empty() {
            return false;
        }

        let inv_dir = ray.inv_direction();
        let dir_is_neg = [inv_dir.x < 0.0, inv_dir.y < 0.0, inv_dir.z < 0.0];
        let mut stack = [0_usize; TRAVERSAL_STACK_SIZE];
        let mut to_visit = 0;
        let mut current = 0;
        let mut result = false;
        loop {
            let node = &self.nodes[current];
            if node.bbox.intersect_test(ray, inv_dir) {
                match node.kind {
                    LinearBvhNodeKind::Leaf {
                        prims_offset,
                        prim_count,
                    } => {
                        for &prim in self.leaf_prims(prims_offset, prim_count) {
                            if prims.intersect_prim(prim, ray, inter) {
                                ray.t_max = inter.t;
                                result = true;
                            }
                        }
                    }
                    LinearBvhNodeKind::Interior { second_child, axis } => {
                        if dir_is_neg[axis as usize] {
                            stack[to_visit] = current + 1;
                            current = second_child as usize;
                        } else {
                            stack[to_visit] = second_child as usize;
                            current += 1;
                        }
                        to_visit += 1;
                        continue;
                    }
                }
            }
            if to_visit == 0 {
                break;
            }
            to_visit -= 1;
            current = stack[to_visit];
        }
        result
    }

    pub fn intersect_any<P: PrimitiveSet>(&self, prims: &P, ray: &Ray) -> bool {
        if self.nodes.is_empty() {
            return false;
        }

        let inv_dir = ray.inv_direction();
        let dir_is_neg = [inv_dir.x < 0.0, inv_dir.y < 0.0, inv_dir.z < 0.0];
        let mut stack = [0_usize; TRAVERSAL_STACK_SIZE];
        let mut to_visit = 0;
        let mut current = 0;
        loop {
            let node = &self.nodes[current];
            if node.bbox.intersect_test(ray, inv_dir) {
                match node.kind {
                    LinearBvhNodeKind::Leaf {
                        prims_offset,
                        prim_count,
                    } => {
                        for &prim in self.leaf_prims(prims_offset, prim_count) {
                            if prims.intersect_prim_any(prim, ray) {
                                return true;
                            }
                        }
                    }
                    LinearBvhNodeKind::Interior { second_child, axis } => {
                        if dir_is_neg[axis as usize] {
                            stack[to_visit] = current + 1;
                            current = second_child as usize;
                        } else {
                            stack[to_visit] = second_child as usize;
                            current += 1;
                        }
                        to_visit += 1;
                        continue;
                    }
                }
            }
            if to_visit == 0 {
                break;
            }
            to_visit -= 1;
            current = stack[to_visit];
        }
        false
    }
}
