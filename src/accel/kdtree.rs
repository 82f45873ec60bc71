use std::cmp::Ordering;

use crate::core::{
    bbox::Bbox,
    intersection::Intersection,
    mailbox::{HashMailbox, MailboxT},
    ray::Ray,
    stats::AccelStats,
};

use super::{KdSplit, KdTreeParams, PrimitiveSet, TRAVERSAL_STACK_SIZE};

const LEAF_AXIS: u32 = 3;
const AXIS_MASK: u32 = 0b11;
const HAS_LEFT: u32 = 1 << 2;
const HAS_RIGHT: u32 = 1 << 3;
const PAYLOAD_SHIFT: u32 = 4;
const MAX_DEPTH: usize = TRAVERSAL_STACK_SIZE - 1;
const MAX_PAYLOAD: usize = (u32::MAX >> PAYLOAD_SHIFT) as usize;
const MAX_BAD_REFINES: usize = 3;
const SAH_AXIS_RETRIES: usize = 2;

/// Compressed kd-tree node.
///
/// `flags` holds the axis in bits 0-1 (3 for leaves), the has-left and
/// has-right bits, and a payload above them: the primitive count of a leaf
/// or the index of the right child of an interior node. The left child of
/// an interior node is always its successor in the node array.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct KdNode {
    split: f32,
    prim_offset: u32,
    flags: u32,
}

fn payload(value: usize, what: &str) -> u32 {
    assert!(
        value <= MAX_PAYLOAD,
        "kdtree: {} {} does not fit in a node (max {})",
        what,
        value,
        MAX_PAYLOAD
    );
    (value as u32) << PAYLOAD_SHIFT
}

impl KdNode {
    fn leaf(prim_offset: usize, prim_count: usize) -> Self {
        assert!(
            prim_offset <= u32::MAX as usize,
            "kdtree: primitive offset {} does not fit in a node",
            prim_offset
        );
        Self {
            split: 0.0,
            prim_offset: prim_offset as u32,
            flags: LEAF_AXIS | payload(prim_count, "leaf primitive count"),
        }
    }

    fn interior(axis: usize, split: f32) -> Self {
        Self {
            split,
            prim_offset: 0,
            flags: axis as u32,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.flags & AXIS_MASK == LEAF_AXIS
    }

    pub fn axis(&self) -> usize {
        (self.flags & AXIS_MASK) as usize
    }

    pub fn split(&self) -> f32 {
        self.split
    }

    pub fn prim_count(&self) -> usize {
        debug_assert!(self.is_leaf());
        (self.flags >> PAYLOAD_SHIFT) as usize
    }

    pub fn has_left(&self) -> bool {
        self.flags & HAS_LEFT != 0
    }

    pub fn has_right(&self) -> bool {
        self.flags & HAS_RIGHT != 0
    }

    pub fn right_child(&self) -> usize {
        debug_assert!(!self.is_leaf());
        (self.flags >> PAYLOAD_SHIFT) as usize
    }
}

/// Kd-tree whose leaves may share primitives: membership is decided by
/// bounding box overlap with each half space, so queries go through a
/// mailbox to test every primitive at most once.
pub struct KdTreeAccel {
    nodes: Vec<KdNode>,
    prim_indices: Vec<usize>,
    bounds: Bbox,
    stats: AccelStats,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum EdgeKind {
    Start,
    End,
}

#[derive(Copy, Clone)]
struct BoundEdge {
    t: f32,
    kind: EdgeKind,
    prim: usize,
}

enum Decision {
    Leaf,
    Split { axis: usize, split: f32 },
}

struct KdBuilder<'a> {
    params: &'a KdTreeParams,
    prim_bboxes: Vec<Bbox>,
    nodes: Vec<KdNode>,
    prim_indices: Vec<usize>,
    stats: AccelStats,
}

impl KdBuilder<'_> {
    fn make_leaf(&mut self, prims: &[usize], depth: usize) {
        self.nodes.push(KdNode::leaf(self.prim_indices.len(), prims.len()));
        self.prim_indices.extend_from_slice(prims);
        self.stats.leaves += 1;
        self.stats.prim_refs += prims.len();
        self.stats.max_depth = self.stats.max_depth.max(depth);
    }

    fn build_recursive(
        &mut self,
        bounds: Bbox,
        prims: &[usize],
        depth_left: usize,
        mut bad_refines: usize,
        depth: usize,
    ) {
        self.stats.nodes += 1;
        if prims.len() <= self.params.max_prims_in_node || depth_left == 0 {
            self.make_leaf(prims, depth);
            return;
        }

        let decision = match self.params.split {
            KdSplit::Median => self.median_split(bounds),
            KdSplit::EqualCount => self.equal_count_split(bounds, prims),
            KdSplit::Sah => self.sah_split(bounds, prims, &mut bad_refines),
        };
        let (axis, split) = match decision {
            Decision::Leaf => {
                self.make_leaf(prims, depth);
                return;
            }
            Decision::Split { axis, split } => (axis, split),
        };

        let mut below = Vec::with_capacity(prims.len());
        let mut above = Vec::with_capacity(prims.len());
        for &prim in prims {
            let bbox = &self.prim_bboxes[prim];
            let (min, max) = (bbox.p_min[axis], bbox.p_max[axis]);
            let on_plane = min == split && max == split;
            if min < split || on_plane {
                below.push(prim);
            }
            if max > split || on_plane {
                above.push(prim);
            }
        }

        if self.params.split != KdSplit::Sah
            && below.len() == prims.len()
            && above.len() == prims.len()
        {
            self.make_leaf(prims, depth);
            return;
        }

        let node_index = self.nodes.len();
        self.nodes.push(KdNode::interior(axis, split));
        let mut flags = axis as u32;

        if !below.is_empty() {
            let mut below_bounds = bounds;
            below_bounds.p_max[axis] = split;
            flags |= HAS_LEFT;
            self.build_recursive(below_bounds, &below, depth_left - 1, bad_refines, depth + 1);
        }
        if !above.is_empty() {
            let mut above_bounds = bounds;
            above_bounds.p_min[axis] = split;
            flags |= HAS_RIGHT | payload(self.nodes.len(), "right child index");
            self.build_recursive(above_bounds, &above, depth_left - 1, bad_refines, depth + 1);
        }
        self.nodes[node_index].flags = flags;
    }

    fn median_split(&self, bounds: Bbox) -> Decision {
        let axis = bounds.max_extent();
        let split = 0.5 * (bounds.p_min[axis] + bounds.p_max[axis]);
        if split > bounds.p_min[axis] && split < bounds.p_max[axis] {
            Decision::Split { axis, split }
        } else {
            Decision::Leaf
        }
    }

    fn equal_count_split(&self, bounds: Bbox, prims: &[usize]) -> Decision {
        let axis = bounds.max_extent();
        let mut centroids = prims
            .iter()
            .map(|&prim| self.prim_bboxes[prim].centroid()[axis])
            .collect::<Vec<_>>();
        let mid = centroids.len() / 2;
        let (_, &mut split, _) = centroids
            .select_nth_unstable_by(mid, |a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        if split > bounds.p_min[axis] && split < bounds.p_max[axis] {
            Decision::Split { axis, split }
        } else {
            self.median_split(bounds)
        }
    }

    fn sah_split(&self, bounds: Bbox, prims: &[usize], bad_refines: &mut usize) -> Decision {
        let sah = &self.params.sah;
        let total_area = bounds.surface_area();
        let diagonal = bounds.diagonal();
        let leaf_cost = sah.leaf_cost(prims.len());

        let mut best: Option<(usize, f32)> = None;
        let mut best_cost = f32::INFINITY;
        let mut axis = bounds.max_extent();
        let mut edges = Vec::with_capacity(2 * prims.len());
        for _ in 0..=SAH_AXIS_RETRIES {
            edges.clear();
            for &prim in prims {
                let bbox = &self.prim_bboxes[prim];
                edges.push(BoundEdge {
                    t: bbox.p_min[axis],
                    kind: EdgeKind::Start,
                    prim,
                });
                edges.push(BoundEdge {
                    t: bbox.p_max[axis],
                    kind: EdgeKind::End,
                    prim,
                });
            }
            edges.sort_unstable_by(|a, b| {
                a.t.partial_cmp(&b.t)
                    .unwrap_or(Ordering::Equal)
                    .then(a.kind.cmp(&b.kind))
                    .then(a.prim.cmp(&b.prim))
            });

            let other0 = (axis + 1) % 3;
            let other1 = (axis + 2) % 3;
            let cap_area = diagonal[other0] * diagonal[other1];
            let side = diagonal[other0] + diagonal[other1];
            let mut n_below = 0;
            let mut n_above = prims.len();
            for edge in &edges {
                if edge.kind == EdgeKind::End {
                    n_above -= 1;
                }
                if edge.t > bounds.p_min[axis] && edge.t < bounds.p_max[axis] {
                    let below_area = 2.0 * (cap_area + (edge.t - bounds.p_min[axis]) * side);
                    let above_area = 2.0 * (cap_area + (bounds.p_max[axis] - edge.t) * side);
                    let cost = sah.split_cost_by_area(
                        total_area, below_area, n_below, above_area, n_above,
                    );
                    if cost < best_cost {
                        best_cost = cost;
                        best = Some((axis, edge.t));
                    }
                }
                if edge.kind == EdgeKind::Start {
                    n_below += 1;
                }
            }

            if best.is_some() {
                break;
            }
            axis = (axis + 1) % 3;
        }

        if best_cost > leaf_cost {
            *bad_refines += 1;
        }
        match best {
            Some((axis, split))
                if !(best_cost > 4.0 * leaf_cost && prims.len() < 16)
                    && *bad_refines < MAX_BAD_REFINES =>
            {
                Decision::Split { axis, split }
            }
            _ => Decision::Leaf,
        }
    }
}

/// `(first, second, t_plane)` visit order of the children of an interior node.
type ChildOrder = (Option<usize>, Option<usize>, f32);

impl KdTreeAccel {
    pub fn build<P: PrimitiveSet>(prims: &P, params: &KdTreeParams) -> Self {
        let prim_count = prims.prim_count();
        let prim_bboxes = (0..prim_count)
            .map(|index| prims.prim_bbox(index))
            .collect::<Vec<_>>();
        let bounds = prim_bboxes
            .iter()
            .fold(Bbox::empty(), |bounds, bbox| bounds.merge(*bbox));

        let mut builder = KdBuilder {
            params,
            prim_bboxes,
            nodes: Vec::new(),
            prim_indices: Vec::new(),
            stats: AccelStats::default(),
        };
        if prim_count > 0 {
            let default_depth = (8.0 + 1.3 * (prim_count as f32).log2()).round() as usize;
            let mut max_depth = params.max_depth.unwrap_or(default_depth);
            if max_depth > MAX_DEPTH {
                log::warn!(
                    "kdtree: max depth {} clamped to {} to fit the traversal stack",
                    max_depth,
                    MAX_DEPTH
                );
                max_depth = MAX_DEPTH;
            }
            let all = (0..prim_count).collect::<Vec<_>>();
            builder.build_recursive(bounds, &all, max_depth, 0, 0);
        }
        log::debug!("kdtree ({:?} split): {}", params.split, builder.stats);

        Self {
            nodes: builder.nodes,
            prim_indices: builder.prim_indices,
            bounds,
            stats: builder.stats,
        }
    }

    pub fn nodes(&self) -> &[KdNode] {
        &self.nodes
    }

    /// Primitive indices referenced by a leaf node.
    pub fn leaf_prims(&self, node: &KdNode) -> &[usize] {
        let start = node.prim_offset as usize;
        &self.prim_indices[start..start + node.prim_count()]
    }

    pub fn bbox(&self) -> Bbox {
        self.bounds
    }

    pub fn stats(&self) -> AccelStats {
        self.stats
    }

    fn child_order(&self, index: usize, node: &KdNode, ray: &Ray, inv_dir: glam::Vec3A) -> ChildOrder {
        let axis = node.axis();
        let left = if node.has_left() { Some(index + 1) } else { None };
        let right = if node.has_right() {
            Some(node.right_child())
        } else {
            None
        };
        let origin = ray.origin[axis];
        let below_first =
            origin < node.split || (origin == node.split && ray.direction[axis] <= 0.0);
        let t_plane = (node.split - origin) * inv_dir[axis];
        if below_first {
            (left, right, t_plane)
        } else {
            (right, left, t_plane)
        }
    }

    /// Nearest hit with a fresh stack-local mailbox.
    pub fn intersect<'a, P: PrimitiveSet>(
        &self,
        prims: &'a P,
        ray: &mut Ray,
        inter: &mut Intersection<'a>,
    ) -> bool {
        let mut mailbox = HashMailbox::new();
        self.intersect_with_mailbox(prims, ray, inter, &mut mailbox)
    }

    pub fn intersect_any<P: PrimitiveSet>(&self, prims: &P, ray: &Ray) -> bool {
        let mut mailbox = HashMailbox::new();
        self.intersect_any_with_mailbox(prims, ray, &mut mailbox)
    }

    /// Nearest hit. The caller owns `mailbox` and must reset it between
    /// queries if it outlives one.
    pub fn intersect_with_mailbox<'a, P: PrimitiveSet, M: MailboxT>(
        &self,
        prims: &'a P,
        ray: &mut Ray,
        inter: &mut Intersection<'a>,
        mailbox: &mut M,
    ) -> bool {
        if self.nodes.is_empty() {
            return false;
        }
        let inv_dir = ray.inv_direction();
        let (mut t_min, mut t_max) = match self.bounds.intersect_ray(ray, inv_dir) {
            Some(range) => range,
            None => return false,
        };

        let mut stack = [(0_usize, 0.0_f32, 0.0_f32); TRAVERSAL_STACK_SIZE];
        let mut to_visit = 0;
        let mut current = Some(0);
        let mut result = false;
        loop {
            if let Some(index) = current {
                if ray.t_max < t_min {
                    break;
                }
                let node = &self.nodes[index];
                if node.is_leaf() {
                    for &prim in self.leaf_prims(node) {
                        if mailbox.first_visit(prim) && prims.intersect_prim(prim, ray, inter) {
                            ray.t_max = inter.t;
                            result = true;
                        }
                    }
                    current = None;
                } else {
                    let (first, second, t_plane) = self.child_order(index, node, ray, inv_dir);
                    if ray.direction[node.axis()] == 0.0 || t_plane > t_max || t_plane <= 0.0 {
                        current = first;
                    } else if t_plane < t_min {
                        current = second;
                    } else {
                        if let Some(second) = second {
                            stack[to_visit] = (second, t_plane, t_max);
                            to_visit += 1;
                        }
                        current = first;
                        t_max = t_plane;
                    }
                }
                continue;
            }
            if to_visit == 0 {
                break;
            }
            to_visit -= 1;
            let (index, node_t_min, node_t_max) = stack[to_visit];
            current = Some(index);
            t_min = node_t_min;
            t_max = node_t_max;
        }
        result
    }

    pub fn intersect_any_with_mailbox<P: PrimitiveSet, M: MailboxT>(
        &self,
        prims: &P,
        ray: &Ray,
        mailbox: &mut M,
    ) -> bool {
        if self.nodes.is_empty() {
            return false;
        }
        let inv_dir = ray.inv_direction();
        let (mut t_min, mut t_max) = match self.bounds.intersect_ray(ray, inv_dir) {
            Some(range) => range,
            None => return false,
        };

        let mut stack = [(0_usize, 0.0_f32, 0.0_f32); TRAVERSAL_STACK_SIZE];
        let mut to_visit = 0;
        let mut current = Some(0);
        loop {
            if let Some(index) = current {
                let node = &self.nodes[index];
                if node.is_leaf() {
                    for &prim in self.leaf_prims(node) {
                        if mailbox.first_visit(prim) && prims.intersect_prim_any(prim, ray) {
                            return true;
                        }
                    }
                    current = None;
                } else {
                    let (first, second, t_plane) = self.child_order(index, node, ray, inv_dir);
                    if ray.direction[node.axis()] == 0.0 || t_plane > t_max || t_plane <= 0.0 {
                        current = first;
                    } else if t_plane < t_min {
                        current = second;
                    } else {
                        if let Some(second) = second {
                            stack[to_visit] = (second, t_plane, t_max);
                            to_visit += 1;
                        }
                        current = first;
                        t_max = t_plane;
                    }
                }
                continue;
            }
            if to_visit == 0 {
                break;
            }
            to_visit -= 1;
            let (index, node_t_min, node_t_max) = stack[to_visit];
            current = Some(index);
            t_min = node_t_min;
            t_max = node_t_max;
        }
        false
    }
}
