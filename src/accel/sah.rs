/// Surface area heuristic cost model shared by the BVH and kd-tree builders.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SahCost {
    pub traversal_cost: f32,
    pub intersect_cost: f32,
    /// Fraction of the intersection cost waived when one side is empty.
    pub empty_bonus: f32,
}

impl SahCost {
    pub fn leaf_cost(&self, prim_count: usize) -> f32 {
        self.intersect_cost * prim_count as f32
    }

    /// `p_below`/`p_above` are the probabilities of a ray through the parent
    /// also passing through each child.
    pub fn split_cost(&self, p_below: f32, n_below: usize, p_above: f32, n_above: usize) -> f32 {
        let bonus = if n_below == 0 || n_above == 0 {
            self.empty_bonus
        } else {
            0.0
        };
        self.traversal_cost
            + self.intersect_cost
                * (1.0 - bonus)
                * (p_below * n_below as f32 + p_above * n_above as f32)
    }

    pub fn split_cost_by_area(
        &self,
        parent_area: f32,
        below_area: f32,
        n_below: usize,
        above_area: f32,
        n_above: usize,
    ) -> f32 {
        if parent_area > 0.0 {
            let inv_area = 1.0 / parent_area;
            self.split_cost(below_area * inv_area, n_below, above_area * inv_area, n_above)
        } else {
            self.split_cost(1.0, n_below, 1.0, n_above)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_side_gets_bonus() {
        let sah = SahCost {
            traversal_cost: 1.0,
            intersect_cost: 80.0,
            empty_bonus: 0.5,
        };
        assert_eq!(sah.leaf_cost(4), 320.0);
        assert_eq!(sah.split_cost(0.5, 2, 0.5, 2), 1.0 + 80.0 * 2.0);
        assert_eq!(sah.split_cost(0.0, 0, 0.5, 4), 1.0 + 40.0 * 2.0);
    }

    #[test]
    fn degenerate_parent_area_counts_everything() {
        let sah = SahCost {
            traversal_cost: 0.125,
            intersect_cost: 1.0,
            empty_bonus: 0.0,
        };
        assert_eq!(sah.split_cost_by_area(0.0, 0.0, 3, 0.0, 2), 5.125);
        assert_eq!(sah.split_cost_by_area(4.0, 1.0, 4, 2.0, 2), 0.125 + 1.0 + 1.0);
    }
}
