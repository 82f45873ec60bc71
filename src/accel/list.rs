use crate::core::{bbox::Bbox, intersection::Intersection, ray::Ray, stats::AccelStats};

use super::PrimitiveSet;

/// Tests every primitive, in index order.
pub struct ListAccel {
    prim_count: usize,
    bbox: Bbox,
}

impl ListAccel {
    pub fn build<P: PrimitiveSet>(prims: &P) -> Self {
        let prim_count = prims.prim_count();
        let bbox = (0..prim_count).fold(Bbox::empty(), |bbox, index| bbox.merge(prims.prim_bbox(index)));
        Self { prim_count, bbox }
    }

    pub fn bbox(&self) -> Bbox {
        self.bbox
    }

    pub fn stats(&self) -> AccelStats {
        AccelStats {
            nodes: 1,
            leaves: 1,
            prim_refs: self.prim_count,
            max_depth: 0,
        }
    }

    pub fn intersect<'a, P: PrimitiveSet>(
        &self,
        prims: &'a P,
        ray: &mut Ray,
        inter: &mut Intersection<'a>,
    ) -> bool {
        let mut result = false;
        for index in 0..self.prim_count {
            if prims.intersect_prim(index, ray, inter) {
                ray.t_max = inter.t;
                result = true;
            }
        }
        result
    }

    pub fn intersect_any<P: PrimitiveSet>(&self, prims: &P, ray: &Ray) -> bool {
        (0..self.prim_count).any(|index| prims.intersect_prim_any(index, ray))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accel::test_util::CountingSpheres;

    #[test]
    fn finds_nearest_of_all() {
        let spheres = CountingSpheres::new(
            vec![
                glam::Vec3A::new(0.0, 0.0, 10.0),
                glam::Vec3A::new(0.0, 0.0, 4.0),
                glam::Vec3A::new(0.0, 5.0, 4.0),
            ],
            1.0,
        );
        let list = ListAccel::build(&spheres);
        let mut ray = Ray::new(glam::Vec3A::ZERO, glam::Vec3A::Z);
        let mut inter = Intersection::default();
        assert!(list.intersect(&spheres, &mut ray, &mut inter));
        assert_eq!(inter.t, 3.0);
        assert_eq!(inter.dg.st.x, 1.0);
        assert_eq!(ray.t_max, 3.0);
        assert_eq!(list.stats().prim_refs, 3);
        assert_eq!(list.bbox().p_max, glam::Vec3A::new(1.0, 6.0, 11.0));
    }
}
