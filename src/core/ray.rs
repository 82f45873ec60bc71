#[derive(Debug, Copy, Clone)]
pub struct Ray {
    pub origin: glam::Vec3A,
    pub direction: glam::Vec3A,
    pub t_min: f32,
    /// Shrinks as nearer hits are found during a nearest-hit query.
    pub t_max: f32,
    pub time: f32,
}

impl Ray {
    pub fn new(origin: glam::Vec3A, direction: glam::Vec3A) -> Self {
        Self {
            origin,
            direction,
            t_min: 0.0,
            t_max: f32::INFINITY,
            time: 0.0,
        }
    }

    pub fn with_range(mut self, t_min: f32, t_max: f32) -> Self {
        self.t_min = t_min;
        self.t_max = t_max;
        self
    }

    pub fn at_time(mut self, time: f32) -> Self {
        self.time = time;
        self
    }

    pub fn point_at(&self, t: f32) -> glam::Vec3A {
        self.origin + self.direction * t
    }

    pub fn inv_direction(&self) -> glam::Vec3A {
        glam::Vec3A::ONE / self.direction
    }

    /// The direction is not renormalized, so parametric distances are shared
    /// between the two spaces.
    pub fn transformed_by(self, trans: glam::Affine3A) -> Self {
        let origin = trans.transform_point3a(self.origin);
        let direction = trans.transform_vector3a(self.direction);
        Self {
            origin,
            direction,
            ..self
        }
    }
}
