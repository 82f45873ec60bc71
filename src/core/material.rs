use std::sync::Arc;

use crate::core::intersection::DifferentialGeometry;

/// Opaque material handle carried by hit records. The only behavior the
/// intersection core invokes is the occlusion test of any-hit queries.
pub trait Material: Send + Sync {
    fn name(&self) -> &str;

    /// Whether `occludes` may ever return false.
    fn is_alpha_tested(&self) -> bool {
        false
    }

    fn occludes(&self, _dg: &DifferentialGeometry) -> bool {
        true
    }
}

pub type MaterialRef = Arc<dyn Material>;

pub struct OpaqueMaterial {
    name: String,
}

impl OpaqueMaterial {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Material for OpaqueMaterial {
    fn name(&self) -> &str {
        &self.name
    }
}

pub type AlphaFn = dyn Fn(glam::Vec2) -> f32 + Send + Sync;

/// Alpha-tested material, hits whose alpha at the surface uv is below the
/// cutoff do not block any-hit queries.
pub struct AlphaMaskMaterial {
    name: String,
    alpha: Arc<AlphaFn>,
    cutoff: f32,
}

impl AlphaMaskMaterial {
    pub fn new(name: impl Into<String>, alpha: Arc<AlphaFn>, cutoff: f32) -> Self {
        Self {
            name: name.into(),
            alpha,
            cutoff,
        }
    }
}

impl Material for AlphaMaskMaterial {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_alpha_tested(&self) -> bool {
        true
    }

    fn occludes(&self, dg: &DifferentialGeometry) -> bool {
        (self.alpha)(dg.uv) >= self.cutoff
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alpha_mask_cuts_by_uv() {
        let mat = AlphaMaskMaterial::new(
            "leaf",
            Arc::new(|uv: glam::Vec2| if uv.x < 0.5 { 0.0 } else { 1.0 }),
            0.5,
        );
        let mut dg = DifferentialGeometry::default();
        dg.uv = glam::Vec2::new(0.25, 0.0);
        assert!(!mat.occludes(&dg));
        dg.uv = glam::Vec2::new(0.75, 0.0);
        assert!(mat.occludes(&dg));
        assert!(mat.is_alpha_tested());
        assert!(!OpaqueMaterial::new("gray").is_alpha_tested());
    }
}
