use std::fmt;

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct AccelStats {
    pub nodes: usize,
    pub leaves: usize,
    /// Primitive references stored in leaves, larger than the primitive count
    /// when leaves overlap.
    pub prim_refs: usize,
    pub max_depth: usize,
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct EngineStats {
    pub engines: usize,
    pub primitives: usize,
    pub instances: usize,
    pub accel: AccelStats,
}

impl AccelStats {
    pub fn merge(self, another: AccelStats) -> Self {
        Self {
            nodes: self.nodes + another.nodes,
            leaves: self.leaves + another.leaves,
            prim_refs: self.prim_refs + another.prim_refs,
            max_depth: self.max_depth.max(another.max_depth),
        }
    }
}

impl EngineStats {
    pub fn merge(self, another: EngineStats) -> Self {
        Self {
            engines: self.engines + another.engines,
            primitives: self.primitives + another.primitives,
            instances: self.instances + another.instances,
            accel: self.accel.merge(another.accel),
        }
    }
}

impl fmt::Display for AccelStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} nodes, {} leaves, {} prim refs, depth {}",
            self.nodes, self.leaves, self.prim_refs, self.max_depth
        )
    }
}

impl fmt::Display for EngineStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} engines, {} primitives, {} instances ({})",
            self.engines, self.primitives, self.instances, self.accel
        )
    }
}
