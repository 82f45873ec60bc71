use std::convert::TryFrom;

use crate::{accel::sah::SahCost, core::loader::InputParams};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum KdSplit {
    /// Center of the node box along its longest axis.
    Median,
    /// Median primitive centroid along the longest axis.
    EqualCount,
    /// Best bounding-box edge by surface area heuristic.
    Sah,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BvhParams {
    pub max_prims_in_node: usize,
    pub sah: SahCost,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct KdTreeParams {
    pub split: KdSplit,
    pub max_prims_in_node: usize,
    /// None picks `8 + 1.3 * log2(n)`.
    pub max_depth: Option<usize>,
    pub sah: SahCost,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum AccelParams {
    Bvh(BvhParams),
    KdTree(KdTreeParams),
    List,
}

impl Default for BvhParams {
    fn default() -> Self {
        Self {
            max_prims_in_node: 4,
            sah: SahCost {
                traversal_cost: 0.125,
                intersect_cost: 1.0,
                empty_bonus: 0.5,
            },
        }
    }
}

impl Default for KdTreeParams {
    fn default() -> Self {
        Self {
            split: KdSplit::Sah,
            max_prims_in_node: 5,
            max_depth: None,
            sah: SahCost {
                traversal_cost: 1.0,
                intersect_cost: 80.0,
                empty_bonus: 0.5,
            },
        }
    }
}

impl Default for AccelParams {
    fn default() -> Self {
        AccelParams::Bvh(BvhParams::default())
    }
}

impl KdTreeParams {
    pub fn with_split(split: KdSplit) -> Self {
        Self {
            split,
            ..Default::default()
        }
    }
}

fn load_sah(params: &mut InputParams, default: SahCost) -> anyhow::Result<SahCost> {
    let sah = SahCost {
        traversal_cost: params.get_float_or("traversal_cost", default.traversal_cost)?,
        intersect_cost: params.get_float_or("intersect_cost", default.intersect_cost)?,
        empty_bonus: params.get_float_or("empty_bonus", default.empty_bonus)?,
    };
    if !(0.0..1.0).contains(&sah.empty_bonus) {
        anyhow::bail!(format!(
            "{} - 'empty_bonus' should be in [0, 1), got {}",
            params.name(),
            sah.empty_bonus
        ));
    }
    Ok(sah)
}

fn load_max_prims(params: &mut InputParams, default: usize) -> anyhow::Result<usize> {
    let max_prims = params.get_int_or("max_prims_in_node", default as i32)?;
    if max_prims < 1 {
        anyhow::bail!(format!(
            "{} - 'max_prims_in_node' should be positive, got {}",
            params.name(),
            max_prims
        ));
    }
    Ok(max_prims as usize)
}

impl AccelParams {
    pub fn load(params: &mut InputParams) -> anyhow::Result<Self> {
        let ty = params.get_str_or("type", "bvh")?;
        let res = match ty.as_str() {
            "bvh" => {
                let default = BvhParams::default();
                AccelParams::Bvh(BvhParams {
                    max_prims_in_node: load_max_prims(params, default.max_prims_in_node)?,
                    sah: load_sah(params, default.sah)?,
                })
            }
            "kdtree" => {
                let default = KdTreeParams::default();
                let split = match params.get_str_or("split", "sah")?.as_str() {
                    "median" => KdSplit::Median,
                    "equal_count" => KdSplit::EqualCount,
                    "sah" => KdSplit::Sah,
                    split => anyhow::bail!(format!(
                        "{} - unknown kd split '{}'",
                        params.name(),
                        split
                    )),
                };
                let max_depth = params.get_int_or("max_depth", -1)?;
                AccelParams::KdTree(KdTreeParams {
                    split,
                    max_prims_in_node: load_max_prims(params, default.max_prims_in_node)?,
                    max_depth: if max_depth < 0 {
                        None
                    } else {
                        Some(max_depth as usize)
                    },
                    sah: load_sah(params, default.sah)?,
                })
            }
            "list" => AccelParams::List,
            _ => anyhow::bail!(format!("{} - unknown accel type '{}'", params.name(), ty)),
        };

        params.check_unused_keys();

        Ok(res)
    }
}

/// Strategies for leaf geometry and for group engines, chosen independently.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct BuildParams {
    pub geometry: AccelParams,
    pub group: AccelParams,
}

impl BuildParams {
    pub fn uniform(accel: AccelParams) -> Self {
        Self {
            geometry: accel,
            group: accel,
        }
    }

    pub fn load(params: &mut InputParams) -> anyhow::Result<Self> {
        let geometry = if params.contains_key("geometry") {
            AccelParams::load(&mut params.take_params("geometry")?)?
        } else {
            AccelParams::default()
        };
        let group = if params.contains_key("group") {
            AccelParams::load(&mut params.take_params("group")?)?
        } else {
            AccelParams::default()
        };

        params.check_unused_keys();

        Ok(Self { geometry, group })
    }

    pub fn from_json(value: &serde_json::Value) -> anyhow::Result<Self> {
        let mut params = InputParams::try_from(value)?;
        params.set_name("accel".into());
        Self::load(&mut params)
    }
}
