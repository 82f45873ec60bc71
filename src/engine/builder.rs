use std::sync::Arc;

use crate::{
    accel::{AccelParams, BuildParams},
    core::{
        geometry::{SegmentData, SphereData, TriangleMeshData},
        material::MaterialRef,
        transform::{TimeInterval, Transform},
    },
};

use super::{
    DoubleSidedEngine, Engine, EngineT, GroupEngine, Instance, MeshEngine, SegmentEngine,
    SphereEngine,
};

#[derive(Clone)]
pub enum Shape {
    Mesh(Arc<TriangleMeshData>),
    Spheres(Arc<SphereData>),
    Segments(Arc<SegmentData>),
}

/// Finished geometry with its material and placement.
#[derive(Clone)]
pub struct Surface {
    pub shape: Shape,
    pub material: MaterialRef,
    pub transform: Option<Transform>,
    pub double_sided: bool,
}

impl Surface {
    pub fn new(shape: Shape, material: MaterialRef) -> Self {
        Self {
            shape,
            material,
            transform: None,
            double_sided: false,
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }

    pub fn double_sided(mut self) -> Self {
        self.double_sided = true;
        self
    }
}

#[derive(Clone, Default)]
pub struct InstanceDesc {
    pub transform: Option<Transform>,
    pub material: Option<MaterialRef>,
}

/// Surfaces built once into one engine and placed by every instance.
/// Member surfaces are only reachable through the instances.
#[derive(Clone, Default)]
pub struct InstanceGroup {
    pub members: Vec<usize>,
    pub instances: Vec<InstanceDesc>,
}

fn build_surface(surface: &Surface, params: &AccelParams, times: &[f32]) -> Engine {
    let material = surface.material.clone();
    let transform = surface.transform.clone();
    let engine: Engine = match &surface.shape {
        Shape::Mesh(mesh) => {
            MeshEngine::from_mesh(mesh.clone(), material, transform, params, times).into()
        }
        Shape::Spheres(spheres) => {
            SphereEngine::from_spheres(spheres.clone(), material, transform, params, times).into()
        }
        Shape::Segments(segments) => {
            SegmentEngine::from_segments(segments.clone(), material, transform, params, times)
                .into()
        }
    };
    if surface.double_sided {
        DoubleSidedEngine::new(Arc::new(engine)).into()
    } else {
        engine
    }
}

/// Builds the top-level engine of a scene.
///
/// Every surface gets its own leaf engine. Surfaces named by an instance
/// group are collected into one group engine per instance group, which
/// each of its instances then references. The top level is a group engine
/// over the remaining surfaces and all instances. Moving transforms are
/// bounded at `time_samples` instants spread over `interval`.
pub fn build_engine(
    surfaces: &[Surface],
    groups: &[InstanceGroup],
    interval: TimeInterval,
    time_samples: usize,
    params: &BuildParams,
) -> Engine {
    let times = interval.samples(time_samples.max(1));

    let mut grouped = vec![false; surfaces.len()];
    for (group_index, group) in groups.iter().enumerate() {
        for &member in &group.members {
            assert!(
                member < surfaces.len(),
                "instance group {}: member {} out of range for {} surfaces",
                group_index,
                member,
                surfaces.len()
            );
            grouped[member] = true;
        }
    }

    let engines = surfaces
        .iter()
        .map(|surface| Arc::new(build_surface(surface, &params.geometry, &times)))
        .collect::<Vec<_>>();

    let mut top = engines
        .iter()
        .zip(grouped.iter())
        .filter(|(_, grouped)| !**grouped)
        .map(|(engine, _)| Instance::new(engine.clone()))
        .collect::<Vec<_>>();

    for group in groups {
        let prototype = match group.members.as_slice() {
            [member] => engines[*member].clone(),
            members => Arc::new(
                GroupEngine::new(
                    members
                        .iter()
                        .map(|member| Instance::new(engines[*member].clone()))
                        .collect(),
                    &params.group,
                    &times,
                )
                .into(),
            ),
        };
        top.extend(group.instances.iter().map(|desc| {
            let mut instance = Instance::new(prototype.clone());
            if let Some(transform) = &desc.transform {
                instance = instance.with_transform(transform.clone());
            }
            if let Some(material) = &desc.material {
                instance = instance.with_material(material.clone());
            }
            instance
        }));
    }

    let engine: Engine = GroupEngine::new(top, &params.group, &times).into();
    log::info!("built scene engine: {}", engine.stats());
    engine
}
