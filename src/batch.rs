//! Many queries against one engine on scoped worker threads. Engines are
//! immutable once built, so workers share them by reference without locks.

use crate::{
    core::{intersection::Intersection, ray::Ray},
    engine::{Engine, EngineT},
};

fn chunk_size(len: usize) -> usize {
    let workers = num_cpus::get().max(1);
    ((len + workers - 1) / workers).max(1)
}

/// Nearest hit of every ray, in ray order.
pub fn intersect_batch<'a>(
    engine: &'a Engine,
    rays: &[Ray],
) -> anyhow::Result<Vec<Option<Intersection<'a>>>> {
    let mut results = Vec::with_capacity(rays.len());
    results.resize_with(rays.len(), || None);
    let chunk = chunk_size(rays.len());

    crossbeam::scope(|scope| {
        for (rays, results) in rays.chunks(chunk).zip(results.chunks_mut(chunk)) {
            scope.spawn(move |_| {
                for (ray, result) in rays.iter().zip(results.iter_mut()) {
                    let mut ray = *ray;
                    let mut inter = Intersection::default();
                    if engine.intersect(&mut ray, &mut inter) {
                        *result = Some(inter);
                    }
                }
            });
        }
    })
    .map_err(|_| anyhow::anyhow!("a batch intersection worker panicked"))?;

    Ok(results)
}

/// Whether each ray is blocked inside its own interval, in ray order.
pub fn occluded_batch(engine: &Engine, rays: &[Ray]) -> anyhow::Result<Vec<bool>> {
    let mut results = vec![false; rays.len()];
    let chunk = chunk_size(rays.len());

    crossbeam::scope(|scope| {
        for (rays, results) in rays.chunks(chunk).zip(results.chunks_mut(chunk)) {
            scope.spawn(move |_| {
                for (ray, result) in rays.iter().zip(results.iter_mut()) {
                    *result = engine.intersect_any(ray);
                }
            });
        }
    })
    .map_err(|_| anyhow::anyhow!("a batch occlusion worker panicked"))?;

    Ok(results)
}
