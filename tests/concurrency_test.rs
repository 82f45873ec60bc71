mod common;

use std::sync::Arc;

use ray_engine::{
    accel::BuildParams,
    batch, build_engine,
    core::{intersection::Intersection, transform::TimeInterval},
    engine::{Shape, Surface},
    EngineT,
};

#[test]
fn shared_engine_answers_the_same_from_every_thread() {
    common::init_logging();
    let mut rng = common::rng(21);
    let surfaces = vec![
        Surface::new(
            Shape::Mesh(Arc::new(common::random_triangles(&mut rng, 400, 1.0))),
            common::material("tris"),
        ),
        Surface::new(
            Shape::Spheres(Arc::new(common::random_spheres(&mut rng, 50, 1.0))),
            common::material("balls"),
        ),
    ];
    let rays = common::random_rays(&mut rng, 512, 1.0);

    for accel in common::all_accels() {
        let engine = build_engine(&surfaces, &[], TimeInterval::ALWAYS, 1, &BuildParams::uniform(accel));
        let sequential = rays
            .iter()
            .map(|ray| {
                let mut ray = *ray;
                let mut inter = Intersection::default();
                engine.intersect(&mut ray, &mut inter).then(|| inter.t)
            })
            .collect::<Vec<_>>();

        let engine = &engine;
        let sequential = &sequential;
        let rays = &rays;
        crossbeam::scope(|scope| {
            for worker in 0..4 {
                scope.spawn(move |_| {
                    // each worker walks the rays in a different order
                    for i in (0..rays.len()).map(|i| (i * 7 + worker * 131) % rays.len()) {
                        let mut ray = rays[i];
                        let mut inter = Intersection::default();
                        let t = engine.intersect(&mut ray, &mut inter).then(|| inter.t);
                        assert_eq!(t, sequential[i]);
                        assert_eq!(engine.intersect_any(&rays[i]), sequential[i].is_some());
                    }
                });
            }
        })
        .unwrap();

        let batched = batch::intersect_batch(engine, rays).unwrap();
        assert_eq!(
            batched.iter().map(|hit| hit.as_ref().map(|inter| inter.t)).collect::<Vec<_>>(),
            *sequential
        );
        let occluded = batch::occluded_batch(engine, rays).unwrap();
        assert_eq!(
            occluded,
            sequential.iter().map(Option::is_some).collect::<Vec<_>>()
        );
    }
}
