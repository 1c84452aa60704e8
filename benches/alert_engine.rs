#![feature(test)]

extern crate test;

use std::collections::HashMap;
use std::sync::Arc;
use test::Bencher;
use watchpost::alerts::engine::{AlertEngine, AlertEngineOptions};
use watchpost::examples::{random_embedding, BoxWalk};
use watchpost::identity::embedding::FaceEmbedding;
use watchpost::identity::registry::InMemoryIdentityRegistry;
use watchpost::identity::IdentityGate;
use watchpost::objects::TrackedObject;
use watchpost::stationary::StationaryTracker;
use watchpost::zones::{Zone, ZoneRegistry};

const DIM: usize = 128;

#[bench]
fn bench_engine_0010_persons_0100_identities(b: &mut Bencher) {
    bench_engine(10, 100, b);
}

#[bench]
fn bench_engine_0100_persons_0100_identities(b: &mut Bencher) {
    bench_engine(100, 100, b);
}

#[bench]
fn bench_engine_0010_persons_1000_identities(b: &mut Bencher) {
    bench_engine(10, 1000, b);
}

fn bench_engine(persons: usize, known: usize, b: &mut Bencher) {
    let zones = Arc::new(ZoneRegistry::with_zones(HashMap::from([(
        "CAM_01".to_string(),
        vec![
            Zone::rect("No Entry", 0.0, 0.0, 400.0, 300.0),
            Zone::new("Stairs", vec![(800.0, 0.0), (1000.0, 0.0), (900.0, 200.0)]),
        ],
    )])));

    let identities = Arc::new(InMemoryIdentityRegistry::with_dimension(DIM));
    for _ in 0..known {
        identities
            .add(FaceEmbedding::from(random_embedding(DIM)), None)
            .unwrap();
    }

    let mut engine = AlertEngine::new(
        "CAM_01",
        zones,
        StationaryTracker::default(),
        IdentityGate::default(),
        identities,
        AlertEngineOptions::default(),
    );

    let mut walks = (0..persons)
        .map(|i| BoxWalk::new(20.0 * i as f32, 50.0, 40.0, 90.0, 3.0, 0.2))
        .collect::<Vec<_>>();
    let faces = (0..persons as u64)
        .map(|id| (id, FaceEmbedding::from(random_embedding(DIM))))
        .collect::<HashMap<_, _>>();

    b.iter(|| {
        let objects = walks
            .iter_mut()
            .enumerate()
            .map(|(id, w)| TrackedObject::person(id as u64, w.next().unwrap()))
            .collect::<Vec<_>>();
        engine.process(&objects, &faces)
    });
}
