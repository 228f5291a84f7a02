//! Benchmarks for the per-frame decision path

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use touchless_atm::{
    face_gate::FaceGate,
    gesture::{GestureLabel, Observation},
    pointing::{Keypoint, PointingClassifier, Pose, ZoneThresholds},
    utils::BoundingBox,
    validator::{GestureValidator, IdlePolicy},
};

const LABELS: [GestureLabel; 5] = [
    GestureLabel::Left,
    GestureLabel::Center,
    GestureLabel::Right,
    GestureLabel::Free,
    GestureLabel::None,
];

fn benchmark_validator(c: &mut Criterion) {
    let mut group = c.benchmark_group("validator");

    // Noisy classifier output: mostly one label with random flicker
    let observations: Vec<Observation> = (0..1000u64)
        .map(|i| {
            let label = if rand::random::<f32>() < 0.8 {
                GestureLabel::Center
            } else {
                LABELS[rand::random::<usize>() % LABELS.len()]
            };
            Observation::new(label, 0.7 + 0.3 * rand::random::<f32>(), i)
        })
        .collect();

    for policy in [IdlePolicy::Ignore, IdlePolicy::Reset] {
        group.bench_with_input(
            BenchmarkId::new("observe_1000", format!("{:?}", policy)),
            &observations,
            |b, observations| {
                b.iter(|| {
                    let mut validator = GestureValidator::new(5, 0.85).with_idle_policy(policy);
                    observations
                        .iter()
                        .filter_map(|o| validator.observe(black_box(o)))
                        .count()
                });
            },
        );
    }

    group.finish();
}

fn benchmark_face_gate(c: &mut Criterion) {
    let faces = vec![
        BoundingBox::new(270.0, 190.0, 100.0, 100.0),
        BoundingBox::new(20.0, 20.0, 60.0, 60.0),
        BoundingBox::new(500.0, 300.0, 40.0, 40.0),
    ];

    c.bench_function("face_gate_evaluate", |b| {
        let mut gate = FaceGate::new(30, 0.6);
        b.iter(|| black_box(gate.evaluate(Ok(faces.clone()), (640, 480))));
    });
}

fn benchmark_pointing(c: &mut Criterion) {
    let mut keypoints = vec![Keypoint::default(); 17];
    keypoints[8] = Keypoint::new(400.0, 300.0, 0.9);
    keypoints[10] = Keypoint::new(480.0, 300.0, 0.9);
    let pose = Pose::new(keypoints);
    let classifier = PointingClassifier::new((), ZoneThresholds::default(), 0.3);

    c.bench_function("pointing_observe_pose", |b| {
        b.iter(|| black_box(classifier.observe_pose(Some(black_box(&pose)), (640, 480), 0)));
    });
}

criterion_group!(benches, benchmark_validator, benchmark_face_gate, benchmark_pointing);
criterion_main!(benches);
