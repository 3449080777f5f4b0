#![allow(dead_code)]

use comms::specs::machine_learning::InitSpec;
use machine_learning::{
    arch::{Sequential, layers::Layer},
    dataset::Dataset,
    placement::Cpu,
};
use orchestrator::{GlobalModel, SessionSettings};
use rand::{SeedableRng, rngs::StdRng};

/// A dataset over a grid of the unit square, labeled by which coordinate is larger.
pub fn diagonal_dataset(side: usize) -> Dataset {
    let mut features = Vec::new();
    let mut labels = Vec::new();

    for i in 0..side {
        for j in 0..side {
            if i == j {
                continue;
            }

            features.push(i as f32 / side as f32);
            features.push(j as f32 / side as f32);
            labels.push((i > j) as u32);
        }
    }

    Dataset::from_flat(2, &features, &labels).unwrap()
}

pub fn samples(n: usize) -> Dataset {
    let features: Vec<f32> = (0..n * 2).map(|i| (i % 7) as f32 / 7.0).collect();
    let labels: Vec<u32> = (0..n as u32).map(|i| i % 2).collect();
    Dataset::from_flat(2, &features, &labels).unwrap()
}

pub fn linear_model(init: InitSpec) -> GlobalModel {
    let model = Sequential::new(vec![Layer::dense((2, 2))]).unwrap();
    let params = model
        .init_params(init, &mut StdRng::seed_from_u64(5))
        .unwrap();
    GlobalModel::new(model, params, Cpu).unwrap()
}

pub fn settings(num_global_cycles: usize, batch_size: usize) -> SessionSettings {
    SessionSettings {
        num_global_cycles,
        batch_size,
        benchmark_workload: 4,
        train_samples: None,
    }
}

pub fn rng() -> StdRng {
    StdRng::seed_from_u64(42)
}
