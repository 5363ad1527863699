use std::env;
use std::fs::File;
use std::path::PathBuf;
use std::process;

use anyhow::Context;
use log::info;
use ndarray::{Array1, ArrayD, IxDyn};
use ndarray_rand::RandomExt;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::Normal;

use nn_solver::data::io::load_cifar10;
use nn_solver::data::{BatchIter, Dataset};
use nn_solver::model::TwoLayerNet;
use nn_solver::solver::{Solver, SolverConfig};

const HIDDEN_DIM: usize = 100;
const BATCH_SIZE: usize = 128;

fn usage(program: &str) -> ! {
    eprintln!("Usage: {program} [--config <path.json>] [--data <cifar10_dir>]");
    process::exit(1);
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let mut config_path: Option<PathBuf> = None;
    let mut data_dir: Option<PathBuf> = None;

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => match iter.next() {
                Some(path) => config_path = Some(PathBuf::from(path)),
                None => usage(&args[0]),
            },
            "--data" => match iter.next() {
                Some(dir) => data_dir = Some(PathBuf::from(dir)),
                None => usage(&args[0]),
            },
            _ => usage(&args[0]),
        }
    }

    let config = match &config_path {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("opening config {}", path.display()))?;
            serde_json::from_reader(file)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => SolverConfig::default(),
    };

    let (train, test) = match &data_dir {
        Some(dir) => {
            let bundle = load_cifar10(dir)?;
            (bundle.train, bundle.test)
        }
        None => {
            info!("no --data directory given, synthesizing a blob dataset");
            synthetic_blobs(1024, 256, 16, 4)?
        }
    };

    let input_dim = train.feature_dim();
    let num_classes = train.labels().iter().max().map_or(0, |&c| c + 1);
    info!(
        "training on {} samples ({} features, {} classes)",
        train.len(),
        input_dim,
        num_classes
    );

    let model = TwoLayerNet::new(input_dim, HIDDEN_DIM, num_classes)?;
    let train_iter = BatchIter::new(train, BATCH_SIZE, true)?;
    let val_iter = BatchIter::new(test.clone(), BATCH_SIZE, false)?;
    let mut test_iter = BatchIter::new(test, BATCH_SIZE, false)?;

    let mut solver = Solver::new(model, train_iter, Some(val_iter), config)?;
    solver.init()?;
    solver.train()?;

    let accuracy = solver.evaluate(&mut test_iter)?;
    info!(
        "finished after {} steps: test accuracy = {accuracy}",
        solver.state().step()
    );
    println!("test accuracy: {accuracy}");

    Ok(())
}

/// Draws `classes` Gaussian clusters with well-separated centers and splits
/// them into a train/test pair.
fn synthetic_blobs(
    train_n: usize,
    test_n: usize,
    dim: usize,
    classes: usize,
) -> anyhow::Result<(Dataset, Dataset)> {
    let mut rng = StdRng::seed_from_u64(0);
    let center_dist = Normal::new(0.0f32, 2.0)?;
    let noise = Normal::new(0.0f32, 0.3)?;

    let centers: Vec<ArrayD<f32>> = (0..classes)
        .map(|_| ArrayD::random_using(IxDyn(&[dim]), center_dist, &mut rng))
        .collect();

    let mut build = |n: usize| -> anyhow::Result<Dataset> {
        let mut values = Vec::with_capacity(n * dim);
        let mut labels = Vec::with_capacity(n);

        for i in 0..n {
            let class = i % classes;
            let sample = &centers[class] + ArrayD::random_using(IxDyn(&[dim]), noise, &mut rng);
            values.extend(sample.iter().copied());
            labels.push(class);
        }

        let features = ArrayD::from_shape_vec(IxDyn(&[n, dim]), values)?;
        Ok(Dataset::new(features, Array1::from(labels))?)
    };

    Ok((build(train_n)?, build(test_n)?))
}
