use std::{fs, num::NonZeroUsize, path::PathBuf};

use ndarray::Array2;
use rand::{SeedableRng, rngs::StdRng};

use convnet::{
    arch::ConvNet,
    config::TrainingConfig,
    data::{
        Dataset,
        mnist::{self, NUM_CLASSES, NUM_PIXELS},
    },
    training::{Trainer, evaluate},
};

fn scratch_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("convnet-it-{tag}-{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    dir
}

/// Images of horizontal stripes (class 0) and vertical stripes (class 1).
fn striped_dataset(n: usize) -> Dataset {
    let x = Array2::from_shape_fn((n, NUM_PIXELS), |(i, j)| {
        if i % 2 == 0 {
            ((j / 28) % 2) as f32
        } else {
            ((j % 28) % 2) as f32
        }
    });
    let mut y = Array2::zeros((n, NUM_CLASSES));
    for i in 0..n {
        y[[i, i % 2]] = 1.0;
    }

    Dataset::new(x, y)
}

fn quick_config() -> TrainingConfig {
    TrainingConfig {
        learning_rate: 0.1,
        max_epoch: 10,
        batch_size: NonZeroUsize::new(4).unwrap(),
        stop_loss: 1e-3,
        ..TrainingConfig::default()
    }
}

#[test]
fn training_learns_a_synthetic_two_class_problem() {
    let config = quick_config();
    let mut rng = StdRng::seed_from_u64(11);
    let mut model = ConvNet::new(&config, &mut rng).unwrap();

    let mut train = striped_dataset(32);
    let test = striped_dataset(16);

    let (first, last) = {
        let mut trainer = Trainer::new(&mut model, config.clone());
        let history = trainer.fit(&mut train);
        (
            history.records()[0].loss,
            history.last().unwrap().loss,
        )
    };

    assert!(last < first, "loss went from {first} to {last}");

    let accuracy = evaluate(&mut model, &test, config.batch_size);
    assert_eq!(accuracy.total, 16);
    assert!(
        accuracy.ratio() > 0.9,
        "expected the stripes to be separable, got {accuracy}"
    );
}

#[test]
fn checkpoints_restore_the_trained_model() {
    let dir = scratch_dir("checkpoint");
    let config = quick_config();

    let mut rng = StdRng::seed_from_u64(11);
    let mut model = ConvNet::new(&config, &mut rng).unwrap();
    let mut train = striped_dataset(16);

    Trainer::new(&mut model, config.clone()).fit(&mut train);
    model.save(&dir).unwrap();

    let mut restored = ConvNet::new(&config, &mut StdRng::seed_from_u64(999)).unwrap();
    restored.load(&dir).unwrap();

    let x = train.x();
    let expected = model.forward(x).to_owned();
    let out = restored.forward(x);

    assert_eq!(out, expected);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn idx_files_load_end_to_end() {
    let dir = scratch_dir("idx");
    fs::create_dir_all(&dir).unwrap();

    let write_split = |images: &str, labels: &str, count: usize| {
        let mut image_bytes = Vec::new();
        image_bytes.extend_from_slice(&2051u32.to_be_bytes());
        image_bytes.extend_from_slice(&(count as u32).to_be_bytes());
        image_bytes.extend_from_slice(&28u32.to_be_bytes());
        image_bytes.extend_from_slice(&28u32.to_be_bytes());
        image_bytes.extend((0..count * NUM_PIXELS).map(|i| (i % 256) as u8));
        fs::write(dir.join(images), image_bytes).unwrap();

        let mut label_bytes = Vec::new();
        label_bytes.extend_from_slice(&2049u32.to_be_bytes());
        label_bytes.extend_from_slice(&(count as u32).to_be_bytes());
        label_bytes.extend((0..count).map(|i| (i % NUM_CLASSES) as u8));
        fs::write(dir.join(labels), label_bytes).unwrap();
    };

    write_split(mnist::TRAIN_IMAGES, mnist::TRAIN_LABELS, 6);
    write_split(mnist::TEST_IMAGES, mnist::TEST_LABELS, 3);

    let data = mnist::load_data(&dir).unwrap();

    assert_eq!(data.train.len(), 6);
    assert_eq!(data.test.len(), 3);
    assert_eq!(data.train.x().ncols(), NUM_PIXELS);
    assert_eq!(data.train.y().ncols(), NUM_CLASSES);
    // Pixels are normalized.
    assert!(data.train.x().iter().all(|&p| (0.0..=1.0).contains(&p)));

    let _ = fs::remove_dir_all(&dir);
}
