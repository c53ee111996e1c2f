use std::path::Path;

use ndarray::{Array2, ArrayView2};
use rand::rngs::StdRng;

use crate::{
    arch::{
        activations::ActFn,
        layers::{Conv2d, Dense, LayerPosition, MaxPool2d},
    },
    config::TrainingConfig,
    data::mnist::{IMAGE_SIDE, NUM_CLASSES},
    error::Result,
};

const CONV_FILTERS: usize = 4;
const CONV_KERNEL: usize = 5;
const POOL_SIZE: usize = 2;
const POOL_STRIDE: usize = 2;
const HIDDEN_UNITS: usize = 32;

/// The fixed four-stage network of the demo.
///
/// ```text
/// (batch, 784) -> c1: Conv2d 1->4, 5x5, relu   (batch, 4, 24, 24)
///              -> p1: MaxPool2d 2x2 / 2        (batch, 4, 12, 12) -> (batch, 576)
///              -> f1: Dense 576->32, relu
///              -> f2: Dense 32->10, softmax
/// ```
pub struct ConvNet {
    c1: Conv2d,
    p1: MaxPool2d,
    f1: Dense,
    f2: Dense,
    output: Array2<f32>,
}

impl ConvNet {
    /// Builds the network with freshly initialized parameters.
    ///
    /// # Arguments
    /// * `config` - Hyper-parameters shared by every layer.
    /// * `rng` - A seeded random number generator for the weights.
    pub fn new(config: &TrainingConfig, rng: &mut StdRng) -> Result<Self> {
        let c1 = Conv2d::new(
            (1, IMAGE_SIDE, IMAGE_SIDE),
            CONV_FILTERS,
            CONV_KERNEL,
            1,
            0,
            ActFn::relu(),
            config,
            rng,
        )?;
        let p1 = MaxPool2d::new(c1.output_shape(), POOL_SIZE, POOL_STRIDE);
        let f1 = Dense::new((p1.output_size(), HIDDEN_UNITS), ActFn::relu(), config, rng)?;
        let f2 = Dense::softmax((HIDDEN_UNITS, NUM_CLASSES), config, rng)?;

        Ok(Self {
            c1,
            p1,
            f1,
            f2,
            output: Array2::zeros((0, 0)),
        })
    }

    /// Returns the amount of trainable parameters in the model.
    pub fn size(&self) -> usize {
        self.c1.size() + self.f1.size() + self.f2.size()
    }

    /// Runs the batch through the network. Deterministic for fixed weights.
    ///
    /// # Arguments
    /// * `x` - The input batch, one flattened image per row.
    ///
    /// # Returns
    /// Class probabilities, one row per sample; every row sums to one.
    pub fn forward(&mut self, x: ArrayView2<f32>) -> ArrayView2<'_, f32> {
        let a_c1 = self.c1.forward(x);
        let a_p1 = self.p1.forward(a_c1);
        let a_f1 = self.f1.forward(a_p1.view());
        let a_f2 = self.f2.forward(a_f1);

        self.output = a_f2.to_owned();
        self.output.view()
    }

    /// Backpropagates from the fused output error `prediction - target`,
    /// telling every layer where it sits so the boundary layers can skip the
    /// work nothing consumes.
    ///
    /// # Arguments
    /// * `y` - The one-hot targets of the latest forward batch.
    pub fn backward(&mut self, y: ArrayView2<f32>) {
        let delta = &self.output - &y;

        // Non-`First` layers always yield a delta.
        let Some(d_f1) = self.f2.backward(delta.view(), LayerPosition::Last) else {
            return;
        };
        let Some(d_p1) = self.f1.backward(d_f1.view(), LayerPosition::Middle) else {
            return;
        };

        let d_c1 = self.p1.backward(d_p1.view());
        self.c1.backward(d_c1.view(), LayerPosition::First);
    }

    /// Each layer applies its accumulated gradients to its own parameters.
    pub fn update(&mut self) {
        self.c1.update();
        self.f1.update();
        self.f2.update();
    }

    /// Persists every parameter layer under its name.
    pub fn save(&self, dir: &Path) -> Result<()> {
        self.c1.save_parameters(dir, "c1")?;
        self.f1.save_parameters(dir, "f1")?;
        self.f2.save_parameters(dir, "f2")?;

        Ok(())
    }

    /// Restores every parameter layer from a previous save.
    pub fn load(&mut self, dir: &Path) -> Result<()> {
        self.c1.load_parameters(dir, "c1")?;
        self.f1.load_parameters(dir, "f1")?;
        self.f2.load_parameters(dir, "f2")?;

        Ok(())
    }

    /// The cached output of the latest forward pass.
    pub fn output(&self) -> ArrayView2<'_, f32> {
        self.output.view()
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;
    use crate::{
        arch::loss::{CrossEntropy, LossFn},
        data::mnist::NUM_PIXELS,
    };

    fn rng() -> StdRng {
        StdRng::seed_from_u64(1234)
    }

    fn batch(n: usize) -> (Array2<f32>, Array2<f32>) {
        let x = Array2::from_shape_fn((n, NUM_PIXELS), |(i, j)| {
            ((i * 31 + j * 7) % 256) as f32 / 255.0
        });
        let mut y = Array2::zeros((n, NUM_CLASSES));
        for i in 0..n {
            y[[i, i % NUM_CLASSES]] = 1.0;
        }

        (x, y)
    }

    #[test]
    fn parameter_count_matches_the_topology() {
        let model = ConvNet::new(&TrainingConfig::default(), &mut rng()).unwrap();

        let conv = 4 * 1 * 5 * 5 + 4;
        let f1 = 576 * 32 + 32;
        let f2 = 32 * 10 + 10;
        assert_eq!(model.size(), conv + f1 + f2);
    }

    #[test]
    fn forward_emits_probability_rows() {
        let mut model = ConvNet::new(&TrainingConfig::default(), &mut rng()).unwrap();
        let (x, _) = batch(3);

        let out = model.forward(x.view());

        assert_eq!(out.shape(), &[3, NUM_CLASSES]);
        for row in out.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-5);
            assert!(row.iter().all(|&p| p >= 0.0));
        }
    }

    #[test]
    fn a_training_step_reduces_the_loss_on_its_batch() {
        let config = TrainingConfig {
            learning_rate: 0.1,
            ..TrainingConfig::default()
        };
        let mut model = ConvNet::new(&config, &mut rng()).unwrap();
        let (x, y) = batch(4);

        let before = CrossEntropy.loss(model.forward(x.view()), y.view());

        for _ in 0..5 {
            model.forward(x.view());
            model.backward(y.view());
            model.update();
        }

        let after = CrossEntropy.loss(model.forward(x.view()), y.view());

        assert!(after < before, "loss went from {before} to {after}");
    }

    #[test]
    fn save_then_load_reproduces_the_forward_pass() {
        let dir = std::env::temp_dir().join(format!("convnet-model-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);

        let config = TrainingConfig::default();
        let mut model = ConvNet::new(&config, &mut rng()).unwrap();
        let (x, _) = batch(2);

        let expected = model.forward(x.view()).to_owned();
        model.save(&dir).unwrap();

        // A differently-seeded model disagrees until it loads the snapshot.
        let mut restored = ConvNet::new(&config, &mut StdRng::seed_from_u64(999)).unwrap();
        restored.load(&dir).unwrap();

        let out = restored.forward(x.view());
        assert_eq!(out, expected);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
