use log::{debug, info};
use ndarray::{Array2, ArrayView2};
use rand::{SeedableRng, rngs::StdRng};

use crate::{
    arch::{
        ConvNet,
        loss::{CrossEntropy, LossFn, Mse},
    },
    config::{LossKind, TrainingConfig},
    data::Dataset,
    training::LossHistory,
};

/// The configured loss function, dispatched once per training run.
enum Loss {
    CrossEntropy(CrossEntropy),
    Mse(Mse),
}

impl Loss {
    fn new(kind: LossKind) -> Self {
        match kind {
            LossKind::CrossEntropy => Self::CrossEntropy(CrossEntropy::new()),
            LossKind::Mse => Self::Mse(Mse::new()),
        }
    }
}

impl LossFn for Loss {
    fn loss(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> f32 {
        match self {
            Self::CrossEntropy(l) => l.loss(y_pred, y),
            Self::Mse(l) => l.loss(y_pred, y),
        }
    }

    fn loss_prime(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Array2<f32> {
        match self {
            Self::CrossEntropy(l) => l.loss_prime(y_pred, y),
            Self::Mse(l) => l.loss_prime(y_pred, y),
        }
    }
}

/// Drives the epochs-by-batches loop over a model.
pub struct Trainer<'m> {
    model: &'m mut ConvNet,
    config: TrainingConfig,
    loss_fn: Loss,
    history: LossHistory,
    rng: StdRng,
}

impl<'m> Trainer<'m> {
    /// Returns a new `Trainer`.
    ///
    /// # Arguments
    /// * `model` - The model that will be trained.
    /// * `config` - The hyper-parameters of the run; its seed drives the
    ///   per-epoch shuffle.
    pub fn new(model: &'m mut ConvNet, config: TrainingConfig) -> Self {
        Self {
            model,
            loss_fn: Loss::new(config.loss),
            history: LossHistory::new(),
            rng: StdRng::seed_from_u64(config.seed),
            config,
        }
    }

    /// Runs up to `max_epoch` epochs of mini-batch training; stops early once
    /// the epoch loss drops below `stop_loss`.
    ///
    /// Every batch step is forward, backward, update; progress is logged
    /// every `log_every` iterations. The epoch loss is the mean of per-batch
    /// losses, which approximates the full-set loss without a second pass
    /// over the training data.
    ///
    /// # Arguments
    /// * `train` - The training split; reshuffled at the start of each epoch.
    ///
    /// # Returns
    /// The recorded loss history.
    pub fn fit(&mut self, train: &mut Dataset) -> &LossHistory {
        for epoch in 0..self.config.max_epoch {
            train.shuffle(&mut self.rng);

            let mut epoch_loss = 0.0;
            let mut num_batches = 0;
            let mut iteration = 0;

            for (i, (x, y)) in train.batches(self.config.batch_size).enumerate() {
                let y_pred = self.model.forward(x);
                let batch_loss = self.loss_fn.loss(y_pred, y);

                self.model.backward(y);
                self.model.update();

                epoch_loss += batch_loss;
                num_batches += 1;
                iteration = i;

                if i % self.config.log_every == 0 {
                    debug!("epoch {epoch} iteration {i} batch loss {batch_loss:.6}");
                }
            }

            let loss = epoch_loss / num_batches.max(1) as f32;
            let is_min = self.history.add(epoch, iteration, loss);
            info!("epoch={epoch}, iteration={iteration}, loss={loss:.6}, new_min={is_min}");

            if loss < self.config.stop_loss {
                info!("loss {loss:.6} dropped under {}, stopping", self.config.stop_loss);
                break;
            }
        }

        &self.history
    }
}
