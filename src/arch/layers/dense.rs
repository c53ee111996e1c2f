use std::path::Path;

use ndarray::{Array2, ArrayView1, ArrayView2, ArrayViewMut1, ArrayViewMut2, Axis, linalg};
use rand::rngs::StdRng;

use super::LayerPosition;
use crate::{
    arch::activations::{ActFn, softmax_rows},
    checkpoint,
    config::TrainingConfig,
    error::Result,
    init,
    optimization::{Optim, Optimizer},
};

/// Transform applied after the affine map `x * w + b`.
#[derive(Clone, Copy, Debug)]
enum OutputFn {
    Act(ActFn),
    Softmax,
}

/// A fully-connected layer.
///
/// Parameters live in one flat `[weights | biases]` buffer so the optimizer
/// and the checkpoint code see a single slice per layer.
pub struct Dense {
    dim: (usize, usize),
    out: OutputFn,
    params: Vec<f32>,
    grad: Vec<f32>,
    opt: Optim,

    // Forward metadata
    x: Array2<f32>,
    z: Array2<f32>,
    a: Array2<f32>,
}

impl Dense {
    /// Creates a hidden fully-connected layer with the given element-wise
    /// activation.
    ///
    /// # Arguments
    /// * `dim` - The `(input, output)` width of the layer.
    /// * `act` - The activation applied to the affine output.
    /// * `config` - Hyper-parameters (init scheme, optimizer, learning rate).
    /// * `rng` - A seeded random number generator for the weights.
    pub fn new(
        dim: (usize, usize),
        act: ActFn,
        config: &TrainingConfig,
        rng: &mut StdRng,
    ) -> Result<Self> {
        Self::build(dim, OutputFn::Act(act), config, rng)
    }

    /// Creates the classifier output layer: affine map followed by a row-wise
    /// softmax. Must be the last layer of the network.
    pub fn softmax(dim: (usize, usize), config: &TrainingConfig, rng: &mut StdRng) -> Result<Self> {
        Self::build(dim, OutputFn::Softmax, config, rng)
    }

    fn build(
        dim: (usize, usize),
        out: OutputFn,
        config: &TrainingConfig,
        rng: &mut StdRng,
    ) -> Result<Self> {
        let (nin, nout) = dim;
        let mut params = init::sample_weights(config.init, nin, nout, nin * nout, rng)?;
        params.resize(nin * nout + nout, 0.0);

        let len = params.len();
        let zeros = Array2::zeros((0, 0));

        Ok(Self {
            dim,
            out,
            grad: vec![0.0; len],
            opt: Optim::new(config.optimizer, config.learning_rate, len),
            params,
            x: zeros.clone(),
            z: zeros.clone(),
            a: zeros,
        })
    }

    /// Returns the amount of parameters this layer has.
    pub fn size(&self) -> usize {
        let (nin, nout) = self.dim;

        (nin + 1) * nout
    }

    /// Makes a forward pass through the layer.
    ///
    /// # Arguments
    /// * `x` - The input batch, one sample per row.
    ///
    /// # Returns
    /// The activated output, one sample per row.
    pub fn forward(&mut self, x: ArrayView2<f32>) -> ArrayView2<'_, f32> {
        let (nin, nout) = self.dim;
        let shape = (x.nrows(), nout);

        self.z = Array2::zeros(shape);
        let (w, b) = split_params(&self.params, nin, nout);
        linalg::general_mat_mul(1.0, &x, &w, 0.0, &mut self.z);
        self.z += &b;

        self.x = x.to_owned();

        match self.out {
            OutputFn::Act(act) => {
                self.a = self.z.mapv(|z| act.f(z));
            }
            OutputFn::Softmax => {
                self.a = softmax_rows(self.z.view());
            }
        }

        self.a.view()
    }

    /// Propagates the batch delta through the layer and accumulates the
    /// parameter gradients, averaged over the batch.
    ///
    /// # Arguments
    /// * `delta` - The delta flowing in from the next layer (or the fused
    ///   loss delta when this is the `Last` layer).
    /// * `position` - Where this layer sits in the network.
    ///
    /// # Returns
    /// The delta for the previous layer, or `None` for the `First` layer.
    pub fn backward(
        &mut self,
        delta: ArrayView2<f32>,
        position: LayerPosition,
    ) -> Option<Array2<f32>> {
        let (nin, nout) = self.dim;
        let batch = delta.nrows() as f32;

        let dz = match (position, self.out) {
            // The fused softmax + cross-entropy delta needs no derivative.
            (LayerPosition::Last, _) => delta.to_owned(),
            (_, OutputFn::Act(act)) => {
                let mut d = delta.to_owned();
                d.zip_mut_with(&self.z, |d, &z| *d *= act.df(z));
                d
            }
            (_, OutputFn::Softmax) => {
                unreachable!("a softmax layer is only built as the network output")
            }
        };

        let (mut gw, mut gb) = split_params_mut(&mut self.grad, nin, nout);
        linalg::general_mat_mul(1.0 / batch, &self.x.t(), &dz, 0.0, &mut gw);
        gb.assign(&(dz.sum_axis(Axis(0)) / batch));

        if position == LayerPosition::First {
            return None;
        }

        let (w, _) = split_params(&self.params, nin, nout);
        let mut d_input = Array2::zeros((dz.nrows(), nin));
        linalg::general_mat_mul(1.0, &dz, &w.t(), 0.0, &mut d_input);

        Some(d_input)
    }

    /// Applies the accumulated gradients to this layer's parameters.
    pub fn update(&mut self) {
        self.opt.update_params(&mut self.params, &self.grad);
    }

    /// Persists the layer's parameters under its name.
    pub fn save_parameters(&self, dir: &Path, name: &str) -> Result<()> {
        let (nin, nout) = self.dim;
        let (w, b) = self.params.split_at(nin * nout);

        checkpoint::save_layer(
            dir,
            name,
            &[("weight", w, &[nin, nout]), ("bias", b, &[nout])],
        )
    }

    /// Restores the layer's parameters from a previous save.
    pub fn load_parameters(&mut self, dir: &Path, name: &str) -> Result<()> {
        let (nin, nout) = self.dim;
        let tensors =
            checkpoint::load_layer(dir, name, &[("weight", &[nin, nout]), ("bias", &[nout])])?;

        let (w, b) = self.params.split_at_mut(nin * nout);
        w.copy_from_slice(&tensors[0]);
        b.copy_from_slice(&tensors[1]);

        Ok(())
    }
}

fn split_params(params: &[f32], nin: usize, nout: usize) -> (ArrayView2<f32>, ArrayView1<f32>) {
    let (w, b) = params.split_at(nin * nout);

    // The buffer length is fixed at construction.
    (
        ArrayView2::from_shape((nin, nout), w).unwrap(),
        ArrayView1::from_shape(nout, b).unwrap(),
    )
}

fn split_params_mut(
    params: &mut [f32],
    nin: usize,
    nout: usize,
) -> (ArrayViewMut2<f32>, ArrayViewMut1<f32>) {
    let (w, b) = params.split_at_mut(nin * nout);

    (
        ArrayViewMut2::from_shape((nin, nout), w).unwrap(),
        ArrayViewMut1::from_shape(nout, b).unwrap(),
    )
}
