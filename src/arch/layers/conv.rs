use std::path::Path;

use ndarray::{Array2, Array4, ArrayView2, ArrayView4, ArrayViewMut4};
use rand::rngs::StdRng;

use super::LayerPosition;
use crate::{
    arch::activations::ActFn,
    checkpoint,
    config::TrainingConfig,
    error::Result,
    init,
    optimization::{Optim, Optimizer},
};

/// A 2D convolutional layer with square kernels and a built-in activation.
///
/// The input arrives flattened, one sample per row (`channels * height *
/// width` columns, row-major spatial order); the output keeps its
/// `(batch, channels, height, width)` shape for the pooling stage.
pub struct Conv2d {
    in_channels: usize,
    out_channels: usize,
    kernel_size: usize,
    stride: usize,
    padding: usize,
    in_h: usize,
    in_w: usize,
    act: ActFn,

    params: Vec<f32>,
    grad: Vec<f32>,
    opt: Optim,

    // Forward metadata
    x: Array2<f32>,
    z: Array4<f32>,
    a: Array4<f32>,
}

impl Conv2d {
    /// Creates a new `Conv2d`.
    ///
    /// # Arguments
    /// * `input_shape` - The `(channels, height, width)` of one sample.
    /// * `out_channels` - The number of filters.
    /// * `kernel_size` - The side of the square kernel.
    /// * `stride` - The step between kernel applications.
    /// * `padding` - Zero padding applied symmetrically to each border.
    /// * `act` - The activation applied to the convolved output.
    /// * `config` - Hyper-parameters (init scheme, optimizer, learning rate).
    /// * `rng` - A seeded random number generator for the filters.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        input_shape: (usize, usize, usize),
        out_channels: usize,
        kernel_size: usize,
        stride: usize,
        padding: usize,
        act: ActFn,
        config: &TrainingConfig,
        rng: &mut StdRng,
    ) -> Result<Self> {
        let (in_channels, in_h, in_w) = input_shape;
        let fan_in = in_channels * kernel_size * kernel_size;
        let fan_out = out_channels * kernel_size * kernel_size;
        let wlen = out_channels * fan_in;

        let mut params = init::sample_weights(config.init, fan_in, fan_out, wlen, rng)?;
        params.resize(wlen + out_channels, 0.0);

        let len = params.len();

        Ok(Self {
            in_channels,
            out_channels,
            kernel_size,
            stride,
            padding,
            in_h,
            in_w,
            act,
            grad: vec![0.0; len],
            opt: Optim::new(config.optimizer, config.learning_rate, len),
            params,
            x: Array2::zeros((0, 0)),
            z: Array4::zeros((0, 0, 0, 0)),
            a: Array4::zeros((0, 0, 0, 0)),
        })
    }

    pub fn output_height(&self) -> usize {
        (self.in_h + 2 * self.padding - self.kernel_size) / self.stride + 1
    }

    pub fn output_width(&self) -> usize {
        (self.in_w + 2 * self.padding - self.kernel_size) / self.stride + 1
    }

    /// The `(channels, height, width)` of one output sample.
    pub fn output_shape(&self) -> (usize, usize, usize) {
        (self.out_channels, self.output_height(), self.output_width())
    }

    /// Returns the amount of parameters this layer has.
    pub fn size(&self) -> usize {
        self.params.len()
    }

    /// Convolves the batch with the filters and applies the activation.
    ///
    /// # Arguments
    /// * `x` - The input batch, one flattened sample per row.
    ///
    /// # Returns
    /// The activated feature maps, `(batch, out_channels, out_h, out_w)`.
    pub fn forward(&mut self, x: ArrayView2<f32>) -> &Array4<f32> {
        let batch = x.nrows();
        let (oh, ow) = (self.output_height(), self.output_width());
        let k = self.kernel_size;
        let in_spatial = self.in_h * self.in_w;
        let pad = self.padding as isize;

        self.z = Array4::zeros((batch, self.out_channels, oh, ow));
        let (w, b) = filter_views_of(&self.params, self.out_channels, self.in_channels, k);

        for bi in 0..batch {
            for oc in 0..self.out_channels {
                let bias = b[oc];

                for oy in 0..oh {
                    for ox in 0..ow {
                        let mut sum = bias;

                        for ic in 0..self.in_channels {
                            let col_base = ic * in_spatial;

                            for ky in 0..k {
                                for kx in 0..k {
                                    let iy = (oy * self.stride + ky) as isize - pad;
                                    let ix = (ox * self.stride + kx) as isize - pad;

                                    if iy >= 0
                                        && iy < self.in_h as isize
                                        && ix >= 0
                                        && ix < self.in_w as isize
                                    {
                                        let col = col_base + iy as usize * self.in_w + ix as usize;
                                        sum += x[[bi, col]] * w[[oc, ic, ky, kx]];
                                    }
                                }
                            }
                        }

                        self.z[[bi, oc, oy, ox]] = sum;
                    }
                }
            }
        }

        self.x = x.to_owned();

        let act = self.act;
        self.a = self.z.mapv(|z| act.f(z));

        &self.a
    }

    /// Propagates the batch delta through the layer and accumulates the
    /// filter gradients, averaged over the batch.
    ///
    /// # Arguments
    /// * `delta` - The delta flowing in from the next layer, in output shape.
    /// * `position` - Where this layer sits in the network.
    ///
    /// # Returns
    /// The delta for the previous layer, or `None` for the `First` layer.
    pub fn backward(
        &mut self,
        delta: ArrayView4<f32>,
        position: LayerPosition,
    ) -> Option<Array4<f32>> {
        let batch = delta.shape()[0];
        let (oh, ow) = (self.output_height(), self.output_width());
        let k = self.kernel_size;
        let in_spatial = self.in_h * self.in_w;
        let pad = self.padding as isize;
        let scale = 1.0 / batch as f32;

        let act = self.act;
        let mut dz = delta.to_owned();
        dz.zip_mut_with(&self.z, |d, &z| *d *= act.df(z));

        self.grad.fill(0.0);
        let wlen = self.out_channels * self.in_channels * k * k;
        let (gw_buf, gb_buf) = self.grad.split_at_mut(wlen);
        // The buffer length is fixed at construction.
        let mut gw =
            ArrayViewMut4::from_shape((self.out_channels, self.in_channels, k, k), gw_buf).unwrap();

        let (w, _) = filter_views_of(&self.params, self.out_channels, self.in_channels, k);
        let mut d_input = (position != LayerPosition::First)
            .then(|| Array4::zeros((batch, self.in_channels, self.in_h, self.in_w)));

        for bi in 0..batch {
            for oc in 0..self.out_channels {
                for oy in 0..oh {
                    for ox in 0..ow {
                        let g = dz[[bi, oc, oy, ox]];
                        if g == 0.0 {
                            continue;
                        }

                        gb_buf[oc] += g * scale;

                        for ic in 0..self.in_channels {
                            let col_base = ic * in_spatial;

                            for ky in 0..k {
                                for kx in 0..k {
                                    let iy = (oy * self.stride + ky) as isize - pad;
                                    let ix = (ox * self.stride + kx) as isize - pad;

                                    if iy >= 0
                                        && iy < self.in_h as isize
                                        && ix >= 0
                                        && ix < self.in_w as isize
                                    {
                                        let (iy, ix) = (iy as usize, ix as usize);
                                        let col = col_base + iy * self.in_w + ix;

                                        gw[[oc, ic, ky, kx]] += g * self.x[[bi, col]] * scale;

                                        if let Some(di) = &mut d_input {
                                            di[[bi, ic, iy, ix]] += g * w[[oc, ic, ky, kx]];
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }

        d_input
    }

    /// Applies the accumulated gradients to this layer's parameters.
    pub fn update(&mut self) {
        self.opt.update_params(&mut self.params, &self.grad);
    }

    /// Persists the layer's parameters under its name.
    pub fn save_parameters(&self, dir: &Path, name: &str) -> Result<()> {
        let k = self.kernel_size;
        let wlen = self.out_channels * self.in_channels * k * k;
        let (w, b) = self.params.split_at(wlen);

        checkpoint::save_layer(
            dir,
            name,
            &[
                ("weight", w, &[self.out_channels, self.in_channels, k, k]),
                ("bias", b, &[self.out_channels]),
            ],
        )
    }

    /// Restores the layer's parameters from a previous save.
    pub fn load_parameters(&mut self, dir: &Path, name: &str) -> Result<()> {
        let k = self.kernel_size;
        let wlen = self.out_channels * self.in_channels * k * k;
        let tensors = checkpoint::load_layer(
            dir,
            name,
            &[
                ("weight", &[self.out_channels, self.in_channels, k, k]),
                ("bias", &[self.out_channels]),
            ],
        )?;

        let (w, b) = self.params.split_at_mut(wlen);
        w.copy_from_slice(&tensors[0]);
        b.copy_from_slice(&tensors[1]);

        Ok(())
    }
}

fn filter_views_of(
    params: &[f32],
    out_channels: usize,
    in_channels: usize,
    k: usize,
) -> (ArrayView4<'_, f32>, &[f32]) {
    let (w, b) = params.split_at(out_channels * in_channels * k * k);

    // The buffer length is fixed at construction.
    (
        ArrayView4::from_shape((out_channels, in_channels, k, k), w).unwrap(),
        b,
    )
}
