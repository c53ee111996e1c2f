use ndarray::{Array2, Array4, ArrayView2};

/// A max-pooling layer.
///
/// Parameterless: it only remembers, per output cell, which input position
/// won the window so the backward pass can route the delta there. The output
/// is flattened to one row per sample for the dense stack that follows.
pub struct MaxPool2d {
    channels: usize,
    in_h: usize,
    in_w: usize,
    size: usize,
    stride: usize,

    // Forward metadata: flat spatial index of each window's maximum.
    argmax: Array4<usize>,
}

impl MaxPool2d {
    /// Creates a new `MaxPool2d`.
    ///
    /// # Arguments
    /// * `input_shape` - The `(channels, height, width)` of one sample.
    /// * `size` - The side of the square pooling window.
    /// * `stride` - The step between windows.
    pub fn new(input_shape: (usize, usize, usize), size: usize, stride: usize) -> Self {
        let (channels, in_h, in_w) = input_shape;

        Self {
            channels,
            in_h,
            in_w,
            size,
            stride,
            argmax: Array4::zeros((0, 0, 0, 0)),
        }
    }

    pub fn output_height(&self) -> usize {
        (self.in_h - self.size) / self.stride + 1
    }

    pub fn output_width(&self) -> usize {
        (self.in_w - self.size) / self.stride + 1
    }

    /// The flattened width of one pooled sample.
    pub fn output_size(&self) -> usize {
        self.channels * self.output_height() * self.output_width()
    }

    /// Picks the maximum of every window and records its position.
    ///
    /// # Arguments
    /// * `x` - The feature maps, `(batch, channels, height, width)`.
    ///
    /// # Returns
    /// The pooled activations, one flattened sample per row.
    pub fn forward(&mut self, x: &Array4<f32>) -> Array2<f32> {
        let batch = x.shape()[0];
        let (oh, ow) = (self.output_height(), self.output_width());
        let out_spatial = oh * ow;

        self.argmax = Array4::zeros((batch, self.channels, oh, ow));
        let mut out = Array2::zeros((batch, self.output_size()));

        for bi in 0..batch {
            for c in 0..self.channels {
                for oy in 0..oh {
                    for ox in 0..ow {
                        let mut best = f32::NEG_INFINITY;
                        let mut best_idx = 0;

                        for ky in 0..self.size {
                            for kx in 0..self.size {
                                let iy = oy * self.stride + ky;
                                let ix = ox * self.stride + kx;
                                let v = x[[bi, c, iy, ix]];

                                // Ties keep the first maximum.
                                if v > best {
                                    best = v;
                                    best_idx = iy * self.in_w + ix;
                                }
                            }
                        }

                        out[[bi, c * out_spatial + oy * ow + ox]] = best;
                        self.argmax[[bi, c, oy, ox]] = best_idx;
                    }
                }
            }
        }

        out
    }

    /// Routes the delta back to the positions that won their windows.
    ///
    /// # Arguments
    /// * `delta` - The delta flowing in from the next layer, one flattened
    ///   sample per row.
    ///
    /// # Returns
    /// The delta in input shape, zero everywhere except the recorded maxima.
    pub fn backward(&self, delta: ArrayView2<f32>) -> Array4<f32> {
        let batch = delta.nrows();
        let (oh, ow) = (self.output_height(), self.output_width());
        let out_spatial = oh * ow;

        let mut d_input = Array4::zeros((batch, self.channels, self.in_h, self.in_w));

        for bi in 0..batch {
            for c in 0..self.channels {
                for oy in 0..oh {
                    for ox in 0..ow {
                        let idx = self.argmax[[bi, c, oy, ox]];
                        let g = delta[[bi, c * out_spatial + oy * ow + ox]];

                        d_input[[bi, c, idx / self.in_w, idx % self.in_w]] += g;
                    }
                }
            }
        }

        d_input
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    fn pool_4x4() -> MaxPool2d {
        MaxPool2d::new((1, 4, 4), 2, 2)
    }

    #[test]
    fn picks_the_window_maximum() {
        let mut pool = pool_4x4();
        let mut x = Array4::zeros((1, 1, 4, 4));
        for iy in 0..4 {
            for ix in 0..4 {
                x[[0, 0, iy, ix]] = (iy * 4 + ix) as f32;
            }
        }

        let out = pool.forward(&x);

        assert_eq!(out, array![[5.0, 7.0, 13.0, 15.0]]);
    }

    #[test]
    fn backward_routes_to_the_argmax() {
        let mut pool = pool_4x4();
        let mut x = Array4::zeros((1, 1, 4, 4));
        x[[0, 0, 0, 1]] = 9.0; // winner of the top-left window

        pool.forward(&x);
        let d = pool.backward(array![[1.0, 2.0, 3.0, 4.0]].view());

        assert_eq!(d[[0, 0, 0, 1]], 1.0);
        // The other windows are all ties at zero: the first cell wins.
        assert_eq!(d[[0, 0, 0, 2]], 2.0);
        assert_eq!(d[[0, 0, 2, 0]], 3.0);
        assert_eq!(d[[0, 0, 2, 2]], 4.0);
        assert_eq!(d.sum(), 10.0);
    }

    #[test]
    fn output_size_matches_the_dense_input() {
        let pool = MaxPool2d::new((4, 24, 24), 2, 2);

        assert_eq!(pool.output_size(), 4 * 12 * 12);
    }
}
