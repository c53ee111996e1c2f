use super::Optimizer;

/// Gradient descent with a velocity term that accumulates past gradients.
#[derive(Debug, Clone)]
pub struct GradientDescentWithMomentum {
    learning_rate: f32,
    momentum: f32,
    velocity: Box<[f32]>,
}

impl GradientDescentWithMomentum {
    /// Returns a new `GradientDescentWithMomentum`.
    ///
    /// # Arguments
    /// * `len` - The amount of parameters this instance should track.
    /// * `learning_rate` - The length of the steps taken on `update_params`.
    /// * `momentum` - The decay applied to the accumulated velocity.
    pub fn new(len: usize, learning_rate: f32, momentum: f32) -> Self {
        Self {
            learning_rate,
            momentum,
            velocity: vec![0.0; len].into_boxed_slice(),
        }
    }
}

impl Optimizer for GradientDescentWithMomentum {
    fn update_params(&mut self, params: &mut [f32], grad: &[f32]) {
        let lr = self.learning_rate;
        let mu = self.momentum;

        params
            .iter_mut()
            .zip(grad)
            .zip(self.velocity.iter_mut())
            .for_each(|((w, g), v)| {
                *v = mu * *v + g;
                *w -= lr * *v;
            });
    }
}
