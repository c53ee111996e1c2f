use super::Optimizer;

/// Adam optimization algorithm with bias-corrected first and second moments.
#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    beta1_t: f32,
    beta2_t: f32,
    epsilon: f32,
    v: Box<[f32]>,
    s: Box<[f32]>,
}

impl Adam {
    /// Returns a new `Adam`.
    ///
    /// # Arguments
    /// * `len` - The amount of parameters this instance should track.
    /// * `learning_rate` - The base step length.
    /// * `beta1` - Decay of the first moment estimate.
    /// * `beta2` - Decay of the second moment estimate.
    /// * `epsilon` - Keeps the denominator away from zero.
    pub fn new(len: usize, learning_rate: f32, beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Self {
            learning_rate,
            beta1,
            beta2,
            beta1_t: 1.0,
            beta2_t: 1.0,
            epsilon,
            v: vec![0.0; len].into_boxed_slice(),
            s: vec![0.0; len].into_boxed_slice(),
        }
    }
}

impl Optimizer for Adam {
    fn update_params(&mut self, params: &mut [f32], grad: &[f32]) {
        let Self {
            learning_rate: lr,
            beta1: b1,
            beta2: b2,
            epsilon: eps,
            ..
        } = *self;

        self.beta1_t *= b1;
        self.beta2_t *= b2;

        let bc1 = 1.0 - self.beta1_t;
        let bc2 = 1.0 - self.beta2_t;
        let step_size = lr * (bc2.sqrt() / bc1);

        params
            .iter_mut()
            .zip(grad)
            .zip(self.v.iter_mut())
            .zip(self.s.iter_mut())
            .for_each(|(((w, g), v), s)| {
                *v = b1 * *v + (1.0 - b1) * g;
                *s = b2 * *s + (1.0 - b2) * g.powi(2);
                *w -= step_size * *v / (s.sqrt() + eps);
            });
    }
}
