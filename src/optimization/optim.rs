use super::{Adam, GradientDescent, GradientDescentWithMomentum, Optimizer};
use crate::config::OptimizerKind;

/// The configured optimizer for one layer's parameter buffer.
///
/// Each parameter layer owns one instance so that stateful algorithms
/// (momentum, Adam) keep their moments aligned with that layer's buffer.
#[derive(Debug, Clone)]
pub enum Optim {
    Sgd(GradientDescent),
    Momentum(GradientDescentWithMomentum),
    Adam(Adam),
}
use Optim::*;

impl Optim {
    /// Builds the optimizer selected by the configuration.
    ///
    /// # Arguments
    /// * `kind` - The configured algorithm and its knobs.
    /// * `learning_rate` - The configured learning rate (eta).
    /// * `len` - The amount of parameters in the owning layer.
    pub fn new(kind: OptimizerKind, learning_rate: f32, len: usize) -> Self {
        match kind {
            OptimizerKind::Sgd => Sgd(GradientDescent::new(learning_rate)),
            OptimizerKind::Momentum { momentum } => Momentum(GradientDescentWithMomentum::new(
                len,
                learning_rate,
                momentum,
            )),
            OptimizerKind::Adam {
                beta1,
                beta2,
                epsilon,
            } => Adam(super::Adam::new(len, learning_rate, beta1, beta2, epsilon)),
        }
    }
}

impl Optimizer for Optim {
    fn update_params(&mut self, params: &mut [f32], grad: &[f32]) {
        match self {
            Sgd(o) => o.update_params(params, grad),
            Momentum(o) => o.update_params(params, grad),
            Adam(o) => o.update_params(params, grad),
        }
    }
}
