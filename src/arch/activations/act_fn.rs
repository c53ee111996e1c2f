use super::{Relu, Sigmoid, Tanh};

/// Element-wise activation function used inside the network.
///
/// The classifier output (softmax) is row-wise rather than element-wise and
/// lives in [`super::softmax_rows`] instead.
#[derive(Clone, Copy, Debug)]
pub enum ActFn {
    Relu(Relu),
    Sigmoid(Sigmoid),
    Tanh(Tanh),
}

impl ActFn {
    pub fn relu() -> Self {
        Self::Relu(Relu)
    }

    pub fn sigmoid() -> Self {
        Self::Sigmoid(Sigmoid)
    }

    pub fn tanh() -> Self {
        Self::Tanh(Tanh)
    }

    pub fn f(&self, z: f32) -> f32 {
        match self {
            Self::Relu(a) => a.f(z),
            Self::Sigmoid(a) => a.f(z),
            Self::Tanh(a) => a.f(z),
        }
    }

    pub fn df(&self, z: f32) -> f32 {
        match self {
            Self::Relu(a) => a.df(z),
            Self::Sigmoid(a) => a.df(z),
            Self::Tanh(a) => a.df(z),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relu_clips_negatives() {
        let relu = ActFn::relu();

        assert_eq!(relu.f(-2.5), 0.0);
        assert_eq!(relu.f(3.0), 3.0);
        assert_eq!(relu.df(-2.5), 0.0);
        assert_eq!(relu.df(3.0), 1.0);
    }

    #[test]
    fn sigmoid_is_centered_at_half() {
        let sig = ActFn::sigmoid();

        assert!((sig.f(0.0) - 0.5).abs() < 1e-6);
        assert!((sig.df(0.0) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn tanh_derivative_matches_identity() {
        let tanh = ActFn::tanh();
        let z = 0.7f32;

        let expected = 1.0 - z.tanh().powi(2);
        assert!((tanh.df(z) - expected).abs() < 1e-6);
    }
}
