use ndarray::Array1;
use ndarray_rand::RandomExt;
use rand::rngs::StdRng;
use rand_distr::{Normal, Uniform};

use crate::{
    config::InitMethod,
    error::{NetErr, Result},
};

/// Samples `len` weights for a parameter tensor with the given fan-in and
/// fan-out.
///
/// # Arguments
/// * `method` - The configured initialization scheme.
/// * `fan_in` - The number of input units feeding the tensor.
/// * `fan_out` - The number of output units the tensor feeds.
/// * `len` - The amount of weights to sample.
/// * `rng` - A seeded random number generator.
pub fn sample_weights(
    method: InitMethod,
    fan_in: usize,
    fan_out: usize,
    len: usize,
    rng: &mut StdRng,
) -> Result<Vec<f32>> {
    match method {
        InitMethod::Xavier => {
            let limit = (6.0 / (fan_in + fan_out) as f32).sqrt();
            uniform(len, -limit, limit, rng)
        }
        InitMethod::Kaiming => {
            let std_dev = (2.0 / fan_in as f32).sqrt();
            normal(len, 0.0, std_dev, rng)
        }
        InitMethod::Normal { std_dev } => normal(len, 0.0, std_dev, rng),
        InitMethod::Uniform { limit } => uniform(len, -limit, limit, rng),
    }
}

fn uniform(len: usize, low: f32, high: f32, rng: &mut StdRng) -> Result<Vec<f32>> {
    // Inclusive so a zero limit still yields a valid (constant) range.
    let dist = Uniform::new_inclusive(low, high).map_err(|e| NetErr::Init {
        reason: e.to_string(),
    })?;

    Ok(Array1::random_using(len, dist, rng).to_vec())
}

fn normal(len: usize, mean: f32, std_dev: f32, rng: &mut StdRng) -> Result<Vec<f32>> {
    let dist = Normal::new(mean, std_dev).map_err(|e| NetErr::Init {
        reason: e.to_string(),
    })?;

    Ok(Array1::random_using(len, dist, rng).to_vec())
}
