use std::{
    fs,
    num::NonZeroUsize,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const DEFAULT_BATCH_SIZE: NonZeroUsize = NonZeroUsize::new(5).unwrap();

/// Optimization algorithm selection. The learning rate lives on
/// [`TrainingConfig`]; only the algorithm-specific knobs live here.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerKind {
    Sgd,
    Momentum { momentum: f32 },
    Adam { beta1: f32, beta2: f32, epsilon: f32 },
}

/// Weight initialization scheme for the parameter layers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitMethod {
    Xavier,
    Kaiming,
    Normal { std_dev: f32 },
    Uniform { limit: f32 },
}

/// Loss function used for progress reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossKind {
    CrossEntropy,
    Mse,
}

/// The hyper-parameter container threaded through model construction and
/// training.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub learning_rate: f32,
    pub max_epoch: usize,
    pub batch_size: NonZeroUsize,
    /// Early-stop threshold: training ends once the epoch loss drops below it.
    pub stop_loss: f32,
    pub optimizer: OptimizerKind,
    pub init: InitMethod,
    pub loss: LossKind,
    pub data_dir: PathBuf,
    pub checkpoint_dir: PathBuf,
    pub seed: u64,
    /// Log a progress line every this many iterations.
    pub log_every: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.02,
            max_epoch: 1,
            batch_size: DEFAULT_BATCH_SIZE,
            stop_loss: 0.01,
            optimizer: OptimizerKind::Sgd,
            init: InitMethod::Xavier,
            loss: LossKind::CrossEntropy,
            data_dir: PathBuf::from("data"),
            checkpoint_dir: PathBuf::from("checkpoints"),
            seed: 42,
            log_every: 100,
        }
    }
}

impl TrainingConfig {
    /// Loads a configuration from a JSON file. Missing fields fall back to
    /// their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let cfg = TrainingConfig::default();

        assert_eq!(cfg.learning_rate, 0.02);
        assert_eq!(cfg.max_epoch, 1);
        assert_eq!(cfg.batch_size.get(), 5);
        assert_eq!(cfg.optimizer, OptimizerKind::Sgd);
        assert_eq!(cfg.init, InitMethod::Xavier);
        assert_eq!(cfg.loss, LossKind::CrossEntropy);
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let cfg: TrainingConfig =
            serde_json::from_str(r#"{"max_epoch": 3, "optimizer": {"momentum": {"momentum": 0.9}}}"#)
                .unwrap();

        assert_eq!(cfg.max_epoch, 3);
        assert_eq!(cfg.optimizer, OptimizerKind::Momentum { momentum: 0.9 });
        assert_eq!(cfg.batch_size.get(), 5);
    }

    #[test]
    fn json_round_trip() {
        let cfg = TrainingConfig {
            optimizer: OptimizerKind::Adam {
                beta1: 0.9,
                beta2: 0.999,
                epsilon: 1e-8,
            },
            init: InitMethod::Normal { std_dev: 0.1 },
            ..TrainingConfig::default()
        };

        let raw = serde_json::to_string(&cfg).unwrap();
        let back: TrainingConfig = serde_json::from_str(&raw).unwrap();

        assert_eq!(back.optimizer, cfg.optimizer);
        assert_eq!(back.init, cfg.init);
    }
}
