use std::{fmt, num::NonZeroUsize};

use ndarray::ArrayView1;

use crate::{arch::ConvNet, data::Dataset};

/// Result of a held-out evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Accuracy {
    pub correct: usize,
    pub total: usize,
}

impl Accuracy {
    /// The accuracy as a float in `[0, 1]`.
    pub fn ratio(&self) -> f32 {
        if self.total == 0 {
            return 0.0;
        }

        self.correct as f32 / self.total as f32
    }
}

impl fmt::Display for Accuracy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {} = {}", self.correct, self.total, self.ratio())
    }
}

/// Forward-only top-1 evaluation over a held-out set, in bounded chunks.
///
/// # Arguments
/// * `model` - The model under evaluation; only its forward caches mutate.
/// * `dataset` - The held-out samples.
/// * `chunk` - How many samples to forward at a time.
pub fn evaluate(model: &mut ConvNet, dataset: &Dataset, chunk: NonZeroUsize) -> Accuracy {
    let mut correct = 0;

    for (x, y) in dataset.batches(chunk) {
        let y_pred = model.forward(x);

        for (pred, target) in y_pred.rows().into_iter().zip(y.rows()) {
            if argmax(pred) == argmax(target) {
                correct += 1;
            }
        }
    }

    Accuracy {
        correct,
        total: dataset.len(),
    }
}

fn argmax(row: ArrayView1<f32>) -> usize {
    row.iter()
        .enumerate()
        .fold(
            (0, f32::NEG_INFINITY),
            |(bi, bv), (i, &v)| if v > bv { (i, v) } else { (bi, bv) },
        )
        .0
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn argmax_picks_the_first_largest() {
        let row = array![0.1, 0.7, 0.7, 0.1];

        assert_eq!(argmax(row.view()), 1);
    }

    #[test]
    fn ratio_is_floating_point() {
        let acc = Accuracy {
            correct: 1,
            total: 3,
        };

        assert!((acc.ratio() - 1.0 / 3.0).abs() < 1e-6);
        assert_eq!(format!("{acc}"), format!("1 / 3 = {}", 1.0f32 / 3.0));
    }

    #[test]
    fn empty_set_has_zero_accuracy() {
        let acc = Accuracy {
            correct: 0,
            total: 0,
        };

        assert_eq!(acc.ratio(), 0.0);
    }
}
