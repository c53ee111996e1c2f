use std::num::NonZeroUsize;

use ndarray::{Array2, ArrayView2, Axis};
use rand::{rngs::StdRng, seq::SliceRandom};

/// An in-memory supervised dataset: one sample per row of `x`, its one-hot
/// target on the same row of `y`.
pub struct Dataset {
    x: Array2<f32>,
    y: Array2<f32>,
}

impl Dataset {
    /// Creates a new `Dataset`.
    ///
    /// # Panics
    /// If `x` and `y` disagree on the sample count.
    pub fn new(x: Array2<f32>, y: Array2<f32>) -> Self {
        assert_eq!(
            x.nrows(),
            y.nrows(),
            "images and labels must have the same number of samples"
        );

        Self { x, y }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.x.nrows()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.x.nrows() == 0
    }

    #[inline]
    pub fn x(&self) -> ArrayView2<'_, f32> {
        self.x.view()
    }

    #[inline]
    pub fn y(&self) -> ArrayView2<'_, f32> {
        self.y.view()
    }

    /// Reorders the samples, keeping every row paired with its target.
    pub fn shuffle(&mut self, rng: &mut StdRng) {
        let mut idx: Vec<usize> = (0..self.len()).collect();
        idx.shuffle(rng);

        self.x = self.x.select(Axis(0), &idx);
        self.y = self.y.select(Axis(0), &idx);
    }

    /// Yields transient `(x, y)` view pairs over consecutive mini-batches.
    /// The last batch may be short.
    pub fn batches(
        &self,
        batch_size: NonZeroUsize,
    ) -> impl Iterator<Item = (ArrayView2<'_, f32>, ArrayView2<'_, f32>)> {
        self.x
            .axis_chunks_iter(Axis(0), batch_size.get())
            .zip(self.y.axis_chunks_iter(Axis(0), batch_size.get()))
    }
}
