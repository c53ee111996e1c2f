use ndarray::{Array2, ArrayView2};

/// Row-wise softmax: turns every row of class scores into a probability
/// distribution. Shifts by the row maximum before exponentiating to keep the
/// exponentials bounded.
pub fn softmax_rows(z: ArrayView2<f32>) -> Array2<f32> {
    let mut a = z.to_owned();

    for mut row in a.rows_mut() {
        let max = row.fold(f32::NEG_INFINITY, |m, &v| m.max(v));
        row.mapv_inplace(|v| (v - max).exp());

        let sum = row.sum();
        row.mapv_inplace(|v| v / sum);
    }

    a
}
