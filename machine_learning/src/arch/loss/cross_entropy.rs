use ndarray::{Array2, ArrayView1, ArrayView2, Axis};

use super::LossFn;

/// Softmax cross entropy over raw logits, averaged over the batch.
///
/// Labels outside of the model's output range count as a prediction with probability zero.
#[derive(Debug, Default, Clone, Copy)]
pub struct CrossEntropy;

impl CrossEntropy {
    /// Returns a new `CrossEntropy`.
    pub fn new() -> Self {
        Self
    }

    fn softmax(y_pred: ArrayView2<f32>) -> Array2<f32> {
        let mut probs = y_pred.to_owned();

        for mut row in probs.axis_iter_mut(Axis(0)) {
            let max = row.fold(f32::NEG_INFINITY, |acc, &z| acc.max(z));
            row.mapv_inplace(|z| (z - max).exp());
            let sum = row.sum();
            row.mapv_inplace(|p| p / sum);
        }

        probs
    }
}

impl LossFn for CrossEntropy {
    fn loss(&self, y_pred: ArrayView2<f32>, y: ArrayView1<u32>) -> f32 {
        let n = y_pred.nrows();
        if n == 0 {
            return 0.0;
        }

        let probs = Self::softmax(y_pred);
        let total: f32 = probs
            .axis_iter(Axis(0))
            .zip(y)
            .map(|(row, &label)| {
                let p = row.get(label as usize).copied().unwrap_or(0.0);
                -p.max(f32::MIN_POSITIVE).ln()
            })
            .sum();

        total / n as f32
    }

    fn loss_prime(&self, y_pred: ArrayView2<f32>, y: ArrayView1<u32>) -> Array2<f32> {
        let n = y_pred.nrows().max(1) as f32;
        let mut d = Self::softmax(y_pred);

        for (mut row, &label) in d.axis_iter_mut(Axis(0)).zip(y) {
            if let Some(p) = row.get_mut(label as usize) {
                *p -= 1.0;
            }
        }

        d / n
    }
}
