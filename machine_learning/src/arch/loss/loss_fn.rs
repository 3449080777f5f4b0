use ndarray::{Array2, ArrayView1, ArrayView2};

/// A loss over a batch of predictions and their class labels.
pub trait LossFn {
    /// Returns the mean loss of the batch.
    fn loss(&self, y_pred: ArrayView2<f32>, y: ArrayView1<u32>) -> f32;

    /// Returns the derivative of `loss` with respect to each prediction.
    fn loss_prime(&self, y_pred: ArrayView2<f32>, y: ArrayView1<u32>) -> Array2<f32>;
}
