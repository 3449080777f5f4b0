use ndarray::{Array2, ArrayView2};

use crate::{ParameterSet, Result};

/// A parameterless description of an architecture, the parameters are always handed in from the outside.
pub trait Model {
    /// Returns the shape of every parameter tensor this model consumes, in order.
    fn param_shapes(&self) -> Vec<Vec<usize>>;

    /// Makes a forward pass through the network.
    ///
    /// # Arguments
    /// * `params` - The parameters to evaluate the model with.
    /// * `x` - The input batch, one sample per row.
    ///
    /// # Returns
    /// The model's output for each sample or an error if `params` doesn't fit the model.
    fn forward(&self, params: &ParameterSet, x: ArrayView2<f32>) -> Result<Array2<f32>>;
}
