use ndarray::{Array2, ArrayD, ArrayView1, ArrayView2, Axis, Ix1, Ix2};

use crate::Result;

/// A fully connected layer computing `x · w + b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dense {
    dim: (usize, usize),
}

impl Dense {
    /// Creates a new `Dense` layer.
    ///
    /// # Arguments
    /// * `dim` - The input and output sizes of the layer.
    pub fn new(dim: (usize, usize)) -> Self {
        Self { dim }
    }

    /// Returns the input and output sizes of this layer.
    pub fn dim(&self) -> (usize, usize) {
        self.dim
    }

    /// Returns the shapes of the weights and biases of this layer.
    pub fn param_shapes(&self) -> Vec<Vec<usize>> {
        let (n, m) = self.dim;
        vec![vec![n, m], vec![m]]
    }

    pub fn forward(&self, params: &[ArrayD<f32>], x: ArrayView2<f32>) -> Result<Array2<f32>> {
        let (w, b) = view_params(params)?;
        Ok(x.dot(&w) + &b)
    }

    /// Writes the gradient of this layer's parameters and returns the delta for the previous layer.
    ///
    /// # Arguments
    /// * `params` - The weights and biases of this layer.
    /// * `grads` - Where to write the delta weights and delta biases.
    /// * `x` - The input this layer received in the forward pass.
    /// * `d` - The delta coming from the next layer.
    pub fn backward(
        &self,
        params: &[ArrayD<f32>],
        grads: &mut [ArrayD<f32>],
        x: ArrayView2<f32>,
        d: Array2<f32>,
    ) -> Result<Array2<f32>> {
        let (w, _) = view_params(params)?;

        grads[0] = x.t().dot(&d).into_dyn();
        grads[1] = d.sum_axis(Axis(0)).into_dyn();

        Ok(d.dot(&w.t()))
    }
}

/// Gives a view of the raw tensors as the weights and biases of a dense layer.
fn view_params(params: &[ArrayD<f32>]) -> Result<(ArrayView2<'_, f32>, ArrayView1<'_, f32>)> {
    let w = params[0].view().into_dimensionality::<Ix2>()?;
    let b = params[1].view().into_dimensionality::<Ix1>()?;
    Ok((w, b))
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn forward_is_affine() {
        let dense = Dense::new((2, 1));
        let params = [array![[2.0], [3.0]].into_dyn(), array![1.0].into_dyn()];

        let y = dense.forward(&params, array![[1.0, 1.0], [0.0, 2.0]].view()).unwrap();
        assert_eq!(y, array![[6.0], [7.0]]);
    }

    #[test]
    fn backward_accumulates_over_the_batch() {
        let dense = Dense::new((2, 1));
        let params = [array![[2.0], [3.0]].into_dyn(), array![1.0].into_dyn()];
        let mut grads = [ArrayD::zeros(vec![2, 1]), ArrayD::zeros(vec![1])];
        let x = array![[1.0, 1.0], [0.0, 2.0]];

        let d_prev = dense
            .backward(&params, &mut grads, x.view(), array![[1.0], [0.5]])
            .unwrap();

        assert_eq!(grads[0], array![[1.0], [2.0]].into_dyn());
        assert_eq!(grads[1], array![1.5].into_dyn());
        assert_eq!(d_prev, array![[2.0, 3.0], [1.0, 1.5]]);
    }
}
