use super::Optimizer;
use crate::{MlErr, ParameterSet, Result};

/// Gradient descent optimization algorithm.
#[derive(Debug, Clone, Copy)]
pub struct GradientDescent {
    learning_rate: f32,
}

impl GradientDescent {
    /// Returns a new `GradientDescent`.
    ///
    /// # Arguments
    /// * `learning_rate` - The *length* of the steps taken on `update_params`.
    pub fn new(learning_rate: f32) -> Self {
        Self { learning_rate }
    }
}

impl Optimizer for GradientDescent {
    /// Updates the parameters according to the algorithm's learning rule, that is, making a step in
    /// the opposite direction of the gradient, with a length of `learning_rate`.
    ///
    /// # Arguments
    /// * `params` - The parameters that are going to be modified.
    /// * `grad` - The gradient used for taking the step.
    fn update_params(&mut self, params: &mut ParameterSet, grad: &ParameterSet) -> Result<()> {
        let expected = params.shapes();
        let got = grad.shapes();
        if got != expected {
            return Err(MlErr::LayoutMismatch {
                what: "gradient",
                got,
                expected,
            });
        }

        let lr = self.learning_rate;
        for (w, g) in params.tensors_mut().iter_mut().zip(grad.tensors()) {
            w.scaled_add(-lr, g);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn steps_against_the_gradient() {
        let mut params = ParameterSet::new(vec![array![1.0, 2.0].into_dyn()]);
        let grad = ParameterSet::new(vec![array![10.0, -10.0].into_dyn()]);

        GradientDescent::new(0.1).update_params(&mut params, &grad).unwrap();
        assert_eq!(params.tensors()[0], array![0.0, 3.0].into_dyn());
    }

    #[test]
    fn rejects_foreign_layout() {
        let mut params = ParameterSet::new(vec![array![1.0, 2.0].into_dyn()]);
        let grad = ParameterSet::new(vec![array![1.0].into_dyn()]);

        let res = GradientDescent::new(0.1).update_params(&mut params, &grad);
        assert!(matches!(res, Err(MlErr::LayoutMismatch { .. })));
    }
}
