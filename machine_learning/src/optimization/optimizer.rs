use crate::{ParameterSet, Result};

/// An update rule for a model's parameters given their gradient.
pub trait Optimizer {
    /// Takes a single step over `params` following `grad`.
    ///
    /// # Returns
    /// A `LayoutMismatch` error if `grad` doesn't share the layout of `params`.
    fn update_params(&mut self, params: &mut ParameterSet, grad: &ParameterSet) -> Result<()>;
}
