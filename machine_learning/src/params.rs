use ndarray::{ArrayD, IxDyn};

use crate::{MlErr, Result};

/// An ordered sequence of tensors holding the trainable state of a model.
///
/// Two sets describe the same architecture if and only if their `shapes` are equal.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSet {
    tensors: Vec<ArrayD<f32>>,
}

impl ParameterSet {
    /// Creates a new `ParameterSet`.
    ///
    /// # Arguments
    /// * `tensors` - The tensors of the set, in the order the model consumes them.
    ///
    /// # Returns
    /// A new `ParameterSet` instance.
    pub fn new(tensors: Vec<ArrayD<f32>>) -> Self {
        Self { tensors }
    }

    /// Creates a set of zeroed tensors with the given shapes.
    pub fn zeros(shapes: &[Vec<usize>]) -> Self {
        let tensors = shapes
            .iter()
            .map(|shape| ArrayD::zeros(IxDyn(shape)))
            .collect();

        Self { tensors }
    }

    /// Rebuilds a set out of its layout and a flat slice of scalars, the inverse of `to_flat`.
    ///
    /// # Arguments
    /// * `shapes` - The shape of each tensor.
    /// * `flat` - Every scalar of every tensor, in row major order, one tensor after the other.
    ///
    /// # Returns
    /// The rebuilt set or a `SizeMismatch` if `flat` doesn't hold exactly the scalars `shapes` describe.
    pub fn from_flat(shapes: &[Vec<usize>], flat: &[f32]) -> Result<Self> {
        let sizes = shapes
            .iter()
            .map(|shape| shape.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d)))
            .collect::<Option<Vec<usize>>>()
            .ok_or(MlErr::SizeOverflow {
                what: "parameter layout",
            })?;

        let expected = sizes
            .iter()
            .try_fold(0usize, |acc, &size| acc.checked_add(size))
            .ok_or(MlErr::SizeOverflow {
                what: "parameter layout",
            })?;

        if flat.len() != expected {
            return Err(MlErr::SizeMismatch {
                what: "flat parameters",
                got: flat.len(),
                expected,
            });
        }

        let mut rest = flat;
        let mut tensors = Vec::with_capacity(shapes.len());

        for (shape, size) in shapes.iter().zip(sizes) {
            let (head, tail) = rest.split_at(size);
            tensors.push(ArrayD::from_shape_vec(IxDyn(shape), head.to_vec())?);
            rest = tail;
        }

        Ok(Self { tensors })
    }

    /// Returns the tensors of this set.
    pub fn tensors(&self) -> &[ArrayD<f32>] {
        &self.tensors
    }

    /// Returns the tensors of this set mutably.
    pub fn tensors_mut(&mut self) -> &mut [ArrayD<f32>] {
        &mut self.tensors
    }

    /// Returns the shape of every tensor in order.
    pub fn shapes(&self) -> Vec<Vec<usize>> {
        self.tensors.iter().map(|t| t.shape().to_vec()).collect()
    }

    /// Returns the amount of tensors in the set.
    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    /// Returns the total amount of scalars in the set.
    pub fn size(&self) -> usize {
        self.tensors.iter().map(|t| t.len()).sum()
    }

    /// Flattens every tensor into a single contiguous buffer, the wire representation of the set.
    pub fn to_flat(&self) -> Vec<f32> {
        let mut flat = Vec::with_capacity(self.size());
        for tensor in &self.tensors {
            flat.extend(tensor.iter().copied());
        }

        flat
    }
}
