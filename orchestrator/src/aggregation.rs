//! Federated averaging of the parameter sets returned by the workers.

use std::{error::Error, fmt};

use machine_learning::ParameterSet;

/// The ways an aggregation can fail.
#[derive(Debug, Clone, PartialEq)]
pub enum AggregationErr {
    Empty,
    CardinalityMismatch {
        params: usize,
        weights: usize,
    },
    /// The tensor at `tensor` of set `set` doesn't match the first set, `None` means the tensor is
    /// missing.
    ShapeMismatch {
        set: usize,
        tensor: usize,
        got: Option<Vec<usize>>,
        expected: Option<Vec<usize>>,
    },
}

impl fmt::Display for AggregationErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "there are no parameter sets to aggregate"),
            Self::CardinalityMismatch { params, weights } => write!(
                f,
                "got {params} parameter sets but {weights} weights"
            ),
            Self::ShapeMismatch {
                set,
                tensor,
                got,
                expected,
            } => write!(
                f,
                "tensor {tensor} of set {set} has shape {got:?}, expected {expected:?}"
            ),
        }
    }
}

impl Error for AggregationErr {}

/// Computes the weighted sum of `sets`, tensor by tensor.
///
/// The weights are used as given, normalizing them is up to the caller. Neither input is
/// modified.
///
/// # Arguments
/// * `sets` - The parameter sets to combine, all sharing the same layout.
/// * `weights` - The weight of each set.
///
/// # Returns
/// The aggregated set or an `AggregationErr` if there's nothing to aggregate, the amount of
/// weights doesn't match the amount of sets or the layouts disagree.
pub fn aggregate(sets: &[ParameterSet], weights: &[f64]) -> Result<ParameterSet, AggregationErr> {
    let Some((first, rest)) = sets.split_first() else {
        return Err(AggregationErr::Empty);
    };

    if weights.len() != sets.len() {
        return Err(AggregationErr::CardinalityMismatch {
            params: sets.len(),
            weights: weights.len(),
        });
    }

    for (i, set) in rest.iter().enumerate() {
        check_layout(first, set, i + 1)?;
    }

    let mut acc = first.clone();
    let w0 = weights[0] as f32;
    for tensor in acc.tensors_mut() {
        tensor.mapv_inplace(|x| x * w0);
    }

    for (set, &w) in rest.iter().zip(&weights[1..]) {
        for (a, t) in acc.tensors_mut().iter_mut().zip(set.tensors()) {
            a.scaled_add(w as f32, t);
        }
    }

    Ok(acc)
}

fn check_layout(first: &ParameterSet, set: &ParameterSet, index: usize) -> Result<(), AggregationErr> {
    let expected = first.tensors();
    let got = set.tensors();

    for tensor in 0..expected.len().max(got.len()) {
        let e = expected.get(tensor).map(|t| t.shape());
        let g = got.get(tensor).map(|t| t.shape());

        if e != g {
            return Err(AggregationErr::ShapeMismatch {
                set: index,
                tensor,
                got: g.map(<[usize]>::to_vec),
                expected: e.map(<[usize]>::to_vec),
            });
        }
    }

    Ok(())
}
