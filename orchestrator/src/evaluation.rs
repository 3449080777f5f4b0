use std::{error::Error, fmt};

use machine_learning::{
    MlErr, ParameterSet,
    arch::{Model, loss::LossFn, metric::Metric},
    dataset::Dataset,
};

/// The performance of a model over a held out dataset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    /// The mean loss over every batch.
    pub loss: f32,
    /// The mean metric over every batch.
    pub accuracy: f32,
    pub batches: usize,
}

#[derive(Debug)]
pub enum EvalErr {
    /// The dataset doesn't hold a single full batch.
    EmptyDataset { samples: usize, batch_size: usize },
    Model(MlErr),
}

impl fmt::Display for EvalErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyDataset {
                samples,
                batch_size,
            } => write!(
                f,
                "{samples} samples don't fill a single batch of {batch_size}"
            ),
            Self::Model(e) => write!(f, "{e}"),
        }
    }
}

impl Error for EvalErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Model(e) => Some(e),
            _ => None,
        }
    }
}

impl From<MlErr> for EvalErr {
    fn from(e: MlErr) -> Self {
        Self::Model(e)
    }
}

/// Runs `model` over `dataset` in consecutive batches, the trailing partial batch is dropped.
///
/// # Arguments
/// * `model` - The architecture to evaluate.
/// * `params` - The parameters to evaluate the architecture with.
/// * `dataset` - The held out samples.
/// * `batch_size` - The amount of samples per batch.
/// * `loss` - The loss to average.
/// * `metric` - The metric to average.
///
/// # Returns
/// The means over `floor(len / batch_size)` batches or `EmptyDataset` if there are none.
pub fn evaluate<M, L, Me>(
    model: &M,
    params: &ParameterSet,
    dataset: &Dataset,
    batch_size: usize,
    loss: &L,
    metric: &Me,
) -> Result<Evaluation, EvalErr>
where
    M: Model,
    L: LossFn,
    Me: Metric,
{
    let batches = dataset.len().checked_div(batch_size).unwrap_or(0);
    if batches == 0 {
        return Err(EvalErr::EmptyDataset {
            samples: dataset.len(),
            batch_size,
        });
    }

    let mut total_loss = 0.0;
    let mut total_acc = 0.0;

    for (x, y) in dataset.batches(batch_size).take(batches) {
        let y_pred = model.forward(params, x)?;
        total_loss += loss.loss(y_pred.view(), y) as f64;
        total_acc += metric.score(y_pred.view(), y) as f64;
    }

    Ok(Evaluation {
        loss: (total_loss / batches as f64) as f32,
        accuracy: (total_acc / batches as f64) as f32,
        batches,
    })
}
