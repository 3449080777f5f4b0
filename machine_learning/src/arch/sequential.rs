use std::ops::Range;

use comms::specs::machine_learning::{InitSpec, ModelSpec};
use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use rand::{Rng, seq::SliceRandom};

use super::{Model, init::init_params, layers::Layer, loss::LossFn};
use crate::{MlErr, ParameterSet, Result, dataset::Dataset, optimization::Optimizer};

/// A feed forward network made of a chain of layers.
#[derive(Debug, Clone, PartialEq)]
pub struct Sequential {
    layers: Vec<Layer>,
    ranges: Vec<Range<usize>>,
}

impl Sequential {
    /// Creates a new `Sequential` model.
    ///
    /// # Arguments
    /// * `layers` - The layers of the model, in the order the input goes through them.
    ///
    /// # Returns
    /// The model or an `InvalidModel` error if there are no layers, some dense layer has an empty
    /// dimension or adjacent dense layers don't chain.
    pub fn new(layers: Vec<Layer>) -> Result<Self> {
        if layers.is_empty() {
            return Err(MlErr::InvalidModel("a model needs at least one layer".into()));
        }

        let mut prev: Option<(usize, usize)> = None;
        for (i, layer) in layers.iter().enumerate() {
            let Layer::Dense(dense) = layer else {
                continue;
            };

            let (n, m) = dense.dim();
            if n == 0 || m == 0 {
                return Err(MlErr::InvalidModel(format!(
                    "layer {i} has an empty dimension ({n}, {m})"
                )));
            }

            if let Some((_, out)) = prev
                && out != n
            {
                return Err(MlErr::InvalidModel(format!(
                    "layer {i} takes {n} inputs but the previous dense layer outputs {out}"
                )));
            }

            prev = Some((n, m));
        }

        let mut ranges = Vec::with_capacity(layers.len());
        let mut offset = 0;
        for layer in &layers {
            let end = offset + layer.param_shapes().len();
            ranges.push(offset..end);
            offset = end;
        }

        Ok(Self { layers, ranges })
    }

    /// Creates a model out of it's wire specification.
    pub fn from_spec(spec: &ModelSpec) -> Result<Self> {
        let ModelSpec::Sequential { layers } = spec;
        Self::new(layers.iter().copied().map(Layer::from).collect())
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Returns the amount of features the model expects, if it has a dense layer.
    pub fn input_size(&self) -> Option<usize> {
        self.layers.iter().find_map(|layer| match layer {
            Layer::Dense(dense) => Some(dense.dim().0),
            _ => None,
        })
    }

    /// Samples a fresh set of parameters for this model.
    pub fn init_params<R: Rng>(&self, init: InitSpec, rng: &mut R) -> Result<ParameterSet> {
        init_params(&self.param_shapes(), init, rng)
    }

    fn check_layout(&self, params: &ParameterSet) -> Result<()> {
        let expected = self.param_shapes();
        let got = params.shapes();
        if got != expected {
            return Err(MlErr::LayoutMismatch {
                what: "model parameters",
                got,
                expected,
            });
        }

        Ok(())
    }

    /// Computes the loss over a batch and the gradient of every parameter with respect to it.
    ///
    /// # Arguments
    /// * `params` - The parameters of the model.
    /// * `x` - The input batch.
    /// * `y` - The labels of the batch.
    /// * `loss` - The loss function to differentiate.
    ///
    /// # Returns
    /// The mean loss of the batch and the gradient, laid out like `params`.
    pub fn gradients<L: LossFn>(
        &self,
        params: &ParameterSet,
        x: ArrayView2<f32>,
        y: ArrayView1<u32>,
        loss: &L,
    ) -> Result<(f32, ParameterSet)> {
        self.check_layout(params)?;

        let tensors = params.tensors();
        let mut inputs = Vec::with_capacity(self.layers.len());
        let mut a = x.to_owned();

        for (layer, range) in self.layers.iter().zip(&self.ranges) {
            let next = layer.forward(&tensors[range.clone()], a.view())?;
            inputs.push(a);
            a = next;
        }

        let value = loss.loss(a.view(), y);
        let mut d = loss.loss_prime(a.view(), y);
        let mut grads = ParameterSet::zeros(&self.param_shapes());

        for ((layer, range), input) in self.layers.iter().zip(&self.ranges).zip(&inputs).rev() {
            let slot = &mut grads.tensors_mut()[range.clone()];
            d = layer.backward(&tensors[range.clone()], slot, input.view(), d)?;
        }

        Ok((value, grads))
    }

    /// Makes a single pass over `dataset` in shuffled mini batches, updating `params` after each one.
    ///
    /// # Arguments
    /// * `params` - The parameters to train.
    /// * `dataset` - The samples to train on, the last batch may be smaller than `batch_size`.
    /// * `batch_size` - The amount of samples per step.
    /// * `loss` - The loss function to minimize.
    /// * `optimizer` - The update rule.
    /// * `rng` - The source of randomness for the shuffle.
    ///
    /// # Returns
    /// The mean loss over every batch of the epoch.
    pub fn train_epoch<L, O, R>(
        &self,
        params: &mut ParameterSet,
        dataset: &Dataset,
        batch_size: usize,
        loss: &L,
        optimizer: &mut O,
        rng: &mut R,
    ) -> Result<f32>
    where
        L: LossFn,
        O: Optimizer,
        R: Rng,
    {
        if dataset.is_empty() {
            return Err(MlErr::InvalidDataset("can't train on an empty dataset".into()));
        }

        let mut order: Vec<usize> = (0..dataset.len()).collect();
        order.shuffle(rng);

        let mut total = 0.0;
        let mut batches = 0;

        for chunk in order.chunks(batch_size.max(1)) {
            let x = dataset.x().select(Axis(0), chunk);
            let y = dataset.y().select(Axis(0), chunk);

            let (value, grad) = self.gradients(params, x.view(), y.view(), loss)?;
            optimizer.update_params(params, &grad)?;

            total += value;
            batches += 1;
        }

        Ok(total / batches as f32)
    }
}

impl Model for Sequential {
    fn param_shapes(&self) -> Vec<Vec<usize>> {
        self.layers.iter().flat_map(Layer::param_shapes).collect()
    }

    fn forward(&self, params: &ParameterSet, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        self.check_layout(params)?;

        let tensors = params.tensors();
        let mut a = x.to_owned();

        for (layer, range) in self.layers.iter().zip(&self.ranges) {
            a = layer.forward(&tensors[range.clone()], a.view())?;
        }

        Ok(a)
    }
}
