mod idx;

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

use crate::{MlErr, Result};

pub use idx::{load_idx_images, load_idx_labels};

/// A labeled set of samples, one sample per row of `x`.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    x: Array2<f32>,
    y: Array1<u32>,
}

impl Dataset {
    /// Creates a new `Dataset`.
    ///
    /// # Arguments
    /// * `x` - The features, one sample per row.
    /// * `y` - The class label of each sample.
    ///
    /// # Returns
    /// The dataset or a `SizeMismatch` if `x` and `y` don't hold the same amount of samples.
    pub fn new(x: Array2<f32>, y: Array1<u32>) -> Result<Self> {
        if x.nrows() != y.len() {
            return Err(MlErr::SizeMismatch {
                what: "dataset labels",
                got: y.len(),
                expected: x.nrows(),
            });
        }

        Ok(Self { x, y })
    }

    /// Rebuilds a dataset out of the flat buffers it travels as.
    ///
    /// # Arguments
    /// * `x_size` - The amount of features of each sample.
    /// * `x` - Every feature of every sample, in row major order.
    /// * `y` - The label of each sample.
    pub fn from_flat(x_size: usize, x: &[f32], y: &[u32]) -> Result<Self> {
        let expected = x_size.checked_mul(y.len()).ok_or(MlErr::SizeOverflow {
            what: "dataset features",
        })?;
        if x.len() != expected {
            return Err(MlErr::SizeMismatch {
                what: "dataset features",
                got: x.len(),
                expected,
            });
        }

        let x = Array2::from_shape_vec((y.len(), x_size), x.to_vec())?;
        Self::new(x, Array1::from_vec(y.to_vec()))
    }

    /// Loads a dataset out of an IDX images file and its IDX labels file.
    ///
    /// # Arguments
    /// * `images` - The path to the images file, every image is flattened into a row.
    /// * `labels` - The path to the labels file.
    /// * `normalize` - Whether to scale the pixels into `[0, 1]`.
    pub fn from_idx<P, Q>(images: P, labels: Q, normalize: bool) -> Result<Self>
    where
        P: AsRef<std::path::Path>,
        Q: AsRef<std::path::Path>,
    {
        let x = load_idx_images(images, normalize)?;
        let y = load_idx_labels(labels)?;
        Self::new(x, y)
    }

    /// Returns the amount of samples.
    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    /// Returns the amount of features of each sample.
    pub fn x_size(&self) -> usize {
        self.x.ncols()
    }

    pub fn x(&self) -> ArrayView2<'_, f32> {
        self.x.view()
    }

    pub fn y(&self) -> ArrayView1<'_, u32> {
        self.y.view()
    }

    /// Builds a new dataset with the samples at `indices`, in that order.
    ///
    /// # Returns
    /// The subset or a `SizeMismatch` if any index is out of bounds.
    pub fn select(&self, indices: &[usize]) -> Result<Self> {
        if let Some(&i) = indices.iter().find(|&&i| i >= self.len()) {
            return Err(MlErr::SizeMismatch {
                what: "sample index",
                got: i,
                expected: self.len(),
            });
        }

        Ok(Self {
            x: self.x.select(Axis(0), indices),
            y: self.y.select(Axis(0), indices),
        })
    }

    /// Iterates the dataset in batches of `batch_size` consecutive samples.
    ///
    /// The last batch holds the remaining samples and may be smaller, callers that only want full
    /// batches should discard it.
    pub fn batches(
        &self,
        batch_size: usize,
    ) -> impl Iterator<Item = (ArrayView2<'_, f32>, ArrayView1<'_, u32>)> {
        let batch_size = batch_size.max(1);
        self.x
            .axis_chunks_iter(Axis(0), batch_size)
            .zip(self.y.axis_chunks_iter(Axis(0), batch_size))
    }
}
