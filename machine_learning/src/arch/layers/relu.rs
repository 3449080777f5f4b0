use ndarray::{Array2, ArrayView2, Zip};

/// Rectified linear unit activation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Relu;

impl Relu {
    pub fn forward(&self, x: ArrayView2<f32>) -> Array2<f32> {
        x.mapv(|z| z.max(0.0))
    }

    pub fn backward(&self, x: ArrayView2<f32>, mut d: Array2<f32>) -> Array2<f32> {
        Zip::from(&mut d).and(&x).for_each(|d, &z| {
            if z <= 0.0 {
                *d = 0.0;
            }
        });

        d
    }
}
